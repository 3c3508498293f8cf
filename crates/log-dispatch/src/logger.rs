// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Application-facing logging calls.
//!
//! [`Logger`] turns `log`/`warn`/`error` calls and panics into [`LogEvent`]s,
//! stamps them with the active configuration and hands them to the dispatcher.
//! With `system_log` enabled every message is also echoed locally, whatever
//! happens to the remote send.

use crate::config::{ConfigOverrides, LogConfig};
use crate::dispatcher::DispatcherHandle;
use crate::event::{EventKind, LogEvent};
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Logger {
    dispatcher: DispatcherHandle,
    active: Arc<RwLock<Arc<LogConfig>>>,
}

impl Logger {
    pub fn new(dispatcher: DispatcherHandle, config: LogConfig) -> Self {
        Self {
            dispatcher,
            active: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Applies `overrides` on top of the active configuration.
    ///
    /// Takes effect for the next submitted event; events already buffered keep
    /// the identity they were submitted under.
    pub fn configure(&self, overrides: ConfigOverrides) {
        let mut active = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *active = Arc::new(active.merged(overrides));
        debug!("Logger configuration updated");
    }

    pub fn config(&self) -> Arc<LogConfig> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn log(&self, message: &str, category: Option<&str>) {
        let config = self.config();
        self.dispatcher
            .submit(Arc::clone(&config), event(EventKind::Log, message, category));

        if config.system_log {
            println!("{message}");
        }
    }

    /// Empty messages are ignored.
    pub fn warn(&self, message: &str, category: Option<&str>) {
        if message.is_empty() {
            return;
        }
        let config = self.config();
        self.dispatcher
            .submit(Arc::clone(&config), event(EventKind::Warn, message, category));

        if config.system_log {
            eprintln!("{message}");
        }
    }

    /// Empty messages are ignored.
    pub fn error(&self, message: &str, category: Option<&str>) {
        if message.is_empty() {
            return;
        }
        let config = self.config();
        self.dispatcher
            .submit(Arc::clone(&config), event(EventKind::Error, message, category));

        if config.system_log {
            eprintln!("{message}");
        }
    }

    /// Reports an uncaught error. Does nothing unless `capture_errors` is set.
    pub fn capture(&self, message: &str, stack: Option<String>) {
        let config = self.config();
        if !config.capture_errors || message.is_empty() {
            return;
        }

        let mut captured = LogEvent::new(EventKind::Capture, message);
        captured.stack = stack;
        self.dispatcher.submit(config, captured);
    }

    /// Reports panics through [`Logger::capture`], then runs the previously
    /// installed hook so the default panic output is kept.
    pub fn install_panic_hook(&self) {
        let logger = self.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let mut message = panic_message(info.payload());
            if let Some(location) = info.location() {
                message = format!("{message} at {location}");
            }
            let stack = Backtrace::force_capture().to_string();
            logger.capture(&message, Some(stack));
            previous(info);
        }));
    }
}

fn event(kind: EventKind, message: &str, category: Option<&str>) -> LogEvent {
    let event = LogEvent::new(kind, message);
    match category {
        Some(category) => event.with_category(category),
        None => event,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
