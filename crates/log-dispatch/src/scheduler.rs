// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot timers used for delay-triggered flushes.
//!
//! The dispatcher never sleeps itself: it asks a [`Scheduler`] to run a
//! callback later and keeps the returned [`TimerHandle`]. Dropping the handle
//! cancels the timer and releases whatever backs it, so tests can swap in a
//! scheduler driven by virtual time.

use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback run when a timer expires.
pub type OnExpiry = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Runs `on_expiry` once after `delay` unless the returned handle is dropped first.
    fn schedule(&self, delay: Duration, on_expiry: OnExpiry) -> TimerHandle;
}

/// Cancels its timer when dropped.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Timers backed by tokio tasks. Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, on_expiry: OnExpiry) -> TimerHandle {
        let task: JoinHandle<()> = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry();
        });
        TimerHandle::new(move || task.abort())
    }
}
