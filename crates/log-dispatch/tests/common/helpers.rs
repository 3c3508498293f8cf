// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers for starting a dispatcher wired to the mocks

use super::mocks::{ManualScheduler, MockTransport};
use log_dispatch::config::{FailurePolicy, LogConfig};
use log_dispatch::dispatcher::{DispatcherHandle, DispatcherService, DispatcherStats};
use log_dispatch::event::{EventKind, LogEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Harness {
    pub handle: DispatcherHandle,
    pub transport: Arc<MockTransport>,
    pub scheduler: ManualScheduler,
    task: JoinHandle<()>,
}

#[allow(dead_code)]
impl Harness {
    pub fn start(policy: FailurePolicy) -> Self {
        Self::with_scheduler(ManualScheduler::default(), policy)
    }

    pub fn with_scheduler(scheduler: ManualScheduler, policy: FailurePolicy) -> Self {
        let transport = Arc::new(MockTransport::default());
        let (service, handle) =
            DispatcherService::new(transport.clone(), Arc::new(scheduler.clone()), policy);
        let task = tokio::spawn(service.run());
        Self {
            handle,
            transport,
            scheduler,
            task,
        }
    }

    pub fn submit(&self, config: &Arc<LogConfig>, message: &str) {
        self.handle.submit(Arc::clone(config), event(message));
    }

    /// Waits for every command and send issued so far, then reports the state
    pub async fn settle(&self) -> DispatcherStats {
        self.handle.drain().await.expect("drain failed");
        self.handle.stats().await.expect("stats failed")
    }

    pub async fn advance(&self, by: Duration) -> DispatcherStats {
        // Let queued commands land before moving the clock
        self.settle().await;
        self.scheduler.advance(by);
        self.settle().await
    }

    pub async fn stop(self) {
        self.handle.shutdown();
        self.task.await.expect("service task failed");
    }
}

/// Configuration used throughout the scenarios: session `s1`, version `v1`
pub fn config(send_delay_ms: u64, send_capacity: usize) -> Arc<LogConfig> {
    Arc::new(LogConfig {
        endpoint: "https://c".to_string(),
        send_delay: Duration::from_millis(send_delay_ms),
        send_capacity,
        session_id: "s1".to_string(),
        version: "v1".to_string(),
        system_log: false,
        ..Default::default()
    })
}

pub fn event(message: &str) -> LogEvent {
    LogEvent::new(EventKind::Log, message)
}
