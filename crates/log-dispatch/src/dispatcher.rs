// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The dispatch engine: buffers submitted events and decides when to send them.
//!
//! A single [`DispatcherService`] task owns the pending batch, the delay timer
//! and the failure counter. Producers talk to it through cloneable
//! [`DispatcherHandle`]s, so submitting never blocks and never fails.
//!
//! ```text
//!   handles ──commands──> service ──spawn──> Transport::send
//!                           ^  ^                  │
//!          timer expiries ──┘  └──── outcomes ────┘
//! ```
//!
//! A batch is sent when the delay timer expires, when the batch reaches its
//! capacity while the timer is armed, immediately for a zero delay, or when a
//! submission arrives under a different identity. After
//! [`FailurePolicy::max_failures`] failed sends the service stops sending for
//! good.

use crate::batch::{Identity, PendingBatch};
use crate::config::{FailurePolicy, LogConfig};
use crate::error::{DispatchError, TransportError};
use crate::event::LogEvent;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum DispatchCommand {
    Submit {
        config: Arc<LogConfig>,
        event: LogEvent,
    },
    Flush,
    Stats(oneshot::Sender<DispatcherStats>),
    /// Replies once every send started so far has completed.
    Drain(oneshot::Sender<()>),
    Shutdown,
}

/// Point-in-time view of the service state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub pending_entries: usize,
    pub timer_armed: bool,
    pub consecutive_failures: u32,
    pub suppressed: bool,
    pub in_flight: usize,
    pub batches_sent: u64,
}

#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

impl DispatcherHandle {
    /// Queues `event` for dispatch under `config`. Fire and forget.
    pub fn submit(&self, config: Arc<LogConfig>, event: LogEvent) {
        if self
            .tx
            .send(DispatchCommand::Submit { config, event })
            .is_err()
        {
            debug!("Dispatcher service stopped, dropping event");
        }
    }

    /// Sends whatever is buffered now instead of waiting for a trigger.
    pub fn flush(&self) {
        if self.tx.send(DispatchCommand::Flush).is_err() {
            debug!("Dispatcher service stopped, nothing to flush");
        }
    }

    pub async fn stats(&self) -> Result<DispatcherStats, DispatchError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(DispatchCommand::Stats(response_tx))
            .map_err(|e| {
                DispatchError::ServiceUnavailable(format!("Failed to send stats command: {e}"))
            })?;

        response_rx.await.map_err(|e| {
            DispatchError::ServiceUnavailable(format!("Failed to receive stats response: {e}"))
        })
    }

    /// Waits until every send started before this call has finished and its
    /// outcome has been counted.
    pub async fn drain(&self) -> Result<(), DispatchError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(DispatchCommand::Drain(response_tx))
            .map_err(|e| {
                DispatchError::ServiceUnavailable(format!("Failed to send drain command: {e}"))
            })?;

        response_rx.await.map_err(|e| {
            DispatchError::ServiceUnavailable(format!("Failed to receive drain response: {e}"))
        })
    }

    /// Asks the service to send what it still buffers and stop.
    pub fn shutdown(&self) {
        if self.tx.send(DispatchCommand::Shutdown).is_err() {
            debug!("Dispatcher service already stopped");
        }
    }
}

struct ArmedTimer {
    generation: u64,
    _handle: TimerHandle,
}

pub struct DispatcherService {
    transport: Arc<dyn Transport>,
    scheduler: Arc<dyn Scheduler>,
    policy: FailurePolicy,
    rx: mpsc::UnboundedReceiver<DispatchCommand>,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
    pending: Option<PendingBatch>,
    timer: Option<ArmedTimer>,
    next_generation: u64,
    consecutive_failures: u32,
    in_flight: JoinSet<Result<(), TransportError>>,
    batches_sent: u64,
}

impl DispatcherService {
    pub fn new(
        transport: Arc<dyn Transport>,
        scheduler: Arc<dyn Scheduler>,
        policy: FailurePolicy,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let service = Self {
            transport,
            scheduler,
            policy,
            rx,
            timer_tx,
            timer_rx,
            pending: None,
            timer: None,
            next_generation: 0,
            consecutive_failures: 0,
            in_flight: JoinSet::new(),
            batches_sent: 0,
        };

        (service, DispatcherHandle { tx })
    }

    pub async fn run(mut self) {
        debug!("Dispatcher service started");

        loop {
            tokio::select! {
                biased;

                Some(generation) = self.timer_rx.recv() => {
                    self.on_timer_expired(generation);
                }

                Some(outcome) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.on_send_complete(outcome);
                }

                command = self.rx.recv() => match command {
                    Some(DispatchCommand::Submit { config, event }) => {
                        self.submit(&config, event);
                    }
                    Some(DispatchCommand::Flush) => self.flush(),
                    Some(DispatchCommand::Stats(response_tx)) => {
                        if response_tx.send(self.stats()).is_err() {
                            error!("Failed to send stats response - receiver dropped");
                        }
                    }
                    Some(DispatchCommand::Drain(response_tx)) => {
                        self.drain().await;
                        if response_tx.send(()).is_err() {
                            error!("Failed to send drain response - receiver dropped");
                        }
                    }
                    Some(DispatchCommand::Shutdown) | None => {
                        debug!("Dispatcher service shutting down");
                        break;
                    }
                },
            }
        }

        self.flush();
        self.drain().await;
        debug!("Dispatcher service stopped");
    }

    fn submit(&mut self, config: &LogConfig, event: LogEvent) {
        if config.endpoint.is_empty() || self.is_suppressed() {
            return;
        }

        if self
            .pending
            .as_ref()
            .is_some_and(|batch| !batch.identity().matches(config))
        {
            debug!("Batch identity changed, flushing previous batch");
            self.flush();
            self.pending = None;
        }

        let batch = self
            .pending
            .get_or_insert_with(|| PendingBatch::new(Identity::from(config)));
        batch.push(event);
        let queued = batch.len();

        if config.send_delay.is_zero() {
            self.flush();
        } else if self.timer.is_none() {
            self.arm_timer(config.send_delay);
        } else if queued >= config.send_capacity {
            debug!("Batch reached capacity of {}", config.send_capacity);
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.timer = None;

        let suppressed = self.is_suppressed();
        let Some(batch) = self.pending.as_mut() else {
            return;
        };
        if batch.is_empty() {
            return;
        }

        let payload = batch.take_payload();
        if suppressed {
            debug!("Sending suppressed, dropping {} events", payload.log.len());
            return;
        }

        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize batch, {} events dropped: {e}", payload.log.len());
                return;
            }
        };

        debug!("Flushing {} events", payload.log.len());
        let endpoint = batch.identity().endpoint.clone();
        let transport = Arc::clone(&self.transport);
        self.in_flight
            .spawn(async move { transport.send(&endpoint, body).await });
        self.batches_sent += 1;
    }

    fn arm_timer(&mut self, delay: Duration) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let timer_tx = self.timer_tx.clone();
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                let _ = timer_tx.send(generation);
            }),
        );
        self.timer = Some(ArmedTimer {
            generation,
            _handle: handle,
        });
    }

    fn on_timer_expired(&mut self, generation: u64) {
        // An expiry can race with a flush that already disarmed its timer
        match &self.timer {
            Some(timer) if timer.generation == generation => self.flush(),
            _ => debug!("Ignoring stale timer expiry"),
        }
    }

    fn on_send_complete(&mut self, outcome: Result<Result<(), TransportError>, JoinError>) {
        let error = match outcome {
            Ok(Ok(())) => {
                if self.policy.reset_on_success && !self.is_suppressed() {
                    self.consecutive_failures = 0;
                }
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("send task failed: {e}"),
        };

        self.consecutive_failures += 1;
        warn!(
            "Failed to send batch ({}/{}): {error}",
            self.consecutive_failures, self.policy.max_failures
        );
        if self.consecutive_failures == self.policy.max_failures {
            error!(
                "{} consecutive send failures, no further logs will be sent",
                self.consecutive_failures
            );
        }
    }

    async fn drain(&mut self) {
        while let Some(outcome) = self.in_flight.join_next().await {
            self.on_send_complete(outcome);
        }
    }

    fn is_suppressed(&self) -> bool {
        self.consecutive_failures >= self.policy.max_failures
    }

    fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            pending_entries: self.pending.as_ref().map_or(0, PendingBatch::len),
            timer_armed: self.timer.is_some(),
            consecutive_failures: self.consecutive_failures,
            suppressed: self.is_suppressed(),
            in_flight: self.in_flight.len(),
            batches_sent: self.batches_sent,
        }
    }
}
