// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock transport and virtual-time scheduler for driving the dispatcher in tests

use async_trait::async_trait;
use log_dispatch::batch::BatchPayload;
use log_dispatch::error::TransportError;
use log_dispatch::scheduler::{OnExpiry, Scheduler, TimerHandle};
use log_dispatch::transport::Transport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A batch as received by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct Sent {
    pub endpoint: String,
    pub payload: BatchPayload,
}

impl Sent {
    pub fn messages(&self) -> Vec<String> {
        self.payload.log.iter().map(|e| e.message.clone()).collect()
    }
}

/// Records every batch and answers with scripted outcomes, succeeding once the
/// script runs out
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    outcomes: Mutex<VecDeque<bool>>,
}

#[allow(dead_code)]
impl MockTransport {
    /// Queues outcomes for the next sends: `true` delivers, `false` fails
    pub fn script(&self, outcomes: &[bool]) {
        self.outcomes.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, endpoint: &str, body: Vec<u8>) -> Result<(), TransportError> {
        let payload: BatchPayload =
            serde_json::from_slice(&body).expect("dispatcher sent malformed JSON");
        self.sent.lock().unwrap().push(Sent {
            endpoint: endpoint.to_string(),
            payload,
        });

        let delivered = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if delivered {
            Ok(())
        } else {
            Err(TransportError::Network("mock outage".to_string()))
        }
    }
}

struct PendingTimer {
    id: u64,
    deadline: Duration,
    on_expiry: OnExpiry,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    timers: Vec<PendingTimer>,
    ignore_cancel: bool,
}

/// Timers that only fire when the test advances the clock
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<Clock>>,
}

#[allow(dead_code)]
impl ManualScheduler {
    /// A scheduler whose timers keep running after their handle is dropped,
    /// to reproduce an expiry that races with a cancellation
    pub fn ignoring_cancel() -> Self {
        let scheduler = Self::default();
        scheduler.clock.lock().unwrap().ignore_cancel = true;
        scheduler
    }

    pub fn advance(&self, by: Duration) {
        let due = {
            let mut clock = self.clock.lock().unwrap();
            clock.now += by;
            let now = clock.now;
            let (mut due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut clock.timers)
                .into_iter()
                .partition(|timer| timer.deadline <= now);
            clock.timers = keep;
            due.sort_by_key(|timer| timer.deadline);
            due
        };

        for timer in due {
            (timer.on_expiry)();
        }
    }

    /// Number of timers scheduled and neither fired nor cancelled
    pub fn armed(&self) -> usize {
        self.clock.lock().unwrap().timers.len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, on_expiry: OnExpiry) -> TimerHandle {
        let mut clock = self.clock.lock().unwrap();
        let id = clock.next_id;
        clock.next_id += 1;
        let deadline = clock.now + delay;
        clock.timers.push(PendingTimer {
            id,
            deadline,
            on_expiry,
        });

        let shared = Arc::clone(&self.clock);
        TimerHandle::new(move || {
            let mut clock = shared.lock().unwrap();
            if !clock.ignore_cancel {
                clock.timers.retain(|timer| timer.id != id);
            }
        })
    }
}
