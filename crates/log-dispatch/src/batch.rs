// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The buffer of events waiting to be sent and the payload built from it.
//!
//! Entries are kept newest first: every submitted event is inserted at the
//! front, and the payload lists them in that order.

use crate::config::LogConfig;
use crate::event::LogEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fields that decide whether two events may travel in the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub endpoint: String,
    pub version: String,
    pub session_id: String,
    pub user_name: String,
    pub user_id: String,
}

impl From<&LogConfig> for Identity {
    fn from(config: &LogConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            version: config.version.clone(),
            session_id: config.session_id.clone(),
            user_name: config.user_name.clone(),
            user_id: config.user_id.clone(),
        }
    }
}

impl Identity {
    /// Whether `config` describes the same identity without building a new one.
    pub fn matches(&self, config: &LogConfig) -> bool {
        self.endpoint == config.endpoint
            && self.version == config.version
            && self.session_id == config.session_id
            && self.user_name == config.user_name
            && self.user_id == config.user_id
    }
}

/// Request body sent to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    pub version: String,
    pub session_id: String,
    pub user_name: String,
    pub user_id: String,
    pub log: Vec<LogEvent>,
}

/// Events buffered under a single identity.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    identity: Identity,
    entries: VecDeque<LogEvent>,
}

impl PendingBatch {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            entries: VecDeque::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn push(&mut self, event: LogEvent) {
        self.entries.push_front(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains the buffered events into a payload. The identity stays, so later
    /// events keep going into this batch until the identity changes.
    pub fn take_payload(&mut self) -> BatchPayload {
        let log = std::mem::take(&mut self.entries).into();
        BatchPayload {
            version: self.identity.version.clone(),
            session_id: self.identity.session_id.clone(),
            user_name: self.identity.user_name.clone(),
            user_id: self.identity.user_id.clone(),
            log,
        }
    }
}
