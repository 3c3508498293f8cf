// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{DEFAULT_SEND_CAPACITY, DEFAULT_SEND_DELAY, MAX_FAILURES};
use crate::error::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Settings read by the dispatcher on every submission.
///
/// The endpoint, version, session and user fields together form the batch
/// identity: events submitted under different values are never sent together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Collector URL. An empty endpoint disables dispatch.
    pub endpoint: String,
    /// How long events are buffered before being sent. Zero sends every event immediately.
    pub send_delay: Duration,
    /// Number of buffered events that forces a send while the delay timer is running.
    pub send_capacity: usize,
    pub user_name: String,
    pub user_id: String,
    pub session_id: String,
    /// Version of the client application producing the events.
    pub version: String,
    /// Echo logged messages to stdout/stderr as well.
    pub system_log: bool,
    /// Report panics as `capture` events.
    pub capture_errors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            send_delay: DEFAULT_SEND_DELAY,
            send_capacity: DEFAULT_SEND_CAPACITY,
            user_name: String::new(),
            user_id: String::new(),
            session_id: String::new(),
            version: String::new(),
            system_log: true,
            capture_errors: true,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to defaults
    /// for every key the lookup does not know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let send_delay = match parse_var::<u64, _>(&lookup, "LOG_DISPATCH_SEND_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => defaults.send_delay,
        };

        let config = Self {
            endpoint: string("LOG_DISPATCH_ENDPOINT", defaults.endpoint),
            send_delay,
            send_capacity: parse_var(&lookup, "LOG_DISPATCH_SEND_CAPACITY")?
                .unwrap_or(defaults.send_capacity),
            user_name: string("LOG_DISPATCH_USER_NAME", defaults.user_name),
            user_id: string("LOG_DISPATCH_USER_ID", defaults.user_id),
            session_id: string("LOG_DISPATCH_SESSION_ID", defaults.session_id),
            version: string("LOG_DISPATCH_VERSION", defaults.version),
            system_log: parse_bool(&lookup, "LOG_DISPATCH_SYSTEM_LOG")?
                .unwrap_or(defaults.system_log),
            capture_errors: parse_bool(&lookup, "LOG_DISPATCH_CAPTURE_ERRORS")?
                .unwrap_or(defaults.capture_errors),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_capacity == 0 {
            return Err(ConfigError::Invalid(
                "send capacity must be greater than 0".to_string(),
            ));
        }

        if !self.endpoint.is_empty()
            && !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "endpoint '{}' must be an http or https URL",
                self.endpoint
            )));
        }

        Ok(())
    }

    /// Returns a copy of this configuration with every field set in `overrides` replaced.
    #[must_use]
    pub fn merged(&self, overrides: ConfigOverrides) -> Self {
        Self {
            endpoint: overrides.endpoint.unwrap_or_else(|| self.endpoint.clone()),
            send_delay: overrides.send_delay.unwrap_or(self.send_delay),
            send_capacity: overrides.send_capacity.unwrap_or(self.send_capacity),
            user_name: overrides.user_name.unwrap_or_else(|| self.user_name.clone()),
            user_id: overrides.user_id.unwrap_or_else(|| self.user_id.clone()),
            session_id: overrides.session_id.unwrap_or_else(|| self.session_id.clone()),
            version: overrides.version.unwrap_or_else(|| self.version.clone()),
            system_log: overrides.system_log.unwrap_or(self.system_log),
            capture_errors: overrides.capture_errors.unwrap_or(self.capture_errors),
        }
    }
}

/// Partial configuration applied on top of the active one by
/// [`crate::logger::Logger::configure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub send_delay: Option<Duration>,
    pub send_capacity: Option<usize>,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub version: Option<String>,
    pub system_log: Option<bool>,
    pub capture_errors: Option<bool>,
}

/// What the dispatcher does with its failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Consecutive failed sends after which all sending stops for good.
    pub max_failures: u32,
    /// Reset the failure counter after a successful send. Off by default, which
    /// makes suppression permanent once three sends in total have failed.
    pub reset_on_success: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            max_failures: MAX_FAILURES,
            reset_on_success: false,
        }
    }
}

impl FailurePolicy {
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| env::var(key).ok();
        Ok(Self {
            reset_on_success: parse_bool(&lookup, "LOG_DISPATCH_RESET_FAILURES_ON_SUCCESS")?
                .unwrap_or(false),
            ..Self::default()
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Parse {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::Parse {
                key: key.to_string(),
                value,
            }),
        },
    }
}
