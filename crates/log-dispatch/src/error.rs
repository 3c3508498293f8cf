// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while loading or validating a [`crate::config::LogConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid value '{value}' for {key}")]
    Parse { key: String, value: String },
}

/// Outcome of a failed batch delivery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (connection refused, timeout, DNS...).
    #[error("Network error: {0}")]
    Network(String),

    /// The transport itself could not be set up or the request could not be built.
    #[error("Client error: {0}")]
    Client(String),
}

/// Returned by the query operations of [`crate::dispatcher::DispatcherHandle`].
///
/// Submitting and flushing never fail from the caller's point of view.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher service unavailable: {0}")]
    ServiceUnavailable(String),
}
