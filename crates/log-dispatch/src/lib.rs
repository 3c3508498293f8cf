// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client-side log batching and dispatch.
//!
//! Events submitted by the application are buffered per identity (endpoint,
//! version, session and user) and sent to a remote collector as one JSON batch
//! when the send delay elapses, when the batch fills up, or when the identity
//! changes. Repeated transport failures switch sending off.
//!
//! # Components
//!
//! - **[`dispatcher`]**: the engine, run as an actor task behind a cloneable handle
//! - **[`batch`]**: the pending batch and its wire payload
//! - **[`transport`]**: the injected send capability and its HTTP implementation
//! - **[`scheduler`]**: one-shot timers for delay-triggered flushes
//! - **[`logger`]**: `log`/`warn`/`error` calls and panic capture
//! - **[`config`]**: configuration record, environment loading, failure policy
//!
//! # Example
//!
//! ```rust,ignore
//! use log_dispatch::{
//!     config::{FailurePolicy, LogConfig},
//!     dispatcher::DispatcherService,
//!     logger::Logger,
//!     scheduler::TokioScheduler,
//!     transport::HttpTransport,
//! };
//! use std::sync::Arc;
//!
//! let (service, handle) = DispatcherService::new(
//!     Arc::new(HttpTransport::default()),
//!     Arc::new(TokioScheduler),
//!     FailurePolicy::default(),
//! );
//! tokio::spawn(service.run());
//!
//! let logger = Logger::new(handle, LogConfig::from_env()?);
//! logger.install_panic_hook();
//! logger.log("started", Some("boot"));
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod logger;
pub mod scheduler;
pub mod transport;
