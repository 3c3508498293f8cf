// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Defaults and limits shared by the dispatcher and its configuration.

use std::time::Duration;

/// Number of consecutive failed sends after which the dispatcher stops sending.
pub const MAX_FAILURES: u32 = 3;

/// How long events are buffered before a delay-triggered flush.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(1000);

/// Number of buffered events that forces a flush while the delay timer is armed.
pub const DEFAULT_SEND_CAPACITY: usize = 128;

/// Per-request timeout of the HTTP transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
