// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use anyhow::Context;
use std::{env, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use log_dispatch::{
    config::{FailurePolicy, LogConfig},
    constants::DEFAULT_REQUEST_TIMEOUT,
    dispatcher::DispatcherService,
    logger::Logger,
    scheduler::TokioScheduler,
    transport::HttpTransport,
};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("LOG_DISPATCH_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        // stdout carries the forwarded lines when system logging is on
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    if let Err(e) = run().await {
        error!("Log forwarder stopped: {e:#}");
    }
}

async fn run() -> anyhow::Result<()> {
    let config = LogConfig::from_env().context("invalid log dispatch configuration")?;
    let policy = FailurePolicy::from_env().context("invalid failure policy")?;
    let category = env::var("LOG_DISPATCH_CATEGORY").ok();

    let timeout = match env::var("LOG_DISPATCH_REQUEST_TIMEOUT_SECS") {
        Ok(secs) => Duration::from_secs(
            secs.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid request timeout '{secs}'"))?,
        ),
        Err(_) => DEFAULT_REQUEST_TIMEOUT,
    };
    let https_proxy = env::var("LOG_DISPATCH_PROXY_HTTPS")
        .or_else(|_| env::var("HTTPS_PROXY"))
        .ok();

    let transport = HttpTransport::new(timeout, https_proxy.as_deref())
        .context("unable to build HTTP transport")?;

    if config.endpoint.is_empty() {
        info!("LOG_DISPATCH_ENDPOINT is not set, lines will only be echoed locally");
    } else {
        info!("Forwarding standard input to {}", config.endpoint);
    }

    let (service, handle) =
        DispatcherService::new(Arc::new(transport), Arc::new(TokioScheduler), policy);
    let service_task = tokio::spawn(service.run());

    let logger = Logger::new(handle.clone(), config);
    logger.install_panic_hook();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => logger.log(&line, category.as_deref()),
                Ok(None) => {
                    debug!("Standard input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read standard input: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, flushing pending logs");
                break;
            }
        }
    }

    handle.shutdown();
    service_task
        .await
        .context("dispatcher task did not finish cleanly")?;
    Ok(())
}
