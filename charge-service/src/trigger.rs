//! The externally reachable "run charges now" entry point.
//!
//! Order of checks: rate limit, then configuration, then the batch itself.
//! At most one batch runs at a time; a trigger arriving mid-run is turned
//! away rather than queued.
//! Responses are plain values; framing them for a transport is up to the
//! caller.

use crate::config::ConfigError;
use crate::rate_limit::TriggerRateLimiter;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use subscription_sdk::{BatchReport, ChargeProcessor, ChargeSigner, SolConnection};
use tokio::sync::Mutex;

pub const STATUS_OK: u16 = 200;
pub const STATUS_RUN_IN_PROGRESS: u16 = 409;
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const STATUS_CONFIG_ERROR: u16 = 500;
pub const STATUS_LEDGER_UNAVAILABLE: u16 = 502;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BatchReport>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResponse {
    pub status: u16,
    /// Mirrors `body.retry_after` for a `Retry-After` header.
    pub retry_after_secs: Option<u64>,
    pub body: TriggerBody,
}

impl TriggerResponse {
    fn failure(status: u16, message: String) -> Self {
        Self {
            status,
            retry_after_secs: None,
            body: TriggerBody {
                success: false,
                results: None,
                message,
                retry_after: None,
            },
        }
    }

    fn throttled(retry_after_secs: u64) -> Self {
        let mut response = Self::failure(
            STATUS_TOO_MANY_REQUESTS,
            format!("Too many requests. Try again in {retry_after_secs} seconds."),
        );
        response.retry_after_secs = Some(retry_after_secs);
        response.body.retry_after = Some(retry_after_secs);
        response
    }

    fn completed(report: BatchReport) -> Self {
        Self {
            status: STATUS_OK,
            retry_after_secs: None,
            body: TriggerBody {
                success: true,
                message: report.summary(),
                results: Some(report),
                retry_after: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

pub struct ChargeTrigger<C, S> {
    limiter: Arc<TriggerRateLimiter>,
    processor: Result<ChargeProcessor<C, S>, ConfigError>,
    run_lock: Mutex<()>,
}

impl<C: SolConnection, S: ChargeSigner> ChargeTrigger<C, S> {
    /// A misconfigured processor is kept as its error so every trigger can
    /// report it instead of the process refusing to start.
    pub fn new(
        limiter: Arc<TriggerRateLimiter>,
        processor: Result<ChargeProcessor<C, S>, ConfigError>,
    ) -> Self {
        Self {
            limiter,
            processor,
            run_lock: Mutex::new(()),
        }
    }

    pub fn limiter(&self) -> &Arc<TriggerRateLimiter> {
        &self.limiter
    }

    pub fn processor(&self) -> Result<&ChargeProcessor<C, S>, &ConfigError> {
        self.processor.as_ref()
    }

    pub async fn handle(&self, caller: IpAddr) -> TriggerResponse {
        let decision = self.limiter.check(caller);
        if !decision.allowed {
            let retry_after = decision.retry_after_secs.unwrap_or(1);
            tracing::warn!(%caller, retry_after, "charge trigger throttled");
            return TriggerResponse::throttled(retry_after);
        }

        let processor = match &self.processor {
            Ok(processor) => processor,
            Err(err) => {
                tracing::error!(%caller, "charge trigger rejected: {err}");
                return TriggerResponse::failure(
                    STATUS_CONFIG_ERROR,
                    format!("Service misconfigured: {err}"),
                );
            },
        };

        let Ok(_running) = self.run_lock.try_lock() else {
            tracing::warn!(%caller, "charge trigger refused: a run is already in progress");
            return TriggerResponse::failure(
                STATUS_RUN_IN_PROGRESS,
                "A charge run is already in progress".into(),
            );
        };

        tracing::info!(%caller, "charge trigger accepted");
        match processor.run().await {
            Ok(report) => TriggerResponse::completed(report),
            Err(err) => {
                tracing::error!(%caller, "charge run aborted: {err}");
                TriggerResponse::failure(
                    STATUS_LEDGER_UNAVAILABLE,
                    format!("Failed to scan subscriptions: {err}"),
                )
            },
        }
    }
}
