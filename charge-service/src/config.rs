//! Environment-driven service configuration.
//!
//! Everything is read once at start. Tests pass a lookup closure instead of
//! touching the process environment.

use crate::rate_limit::RateLimitConfig;
use crate::rpc::RpcConnection;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use subscription_sdk::core::constants::{DEFAULT_MAX_PLAUSIBLE_AMOUNT, SECONDS_PER_YEAR};
use subscription_sdk::{
    parse_address, ChargeConfig, ChargeProcessor, KeypairSigner, PlausibilityLimits, SolConnection,
};
use thiserror::Error;
use zeroize::Zeroizing;

pub const PROGRAM_ID_VAR: &str = "SUBSCRIPTION_PROGRAM_ID";
pub const MERCHANT_SECRET_VAR: &str = "MERCHANT_SECRET_KEY";
pub const RPC_URL_VAR: &str = "RPC_URL";
pub const RPC_TIMEOUT_VAR: &str = "RPC_TIMEOUT_SECS";
pub const CONCURRENCY_VAR: &str = "CHARGE_CONCURRENCY";
pub const MAX_AMOUNT_VAR: &str = "MAX_PLAUSIBLE_AMOUNT";
pub const RATE_WINDOW_VAR: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_MAX_VAR: &str = "RATE_LIMIT_MAX_REQUESTS";

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Longest accepted throttling window (one day).
pub const MAX_RATE_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// Never carries any part of the secret itself.
    #[error("MERCHANT_SECRET_KEY is unusable: {0}")]
    InvalidCredential(&'static str),
}

/// Settings for the charging side of the service.
pub struct ServiceConfig {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub rpc_timeout: Duration,
    pub max_concurrent_charges: usize,
    pub max_plausible_amount: u64,
    merchant: Keypair,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("rpc_url", &self.rpc_url)
            .field("program_id", &self.program_id)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("max_concurrent_charges", &self.max_concurrent_charges)
            .field("max_plausible_amount", &self.max_plausible_amount)
            .field("merchant", &self.merchant.pubkey())
            .finish()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let program_id = required(&lookup, PROGRAM_ID_VAR)?;
        let program_id = parse_address(&program_id).map_err(|e| ConfigError::Invalid {
            var: PROGRAM_ID_VAR,
            reason: e.to_string(),
        })?;

        let merchant = Zeroizing::new(required(&lookup, MERCHANT_SECRET_VAR)?);
        let merchant = decode_keypair(&merchant)?;

        let rpc_timeout_secs: u64 = parsed(&lookup, RPC_TIMEOUT_VAR, 30)?;
        let max_concurrent_charges: usize = parsed(&lookup, CONCURRENCY_VAR, 1)?;
        let max_plausible_amount: u64 = parsed(&lookup, MAX_AMOUNT_VAR, DEFAULT_MAX_PLAUSIBLE_AMOUNT)?;
        positive(RPC_TIMEOUT_VAR, rpc_timeout_secs)?;
        positive(CONCURRENCY_VAR, max_concurrent_charges as u64)?;
        positive(MAX_AMOUNT_VAR, max_plausible_amount)?;

        Ok(Self {
            rpc_url: lookup(RPC_URL_VAR).unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            program_id,
            rpc_timeout: Duration::from_secs(rpc_timeout_secs),
            max_concurrent_charges,
            max_plausible_amount,
            merchant,
        })
    }

    pub fn merchant_pubkey(&self) -> Pubkey {
        self.merchant.pubkey()
    }

    pub fn charge_config(&self) -> ChargeConfig {
        ChargeConfig {
            program_id: self.program_id,
            limits: PlausibilityLimits {
                max_amount: self.max_plausible_amount,
                max_interval_seconds: SECONDS_PER_YEAR,
            },
            rpc_timeout: self.rpc_timeout,
            max_concurrent_charges: self.max_concurrent_charges,
        }
    }

    /// Hand the merchant key to a processor over `connection`.
    pub fn into_processor<C: SolConnection>(self, connection: C) -> ChargeProcessor<C, KeypairSigner> {
        let config = self.charge_config();
        ChargeProcessor::new(connection, KeypairSigner::new(self.merchant), config)
    }

    /// Processor over the configured RPC endpoint.
    pub fn connect(self) -> ChargeProcessor<RpcConnection, KeypairSigner> {
        let connection = RpcConnection::new(self.rpc_url.clone(), self.rpc_timeout);
        self.into_processor(connection)
    }
}

/// Trigger throttling settings; defaults apply when unset.
pub fn rate_limit_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RateLimitConfig, ConfigError> {
    let window_secs: u64 = parsed(&lookup, RATE_WINDOW_VAR, 60)?;
    let max_requests: u32 = parsed(&lookup, RATE_MAX_VAR, 3)?;
    positive(RATE_WINDOW_VAR, window_secs)?;
    positive(RATE_MAX_VAR, u64::from(max_requests))?;
    if window_secs > MAX_RATE_WINDOW_SECS {
        return Err(ConfigError::Invalid {
            var: RATE_WINDOW_VAR,
            reason: format!("must be at most {MAX_RATE_WINDOW_SECS} seconds"),
        });
    }
    Ok(RateLimitConfig::new(max_requests, window_secs))
}

pub fn rate_limit_from_env() -> Result<RateLimitConfig, ConfigError> {
    rate_limit_from_lookup(|name| std::env::var(name).ok())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<String, ConfigError> {
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

fn positive(var: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}

fn decode_keypair(encoded: &str) -> Result<Keypair, ConfigError> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded)
            .map_err(|_| ConfigError::InvalidCredential("not valid base64"))?,
    );
    Keypair::try_from(&bytes[..])
        .map_err(|_| ConfigError::InvalidCredential("expected a 64-byte ed25519 keypair"))
}
