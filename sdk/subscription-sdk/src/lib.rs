pub mod charge;
pub mod codec;
pub mod core;
pub mod error;
pub mod scanner;
pub mod types;
pub mod utils;

pub use crate::charge::{dueness, ChargeConfig, ChargeProcessor, Dueness};
pub use crate::codec::{InitializeArgs, PlausibilityLimits, SubscriptionAccount, UpdateArgs};
pub use crate::core::connection::SolConnection;
pub use crate::core::signer::{ChargeSigner, KeypairSigner};
pub use crate::error::{DecodeError, MalformedReason, Result, SubscriptionSdkError};
pub use crate::scanner::{classify_accounts, scan_subscriptions, ScanReport, ScannedSubscription};
pub use crate::types::{BatchReport, ChargedSubscription, FailedCharge, SkipReason, SkippedSubscription};
pub use crate::utils::{
    derive_associated_token_address, derive_subscription_pda, fetch_subscription,
    fetch_subscription_account, parse_address,
};
