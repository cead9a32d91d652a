use crate::codec::account::{PlausibilityLimits, SubscriptionAccount};
use crate::core::connection::{with_timeout, SolConnection};
use crate::error::{DecodeError, MalformedReason, Result};
use crate::types::display;
use serde::Serialize;
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// A subscription that decoded and passed plausibility checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSubscription {
    pub address: Pubkey,
    pub account: SubscriptionAccount,
}

/// A program-owned account the codec refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedAccount {
    #[serde(with = "display")]
    pub address: Pubkey,
    pub reason: MalformedReason,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Program-owned accounts returned by the ledger.
    pub total: usize,
    pub subscriptions: Vec<ScannedSubscription>,
    pub malformed: Vec<MalformedAccount>,
}

/// Fetch every account owned by `program_id` and classify it.
///
/// Fails only when the fetch itself fails or outlasts `timeout`.
pub async fn scan_subscriptions(
    connection: &impl SolConnection,
    program_id: &Pubkey,
    limits: &PlausibilityLimits,
    timeout: Duration,
) -> Result<ScanReport> {
    let accounts = with_timeout(
        "get_program_accounts",
        timeout,
        connection.get_program_accounts(program_id),
    )
    .await?;

    tracing::debug!(count = accounts.len(), %program_id, "fetched program accounts");
    Ok(classify_accounts(accounts, limits))
}

/// Decode each account independently; a bad record never stops the scan.
pub fn classify_accounts(
    accounts: impl IntoIterator<Item = (Pubkey, Account)>,
    limits: &PlausibilityLimits,
) -> ScanReport {
    let mut report = ScanReport::default();

    for (address, account) in accounts {
        report.total += 1;
        match SubscriptionAccount::decode_checked(&account.data, limits) {
            Ok(subscription) => report.subscriptions.push(ScannedSubscription {
                address,
                account: subscription,
            }),
            Err(err) => {
                tracing::warn!(%address, reason = ?err.reason(), "skipping malformed account: {err}");
                report.malformed.push(malformed(address, err));
            },
        }
    }

    report
}

fn malformed(address: Pubkey, err: DecodeError) -> MalformedAccount {
    MalformedAccount {
        address,
        reason: err.reason(),
        detail: err.to_string(),
    }
}
