//! Recurring-charge batch processing.
//!
//! A run scans every account owned by the billing program, decides which
//! subscriptions are due, and submits one `charge_subscription` transaction
//! per due record, paid and signed by the merchant key. Failures are
//! recorded per record; only a failed scan aborts the run.

use crate::codec::account::PlausibilityLimits;
use crate::codec::instruction;
use crate::core::connection::{with_timeout, SolConnection};
use crate::core::constants::DEFAULT_PROGRAM_ID;
use crate::core::signer::ChargeSigner;
use crate::error::{Result, SubscriptionSdkError};
use crate::scanner::{scan_subscriptions, ScannedSubscription};
use crate::types::{BatchReport, ChargedSubscription, FailedCharge, SkipReason, SkippedSubscription};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

type ChargeOutcome = (ScannedSubscription, Result<Signature>);

#[derive(Debug, Clone)]
pub struct ChargeConfig {
    pub program_id: Pubkey,
    pub limits: PlausibilityLimits,
    /// Upper bound on each ledger call.
    pub rpc_timeout: Duration,
    /// Charges in flight at once; `1` processes records sequentially.
    pub max_concurrent_charges: usize,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            limits: PlausibilityLimits::default(),
            rpc_timeout: Duration::from_secs(30),
            max_concurrent_charges: 1,
        }
    }
}

/// Where a decoded subscription stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dueness {
    Due,
    Skip(SkipReason),
}

/// Order matters: inactive, then expired, then interval.
pub fn dueness(subscription: &ScannedSubscription, now: i64) -> Dueness {
    let account = &subscription.account;

    if !account.is_active {
        return Dueness::Skip(SkipReason::Inactive);
    }
    if let Some(expired_at) = account.expires_at.filter(|_| account.is_expired(now)) {
        return Dueness::Skip(SkipReason::Expired { expired_at });
    }
    match account.seconds_until_due(now) {
        0 => Dueness::Due,
        remaining_seconds => Dueness::Skip(SkipReason::NotReady { remaining_seconds }),
    }
}

pub struct ChargeProcessor<C, S> {
    connection: C,
    signer: S,
    config: ChargeConfig,
}

impl<C: SolConnection, S: ChargeSigner> ChargeProcessor<C, S> {
    pub fn new(connection: C, signer: S, config: ChargeConfig) -> Self {
        Self {
            connection,
            signer,
            config,
        }
    }

    pub fn config(&self) -> &ChargeConfig {
        &self.config
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Run one batch against the current wall clock.
    pub async fn run(&self) -> Result<BatchReport> {
        self.run_at(chrono::Utc::now().timestamp()).await
    }

    /// Run one batch as if the current time were `now` (unix seconds).
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: i64) -> Result<BatchReport> {
        tracing::debug!(program_id = %self.config.program_id, merchant = %self.signer.pubkey(), "scanning subscriptions");
        let scan = scan_subscriptions(
            &self.connection,
            &self.config.program_id,
            &self.config.limits,
            self.config.rpc_timeout,
        )
        .await?;

        let mut report = BatchReport {
            total: scan.total,
            malformed: scan.malformed,
            ..BatchReport::default()
        };

        let mut due = Vec::new();
        for subscription in scan.subscriptions {
            match dueness(&subscription, now) {
                Dueness::Due => due.push(subscription),
                Dueness::Skip(reason) => {
                    tracing::debug!(address = %subscription.address, ?reason, "not charging");
                    report.skipped.push(SkippedSubscription {
                        address: subscription.address,
                        reason,
                    });
                },
            }
        }

        tracing::info!(
            total = report.total,
            due = due.len(),
            skipped = report.skipped.len(),
            malformed = report.malformed.len(),
            "charging due subscriptions"
        );

        // Outcomes are gathered after the stream drains; no bucket is shared
        // between in-flight charges.
        let charges = due.into_iter().map(|subscription| self.charge_owned(subscription));
        let outcomes: Vec<ChargeOutcome> = stream::iter(charges)
            .buffer_unordered(self.config.max_concurrent_charges.max(1))
            .collect()
            .await;

        for (subscription, outcome) in outcomes {
            match outcome {
                Ok(signature) => {
                    tracing::info!(address = %subscription.address, %signature, amount = subscription.account.amount_per_period, "charged subscription");
                    report.charged.push(ChargedSubscription {
                        address: subscription.address,
                        signature,
                        amount: subscription.account.amount_per_period,
                    });
                },
                Err(err) => {
                    tracing::error!(address = %subscription.address, "charge failed: {err}");
                    report.errors.push(FailedCharge {
                        address: subscription.address,
                        error: err.to_string(),
                    });
                },
            }
        }

        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Build, sign and submit the charge for one due subscription.
    pub async fn charge(&self, subscription: &ScannedSubscription) -> Result<Signature> {
        let ix = instruction::charge_subscription(
            &self.config.program_id,
            &subscription.address,
            &subscription.account,
        )?;

        let recent_blockhash = self
            .with_timeout("get_latest_blockhash", self.connection.get_latest_blockhash())
            .await?;

        let payer = self.signer.pubkey();
        let mut tx = Transaction::new_unsigned(Message::new(&[ix], Some(&payer)));
        tx.message.recent_blockhash = recent_blockhash;

        let signature = self
            .signer
            .sign_message(&tx.message_data())
            .await
            .map_err(SubscriptionSdkError::Signing)?;
        tx.signatures = vec![signature];

        self.with_timeout(
            "send_and_confirm_transaction",
            self.connection.send_and_confirm_transaction(&tx),
        )
        .await
    }

    // Boxed so the batch future stays `Send` when spawned.
    fn charge_owned(&self, subscription: ScannedSubscription) -> BoxFuture<'_, ChargeOutcome> {
        Box::pin(async move {
            let outcome = self.charge(&subscription).await;
            (subscription, outcome)
        })
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, Box<dyn Error + Send + Sync>>>,
    {
        with_timeout(operation, self.config.rpc_timeout, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::account::SubscriptionAccount;

    const DAY: i64 = 86_400;

    fn scanned(is_active: bool, interval: i64, last: i64, expires_at: Option<i64>) -> ScannedSubscription {
        ScannedSubscription {
            address: Pubkey::new_unique(),
            account: SubscriptionAccount {
                authority: Pubkey::new_unique(),
                recipient: Pubkey::new_unique(),
                user_token_account: Pubkey::new_unique(),
                recipient_token_account: Pubkey::new_unique(),
                token_mint: Pubkey::new_unique(),
                amount_per_period: 1_000_000,
                interval_seconds: interval,
                last_charge_timestamp: last,
                created_at: 0,
                expires_at,
                is_active,
                total_charged: 0,
                bump: 255,
            },
        }
    }

    #[test]
    fn test_inactive_wins_over_everything() {
        let now = 100 * DAY;
        let sub = scanned(false, DAY, 0, Some(1));
        assert_eq!(dueness(&sub, now), Dueness::Skip(SkipReason::Inactive));
    }

    #[test]
    fn test_forty_days_after_thirty_day_interval_is_due() {
        let now = 1_750_000_000;
        let sub = scanned(true, 2_592_000, now - 3_456_000, None);
        assert_eq!(dueness(&sub, now), Dueness::Due);
    }

    #[test]
    fn test_not_ready_reports_remaining() {
        let now = 1_750_000_000;
        let sub = scanned(true, 30 * DAY, now - 10 * DAY, None);
        assert_eq!(
            dueness(&sub, now),
            Dueness::Skip(SkipReason::NotReady {
                remaining_seconds: 20 * DAY
            })
        );
    }

    #[test]
    fn test_exactly_one_interval_is_due() {
        let sub = scanned(true, DAY, 0, None);
        assert_eq!(dueness(&sub, DAY), Dueness::Due);
    }

    #[test]
    fn test_expired_is_skipped() {
        let sub = scanned(true, DAY, 0, Some(5 * DAY));
        assert_eq!(
            dueness(&sub, 5 * DAY),
            Dueness::Skip(SkipReason::Expired {
                expired_at: 5 * DAY
            })
        );
        assert_eq!(dueness(&sub, 5 * DAY - 1), Dueness::Due);
    }
}
