use crate::scanner::MalformedAccount;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Serialize addresses and signatures as their base58 text.
pub mod display {
    use serde::Serializer;
    use std::fmt::Display;

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}

/// A subscription charged and confirmed in this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargedSubscription {
    #[serde(with = "display")]
    pub address: Pubkey,
    #[serde(with = "display")]
    pub signature: Signature,
    pub amount: u64,
}

/// Why a well-formed subscription was not charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    Inactive,
    Expired {
        #[serde(rename = "expiredAt")]
        expired_at: i64,
    },
    NotReady {
        #[serde(rename = "remainingSeconds")]
        remaining_seconds: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSubscription {
    #[serde(with = "display")]
    pub address: Pubkey,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A charge that was attempted and failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCharge {
    #[serde(with = "display")]
    pub address: Pubkey,
    pub error: String,
}

/// Outcome of one batch run.
///
/// Every scanned account lands in exactly one bucket, so
/// `charged + skipped + errors + malformed == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub charged: Vec<ChargedSubscription>,
    pub skipped: Vec<SkippedSubscription>,
    pub errors: Vec<FailedCharge>,
    pub malformed: Vec<MalformedAccount>,
}

impl BatchReport {
    pub fn accounted(&self) -> usize {
        self.charged.len() + self.skipped.len() + self.errors.len() + self.malformed.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed {} subscriptions: {} charged, {} skipped, {} failed, {} malformed",
            self.total,
            self.charged.len(),
            self.skipped.len(),
            self.errors.len(),
            self.malformed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skip_reason_is_flattened_next_to_address() {
        let address = Pubkey::new_unique();
        let skipped = SkippedSubscription {
            address,
            reason: SkipReason::NotReady {
                remaining_seconds: 3_600,
            },
        };

        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({
                "address": address.to_string(),
                "reason": "not-ready",
                "remainingSeconds": 3_600,
            })
        );
    }

    #[test]
    fn test_summary_counts_every_bucket() {
        let report = BatchReport {
            total: 2,
            skipped: vec![SkippedSubscription {
                address: Pubkey::new_unique(),
                reason: SkipReason::Inactive,
            }],
            errors: vec![FailedCharge {
                address: Pubkey::new_unique(),
                error: "blockhash not found".into(),
            }],
            ..BatchReport::default()
        };

        assert_eq!(report.accounted(), 2);
        assert_eq!(
            report.summary(),
            "Processed 2 subscriptions: 0 charged, 1 skipped, 1 failed, 0 malformed"
        );
    }
}
