use super::discriminator::{subscription_discriminator, DISCRIMINATOR_LEN};
use super::layout::{self, Field, FieldKind, FieldReader, FieldValue, FieldWriter};
use crate::core::constants::{
    DEFAULT_MAX_PLAUSIBLE_AMOUNT, SECONDS_PER_YEAR, SUBSCRIPTION_ACCOUNT_SPACE,
};
use crate::error::DecodeError;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Storage layout of the `Subscription` account after its discriminator.
pub const SUBSCRIPTION_FIELDS: [Field; 13] = [
    Field::new("authority", FieldKind::Pubkey),
    Field::new("recipient", FieldKind::Pubkey),
    Field::new("user_token_account", FieldKind::Pubkey),
    Field::new("recipient_token_account", FieldKind::Pubkey),
    Field::new("token_mint", FieldKind::Pubkey),
    Field::new("amount_per_period", FieldKind::U64),
    Field::new("interval_seconds", FieldKind::I64),
    Field::new("last_charge_timestamp", FieldKind::I64),
    Field::new("created_at", FieldKind::I64),
    Field::new("expires_at", FieldKind::OptionI64),
    Field::new("is_active", FieldKind::Bool),
    Field::new("total_charged", FieldKind::U64),
    Field::new("bump", FieldKind::U8),
];

/// Shortest buffer that can hold a subscription (no expiry).
pub const MIN_SUBSCRIPTION_LEN: usize = DISCRIMINATOR_LEN + layout::min_len(&SUBSCRIPTION_FIELDS);

/// Buffer length when an expiry is stored.
pub const MAX_SUBSCRIPTION_LEN: usize = DISCRIMINATOR_LEN + layout::max_len(&SUBSCRIPTION_FIELDS);

const _: () = assert!(MAX_SUBSCRIPTION_LEN == SUBSCRIPTION_ACCOUNT_SPACE);

/// Decoded `Subscription` account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionAccount {
    pub authority: Pubkey,
    pub recipient: Pubkey,
    pub user_token_account: Pubkey,
    pub recipient_token_account: Pubkey,
    pub token_mint: Pubkey,
    pub amount_per_period: u64,
    pub interval_seconds: i64,
    pub last_charge_timestamp: i64,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub is_active: bool,
    pub total_charged: u64,
    pub bump: u8,
}

/// Sanity bounds applied to records read from a public scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlausibilityLimits {
    pub max_amount: u64,
    pub max_interval_seconds: i64,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            max_amount: DEFAULT_MAX_PLAUSIBLE_AMOUNT,
            max_interval_seconds: SECONDS_PER_YEAR,
        }
    }
}

impl SubscriptionAccount {
    /// Decode raw account data: size, then discriminator, then fields in
    /// declaration order. No plausibility checks.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_SUBSCRIPTION_LEN {
            return Err(DecodeError::TooSmall {
                len: data.len(),
                min: MIN_SUBSCRIPTION_LEN,
            });
        }

        let mut found = [0u8; DISCRIMINATOR_LEN];
        found.copy_from_slice(&data[..DISCRIMINATOR_LEN]);
        if &found != subscription_discriminator() {
            return Err(DecodeError::WrongDiscriminator { found });
        }

        let values = FieldReader::at(data, DISCRIMINATOR_LEN).read_all(&SUBSCRIPTION_FIELDS)?;
        Self::from_values(&values)
    }

    /// [`decode`](Self::decode) followed by [`validate`](Self::validate).
    pub fn decode_checked(data: &[u8], limits: &PlausibilityLimits) -> Result<Self, DecodeError> {
        let account = Self::decode(data)?;
        account.validate(limits)?;
        Ok(account)
    }

    pub fn validate(&self, limits: &PlausibilityLimits) -> Result<(), DecodeError> {
        if self.amount_per_period == 0 || self.amount_per_period > limits.max_amount {
            return Err(garbage(
                "amount_per_period",
                format!("{} outside 1..={}", self.amount_per_period, limits.max_amount),
            ));
        }
        if self.total_charged > limits.max_amount {
            return Err(garbage(
                "total_charged",
                format!("{} above {}", self.total_charged, limits.max_amount),
            ));
        }
        if self.interval_seconds <= 0 || self.interval_seconds > limits.max_interval_seconds {
            return Err(garbage(
                "interval_seconds",
                format!(
                    "{} outside 1..={}",
                    self.interval_seconds, limits.max_interval_seconds
                ),
            ));
        }
        Ok(())
    }

    /// Account storage bytes, zero padded to the program's allocated space.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = FieldWriter::with_prefix(subscription_discriminator());
        let written = writer.write_all(&SUBSCRIPTION_FIELDS, &self.to_values());
        debug_assert!(written.is_ok(), "to_values out of step with SUBSCRIPTION_FIELDS: {written:?}");
        let mut bytes = writer.into_bytes();
        bytes.resize(SUBSCRIPTION_ACCOUNT_SPACE, 0);
        bytes
    }

    pub fn to_values(&self) -> [FieldValue; 13] {
        [
            FieldValue::Pubkey(self.authority),
            FieldValue::Pubkey(self.recipient),
            FieldValue::Pubkey(self.user_token_account),
            FieldValue::Pubkey(self.recipient_token_account),
            FieldValue::Pubkey(self.token_mint),
            FieldValue::U64(self.amount_per_period),
            FieldValue::I64(self.interval_seconds),
            FieldValue::I64(self.last_charge_timestamp),
            FieldValue::I64(self.created_at),
            FieldValue::OptionI64(self.expires_at),
            FieldValue::Bool(self.is_active),
            FieldValue::U64(self.total_charged),
            FieldValue::U8(self.bump),
        ]
    }

    fn from_values(values: &[FieldValue]) -> Result<Self, DecodeError> {
        use FieldValue as V;

        let [
            V::Pubkey(authority),
            V::Pubkey(recipient),
            V::Pubkey(user_token_account),
            V::Pubkey(recipient_token_account),
            V::Pubkey(token_mint),
            V::U64(amount_per_period),
            V::I64(interval_seconds),
            V::I64(last_charge_timestamp),
            V::I64(created_at),
            V::OptionI64(expires_at),
            V::Bool(is_active),
            V::U64(total_charged),
            V::U8(bump),
        ] = *values
        else {
            return Err(garbage("subscription", "field list out of layout order".into()));
        };

        Ok(Self {
            authority,
            recipient,
            user_token_account,
            recipient_token_account,
            token_mint,
            amount_per_period,
            interval_seconds,
            last_charge_timestamp,
            created_at,
            expires_at,
            is_active,
            total_charged,
            bump,
        })
    }

    /// Whether an expiry is set and has been reached at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Seconds until the next charge is permitted; `0` when due.
    pub fn seconds_until_due(&self, now: i64) -> i64 {
        let elapsed = now.saturating_sub(self.last_charge_timestamp);
        self.interval_seconds.saturating_sub(elapsed).max(0)
    }
}

fn garbage(field: &'static str, reason: String) -> DecodeError {
    DecodeError::GarbageValue { field, reason }
}
