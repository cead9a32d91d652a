use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

// Default Program ID for Devnet
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("5MpaXq6rwiWfnpjR5THsa6TsLRMJ8jxgNYw3HH86yKwU");

pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA1knL");

pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const SUBSCRIPTION_ACCOUNT_NAME: &str = "Subscription";

/// Bytes allocated for a subscription by the program (`8 + INIT_SPACE`).
pub const SUBSCRIPTION_ACCOUNT_SPACE: usize = 219;

pub const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

/// 1,000,000 tokens at 6 decimals.
pub const DEFAULT_MAX_PLAUSIBLE_AMOUNT: u64 = 1_000_000_000_000;
