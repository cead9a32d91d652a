use crate::codec::account::{PlausibilityLimits, SubscriptionAccount};
use crate::core::connection::SolConnection;
use crate::core::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, SUBSCRIPTION_SEED, TOKEN_PROGRAM_ID};
use crate::error::{Result, SubscriptionSdkError};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

//=============================================================================
// PDA Derivation Helpers
//=============================================================================

/// Derive the Subscription PDA from program ID, paying authority and merchant.
///
/// Seeds are `["subscription", authority, recipient]`, the same order the
/// program checks in every instruction context.
pub fn derive_subscription_pda(
    program_id: &Pubkey,
    authority: &Pubkey,
    recipient: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SUBSCRIPTION_SEED, authority.as_ref(), recipient.as_ref()],
        program_id,
    )
}

/// Derive the associated token account holding `mint` for `owner`.
pub fn derive_associated_token_address(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

/// Parse a base58 address.
pub fn parse_address(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| SubscriptionSdkError::InvalidAddress(value.into()))
}

//=============================================================================
// Account Fetching & Parsing
//=============================================================================

/// Fetch subscription account data from the blockchain
pub async fn fetch_subscription_account(
    connection: &impl SolConnection,
    address: &Pubkey,
) -> Result<Vec<u8>> {
    let account = connection
        .get_account(address)
        .await
        .map_err(|e| SubscriptionSdkError::Connection(e.to_string()))?
        .ok_or(SubscriptionSdkError::AccountNotFound(*address))?;

    Ok(account.data)
}

/// Fetch and fully validate a single subscription
pub async fn fetch_subscription(
    connection: &impl SolConnection,
    address: &Pubkey,
    limits: &PlausibilityLimits,
) -> Result<SubscriptionAccount> {
    let data = fetch_subscription_account(connection, address).await?;
    Ok(SubscriptionAccount::decode_checked(&data, limits)?)
}
