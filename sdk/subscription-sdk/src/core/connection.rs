use crate::error::{Result as SdkResult, SubscriptionSdkError};
use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// Ledger access used by the scanner and the charge processor.
#[async_trait]
pub trait SolConnection: Send + Sync {
    /// Submit a signed transaction and wait until it is confirmed.
    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, Box<dyn Error + Send + Sync>>;
    async fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Account>, Box<dyn Error + Send + Sync>>;
    async fn get_latest_blockhash(&self) -> Result<Hash, Box<dyn Error + Send + Sync>>;
    /// Every account owned by `program_id`, unfiltered.
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> Result<Vec<(Pubkey, Account)>, Box<dyn Error + Send + Sync>>;
}

/// Bound one ledger call by `timeout`, naming it in the resulting error.
pub async fn with_timeout<T, F>(operation: &'static str, timeout: Duration, call: F) -> SdkResult<T>
where
    F: Future<Output = Result<T, Box<dyn Error + Send + Sync>>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SubscriptionSdkError::Connection(format!("{operation}: {e}"))),
        Err(_) => Err(SubscriptionSdkError::Timeout {
            operation,
            after: timeout,
        }),
    }
}
