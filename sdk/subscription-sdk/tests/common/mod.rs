#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;
use subscription_sdk::{
    derive_subscription_pda, ChargeConfig, ChargeProcessor, KeypairSigner, SolConnection,
    SubscriptionAccount,
};
use tokio::sync::Mutex;

pub const DAY: i64 = 86_400;
pub const NOW: i64 = 1_760_000_000;

/// In-memory ledger that applies charges the way the billing program does.
pub struct MockLedger {
    pub program_id: Pubkey,
    accounts: Mutex<Vec<(Pubkey, Account)>>,
    submitted: Mutex<Vec<Transaction>>,
    /// Subscriptions whose charge is rejected on-chain.
    pub rejecting: HashSet<Pubkey>,
    /// Subscriptions whose confirmation never arrives.
    pub stalled: HashSet<Pubkey>,
    pub scan_unavailable: bool,
    /// The program-account scan never answers.
    pub scan_stalled: bool,
    /// Ledger clock written into `last_charge_timestamp`.
    pub clock: i64,
}

impl MockLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            rejecting: HashSet::new(),
            stalled: HashSet::new(),
            scan_unavailable: false,
            scan_stalled: false,
            clock: NOW,
        }
    }

    pub async fn insert_raw(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().await.push((
            address,
            Account {
                lamports: 2_400_000,
                data,
                owner: self.program_id,
                executable: false,
                rent_epoch: 0,
            },
        ));
    }

    /// Store `account` at its derived PDA and return the address.
    pub async fn insert(&self, account: SubscriptionAccount) -> Pubkey {
        let (address, _) =
            derive_subscription_pda(&self.program_id, &account.authority, &account.recipient);
        self.insert_raw(address, account.encode()).await;
        address
    }

    pub async fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().await.clone()
    }

    /// Subscription addresses referenced by submitted charge transactions.
    pub async fn charged_addresses(&self) -> Vec<Pubkey> {
        self.submitted
            .lock()
            .await
            .iter()
            .map(|tx| {
                let ix = &tx.message.instructions[0];
                tx.message.account_keys[ix.accounts[0] as usize]
            })
            .collect()
    }

    pub async fn stored(&self, address: &Pubkey) -> Option<SubscriptionAccount> {
        self.accounts
            .lock()
            .await
            .iter()
            .find(|(key, _)| key == address)
            .and_then(|(_, account)| SubscriptionAccount::decode(&account.data).ok())
    }
}

#[async_trait]
impl SolConnection for MockLedger {
    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, Box<dyn Error + Send + Sync>> {
        tx.verify()?;

        let ix = tx
            .message
            .instructions
            .first()
            .ok_or("transaction has no instructions")?;
        let subscription = tx.message.account_keys[ix.accounts[0] as usize];

        if self.stalled.contains(&subscription) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.rejecting.contains(&subscription) {
            return Err("custom program error: 0x1771".into());
        }

        let mut accounts = self.accounts.lock().await;
        let (_, stored) = accounts
            .iter_mut()
            .find(|(key, _)| *key == subscription)
            .ok_or("subscription account missing")?;
        let mut account = SubscriptionAccount::decode(&stored.data)?;
        account.last_charge_timestamp = self.clock;
        account.total_charged += account.amount_per_period;
        stored.data = account.encode();

        self.submitted.lock().await.push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Account>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .find(|(key, _)| key == pubkey)
            .map(|(_, account)| account.clone()))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, Box<dyn Error + Send + Sync>> {
        Ok(Hash::new_from_array([7u8; 32]))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
    ) -> Result<Vec<(Pubkey, Account)>, Box<dyn Error + Send + Sync>> {
        if self.scan_unavailable {
            return Err("connection refused".into());
        }
        if self.scan_stalled {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .cloned()
            .collect())
    }
}

pub fn subscription(
    is_active: bool,
    interval_seconds: i64,
    last_charge_timestamp: i64,
    expires_at: Option<i64>,
) -> SubscriptionAccount {
    SubscriptionAccount {
        authority: Pubkey::new_unique(),
        recipient: Pubkey::new_unique(),
        user_token_account: Pubkey::new_unique(),
        recipient_token_account: Pubkey::new_unique(),
        token_mint: Pubkey::new_unique(),
        amount_per_period: 9_990_000,
        interval_seconds,
        last_charge_timestamp,
        created_at: last_charge_timestamp,
        expires_at,
        is_active,
        total_charged: 9_990_000,
        bump: 255,
    }
}

pub fn processor(ledger: MockLedger) -> ChargeProcessor<MockLedger, KeypairSigner> {
    processor_with(ledger, 1)
}

pub fn processor_with(
    ledger: MockLedger,
    max_concurrent_charges: usize,
) -> ChargeProcessor<MockLedger, KeypairSigner> {
    let config = ChargeConfig {
        program_id: ledger.program_id,
        rpc_timeout: Duration::from_secs(5),
        max_concurrent_charges,
        ..ChargeConfig::default()
    };
    ChargeProcessor::new(ledger, KeypairSigner::new(Keypair::new()), config)
}
