use super::discriminator::{instruction_discriminator, Discriminator};
use super::layout::{Field, FieldKind, FieldValue, FieldWriter};
use crate::codec::account::SubscriptionAccount;
use crate::core::constants::TOKEN_PROGRAM_ID;
use crate::error::{Result, SubscriptionSdkError};
use crate::utils::{derive_associated_token_address, derive_subscription_pda};
use once_cell::sync::Lazy;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

/// Billing program instructions this client can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionInstruction {
    Initialize,
    Charge,
    Cancel,
    Update,
    Cleanup,
}

pub const INITIALIZE_ARGS: [Field; 3] = [
    Field::new("amount_per_period", FieldKind::U64),
    Field::new("interval_seconds", FieldKind::I64),
    Field::new("expires_at", FieldKind::OptionI64),
];

pub const UPDATE_ARGS: [Field; 3] = [
    Field::new("new_amount", FieldKind::OptionU64),
    Field::new("new_interval", FieldKind::OptionI64),
    Field::new("new_expires_at", FieldKind::OptionI64),
];

const NO_ARGS: [Field; 0] = [];

static DISCRIMINATORS: Lazy<[Discriminator; 5]> = Lazy::new(|| {
    [
        SubscriptionInstruction::Initialize,
        SubscriptionInstruction::Charge,
        SubscriptionInstruction::Cancel,
        SubscriptionInstruction::Update,
        SubscriptionInstruction::Cleanup,
    ]
    .map(|ix| instruction_discriminator(ix.name()))
});

impl SubscriptionInstruction {
    pub const fn name(self) -> &'static str {
        match self {
            SubscriptionInstruction::Initialize => "initialize_subscription",
            SubscriptionInstruction::Charge => "charge_subscription",
            SubscriptionInstruction::Cancel => "cancel_subscription",
            SubscriptionInstruction::Update => "update_subscription",
            SubscriptionInstruction::Cleanup => "cleanup_subscription",
        }
    }

    pub fn args(self) -> &'static [Field] {
        match self {
            SubscriptionInstruction::Initialize => &INITIALIZE_ARGS,
            SubscriptionInstruction::Update => &UPDATE_ARGS,
            SubscriptionInstruction::Charge
            | SubscriptionInstruction::Cancel
            | SubscriptionInstruction::Cleanup => &NO_ARGS,
        }
    }

    pub fn discriminator(self) -> &'static Discriminator {
        &DISCRIMINATORS[self as usize]
    }

    /// Discriminator followed by `values` laid out per [`args`](Self::args).
    pub fn encode(self, values: &[FieldValue]) -> Result<Vec<u8>> {
        let mut writer = FieldWriter::with_prefix(self.discriminator());
        writer
            .write_all(self.args(), values)
            .map_err(SubscriptionSdkError::Encode)?;
        Ok(writer.into_bytes())
    }
}

/// Arguments of `initialize_subscription`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeArgs {
    pub amount_per_period: u64,
    pub interval_seconds: i64,
    pub expires_at: Option<i64>,
}

impl InitializeArgs {
    pub fn to_values(&self) -> [FieldValue; 3] {
        [
            FieldValue::U64(self.amount_per_period),
            FieldValue::I64(self.interval_seconds),
            FieldValue::OptionI64(self.expires_at),
        ]
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        SubscriptionInstruction::Initialize.encode(&self.to_values())
    }
}

/// Arguments of `update_subscription`; `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateArgs {
    pub new_amount: Option<u64>,
    pub new_interval: Option<i64>,
    pub new_expires_at: Option<i64>,
}

impl UpdateArgs {
    pub fn to_values(&self) -> [FieldValue; 3] {
        [
            FieldValue::OptionU64(self.new_amount),
            FieldValue::OptionI64(self.new_interval),
            FieldValue::OptionI64(self.new_expires_at),
        ]
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        SubscriptionInstruction::Update.encode(&self.to_values())
    }
}

/// Creates the subscription PDA for `authority` → `recipient`, deriving both
/// associated token accounts from `token_mint`.
pub fn initialize_subscription(
    program_id: &Pubkey,
    authority: &Pubkey,
    recipient: &Pubkey,
    token_mint: &Pubkey,
    payer: &Pubkey,
    args: &InitializeArgs,
) -> Result<Instruction> {
    let (subscription, _) = derive_subscription_pda(program_id, authority, recipient);
    let user_token_account = derive_associated_token_address(token_mint, authority);
    let recipient_token_account = derive_associated_token_address(token_mint, recipient);

    let accounts = vec![
        AccountMeta::new(subscription, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(*recipient, false),
        AccountMeta::new(user_token_account, false),
        AccountMeta::new_readonly(recipient_token_account, false),
        AccountMeta::new_readonly(*token_mint, false),
        AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: args.encode()?,
    })
}

/// Pulls one period's amount. Needs no signer besides the fee payer.
pub fn charge_subscription(
    program_id: &Pubkey,
    subscription: &Pubkey,
    account: &SubscriptionAccount,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*subscription, false),
        AccountMeta::new(account.user_token_account, false),
        AccountMeta::new(account.recipient_token_account, false),
        AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: SubscriptionInstruction::Charge.encode(&[])?,
    })
}

pub fn cancel_subscription(
    program_id: &Pubkey,
    subscription: &Pubkey,
    authority: &Pubkey,
    user_token_account: &Pubkey,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*subscription, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*user_token_account, false),
        AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: SubscriptionInstruction::Cancel.encode(&[])?,
    })
}

pub fn update_subscription(
    program_id: &Pubkey,
    subscription: &Pubkey,
    authority: &Pubkey,
    args: &UpdateArgs,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*subscription, false),
        AccountMeta::new_readonly(*authority, true),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: args.encode()?,
    })
}

/// Closes an inactive subscription; rent goes back to `authority`.
pub fn cleanup_subscription(
    program_id: &Pubkey,
    subscription: &Pubkey,
    authority: &Pubkey,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*subscription, false),
        AccountMeta::new(*authority, true),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: SubscriptionInstruction::Cleanup.encode(&[])?,
    })
}
