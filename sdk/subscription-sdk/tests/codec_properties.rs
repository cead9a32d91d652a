//! Codec behaviour on arbitrary and Borsh-produced bytes.

mod common;
use common::*;

use borsh::BorshSerialize;
use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;
use subscription_sdk::codec::account::MAX_SUBSCRIPTION_LEN;
use subscription_sdk::codec::discriminator::{account_discriminator, instruction_discriminator};
use subscription_sdk::codec::MIN_SUBSCRIPTION_LEN;
use subscription_sdk::{
    fetch_subscription, DecodeError, InitializeArgs, PlausibilityLimits, SubscriptionAccount,
    SubscriptionSdkError, UpdateArgs,
};

/// Mirror of the on-chain struct, serialized the way the program stores it.
#[derive(BorshSerialize)]
struct BorshSubscription {
    authority: [u8; 32],
    recipient: [u8; 32],
    user_token_account: [u8; 32],
    recipient_token_account: [u8; 32],
    token_mint: [u8; 32],
    amount_per_period: u64,
    interval_seconds: i64,
    last_charge_timestamp: i64,
    created_at: i64,
    expires_at: Option<i64>,
    is_active: bool,
    total_charged: u64,
    bump: u8,
}

#[derive(BorshSerialize)]
struct BorshInitializeArgs {
    amount_per_period: u64,
    interval_seconds: i64,
    expires_at: Option<i64>,
}

#[derive(BorshSerialize)]
struct BorshUpdateArgs {
    new_amount: Option<u64>,
    new_interval: Option<i64>,
    new_expires_at: Option<i64>,
}

fn borsh_account(account: &SubscriptionAccount) -> Vec<u8> {
    let mirror = BorshSubscription {
        authority: account.authority.to_bytes(),
        recipient: account.recipient.to_bytes(),
        user_token_account: account.user_token_account.to_bytes(),
        recipient_token_account: account.recipient_token_account.to_bytes(),
        token_mint: account.token_mint.to_bytes(),
        amount_per_period: account.amount_per_period,
        interval_seconds: account.interval_seconds,
        last_charge_timestamp: account.last_charge_timestamp,
        created_at: account.created_at,
        expires_at: account.expires_at,
        is_active: account.is_active,
        total_charged: account.total_charged,
        bump: account.bump,
    };
    let mut data = account_discriminator("Subscription").to_vec();
    data.extend(borsh::to_vec(&mirror).unwrap());
    data
}

fn arb_pubkey() -> impl Strategy<Value = Pubkey> {
    any::<[u8; 32]>().prop_map(Pubkey::new_from_array)
}

prop_compose! {
    fn arb_account()(
        keys in prop::array::uniform5(arb_pubkey()),
        amount_per_period in any::<u64>(),
        interval_seconds in any::<i64>(),
        last_charge_timestamp in any::<i64>(),
        created_at in any::<i64>(),
        expires_at in any::<Option<i64>>(),
        is_active in any::<bool>(),
        total_charged in any::<u64>(),
        bump in any::<u8>(),
    ) -> SubscriptionAccount {
        SubscriptionAccount {
            authority: keys[0],
            recipient: keys[1],
            user_token_account: keys[2],
            recipient_token_account: keys[3],
            token_mint: keys[4],
            amount_per_period,
            interval_seconds,
            last_charge_timestamp,
            created_at,
            expires_at,
            is_active,
            total_charged,
            bump,
        }
    }
}

proptest! {
    #[test]
    fn decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let _ = SubscriptionAccount::decode(&data);
        let _ = SubscriptionAccount::decode_checked(&data, &PlausibilityLimits::default());
    }

    #[test]
    fn decode_after_valid_discriminator_never_panics(tail in prop::collection::vec(any::<u8>(), 0..260)) {
        let mut data = account_discriminator("Subscription").to_vec();
        data.extend(tail);
        match SubscriptionAccount::decode(&data) {
            Ok(_) => prop_assert!(data.len() >= MIN_SUBSCRIPTION_LEN),
            Err(DecodeError::TooSmall { len, min }) => {
                prop_assert_eq!(min, MIN_SUBSCRIPTION_LEN);
                prop_assert_eq!(len, data.len());
            },
            Err(DecodeError::WrongDiscriminator { .. }) => prop_assert!(false, "discriminator was valid"),
            Err(DecodeError::GarbageValue { .. }) => {},
        }
    }

    #[test]
    fn borsh_written_accounts_decode(account in arb_account()) {
        let data = borsh_account(&account);
        prop_assert!(data.len() <= MAX_SUBSCRIPTION_LEN);
        prop_assert_eq!(SubscriptionAccount::decode(&data), Ok(account));
        prop_assert_eq!(&account.encode()[..data.len()], &data[..]);
    }

    #[test]
    fn initialize_args_match_borsh(
        amount_per_period in any::<u64>(),
        interval_seconds in any::<i64>(),
        expires_at in any::<Option<i64>>(),
    ) {
        let args = InitializeArgs { amount_per_period, interval_seconds, expires_at };
        let mut expected = instruction_discriminator("initialize_subscription").to_vec();
        expected.extend(
            borsh::to_vec(&BorshInitializeArgs { amount_per_period, interval_seconds, expires_at }).unwrap(),
        );
        prop_assert_eq!(args.encode().unwrap(), expected);
    }

    #[test]
    fn update_args_match_borsh(
        new_amount in any::<Option<u64>>(),
        new_interval in any::<Option<i64>>(),
        new_expires_at in any::<Option<i64>>(),
    ) {
        let args = UpdateArgs { new_amount, new_interval, new_expires_at };
        let mut expected = instruction_discriminator("update_subscription").to_vec();
        expected.extend(
            borsh::to_vec(&BorshUpdateArgs { new_amount, new_interval, new_expires_at }).unwrap(),
        );
        prop_assert_eq!(args.encode().unwrap(), expected);
    }
}

#[test]
fn test_initialize_args_land_in_account_storage() {
    let args = InitializeArgs {
        amount_per_period: 9_990_000,
        interval_seconds: 2_592_000,
        expires_at: Some(NOW + 365 * DAY),
    };

    let mut account = subscription(true, args.interval_seconds, NOW, args.expires_at);
    account.amount_per_period = args.amount_per_period;
    account.total_charged = args.amount_per_period;

    let decoded = SubscriptionAccount::decode_checked(&borsh_account(&account), &PlausibilityLimits::default())
        .unwrap();
    assert_eq!(decoded.amount_per_period, args.amount_per_period);
    assert_eq!(decoded.interval_seconds, args.interval_seconds);
    assert_eq!(decoded.expires_at, args.expires_at);
    assert_eq!(decoded.total_charged, decoded.amount_per_period);
}

#[test_log::test(tokio::test)]
async fn test_fetch_subscription_reads_and_validates() {
    let ledger = MockLedger::new(Pubkey::new_unique());
    let limits = PlausibilityLimits::default();

    let healthy = subscription(true, DAY, NOW, None);
    let address = ledger.insert(healthy).await;
    assert_eq!(fetch_subscription(&ledger, &address, &limits).await.unwrap(), healthy);

    let implausible = ledger.insert(subscription(true, 0, NOW, None)).await;
    let err = fetch_subscription(&ledger, &implausible, &limits).await.unwrap_err();
    assert!(matches!(
        err,
        SubscriptionSdkError::Decode(DecodeError::GarbageValue {
            field: "interval_seconds",
            ..
        })
    ));

    let missing = Pubkey::new_unique();
    let err = fetch_subscription(&ledger, &missing, &limits).await.unwrap_err();
    assert!(matches!(err, SubscriptionSdkError::AccountNotFound(a) if a == missing));
}
