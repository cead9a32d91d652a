//! Byte-exact encoding of the billing program's instructions and accounts.

pub mod account;
pub mod discriminator;
pub mod instruction;
pub mod layout;

pub use account::{PlausibilityLimits, SubscriptionAccount, MIN_SUBSCRIPTION_LEN};
pub use instruction::{InitializeArgs, SubscriptionInstruction, UpdateArgs};
