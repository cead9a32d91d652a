//! Anchor-style 8-byte type tags.
//!
//! Instructions are tagged with `sha256("global:<name>")[..8]` and accounts
//! with `sha256("account:<Name>")[..8]`. The program compares these bytes
//! verbatim, so the namespace strings and truncation must not change.

use crate::core::constants::SUBSCRIPTION_ACCOUNT_NAME;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// First 8 bytes of `sha256("<namespace>:<name>")`.
pub fn sighash(namespace: &str, name: &str) -> Discriminator {
    let digest = Sha256::new()
        .chain_update(namespace.as_bytes())
        .chain_update(b":")
        .chain_update(name.as_bytes())
        .finalize();

    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

pub fn instruction_discriminator(name: &str) -> Discriminator {
    sighash("global", name)
}

pub fn account_discriminator(name: &str) -> Discriminator {
    sighash("account", name)
}

static SUBSCRIPTION_DISCRIMINATOR: Lazy<Discriminator> =
    Lazy::new(|| account_discriminator(SUBSCRIPTION_ACCOUNT_NAME));

/// Tag carried by every `Subscription` account.
pub fn subscription_discriminator() -> &'static Discriminator {
    &SUBSCRIPTION_DISCRIMINATOR
}
