use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::fmt;

/// Abstraction for the merchant credential that pays for and signs charges.
/// This allows the processor to work with:
/// 1. Local Keypairs (service process holding the merchant key)
/// 2. Remote signers (KMS / HSM backed services)
#[async_trait]
pub trait ChargeSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign serialized transaction message bytes.
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, String>;
}

/// Merchant keypair held in process memory.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

// Only the public half is ever printed.
impl fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("pubkey", &self.keypair.pubkey())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChargeSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, String> {
        self.keypair
            .try_sign_message(message)
            .map_err(|e| e.to_string())
    }
}
