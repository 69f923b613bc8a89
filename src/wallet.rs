//! Sponsor wallet derivation (§3 `SponsorWallet`).
//!
//! Wallets are derived once at startup from either a mnemonic plus account
//! index, or a single raw hex key for index 0, and are stable addresses for
//! the lifetime of the process. The exact Stacks key-derivation/address
//! scheme is out of this component's scope (§1 excludes signature-scheme
//! detail); `k256`/`bip39` stand in for it the way `alloy`/`solana-sdk`
//! stand in for EVM/Solana key material elsewhere in the corpus.

use bip39::Mnemonic;
use k256::SecretKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

pub const MAX_WALLET_COUNT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic phrase")]
    InvalidMnemonic,
    #[error("invalid raw private key hex")]
    InvalidRawKey,
    #[error("wallet count exceeds MAX_WALLET_COUNT ({MAX_WALLET_COUNT})")]
    TooManyWallets,
    #[error("a raw key only supports wallet index 0")]
    RawKeyRequiresSingleWallet,
}

#[derive(Clone)]
pub struct SponsorWallet {
    pub wallet_index: usize,
    pub address: String,
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for SponsorWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SponsorWallet")
            .field("wallet_index", &self.wallet_index)
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn derive_key_for_index(seed: &[u8], index: usize) -> SecretKey {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update((index as u32).to_be_bytes());
    let scalar = hasher.finalize();
    // Retry with an incrementing counter on the vanishingly unlikely chance
    // the digest doesn't reduce to a valid scalar.
    let mut candidate = scalar.to_vec();
    loop {
        if let Ok(key) = SecretKey::from_slice(&candidate) {
            return key;
        }
        let mut hasher = Sha256::new();
        hasher.update(&candidate);
        candidate = hasher.finalize().to_vec();
    }
}

fn address_from_key(key: &SecretKey) -> String {
    let public = key.public_key();
    let encoded = public.to_encoded_point(true);
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    let digest = hasher.finalize();
    format!("SP{}", hex::encode(&digest[..20]).to_uppercase())
}

pub fn derive_wallets_from_mnemonic(
    phrase: &str,
    wallet_count: usize,
) -> Result<Vec<SponsorWallet>, WalletError> {
    if wallet_count > MAX_WALLET_COUNT {
        return Err(WalletError::TooManyWallets);
    }
    let mnemonic = Mnemonic::parse(phrase).map_err(|_| WalletError::InvalidMnemonic)?;
    let seed = mnemonic.to_seed("");
    Ok((0..wallet_count)
        .map(|index| {
            let key = derive_key_for_index(&seed, index);
            let address = address_from_key(&key);
            SponsorWallet {
                wallet_index: index,
                address,
                private_key: key.to_bytes().to_vec(),
            }
        })
        .collect())
}

pub fn derive_wallet_from_raw_key(hex_key: &str) -> Result<SponsorWallet, WalletError> {
    let bytes = hex::decode(hex_key.trim_start_matches("0x")).map_err(|_| WalletError::InvalidRawKey)?;
    let key = SecretKey::from_slice(&bytes).map_err(|_| WalletError::InvalidRawKey)?;
    let address = address_from_key(&key);
    Ok(SponsorWallet {
        wallet_index: 0,
        address,
        private_key: key.to_bytes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derives_stable_addresses_per_index() {
        let wallets = derive_wallets_from_mnemonic(TEST_MNEMONIC, 3).unwrap();
        assert_eq!(wallets.len(), 3);
        let addresses: std::collections::HashSet<_> = wallets.iter().map(|w| w.address.clone()).collect();
        assert_eq!(addresses.len(), 3, "addresses must be distinct per index");

        let again = derive_wallets_from_mnemonic(TEST_MNEMONIC, 3).unwrap();
        for (a, b) in wallets.iter().zip(again.iter()) {
            assert_eq!(a.address, b.address, "derivation must be deterministic");
        }
    }

    #[test]
    fn rejects_wallet_count_above_max() {
        let result = derive_wallets_from_mnemonic(TEST_MNEMONIC, MAX_WALLET_COUNT + 1);
        assert!(matches!(result, Err(WalletError::TooManyWallets)));
    }
}
