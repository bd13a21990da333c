use bitcoin::bip32::{ChildNumber, Xpub};
use bitcoin::secp256k1::{Secp256k1, VerifyOnly};
use bitcoin::{Address, PublicKey};
use std::str::FromStr;

use crate::error::DiscoveryError;
use crate::scanner::ChainKind;

/// Deterministic mapping from `(chain, index)` to an address string.
///
/// Implementations must be injective per chain: distinct indices yield distinct addresses.
pub trait KeyDerivation: Send + Sync {
    fn derive_address(&self, chain: ChainKind, index: u32) -> Result<String, DiscoveryError>;

    /// Derive `count` consecutive addresses starting at `start`
    fn derive_window(
        &self,
        chain: ChainKind,
        start: u32,
        count: u32,
    ) -> Result<Vec<String>, DiscoveryError> {
        let end = start.checked_add(count).ok_or_else(|| {
            DiscoveryError::Derivation(format!("index overflow at {} + {}", start, count))
        })?;
        (start..end)
            .map(|index| self.derive_address(chain, index))
            .collect()
    }
}

/// P2PKH addresses derived from a BIP44 account-level extended public key
pub struct XpubDerivation {
    xpub: Xpub,
    chain_keys: [Xpub; 2],
    secp: Secp256k1<VerifyOnly>,
}

impl XpubDerivation {
    /// Parse an account key, either a bare xpub/tpub or one embedded in a descriptor
    pub fn new(account_key: &str) -> Result<Self, DiscoveryError> {
        let xpub = Self::extract_xpub(account_key)?;
        let secp = Secp256k1::verification_only();

        let external = Self::child(&secp, &xpub, ChainKind::External.child_index())?;
        let internal = Self::child(&secp, &xpub, ChainKind::Internal.child_index())?;

        Ok(Self {
            xpub,
            chain_keys: [external, internal],
            secp,
        })
    }

    pub fn xpub(&self) -> &Xpub {
        &self.xpub
    }

    fn child(
        secp: &Secp256k1<VerifyOnly>,
        parent: &Xpub,
        index: u32,
    ) -> Result<Xpub, DiscoveryError> {
        let child_number = ChildNumber::from_normal_idx(index)
            .map_err(|e| DiscoveryError::Derivation(e.to_string()))?;
        parent
            .ckd_pub(secp, child_number)
            .map_err(|e| DiscoveryError::Derivation(e.to_string()))
    }

    /// Extract the xpub/tpub from an account key or descriptor string
    fn extract_xpub(account_key: &str) -> Result<Xpub, DiscoveryError> {
        let start = ["xpub", "tpub"]
            .iter()
            .filter_map(|prefix| account_key.find(prefix))
            .min()
            .ok_or_else(|| DiscoveryError::InvalidAccountKey("No xpub/tpub found".into()))?;

        let end = account_key[start..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .map(|i| start + i)
            .unwrap_or(account_key.len());

        Xpub::from_str(&account_key[start..end])
            .map_err(|e| DiscoveryError::InvalidAccountKey(e.to_string()))
    }
}

impl KeyDerivation for XpubDerivation {
    fn derive_address(&self, chain: ChainKind, index: u32) -> Result<String, DiscoveryError> {
        let chain_key = &self.chain_keys[chain.child_index() as usize];
        let derived = Self::child(&self.secp, chain_key, index)?;

        let pubkey = PublicKey::new(derived.public_key);
        let address = Address::p2pkh(pubkey.pubkey_hash(), self.xpub.network);

        Ok(address.to_string())
    }
}
