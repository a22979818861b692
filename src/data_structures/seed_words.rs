//! Seed word list used to restore and back up a wallet

use blake2::Blake2b512;
use digest::Digest;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::types::PrivateKey;
use crate::errors::{WalletError, WalletResult};

/// Number of words in a complete recovery phrase
pub const MAX_SEED_WORDS: usize = 24;

const MASTER_KEY_DOMAIN: &[u8] = b"tari_wallet_core.master_key.v1";

/// Outcome of a successful [`SeedWords::push_word`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedWordPush {
    /// Word accepted, list still incomplete
    Pushed,
    /// Word accepted and the list now holds a full phrase
    Complete,
}

/// Ordered, append-only list of mnemonic words
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SeedWords {
    words: Vec<String>,
}

impl SeedWords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh 24 word phrase from 32 bytes of entropy
    pub fn generate() -> WalletResult<Self> {
        let mut entropy = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut entropy[..]);
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|e| WalletError::SeedWords(e.to_string()));
        entropy.zeroize();
        let phrase = mnemonic?.to_string();
        Self::from_phrase(&phrase)
    }

    pub fn from_phrase(phrase: &str) -> WalletResult<Self> {
        let mut words = Self::new();
        for word in phrase.split_whitespace() {
            words.push_word(word)?;
        }
        Ok(words)
    }

    /// Append a word; fails without mutating the list when the word is unknown or the list is full
    pub fn push_word(&mut self, word: &str) -> WalletResult<SeedWordPush> {
        if self.words.len() >= MAX_SEED_WORDS {
            return Err(WalletError::SeedWords(format!(
                "seed word list already holds {MAX_SEED_WORDS} words"
            )));
        }
        let normalized = word.trim().to_lowercase();
        if bip39::Language::English.find_word(&normalized).is_none() {
            return Err(WalletError::SeedWords(format!(
                "'{normalized}' is not in the word list"
            )));
        }
        self.words.push(normalized);
        if self.is_complete() {
            Ok(SeedWordPush::Complete)
        } else {
            Ok(SeedWordPush::Pushed)
        }
    }

    pub fn get_at(&self, index: usize) -> WalletResult<&str> {
        self.words
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| WalletError::NotFound(format!("seed word index {index}")))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.words.len() == MAX_SEED_WORDS
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Derive the wallet's master key from the phrase and optional passphrase
    pub fn derive_master_key(&self, passphrase: Option<&str>) -> WalletResult<PrivateKey> {
        if !self.is_complete() {
            return Err(WalletError::SeedWords(format!(
                "expected {MAX_SEED_WORDS} words, got {}",
                self.words.len()
            )));
        }
        let mut hasher = Blake2b512::new();
        hasher.update(MASTER_KEY_DOMAIN);
        for word in &self.words {
            hasher.update(word.as_bytes());
            hasher.update(b" ");
        }
        if let Some(passphrase) = passphrase {
            hasher.update(passphrase.as_bytes());
        }
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&hasher.finalize());
        let key = PrivateKey::from_wide_bytes(&wide);
        wide.zeroize();
        Ok(key)
    }
}

impl std::fmt::Debug for SeedWords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SeedWords({} words)", self.words.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: [&str; 4] = ["abandon", "ability", "able", "about"];

    #[test]
    fn test_push_then_read_back_in_order() {
        let mut seed = SeedWords::new();
        for word in WORDS {
            assert_eq!(seed.push_word(word).unwrap(), SeedWordPush::Pushed);
        }
        assert_eq!(seed.len(), WORDS.len());
        for (i, word) in WORDS.iter().enumerate() {
            assert_eq!(seed.get_at(i).unwrap(), *word);
        }
        assert!(matches!(seed.get_at(4), Err(WalletError::NotFound(_))));
    }

    #[test]
    fn test_push_past_maximum_fails_without_mutation() {
        let mut seed = SeedWords::new();
        for i in 0..MAX_SEED_WORDS {
            let outcome = seed.push_word(WORDS[i % WORDS.len()]).unwrap();
            if i + 1 == MAX_SEED_WORDS {
                assert_eq!(outcome, SeedWordPush::Complete);
            }
        }
        let before = seed.clone();
        assert!(seed.push_word("abandon").is_err());
        assert_eq!(seed, before);
        assert_eq!(seed.len(), MAX_SEED_WORDS);
    }

    #[test]
    fn test_unknown_word_is_rejected() {
        let mut seed = SeedWords::new();
        assert!(matches!(
            seed.push_word("notaword"),
            Err(WalletError::SeedWords(_))
        ));
        assert!(seed.is_empty());
    }

    #[test]
    fn test_generated_phrase_is_complete_and_derives_stable_key() {
        let seed = SeedWords::generate().unwrap();
        assert!(seed.is_complete());
        let phrase: Vec<&str> = seed.iter().collect();
        let restored = SeedWords::from_phrase(&phrase.join(" ")).unwrap();
        assert_eq!(
            seed.derive_master_key(None).unwrap().public_key(),
            restored.derive_master_key(None).unwrap().public_key()
        );
        assert_ne!(
            seed.derive_master_key(None).unwrap().public_key(),
            seed.derive_master_key(Some("extra")).unwrap().public_key()
        );
    }

    #[test]
    fn test_incomplete_phrase_cannot_derive_key() {
        let seed = SeedWords::from_phrase("abandon ability").unwrap();
        assert!(seed.derive_master_key(None).is_err());
    }
}
