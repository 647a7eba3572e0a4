//! Feature-hashing embedding provider.
//!
//! Maps each lowercase alphanumeric token to a bucket with SHA-256 and
//! counts occurrences, then L2-normalizes. No model, no network: the same
//! text always yields the same vector on every machine, which makes it the
//! provider for offline runs and tests. Texts that share words land close
//! together; it has no notion of synonyms.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

use super::provider::EmbeddingProvider;
use super::types::ProviderInfo;

/// Default dimensionality, matching all-MiniLM-L6-v2.
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

/// Deterministic bag-of-words embedding provider.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimensions: usize,
}

impl HashingProvider {
    /// Create a provider producing `dimensions`-length vectors (minimum 1).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        #[allow(clippy::cast_possible_truncation)]
        let idx = (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize;
        idx
    }

    /// Embed synchronously.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingUnavailable` if the text has no tokens.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(Error::EmbeddingUnavailable(
                "hashing provider: text has no indexable tokens".into(),
            ));
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

impl EmbeddingProvider for HashingProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "hashing".to_string(),
            model: format!("sha256-bow-{}", self.dimensions),
            dimensions: self.dimensions,
            max_chars: usize::MAX,
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }
}
