//! Deterministic offline embedder.
//!
//! Produces pseudo-embeddings from a hash of the text. Useful for running the
//! pipeline without network access and for tests; the vectors carry no
//! semantic meaning.

use async_trait::async_trait;

use super::embedder::{Embedder, Embedding, EmbeddingError, EmbeddingResult};

/// Embedder that derives vectors from a hash of the input text.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of the given length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Simple non-cryptographic hash (djb2).
    fn simple_hash(text: &str) -> u64 {
        let mut hash: u64 = 5381;
        for byte in text.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        hash
    }

    /// SplitMix64 step, spreads consecutive seeds over the whole range.
    fn mix(seed: u64) -> u64 {
        let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let hash = Self::simple_hash(text);
        (0..self.dimensions)
            .map(|i| {
                let seed = Self::mix(hash.wrapping_add(i as u64));
                (seed as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(Embedding::new(self.vector_for(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_produces_consistent_output() {
        let embedder = HashEmbedder::new(16);

        let emb1 = embedder.embed("Hello, world!").await.unwrap();
        let emb2 = embedder.embed("Hello, world!").await.unwrap();

        assert_eq!(emb1.values, emb2.values);
    }

    #[tokio::test]
    async fn embed_different_texts_produce_different_embeddings() {
        let embedder = HashEmbedder::new(16);

        let emb1 = embedder.embed("Hello").await.unwrap();
        let emb2 = embedder.embed("Goodbye").await.unwrap();

        assert_ne!(emb1.values, emb2.values);
    }

    #[tokio::test]
    async fn embed_respects_dimensions() {
        let embedder = HashEmbedder::new(1536);
        let emb = embedder.embed("text").await.unwrap();
        assert_eq!(emb.dimension(), 1536);
        assert!(emb.values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn embed_rejects_blank_text() {
        let embedder = HashEmbedder::new(4);
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyInput));
    }
}
