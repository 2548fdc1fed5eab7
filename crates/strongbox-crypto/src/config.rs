//! Engine and pool configuration

use crate::{
    engine::CryptoEngine,
    primitives::{CryptoPrimitives, MockPrimitives, NativePrimitives},
    DEFAULT_POOL_SIZE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which primitive implementation backs the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitivesKind {
    /// Real cryptography
    #[default]
    Native,
    /// Deterministic placeholders, never for production data
    Mock,
}

/// Crypto subsystem configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Primitive implementation
    pub primitives: PrimitivesKind,
    /// Target size of the encryption key-pair pool
    pub encryption_pool_size: usize,
    /// Target size of the signing key-pair pool
    pub signing_pool_size: usize,
    /// Namespace for ids of generated key sets
    pub key_namespace: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            primitives: PrimitivesKind::Native,
            encryption_pool_size: DEFAULT_POOL_SIZE,
            signing_pool_size: DEFAULT_POOL_SIZE,
            key_namespace: "strongbox".to_string(),
        }
    }
}

impl CryptoConfig {
    /// Use mock primitives
    pub fn with_mock_primitives(mut self) -> Self {
        self.primitives = PrimitivesKind::Mock;
        self
    }

    /// Set both pool sizes
    pub fn with_pool_sizes(mut self, encryption: usize, signing: usize) -> Self {
        self.encryption_pool_size = encryption;
        self.signing_pool_size = signing;
        self
    }

    /// Set the key-set namespace
    pub fn with_key_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.key_namespace = namespace.into();
        self
    }

    /// Build the primitive strategy this config selects
    pub fn build_primitives(&self) -> Arc<dyn CryptoPrimitives> {
        match self.primitives {
            PrimitivesKind::Native => Arc::new(NativePrimitives),
            PrimitivesKind::Mock => {
                tracing::warn!("mock crypto primitives installed; output is NOT secure");
                Arc::new(MockPrimitives::all())
            }
        }
    }

    /// Build an engine over the configured primitives
    pub fn build_engine(&self) -> CryptoEngine {
        CryptoEngine::new(self.build_primitives())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CryptoConfig::default();
        assert_eq!(config.primitives, PrimitivesKind::Native);
        assert_eq!(config.encryption_pool_size, 4);
        assert_eq!(config.signing_pool_size, 4);
        assert_eq!(config.key_namespace, "strongbox");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CryptoConfig =
            serde_json::from_str(r#"{"primitives": "mock", "signing_pool_size": 1}"#).unwrap();
        assert_eq!(config.primitives, PrimitivesKind::Mock);
        assert_eq!(config.signing_pool_size, 1);
        assert_eq!(config.encryption_pool_size, 4);
    }

    #[test]
    fn test_builder() {
        let config = CryptoConfig::default()
            .with_mock_primitives()
            .with_pool_sizes(2, 3)
            .with_key_namespace("mail");
        assert_eq!(config.primitives, PrimitivesKind::Mock);
        assert_eq!((config.encryption_pool_size, config.signing_pool_size), (2, 3));
        assert_eq!(config.key_namespace, "mail");
    }

    #[test]
    fn test_build_primitives_selects_strategy() {
        let native = CryptoConfig::default().build_primitives();
        assert!(format!("{:?}", native).contains("NativePrimitives"));
        let mock = CryptoConfig::default().with_mock_primitives().build_primitives();
        assert!(format!("{:?}", mock).contains("MockPrimitives"));
    }
}
