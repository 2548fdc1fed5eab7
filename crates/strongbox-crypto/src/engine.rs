//! The engine that ties the wire formats to a primitive strategy
//!
//! Operations are grouped by module: [`crate::hybrid`], [`crate::password`],
//! [`crate::signing`] and [`crate::typed`] each add an `impl CryptoEngine`
//! block.
//!
//! Every operation runs synchronously on the calling thread. RSA-4096
//! private-key operations and the 650,000-round password derivation take long
//! enough to stall an async executor, so async callers should run them under
//! [`tokio::task::spawn_blocking`].

use crate::primitives::{CryptoPrimitives, MockPrimitives, NativePrimitives};
use std::sync::Arc;

/// Entry point for every envelope operation
#[derive(Clone, Debug)]
pub struct CryptoEngine {
    primitives: Arc<dyn CryptoPrimitives>,
}

impl CryptoEngine {
    /// Create an engine over the given primitive strategy
    pub fn new(primitives: Arc<dyn CryptoPrimitives>) -> Self {
        Self { primitives }
    }

    /// Engine backed by real cryptography
    pub fn native() -> Self {
        Self::new(Arc::new(NativePrimitives))
    }

    /// Engine with all four primitives mocked (development and tests only)
    pub fn mock() -> Self {
        Self::new(Arc::new(MockPrimitives::all()))
    }

    pub fn primitives(&self) -> &dyn CryptoPrimitives {
        self.primitives.as_ref()
    }
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::native()
    }
}
