#![forbid(unsafe_code)]

use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Builder;

use crate::error::GenerationCapabilityError;

/// Produces fresh identifiers for edges whose id member is unset.
pub trait IdGenerator: Send + Sync {
    /// Returns a new globally unique token.
    fn generate(&self) -> Result<String, GenerationCapabilityError>;
}

/// Random (version 4) UUIDs drawn from the operating system's secure source.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String, GenerationCapabilityError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| GenerationCapabilityError(err.to_string()))?;
        Ok(Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
}
