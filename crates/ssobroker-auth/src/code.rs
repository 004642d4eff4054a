//! Authorization code generation.

use uuid::Uuid;

/// Source of opaque authorization code values.
///
/// Every value must be unique for the lifetime of the process. Values should
/// be roughly time-ordered so that codes sort by issuance.
pub trait UniqueCodeGenerator: Send + Sync {
    /// Returns a fresh code value.
    fn next_code(&self) -> String;
}

/// Generates codes from UUIDv7: a millisecond timestamp prefix followed by
/// 74 random bits, rendered as 32 lowercase hex characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7CodeGenerator;

impl UuidV7CodeGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl UniqueCodeGenerator for UuidV7CodeGenerator {
    fn next_code(&self) -> String {
        Uuid::now_v7().simple().to_string()
    }
}
