//! Generators for short and admin codes.
//!
//! Generators are pure: they never consult storage. A collision is detected
//! by the storage engine as a duplicate key and the caller retries.

pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

/// Trait for generating URL codes.
///
/// Implementations can vary from random alphanumeric strings to
/// deterministic sequences for tests.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Produces the next code.
    fn generate(&self) -> String;
}
