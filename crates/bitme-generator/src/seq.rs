use crate::CodeGenerator;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces sequential codes like "ab000000", "ab000001", ...
///
/// Unique within a single instance. Mostly useful where codes must be
/// predictable, such as tests.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Starts counting from `offset`.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl CodeGenerator for SeqGenerator {
    fn generate(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", self.prefix, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequential_codes() {
        let generator = SeqGenerator::with_prefix("ab");

        assert_eq!(generator.generate(), "ab000000");
        assert_eq!(generator.generate(), "ab000001");
        assert_eq!(generator.generate(), "ab000002");
    }

    #[test]
    fn starts_from_offset() {
        let generator = SeqGenerator::with_offset("ab", 1000);

        assert_eq!(generator.generate(), "ab001000");
        assert_eq!(generator.generate(), "ab001001");
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
        assert_send_sync::<crate::RandomGenerator>();
    }
}
