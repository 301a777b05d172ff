use crate::CodeGenerator;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub const DEFAULT_LENGTH: usize = 6;

/// Generates random `[a-zA-Z0-9]` codes of a fixed length.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator producing codes of `length` characters.
    ///
    /// A zero length is raised to one.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::with_length(DEFAULT_LENGTH)
    }
}

impl CodeGenerator for RandomGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_requested_length_and_alphabet() {
        let generator = RandomGenerator::with_length(10);
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), 10);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn zero_length_is_raised_to_one() {
        assert_eq!(RandomGenerator::with_length(0).generate().len(), 1);
    }

    #[test]
    fn default_length() {
        assert_eq!(RandomGenerator::default().length(), DEFAULT_LENGTH);
    }
}
