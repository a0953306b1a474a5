/// Average characters per token used by the default estimator.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Size estimation for LLM payloads.
///
/// Sizes are measured in an estimator-specific integer unit (characters for
/// [`CharRatioEstimator`]) so chunk packing never accumulates rounding error.
/// A real tokenizer can implement this trait with tokens as its unit.
pub trait TokenEstimator: Send + Sync {
    /// Size of `text` in this estimator's unit
    fn measure(&self, text: &str) -> usize;

    /// Approximate token count for a measured size
    fn tokens(&self, size: usize) -> f64;

    /// Largest size whose token estimate does not exceed `tokens`
    fn capacity(&self, tokens: usize) -> usize;

    fn estimate(&self, text: &str) -> f64 {
        self.tokens(self.measure(text))
    }
}

/// Approximates tokens as `chars / chars_per_token`.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: f64,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: f64) -> Self {
        Self { chars_per_token }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn measure(&self, text: &str) -> usize {
        text.chars().count()
    }

    fn tokens(&self, size: usize) -> f64 {
        size as f64 / self.chars_per_token
    }

    fn capacity(&self, tokens: usize) -> usize {
        (tokens as f64 * self.chars_per_token).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_chars_not_bytes() {
        let est = CharRatioEstimator::default();

        assert_eq!(est.measure("héllo"), 5);
        assert_eq!(est.measure("日本語"), 3);
    }

    #[test]
    fn test_default_ratio() {
        let est = CharRatioEstimator::default();

        assert_eq!(est.estimate(&"x".repeat(35)), 10.0);
        assert_eq!(est.capacity(2048), 7168);
        // 3 * 3.5 = 10.5, only whole characters fit
        assert_eq!(est.capacity(3), 10);
    }
}
