/// Default compare-and-swap attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Tunables for `ProgressService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressServiceConfig {
    max_attempts: u32,
}

impl Default for ProgressServiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ProgressServiceConfig {
    /// Set the retry ceiling. Zero is clamped to a single attempt.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
