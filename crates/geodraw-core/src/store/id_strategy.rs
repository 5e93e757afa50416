//! Pluggable feature id generation and validation.

use crate::feature::FeatureId;
use uuid::Uuid;

/// Produces and validates feature ids. Strategies must supply both halves so
/// programmatically loaded features can be checked against the same rules.
pub trait IdStrategy {
    /// Produce the next id.
    fn next_id(&mut self) -> FeatureId;

    /// Whether an externally supplied id is acceptable.
    fn is_valid_id(&self, id: &FeatureId) -> bool;
}

/// Random 128-bit identifiers formatted as UUID v4 strings. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidStrategy;

impl IdStrategy for UuidStrategy {
    fn next_id(&mut self) -> FeatureId {
        FeatureId::String(Uuid::new_v4().to_string())
    }

    fn is_valid_id(&self, id: &FeatureId) -> bool {
        match id {
            FeatureId::String(s) => Uuid::parse_str(s)
                .map(|u| u.get_version_num() == 4)
                .unwrap_or(false),
            FeatureId::Number(_) => false,
        }
    }
}

/// Incrementing integer ids starting at 1.
#[derive(Debug, Clone, Copy)]
pub struct IncrementingStrategy {
    next: u64,
}

impl Default for IncrementingStrategy {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IncrementingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl IdStrategy for IncrementingStrategy {
    fn next_id(&mut self) -> FeatureId {
        let id = self.next;
        self.next += 1;
        FeatureId::Number(id)
    }

    fn is_valid_id(&self, id: &FeatureId) -> bool {
        matches!(id, FeatureId::Number(n) if *n > 0)
    }
}
