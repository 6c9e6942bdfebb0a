//! Block identifiers
//!
//! Identifiers are `"<seed>-<n>"`: a random per-session seed plus a
//! sequential counter. Identifiers recovered from markup are claimed as-is
//! unless another block already holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of claiming an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub id: ElementId,
    /// The requested identifier was missing or already taken
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
    claimed: HashSet<String>,
}

impl IdGenerator {
    /// Generator with a random seed
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self::from_seed(&uuid[..8])
    }

    pub fn from_seed(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            count: 0,
            claimed: HashSet::new(),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Next unclaimed identifier
    pub fn generate(&mut self) -> ElementId {
        loop {
            self.count += 1;
            let id = format!("{}-{}", self.seed, self.count);
            if self.claimed.insert(id.clone()) {
                return ElementId(id);
            }
        }
    }

    /// Claim `existing` if it is free, otherwise generate a fresh identifier
    pub fn claim(&mut self, existing: Option<&str>) -> Claim {
        match existing.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) if self.claimed.insert(id.to_string()) => Claim {
                id: ElementId(id.to_string()),
                fresh: false,
            },
            _ => Claim {
                id: self.generate(),
                fresh: true,
            },
        }
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    pub fn release(&mut self, id: &ElementId) {
        self.claimed.remove(id.as_str());
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut ids = IdGenerator::from_seed("abc");
        assert_eq!(ids.generate().as_str(), "abc-1");
        assert_eq!(ids.generate().as_str(), "abc-2");
    }

    #[test]
    fn test_random_seed() {
        let a = IdGenerator::new();
        let b = IdGenerator::new();
        assert_eq!(a.seed().len(), 8);
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn test_claim_existing_then_duplicate() {
        let mut ids = IdGenerator::from_seed("s");
        let first = ids.claim(Some("block-7"));
        assert_eq!(first, Claim { id: ElementId::new("block-7"), fresh: false });

        let second = ids.claim(Some("block-7"));
        assert!(second.fresh);
        assert_eq!(second.id.as_str(), "s-1");

        assert!(ids.claim(None).fresh);
        assert!(ids.claim(Some("  ")).fresh);
    }

    #[test]
    fn test_generate_skips_claimed() {
        let mut ids = IdGenerator::from_seed("s");
        ids.claim(Some("s-1"));
        assert_eq!(ids.generate().as_str(), "s-2");
    }

    #[test]
    fn test_release_allows_reclaim() {
        let mut ids = IdGenerator::from_seed("s");
        let claim = ids.claim(Some("x"));
        ids.release(&claim.id);
        assert!(!ids.claim(Some("x")).fresh);
    }
}
