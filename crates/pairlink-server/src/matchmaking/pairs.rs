//! Pair registry: the symmetric partner relation.
//!
//! Every mutation keeps the relation mutual. If `a` maps to `b` then `b`
//! maps to `a`, and each session appears in at most one pair.

use pairlink_core::{short_id, PairError, PairResult};
use std::collections::HashMap;
use tracing::warn;

/// Symmetric map from session identity to partner identity.
#[derive(Debug, Default)]
pub struct PairRegistry {
    partners: HashMap<String, String>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current partner of `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.partners.get(id).map(String::as_str)
    }

    /// Whether `id` is a member of a pair.
    pub fn is_paired(&self, id: &str) -> bool {
        self.partners.contains_key(id)
    }

    /// Establish the mutual relation `a <-> b`.
    ///
    /// Any pair either side was still part of is dissolved first.
    pub fn set(&mut self, a: &str, b: &str) -> PairResult<()> {
        if a == b {
            return Err(PairError::Other(format!(
                "cannot pair session {} with itself",
                short_id(a)
            )));
        }
        for id in [a, b] {
            if let Some(old) = self.clear(id) {
                warn!(session_id = %short_id(id), old_partner = %short_id(&old), "replacing stale pair");
            }
        }
        self.partners.insert(a.to_string(), b.to_string());
        self.partners.insert(b.to_string(), a.to_string());
        Ok(())
    }

    /// Remove the relation for `id` and its partner. Returns the former partner.
    pub fn clear(&mut self, id: &str) -> Option<String> {
        let partner = self.partners.remove(id)?;
        self.partners.remove(&partner);
        Some(partner)
    }

    /// Number of live pairs.
    pub fn len(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// Whether every entry is mirrored by its partner's entry.
    pub fn is_symmetric(&self) -> bool {
        self.partners
            .iter()
            .all(|(id, partner)| id != partner && self.get(partner) == Some(id.as_str()))
    }
}
