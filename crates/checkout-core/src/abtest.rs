//! A/B Variant Assignment
//!
//! Each visitor is put in one of two variants, 50/50, and stays there.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::KeyValueStore;

/// Storage key for the assigned variant label
pub const VARIANT_KEY: &str = "ab_test_variant";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    VariantA,
    VariantB,
}

impl Variant {
    pub const fn as_str(self) -> &'static str {
        match self {
            Variant::VariantA => "variant_a",
            Variant::VariantB => "variant_b",
        }
    }

    /// Only the two exact labels are recognised
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "variant_a" => Some(Variant::VariantA),
            "variant_b" => Some(Variant::VariantB),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Even coin flip from a v4 UUID's random bits
fn coin_flip() -> Variant {
    if uuid::Uuid::new_v4().as_bytes()[0] & 1 == 0 {
        Variant::VariantA
    } else {
        Variant::VariantB
    }
}

/// Assigns and remembers a visitor's variant
pub struct VariantAssigner<S: KeyValueStore> {
    store: S,
    pick: fn() -> Variant,
}

impl<S: KeyValueStore> VariantAssigner<S> {
    pub fn new(store: S) -> Self {
        Self::with_picker(store, coin_flip)
    }

    /// Use a fixed picker (tests)
    pub fn with_picker(store: S, pick: fn() -> Variant) -> Self {
        Self { store, pick }
    }

    /// Stored variant, or a fresh 50/50 assignment that is then persisted.
    /// An unrecognised stored label is replaced.
    pub fn get_or_assign(&self) -> Result<Variant> {
        if let Some(variant) = self.store.get(VARIANT_KEY)?.as_deref().and_then(Variant::parse) {
            return Ok(variant);
        }

        let variant = (self.pick)();
        self.store.set(VARIANT_KEY, variant.as_str())?;
        tracing::debug!(variant = %variant, "Assigned A/B variant");
        Ok(variant)
    }

    /// Forget the assignment
    pub fn reset(&self) -> Result<()> {
        self.store.remove(VARIANT_KEY)
    }

    pub fn is_variant(&self, variant: Variant) -> Result<bool> {
        Ok(self.get_or_assign()? == variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_assignment_is_sticky() {
        let assigner = VariantAssigner::with_picker(MemoryStore::new(), || Variant::VariantB);
        assert_eq!(assigner.get_or_assign().unwrap(), Variant::VariantB);

        let store = MemoryStore::new();
        store.set(VARIANT_KEY, "variant_a").unwrap();
        let assigner = VariantAssigner::with_picker(store, || Variant::VariantB);
        assert_eq!(assigner.get_or_assign().unwrap(), Variant::VariantA);
        assert!(assigner.is_variant(Variant::VariantA).unwrap());
    }

    #[test]
    fn test_garbage_label_is_reassigned() {
        let store = MemoryStore::new();
        store.set(VARIANT_KEY, "variant_c").unwrap();
        let assigner = VariantAssigner::with_picker(store, || Variant::VariantB);
        assert_eq!(assigner.get_or_assign().unwrap(), Variant::VariantB);
        assert_eq!(
            assigner.store.get(VARIANT_KEY).unwrap().as_deref(),
            Some("variant_b")
        );
    }

    #[test]
    fn test_reset() {
        let assigner = VariantAssigner::with_picker(MemoryStore::new(), || Variant::VariantA);
        assigner.get_or_assign().unwrap();
        assigner.reset().unwrap();
        assert!(assigner.store.is_empty());
    }

    #[test]
    fn test_coin_flip_produces_both_variants() {
        let picks: Vec<Variant> = (0..200).map(|_| coin_flip()).collect();
        assert!(picks.contains(&Variant::VariantA));
        assert!(picks.contains(&Variant::VariantB));
    }
}
