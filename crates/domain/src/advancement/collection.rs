use super::{AdvancementDefinition, AdvancementType};
use crate::ids::AdvancementId;

/// Read view over the advancement array of one item.
///
/// Order is the order of the persisted array, so lookups by level are
/// stable and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct AdvancementCollection<'a> {
    advancements: &'a [AdvancementDefinition],
}

impl<'a> AdvancementCollection<'a> {
    pub fn new(advancements: &'a [AdvancementDefinition]) -> Self {
        Self { advancements }
    }

    pub fn get(&self, id: AdvancementId) -> Option<&'a AdvancementDefinition> {
        self.advancements.iter().find(|a| a.id == id)
    }

    /// Every advancement triggering at `level`, in collection order.
    ///
    /// # Panics
    ///
    /// Levels start at 1; asking for level 0 is a step-construction bug.
    pub fn by_level(&self, level: u32) -> Vec<&'a AdvancementDefinition> {
        assert!(level > 0, "advancement levels start at 1");
        self.advancements
            .iter()
            .filter(|a| a.applies_at(level))
            .collect()
    }

    pub fn by_type(&self, advancement_type: AdvancementType) -> Vec<&'a AdvancementDefinition> {
        self.advancements
            .iter()
            .filter(|a| a.advancement_type() == advancement_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.advancements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advancements.is_empty()
    }
}
