use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed device (firepit, barrel, ...) in the world.
    pub struct DeviceId;
}

/// Identifies an item type in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a fluid in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FluidId(pub u32);

/// Identifies an item trait (brined, pickled, ...) that recipes add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraitId(pub u16);

/// Identifies a fuel definition in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FuelId(pub u32);

/// Identifies a sealed recipe in the registry.
///
/// Only valid for the registry that issued it. Persisted state stores the
/// recipe name instead and resolves it again on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_id_equality() {
        let a = ItemTypeId(0);
        let b = ItemTypeId(0);
        let c = ItemTypeId(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn trait_ids_order() {
        let mut traits = vec![TraitId(3), TraitId(1), TraitId(2)];
        traits.sort();
        assert_eq!(traits, vec![TraitId(1), TraitId(2), TraitId(3)]);
    }

    #[test]
    fn device_ids_are_distinct() {
        let mut sm = slotmap::SlotMap::<DeviceId, ()>::with_key();
        let a = sm.insert(());
        let b = sm.insert(());
        assert_ne!(a, b);
    }
}
