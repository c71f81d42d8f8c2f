use crate::clock::Ticks;
use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stack size used when the registry does not say otherwise.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// A stack of identical items.
///
/// Two stacks merge only if their type and traits are equal. `created_tick`
/// records when the stack was produced; recipe outputs assembled during
/// catch-up carry the tick the recipe actually finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
    #[serde(default)]
    pub created_tick: Ticks,
    #[serde(default)]
    pub traits: BTreeSet<TraitId>,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
            created_tick: 0,
            traits: BTreeSet::new(),
        }
    }

    pub fn created_at(mut self, tick: Ticks) -> Self {
        self.created_tick = tick;
        self
    }

    pub fn with_trait(mut self, id: TraitId) -> Self {
        self.traits.insert(id);
        self
    }

    pub fn has_trait(&self, id: TraitId) -> bool {
        self.traits.contains(&id)
    }

    pub fn add_trait(&mut self, id: TraitId) {
        self.traits.insert(id);
    }

    pub fn remove_trait(&mut self, id: TraitId) {
        self.traits.remove(&id);
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Whether `other` can be merged into this stack.
    pub fn stacks_with(&self, other: &ItemStack) -> bool {
        self.item_type == other.item_type && self.traits == other.traits
    }

    /// A copy of this stack with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// An amount of one fluid, in millibuckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: u32) -> Self {
        Self { fluid, amount }
    }
}

/// Default barrel tank capacity in millibuckets.
pub const DEFAULT_TANK_CAPACITY: u32 = 10_000;

/// The inventory of a barrel: one item slot, one fluid tank, and an overflow
/// list for outputs that did not fit in the slot.
///
/// Sealed recipes are only looked up while `excess` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrelContents {
    pub item: Option<ItemStack>,
    pub fluid: Option<FluidStack>,
    #[serde(default)]
    pub excess: Vec<ItemStack>,
    pub tank_capacity: u32,
}

impl Default for BarrelContents {
    fn default() -> Self {
        Self::new(DEFAULT_TANK_CAPACITY)
    }
}

impl BarrelContents {
    pub fn new(tank_capacity: u32) -> Self {
        Self {
            item: None,
            fluid: None,
            excess: Vec::new(),
            tank_capacity,
        }
    }

    pub fn with_item(mut self, stack: ItemStack) -> Self {
        self.item = (!stack.is_empty()).then_some(stack);
        self
    }

    pub fn with_fluid(mut self, fluid: FluidId, amount: u32) -> Self {
        let amount = amount.min(self.tank_capacity);
        self.fluid = (amount > 0).then_some(FluidStack::new(fluid, amount));
        self
    }

    pub fn fluid_amount(&self) -> u32 {
        self.fluid.as_ref().map(|f| f.amount).unwrap_or(0)
    }

    pub fn item_count(&self) -> u32 {
        self.item.as_ref().map(|s| s.quantity).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none() && self.fluid.is_none() && self.excess.is_empty()
    }

    /// Take the stack out of the item slot.
    pub fn take_item(&mut self) -> Option<ItemStack> {
        self.item.take()
    }

    /// Drain the whole tank.
    pub fn drain(&mut self) -> Option<FluidStack> {
        self.fluid.take()
    }

    /// Fill the tank. Returns the amount accepted. A different fluid is
    /// rejected while the tank is not empty.
    #[must_use = "returns the amount actually filled"]
    pub fn fill(&mut self, stack: FluidStack) -> u32 {
        match &mut self.fluid {
            Some(existing) if existing.fluid != stack.fluid => 0,
            Some(existing) => {
                let space = self.tank_capacity.saturating_sub(existing.amount);
                let accepted = stack.amount.min(space);
                existing.amount += accepted;
                accepted
            }
            None => {
                let accepted = stack.amount.min(self.tank_capacity);
                if accepted > 0 {
                    self.fluid = Some(FluidStack::new(stack.fluid, accepted));
                }
                accepted
            }
        }
    }

    /// Insert into the item slot, spilling whatever does not fit into
    /// `excess` in chunks of at most `max_stack`.
    pub fn insert_with_overflow(&mut self, stack: ItemStack, max_stack: u32) {
        let max_stack = max_stack.max(1);
        let mut remaining = stack.quantity;
        match &mut self.item {
            None => {
                let placed = remaining.min(max_stack);
                self.item = Some(stack.with_quantity(placed));
                remaining -= placed;
            }
            Some(slot) if slot.stacks_with(&stack) => {
                let placed = remaining.min(max_stack.saturating_sub(slot.quantity));
                slot.quantity += placed;
                remaining -= placed;
            }
            Some(_) => {}
        }
        while remaining > 0 {
            let chunk = remaining.min(max_stack);
            self.excess.push(stack.with_quantity(chunk));
            remaining -= chunk;
        }
    }

    /// Everything this barrel holds, emptied out. Used when the barrel is
    /// removed from the world.
    pub fn eject(&mut self) -> (Vec<ItemStack>, Option<FluidStack>) {
        let mut items: Vec<ItemStack> = self.item.take().into_iter().collect();
        items.append(&mut self.excess);
        (items, self.fluid.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: TraitId = TraitId(1);

    #[test]
    fn stacks_merge_only_with_equal_traits() {
        let plain = ItemStack::new(ItemTypeId(0), 4);
        let brined = ItemStack::new(ItemTypeId(0), 4).with_trait(SALT);
        assert!(plain.stacks_with(&plain.clone()));
        assert!(!plain.stacks_with(&brined));
    }

    #[test]
    fn fill_respects_capacity_and_fluid() {
        let mut contents = BarrelContents::new(1000);
        assert_eq!(contents.fill(FluidStack::new(FluidId(0), 700)), 700);
        assert_eq!(contents.fill(FluidStack::new(FluidId(0), 700)), 300);
        assert_eq!(contents.fill(FluidStack::new(FluidId(1), 10)), 0);
        assert_eq!(contents.fluid_amount(), 1000);
    }

    #[test]
    fn with_fluid_clamps_to_capacity() {
        let contents = BarrelContents::new(500).with_fluid(FluidId(2), 900);
        assert_eq!(contents.fluid_amount(), 500);
        let empty = BarrelContents::new(500).with_fluid(FluidId(2), 0);
        assert!(empty.fluid.is_none());
    }

    #[test]
    fn insert_into_empty_slot() {
        let mut contents = BarrelContents::default();
        contents.insert_with_overflow(ItemStack::new(ItemTypeId(3), 10), 64);
        assert_eq!(contents.item_count(), 10);
        assert!(contents.excess.is_empty());
    }

    #[test]
    fn insert_overflows_into_excess_chunks() {
        let mut contents = BarrelContents::default();
        contents.insert_with_overflow(ItemStack::new(ItemTypeId(3), 150), 64);
        assert_eq!(contents.item_count(), 64);
        let chunks: Vec<u32> = contents.excess.iter().map(|s| s.quantity).collect();
        assert_eq!(chunks, vec![64, 22]);
    }

    #[test]
    fn insert_different_item_goes_to_excess() {
        let mut contents =
            BarrelContents::default().with_item(ItemStack::new(ItemTypeId(1), 2));
        contents.insert_with_overflow(ItemStack::new(ItemTypeId(2), 5), 64);
        assert_eq!(contents.item_count(), 2);
        assert_eq!(contents.excess.len(), 1);
        assert_eq!(contents.excess[0].item_type, ItemTypeId(2));
    }

    #[test]
    fn eject_empties_everything() {
        let mut contents = BarrelContents::default()
            .with_item(ItemStack::new(ItemTypeId(1), 2))
            .with_fluid(FluidId(0), 100);
        contents.excess.push(ItemStack::new(ItemTypeId(5), 1));
        let (items, fluid) = contents.eject();
        assert_eq!(items.len(), 2);
        assert_eq!(fluid, Some(FluidStack::new(FluidId(0), 100)));
        assert!(contents.is_empty());
    }
}
