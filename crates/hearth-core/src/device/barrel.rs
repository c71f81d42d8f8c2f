use super::{CalendarTickable, HasRecipeChain, UpdateContext};
use crate::clock::Ticks;
use crate::config::BarrelConfig;
use crate::event::Event;
use crate::id::{DeviceId, RecipeId};
use crate::item::{BarrelContents, FluidStack, ItemStack};
use crate::recipe::{RecipeChain, RecipeLookup, RecipeTransition, TransitionKind};

/// A wooden barrel. While sealed it runs whatever sealed recipe its contents
/// match, and keeps chaining follow-up recipes as each one completes.
///
/// Contents can only be changed while the barrel is open. Every change
/// re-selects the recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Barrel {
    contents: BarrelContents,
    sealed: bool,
    chain: RecipeChain,
    last_update_tick: Ticks,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarrelError {
    #[error("barrel is sealed")]
    Sealed,
}

impl Barrel {
    pub fn new(config: &BarrelConfig, now: Ticks) -> Self {
        Self {
            contents: BarrelContents::new(config.tank_capacity),
            sealed: false,
            chain: RecipeChain::new(),
            last_update_tick: now,
        }
    }

    /// Rebuild a barrel from persisted state.
    pub fn from_parts(
        contents: BarrelContents,
        sealed: bool,
        chain: RecipeChain,
        last_update_tick: Ticks,
    ) -> Self {
        Self {
            contents,
            sealed,
            chain,
            last_update_tick,
        }
    }

    pub fn contents(&self) -> &BarrelContents {
        &self.contents
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn active_recipe(&self) -> Option<RecipeId> {
        self.chain.active()
    }

    /// Seal the barrel and start the matching recipe, if any.
    pub fn seal(&mut self, ctx: &mut UpdateContext<'_>) -> Option<RecipeId> {
        if self.sealed {
            return self.chain.active();
        }
        self.sealed = true;
        let now = ctx.now();
        let started = self.chain.seal(&mut self.contents, now, ctx.lookup);
        if let Some(recipe) = started {
            ctx.emit(Event::RecipeStarted {
                device: ctx.device,
                recipe,
                tick: now,
                retroactive: false,
            });
        }
        started
    }

    pub fn unseal(&mut self, ctx: &mut UpdateContext<'_>) {
        if !self.sealed {
            return;
        }
        self.sealed = false;
        self.chain.unseal(&mut self.contents, ctx.now(), ctx.lookup);
    }

    /// Put items in the slot. Anything that does not fit spills into the
    /// overflow list.
    pub fn insert_item(
        &mut self,
        stack: ItemStack,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<(), BarrelError> {
        self.ensure_open()?;
        let max = ctx.lookup.max_stack(stack.item_type);
        self.contents.insert_with_overflow(stack, max);
        self.contents_changed(ctx);
        Ok(())
    }

    /// Pour fluid in. Returns the amount accepted.
    pub fn fill(&mut self, stack: FluidStack, ctx: &mut UpdateContext<'_>) -> Result<u32, BarrelError> {
        self.ensure_open()?;
        let accepted = self.contents.fill(stack);
        self.contents_changed(ctx);
        Ok(accepted)
    }

    /// Take the item slot, then the first overflow stack moves up into it.
    pub fn take_item(&mut self, ctx: &mut UpdateContext<'_>) -> Result<Option<ItemStack>, BarrelError> {
        self.ensure_open()?;
        let taken = self.contents.take_item();
        if !self.contents.excess.is_empty() {
            self.contents.item = Some(self.contents.excess.remove(0));
        }
        self.contents_changed(ctx);
        Ok(taken)
    }

    pub fn drain(&mut self, ctx: &mut UpdateContext<'_>) -> Result<Option<FluidStack>, BarrelError> {
        self.ensure_open()?;
        let drained = self.contents.drain();
        self.contents_changed(ctx);
        Ok(drained)
    }

    /// Empty the barrel for removal.
    pub fn eject(&mut self) -> (Vec<ItemStack>, Option<FluidStack>) {
        self.sealed = false;
        self.chain = RecipeChain::new();
        self.contents.eject()
    }

    fn ensure_open(&self) -> Result<(), BarrelError> {
        if self.sealed {
            Err(BarrelError::Sealed)
        } else {
            Ok(())
        }
    }

    fn contents_changed(&mut self, ctx: &mut UpdateContext<'_>) {
        self.chain.rederive(&self.contents, ctx.now(), ctx.lookup);
    }
}

fn transition_event(device: DeviceId, t: RecipeTransition) -> Event {
    match t.kind {
        TransitionKind::Completed => Event::RecipeCompleted {
            device,
            recipe: t.recipe,
            tick: t.tick,
            retroactive: t.retroactive,
        },
        TransitionKind::Invalidated => Event::RecipeInvalidated {
            device,
            recipe: t.recipe,
            tick: t.tick,
            retroactive: t.retroactive,
        },
        TransitionKind::Chained => Event::RecipeStarted {
            device,
            recipe: t.recipe,
            tick: t.tick,
            retroactive: t.retroactive,
        },
    }
}

impl HasRecipeChain for Barrel {
    fn chain(&self) -> &RecipeChain {
        &self.chain
    }
}

impl CalendarTickable for Barrel {
    fn last_update_tick(&self) -> Ticks {
        self.last_update_tick
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        self.last_update_tick = tick;
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        let lookup = ctx.lookup;
        let device = ctx.device;

        // Selection as of the start of the gap.
        {
            let tr = ctx.clock.transaction(-elapsed);
            let before = self.chain.active();
            if self.chain.rederive(&self.contents, tr.now(), lookup)
                && let Some(recipe) = self.chain.active()
            {
                tracing::debug!(?before, ?recipe, "barrel recipe re-derived on reload");
            }
        }

        if !self.sealed {
            return;
        }
        let events = &mut *ctx.events;
        let report = self.chain.catch_up(&mut self.contents, ctx.clock, lookup, |t| {
            events.emit(transition_event(device, t));
        });
        tracing::debug!(
            elapsed,
            iterations = report.iterations,
            completions = report.completions,
            "barrel caught up"
        );
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        if !self.sealed {
            return;
        }
        let lookup = ctx.lookup;
        let device = ctx.device;
        let end = ctx.now() + 1;
        let events = &mut *ctx.events;
        self.chain.tick(&mut self.contents, end, lookup, |t| {
            events.emit(transition_event(device, t));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TICKS_IN_HOUR;
    use crate::event::EventKind;
    use crate::test_utils::{Harness, PicklingIds};

    fn filled(h: &mut Harness, ids: &PicklingIds, cucumbers: u32, fluid: crate::id::FluidId) -> Barrel {
        let mut barrel = Barrel::new(&h.config.barrel, h.clock.now());
        let mut ctx = h.ctx();
        barrel
            .insert_item(ItemStack::new(ids.cucumber, cucumbers), &mut ctx)
            .unwrap();
        let _ = barrel.fill(FluidStack::new(fluid, 1_000), &mut ctx).unwrap();
        barrel
    }

    #[test]
    fn sealed_barrel_rejects_changes() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = filled(&mut h, &ids, 4, ids.brine);
        barrel.seal(&mut h.ctx());
        assert_eq!(
            barrel.insert_item(ItemStack::new(ids.cucumber, 1), &mut h.ctx()),
            Err(BarrelError::Sealed)
        );
        assert_eq!(barrel.drain(&mut h.ctx()), Err(BarrelError::Sealed));
    }

    #[test]
    fn unsealed_barrel_does_not_progress() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = filled(&mut h, &ids, 4, ids.brine);
        assert_eq!(barrel.active_recipe(), h.registry.sealed_by_name("brining"));
        h.clock.advance(10 * TICKS_IN_HOUR);
        barrel.check_for_calendar_update(&mut h.ctx());
        let item = barrel.contents().item.as_ref().unwrap();
        assert!(!item.has_trait(ids.brined));
    }

    #[test]
    fn reload_completes_retroactively() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = filled(&mut h, &ids, 4, ids.brine);
        barrel.seal(&mut h.ctx());
        h.clock.advance(5 * TICKS_IN_HOUR);
        barrel.check_for_calendar_update(&mut h.ctx());
        let item = barrel.contents().item.as_ref().unwrap();
        assert!(item.has_trait(ids.brined));
        assert_eq!(barrel.active_recipe(), None);
        let completed: Vec<_> = h.events.events(EventKind::RecipeCompleted).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].tick(), TICKS_IN_HOUR);
        assert!(completed[0].is_retroactive());
    }

    #[test]
    fn live_completion_is_not_retroactive() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = filled(&mut h, &ids, 1, ids.brine);
        barrel.seal(&mut h.ctx());
        for _ in 0..TICKS_IN_HOUR {
            barrel.tick(&mut h.ctx());
            h.clock.advance(1);
        }
        let completed: Vec<_> = h.events.events(EventKind::RecipeCompleted).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].tick(), TICKS_IN_HOUR);
        assert!(!completed[0].is_retroactive());
    }

    #[test]
    fn unseal_removes_seal_traits() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = Barrel::new(&h.config.barrel, 0);
        {
            let mut ctx = h.ctx();
            barrel
                .insert_item(ItemStack::new(ids.cucumber, 1).with_trait(ids.pickled), &mut ctx)
                .unwrap();
            let _ = barrel.fill(FluidStack::new(ids.vinegar, 100), &mut ctx).unwrap();
        }
        barrel.seal(&mut h.ctx());
        assert!(barrel.contents().item.as_ref().unwrap().has_trait(ids.preserved));
        barrel.unseal(&mut h.ctx());
        assert!(!barrel.contents().item.as_ref().unwrap().has_trait(ids.preserved));
    }

    #[test]
    fn take_item_promotes_overflow() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = Barrel::new(&h.config.barrel, 0);
        barrel
            .insert_item(ItemStack::new(ids.cucumber, 100), &mut h.ctx())
            .unwrap();
        assert_eq!(barrel.contents().excess.len(), 1);
        let taken = barrel.take_item(&mut h.ctx()).unwrap().unwrap();
        assert_eq!(taken.quantity, 64);
        assert_eq!(barrel.contents().item_count(), 36);
        assert!(barrel.contents().excess.is_empty());
    }

    #[test]
    fn eject_empties_everything() {
        let mut h = Harness::new();
        let ids = h.pickling_ids();
        let mut barrel = filled(&mut h, &ids, 3, ids.brine);
        barrel.seal(&mut h.ctx());
        let (items, fluid) = barrel.eject();
        assert_eq!(items.len(), 1);
        assert_eq!(fluid.map(|f| f.amount), Some(1_000));
        assert!(barrel.contents().is_empty());
        assert!(!barrel.is_sealed());
    }
}
