use crate::clock::{Clock, TICKS_IN_DAY, Ticks};
use crate::id::{FluidId, ItemTypeId, RecipeId, TraitId};
use crate::item::{BarrelContents, DEFAULT_MAX_STACK, FluidStack, ItemStack};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Recipe definitions
// ---------------------------------------------------------------------------

/// Longest finite recipe the registry accepts: a thousand in-game years.
pub const MAX_RECIPE_DURATION: Ticks = TICKS_IN_DAY * 365 * 1000;

/// How long a sealed recipe takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeDuration {
    Finite(Ticks),
    /// Never completes. A barrel holding an infinite recipe is parked until
    /// its contents change.
    Infinite,
}

impl RecipeDuration {
    pub fn ticks(self) -> Option<Ticks> {
        match self {
            RecipeDuration::Finite(t) => Some(t),
            RecipeDuration::Infinite => None,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, RecipeDuration::Infinite)
    }
}

/// Which items a recipe accepts in the barrel's item slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIngredient {
    /// Accepted item types. Empty accepts any item.
    pub items: Vec<ItemTypeId>,
    #[serde(default)]
    pub required_traits: Vec<TraitId>,
    #[serde(default)]
    pub forbidden_traits: Vec<TraitId>,
    pub count: u32,
}

impl ItemIngredient {
    pub fn test(&self, stack: &ItemStack) -> bool {
        (self.items.is_empty() || self.items.contains(&stack.item_type))
            && self.required_traits.iter().all(|t| stack.has_trait(*t))
            && !self.forbidden_traits.iter().any(|t| stack.has_trait(*t))
            && stack.quantity >= self.count.max(1)
    }
}

/// A required amount of one fluid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidIngredient {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidIngredient {
    pub fn test(&self, stack: &FluidStack) -> bool {
        stack.fluid == self.fluid && stack.amount >= self.amount.max(1)
    }
}

/// What ends up in the item slot when a recipe completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutput {
    /// The input is consumed and nothing replaces it.
    #[default]
    Empty,
    /// The input item itself, with traits changed.
    CopyInput {
        #[serde(default)]
        add_traits: Vec<TraitId>,
        #[serde(default)]
        remove_traits: Vec<TraitId>,
    },
    /// A new stack, `count` per recipe multiple.
    Stack { item: ItemTypeId, count: u32 },
}

/// A recipe that runs while a barrel is sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedRecipe {
    pub name: String,
    pub input_item: Option<ItemIngredient>,
    pub input_fluid: Option<FluidIngredient>,
    #[serde(default)]
    pub output_item: ItemOutput,
    pub output_fluid: Option<FluidStack>,
    pub duration: RecipeDuration,
    /// Traits added to the item when the recipe starts on a sealed barrel.
    #[serde(default)]
    pub on_seal: Vec<TraitId>,
    /// Traits removed from the item when the barrel is opened mid-recipe.
    #[serde(default)]
    pub on_unseal: Vec<TraitId>,
}

impl SealedRecipe {
    /// Whether the barrel's current contents satisfy this recipe. An absent
    /// ingredient requires the matching slot to be empty.
    pub fn matches(&self, contents: &BarrelContents) -> bool {
        let item_ok = match (&self.input_item, &contents.item) {
            (Some(ingredient), Some(stack)) => ingredient.test(stack),
            (None, None) => true,
            _ => false,
        };
        let fluid_ok = match (&self.input_fluid, &contents.fluid) {
            (Some(ingredient), Some(stack)) => ingredient.test(stack),
            (None, None) => true,
            _ => false,
        };
        item_ok && fluid_ok
    }

    /// Replace the inputs with the outputs, as many times over as the inputs
    /// allow. New stacks are stamped with `now`.
    pub fn assemble<L: RecipeLookup + ?Sized>(
        &self,
        contents: &mut BarrelContents,
        now: Ticks,
        lookup: &L,
    ) {
        let stack = contents.take_item();
        let fluid = contents.drain();
        let item_count = stack.as_ref().map(|s| s.quantity).unwrap_or(0);
        let fluid_amount = fluid.as_ref().map(|f| f.amount).unwrap_or(0);

        let by_item = self
            .input_item
            .as_ref()
            .map(|i| item_count / i.count.max(1));
        let by_fluid = self
            .input_fluid
            .as_ref()
            .map(|f| fluid_amount / f.amount.max(1));
        let mut multiplier = match (by_item, by_fluid) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 0,
        };

        // Output fluid has to fit in the tank.
        if let Some(out) = &self.output_fluid {
            let mut capacity = contents.tank_capacity;
            if let Some(existing) = fluid.as_ref().filter(|f| f.fluid == out.fluid) {
                capacity = capacity.saturating_sub(existing.amount);
            }
            multiplier = multiplier.min(capacity / out.amount.max(1));
        }

        if let Some(input) = &stack {
            let produced = match &self.output_item {
                ItemOutput::Empty => None,
                ItemOutput::CopyInput {
                    add_traits,
                    remove_traits,
                } => {
                    let mut copy = input.with_quantity(multiplier);
                    for t in remove_traits {
                        copy.remove_trait(*t);
                    }
                    for t in add_traits {
                        copy.add_trait(*t);
                    }
                    Some(copy)
                }
                ItemOutput::Stack { item, count } => {
                    Some(ItemStack::new(*item, multiplier.saturating_mul(*count)).created_at(now))
                }
            };
            if let Some(out) = produced.filter(|s| !s.is_empty()) {
                let max = lookup.max_stack(out.item_type);
                contents.insert_with_overflow(out, max);
            }
            let used = multiplier * self.input_item.as_ref().map(|i| i.count).unwrap_or(0);
            let left = input.quantity.saturating_sub(used);
            if left > 0 {
                let max = lookup.max_stack(input.item_type);
                contents.insert_with_overflow(input.with_quantity(left), max);
            }
        } else if let ItemOutput::Stack { item, count } = &self.output_item {
            let out = ItemStack::new(*item, multiplier.saturating_mul(*count)).created_at(now);
            if !out.is_empty() {
                contents.insert_with_overflow(out, lookup.max_stack(*item));
            }
        }

        match (&self.output_fluid, fluid) {
            (None, Some(original)) => {
                let used = multiplier * self.input_fluid.as_ref().map(|f| f.amount).unwrap_or(0);
                let kept = original.amount.saturating_sub(used);
                if kept > 0 {
                    let _ = contents.fill(FluidStack::new(original.fluid, kept));
                }
            }
            (None, None) => {}
            (Some(out), original) => {
                let mut amount = out.amount.saturating_mul(multiplier);
                if let Some(original) = original.filter(|f| f.fluid == out.fluid) {
                    amount = amount.saturating_add(original.amount);
                }
                let amount = amount.min(contents.tank_capacity);
                if amount > 0 {
                    let _ = contents.fill(FluidStack::new(out.fluid, amount));
                }
            }
        }
    }

    pub fn apply_on_seal(&self, contents: &mut BarrelContents) {
        if let Some(stack) = contents.item.as_mut() {
            for t in &self.on_seal {
                stack.add_trait(*t);
            }
        }
    }

    pub fn apply_on_unseal(&self, contents: &mut BarrelContents) {
        if let Some(stack) = contents.item.as_mut() {
            for t in &self.on_unseal {
                stack.remove_trait(*t);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Read-only recipe access handed to the catch-up loop.
///
/// `find_sealed` must be a pure function of the contents: the loop calls it
/// repeatedly while stepping through the past.
pub trait RecipeLookup {
    fn sealed(&self, id: RecipeId) -> Option<&SealedRecipe>;

    fn sealed_by_name(&self, name: &str) -> Option<RecipeId>;

    /// The first sealed recipe matching `contents`, if any.
    fn find_sealed(&self, contents: &BarrelContents) -> Option<RecipeId>;

    fn max_stack(&self, _item: ItemTypeId) -> u32 {
        DEFAULT_MAX_STACK
    }
}

// ---------------------------------------------------------------------------
// Recipe chain
// ---------------------------------------------------------------------------

/// What happened to the chain at one recipe boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// The recipe finished and its outputs were assembled.
    Completed,
    /// The recipe came due but the contents no longer matched.
    Invalidated,
    /// A follow-up recipe started right where the last one ended.
    Chained,
}

/// A recipe boundary, reported to the caller as it is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeTransition {
    pub kind: TransitionKind,
    pub recipe: RecipeId,
    pub tick: Ticks,
    /// Crossed during a calendar update rather than live.
    pub retroactive: bool,
}

/// Summary of one catch-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatchUpReport {
    pub iterations: u32,
    pub completions: u32,
}

/// The recipe a sealed barrel is working on and when it started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeChain {
    active: Option<RecipeId>,
    start_tick: Ticks,
}

impl RecipeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts.
    pub fn from_parts(active: Option<RecipeId>, start_tick: Ticks) -> Self {
        Self { active, start_tick }
    }

    pub fn active(&self) -> Option<RecipeId> {
        self.active
    }

    pub fn start_tick(&self) -> Ticks {
        self.start_tick
    }

    /// Ticks left on a finite active recipe as of `now`.
    pub fn remaining<L: RecipeLookup + ?Sized>(&self, now: Ticks, lookup: &L) -> Option<Ticks> {
        let recipe = lookup.sealed(self.active?)?;
        let duration = recipe.duration.ticks()?;
        Some(self.start_tick.saturating_add(duration).saturating_sub(now).max(0))
    }

    /// Re-select the recipe from the contents. Switching from one recipe to a
    /// different one restarts the clock at `now`. Returns whether the active
    /// recipe changed.
    pub fn rederive<L: RecipeLookup + ?Sized>(
        &mut self,
        contents: &BarrelContents,
        now: Ticks,
        lookup: &L,
    ) -> bool {
        let next = lookup.find_sealed(contents);
        if next == self.active {
            return false;
        }
        if self.active.is_some() && next.is_some() {
            self.start_tick = now;
        }
        self.active = next;
        true
    }

    /// Seal the barrel: pick the recipe, apply its seal effects and start it
    /// at `now`.
    pub fn seal<L: RecipeLookup + ?Sized>(
        &mut self,
        contents: &mut BarrelContents,
        now: Ticks,
        lookup: &L,
    ) -> Option<RecipeId> {
        self.active = lookup.find_sealed(contents);
        self.start_tick = now;
        if let Some(recipe) = self.active.and_then(|id| lookup.sealed(id)) {
            recipe.apply_on_seal(contents);
        }
        self.active
    }

    /// Open the barrel: undo the active recipe's seal effects and re-select.
    pub fn unseal<L: RecipeLookup + ?Sized>(
        &mut self,
        contents: &mut BarrelContents,
        now: Ticks,
        lookup: &L,
    ) {
        if let Some(recipe) = self.active.and_then(|id| lookup.sealed(id)) {
            recipe.apply_on_unseal(contents);
        }
        self.active = lookup.find_sealed(contents);
        self.start_tick = now;
    }

    /// Live tick of a sealed barrel: completes the active recipe once it has
    /// run for its full duration.
    pub fn tick<L, F>(
        &mut self,
        contents: &mut BarrelContents,
        now: Ticks,
        lookup: &L,
        mut observe: F,
    ) -> bool
    where
        L: RecipeLookup + ?Sized,
        F: FnMut(RecipeTransition),
    {
        let Some(duration) = self.active_duration(lookup) else {
            return false;
        };
        if now - self.start_tick < duration {
            return false;
        }
        self.cross_boundary(contents, now, false, lookup, &mut observe);
        true
    }

    /// Jump from recipe end to recipe end until the next end lies in the
    /// future, the chain runs dry, or an infinite recipe takes over.
    ///
    /// Each boundary is handled under a clock transaction at the tick it
    /// actually fell on. Runs once per completion due, never per tick.
    pub fn catch_up<L, F>(
        &mut self,
        contents: &mut BarrelContents,
        clock: &mut Clock,
        lookup: &L,
        mut observe: F,
    ) -> CatchUpReport
    where
        L: RecipeLookup + ?Sized,
        F: FnMut(RecipeTransition),
    {
        let mut report = CatchUpReport::default();
        let Some(mut duration) = self.active_duration(lookup) else {
            return report;
        };
        let now = clock.now();
        let mut end = self.start_tick.saturating_add(duration);
        while end <= now {
            report.iterations += 1;
            let tr = clock.transaction_at(end);
            let completed = self.cross_boundary(contents, tr.now(), true, lookup, &mut observe);
            drop(tr);
            if completed {
                report.completions += 1;
            }
            match self.active_duration(lookup) {
                Some(next) => duration = next,
                None => break,
            }
            end = self.start_tick.saturating_add(duration);
        }
        report
    }

    /// Duration of the active recipe, `None` if idle, infinite, or
    /// unresolvable.
    fn active_duration<L: RecipeLookup + ?Sized>(&self, lookup: &L) -> Option<Ticks> {
        let recipe = lookup.sealed(self.active?)?;
        recipe.duration.ticks()
    }

    /// Finish the active recipe at `tick` and select what comes next.
    /// Returns whether outputs were assembled.
    fn cross_boundary<L, F>(
        &mut self,
        contents: &mut BarrelContents,
        tick: Ticks,
        retroactive: bool,
        lookup: &L,
        observe: &mut F,
    ) -> bool
    where
        L: RecipeLookup + ?Sized,
        F: FnMut(RecipeTransition),
    {
        let Some(id) = self.active else {
            return false;
        };
        let Some(recipe) = lookup.sealed(id) else {
            self.active = None;
            return false;
        };
        let completed = recipe.matches(contents);
        if completed {
            recipe.assemble(contents, tick, lookup);
        }
        observe(RecipeTransition {
            kind: if completed {
                TransitionKind::Completed
            } else {
                TransitionKind::Invalidated
            },
            recipe: id,
            tick,
            retroactive,
        });
        tracing::trace!(recipe = %recipe.name, tick, completed, "recipe boundary");

        self.active = lookup.find_sealed(contents);
        self.start_tick = tick;
        if let Some(next_id) = self.active {
            if let Some(next) = lookup.sealed(next_id) {
                next.apply_on_seal(contents);
            }
            observe(RecipeTransition {
                kind: TransitionKind::Chained,
                recipe: next_id,
                tick,
                retroactive,
            });
        }
        completed
    }
}
