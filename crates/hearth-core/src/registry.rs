use crate::fuel::FuelItem;
use crate::id::*;
use crate::item::{BarrelContents, DEFAULT_MAX_STACK};
use crate::recipe::{ItemOutput, MAX_RECIPE_DURATION, RecipeDuration, RecipeLookup, SealedRecipe};
use std::collections::HashMap;

/// An item type definition in the registry.
#[derive(Debug, Clone)]
pub struct ItemTypeDef {
    pub name: String,
    pub max_stack: u32,
}

#[derive(Debug, Clone)]
pub struct FluidDef {
    pub name: String,
}

/// A named item trait (brined, pickled, ...).
#[derive(Debug, Clone)]
pub struct TraitDef {
    pub name: String,
}

/// A fuel definition: how long one unit burns and how hot.
#[derive(Debug, Clone)]
pub struct FuelDef {
    pub name: String,
    /// The item that counts as this fuel, if it is an item at all.
    pub item: Option<ItemTypeId>,
    pub burn_duration: i32,
    pub burn_temperature: f32,
    pub purity: f32,
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    fluids: Vec<FluidDef>,
    fluid_name_to_id: HashMap<String, FluidId>,
    traits: Vec<TraitDef>,
    trait_name_to_id: HashMap<String, TraitId>,
    fuels: Vec<FuelDef>,
    fuel_name_to_id: HashMap<String, FuelId>,
    recipes: Vec<SealedRecipe>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str, max_stack: u32) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemTypeDef {
            name: name.to_string(),
            max_stack,
        });
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a fluid. Returns its ID.
    pub fn register_fluid(&mut self, name: &str) -> FluidId {
        let id = FluidId(self.fluids.len() as u32);
        self.fluids.push(FluidDef {
            name: name.to_string(),
        });
        self.fluid_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register an item trait. Returns its ID.
    pub fn register_trait(&mut self, name: &str) -> TraitId {
        let id = TraitId(self.traits.len() as u16);
        self.traits.push(TraitDef {
            name: name.to_string(),
        });
        self.trait_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Phase 1: Register a fuel. Returns its ID.
    pub fn register_fuel(&mut self, def: FuelDef) -> FuelId {
        let id = FuelId(self.fuels.len() as u32);
        self.fuel_name_to_id.insert(def.name.clone(), id);
        self.fuels.push(def);
        id
    }

    /// Phase 1: Register a sealed barrel recipe. Returns its ID.
    ///
    /// Registration order is match priority: the first recipe that matches a
    /// barrel's contents wins.
    pub fn register_sealed_recipe(&mut self, recipe: SealedRecipe) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipe_name_to_id.insert(recipe.name.clone(), id);
        self.recipes.push(recipe);
        id
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut SealedRecipe),
    {
        let id = self
            .recipe_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.recipes[id.0 as usize]);
        Ok(())
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn fluid_id(&self, name: &str) -> Option<FluidId> {
        self.fluid_name_to_id.get(name).copied()
    }

    pub fn trait_id(&self, name: &str) -> Option<TraitId> {
        self.trait_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    fn check_item(&self, id: ItemTypeId) -> Result<(), RegistryError> {
        if id.0 as usize >= self.items.len() {
            return Err(RegistryError::InvalidItemRef(id));
        }
        Ok(())
    }

    fn check_fluid(&self, id: FluidId) -> Result<(), RegistryError> {
        if id.0 as usize >= self.fluids.len() {
            return Err(RegistryError::InvalidFluidRef(id));
        }
        Ok(())
    }

    fn check_trait(&self, id: TraitId) -> Result<(), RegistryError> {
        if id.0 as usize >= self.traits.len() {
            return Err(RegistryError::InvalidTraitRef(id));
        }
        Ok(())
    }

    fn validate_recipe(&self, recipe: &SealedRecipe) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidRecipe {
            name: recipe.name.clone(),
            reason: reason.to_string(),
        };
        if recipe.input_item.is_none() && recipe.input_fluid.is_none() {
            return Err(invalid("needs an item or fluid input"));
        }
        if let RecipeDuration::Finite(ticks) = recipe.duration {
            if ticks <= 0 {
                return Err(invalid("finite duration must be positive"));
            }
            if ticks > MAX_RECIPE_DURATION {
                return Err(invalid("finite duration is too long"));
            }
        }
        if let Some(ingredient) = &recipe.input_item {
            if ingredient.count == 0 {
                return Err(invalid("item input count must be positive"));
            }
            for item in &ingredient.items {
                self.check_item(*item)?;
            }
            for t in ingredient
                .required_traits
                .iter()
                .chain(&ingredient.forbidden_traits)
            {
                self.check_trait(*t)?;
            }
        }
        if let Some(ingredient) = &recipe.input_fluid {
            if ingredient.amount == 0 {
                return Err(invalid("fluid input amount must be positive"));
            }
            self.check_fluid(ingredient.fluid)?;
        }
        match &recipe.output_item {
            ItemOutput::Empty => {}
            ItemOutput::CopyInput {
                add_traits,
                remove_traits,
            } => {
                for t in add_traits.iter().chain(remove_traits) {
                    self.check_trait(*t)?;
                }
            }
            ItemOutput::Stack { item, count } => {
                self.check_item(*item)?;
                let max_stack = self.items[item.0 as usize].max_stack;
                if *count == 0 || *count > max_stack {
                    return Err(invalid("stack output count must fit in one stack"));
                }
            }
        }
        if let Some(out) = &recipe.output_fluid {
            if out.amount == 0 {
                return Err(invalid("fluid output amount must be positive"));
            }
            self.check_fluid(out.fluid)?;
        }
        for t in recipe.on_seal.iter().chain(&recipe.on_unseal) {
            self.check_trait(*t)?;
        }
        Ok(())
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        for fuel in &self.fuels {
            if fuel.burn_duration <= 0 || fuel.burn_temperature <= 0.0 {
                return Err(RegistryError::InvalidFuel(fuel.name.clone()));
            }
            if let Some(item) = fuel.item {
                self.check_item(item)?;
            }
        }
        for recipe in &self.recipes {
            self.validate_recipe(recipe)?;
        }

        let fuel_by_item = self
            .fuels
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.item.map(|item| (item, FuelId(i as u32))))
            .collect();

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            fluids: self.fluids,
            fluid_name_to_id: self.fluid_name_to_id,
            traits: self.traits,
            trait_name_to_id: self.trait_name_to_id,
            fuels: self.fuels,
            fuel_name_to_id: self.fuel_name_to_id,
            fuel_by_item,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug, Default)]
pub struct Registry {
    items: Vec<ItemTypeDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    fluids: Vec<FluidDef>,
    fluid_name_to_id: HashMap<String, FluidId>,
    traits: Vec<TraitDef>,
    trait_name_to_id: HashMap<String, TraitId>,
    fuels: Vec<FuelDef>,
    fuel_name_to_id: HashMap<String, FuelId>,
    fuel_by_item: HashMap<ItemTypeId, FuelId>,
    recipes: Vec<SealedRecipe>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl Registry {
    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemTypeDef> {
        self.items.get(id.0 as usize)
    }

    pub fn get_fluid(&self, id: FluidId) -> Option<&FluidDef> {
        self.fluids.get(id.0 as usize)
    }

    pub fn get_trait(&self, id: TraitId) -> Option<&TraitDef> {
        self.traits.get(id.0 as usize)
    }

    pub fn get_fuel(&self, id: FuelId) -> Option<&FuelDef> {
        self.fuels.get(id.0 as usize)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Option<&SealedRecipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn fluid_id(&self, name: &str) -> Option<FluidId> {
        self.fluid_name_to_id.get(name).copied()
    }

    pub fn trait_id(&self, name: &str) -> Option<TraitId> {
        self.trait_name_to_id.get(name).copied()
    }

    pub fn fuel_id(&self, name: &str) -> Option<FuelId> {
        self.fuel_name_to_id.get(name).copied()
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// The fuel an item burns as, if any.
    pub fn fuel_for_item(&self, item: ItemTypeId) -> Option<FuelId> {
        self.fuel_by_item.get(&item).copied()
    }

    /// A burnable unit of the given fuel.
    pub fn fuel_item(&self, id: FuelId) -> Option<FuelItem> {
        let def = self.get_fuel(id)?;
        Some(FuelItem {
            fuel: id,
            burn_duration: def.burn_duration,
            burn_temperature: def.burn_temperature,
            purity: def.purity.clamp(0.0, 1.0),
        })
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn fluid_count(&self) -> usize {
        self.fluids.len()
    }

    pub fn fuel_count(&self) -> usize {
        self.fuels.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Shortest finite recipe duration, if any recipe is finite.
    pub fn min_recipe_duration(&self) -> Option<i64> {
        self.recipes.iter().filter_map(|r| r.duration.ticks()).min()
    }
}

impl RecipeLookup for Registry {
    fn sealed(&self, id: RecipeId) -> Option<&SealedRecipe> {
        self.get_recipe(id)
    }

    fn sealed_by_name(&self, name: &str) -> Option<RecipeId> {
        self.recipe_id(name)
    }

    fn find_sealed(&self, contents: &BarrelContents) -> Option<RecipeId> {
        // Pending overflow blocks every recipe until it is taken out.
        if !contents.excess.is_empty() {
            return None;
        }
        self.recipes
            .iter()
            .position(|r| r.matches(contents))
            .map(|i| RecipeId(i as u32))
    }

    fn max_stack(&self, item: ItemTypeId) -> u32 {
        self.get_item(item)
            .map(|def| def.max_stack.max(1))
            .unwrap_or(DEFAULT_MAX_STACK)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("invalid fluid reference: {0:?}")]
    InvalidFluidRef(FluidId),
    #[error("invalid trait reference: {0:?}")]
    InvalidTraitRef(TraitId),
    #[error("fuel '{0}' must burn for a positive duration at a positive temperature")]
    InvalidFuel(String),
    #[error("recipe '{name}': {reason}")]
    InvalidRecipe { name: String, reason: String },
}
