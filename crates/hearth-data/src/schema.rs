//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for items, fluids, traits, fuels
//! and sealed barrel recipes. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into registry types by the loader.
//! Everything refers to everything else by name.

use hearth_core::clock::{TICKS_IN_HOUR, Ticks};
use serde::Deserialize;

// ===========================================================================
// Items, fluids, traits
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
}

fn default_max_stack() -> u32 {
    hearth_core::item::DEFAULT_MAX_STACK
}

#[derive(Debug, Clone, Deserialize)]
pub struct FluidData {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraitData {
    pub name: String,
}

// ===========================================================================
// Durations
// ===========================================================================

/// A duration written either as a bare tick count or in calendar hours.
///
/// `600`, `(hours: 1.5)` in RON, `{"hours": 1.5}` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationData {
    Ticks(Ticks),
    Hours { hours: f64 },
}

impl DurationData {
    pub fn ticks(self) -> Ticks {
        match self {
            DurationData::Ticks(ticks) => ticks,
            DurationData::Hours { hours } => (hours * TICKS_IN_HOUR as f64).round() as Ticks,
        }
    }
}

/// A recipe duration: finite as in [`DurationData`], or the string
/// `"infinite"` for recipes that never complete.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecipeDurationData {
    Finite(DurationData),
    Keyword(String),
}

// ===========================================================================
// Fuels
// ===========================================================================

/// A fuel definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FuelData {
    pub name: String,
    /// Item that burns as this fuel. Fuels without an item can only be
    /// pushed into a ledger directly.
    #[serde(default)]
    pub item: Option<String>,
    pub burn_duration: DurationData,
    pub burn_temperature: f32,
    #[serde(default = "default_purity")]
    pub purity: f32,
}

fn default_purity() -> f32 {
    1.0
}

// ===========================================================================
// Sealed barrel recipes
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ItemIngredientData {
    pub items: Vec<String>,
    #[serde(default)]
    pub required_traits: Vec<String>,
    #[serde(default)]
    pub forbidden_traits: Vec<String>,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct FluidAmountData {
    pub fluid: String,
    pub amount: u32,
}

/// What a recipe leaves in the item slot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutputData {
    #[default]
    Empty,
    CopyInput {
        #[serde(default)]
        add_traits: Vec<String>,
        #[serde(default)]
        remove_traits: Vec<String>,
    },
    Stack {
        item: String,
        count: u32,
    },
}

/// A sealed barrel recipe in a data file. File order is match priority.
#[derive(Debug, Clone, Deserialize)]
pub struct BarrelRecipeData {
    pub name: String,
    #[serde(default)]
    pub input_item: Option<ItemIngredientData>,
    #[serde(default)]
    pub input_fluid: Option<FluidAmountData>,
    #[serde(default)]
    pub output_item: ItemOutputData,
    #[serde(default)]
    pub output_fluid: Option<FluidAmountData>,
    pub duration: RecipeDurationData,
    #[serde(default)]
    pub on_seal: Vec<String>,
    #[serde(default)]
    pub on_unseal: Vec<String>,
}

// ===========================================================================
// Tests
// ===========================================================================
