//! Name resolution from data-file structs to registry types.
//!
//! Items, fluids and traits are registered first and recorded in
//! [`NameTables`]; fuels and recipes are then resolved against those tables.

use hearth_core::id::{FluidId, ItemTypeId, TraitId};
use hearth_core::item::FluidStack;
use hearth_core::recipe::{FluidIngredient, ItemIngredient, ItemOutput, RecipeDuration, SealedRecipe};
use hearth_core::registry::FuelDef;
use std::collections::HashMap;
use std::path::Path;

use crate::loader::DataLoadError;
use crate::schema::*;

/// Name-to-id maps for everything fuels and recipes can refer to.
#[derive(Debug, Default)]
pub struct NameTables {
    pub items: HashMap<String, ItemTypeId>,
    pub fluids: HashMap<String, FluidId>,
    pub traits: HashMap<String, TraitId>,
}

impl NameTables {
    fn item(&self, name: &str, file: &Path) -> Result<ItemTypeId, DataLoadError> {
        lookup(&self.items, name, file, "item")
    }

    fn fluid(&self, name: &str, file: &Path) -> Result<FluidId, DataLoadError> {
        lookup(&self.fluids, name, file, "fluid")
    }

    fn traits(&self, names: &[String], file: &Path) -> Result<Vec<TraitId>, DataLoadError> {
        names
            .iter()
            .map(|n| lookup(&self.traits, n, file, "trait"))
            .collect()
    }
}

fn lookup<V: Copy>(
    table: &HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<V, DataLoadError> {
    table
        .get(name)
        .copied()
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        })
}

pub(crate) fn resolve_fuel(
    data: &FuelData,
    file: &Path,
    names: &NameTables,
) -> Result<FuelDef, DataLoadError> {
    let item = data
        .item
        .as_deref()
        .map(|name| names.item(name, file))
        .transpose()?;
    let burn_duration = i32::try_from(data.burn_duration.ticks()).map_err(|_| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail: format!("fuel '{}' burns for too long", data.name),
    })?;
    Ok(FuelDef {
        name: data.name.clone(),
        item,
        burn_duration,
        burn_temperature: data.burn_temperature,
        purity: data.purity,
    })
}

fn resolve_duration(
    data: &RecipeDurationData,
    recipe: &str,
    file: &Path,
) -> Result<RecipeDuration, DataLoadError> {
    match data {
        RecipeDurationData::Finite(d) => Ok(RecipeDuration::Finite(d.ticks())),
        RecipeDurationData::Keyword(k) if k == "infinite" => Ok(RecipeDuration::Infinite),
        RecipeDurationData::Keyword(k) => Err(DataLoadError::Parse {
            file: file.to_path_buf(),
            detail: format!("recipe '{recipe}': unknown duration '{k}'"),
        }),
    }
}

pub(crate) fn resolve_recipe(
    data: &BarrelRecipeData,
    file: &Path,
    names: &NameTables,
) -> Result<SealedRecipe, DataLoadError> {
    let input_item = data
        .input_item
        .as_ref()
        .map(|i| -> Result<_, DataLoadError> {
            Ok(ItemIngredient {
                items: i
                    .items
                    .iter()
                    .map(|n| names.item(n, file))
                    .collect::<Result<_, _>>()?,
                required_traits: names.traits(&i.required_traits, file)?,
                forbidden_traits: names.traits(&i.forbidden_traits, file)?,
                count: i.count,
            })
        })
        .transpose()?;

    let input_fluid = data
        .input_fluid
        .as_ref()
        .map(|f| -> Result<_, DataLoadError> {
            Ok(FluidIngredient {
                fluid: names.fluid(&f.fluid, file)?,
                amount: f.amount,
            })
        })
        .transpose()?;

    let output_item = match &data.output_item {
        ItemOutputData::Empty => ItemOutput::Empty,
        ItemOutputData::CopyInput {
            add_traits,
            remove_traits,
        } => ItemOutput::CopyInput {
            add_traits: names.traits(add_traits, file)?,
            remove_traits: names.traits(remove_traits, file)?,
        },
        ItemOutputData::Stack { item, count } => ItemOutput::Stack {
            item: names.item(item, file)?,
            count: *count,
        },
    };

    let output_fluid = data
        .output_fluid
        .as_ref()
        .map(|f| names.fluid(&f.fluid, file).map(|id| FluidStack::new(id, f.amount)))
        .transpose()?;

    Ok(SealedRecipe {
        name: data.name.clone(),
        input_item,
        input_fluid,
        output_item,
        output_fluid,
        duration: resolve_duration(&data.duration, &data.name, file)?,
        on_seal: names.traits(&data.on_seal, file)?,
        on_unseal: names.traits(&data.on_unseal, file)?,
    })
}
