//! Tuning for the temperature model and the individual device kinds.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides. `hearth-data` loads [`HearthConfig`] from
//! `config.{ron,toml,json}`; without a file the defaults apply.

use serde::{Deserialize, Serialize};

/// Rate constants for one device's temperature curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    /// Fraction of the remaining gap to the target closed per tick.
    /// Must be in `(0, 1)`.
    pub approach_rate: f32,
    /// Once within this distance of the target, snap to it.
    pub snap_epsilon: f32,
    /// Exponent multiplier while bellows air is present and heating.
    pub bellows_heating_multiplier: f32,
    /// Exponent multiplier while bellows air is present and cooling.
    pub bellows_cooling_multiplier: f32,
    /// Exponent multiplier while raining.
    pub rain_rate_multiplier: f32,
    /// Target temperature added per tick of stored air.
    pub air_boost_per_tick: f32,
    /// Upper bound on the air boost to the target temperature.
    pub max_air_boost: f32,
    /// Target temperature lost to rain.
    pub rain_target_penalty: f32,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            approach_rate: 0.01,
            snap_epsilon: 0.01,
            bellows_heating_multiplier: 2.0,
            bellows_cooling_multiplier: 0.5,
            rain_rate_multiplier: 0.5,
            air_boost_per_tick: 4.0,
            max_air_boost: 600.0,
            rain_target_penalty: 300.0,
        }
    }
}

impl HeatConfig {
    /// Same curve with a different approach rate.
    pub fn with_rate(approach_rate: f32) -> Self {
        Self {
            approach_rate,
            ..Self::default()
        }
    }
}

/// Shared tuning for fuel-burning devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaterConfig {
    pub heat: HeatConfig,
    /// Number of fuel slots, i.e. the ledger queue capacity.
    pub fuel_slots: usize,
    /// Whether rain reaches the fire (doubles live burn rate, lowers target).
    pub exposed_to_rain: bool,
    /// Cap on stored bellows air.
    pub max_air_ticks: i32,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            heat: HeatConfig::default(),
            fuel_slots: 4,
            exposed_to_rain: true,
            max_air_ticks: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirepitConfig {
    pub heater: HeaterConfig,
    /// Multiplier applied to the smoke dirtiness on every evaluation.
    pub dirtiness_decay: f32,
    /// Ticks between smoke evaluations.
    pub smoke_interval: i64,
}

impl Default for FirepitConfig {
    fn default() -> Self {
        Self {
            heater: HeaterConfig::default(),
            dirtiness_decay: 0.99,
            smoke_interval: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub heater: HeaterConfig,
    /// Burn ticks granted when a forge is first built from a charcoal pile.
    pub first_burn_ticks: i32,
    /// Burn temperature granted when a forge is first built.
    pub first_burn_temperature: f32,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            heater: HeaterConfig {
                fuel_slots: 5,
                ..HeaterConfig::default()
            },
            first_burn_ticks: 200,
            first_burn_temperature: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastFurnaceConfig {
    pub heater: HeaterConfig,
}

impl Default for BlastFurnaceConfig {
    fn default() -> Self {
        Self {
            heater: HeaterConfig {
                heat: HeatConfig::with_rate(0.005),
                fuel_slots: 20,
                exposed_to_rain: false,
                ..HeaterConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrucibleConfig {
    pub heat: HeatConfig,
    /// Ticks after an external heat source sets the target during which the
    /// target does not decay.
    pub stability_ticks: i32,
}

impl Default for CrucibleConfig {
    fn default() -> Self {
        Self {
            heat: HeatConfig::default(),
            stability_ticks: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrelConfig {
    /// Fluid tank size in millibuckets.
    pub tank_capacity: u32,
}

impl Default for BarrelConfig {
    fn default() -> Self {
        Self {
            tank_capacity: crate::item::DEFAULT_TANK_CAPACITY,
        }
    }
}

/// Top-level configuration for all device kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    pub firepit: FirepitConfig,
    pub forge: ForgeConfig,
    pub blast_furnace: BlastFurnaceConfig,
    pub barrel: BarrelConfig,
    pub crucible: CrucibleConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = HearthConfig::default();
        assert_eq!(config.firepit.heater.fuel_slots, 4);
        assert_eq!(config.forge.heater.fuel_slots, 5);
        assert!(!config.blast_furnace.heater.exposed_to_rain);
        assert_eq!(config.crucible.stability_ticks, 5);
        assert_eq!(config.barrel.tank_capacity, 10_000);
        assert_eq!(config.firepit.smoke_interval, 20);
        let rate = config.firepit.heater.heat.approach_rate;
        assert!(rate > 0.0 && rate < 1.0);
    }

    #[test]
    fn with_rate_keeps_other_fields() {
        let heat = HeatConfig::with_rate(0.2);
        assert_eq!(heat.approach_rate, 0.2);
        assert_eq!(heat.rain_target_penalty, 300.0);
    }
}
