use super::heater::{FuelHeater, HeaterError};
use super::{CalendarTickable, HasFuelLedger, HasTemperature, UpdateContext};
use crate::clock::Ticks;
use crate::config::ForgeConfig;
use crate::fuel::{FuelItem, FuelLedger, LedgerError};
use serde::{Deserialize, Serialize};

/// A charcoal forge. It is built from a burning charcoal pile, so it comes
/// into the world already lit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forge {
    heater: FuelHeater,
}

impl Forge {
    pub fn new(config: &ForgeConfig, now: Ticks) -> Self {
        let mut heater = FuelHeater::new(config.heater.fuel_slots, now);
        heater.ignite_with(config.first_burn_ticks, config.first_burn_temperature);
        Self { heater }
    }

    pub fn heater(&self) -> &FuelHeater {
        &self.heater
    }

    pub fn is_lit(&self) -> bool {
        self.heater.is_lit()
    }

    pub fn add_fuel(&mut self, item: FuelItem) -> Result<(), LedgerError> {
        self.heater.add_fuel(item)
    }

    pub fn ignite(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), HeaterError> {
        self.heater.ignite(ctx).map(|_| ())
    }

    pub fn intake_air(&mut self, amount: i32, config: &ForgeConfig) {
        self.heater.intake_air(amount, config.heater.max_air_ticks);
    }

    pub fn eject(&mut self) -> Vec<FuelItem> {
        self.heater.eject()
    }
}

impl HasTemperature for Forge {
    fn temperature(&self) -> f32 {
        self.heater.temperature()
    }
}

impl HasFuelLedger for Forge {
    fn ledger(&self) -> &FuelLedger {
        self.heater.ledger()
    }

    fn ledger_mut(&mut self) -> &mut FuelLedger {
        self.heater.ledger_mut()
    }
}

impl CalendarTickable for Forge {
    fn last_update_tick(&self) -> Ticks {
        self.heater.last_update_tick()
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        self.heater.set_last_update_tick(tick);
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        self.heater.catch_up(elapsed, &config.forge.heater, ctx);
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        self.heater.tick_live(&config.forge.heater, ctx);
    }
}
