use super::heater::{FuelHeater, HeaterError};
use super::{CalendarTickable, HasFuelLedger, HasTemperature, UpdateContext};
use crate::clock::Ticks;
use crate::config::BlastFurnaceConfig;
use crate::fuel::{FuelItem, FuelLedger, LedgerError};
use serde::{Deserialize, Serialize};

/// A blast furnace: a large, enclosed, slow-heating fire. Rain never
/// reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastFurnace {
    heater: FuelHeater,
}

impl BlastFurnace {
    pub fn new(config: &BlastFurnaceConfig, now: Ticks) -> Self {
        Self {
            heater: FuelHeater::new(config.heater.fuel_slots, now),
        }
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

    pub fn intake_air(&mut self, amount: i32, config: &BlastFurnaceConfig) {
        self.heater.intake_air(amount, config.heater.max_air_ticks);
    }

    pub fn eject(&mut self) -> Vec<FuelItem> {
        self.heater.eject()
    }
}

impl HasTemperature for BlastFurnace {
    fn temperature(&self) -> f32 {
        self.heater.temperature()
    }
}

impl HasFuelLedger for BlastFurnace {
    fn ledger(&self) -> &FuelLedger {
        self.heater.ledger()
    }

    fn ledger_mut(&mut self) -> &mut FuelLedger {
        self.heater.ledger_mut()
    }
}

impl CalendarTickable for BlastFurnace {
    fn last_update_tick(&self) -> Ticks {
        self.heater.last_update_tick()
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        self.heater.set_last_update_tick(tick);
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        self.heater.catch_up(elapsed, &config.blast_furnace.heater, ctx);
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        self.heater.tick_live(&config.blast_furnace.heater, ctx);
    }
}
