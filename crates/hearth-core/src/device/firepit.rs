use super::heater::{FuelHeater, HeaterError, HeaterReport};
use super::{CalendarTickable, HasFuelLedger, HasTemperature, UpdateContext};
use crate::clock::Ticks;
use crate::config::FirepitConfig;
use crate::fuel::{FuelItem, FuelLedger, LedgerError};
use serde::{Deserialize, Serialize};

/// An open fire. Burns queued fuel and smokes when fed impure fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firepit {
    heater: FuelHeater,
    /// Smoke left behind by impure fuel, in `[0, 1]`.
    dirtiness: f32,
}

impl Firepit {
    pub fn new(config: &FirepitConfig, now: Ticks) -> Self {
        Self {
            heater: FuelHeater::new(config.heater.fuel_slots, now),
            dirtiness: 0.0,
        }
    }

    pub fn heater(&self) -> &FuelHeater {
        &self.heater
    }

    pub fn is_lit(&self) -> bool {
        self.heater.is_lit()
    }

    pub fn dirtiness(&self) -> f32 {
        self.dirtiness
    }

    /// Visible smoke, 0 (none) to 4.
    pub fn smoke_level(&self) -> u8 {
        (self.dirtiness.clamp(0.0, 1.0) * 4.0).ceil() as u8
    }

    pub fn add_fuel(&mut self, item: FuelItem) -> Result<(), LedgerError> {
        self.heater.add_fuel(item)
    }

    pub fn ignite(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), HeaterError> {
        if let Some(item) = self.heater.ignite(ctx)? {
            self.add_smoke(&item);
        }
        Ok(())
    }

    pub fn intake_air(&mut self, amount: i32, config: &FirepitConfig) {
        self.heater.intake_air(amount, config.heater.max_air_ticks);
    }

    pub fn eject(&mut self) -> Vec<FuelItem> {
        self.dirtiness = 0.0;
        self.heater.eject()
    }

    fn add_smoke(&mut self, item: &FuelItem) {
        self.dirtiness = (self.dirtiness + 1.0 - item.purity).clamp(0.0, 1.0);
    }

    fn absorb(&mut self, report: &HeaterReport) {
        for item in &report.consumed {
            self.add_smoke(item);
        }
        if report.extinguished {
            self.dirtiness = 0.0;
        }
    }

    /// Smoke evaluations fall on multiples of `smoke_interval`.
    fn decay_smoke(&mut self, evaluations: Ticks, config: &FirepitConfig) {
        if evaluations > 0 {
            let factor = f64::from(config.dirtiness_decay).powf(evaluations as f64);
            self.dirtiness = (f64::from(self.dirtiness) * factor).clamp(0.0, 1.0) as f32;
        }
    }
}

fn evaluations_between(from: Ticks, to: Ticks, interval: Ticks) -> Ticks {
    let interval = interval.max(1);
    to.div_euclid(interval) - from.div_euclid(interval)
}

impl HasTemperature for Firepit {
    fn temperature(&self) -> f32 {
        self.heater.temperature()
    }
}

impl HasFuelLedger for Firepit {
    fn ledger(&self) -> &FuelLedger {
        self.heater.ledger()
    }

    fn ledger_mut(&mut self) -> &mut FuelLedger {
        self.heater.ledger_mut()
    }
}

impl CalendarTickable for Firepit {
    fn last_update_tick(&self) -> Ticks {
        self.heater.last_update_tick()
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        self.heater.set_last_update_tick(tick);
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        let config = &config.firepit;
        let from = self.heater.last_update_tick();
        let report = self.heater.catch_up(elapsed, &config.heater, ctx);
        self.absorb(&report);
        self.decay_smoke(evaluations_between(from, from + elapsed, config.smoke_interval), config);
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        let config = &config.firepit;
        let report = self.heater.tick_live(&config.heater, ctx);
        self.absorb(&report);
        let now = ctx.now();
        self.decay_smoke(evaluations_between(now, now + 1, config.smoke_interval), config);
    }
}
