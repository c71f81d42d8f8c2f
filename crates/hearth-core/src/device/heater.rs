use super::UpdateContext;
use crate::clock::Ticks;
use crate::config::HeaterConfig;
use crate::event::Event;
use crate::fuel::{BurnStep, FuelItem, FuelLedger, LedgerError};
use crate::heat::{adjust_device_temp, adjust_temp_towards};
use serde::{Deserialize, Serialize};

/// The fire shared by firepits, forges and blast furnaces: a fuel ledger,
/// the device temperature, stored bellows air, and whether it is lit.
///
/// `lit` implies the ledger is burning. Putting the fire out clears the burn
/// and the air together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelHeater {
    ledger: FuelLedger,
    temperature: f32,
    lit: bool,
    air_ticks: i32,
    last_update_tick: Ticks,
}

/// What the fire did over a tick or a gap, for device-specific bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaterReport {
    pub consumed: Vec<FuelItem>,
    pub extinguished: bool,
}

impl FuelHeater {
    pub fn new(capacity: usize, now: Ticks) -> Self {
        Self {
            ledger: FuelLedger::new(capacity),
            temperature: 0.0,
            lit: false,
            air_ticks: 0,
            last_update_tick: now,
        }
    }

    pub fn ledger(&self) -> &FuelLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut FuelLedger {
        &mut self.ledger
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn air_ticks(&self) -> i32 {
        self.air_ticks
    }

    pub fn last_update_tick(&self) -> Ticks {
        self.last_update_tick
    }

    pub fn set_last_update_tick(&mut self, tick: Ticks) {
        self.last_update_tick = tick;
    }

    pub fn add_fuel(&mut self, item: FuelItem) -> Result<(), LedgerError> {
        self.ledger.push(item)
    }

    /// Start the fire with whatever is already burning or, failing that, the
    /// next queued fuel. Returns the item that was dequeued to light it.
    pub fn ignite(&mut self, ctx: &mut UpdateContext<'_>) -> Result<Option<FuelItem>, HeaterError> {
        if self.lit {
            return Ok(None);
        }
        let consumed = if self.ledger.is_burning() {
            None
        } else {
            Some(self.ledger.ignite_next().ok_or(HeaterError::NoFuel)?)
        };
        self.lit = true;
        let (device, tick) = (ctx.device, ctx.now());
        if let Some(item) = &consumed {
            self.report_consumed(item, tick, false, ctx);
        }
        ctx.emit(Event::Ignited {
            device,
            tick,
            retroactive: false,
        });
        Ok(consumed)
    }

    /// Light the fire with a burn that did not come from the queue.
    pub fn ignite_with(&mut self, burn_ticks: i32, burn_temperature: f32) {
        self.ledger.set_burn(burn_ticks, burn_temperature);
        self.lit = self.ledger.is_burning();
    }

    /// Bellows air, capped at `max`.
    pub fn intake_air(&mut self, amount: i32, max: i32) {
        self.air_ticks = (self.air_ticks + amount.max(0)).min(max);
    }

    pub fn extinguish(&mut self) {
        self.lit = false;
        self.ledger.extinguish();
        self.air_ticks = 0;
    }

    /// One live tick. Rain and bellows both double the burn rate here.
    pub fn tick_live(&mut self, config: &HeaterConfig, ctx: &mut UpdateContext<'_>) -> HeaterReport {
        let mut report = HeaterReport::default();
        let raining = ctx.raining && config.exposed_to_rain;

        if self.lit || self.temperature > 0.0 {
            self.temperature = adjust_device_temp(
                self.temperature,
                self.ledger.burn_temperature(),
                self.air_ticks,
                raining,
                &config.heat,
            );
        }

        if self.lit {
            let rate = if self.air_ticks > 0 || raining { 2 } else { 1 };
            let tick = ctx.now() + 1;
            match self.ledger.burn_one_tick(rate) {
                BurnStep::Burning => {}
                BurnStep::Refueled(item) => {
                    self.report_consumed(&item, tick, false, ctx);
                    report.consumed.push(item);
                }
                BurnStep::BurnedOut => {
                    self.extinguish();
                    report.extinguished = true;
                    ctx.emit(Event::Extinguished {
                        device: ctx.device,
                        tick,
                        retroactive: false,
                    });
                }
            }
        }

        if self.air_ticks > 0 {
            self.air_ticks -= 1;
        }
        report
    }

    /// Reconcile `elapsed` unloaded ticks.
    ///
    /// A lit fire burns through the ledger at the nominal rate while its
    /// temperature follows each fuel item in closed form. If the fuel ran out
    /// before the gap did, the fire is out and stone cold. An unlit but warm
    /// device just cools toward 0.
    pub fn catch_up(
        &mut self,
        elapsed: Ticks,
        config: &HeaterConfig,
        ctx: &mut UpdateContext<'_>,
    ) -> HeaterReport {
        let mut report = HeaterReport::default();
        if elapsed <= 0 {
            return report;
        }
        self.air_ticks = (Ticks::from(self.air_ticks) - elapsed).max(0) as i32;

        if !self.lit {
            self.temperature = adjust_temp_towards(self.temperature, 0.0, elapsed, &config.heat);
            return report;
        }

        let device = ctx.device;
        let events = &mut *ctx.events;
        let mut temperature = self.temperature;
        let mut tick = self.last_update_tick;
        let remainder = self.ledger.consume_fuel_for_ticks_with(elapsed, |segment| {
            if let Some(item) = segment.ignited {
                events.emit(Event::FuelConsumed {
                    device,
                    fuel: item.fuel,
                    tick,
                    retroactive: true,
                });
                report.consumed.push(item);
            }
            temperature =
                adjust_temp_towards(temperature, segment.temperature, segment.ticks, &config.heat);
            tick += segment.ticks;
        });
        if remainder.items_consumed > 0 {
            ctx.emit(Event::FuelCascaded {
                device,
                queued: self.ledger.len(),
                tick,
                retroactive: true,
            });
        }

        if remainder.exhausted() {
            self.extinguish();
            report.extinguished = true;
            if remainder.overflow_ticks > 0 {
                temperature = 0.0;
            }
            ctx.emit(Event::Extinguished {
                device,
                tick,
                retroactive: true,
            });
        }
        self.temperature = temperature;
        report
    }

    /// Put the fire out and hand back the unburned fuel.
    pub fn eject(&mut self) -> Vec<FuelItem> {
        self.lit = false;
        self.air_ticks = 0;
        self.ledger.eject()
    }

    fn report_consumed(&self, item: &FuelItem, tick: Ticks, retroactive: bool, ctx: &mut UpdateContext<'_>) {
        ctx.emit(Event::FuelConsumed {
            device: ctx.device,
            fuel: item.fuel,
            tick,
            retroactive,
        });
        ctx.emit(Event::FuelCascaded {
            device: ctx.device,
            queued: self.ledger.len(),
            tick,
            retroactive,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaterError {
    #[error("no fuel to light")]
    NoFuel,
}
