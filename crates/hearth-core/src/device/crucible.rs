use super::{CalendarTickable, HasTemperature, UpdateContext};
use crate::clock::Ticks;
use crate::config::CrucibleConfig;
use crate::heat::{adjust_temp_towards, adjust_temp_towards_once};
use serde::{Deserialize, Serialize};

/// A crucible has no fire of its own. Something beneath it (a forge, a
/// blast furnace) pushes its target temperature up every tick, and without
/// that push the target drifts back to 0.
///
/// After each push the target holds for a short stability window before it
/// starts to fall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crucible {
    temperature: f32,
    target_temperature: f32,
    /// Ticks left before the target starts to decay.
    stability: i32,
    last_update_tick: Ticks,
}

impl Crucible {
    pub fn new(now: Ticks) -> Self {
        Self {
            temperature: 0.0,
            target_temperature: 0.0,
            stability: 0,
            last_update_tick: now,
        }
    }

    pub fn target_temperature(&self) -> f32 {
        self.target_temperature
    }

    pub fn stability(&self) -> i32 {
        self.stability
    }

    /// Heat from an external source. Raises the target (never lowers it)
    /// and restarts the stability window.
    pub fn set_target(&mut self, temperature: f32, config: &CrucibleConfig) {
        if temperature >= self.target_temperature {
            self.target_temperature = temperature;
            self.stability = config.stability_ticks;
        }
    }
}

impl HasTemperature for Crucible {
    fn temperature(&self) -> f32 {
        self.temperature
    }
}

impl CalendarTickable for Crucible {
    fn last_update_tick(&self) -> Ticks {
        self.last_update_tick
    }

    fn set_last_update_tick(&mut self, tick: Ticks) {
        self.last_update_tick = tick;
    }

    fn on_calendar_update(&mut self, elapsed: Ticks, ctx: &mut UpdateContext<'_>) {
        let heat = &ctx.config.crucible.heat;
        // The tick that spends the last of the window already decays.
        let held = Ticks::from((self.stability - 1).max(0)).min(elapsed);
        if held > 0 {
            self.temperature =
                adjust_temp_towards(self.temperature, self.target_temperature, held, heat);
        }
        self.stability -= Ticks::from(self.stability).min(elapsed) as i32;
        let rest = elapsed - held;
        if rest > 0 {
            self.target_temperature = adjust_temp_towards(self.target_temperature, 0.0, rest, heat);
            self.temperature =
                adjust_temp_towards(self.temperature, self.target_temperature, rest, heat);
        }
    }

    fn tick_once(&mut self, ctx: &mut UpdateContext<'_>) {
        let heat = &ctx.config.crucible.heat;
        if self.temperature != self.target_temperature {
            self.temperature = adjust_temp_towards_once(self.temperature, self.target_temperature, heat);
        }
        if self.stability > 0 {
            self.stability -= 1;
        }
        if self.target_temperature > 0.0 && self.stability == 0 {
            self.target_temperature = adjust_temp_towards_once(self.target_temperature, 0.0, heat);
        }
    }
}
