//! Device temperature curves.
//!
//! Temperatures approach their target geometrically: one tick closes a fixed
//! fraction of the gap, so `n` ticks close `1 - factor^n` of it. The closed
//! form is what lets a calendar update skip a billion ticks in O(1) and land
//! where ticking one at a time would have.

use crate::clock::Ticks;
use crate::config::HeatConfig;

/// Per-tick geometric factor: `(1 - rate)^multiplier`.
///
/// A multiplier of 2 nearly doubles the effective rate (`(1-r)^2 ≈ 1-2r`),
/// 0.5 roughly halves it.
pub fn step_factor(rate: f32, multiplier: f32) -> f64 {
    let rate = f64::from(rate.clamp(0.0, 1.0));
    (1.0 - rate).powf(f64::from(multiplier.max(0.0)))
}

/// Move `current` toward `target` for `ticks` ticks at `factor` per tick.
/// Snaps to `target` once closer than `snap_epsilon`.
pub fn approach(current: f32, target: f32, factor: f64, ticks: Ticks, snap_epsilon: f32) -> f32 {
    if ticks <= 0 || current == target {
        return current;
    }
    let gap = f64::from(current) - f64::from(target);
    let remaining = gap * factor.powf(ticks as f64);
    if remaining.abs() < f64::from(snap_epsilon) {
        return target;
    }
    (f64::from(target) + remaining) as f32
}

/// Closed-form approach at the nominal rate, equivalent to `elapsed`
/// single-tick steps.
pub fn adjust_temp_towards(current: f32, target: f32, elapsed: Ticks, config: &HeatConfig) -> f32 {
    let factor = step_factor(config.approach_rate, 1.0);
    approach(current, target, factor, elapsed, config.snap_epsilon)
}

/// One tick of [`adjust_temp_towards`].
pub fn adjust_temp_towards_once(current: f32, target: f32, config: &HeatConfig) -> f32 {
    adjust_temp_towards(current, target, 1, config)
}

/// The temperature a device heads for, given what is burning in it.
///
/// Bellows air raises the target by up to `max_air_boost`, but never by more
/// than half the base. Rain lowers it by `rain_target_penalty`, not below 0.
pub fn target_device_temp(base: f32, air_ticks: i32, raining: bool, config: &HeatConfig) -> f32 {
    let mut target = base;
    if air_ticks > 0 {
        let air = (config.air_boost_per_tick * air_ticks as f32).min(config.max_air_boost);
        target += air.min(target * 0.5);
    }
    if raining {
        target = (target - config.rain_target_penalty).max(0.0);
    }
    target
}

/// Factor for one live tick of a device with the given modifiers.
fn live_factor(heating: bool, air_ticks: i32, raining: bool, config: &HeatConfig) -> f64 {
    let mut multiplier = 1.0;
    if air_ticks > 0 {
        multiplier = if heating {
            config.bellows_heating_multiplier
        } else {
            config.bellows_cooling_multiplier
        };
    }
    if raining {
        multiplier *= config.rain_rate_multiplier;
    }
    step_factor(config.approach_rate, multiplier)
}

/// One live tick of a heated device. `source` is the burn temperature, 0 if
/// nothing is burning (in which case the device cools toward 0).
pub fn adjust_device_temp(
    current: f32,
    source: f32,
    air_ticks: i32,
    raining: bool,
    config: &HeatConfig,
) -> f32 {
    let target = target_device_temp(source, air_ticks, raining, config);
    if current == target {
        return target;
    }
    let factor = live_factor(current < target, air_ticks, raining, config);
    approach(current, target, factor, 1, config.snap_epsilon)
}
