//! The fuel ledger: queued fuel plus whatever is burning right now.
//!
//! Live ticking burns the current item one tick (or two) at a time. A
//! calendar update instead hands the whole gap to
//! [`FuelLedger::consume_fuel_for_ticks`], which retires whole items at once
//! and costs O(items consumed) regardless of the gap.

use crate::clock::Ticks;
use crate::id::FuelId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One unit of fuel waiting in a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelItem {
    pub fuel: FuelId,
    pub burn_duration: i32,
    pub burn_temperature: f32,
    /// 1.0 burns clean. Lower purity leaves smoke behind in a firepit.
    pub purity: f32,
}

/// A stretch of time during which one fuel item burned at one temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnSegment {
    /// Ticks of the gap spent in this segment. May be 0 for an item that
    /// ignited exactly as the gap ended.
    pub ticks: Ticks,
    pub temperature: f32,
    /// The item dequeued to start this segment, or `None` for the item that
    /// was already burning.
    pub ignited: Option<FuelItem>,
}

/// Ledger state after a batched consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Remainder {
    pub burn_ticks: i32,
    pub burn_temperature: f32,
    /// Ticks of the gap left over after the last item burned out. Non-zero
    /// means the fire went out mid-gap.
    pub overflow_ticks: Ticks,
    pub items_consumed: u32,
}

impl Remainder {
    pub fn exhausted(&self) -> bool {
        self.burn_ticks == 0
    }
}

/// Result of one live tick of burning.
#[derive(Debug, Clone, PartialEq)]
pub enum BurnStep {
    /// Still burning the same item.
    Burning,
    /// The current item burned out and the next one caught.
    Refueled(FuelItem),
    /// The current item burned out and nothing was queued.
    BurnedOut,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("fuel ledger is full ({capacity} slots)")]
    Full { capacity: usize },
    #[error("fuel must burn for a positive duration at a positive temperature")]
    InvalidFuel,
}

/// FIFO queue of fuel plus the burn in progress.
///
/// `burn_ticks > 0` exactly when `burn_temperature > 0`; both are reset
/// together when the fire goes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelLedger {
    queue: VecDeque<FuelItem>,
    capacity: usize,
    burn_ticks: i32,
    burn_temperature: f32,
}

impl FuelLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            burn_ticks: 0,
            burn_temperature: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    /// Queued fuel, front (next to burn) first.
    pub fn queue(&self) -> impl Iterator<Item = &FuelItem> {
        self.queue.iter()
    }

    pub fn burn_ticks(&self) -> i32 {
        self.burn_ticks
    }

    pub fn burn_temperature(&self) -> f32 {
        self.burn_temperature
    }

    pub fn is_burning(&self) -> bool {
        self.burn_ticks > 0
    }

    /// Queue a fuel item at the back.
    pub fn push(&mut self, item: FuelItem) -> Result<(), LedgerError> {
        if item.burn_duration <= 0 || item.burn_temperature <= 0.0 {
            return Err(LedgerError::InvalidFuel);
        }
        if self.is_full() {
            return Err(LedgerError::Full {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(item);
        Ok(())
    }

    /// Replace the current burn outright. Non-positive values put the fire
    /// out.
    pub fn set_burn(&mut self, ticks: i32, temperature: f32) {
        if ticks > 0 && temperature > 0.0 {
            self.burn_ticks = ticks;
            self.burn_temperature = temperature;
        } else {
            self.extinguish();
        }
    }

    pub fn extinguish(&mut self) {
        self.burn_ticks = 0;
        self.burn_temperature = 0.0;
    }

    /// Take the front item and start burning it. Returns `None` (and leaves
    /// the burn untouched) if nothing is queued.
    pub fn ignite_next(&mut self) -> Option<FuelItem> {
        let item = self.queue.pop_front()?;
        self.burn_ticks = item.burn_duration;
        self.burn_temperature = item.burn_temperature;
        Some(item)
    }

    /// Burn `rate` ticks of the current item. When it runs out the next item
    /// ignites immediately, or the fire goes out.
    pub fn burn_one_tick(&mut self, rate: i32) -> BurnStep {
        if !self.is_burning() {
            return BurnStep::BurnedOut;
        }
        self.burn_ticks -= rate.max(1);
        if self.burn_ticks > 0 {
            return BurnStep::Burning;
        }
        match self.ignite_next() {
            Some(item) => BurnStep::Refueled(item),
            None => {
                self.extinguish();
                BurnStep::BurnedOut
            }
        }
    }

    /// Burn through `elapsed` ticks at the nominal rate.
    pub fn consume_fuel_for_ticks(&mut self, elapsed: Ticks) -> Remainder {
        self.consume_fuel_for_ticks_with(elapsed, |_| {})
    }

    /// Burn through `elapsed` ticks at the nominal rate, reporting each burn
    /// segment in order.
    ///
    /// The segments' ticks plus the returned overflow always add up to
    /// `elapsed`. Items leave the queue strictly front first.
    pub fn consume_fuel_for_ticks_with<F>(&mut self, elapsed: Ticks, mut on_segment: F) -> Remainder
    where
        F: FnMut(BurnSegment),
    {
        let mut items_consumed = 0u32;
        if elapsed <= 0 {
            return self.remainder(0, items_consumed);
        }

        let current = Ticks::from(self.burn_ticks.max(0));
        if elapsed < current {
            self.burn_ticks -= elapsed as i32;
            on_segment(BurnSegment {
                ticks: elapsed,
                temperature: self.burn_temperature,
                ignited: None,
            });
            return self.remainder(0, items_consumed);
        }

        if current > 0 {
            on_segment(BurnSegment {
                ticks: current,
                temperature: self.burn_temperature,
                ignited: None,
            });
        }
        let mut remaining = elapsed - current;

        loop {
            let Some(item) = self.queue.pop_front() else {
                self.extinguish();
                return self.remainder(remaining, items_consumed);
            };
            items_consumed += 1;
            let duration = Ticks::from(item.burn_duration.max(0));
            if duration > remaining {
                self.burn_ticks = (duration - remaining) as i32;
                self.burn_temperature = item.burn_temperature;
                on_segment(BurnSegment {
                    ticks: remaining,
                    temperature: item.burn_temperature,
                    ignited: Some(item),
                });
                return self.remainder(0, items_consumed);
            }
            remaining -= duration;
            on_segment(BurnSegment {
                ticks: duration,
                temperature: item.burn_temperature,
                ignited: Some(item),
            });
        }
    }

    fn remainder(&self, overflow_ticks: Ticks, items_consumed: u32) -> Remainder {
        Remainder {
            burn_ticks: self.burn_ticks,
            burn_temperature: self.burn_temperature,
            overflow_ticks,
            items_consumed,
        }
    }

    /// Empty the queue and put out the fire. Returns the unburned fuel.
    pub fn eject(&mut self) -> Vec<FuelItem> {
        self.extinguish();
        self.queue.drain(..).collect()
    }
}
