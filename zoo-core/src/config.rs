//! Timing configuration for the simulation
//!
//! Every fixed delay in the simulation is expressed as a number of time
//! units; `unit` sets how long one unit lasts in wall time.

use crate::error::ZooError;
use std::time::Duration;

/// Delays, periods and probabilities that drive the simulation
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Length of one simulation time unit
    pub unit: Duration,

    /// Hunger decay period, in units
    pub hunger_tick: u32,

    /// Random action period, in units
    pub action_tick: u32,

    /// Chance that an action tick performs an action (0.0..=1.0)
    pub action_chance: f64,

    /// Re-check interval while an animal waits for food, in units
    pub feeding_backoff: u32,

    /// Simulated travel/preparation time before filling bowls, in units
    pub fill_work: u32,

    /// Simulated cleaning time, in units
    pub clean_work: u32,

    /// Delay before each enclosure dispatch in a routine cycle, in units
    pub dispatch_stagger: u32,

    /// Daily routine period (wall time, independent of `unit`)
    pub routine_period: Duration,

    /// Capacity of every animal's bowl
    pub bowl_capacity: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            hunger_tick: 1,
            action_tick: 5,
            action_chance: 0.1,
            feeding_backoff: 5,
            fill_work: 3,
            clean_work: 5,
            dispatch_stagger: 2,
            routine_period: Duration::from_secs(60),
            bowl_capacity: 100,
        }
    }
}

impl Timing {
    /// Set the length of one time unit
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Set the daily routine period
    pub fn with_routine_period(mut self, period: Duration) -> Self {
        self.routine_period = period;
        self
    }

    /// Set the random action chance
    pub fn with_action_chance(mut self, chance: f64) -> Self {
        self.action_chance = chance;
        self
    }

    /// Set the bowl capacity used for newly created animals
    pub fn with_bowl_capacity(mut self, capacity: u32) -> Self {
        self.bowl_capacity = capacity;
        self
    }

    /// Convert a number of units to wall time
    pub fn units(&self, count: u32) -> Duration {
        self.unit * count
    }

    pub fn hunger_period(&self) -> Duration {
        self.units(self.hunger_tick)
    }

    pub fn action_period(&self) -> Duration {
        self.units(self.action_tick)
    }

    pub fn feeding_backoff(&self) -> Duration {
        self.units(self.feeding_backoff)
    }

    pub fn fill_duration(&self) -> Duration {
        self.units(self.fill_work)
    }

    pub fn clean_duration(&self) -> Duration {
        self.units(self.clean_work)
    }

    pub fn stagger(&self) -> Duration {
        self.units(self.dispatch_stagger)
    }

    /// Reject settings that would make a periodic timer spin or never fire
    pub fn validate(&self) -> Result<(), ZooError> {
        if self.unit.is_zero() {
            return Err(ZooError::InvalidTiming("time unit must be non-zero".into()));
        }
        if self.hunger_tick == 0 || self.action_tick == 0 || self.feeding_backoff == 0 {
            return Err(ZooError::InvalidTiming(
                "animal periods must be at least one unit".into(),
            ));
        }
        if self.routine_period.is_zero() {
            return Err(ZooError::InvalidTiming("routine period must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.action_chance) {
            return Err(ZooError::InvalidTiming(format!(
                "action chance {} is outside 0..=1",
                self.action_chance
            )));
        }
        if self.bowl_capacity == 0 {
            return Err(ZooError::InvalidTiming("bowl capacity must be positive".into()));
        }
        Ok(())
    }
}
