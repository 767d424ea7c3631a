//! Food bowl owned by a single animal

use crate::sink::SharedSink;
use crate::types::FoodType;
use parking_lot::Mutex;
use std::fmt;

/// Bounded food store; every read-modify-write happens under the bowl's lock
pub struct Bowl {
    food_type: FoodType,
    capacity: u32,
    owner_name: String,
    current: Mutex<u32>,
    sink: SharedSink,
}

impl Bowl {
    /// Create an empty bowl
    pub fn new(food_type: FoodType, capacity: u32, owner_name: impl Into<String>, sink: SharedSink) -> Self {
        Self {
            food_type,
            capacity,
            owner_name: owner_name.into(),
            current: Mutex::new(0),
            sink,
        }
    }

    pub fn food_type(&self) -> FoodType {
        self.food_type
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn current_amount(&self) -> u32 {
        *self.current.lock()
    }

    /// Add food if it fits entirely; otherwise log a rejection and leave the
    /// bowl untouched. Returns whether the food was added.
    pub fn add_food(&self, amount: u32) -> bool {
        let accepted = {
            let mut current = self.current.lock();
            if amount <= self.capacity - *current {
                *current += amount;
                true
            } else {
                false
            }
        };

        if accepted {
            self.sink
                .log(&format!("Added {} food to the bowl of {}.", amount, self.owner_name));
        } else {
            self.sink.log(&format!(
                "The bowl of {} cannot hold that much food. Maximum capacity: {}.",
                self.owner_name, self.capacity
            ));
        }
        accepted
    }

    /// Fill the bowl up to capacity, returning the amount added
    pub fn top_off(&self) -> u32 {
        let added = {
            let mut current = self.current.lock();
            let missing = self.capacity - *current;
            *current = self.capacity;
            missing
        };

        self.sink
            .log(&format!("Added {} food to the bowl of {}.", added, self.owner_name));
        added
    }

    /// Take `amount` out of the bowl if at least that much is present
    pub(crate) fn try_consume(&self, amount: u32) -> bool {
        let mut current = self.current.lock();
        if *current >= amount {
            *current -= amount;
            true
        } else {
            false
        }
    }

    /// Overwrite the stored amount, clamped to capacity (roster restore)
    pub(crate) fn restore_amount(&self, amount: u32) {
        *self.current.lock() = amount.min(self.capacity);
    }
}

impl fmt::Display for Bowl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} (owner: {})",
            self.food_type,
            self.current_amount(),
            self.capacity,
            self.owner_name
        )
    }
}

impl fmt::Debug for Bowl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bowl")
            .field("food_type", &self.food_type)
            .field("current", &self.current_amount())
            .field("capacity", &self.capacity)
            .field("owner_name", &self.owner_name)
            .finish()
    }
}
