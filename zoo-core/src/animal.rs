//! Animals and their periodic behaviors
//!
//! An [`Animal`] is one concrete type parameterized by a static
//! [`KindDescriptor`]. Once admitted to an enclosure it runs two independent
//! periodic tasks:
//! - hunger: every tick the hunger level drops by one; reaching zero starts
//!   the feeding protocol, which polls the bowl until it holds a full meal
//! - action: every tick, with a small chance, the animal makes a sound or
//!   moves

use crate::bowl::Bowl;
use crate::config::Timing;
use crate::error::ZooError;
use crate::sink::SharedSink;
use crate::timer::PeriodicTask;
use crate::types::{FoodType, KindDescriptor, Species};
use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Timer pair owned by an animal while it lives in an enclosure
struct AnimalTimers {
    hunger: PeriodicTask,
    action: PeriodicTask,
}

impl AnimalTimers {
    fn stop(&self) {
        self.hunger.stop();
        self.action.stop();
    }
}

/// A single zoo animal
pub struct Animal {
    name: String,
    age: u32,
    kind: &'static KindDescriptor,
    /// 0..=max_hunger; only the hunger task and a successful meal write it
    hunger: AtomicU32,
    bowl: Bowl,
    timing: Timing,
    sink: SharedSink,
    timers: Mutex<Option<AnimalTimers>>,
}

impl Animal {
    /// Create an animal with full hunger and an empty bowl. Timers are not
    /// running until [`Animal::start_timers`] is called.
    pub fn new(species: Species, name: impl Into<String>, age: u32, timing: Timing, sink: SharedSink) -> Self {
        let name = name.into();
        let kind = species.descriptor();
        let bowl = Bowl::new(kind.food_type, timing.bowl_capacity, name.clone(), sink.clone());

        Self {
            name,
            age,
            kind,
            hunger: AtomicU32::new(kind.max_hunger),
            bowl,
            timing,
            sink,
            timers: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn species(&self) -> Species {
        self.kind.species
    }

    pub fn kind(&self) -> &'static KindDescriptor {
        self.kind
    }

    pub fn food_type(&self) -> FoodType {
        self.kind.food_type
    }

    pub fn current_hunger(&self) -> u32 {
        self.hunger.load(Ordering::SeqCst)
    }

    pub fn max_hunger(&self) -> u32 {
        self.kind.max_hunger
    }

    pub fn required_food_amount(&self) -> u32 {
        self.kind.required_food_amount
    }

    pub fn bowl(&self) -> &Bowl {
        &self.bowl
    }

    /// Same animal, not merely equal fields
    pub fn same_as(self: &Arc<Self>, other: &Arc<Animal>) -> bool {
        Arc::ptr_eq(self, other)
    }

    /// One hunger tick. Returns true exactly when hunger just reached zero,
    /// i.e. when the caller must run the feeding protocol.
    pub fn decrease_hunger(&self) -> bool {
        let previous = self
            .hunger
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| h.checked_sub(1));

        match previous {
            Ok(1) => {
                self.sink
                    .log(&format!("{} is hungry and starts eating.", self.name));
                true
            }
            _ => false,
        }
    }

    /// Feeding protocol: wait until the bowl holds a full meal, polling with
    /// a fixed backoff, then eat it and reset hunger to the maximum.
    pub async fn eat(&self) {
        let required = self.kind.required_food_amount;

        while !self.bowl.try_consume(required) {
            self.sink.log(&format!(
                "{} is waiting for food in the bowl of {}.",
                self.name,
                self.bowl.owner_name()
            ));
            sleep(self.timing.feeding_backoff()).await;
        }

        self.hunger.store(self.kind.max_hunger, Ordering::SeqCst);
        self.sink
            .log(&format!("{} has eaten and is now full.", self.name));
    }

    /// One action tick: with the configured chance, make a sound or move
    pub fn perform_random_action(&self) {
        let (act, sound) = {
            let mut rng = rand::thread_rng();
            (rng.gen_bool(self.timing.action_chance), rng.gen_bool(0.5))
        };

        if act {
            if sound {
                self.make_sound();
            } else {
                self.move_about();
            }
        }
    }

    pub fn make_sound(&self) {
        self.sink.log(&format!("{}: {}", self.name, self.kind.sound));
    }

    pub fn move_about(&self) {
        self.sink
            .log(&format!("{} {}", self.name, self.kind.movement));
    }

    /// Start (or restart) the hunger and action tasks under `token`.
    /// Any previously running pair is stopped first.
    pub fn start_timers(self: &Arc<Self>, token: CancellationToken) -> Result<(), ZooError> {
        let hunger_animal = Arc::downgrade(self);
        let hunger = PeriodicTask::spawn(
            format!("{}/hunger", self.name),
            self.timing.hunger_period(),
            token.child_token(),
            move || {
                let animal = hunger_animal.upgrade();
                async move {
                    if let Some(animal) = animal {
                        if animal.decrease_hunger() {
                            animal.eat().await;
                        }
                    }
                }
            },
        )?;

        let action_animal = Arc::downgrade(self);
        let action = PeriodicTask::spawn(
            format!("{}/action", self.name),
            self.timing.action_period(),
            token.child_token(),
            move || {
                if let Some(animal) = action_animal.upgrade() {
                    animal.perform_random_action();
                }
                async {}
            },
        )?;

        let previous = self.timers.lock().replace(AnimalTimers { hunger, action });
        if let Some(previous) = previous {
            debug!("Restarting timers of {}", self.name);
            previous.stop();
        }
        Ok(())
    }

    /// Stop both periodic tasks; no-op if they are not running
    pub fn stop_timers(&self) {
        if let Some(timers) = self.timers.lock().take() {
            timers.stop();
            debug!("Stopped timers of {}", self.name);
        }
    }

    pub fn timers_running(&self) -> bool {
        self.timers
            .lock()
            .as_ref()
            .map(|t| !t.hunger.is_stopped() && !t.action.is_stopped())
            .unwrap_or(false)
    }

    /// Restore saved state, clamping to valid ranges
    pub(crate) fn restore(&self, current_hunger: Option<u32>, bowl_amount: Option<u32>) {
        if let Some(hunger) = current_hunger {
            self.hunger
                .store(hunger.min(self.kind.max_hunger), Ordering::SeqCst);
        }
        if let Some(amount) = bowl_amount {
            self.bowl.restore_amount(amount);
        }
    }
}

impl Drop for Animal {
    fn drop(&mut self) {
        if let Some(timers) = self.timers.get_mut().take() {
            timers.stop();
        }
    }
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Age: {}, Species: {}, Food: {}, Hunger: {}, Max hunger: {}, Required food: {}, Bowl: {}",
            self.name,
            self.age,
            self.kind.display_name,
            self.kind.food_type,
            self.current_hunger(),
            self.kind.max_hunger,
            self.kind.required_food_amount,
            self.bowl
        )
    }
}

impl fmt::Debug for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animal")
            .field("name", &self.name)
            .field("age", &self.age)
            .field("species", &self.kind.species)
            .field("hunger", &self.current_hunger())
            .field("bowl", &self.bowl)
            .finish()
    }
}
