//! Capacity-bounded, ordered holding areas for animals
//!
//! An enclosure is bound to one species, or is a general enclosure that
//! accepts any species. Admission starts the animal's timers under the
//! enclosure's cancellation token; removal and [`Enclosure::close`] stop
//! them.

use crate::animal::Animal;
use crate::error::ZooError;
use crate::sink::SharedSink;
use crate::types::Species;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Ready-made total orders over animals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimalOrder {
    #[default]
    Name,
    Age,
    Species,
    Hunger,
}

impl AnimalOrder {
    /// Compare two animals; ties fall back to the name so the order is total
    pub fn compare(self, a: &Animal, b: &Animal) -> Ordering {
        let primary = match self {
            AnimalOrder::Name => Ordering::Equal,
            AnimalOrder::Age => a.age().cmp(&b.age()),
            AnimalOrder::Species => a.species().cmp(&b.species()),
            AnimalOrder::Hunger => a.current_hunger().cmp(&b.current_hunger()),
        };
        primary.then_with(|| a.name().cmp(b.name()))
    }
}

impl FromStr for AnimalOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(AnimalOrder::Name),
            "age" => Ok(AnimalOrder::Age),
            "species" => Ok(AnimalOrder::Species),
            "hunger" => Ok(AnimalOrder::Hunger),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Sort a list of animals on the blocking pool, off the calling task
pub async fn sort_off_task<F>(mut animals: Vec<Arc<Animal>>, mut compare: F) -> Result<Vec<Arc<Animal>>, ZooError>
where
    F: FnMut(&Animal, &Animal) -> Ordering + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        animals.sort_by(|a, b| compare(a, b));
        animals
    })
    .await
    .map_err(|e| ZooError::TaskFailed(format!("sort: {}", e)))
}

/// Fixed-capacity ordered collection of animals
pub struct Enclosure {
    name: String,
    capacity: usize,
    /// None for a general enclosure
    species: Option<Species>,
    animals: Mutex<Vec<Arc<Animal>>>,
    /// Serializes sorts of this enclosure
    sort_lock: tokio::sync::Mutex<()>,
    token: CancellationToken,
    sink: SharedSink,
}

impl Enclosure {
    /// Create an enclosure for a single species
    pub fn new(name: impl Into<String>, species: Species, capacity: usize, sink: SharedSink) -> Result<Self, ZooError> {
        Self::build(name.into(), Some(species), capacity, sink)
    }

    /// Create an enclosure that accepts animals of any species
    pub fn general(name: impl Into<String>, capacity: usize, sink: SharedSink) -> Result<Self, ZooError> {
        Self::build(name.into(), None, capacity, sink)
    }

    /// Default enclosure for `species`, named and sized from the kind table
    pub fn standard(species: Species, sink: SharedSink) -> Result<Self, ZooError> {
        let kind = species.descriptor();
        Self::new(kind.enclosure_name, species, kind.enclosure_capacity, sink)
    }

    fn build(name: String, species: Option<Species>, capacity: usize, sink: SharedSink) -> Result<Self, ZooError> {
        if capacity == 0 {
            return Err(ZooError::InvalidCapacity);
        }

        Ok(Self {
            name,
            capacity,
            species,
            animals: Mutex::new(Vec::new()),
            sort_lock: tokio::sync::Mutex::new(()),
            token: CancellationToken::new(),
            sink,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn species(&self) -> Option<Species> {
        self.species
    }

    pub fn len(&self) -> usize {
        self.animals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.lock().is_empty()
    }

    pub fn available_space(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Snapshot of the animals in stored order
    pub fn animals(&self) -> Vec<Arc<Animal>> {
        self.animals.lock().clone()
    }

    pub fn contains(&self, animal: &Arc<Animal>) -> bool {
        self.animals.lock().iter().any(|a| Arc::ptr_eq(a, animal))
    }

    /// Admit an animal and start its timers.
    ///
    /// Fails without touching the enclosure when it is full, when the animal
    /// has no name, is already inside, or is of the wrong species.
    pub fn add(&self, animal: Arc<Animal>) -> Result<(), ZooError> {
        if animal.name().trim().is_empty() {
            return Err(ZooError::InvalidAnimal("animal must have a name".into()));
        }
        if let Some(expected) = self.species {
            if animal.species() != expected {
                return Err(ZooError::SpeciesMismatch {
                    enclosure: self.name.clone(),
                    expected,
                    actual: animal.species(),
                    name: animal.name().to_string(),
                });
            }
        }

        {
            let mut animals = self.animals.lock();
            if animals.iter().any(|a| Arc::ptr_eq(a, &animal)) {
                return Err(ZooError::InvalidAnimal(format!(
                    "{} is already in enclosure {}",
                    animal.name(),
                    self.name
                )));
            }
            if animals.len() >= self.capacity {
                return Err(ZooError::EnclosureFull {
                    name: self.name.clone(),
                    capacity: self.capacity,
                });
            }
            animals.push(animal.clone());
        }

        if let Err(e) = animal.start_timers(self.token.child_token()) {
            self.animals.lock().retain(|a| !Arc::ptr_eq(a, &animal));
            return Err(e);
        }

        debug!("Enclosure {}: admitted {}", self.name, animal.name());
        Ok(())
    }

    /// Remove the animal (by identity) and stop its timers
    pub fn remove(&self, animal: &Arc<Animal>) -> bool {
        let removed = {
            let mut animals = self.animals.lock();
            animals
                .iter()
                .position(|a| Arc::ptr_eq(a, animal))
                .map(|index| animals.remove(index))
        };

        match removed {
            Some(animal) => {
                animal.stop_timers();
                debug!("Enclosure {}: removed {}", self.name, animal.name());
                true
            }
            None => false,
        }
    }

    /// Reorder the animals with `compare`, sorting off the calling task.
    ///
    /// The stored order changes only once the sort is done. Concurrent sorts
    /// of the same enclosure run one after another. Animals admitted while
    /// the sort ran are kept, after the sorted ones; removed ones stay gone.
    pub async fn sort_animals<F>(&self, compare: F) -> Result<(), ZooError>
    where
        F: FnMut(&Animal, &Animal) -> Ordering + Send + 'static,
    {
        let _serial = self.sort_lock.lock().await;

        self.sink
            .log(&format!("Starting async sort of animals in enclosure {}.", self.name));

        let sorted = sort_off_task(self.animals(), compare).await?;

        {
            let mut animals = self.animals.lock();
            let mut merged: Vec<Arc<Animal>> = sorted
                .into_iter()
                .filter(|s| animals.iter().any(|a| Arc::ptr_eq(a, s)))
                .collect();
            for animal in animals.iter() {
                if !merged.iter().any(|m| Arc::ptr_eq(m, animal)) {
                    merged.push(animal.clone());
                }
            }
            *animals = merged;
        }

        self.sink
            .log(&format!("Async sort of enclosure {} is complete.", self.name));
        Ok(())
    }

    /// Stop the timers of every animal inside. Animals admitted afterwards
    /// get timers that are already cancelled.
    pub fn close(&self) {
        self.token.cancel();
        for animal in self.animals.lock().iter() {
            animal.stop_timers();
        }
    }
}

impl fmt::Display for Enclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let animals = self.animals();
        writeln!(f, "Enclosure {}: {} of {}", self.name, animals.len(), self.capacity)?;
        for animal in animals {
            writeln!(f, "{}", animal)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Enclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enclosure")
            .field("name", &self.name)
            .field("species", &self.species)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::sink::MemorySink;

    fn setup() -> (Arc<MemorySink>, Timing) {
        (
            Arc::new(MemorySink::new()),
            Timing::default().with_action_chance(0.0),
        )
    }

    fn zebra(name: &str, age: u32, timing: Timing, sink: &Arc<MemorySink>) -> Arc<Animal> {
        Arc::new(Animal::new(Species::Zebra, name, age, timing, sink.clone()))
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let (sink, timing) = setup();
        let enclosure = Enclosure::new("Zebra enclosure", Species::Zebra, 2, sink.clone()).unwrap();

        enclosure.add(zebra("Marty", 3, timing, &sink)).unwrap();
        enclosure.add(zebra("Zed", 5, timing, &sink)).unwrap();
        assert_eq!(enclosure.available_space(), 0);

        let third = zebra("Stripes", 1, timing, &sink);
        let err = enclosure.add(third.clone()).unwrap_err();
        assert!(matches!(err, ZooError::EnclosureFull { capacity: 2, .. }));
        assert_eq!(enclosure.len(), 2);
        assert!(!enclosure.contains(&third));
        assert!(!third.timers_running());

        enclosure.close();
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let (sink, _) = setup();
        assert!(matches!(
            Enclosure::new("Empty", Species::Lion, 0, sink),
            Err(ZooError::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn test_invalid_animals_are_rejected() {
        let (sink, timing) = setup();
        let enclosure = Enclosure::new("Zebra enclosure", Species::Zebra, 5, sink.clone()).unwrap();

        let nameless = zebra("  ", 1, timing, &sink);
        assert!(matches!(enclosure.add(nameless), Err(ZooError::InvalidAnimal(_))));

        let lion = Arc::new(Animal::new(Species::Lion, "Leo", 4, timing, sink.clone()));
        assert!(matches!(
            enclosure.add(lion),
            Err(ZooError::SpeciesMismatch { expected: Species::Zebra, actual: Species::Lion, .. })
        ));

        let marty = zebra("Marty", 3, timing, &sink);
        enclosure.add(marty.clone()).unwrap();
        assert!(matches!(enclosure.add(marty), Err(ZooError::InvalidAnimal(_))));
        assert_eq!(enclosure.len(), 1);

        enclosure.close();
    }

    #[tokio::test]
    async fn test_add_starts_and_remove_stops_timers() {
        let (sink, timing) = setup();
        let enclosure = Enclosure::new("Zebra enclosure", Species::Zebra, 3, sink.clone()).unwrap();
        let marty = zebra("Marty", 3, timing, &sink);
        let zed = zebra("Zed", 5, timing, &sink);

        enclosure.add(marty.clone()).unwrap();
        enclosure.add(zed.clone()).unwrap();
        assert!(marty.timers_running());
        assert_eq!(enclosure.available_space(), 1);

        assert!(enclosure.remove(&marty));
        assert!(!marty.timers_running());
        assert!(!enclosure.remove(&marty));
        assert_eq!(enclosure.animals().len(), 1);
        assert!(enclosure.contains(&zed));

        enclosure.close();
        assert!(!zed.timers_running());
    }

    #[tokio::test]
    async fn test_general_enclosure_accepts_any_species() {
        let (sink, timing) = setup();
        let general = Enclosure::general("Shared enclosure", usize::MAX, sink.clone()).unwrap();

        general
            .add(Arc::new(Animal::new(Species::Tiger, "Shere", 7, timing, sink.clone())))
            .unwrap();
        general.add(zebra("Marty", 3, timing, &sink)).unwrap();

        assert_eq!(general.len(), 2);
        assert_eq!(general.species(), None);
        general.close();
    }

    #[tokio::test]
    async fn test_sort_reorders_after_completion() {
        let (sink, timing) = setup();
        let enclosure = Enclosure::new("Zebra enclosure", Species::Zebra, 5, sink.clone()).unwrap();
        for (name, age) in [("Zed", 5), ("Marty", 3), ("Abby", 9)] {
            enclosure.add(zebra(name, age, timing, &sink)).unwrap();
        }

        enclosure
            .sort_animals(|a, b| AnimalOrder::Name.compare(a, b))
            .await
            .unwrap();
        let names: Vec<String> = enclosure.animals().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Abby", "Marty", "Zed"]);

        enclosure
            .sort_animals(|a, b| AnimalOrder::Age.compare(a, b))
            .await
            .unwrap();
        let ages: Vec<u32> = enclosure.animals().iter().map(|a| a.age()).collect();
        assert_eq!(ages, vec![3, 5, 9]);

        let start = sink.position("Starting async sort of animals in enclosure Zebra enclosure.").unwrap();
        let done = sink.position("Async sort of enclosure Zebra enclosure is complete.").unwrap();
        assert!(start < done);

        enclosure.close();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sorts_are_serialized() {
        let (sink, timing) = setup();
        let enclosure = Arc::new(Enclosure::general("Shared enclosure", 100, sink.clone()).unwrap());
        for i in 0..50 {
            enclosure.add(zebra(&format!("z{:02}", 49 - i), i, timing, &sink)).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let enclosure = enclosure.clone();
                tokio::spawn(async move {
                    let order = if i % 2 == 0 { AnimalOrder::Name } else { AnimalOrder::Age };
                    enclosure.sort_animals(move |a, b| order.compare(a, b)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(enclosure.len(), 50);
        let lines = sink.lines();
        let events: Vec<&String> = lines.iter().filter(|l| l.contains("sort")).collect();
        // Start/complete pairs never interleave
        for pair in events.chunks(2) {
            assert!(pair[0].starts_with("Starting"));
            assert!(pair[1].starts_with("Async sort"));
        }

        enclosure.close();
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("Age".parse::<AnimalOrder>(), Ok(AnimalOrder::Age));
        assert_eq!("hunger".parse::<AnimalOrder>(), Ok(AnimalOrder::Hunger));
        assert!("height".parse::<AnimalOrder>().is_err());
    }

    #[tokio::test]
    async fn test_display_lists_animals() {
        let (sink, timing) = setup();
        let enclosure = Enclosure::standard(Species::Zebra, sink.clone()).unwrap();
        enclosure.add(zebra("Marty", 3, timing, &sink)).unwrap();

        let text = enclosure.to_string();
        assert!(text.starts_with("Enclosure Zebra enclosure: 1 of 8"));
        assert!(text.contains("Name: Marty, Age: 3, Species: Zebra"));

        enclosure.close();
    }
}
