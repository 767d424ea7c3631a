//! The zoo and its daily routine
//!
//! The daily routine runs on a fixed period (first cycle immediately):
//!
//! ```text
//! Idle ──tick──► RoutineRunning ──all operations joined──► Idle
//!   ▲                 │
//!   └──tick (busy)────┘  period skipped, logged
//! ```
//!
//! A cycle snapshots the enclosure and keeper collections, assigns
//! enclosure `i` to keeper `i mod K`, waits a fixed stagger before each
//! dispatch, spawns fill + clean for the enclosure, then joins every
//! dispatched operation before reporting completion. A cycle without
//! keepers fails with [`ZooError::NoKeepers`]; the error is logged and the
//! next period retries.

use crate::animal::Animal;
use crate::config::Timing;
use crate::enclosure::{sort_off_task, Enclosure};
use crate::error::ZooError;
use crate::keeper::Keeper;
use crate::roster::{AnimalRecord, RosterEntry};
use crate::sink::SharedSink;
use crate::timer::PeriodicTask;
use crate::types::Species;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Keeper assigned to the enclosure at `enclosure_index` (round-robin)
pub fn keeper_index(enclosure_index: usize, keeper_count: usize) -> Option<usize> {
    if keeper_count == 0 {
        None
    } else {
        Some(enclosure_index % keeper_count)
    }
}

/// Outcome of one routine cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Enclosures dispatched
    pub enclosures: usize,
    /// Service operations dispatched (fill + clean per enclosure)
    pub operations: usize,
    /// Operations that panicked or were aborted
    pub failed: usize,
}

/// Clears the busy flag when a cycle ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A zoo: enclosures, keepers, and the daily routine
pub struct Zoo {
    name: String,
    timing: Timing,
    sink: SharedSink,
    enclosures: RwLock<Vec<Arc<Enclosure>>>,
    /// Species → enclosure used by [`Zoo::admit`]; first registered wins
    by_species: RwLock<HashMap<Species, Arc<Enclosure>>>,
    keepers: RwLock<Vec<Arc<Keeper>>>,
    routine: Mutex<Option<PeriodicTask>>,
    routine_busy: Arc<AtomicBool>,
    token: CancellationToken,
}

impl Zoo {
    /// Create an empty zoo. The routine does not run until
    /// [`Zoo::start_routine`] is called.
    pub fn new(name: impl Into<String>, timing: Timing, sink: SharedSink) -> Result<Self, ZooError> {
        timing.validate()?;

        Ok(Self {
            name: name.into(),
            timing,
            sink,
            enclosures: RwLock::new(Vec::new()),
            by_species: RwLock::new(HashMap::new()),
            keepers: RwLock::new(Vec::new()),
            routine: Mutex::new(None),
            routine_busy: Arc::new(AtomicBool::new(false)),
            token: CancellationToken::new(),
        })
    }

    /// Create a zoo with one default enclosure per species
    pub fn with_standard_layout(name: impl Into<String>, timing: Timing, sink: SharedSink) -> Result<Self, ZooError> {
        let zoo = Self::new(name, timing, sink)?;
        for species in Species::ALL {
            zoo.add_enclosure(Arc::new(Enclosure::standard(species, zoo.sink.clone())?));
        }
        Ok(zoo)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn sink(&self) -> SharedSink {
        self.sink.clone()
    }

    /// Build an animal wired to this zoo's timing and sink
    pub fn create_animal(&self, species: Species, name: impl Into<String>, age: u32) -> Arc<Animal> {
        Arc::new(Animal::new(species, name, age, self.timing, self.sink.clone()))
    }

    /// Build a keeper wired to this zoo's timing and sink
    pub fn create_keeper(&self, name: impl Into<String>) -> Arc<Keeper> {
        Arc::new(Keeper::new(name, self.timing, self.sink.clone()))
    }

    pub fn add_enclosure(&self, enclosure: Arc<Enclosure>) {
        if let Some(species) = enclosure.species() {
            self.by_species
                .write()
                .entry(species)
                .or_insert_with(|| enclosure.clone());
        }
        self.enclosures.write().push(enclosure);
    }

    pub fn remove_enclosure(&self, enclosure: &Arc<Enclosure>) -> bool {
        let removed = {
            let mut enclosures = self.enclosures.write();
            match enclosures.iter().position(|e| Arc::ptr_eq(e, enclosure)) {
                Some(index) => {
                    enclosures.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            if let Some(species) = enclosure.species() {
                let mut by_species = self.by_species.write();
                by_species.remove(&species);
                // Fall back to the next enclosure of that species, if any
                if let Some(next) = self
                    .enclosures
                    .read()
                    .iter()
                    .find(|e| e.species() == Some(species))
                {
                    by_species.insert(species, next.clone());
                }
            }
        }
        removed
    }

    /// Snapshot of the enclosures in dispatch order
    pub fn enclosures(&self) -> Vec<Arc<Enclosure>> {
        self.enclosures.read().clone()
    }

    pub fn enclosure_for(&self, species: Species) -> Option<Arc<Enclosure>> {
        self.by_species.read().get(&species).cloned()
    }

    pub fn add_keeper(&self, keeper: Arc<Keeper>) {
        self.keepers.write().push(keeper);
    }

    pub fn remove_keeper(&self, keeper: &Arc<Keeper>) -> bool {
        let mut keepers = self.keepers.write();
        match keepers.iter().position(|k| Arc::ptr_eq(k, keeper)) {
            Some(index) => {
                keepers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the keepers in assignment order
    pub fn keepers(&self) -> Vec<Arc<Keeper>> {
        self.keepers.read().clone()
    }

    /// Every animal of every enclosure, enclosure by enclosure
    pub fn all_animals(&self) -> Vec<Arc<Animal>> {
        self.enclosures()
            .iter()
            .flat_map(|enclosure| enclosure.animals())
            .collect()
    }

    /// Place an animal in the enclosure registered for its species
    pub fn admit(&self, animal: Arc<Animal>) -> Result<(), ZooError> {
        let enclosure = self
            .enclosure_for(animal.species())
            .ok_or(ZooError::NoEnclosure(animal.species()))?;
        enclosure.add(animal)
    }

    /// Create and admit one animal per roster entry. A failing entry is
    /// logged and skipped; returns the number of animals admitted.
    pub fn populate(&self, entries: &[RosterEntry]) -> usize {
        let mut admitted = 0;

        for entry in entries {
            let animal = self.create_animal(entry.species, entry.name.clone(), entry.age);
            animal.restore(
                entry.current_hunger,
                entry.bowl.as_ref().map(|b| b.current_amount),
            );

            match self.admit(animal) {
                Ok(()) => admitted += 1,
                Err(e) => {
                    warn!("Zoo {}: could not admit {}: {}", self.name, entry.name, e);
                    self.sink.log(&format!("Zoo error: {}", e));
                }
            }
        }

        info!(
            "Zoo {}: admitted {}/{} animals from roster",
            self.name,
            admitted,
            entries.len()
        );
        admitted
    }

    /// Sort every animal of the zoo with `compare` (off the calling task)
    /// and return their snapshots
    pub async fn export<F>(&self, compare: F) -> Result<Vec<AnimalRecord>, ZooError>
    where
        F: FnMut(&Animal, &Animal) -> CmpOrdering + Send + 'static,
    {
        let sorted = sort_off_task(self.all_animals(), compare).await?;
        Ok(sorted.iter().map(|animal| animal.snapshot()).collect())
    }

    /// Run one routine cycle to completion
    pub async fn run_routine_cycle(&self) -> Result<CycleReport, ZooError> {
        self.sink
            .log(&format!("Performing the daily routine in zoo {}...", self.name));

        let keepers = self.keepers();
        if keepers.is_empty() {
            return Err(ZooError::NoKeepers);
        }
        let enclosures = self.enclosures();

        let mut operations = JoinSet::new();
        for (i, enclosure) in enclosures.iter().enumerate() {
            let keeper = keeper_index(i, keepers.len())
                .map(|k| keepers[k].clone())
                .ok_or(ZooError::NoKeepers)?;

            sleep(self.timing.stagger()).await;

            self.sink.log(&format!(
                "{} is assigned to enclosure {}.",
                keeper.name(),
                enclosure.name()
            ));

            let (fill_keeper, fill_enclosure) = (keeper.clone(), enclosure.clone());
            operations.spawn(async move { fill_keeper.fill_bowls(&fill_enclosure).await });

            let clean_enclosure = enclosure.clone();
            operations.spawn(async move { keeper.clean_enclosure(&clean_enclosure).await });
        }

        let dispatched = operations.len();
        let mut failed = 0;
        while let Some(result) = operations.join_next().await {
            if let Err(e) = result {
                failed += 1;
                warn!("Zoo {}: service operation failed: {}", self.name, e);
                self.sink.log(&format!("System error: {}", e));
            }
        }

        self.sink.log("The daily routine is complete.");

        Ok(CycleReport {
            enclosures: enclosures.len(),
            operations: dispatched,
            failed,
        })
    }

    /// Start the periodic daily routine (first cycle immediately).
    /// Restarting replaces the previous routine timer.
    pub fn start_routine(self: &Arc<Self>) -> Result<(), ZooError> {
        let zoo = Arc::downgrade(self);
        let routine_token = self.token.child_token();
        let cycle_parent = routine_token.clone();
        let task = PeriodicTask::spawn(
            format!("{}/routine", self.name),
            self.timing.routine_period,
            routine_token,
            move || {
                if let Some(zoo) = zoo.upgrade() {
                    zoo.launch_cycle(cycle_parent.child_token());
                }
                async {}
            },
        )?;

        if let Some(previous) = self.routine.lock().replace(task) {
            previous.stop();
        }
        info!("Zoo {}: daily routine every {:?}", self.name, self.timing.routine_period);
        Ok(())
    }

    /// Stop the periodic routine; a cycle in progress is abandoned along
    /// with the service operations it dispatched
    pub fn stop_routine(&self) {
        if let Some(task) = self.routine.lock().take() {
            task.stop();
        }
    }

    /// Whether a routine cycle is in progress
    pub fn routine_running(&self) -> bool {
        self.routine_busy.load(Ordering::SeqCst)
    }

    /// Begin a cycle in the background unless one is still running.
    /// The cycle is abandoned when `token` is cancelled.
    fn launch_cycle(self: &Arc<Self>, token: CancellationToken) {
        if self
            .routine_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.sink.log(&format!(
                "The daily routine in zoo {} is still running, skipping this period.",
                self.name
            ));
            return;
        }
        let busy = BusyGuard(self.routine_busy.clone());

        let zoo = self.clone();
        let cycle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = zoo.run_routine_cycle() => Some(result),
            }
        });

        let zoo = self.clone();
        tokio::spawn(async move {
            let _busy = busy;
            match cycle.await {
                Ok(Some(Ok(report))) => {
                    debug!("Zoo {}: cycle finished {:?}", zoo.name, report);
                }
                Ok(Some(Err(e))) if e.is_domain() => {
                    warn!("Zoo {}: routine cycle aborted: {}", zoo.name, e);
                    zoo.sink.log(&format!("Zoo error: {}", e));
                }
                Ok(Some(Err(e))) => {
                    warn!("Zoo {}: routine cycle failed: {}", zoo.name, e);
                    zoo.sink.log(&format!("System error: {}", e));
                }
                Ok(None) => debug!("Zoo {}: cycle cancelled", zoo.name),
                Err(e) => {
                    warn!("Zoo {}: routine cycle panicked: {}", zoo.name, e);
                    zoo.sink.log(&format!("System error: {}", e));
                }
            }
        });
    }

    /// Stop the routine and every animal timer
    pub fn shutdown(&self) {
        self.token.cancel();
        self.stop_routine();
        for enclosure in self.enclosures() {
            enclosure.close();
        }
        info!("Zoo {}: shut down", self.name);
    }
}

impl Drop for Zoo {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn quiet_zoo(sink: &Arc<MemorySink>) -> Zoo {
        Zoo::new(
            "Test Zoo",
            Timing::default().with_action_chance(0.0),
            sink.clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_round_robin_assignment() {
        assert_eq!(keeper_index(0, 0), None);
        for keepers in 1..6 {
            for enclosure in 0..20 {
                assert_eq!(keeper_index(enclosure, keepers), Some(enclosure % keepers));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_without_keepers_fails_before_dispatch() {
        let sink = Arc::new(MemorySink::new());
        let zoo = quiet_zoo(&sink);
        zoo.add_enclosure(Arc::new(Enclosure::standard(Species::Lion, sink.clone()).unwrap()));

        let err = zoo.run_routine_cycle().await.unwrap_err();

        assert!(matches!(err, ZooError::NoKeepers));
        assert!(!sink.contains("assigned"));
        assert!(!sink.contains("complete"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_assigns_keepers_round_robin() {
        let sink = Arc::new(MemorySink::new());
        let zoo = Zoo::with_standard_layout("Test Zoo", Timing::default(), sink.clone()).unwrap();
        zoo.add_keeper(zoo.create_keeper("John"));
        zoo.add_keeper(zoo.create_keeper("Alice"));

        let report = zoo.run_routine_cycle().await.unwrap();

        assert_eq!(report.enclosures, 10);
        assert_eq!(report.operations, 20);
        assert_eq!(report.failed, 0);
        assert!(sink.contains("John is assigned to enclosure Lion enclosure."));
        assert!(sink.contains("Alice is assigned to enclosure Zebra enclosure."));
        assert!(sink.contains("John is assigned to enclosure Giraffe enclosure."));
        assert!(sink.contains("Alice is assigned to enclosure Jaguar enclosure."));
        assert_eq!(sink.count("John is assigned"), 5);
        assert_eq!(sink.count("Alice is assigned"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admit_uses_species_dispatch() {
        let sink = Arc::new(MemorySink::new());
        let zoo = Zoo::with_standard_layout("Test Zoo", Timing::default(), sink.clone()).unwrap();

        zoo.admit(zoo.create_animal(Species::Otter, "Ot", 2)).unwrap();

        let otters = zoo.enclosure_for(Species::Otter).unwrap();
        assert_eq!(otters.len(), 1);
        assert_eq!(zoo.all_animals().len(), 1);

        let empty = quiet_zoo(&sink);
        assert!(matches!(
            empty.admit(empty.create_animal(Species::Otter, "Ot", 2)),
            Err(ZooError::NoEnclosure(Species::Otter))
        ));

        zoo.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_enclosure_falls_back_to_next_of_species() {
        let sink = Arc::new(MemorySink::new());
        let zoo = quiet_zoo(&sink);
        let first = Arc::new(Enclosure::new("Lions A", Species::Lion, 1, sink.clone()).unwrap());
        let second = Arc::new(Enclosure::new("Lions B", Species::Lion, 1, sink.clone()).unwrap());
        zoo.add_enclosure(first.clone());
        zoo.add_enclosure(second.clone());

        assert_eq!(zoo.enclosure_for(Species::Lion).unwrap().name(), "Lions A");
        assert!(zoo.remove_enclosure(&first));
        assert_eq!(zoo.enclosure_for(Species::Lion).unwrap().name(), "Lions B");
        assert!(!zoo.remove_enclosure(&first));
        assert!(zoo.remove_enclosure(&second));
        assert!(zoo.enclosure_for(Species::Lion).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepers_can_be_removed() {
        let sink = Arc::new(MemorySink::new());
        let zoo = quiet_zoo(&sink);
        let john = zoo.create_keeper("John");
        zoo.add_keeper(john.clone());

        assert!(zoo.remove_keeper(&john));
        assert!(!zoo.remove_keeper(&john));
        assert!(zoo.keepers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_period_is_skipped() {
        let sink = Arc::new(MemorySink::new());
        let timing = Timing::default()
            .with_action_chance(0.0)
            .with_routine_period(Duration::from_secs(1));
        let zoo = Arc::new(Zoo::new("Busy Zoo", timing, sink.clone()).unwrap());
        zoo.add_enclosure(Arc::new(Enclosure::standard(Species::Lion, sink.clone()).unwrap()));
        zoo.add_keeper(zoo.create_keeper("John"));

        zoo.start_routine().unwrap();
        // One cycle takes 2 (stagger) + 5 (clean) units
        sleep(Duration::from_millis(3500)).await;

        assert!(zoo.routine_running());
        assert_eq!(sink.count("Performing the daily routine"), 1);
        assert_eq!(sink.count("skipping this period"), 3);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.count("The daily routine is complete."), 1);

        zoo.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_staffing_error_does_not_stop_routine() {
        let sink = Arc::new(MemorySink::new());
        let timing = Timing::default().with_routine_period(Duration::from_secs(60));
        let zoo = Arc::new(Zoo::new("Empty Zoo", timing, sink.clone()).unwrap());
        zoo.add_enclosure(Arc::new(Enclosure::standard(Species::Lion, sink.clone()).unwrap()));

        zoo.start_routine().unwrap();
        sleep(Duration::from_secs(130)).await;

        assert_eq!(sink.count("Performing the daily routine in zoo Empty Zoo..."), 3);
        assert_eq!(sink.count("Zoo error: No keepers in the zoo"), 3);
        assert!(!sink.contains("assigned"));
        assert!(!zoo.routine_running());

        zoo.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_routine_abandons_cycle_in_progress() {
        let sink = Arc::new(MemorySink::new());
        let zoo = Arc::new(Zoo::with_standard_layout("Test Zoo", Timing::default(), sink.clone()).unwrap());
        zoo.add_keeper(zoo.create_keeper("John"));

        zoo.start_routine().unwrap();
        // Mid-cycle: second enclosure dispatched at t = 4
        sleep(Duration::from_millis(4500)).await;
        assert!(zoo.routine_running());
        assert_eq!(sink.count("John is assigned"), 2);

        zoo.stop_routine();
        sleep(Duration::from_secs(120)).await;

        assert!(!zoo.routine_running());
        assert_eq!(sink.count("John is assigned"), 2);
        assert!(!sink.contains("The daily routine is complete."));
        assert_eq!(sink.count("Performing the daily routine"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_routine_and_animals() {
        let sink = Arc::new(MemorySink::new());
        let zoo = Arc::new(Zoo::with_standard_layout("Test Zoo", Timing::default(), sink.clone()).unwrap());
        zoo.add_keeper(zoo.create_keeper("John"));
        let leo = zoo.create_animal(Species::Lion, "Leo", 4);
        zoo.admit(leo.clone()).unwrap();
        zoo.start_routine().unwrap();
        sleep(Duration::from_secs(1)).await;

        zoo.shutdown();
        assert!(!leo.timers_running());

        let lines = sink.lines().len();
        let hunger = leo.current_hunger();
        sleep(Duration::from_secs(300)).await;
        assert_eq!(sink.lines().len(), lines);
        assert_eq!(leo.current_hunger(), hunger);
    }
}
