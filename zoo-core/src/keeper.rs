//! Keepers servicing enclosures

use crate::config::Timing;
use crate::enclosure::Enclosure;
use crate::sink::SharedSink;
use tokio::time::sleep;

/// A zoo keeper. Holds no state besides its name; any number of service
/// operations of one keeper may be in flight at once.
pub struct Keeper {
    name: String,
    timing: Timing,
    sink: SharedSink,
}

impl Keeper {
    pub fn new(name: impl Into<String>, timing: Timing, sink: SharedSink) -> Self {
        Self {
            name: name.into(),
            timing,
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Travel to the enclosure, then top off every animal's bowl
    pub async fn fill_bowls(&self, enclosure: &Enclosure) {
        self.sink.log(&format!(
            "{} is filling the bowls in enclosure {}.",
            self.name,
            enclosure.name()
        ));

        sleep(self.timing.fill_duration()).await;

        for animal in enclosure.animals() {
            animal.bowl().top_off();
        }
    }

    /// Clean the enclosure; takes time, changes nothing
    pub async fn clean_enclosure(&self, enclosure: &Enclosure) {
        self.sink.log(&format!(
            "{} is cleaning enclosure {}.",
            self.name,
            enclosure.name()
        ));

        sleep(self.timing.clean_duration()).await;
    }
}

impl std::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::Animal;
    use crate::sink::MemorySink;
    use crate::types::Species;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_fill_bowls_tops_off_after_travel() {
        let sink = Arc::new(MemorySink::new());
        let timing = Timing::default().with_action_chance(0.0);
        let enclosure = Enclosure::new("Lion enclosure", Species::Lion, 3, sink.clone()).unwrap();
        let leo = Arc::new(Animal::new(Species::Lion, "Leo", 4, timing, sink.clone()));
        let nala = Arc::new(Animal::new(Species::Lion, "Nala", 3, timing, sink.clone()));
        enclosure.add(leo.clone()).unwrap();
        enclosure.add(nala.clone()).unwrap();
        nala.bowl().add_food(40);

        let keeper = Keeper::new("John", timing, sink.clone());
        let started = tokio::time::Instant::now();
        keeper.fill_bowls(&enclosure).await;

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(leo.bowl().current_amount(), 100);
        assert_eq!(nala.bowl().current_amount(), 100);
        assert!(sink.contains("John is filling the bowls in enclosure Lion enclosure."));
        assert!(sink.contains("Added 100 food to the bowl of Leo."));
        assert!(sink.contains("Added 60 food to the bowl of Nala."));

        enclosure.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_takes_time_without_state_change() {
        let sink = Arc::new(MemorySink::new());
        let timing = Timing::default();
        let enclosure = Enclosure::new("Otter enclosure", Species::Otter, 3, sink.clone()).unwrap();
        let keeper = Keeper::new("Alice", timing, sink.clone());

        let started = tokio::time::Instant::now();
        keeper.clean_enclosure(&enclosure).await;

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(sink.lines(), vec!["Alice is cleaning enclosure Otter enclosure.".to_string()]);
        assert!(enclosure.is_empty());
    }
}
