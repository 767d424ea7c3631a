//! Zoo Core Library
//!
//! Coordination core of the zoo simulation: animals with hunger and action
//! timers, capacity-bounded enclosures, keepers servicing enclosures, and the
//! zoo's periodic daily routine that fans work out to keepers and waits for
//! all of it to finish.

pub mod types;
pub mod config;
pub mod error;
pub mod sink;
pub mod timer;
pub mod bowl;
pub mod animal;
pub mod enclosure;
pub mod keeper;
pub mod zoo;
pub mod roster;

pub use types::*;
pub use config::Timing;
pub use error::ZooError;
pub use sink::{EventSink, FanOutSink, FileSink, MemorySink, SharedSink, TracingSink};
pub use timer::PeriodicTask;
pub use bowl::Bowl;
pub use animal::Animal;
pub use enclosure::{AnimalOrder, Enclosure};
pub use keeper::Keeper;
pub use zoo::{keeper_index, CycleReport, Zoo};
pub use roster::{
    AnimalRecord, BowlLevel, BowlRecord, JsonRosterStore, RosterEntry, RosterFormat, RosterStore,
    XmlRosterStore,
};
