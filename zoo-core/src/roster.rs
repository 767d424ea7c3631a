//! Roster persistence
//!
//! Rosters are read at startup to populate the zoo and written at shutdown
//! with a full snapshot of every animal. Two interchangeable stores:
//! - [`JsonRosterStore`] writes `{"zoo", "saved_at", "animals"}`
//! - [`XmlRosterStore`] writes `<zoo>` with one `<animal>` element per animal
//!
//! Loading accepts a saved document or a bare list of entries, so an export
//! can be fed back in as the next roster. Entries are parsed one at a time:
//! an invalid entry is logged with its position and skipped.

use crate::animal::Animal;
use crate::error::ZooError;
use crate::types::{FoodType, Species};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Saved bowl level carried by a roster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlLevel {
    pub current_amount: u32,
}

/// One animal to admit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub species: Species,
    pub name: String,
    pub age: u32,
    /// Hunger to resume from; full when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hunger: Option<u32>,
    /// Bowl level to resume from; empty when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bowl: Option<BowlLevel>,
}

impl RosterEntry {
    pub fn new(species: Species, name: impl Into<String>, age: u32) -> Self {
        Self {
            species,
            name: name.into(),
            age,
            current_hunger: None,
            bowl: None,
        }
    }
}

/// Bowl part of an [`AnimalRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlRecord {
    pub food_type: FoodType,
    pub current_amount: u32,
    pub capacity: u32,
    pub owner_name: String,
}

/// Full snapshot of one animal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub name: String,
    pub age: u32,
    pub species: Species,
    pub food_type: FoodType,
    pub current_hunger: u32,
    pub max_hunger: u32,
    pub required_food_amount: u32,
    pub bowl: BowlRecord,
}

impl Animal {
    pub fn snapshot(&self) -> AnimalRecord {
        let bowl = self.bowl();
        AnimalRecord {
            name: self.name().to_string(),
            age: self.age(),
            species: self.species(),
            food_type: self.food_type(),
            current_hunger: self.current_hunger(),
            max_hunger: self.max_hunger(),
            required_food_amount: self.required_food_amount(),
            bowl: BowlRecord {
                food_type: bowl.food_type(),
                current_amount: bowl.current_amount(),
                capacity: bowl.capacity(),
                owner_name: bowl.owner_name().to_string(),
            },
        }
    }
}

/// Source and destination of rosters
pub trait RosterStore: Send + Sync {
    fn path(&self) -> &Path;

    /// Read every valid entry; invalid entries are skipped
    fn load(&self) -> Result<Vec<RosterEntry>, ZooError>;

    fn save(&self, zoo_name: &str, animals: &[AnimalRecord]) -> Result<(), ZooError>;
}

/// On-disk roster format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RosterFormat {
    #[default]
    Json,
    Xml,
}

impl RosterFormat {
    /// Pick the format from the file extension (`.xml`, anything else JSON)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => RosterFormat::Xml,
            _ => RosterFormat::Json,
        }
    }

    /// Store for `path` in this format
    pub fn store(self, path: impl Into<PathBuf>) -> Box<dyn RosterStore> {
        match self {
            RosterFormat::Json => Box::new(JsonRosterStore::new(path)),
            RosterFormat::Xml => Box::new(XmlRosterStore::new(path)),
        }
    }
}

impl fmt::Display for RosterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterFormat::Json => write!(f, "json"),
            RosterFormat::Xml => write!(f, "xml"),
        }
    }
}

impl FromStr for RosterFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RosterFormat::Json),
            "xml" => Ok(RosterFormat::Xml),
            other => Err(format!("unknown roster format: {}", other)),
        }
    }
}

/// Parse raw entries one by one, logging and dropping the invalid ones
fn collect_entries<T>(
    path: &Path,
    raw: Vec<T>,
    parse: impl Fn(T) -> Result<RosterEntry, String>,
) -> Vec<RosterEntry> {
    let total = raw.len();
    let entries: Vec<RosterEntry> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match parse(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Roster {:?}: skipping entry #{}: {}", path, index + 1, e);
                None
            }
        })
        .collect();

    debug!("Loaded {}/{} roster entries from {:?}", entries.len(), total, path);
    entries
}

/// Write through a temp file then rename over `path`
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), ZooError>,
) -> Result<(), ZooError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    {
        let mut writer = BufWriter::new(File::create(&temp)?);
        write(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&temp, path)?;
    Ok(())
}

#[derive(Serialize)]
struct SavedRoster<'a> {
    zoo: &'a str,
    saved_at: DateTime<Utc>,
    animals: &'a [AnimalRecord],
}

/// JSON file roster
#[derive(Debug, Clone)]
pub struct JsonRosterStore {
    path: PathBuf,
}

impl JsonRosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl RosterStore for JsonRosterStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<RosterEntry>, ZooError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let document: serde_json::Value = serde_json::from_reader(reader)?;
        let raw = match document {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut document) => match document.remove("animals") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(ZooError::InvalidRoster(format!(
                        "{:?} has no \"animals\" list",
                        self.path
                    )))
                }
            },
            _ => {
                return Err(ZooError::InvalidRoster(format!(
                    "{:?} is neither a list of animals nor a saved roster",
                    self.path
                )))
            }
        };

        Ok(collect_entries(&self.path, raw, |item| {
            serde_json::from_value(item).map_err(|e| e.to_string())
        }))
    }

    fn save(&self, zoo_name: &str, animals: &[AnimalRecord]) -> Result<(), ZooError> {
        let document = SavedRoster {
            zoo: zoo_name,
            saved_at: Utc::now(),
            animals,
        };

        replace_file(&self.path, |writer| {
            serde_json::to_writer_pretty(&mut *writer, &document)?;
            writer.write_all(b"\n")?;
            Ok(())
        })?;

        info!("Saved {} animals to {:?}", animals.len(), self.path);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename = "zoo")]
struct XmlRosterOut<'a> {
    name: &'a str,
    saved_at: String,
    #[serde(rename = "animal")]
    animals: Vec<XmlAnimalOut<'a>>,
}

#[derive(Serialize)]
struct XmlAnimalOut<'a> {
    name: &'a str,
    age: u32,
    species: String,
    food_type: String,
    current_hunger: u32,
    max_hunger: u32,
    required_food_amount: u32,
    bowl: XmlBowlOut<'a>,
}

#[derive(Serialize)]
struct XmlBowlOut<'a> {
    food_type: String,
    current_amount: u32,
    capacity: u32,
    owner_name: &'a str,
}

impl<'a> From<&'a AnimalRecord> for XmlAnimalOut<'a> {
    fn from(record: &'a AnimalRecord) -> Self {
        Self {
            name: &record.name,
            age: record.age,
            species: record.species.to_string().to_lowercase(),
            food_type: record.food_type.to_string(),
            current_hunger: record.current_hunger,
            max_hunger: record.max_hunger,
            required_food_amount: record.required_food_amount,
            bowl: XmlBowlOut {
                food_type: record.bowl.food_type.to_string(),
                current_amount: record.bowl.current_amount,
                capacity: record.bowl.capacity,
                owner_name: &record.bowl.owner_name,
            },
        }
    }
}

/// Any root element holding `<animal>` children
#[derive(Deserialize)]
struct XmlRosterIn {
    #[serde(rename = "animal", default)]
    animals: Vec<XmlEntryIn>,
}

/// Text fields, validated per entry so one bad animal does not sink the file
#[derive(Deserialize)]
struct XmlEntryIn {
    #[serde(default)]
    species: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    age: String,
    #[serde(default)]
    current_hunger: Option<String>,
    #[serde(default)]
    bowl: Option<XmlBowlIn>,
}

#[derive(Deserialize)]
struct XmlBowlIn {
    #[serde(default)]
    current_amount: Option<String>,
}

fn parse_number(field: &str, value: &str) -> Result<u32, String> {
    value
        .trim()
        .parse()
        .map_err(|e| format!("{} {:?}: {}", field, value, e))
}

impl XmlEntryIn {
    fn parse(self) -> Result<RosterEntry, String> {
        let species: Species = self.species.trim().parse()?;
        let age = parse_number("age", &self.age)?;
        let current_hunger = self
            .current_hunger
            .map(|h| parse_number("current_hunger", &h))
            .transpose()?;
        let bowl = match self.bowl.and_then(|b| b.current_amount) {
            Some(amount) => Some(BowlLevel {
                current_amount: parse_number("bowl current_amount", &amount)?,
            }),
            None => None,
        };

        Ok(RosterEntry {
            species,
            name: self.name.trim().to_string(),
            age,
            current_hunger,
            bowl,
        })
    }
}

/// XML file roster
#[derive(Debug, Clone)]
pub struct XmlRosterStore {
    path: PathBuf,
}

impl XmlRosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RosterStore for XmlRosterStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<RosterEntry>, ZooError> {
        let text = fs::read_to_string(&self.path)?;
        let document: XmlRosterIn = quick_xml::de::from_str(&text)?;

        Ok(collect_entries(&self.path, document.animals, XmlEntryIn::parse))
    }

    fn save(&self, zoo_name: &str, animals: &[AnimalRecord]) -> Result<(), ZooError> {
        let document = XmlRosterOut {
            name: zoo_name,
            saved_at: Utc::now().to_rfc3339(),
            animals: animals.iter().map(XmlAnimalOut::from).collect(),
        };

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        document.serialize(serializer)?;
        xml.push('\n');

        replace_file(&self.path, |writer| {
            writer.write_all(xml.as_bytes())?;
            Ok(())
        })?;

        info!("Saved {} animals to {:?}", animals.len(), self.path);
        Ok(())
    }
}
