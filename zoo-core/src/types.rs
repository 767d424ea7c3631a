//! Core types for the zoo simulation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of food an animal eats and its bowl holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    Meat,
    Grass,
    Leaves,
    Fish,
    Fruits,
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoodType::Meat => write!(f, "meat"),
            FoodType::Grass => write!(f, "grass"),
            FoodType::Leaves => write!(f, "leaves"),
            FoodType::Fish => write!(f, "fish"),
            FoodType::Fruits => write!(f, "fruits"),
        }
    }
}

/// Animal kinds known to the zoo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Lion,
    Zebra,
    Giraffe,
    #[serde(alias = "hippo")]
    Hippopotamus,
    Penguin,
    Lemur,
    Monkey,
    Otter,
    Tiger,
    Jaguar,
}

impl Species {
    /// Every species, in kind-table order
    pub const ALL: [Species; 10] = [
        Species::Lion,
        Species::Zebra,
        Species::Giraffe,
        Species::Hippopotamus,
        Species::Penguin,
        Species::Lemur,
        Species::Monkey,
        Species::Otter,
        Species::Tiger,
        Species::Jaguar,
    ];

    /// Fixed parameters for this species
    pub fn descriptor(self) -> &'static KindDescriptor {
        &KINDS[self as usize]
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().display_name)
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hippo") {
            return Ok(Species::Hippopotamus);
        }
        Species::ALL
            .iter()
            .copied()
            .find(|species| species.descriptor().display_name.eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown species: {}", s))
    }
}

/// Data-only description of one animal kind
#[derive(Debug)]
pub struct KindDescriptor {
    pub species: Species,
    pub display_name: &'static str,
    pub food_type: FoodType,
    pub max_hunger: u32,
    pub required_food_amount: u32,
    /// Logged after the animal's name on MakeSound
    pub sound: &'static str,
    /// Logged after the animal's name on Move
    pub movement: &'static str,
    pub enclosure_name: &'static str,
    pub enclosure_capacity: usize,
}

/// Kind table, indexed by `Species as usize`
static KINDS: [KindDescriptor; 10] = [
    KindDescriptor {
        species: Species::Lion,
        display_name: "Lion",
        food_type: FoodType::Meat,
        max_hunger: 50,
        required_food_amount: 10,
        sound: "Rrr!",
        movement: "walks across the savanna.",
        enclosure_name: "Lion enclosure",
        enclosure_capacity: 5,
    },
    KindDescriptor {
        species: Species::Zebra,
        display_name: "Zebra",
        food_type: FoodType::Grass,
        max_hunger: 50,
        required_food_amount: 10,
        sound: "Eee-haw!",
        movement: "strolls across the meadow.",
        enclosure_name: "Zebra enclosure",
        enclosure_capacity: 8,
    },
    KindDescriptor {
        species: Species::Giraffe,
        display_name: "Giraffe",
        food_type: FoodType::Leaves,
        max_hunger: 45,
        required_food_amount: 9,
        sound: "Mmm-oo!",
        movement: "grazes among the tall trees.",
        enclosure_name: "Giraffe enclosure",
        enclosure_capacity: 10,
    },
    KindDescriptor {
        species: Species::Hippopotamus,
        display_name: "Hippopotamus",
        food_type: FoodType::Grass,
        max_hunger: 60,
        required_food_amount: 12,
        sound: "Grunt-grunt!",
        movement: "swims in the pond.",
        enclosure_name: "Hippopotamus enclosure",
        enclosure_capacity: 6,
    },
    KindDescriptor {
        species: Species::Penguin,
        display_name: "Penguin",
        food_type: FoodType::Fish,
        max_hunger: 30,
        required_food_amount: 6,
        sound: "Squawk-squawk!",
        movement: "waddles across the ice.",
        enclosure_name: "Penguin enclosure",
        enclosure_capacity: 4,
    },
    KindDescriptor {
        species: Species::Lemur,
        display_name: "Lemur",
        food_type: FoodType::Fruits,
        max_hunger: 35,
        required_food_amount: 7,
        sound: "Hoo-hoo!",
        movement: "climbs the trees.",
        enclosure_name: "Lemur enclosure",
        enclosure_capacity: 7,
    },
    KindDescriptor {
        species: Species::Monkey,
        display_name: "Monkey",
        food_type: FoodType::Fruits,
        max_hunger: 40,
        required_food_amount: 8,
        sound: "Ha-ha-ha!",
        movement: "scrambles up the branches.",
        enclosure_name: "Monkey enclosure",
        enclosure_capacity: 5,
    },
    KindDescriptor {
        species: Species::Otter,
        display_name: "Otter",
        food_type: FoodType::Fish,
        max_hunger: 30,
        required_food_amount: 6,
        sound: "Chirp-chirp-chirp!",
        movement: "swims in the water.",
        enclosure_name: "Otter enclosure",
        enclosure_capacity: 3,
    },
    KindDescriptor {
        species: Species::Tiger,
        display_name: "Tiger",
        food_type: FoodType::Meat,
        max_hunger: 55,
        required_food_amount: 11,
        sound: "Grr-grr-grr!",
        movement: "runs through the jungle.",
        enclosure_name: "Tiger enclosure",
        enclosure_capacity: 4,
    },
    KindDescriptor {
        species: Species::Jaguar,
        display_name: "Jaguar",
        food_type: FoodType::Meat,
        max_hunger: 50,
        required_food_amount: 10,
        sound: "Rr-rr-rr!",
        movement: "dashes through the jungle.",
        enclosure_name: "Jaguar enclosure",
        enclosure_capacity: 4,
    },
];
