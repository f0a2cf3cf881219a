//! World definition loading.
//!
//! Worlds are described in TOML:
//!
//! ```toml
//! start = ["hall"]
//!
//! [[location]]
//! id = "hall"
//! name = "The Hall"
//! description = "A long hall."
//! exits = { north = "garden" }
//!
//! [[object]]
//! id = "lamp"
//! name = "brass lamp"
//! aliases = ["lamp"]
//! location = "hall"
//! ```
//!
//! Ids are only meaningful inside the file; the built world uses UIDs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::entity::{Thing, Uid};
use crate::location::Direction;
use crate::world::{World, WorldError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse world definition: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate id: {0}")]
    Duplicate(String),

    #[error("Unknown location '{target}' referenced by '{from}'")]
    UnknownLocation { from: String, target: String },

    #[error("Unknown direction '{direction}' on location '{from}'")]
    UnknownDirection { from: String, direction: String },

    #[error("Exit {direction} given more than once on location '{from}'")]
    DuplicateExit { from: String, direction: Direction },

    #[error("World definition has no locations")]
    NoLocations,

    #[error("World error: {0}")]
    World(#[from] WorldError),
}

/// A whole world file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDefinition {
    /// Ids of locations new players may start in. Empty means all of them.
    #[serde(default)]
    pub start: Vec<String>,
    #[serde(default, rename = "location")]
    pub locations: Vec<LocationDef>,
    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Direction word (or abbreviation) -> target location id.
    #[serde(default)]
    pub exits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub location: String,
}

/// A built world plus the id -> UID mapping used to build it.
#[derive(Debug)]
pub struct Seeded {
    pub world: World,
    pub ids: HashMap<String, Uid>,
}

impl WorldDefinition {
    pub fn from_toml_str(source: &str) -> Result<Self, SeedError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let source = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Validate the definition and build a world from it.
    pub fn build(&self) -> Result<Seeded, SeedError> {
        if self.locations.is_empty() {
            return Err(SeedError::NoLocations);
        }

        let mut world = World::new();
        let mut ids: HashMap<String, Uid> = HashMap::new();

        for def in &self.locations {
            if ids.contains_key(&def.id) {
                return Err(SeedError::Duplicate(def.id.clone()));
            }
            let uid = world.insert(Thing::location(&def.name, &def.description));
            ids.insert(def.id.clone(), uid);
        }

        for def in &self.locations {
            let from = ids[&def.id];
            let mut seen = BTreeSet::new();
            for (word, target) in &def.exits {
                let direction =
                    Direction::parse(word).ok_or_else(|| SeedError::UnknownDirection {
                        from: def.id.clone(),
                        direction: word.clone(),
                    })?;
                // "n" and "north" are different keys for the same exit.
                if !seen.insert(direction) {
                    return Err(SeedError::DuplicateExit {
                        from: def.id.clone(),
                        direction,
                    });
                }
                let to = lookup(&ids, &def.id, target)?;
                world.link(from, direction, to)?;
            }
        }

        for def in &self.objects {
            if ids.contains_key(&def.id) {
                return Err(SeedError::Duplicate(def.id.clone()));
            }
            let container = lookup(&ids, &def.id, &def.location)?;
            let mut thing = Thing::object(&def.name, &def.description);
            for alias in &def.aliases {
                thing.add_alias(alias.as_str());
            }
            let uid = world.insert(thing);
            world.place(uid, container)?;
            ids.insert(def.id.clone(), uid);
        }

        if self.start.is_empty() {
            for def in &self.locations {
                world.add_start_location(ids[&def.id])?;
            }
        } else {
            for id in &self.start {
                let uid = lookup(&ids, "start", id)?;
                world.add_start_location(uid)?;
            }
        }

        debug!(
            locations = self.locations.len(),
            objects = self.objects.len(),
            start = world.start_locations().len(),
            "world built"
        );
        Ok(Seeded { world, ids })
    }
}

fn lookup(ids: &HashMap<String, Uid>, from: &str, target: &str) -> Result<Uid, SeedError> {
    ids.get(target)
        .copied()
        .ok_or_else(|| SeedError::UnknownLocation {
            from: from.to_string(),
            target: target.to_string(),
        })
}

/// The world used when no definition file is given: two rooms joined
/// north/south, both valid start locations.
pub fn basic_world() -> World {
    let mut world = World::new();
    let hall = world.insert(Thing::location(
        "The Entrance Hall",
        "A draughty hall with a worn flagstone floor. An archway leads north.",
    ));
    let courtyard = world.insert(Thing::location(
        "The Courtyard",
        "Weeds push up between the cobbles. The hall lies to the south.",
    ));
    // Both rooms exist and are locations, so neither call can fail.
    let _ = world.link(hall, Direction::North, courtyard);
    let _ = world.link(courtyard, Direction::South, hall);
    let _ = world.add_start_location(hall);
    let _ = world.add_start_location(courtyard);
    world
}
