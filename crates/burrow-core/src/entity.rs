//! Thing: the uniform entity record.
//!
//! Players, objects and locations are all `Thing`s. What a Thing *is* comes
//! from its flags, not from its type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::location::Direction;

/// Process-unique identifier of a Thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(u64);

impl Uid {
    /// Allocate a fresh identifier. Identifiers are never reused.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Player,
    Location,
    Object,
}

/// Semantic attribute keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Name,
    Description,
}

/// Named string collections attached to a Thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Alternate names usable to refer to the Thing in input.
    Aliases,
}

/// An entity in the world.
///
/// The containment fields (`container`, `children`) are private: only
/// [`World`](crate::World) changes them, and always both sides at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    uid: Uid,
    flags: BTreeSet<Flag>,
    attributes: BTreeMap<Attribute, String>,
    collections: BTreeMap<Collection, Vec<String>>,
    container: Option<Uid>,
    children: BTreeSet<Uid>,
    exits: BTreeMap<Direction, Uid>,
}

impl Thing {
    /// Create a Thing with a fresh UID and no state.
    pub fn create() -> Self {
        Self {
            uid: Uid::next(),
            flags: BTreeSet::new(),
            attributes: BTreeMap::new(),
            collections: BTreeMap::new(),
            container: None,
            children: BTreeSet::new(),
            exits: BTreeMap::new(),
        }
    }

    pub fn player(name: &str) -> Self {
        let mut thing = Self::create();
        thing.set_flag(Flag::Player);
        thing.set_attribute(Attribute::Name, name);
        thing
    }

    pub fn location(name: &str, description: &str) -> Self {
        let mut thing = Self::create();
        thing.set_flag(Flag::Location);
        thing.set_attribute(Attribute::Name, name);
        thing.set_attribute(Attribute::Description, description);
        thing
    }

    pub fn object(name: &str, description: &str) -> Self {
        let mut thing = Self::create();
        thing.set_flag(Flag::Object);
        thing.set_attribute(Attribute::Name, name);
        thing.set_attribute(Attribute::Description, description);
        thing
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.flags.remove(&flag);
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_player(&self) -> bool {
        self.has_flag(Flag::Player)
    }

    /// A location is anything flagged as one that is not also a player.
    pub fn is_location(&self) -> bool {
        self.has_flag(Flag::Location) && !self.is_player()
    }

    pub fn set_attribute(&mut self, key: Attribute, value: impl Into<String>) {
        self.attributes.insert(key, value.into());
    }

    pub fn attribute(&self, key: Attribute) -> Option<&str> {
        self.attributes.get(&key).map(String::as_str)
    }

    /// Name, or an empty string if none was set.
    pub fn name(&self) -> &str {
        self.attribute(Attribute::Name).unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.attribute(Attribute::Description).unwrap_or("")
    }

    /// Add an alternate name. Duplicates (ignoring ASCII case) are skipped.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        let list = self.collections.entry(Collection::Aliases).or_default();
        if !list.iter().any(|a| a.eq_ignore_ascii_case(&alias)) {
            list.push(alias);
        }
    }

    pub fn aliases(&self) -> &[String] {
        self.collection(Collection::Aliases)
    }

    pub fn collection(&self, key: Collection) -> &[String] {
        self.collections.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `token` names this Thing, by name or alias.
    pub fn matches(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        self.name().eq_ignore_ascii_case(token)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(token))
    }

    /// The container this Thing is recorded as being in.
    pub fn container(&self) -> Option<Uid> {
        self.container
    }

    /// UIDs of everything recorded as inside this Thing, in UID order.
    pub fn children(&self) -> impl Iterator<Item = Uid> + '_ {
        self.children.iter().copied()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.children.contains(&uid)
    }

    pub fn exit(&self, direction: Direction) -> Option<Uid> {
        self.exits.get(&direction).copied()
    }

    /// Configured exits in direction order.
    pub fn exits(&self) -> impl Iterator<Item = (Direction, Uid)> + '_ {
        self.exits.iter().map(|(d, u)| (*d, *u))
    }

    pub(crate) fn set_container(&mut self, container: Option<Uid>) {
        self.container = container;
    }

    pub(crate) fn add_child(&mut self, uid: Uid) {
        self.children.insert(uid);
    }

    pub(crate) fn remove_child(&mut self, uid: Uid) -> bool {
        self.children.remove(&uid)
    }

    pub(crate) fn take_children(&mut self) -> BTreeSet<Uid> {
        std::mem::take(&mut self.children)
    }

    pub(crate) fn set_exit(&mut self, direction: Direction, to: Option<Uid>) {
        match to {
            Some(to) => {
                self.exits.insert(direction, to);
            }
            None => {
                self.exits.remove(&direction);
            }
        }
    }
}
