//! The world registry.
//!
//! `World` maps UIDs to Things and owns every containment and exit change.
//! It does no locking of its own; reach it through [`SharedWorld`](crate::SharedWorld)
//! whenever more than one connection can see it.

use std::collections::HashMap;

use thiserror::Error;

use crate::entity::{Thing, Uid};
use crate::location::{self, Direction, MoveOutcome};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("thing not found: {0}")]
    NotFound(Uid),

    #[error("not a location: {0}")]
    NotALocation(Uid),

    #[error("{0} is not inside anything")]
    Unplaced(Uid),

    #[error("placing {child} inside {container} would create a containment cycle")]
    ContainmentCycle { child: Uid, container: Uid },

    #[error("containment mismatch between {child} and {container}")]
    ContainmentMismatch { child: Uid, container: Uid },
}

/// Registry of every live Thing.
#[derive(Debug, Default)]
pub struct World {
    things: HashMap<Uid, Thing>,
    start_locations: Vec<Uid>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.things.contains_key(&uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &Thing> {
        self.things.values().filter(|t| t.is_player())
    }

    /// Add a Thing to the registry, unplaced.
    ///
    /// Containment state the Thing arrived with is discarded; use
    /// [`place`](Self::place) afterwards.
    pub fn insert(&mut self, mut thing: Thing) -> Uid {
        let uid = thing.uid();
        thing.set_container(None);
        thing.take_children();
        self.things.insert(uid, thing);
        uid
    }

    /// Remove a Thing, detaching it from its container.
    ///
    /// Anything inside it is moved to its container, or left unplaced if it
    /// had none.
    pub fn remove(&mut self, uid: Uid) -> Result<Thing, WorldError> {
        let mut thing = self.things.remove(&uid).ok_or(WorldError::NotFound(uid))?;

        let parent = thing.container();
        if let Some(parent) = parent.and_then(|p| self.things.get_mut(&p)) {
            parent.remove_child(uid);
        }

        let parent = parent.filter(|p| self.things.contains_key(p));
        for child in thing.take_children() {
            if let Some(c) = self.things.get_mut(&child) {
                c.set_container(parent);
            }
            if let Some(p) = parent.and_then(|p| self.things.get_mut(&p)) {
                p.add_child(child);
            }
        }
        thing.set_container(None);

        self.start_locations.retain(|s| *s != uid);
        Ok(thing)
    }

    pub fn get(&self, uid: Uid) -> Result<&Thing, WorldError> {
        self.things.get(&uid).ok_or(WorldError::NotFound(uid))
    }

    pub fn get_mut(&mut self, uid: Uid) -> Result<&mut Thing, WorldError> {
        self.things.get_mut(&uid).ok_or(WorldError::NotFound(uid))
    }

    /// Put `uid` inside `container`, updating both sides of the relation.
    ///
    /// Everything is validated before anything changes.
    pub fn place(&mut self, uid: Uid, container: Uid) -> Result<(), WorldError> {
        let current = self.get(uid)?.container();
        self.get(container)?;

        let mut cursor = Some(container);
        while let Some(c) = cursor {
            if c == uid {
                return Err(WorldError::ContainmentCycle {
                    child: uid,
                    container,
                });
            }
            cursor = self.things.get(&c).and_then(Thing::container);
        }

        if current == Some(container) {
            return Ok(());
        }

        if let Some(old) = current.and_then(|c| self.things.get_mut(&c)) {
            old.remove_child(uid);
        }
        self.get_mut(container)?.add_child(uid);
        self.get_mut(uid)?.set_container(Some(container));
        Ok(())
    }

    /// Take `uid` out of whatever contains it.
    pub fn detach(&mut self, uid: Uid) -> Result<(), WorldError> {
        let Some(container) = self.get(uid)?.container() else {
            return Ok(());
        };
        if let Some(c) = self.things.get_mut(&container) {
            c.remove_child(uid);
        }
        self.get_mut(uid)?.set_container(None);
        Ok(())
    }

    pub fn location_of(&self, uid: Uid) -> Result<Uid, WorldError> {
        self.get(uid)?.container().ok_or(WorldError::Unplaced(uid))
    }

    /// Things inside `container`, in UID order.
    pub fn occupants(&self, container: Uid) -> Result<Vec<Uid>, WorldError> {
        Ok(self.get(container)?.children().collect())
    }

    /// First Thing inside `container` that answers to `token`.
    pub fn find_in(&self, container: Uid, token: &str) -> Option<Uid> {
        let container = self.things.get(&container)?;
        container
            .children()
            .find(|c| self.things.get(c).is_some_and(|t| t.matches(token)))
    }

    /// Set (or replace) the exit from `from` towards `direction`.
    pub fn link(&mut self, from: Uid, direction: Direction, to: Uid) -> Result<(), WorldError> {
        self.require_location(to)?;
        self.require_location(from)?;
        self.get_mut(from)?.set_exit(direction, Some(to));
        Ok(())
    }

    pub fn unlink(&mut self, from: Uid, direction: Direction) -> Result<(), WorldError> {
        self.require_location(from)?;
        self.get_mut(from)?.set_exit(direction, None);
        Ok(())
    }

    /// Walk `actor` through the exit of its current location.
    pub fn move_through(
        &mut self,
        actor: Uid,
        direction: Direction,
    ) -> Result<MoveOutcome, WorldError> {
        let from = self.location_of(actor)?;
        let Some(to) = self.get(from)?.exit(direction) else {
            return Ok(MoveOutcome::NoExit);
        };
        self.require_location(to)?;
        self.place(actor, to)?;
        Ok(MoveOutcome::Moved { from, to })
    }

    /// Rendered look of a location.
    pub fn look(&self, location: Uid) -> Result<String, WorldError> {
        let thing = self.get(location)?;
        if !thing.is_location() {
            return Err(WorldError::NotALocation(location));
        }
        Ok(location::render_look(thing))
    }

    pub fn add_start_location(&mut self, uid: Uid) -> Result<(), WorldError> {
        self.require_location(uid)?;
        if !self.start_locations.contains(&uid) {
            self.start_locations.push(uid);
        }
        Ok(())
    }

    pub fn start_locations(&self) -> &[Uid] {
        &self.start_locations
    }

    /// Verify that every container reference is mirrored by a children entry
    /// and the other way round.
    pub fn check_containment(&self) -> Result<(), WorldError> {
        for thing in self.things.values() {
            if let Some(container) = thing.container() {
                let mirrored = self
                    .things
                    .get(&container)
                    .is_some_and(|c| c.contains(thing.uid()));
                if !mirrored {
                    return Err(WorldError::ContainmentMismatch {
                        child: thing.uid(),
                        container,
                    });
                }
            }
            for child in thing.children() {
                let mirrored = self
                    .things
                    .get(&child)
                    .is_some_and(|c| c.container() == Some(thing.uid()));
                if !mirrored {
                    return Err(WorldError::ContainmentMismatch {
                        child,
                        container: thing.uid(),
                    });
                }
            }
        }
        Ok(())
    }

    fn require_location(&self, uid: Uid) -> Result<(), WorldError> {
        if self.get(uid)?.is_location() {
            Ok(())
        } else {
            Err(WorldError::NotALocation(uid))
        }
    }
}
