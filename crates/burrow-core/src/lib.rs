//! Entity model, location graph, and world registry for Burrow.

pub mod entity;
pub mod location;
pub mod lock;
pub mod seed;
pub mod world;

pub use entity::{Attribute, Collection, Flag, Thing, Uid};
pub use location::{Direction, MoveOutcome, exits_line, render_look};
pub use lock::SharedWorld;
pub use seed::{SeedError, Seeded, WorldDefinition, basic_world};
pub use world::{World, WorldError};
