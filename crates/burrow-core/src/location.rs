//! Directions, exits and room rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Thing;

/// The fixed set of exit directions. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// Parse a direction word or its one-letter abbreviation, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Capitalized form used in exit summaries.
    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }

    /// Upper-case verbs that move in this direction.
    pub fn verbs(self) -> [&'static str; 2] {
        match self {
            Direction::North => ["NORTH", "N"],
            Direction::South => ["SOUTH", "S"],
            Direction::East => ["EAST", "E"],
            Direction::West => ["WEST", "W"],
            Direction::Up => ["UP", "U"],
            Direction::Down => ["DOWN", "D"],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of trying to walk through an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        from: crate::Uid,
        to: crate::Uid,
    },
    /// No exit that way; nothing changed.
    NoExit,
}

/// `Exits: North South`, or `Exits: None`.
pub fn exits_line(location: &Thing) -> String {
    let labels: Vec<&str> = location.exits().map(|(d, _)| d.label()).collect();
    if labels.is_empty() {
        "Exits: None".to_string()
    } else {
        format!("Exits: {}", labels.join(" "))
    }
}

/// Blank line, name, description, exits, blank line.
pub fn render_look(location: &Thing) -> String {
    format!(
        "\n{}\n{}\n{}\n\n",
        location.name(),
        location.description(),
        exits_line(location)
    )
}
