//! Burrow runtime: turns input lines from connected players into world
//! changes and queued output.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::seq::SliceRandom;
use rhizome_burrow_core::{SharedWorld, Thing, Uid, World, WorldError};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub mod builtins;
pub mod command;
pub mod dispatch;
pub mod outbox;

pub use command::Command;
pub use dispatch::{CommandContext, CommandHandler, CommandRegistry, Resolution};
pub use outbox::{Directory, Message, OUTBOUND_CAPACITY, Outbox};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("world error: {0}")]
    World(#[from] WorldError),

    #[error("no start location configured")]
    NoStartLocation,

    #[error("connection closed before the player arrived")]
    Disconnected,
}

/// What the connection should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Source of default player names. Independent of the World Lock.
#[derive(Debug)]
pub struct PlayerCounter(AtomicU64);

impl PlayerCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for PlayerCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// The main Burrow runtime.
pub struct BurrowRuntime {
    world: SharedWorld,
    commands: CommandRegistry,
    directory: Directory,
    players: PlayerCounter,
}

impl BurrowRuntime {
    /// Create a runtime over `world` with the built-in verbs.
    pub fn new(world: World) -> Self {
        Self::with_commands(SharedWorld::new(world), CommandRegistry::with_builtins())
    }

    pub fn with_commands(world: SharedWorld, commands: CommandRegistry) -> Self {
        Self {
            world,
            commands,
            directory: Directory::new(),
            players: PlayerCounter::new(),
        }
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Create a player for a new connection and put it in a random start
    /// location. Its first output is the look of that location.
    ///
    /// The look is queued on `outbound` before the channel is registered,
    /// and both happen under the World Lock, so no other command can reach
    /// the new player first.
    pub fn connect(&self, outbound: mpsc::Sender<String>) -> Result<Uid, RuntimeError> {
        let n = self.players.next();
        let name = format!("Player{n}");
        let mut player = Thing::player(&name);
        player.add_alias(name.to_ascii_lowercase());
        let uid = player.uid();

        let arrival = {
            let mut world = self.world.lock();
            let (look, arrival) = place_new_player(&mut world, player, &name)?;
            if outbound.try_send(look).is_err() {
                let _ = world.remove(uid);
                return Err(RuntimeError::Disconnected);
            }
            self.directory.register(uid, outbound);
            arrival
        };
        self.directory.deliver(arrival);
        info!(player = %uid, %name, "player connected");
        Ok(uid)
    }

    /// Handle one line without delivering its output.
    pub fn execute(&self, player: Uid, line: &str) -> Result<(Control, Outbox), RuntimeError> {
        let command = Command::parse(line);
        let mut outbox = Outbox::new();

        if command.is_quit() {
            outbox.push(player, "Goodbye.\n");
            return Ok((Control::Quit, outbox));
        }

        let resolution = {
            let mut world = self.world.lock();
            if !world.contains(player) {
                return Err(WorldError::NotFound(player).into());
            }
            self.commands
                .dispatch(&mut world, player, &command, &mut outbox)
        };
        debug!(player = %player, verb = %command.verb, ?resolution, "command handled");
        Ok((Control::Continue, outbox))
    }

    /// Handle one line and deliver its output.
    pub fn dispatch(&self, player: Uid, line: &str) -> Result<Control, RuntimeError> {
        let (control, outbox) = self.execute(player, line)?;
        self.directory.deliver(outbox);
        Ok(control)
    }

    /// Remove a player from the world and drop its output channel.
    ///
    /// Safe to call more than once; returns whether the player was present.
    pub fn disconnect(&self, player: Uid) -> bool {
        let removed = {
            let mut world = self.world.lock();
            let room = world.location_of(player).ok();
            world.remove(player).ok().map(|thing| {
                let mut outbox = Outbox::new();
                if let Some(room) = room {
                    let text = format!("{} vanishes.\n", thing.name());
                    outbox.tell_room(&world, room, player, &text);
                }
                outbox
            })
        };

        let present = removed.is_some();
        if let Some(outbox) = removed {
            self.directory.deliver(outbox);
            info!(player = %player, "player disconnected");
        }
        self.directory.unregister(player);
        present
    }
}

/// Insert and place `player`, returning its look and the arrival notice
/// for everyone else in the room.
fn place_new_player(
    world: &mut World,
    player: Thing,
    name: &str,
) -> Result<(String, Outbox), RuntimeError> {
    let start = *world
        .start_locations()
        .choose(&mut rand::thread_rng())
        .ok_or(RuntimeError::NoStartLocation)?;

    let uid = world.insert(player);
    if let Err(err) = world.place(uid, start) {
        let _ = world.remove(uid);
        return Err(err.into());
    }

    let look = match world.look(start) {
        Ok(text) => text,
        Err(err) => {
            let _ = world.remove(uid);
            return Err(err.into());
        }
    };
    let mut arrival = Outbox::new();
    arrival.tell_room(world, start, uid, &format!("{name} appears.\n"));
    Ok((look, arrival))
}
