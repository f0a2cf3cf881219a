//! Verb resolution.
//!
//! A command is offered to handlers in tiers, and the first handler that
//! returns `true` ends the search:
//!
//! 1. location tier: handlers bound to the actor's current room, then
//!    handlers registered for every room (movement);
//! 2. player tier: handlers that work anywhere (look, say, who);
//! 3. the "don't know how" fallback.

use std::collections::HashMap;
use std::sync::Arc;

use rhizome_burrow_core::{Thing, Uid, World};

use crate::command::Command;
use crate::outbox::Outbox;

/// State a handler works on. Built while the World Lock is held.
pub struct CommandContext<'a> {
    pub world: &'a mut World,
    pub actor: Uid,
    pub command: &'a Command,
    pub outbox: &'a mut Outbox,
}

impl CommandContext<'_> {
    /// Queue text to the actor.
    pub fn tell(&mut self, text: impl Into<String>) {
        self.outbox.push(self.actor, text);
    }

    /// Queue text to everyone else in `room`.
    pub fn tell_room(&mut self, room: Uid, text: &str) {
        self.outbox.tell_room(self.world, room, self.actor, text);
    }

    pub fn actor(&self) -> Option<&Thing> {
        self.world.get(self.actor).ok()
    }

    pub fn actor_name(&self) -> String {
        self.actor().map(|t| t.name().to_string()).unwrap_or_default()
    }

    pub fn location(&self) -> Option<Uid> {
        self.world.location_of(self.actor).ok()
    }
}

/// A verb implementation. Returns whether it handled the command; `false`
/// passes the command on to the next candidate.
///
/// Handlers must finish every world mutation before returning and must only
/// queue output, never write it.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, ctx: &mut CommandContext<'_>) -> bool;
}

impl<F> CommandHandler for F
where
    F: Fn(&mut CommandContext<'_>) -> bool + Send + Sync,
{
    fn handle(&self, ctx: &mut CommandContext<'_>) -> bool {
        self(ctx)
    }
}

/// Which tier ended up handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Room,
    Location,
    Player,
    Fallback,
}

type Handlers = Vec<Arc<dyn CommandHandler>>;

/// Verb -> handler table consulted by the dispatcher.
#[derive(Default)]
pub struct CommandRegistry {
    rooms: HashMap<(Uid, String), Handlers>,
    location: HashMap<String, Handlers>,
    player: HashMap<String, Handlers>,
}

impl CommandRegistry {
    /// An empty registry: every command falls through.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in verbs installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::install(&mut registry);
        registry
    }

    /// Register a handler tried in every room, before player handlers.
    pub fn register_location(&mut self, verb: &str, handler: impl CommandHandler + 'static) {
        self.location
            .entry(verb.to_ascii_uppercase())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a handler that works regardless of location.
    pub fn register_player(&mut self, verb: &str, handler: impl CommandHandler + 'static) {
        self.player
            .entry(verb.to_ascii_uppercase())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a handler that only exists in one room. Tried first.
    pub fn bind_room(&mut self, room: Uid, verb: &str, handler: impl CommandHandler + 'static) {
        self.rooms
            .entry((room, verb.to_ascii_uppercase()))
            .or_default()
            .push(Arc::new(handler));
    }

    /// Whether anything is registered for `verb` outside room bindings.
    pub fn knows(&self, verb: &str) -> bool {
        let verb = verb.to_ascii_uppercase();
        self.location.contains_key(&verb) || self.player.contains_key(&verb)
    }

    /// Run `command` for `actor`. The caller holds the World Lock.
    pub fn dispatch(
        &self,
        world: &mut World,
        actor: Uid,
        command: &Command,
        outbox: &mut Outbox,
    ) -> Resolution {
        let mut ctx = CommandContext {
            world,
            actor,
            command,
            outbox,
        };

        if !command.is_empty() {
            if let Some(room) = ctx.location() {
                let key = (room, command.verb.clone());
                if try_all(self.rooms.get(&key), &mut ctx) {
                    return Resolution::Room;
                }
            }
            if try_all(self.location.get(&command.verb), &mut ctx) {
                return Resolution::Location;
            }
            if try_all(self.player.get(&command.verb), &mut ctx) {
                return Resolution::Player;
            }
        }

        ctx.tell(format!(
            "You don't know how to '{}'.\n",
            command.verb.to_ascii_lowercase()
        ));
        Resolution::Fallback
    }
}

fn try_all(handlers: Option<&Handlers>, ctx: &mut CommandContext<'_>) -> bool {
    handlers
        .into_iter()
        .flatten()
        .any(|handler| handler.handle(ctx))
}
