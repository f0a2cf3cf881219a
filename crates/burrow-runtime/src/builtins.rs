//! Built-in verbs.

use rhizome_burrow_core::{Direction, MoveOutcome, Thing, WorldError};

use crate::dispatch::{CommandContext, CommandRegistry};

pub const NO_EXIT: &str = "You can't go that way.\n";
pub const NOWHERE: &str = "You are nowhere at all.\n";
pub const SAY_NOTHING: &str = "You want to say something, but can't remember what it was.\n";

pub fn install(registry: &mut CommandRegistry) {
    for direction in Direction::ALL {
        for verb in direction.verbs() {
            registry.register_location(verb, walk);
        }
    }
    registry.register_location("GO", go);

    registry.register_player("LOOK", look);
    registry.register_player("L", look);
    registry.register_player("SAY", say);
    registry.register_player("WHO", who);
}

/// `NORTH`, `N`, ...
fn walk(ctx: &mut CommandContext<'_>) -> bool {
    let Some(direction) = Direction::parse(&ctx.command.verb) else {
        return false;
    };
    walk_towards(ctx, direction);
    true
}

/// `GO <direction>`
fn go(ctx: &mut CommandContext<'_>) -> bool {
    match ctx.command.args.first() {
        None => ctx.tell("Go where?\n"),
        Some(word) => match Direction::parse(word) {
            Some(direction) => walk_towards(ctx, direction),
            None => ctx.tell(NO_EXIT),
        },
    }
    true
}

fn walk_towards(ctx: &mut CommandContext<'_>, direction: Direction) {
    let name = ctx.actor_name();
    match ctx.world.move_through(ctx.actor, direction) {
        Ok(MoveOutcome::Moved { from, to }) => {
            ctx.tell_room(from, &format!("{name} leaves {direction}.\n"));
            ctx.tell_room(to, &format!("{name} arrives.\n"));
            match ctx.world.look(to) {
                Ok(text) => ctx.tell(text),
                Err(_) => ctx.tell(NOWHERE),
            }
        }
        Ok(MoveOutcome::NoExit) => ctx.tell(NO_EXIT),
        Err(WorldError::Unplaced(_)) => ctx.tell(NOWHERE),
        Err(_) => ctx.tell("That way seems to lead nowhere.\n"),
    }
}

/// `LOOK`, `LOOK ME`, `LOOK <thing>`
fn look(ctx: &mut CommandContext<'_>) -> bool {
    let target = ctx.command.rest.clone();
    let Some(room) = ctx.location() else {
        ctx.tell(NOWHERE);
        return true;
    };

    if target.is_empty() {
        match ctx.world.look(room) {
            Ok(text) => ctx.tell(text),
            Err(_) => ctx.tell(NOWHERE),
        }
        return true;
    }

    let is_self = target.eq_ignore_ascii_case("me")
        || target.eq_ignore_ascii_case("self")
        || ctx.actor().is_some_and(|t| t.matches(&target));
    let found = if is_self {
        Some(ctx.actor)
    } else {
        ctx.world
            .find_in(room, &target)
            .or_else(|| ctx.world.find_in(ctx.actor, &target))
    };

    let text = match found.map(|uid| ctx.world.get(uid)) {
        Some(Ok(thing)) if thing.is_location() => ctx.world.look(thing.uid()).ok(),
        Some(Ok(thing)) => Some(describe(thing)),
        _ => None,
    };
    match text {
        Some(text) => ctx.tell(text),
        None => ctx.tell(format!("You don't see '{target}' here.\n")),
    }
    true
}

fn describe(thing: &Thing) -> String {
    let description = match thing.description() {
        "" => "You see nothing special.",
        d => d,
    };
    format!("{}\n{}\n", thing.name(), description)
}

/// `SAY <text>`
fn say(ctx: &mut CommandContext<'_>) -> bool {
    let text = ctx.command.rest.clone();
    if text.is_empty() {
        ctx.tell(SAY_NOTHING);
        return true;
    }
    ctx.tell(format!("You say \"{text}\"\n"));
    if let Some(room) = ctx.location() {
        let name = ctx.actor_name();
        ctx.tell_room(room, &format!("{name} says \"{text}\"\n"));
    }
    true
}

/// `WHO`
fn who(ctx: &mut CommandContext<'_>) -> bool {
    let mut names: Vec<&str> = ctx.world.players().map(Thing::name).collect();
    names.sort_unstable();
    let line = format!("Players online: {}\n", names.join(", "));
    ctx.tell(line);
    true
}
