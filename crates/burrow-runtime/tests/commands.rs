//! Built-in verb behavior, driven through the runtime.

use rhizome_burrow_core::{Direction, Thing, Uid, World};
use rhizome_burrow_runtime::{BurrowRuntime, Control, OUTBOUND_CAPACITY, RuntimeError};
use tokio::sync::mpsc;

/// Hall <-> Garden (north/south), hall is the only start location.
fn setup() -> (BurrowRuntime, Uid, Uid) {
    let mut world = World::new();
    let hall = world.insert(Thing::location("Hall", "A long hall."));
    let garden = world.insert(Thing::location("Garden", "Overgrown."));
    world.link(hall, Direction::North, garden).unwrap();
    world.link(garden, Direction::South, hall).unwrap();
    world.add_start_location(hall).unwrap();
    (BurrowRuntime::new(world), hall, garden)
}

fn connect(runtime: &BurrowRuntime) -> (Uid, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let uid = runtime.connect(tx).unwrap();
    (uid, rx)
}

fn drain(rx: &mut mpsc::Receiver<String>) -> String {
    let mut out = String::new();
    while let Ok(text) = rx.try_recv() {
        out.push_str(&text);
    }
    out
}

#[test]
fn test_connect_sends_initial_look() {
    let (runtime, hall, _) = setup();
    let (player, mut rx) = connect(&runtime);

    assert_eq!(drain(&mut rx), "\nHall\nA long hall.\nExits: North\n\n");
    let world = runtime.world().lock();
    assert_eq!(world.location_of(player).unwrap(), hall);
    assert!(world.get(player).unwrap().is_player());
    assert!(world.get(player).unwrap().name().starts_with("Player"));
}

#[test]
fn test_default_names_are_unique() {
    let (runtime, _, _) = setup();
    let (a, _rx_a) = connect(&runtime);
    let (b, _rx_b) = connect(&runtime);
    let world = runtime.world().lock();
    let a = world.get(a).unwrap();
    let b = world.get(b).unwrap();
    assert_ne!(a.name(), b.name());
    assert!(a.matches(&a.name().to_ascii_lowercase()));
}

#[test]
fn test_bystanders_see_arrival() {
    let (runtime, _, _) = setup();
    let (_, mut rx_a) = connect(&runtime);
    drain(&mut rx_a);
    let (b, _rx_b) = connect(&runtime);

    let name = runtime.world().lock().get(b).unwrap().name().to_string();
    assert_eq!(drain(&mut rx_a), format!("{name} appears.\n"));
}

#[test]
fn test_two_players_look_at_the_same_room() {
    let (runtime, _, _) = setup();
    let (a, mut rx_a) = connect(&runtime);
    let (_b, mut rx_b) = connect(&runtime);
    drain(&mut rx_a);
    drain(&mut rx_b);

    assert_eq!(runtime.dispatch(a, "LOOK").unwrap(), Control::Continue);
    assert_eq!(drain(&mut rx_a), "\nHall\nA long hall.\nExits: North\n\n");
    assert_eq!(drain(&mut rx_b), "");
}

#[test]
fn test_look_exits_line_lists_both_directions() {
    let mut world = World::new();
    let middle = world.insert(Thing::location("Middle", "Between."));
    let top = world.insert(Thing::location("Top", ""));
    let bottom = world.insert(Thing::location("Bottom", ""));
    world.link(middle, Direction::South, bottom).unwrap();
    world.link(middle, Direction::North, top).unwrap();
    world.add_start_location(middle).unwrap();
    let runtime = BurrowRuntime::new(world);

    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);
    runtime.dispatch(a, "look").unwrap();
    assert_eq!(drain(&mut rx), "\nMiddle\nBetween.\nExits: North South\n\n");
}

#[test]
fn test_say() {
    let (runtime, _, _) = setup();
    let (a, mut rx_a) = connect(&runtime);
    let (b, mut rx_b) = connect(&runtime);
    drain(&mut rx_a);
    drain(&mut rx_b);
    let before = runtime.world().lock().get(b).unwrap().clone();

    runtime.dispatch(a, "SAY hello there").unwrap();
    assert_eq!(drain(&mut rx_a), "You say \"hello there\"\n");

    let name = runtime.world().lock().get(a).unwrap().name().to_string();
    assert_eq!(drain(&mut rx_b), format!("{name} says \"hello there\"\n"));
    assert_eq!(runtime.world().lock().get(b).unwrap(), &before);
}

#[test]
fn test_bare_say() {
    let (runtime, _, _) = setup();
    let (a, mut rx_a) = connect(&runtime);
    let (_b, mut rx_b) = connect(&runtime);
    drain(&mut rx_a);
    drain(&mut rx_b);

    runtime.dispatch(a, "say").unwrap();
    assert_eq!(
        drain(&mut rx_a),
        "You want to say something, but can't remember what it was.\n"
    );
    assert_eq!(drain(&mut rx_b), "");
}

#[test]
fn test_move_round_trip() {
    let (runtime, hall, garden) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);
    let occupants = runtime.world().lock().occupants(hall).unwrap();

    runtime.dispatch(a, "north").unwrap();
    assert_eq!(drain(&mut rx), "\nGarden\nOvergrown.\nExits: South\n\n");
    assert_eq!(runtime.world().lock().location_of(a).unwrap(), garden);

    runtime.dispatch(a, "S").unwrap();
    assert_eq!(drain(&mut rx), "\nHall\nA long hall.\nExits: North\n\n");

    let world = runtime.world().lock();
    assert_eq!(world.location_of(a).unwrap(), hall);
    assert_eq!(world.occupants(hall).unwrap(), occupants);
    assert!(world.occupants(garden).unwrap().is_empty());
}

#[test]
fn test_move_without_exit_changes_nothing() {
    let (runtime, hall, _) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);
    let before = runtime.world().lock().get(hall).unwrap().clone();

    runtime.dispatch(a, "south").unwrap();
    assert_eq!(drain(&mut rx), "You can't go that way.\n");

    let world = runtime.world().lock();
    assert_eq!(world.location_of(a).unwrap(), hall);
    assert_eq!(world.get(hall).unwrap(), &before);
}

#[test]
fn test_go_direction() {
    let (runtime, _, garden) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);

    runtime.dispatch(a, "go").unwrap();
    assert_eq!(drain(&mut rx), "Go where?\n");
    runtime.dispatch(a, "go NORTH").unwrap();
    assert_eq!(runtime.world().lock().location_of(a).unwrap(), garden);
}

#[test]
fn test_bystanders_see_movement() {
    let (runtime, _, _) = setup();
    let (a, mut rx_a) = connect(&runtime);
    let (b, mut rx_b) = connect(&runtime);
    drain(&mut rx_a);
    drain(&mut rx_b);
    let name_a = runtime.world().lock().get(a).unwrap().name().to_string();

    runtime.dispatch(a, "n").unwrap();
    assert_eq!(drain(&mut rx_b), format!("{name_a} leaves north.\n"));

    drain(&mut rx_a);
    runtime.dispatch(b, "n").unwrap();
    let name_b = runtime.world().lock().get(b).unwrap().name().to_string();
    assert_eq!(drain(&mut rx_a), format!("{name_b} arrives.\n"));
}

#[test]
fn test_blank_lines_fall_back_without_changes() {
    let (runtime, hall, _) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);
    let before = runtime.world().lock().get(hall).unwrap().clone();

    for line in ["", "    ", "\t \t"] {
        assert_eq!(runtime.dispatch(a, line).unwrap(), Control::Continue);
        assert_eq!(drain(&mut rx), "You don't know how to ''.\n");
    }
    assert_eq!(runtime.world().lock().get(hall).unwrap(), &before);
}

#[test]
fn test_unknown_verb() {
    let (runtime, _, _) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);
    runtime.dispatch(a, "Dance").unwrap();
    assert_eq!(drain(&mut rx), "You don't know how to 'dance'.\n");
}

#[test]
fn test_look_at_things() {
    let (runtime, hall, _) = setup();
    let lamp = {
        let mut world = runtime.world().lock();
        let mut lamp = Thing::object("brass lamp", "It is dented.");
        lamp.add_alias("lamp");
        let lamp = world.insert(lamp);
        world.place(lamp, hall).unwrap();
        lamp
    };
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);

    runtime.dispatch(a, "look lamp").unwrap();
    assert_eq!(drain(&mut rx), "brass lamp\nIt is dented.\n");

    runtime.dispatch(a, "look me").unwrap();
    assert!(drain(&mut rx).ends_with("\nYou see nothing special.\n"));

    runtime.dispatch(a, "look sword").unwrap();
    assert_eq!(drain(&mut rx), "You don't see 'sword' here.\n");

    runtime.world().lock().remove(lamp).unwrap();
    runtime.dispatch(a, "look lamp").unwrap();
    assert_eq!(drain(&mut rx), "You don't see 'lamp' here.\n");
}

#[test]
fn test_who() {
    let (runtime, _, _) = setup();
    let (a, mut rx) = connect(&runtime);
    let (b, _rx_b) = connect(&runtime);
    drain(&mut rx);

    let mut names = {
        let world = runtime.world().lock();
        vec![
            world.get(a).unwrap().name().to_string(),
            world.get(b).unwrap().name().to_string(),
        ]
    };
    names.sort();
    runtime.dispatch(a, "WHO").unwrap();
    assert_eq!(
        drain(&mut rx),
        format!("Players online: {}\n", names.join(", "))
    );
}

#[test]
fn test_quit() {
    let (runtime, hall, _) = setup();
    let (a, mut rx) = connect(&runtime);
    drain(&mut rx);

    assert_eq!(runtime.dispatch(a, "QuIt").unwrap(), Control::Quit);
    assert_eq!(drain(&mut rx), "Goodbye.\n");

    // Quitting only ends the loop; the session's cleanup removes the player.
    assert!(runtime.world().lock().contains(a));
    assert!(runtime.disconnect(a));
    let world = runtime.world().lock();
    assert!(!world.contains(a));
    assert!(world.occupants(hall).unwrap().is_empty());
}

#[test]
fn test_disconnect_notifies_and_cleans_up() {
    let (runtime, hall, _) = setup();
    let (a, _rx_a) = connect(&runtime);
    let (_b, mut rx_b) = connect(&runtime);
    drain(&mut rx_b);
    let name = runtime.world().lock().get(a).unwrap().name().to_string();

    assert!(runtime.disconnect(a));
    assert_eq!(drain(&mut rx_b), format!("{name} vanishes.\n"));
    assert!(!runtime.directory().is_registered(a));
    assert!(!runtime.disconnect(a));

    let world = runtime.world().lock();
    assert!(!world.contains(a));
    assert!(!world.get(hall).unwrap().contains(a));
    world.check_containment().unwrap();
}

#[test]
fn test_commands_from_departed_player_are_rejected() {
    let (runtime, _, _) = setup();
    let (a, _rx) = connect(&runtime);
    runtime.disconnect(a);
    assert!(runtime.dispatch(a, "look").is_err());
}

#[test]
fn test_connect_without_start_location() {
    let runtime = BurrowRuntime::new(World::new());
    let (tx, _rx) = mpsc::channel(OUTBOUND_CAPACITY);
    assert!(runtime.connect(tx).is_err());
    assert!(runtime.directory().is_empty());
    assert!(runtime.world().lock().is_empty());
}

#[test]
fn test_connect_with_closed_channel_leaves_no_player() {
    let (runtime, hall, _) = setup();
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    drop(rx);
    assert!(matches!(
        runtime.connect(tx),
        Err(RuntimeError::Disconnected)
    ));
    assert!(runtime.directory().is_empty());
    let world = runtime.world().lock();
    assert_eq!(world.players().count(), 0);
    assert!(world.occupants(hall).unwrap().is_empty());
}

#[test]
fn test_slow_player_is_cut_off() {
    let (runtime, hall, _) = setup();
    let (slow_tx, mut slow_rx) = mpsc::channel(4);
    let slow = runtime.connect(slow_tx).unwrap();
    let (talker, mut talker_rx) = connect(&runtime);

    // One slot went to the look, one to the arrival notice.
    for _ in 0..4 {
        runtime.dispatch(talker, "say hi").unwrap();
    }
    assert!(!runtime.directory().is_registered(slow));
    assert!(runtime.directory().is_registered(talker));

    let out = drain(&mut slow_rx);
    assert!(out.starts_with("\nHall\n"));
    assert_eq!(out.matches("Player").count(), 3);
    assert!(matches!(
        slow_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));

    // The world is untouched until the connection goes away.
    assert_eq!(runtime.world().lock().occupants(hall).unwrap().len(), 2);
    drain(&mut talker_rx);
    runtime.dispatch(talker, "say still here").unwrap();
    assert_eq!(drain(&mut talker_rx), "You say \"still here\"\n");
    assert!(runtime.disconnect(slow));
}
