use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use rhizome_burrow_core::{Direction, Thing, World};
use rhizome_burrow_runtime::BurrowRuntime;
use tokio::sync::mpsc;

const PLAYERS: usize = 8;
const ROUNDS: usize = 200;
/// Large enough that no queue fills while a thread is descheduled.
const QUEUE: usize = PLAYERS * ROUNDS * 4;

#[test]
fn test_concurrent_moves_keep_containment_consistent() {
    let mut world = World::new();
    let hall = world.insert(Thing::location("Hall", ""));
    let garden = world.insert(Thing::location("Garden", ""));
    world.link(hall, Direction::North, garden).unwrap();
    world.link(garden, Direction::South, hall).unwrap();
    world.add_start_location(hall).unwrap();
    let runtime = Arc::new(BurrowRuntime::new(world));

    let handles: Vec<_> = (0..PLAYERS)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                let (tx, mut rx) = mpsc::channel(QUEUE);
                let player = runtime.connect(tx).unwrap();
                for round in 0..ROUNDS {
                    let line = match round % 4 {
                        0 => "north",
                        1 => "say hi",
                        2 => "south",
                        _ => "look",
                    };
                    runtime.dispatch(player, line).unwrap();
                    while rx.try_recv().is_ok() {}
                }
                player
            })
        })
        .collect();
    let players: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    {
        let world = runtime.world().lock();
        world.check_containment().unwrap();
        // Every player made an even number of moves and is back in the hall.
        assert_eq!(world.occupants(hall).unwrap().len(), PLAYERS);
        assert!(world.occupants(garden).unwrap().is_empty());
    }

    let leavers: Vec<_> = players
        .iter()
        .copied()
        .map(|player| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || runtime.disconnect(player))
        })
        .collect();
    for leaver in leavers {
        assert!(leaver.join().unwrap());
    }

    let world = runtime.world().lock();
    world.check_containment().unwrap();
    assert_eq!(world.players().count(), 0);
    assert!(world.occupants(hall).unwrap().is_empty());
    assert!(runtime.directory().is_empty());
}

#[test]
fn test_disconnect_while_others_act() {
    let mut world = World::new();
    let hall = world.insert(Thing::location("Hall", ""));
    world.add_start_location(hall).unwrap();
    let runtime = Arc::new(BurrowRuntime::new(world));

    let (tx, _rx) = mpsc::channel(QUEUE);
    let stayer = runtime.connect(tx).unwrap();

    let churn: Vec<_> = (0..PLAYERS)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                for _ in 0..ROUNDS / 10 {
                    let (tx, _rx) = mpsc::channel(QUEUE);
                    let player = runtime.connect(tx).unwrap();
                    runtime.dispatch(player, "say bye").unwrap();
                    assert!(runtime.disconnect(player));
                }
            })
        })
        .collect();
    for _ in 0..ROUNDS {
        runtime.dispatch(stayer, "who").unwrap();
    }
    for handle in churn {
        handle.join().unwrap();
    }

    let world = runtime.world().lock();
    world.check_containment().unwrap();
    assert_eq!(world.occupants(hall).unwrap(), vec![stayer]);
}

#[test]
fn test_initial_look_comes_first_under_chatter() {
    let mut world = World::new();
    let hall = world.insert(Thing::location("Hall", ""));
    world.add_start_location(hall).unwrap();
    let runtime = Arc::new(BurrowRuntime::new(world));
    let stop = Arc::new(AtomicBool::new(false));

    let talkers: Vec<_> = (0..4)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let (tx, mut rx) = mpsc::channel(QUEUE);
                let player = runtime.connect(tx).unwrap();
                while !stop.load(Ordering::Relaxed) {
                    runtime.dispatch(player, "say hi").unwrap();
                    while rx.try_recv().is_ok() {}
                }
                runtime.disconnect(player);
            })
        })
        .collect();

    for _ in 0..ROUNDS * 10 {
        let (tx, mut rx) = mpsc::channel(QUEUE);
        let player = runtime.connect(tx).unwrap();
        let first = rx.try_recv().unwrap();
        assert!(first.starts_with("\nHall\n"), "first message was {first:?}");
        runtime.disconnect(player);
    }

    stop.store(true, Ordering::Relaxed);
    for talker in talkers {
        talker.join().unwrap();
    }
    assert_eq!(runtime.world().lock().players().count(), 0);
    assert!(runtime.directory().is_empty());
}
