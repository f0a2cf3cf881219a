//! Output queued under the World Lock and delivered after it is released.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rhizome_burrow_core::{Uid, World};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// One piece of text addressed to one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: Uid,
    pub text: String,
}

/// Messages produced by a command, in the order they were queued.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Message>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: Uid, text: impl Into<String>) {
        self.messages.push(Message {
            to,
            text: text.into(),
        });
    }

    /// Queue `text` to every player in `room` except `except`.
    pub fn tell_room(&mut self, world: &World, room: Uid, except: Uid, text: &str) {
        let Ok(room) = world.get(room) else {
            return;
        };
        for uid in room.children() {
            if uid == except {
                continue;
            }
            if world.get(uid).is_ok_and(|t| t.is_player()) {
                self.push(uid, text);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Everything queued for `uid`, concatenated.
    pub fn text_for(&self, uid: Uid) -> String {
        self.messages
            .iter()
            .filter(|m| m.to == uid)
            .map(|m| m.text.as_str())
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Messages a connection may have waiting before it counts as stalled.
pub const OUTBOUND_CAPACITY: usize = 128;

/// Player UID -> that connection's outbound channel.
///
/// Has its own lock. It may be taken while holding the World Lock, but the
/// World Lock is never taken while holding it.
#[derive(Debug, Default)]
pub struct Directory {
    senders: RwLock<HashMap<Uid, mpsc::Sender<String>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uid: Uid, tx: mpsc::Sender<String>) {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uid, tx);
    }

    /// Drop the channel for `uid`. The connection's writer finishes once it
    /// has drained what was already sent.
    pub fn unregister(&self, uid: Uid) -> bool {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&uid)
            .is_some()
    }

    pub fn is_registered(&self, uid: Uid) -> bool {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&uid)
    }

    pub fn len(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand every message to its recipient's channel without waiting.
    ///
    /// Messages for players that have gone away are dropped. A player whose
    /// queue is full is cut off: its channel is unregistered so the
    /// connection drains what it has and closes. Returns how many messages
    /// were delivered.
    pub fn deliver(&self, outbox: Outbox) -> usize {
        if outbox.is_empty() {
            return 0;
        }
        let mut delivered = 0;
        let mut stalled = Vec::new();
        {
            let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
            for Message { to, text } in outbox {
                if stalled.contains(&to) {
                    continue;
                }
                let Some(tx) = senders.get(&to) else {
                    debug!(player = %to, "dropping message for departed player");
                    continue;
                };
                match tx.try_send(text) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(player = %to, "output queue full, cutting off slow client");
                        stalled.push(to);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(player = %to, "dropping message for closed connection");
                    }
                }
            }
        }
        for uid in stalled {
            self.unregister(uid);
        }
        delivered
    }
}
