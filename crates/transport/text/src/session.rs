//! Client session management.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rhizome_burrow_core::Uid;
use rhizome_burrow_runtime::{BurrowRuntime, Control, RuntimeError};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connected client and the player it controls.
///
/// The player exists for exactly as long as the session: it is created in
/// [`Session::open`] and removed from the world when the session is dropped,
/// whichever way the connection ended.
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Client's network address.
    pub addr: SocketAddr,
    player: Uid,
    lines: u64,
    runtime: Arc<BurrowRuntime>,
}

impl Session {
    /// Create the player for a new connection. Output for the player is
    /// sent to `outbound`, starting with the look of its start location.
    pub fn open(
        runtime: Arc<BurrowRuntime>,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
    ) -> Result<Self, RuntimeError> {
        let player = runtime.connect(outbound)?;
        let id = SessionId::new();
        info!(session = %id, %addr, %player, "session opened");
        Ok(Self {
            id,
            addr,
            player,
            lines: 0,
            runtime,
        })
    }

    pub fn player(&self) -> Uid {
        self.player
    }

    /// Number of lines handled so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Run one line of input. Returns [`Control::Quit`] when the session
    /// should end.
    pub fn handle_line(&mut self, line: &str) -> Control {
        self.lines += 1;
        match self.runtime.dispatch(self.player, line) {
            Ok(control) => control,
            Err(err) => {
                warn!(
                    session = %self.id,
                    player = %self.player,
                    error = %err,
                    "dropping session"
                );
                Control::Quit
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.runtime.disconnect(self.player);
        info!(session = %self.id, addr = %self.addr, lines = self.lines, "session closed");
    }
}
