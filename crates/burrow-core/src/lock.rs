//! The World Lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::world::World;

/// Shared handle to the world, guarded by one mutex.
///
/// Every read or write of shared world state goes through [`lock`](Self::lock).
/// Never hold the guard across an `.await` or any blocking I/O.
#[derive(Debug, Clone, Default)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Acquire the World Lock.
    ///
    /// A lock poisoned by a panicking holder is recovered: world mutations
    /// update both sides of a relation in a single call, so there is no torn
    /// state to protect against.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
