//! Shared handles between the registration listener and shutdown.

use parking_lot::Mutex;
use std::sync::Arc;

/// State reachable from several tasks (the tunnel manager, mostly).
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
