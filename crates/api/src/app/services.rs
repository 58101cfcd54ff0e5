//! Shared state injected into handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reportdeck_config::Registry;
use reportdeck_queue::Queue;

/// Process-wide services: the queue client, the config registry, and the
/// worker's reported state.
pub struct AppServices {
    pub queue: Queue,
    pub registry: Arc<Registry>,
    pub worker_running: Arc<AtomicBool>,
    pub worker_concurrency: usize,
    pub max_attempts: u32,
}

impl AppServices {
    pub fn worker_is_running(&self) -> bool {
        self.worker_running.load(Ordering::SeqCst)
    }
}
