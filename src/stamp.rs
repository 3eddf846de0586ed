//! Per-message provenance: counter value, thread id and capture time
//!
//! A [`StampSource`] is injected into the registry so tests can make all
//! three deterministic.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::header::Timestamp;

/// Supplies the provenance fields stamped onto every new message
pub trait StampSource: Send + Sync {
    /// Next value of the message counter
    fn next_counter(&self) -> u8;

    /// Identifier of the calling thread, as rendered in text lines
    fn thread_id(&self) -> String;

    /// Capture time for a message created now
    fn now(&self) -> Timestamp;
}

/// Process clock, OS thread ids and a free-running 8-bit counter
///
/// The counter wraps silently after 255; the 256-message aliasing window is
/// accepted.
#[derive(Debug, Default)]
pub struct SystemStamps {
    counter: AtomicU8,
}

impl SystemStamps {
    /// Create a source whose counter starts at zero
    pub const fn new() -> Self {
        Self {
            counter: AtomicU8::new(0),
        }
    }
}

impl StampSource for SystemStamps {
    #[inline]
    fn next_counter(&self) -> u8 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn thread_id(&self) -> String {
        format!("{:?}", std::thread::current().id())
    }

    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
