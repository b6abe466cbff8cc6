//! RT-safe garbage collection for decoded cues
//!
//! Decoded cues are handed to the audio thread as `basedrop::Shared`. When a
//! voice finishes, its `Shared` is dropped inside the audio callback; instead
//! of freeing there, the pointer is queued and freed by a background GC
//! thread.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating `Shared<T>` allocations
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Start the collector thread and return a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread
            let mut collector = Collector::new();

            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(Duration::from_millis(100));
            }
        })
        .expect("Failed to spawn audio GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Handle for wrapping a value in `basedrop::Shared`
///
/// The collector thread is started on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
