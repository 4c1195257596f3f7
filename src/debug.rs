//! Audio-thread diagnostics.
//!
//! `aic_log!` formats into a fixed-size buffer and pushes it onto a ringbuf
//! queue, so it can be called from `process` without allocating. The editor
//! timer drains the ring to a file. Without the `debug` feature everything
//! here compiles to nothing.

use std::fmt;

#[cfg(feature = "debug")]
pub mod logger {
    use once_cell::sync::Lazy;
    use ringbuf::{Consumer, Producer, RingBuffer};
    use std::fmt;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock};

    const RING_CAP: usize = 128;
    const MSG_MAX: usize = 256;

    static LOG_PATH: Lazy<PathBuf> = Lazy::new(|| std::env::temp_dir().join("aic_enhance.log"));

    #[derive(Copy, Clone)]
    struct Entry {
        len: u16,
        bytes: [u8; MSG_MAX],
    }

    impl Default for Entry {
        fn default() -> Self {
            Self {
                len: 0,
                bytes: [0; MSG_MAX],
            }
        }
    }

    impl fmt::Write for Entry {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let used = self.len as usize;
            let n = s.len().min(MSG_MAX - used);
            self.bytes[used..used + n].copy_from_slice(&s.as_bytes()[..n]);
            self.len = (used + n) as u16;
            Ok(())
        }
    }

    impl Entry {
        fn text(&self) -> &str {
            let bytes = &self.bytes[..self.len as usize];
            // Truncation may split a code point; keep the valid prefix.
            match std::str::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
            }
        }
    }

    /// Audio threads push through `try_lock`, so a contended producer drops
    /// the message instead of waiting. The editor timer is the only consumer.
    struct Ring {
        producer: Mutex<Producer<Entry>>,
        consumer: Mutex<Consumer<Entry>>,
        dropped: AtomicUsize,
    }

    impl Ring {
        fn new(capacity: usize) -> Self {
            let (producer, consumer) = RingBuffer::<Entry>::new(capacity).split();
            Self {
                producer: Mutex::new(producer),
                consumer: Mutex::new(consumer),
                dropped: AtomicUsize::new(0),
            }
        }

        fn push(&self, entry: Entry) {
            let pushed = match self.producer.try_lock() {
                Ok(mut producer) => producer.push(entry).is_ok(),
                Err(_) => false,
            };
            if !pushed {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        fn pop(&self) -> Option<Entry> {
            self.consumer.lock().ok()?.pop()
        }
    }

    static RING: OnceLock<Ring> = OnceLock::new();
    static ENABLED: AtomicBool = AtomicBool::new(false);

    /// Allocates the ring. Call from a non-real-time context.
    pub fn init_logger() {
        let _ = RING.get_or_init(|| Ring::new(RING_CAP));
        ENABLED.store(true, Ordering::Relaxed);
    }

    pub fn log_args(args: fmt::Arguments) {
        if !ENABLED.load(Ordering::Relaxed) {
            return;
        }
        if let Some(ring) = RING.get() {
            let mut entry = Entry::default();
            let _ = fmt::write(&mut entry, args);
            ring.push(entry);
        }
    }

    pub fn drain_to_file() {
        let ring = match RING.get() {
            Some(r) if ENABLED.load(Ordering::Relaxed) => r,
            _ => return,
        };
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_PATH.as_path())
        {
            Ok(f) => f,
            Err(_) => return,
        };

        while let Some(entry) = ring.pop() {
            if entry.len > 0 {
                let _ = writeln!(file, "{}", entry.text());
            }
        }
        let dropped = ring.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            let _ = writeln!(file, "({} messages dropped)", dropped);
        }
    }

}

#[cfg(feature = "debug")]
pub(crate) fn aic_log_inner(args: fmt::Arguments) {
    logger::log_args(args);
}

#[cfg(not(feature = "debug"))]
pub(crate) fn aic_log_inner(_args: fmt::Arguments) {}

/// Drain audio-thread messages to disk. No-op without the `debug` feature.
pub fn drain() {
    #[cfg(feature = "debug")]
    logger::drain_to_file();
}

#[macro_export]
macro_rules! aic_log {
    ($($arg:tt)*) => {
        $crate::debug::aic_log_inner(format_args!($($arg)*))
    };
}
