//! Capacity-one handshake between the data-ready interrupt and the acquisition task.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Holds at most one pending data-ready event. Signalling while an event is still pending
/// drops the new frame and counts it.
pub struct DataReady {
    pending: AtomicBool,
    dropped: AtomicU32,
}

impl DataReady {
    pub const fn new() -> DataReady {
        DataReady {
            pending: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Raise the event, to be called from the interrupt handler. Returns `false` if the previous
    /// event had not been taken yet.
    pub fn signal(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        } else {
            true
        }
    }

    /// Consume the pending event, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Frames lost because the task had not consumed the previous one.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for DataReady {
    fn default() -> Self {
        DataReady::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot() {
        let d = DataReady::new();
        assert!(!d.take());

        assert!(d.signal());
        assert!(d.is_pending());
        assert!(d.take());
        assert!(!d.take());
        assert_eq!(d.dropped(), 0);
    }

    #[test]
    fn second_signal_is_dropped() {
        let d = DataReady::new();

        assert!(d.signal());
        assert!(!d.signal());
        assert!(!d.signal());
        assert_eq!(d.dropped(), 2);

        // only one pass for the three signals.
        assert!(d.take());
        assert!(!d.take());

        assert!(d.signal());
        assert_eq!(d.dropped(), 2);
    }

    #[test]
    fn signal_from_other_thread() {
        static READY: DataReady = DataReady::new();

        std::thread::spawn(|| READY.signal()).join().unwrap();
        assert!(READY.take());
    }
}
