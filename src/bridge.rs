use crate::types::PoseSample;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};

/// Single-slot, latest-wins mailbox for the most recent part pose.
///
/// Written by the vision client thread, read by the control thread. Create
/// one per process and share it through an `Arc`.
///
/// The payload is a sequence lock over six native 64-bit atomics holding the
/// `f64` bit patterns. Readers never block the writer and retry until they
/// see a whole pose from one `publish` call. The freshness flag is stored with
/// release ordering after the payload and loaded with acquire ordering, so a
/// reader that observes `has_fresh() == true` then calls `peek()` gets the
/// pose of that publish or a later one.
#[derive(Debug, Default)]
pub struct DataBridge {
    /// Even when stable, odd while a publish is in progress, 0 before the first.
    seq: AtomicU64,
    fields: [AtomicU64; 6],
    fresh: AtomicBool,
}

impl DataBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot and mark it fresh. Any unread sample is dropped.
    pub fn publish(&self, sample: PoseSample) {
        let mut seq = self.seq.load(Ordering::Relaxed);
        loop {
            if seq & 1 == 1 {
                std::hint::spin_loop();
                seq = self.seq.load(Ordering::Relaxed);
                continue;
            }
            match self
                .seq
                .compare_exchange_weak(seq, seq + 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => seq = current,
            }
        }
        fence(Ordering::Release);

        let values = [sample.x, sample.y, sample.z, sample.rx, sample.ry, sample.rz];
        for (slot, value) in self.fields.iter().zip(values) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }

        self.seq.store(seq + 2, Ordering::Release);
        self.fresh.store(true, Ordering::Release);
    }

    /// True if a sample was published since the last [`consume`](Self::consume).
    pub fn has_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    /// Last published sample, fresh or not. `None` until the first publish.
    pub fn peek(&self) -> Option<PoseSample> {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before == 0 {
                return None;
            }
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let mut bits = [0u64; 6];
            for (out, slot) in bits.iter_mut().zip(&self.fields) {
                *out = slot.load(Ordering::Relaxed);
            }

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                let [x, y, z, rx, ry, rz] = bits.map(f64::from_bits);
                return Some(PoseSample::new(x, y, z, rx, ry, rz));
            }
        }
    }

    /// Mark the current sample as read. The sample itself stays readable.
    pub fn consume(&self) {
        self.fresh.store(false, Ordering::Release);
    }

    /// Return the fresh sample and mark it read in one step.
    ///
    /// Unlike `has_fresh` + `peek` + `consume`, a publish that lands between
    /// those calls cannot be consumed without being returned.
    pub fn take(&self) -> Option<PoseSample> {
        if self.fresh.swap(false, Ordering::AcqRel) {
            self.peek()
        } else {
            None
        }
    }
}
