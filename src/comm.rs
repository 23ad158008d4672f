use std::any::Any;
use std::sync::{Arc, Barrier, Mutex};

/// Rank of the coordinating worker, the single source of proposals,
/// decisions, and termination flags.
pub const COORDINATOR: usize = 0;

struct Shared {
    barrier: Barrier,
    slot: Mutex<Option<Box<dyn Any + Send>>>,
    partials: Mutex<Vec<f64>>,
}

/// One worker's handle into a fixed-size lock-step group.
///
/// The group supports exactly the synchronous collectives the update protocol
/// needs: a coordinator-rooted broadcast, a rank-ordered sum reduction, and
/// their composition. Every worker must call every collective in the same
/// order; a solo group (`size == 1`) short-circuits all synchronization.
pub struct Comm {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl Comm {
    /// Create handles for a group of `size` workers (one per thread).
    pub fn group(size: usize) -> Vec<Comm> {
        assert!(size >= 1, "worker group must have at least one member");
        let shared = Arc::new(Shared {
            barrier: Barrier::new(size),
            slot: Mutex::new(None),
            partials: Mutex::new(vec![0.0; size]),
        });
        (0..size)
            .map(|rank| Comm {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// A group of one, for single-worker runs and tests.
    pub fn solo() -> Comm {
        Comm::group(1).pop().unwrap()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    /// Broadcast a value from the coordinator to the whole group.
    ///
    /// The coordinator passes `Some(value)`, every other rank passes `None`.
    /// All ranks return the coordinator's value.
    pub fn broadcast<T: Clone + Send + 'static>(&self, value: Option<T>) -> T {
        if self.size == 1 {
            return value.expect("coordinator must supply the broadcast value");
        }

        if self.is_coordinator() {
            let value = value.expect("coordinator must supply the broadcast value");
            *self.shared.slot.lock().unwrap() = Some(Box::new(value));
        }
        // publish, read, then release the slot for the next collective
        self.shared.barrier.wait();
        let out = {
            let guard = self.shared.slot.lock().unwrap();
            guard
                .as_ref()
                .and_then(|b| b.downcast_ref::<T>())
                .expect("broadcast type mismatch across ranks")
                .clone()
        };
        self.shared.barrier.wait();
        out
    }

    /// Sum-reduce `local` to the coordinator in rank order.
    ///
    /// The fixed combination order makes the result reproducible for a given
    /// group size. Returns `Some(total)` on the coordinator, `None` elsewhere.
    pub fn reduce_sum(&self, local: f64) -> Option<f64> {
        if self.size == 1 {
            return Some(local);
        }

        self.shared.partials.lock().unwrap()[self.rank] = local;
        self.shared.barrier.wait();
        let total = if self.is_coordinator() {
            Some(self.shared.partials.lock().unwrap().iter().sum())
        } else {
            None
        };
        self.shared.barrier.wait();
        total
    }

    /// Reduce in rank order, then broadcast, so every rank ends up with the
    /// identical sum.
    pub fn all_reduce_sum(&self, local: f64) -> f64 {
        let total = self.reduce_sum(local);
        self.broadcast(total)
    }
}
