use core::{cell::Cell, future::poll_fn, task::Poll};

use embassy_sync::{blocking_mutex::Mutex, waitqueue::AtomicWaker};

use crate::state::RegulatorMutex;

/// Counting signal released from interrupt context once per timer tick and
/// consumed by the worker that owns the tick.
///
/// Releases are never lost: if the worker falls behind, every pending tick
/// is handed out before `acquire` suspends again.
pub struct TickSignal {
    pending: Mutex<RegulatorMutex, Cell<u32>>,
    waker: AtomicWaker,
}

impl TickSignal {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
            waker: AtomicWaker::new(),
        }
    }

    /// ISR safe. Only marks the tick and wakes the waiting worker.
    pub fn release(&self) {
        self.pending.lock(|pending| pending.set(pending.get().saturating_add(1)));
        self.waker.wake();
    }

    pub fn try_acquire(&self) -> bool {
        self.pending.lock(|pending| {
            let count = pending.get();
            if count > 0 {
                pending.set(count - 1);
                true
            } else {
                false
            }
        })
    }

    pub async fn acquire(&self) {
        poll_fn(|cx| {
            if self.try_acquire() {
                return Poll::Ready(());
            }

            self.waker.register(cx.waker());

            // a release may have landed between the check and the register
            if self.try_acquire() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    pub fn pending(&self) -> u32 {
        self.pending.lock(|pending| pending.get())
    }
}

impl Default for TickSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::TickSignal;
    use embassy_futures::block_on;

    #[test]
    fn releases_are_counted() {
        let signal = TickSignal::new();
        signal.release();
        signal.release();
        signal.release();
        assert_eq!(signal.pending(), 3);

        block_on(signal.acquire());
        block_on(signal.acquire());
        assert_eq!(signal.pending(), 1);
        assert!(signal.try_acquire());
        assert!(!signal.try_acquire());
    }
}
