//! Generation-tagged cancellation for debounced requests.
//!
//! Each debounced concern of an open document (suggestion fetch, content save)
//! owns one [`DebounceSlot`]. Arming the slot cancels whatever was in flight and
//! hands out a [`Ticket`]; a result may only be applied while its ticket's
//! generation is still the slot's current one.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifies one debounced request.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub generation: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct DebounceSlot {
    generation: u64,
    pending: Option<CancellationToken>,
}

impl DebounceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes the pending request, if any, and starts a new one.
    pub fn arm(&mut self) -> Ticket {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let cancel = CancellationToken::new();
        self.pending = Some(cancel.clone());
        Ticket { generation: self.generation, cancel }
    }

    /// Cancels the pending request without starting another one.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Marks `generation` as delivered. Returns `false` for stale or
    /// cancelled generations, whose results must be dropped.
    pub fn complete(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Sends `event` on `tx` after `delay` unless the ticket is cancelled first.
pub fn spawn_delayed<T>(ticket: Ticket, delay: Duration, tx: UnboundedSender<T>, event: T) -> JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = ticket.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                if !ticket.cancel.is_cancelled() {
                    let _ = tx.send(event);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_supersedes_the_previous_ticket() {
        let mut slot = DebounceSlot::new();
        let first = slot.arm();
        let second = slot.arm();
        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert!(!slot.complete(first.generation));
        assert!(slot.complete(second.generation));
        assert!(!slot.is_pending());
    }

    #[test]
    fn completed_or_cancelled_generations_are_not_current() {
        let mut slot = DebounceSlot::new();
        let ticket = slot.arm();
        slot.cancel();
        assert!(ticket.cancel.is_cancelled());
        assert!(!slot.complete(ticket.generation));

        let ticket = slot.arm();
        assert!(slot.complete(ticket.generation));
        assert!(!slot.complete(ticket.generation));
    }

    #[tokio::test]
    async fn delayed_event_fires_unless_superseded() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut slot = DebounceSlot::new();

        let stale = slot.arm();
        let stale_task = spawn_delayed(stale.clone(), Duration::from_millis(20), tx.clone(), stale.generation);
        let fresh = slot.arm();
        spawn_delayed(fresh.clone(), Duration::from_millis(5), tx, fresh.generation);

        assert_eq!(rx.recv().await, Some(fresh.generation));
        stale_task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
