//! Event bus for basemark.
//!
//! Terminal input, the render interval, debounce expiries and suggestion
//! results all arrive as one [`AppEvent`] over a tokio unbounded channel. The
//! main loop is the only receiver.

use basemark_core::suggest::SuggestionReady;
use basemark_core::types::FileId;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Frame interval, roughly 30 FPS.
const RENDER_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug)]
pub enum AppEvent {
    /// Key press. Release and repeat events never reach the bus.
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
    /// Time to draw a frame.
    Render,
    /// A suggestion fetch finished, possibly for a superseded generation.
    Suggestion(SuggestionReady),
    /// The save debounce of a document elapsed.
    SaveDue { file_id: FileId, generation: u64 },
}

impl From<SuggestionReady> for AppEvent {
    fn from(ready: SuggestionReady) -> Self {
        AppEvent::Suggestion(ready)
    }
}

/// Both ends of the event channel. `tx` is cloned into every task that
/// produces events; `rx` stays with the main loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

/// Spawns the task that forwards crossterm input and render ticks.
///
/// The crossterm future is fused so a terminated stream is never polled
/// again. The task ends once the receiver is gone.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut render_interval = interval(RENDER_INTERVAL);
        let mut reader = EventStream::new();

        loop {
            let event = tokio::select! {
                _ = render_interval.tick() => AppEvent::Render,
                maybe_event = reader.next().fuse() => match maybe_event {
                    // Windows reports both press and release for each key.
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Some(Ok(Event::Mouse(mouse))) => AppEvent::Mouse(mouse),
                    Some(Ok(Event::Resize(w, h))) => AppEvent::Resize(w, h),
                    Some(_) => continue,
                    None => break,
                },
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}
