//! Inline AI suggestions as an explicit per-document state machine.
//!
//! Every edit or cursor move calls [`SuggestionController::request`], which
//! supersedes any pending fetch and moves to `Pending`. The fetch runs on a
//! tokio task after a debounce delay and reports back with the generation it
//! was started for; [`SuggestionController::resolve`] applies it only if that
//! generation is still current. Ghost text is shown only in `Applied`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::annotate::LineIndex;
use crate::debounce::{DebounceSlot, Ticket};
use crate::document::Document;
use crate::error::Result;
use crate::types::FileId;

/// Lines of context sent on each side of the cursor line.
pub const CONTEXT_LINES: usize = 5;

/// What a suggestion source sees of the document around the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub file_name: String,
    pub code: String,
    pub current_line: String,
    pub previous_lines: String,
    pub text_before_cursor: String,
    pub text_after_cursor: String,
    pub next_lines: String,
    /// One-based.
    pub line_number: usize,
}

impl SuggestionContext {
    /// Builds the context for the document's cursor. Blank documents produce
    /// no context and therefore no request.
    pub fn from_document(file_name: &str, doc: &Document) -> Option<Self> {
        let code = doc.text();
        if code.trim().is_empty() {
            return None;
        }

        let index = LineIndex::new(code);
        let line = index.line_of_offset(doc.cursor());
        let range = index.line_range(line)?;
        let current = &code[range.clone()];
        let split = doc.cursor().clamp(range.start, range.end) - range.start;

        let line_text = |l: usize| index.line_range(l).map(|r| &code[r]).unwrap_or_default();
        let previous: Vec<&str> = (line.saturating_sub(CONTEXT_LINES)..line).map(line_text).collect();
        let last = (line + CONTEXT_LINES).min(index.line_count() - 1);
        let next: Vec<&str> = (line + 1..=last).map(line_text).collect();

        Some(Self {
            file_name: file_name.to_owned(),
            code: code.to_owned(),
            current_line: current.to_owned(),
            previous_lines: previous.join("\n"),
            text_before_cursor: current[..split].to_owned(),
            text_after_cursor: current[split..].to_owned(),
            next_lines: next.join("\n"),
            line_number: line + 1,
        })
    }
}

/// Maps a raw model answer to a suggestion. Blank answers and the sentinel
/// `EMPTY` (any case) mean "nothing to suggest".
pub fn normalize_suggestion(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("EMPTY") {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Anything that can produce completion text for a cursor context.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn fetch(&self, context: &SuggestionContext) -> Result<Option<String>>;
}

/// Result of a finished fetch, tagged with its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionReady {
    pub file_id: FileId,
    pub generation: u64,
    pub suggestion: Option<String>,
}

#[derive(Debug, Default)]
pub enum SuggestionState {
    #[default]
    Idle,
    Pending {
        generation: u64,
    },
    Applied {
        generation: u64,
        text: String,
    },
}

#[derive(Debug, Default)]
pub struct SuggestionController {
    slot: DebounceSlot,
    state: SuggestionState,
}

impl SuggestionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    /// Starts a new request, superseding whatever was pending or shown.
    pub fn request(&mut self) -> Ticket {
        let ticket = self.slot.arm();
        self.state = SuggestionState::Pending { generation: ticket.generation };
        ticket
    }

    /// Applies a finished fetch. Returns `false` when the result was stale.
    pub fn resolve(&mut self, generation: u64, suggestion: Option<String>) -> bool {
        if !self.slot.complete(generation) {
            debug!(generation, current = self.slot.generation(), "dropping stale suggestion");
            return false;
        }
        self.state = match suggestion {
            Some(text) => SuggestionState::Applied { generation, text },
            None => SuggestionState::Idle,
        };
        true
    }

    /// Cancels any in-flight fetch and hides the ghost text.
    pub fn cancel(&mut self) {
        self.slot.cancel();
        self.state = SuggestionState::Idle;
    }

    /// Ghost text to render at the cursor, if any.
    pub fn visible(&self) -> Option<&str> {
        match &self.state {
            SuggestionState::Applied { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Inserts the shown suggestion at the cursor. Returns `false` if there
    /// was nothing to accept.
    pub fn accept(&mut self, doc: &mut Document) -> bool {
        if !matches!(self.state, SuggestionState::Applied { .. }) {
            return false;
        }
        match std::mem::take(&mut self.state) {
            SuggestionState::Applied { text, .. } => doc.insert_str(&text),
            _ => false,
        }
    }
}

/// Runs one debounced fetch and reports it on `tx`.
///
/// Nothing is sent if the ticket is cancelled at any point. A missing context
/// resolves immediately after the delay with no suggestion; a failing source
/// is logged and also resolves with no suggestion.
pub fn spawn_fetch<T>(
    source: Arc<dyn SuggestionSource>,
    file_id: FileId,
    ticket: Ticket,
    context: Option<SuggestionContext>,
    debounce: Duration,
    tx: UnboundedSender<T>,
) -> JoinHandle<()>
where
    T: From<SuggestionReady> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = ticket.cancel.cancelled() => return,
            _ = tokio::time::sleep(debounce) => {}
        }

        let suggestion = match context {
            None => None,
            Some(context) => {
                let result = tokio::select! {
                    _ = ticket.cancel.cancelled() => return,
                    result = source.fetch(&context) => result,
                };
                match result {
                    Ok(raw) => raw.as_deref().and_then(normalize_suggestion),
                    Err(e) => {
                        warn!(%file_id, error = %e, "suggestion fetch failed");
                        None
                    }
                }
            }
        };

        if ticket.cancel.is_cancelled() {
            return;
        }
        let _ = tx.send(T::from(SuggestionReady { file_id, generation: ticket.generation, suggestion }));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    struct Fixed(&'static str);

    #[async_trait]
    impl SuggestionSource for Fixed {
        async fn fetch(&self, _context: &SuggestionContext) -> Result<Option<String>> {
            Ok(Some(self.0.to_owned()))
        }
    }

    struct Failing;

    #[async_trait]
    impl SuggestionSource for Failing {
        async fn fetch(&self, _context: &SuggestionContext) -> Result<Option<String>> {
            Err(CoreError::Suggestion("offline".into()))
        }
    }

    fn doc_at(text: &str, cursor: usize) -> Document {
        let mut d = Document::new(FileId::from("f"), text);
        d.set_cursor(cursor);
        d
    }

    #[test]
    fn context_splits_the_cursor_line() {
        let text = "l1\nl2\nl3\nl4\nl5\nl6\nfn main() {}\nafter\n";
        let cursor = text.find("() {}").unwrap();
        let ctx = SuggestionContext::from_document("main.rs", &doc_at(text, cursor)).unwrap();
        assert_eq!(ctx.line_number, 7);
        assert_eq!(ctx.current_line, "fn main() {}");
        assert_eq!(ctx.text_before_cursor, "fn main");
        assert_eq!(ctx.text_after_cursor, "() {}");
        assert_eq!(ctx.previous_lines, "l2\nl3\nl4\nl5\nl6");
        assert_eq!(ctx.next_lines, "after\n");
    }

    #[test]
    fn blank_documents_have_no_context() {
        assert!(SuggestionContext::from_document("a.rs", &doc_at("  \n\t", 0)).is_none());
    }

    #[test]
    fn empty_sentinel_normalizes_to_none() {
        assert_eq!(normalize_suggestion(" EMPTY \n"), None);
        assert_eq!(normalize_suggestion("empty"), None);
        assert_eq!(normalize_suggestion(""), None);
        assert_eq!(normalize_suggestion(" x + 1\n").as_deref(), Some("x + 1"));
    }

    #[test]
    fn stale_results_never_overwrite_newer_requests() {
        let mut c = SuggestionController::new();
        let old = c.request();
        let new = c.request();
        assert!(old.cancel.is_cancelled());
        assert!(!c.resolve(old.generation, Some("stale".into())));
        assert!(c.visible().is_none());
        assert!(c.resolve(new.generation, Some("fresh".into())));
        assert_eq!(c.visible(), Some("fresh"));
    }

    #[test]
    fn accept_inserts_at_cursor_and_returns_to_idle() {
        let mut c = SuggestionController::new();
        let t = c.request();
        c.resolve(t.generation, Some("world".into()));
        let mut d = doc_at("hello ", 6);
        assert!(c.accept(&mut d));
        assert_eq!(d.text(), "hello world");
        assert!(matches!(c.state(), SuggestionState::Idle));
        assert!(!c.accept(&mut d));
    }

    #[test]
    fn cancel_hides_applied_text_and_drops_pending() {
        let mut c = SuggestionController::new();
        let t = c.request();
        c.cancel();
        assert!(!c.resolve(t.generation, Some("late".into())));
        assert!(matches!(c.state(), SuggestionState::Idle));
    }

    #[tokio::test]
    async fn fetch_task_reports_normalized_text() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SuggestionReady>();
        let mut c = SuggestionController::new();
        let ticket = c.request();
        let ctx = SuggestionContext::from_document("a.rs", &doc_at("let x = ", 8));
        spawn_fetch(Arc::new(Fixed("  42;  ")), FileId::from("f"), ticket, ctx, Duration::from_millis(1), tx);

        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.suggestion.as_deref(), Some("42;"));
        assert!(c.resolve(ready.generation, ready.suggestion));
        assert_eq!(c.visible(), Some("42;"));
    }

    #[tokio::test]
    async fn failing_source_resolves_empty() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SuggestionReady>();
        let mut c = SuggestionController::new();
        let ticket = c.request();
        let ctx = SuggestionContext::from_document("a.rs", &doc_at("x", 1));
        spawn_fetch(Arc::new(Failing), FileId::from("f"), ticket, ctx, Duration::from_millis(1), tx);
        assert_eq!(rx.recv().await.unwrap().suggestion, None);
    }

    #[tokio::test]
    async fn cancelled_fetch_sends_nothing() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SuggestionReady>();
        let mut c = SuggestionController::new();
        let ticket = c.request();
        let handle = spawn_fetch(Arc::new(Fixed("x")), FileId::from("f"), ticket, None, Duration::from_millis(50), tx);
        c.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
