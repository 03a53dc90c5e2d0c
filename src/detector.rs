//! Load-failure detection for the startup image snapshot.

use crate::document::{DocumentAdapter, ImageId};
use crate::placeholder::{self, PlaceholderStyle};
use crate::session::Session;

/// What handling one failure notification did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Placeholder applied; `source` is the resolved source that was
    /// recorded, `None` when the element had no source to record.
    Stylized { source: Option<String> },
    /// Element already carried the marker; nothing changed.
    AlreadyStylized,
    /// Element is no longer in the document.
    Detached,
}

/// Attaches one-shot failure observers and reacts to failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorDetector;

impl ErrorDetector {
    /// Observe every image present right now. Images added later are not
    /// observed.
    ///
    /// Returns the number of images in the snapshot.
    pub fn attach<D>(doc: &mut D, session: &mut Session) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        let snapshot = doc.images();
        for &image in &snapshot {
            doc.observe_failure(image);
            session.mark_observed(image);
        }
        snapshot.len()
    }

    /// Handle a failed load attempt for `image`.
    ///
    /// The observer is detached in every case; a source seen broken once is
    /// never retried.
    pub fn handle_failure<D>(
        doc: &mut D,
        session: &mut Session,
        image: ImageId,
        style: &PlaceholderStyle,
    ) -> FailureOutcome
    where
        D: DocumentAdapter + ?Sized,
    {
        let outcome = if session.is_stylized(image) {
            FailureOutcome::AlreadyStylized
        } else if let Some(geometry) = doc.geometry(image) {
            let source = doc.resolved_source(image);
            let recorded = if source.is_empty() {
                None
            } else {
                session.cache_mut().record(&source);
                Some(source)
            };
            placeholder::stylize(doc, image, geometry, style);
            session.mark_stylized(image, geometry);
            FailureOutcome::Stylized { source: recorded }
        } else {
            FailureOutcome::Detached
        };
        doc.release_failure_observer(image);
        outcome
    }
}
