//! Page-lifecycle orchestration.

use core::fmt;

use crate::detector::{ErrorDetector, FailureOutcome};
use crate::document::{DocumentAdapter, ImageId};
use crate::placeholder::{self, PlaceholderStyle};
use crate::resize::ResizeRecalculator;
use crate::session::Session;
use crate::sources::BrokenSources;
use crate::store::{KnownBrokenStore, StorageBackend, DEFAULT_STORAGE_KEY};

/// Controller configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerOptions {
    /// Storage key holding the known-broken map.
    pub storage_key: String,
    /// Placeholder rendering parameters.
    pub placeholder: PlaceholderStyle,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            placeholder: PlaceholderStyle::default(),
        }
    }
}

impl ControllerOptions {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderStyle) -> Self {
        self.placeholder = placeholder;
        self
    }
}

/// Lifecycle phase. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Nothing attached yet.
    Created,
    /// Failure observers attached to the startup snapshot.
    Init,
    /// Document structure parsed; known-broken images pre-stylized.
    Ready,
    /// All subresource attempts concluded; session cache persisted.
    Settled,
}

/// Runtime diagnostics emitted by the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum StylizerDiagnostic {
    Attached {
        images: usize,
    },
    PreStylized {
        images: usize,
    },
    FailureStylized {
        image: ImageId,
        source: Option<String>,
    },
    Persisted {
        entries: usize,
        discovered: usize,
    },
    /// Stored mapping was unreadable; nothing was written.
    PersistSkipped {
        discovered: usize,
    },
    Restyled {
        images: usize,
    },
}

type DiagnosticSink = Option<Box<dyn FnMut(StylizerDiagnostic)>>;

/// Drives one page view: Init -> Ready -> Settled, with resize at any time.
///
/// The controller never owns the document; hosts pass it to every handler so
/// they can share both from event callbacks.
pub struct Controller<S> {
    store: KnownBrokenStore<S>,
    style: PlaceholderStyle,
    session: Session,
    phase: Phase,
    known: BrokenSources,
    diagnostic_sink: DiagnosticSink,
}

impl<S: fmt::Debug> fmt::Debug for Controller<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("store", &self.store)
            .field("phase", &self.phase)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<S: StorageBackend> Controller<S> {
    /// Controller with default options.
    pub fn new(backend: S) -> Self {
        Self::with_options(backend, ControllerOptions::default())
    }

    pub fn with_options(backend: S, options: ControllerOptions) -> Self {
        Self {
            store: KnownBrokenStore::with_key(backend, options.storage_key),
            style: options.placeholder,
            session: Session::new(),
            phase: Phase::Created,
            known: BrokenSources::new(),
            diagnostic_sink: None,
        }
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(StylizerDiagnostic) + 'static,
    {
        self.diagnostic_sink = Some(Box::new(sink));
    }

    fn emit_diagnostic(&mut self, diagnostic: StylizerDiagnostic) {
        if let Some(sink) = self.diagnostic_sink.as_mut() {
            sink(diagnostic);
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &KnownBrokenStore<S> {
        &self.store
    }

    pub fn style(&self) -> &PlaceholderStyle {
        &self.style
    }

    /// Known-broken sources loaded at Ready. Empty before that.
    pub fn known_broken(&self) -> &BrokenSources {
        &self.known
    }

    /// Init: attach failure observers to the current image snapshot.
    ///
    /// Call as soon as the document structure can be queried so no failure
    /// goes unobserved. Returns the snapshot size, `0` when already past Init.
    pub fn init<D>(&mut self, doc: &mut D) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        if self.phase >= Phase::Init {
            log::debug!("init ignored in phase {:?}", self.phase);
            return 0;
        }
        let images = ErrorDetector::attach(doc, &mut self.session);
        self.phase = Phase::Init;
        self.emit_diagnostic(StylizerDiagnostic::Attached { images });
        images
    }

    /// Ready: stylize every image whose source is already known broken,
    /// without waiting for its native failure.
    ///
    /// Only images that still carry an authored `src` are eligible; matching
    /// uses the resolved source. Returns how many images were pre-stylized.
    pub fn on_ready<D>(&mut self, doc: &mut D) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        if self.phase >= Phase::Ready {
            log::debug!("ready ignored in phase {:?}", self.phase);
            return 0;
        }
        self.init(doc);
        self.known = self.store.read();
        let mut stylized = 0;
        if !self.known.is_empty() {
            for image in doc.images() {
                if doc.authored_source(image).is_none() {
                    continue;
                }
                if !self.known.is_known_broken(&doc.resolved_source(image)) {
                    continue;
                }
                let Some(geometry) = doc.geometry(image) else {
                    continue;
                };
                placeholder::stylize(doc, image, geometry, &self.style);
                self.session.mark_stylized(image, geometry);
                stylized += 1;
            }
        }
        self.phase = Phase::Ready;
        log::debug!(
            "ready: {} known broken sources, {} images pre-stylized",
            self.known.len(),
            stylized
        );
        self.emit_diagnostic(StylizerDiagnostic::PreStylized { images: stylized });
        stylized
    }

    /// Settled: merge this view's discoveries into the store, exactly once.
    ///
    /// Returns the number of entries written, `0` when already settled or
    /// when the stored mapping could not be read.
    pub fn on_settled<D>(&mut self, doc: &mut D) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        if self.phase >= Phase::Settled {
            log::debug!("settled ignored in phase {:?}", self.phase);
            return 0;
        }
        self.on_ready(doc);
        let discovered = self.session.cache().discovered().len();
        let merged = self.store.merge_and_write(self.session.cache().discovered());
        self.session.cache_mut().mark_merged();
        self.phase = Phase::Settled;
        let Some(merged) = merged else {
            log::info!(
                "known broken sources unreadable; {} discovered this view not persisted",
                discovered
            );
            self.emit_diagnostic(StylizerDiagnostic::PersistSkipped { discovered });
            return 0;
        };
        log::info!(
            "persisted {} known broken sources ({} new this view)",
            merged.len(),
            discovered
        );
        self.emit_diagnostic(StylizerDiagnostic::Persisted {
            entries: merged.len(),
            discovered,
        });
        merged.len()
    }

    /// Failure notification from an observer registered at Init.
    pub fn on_image_error<D>(&mut self, doc: &mut D, image: ImageId) -> FailureOutcome
    where
        D: DocumentAdapter + ?Sized,
    {
        let outcome = ErrorDetector::handle_failure(doc, &mut self.session, image, &self.style);
        if let FailureOutcome::Stylized { source } = &outcome {
            self.emit_diagnostic(StylizerDiagnostic::FailureStylized {
                image,
                source: source.clone(),
            });
        }
        outcome
    }

    /// Viewport resize: re-stylize every marked image with its current
    /// geometry. Returns how many images were re-stylized.
    pub fn on_resize<D>(&mut self, doc: &mut D) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        let images = ResizeRecalculator::restyle(doc, &mut self.session, &self.style);
        self.emit_diagnostic(StylizerDiagnostic::Restyled { images });
        images
    }
}
