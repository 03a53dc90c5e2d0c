//! Broken-image placeholders with cross-visit memory.
//!
//! Images that fail to load are replaced by a flat, dimension-labelled
//! placeholder (`"200 × 100"`). Their resolved sources are remembered in
//! origin-scoped storage so later visits stylize them as soon as the document
//! is parsed, before the native broken icon can appear.
//!
//! The crate is host-agnostic: documents are reached through
//! [`DocumentAdapter`] and persistence through [`StorageBackend`]. A host
//! forwards its lifecycle events to a [`Controller`]:
//!
//! ```
//! use broken_image_stylizer::{Controller, MemoryStorage};
//! # use broken_image_stylizer::{DocumentAdapter, ImageGeometry, ImageId, StyleProperty};
//! # struct EmptyPage;
//! # impl DocumentAdapter for EmptyPage {
//! #     fn images(&self) -> Vec<ImageId> { Vec::new() }
//! #     fn geometry(&self, _: ImageId) -> Option<ImageGeometry> { None }
//! #     fn authored_source(&self, _: ImageId) -> Option<String> { None }
//! #     fn resolved_source(&self, _: ImageId) -> String { String::new() }
//! #     fn observe_failure(&mut self, _: ImageId) {}
//! #     fn release_failure_observer(&mut self, _: ImageId) {}
//! #     fn set_fallback_text(&mut self, _: ImageId, _: &str) {}
//! #     fn clear_source(&mut self, _: ImageId) {}
//! #     fn set_style(&mut self, _: ImageId, _: StyleProperty, _: &str) {}
//! # }
//! # let mut page = EmptyPage;
//! let mut controller = Controller::new(MemoryStorage::new());
//! controller.init(&mut page); // structure parseable
//! controller.on_ready(&mut page); // DOMContentLoaded
//! controller.on_settled(&mut page); // window load
//! controller.on_resize(&mut page); // window resize, any number of times
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod controller;
mod detector;
mod document;
mod placeholder;
mod resize;
mod session;
mod sources;
mod store;

pub use controller::{Controller, ControllerOptions, Phase, StylizerDiagnostic};
pub use detector::{ErrorDetector, FailureOutcome};
pub use document::{DocumentAdapter, ImageGeometry, ImageId, StyleProperty};
pub use placeholder::{
    dimension_label, stylize, Placeholder, PlaceholderStyle, DIMENSION_SEPARATOR,
    TRANSPARENT_PIXEL_DATA_URI,
};
pub use resize::ResizeRecalculator;
pub use session::{ImageState, Session, SessionCache};
pub use sources::{merge, BrokenSources, BROKEN_FLAG};
pub use store::{
    FileStorage, KnownBrokenStore, MemoryStorage, NoStorage, StorageBackend, StorageError,
    DEFAULT_STORAGE_KEY,
};
