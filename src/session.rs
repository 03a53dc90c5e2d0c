//! Per-page-view state: discovered broken sources and element registry.

use std::collections::BTreeMap;

use crate::document::{ImageGeometry, ImageId};
use crate::sources::BrokenSources;

/// What the core knows about one image element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageState {
    /// A failure observer is attached and has not fired yet.
    Observed,
    /// The placeholder has been applied, last with this geometry.
    Stylized { geometry: ImageGeometry },
}

/// Sources discovered broken during this page view.
///
/// Merged into the known-broken store once, at load completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionCache {
    discovered: BrokenSources,
    merged: bool,
}

impl SessionCache {
    pub fn record(&mut self, source: &str) -> bool {
        if self.merged {
            log::debug!("{} broken after persistence; not persisted", source);
        }
        self.discovered.mark_broken(source)
    }

    pub fn discovered(&self) -> &BrokenSources {
        &self.discovered
    }

    /// Whether the cache has already been handed to the store.
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub(crate) fn mark_merged(&mut self) {
        self.merged = true;
    }
}

/// Session-scoped context shared by the detector, the resize pass and the
/// controller. Created empty when the controller starts.
#[derive(Clone, Debug, Default)]
pub struct Session {
    images: BTreeMap<ImageId, ImageState>,
    cache: SessionCache,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut SessionCache {
        &mut self.cache
    }

    pub fn state(&self, image: ImageId) -> Option<ImageState> {
        self.images.get(&image).copied()
    }

    /// Whether the placeholder has been applied to `image`.
    pub fn is_stylized(&self, image: ImageId) -> bool {
        matches!(self.state(image), Some(ImageState::Stylized { .. }))
    }

    /// Stylized images in id order.
    pub fn stylized_images(&self) -> Vec<ImageId> {
        self.images
            .iter()
            .filter(|(_, state)| matches!(state, ImageState::Stylized { .. }))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn stylized_count(&self) -> usize {
        self.images
            .values()
            .filter(|state| matches!(state, ImageState::Stylized { .. }))
            .count()
    }

    /// Note an attached failure observer. Never downgrades a stylized image.
    pub(crate) fn mark_observed(&mut self, image: ImageId) {
        self.images.entry(image).or_insert(ImageState::Observed);
    }

    /// Set (or refresh) the stylized marker. The registry holds one entry per
    /// element, so the marker can never be duplicated.
    pub(crate) fn mark_stylized(&mut self, image: ImageId, geometry: ImageGeometry) {
        self.images
            .insert(image, ImageState::Stylized { geometry });
    }

    /// Drop everything known about a detached element.
    ///
    /// Hosts that can observe element removal call this; nothing in the core
    /// does.
    pub fn forget(&mut self, image: ImageId) -> Option<ImageState> {
        self.images.remove(&image)
    }
}
