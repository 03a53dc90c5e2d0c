use std::collections::BTreeMap;

use broken_image_stylizer::{
    Controller, DocumentAdapter, FailureOutcome, ImageGeometry, ImageId, StorageBackend,
    StyleProperty,
};

pub const BASE_URL: &str = "https://example.com/";

/// One mutation applied through the adapter, in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Observe(ImageId),
    Release(ImageId),
    SetFallbackText(ImageId, String),
    ClearSource(ImageId),
    SetStyle(ImageId, StyleProperty, String),
}

#[derive(Clone, Debug)]
struct FakeImage {
    authored: Option<String>,
    geometry: ImageGeometry,
    alt: Option<String>,
    style: BTreeMap<&'static str, String>,
    observed: bool,
}

/// In-memory document with a recorded mutation log.
#[derive(Debug, Default)]
pub struct FakeDocument {
    images: Vec<(ImageId, FakeImage)>,
    next_id: u32,
    ops: Vec<Op>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with an authored `src`. Relative sources resolve
    /// against [`BASE_URL`].
    pub fn add_image(&mut self, src: &str, width: u32, height: u32) -> ImageId {
        self.push(Some(src.to_string()), width, height)
    }

    /// Add an image without a `src` attribute.
    pub fn add_image_without_source(&mut self, width: u32, height: u32) -> ImageId {
        self.push(None, width, height)
    }

    fn push(&mut self, authored: Option<String>, width: u32, height: u32) -> ImageId {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        self.images.push((
            id,
            FakeImage {
                authored,
                geometry: ImageGeometry::new(width, height),
                alt: None,
                style: BTreeMap::new(),
                observed: false,
            },
        ));
        id
    }

    fn image(&self, id: ImageId) -> Option<&FakeImage> {
        self.images
            .iter()
            .find(|(image_id, _)| *image_id == id)
            .map(|(_, image)| image)
    }

    fn image_mut(&mut self, id: ImageId) -> Option<&mut FakeImage> {
        self.images
            .iter_mut()
            .find(|(image_id, _)| *image_id == id)
            .map(|(_, image)| image)
    }

    pub fn set_geometry(&mut self, id: ImageId, width: u32, height: u32) {
        if let Some(image) = self.image_mut(id) {
            image.geometry = ImageGeometry::new(width, height);
        }
    }

    /// Resize every image, as a responsive layout would on a viewport change.
    pub fn set_all_geometry(&mut self, width: u32, height: u32) {
        for (_, image) in &mut self.images {
            image.geometry = ImageGeometry::new(width, height);
        }
    }

    pub fn remove(&mut self, id: ImageId) {
        self.images.retain(|(image_id, _)| *image_id != id);
    }

    pub fn alt(&self, id: ImageId) -> Option<String> {
        self.image(id).and_then(|image| image.alt.clone())
    }

    pub fn style(&self, id: ImageId, property: StyleProperty) -> Option<String> {
        self.image(id)
            .and_then(|image| image.style.get(property.css_name()).cloned())
    }

    pub fn style_len(&self, id: ImageId) -> usize {
        self.image(id).map_or(0, |image| image.style.len())
    }

    pub fn has_source(&self, id: ImageId) -> bool {
        self.image(id).is_some_and(|image| image.authored.is_some())
    }

    pub fn is_observed(&self, id: ImageId) -> bool {
        self.image(id).is_some_and(|image| image.observed)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn ops_for(&self, id: ImageId) -> Vec<Op> {
        self.ops
            .iter()
            .filter(|op| match op {
                Op::Observe(image)
                | Op::Release(image)
                | Op::SetFallbackText(image, _)
                | Op::ClearSource(image)
                | Op::SetStyle(image, _, _) => *image == id,
            })
            .cloned()
            .collect()
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Simulate the browser firing the element's `error` event.
    ///
    /// Returns `None` when no observer is attached, the way a browser event
    /// without a handler goes nowhere.
    pub fn fail_load<S: StorageBackend>(
        &mut self,
        controller: &mut Controller<S>,
        id: ImageId,
    ) -> Option<FailureOutcome> {
        if !self.is_observed(id) {
            return None;
        }
        Some(controller.on_image_error(self, id))
    }
}

impl DocumentAdapter for FakeDocument {
    fn images(&self) -> Vec<ImageId> {
        self.images.iter().map(|(id, _)| *id).collect()
    }

    fn geometry(&self, image: ImageId) -> Option<ImageGeometry> {
        self.image(image).map(|image| image.geometry)
    }

    fn authored_source(&self, image: ImageId) -> Option<String> {
        self.image(image).and_then(|image| image.authored.clone())
    }

    fn resolved_source(&self, image: ImageId) -> String {
        match self.image(image).and_then(|image| image.authored.as_deref()) {
            None => String::new(),
            Some(src) if src.starts_with("http://") || src.starts_with("https://") => {
                src.to_string()
            }
            Some(src) => format!("{}{}", BASE_URL, src.trim_start_matches('/')),
        }
    }

    fn observe_failure(&mut self, image: ImageId) {
        self.ops.push(Op::Observe(image));
        if let Some(image) = self.image_mut(image) {
            image.observed = true;
        }
    }

    fn release_failure_observer(&mut self, image: ImageId) {
        self.ops.push(Op::Release(image));
        if let Some(image) = self.image_mut(image) {
            image.observed = false;
        }
    }

    fn set_fallback_text(&mut self, image: ImageId, text: &str) {
        self.ops.push(Op::SetFallbackText(image, text.to_string()));
        if let Some(image) = self.image_mut(image) {
            image.alt = Some(text.to_string());
        }
    }

    fn clear_source(&mut self, image: ImageId) {
        self.ops.push(Op::ClearSource(image));
        if let Some(image) = self.image_mut(image) {
            image.authored = None;
        }
    }

    fn set_style(&mut self, image: ImageId, property: StyleProperty, value: &str) {
        self.ops
            .push(Op::SetStyle(image, property, value.to_string()));
        if let Some(image) = self.image_mut(image) {
            image.style.insert(property.css_name(), value.to_string());
        }
    }
}
