//! Host-document capabilities consumed by the stylizer core.
//!
//! The core never touches a DOM directly. Hosts implement
//! [`DocumentAdapter`] over whatever owns the image elements (a browser
//! document, a headless layout tree, a test fake) and forward lifecycle
//! notifications to [`Controller`](crate::Controller).

use core::fmt;

/// Opaque identity of an image element inside one document.
///
/// Ids are assigned by the adapter and must stay stable for the lifetime of
/// the element within a page view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img#{}", self.0)
    }
}

/// Post-layout box size of an image element in CSS pixels.
///
/// For an image that failed to load this is the CSS box, not the intrinsic
/// pixel size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageGeometry {
    pub width: u32,
    pub height: u32,
}

impl ImageGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Inline style properties written by the stylizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    BackgroundImage,
    FontFamily,
    FontSize,
    LineHeight,
    TextAlign,
}

impl StyleProperty {
    /// CSS property name as accepted by `CSSStyleDeclaration.setProperty`.
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::BackgroundImage => "background-image",
            Self::FontFamily => "font-family",
            Self::FontSize => "font-size",
            Self::LineHeight => "line-height",
            Self::TextAlign => "text-align",
        }
    }
}

/// Narrow view of a document holding image elements.
///
/// Methods taking an [`ImageId`] the adapter no longer knows about must be
/// no-ops (or return `None`); the core never treats a missing element as an
/// error.
pub trait DocumentAdapter {
    /// Snapshot of the image elements currently present, in document order.
    fn images(&self) -> Vec<ImageId>;

    /// Current layout geometry, or `None` when the element is gone.
    fn geometry(&self, image: ImageId) -> Option<ImageGeometry>;

    /// The `src` attribute as authored, `None` when the attribute is absent.
    fn authored_source(&self, image: ImageId) -> Option<String>;

    /// The browser-resolved absolute source; empty when there is none.
    fn resolved_source(&self, image: ImageId) -> String;

    /// Register a one-shot failure observer for the element's load attempt.
    ///
    /// The host reports the failure by calling
    /// [`Controller::on_image_error`](crate::Controller::on_image_error).
    fn observe_failure(&mut self, image: ImageId);

    /// Detach the failure observer registered by
    /// [`observe_failure`](Self::observe_failure).
    fn release_failure_observer(&mut self, image: ImageId);

    /// Set the accessible fallback (`alt`) text.
    fn set_fallback_text(&mut self, image: ImageId, text: &str);

    /// Drop the source reference so no further native load or error activity
    /// happens and the fallback text is rendered instead.
    fn clear_source(&mut self, image: ImageId);

    /// Set one inline style property, replacing any previous value.
    fn set_style(&mut self, image: ImageId, property: StyleProperty, value: &str);
}
