//! Re-stylization of placeholders after viewport resizes.

use crate::document::DocumentAdapter;
use crate::placeholder::{self, PlaceholderStyle};
use crate::session::Session;

/// Re-applies placeholders with current layout geometry.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResizeRecalculator;

impl ResizeRecalculator {
    /// Re-stylize every marked image that is still in the document.
    ///
    /// Each call depends only on current geometry, so it is safe to run on
    /// every resize event. Returns how many images were re-stylized.
    pub fn restyle<D>(doc: &mut D, session: &mut Session, style: &PlaceholderStyle) -> usize
    where
        D: DocumentAdapter + ?Sized,
    {
        let mut restyled = 0;
        for image in session.stylized_images() {
            let Some(geometry) = doc.geometry(image) else {
                continue;
            };
            placeholder::stylize(doc, image, geometry, style);
            session.mark_stylized(image, geometry);
            restyled += 1;
        }
        restyled
    }
}
