use broken_image_stylizer::{
    dimension_label, merge, BrokenSources, ImageGeometry, Placeholder, PlaceholderStyle,
};
use proptest::collection::btree_set;
use proptest::prelude::*;

fn sources(keys: &std::collections::BTreeSet<String>) -> BrokenSources {
    keys.iter().cloned().collect()
}

proptest! {
    #[test]
    fn font_size_stays_within_floor_and_ceiling(width in 1u32..10_000, height in 7u32..10_000) {
        let placeholder = Placeholder::compute(
            ImageGeometry::new(width, height),
            &PlaceholderStyle::default(),
        );
        prop_assert!(placeholder.font_size_px >= 5.0);
        prop_assert!(placeholder.font_size_px <= f64::from(height) * 0.75);
    }

    #[test]
    fn font_size_never_below_floor(width in 0u32..10_000, height in 0u32..10_000) {
        let placeholder = Placeholder::compute(
            ImageGeometry::new(width, height),
            &PlaceholderStyle::default(),
        );
        prop_assert!(placeholder.font_size_px >= 5.0);
        prop_assert_eq!(placeholder.line_height_px, i64::from(height) - 4);
    }

    #[test]
    fn label_is_deterministic(width in 0u32..100_000, height in 0u32..100_000) {
        let geometry = ImageGeometry::new(width, height);
        let label = dimension_label(geometry);
        prop_assert_eq!(&label, &format!("{} \u{00d7} {}", width, height));
        prop_assert_eq!(Placeholder::compute(geometry, &PlaceholderStyle::default()).label, label);
    }

    #[test]
    fn merge_is_idempotent(
        a in btree_set("[a-z]{1,8}", 0..12),
        b in btree_set("[a-z]{1,8}", 0..12),
    ) {
        let (a, b) = (sources(&a), sources(&b));
        let once = merge(&a, &b);
        prop_assert_eq!(merge(&once, &b), once.clone());
        prop_assert_eq!(merge(&a, &a), a.clone());
        prop_assert_eq!(merge(&a, &BrokenSources::new()), a);
    }

    #[test]
    fn merge_commutes_on_disjoint_keys(
        a in btree_set("a[a-z]{0,8}", 0..12),
        b in btree_set("b[a-z]{0,8}", 0..12),
    ) {
        let (a, b) = (sources(&a), sources(&b));
        prop_assert_eq!(merge(&a, &b), merge(&b, &a));
    }
}
