use std::collections::HashMap;
use std::collections::hash_map::Entry;

use foundation::PointId;
use foundation::bounds::Aabb2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::symbology::Rgb;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size_px: f64,
    pub font_family: String,
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_width_px: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 13.0,
            font_family: "Arial".to_string(),
            fill: 0x000000,
            stroke: 0xffffff,
            stroke_width_px: 3.0,
        }
    }
}

/// Corner of the point a label's box is attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopRight,
    TopLeft,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopRight,
        Corner::TopLeft,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Corner::TopRight => "top-right",
            Corner::TopLeft => "top-left",
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
        }
    }

    /// Offset of a `size` box's top-left corner from the point (y down).
    pub fn offset(self, size: [f64; 2]) -> [f64; 2] {
        let [w, h] = size;
        match self {
            Corner::TopRight => [0.0, -h],
            Corner::TopLeft => [-w, -h],
            Corner::BottomLeft => [-w, 0.0],
            Corner::BottomRight => [0.0, 0.0],
        }
    }
}

/// `labelPosition` option.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabelPosition {
    Fixed(Corner),
    /// A corner drawn once per point and kept for the point's lifetime.
    Random,
}

impl Default for LabelPosition {
    fn default() -> Self {
        LabelPosition::Fixed(Corner::TopRight)
    }
}

impl From<String> for LabelPosition {
    fn from(s: String) -> Self {
        if s == "random" {
            return LabelPosition::Random;
        }
        match Corner::ALL.into_iter().find(|c| c.name() == s) {
            Some(corner) => LabelPosition::Fixed(corner),
            None => {
                warn!(value = %s, "unknown label position, using top-right");
                LabelPosition::default()
            }
        }
    }
}

impl From<LabelPosition> for String {
    fn from(p: LabelPosition) -> Self {
        match p {
            LabelPosition::Fixed(corner) => corner.name().to_string(),
            LabelPosition::Random => "random".to_string(),
        }
    }
}

/// Natural `[width, height]` of rendered label text.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &LabelStyle) -> [f64; 2];
}

/// Fixed-advance estimate: every character is `0.6 * font_size` wide.
#[derive(Debug, Default, Copy, Clone)]
pub struct EstimatedMetrics;

impl TextMeasurer for EstimatedMetrics {
    fn measure(&self, text: &str, style: &LabelStyle) -> [f64; 2] {
        let count = text.chars().count().max(1) as f64;
        [style.font_size_px * 0.6 * count, style.font_size_px]
    }
}

/// Source of corners for [`LabelPosition::Random`].
pub trait CornerSource: std::fmt::Debug {
    fn next_corner(&mut self) -> Corner;
}

#[derive(Debug)]
pub struct RandomCorners {
    rng: StdRng,
}

impl RandomCorners {
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CornerSource for RandomCorners {
    fn next_corner(&mut self) -> Corner {
        Corner::ALL[self.rng.random_range(0..Corner::ALL.len())]
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LabelEntry {
    text: String,
    size: [f64; 2],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedLabel {
    pub bounds: Aabb2,
    pub offset: [f64; 2],
    pub corner: Corner,
}

impl PlacedLabel {
    /// Top-left corner of the label box in screen space.
    pub fn origin(&self) -> [f64; 2] {
        self.bounds.min
    }
}

/// Per-point label boxes.
///
/// Text is measured once per point and re-measured only when it changes.
/// Random corners are drawn on first layout and stay fixed until the point is
/// removed.
#[derive(Debug)]
pub struct LabelPlacer {
    position: LabelPosition,
    style: LabelStyle,
    entries: HashMap<PointId, LabelEntry>,
    corners: HashMap<PointId, Corner>,
    source: Box<dyn CornerSource>,
}

impl LabelPlacer {
    pub fn new(position: LabelPosition) -> Self {
        Self::with_corner_source(position, Box::new(RandomCorners::from_os_rng()))
    }

    pub fn with_corner_source(position: LabelPosition, source: Box<dyn CornerSource>) -> Self {
        Self {
            position,
            style: LabelStyle::default(),
            entries: HashMap::new(),
            corners: HashMap::new(),
            source,
        }
    }

    /// Switch corner mode. Random corners already drawn are kept.
    pub fn set_position(&mut self, position: LabelPosition) {
        self.position = position;
    }

    pub fn style(&self) -> &LabelStyle {
        &self.style
    }

    /// Place `text` for the point `id` projected at `(x, y)`.
    pub fn layout<M>(&mut self, id: &PointId, x: f64, y: f64, text: &str, measurer: &M) -> PlacedLabel
    where
        M: TextMeasurer + ?Sized,
    {
        let corner = self.corner_for(id);
        let style = &self.style;
        let entry = match self.entries.entry(id.clone()) {
            Entry::Occupied(e) => {
                let e = e.into_mut();
                if e.text != text {
                    e.text = text.to_string();
                    e.size = measurer.measure(text, style);
                }
                e
            }
            Entry::Vacant(e) => e.insert(LabelEntry {
                text: text.to_string(),
                size: measurer.measure(text, style),
            }),
        };

        let offset = corner.offset(entry.size);
        let bounds = Aabb2::from_origin_size([x + offset[0], y + offset[1]], entry.size);

        PlacedLabel {
            bounds,
            offset,
            corner,
        }
    }

    pub fn remove(&mut self, id: &PointId) {
        self.entries.remove(id);
        self.corners.remove(id);
    }

    fn corner_for(&mut self, id: &PointId) -> Corner {
        match self.position {
            LabelPosition::Fixed(corner) => corner,
            LabelPosition::Random => *self
                .corners
                .entry(id.clone())
                .or_insert_with(|| self.source.next_corner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Cycle(usize);

    impl CornerSource for Cycle {
        fn next_corner(&mut self) -> Corner {
            let c = Corner::ALL[self.0 % 4];
            self.0 += 1;
            c
        }
    }

    struct Fixed([f64; 2]);

    impl TextMeasurer for Fixed {
        fn measure(&self, _text: &str, _style: &LabelStyle) -> [f64; 2] {
            self.0
        }
    }

    #[test]
    fn corner_offsets() {
        let size = [20.0, 10.0];
        assert_eq!(Corner::TopRight.offset(size), [0.0, -10.0]);
        assert_eq!(Corner::TopLeft.offset(size), [-20.0, -10.0]);
        assert_eq!(Corner::BottomLeft.offset(size), [-20.0, 0.0]);
        assert_eq!(Corner::BottomRight.offset(size), [0.0, 0.0]);
    }

    #[test]
    fn position_parses_with_fallback() {
        let parse = |s: &str| -> LabelPosition { serde_json::from_value(serde_json::json!(s)).unwrap() };
        assert_eq!(parse("bottom-left"), LabelPosition::Fixed(Corner::BottomLeft));
        assert_eq!(parse("random"), LabelPosition::Random);
        assert_eq!(parse("middle"), LabelPosition::Fixed(Corner::TopRight));
        assert_eq!(
            serde_json::to_value(LabelPosition::Fixed(Corner::TopLeft)).unwrap(),
            serde_json::json!("top-left")
        );
    }

    #[test]
    fn estimated_metrics_scale_with_text() {
        let style = LabelStyle::default();
        assert_eq!(EstimatedMetrics.measure("abcd", &style), [13.0 * 0.6 * 4.0, 13.0]);
        assert_eq!(EstimatedMetrics.measure("", &style), [13.0 * 0.6, 13.0]);
    }

    #[test]
    fn layout_attaches_box_to_corner() {
        let mut placer = LabelPlacer::new(LabelPosition::Fixed(Corner::TopLeft));
        let placed = placer.layout(&PointId::from("a"), 100.0, 50.0, "x", &Fixed([20.0, 10.0]));
        assert_eq!(placed.corner, Corner::TopLeft);
        assert_eq!(placed.offset, [-20.0, -10.0]);
        assert_eq!(placed.bounds, Aabb2::new([80.0, 40.0], [100.0, 50.0]));
    }

    #[test]
    fn random_corner_is_sticky_per_point() {
        let mut placer =
            LabelPlacer::with_corner_source(LabelPosition::Random, Box::new(Cycle(0)));
        let a = PointId::from("a");
        let b = PointId::from("b");
        let m = Fixed([10.0, 10.0]);

        let first = placer.layout(&a, 0.0, 0.0, "a", &m).corner;
        let other = placer.layout(&b, 0.0, 0.0, "b", &m).corner;
        for _ in 0..5 {
            assert_eq!(placer.layout(&a, 3.0, 4.0, "a", &m).corner, first);
        }
        assert_ne!(first, other);

        placer.remove(&a);
        assert_ne!(placer.layout(&a, 0.0, 0.0, "a", &m).corner, first);
    }

    #[test]
    fn text_is_remeasured_only_when_it_changes() {
        let mut placer = LabelPlacer::new(LabelPosition::default());
        let id = PointId::from("a");
        let short = placer.layout(&id, 0.0, 0.0, "ab", &EstimatedMetrics);
        let same = placer.layout(&id, 0.0, 0.0, "ab", &Fixed([1.0, 1.0]));
        assert_eq!(short.bounds.size(), same.bounds.size());

        let longer = placer.layout(&id, 0.0, 0.0, "abcd", &EstimatedMetrics);
        assert!(longer.bounds.width() > short.bounds.width());
    }

    #[test]
    fn seeded_corners_are_reproducible() {
        let mut a = RandomCorners::seeded(7);
        let mut b = RandomCorners::seeded(7);
        let xs: Vec<Corner> = (0..16).map(|_| a.next_corner()).collect();
        let ys: Vec<Corner> = (0..16).map(|_| b.next_corner()).collect();
        assert_eq!(xs, ys);
    }
}
