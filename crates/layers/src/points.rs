//! The labelled point layer.
//!
//! Ties the registry, color scale, label placement and overlap resolution
//! together behind host events: tile load/unload, redraw and pointer
//! queries.

use std::collections::HashMap;
use std::fmt;

use foundation::bounds::Aabb2;
use foundation::{PointId, TileId};
use scene::picking::{PickHit, PickOptions, pick_nearest};
use scene::{IngestReport, PointRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use streaming::record::{self, ID_FIELD, IMPORTANCE_FIELD, Record};
use tracing::{debug, warn};

use crate::labels::{
    Corner, CornerSource, LabelPlacer, LabelPosition, LabelStyle, RandomCorners, TextMeasurer,
};
use crate::layer::{Layer, LayerId};
use crate::overlap;
use crate::symbology::{ColorScaleBuilder, ColorScaleSpec, Rgb, UNKNOWN_COLOR};

pub const DEFAULT_POINT_SIZE: f64 = 6.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum PointShape {
    #[default]
    Circle,
    Square,
}

impl From<String> for PointShape {
    fn from(s: String) -> Self {
        match s.as_str() {
            "circle" => PointShape::Circle,
            "square" => PointShape::Square,
            other => {
                warn!(value = other, "unknown point shape, using circle");
                PointShape::Circle
            }
        }
    }
}

/// Layer options as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointsConfig {
    pub label_field: String,
    pub x_pos_field: String,
    pub y_pos_field: String,
    pub color_field: Option<String>,
    pub color_scale: Option<ColorScaleSpec>,
    pub point_shape: PointShape,
    pub size_field: Option<String>,
    pub default_size: f64,
    pub label_position: LabelPosition,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            label_field: "data".to_string(),
            x_pos_field: "x".to_string(),
            y_pos_field: "y".to_string(),
            color_field: None,
            color_scale: None,
            point_shape: PointShape::Circle,
            size_field: None,
            default_size: DEFAULT_POINT_SIZE,
            label_position: LabelPosition::default(),
        }
    }
}

impl PointsConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Json)
    }

    /// `defaultSize`, or 6 when it is zero, negative or not finite.
    pub fn fallback_size(&self) -> f64 {
        if self.default_size.is_finite() && self.default_size > 0.0 {
            self.default_size
        } else {
            DEFAULT_POINT_SIZE
        }
    }

    /// Size of the point drawn for `rec`.
    pub fn point_size(&self, rec: &Record) -> f64 {
        self.size_field
            .as_deref()
            .and_then(|f| record::field_number(rec, f))
            .unwrap_or_else(|| self.fallback_size())
    }

    pub fn label_text(&self, rec: &Record) -> String {
        record::label_text(record::field(rec, &self.label_field))
    }

    fn color_scale(&self) -> Option<ColorScaleBuilder> {
        match (&self.color_field, &self.color_scale) {
            (Some(field), Some(spec)) => Some(ColorScaleBuilder::new(field.clone(), spec.clone())),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(err) => write!(f, "invalid layer config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(err) => Some(err),
        }
    }
}

/// Maps data coordinates to screen space. `None` skips the point this cycle.
pub trait Projector {
    fn project(&self, x: f64, y: f64) -> Option<[f64; 2]>;
}

impl<F> Projector for F
where
    F: Fn(f64, f64) -> Option<[f64; 2]>,
{
    fn project(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        self(x, y)
    }
}

/// Drawing surface supplied by the host.
pub trait ShapePainter {
    fn fill_shape(&mut self, shape: PointShape, center: [f64; 2], size: f64, color: Rgb);
    fn draw_label(&mut self, text: &str, origin: [f64; 2], style: &LabelStyle);
}

/// Everything needed to draw one point and its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointMark {
    pub id: PointId,
    pub position: [f64; 2],
    pub color: Rgb,
    pub size: f64,
    pub shape: PointShape,
    pub label_text: String,
    /// Top-left corner of the label box.
    pub label_position: [f64; 2],
    pub label_corner: Corner,
    pub label_bounds: Aabb2,
    #[serde(rename = "visible")]
    pub label_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redraw {
    pub cycle: u64,
    pub marks: Vec<PointMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHover {
    pub point_id: PointId,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub rows: Vec<(String, String)>,
}

impl fmt::Display for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

/// Highlight drawn around a hovered point.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Outline {
    Circle { center: [f64; 2], radius: f64 },
    Square { bounds: Aabb2 },
}

#[derive(Debug)]
pub struct LabelledPointsLayer {
    id: LayerId,
    config: PointsConfig,
    registry: PointRegistry,
    colors: Option<ColorScaleBuilder>,
    labels: LabelPlacer,
    positions: HashMap<PointId, [f64; 2]>,
    label_visible: HashMap<PointId, bool>,
    cycle: u64,
}

impl LabelledPointsLayer {
    pub fn new(id: u64, config: PointsConfig) -> Self {
        Self::with_corner_source(id, config, Box::new(RandomCorners::from_os_rng()))
    }

    pub fn with_corner_source(id: u64, config: PointsConfig, source: Box<dyn CornerSource>) -> Self {
        Self {
            id: LayerId(id),
            colors: config.color_scale(),
            labels: LabelPlacer::with_corner_source(config.label_position, source),
            config,
            registry: PointRegistry::new(),
            positions: HashMap::new(),
            label_visible: HashMap::new(),
            cycle: 0,
        }
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    pub fn registry(&self) -> &PointRegistry {
        &self.registry
    }

    pub fn label_style(&self) -> &LabelStyle {
        self.labels.style()
    }

    /// Replace the options and recolor every live point under the new scale.
    ///
    /// Label sizes and random corners already drawn are kept.
    pub fn reconfigure(&mut self, config: PointsConfig) {
        self.labels.set_position(config.label_position);
        self.colors = config.color_scale();
        if let Some(colors) = self.colors.as_mut() {
            colors.rebuild_all(&self.registry);
        }
        self.config = config;
        debug!(layer = self.id.0, points = self.registry.len(), "reconfigured layer");
    }

    /// Draw one frame: project, label and de-overlap every live point.
    pub fn redraw<P, M>(&mut self, projector: &P, measurer: &M) -> Redraw
    where
        P: Projector + ?Sized,
        M: TextMeasurer + ?Sized,
    {
        self.cycle += 1;
        self.positions.clear();
        self.label_visible.clear();

        let config = &self.config;
        let mut marks: Vec<PointMark> = Vec::with_capacity(self.registry.len());
        let mut boxes: Vec<Aabb2> = Vec::with_capacity(self.registry.len());
        let mut importances: Vec<Option<f64>> = Vec::with_capacity(self.registry.len());

        for (id, rec) in self.registry.iter() {
            let (Some(x), Some(y)) = (
                record::field_number(rec, &config.x_pos_field),
                record::field_number(rec, &config.y_pos_field),
            ) else {
                continue;
            };
            let Some(pos) = projector.project(x, y) else {
                continue;
            };
            if !pos[0].is_finite() || !pos[1].is_finite() {
                continue;
            }

            let text = config.label_text(rec);
            let placed = self.labels.layout(id, pos[0], pos[1], &text, measurer);
            self.positions.insert(id.clone(), pos);
            boxes.push(placed.bounds);
            importances.push(record::field_number(rec, IMPORTANCE_FIELD));

            marks.push(PointMark {
                id: id.clone(),
                position: pos,
                color: self.colors.as_ref().map_or(UNKNOWN_COLOR, |c| c.color_of(id)),
                size: config.point_size(rec),
                shape: config.point_shape,
                label_text: text,
                label_position: placed.origin(),
                label_corner: placed.corner,
                label_bounds: placed.bounds,
                label_visible: true,
            });
        }

        let visible = overlap::resolve(&boxes, &importances);
        for (mark, shown) in marks.iter_mut().zip(visible) {
            mark.label_visible = shown;
            self.label_visible.insert(mark.id.clone(), shown);
        }

        debug!(
            layer = self.id.0,
            cycle = self.cycle,
            drawn = marks.len(),
            skipped = self.registry.len() - marks.len(),
            "redraw"
        );
        Redraw {
            cycle: self.cycle,
            marks,
        }
    }

    /// Hand the marks of a redraw to the host's painter.
    pub fn paint<S: ShapePainter + ?Sized>(&self, marks: &[PointMark], painter: &mut S) {
        let style = self.labels.style();
        for mark in marks {
            painter.fill_shape(mark.shape, mark.position, mark.size, mark.color);
            if mark.label_visible {
                painter.draw_label(&mark.label_text, mark.label_position, style);
            }
        }
    }

    pub fn color_of(&self, id: &PointId) -> Rgb {
        self.colors.as_ref().map_or(UNKNOWN_COLOR, |c| c.color_of(id))
    }

    /// Screen position from the latest redraw.
    pub fn position(&self, id: &PointId) -> Option<[f64; 2]> {
        self.positions.get(id).copied()
    }

    /// Label visibility from the latest redraw.
    pub fn is_label_visible(&self, id: &PointId) -> Option<bool> {
        self.label_visible.get(id).copied()
    }

    pub fn nearest(&self, x: f64, y: f64) -> Option<PickHit> {
        self.nearest_within(x, y, PickOptions::default().max_distance)
    }

    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<PickHit> {
        let positions = self
            .registry
            .ids()
            .filter_map(|id| self.positions.get(id).map(|p| (id, *p)));
        pick_nearest(positions, x, y, PickOptions { max_distance })
    }

    pub fn hover(&self, x: f64, y: f64) -> Option<PointHover> {
        let hit = self.nearest(x, y)?;
        let record = self.registry.get(&hit.id)?.clone();
        Some(PointHover {
            point_id: hit.id,
            record,
        })
    }

    pub fn click(&self, x: f64, y: f64) -> Option<PointHover> {
        self.hover(x, y)
    }

    pub fn tooltip(&self, x: f64, y: f64) -> Option<Tooltip> {
        let hover = self.hover(x, y)?;
        let rows = hover
            .record
            .iter()
            .filter(|(key, _)| key.as_str() != ID_FIELD)
            .map(|(key, value)| (key.clone(), record::tooltip_text(value)))
            .collect();
        Some(Tooltip { rows })
    }

    /// Highlight for `id` at its latest redraw position.
    pub fn hover_outline(&self, id: &PointId) -> Option<Outline> {
        let center = self.position(id)?;
        let size = self.config.point_size(self.registry.get(id)?);
        Some(match self.config.point_shape {
            PointShape::Circle => Outline::Circle {
                center,
                radius: size / 2.0 + 2.0,
            },
            PointShape::Square => {
                let half = size / 2.0 + 2.0;
                Outline::Square {
                    bounds: Aabb2::new(
                        [center[0] - half, center[1] - half],
                        [center[0] + half, center[1] + half],
                    ),
                }
            }
        })
    }

    fn forget(&mut self, id: &PointId) {
        if let Some(colors) = self.colors.as_mut() {
            colors.remove(id);
        }
        self.labels.remove(id);
        self.positions.remove(id);
        self.label_visible.remove(id);
    }
}

impl Layer for LabelledPointsLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn load_tile(&mut self, tile: TileId, payload: &Value) -> IngestReport {
        let report = self.registry.ingest(tile, payload);
        for id in &report.orphaned {
            self.forget(id);
        }
        if let Some(colors) = self.colors.as_mut() {
            colors.rebuild(&self.registry, &report.ids);
        }
        report
    }

    fn unload_tile(&mut self, tile: &TileId) -> Vec<PointId> {
        let removed = self.registry.evict(tile);
        for id in &removed {
            self.forget(id);
        }
        removed
    }
}
