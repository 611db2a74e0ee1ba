//! Point color encodings.
//!
//! A [`ColorScaleBuilder`] turns one record field into a packed 24-bit RGB
//! color per point, either through a categorical lookup or a quantitative
//! ramp. Null, missing or unusable values always resolve to [`UNKNOWN_COLOR`].

use std::collections::{BTreeMap, HashMap};

use foundation::PointId;
use peniko::color::{Rgba8, Srgb, parse_color};
use scene::PointRegistry;
use serde::{Deserialize, Serialize};
use streaming::record::{self, Record};
use tracing::warn;

/// Packed `(r << 16) | (g << 8) | b`.
pub type Rgb = u32;

/// Color of points whose field value cannot be mapped.
pub const UNKNOWN_COLOR: Rgb = 0x000000;

/// Qualitative palette used for auto-generated categorical maps.
pub const CATEGORY10: [Rgb; 10] = [
    0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f, 0xbcbd22,
    0x17becf,
];

pub fn pack_rgb(r: u8, g: u8, b: u8) -> Rgb {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

pub fn unpack_rgb(c: Rgb) -> [u8; 3] {
    [(c >> 16) as u8, (c >> 8) as u8, c as u8]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError {
    pub input: String,
    pub reason: String,
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized color {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for ColorParseError {}

/// Converts a color string to packed RGB.
pub trait ColorParser {
    fn parse(&self, input: &str) -> Result<Rgb, ColorParseError>;
}

/// CSS Color Level 4 syntax (hex, `rgb()`, `hsl()`, named colors and the
/// rest) through `peniko`'s color crate. Alpha is dropped after conversion
/// to sRGB.
#[derive(Debug, Default, Copy, Clone)]
pub struct CssColors;

impl ColorParser for CssColors {
    fn parse(&self, input: &str) -> Result<Rgb, ColorParseError> {
        let css = input.trim().to_ascii_lowercase();
        let color = parse_color(&css).map_err(|err| ColorParseError {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        let Rgba8 { r, g, b, .. } = color.to_alpha_color::<Srgb>().to_rgba8();
        Ok(pack_rgb(r, g, b))
    }
}

/// How field values map to colors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum ScaleKind {
    Categorical,
    Quantitative,
    /// Unrecognized scale type; every point resolves to [`UNKNOWN_COLOR`].
    Unsupported,
}

impl From<String> for ScaleKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "categorical" => ScaleKind::Categorical,
            "quantitative" => ScaleKind::Quantitative,
            other => {
                warn!(value = other, "unknown color scale type, points will be black");
                ScaleKind::Unsupported
            }
        }
    }
}

fn default_ramp() -> Vec<String> {
    vec!["white".to_string(), "black".to_string()]
}

/// `colorScale` option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScaleSpec {
    #[serde(rename = "type")]
    pub kind: ScaleKind,
    /// Explicit value → color lookup (categorical only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Ramp stops (quantitative only), spread evenly over the domain.
    #[serde(default = "default_ramp")]
    pub colors: Vec<String>,
}

impl ColorScaleSpec {
    pub fn categorical() -> Self {
        Self {
            kind: ScaleKind::Categorical,
            map: None,
            min: None,
            max: None,
            colors: default_ramp(),
        }
    }

    pub fn quantitative() -> Self {
        Self {
            kind: ScaleKind::Quantitative,
            ..Self::categorical()
        }
    }

    pub fn with_map<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.map = Some(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_domain(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-point color assignments derived from one field and one scale.
///
/// Categorical scales without an explicit map assign [`CATEGORY10`] colors
/// by first-seen order of distinct values. That order is kept across
/// batches, so a value never changes color while the builder lives.
///
/// Quantitative scales without explicit bounds grow their domain to cover the
/// extremes of every batch seen. When a batch grows the domain, every live
/// point is recolored so all assignments share one domain. The domain never
/// shrinks on eviction.
#[derive(Debug, Clone)]
pub struct ColorScaleBuilder {
    field: String,
    spec: ColorScaleSpec,
    map: Option<HashMap<String, Rgb>>,
    auto_order: HashMap<String, usize>,
    ramp: Vec<Rgb>,
    domain: Option<[f64; 2]>,
    colors: HashMap<PointId, Rgb>,
}

impl ColorScaleBuilder {
    pub fn new(field: impl Into<String>, spec: ColorScaleSpec) -> Self {
        Self::with_parser(field, spec, &CssColors)
    }

    /// Builder whose color strings are resolved by `parser`.
    ///
    /// Strings the parser rejects are logged and resolve to [`UNKNOWN_COLOR`].
    pub fn with_parser<P>(field: impl Into<String>, spec: ColorScaleSpec, parser: &P) -> Self
    where
        P: ColorParser + ?Sized,
    {
        let map = spec.map.as_ref().map(|entries| {
            entries
                .iter()
                .map(|(value, color)| (value.clone(), parse_or_unknown(parser, color)))
                .collect()
        });
        let ramp = spec
            .colors
            .iter()
            .map(|c| parse_or_unknown(parser, c))
            .collect();
        let domain = match (spec.min, spec.max) {
            (Some(lo), Some(hi)) => Some([lo, hi]),
            _ => None,
        };

        Self {
            field: field.into(),
            spec,
            map,
            auto_order: HashMap::new(),
            ramp,
            domain,
            colors: HashMap::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn spec(&self) -> &ColorScaleSpec {
        &self.spec
    }

    /// Active quantitative domain, once known.
    pub fn domain(&self) -> Option<[f64; 2]> {
        self.domain
    }

    /// Assign colors to the newly ingested `batch`.
    ///
    /// Ids missing from `registry` are skipped.
    pub fn rebuild(&mut self, registry: &PointRegistry, batch: &[PointId]) {
        match self.spec.kind {
            ScaleKind::Categorical => {
                for id in batch {
                    let Some(rec) = registry.get(id) else {
                        continue;
                    };
                    let color = self.categorical_color(rec);
                    self.colors.insert(id.clone(), color);
                }
            }
            ScaleKind::Quantitative => {
                let had_domain = self.domain.is_some();
                let grew = self.extend_domain(batch.iter().filter_map(|id| registry.get(id)));

                if grew && had_domain {
                    let live: Vec<PointId> = registry.ids().cloned().collect();
                    self.recolor(registry, &live);
                } else {
                    self.recolor(registry, batch);
                }
            }
            ScaleKind::Unsupported => {}
        }
    }

    /// Forget every assignment and recolor the full live set.
    pub fn rebuild_all(&mut self, registry: &PointRegistry) {
        self.colors.clear();
        let live: Vec<PointId> = registry.ids().cloned().collect();
        self.rebuild(registry, &live);
    }

    /// Resolved color of `id`, [`UNKNOWN_COLOR`] if it has none.
    pub fn color_of(&self, id: &PointId) -> Rgb {
        self.colors.get(id).copied().unwrap_or(UNKNOWN_COLOR)
    }

    pub fn get(&self, id: &PointId) -> Option<Rgb> {
        self.colors.get(id).copied()
    }

    pub fn remove(&mut self, id: &PointId) -> Option<Rgb> {
        self.colors.remove(id)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    fn categorical_color(&mut self, rec: &Record) -> Rgb {
        let Some(key) = record::field(rec, &self.field).and_then(record::category_key) else {
            return UNKNOWN_COLOR;
        };

        if let Some(map) = &self.map {
            return map.get(&key).copied().unwrap_or(UNKNOWN_COLOR);
        }

        let next = self.auto_order.len();
        let slot = *self.auto_order.entry(key).or_insert(next);
        CATEGORY10[slot % CATEGORY10.len()]
    }

    fn recolor(&mut self, registry: &PointRegistry, ids: &[PointId]) {
        for id in ids {
            let Some(rec) = registry.get(id) else {
                continue;
            };
            let color = match record::field_number(rec, &self.field) {
                Some(v) => self.ramp_color(v),
                None => UNKNOWN_COLOR,
            };
            self.colors.insert(id.clone(), color);
        }
    }

    /// Widen the auto domain to cover `records`. Returns `true` if it changed.
    fn extend_domain<'a>(&mut self, records: impl Iterator<Item = &'a Record>) -> bool {
        if self.spec.min.is_some() && self.spec.max.is_some() {
            return false;
        }

        let mut extent: Option<[f64; 2]> = None;
        for v in records.filter_map(|r| record::field_number(r, &self.field)) {
            extent = Some(match extent {
                None => [v, v],
                Some([lo, hi]) => [lo.min(v), hi.max(v)],
            });
        }

        let merged = match (self.domain, extent) {
            (current, None) => current,
            (None, Some(e)) => Some(e),
            (Some([lo, hi]), Some([elo, ehi])) => Some([lo.min(elo), hi.max(ehi)]),
        };
        let Some([lo, hi]) = merged else {
            return false;
        };

        let next = [self.spec.min.unwrap_or(lo), self.spec.max.unwrap_or(hi)];
        if self.domain == Some(next) {
            return false;
        }
        self.domain = Some(next);
        true
    }

    fn ramp_color(&self, v: f64) -> Rgb {
        let Some([lo, hi]) = self.domain else {
            return UNKNOWN_COLOR;
        };
        match self.ramp.len() {
            0 => UNKNOWN_COLOR,
            1 => self.ramp[0],
            n => {
                let span = hi - lo;
                // A collapsed domain maps to the middle of the ramp.
                let t = if span == 0.0 {
                    0.5
                } else {
                    ((v - lo) / span).clamp(0.0, 1.0)
                };
                let pos = t * (n - 1) as f64;
                let k = (pos.floor() as usize).min(n - 2);
                lerp_rgb(self.ramp[k], self.ramp[k + 1], pos - k as f64)
            }
        }
    }
}

fn parse_or_unknown<P: ColorParser + ?Sized>(parser: &P, color: &str) -> Rgb {
    parser.parse(color).unwrap_or_else(|err| {
        warn!("{err}, using black");
        UNKNOWN_COLOR
    })
}

fn lerp_rgb(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let a = unpack_rgb(a);
    let b = unpack_rgb(b);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let v = a[i] as f64 + (b[i] as f64 - a[i] as f64) * t;
        out[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    pack_rgb(out[0], out[1], out[2])
}
