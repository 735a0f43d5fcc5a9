use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound of the normalized coordinate space boxes are reported in.
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// One object the model found, as the model reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// `[ymin, xmin, ymax, xmax]`, normalized to 0..=1000.
    pub box_2d: [i32; 4],
    pub label: String,
    /// Any other keys on the record, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetectionRecord {
    #[must_use]
    pub fn new(box_2d: [i32; 4], label: impl Into<String>) -> Self {
        Self {
            box_2d,
            label: label.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn pixel_box(&self, width: u32, height: u32) -> PixelBox {
        PixelBox::from_normalized(self.box_2d, width, height)
    }
}

/// Box in pixel coordinates of the image it is drawn on, clipped to its bounds.
/// `x1`/`y1` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelBox {
    pub y0: i32,
    pub x0: i32,
    pub y1: i32,
    pub x1: i32,
}

impl PixelBox {
    #[must_use]
    pub fn from_normalized(normalized: [i32; 4], width: u32, height: u32) -> Self {
        let [ymin, xmin, ymax, xmax] = normalized;
        Self {
            y0: to_pixel(ymin, height),
            x0: to_pixel(xmin, width),
            y1: to_pixel(ymax, height),
            x1: to_pixel(xmax, width),
        }
    }

    /// Zero or negative area.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.y0 >= self.y1 || self.x0 >= self.x1
    }

    #[must_use]
    pub const fn width(&self) -> i32 {
        self.x1.saturating_sub(self.x0)
    }

    #[must_use]
    pub const fn height(&self) -> i32 {
        self.y1.saturating_sub(self.y0)
    }

    #[must_use]
    pub const fn as_array(&self) -> [i32; 4] {
        [self.y0, self.x0, self.y1, self.x1]
    }
}

/// Scaled coordinate clamped to `0..=dimension`.
fn to_pixel(normalized: i32, dimension: u32) -> i32 {
    let limit = f64::from(dimension.min(i32::MAX.unsigned_abs()));
    (f64::from(normalized) / NORMALIZED_SCALE * f64::from(dimension))
        .round()
        .clamp(0.0, limit) as i32
}

/// Detections in the order the model returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DetectionSet(Vec<DetectionRecord>);

impl DetectionSet {
    #[must_use]
    pub const fn new(records: Vec<DetectionRecord>) -> Self {
        Self(records)
    }

    /// Parse a JSON list of records. A lone record object is read as a list of one.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        let records = if value.is_object() {
            vec![serde_json::from_value(value)?]
        } else {
            serde_json::from_value(value)?
        };
        Ok(Self(records))
    }

    /// Two-space indented JSON list.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn records(&self) -> &[DetectionRecord] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionRecord> {
        self.0.iter()
    }
}

impl From<Vec<DetectionRecord>> for DetectionSet {
    fn from(records: Vec<DetectionRecord>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a DetectionRecord;
    type IntoIter = std::slice::Iter<'a, DetectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
