use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Closed vocabulary of damage classes the detector is trained on.
///
/// Class ids match the label files produced by dataset conversion. Model
/// outputs with an id outside the vocabulary map to `Unknown(id)` instead of
/// being dropped, so a mismatched model still produces an auditable report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DamageClass {
    Scratch,
    Dent,
    Crack,
    GlassDamage,
    PaintDamage,
    BumperDamage,
    HeadlightDamage,
    TireDamage,
    Rust,
    BrokenPart,
    Unknown(u32),
}

/// All known classes, in class-id order.
pub const KNOWN_CLASSES: [DamageClass; 10] = [
    DamageClass::Scratch,
    DamageClass::Dent,
    DamageClass::Crack,
    DamageClass::GlassDamage,
    DamageClass::PaintDamage,
    DamageClass::BumperDamage,
    DamageClass::HeadlightDamage,
    DamageClass::TireDamage,
    DamageClass::Rust,
    DamageClass::BrokenPart,
];

impl DamageClass {
    pub fn from_class_id(id: u32) -> Self {
        match id {
            0 => DamageClass::Scratch,
            1 => DamageClass::Dent,
            2 => DamageClass::Crack,
            3 => DamageClass::GlassDamage,
            4 => DamageClass::PaintDamage,
            5 => DamageClass::BumperDamage,
            6 => DamageClass::HeadlightDamage,
            7 => DamageClass::TireDamage,
            8 => DamageClass::Rust,
            9 => DamageClass::BrokenPart,
            other => DamageClass::Unknown(other),
        }
    }

    /// Class id for label files. `None` for unknown classes, which must not
    /// be written into training labels.
    pub fn class_id(&self) -> Option<u32> {
        match self {
            DamageClass::Scratch => Some(0),
            DamageClass::Dent => Some(1),
            DamageClass::Crack => Some(2),
            DamageClass::GlassDamage => Some(3),
            DamageClass::PaintDamage => Some(4),
            DamageClass::BumperDamage => Some(5),
            DamageClass::HeadlightDamage => Some(6),
            DamageClass::TireDamage => Some(7),
            DamageClass::Rust => Some(8),
            DamageClass::BrokenPart => Some(9),
            DamageClass::Unknown(_) => None,
        }
    }

    /// Parse a dataset label. Unrecognized labels yield `None`; annotation
    /// conversion skips them rather than inventing a class id.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "scratch" => Some(DamageClass::Scratch),
            "dent" => Some(DamageClass::Dent),
            "crack" => Some(DamageClass::Crack),
            "glass_damage" => Some(DamageClass::GlassDamage),
            "paint_damage" => Some(DamageClass::PaintDamage),
            "bumper_damage" => Some(DamageClass::BumperDamage),
            "headlight_damage" => Some(DamageClass::HeadlightDamage),
            "tire_damage" => Some(DamageClass::TireDamage),
            "rust" => Some(DamageClass::Rust),
            "broken_part" => Some(DamageClass::BrokenPart),
            _ => None,
        }
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageClass::Scratch => f.write_str("scratch"),
            DamageClass::Dent => f.write_str("dent"),
            DamageClass::Crack => f.write_str("crack"),
            DamageClass::GlassDamage => f.write_str("glass_damage"),
            DamageClass::PaintDamage => f.write_str("paint_damage"),
            DamageClass::BumperDamage => f.write_str("bumper_damage"),
            DamageClass::HeadlightDamage => f.write_str("headlight_damage"),
            DamageClass::TireDamage => f.write_str("tire_damage"),
            DamageClass::Rust => f.write_str("rust"),
            DamageClass::BrokenPart => f.write_str("broken_part"),
            DamageClass::Unknown(id) => write!(f, "unknown_{}", id),
        }
    }
}

impl Serialize for DamageClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DamageClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        if let Some(class) = DamageClass::parse(&label) {
            return Ok(class);
        }
        if let Some(id) = label.strip_prefix("unknown_") {
            let id: u32 = id
                .parse()
                .map_err(|_| de::Error::custom("malformed unknown_<id> damage class"))?;
            return Ok(DamageClass::Unknown(id));
        }
        Err(de::Error::custom(format!("unknown damage class '{label}'")))
    }
}

/// Axis-aligned bounding box in pixel coordinates, corner form.
///
/// Well-formed boxes have x1 < x2 and y1 < y2; this is not validated here
/// because the detector owns box geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelBBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl PixelBBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One localized damage finding. Immutable once produced by a backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "type")]
    pub class: DamageClass,
    pub confidence: f32,
    pub bbox: PixelBBox,
}

impl Detection {
    pub fn new(class: DamageClass, confidence: f32, bbox: PixelBBox) -> Self {
        Self {
            class,
            confidence,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ids_round_trip() {
        for (id, class) in KNOWN_CLASSES.iter().enumerate() {
            assert_eq!(DamageClass::from_class_id(id as u32), *class);
            assert_eq!(class.class_id(), Some(id as u32));
        }
    }

    #[test]
    fn unknown_ids_keep_their_id() {
        let class = DamageClass::from_class_id(42);
        assert_eq!(class, DamageClass::Unknown(42));
        assert_eq!(class.class_id(), None);
        assert_eq!(class.to_string(), "unknown_42");
    }

    #[test]
    fn labels_parse_and_display_consistently() {
        for class in KNOWN_CLASSES {
            assert_eq!(DamageClass::parse(&class.to_string()), Some(class));
        }
        assert_eq!(DamageClass::parse("windshield"), None);
    }

    #[test]
    fn detection_serializes_type_field() {
        let det = Detection::new(DamageClass::Dent, 0.9, PixelBBox::new(1.0, 2.0, 3.0, 4.0));
        let value = serde_json::to_value(&det).unwrap();
        assert_eq!(value["type"], "dent");
        assert_eq!(value["bbox"]["x1"], 1.0);
    }

    #[test]
    fn unknown_class_round_trips_through_json() {
        let json = serde_json::to_string(&DamageClass::Unknown(7)).unwrap();
        assert_eq!(json, r#""unknown_7""#);
        let back: DamageClass = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DamageClass::Unknown(7));
    }
}
