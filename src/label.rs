//! YOLO label geometry.
//!
//! Converts pixel corner-form boxes into the normalized center-form used by
//! label files, and back. Conversion is exact arithmetic over the image
//! dimensions; nothing here clamps or validates box ordering, because the
//! annotation source owns box geometry. Dimensions must be positive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detect::PixelBBox;

/// Typed failure for label geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LabelError {
    /// Image width or height was zero or negative.
    InvalidDimension { width: f32, height: f32 },
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::InvalidDimension { width, height } => write!(
                f,
                "image dimensions must be positive, got {}x{}",
                width, height
            ),
        }
    }
}

impl std::error::Error for LabelError {}

/// Center-form bounding box with coordinates scaled to [0,1] by the image
/// dimensions. For a well-formed box fully inside the image all four fields
/// lie in [0,1]; width or height may be 0 for degenerate boxes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBBox {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert a pixel corner box into normalized center form.
///
/// Out-of-image input boxes propagate as out-of-range normalized values;
/// callers that need clamped output must clamp the input first.
pub fn normalize(bbox: PixelBBox, img_w: f32, img_h: f32) -> Result<NormalizedBBox, LabelError> {
    if img_w <= 0.0 || img_h <= 0.0 {
        return Err(LabelError::InvalidDimension {
            width: img_w,
            height: img_h,
        });
    }
    Ok(NormalizedBBox {
        x_center: (bbox.x1 + bbox.x2) / 2.0 / img_w,
        y_center: (bbox.y1 + bbox.y2) / 2.0 / img_h,
        width: bbox.width() / img_w,
        height: bbox.height() / img_h,
    })
}

/// Invert [`normalize`] given the same image dimensions.
pub fn denormalize(bbox: NormalizedBBox, img_w: f32, img_h: f32) -> Result<PixelBBox, LabelError> {
    if img_w <= 0.0 || img_h <= 0.0 {
        return Err(LabelError::InvalidDimension {
            width: img_w,
            height: img_h,
        });
    }
    let half_w = bbox.width * img_w / 2.0;
    let half_h = bbox.height * img_h / 2.0;
    let cx = bbox.x_center * img_w;
    let cy = bbox.y_center * img_h;
    Ok(PixelBBox {
        x1: cx - half_w,
        y1: cy - half_h,
        x2: cx + half_w,
        y2: cy + half_h,
    })
}

/// One label-file line: `class_id x_center y_center width height`.
pub fn format_label_line(class_id: u32, bbox: NormalizedBBox) -> String {
    format!(
        "{} {} {} {} {}",
        class_id, bbox.x_center, bbox.y_center, bbox.width, bbox.height
    )
}
