use crate::labels::{AgeBracket, Gender};

/// One face candidate in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub confidence: f32,
}

/// A crop window guaranteed to lie inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    /// Maps the localizer's relative `[x1, y1, x2, y2]` output onto the
    /// original frame dimensions.
    pub fn from_relative(rel: [f32; 4], width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x1: (rel[0] * width as f32) as i32,
            y1: (rel[1] * height as f32) as i32,
            x2: (rel[2] * width as f32) as i32,
            y2: (rel[3] * height as f32) as i32,
            confidence,
        }
    }

    /// Expands the box by `padding` on all sides and clamps it to
    /// `[0, width-1] x [0, height-1]`. Returns `None` when the clamped window
    /// degenerates to zero width or height.
    pub fn padded_region(&self, padding: i32, width: u32, height: u32) -> Option<CropRegion> {
        let padding = i64::from(padding);
        let x_start = (i64::from(self.x1) - padding).max(0);
        let y_start = (i64::from(self.y1) - padding).max(0);
        let x_end = (i64::from(self.x2) + padding).min(i64::from(width) - 1);
        let y_end = (i64::from(self.y2) + padding).min(i64::from(height) - 1);

        if x_end <= x_start || y_end <= y_start {
            return None;
        }

        Some(CropRegion {
            x: x_start as u32,
            y: y_start as u32,
            width: (x_end - x_start) as u32,
            height: (y_end - y_start) as u32,
        })
    }
}

/// One accepted face with its classified attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePrediction {
    pub gender: Gender,
    pub age: AgeBracket,
    pub bbox: FaceBox,
}

impl FacePrediction {
    pub fn label(&self) -> String {
        format!("{}, {}", self.gender, self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x1: i32, y1: i32, x2: i32, y2: i32) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_from_relative_scales_to_frame() {
        let bbox = FaceBox::from_relative([0.25, 0.5, 0.75, 1.0], 400, 200, 0.8);
        assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (100, 100, 300, 200));
        assert_eq!(bbox.confidence, 0.8);
    }

    #[test]
    fn test_padded_region_stays_inside_interior_box() {
        let region = face(100, 100, 200, 180).padded_region(20, 640, 480).unwrap();
        assert_eq!(region, CropRegion { x: 80, y: 80, width: 140, height: 120 });
    }

    #[test]
    fn test_padded_region_clamps_at_edges() {
        let region = face(5, 5, 630, 470).padded_region(20, 640, 480).unwrap();
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert!(region.x + region.width <= 639);
        assert!(region.y + region.height <= 479);
    }

    #[test]
    fn test_padded_region_rejects_degenerate_window() {
        // Box entirely beyond the right edge clamps to nothing.
        assert_eq!(face(700, 100, 750, 200).padded_region(20, 640, 480), None);
        // Zero-height box with no room to pad downward.
        assert_eq!(face(10, 479, 60, 479).padded_region(0, 640, 480), None);
    }

    #[test]
    fn test_padded_region_handles_negative_coordinates() {
        let region = face(-15, -10, 40, 50).padded_region(20, 640, 480).unwrap();
        assert_eq!((region.x, region.y), (0, 0));
        assert_eq!((region.width, region.height), (60, 70));
    }

    #[test]
    fn test_label_format() {
        let prediction = FacePrediction {
            gender: crate::labels::Gender::Male,
            age: crate::labels::AgeBracket::Age25To32,
            bbox: face(0, 0, 10, 10),
        };
        assert_eq!(prediction.label(), "Male, (25-32)");
    }
}
