use crate::detection::FacePrediction;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use thiserror::Error;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 24.0;
const LABEL_OFFSET: i32 = 28;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("failed to read annotation font: {0}")]
    FontRead(#[from] std::io::Error),
    #[error("failed to parse annotation font: {0}")]
    FontParse(String),
}

/// Draws detection overlays onto response images.
///
/// The font is loaded once at startup alongside the model artifacts.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn from_font_file(path: &Path) -> Result<Self, AnnotateError> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|e| AnnotateError::FontParse(e.to_string()))?;
        Ok(Self { font: Some(font) })
    }

    #[cfg(test)]
    pub(crate) fn without_font() -> Self {
        Self { font: None }
    }

    /// Draws a box and label for every face. The image passed in is the
    /// response copy; callers keep their original untouched.
    pub fn annotate(&self, image: &mut RgbImage, faces: &[FacePrediction]) {
        for face in faces {
            draw_face_box(image, face);
            if let Some(font) = &self.font {
                let x = face.bbox.x1;
                let y = (face.bbox.y1 - LABEL_OFFSET).max(0);
                draw_text_mut(
                    image,
                    BOX_COLOR,
                    x,
                    y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &face.label(),
                );
            }
        }
    }
}

fn draw_face_box(image: &mut RgbImage, face: &FacePrediction) {
    let bbox = &face.bbox;
    let width = bbox.x2 - bbox.x1;
    let height = bbox.y2 - bbox.y1;
    if width <= 0 || height <= 0 {
        return;
    }

    for inset in 0..BOX_THICKNESS {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::FaceBox;
    use crate::labels::{AgeBracket, Gender};

    fn prediction(x1: i32, y1: i32, x2: i32, y2: i32) -> FacePrediction {
        FacePrediction {
            gender: Gender::Female,
            age: AgeBracket::Age25To32,
            bbox: FaceBox {
                x1,
                y1,
                x2,
                y2,
                confidence: 0.95,
            },
        }
    }

    #[test]
    fn test_annotate_draws_box_edges() {
        let mut image = RgbImage::new(100, 100);
        Annotator::without_font().annotate(&mut image, &[prediction(10, 10, 50, 60)]);

        assert_eq!(*image.get_pixel(30, 10), BOX_COLOR);
        assert_eq!(*image.get_pixel(10, 30), BOX_COLOR);
        // Second pass of the 2px border.
        assert_eq!(*image.get_pixel(30, 11), BOX_COLOR);
    }

    #[test]
    fn test_annotate_leaves_image_untouched_without_faces() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([7, 7, 7]));
        let reference = image.clone();
        Annotator::without_font().annotate(&mut image, &[]);
        assert_eq!(image, reference);
    }

    #[test]
    fn test_annotate_clips_box_partially_outside() {
        let mut image = RgbImage::new(50, 50);
        Annotator::without_font().annotate(&mut image, &[prediction(-10, -10, 20, 20)]);
        // Only the right and bottom edges fall inside the image.
        assert_eq!(*image.get_pixel(19, 5), BOX_COLOR);
        assert_eq!(*image.get_pixel(5, 19), BOX_COLOR);
    }

    #[test]
    fn test_from_font_file_missing_path() {
        assert!(Annotator::from_font_file(Path::new("does/not/exist.ttf")).is_err());
    }
}
