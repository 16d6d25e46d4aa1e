use crate::config::ModelConfig;
use crate::detection::{FaceBox, FacePrediction};
use crate::face_analyzer::{AnalyzeError, FaceAnalyzer};
use crate::labels::{AgeBracket, Gender};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{s, Array, ArrayD, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::path::Path;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

const DETECTOR_INPUT_SIZE: u32 = 300;
const DETECTOR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];
const CLASSIFIER_INPUT_SIZE: u32 = 227;
const CLASSIFIER_MEAN: [f32; 3] = [78.4263377603, 87.7689143744, 114.895847746];
const CONFIDENCE_THRESHOLD: f32 = 0.7;
const CROP_PADDING: i32 = 20;

/// Tensor channel layout expected by a network. The localizer takes RGB; the
/// Caffe-lineage age/gender nets were trained on BGR frames.
#[derive(Clone, Copy)]
enum ChannelOrder {
    Rgb,
    Bgr,
}

struct ModelBank {
    detector: Session,
    gender: Session,
    age: Session,
}

/// ONNX-backed analyzer. Sessions are pooled per `num_instances` and handed
/// out round-robin, so concurrent requests do not serialize on one session.
#[derive(Clone)]
pub struct OrtFaceAnalyzer {
    banks: Arc<Vec<Mutex<ModelBank>>>,
    counter: Arc<AtomicUsize>,
}

impl OrtFaceAnalyzer {
    pub fn new(model_config: &ModelConfig) -> Result<Self, Box<dyn std::error::Error>> {
        ort::init().commit();

        let banks = (0..model_config.num_instances)
            .map(|_| {
                Ok(Mutex::new(ModelBank {
                    detector: load_session(&model_config.face_detector_path())?,
                    gender: load_session(&model_config.gender_classifier_path())?,
                    age: load_session(&model_config.age_classifier_path())?,
                }))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Loaded {} model bank instances", banks.len());

        Ok(Self {
            banks: Arc::new(banks),
            counter: Arc::new(AtomicUsize::new(0)),
        })
    }
}

fn load_session(path: &Path) -> Result<Session, ort::Error> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(path)
}

/// Resizes to `size` x `size` and builds a mean-subtracted NCHW tensor.
fn image_tensor(
    image: &DynamicImage,
    size: u32,
    mean: [f32; 3],
    order: ChannelOrder,
) -> Array<f32, Ix4> {
    let resized = image.resize_exact(size, size, FilterType::CatmullRom);
    let size = size as usize;

    let mut input = Array::zeros((1, 3, size, size));
    for pixel in resized.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        let channels = match order {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        };
        for (c, value) in channels.into_iter().enumerate() {
            input[[0, c, y, x]] = value as f32 - mean[c];
        }
    }

    input
}

/// Parses the localizer's `[1, 1, N, 7]` output, keeping emission order.
///
/// Each row is `[_, _, confidence, x1, y1, x2, y2]` with relative coordinates.
/// Rows at or below the confidence floor are dropped; there is no NMS pass.
fn parse_detections(output: &ArrayD<f32>, width: u32, height: u32) -> Vec<FaceBox> {
    let rows = output.slice(s![0, 0, .., ..]);
    let mut faces = Vec::new();

    for row in rows.axis_iter(Axis(0)) {
        let row: Vec<f32> = row.iter().copied().collect();
        let confidence = row[2];
        if confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }
        faces.push(FaceBox::from_relative(
            [row[3], row[4], row[5], row[6]],
            width,
            height,
            confidence,
        ));
    }

    faces
}

fn run_session(session: &mut Session, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, String> {
    let output_name = session.outputs()[0].name().to_string();

    let owned_buffer;
    let input_view = if input.view().is_standard_layout() {
        input.view()
    } else {
        owned_buffer = input.to_owned();
        owned_buffer.view()
    };

    let tensor_ref = TensorRef::from_array_view(input_view)
        .map_err(|e| format!("failed to build tensor: {}", e))?;

    let outputs = session
        .run(ort::inputs![tensor_ref])
        .map_err(|e| format!("inference failed: {}", e))?;

    let (shape, data) = outputs[output_name.as_str()]
        .try_extract_tensor::<f32>()
        .map_err(|e| format!("failed to extract tensor: {}", e))?;

    ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())
        .map_err(|e| format!("invalid tensor shape: {}", e))
}

fn classify_scores(output: &ArrayD<f32>) -> Vec<f32> {
    output.iter().copied().collect()
}

impl FaceAnalyzer for OrtFaceAnalyzer {
    fn analyze(&self, image: &DynamicImage) -> Result<Vec<FacePrediction>, AnalyzeError> {
        let (width, height) = image.dimensions();

        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.banks.len();
        let mut bank = self.banks[index]
            .lock()
            .map_err(|e| AnalyzeError::Detector(format!("model bank mutex poisoned: {}", e)))?;
        tracing::debug!("Handling request with model bank {}", index);

        let detector_input =
            image_tensor(image, DETECTOR_INPUT_SIZE, DETECTOR_MEAN, ChannelOrder::Rgb);
        let detector_output =
            run_session(&mut bank.detector, &detector_input).map_err(AnalyzeError::Detector)?;
        let faces = parse_detections(&detector_output, width, height);

        let mut predictions = Vec::with_capacity(faces.len());
        for face in faces {
            let Some(region) = face.padded_region(CROP_PADDING, width, height) else {
                continue;
            };
            let crop = image.crop_imm(region.x, region.y, region.width, region.height);
            let crop_input = image_tensor(
                &crop,
                CLASSIFIER_INPUT_SIZE,
                CLASSIFIER_MEAN,
                ChannelOrder::Bgr,
            );

            let gender_output =
                run_session(&mut bank.gender, &crop_input).map_err(AnalyzeError::Classifier)?;
            let gender = Gender::from_scores(&classify_scores(&gender_output))
                .ok_or_else(|| AnalyzeError::Classifier("empty gender score vector".into()))?;

            let age_output =
                run_session(&mut bank.age, &crop_input).map_err(AnalyzeError::Classifier)?;
            let age = AgeBracket::from_scores(&classify_scores(&age_output))
                .ok_or_else(|| AnalyzeError::Classifier("empty age score vector".into()))?;

            predictions.push(FacePrediction {
                gender,
                age,
                bbox: face,
            });
        }

        Ok(predictions)
    }
}
