//! ONNX face encoder via ONNX Runtime.
//!
//! The matching pipeline only consumes vectors; this module is the one
//! place that turns a decoded image into embeddings. The model is an
//! end-to-end detect-and-embed network: one RGB frame in, an `[N, 128]`
//! tensor out, one row per face found.

use crate::matcher::Embedding;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

// --- Named constants ---
const ENCODER_INPUT_SIZE: u32 = 320;
const ENCODER_MEAN: f32 = 127.5;
const ENCODER_STD: f32 = 127.5;
/// Output row width; must match the enrollment store's vectors.
pub const EMBEDDING_DIM: usize = 128;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Embedding extraction seam: a decoded image in, zero or more face
/// embeddings out. Zero embeddings means no face was found in the frame.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<Embedding>, EncoderError>;
}

/// ONNX-backed encoder. The session is loaded once at startup and shared
/// behind a lock; inference runs one frame at a time.
pub struct OnnxFaceEncoder {
    session: Mutex<Session>,
}

impl OnnxFaceEncoder {
    /// Load the encoder model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face encoder model"
        );

        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Resize to the fixed input square and normalize RGB into a NCHW
    /// float tensor.
    fn preprocess(image: &DynamicImage) -> Array4<f32> {
        let size = ENCODER_INPUT_SIZE;
        let resized = image
            .resize_exact(size, size, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let size = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel.0[c] as f32 - ENCODER_MEAN) / ENCODER_STD;
            }
        }
        tensor
    }

    /// Split the flat output into L2-normalized per-face rows.
    fn postprocess(raw: Vec<f32>) -> Result<Vec<Embedding>, EncoderError> {
        if raw.len() % EMBEDDING_DIM != 0 {
            return Err(EncoderError::Inference(format!(
                "output length {} is not a multiple of {EMBEDDING_DIM}",
                raw.len()
            )));
        }

        let embeddings = raw
            .chunks_exact(EMBEDDING_DIM)
            .map(|row| {
                let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
                let values = if norm > 0.0 {
                    row.iter().map(|x| x / norm).collect()
                } else {
                    row.to_vec()
                };
                Embedding::new(values)
            })
            .collect();
        Ok(embeddings)
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<Embedding>, EncoderError> {
        let input = Self::preprocess(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| EncoderError::Inference("encoder session lock poisoned".into()))?;

        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::Inference(format!("embedding extraction: {e}")))?;

        Self::postprocess(raw_data.to_vec())
    }
}
