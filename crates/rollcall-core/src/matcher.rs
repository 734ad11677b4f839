//! Face matching against the enrollment set.
//!
//! The enrollment store keeps parallel name/embedding sequences; a probe
//! embedding matches the nearest enrolled one by Euclidean distance,
//! gated by the match tolerance.

use serde::Deserialize;
use thiserror::Error;

/// Maximum Euclidean distance for an accepted match.
pub const MATCH_TOLERANCE: f32 = 0.45;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("enrollment store is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("enrollment store is misaligned: {names} names vs {embeddings} embeddings")]
    LengthMismatch { names: usize, embeddings: usize },
    #[error("enrollment store is empty")]
    Empty,
}

/// Face embedding vector (128-dimensional in the enrollment store).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// The enrolled gallery: index-aligned names and embeddings.
#[derive(Debug, Clone)]
pub struct KnownFaceSet {
    names: Vec<String>,
    embeddings: Vec<Embedding>,
}

/// On-disk enrollment layout: `{"names": [...], "encodings": [[...], ...]}`.
#[derive(Deserialize)]
struct EnrollmentFile {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    encodings: Vec<Embedding>,
}

/// A probe embedding's nearest enrolled identity.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub name: String,
    pub distance: f32,
}

impl KnownFaceSet {
    /// Build from parallel sequences, enforcing index alignment.
    pub fn from_parallel(
        names: Vec<String>,
        embeddings: Vec<Embedding>,
    ) -> Result<Self, EnrollmentError> {
        if names.len() != embeddings.len() {
            return Err(EnrollmentError::LengthMismatch {
                names: names.len(),
                embeddings: embeddings.len(),
            });
        }
        if names.is_empty() {
            return Err(EnrollmentError::Empty);
        }
        Ok(Self { names, embeddings })
    }

    /// Parse the persisted enrollment store.
    pub fn from_json_str(raw: &str) -> Result<Self, EnrollmentError> {
        let file: EnrollmentFile = serde_json::from_str(raw)?;
        Self::from_parallel(file.names, file.encodings)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Nearest enrolled identity for a probe, regardless of tolerance.
    /// Ties break toward the earliest enrolled entry. Enrolled vectors
    /// whose width differs from the probe's are skipped: a truncated zip
    /// would otherwise yield an understated distance and a bogus accept.
    pub fn best_match(&self, probe: &Embedding) -> Option<FaceMatch> {
        let mut best: Option<(usize, f32)> = None;
        for (i, enrolled) in self.embeddings.iter().enumerate() {
            if enrolled.values.len() != probe.values.len() {
                continue;
            }
            let d = probe.euclidean_distance(enrolled);
            // Strict < keeps the first occurrence on equal distances.
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, distance)| FaceMatch {
            name: self.names[i].clone(),
            distance,
        })
    }

    /// Nearest enrolled identity, accepted only within `tolerance`.
    pub fn match_within(&self, probe: &Embedding, tolerance: f32) -> Option<FaceMatch> {
        self.best_match(probe).filter(|m| m.distance <= tolerance)
    }
}
