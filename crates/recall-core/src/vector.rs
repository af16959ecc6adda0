//! Embedding vectors: cosine similarity and the stored text form.
//!
//! Embeddings are stored as a JSON array of numbers. A stored value that
//! does not parse is treated as "no embedding" rather than an error, so a
//! bad row never stops a review session.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorError {
    LengthMismatch { left: usize, right: usize },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorError::LengthMismatch { left, right } => {
                write!(f, "vector length mismatch: {left} vs {right}")
            }
        }
    }
}

impl std::error::Error for VectorError {}

/// Cosine similarity in [-1, 1].
///
/// Fails when the vectors differ in length. Returns 0 when either vector
/// has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }
    // Rounding can push |cos| a hair past 1 for parallel vectors
    Ok((dot / denominator).clamp(-1.0, 1.0))
}

/// Decode a stored embedding. `None` for malformed input or non-finite values.
pub fn parse_embedding(raw: &str) -> Option<Vec<f64>> {
    let values: Vec<f64> = serde_json::from_str(raw).ok()?;
    if values.iter().all(|v| v.is_finite()) {
        Some(values)
    } else {
        None
    }
}

/// Encode an embedding for storage. Inverse of [`parse_embedding`] for
/// finite values.
pub fn serialize_embedding(vec: &[f64]) -> String {
    // Serializing a slice of f64 cannot fail; non-finite values become null
    serde_json::to_string(vec).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_identical_vectors() {
        let a = [1.0, 2.0, 3.0];
        assert_relative_eq!(cosine_similarity(&a, &a).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_opposite_vectors() {
        let a = [1.0, -2.0, 0.5];
        let b = [-1.0, 2.0, -0.5];
        assert_relative_eq!(cosine_similarity(&a, &b).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_relative_eq!(sim, 0.0);
    }

    #[test]
    fn test_zero_magnitude_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch_fails() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, VectorError::LengthMismatch { left: 2, right: 1 });
        assert_eq!(err.to_string(), "vector length mismatch: 2 vs 1");
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse_embedding("[0.5, -1, 2.25]"), Some(vec![0.5, -1.0, 2.25]));
    }

    #[test]
    fn test_parse_malformed_is_none() {
        assert_eq!(parse_embedding(""), None);
        assert_eq!(parse_embedding("not json"), None);
        assert_eq!(parse_embedding("{\"a\": 1}"), None);
        assert_eq!(parse_embedding("[1, \"two\"]"), None);
        assert_eq!(parse_embedding("[1, null]"), None);
    }

    #[test]
    fn test_serialize_format() {
        assert_eq!(serialize_embedding(&[1.0, 0.5]), "[1.0,0.5]");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(v in prop::collection::vec(-1e6f64..1e6, 0..64)) {
            prop_assert_eq!(parse_embedding(&serialize_embedding(&v)), Some(v));
        }

        #[test]
        fn prop_roundtrip_extreme_magnitudes(
            v in prop::collection::vec(prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO, 1..16)
        ) {
            prop_assert_eq!(parse_embedding(&serialize_embedding(&v)), Some(v));
        }

        #[test]
        fn prop_similarity_in_range(
            pair in (1usize..32).prop_flat_map(|n| (
                prop::collection::vec(-100.0f64..100.0, n),
                prop::collection::vec(-100.0f64..100.0, n),
            ))
        ) {
            let (a, b) = pair;
            let sim = cosine_similarity(&a, &b).unwrap();
            prop_assert!((-1.0..=1.0).contains(&sim), "out of range: {sim}");
        }
    }
}
