//! Cosine similarity shared by the store and the reinforcement engine.

use respond_core::error::{RespondError, Result};

/// Compute cosine similarity `dot(a, b) / (|a| * |b|)` in f64.
///
/// Returns 0.0 if either vector has zero magnitude and a validation error if
/// the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(RespondError::Validation(format!(
            "Vectors must have same length: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (mag_a * mag_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![0.3f32, -1.2, 4.0, 0.5];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_symmetric() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![-0.5f32, 4.0, 0.25];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let sim = cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0; 8], &[1.0; 8]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0; 8], &[0.0; 8]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0; 8], &[0.0; 8]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        let err = cosine_similarity(&[1.0; 10], &[1.0; 20]).unwrap_err();
        assert!(err.is_validation());
    }
}
