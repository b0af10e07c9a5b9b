//! Synthetic displacement vectors for demos and tests.

use rand::Rng;

use crate::constants::EPSILON;
use crate::vector::Vector;

/// A vector of length `magnitude` pointing in a random direction.
///
/// Components are drawn uniformly from [-0.5, 0.5) and the result rescaled, so
/// the direction is not exactly uniform on the sphere; good enough to exercise
/// the admission filter. A zero dimension yields the empty vector.
pub fn random_displacement(rng: &mut impl Rng, dim: usize, magnitude: f64) -> Vector {
    if dim == 0 {
        return Vector::zeros(0);
    }
    loop {
        let raw: Vec<f64> = (0..dim).map(|_| rng.random::<f64>() - 0.5).collect();
        let norm = raw.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm > EPSILON {
            return Vector::new(raw.into_iter().map(|c| c / norm * magnitude).collect());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_requested_magnitude() {
        let mut rng = rng();
        for target in [0.1, 0.8, 5.0] {
            let v = random_displacement(&mut rng, 64, target);
            assert_eq!(v.dim(), 64);
            assert_relative_eq!(v.norm(), target, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_dimension_returns_empty() {
        let v = random_displacement(&mut rng(), 0, 1.0);
        assert_eq!(v.dim(), 0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = random_displacement(&mut rng(), 8, 1.0);
        let b = random_displacement(&mut rng(), 8, 1.0);
        assert_eq!(a, b);
    }
}
