//! Isotropic Gaussian noise model.

use super::{FactorError, FactorResult};
use nalgebra::{DMatrix, DVector};

/// Diagonal noise with the same standard deviation on every residual row.
///
/// Whitening divides residual rows and Jacobian rows by `sigma`, so the
/// optimizer minimizes `‖r‖² / σ²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicNoise {
    dim: usize,
    sigma: f64,
}

impl IsotropicNoise {
    pub fn new(dim: usize, sigma: f64) -> FactorResult<Self> {
        if dim == 0 {
            return Err(FactorError::InvalidNoiseModel(
                "dimension must be at least 1".to_string(),
            ));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(FactorError::InvalidNoiseModel(format!(
                "sigma must be finite and positive, got {sigma}"
            )));
        }
        Ok(Self { dim, sigma })
    }

    /// Unit noise (σ = 1): whitening is the identity.
    pub const fn unit(dim: usize) -> Self {
        Self { dim, sigma: 1.0 }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn whiten_vector(&self, residual: &DVector<f64>) -> DVector<f64> {
        residual / self.sigma
    }

    pub fn whiten_matrix(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        jacobian / self.sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_rejects_non_positive_sigma() {
        assert!(IsotropicNoise::new(2, 0.0).is_err());
        assert!(IsotropicNoise::new(2, -1.0).is_err());
        assert!(IsotropicNoise::new(2, f64::NAN).is_err());
        assert!(IsotropicNoise::new(0, 1.0).is_err());
    }

    #[test]
    fn test_noise_whitening_scales_by_sigma() -> FactorResult<()> {
        let noise = IsotropicNoise::new(2, 0.5)?;
        let whitened = noise.whiten_vector(&DVector::from_vec(vec![1.0, -2.0]));
        assert_eq!(whitened, DVector::from_vec(vec![2.0, -4.0]));

        let jac = noise.whiten_matrix(&DMatrix::from_element(2, 3, 1.0));
        assert!(jac.iter().all(|v| *v == 2.0));
        Ok(())
    }

    #[test]
    fn test_unit_noise_is_identity() {
        let noise = IsotropicNoise::unit(2);
        let r = DVector::from_vec(vec![0.3, 0.7]);
        assert_eq!(noise.whiten_vector(&r), r);
    }
}
