//! Factors exposed to a nonlinear least-squares optimizer.
//!
//! A factor reads the current estimates of the variables it connects, and
//! returns a whitened residual together with the Jacobian with respect to the
//! right-perturbation tangent of each variable, stacked column-wise in
//! variable order.
//!
//! Variables are passed in flat `DVector` form:
//! - SE(3) poses as `[tx, ty, tz, qw, qx, qy, qz]`
//! - scalars (inverse depth) as a length-1 vector
//!
//! Strongly typed entry points (`residual` / `evaluate` on each factor) are
//! available for callers that already hold manifold values.

use crate::camera::CameraError;
use crate::manifold::ManifoldError;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

pub mod extrinsic;
pub mod inverse_depth_factor;
pub mod noise;

pub use extrinsic::ExtrinsicTransform;
pub use inverse_depth_factor::{InverseDepthFactor, InverseDepthKeys, InverseDepthLinearization};
pub use noise::IsotropicNoise;

/// Identifier of a variable in the external value container.
pub type Key = u64;

/// Errors raised while constructing or evaluating factors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// The landmark lies at or behind its anchor camera.
    #[error("Invalid landmark inverse depth {rho}: must be finite and strictly positive")]
    InvalidLandmarkDepth { rho: f64 },

    /// The landmark does not project into the observing camera.
    #[error("Landmark is not visible from the observing camera: {0}")]
    Cheirality(CameraError),

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(CameraError),

    #[error("Invalid noise model: {0}")]
    InvalidNoiseModel(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl From<ManifoldError> for FactorError {
    fn from(err: ManifoldError) -> Self {
        FactorError::InvalidParameters(err.to_string())
    }
}

pub type FactorResult<T> = Result<T, FactorError>;

/// Generic factor interface used by the optimizer.
///
/// `residual` and `linearize` are separate entry points so callers that only
/// need the cost never pay for Jacobians.
pub trait Factor: Send + Sync {
    /// Whitened residual at the given variable values.
    fn residual(&self, params: &[DVector<f64>]) -> FactorResult<DVector<f64>>;

    /// Whitened residual and stacked Jacobian `[∂r/∂x₀, ∂r/∂x₁, ...]`.
    fn linearize(&self, params: &[DVector<f64>]) -> FactorResult<(DVector<f64>, DMatrix<f64>)>;

    /// Residual dimension.
    fn dimension(&self) -> usize;

    /// Keys of the connected variables, in `params` order.
    fn variable_keys(&self) -> &[Key];
}

/// Read a scalar variable stored as a length-1 vector.
pub(crate) fn scalar_param(param: &DVector<f64>) -> FactorResult<f64> {
    match param.as_slice() {
        [value] => Ok(*value),
        other => Err(FactorError::InvalidParameters(format!(
            "expected a scalar parameter, got {} values",
            other.len()
        ))),
    }
}

/// Check that exactly `expected` variable blocks were supplied.
pub(crate) fn check_param_count(params: &[DVector<f64>], expected: usize) -> FactorResult<()> {
    if params.len() != expected {
        return Err(FactorError::InvalidParameters(format!(
            "expected {expected} variable blocks, got {}",
            params.len()
        )));
    }
    Ok(())
}
