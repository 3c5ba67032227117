//! Error types for the vio-factors library
//!
//! Each module owns a `thiserror` enum describing its own failure modes
//! (`ManifoldError`, `CameraError`, `FactorError`, `ImuError`). This module
//! folds them into a single crate-level error for callers that do not care
//! which layer failed.

use crate::camera::CameraError;
use crate::factors::FactorError;
use crate::imu::ImuError;
use crate::manifold::ManifoldError;
use thiserror::Error;

/// Main result type used throughout the vio-factors library
pub type VioResult<T> = Result<T, VioError>;

/// Main error type for the vio-factors library
#[derive(Debug, Clone, Error)]
pub enum VioError {
    /// Manifold operations errors
    #[error("Manifold error: {0}")]
    Manifold(String),

    /// Camera calibration and projection errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Factor construction and evaluation errors
    #[error("Factor error: {0}")]
    Factor(String),

    /// Inertial preintegration errors
    #[error("IMU error: {0}")]
    Imu(String),
}

impl From<ManifoldError> for VioError {
    fn from(err: ManifoldError) -> Self {
        VioError::Manifold(err.to_string())
    }
}

impl From<CameraError> for VioError {
    fn from(err: CameraError) -> Self {
        VioError::Camera(err.to_string())
    }
}

impl From<FactorError> for VioError {
    fn from(err: FactorError) -> Self {
        VioError::Factor(err.to_string())
    }
}

impl From<ImuError> for VioError {
    fn from(err: ImuError) -> Self {
        VioError::Imu(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vio_error_display() {
        let error = VioError::from(ImuError::NegativeDeltaTime(-0.1));
        assert_eq!(error.to_string(), format!("IMU error: {}", ImuError::NegativeDeltaTime(-0.1)));
    }

    #[test]
    fn test_vio_error_from_factor() {
        let vio_error = VioError::from(FactorError::InvalidLandmarkDepth { rho: -0.5 });

        match vio_error {
            VioError::Factor(msg) => assert!(msg.contains("-0.5")),
            _ => panic!("Expected factor error"),
        }
    }

    #[test]
    fn test_vio_error_from_camera() {
        let vio_error = VioError::from(CameraError::FocalLengthMustBePositive);
        assert!(matches!(vio_error, VioError::Camera(_)));
    }

    #[test]
    fn test_vio_result_err() {
        let result: VioResult<i32> = Err(VioError::Imu("non-finite delta".to_string()));
        assert!(result.is_err());
    }
}
