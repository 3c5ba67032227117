//! Camera projection models.
//!
//! A [`CameraModel`] maps points expressed in the camera frame to image
//! coordinates and back. Calibration is immutable once constructed and is
//! meant to be shared by reference (`Arc`) across every factor observing
//! through the same camera.

use nalgebra::{Matrix2x3, Vector2, Vector3};

pub mod pinhole;

pub use pinhole::PinholeCamera;

/// Points closer than this to the image plane cannot be projected.
pub const MIN_DEPTH: f64 = 1e-6;

/// Errors raised by camera calibration and projection.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,

    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,

    #[error("Skew must be finite")]
    SkewMustBeFinite,

    #[error("Point is behind the camera (z = {z})")]
    PointBehindCamera { z: f64 },
}

/// Projection interface used by the reprojection factors.
pub trait CameraModel: Send + Sync + std::fmt::Debug {
    /// Project a point in the camera frame to image coordinates.
    ///
    /// Fails with [`CameraError::PointBehindCamera`] when `z < MIN_DEPTH`.
    fn project(&self, p_cam: &Vector3<f64>) -> Result<Vector2<f64>, CameraError>;

    /// Bearing ray through `pixel`, scaled so that its z component is 1.
    ///
    /// Scaling the ray by a depth `d` gives the point at z-depth `d`.
    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64>;

    /// ∂(u,v)/∂p_cam evaluated at `p_cam`.
    fn jacobian_point(&self, p_cam: &Vector3<f64>) -> Matrix2x3<f64>;

    fn is_valid_point(&self, p_cam: &Vector3<f64>) -> bool {
        p_cam.z >= MIN_DEPTH
    }

    /// Check calibration parameters.
    fn validate_params(&self) -> Result<(), CameraError>;
}
