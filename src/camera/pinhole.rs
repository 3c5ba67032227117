//! Pinhole Camera Model
//!
//! Perspective projection without lens distortion, with an optional skew term.
//!
//! # Mathematical Model
//!
//! For a point p = (x, y, z) in camera coordinates:
//!
//! ```text
//! u = fx · (x/z) + s · (y/z) + cx
//! v = fy · (y/z) + cy
//! ```
//!
//! Unprojection inverts the affine part and returns the ray with unit z:
//!
//! ```text
//! my = (v - cy) / fy
//! mx = (u - cx - s · my) / fx
//! ray = [mx, my, 1]
//! ```
//!
//! The identity calibration `fx = fy = 1, s = cx = cy = 0` makes pixels
//! equal to normalized image coordinates.

use crate::camera::{CameraError, CameraModel};
use nalgebra::{Matrix2x3, Vector2, Vector3};

/// Pinhole camera with focal lengths, skew and principal point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    fx: f64,
    fy: f64,
    skew: f64,
    cx: f64,
    cy: f64,
}

impl PinholeCamera {
    /// Creates a pinhole camera without skew.
    ///
    /// # Example
    ///
    /// ```
    /// use vio_factors::camera::PinholeCamera;
    ///
    /// let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0)?;
    /// assert!(PinholeCamera::new(0.0, 500.0, 320.0, 240.0).is_err());
    /// # Ok::<(), vio_factors::camera::CameraError>(())
    /// ```
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraError> {
        Self::with_skew(fx, fy, 0.0, cx, cy)
    }

    /// Creates a pinhole camera with an explicit skew coefficient.
    pub fn with_skew(fx: f64, fy: f64, skew: f64, cx: f64, cy: f64) -> Result<Self, CameraError> {
        let camera = Self {
            fx,
            fy,
            skew,
            cx,
            cy,
        };
        camera.validate_params()?;
        Ok(camera)
    }

    /// Camera whose pixels are normalized image coordinates.
    pub const fn identity() -> Self {
        Self {
            fx: 1.0,
            fy: 1.0,
            skew: 0.0,
            cx: 0.0,
            cy: 0.0,
        }
    }

    pub fn fx(&self) -> f64 {
        self.fx
    }

    pub fn fy(&self) -> f64 {
        self.fy
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    pub fn principal_point(&self) -> Vector2<f64> {
        Vector2::new(self.cx, self.cy)
    }
}

impl CameraModel for PinholeCamera {
    fn project(&self, p_cam: &Vector3<f64>) -> Result<Vector2<f64>, CameraError> {
        if !self.is_valid_point(p_cam) {
            return Err(CameraError::PointBehindCamera { z: p_cam.z });
        }

        let x = p_cam.x / p_cam.z;
        let y = p_cam.y / p_cam.z;
        Ok(Vector2::new(
            self.fx * x + self.skew * y + self.cx,
            self.fy * y + self.cy,
        ))
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let my = (pixel.y - self.cy) / self.fy;
        let mx = (pixel.x - self.cx - self.skew * my) / self.fx;
        Vector3::new(mx, my, 1.0)
    }

    fn jacobian_point(&self, p_cam: &Vector3<f64>) -> Matrix2x3<f64> {
        let inv_z = 1.0 / p_cam.z;
        let inv_z2 = inv_z * inv_z;

        Matrix2x3::new(
            self.fx * inv_z,
            self.skew * inv_z,
            -(self.fx * p_cam.x + self.skew * p_cam.y) * inv_z2,
            0.0,
            self.fy * inv_z,
            -self.fy * p_cam.y * inv_z2,
        )
    }

    fn validate_params(&self) -> Result<(), CameraError> {
        if !(self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0) {
            return Err(CameraError::FocalLengthMustBePositive);
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(CameraError::PrincipalPointMustBeFinite);
        }
        if !self.skew.is_finite() {
            return Err(CameraError::SkewMustBeFinite);
        }
        Ok(())
    }
}
