//! Fixed rigid mounting between the body (IMU) frame and a camera.

use crate::manifold::LieGroup;
use crate::manifold::se3::SE3;

/// Body→camera transform `T_cb`, mapping body-frame points into the camera frame.
///
/// Both directions are cached since every evaluation needs both.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrinsicTransform {
    body_to_camera: SE3,
    camera_to_body: SE3,
}

impl ExtrinsicTransform {
    /// Build from `T_cb` (p_cam = T_cb · p_body).
    pub fn from_body_to_camera(body_to_camera: SE3) -> Self {
        let camera_to_body = body_to_camera.inverse(None);
        Self {
            body_to_camera,
            camera_to_body,
        }
    }

    /// Build from the pose of the camera expressed in the body frame, `T_bc`.
    ///
    /// This is how mountings are usually calibrated and reported.
    pub fn from_camera_in_body(camera_in_body: SE3) -> Self {
        let body_to_camera = camera_in_body.inverse(None);
        Self {
            body_to_camera,
            camera_to_body: camera_in_body,
        }
    }

    /// Camera and body frames coincide; poses are then camera poses.
    pub fn identity() -> Self {
        Self {
            body_to_camera: SE3::identity(),
            camera_to_body: SE3::identity(),
        }
    }

    pub fn body_to_camera(&self) -> &SE3 {
        &self.body_to_camera
    }

    pub fn camera_to_body(&self) -> &SE3 {
        &self.camera_to_body
    }

    /// World pose of the camera given the world pose of the body.
    pub fn camera_pose(&self, body_pose: &SE3) -> SE3 {
        body_pose.compose(&self.camera_to_body, None, None)
    }
}
