//! SO(3) - Special Orthogonal Group in 3D
//!
//! Rotations are stored as nalgebra unit quaternions. Tangent elements are
//! rotation vectors (axis scaled by angle) in R³.
//!
//! The right Jacobian of SO(3) is also what first-order IMU bias correction
//! chains through when it composes a small-angle update onto a rotation delta:
//!
//! ```text
//! Exp(φ + δφ) ≈ Exp(φ) · Exp(Jr(φ) · δφ)
//! Jr(φ) = I - (1 - cos θ)/θ² [φ]× + (θ - sin θ)/θ³ [φ]×²
//! ```

use crate::manifold::{LieGroup, Tangent, skew};
use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};
use rand::Rng;
use std::fmt;

/// Angle (squared) below which series expansions replace closed forms.
const SMALL_ANGLE_SQUARED: f64 = f64::EPSILON;

/// SO(3) group element.
#[derive(Clone, Debug, PartialEq)]
pub struct SO3 {
    quaternion: UnitQuaternion<f64>,
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.quaternion.quaternion();
        write!(
            f,
            "SO3(quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            q.w, q.i, q.j, q.k
        )
    }
}

/// SO(3) tangent element (rotation vector).
#[derive(Clone, Debug, PartialEq)]
pub struct SO3Tangent {
    data: Vector3<f64>,
}

impl SO3 {
    pub fn new(quaternion: UnitQuaternion<f64>) -> Self {
        SO3 { quaternion }
    }

    /// Roll-pitch-yaw constructor, `R = Rz(yaw) · Ry(pitch) · Rx(roll)`.
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64) -> Self {
        SO3::new(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// A zero (or non-finite) axis carries no direction and yields the identity.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let finite = angle.is_finite() && axis.iter().all(|v| v.is_finite());
        match Unit::try_new(*axis, f64::EPSILON) {
            Some(unit_axis) if finite => {
                SO3::new(UnitQuaternion::from_axis_angle(&unit_axis, angle))
            }
            _ => SO3::identity(),
        }
    }

    /// Rodrigues constructor from a rotation vector.
    pub fn from_scaled_axis(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent::new(axis_angle).exp(None)
    }

    /// Closest rotation to an (almost) orthonormal matrix.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        let rotation = nalgebra::Rotation3::from_matrix(matrix);
        SO3::new(UnitQuaternion::from_rotation_matrix(&rotation))
    }

    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.quaternion.to_rotation_matrix().into_inner()
    }

    /// Quaternion coefficients as `[w, x, y, z]`.
    pub fn coeffs(&self) -> [f64; 4] {
        let q = self.quaternion.quaternion();
        [q.w, q.i, q.j, q.k]
    }
}

impl LieGroup for SO3 {
    type TangentVector = SO3Tangent;
    type JacobianMatrix = Matrix3<f64>;

    const DOF: usize = 3;

    fn identity() -> Self {
        SO3 {
            quaternion: UnitQuaternion::identity(),
        }
    }

    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self {
        if let Some(jac) = jacobian {
            *jac = -self.rotation_matrix();
        }

        SO3 {
            quaternion: self.quaternion.inverse(),
        }
    }

    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        if let Some(jac_self) = jacobian_self {
            *jac_self = other.rotation_matrix().transpose();
        }

        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix3::identity();
        }

        SO3 {
            quaternion: self.quaternion * other.quaternion,
        }
    }

    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector {
        let q = self.quaternion.quaternion();
        let sin_angle_squared = q.i * q.i + q.j * q.j + q.k * q.k;

        let log_coeff = if sin_angle_squared > SMALL_ANGLE_SQUARED {
            let sin_angle = sin_angle_squared.sqrt();
            let cos_angle = q.w;

            // q and -q are the same rotation; pick the shortest angle.
            let two_angle = 2.0
                * if cos_angle < 0.0 {
                    f64::atan2(-sin_angle, -cos_angle)
                } else {
                    f64::atan2(sin_angle, cos_angle)
                };

            two_angle / sin_angle
        } else {
            2.0 / q.w
        };

        let tangent = SO3Tangent::new(Vector3::new(q.i, q.j, q.k) * log_coeff);

        if let Some(jac) = jacobian {
            *jac = tangent.right_jacobian_inv();
        }

        tangent
    }

    fn right_plus(
        &self,
        tangent: &Self::TangentVector,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_tangent: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        let exp_tangent = tangent.exp(None);

        if let Some(jac_self) = jacobian_self {
            *jac_self = exp_tangent.rotation_matrix().transpose();
        }

        if let Some(jac_tangent) = jacobian_tangent {
            *jac_tangent = tangent.right_jacobian();
        }

        self.compose(&exp_tangent, None, None)
    }

    fn right_minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self::TangentVector {
        let result = other.between(self).log(None);

        if let Some(jac_self) = jacobian_self {
            *jac_self = result.right_jacobian_inv();
        }

        if let Some(jac_other) = jacobian_other {
            *jac_other = -result.left_jacobian_inv();
        }

        result
    }

    fn act(
        &self,
        vector: &Vector3<f64>,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_vector: Option<&mut Matrix3<f64>>,
    ) -> Vector3<f64> {
        if let Some(jac_self) = jacobian_self {
            *jac_self = -self.rotation_matrix() * skew(vector);
        }

        if let Some(jac_vector) = jacobian_vector {
            *jac_vector = self.rotation_matrix();
        }

        self.quaternion * vector
    }

    fn adjoint(&self) -> Self::JacobianMatrix {
        self.rotation_matrix()
    }

    fn random() -> Self {
        SO3Tangent::random().exp(None)
    }

    fn normalize(&mut self) {
        self.quaternion.renormalize();
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        (self.quaternion.quaternion().norm() - 1.0).abs() < tolerance
    }
}

impl SO3Tangent {
    pub fn new(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent { data: axis_angle }
    }

    pub fn from_components(x: f64, y: f64, z: f64) -> Self {
        SO3Tangent::new(Vector3::new(x, y, z))
    }

    pub fn axis_angle(&self) -> Vector3<f64> {
        self.data
    }

    pub fn angle(&self) -> f64 {
        self.data.norm()
    }

    /// `[φ]×`
    pub fn hat(&self) -> Matrix3<f64> {
        skew(&self.data)
    }
}

impl Tangent<SO3> for SO3Tangent {
    fn exp(&self, jacobian: Option<&mut Matrix3<f64>>) -> SO3 {
        let theta_squared = self.data.norm_squared();

        let quaternion = if theta_squared > SMALL_ANGLE_SQUARED {
            UnitQuaternion::from_scaled_axis(self.data)
        } else {
            UnitQuaternion::from_quaternion(Quaternion::new(
                1.0,
                self.data.x / 2.0,
                self.data.y / 2.0,
                self.data.z / 2.0,
            ))
        };

        if let Some(jac) = jacobian {
            *jac = self.right_jacobian();
        }

        SO3 { quaternion }
    }

    fn right_jacobian(&self) -> Matrix3<f64> {
        self.left_jacobian().transpose()
    }

    fn left_jacobian(&self) -> Matrix3<f64> {
        let theta_squared = self.data.norm_squared();
        let phi_skew = self.hat();

        if theta_squared <= SMALL_ANGLE_SQUARED {
            Matrix3::identity() + 0.5 * phi_skew
        } else {
            let theta = theta_squared.sqrt();
            Matrix3::identity()
                + (1.0 - theta.cos()) / theta_squared * phi_skew
                + (theta - theta.sin()) / (theta_squared * theta) * phi_skew * phi_skew
        }
    }

    fn right_jacobian_inv(&self) -> Matrix3<f64> {
        self.left_jacobian_inv().transpose()
    }

    fn left_jacobian_inv(&self) -> Matrix3<f64> {
        let theta_squared = self.data.norm_squared();
        let phi_skew = self.hat();

        if theta_squared <= SMALL_ANGLE_SQUARED {
            Matrix3::identity() - 0.5 * phi_skew
        } else {
            let theta = theta_squared.sqrt();
            Matrix3::identity() - 0.5 * phi_skew
                + (1.0 / theta_squared - (1.0 + theta.cos()) / (2.0 * theta * theta.sin()))
                    * phi_skew
                    * phi_skew
        }
    }

    fn zero() -> Self {
        SO3Tangent::new(Vector3::zeros())
    }

    fn random() -> Self {
        let mut rng = rand::rng();
        SO3Tangent::new(Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ))
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
