//! SE(3) - Special Euclidean Group in 3D
//!
//! Rigid body transformations stored as an [`SO3`] rotation plus a translation.
//! Tangent elements are 6-vectors ordered `[ρ (translation), θ (rotation)]`.
//!
//! Poses are perturbed on the right, `T ⊕ ξ = T · Exp(ξ)`, so for a point `p`
//! the first-order effect of a perturbation is
//!
//! ```text
//! (T · Exp(ξ)) · p ≈ T·p + R·δρ - R·[p]×·δθ
//! ```

use crate::manifold::so3::{SO3, SO3Tangent};
use crate::manifold::{LieGroup, ManifoldError, Tangent, skew};
use nalgebra::{
    DVector, Isometry3, Matrix3, Matrix4, Matrix6, Translation3, UnitQuaternion, Vector3, Vector6,
};
use rand::Rng;
use std::fmt;

/// Number of scalars in the flat `[tx, ty, tz, qw, qx, qy, qz]` layout.
pub const SE3_PARAMETER_SIZE: usize = 7;

/// SE(3) group element.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3 {
    rotation: SO3,
    translation: Vector3<f64>,
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation;
        let [w, x, y, z] = self.rotation.coeffs();
        write!(
            f,
            "SE3(translation: [{:.4}, {:.4}, {:.4}], rotation: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            t.x, t.y, t.z, w, x, y, z
        )
    }
}

/// SE(3) tangent element `[ρ, θ]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3Tangent {
    data: Vector6<f64>,
}

impl SE3 {
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        SE3 {
            rotation: SO3::new(rotation),
            translation,
        }
    }

    pub fn from_translation_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        SE3::from_translation_so3(
            Vector3::new(x, y, z),
            SO3::from_euler_angles(roll, pitch, yaw),
        )
    }

    pub fn from_isometry(isometry: Isometry3<f64>) -> Self {
        SE3::new(isometry.translation.vector, isometry.rotation)
    }

    pub fn from_translation_so3(translation: Vector3<f64>, rotation: SO3) -> Self {
        SE3 {
            rotation,
            translation,
        }
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    pub fn rotation_so3(&self) -> &SO3 {
        &self.rotation
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.rotation_matrix()
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            self.rotation.quaternion(),
        )
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// Express a world point in this frame, `T⁻¹·p`.
    pub fn transform_to(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation
            .inverse(None)
            .act(&(point - self.translation), None, None)
    }
}

impl TryFrom<&DVector<f64>> for SE3 {
    type Error = ManifoldError;

    fn try_from(data: &DVector<f64>) -> Result<Self, Self::Error> {
        if data.len() != SE3_PARAMETER_SIZE {
            return Err(ManifoldError::InvalidParameterLength {
                expected: SE3_PARAMETER_SIZE,
                actual: data.len(),
            });
        }

        let quaternion = nalgebra::Quaternion::new(data[3], data[4], data[5], data[6]);
        let norm = quaternion.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(ManifoldError::InvalidElement(format!(
                "quaternion norm {norm} cannot be normalized"
            )));
        }

        Ok(SE3::new(
            Vector3::new(data[0], data[1], data[2]),
            UnitQuaternion::from_quaternion(quaternion),
        ))
    }
}

impl From<&SE3> for DVector<f64> {
    fn from(pose: &SE3) -> Self {
        let t = pose.translation;
        let [w, x, y, z] = pose.rotation.coeffs();
        DVector::from_vec(vec![t.x, t.y, t.z, w, x, y, z])
    }
}

impl LieGroup for SE3 {
    type TangentVector = SE3Tangent;
    type JacobianMatrix = Matrix6<f64>;

    const DOF: usize = 6;

    fn identity() -> Self {
        SE3 {
            rotation: SO3::identity(),
            translation: Vector3::zeros(),
        }
    }

    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self {
        let rotation_inv = self.rotation.inverse(None);
        let translation_inv = -rotation_inv.act(&self.translation, None, None);

        if let Some(jac) = jacobian {
            *jac = -self.adjoint();
        }

        SE3 {
            rotation: rotation_inv,
            translation: translation_inv,
        }
    }

    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        if let Some(jac_self) = jacobian_self {
            *jac_self = other.inverse(None).adjoint();
        }

        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix6::identity();
        }

        SE3 {
            rotation: self.rotation.compose(&other.rotation, None, None),
            translation: self.rotation.act(&other.translation, None, None) + self.translation,
        }
    }

    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector {
        let theta = self.rotation.log(None);
        let rho = theta.left_jacobian_inv() * self.translation;
        let tangent = SE3Tangent::new(rho, theta.axis_angle());

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
            *jac_self = exp_tangent.inverse(None).adjoint();
        }

        if let Some(jac_tangent) = jacobian_tangent {
            *jac_tangent = tangent.right_jacobian();
        }

        let mut result = self.compose(&exp_tangent, None, None);
        result.normalize();
        result
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
        let rotation = self.rotation.rotation_matrix();

        if let Some(jac_self) = jacobian_self {
            // Only the top 3 rows are meaningful for a point action.
            jac_self.fill(0.0);
            jac_self.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
            jac_self
                .fixed_view_mut::<3, 3>(0, 3)
                .copy_from(&(-rotation * skew(vector)));
        }

        if let Some(jac_vector) = jacobian_vector {
            *jac_vector = rotation;
        }

        rotation * vector + self.translation
    }

    fn adjoint(&self) -> Self::JacobianMatrix {
        let rotation = self.rotation.rotation_matrix();
        let mut adjoint = Matrix6::zeros();
        adjoint.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        adjoint
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(skew(&self.translation) * rotation));
        adjoint.fixed_view_mut::<3, 3>(3, 3).copy_from(&rotation);
        adjoint
    }

    fn random() -> Self {
        let mut rng = rand::rng();
        SE3 {
            rotation: SO3::random(),
            translation: Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ),
        }
    }

    fn normalize(&mut self) {
        self.rotation.normalize();
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        self.rotation.is_valid(tolerance) && self.translation.iter().all(|v| v.is_finite())
    }
}

impl SE3Tangent {
    pub fn new(rho: Vector3<f64>, theta: Vector3<f64>) -> Self {
        let mut data = Vector6::zeros();
        data.fixed_rows_mut::<3>(0).copy_from(&rho);
        data.fixed_rows_mut::<3>(3).copy_from(&theta);
        SE3Tangent { data }
    }

    pub fn from_vector(data: Vector6<f64>) -> Self {
        SE3Tangent { data }
    }

    pub fn rho(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    pub fn theta(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    pub fn coeffs(&self) -> Vector6<f64> {
        self.data
    }

    /// Coupling block `Q(ρ, θ)` of the SE(3) left Jacobian.
    fn q_block(&self) -> Matrix3<f64> {
        let rho_skew = skew(&self.rho());
        let theta = self.theta();
        let theta_skew = skew(&theta);
        let theta_sq = theta.norm_squared();

        let (a2, a3, a4) = if theta_sq <= 1e-6 {
            (1.0 / 6.0, 1.0 / 24.0, 1.0 / 120.0)
        } else {
            let t = theta_sq.sqrt();
            let (s, c) = t.sin_cos();
            (
                (t - s) / (theta_sq * t),
                (theta_sq + 2.0 * c - 2.0) / (2.0 * theta_sq * theta_sq),
                (2.0 * t - 3.0 * s + t * c) / (2.0 * theta_sq * theta_sq * t),
            )
        };

        let tr = theta_skew * rho_skew;
        let rt = rho_skew * theta_skew;
        let trt = tr * theta_skew;
        let ttr = theta_skew * tr;

        0.5 * rho_skew
            + a2 * (tr + rt + trt)
            + a3 * (ttr + rt * theta_skew - 3.0 * trt)
            + a4 * (trt * theta_skew + theta_skew * trt)
    }

    fn block_jacobian(rotation_block: Matrix3<f64>, coupling: Matrix3<f64>) -> Matrix6<f64> {
        let mut jac = Matrix6::zeros();
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_block);
        jac.fixed_view_mut::<3, 3>(0, 3).copy_from(&coupling);
        jac.fixed_view_mut::<3, 3>(3, 3).copy_from(&rotation_block);
        jac
    }

    fn negated(&self) -> SE3Tangent {
        SE3Tangent { data: -self.data }
    }
}

impl Tangent<SE3> for SE3Tangent {
    fn exp(&self, jacobian: Option<&mut Matrix6<f64>>) -> SE3 {
        let theta = SO3Tangent::new(self.theta());

        if let Some(jac) = jacobian {
            *jac = self.right_jacobian();
        }

        SE3 {
            rotation: theta.exp(None),
            translation: theta.left_jacobian() * self.rho(),
        }
    }

    fn right_jacobian(&self) -> Matrix6<f64> {
        self.negated().left_jacobian()
    }

    fn left_jacobian(&self) -> Matrix6<f64> {
        let jl = SO3Tangent::new(self.theta()).left_jacobian();
        SE3Tangent::block_jacobian(jl, self.q_block())
    }

    fn right_jacobian_inv(&self) -> Matrix6<f64> {
        self.negated().left_jacobian_inv()
    }

    fn left_jacobian_inv(&self) -> Matrix6<f64> {
        let jl_inv = SO3Tangent::new(self.theta()).left_jacobian_inv();
        SE3Tangent::block_jacobian(jl_inv, -jl_inv * self.q_block() * jl_inv)
    }

    fn zero() -> Self {
        SE3Tangent {
            data: Vector6::zeros(),
        }
    }

    fn random() -> Self {
        let mut rng = rand::rng();
        SE3Tangent {
            data: Vector6::from_fn(|_, _| rng.random_range(-1.0..1.0)),
        }
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
