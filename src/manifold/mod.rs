//! Lie groups used by the visual-inertial factors.
//!
//! Lie group M,° | size   | dim | X ∈ M             | Constraint | T_X M          | Exp(T)        | Comp. | Action
//! ------------- | ------ | --- | ----------------- | ---------- | -------------- | ------------- | ----- | ------
//! Rotation      | SO(3),.| 3   | R                 | RᵀR = I    | [θ] ∈ R³       | R = exp([θ]x) | R₁R₂  | Rx
//! Rigid motion  | SE(3),.| 6   | M = [R t; 0 1]    | RᵀR = I    | [ρ, θ] ∈ R⁶    | Exp([v̂])      | M₁M₂  | Rx+t
//!
//! The conventions follow the [manif](https://github.com/artivis/manif) library:
//! Jacobians are taken with respect to local (right) perturbations, so for a
//! function `Y = f(X)` the Jacobian `J` satisfies
//!
//! ```text
//! f(X ⊕ δ) ≈ f(X) ⊕ J·δ,   X ⊕ δ = X · Exp(δ)
//! ```
//!
//! `right_plus` is the retraction used by the optimizer when it applies a
//! tangent update to a pose, and every analytic Jacobian in this crate is
//! expressed in that tangent.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use vio_factors::manifold::LieGroup;
//! use vio_factors::manifold::se3::{SE3, SE3Tangent};
//!
//! let pose = SE3::from_translation_euler(1.0, 2.0, 3.0, 0.1, 0.2, 0.3);
//! let delta = SE3Tangent::new(Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.0, 0.1, 0.0));
//!
//! let perturbed = pose.plus(&delta, None, None);
//! assert!(perturbed.is_valid(1e-9));
//! ```

use nalgebra::{Matrix3, Vector3};
use std::fmt::Debug;
use thiserror::Error;

pub mod se3;
pub mod so3;

/// Errors raised when building manifold elements from raw parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifoldError {
    #[error("Invalid parameter length: expected {expected}, got {actual}")]
    InvalidParameterLength { expected: usize, actual: usize },

    #[error("Invalid manifold element: {0}")]
    InvalidElement(String),
}

pub type ManifoldResult<T> = Result<T, ManifoldError>;

/// Core operations of a matrix Lie group with right-perturbation Jacobians.
///
/// Every Jacobian output is optional; pass `None` to skip its computation.
pub trait LieGroup: Clone + Debug + PartialEq {
    /// Tangent space (Lie algebra in vector form).
    type TangentVector: Tangent<Self>;

    /// Square matrix of size `DOF × DOF`.
    type JacobianMatrix: Clone + Debug + PartialEq;

    /// Degrees of freedom.
    const DOF: usize;

    fn identity() -> Self;

    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self;

    /// `self · other`.
    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self;

    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector;

    /// `self · Exp(tangent)`.
    fn right_plus(
        &self,
        tangent: &Self::TangentVector,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_tangent: Option<&mut Self::JacobianMatrix>,
    ) -> Self;

    /// `Log(other⁻¹ · self)`.
    fn right_minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self::TangentVector;

    fn plus(
        &self,
        tangent: &Self::TangentVector,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_tangent: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        self.right_plus(tangent, jacobian_self, jacobian_tangent)
    }

    fn minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self::TangentVector {
        self.right_minus(other, jacobian_self, jacobian_other)
    }

    /// `self⁻¹ · other`.
    fn between(&self, other: &Self) -> Self {
        self.inverse(None).compose(other, None, None)
    }

    /// Transform a point: `R·v` for rotations, `R·v + t` for rigid motions.
    fn act(
        &self,
        vector: &Vector3<f64>,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_vector: Option<&mut Matrix3<f64>>,
    ) -> Vector3<f64>;

    fn adjoint(&self) -> Self::JacobianMatrix;

    fn random() -> Self;

    /// Re-project the rotation part onto the group after numerical drift.
    fn normalize(&mut self);

    fn is_valid(&self, tolerance: f64) -> bool;
}

/// Tangent-space operations paired with a [`LieGroup`].
pub trait Tangent<G: LieGroup>: Clone + Debug + PartialEq {
    /// Exponential map. The optional Jacobian is the right Jacobian `Jr`.
    fn exp(&self, jacobian: Option<&mut G::JacobianMatrix>) -> G;

    fn right_jacobian(&self) -> G::JacobianMatrix;

    fn left_jacobian(&self) -> G::JacobianMatrix;

    fn right_jacobian_inv(&self) -> G::JacobianMatrix;

    fn left_jacobian_inv(&self) -> G::JacobianMatrix;

    fn zero() -> Self;

    fn random() -> Self;

    fn is_zero(&self, tolerance: f64) -> bool;
}

/// Skew-symmetric matrix `[v]×` such that `[v]× w = v × w`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_matches_cross_product() {
        let a = Vector3::new(0.3, -1.2, 2.5);
        let b = Vector3::new(-0.7, 0.4, 1.1);
        assert!((skew(&a) * b - a.cross(&b)).norm() < 1e-15);
    }

    #[test]
    fn test_manifold_error_display() {
        let err = ManifoldError::InvalidParameterLength {
            expected: 7,
            actual: 6,
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter length: expected 7, got 6"
        );
    }
}
