//! Two-view inverse-depth reprojection factor.
//!
//! A landmark is parameterized by the pixel where it was first observed from an
//! anchor pose and by its inverse depth ρ along that pixel's ray. The factor
//! predicts where the landmark lands in a second view and compares the
//! prediction with the measured pixel there.
//!
//! # Mathematical Formulation
//!
//! With `E = T_cb` the body→camera extrinsic, body poses `T₁`, `T₂` in the
//! world frame, and `ray` the unprojection of the anchor pixel (unit z):
//!
//! ```text
//! p_c1 = ray / ρ
//! p_c2 = E · T₂⁻¹ · T₁ · E⁻¹ · p_c1
//! r    = π(p_c2) - z₂
//! ```
//!
//! # Jacobians
//!
//! Poses are perturbed on the right, `T ⊕ ξ = T · Exp(ξ)` with `ξ = [δρ, δθ]`.
//! Writing `p_b1 = E⁻¹·p_c1`, `p_w = T₁·p_b1` and `p_b2 = T₂⁻¹·p_w`:
//!
//! ```text
//! ∂p_c2/∂ξ₁ = R_cb · R₂ᵀ · [ R₁ | -R₁·[p_b1]× ]
//! ∂p_c2/∂ξ₂ = R_cb · [ -I | [p_b2]× ]
//! ∂p_c2/∂ρ  = R_cb · R₂ᵀ · R₁ · R_bc · (-ray / ρ²)
//! ```
//!
//! and every block is chained with the projection Jacobian `∂π/∂p_c2` (2×3).

use super::{
    ExtrinsicTransform, Factor, FactorError, FactorResult, IsotropicNoise, Key, check_param_count,
    scalar_param,
};
use crate::camera::{CameraModel, PinholeCamera};
use crate::manifold::se3::SE3;
use crate::manifold::{LieGroup, skew};
use nalgebra::{DMatrix, DVector, Matrix2x6, Matrix3, Matrix3x6, Vector2, Vector3};
use std::sync::Arc;
use tracing::debug;

/// Residual dimension.
const RESIDUAL_DIM: usize = 2;

/// Tangent dimension of the stacked variables `[pose1, pose2, ρ]`.
const STACKED_DOF: usize = 13;

/// Variable keys connected by an [`InverseDepthFactor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InverseDepthKeys {
    pub pose1: Key,
    pub pose2: Key,
    pub landmark: Key,
}

/// Residual and analytic Jacobians of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseDepthLinearization {
    /// Predicted minus measured pixel in the second view.
    pub residual: Vector2<f64>,
    pub j_pose1: Matrix2x6<f64>,
    pub j_pose2: Matrix2x6<f64>,
    pub j_rho: Vector2<f64>,
}

impl InverseDepthLinearization {
    /// Jacobians stacked as a 2×13 matrix `[J_pose1 | J_pose2 | J_rho]`.
    pub fn stacked_jacobian(&self) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(RESIDUAL_DIM, STACKED_DOF);
        jac.fixed_view_mut::<2, 6>(0, 0).copy_from(&self.j_pose1);
        jac.fixed_view_mut::<2, 6>(0, 6).copy_from(&self.j_pose2);
        jac.fixed_view_mut::<2, 1>(0, 12).copy_from(&self.j_rho);
        jac
    }

    fn is_finite(&self) -> bool {
        self.residual
            .iter()
            .chain(self.j_pose1.iter())
            .chain(self.j_pose2.iter())
            .chain(self.j_rho.iter())
            .all(|v| v.is_finite())
    }
}

/// Intermediate points along the frame chain.
struct Transfer {
    p_b1: Vector3<f64>,
    p_b2: Vector3<f64>,
    p_c2: Vector3<f64>,
    predicted: Vector2<f64>,
}

/// Reprojection of an inverse-depth landmark anchored at `pose1` into `pose2`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nalgebra::Vector2;
/// use vio_factors::camera::PinholeCamera;
/// use vio_factors::factors::{ExtrinsicTransform, InverseDepthFactor, InverseDepthKeys, IsotropicNoise};
/// use vio_factors::manifold::LieGroup;
/// use vio_factors::manifold::se3::SE3;
///
/// let factor = InverseDepthFactor::new(
///     InverseDepthKeys { pose1: 1, pose2: 2, landmark: 100 },
///     Vector2::new(0.1, -0.05),
///     Vector2::new(0.12, -0.04),
///     IsotropicNoise::unit(2),
///     ExtrinsicTransform::identity(),
///     Arc::new(PinholeCamera::identity()),
/// )?;
///
/// let pose = SE3::identity();
/// assert!(factor.residual(&pose, &pose, -1.0).is_err());
/// # Ok::<(), vio_factors::factors::FactorError>(())
/// ```
#[derive(Debug, Clone)]
pub struct InverseDepthFactor<C: CameraModel = PinholeCamera> {
    keys: [Key; 3],
    pixel1: Vector2<f64>,
    pixel2: Vector2<f64>,
    /// Unprojection of `pixel1`, fixed for the lifetime of the factor.
    ray: Vector3<f64>,
    noise: IsotropicNoise,
    extrinsic: ExtrinsicTransform,
    calibration: Arc<C>,
}

impl<C: CameraModel> InverseDepthFactor<C> {
    /// Create a factor observing through a camera rigidly mounted on the body.
    ///
    /// Fails if the calibration is degenerate, the noise model is not
    /// 2-dimensional, or a pixel is not finite.
    pub fn new(
        keys: InverseDepthKeys,
        pixel1: Vector2<f64>,
        pixel2: Vector2<f64>,
        noise: IsotropicNoise,
        extrinsic: ExtrinsicTransform,
        calibration: Arc<C>,
    ) -> FactorResult<Self> {
        calibration
            .validate_params()
            .map_err(FactorError::InvalidCalibration)?;

        if noise.dim() != RESIDUAL_DIM {
            return Err(FactorError::InvalidNoiseModel(format!(
                "expected dimension {RESIDUAL_DIM}, got {}",
                noise.dim()
            )));
        }

        if !(pixel1.iter().chain(pixel2.iter()).all(|v| v.is_finite())) {
            return Err(FactorError::InvalidParameters(
                "pixel observations must be finite".to_string(),
            ));
        }

        let ray = calibration.unproject(&pixel1);

        Ok(Self {
            keys: [keys.pose1, keys.pose2, keys.landmark],
            pixel1,
            pixel2,
            ray,
            noise,
            extrinsic,
            calibration,
        })
    }

    /// Create a factor whose poses are the camera poses themselves.
    pub fn camera_centric(
        keys: InverseDepthKeys,
        pixel1: Vector2<f64>,
        pixel2: Vector2<f64>,
        noise: IsotropicNoise,
        calibration: Arc<C>,
    ) -> FactorResult<Self> {
        Self::new(
            keys,
            pixel1,
            pixel2,
            noise,
            ExtrinsicTransform::identity(),
            calibration,
        )
    }

    pub fn keys(&self) -> InverseDepthKeys {
        InverseDepthKeys {
            pose1: self.keys[0],
            pose2: self.keys[1],
            landmark: self.keys[2],
        }
    }

    pub fn pixel1(&self) -> &Vector2<f64> {
        &self.pixel1
    }

    pub fn pixel2(&self) -> &Vector2<f64> {
        &self.pixel2
    }

    pub fn noise(&self) -> &IsotropicNoise {
        &self.noise
    }

    pub fn extrinsic(&self) -> &ExtrinsicTransform {
        &self.extrinsic
    }

    pub fn calibration(&self) -> &Arc<C> {
        &self.calibration
    }

    /// Landmark position in the world frame.
    pub fn landmark_in_world(&self, pose1: &SE3, rho: f64) -> FactorResult<Vector3<f64>> {
        let p_c1 = self.anchor_point(rho)?;
        let p_b1 = self.extrinsic.camera_to_body().act(&p_c1, None, None);
        Ok(pose1.act(&p_b1, None, None))
    }

    /// Reprojection residual `π(p_c2) - pixel2` without Jacobians.
    pub fn residual(&self, pose1: &SE3, pose2: &SE3, rho: f64) -> FactorResult<Vector2<f64>> {
        let transfer = self.transfer(pose1, pose2, rho)?;
        Ok(transfer.predicted - self.pixel2)
    }

    /// Reprojection residual together with its analytic Jacobians.
    pub fn evaluate(
        &self,
        pose1: &SE3,
        pose2: &SE3,
        rho: f64,
    ) -> FactorResult<InverseDepthLinearization> {
        let transfer = self.transfer(pose1, pose2, rho)?;

        let r1 = pose1.rotation_matrix();
        let r2_t = pose2.rotation_matrix().transpose();
        let r_cb = self.extrinsic.body_to_camera().rotation_matrix();
        let r_bc = self.extrinsic.camera_to_body().rotation_matrix();

        let d_uv_d_pc2 = self.calibration.jacobian_point(&transfer.p_c2);
        let d_pc2_d_pw = r_cb * r2_t;

        let mut d_pw_d_pose1 = Matrix3x6::zeros();
        d_pw_d_pose1.fixed_view_mut::<3, 3>(0, 0).copy_from(&r1);
        d_pw_d_pose1
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(-r1 * skew(&transfer.p_b1)));

        let mut d_pb2_d_pose2 = Matrix3x6::zeros();
        d_pb2_d_pose2
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(-Matrix3::identity()));
        d_pb2_d_pose2
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&skew(&transfer.p_b2));

        let d_pc1_d_rho = -self.ray / (rho * rho);
        let d_pc2_d_rho = d_pc2_d_pw * r1 * r_bc * d_pc1_d_rho;

        let linearization = InverseDepthLinearization {
            residual: transfer.predicted - self.pixel2,
            j_pose1: d_uv_d_pc2 * d_pc2_d_pw * d_pw_d_pose1,
            j_pose2: d_uv_d_pc2 * r_cb * d_pb2_d_pose2,
            j_rho: d_uv_d_pc2 * d_pc2_d_rho,
        };

        // ρ² underflows long before ρ reaches zero.
        if !linearization.is_finite() {
            debug!(rho, landmark = self.keys[2], "inverse depth too small to linearize");
            return Err(FactorError::InvalidLandmarkDepth { rho });
        }
        Ok(linearization)
    }

    fn anchor_point(&self, rho: f64) -> FactorResult<Vector3<f64>> {
        if !(rho.is_finite() && rho > 0.0) {
            debug!(rho, landmark = self.keys[2], "rejecting non-positive inverse depth");
            return Err(FactorError::InvalidLandmarkDepth { rho });
        }
        let p_c1 = self.ray / rho;
        if !p_c1.iter().all(|v| v.is_finite()) {
            debug!(rho, landmark = self.keys[2], "inverse depth too small to anchor");
            return Err(FactorError::InvalidLandmarkDepth { rho });
        }
        Ok(p_c1)
    }

    fn transfer(&self, pose1: &SE3, pose2: &SE3, rho: f64) -> FactorResult<Transfer> {
        let p_c1 = self.anchor_point(rho)?;
        let p_b1 = self.extrinsic.camera_to_body().act(&p_c1, None, None);
        let p_w = pose1.act(&p_b1, None, None);
        let p_b2 = pose2.transform_to(&p_w);
        let p_c2 = self.extrinsic.body_to_camera().act(&p_b2, None, None);

        let predicted = self.calibration.project(&p_c2).map_err(|err| {
            debug!(landmark = self.keys[2], z = p_c2.z, "landmark behind second camera");
            FactorError::Cheirality(err)
        })?;

        Ok(Transfer {
            p_b1,
            p_b2,
            p_c2,
            predicted,
        })
    }

    fn decode(params: &[DVector<f64>]) -> FactorResult<(SE3, SE3, f64)> {
        check_param_count(params, 3)?;
        let pose1 = SE3::try_from(&params[0])?;
        let pose2 = SE3::try_from(&params[1])?;
        let rho = scalar_param(&params[2])?;
        Ok((pose1, pose2, rho))
    }
}

impl<C: CameraModel> Factor for InverseDepthFactor<C> {
    fn residual(&self, params: &[DVector<f64>]) -> FactorResult<DVector<f64>> {
        let (pose1, pose2, rho) = Self::decode(params)?;
        let residual = Self::residual(self, &pose1, &pose2, rho)?;
        Ok(self
            .noise
            .whiten_vector(&DVector::from_column_slice(residual.as_slice())))
    }

    fn linearize(&self, params: &[DVector<f64>]) -> FactorResult<(DVector<f64>, DMatrix<f64>)> {
        let (pose1, pose2, rho) = Self::decode(params)?;
        let linearization = self.evaluate(&pose1, &pose2, rho)?;
        let residual = DVector::from_column_slice(linearization.residual.as_slice());
        Ok((
            self.noise.whiten_vector(&residual),
            self.noise.whiten_matrix(&linearization.stacked_jacobian()),
        ))
    }

    fn dimension(&self) -> usize {
        RESIDUAL_DIM
    }

    fn variable_keys(&self) -> &[Key] {
        &self.keys
    }
}
