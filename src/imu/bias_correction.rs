//! First-order bias correction of a preintegrated delta.
//!
//! With `δb = b - b̄` split into gyro and accel parts:
//!
//! ```text
//! ΔR' = ΔR · Exp(∂ΔR/∂b_g · δb_g)
//! Δv' = Δv + ∂Δv/∂b_a · δb_a + ∂Δv/∂b_g · δb_g
//! Δp' = Δp + ∂Δp/∂b_a · δb_a + ∂Δp/∂b_g · δb_g
//! ```
//!
//! The Jacobian of the corrected delta with respect to the bias is 9×6, rows
//! `[rotation, velocity, position]` and columns `[gyro, accel]`:
//!
//! ```text
//!        gyro                      accel
//! rot  [ Jr(∂ΔR/∂b_g·δb_g)·∂ΔR/∂b_g   0         ]
//! vel  [ ∂Δv/∂b_g                  ∂Δv/∂b_a  ]
//! pos  [ ∂Δp/∂b_g                  ∂Δp/∂b_a  ]
//! ```
//!
//! The rotation row is expressed in the right tangent of `ΔR'`.

use super::{ImuBias, ImuError, ImuResult, PreintegratedDelta};
use crate::manifold::so3::{SO3, SO3Tangent};
use crate::manifold::{LieGroup, Tangent};
use nalgebra::{Matrix3, SMatrix, Vector3};
use tracing::warn;

/// ∂(ΔR', Δv', Δp') / ∂(b_g, b_a).
pub type BiasJacobian = SMatrix<f64, 9, 6>;

/// Preintegrated deltas after bias correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedDelta {
    pub rotation: SO3,
    pub velocity: Vector3<f64>,
    pub position: Vector3<f64>,
}

/// Correct `delta` for the bias `bias`.
pub fn corrected_delta(delta: &PreintegratedDelta, bias: &ImuBias) -> CorrectedDelta {
    correct(delta, bias, None)
}

/// Correct `delta` for `bias` and return the 9×6 Jacobian of the result.
pub fn corrected_delta_with_jacobian(
    delta: &PreintegratedDelta,
    bias: &ImuBias,
) -> (CorrectedDelta, BiasJacobian) {
    let mut d_rotation = Matrix3::zeros();
    let corrected = correct(delta, bias, Some(&mut d_rotation));

    let jac = delta.jacobians();
    let mut jacobian = BiasJacobian::zeros();
    jacobian.fixed_view_mut::<3, 3>(0, 0).copy_from(&d_rotation);
    jacobian
        .fixed_view_mut::<3, 3>(3, 0)
        .copy_from(&jac.d_velocity_d_gyro);
    jacobian
        .fixed_view_mut::<3, 3>(3, 3)
        .copy_from(&jac.d_velocity_d_accel);
    jacobian
        .fixed_view_mut::<3, 3>(6, 0)
        .copy_from(&jac.d_position_d_gyro);
    jacobian
        .fixed_view_mut::<3, 3>(6, 3)
        .copy_from(&jac.d_position_d_accel);

    (corrected, jacobian)
}

fn correct(
    delta: &PreintegratedDelta,
    bias: &ImuBias,
    d_rotation_d_gyro: Option<&mut Matrix3<f64>>,
) -> CorrectedDelta {
    let drift = delta.bias_drift(bias);
    let jac = delta.jacobians();

    let rotation_increment = SO3Tangent::new(jac.d_rotation_d_gyro * drift.gyro);
    let correction = match d_rotation_d_gyro {
        Some(d_rot) => {
            let mut exp_jacobian = Matrix3::zeros();
            let correction = rotation_increment.exp(Some(&mut exp_jacobian));
            *d_rot = exp_jacobian * jac.d_rotation_d_gyro;
            correction
        }
        None => rotation_increment.exp(None),
    };

    CorrectedDelta {
        rotation: delta.rotation().compose(&correction, None, None),
        velocity: delta.velocity()
            + jac.d_velocity_d_accel * drift.accel
            + jac.d_velocity_d_gyro * drift.gyro,
        position: delta.position()
            + jac.d_position_d_accel * drift.accel
            + jac.d_position_d_gyro * drift.gyro,
    }
}

/// Bias drift beyond which the first-order correction is considered stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasValidityWindow {
    max_gyro_drift: f64,
    max_accel_drift: f64,
}

impl BiasValidityWindow {
    /// Thresholds on `‖δb_g‖` (rad/s) and `‖δb_a‖` (m/s²).
    pub fn new(max_gyro_drift: f64, max_accel_drift: f64) -> ImuResult<Self> {
        for (name, value) in [("gyro", max_gyro_drift), ("accel", max_accel_drift)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ImuError::InvalidValidityWindow(format!(
                    "{name} threshold must be finite and positive, got {value}"
                )));
            }
        }
        Ok(Self {
            max_gyro_drift,
            max_accel_drift,
        })
    }

    pub fn max_gyro_drift(&self) -> f64 {
        self.max_gyro_drift
    }

    pub fn max_accel_drift(&self) -> f64 {
        self.max_accel_drift
    }

    pub fn is_exceeded_by(&self, drift: &ImuBias) -> bool {
        let (gyro, accel) = drift.norms();
        gyro > self.max_gyro_drift || accel > self.max_accel_drift
    }
}

/// Configuration for [`BiasCorrector`].
#[derive(Debug, Clone, Default)]
pub struct BiasCorrectionConfig {
    /// When set, corrections beyond this window are reported with a warning.
    pub validity_window: Option<BiasValidityWindow>,
}

impl BiasCorrectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validity_window(mut self, window: BiasValidityWindow) -> Self {
        self.validity_window = Some(window);
        self
    }
}

/// Applies bias corrections and reports corrections that went stale.
///
/// The correction itself never fails; a stale correction is still returned,
/// it is only logged so the caller can schedule a re-integration.
#[derive(Debug, Clone, Default)]
pub struct BiasCorrector {
    config: BiasCorrectionConfig,
}

impl BiasCorrector {
    pub fn new(config: BiasCorrectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BiasCorrectionConfig {
        &self.config
    }

    pub fn correct(&self, delta: &PreintegratedDelta, bias: &ImuBias) -> CorrectedDelta {
        self.check_drift(delta, bias);
        corrected_delta(delta, bias)
    }

    pub fn correct_with_jacobian(
        &self,
        delta: &PreintegratedDelta,
        bias: &ImuBias,
    ) -> (CorrectedDelta, BiasJacobian) {
        self.check_drift(delta, bias);
        corrected_delta_with_jacobian(delta, bias)
    }

    /// Whether `bias` is outside the configured window, if any.
    pub fn is_stale(&self, delta: &PreintegratedDelta, bias: &ImuBias) -> bool {
        self.config
            .validity_window
            .as_ref()
            .is_some_and(|window| delta.exceeds_validity(bias, window))
    }

    fn check_drift(&self, delta: &PreintegratedDelta, bias: &ImuBias) {
        if self.is_stale(delta, bias) {
            let (gyro, accel) = delta.bias_drift(bias).norms();
            warn!(
                gyro_drift = gyro,
                accel_drift = accel,
                "bias drifted outside the linearization window, re-integration recommended"
            );
        }
    }
}
