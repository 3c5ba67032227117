//! Preintegrated inertial summary between two keyframes.
//!
//! The summary stores the relative motion accumulated from raw samples under
//! a reference bias `b̄`:
//!
//! ```text
//! ΔR = Π Exp((ω_k - b̄_g)·dt)
//! Δv = Σ ΔR_k·(a_k - b̄_a)·dt
//! Δp = Σ Δv_k·dt + ½·ΔR_k·(a_k - b̄_a)·dt²
//! ```
//!
//! together with the Jacobians of `ΔR`, `Δv`, `Δp` with respect to the bias,
//! evaluated at `b̄`. Building the summary from samples happens upstream; this
//! type only carries and validates the result.

use super::bias_correction::{BiasValidityWindow, corrected_delta};
use super::{ImuBias, ImuError, ImuResult};
use crate::manifold::LieGroup;
use crate::manifold::so3::SO3;
use nalgebra::{Matrix3, SMatrix, Vector3};

/// 9×9 covariance ordered `[rotation, velocity, position]`.
pub type PreintegrationCovariance = SMatrix<f64, 9, 9>;

/// First-order sensitivities of the preintegrated delta to the bias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasJacobians {
    pub d_rotation_d_gyro: Matrix3<f64>,
    pub d_velocity_d_accel: Matrix3<f64>,
    pub d_velocity_d_gyro: Matrix3<f64>,
    pub d_position_d_accel: Matrix3<f64>,
    pub d_position_d_gyro: Matrix3<f64>,
}

impl BiasJacobians {
    pub fn zeros() -> Self {
        Self {
            d_rotation_d_gyro: Matrix3::zeros(),
            d_velocity_d_accel: Matrix3::zeros(),
            d_velocity_d_gyro: Matrix3::zeros(),
            d_position_d_accel: Matrix3::zeros(),
            d_position_d_gyro: Matrix3::zeros(),
        }
    }

    fn is_finite(&self) -> bool {
        [
            &self.d_rotation_d_gyro,
            &self.d_velocity_d_accel,
            &self.d_velocity_d_gyro,
            &self.d_position_d_accel,
            &self.d_position_d_gyro,
        ]
        .iter()
        .all(|m| m.iter().all(|v| v.is_finite()))
    }
}

/// Navigation state: attitude, position and velocity in the world frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NavState {
    pub rotation: SO3,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl NavState {
    pub fn new(rotation: SO3, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            rotation,
            position,
            velocity,
        }
    }
}

/// Rotation, velocity and position deltas computed under a reference bias.
#[derive(Debug, Clone, PartialEq)]
pub struct PreintegratedDelta {
    rotation: SO3,
    velocity: Vector3<f64>,
    position: Vector3<f64>,
    delta_time: f64,
    reference_bias: ImuBias,
    jacobians: BiasJacobians,
    covariance: PreintegrationCovariance,
}

impl PreintegratedDelta {
    /// Wrap an existing summary. The measurement covariance starts at zero.
    pub fn new(
        rotation: SO3,
        velocity: Vector3<f64>,
        position: Vector3<f64>,
        delta_time: f64,
        reference_bias: ImuBias,
        jacobians: BiasJacobians,
    ) -> ImuResult<Self> {
        if !rotation.is_valid(1e-6) {
            return Err(ImuError::NonFiniteValue("rotation delta"));
        }
        if !velocity.iter().chain(position.iter()).all(|v| v.is_finite()) {
            return Err(ImuError::NonFiniteValue("velocity/position delta"));
        }
        if !delta_time.is_finite() {
            return Err(ImuError::NonFiniteValue("delta time"));
        }
        if delta_time < 0.0 {
            return Err(ImuError::NegativeDeltaTime(delta_time));
        }
        if !reference_bias.is_finite() {
            return Err(ImuError::NonFiniteValue("reference bias"));
        }
        if !jacobians.is_finite() {
            return Err(ImuError::NonFiniteValue("bias jacobians"));
        }

        Ok(Self {
            rotation,
            velocity,
            position,
            delta_time,
            reference_bias,
            jacobians,
            covariance: PreintegrationCovariance::zeros(),
        })
    }

    /// Summary of an empty interval: identity motion under `reference_bias`.
    pub fn identity(reference_bias: ImuBias) -> Self {
        Self {
            rotation: SO3::identity(),
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            delta_time: 0.0,
            reference_bias,
            jacobians: BiasJacobians::zeros(),
            covariance: PreintegrationCovariance::zeros(),
        }
    }

    /// Attach the 9×9 measurement covariance, ordered `[rotation, velocity, position]`.
    pub fn with_covariance(mut self, covariance: PreintegrationCovariance) -> ImuResult<Self> {
        if !covariance.iter().all(|v| v.is_finite()) {
            return Err(ImuError::NonFiniteValue("covariance"));
        }
        self.covariance = covariance;
        Ok(self)
    }

    pub fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    pub fn velocity(&self) -> &Vector3<f64> {
        &self.velocity
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn reference_bias(&self) -> &ImuBias {
        &self.reference_bias
    }

    pub fn jacobians(&self) -> &BiasJacobians {
        &self.jacobians
    }

    pub fn covariance(&self) -> &PreintegrationCovariance {
        &self.covariance
    }

    /// `bias - reference_bias`.
    pub fn bias_drift(&self, bias: &ImuBias) -> ImuBias {
        *bias - self.reference_bias
    }

    /// Whether `bias` has drifted outside `window` around the reference bias.
    pub fn exceeds_validity(&self, bias: &ImuBias, window: &BiasValidityWindow) -> bool {
        window.is_exceeded_by(&self.bias_drift(bias))
    }

    /// Propagate `state_i` over the interval using the bias-corrected delta.
    ///
    /// ```text
    /// R_j = R_i · ΔR
    /// p_j = p_i + v_i·Δt + ½·g·Δt² + R_i · Δp
    /// v_j = v_i + g·Δt + R_i · Δv
    /// ```
    pub fn predict(&self, state_i: &NavState, bias: &ImuBias, gravity: &Vector3<f64>) -> NavState {
        let corrected = corrected_delta(self, bias);
        let dt = self.delta_time;

        NavState {
            rotation: state_i.rotation.compose(&corrected.rotation, None, None),
            position: state_i.position
                + state_i.velocity * dt
                + gravity * (0.5 * dt * dt)
                + state_i.rotation.act(&corrected.position, None, None),
            velocity: state_i.velocity
                + gravity * dt
                + state_i.rotation.act(&corrected.velocity, None, None),
        }
    }
}
