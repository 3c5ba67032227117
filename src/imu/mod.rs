//! Inertial preintegration summaries and their first-order bias correction.
//!
//! A [`PreintegratedDelta`] is built once from raw gyro/accel samples under a
//! reference bias. When the optimizer later moves the bias estimate, the
//! summary is corrected to first order through its stored bias Jacobians
//! instead of being re-integrated. The correction is only trustworthy while
//! the bias stays close to the reference; callers decide when to re-integrate
//! (see [`BiasValidityWindow`]).

use thiserror::Error;

pub mod bias;
pub mod bias_correction;
pub mod preintegration;

pub use bias::ImuBias;
pub use bias_correction::{
    BiasCorrectionConfig, BiasCorrector, BiasJacobian, BiasValidityWindow, CorrectedDelta,
    corrected_delta, corrected_delta_with_jacobian,
};
pub use preintegration::{BiasJacobians, NavState, PreintegratedDelta, PreintegrationCovariance};

/// Errors raised while building inertial summaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImuError {
    #[error("Non-finite value in {0}")]
    NonFiniteValue(&'static str),

    #[error("Preintegration interval must be non-negative, got {0}")]
    NegativeDeltaTime(f64),

    #[error("Invalid bias validity window: {0}")]
    InvalidValidityWindow(String),
}

pub type ImuResult<T> = Result<T, ImuError>;
