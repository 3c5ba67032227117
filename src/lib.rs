//! Visual-inertial factor building blocks.
//!
//! - [`factors::InverseDepthFactor`]: two-view reprojection of an inverse-depth
//!   landmark through a body-mounted camera, with analytic Jacobians.
//! - [`imu::corrected_delta`] / [`imu::corrected_delta_with_jacobian`]:
//!   first-order bias correction of a preintegrated IMU delta.
//!
//! Both are pure functions of their inputs and can be evaluated concurrently.
//! The optimizer, the value container and raw IMU integration live elsewhere.

pub mod camera;
pub mod error;
pub mod factors;
pub mod imu;
pub mod logger;
pub mod manifold;

pub use error::{VioError, VioResult};
pub use logger::{init_logger, init_logger_with_level};
