//! Integration test for first-order bias correction
//!
//! Raw samples are integrated once under a reference bias, then corrected to
//! a nearby bias. The corrected delta is compared against re-integrating the
//! same samples under the new bias: the gap must shrink quadratically with the
//! bias change.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use nalgebra::Vector3;
use vio_factors::imu::{
    BiasCorrectionConfig, BiasCorrector, BiasValidityWindow, CorrectedDelta, ImuBias,
    PreintegratedDelta, corrected_delta, corrected_delta_with_jacobian,
};
use vio_factors::manifold::LieGroup;

mod common;
use common::{ImuSample, integrate_samples, synthetic_imu_samples};

const DT: f64 = 0.005;
const SAMPLE_COUNT: usize = 200;

fn reference_bias() -> ImuBias {
    ImuBias::new(
        Vector3::new(0.01, -0.02, 0.015),
        Vector3::new(0.1, 0.05, -0.08),
    )
}

/// Fixed mixed gyro/accel direction of bias change.
fn bias_direction() -> ImuBias {
    ImuBias::new(Vector3::new(0.6, -0.3, 0.8), Vector3::new(-0.5, 0.9, 0.4))
}

fn scaled_bias(scale: f64) -> ImuBias {
    let direction = bias_direction();
    ImuBias::new(
        reference_bias().gyro + direction.gyro * scale,
        reference_bias().accel + direction.accel * scale,
    )
}

fn gap(corrected: &CorrectedDelta, direct: &PreintegratedDelta) -> f64 {
    let rotation = corrected
        .rotation
        .right_minus(direct.rotation(), None, None)
        .angle();
    rotation
        + (corrected.velocity - direct.velocity()).norm()
        + (corrected.position - direct.position()).norm()
}

fn setup() -> (Vec<ImuSample>, PreintegratedDelta) {
    let samples = synthetic_imu_samples(SAMPLE_COUNT, DT);
    let delta = integrate_samples(&samples, DT, &reference_bias()).expect("integration");
    (samples, delta)
}

#[test]
fn test_correction_at_reference_bias_matches_integration() {
    let (samples, delta) = setup();
    let corrected = corrected_delta(&delta, &reference_bias());
    let direct = integrate_samples(&samples, DT, &reference_bias()).expect("integration");

    assert_eq!(corrected.rotation, *direct.rotation());
    assert_eq!(corrected.velocity, *direct.velocity());
    assert_eq!(corrected.position, *direct.position());
}

#[test]
fn test_correction_error_shrinks_quadratically() {
    let (samples, delta) = setup();

    let errors: Vec<f64> = [1e-2, 1e-3, 1e-4]
        .iter()
        .map(|&scale| {
            let bias = scaled_bias(scale);
            let corrected = corrected_delta(&delta, &bias);
            let direct = integrate_samples(&samples, DT, &bias).expect("integration");
            gap(&corrected, &direct)
        })
        .collect();

    assert!(errors[0] > 0.0);
    assert!(
        errors[1] < errors[0] / 30.0,
        "errors {:e} -> {:e} are not quadratic",
        errors[0],
        errors[1]
    );
    assert!(errors[2] < 1e-6, "error at 1e-4: {:e}", errors[2]);
}

#[test]
fn test_correction_beats_stale_delta() {
    let (samples, delta) = setup();
    let bias = scaled_bias(1e-2);
    let direct = integrate_samples(&samples, DT, &bias).expect("integration");

    let stale = CorrectedDelta {
        rotation: delta.rotation().clone(),
        velocity: *delta.velocity(),
        position: *delta.position(),
    };
    let corrected = corrected_delta(&delta, &bias);
    assert!(gap(&corrected, &direct) < 0.05 * gap(&stale, &direct));
}

#[test]
fn test_jacobian_variant_agrees_with_plain_correction() {
    let (_, delta) = setup();
    let bias = scaled_bias(1e-2);

    let plain = corrected_delta(&delta, &bias);
    let (with_jacobian, jacobian) = corrected_delta_with_jacobian(&delta, &bias);
    assert_eq!(plain, with_jacobian);

    assert_eq!((jacobian.nrows(), jacobian.ncols()), (9, 6));
    assert_eq!(jacobian.fixed_view::<3, 3>(0, 3).norm(), 0.0);
    assert_eq!(
        jacobian.fixed_view::<3, 3>(3, 3).into_owned(),
        delta.jacobians().d_velocity_d_accel
    );
    assert_eq!(
        jacobian.fixed_view::<3, 3>(6, 3).into_owned(),
        delta.jacobians().d_position_d_accel
    );
}

#[test]
fn test_corrector_flags_large_drift_without_failing() {
    let (samples, delta) = setup();
    let window = BiasValidityWindow::new(0.05, 0.5).expect("window");
    let corrector = BiasCorrector::new(BiasCorrectionConfig::new().with_validity_window(window));

    let small = scaled_bias(1e-3);
    assert!(!corrector.is_stale(&delta, &small));

    let large = scaled_bias(0.5);
    assert!(corrector.is_stale(&delta, &large));
    let corrected = corrector.correct(&delta, &large);
    let direct = integrate_samples(&samples, DT, &large).expect("integration");
    assert!(corrected.velocity.iter().all(|v| v.is_finite()));
    assert!(gap(&corrected, &direct).is_finite());
}
