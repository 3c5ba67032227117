//! Shared utilities for integration tests.
//!
//! - A minimal dense Levenberg-Marquardt loop over SE(3) poses and scalars,
//!   driven purely through the [`Factor`] trait.
//! - A strong pose prior used to pin poses, standing in for equality constraints.
//! - A raw IMU integrator producing a [`PreintegratedDelta`] with exact bias
//!   Jacobians, used as ground truth for the bias correction.

#![allow(dead_code)]

use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector6};
use std::collections::BTreeMap;
use vio_factors::factors::{Factor, FactorError, FactorResult, Key};
use vio_factors::imu::{BiasJacobians, ImuBias, ImuResult, PreintegratedDelta};
use vio_factors::manifold::se3::{SE3, SE3Tangent};
use vio_factors::manifold::so3::{SO3, SO3Tangent};
use vio_factors::manifold::{LieGroup, Tangent, skew};

/// Variable stored in [`Values`].
#[derive(Debug, Clone)]
pub enum Variable {
    Pose(SE3),
    Scalar(f64),
}

impl Variable {
    fn dof(&self) -> usize {
        match self {
            Variable::Pose(_) => 6,
            Variable::Scalar(_) => 1,
        }
    }

    fn to_param(&self) -> DVector<f64> {
        match self {
            Variable::Pose(pose) => DVector::from(pose),
            Variable::Scalar(value) => DVector::from_vec(vec![*value]),
        }
    }

    fn retract(&self, delta: &[f64]) -> Variable {
        match self {
            Variable::Pose(pose) => {
                let tangent = SE3Tangent::from_vector(Vector6::from_column_slice(delta));
                Variable::Pose(pose.plus(&tangent, None, None))
            }
            Variable::Scalar(value) => Variable::Scalar(value + delta[0]),
        }
    }
}

/// Ordered key → variable container.
#[derive(Debug, Clone, Default)]
pub struct Values {
    variables: BTreeMap<Key, Variable>,
}

impl Values {
    pub fn insert_pose(&mut self, key: Key, pose: SE3) {
        self.variables.insert(key, Variable::Pose(pose));
    }

    pub fn insert_scalar(&mut self, key: Key, value: f64) {
        self.variables.insert(key, Variable::Scalar(value));
    }

    pub fn pose(&self, key: Key) -> Option<&SE3> {
        match self.variables.get(&key) {
            Some(Variable::Pose(pose)) => Some(pose),
            _ => None,
        }
    }

    pub fn scalar(&self, key: Key) -> Option<f64> {
        match self.variables.get(&key) {
            Some(Variable::Scalar(value)) => Some(*value),
            _ => None,
        }
    }

    fn params(&self, keys: &[Key]) -> FactorResult<Vec<DVector<f64>>> {
        keys.iter()
            .map(|key| {
                self.variables
                    .get(key)
                    .map(Variable::to_param)
                    .ok_or_else(|| FactorError::InvalidParameters(format!("missing key {key}")))
            })
            .collect()
    }

    /// Column offset of every variable in the stacked tangent vector.
    fn offsets(&self) -> (BTreeMap<Key, usize>, usize) {
        let mut offsets = BTreeMap::new();
        let mut total = 0;
        for (key, variable) in &self.variables {
            offsets.insert(*key, total);
            total += variable.dof();
        }
        (offsets, total)
    }

    fn retract_all(&self, step: &DVector<f64>, offsets: &BTreeMap<Key, usize>) -> Values {
        let variables = self
            .variables
            .iter()
            .map(|(key, variable)| {
                let start = offsets[key];
                let delta = &step.as_slice()[start..start + variable.dof()];
                (*key, variable.retract(delta))
            })
            .collect();
        Values { variables }
    }
}

/// Prior pinning a pose to a fixed value with a large weight.
///
/// ```text
/// r = w · [ R̄ᵀ·(t - t̄) ; Log(R̄ᵀ·R) ]
/// ```
pub struct PosePriorFactor {
    keys: [Key; 1],
    prior: SE3,
    weight: f64,
}

impl PosePriorFactor {
    pub fn new(key: Key, prior: SE3, weight: f64) -> Self {
        Self {
            keys: [key],
            prior,
            weight,
        }
    }

    fn error(&self, pose: &SE3) -> (Vector3<f64>, SO3Tangent) {
        let prior_rot_t = self.prior.rotation_matrix().transpose();
        let translation = prior_rot_t * (pose.translation() - self.prior.translation());
        let rotation = self
            .prior
            .rotation_so3()
            .inverse(None)
            .compose(pose.rotation_so3(), None, None)
            .log(None);
        (translation, rotation)
    }
}

impl Factor for PosePriorFactor {
    fn residual(&self, params: &[DVector<f64>]) -> FactorResult<DVector<f64>> {
        let pose = SE3::try_from(&params[0])?;
        let (translation, rotation) = self.error(&pose);
        let mut r = DVector::zeros(6);
        r.fixed_rows_mut::<3>(0).copy_from(&translation);
        r.fixed_rows_mut::<3>(3).copy_from(&rotation.axis_angle());
        Ok(r * self.weight)
    }

    fn linearize(&self, params: &[DVector<f64>]) -> FactorResult<(DVector<f64>, DMatrix<f64>)> {
        let pose = SE3::try_from(&params[0])?;
        let (_, rotation) = self.error(&pose);
        let mut jac = DMatrix::zeros(6, 6);
        jac.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.prior.rotation_matrix().transpose() * pose.rotation_matrix()));
        jac.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&rotation.right_jacobian_inv());
        Ok((self.residual(params)?, jac * self.weight))
    }

    fn dimension(&self) -> usize {
        6
    }

    fn variable_keys(&self) -> &[Key] {
        &self.keys
    }
}

/// Result of [`levenberg_marquardt`].
#[derive(Debug)]
pub struct OptimizationSummary {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub iterations: usize,
}

fn total_cost(factors: &[&dyn Factor], values: &Values) -> FactorResult<f64> {
    let mut cost = 0.0;
    for factor in factors {
        let params = values.params(factor.variable_keys())?;
        cost += 0.5 * factor.residual(&params)?.norm_squared();
    }
    Ok(cost)
}

/// Dense Levenberg-Marquardt with Marquardt diagonal damping.
pub fn levenberg_marquardt(
    factors: &[&dyn Factor],
    values: &mut Values,
    max_iterations: usize,
) -> FactorResult<OptimizationSummary> {
    let (offsets, dim) = values.offsets();
    let initial_cost = total_cost(factors, values)?;
    let mut cost = initial_cost;
    let mut lambda = 1e-5;
    let mut iterations = 0;

    while iterations < max_iterations && cost > 1e-30 {
        iterations += 1;

        let mut hessian = DMatrix::<f64>::zeros(dim, dim);
        let mut gradient = DVector::<f64>::zeros(dim);
        for factor in factors {
            let keys = factor.variable_keys();
            let params = values.params(keys)?;
            let (residual, jacobian) = factor.linearize(&params)?;

            // Scatter the factor Jacobian into the global column layout.
            let mut global = DMatrix::<f64>::zeros(residual.len(), dim);
            let mut col = 0;
            for (key, param) in keys.iter().zip(&params) {
                let dof = if param.len() == 7 { 6 } else { 1 };
                global
                    .columns_mut(offsets[key], dof)
                    .copy_from(&jacobian.columns(col, dof));
                col += dof;
            }
            hessian += global.transpose() * &global;
            gradient += global.transpose() * residual;
        }

        let mut accepted = false;
        while !accepted && lambda < 1e12 {
            let mut damped = hessian.clone();
            for i in 0..dim {
                damped[(i, i)] += lambda * hessian[(i, i)].max(1e-9);
            }
            let Some(step) = damped.cholesky().map(|c| c.solve(&(-&gradient))) else {
                lambda *= 10.0;
                continue;
            };

            // Steps leaving the valid domain (e.g. negative inverse depth) are rejected.
            let candidate = values.retract_all(&step, &offsets);
            let new_cost = total_cost(factors, &candidate).unwrap_or(f64::INFINITY);
            if new_cost < cost {
                *values = candidate;
                cost = new_cost;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;
                if step.norm() < 1e-15 {
                    return Ok(OptimizationSummary {
                        initial_cost,
                        final_cost: cost,
                        iterations,
                    });
                }
            } else {
                lambda *= 10.0;
            }
        }

        if !accepted {
            break;
        }
    }

    Ok(OptimizationSummary {
        initial_cost,
        final_cost: cost,
        iterations,
    })
}

/// One raw inertial sample, bias included.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    pub gyro: Vector3<f64>,
    pub accel: Vector3<f64>,
}

/// Smoothly varying rotation and specific force over `count` samples.
pub fn synthetic_imu_samples(count: usize, dt: f64) -> Vec<ImuSample> {
    (0..count)
        .map(|k| {
            let t = k as f64 * dt;
            ImuSample {
                gyro: Vector3::new(0.3 * t.sin(), 0.5, -0.2 * (2.0 * t).cos()),
                accel: Vector3::new(1.0 + 0.5 * t.cos(), -0.4 * t, 9.81 + 0.3 * (3.0 * t).sin()),
            }
        })
        .collect()
}

/// Integrate raw samples under `bias`, tracking exact first-order bias Jacobians.
pub fn integrate_samples(
    samples: &[ImuSample],
    dt: f64,
    bias: &ImuBias,
) -> ImuResult<PreintegratedDelta> {
    let mut d_r = SO3::identity();
    let mut d_v = Vector3::zeros();
    let mut d_p = Vector3::zeros();
    let mut jac = BiasJacobians::zeros();
    let dt2 = dt * dt;

    for sample in samples {
        let omega = sample.gyro - bias.gyro;
        let accel = sample.accel - bias.accel;
        let r = d_r.rotation_matrix();
        let r_accel_skew: Matrix3<f64> = r * skew(&accel);

        d_p += d_v * dt + 0.5 * r * accel * dt2;
        d_v += r * accel * dt;

        jac.d_position_d_accel += jac.d_velocity_d_accel * dt - 0.5 * r * dt2;
        jac.d_position_d_gyro +=
            jac.d_velocity_d_gyro * dt - 0.5 * r_accel_skew * jac.d_rotation_d_gyro * dt2;
        jac.d_velocity_d_accel -= r * dt;
        jac.d_velocity_d_gyro -= r_accel_skew * jac.d_rotation_d_gyro * dt;

        let increment = SO3Tangent::new(omega * dt);
        let d_ri = increment.exp(None);
        jac.d_rotation_d_gyro = d_ri.rotation_matrix().transpose() * jac.d_rotation_d_gyro
            - increment.right_jacobian() * dt;
        d_r = d_r.compose(&d_ri, None, None);
    }

    PreintegratedDelta::new(d_r, d_v, d_p, samples.len() as f64 * dt, *bias, jac)
}
