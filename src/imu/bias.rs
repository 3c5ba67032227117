use nalgebra::{Vector3, Vector6};
use std::ops::{Add, Sub};

/// Gyroscope and accelerometer biases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuBias {
    pub gyro: Vector3<f64>,
    pub accel: Vector3<f64>,
}

impl ImuBias {
    pub fn new(gyro: Vector3<f64>, accel: Vector3<f64>) -> Self {
        Self { gyro, accel }
    }

    pub fn zero() -> Self {
        Self {
            gyro: Vector3::zeros(),
            accel: Vector3::zeros(),
        }
    }

    /// Stacked as `[gyro; accel]`, matching the bias Jacobian column order.
    pub fn to_vector(&self) -> Vector6<f64> {
        let mut v = Vector6::zeros();
        v.fixed_rows_mut::<3>(0).copy_from(&self.gyro);
        v.fixed_rows_mut::<3>(3).copy_from(&self.accel);
        v
    }

    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self {
            gyro: v.fixed_rows::<3>(0).into_owned(),
            accel: v.fixed_rows::<3>(3).into_owned(),
        }
    }

    /// Euclidean norms `(‖gyro‖, ‖accel‖)`.
    pub fn norms(&self) -> (f64, f64) {
        (self.gyro.norm(), self.accel.norm())
    }

    pub fn is_finite(&self) -> bool {
        self.gyro.iter().chain(self.accel.iter()).all(|v| v.is_finite())
    }
}

impl Default for ImuBias {
    fn default() -> Self {
        Self::zero()
    }
}

impl Sub for ImuBias {
    type Output = ImuBias;

    fn sub(self, rhs: ImuBias) -> ImuBias {
        ImuBias {
            gyro: self.gyro - rhs.gyro,
            accel: self.accel - rhs.accel,
        }
    }
}

impl Add for ImuBias {
    type Output = ImuBias;

    fn add(self, rhs: ImuBias) -> ImuBias {
        ImuBias {
            gyro: self.gyro + rhs.gyro,
            accel: self.accel + rhs.accel,
        }
    }
}
