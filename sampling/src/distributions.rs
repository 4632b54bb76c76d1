use rand_core::RngCore;
use rand_distr::{Distribution, Normal, NormalError};

use crate::source::Source;

/// Scalar distributions used to draw ring coefficients.
pub enum Distributions {
    /// Uniform over [min, max).
    Uniform(f64, f64),
    /// Centered Gaussian, resampled while |x| > bound.
    Normal(Normal<f64>, f64),
    /// {-1, 0, 1} with P(x != 0) = prob and equiprobable signs.
    Ternary(f64),
    /// floor(sum of h+1 samples of U(0, 1)) - floor(h/2).
    IrwinHall(usize),
}

impl Distributions {
    /// Rounding error of a real number to the nearest integer.
    pub fn rounding() -> Self {
        Distributions::Uniform(-0.5, 0.5)
    }

    pub fn normal(sigma: f64, bound: f64) -> Result<Self, NormalError> {
        Ok(Distributions::Normal(Normal::new(0.0, sigma)?, bound))
    }

    pub fn sample(&self, source: &mut Source) -> f64 {
        match self {
            Distributions::Uniform(min, max) => source.next_f64(*min, *max),
            Distributions::Normal(normal, bound) => {
                let mut x: f64 = normal.sample(source);
                while x.abs() > *bound {
                    x = normal.sample(source);
                }
                x
            }
            Distributions::Ternary(prob) => {
                if source.next_f64(0.0, 1.0) < *prob {
                    if source.next_u32() & 1 == 0 { 1.0 } else { -1.0 }
                } else {
                    0.0
                }
            }
            Distributions::IrwinHall(h) => {
                let d: f64 = (0..*h + 1).map(|_| source.next_f64(0.0, 1.0)).sum();
                d.floor() - (h >> 1) as f64
            }
        }
    }
}
