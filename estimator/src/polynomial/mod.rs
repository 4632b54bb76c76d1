//! Polynomials in the monomial or Chebyshev basis and their homomorphic
//! evaluation with the Paterson-Stockmeyer algorithm.

mod evaluator;
mod power_basis;
mod simulator;

pub use power_basis::PowerBasis;
pub use simulator::{PatersonStockmeyer, SimEvaluator, SimOperand, SimPowerBasis, paterson_stockmeyer};

use backend::{Complex, Float, bits_len, complex_zero, is_pow2, pi};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basis {
    Monomial,
    /// Chebyshev polynomials of the first kind on [a, b].
    Chebyshev,
}

#[derive(Clone, Debug)]
pub struct Polynomial {
    pub basis: Basis,
    pub coeffs: Vec<Complex>,
    pub a: Float,
    pub b: Float,
    /// The polynomial may contain odd terms.
    pub is_odd: bool,
    /// The polynomial may contain even terms.
    pub is_even: bool,
    /// Leading part of a Paterson-Stockmeyer decomposition.
    pub lead: bool,
    pub max_deg: usize,
    /// Intermediate powers are left unrelinearized when possible.
    pub lazy: bool,
    pub level: usize,
    pub scale: Float,
}

impl Polynomial {
    /// Creates a polynomial on [-1, 1] with both parities.
    pub fn new(basis: Basis, coeffs: Vec<Complex>) -> Self {
        let prec: u32 = coeffs.first().map(|c| c.prec().0).unwrap_or(backend::DEFAULT_PREC);
        let max_deg: usize = coeffs.len().saturating_sub(1);
        Self {
            basis,
            coeffs,
            a: Float::with_val(prec, -1),
            b: Float::with_val(prec, 1),
            is_odd: true,
            is_even: true,
            lead: true,
            max_deg,
            lazy: false,
            level: 0,
            scale: Float::with_val(prec, 1),
        }
    }

    pub fn with_interval(mut self, a: Float, b: Float) -> Self {
        self.a = a;
        self.b = b;
        self
    }

    pub fn with_parity(mut self, is_odd: bool, is_even: bool) -> Self {
        self.is_odd = is_odd;
        self.is_even = is_even;
        self
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Multiplicative depth of the evaluation.
    pub fn depth(&self) -> usize {
        bits_len(self.degree())
    }

    fn prec(&self) -> u32 {
        self.a.prec()
    }

    /// Returns (2/(b-a), -(a+b)/(b-a)), the affine map from [a, b] to [-1, 1].
    pub fn change_of_basis(&self) -> (Float, Float) {
        let prec: u32 = self.prec();
        let width: Float = Float::with_val(prec, &self.b - &self.a);
        let scalar: Float = Float::with_val(prec, 2) / &width;
        let constant: Float = -(Float::with_val(prec, &self.a + &self.b) / &width);
        (scalar, constant)
    }

    /// Plaintext evaluation, including the change of variable of the Chebyshev basis.
    pub fn evaluate(&self, x: &Complex) -> Complex {
        let prec: u32 = self.prec();
        let mut acc: Complex = complex_zero(prec);

        match self.basis {
            Basis::Monomial => {
                self.coeffs.iter().rev().for_each(|c| {
                    acc *= x;
                    acc += c;
                });
            }
            Basis::Chebyshev => {
                let (scalar, constant) = self.change_of_basis();
                let mut u: Complex = Complex::with_val(prec, x);
                backend::mul_complex_float(&mut u, &scalar);
                *u.mut_real() += &constant;

                let mut t0: Complex = Complex::with_val(prec, (1, 0));
                let mut t1: Complex = u.clone();
                self.coeffs.iter().enumerate().for_each(|(i, c)| {
                    match i {
                        0 => acc += Complex::with_val(prec, c * &t0),
                        1 => acc += Complex::with_val(prec, c * &t1),
                        _ => {
                            let mut t2: Complex = Complex::with_val(prec, &u * &t1);
                            t2 *= 2;
                            t2 -= &t0;
                            acc += Complex::with_val(prec, c * &t2);
                            t0 = std::mem::replace(&mut t1, t2);
                        }
                    }
                });
            }
        }

        acc
    }

    /// Splits p = X^n * q + r with deg(r) < n, for degree/2 < n <= degree.
    ///
    /// In the Chebyshev basis X^n stands for T_n and T_{n+j} = 2 T_n T_j - T_{n-j}.
    pub fn factorize(&self, n: usize) -> (Polynomial, Polynomial) {
        let degree: usize = self.degree();
        debug_assert!(n <= degree && degree < 2 * n, "invalid split {n} of degree {degree}");

        let mut r: Vec<Complex> = self.coeffs[..n].to_vec();
        let mut q: Vec<Complex> = self.coeffs[n..].to_vec();

        if self.basis == Basis::Chebyshev {
            (n + 1..degree + 1).for_each(|i| {
                q[i - n] *= 2;
                r[2 * n - i] -= &self.coeffs[i];
            });
        }

        let mut pq: Polynomial = self.clone();
        pq.coeffs = q;
        pq.max_deg = self.max_deg;

        let mut pr: Polynomial = self.clone();
        pr.coeffs = r;
        pr.lead = false;
        pr.max_deg = if self.max_deg == degree {
            n - 1
        } else {
            self.max_deg.saturating_sub(degree - n + 1)
        };

        (pq, pr)
    }
}

/// Chebyshev interpolant of f on [a, b] at the degree+1 Chebyshev nodes.
pub fn chebyshev_approximation<F>(f: F, a: &Float, b: &Float, degree: usize, prec: u32) -> Polynomial
where
    F: Fn(&Float) -> Float,
{
    let nodes: usize = degree + 1;

    let half_width: Float = Float::with_val(prec, b - a) / 2u32;
    let center: Float = Float::with_val(prec, a + b) / 2u32;

    // theta_k = pi * (k + 1/2) / nodes
    let theta: Vec<Float> = (0..nodes)
        .map(|k| {
            let mut t: Float = pi(prec);
            t *= Float::with_val(prec, k as f64 + 0.5);
            t /= nodes as u64;
            t
        })
        .collect();

    let fx: Vec<Float> = theta
        .iter()
        .map(|t| {
            let u: Float = Float::with_val(prec, t.cos_ref());
            let x: Float = Float::with_val(prec, &half_width * &u) + &center;
            f(&x)
        })
        .collect();

    let coeffs: Vec<Complex> = (0..nodes)
        .map(|j| {
            let mut c: Float = theta.iter().zip(fx.iter()).fold(Float::new(prec), |acc, (t, y)| {
                let tj: Float = Float::with_val(prec, t * j as u64).cos();
                acc + tj * y
            });
            c *= 2u32;
            c /= nodes as u64;
            if j == 0 {
                c /= 2u32;
            }
            Complex::with_val(prec, (c, 0))
        })
        .collect();

    Polynomial::new(Basis::Chebyshev, coeffs).with_interval(a.clone(), b.clone())
}

/// Returns (a, b) with a + b = n used to build X^n from X^a * X^b.
pub fn split_degree(n: usize) -> (usize, usize) {
    if is_pow2(n) {
        (n >> 1, n >> 1)
    } else {
        let k: usize = bits_len(n) - 1;
        ((1 << k) - 1, n + 1 - (1 << k))
    }
}

/// Baby-step exponent minimizing the number of non-scalar products.
pub fn optimal_split(log_degree: usize) -> usize {
    if log_degree == 0 {
        return 0;
    }
    let ld: i64 = log_degree as i64;
    let mut ls: i64 = ld >> 1;
    let a: i64 = (1 << ls) + (1 << (ld - ls)) + ld - ls - 3;
    let b: i64 = (1 << (ls + 1)) + (1 << (ld - ls - 1)) + ld - ls - 4;
    if a > b {
        ls += 1;
    }
    ls as usize
}
