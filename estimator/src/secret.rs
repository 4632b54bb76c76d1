use backend::{Complex, complex_zeros};
use sampling::source::Source;

use crate::error::{Result, config, precondition};
use crate::parameters::Parameters;

/// Canonical image of a ternary secret and of its square.
///
/// The secret itself is never used to decrypt anything: the simulator only needs
/// its slot values to shape the error terms that multiply s or s^2.
#[derive(Clone, Debug)]
pub struct SecretKeyProxy {
    weight: usize,
    s: Vec<Complex>,
    s2: Vec<Complex>,
}

impl SecretKeyProxy {
    pub fn zero(prec: u32, slots: usize) -> Self {
        Self {
            weight: 0,
            s: complex_zeros(prec, slots),
            s2: complex_zeros(prec, slots),
        }
    }

    /// Samples `weight` nonzero coefficients among N, with alternating signs.
    pub fn sample(params: &Parameters, weight: usize, source: &mut Source) -> Result<Self> {
        let n: usize = params.n();
        let prec: u32 = params.prec();

        if weight > n {
            return config(format!("secret weight {weight} > N={n}"));
        }

        if weight == 0 {
            return Ok(Self::zero(prec, n >> 1));
        }

        // Partial Fisher-Yates.
        let mut positions: Vec<usize> = (0..n).collect();
        let mut coeffs: Vec<i8> = vec![0; n];
        (0..weight).for_each(|i| {
            let j: usize = i + source.next_usize(n - i);
            positions.swap(i, j);
            coeffs[positions[i]] = if i & 1 == 0 { 1 } else { -1 };
        });

        let half: usize = n >> 1;
        let mut s: Vec<Complex> = (0..half)
            .map(|j| Complex::with_val(prec, (coeffs[j], coeffs[j + half])))
            .collect();

        params.encoder().fft(&mut s, params.log_max_slots());

        let s2: Vec<Complex> = s.iter().map(|x| Complex::with_val(prec, x.square_ref())).collect();

        Ok(Self { weight, s, s2 })
    }

    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn s(&self) -> &[Complex] {
        &self.s
    }

    pub fn s2(&self) -> &[Complex] {
        &self.s2
    }

    /// Returns s^i for i in {1, 2}.
    pub fn pow(&self, i: usize) -> Result<&[Complex]> {
        match i {
            1 => Ok(&self.s),
            2 => Ok(&self.s2),
            _ => precondition(format!("secret power {i} is not tracked")),
        }
    }
}
