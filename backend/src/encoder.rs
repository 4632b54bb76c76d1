use rug::{Complex, Float};

use crate::float::{is_pow2, pi};
use crate::slots::bit_reverse_inplace;

/// Canonical embedding of Z[X]/(X^N + 1) on N/2 complex slots.
///
/// [Encoder::fft] maps a ring element, with its coefficients packed as
/// `(c[j], c[j + N/2])` pairs, to its slot values and [Encoder::ifft] is its
/// inverse. Both operate on any power-of-two number of slots up to N/2, in
/// which case the ring element lives in the sub-ring Z[X^(N/(2 slots))].
pub struct Encoder {
    m: usize,
    prec: u32,
    roots: Vec<Complex>,
    rot_group: Vec<usize>,
}

impl Encoder {
    pub fn new(n: usize, prec: u32) -> Self {
        assert!(is_pow2(n) && n >= 2, "n must be a power of two greater than one but is {n}");

        let m: usize = n << 1;

        let two_pi: Float = pi(prec) * 2u32;

        let roots: Vec<Complex> = (0..m + 1)
            .map(|k| {
                let mut angle: Float = two_pi.clone();
                angle *= k as u64;
                angle /= m as u64;
                let cos: Float = Float::with_val(prec, angle.cos_ref());
                let sin: Float = Float::with_val(prec, angle.sin_ref());
                Complex::with_val(prec, (cos, sin))
            })
            .collect();

        let mut rot_group: Vec<usize> = vec![1; n >> 1];
        (1..n >> 1).for_each(|i| rot_group[i] = (rot_group[i - 1] * 5) & (m - 1));

        Self {
            m,
            prec,
            roots,
            rot_group,
        }
    }

    pub fn n(&self) -> usize {
        self.m >> 1
    }

    pub fn max_slots(&self) -> usize {
        self.m >> 2
    }

    pub fn prec(&self) -> u32 {
        self.prec
    }

    /// Returns exp(2*pi*i*k/2N).
    pub fn root(&self, k: usize) -> &Complex {
        &self.roots[k % self.m]
    }

    /// Ring -> slots on the first 2^log_slots values.
    pub fn fft(&self, values: &mut [Complex], log_slots: usize) {
        let slots: usize = 1 << log_slots;
        self.check(values.len(), slots);

        let values: &mut [Complex] = &mut values[..slots];

        bit_reverse_inplace(values);

        let mut len: usize = 2;
        while len <= slots {
            let lenh: usize = len >> 1;
            let lenq: usize = len << 2;
            let gap: usize = self.m / lenq;
            (0..slots).step_by(len).for_each(|i| {
                (0..lenh).for_each(|j| {
                    let idx: usize = (self.rot_group[j] & (lenq - 1)) * gap;
                    let mut v: Complex = values[i + j + lenh].clone();
                    v *= &self.roots[idx];
                    let u: Complex = values[i + j].clone();
                    values[i + j] += &v;
                    values[i + j + lenh] = u - v;
                })
            });
            len <<= 1;
        }
    }

    /// Slots -> ring on the first 2^log_slots values, including the division by 2^log_slots.
    pub fn ifft(&self, values: &mut [Complex], log_slots: usize) {
        let slots: usize = 1 << log_slots;
        self.check(values.len(), slots);

        let values: &mut [Complex] = &mut values[..slots];

        let mut len: usize = slots;
        while len > 1 {
            let lenh: usize = len >> 1;
            let lenq: usize = len << 2;
            let gap: usize = self.m / lenq;
            (0..slots).step_by(len).for_each(|i| {
                (0..lenh).for_each(|j| {
                    let idx: usize = (lenq - (self.rot_group[j] & (lenq - 1))) * gap;
                    let a: Complex = values[i + j].clone();
                    let b: Complex = values[i + j + lenh].clone();
                    values[i + j] += &b;
                    let mut v: Complex = a - b;
                    v *= &self.roots[idx];
                    values[i + j + lenh] = v;
                })
            });
            len >>= 1;
        }

        let n: Float = Float::with_val(self.prec, slots as u64);
        values.iter_mut().for_each(|x| {
            *x.mut_real() /= &n;
            *x.mut_imag() /= &n;
        });

        bit_reverse_inplace(values);
    }

    fn check(&self, len: usize, slots: usize) {
        assert!(
            slots <= self.max_slots(),
            "slots={slots} exceeds max_slots={}",
            self.max_slots()
        );
        assert!(len >= slots, "len={len} < slots={slots}");
    }
}
