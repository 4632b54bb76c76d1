use rug::float::Constant;
use rug::{Complex, Float};

/// Default arithmetic precision (bits) of slot values, moduli and scales.
pub const DEFAULT_PREC: u32 = 128;

pub fn float(prec: u32, x: f64) -> Float {
    Float::with_val(prec, x)
}

pub fn complex(prec: u32, re: f64, im: f64) -> Complex {
    Complex::with_val(prec, (re, im))
}

pub fn complex_zero(prec: u32) -> Complex {
    Complex::new(prec)
}

pub fn complex_zeros(prec: u32, n: usize) -> Vec<Complex> {
    vec![Complex::new(prec); n]
}

pub fn pi(prec: u32) -> Float {
    Float::with_val(prec, Constant::Pi)
}

/// Returns the number of bits needed to represent x (0 for x = 0).
pub fn bits_len(x: usize) -> usize {
    (usize::BITS - x.leading_zeros()) as usize
}

pub fn is_pow2(x: usize) -> bool {
    x != 0 && x & (x - 1) == 0
}

/// Rounds both components to the nearest integer (ties away from zero).
pub fn round_complex(c: &mut Complex) {
    c.mut_real().round_mut();
    c.mut_imag().round_mut();
}

pub fn is_gaussian_integer(c: &Complex) -> bool {
    c.real().is_integer() && c.imag().is_integer()
}

pub fn mul_complex_float(c: &mut Complex, f: &Float) {
    *c.mut_real() *= f;
    *c.mut_imag() *= f;
}

pub fn div_complex_float(c: &mut Complex, f: &Float) {
    *c.mut_real() /= f;
    *c.mut_imag() /= f;
}

/// Returns (re, im) as f64.
pub fn complex_to_f64(c: &Complex) -> (f64, f64) {
    (c.real().to_f64(), c.imag().to_f64())
}

/// Returns |a - b| / max(|a|, |b|) on the real line, used to compare scales.
pub fn relative_distance(a: &Float, b: &Float) -> f64 {
    let prec: u32 = a.prec().max(b.prec());
    let diff: Float = Float::with_val(prec, a - b).abs();
    let norm: Float = Float::with_val(prec, a.abs_ref()).max(&Float::with_val(prec, b.abs_ref()));
    if norm.is_zero() {
        return 0.0;
    }
    Float::with_val(prec, diff / norm).to_f64()
}

/// Returns 2^e.
pub fn pow2(prec: u32, e: i32) -> Float {
    let mut f: Float = Float::with_val(prec, 1);
    f <<= e;
    f
}

/// Returns round(log2(x)) for x > 0.
pub fn log2_round(x: &Float) -> i32 {
    let l: Float = Float::with_val(x.prec(), x.log2_ref());
    l.to_f64().round() as i32
}
