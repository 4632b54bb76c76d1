use rug::{Complex, Float};

use crate::float::{div_complex_float, mul_complex_float};

/// a[i] += b[i]
pub fn slots_add_inplace(a: &mut [Complex], b: &[Complex]) {
    debug_assert_eq!(a.len(), b.len());
    a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x += y);
}

/// a[i] -= b[i]
pub fn slots_sub_inplace(a: &mut [Complex], b: &[Complex]) {
    debug_assert_eq!(a.len(), b.len());
    a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x -= y);
}

/// a[i] *= b[i]
pub fn slots_mul_inplace(a: &mut [Complex], b: &[Complex]) {
    debug_assert_eq!(a.len(), b.len());
    a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x *= y);
}

/// acc[i] += a[i] * b[i]
pub fn slots_mul_add(acc: &mut [Complex], a: &[Complex], b: &[Complex]) {
    debug_assert_eq!(acc.len(), a.len());
    debug_assert_eq!(acc.len(), b.len());
    acc.iter_mut()
        .zip(a.iter().zip(b.iter()))
        .for_each(|(z, (x, y))| *z += Complex::with_val(z.prec(), x * y));
}

/// a[i] *= c
pub fn slots_mul_complex(a: &mut [Complex], c: &Complex) {
    a.iter_mut().for_each(|x| *x *= c);
}

/// a[i] *= f
pub fn slots_mul_float(a: &mut [Complex], f: &Float) {
    a.iter_mut().for_each(|x| mul_complex_float(x, f));
}

/// a[i] /= f
pub fn slots_div_float(a: &mut [Complex], f: &Float) {
    a.iter_mut().for_each(|x| div_complex_float(x, f));
}

pub fn slots_conjugate_inplace(a: &mut [Complex]) {
    a.iter_mut().for_each(|x| x.conj_mut());
}

/// a[i] *= i
pub fn slots_mul_i_inplace(a: &mut [Complex]) {
    a.iter_mut().for_each(|x| x.mul_i_mut(false));
}

/// Cyclic left rotation: a[i] <- a[(i + k) mod n].
pub fn slots_rotate_inplace(a: &mut [Complex], k: usize) {
    let n: usize = a.len();
    if n != 0 {
        a.rotate_left(k % n);
    }
}

/// Returns the cyclic left rotation of a by k.
pub fn slots_rotate(a: &[Complex], k: usize) -> Vec<Complex> {
    let mut b: Vec<Complex> = a.to_vec();
    slots_rotate_inplace(&mut b, k);
    b
}

/// Returns values repeated periodically up to length n.
pub fn slots_replicate(values: &[Complex], n: usize) -> Vec<Complex> {
    assert!(!values.is_empty() && n % values.len() == 0, "cannot replicate {} values over {n} slots", values.len());
    values.iter().cycle().take(n).cloned().collect()
}

pub fn bit_reverse_inplace<T>(a: &mut [T]) {
    let n: usize = a.len();
    let mut j: usize = 0;
    (1..n).for_each(|i| {
        let mut bit: usize = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            a.swap(i, j);
        }
    });
}
