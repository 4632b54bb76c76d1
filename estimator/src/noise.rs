//! Error samplers.
//!
//! Every sampler returns a MaxSlots-long vector of slot values. Exact samplers draw
//! ring coefficients and map them through the canonical embedding. Heuristic
//! samplers draw i.i.d. Gaussians directly in the slots with the variance the
//! embedding would produce. In noiseless mode every sampler returns zeros.

use backend::{Complex, Float, complex_zeros, float, slots_add_inplace, slots_div_float, slots_mul_add, slots_replicate};
use rand_distr::{Distribution, Normal, StandardNormal};
use sampling::distributions::Distributions;
use sampling::source::Source;

use crate::error::{Error, Result, numeric};
use crate::parameters::Parameters;
use crate::secret::SecretKeyProxy;

/// Draws N real coefficients with f, packs them as (c[j], c[j + N/2]) and maps them to the slots.
pub fn noise<F>(params: &Parameters, source: &mut Source, f: F) -> Vec<Complex>
where
    F: FnMut(&mut Source) -> Float,
{
    sparse_noise(params, source, params.log_max_slots(), f)
}

/// Same as [noise] on the sub-ring of 2^(log_slots+1) coefficients; the
/// result is replicated with period 2^log_slots.
pub fn sparse_noise<F>(params: &Parameters, source: &mut Source, log_slots: usize, mut f: F) -> Vec<Complex>
where
    F: FnMut(&mut Source) -> Float,
{
    let prec: u32 = params.prec();
    let max_slots: usize = params.max_slots();

    if params.noiseless() {
        return complex_zeros(prec, max_slots);
    }

    let slots: usize = 1 << log_slots;
    let mut values: Vec<Complex> = (0..slots)
        .map(|_| {
            let re: Float = f(source);
            let im: Float = f(source);
            Complex::with_val(prec, (re, im))
        })
        .collect();

    params.encoder().fft(&mut values, log_slots);

    if slots == max_slots {
        values
    } else {
        slots_replicate(&values, max_slots)
    }
}

/// i.i.d. Gaussian slots emulating ring coefficients of standard deviation
/// sigma mapped through the canonical embedding: std(re) = std(im) = sigma * sqrt(N/2).
pub fn canonical_gaussian(params: &Parameters, source: &mut Source, sigma: &Float) -> Vec<Complex> {
    let prec: u32 = params.prec();

    if params.noiseless() {
        return complex_zeros(prec, params.max_slots());
    }

    let mut std: Float = Float::with_val(prec, params.n() >> 1);
    std.sqrt_mut();
    std *= sigma;

    (0..params.max_slots())
        .map(|_| {
            let re: f64 = StandardNormal.sample(source);
            let im: f64 = StandardNormal.sample(source);
            Complex::with_val(prec, (Float::with_val(prec, &std * re), Float::with_val(prec, &std * im)))
        })
        .collect()
}

/// Rounding error of a ring element to the nearest integers: U(-0.5, 0.5) per coefficient.
pub fn rounding_noise(params: &Parameters, source: &mut Source) -> Vec<Complex> {
    let prec: u32 = params.prec();
    if params.heuristic() {
        return canonical_gaussian(params, source, &float(prec, (1.0f64 / 12.0).sqrt()));
    }
    let dist: Distributions = Distributions::rounding();
    noise(params, source, |s| float(prec, dist.sample(s)))
}

/// Rounding error of a plaintext packed on 2^log_slots slots.
pub fn sparse_rounding_noise(params: &Parameters, source: &mut Source, log_slots: usize) -> Vec<Complex> {
    let prec: u32 = params.prec();

    if params.heuristic() {
        let log_gap: usize = params.log_max_slots() - log_slots;
        let correction: f64 = params.sparse_packing_base().powi(log_gap as i32);
        return canonical_gaussian(params, source, &float(prec, (1.0f64 / 12.0).sqrt() / correction));
    }

    let dist: Distributions = Distributions::rounding();
    sparse_noise(params, source, log_slots, |s| float(prec, dist.sample(s)))
}

/// Centered Gaussian of standard deviation sigma, truncated at 6 sigma.
pub fn normal_noise(params: &Parameters, source: &mut Source, sigma: f64) -> Result<Vec<Complex>> {
    let prec: u32 = params.prec();

    if params.heuristic() {
        return Ok(canonical_gaussian(params, source, &float(prec, sigma)));
    }

    let dist: Distributions =
        Distributions::normal(sigma, 6.0 * sigma).map_err(|e| Error::Config(format!("sigma={sigma}: {e}")))?;

    Ok(noise(params, source, |s| float(prec, dist.sample(s))))
}

/// Returns e_ct * sk * P + sum_i e_i * p_i, where p_i are the digits of the
/// gadget decomposition (uniform over [-q_alpha_i/2, q_alpha_i/2]) and e_i the
/// errors of the switching key.
pub fn key_switching_noise_raw(
    params: &Parameters,
    source: &mut Source,
    level: usize,
    e_ct: &[Complex],
    sk: &[Complex],
) -> Result<Vec<Complex>> {
    let prec: u32 = params.prec();
    let p: &Float = params.p();

    let mut out: Vec<Complex> = e_ct
        .iter()
        .zip(sk.iter())
        .map(|(e, s)| {
            let mut t: Complex = Complex::with_val(prec, e * s);
            backend::mul_complex_float(&mut t, p);
            t
        })
        .collect();

    if params.noiseless() {
        return Ok(out);
    }

    let decomp: usize = params.decomp_rns(level);

    if params.heuristic() {
        // sigma * sqrt(N * sum(q_alpha_i^2) / 12)
        let mut std: Float = (0..decomp).fold(Float::new(prec), |acc, i| {
            let qa: Float = params.q_alpha(i, level);
            acc + qa.square()
        });
        std *= params.n() as u64;
        std /= 12u32;
        std.sqrt_mut();
        std *= params.sigma();

        if !std.is_finite() {
            return numeric(format!("non-finite key-switching deviation at level {level}"));
        }

        let e: Vec<Complex> = canonical_gaussian(params, source, &std);
        slots_add_inplace(&mut out, &e);
    } else {
        let sigma: f64 = params.sigma();
        for i in 0..decomp {
            let mut half: Float = params.q_alpha(i, level);
            half /= 2u32;
            let e: Vec<Complex> = normal_noise(params, source, sigma)?;
            let d: Vec<Complex> = noise(params, source, |s| Float::with_val(prec, &half * s.next_f64(-1.0, 1.0)));
            slots_mul_add(&mut out, &e, &d);
        }
    }

    Ok(out)
}

/// Returns (e_ct * sk * P + sum_i e_i * p_i) / P + e0 + e1 * s.
pub fn key_switching_noise(
    params: &Parameters,
    source: &mut Source,
    level: usize,
    e_ct: &[Complex],
    sk: &[Complex],
) -> Result<Vec<Complex>> {
    let mut out: Vec<Complex> = key_switching_noise_raw(params, source, level, e_ct, sk)?;
    slots_div_float(&mut out, params.p());
    add_rounding_noise(params, source, &mut out, 1)?;
    Ok(out)
}

/// values += sum_{i <= degree} e_i * s^i with e_i fresh rounding errors.
pub fn add_rounding_noise(
    params: &Parameters,
    source: &mut Source,
    values: &mut [Complex],
    degree: usize,
) -> Result<()> {
    if params.noiseless() {
        return Ok(());
    }
    let sk: &SecretKeyProxy = params.sk();
    let e0: Vec<Complex> = rounding_noise(params, source);
    slots_add_inplace(values, &e0);
    for i in 1..degree + 1 {
        let si: &[Complex] = sk.pow(i)?;
        let ei: Vec<Complex> = rounding_noise(params, source);
        slots_mul_add(values, &ei, si);
    }
    Ok(())
}

/// Fresh encryption error under the secret key.
pub fn encryption_noise_sk(params: &Parameters, source: &mut Source) -> Result<Vec<Complex>> {
    normal_noise(params, source, params.sigma())
}

/// Fresh encryption error under the public key: u * e_pk + e0 + e1 * s.
pub fn encryption_noise_pk(params: &Parameters, source: &mut Source) -> Result<Vec<Complex>> {
    let prec: u32 = params.prec();
    let sigma: f64 = params.sigma();

    let u: Vec<Complex> = if params.heuristic() {
        canonical_gaussian(params, source, &float(prec, 0.5f64.sqrt()))
    } else {
        let dist: Distributions = Distributions::Ternary(0.5);
        noise(params, source, |s| float(prec, dist.sample(s)))
    };

    let e_pk: Vec<Complex> = normal_noise(params, source, sigma)?;
    let mut out: Vec<Complex> = normal_noise(params, source, sigma)?;
    let e1: Vec<Complex> = normal_noise(params, source, sigma)?;

    slots_mul_add(&mut out, &u, &e_pk);
    slots_mul_add(&mut out, &e1, params.sk().s());

    Ok(out)
}

/// Canonical image of q0 * I(X), where the coefficients of I follow the
/// Irwin-Hall distribution of a ModUp with a secret of weight h.
pub fn irwin_hall_noise(params: &Parameters, source: &mut Source, h: usize, q0: &Float) -> Result<Vec<Complex>> {
    let prec: u32 = params.prec();
    let offset: f64 = (h >> 1) as f64;

    if params.heuristic() {
        let mean: f64 = (h + 1) as f64 / 2.0;
        let std: f64 = ((h + 1) as f64 / 12.0).sqrt();
        let normal: Normal<f64> =
            Normal::new(mean, std).map_err(|e| Error::Numeric(format!("irwin-hall h={h}: {e}")))?;
        return Ok(noise(params, source, |s| {
            let x: f64 = normal.sample(s).floor() - offset;
            Float::with_val(prec, q0 * x)
        }));
    }

    let dist: Distributions = Distributions::IrwinHall(h);
    Ok(noise(params, source, |s| Float::with_val(prec, q0 * dist.sample(s))))
}
