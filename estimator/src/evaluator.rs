use std::sync::Arc;

use backend::{
    Complex, Float, complex, is_gaussian_integer, mul_complex_float, round_complex, slots_add_inplace, slots_conjugate_inplace,
    slots_div_float, slots_mul_add, slots_mul_complex, slots_mul_float, slots_mul_inplace, slots_rotate, slots_rotate_inplace,
    slots_sub_inplace,
};
use sampling::source::Source;

use crate::element::{Element, KeyType, Operand};
use crate::error::{Result, precondition};
use crate::noise;
use crate::parameters::Parameters;
use crate::secret::SecretKeyProxy;

/// Applies homomorphic operations to [Element]s and injects the matching errors.
///
/// Operations read the moduli, the secret proxy and the noise model from the
/// element's own parameters; the evaluator's parameters are only used to
/// create new elements. Randomness is drawn from the evaluator's [Source].
pub struct Evaluator {
    params: Arc<Parameters>,
    source: Source,
}

impl Evaluator {
    pub fn new(params: Arc<Parameters>, source: Source) -> Self {
        Self { params, source }
    }

    pub fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    pub fn source(&mut self) -> &mut Source {
        &mut self.source
    }

    pub fn new_element(&self, degree: usize, level: usize, log_slots: usize, scale: Float) -> Result<Element> {
        Element::zero(&self.params, degree, level, log_slots, scale)
    }

    /// Encodes values * scale at the maximum level, with the rounding error of the encoding.
    pub fn encode(&mut self, values: &[Complex], log_slots: usize, scale: &Float) -> Result<Element> {
        let mut el: Element = Element::new(&self.params, Some(values), 0, log_slots, scale.clone())?;
        let e: Vec<Complex> = noise::sparse_rounding_noise(&self.params, &mut self.source, log_slots);
        slots_add_inplace(&mut el.value[0], &e);
        Ok(el)
    }

    /// Adds the fresh encryption error of the given key.
    pub fn encrypt(&mut self, el: &mut Element, key: KeyType) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        let e: Vec<Complex> = match key {
            KeyType::None => return Ok(()),
            KeyType::SecretKey => noise::encryption_noise_sk(&params, &mut self.source)?,
            KeyType::PublicKey => noise::encryption_noise_pk(&params, &mut self.source)?,
        };
        el.extend_degree(1);
        slots_add_inplace(&mut el.value[0], &e);
        Ok(())
    }

    /// Samples uniform values in [a.re, b.re] + i[a.im, b.im], encodes them at the
    /// default scale and encrypts them with `key`.
    ///
    /// Returns the ideal values and the degree-1 element.
    pub fn new_test_vector(
        &mut self,
        a: (f64, f64),
        b: (f64, f64),
        log_slots: usize,
        key: KeyType,
    ) -> Result<(Vec<Complex>, Element)> {
        let prec: u32 = self.params.prec();
        let values: Vec<Complex> = (0..1usize << log_slots)
            .map(|_| {
                let re: f64 = self.source.next_f64(a.0, b.0);
                let im: f64 = self.source.next_f64(a.1, b.1);
                complex(prec, re, im)
            })
            .collect();
        let scale: Float = self.params.default_scale().clone();
        let mut el: Element = self.encode(&values, log_slots, &scale)?;
        el.extend_degree(1);
        self.encrypt(&mut el, key)?;
        Ok((values, el))
    }

    pub fn add<'a>(&mut self, el: &mut Element, op: impl Into<Operand<'a>>) -> Result<()> {
        self.add_or_sub(el, op.into(), false)
    }

    pub fn add_new<'a>(&mut self, el: &Element, op: impl Into<Operand<'a>>) -> Result<Element> {
        let mut out: Element = el.clone();
        self.add_or_sub(&mut out, op.into(), false)?;
        Ok(out)
    }

    pub fn sub<'a>(&mut self, el: &mut Element, op: impl Into<Operand<'a>>) -> Result<()> {
        self.add_or_sub(el, op.into(), true)
    }

    pub fn sub_new<'a>(&mut self, el: &Element, op: impl Into<Operand<'a>>) -> Result<Element> {
        let mut out: Element = el.clone();
        self.add_or_sub(&mut out, op.into(), true)?;
        Ok(out)
    }

    fn add_or_sub(&mut self, el: &mut Element, op: Operand<'_>, negate: bool) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();

        let apply = |a: &mut [Complex], b: &[Complex]| {
            if negate {
                slots_sub_inplace(a, b)
            } else {
                slots_add_inplace(a, b)
            }
        };

        match op {
            Operand::Element(other) => {
                el.check_compatible(other)?;

                // Aligns the scales with an integer multiplication when they differ by at least 2.
                let ratio: Float = Float::with_val(prec, &other.scale / &el.scale);
                let mut aligned: Option<Element> = None;
                if ratio >= 2 {
                    mul_integer(el, &ratio.round());
                } else {
                    let inv: Float = Float::with_val(prec, &el.scale / &other.scale);
                    if inv >= 2 {
                        let mut tmp: Element = other.clone();
                        mul_integer(&mut tmp, &inv.round());
                        aligned = Some(tmp);
                    }
                }
                let other: &Element = aligned.as_ref().unwrap_or(other);

                el.level = el.level.min(other.level);
                el.extend_degree(other.degree());
                el.value
                    .iter_mut()
                    .zip(other.value.iter())
                    .for_each(|(a, b)| apply(a, b));
            }
            Operand::Scalar(c) => {
                let mut c: Complex = Complex::with_val(prec, c);
                mul_complex_float(&mut c, &el.scale);
                if !params.noiseless() {
                    round_complex(&mut c);
                }
                el.value[0].iter_mut().for_each(|x| {
                    if negate {
                        *x -= &c
                    } else {
                        *x += &c
                    }
                });
            }
            Operand::Vector(v) => {
                let mut pt: Vec<Complex> = el.encode_vector(v, &el.scale)?;
                let e: Vec<Complex> = noise::sparse_rounding_noise(&params, &mut self.source, el.log_slots);
                slots_add_inplace(&mut pt, &e);
                apply(&mut el.value[0], &pt);
            }
        }

        Ok(())
    }

    pub fn mul<'a>(&mut self, el: &mut Element, op: impl Into<Operand<'a>>) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();

        match op.into() {
            Operand::Element(other) => {
                el.check_compatible(other)?;

                let degree: usize = el.degree() + other.degree();
                if degree > 2 {
                    return precondition(format!(
                        "product degree {} + {} > 2",
                        el.degree(),
                        other.degree()
                    ));
                }

                let mut value: Vec<Vec<Complex>> = (0..degree + 1)
                    .map(|_| backend::complex_zeros(prec, params.max_slots()))
                    .collect();
                el.value.iter().enumerate().for_each(|(i, a)| {
                    other
                        .value
                        .iter()
                        .enumerate()
                        .for_each(|(j, b)| slots_mul_add(&mut value[i + j], a, b));
                });

                el.value = value;
                el.scale *= &other.scale;
                el.level = el.level.min(other.level);
            }
            Operand::Scalar(c) => {
                let mut c: Complex = Complex::with_val(prec, c);
                if !is_gaussian_integer(&c) {
                    let q: &Float = params.q(el.level);
                    mul_complex_float(&mut c, q);
                    if !params.noiseless() {
                        round_complex(&mut c);
                    }
                    el.scale *= q;
                }
                el.value.iter_mut().for_each(|v| slots_mul_complex(v, &c));
            }
            Operand::Vector(v) => {
                let q: Float = params.q(el.level).clone();
                let mut pt: Vec<Complex> = el.encode_vector(v, &q)?;
                let e: Vec<Complex> = noise::sparse_rounding_noise(&params, &mut self.source, el.log_slots);
                slots_add_inplace(&mut pt, &e);
                el.value.iter_mut().for_each(|x| slots_mul_inplace(x, &pt));
                el.scale *= &q;
            }
        }

        Ok(())
    }

    pub fn mul_new<'a>(&mut self, el: &Element, op: impl Into<Operand<'a>>) -> Result<Element> {
        let mut out: Element = el.clone();
        self.mul(&mut out, op)?;
        Ok(out)
    }

    /// Multiplies and relinearizes if the product has degree 2.
    pub fn mul_relin<'a>(&mut self, el: &mut Element, op: impl Into<Operand<'a>>) -> Result<()> {
        self.mul(el, op)?;
        if el.degree() == 2 {
            self.relinearize(el)?;
        }
        Ok(())
    }

    pub fn mul_relin_new<'a>(&mut self, el: &Element, op: impl Into<Operand<'a>>) -> Result<Element> {
        let mut out: Element = el.clone();
        self.mul_relin(&mut out, op)?;
        Ok(out)
    }

    /// acc += el * op.
    ///
    /// A constant is scaled by acc.scale / el.scale so that the product lands on
    /// the scale of acc. If both scales are equal and the constant is not a
    /// Gaussian integer, acc is first multiplied by Q[level].
    pub fn mul_then_add<'a>(&mut self, el: &Element, op: impl Into<Operand<'a>>, acc: &mut Element) -> Result<()> {
        acc.check_compatible(el)?;

        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();
        let level: usize = acc.level.min(el.level);

        match op.into() {
            Operand::Element(other) => {
                let mut tmp: Element = el.clone();
                self.mul(&mut tmp, other)?;
                self.add(acc, &tmp)?;
            }
            Operand::Scalar(c) => {
                let mut c: Complex = Complex::with_val(prec, c);

                if acc.scale == el.scale {
                    if !is_gaussian_integer(&c) {
                        let q: &Float = params.q(level);
                        mul_integer(acc, q);
                        mul_complex_float(&mut c, q);
                    }
                } else {
                    if acc.scale < el.scale {
                        return precondition(format!(
                            "accumulator scale 2^{:.2} < operand scale 2^{:.2}",
                            acc.scale.to_f64().log2(),
                            el.scale.to_f64().log2()
                        ));
                    }
                    let ratio: Float = Float::with_val(prec, &acc.scale / &el.scale);
                    mul_complex_float(&mut c, &ratio);
                }

                if !params.noiseless() {
                    round_complex(&mut c);
                }

                if c.is_zero() {
                    return Ok(());
                }

                acc.level = level;
                acc.extend_degree(el.degree());
                acc.value.iter_mut().zip(el.value.iter()).for_each(|(z, x)| {
                    z.iter_mut()
                        .zip(x.iter())
                        .for_each(|(zi, xi)| *zi += Complex::with_val(prec, xi * &c));
                });
            }
            Operand::Vector(v) => {
                if acc.scale < el.scale {
                    return precondition("accumulator scale < operand scale");
                }
                let ratio: Float = Float::with_val(prec, &acc.scale / &el.scale);
                let mut pt: Vec<Complex> = el.encode_vector(v, &ratio)?;
                let e: Vec<Complex> = noise::sparse_rounding_noise(&params, &mut self.source, el.log_slots);
                slots_add_inplace(&mut pt, &e);

                acc.level = level;
                acc.extend_degree(el.degree());
                acc.value
                    .iter_mut()
                    .zip(el.value.iter())
                    .for_each(|(z, x)| slots_mul_add(z, x, &pt));
            }
        }

        Ok(())
    }

    /// Key-switches the s^2 component back to s.
    pub fn relinearize(&mut self, el: &mut Element) -> Result<()> {
        if el.degree() != 2 {
            return precondition(format!("cannot relinearize: degree={} != 2", el.degree()));
        }
        let params: Arc<Parameters> = el.params().clone();
        let e: Vec<Complex> =
            noise::key_switching_noise(&params, &mut self.source, el.level, &el.value[2], params.sk().s2())?;
        slots_add_inplace(&mut el.value[0], &e);
        el.value.truncate(2);
        Ok(())
    }

    /// Divides by Q[level] and adds the rounding error of the division.
    pub fn rescale(&mut self, el: &mut Element) -> Result<()> {
        if el.level == 0 {
            return precondition("cannot rescale: element already at level 0");
        }
        let params: Arc<Parameters> = el.params().clone();
        let q: &Float = params.q(el.level);
        el.scale /= q;
        el.level -= 1;
        self.divide_and_round(el, q)
    }

    /// Divides by P and adds the rounding error of the division.
    pub fn mod_down(&mut self, el: &mut Element) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        self.divide_and_round(el, params.p())
    }

    fn divide_and_round(&mut self, el: &mut Element, q: &Float) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        let degree: usize = el.degree();
        el.value.iter_mut().for_each(|v| slots_div_float(v, q));
        noise::add_rounding_noise(&params, &mut self.source, &mut el.value[0], degree)
    }

    /// Rotates the slots to the left by k.
    pub fn rotate(&mut self, el: &mut Element, k: usize) -> Result<()> {
        if el.degree() != 1 {
            return precondition(format!("cannot rotate: degree={} != 1", el.degree()));
        }
        let k: usize = k % el.max_slots();
        el.value.iter_mut().for_each(|v| slots_rotate_inplace(v, k));
        self.switch_key(el, None)
    }

    pub fn rotate_new(&mut self, el: &Element, k: usize) -> Result<Element> {
        let mut out: Element = el.clone();
        self.rotate(&mut out, k)?;
        Ok(out)
    }

    pub fn conjugate(&mut self, el: &mut Element) -> Result<()> {
        if el.degree() != 1 {
            return precondition(format!("cannot conjugate: degree={} != 1", el.degree()));
        }
        el.value.iter_mut().for_each(|v| slots_conjugate_inplace(v));
        self.switch_key(el, None)
    }

    pub fn conjugate_new(&mut self, el: &Element) -> Result<Element> {
        let mut out: Element = el.clone();
        self.conjugate(&mut out)?;
        Ok(out)
    }

    /// Switches the element from the secret `sk` to the parameters' secret.
    pub fn key_switch(&mut self, el: &mut Element, sk: &SecretKeyProxy) -> Result<()> {
        if el.degree() != 1 {
            return precondition(format!("cannot key-switch: degree={} != 1", el.degree()));
        }
        self.switch_key(el, Some(sk))
    }

    fn switch_key(&mut self, el: &mut Element, sk: Option<&SecretKeyProxy>) -> Result<()> {
        let params: Arc<Parameters> = el.params().clone();
        let sk: &[Complex] = sk.unwrap_or(params.sk()).s();
        let e: Vec<Complex> = noise::key_switching_noise(&params, &mut self.source, el.level, &el.value[1], sk)?;
        slots_add_inplace(&mut el.value[0], &e);
        Ok(())
    }

    /// Returns rot(value[0], k) * P plus the key-switching error, without ModDown.
    pub fn rotate_hoisted(&mut self, el: &Element, k: usize) -> Result<Vec<Complex>> {
        if el.degree() != 1 {
            return precondition(format!("cannot rotate: degree={} != 1", el.degree()));
        }
        let params: Arc<Parameters> = el.params().clone();
        let k: usize = k % el.max_slots();

        let mut v0: Vec<Complex> = slots_rotate(&el.value[0], k);
        slots_mul_float(&mut v0, params.p());

        let v1: Vec<Complex> = slots_rotate(&el.value[1], k);
        let e: Vec<Complex> =
            noise::key_switching_noise_raw(&params, &mut self.source, el.level, &v1, params.sk().s())?;
        slots_add_inplace(&mut v0, &e);

        Ok(v0)
    }

    /// Multiplies by round(factor); the scale is multiplied by the same integer.
    pub fn scale_up(&mut self, el: &mut Element, factor: &Float) -> Result<()> {
        let r: Float = Float::with_val(el.params().prec(), factor.round_ref());
        if r < 1 {
            return precondition(format!("scale-up factor {} rounds below 1", factor.to_f64()));
        }
        mul_integer(el, &r);
        Ok(())
    }

    /// Multiplies by round(target / scale * Q[level]), rescales, and sets the scale to target.
    pub fn set_scale(&mut self, el: &mut Element, target: &Float) -> Result<()> {
        if el.level == 0 {
            return precondition("cannot set scale: element already at level 0");
        }
        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();
        let q: &Float = params.q(el.level);

        let mut c: Float = Float::with_val(prec, target / &el.scale);
        c *= q;
        if !params.noiseless() {
            c.round_mut();
        }

        el.value.iter_mut().for_each(|v| slots_mul_float(v, &c));
        el.scale = Float::with_val(prec, target * q);
        self.rescale(el)?;
        el.scale = target.clone();
        Ok(())
    }
}

/// Multiplies every component and the scale by the integer r.
fn mul_integer(el: &mut Element, r: &Float) {
    el.value.iter_mut().for_each(|v| slots_mul_float(v, r));
    el.scale *= r;
}
