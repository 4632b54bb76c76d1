use std::sync::Arc;

use backend::{Complex, Float, complex, complex_zeros, slots_div_float, slots_mul_float, slots_replicate};

use crate::error::{Result, precondition};
use crate::parameters::Parameters;

/// Simulated ciphertext or plaintext.
///
/// `value[0]` holds the decrypted value `scale * m + e` on all MaxSlots slots.
/// `value[i]` for `i > 0` holds pending error terms that multiply `s^i` on
/// decryption (or on the next key-switch). A message packed on `2^log_slots`
/// slots is replicated with that period.
#[derive(Clone)]
pub struct Element {
    params: Arc<Parameters>,
    pub level: usize,
    pub scale: Float,
    pub log_slots: usize,
    pub value: Vec<Vec<Complex>>,
}

impl Element {
    /// Encodes `values * scale` at the maximum level without adding encoding noise.
    pub fn new(
        params: &Arc<Parameters>,
        values: Option<&[Complex]>,
        degree: usize,
        log_slots: usize,
        scale: Float,
    ) -> Result<Self> {
        let mut el: Element = Self::zero(params, degree, params.max_level(), log_slots, scale)?;
        if let Some(values) = values {
            el.value[0] = el.encode_vector(values, &el.scale)?;
        }
        Ok(el)
    }

    pub fn zero(params: &Arc<Parameters>, degree: usize, level: usize, log_slots: usize, scale: Float) -> Result<Self> {
        if log_slots > params.log_max_slots() {
            return precondition(format!(
                "log_slots={log_slots} > log_max_slots={}",
                params.log_max_slots()
            ));
        }
        if level > params.max_level() {
            return precondition(format!("level={level} > max_level={}", params.max_level()));
        }
        let prec: u32 = params.prec();
        let max_slots: usize = params.max_slots();
        Ok(Self {
            params: params.clone(),
            level,
            scale,
            log_slots,
            value: (0..degree + 1).map(|_| complex_zeros(prec, max_slots)).collect(),
        })
    }

    pub fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    /// Moves the element onto another parameter set with the same ring degree.
    pub fn set_params(&mut self, params: Arc<Parameters>) -> Result<()> {
        if params.n() != self.params.n() {
            return precondition(format!("ring degree mismatch: {} != {}", params.n(), self.params.n()));
        }
        if self.level > params.max_level() {
            return precondition(format!("level={} > max_level={}", self.level, params.max_level()));
        }
        self.params = params;
        Ok(())
    }

    pub fn degree(&self) -> usize {
        self.value.len() - 1
    }

    pub fn slots(&self) -> usize {
        1 << self.log_slots
    }

    pub fn max_slots(&self) -> usize {
        self.params.max_slots()
    }

    /// Grows the element to the given degree with zero components.
    pub(crate) fn extend_degree(&mut self, degree: usize) {
        let prec: u32 = self.params.prec();
        let max_slots: usize = self.max_slots();
        while self.degree() < degree {
            self.value.push(complex_zeros(prec, max_slots));
        }
    }

    /// Returns `values * scale` replicated over MaxSlots with the element's packing.
    pub(crate) fn encode_vector(&self, values: &[Complex], scale: &Float) -> Result<Vec<Complex>> {
        let slots: usize = self.slots();
        if values.len() > slots {
            return precondition(format!("{} values > {slots} slots", values.len()));
        }
        let prec: u32 = self.params.prec();
        let mut v: Vec<Complex> = values
            .iter()
            .map(|x| Complex::with_val(prec, x))
            .chain(std::iter::repeat_with(|| complex(prec, 0.0, 0.0)))
            .take(slots)
            .collect();
        slots_mul_float(&mut v, scale);
        Ok(slots_replicate(&v, self.max_slots()))
    }

    /// Returns value[0] / scale on the first 2^log_slots slots.
    pub fn decode(&self) -> Vec<Complex> {
        let mut v: Vec<Complex> = self.value[0][..self.slots()].to_vec();
        slots_div_float(&mut v, &self.scale);
        v
    }

    /// Checks that both elements live on the same ring and modulus chain.
    pub(crate) fn check_compatible(&self, other: &Element) -> Result<()> {
        if Arc::ptr_eq(&self.params, &other.params) {
            return Ok(());
        }
        if self.params.n() != other.params.n() || self.params.q_chain() != other.params.q_chain() {
            return precondition("operands are defined on different parameters");
        }
        Ok(())
    }
}

/// Right-hand side of an arithmetic operation.
#[derive(Clone)]
pub enum Operand<'a> {
    Element(&'a Element),
    Scalar(Complex),
    Vector(&'a [Complex]),
}

impl<'a> From<&'a Element> for Operand<'a> {
    fn from(el: &'a Element) -> Self {
        Operand::Element(el)
    }
}

impl<'a> From<&'a mut Element> for Operand<'a> {
    fn from(el: &'a mut Element) -> Self {
        Operand::Element(el)
    }
}

impl From<Complex> for Operand<'_> {
    fn from(c: Complex) -> Self {
        Operand::Scalar(c)
    }
}

impl From<&Complex> for Operand<'_> {
    fn from(c: &Complex) -> Self {
        Operand::Scalar(c.clone())
    }
}

impl From<&Float> for Operand<'_> {
    fn from(f: &Float) -> Self {
        Operand::Scalar(Complex::with_val(f.prec(), (f, 0)))
    }
}

impl From<f64> for Operand<'_> {
    fn from(x: f64) -> Self {
        Operand::Scalar(complex(backend::DEFAULT_PREC, x, 0.0))
    }
}

impl From<i64> for Operand<'_> {
    fn from(x: i64) -> Self {
        Operand::Scalar(Complex::with_val(backend::DEFAULT_PREC, (x, 0)))
    }
}

impl From<(f64, f64)> for Operand<'_> {
    fn from((re, im): (f64, f64)) -> Self {
        Operand::Scalar(complex(backend::DEFAULT_PREC, re, im))
    }
}

impl<'a> From<&'a [Complex]> for Operand<'a> {
    fn from(v: &'a [Complex]) -> Self {
        Operand::Vector(v)
    }
}

impl<'a> From<&'a Vec<Complex>> for Operand<'a> {
    fn from(v: &'a Vec<Complex>) -> Self {
        Operand::Vector(v)
    }
}

/// Key used to encrypt a test vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    /// Plaintext: no encryption noise.
    None,
    SecretKey,
    PublicKey,
}
