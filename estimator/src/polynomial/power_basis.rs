use backend::is_pow2;

use crate::element::Element;
use crate::error::{Result, precondition};
use crate::evaluator::Evaluator;

use super::{Basis, SimOperand, SimPowerBasis, split_degree};

/// Memoized powers X^n of an element, in the monomial or Chebyshev basis.
///
/// Powers are stored in an arena indexed by their exponent; X^0 is never
/// stored and stands for the constant 1.
#[derive(Clone)]
pub struct PowerBasis {
    pub basis: Basis,
    value: Vec<Option<Element>>,
}

impl PowerBasis {
    pub fn new(el: Element, basis: Basis) -> Self {
        Self {
            basis,
            value: vec![None, Some(el)],
        }
    }

    pub fn get(&self, n: usize) -> Option<&Element> {
        self.value.get(n).and_then(|x| x.as_ref())
    }

    pub fn contains(&self, n: usize) -> bool {
        self.get(n).is_some()
    }

    /// Exponents currently stored, in increasing order.
    pub fn powers(&self) -> Vec<usize> {
        self.value
            .iter()
            .enumerate()
            .filter_map(|(i, x)| x.as_ref().map(|_| i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.value.iter().filter(|x| x.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Level and scale of every stored power.
    pub fn simulate(&self) -> SimPowerBasis {
        self.value
            .iter()
            .enumerate()
            .filter_map(|(i, x)| {
                x.as_ref().map(|el| {
                    (
                        i,
                        SimOperand {
                            level: el.level,
                            scale: el.scale.clone(),
                        },
                    )
                })
            })
            .collect()
    }

    fn set(&mut self, n: usize, el: Element) {
        if self.value.len() <= n {
            self.value.resize_with(n + 1, || None);
        }
        self.value[n] = Some(el);
    }

    fn get_mut(&mut self, n: usize) -> Result<&mut Element> {
        match self.value.get_mut(n).and_then(|x| x.as_mut()) {
            Some(el) => Ok(el),
            None => precondition(format!("power X^{n} is missing from the basis")),
        }
    }

    fn get_or_err(&self, n: usize) -> Result<&Element> {
        match self.get(n) {
            Some(el) => Ok(el),
            None => precondition(format!("power X^{n} is missing from the basis")),
        }
    }

    /// Computes X^n if it is not already stored.
    ///
    /// With `lazy`, the new power is not relinearized; the powers it depends on
    /// are relinearized when needed.
    pub fn gen_power(&mut self, n: usize, lazy: bool, eval: &mut Evaluator) -> Result<()> {
        if n == 0 {
            return precondition("cannot generate X^0");
        }
        if !self.contains(n) && self.gen_power_rec(n, lazy, eval)? {
            eval.rescale(self.get_mut(n)?)?;
        }
        Ok(())
    }

    /// Returns true if the new power must be rescaled.
    fn gen_power_rec(&mut self, n: usize, lazy: bool, eval: &mut Evaluator) -> Result<bool> {
        if self.contains(n) {
            return Ok(false);
        }

        let pow2: bool = is_pow2(n);
        let (a, b) = split_degree(n);
        let c: usize = if self.basis == Basis::Chebyshev { a.abs_diff(b) } else { 0 };

        let rescale_a: bool = self.gen_power_rec(a, lazy && !pow2, eval)?;
        let rescale_b: bool = self.gen_power_rec(b, lazy && !pow2, eval)?;

        if lazy {
            for k in [a, b] {
                let x: &mut Element = self.get_mut(k)?;
                if x.degree() == 2 {
                    eval.relinearize(x)?;
                }
            }
        }

        if rescale_a {
            eval.rescale(self.get_mut(a)?)?;
        }

        if rescale_b {
            eval.rescale(self.get_mut(b)?)?;
        }

        let xa: &Element = self.get_or_err(a)?;
        let xb: &Element = self.get_or_err(b)?;
        let mut out: Element = if lazy { eval.mul_new(xa, xb)? } else { eval.mul_relin_new(xa, xb)? };

        if self.basis == Basis::Chebyshev {
            // T_n = 2 * T_a * T_b - T_c
            eval.mul(&mut out, 2i64)?;
            if c == 0 {
                eval.add(&mut out, -1i64)?;
            } else {
                self.gen_power(c, lazy, eval)?;
                eval.sub(&mut out, self.get_or_err(c)?)?;
            }
        }

        self.set(n, out);

        Ok(true)
    }
}
