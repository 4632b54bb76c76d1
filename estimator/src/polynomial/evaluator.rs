use std::sync::Arc;

use backend::{Float, bits_len, pow2, relative_distance};
use tracing::{debug, instrument};

use crate::element::Element;
use crate::error::{Result, precondition};
use crate::evaluator::Evaluator;
use crate::parameters::Parameters;

use super::{PatersonStockmeyer, Polynomial, PowerBasis, SimEvaluator, optimal_split, paterson_stockmeyer};

struct BabyStep {
    degree: usize,
    value: Element,
}

impl Evaluator {
    /// Computes el * 2/(b-a) - (a+b)/(b-a) and rescales, mapping [a, b] onto [-1, 1].
    pub fn change_of_basis(&mut self, el: &Element, poly: &Polynomial) -> Result<Element> {
        let (scalar, constant) = poly.change_of_basis();
        let mut out: Element = self.mul_new(el, &scalar)?;
        self.add(&mut out, &constant)?;
        self.rescale(&mut out)?;
        Ok(out)
    }

    /// Evaluates `poly` on `el` with the Paterson-Stockmeyer algorithm.
    ///
    /// The result has scale `target_scale` and consumes bits_len(degree) levels.
    /// In the Chebyshev basis, `el` must already be mapped onto [-1, 1].
    #[instrument(skip_all, fields(degree = poly.degree(), level = el.level))]
    pub fn evaluate_polynomial(&mut self, el: &Element, poly: &Polynomial, target_scale: &Float) -> Result<Element> {
        let degree: usize = poly.degree();
        if degree == 0 {
            return precondition("cannot evaluate a constant polynomial");
        }

        let log_degree: usize = bits_len(degree);
        let log_split: usize = optimal_split(log_degree);

        if el.level < log_degree {
            return precondition(format!(
                "polynomial of degree {degree} needs {log_degree} levels but level={}",
                el.level
            ));
        }

        let params: Arc<Parameters> = el.params().clone();

        let mut pb: PowerBasis = PowerBasis::new(el.clone(), poly.basis);

        pb.gen_power(1 << (log_degree - 1), false, self)?;

        for i in (3..1usize << log_split).rev() {
            if parity_ok(poly, i) {
                pb.gen_power(i, poly.lazy, self)?;
            }
        }

        let target_level: usize = el.level + 1 - log_degree;
        let sim: SimEvaluator = SimEvaluator::new(params);
        let ps: PatersonStockmeyer = paterson_stockmeyer(poly, &pb.simulate(), target_level, target_scale, &sim)?;

        debug!(
            log_split = ps.log_split,
            sub_polynomials = ps.value.len(),
            powers = pb.len(),
            "paterson-stockmeyer decomposition"
        );

        let mut steps: Vec<BabyStep> = Vec::with_capacity(ps.value.len());
        for p in ps.value.iter() {
            steps.push(BabyStep {
                degree: p.degree(),
                value: self.evaluate_baby_step(p, &pb)?,
            });
        }

        while steps.len() > 1 {
            let mut next: Vec<BabyStep> = Vec::with_capacity(steps.len());
            let mut iter = steps.into_iter().peekable();

            while let Some(mut lo) = iter.next() {
                match iter.peek() {
                    Some(hi) if hi.degree == lo.degree => {
                        if let Some(mut hi) = iter.next() {
                            let deg: usize = 1 << bits_len(lo.degree);
                            let xpow: &Element = match pb.get(deg) {
                                Some(x) => x,
                                None => return precondition(format!("power X^{deg} is missing from the basis")),
                            };
                            self.evaluate_monomial(&lo.value, &mut hi.value, xpow)?;
                            hi.degree = 2 * deg - 1;
                            next.push(hi);
                        }
                    }
                    Some(_) => next.push(lo),
                    None => {
                        if let Some(prev) = next.last() {
                            lo.degree = prev.degree;
                        }
                        next.push(lo);
                    }
                }
            }

            steps = next;
        }

        let mut res: Element = match steps.pop() {
            Some(step) => step.value,
            None => return precondition("empty paterson-stockmeyer decomposition"),
        };

        if res.degree() == 2 {
            self.relinearize(&mut res)?;
        }
        self.rescale(&mut res)?;

        Ok(res)
    }

    /// Computes sum_i c_i X^i at the level and scale chosen for the sub-polynomial.
    fn evaluate_baby_step(&mut self, poly: &Polynomial, pb: &PowerBasis) -> Result<Element> {
        let x1: &Element = match pb.get(1) {
            Some(x) => x,
            None => return precondition("power X^1 is missing from the basis"),
        };

        let degree: usize = poly.degree();
        let even: bool = poly.is_even;
        let odd: bool = poly.is_odd;

        let mut min_nonzero: usize = degree;
        if even && !odd {
            min_nonzero = min_nonzero.saturating_sub(1);
        }

        if min_nonzero == 0 {
            let mut res: Element = Element::zero(x1.params(), 1, poly.level, x1.log_slots, poly.scale.clone())?;
            if even {
                self.add(&mut res, &poly.coeffs[0])?;
            }
            return Ok(res);
        }

        let max_degree: usize = (1..degree + 1)
            .filter_map(|i| pb.get(i))
            .map(|x| x.degree())
            .max()
            .unwrap_or(1);

        let mut res: Element = Element::zero(x1.params(), max_degree, poly.level, x1.log_slots, poly.scale.clone())?;

        if even {
            self.add(&mut res, &poly.coeffs[0])?;
        }

        for key in (1..degree + 1).rev() {
            if parity_ok(poly, key) {
                let x: &Element = match pb.get(key) {
                    Some(x) => x,
                    None => return precondition(format!("power X^{key} is missing from the basis")),
                };
                self.mul_then_add(x, &poly.coeffs[key], &mut res)?;
            }
        }

        Ok(res)
    }

    /// b = a + rescale(b) * xpow.
    fn evaluate_monomial(&mut self, a: &Element, b: &mut Element, xpow: &Element) -> Result<()> {
        if b.degree() == 2 {
            self.relinearize(b)?;
        }
        self.rescale(b)?;
        self.mul(b, xpow)?;

        let prec: u32 = b.params().prec();
        let tolerance: f64 = pow2(prec, -(prec as i32 - 24)).to_f64();
        if relative_distance(&a.scale, &b.scale) > tolerance {
            return precondition(format!(
                "giant step scale mismatch: 2^{:.4} != 2^{:.4}",
                b.scale.to_f64().log2(),
                a.scale.to_f64().log2()
            ));
        }

        self.add(b, a)
    }
}

fn parity_ok(poly: &Polynomial, i: usize) -> bool {
    !(poly.is_even || poly.is_odd) || (i & 1 == 0 && poly.is_even) || (i & 1 == 1 && poly.is_odd)
}
