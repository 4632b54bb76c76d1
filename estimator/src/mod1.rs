//! Homomorphic modular reduction x mod 1, approximated by a scaled sine.

use std::sync::Arc;

use backend::{Complex, Float, bits_len, log2_round, pi, pow2};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::element::Element;
use crate::error::{Result, config, precondition};
use crate::evaluator::Evaluator;
use crate::parameters::Parameters;
use crate::polynomial::{Basis, Polynomial, chebyshev_approximation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mod1Type {
    /// sin(2*pi*x), without double angle.
    SinContinuous,
    /// cos(2*pi*(x - 1/4) / 2^r) followed by r double-angle steps.
    CosContinuous,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Mod1ParametersLiteral {
    pub level_start: usize,
    pub log_scale: usize,
    pub mod1_type: Mod1Type,
    /// log2 of the ratio between Q0 and the message scale.
    pub log_message_ratio: usize,
    /// Range [-K, K] of the integer part.
    pub k: usize,
    pub mod1_degree: usize,
    pub double_angle: usize,
    /// Degree of the arcsine correction, 0 to disable.
    pub mod1_inv_degree: usize,
}

impl Default for Mod1ParametersLiteral {
    fn default() -> Self {
        Self {
            level_start: 0,
            log_scale: 60,
            mod1_type: Mod1Type::CosContinuous,
            log_message_ratio: 8,
            k: 16,
            mod1_degree: 30,
            double_angle: 3,
            mod1_inv_degree: 0,
        }
    }
}

impl Mod1ParametersLiteral {
    pub fn double_angle(&self) -> usize {
        match self.mod1_type {
            Mod1Type::SinContinuous => 0,
            Mod1Type::CosContinuous => self.double_angle,
        }
    }

    /// Levels consumed by the evaluation.
    pub fn depth(&self) -> usize {
        let inv: usize = if self.mod1_inv_degree > 0 { bits_len(self.mod1_inv_degree) } else { 0 };
        bits_len(self.mod1_degree) + self.double_angle() + inv
    }
}

#[derive(Clone, Debug)]
pub struct Mod1Parameters {
    pub mod1_type: Mod1Type,
    pub level_start: usize,
    pub log_scale: usize,
    pub log_message_ratio: usize,
    pub k: usize,
    pub double_angle: usize,
    /// 2^double_angle.
    pub sc_fac: Float,
    /// Q0 / 2^round(log2(Q0)).
    pub q_diff: Float,
    pub sqrt2pi: Float,
    pub mod1_poly: Polynomial,
    pub mod1_inv_poly: Option<Polynomial>,
}

impl Mod1Parameters {
    pub fn new(literal: &Mod1ParametersLiteral, q0: &Float) -> Result<Self> {
        let prec: u32 = q0.prec();

        if literal.k == 0 {
            return config("mod1: k must be positive");
        }
        if literal.mod1_degree == 0 {
            return config("mod1: degree must be positive");
        }
        if literal.level_start < literal.depth() {
            return config(format!(
                "mod1: level_start={} < depth={}",
                literal.level_start,
                literal.depth()
            ));
        }

        let double_angle: usize = literal.double_angle();
        let sc_fac: Float = pow2(prec, double_angle as i32);
        let q_diff: Float = Float::with_val(prec, q0 / pow2(prec, log2_round(q0)));
        let two_pi: Float = Float::with_val(prec, pi(prec) * 2u32);

        let sqrt2pi: Float = if literal.mod1_inv_degree > 0 {
            Float::with_val(prec, 1)
        } else {
            let mut s: Float = Float::with_val(prec, &q_diff / &two_pi);
            (0..double_angle).for_each(|_| s.sqrt_mut());
            s
        };

        let k_prime: Float = Float::with_val(prec, literal.k as u64) / &sc_fac;
        let a: Float = Float::with_val(prec, -&k_prime);

        let mod1_poly: Polynomial = match literal.mod1_type {
            Mod1Type::SinContinuous => chebyshev_approximation(
                |x| Float::with_val(prec, x * &two_pi).sin() * &sqrt2pi,
                &a,
                &k_prime,
                literal.mod1_degree,
                prec,
            )
            .with_parity(true, false),
            Mod1Type::CosContinuous => chebyshev_approximation(
                |x| Float::with_val(prec, x * &two_pi).cos() * &sqrt2pi,
                &a,
                &k_prime,
                literal.mod1_degree,
                prec,
            )
            .with_parity(false, true),
        };

        let mod1_inv_poly: Option<Polynomial> = (literal.mod1_inv_degree > 0).then(|| {
            let degree: usize = literal.mod1_inv_degree;
            let mut coeffs: Vec<Float> = vec![Float::new(prec); degree + 1];
            coeffs[1] = Float::with_val(prec, &q_diff / &two_pi);
            (3..degree + 1).step_by(2).for_each(|i| {
                let mut c: Float = Float::with_val(prec, &coeffs[i - 2] * ((i - 2) * (i - 2)) as u64);
                c /= (i * (i - 1)) as u64;
                coeffs[i] = c;
            });
            let coeffs: Vec<Complex> = coeffs.into_iter().map(|c| Complex::with_val(prec, (c, 0))).collect();
            Polynomial::new(Basis::Monomial, coeffs).with_parity(true, false)
        });

        Ok(Self {
            mod1_type: literal.mod1_type,
            level_start: literal.level_start,
            log_scale: literal.log_scale,
            log_message_ratio: literal.log_message_ratio,
            k: literal.k,
            double_angle,
            sc_fac,
            q_diff,
            sqrt2pi,
            mod1_poly,
            mod1_inv_poly,
        })
    }

    pub fn scaling_factor(&self) -> Float {
        pow2(self.q_diff.prec(), self.log_scale as i32)
    }

    pub fn message_ratio(&self) -> Float {
        pow2(self.q_diff.prec(), self.log_message_ratio as i32)
    }

    pub fn depth(&self) -> usize {
        let inv: usize = self.mod1_inv_poly.as_ref().map(|p| p.depth()).unwrap_or(0);
        self.mod1_poly.depth() + self.double_angle + inv
    }

    pub fn level_q(&self) -> usize {
        self.level_start
    }
}

impl Evaluator {
    /// Maps (I + x)/K to (q_diff / 2pi) * sin(2pi x) for integers |I| < K.
    ///
    /// The input message must already be divided by K; the output keeps the
    /// input scale.
    #[instrument(skip_all, fields(level = el.level, level_start = mp.level_start))]
    pub fn evaluate_mod1(&mut self, el: &Element, mp: &Mod1Parameters) -> Result<Element> {
        if el.level < mp.level_start {
            return precondition(format!("mod1: level={} < level_start={}", el.level, mp.level_start));
        }

        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();

        let mut out: Element = el.clone();
        out.level = mp.level_start;
        out.scale = mp.scaling_factor();

        // Scale before the double angles so that they end on the scaling factor.
        let poly_depth: usize = mp.mod1_poly.depth();
        let mut target: Float = out.scale.clone();
        for i in 0..mp.double_angle {
            let idx: usize = match (out.level + i + 1).checked_sub(poly_depth + mp.double_angle) {
                Some(idx) => idx,
                None => return precondition("mod1: not enough levels for the double angles"),
            };
            target *= params.q(idx);
            target.sqrt_mut();
        }

        if mp.mod1_type == Mod1Type::CosContinuous {
            let mut width: Float = Float::with_val(prec, &mp.mod1_poly.b - &mp.mod1_poly.a);
            width *= &mp.sc_fac;
            let offset: Float = Float::with_val(prec, -0.5) / width;
            self.add(&mut out, &offset)?;
        }

        let mut out: Element = self.evaluate_polynomial(&out, &mp.mod1_poly, &target)?;

        let mut sqrt2pi: Float = mp.sqrt2pi.clone();
        for _ in 0..mp.double_angle {
            sqrt2pi.square_mut();
            let tmp: Element = out.clone();
            self.mul_relin(&mut out, &tmp)?;
            self.mul(&mut out, 2i64)?;
            self.add(&mut out, &Float::with_val(prec, -&sqrt2pi))?;
            self.rescale(&mut out)?;
        }

        if let Some(inv) = &mp.mod1_inv_poly {
            let scale: Float = out.scale.clone();
            out = self.evaluate_polynomial(&out, inv, &scale)?;
        }

        out.scale = el.scale.clone();

        Ok(out)
    }
}
