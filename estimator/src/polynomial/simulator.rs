use std::sync::Arc;

use backend::{Float, bits_len};
use utils::Map;

use crate::error::{Result, precondition};
use crate::parameters::Parameters;

use super::{Polynomial, optimal_split};

/// Level and scale of an operand, without its value.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOperand {
    pub level: usize,
    pub scale: Float,
}

/// Level and scale of every power X^n of a power basis.
pub type SimPowerBasis = Map<usize, SimOperand>;

/// Level/scale bookkeeping of the polynomial evaluation, used to pick the
/// level and scale of every baby-step polynomial before any operation runs.
pub struct SimEvaluator {
    params: Arc<Parameters>,
}

impl SimEvaluator {
    pub fn new(params: Arc<Parameters>) -> Self {
        Self { params }
    }

    pub fn rescale(&self, op: &mut SimOperand) -> Result<()> {
        if op.level == 0 {
            return precondition("simulated rescale at level 0");
        }
        op.scale /= self.params.q(op.level);
        op.level -= 1;
        Ok(())
    }

    pub fn mul_new(&self, a: &SimOperand, b: &SimOperand) -> SimOperand {
        SimOperand {
            level: a.level.min(b.level),
            scale: Float::with_val(self.params.prec(), &a.scale * &b.scale),
        }
    }

    pub fn baby_step(&self, lead: bool, level: usize, scale: &Float) -> (usize, Float) {
        let mut scale: Float = scale.clone();
        if lead {
            scale *= self.params.q(level);
        }
        (level, scale)
    }

    pub fn giant_step(&self, lead: bool, level: usize, scale: &Float, xpow_scale: &Float) -> Result<(usize, Float)> {
        let idx: usize = if lead { level } else { level + 1 };
        if idx > self.params.max_level() || level + 1 > self.params.max_level() {
            return precondition(format!(
                "giant step above the maximum level: {} > {}",
                level + 1,
                self.params.max_level()
            ));
        }
        let mut scale: Float = Float::with_val(self.params.prec(), scale * self.params.q(idx));
        scale /= xpow_scale;
        Ok((level + 1, scale))
    }
}

/// Paterson-Stockmeyer decomposition: sub-polynomials of increasing degree,
/// each annotated with the level and scale at which it must be evaluated.
#[derive(Clone, Debug)]
pub struct PatersonStockmeyer {
    pub degree: usize,
    pub log_degree: usize,
    pub log_split: usize,
    pub value: Vec<Polynomial>,
}

/// Decomposes `poly` so that its evaluation on `powers` lands on
/// (target_level, target_scale) after the final rescale.
pub fn paterson_stockmeyer(
    poly: &Polynomial,
    powers: &SimPowerBasis,
    target_level: usize,
    target_scale: &Float,
    sim: &SimEvaluator,
) -> Result<PatersonStockmeyer> {
    let degree: usize = poly.degree();
    let log_degree: usize = bits_len(degree);
    let log_split: usize = optimal_split(log_degree);

    let mut value: Vec<Polynomial> = Vec::new();
    recurse(sim, powers, log_split, target_level, target_scale, poly.clone(), &mut value)?;

    Ok(PatersonStockmeyer {
        degree,
        log_degree,
        log_split,
        value,
    })
}

fn recurse(
    sim: &SimEvaluator,
    powers: &SimPowerBasis,
    log_split: usize,
    target_level: usize,
    target_scale: &Float,
    mut poly: Polynomial,
    out: &mut Vec<Polynomial>,
) -> Result<SimOperand> {
    let degree: usize = poly.degree();

    if degree < (1 << log_split) {
        if poly.lead && log_split > 1 && poly.max_deg % (1 << (log_split + 1)) > (1 << (log_split - 1)) {
            let ls: usize = optimal_split(bits_len(degree));
            if ls < log_split {
                return recurse(sim, powers, ls, target_level, target_scale, poly, out);
            }
        }

        let (level, scale) = sim.baby_step(poly.lead, target_level, target_scale);
        poly.level = level;
        poly.scale = scale.clone();
        out.push(poly);
        return Ok(SimOperand { level, scale });
    }

    let mut next_power: usize = 1 << log_split;
    while next_power < (degree >> 1) + 1 {
        next_power <<= 1;
    }

    let xpow: &SimOperand = match powers.get(&next_power) {
        Some(x) => x,
        None => return precondition(format!("power X^{next_power} is missing from the basis")),
    };

    let (q, r) = poly.factorize(next_power);

    let (level, scale) = sim.giant_step(poly.lead, target_level, target_scale, &xpow.scale)?;

    let mut high: Vec<Polynomial> = Vec::new();
    let mut res: SimOperand = recurse(sim, powers, log_split, level, &scale, q, &mut high)?;
    sim.rescale(&mut res)?;
    let res: SimOperand = sim.mul_new(&res, xpow);

    recurse(sim, powers, log_split, target_level, &res.scale, r, out)?;
    out.extend(high);

    Ok(res)
}
