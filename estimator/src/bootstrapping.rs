//! Bootstrapping: ScaleDown, ModUp, SubSum, CoeffsToSlots, EvalMod and
//! SlotsToCoeffs on the simulated element.

use std::sync::Arc;

use backend::{Complex, Float, log2_round, pow2, slots_add_inplace};
use sampling::source::Source;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::dft::{DftFormat, DftMatrix, DftMatrixLiteral, DftType};
use crate::element::Element;
use crate::error::{Result, config, numeric, precondition};
use crate::evaluator::Evaluator;
use crate::mod1::{Mod1Parameters, Mod1ParametersLiteral};
use crate::noise;
use crate::parameters::{Parameters, generate_primes};
use crate::secret::SecretKeyProxy;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootstrappingParametersLiteral {
    /// Defaults to the maximum number of slots.
    pub log_slots: Option<usize>,
    /// One prime per CoeffsToSlots matrix.
    pub c2s_log_scales: Vec<usize>,
    /// One prime per SlotsToCoeffs matrix.
    pub s2c_log_scales: Vec<usize>,
    pub eval_mod_log_scale: usize,
    pub log_p: Vec<usize>,
    pub mod1: Mod1ParametersLiteral,
    /// Hamming weight of the sparse secret used during ModUp, 0 to disable.
    pub ephemeral_secret_weight: usize,
    pub log_bsgs_ratio: usize,
}

impl Default for BootstrappingParametersLiteral {
    fn default() -> Self {
        Self {
            log_slots: None,
            c2s_log_scales: vec![56; 4],
            s2c_log_scales: vec![39; 3],
            eval_mod_log_scale: 60,
            log_p: vec![61; 4],
            mod1: Mod1ParametersLiteral::default(),
            ephemeral_secret_weight: 32,
            log_bsgs_ratio: 2,
        }
    }
}

pub struct BootstrappingParameters {
    pub residual: Arc<Parameters>,
    /// Residual chain extended with the SlotsToCoeffs, EvalMod and
    /// CoeffsToSlots primes, in that order.
    pub btp: Arc<Parameters>,
    pub log_slots: usize,
    pub mod1: Mod1Parameters,
    pub c2s: DftMatrix,
    pub s2c: DftMatrix,
    pub ephemeral: Option<SecretKeyProxy>,
}

fn to_u64(q: &Float) -> Result<u64> {
    match q.to_integer().and_then(|x| x.to_u64()) {
        Some(x) => Ok(x),
        None => numeric(format!("modulus {} does not fit in a u64", q.to_f64())),
    }
}

impl BootstrappingParameters {
    /// Extends the residual parameters with the bootstrapping primes and
    /// encodes the DFT matrices. The matrices carry one fixed realization of
    /// their encoding error, drawn from `source`.
    #[instrument(skip_all, fields(log_n = residual.log_n()))]
    pub fn new(residual: &Arc<Parameters>, literal: &BootstrappingParametersLiteral, source: &mut Source) -> Result<Self> {
        let log_n: usize = residual.log_n();
        let log_slots: usize = literal.log_slots.unwrap_or(residual.log_max_slots());

        if log_slots == 0 || log_slots > residual.log_max_slots() {
            return config(format!(
                "bootstrapping: log_slots={log_slots} must be in [1, {}]",
                residual.log_max_slots()
            ));
        }

        if literal.c2s_log_scales.is_empty() || literal.s2c_log_scales.is_empty() {
            return config("bootstrapping: empty CoeffsToSlots or SlotsToCoeffs moduli");
        }

        let residual_q: Vec<u64> = residual.q_chain().iter().map(to_u64).collect::<Result<Vec<u64>>>()?;
        let mut used: Vec<u64> = residual_q.clone();

        let mut mod1_literal: Mod1ParametersLiteral = literal.mod1.clone();

        let s2c_q: Vec<u64> = generate_primes(log_n, &literal.s2c_log_scales, &mut used)?;
        let eval_mod_q: Vec<u64> = generate_primes(log_n, &vec![literal.eval_mod_log_scale; mod1_literal.depth()], &mut used)?;
        let c2s_q: Vec<u64> = generate_primes(log_n, &literal.c2s_log_scales, &mut used)?;
        let p: Vec<u64> = generate_primes(log_n, &literal.log_p, &mut used)?;

        let q: Vec<u64> = [residual_q, s2c_q, eval_mod_q, c2s_q].concat();

        let btp: Arc<Parameters> = Arc::new(residual.with_moduli(&q, &p)?);
        let max_level: usize = btp.max_level();
        let prec: u32 = btp.prec();

        mod1_literal.level_start = max_level - literal.c2s_log_scales.len();
        let mod1: Mod1Parameters = Mod1Parameters::new(&mod1_literal, btp.q(0))?;

        let ephemeral: Option<SecretKeyProxy> = if literal.ephemeral_secret_weight > 0 {
            Some(SecretKeyProxy::sample(&btp, literal.ephemeral_secret_weight, source)?)
        } else {
            None
        };

        // Division by Q0 when the EvalMod scale cannot absorb it.
        let mut q_div: Float = mod1.scaling_factor();
        q_div /= pow2(prec, log2_round(btp.q(0)));
        if q_div > 1 {
            q_div = Float::with_val(prec, 1);
        }

        let gap: usize = residual.max_slots() >> log_slots;

        let mut c2s_scaling: Float = q_div;
        c2s_scaling /= Float::with_val(prec, mod1.k as u64) * &mod1.q_diff;
        c2s_scaling /= gap as u64;

        let mut s2c_scaling: Float = btp.default_scale().clone();
        s2c_scaling /= mod1.scaling_factor() / mod1.message_ratio();

        let c2s_literal: DftMatrixLiteral = DftMatrixLiteral {
            kind: DftType::HomomorphicEncode,
            format: DftFormat::RepackImagAsReal,
            log_slots,
            level_start: max_level,
            levels: vec![1; literal.c2s_log_scales.len()],
            scaling: Some(c2s_scaling.to_f64()),
            log_bsgs_ratio: literal.log_bsgs_ratio,
        };

        let s2c_literal: DftMatrixLiteral = DftMatrixLiteral {
            kind: DftType::HomomorphicDecode,
            format: DftFormat::RepackImagAsReal,
            log_slots,
            level_start: residual.max_level() + literal.s2c_log_scales.len(),
            levels: vec![1; literal.s2c_log_scales.len()],
            scaling: Some(s2c_scaling.to_f64()),
            log_bsgs_ratio: literal.log_bsgs_ratio,
        };

        let c2s: DftMatrix = DftMatrix::new(&c2s_literal, &btp, source)?;
        let s2c: DftMatrix = DftMatrix::new(&s2c_literal, &btp, source)?;

        info!(
            max_level,
            log_qp = btp.log_qp(),
            mod1_depth = mod1.depth(),
            "bootstrapping parameters"
        );

        Ok(Self {
            residual: residual.clone(),
            btp,
            log_slots,
            mod1,
            c2s,
            s2c,
            ephemeral,
        })
    }

    pub fn depth(&self) -> usize {
        self.c2s.depth() + self.mod1.depth() + self.s2c.depth()
    }
}

/// Runs the bootstrapping circuit on elements of the residual parameters.
pub struct BootstrappingEvaluator {
    pub params: Arc<BootstrappingParameters>,
    pub eval: Evaluator,
}

impl BootstrappingEvaluator {
    pub fn new(params: Arc<BootstrappingParameters>, source: Source) -> Self {
        let eval: Evaluator = Evaluator::new(params.residual.clone(), source);
        Self { params, eval }
    }

    /// Refreshes `el` to the residual maximum level with scale equal to the
    /// default scale.
    #[instrument(skip_all, fields(level = el.level, log_slots = el.log_slots))]
    pub fn bootstrap(&mut self, el: &Element) -> Result<Element> {
        let params: Arc<BootstrappingParameters> = self.params.clone();

        if el.log_slots != params.log_slots {
            return precondition(format!(
                "bootstrapping: log_slots={} != {}",
                el.log_slots, params.log_slots
            ));
        }

        if el.degree() != 1 {
            return precondition(format!("bootstrapping: degree={} != 1", el.degree()));
        }

        let mut el: Element = el.clone();

        let err: Float = self.scale_down(&mut el)?;
        debug!(scale_error = err.to_f64(), "scale down");

        self.mod_up(&mut el)?;

        if params.log_slots < params.btp.log_max_slots() {
            self.sub_sum(&mut el)?;
        }

        let (real, imag) = self.eval.coeffs_to_slots(&el, &params.c2s)?;

        let mut real: Element = self.eval.evaluate_mod1(&real, &params.mod1)?;
        real.scale = params.btp.default_scale().clone();

        let imag: Option<Element> = match imag {
            Some(imag) => {
                let mut imag: Element = self.eval.evaluate_mod1(&imag, &params.mod1)?;
                imag.scale = params.btp.default_scale().clone();
                Some(imag)
            }
            None => None,
        };

        self.eval.slots_to_coeffs(&real, imag.as_ref(), &params.s2c)
    }

    /// Drops the unneeded moduli and brings the scale to Q0 / message_ratio.
    ///
    /// Returns the remaining ratio scale / (Q0 / message_ratio).
    #[instrument(skip_all, fields(level = el.level))]
    pub fn scale_down(&mut self, el: &mut Element) -> Result<Float> {
        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();
        let message_ratio: Float = self.params.mod1.message_ratio();

        let ratio = |el: &Element| -> Float { Float::with_val(prec, params.q_product(el.level) / &el.scale) };

        while el.level != 0 {
            let threshold: Float = Float::with_val(prec, params.q(el.level) * &message_ratio);
            if ratio(el) >= threshold {
                el.level -= 1;
            } else {
                break;
            }
        }

        let scale_up: Float = Float::with_val(prec, ratio(el) / &message_ratio);
        if scale_up < 0.5 {
            return numeric(format!(
                "Q/scale = 2^{:.2} < 0.5 * message_ratio = 2^{:.2}",
                ratio(el).to_f64().log2(),
                message_ratio.to_f64().log2() - 1.0
            ));
        }

        self.eval.scale_up(el, &scale_up)?;

        if el.level != 0 {
            self.eval.rescale(el)?;
        }

        let target: Float = Float::with_val(prec, params.q_product(0) / &message_ratio);
        Ok(Float::with_val(prec, &el.scale / &target))
    }

    /// Adds the q0 * I(X) overflow, moves the element onto the bootstrapping
    /// parameters at their maximum level and scales it to scaling_factor / message_ratio.
    #[instrument(skip_all, fields(level = el.level))]
    pub fn mod_up(&mut self, el: &mut Element) -> Result<()> {
        let params: Arc<BootstrappingParameters> = self.params.clone();
        let residual: Arc<Parameters> = el.params().clone();
        let prec: u32 = residual.prec();

        let h: usize = match &params.ephemeral {
            Some(eph) => {
                self.eval.key_switch(el, residual.sk())?;
                eph.weight()
            }
            None => residual.h(),
        };

        let e: Vec<Complex> = noise::irwin_hall_noise(&residual, self.eval.source(), h, residual.q(0))?;
        slots_add_inplace(&mut el.value[0], &e);

        el.set_params(params.btp.clone())?;
        el.level = params.btp.max_level();

        if let Some(eph) = &params.ephemeral {
            self.eval.key_switch(el, eph)?;
        }

        let mut factor: Float = params.mod1.scaling_factor();
        factor /= params.mod1.message_ratio();
        factor /= &el.scale;
        if factor > 1 {
            self.eval.scale_up(el, &factor)?;
        }

        debug!(scale = Float::with_val(prec, el.scale.log2_ref()).to_f64(), "mod up");

        Ok(())
    }

    /// Sums the rotations by slots * 2^i, for i < log2(max_slots / slots).
    pub fn sub_sum(&mut self, el: &mut Element) -> Result<()> {
        let slots: usize = el.slots();
        let max_slots: usize = el.max_slots();
        let mut k: usize = slots;
        while k < max_slots {
            let rotated: Element = self.eval.rotate_new(el, k)?;
            self.eval.add(el, &rotated)?;
            k <<= 1;
        }
        Ok(())
    }
}
