use std::sync::Arc;

use backend::{Encoder, pow2};
use rug::integer::IsPrime;
use rug::{Float, Integer};
use sampling::source::Source;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, config};
use crate::secret::SecretKeyProxy;

/// Serializable description of a parameter set.
///
/// The modulus chain is given either explicitly (`q`, `p`) or by bit sizes
/// (`log_q`, `log_p`), in which case NTT-friendly primes congruent to 1 modulo
/// 2N are generated. Explicit moduli are not required to be prime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParametersLiteral {
    pub log_n: usize,
    pub q: Vec<u64>,
    pub p: Vec<u64>,
    pub log_q: Vec<usize>,
    pub log_p: Vec<usize>,
    pub h: usize,
    pub sigma: f64,
    pub log_default_scale: usize,
    pub prec: u32,
    pub heuristic: bool,
    pub noiseless: bool,
    /// Per-halving correction of the heuristic sparse encoding noise.
    pub sparse_packing_base: f64,
}

impl Default for ParametersLiteral {
    fn default() -> Self {
        Self {
            log_n: 16,
            q: Vec::new(),
            p: Vec::new(),
            log_q: vec![60, 40, 40, 40, 40, 40, 40, 40, 40, 40],
            log_p: vec![61, 61, 61, 61],
            h: 192,
            sigma: 3.2,
            log_default_scale: 40,
            prec: backend::DEFAULT_PREC,
            heuristic: false,
            noiseless: false,
            sparse_packing_base: std::f64::consts::SQRT_2,
        }
    }
}

impl ParametersLiteral {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.log_n < 1 || self.log_n > 20 {
            return config(format!("log_n={} must be in [1, 20]", self.log_n));
        }
        if self.h > 1 << self.log_n {
            return config(format!("h={} > N={}", self.h, 1usize << self.log_n));
        }
        if self.prec < 53 {
            return config(format!("prec={} < 53", self.prec));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return config(format!("invalid sigma={}", self.sigma));
        }
        if !(self.sparse_packing_base >= 1.0 && self.sparse_packing_base.is_finite()) {
            return config(format!("invalid sparse_packing_base={}", self.sparse_packing_base));
        }
        if !self.q.is_empty() && !self.log_q.is_empty() {
            return config("q and log_q are mutually exclusive");
        }
        if !self.p.is_empty() && !self.log_p.is_empty() {
            return config("p and log_p are mutually exclusive");
        }
        if self.q.is_empty() && self.log_q.is_empty() {
            return config("empty modulus chain");
        }
        if self.p.is_empty() && self.log_p.is_empty() {
            return config("empty auxiliary modulus");
        }
        check_moduli(&self.q, &self.p)
    }

    /// Returns the explicit or generated (Q, P) moduli.
    pub fn moduli(&self) -> Result<(Vec<u64>, Vec<u64>)> {
        self.validate()?;
        let mut used: Vec<u64> = self.q.iter().chain(self.p.iter()).copied().collect();
        let q: Vec<u64> = if self.q.is_empty() {
            generate_primes(self.log_n, &self.log_q, &mut used)?
        } else {
            self.q.clone()
        };
        let p: Vec<u64> = if self.p.is_empty() {
            generate_primes(self.log_n, &self.log_p, &mut used)?
        } else {
            self.p.clone()
        };
        Ok((q, p))
    }
}

fn check_moduli(q: &[u64], p: &[u64]) -> Result<()> {
    if let Some(x) = q.iter().chain(p.iter()).find(|&&x| x < 2) {
        return config(format!("modulus {x} must be at least 2"));
    }
    Ok(())
}

/// Generates distinct primes q = 1 mod 2N, each the closest available to
/// 2^log_q[i], alternating above and below. Primes already in `used` are skipped.
pub fn generate_primes(log_n: usize, log_q: &[usize], used: &mut Vec<u64>) -> Result<Vec<u64>> {
    const MAX_ITERATIONS: u64 = 1 << 22;

    let two_n: u64 = 1 << (log_n + 1);

    log_q
        .iter()
        .map(|&logq| {
            if logq > 61 || logq <= log_n + 1 {
                return config(format!("log_q={logq} must be in ({}, 61]", log_n + 1));
            }

            let base: u64 = (1u64 << logq) + 1;

            let is_new_prime = |x: u64, used: &[u64]| -> bool {
                Integer::from(x).is_probably_prime(30) != IsPrime::No && !used.contains(&x)
            };

            let mut k: u64 = 0;
            while k < MAX_ITERATIONS {
                let up: u64 = base + k * two_n;
                if is_new_prime(up, used) {
                    used.push(up);
                    return Ok(up);
                }
                k += 1;
                if let Some(down) = base.checked_sub(k * two_n) {
                    if down > two_n && is_new_prime(down, used) {
                        used.push(down);
                        return Ok(down);
                    }
                }
            }

            config(format!("no NTT-friendly prime found near 2^{logq}"))
        })
        .collect()
}

/// Immutable parameter set shared by all elements of a circuit.
#[derive(Clone)]
pub struct Parameters {
    log_n: usize,
    q: Vec<Float>,
    p: Float,
    level_p: usize,
    h: usize,
    sigma: f64,
    default_scale: Float,
    prec: u32,
    heuristic: bool,
    noiseless: bool,
    sparse_packing_base: f64,
    encoder: Arc<Encoder>,
    sk: Arc<SecretKeyProxy>,
}

impl Parameters {
    pub fn new(literal: &ParametersLiteral, source: &mut Source) -> Result<Self> {
        let (q, p) = literal.moduli()?;

        let prec: u32 = literal.prec;
        let n: usize = 1 << literal.log_n;

        let mut params: Parameters = Self {
            log_n: literal.log_n,
            q: Vec::new(),
            p: Float::new(prec),
            level_p: 0,
            h: literal.h,
            sigma: literal.sigma,
            default_scale: pow2(prec, literal.log_default_scale as i32),
            prec,
            heuristic: literal.heuristic,
            noiseless: literal.noiseless,
            sparse_packing_base: literal.sparse_packing_base,
            encoder: Arc::new(Encoder::new(n, prec)),
            sk: Arc::new(SecretKeyProxy::zero(prec, n >> 1)),
        };

        params.set_moduli(&q, &p);
        params.sk = Arc::new(SecretKeyProxy::sample(&params, literal.h, source)?);

        debug!(
            log_n = params.log_n,
            levels = params.q.len(),
            level_p = params.level_p,
            log_qp = params.log_qp(),
            h = params.h,
            heuristic = params.heuristic,
            "parameters"
        );

        Ok(params)
    }

    fn set_moduli(&mut self, q: &[u64], p: &[u64]) {
        self.q = q.iter().map(|&qi| Float::with_val(self.prec, qi)).collect();
        self.p = p.iter().fold(Float::with_val(self.prec, 1), |acc, &pi| acc * pi);
        self.level_p = p.len() - 1;
    }

    /// Returns a copy with a freshly sampled secret of the given weight.
    pub fn with_secret(&self, weight: usize, source: &mut Source) -> Result<Self> {
        let mut params: Parameters = self.clone();
        params.h = weight;
        params.sk = Arc::new(SecretKeyProxy::sample(self, weight, source)?);
        Ok(params)
    }

    /// Returns a copy with a different modulus chain, sharing the encoder and the secret.
    pub fn with_moduli(&self, q: &[u64], p: &[u64]) -> Result<Self> {
        if q.is_empty() || p.is_empty() {
            return config("empty modulus chain");
        }
        check_moduli(q, p)?;
        let mut params: Parameters = self.clone();
        params.set_moduli(q, p);
        Ok(params)
    }

    pub fn n(&self) -> usize {
        1 << self.log_n
    }

    pub fn log_n(&self) -> usize {
        self.log_n
    }

    pub fn max_slots(&self) -> usize {
        1 << self.log_max_slots()
    }

    pub fn log_max_slots(&self) -> usize {
        self.log_n - 1
    }

    pub fn max_level(&self) -> usize {
        self.q.len() - 1
    }

    pub fn q(&self, level: usize) -> &Float {
        &self.q[level]
    }

    pub fn q_chain(&self) -> &[Float] {
        &self.q
    }

    /// Q[0] * ... * Q[level]
    pub fn q_product(&self, level: usize) -> Float {
        self.q[..level + 1]
            .iter()
            .fold(Float::with_val(self.prec, 1), |acc, qi| acc * qi)
    }

    pub fn p(&self) -> &Float {
        &self.p
    }

    pub fn level_p(&self) -> usize {
        self.level_p
    }

    /// Number of RNS digits of the gadget decomposition at level_q.
    pub fn decomp_rns(&self, level_q: usize) -> usize {
        (level_q + self.level_p + 1) / (self.level_p + 1)
    }

    /// Product of the moduli of the i-th RNS digit at level_q.
    pub fn q_alpha(&self, i: usize, level_q: usize) -> Float {
        let start: usize = i * (self.level_p + 1);
        let end: usize = ((i + 1) * (self.level_p + 1)).min(level_q + 1);
        self.q[start..end]
            .iter()
            .fold(Float::with_val(self.prec, 1), |acc, qi| acc * qi)
    }

    pub fn h(&self) -> usize {
        self.h
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn default_scale(&self) -> &Float {
        &self.default_scale
    }

    pub fn prec(&self) -> u32 {
        self.prec
    }

    pub fn heuristic(&self) -> bool {
        self.heuristic
    }

    pub fn noiseless(&self) -> bool {
        self.noiseless
    }

    pub fn sparse_packing_base(&self) -> f64 {
        self.sparse_packing_base
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn sk(&self) -> &SecretKeyProxy {
        &self.sk
    }

    /// target * Q[level] / in
    pub fn optimal_scaling_factor(&self, in_scale: &Float, target_scale: &Float, level: usize) -> Float {
        let mut f: Float = Float::with_val(self.prec, target_scale * &self.q[level]);
        f /= in_scale;
        f
    }

    /// log2(Q[0] * ... * Q[max_level] * P)
    pub fn log_qp(&self) -> f64 {
        let qp: Float = self.q_product(self.max_level()) * &self.p;
        qp.log2().to_f64()
    }
}
