use std::sync::Arc;

use backend::{Complex, Float, complex_zeros, is_pow2, slots_add_inplace, slots_mul_add, slots_mul_float, slots_replicate, slots_rotate, slots_rotate_inplace};
use itertools::Itertools;
use sampling::source::Source;
use tracing::{debug, instrument};
use utils::Map;

use crate::element::Element;
use crate::error::{Result, config, precondition};
use crate::evaluator::Evaluator;
use crate::noise;
use crate::parameters::Parameters;

/// Baby-step giant-step decomposition of a set of diagonal indices.
#[derive(Clone, Debug, Default)]
pub struct BsgsIndex {
    /// giant step -> baby steps, such that each diagonal is giant + baby.
    pub index: Map<usize, Vec<usize>>,
    pub giant: Vec<usize>,
    pub baby: Vec<usize>,
}

/// Splits every diagonal d into (d / n1) * n1 + (d mod n1).
pub fn bsgs_index<'a>(diagonals: impl IntoIterator<Item = &'a usize>, slots: usize, n1: usize) -> BsgsIndex {
    let mut index: Map<usize, Vec<usize>> = Map::new();
    let mut baby: Vec<usize> = Vec::new();

    diagonals.into_iter().for_each(|&d| {
        let d: usize = d & (slots - 1);
        let giant: usize = ((d / n1) * n1) & (slots - 1);
        let b: usize = d & (n1 - 1);
        index.get_or_insert_with(giant, Vec::new).push(b);
        baby.push(b);
    });

    index.0.values_mut().for_each(|v| {
        v.sort_unstable();
        v.dedup();
    });

    BsgsIndex {
        giant: index.sorted_keys(),
        baby: baby.into_iter().sorted_unstable().dedup().collect(),
        index,
    }
}

/// Returns the smallest power of two N1 whose baby/giant ratio reaches 2^log_max_ratio.
pub fn find_best_bsgs_ratio<'a>(diagonals: impl IntoIterator<Item = &'a usize> + Clone, slots: usize, log_max_ratio: usize) -> usize {
    let max_ratio: f64 = (1u64 << log_max_ratio) as f64;

    let mut n1: usize = 1;
    while n1 < slots {
        let idx: BsgsIndex = bsgs_index(diagonals.clone(), slots, n1);
        let ratio: f64 = (idx.baby.len() as f64 - 1.0) / (idx.giant.len() as f64 - 1.0);

        if ratio == max_ratio {
            return n1;
        }

        if ratio > max_ratio {
            return (n1 >> 1).max(1);
        }

        n1 <<= 1;
    }

    1
}

/// Plaintext matrix given by its nonzero diagonals.
///
/// The diagonal d holds M[k][(k + d) mod slots] at position k.
#[derive(Clone, Debug)]
pub struct LinearTransformation {
    pub diagonals: Map<usize, Vec<Complex>>,
    pub log_slots: usize,
    pub log_bsgs_ratio: usize,
    pub level: usize,
    pub scale: Float,
}

impl LinearTransformation {
    /// Indices are taken modulo the number of slots; diagonals landing on the
    /// same index are summed. Shorter diagonals are zero-padded.
    pub fn new(
        diagonals: impl IntoIterator<Item = (isize, Vec<Complex>)>,
        log_slots: usize,
        log_bsgs_ratio: usize,
        level: usize,
        scale: Float,
    ) -> Result<Self> {
        let slots: usize = 1 << log_slots;
        let prec: u32 = scale.prec();

        let mut map: Map<usize, Vec<Complex>> = Map::new();

        for (d, diag) in diagonals {
            if diag.len() > slots {
                return config(format!("diagonal {d} has {} > {slots} values", diag.len()));
            }
            let k: usize = d.rem_euclid(slots as isize) as usize;
            let acc: &mut Vec<Complex> = map.get_or_insert_with(k, || complex_zeros(prec, slots));
            acc.iter_mut().zip(diag.iter()).for_each(|(a, b)| *a += b);
        }

        Ok(Self {
            diagonals: map,
            log_slots,
            log_bsgs_ratio,
            level,
            scale,
        })
    }

    pub fn slots(&self) -> usize {
        1 << self.log_slots
    }

    /// Returns sum_d diag_d * rot(values, d).
    pub fn apply_plaintext(&self, values: &[Complex]) -> Vec<Complex> {
        let slots: usize = self.slots();
        let prec: u32 = self.scale.prec();

        let values: Vec<Complex> = values.iter().cycle().take(slots).cloned().collect();

        let mut out: Vec<Complex> = complex_zeros(prec, slots);
        self.diagonals.iter().for_each(|(&d, diag)| {
            let rotated: Vec<Complex> = slots_rotate(&values, d);
            slots_mul_add(&mut out, diag, &rotated);
        });
        out
    }

    /// Encodes the transform with the N1 given by [find_best_bsgs_ratio].
    pub fn encode(&self, params: &Arc<Parameters>, source: &mut Source) -> Result<EncodedLinearTransformation> {
        let keys: Vec<usize> = self.diagonals.sorted_keys();
        let n1: usize = find_best_bsgs_ratio(&keys, self.slots(), self.log_bsgs_ratio);
        self.encode_with_n1(params, source, n1)
    }

    #[instrument(skip_all, fields(log_slots = self.log_slots, n1 = n1))]
    pub fn encode_with_n1(&self, params: &Arc<Parameters>, source: &mut Source, n1: usize) -> Result<EncodedLinearTransformation> {
        let slots: usize = self.slots();

        if self.log_slots > params.log_max_slots() {
            return precondition(format!(
                "log_slots={} > log_max_slots={}",
                self.log_slots,
                params.log_max_slots()
            ));
        }

        if self.level > params.max_level() {
            return precondition(format!("level={} > max_level={}", self.level, params.max_level()));
        }

        if !is_pow2(n1) || n1 > slots {
            return config(format!("n1={n1} must be a power of two dividing slots={slots}"));
        }

        let keys: Vec<usize> = self.diagonals.sorted_keys();
        let index: BsgsIndex = bsgs_index(&keys, slots, n1);

        let mut diagonals: Map<usize, Vec<Complex>> = Map::new();

        for &j in &index.giant {
            for &i in &index.index.0[&j] {
                let d: usize = (i + j) & (slots - 1);
                let diag: &Vec<Complex> = &self.diagonals.0[&d];
                let mut v: Vec<Complex> = slots_replicate(&slots_rotate(diag, (slots - j) & (slots - 1)), params.max_slots());
                slots_mul_float(&mut v, &self.scale);
                let e: Vec<Complex> = noise::sparse_rounding_noise(params, source, self.log_slots);
                slots_add_inplace(&mut v, &e);
                diagonals.insert(d, v);
            }
        }

        debug!(giant = index.giant.len(), baby = index.baby.len(), "encoded linear transformation");

        Ok(EncodedLinearTransformation {
            n1,
            index,
            diagonals,
            log_slots: self.log_slots,
            level: self.level,
            scale: self.scale.clone(),
        })
    }
}

/// Linear transform ready for homomorphic evaluation: diagonal d = i + j is
/// stored pre-rotated by -j, scaled and with its encoding error.
#[derive(Clone, Debug)]
pub struct EncodedLinearTransformation {
    pub n1: usize,
    pub index: BsgsIndex,
    pub diagonals: Map<usize, Vec<Complex>>,
    pub log_slots: usize,
    pub level: usize,
    pub scale: Float,
}

impl EncodedLinearTransformation {
    pub fn is_empty(&self) -> bool {
        self.diagonals.is_empty()
    }
}

impl Evaluator {
    /// Evaluates sum_j rot_j(sum_i diag_{i+j} * rot_i(el)) with hoisted baby steps.
    ///
    /// The output keeps the input level and has scale el.scale * lt.scale.
    #[instrument(skip_all, fields(n1 = lt.n1, level = el.level))]
    pub fn evaluate_linear_transformation(&mut self, el: &Element, lt: &EncodedLinearTransformation) -> Result<Element> {
        if lt.is_empty() {
            return Ok(el.clone());
        }

        if el.degree() != 1 {
            return precondition(format!("linear transformation: degree={} != 1", el.degree()));
        }

        if el.level < lt.level {
            return precondition(format!("linear transformation: level={} < {}", el.level, lt.level));
        }

        let params: Arc<Parameters> = el.params().clone();
        let prec: u32 = params.prec();
        let max_slots: usize = params.max_slots();
        let slots: usize = 1 << lt.log_slots;

        let mut hoisted: Map<usize, Vec<Complex>> = Map::new();
        for &i in lt.index.baby.iter().filter(|&&i| i != 0) {
            hoisted.insert(i, self.rotate_hoisted(el, i)?);
        }

        let mut pre0: Vec<Complex> = el.value[0].clone();
        let mut pre1: Vec<Complex> = el.value[1].clone();
        slots_mul_float(&mut pre0, params.p());
        slots_mul_float(&mut pre1, params.p());

        let mut out0: Vec<Complex> = complex_zeros(prec, max_slots);
        let mut out1: Vec<Complex> = complex_zeros(prec, max_slots);

        for &j in &lt.index.giant {
            let mut acc0: Vec<Complex> = complex_zeros(prec, max_slots);
            let mut acc1: Vec<Complex> = complex_zeros(prec, max_slots);

            for &i in &lt.index.index.0[&j] {
                let diag: &Vec<Complex> = &lt.diagonals.0[&((i + j) & (slots - 1))];
                if i == 0 {
                    slots_mul_add(&mut acc0, diag, &pre0);
                    slots_mul_add(&mut acc1, diag, &pre1);
                } else {
                    slots_mul_add(&mut acc0, diag, &hoisted.0[&i]);
                }
            }

            if j != 0 {
                let e_ct: Vec<Complex> = noise::rounding_noise(&params, self.source());
                let e: Vec<Complex> = noise::key_switching_noise_raw(&params, self.source(), el.level, &e_ct, params.sk().s())?;
                slots_add_inplace(&mut acc0, &e);
                slots_rotate_inplace(&mut acc0, j);
                slots_rotate_inplace(&mut acc1, j);
            }

            slots_add_inplace(&mut out0, &acc0);
            slots_add_inplace(&mut out1, &acc1);
        }

        let mut out: Element = Element::zero(&params, 1, el.level, lt.log_slots, Float::with_val(prec, &el.scale * &lt.scale))?;
        out.value = vec![out0, out1];
        self.mod_down(&mut out)?;

        Ok(out)
    }

    /// Encodes `lt` with the given N1 and evaluates it.
    pub fn evaluate_linear_transformation_with_n1(&mut self, el: &Element, lt: &LinearTransformation, n1: usize) -> Result<Element> {
        let params: Arc<Parameters> = el.params().clone();
        let encoded: EncodedLinearTransformation = lt.encode_with_n1(&params, self.source(), n1)?;
        self.evaluate_linear_transformation(el, &encoded)
    }
}
