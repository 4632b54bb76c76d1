//! Homomorphic DFT: the special FFT of the canonical embedding factored into
//! sparse matrices with three nonzero diagonals per butterfly layer.
//!
//! Matrices are not bit-reversed: [DftType::HomomorphicEncode] leaves the
//! coefficients in bit-reversed order and [DftType::HomomorphicDecode]
//! expects them in that order.

use std::sync::Arc;

use backend::{Complex, Float, complex, complex_zeros, pi, slots_mul_float, slots_rotate};
use sampling::source::Source;
use tracing::instrument;
use utils::Map;

use crate::element::Element;
use crate::error::{Result, config, precondition};
use crate::evaluator::Evaluator;
use crate::linear_transform::{EncodedLinearTransformation, LinearTransformation};
use crate::parameters::Parameters;

type Diagonals = Map<usize, Vec<Complex>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DftType {
    /// Slots to coefficients (inverse special FFT).
    HomomorphicEncode,
    /// Coefficients to slots (special FFT).
    HomomorphicDecode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DftFormat {
    Standard,
    /// Real and imaginary parts are returned as two elements.
    SplitRealAndImag,
    /// The imaginary part is packed in the upper half of a sparse packing.
    RepackImagAsReal,
}

#[derive(Clone, Debug)]
pub struct DftMatrixLiteral {
    pub kind: DftType,
    pub format: DftFormat,
    pub log_slots: usize,
    pub level_start: usize,
    /// Number of moduli consumed by each matrix of the factorization.
    pub levels: Vec<usize>,
    pub scaling: Option<f64>,
    pub log_bsgs_ratio: usize,
}

impl DftMatrixLiteral {
    /// Number of moduli consumed.
    pub fn depth(&self) -> usize {
        self.levels.iter().sum()
    }

    /// log2 of the vector length: one more than log_slots when the imaginary part is repacked.
    pub fn log_dslots(&self, log_n: usize) -> usize {
        if self.format == DftFormat::RepackImagAsReal && self.log_slots < log_n - 1 {
            self.log_slots + 1
        } else {
            self.log_slots
        }
    }

    /// Returns the sparse diagonals of each matrix of the factorization.
    pub fn gen_matrices(&self, log_n: usize, prec: u32) -> Vec<Diagonals> {
        let log_slots: usize = self.log_slots;
        let slots: usize = 1 << log_slots;
        let log_dslots: usize = self.log_dslots(log_n);
        let dslots: usize = 1 << log_dslots;
        let depth: usize = self.levels.len();
        let kind: DftType = self.kind;
        let repack: bool = log_dslots != log_slots;

        let roots: Vec<Complex> = roots(slots << 2, prec);

        let mut pow5: Vec<usize> = vec![1; (slots << 1) + 1];
        (1..pow5.len()).for_each(|i| pow5[i] = (pow5[i - 1] * 5) & ((slots << 2) - 1));

        let layers: Vec<[Vec<Complex>; 3]> = butterfly_layers(kind, log_slots, dslots, &roots, &pow5, prec);

        // Number of butterfly layers merged in each matrix.
        let mut merge: Vec<usize> = vec![0; depth];
        let mut remaining: usize = log_slots;
        (0..depth).for_each(|i| {
            let d: usize = remaining.div_ceil(depth - i);
            match kind {
                DftType::HomomorphicEncode => merge[i] = d,
                DftType::HomomorphicDecode => merge[depth - 1 - i] = d,
            }
            remaining -= d;
        });

        let mut fft_level: usize = log_slots;
        let mut matrices: Vec<Diagonals> = Vec::with_capacity(depth);

        (0..depth).for_each(|i| {
            let layer = |level: usize| &layers[log_slots - level];

            let (mut mat, n): (Diagonals, usize) = if repack && kind == DftType::HomomorphicDecode && i == 0 {
                let mat: Diagonals = repack_matrix(log_slots, prec);
                (
                    multiply_with_next_level(&mat, kind, log_slots, slots << 1, fft_level, layer(fft_level)),
                    slots << 1,
                )
            } else {
                (diag_matrix(kind, log_slots, fft_level, layer(fft_level)), slots)
            };

            (1..merge[i]).for_each(|k| {
                let next: usize = fft_level - k;
                mat = multiply_with_next_level(&mat, kind, log_slots, n, next, layer(next));
            });

            fft_level -= merge[i];
            matrices.push(mat);
        });

        if repack && kind == DftType::HomomorphicEncode {
            if let Some(last) = matrices.last_mut() {
                last.0.values_mut().for_each(|v| {
                    v[slots..].iter_mut().for_each(|x| *x = Complex::new(prec));
                });
            }
        }

        let mut scaling: Float = Float::with_val(prec, self.scaling.unwrap_or(1.0));
        if kind == DftType::HomomorphicEncode {
            scaling /= slots as u64;
            if self.format != DftFormat::Standard {
                scaling /= 2u32;
            }
        }
        scaling.root_mut(depth as u32);

        matrices.iter_mut().for_each(|mat| {
            mat.0.values_mut().for_each(|v| slots_mul_float(v, &scaling));
        });

        matrices
    }
}

fn roots(m: usize, prec: u32) -> Vec<Complex> {
    let two_pi: Float = pi(prec) * 2u32;
    (0..m)
        .map(|k| {
            let mut angle: Float = two_pi.clone();
            angle *= k as u64;
            angle /= m as u64;
            let (sin, cos) = angle.sin_cos(Float::new(prec));
            Complex::with_val(prec, (cos, sin))
        })
        .collect()
}

/// Per butterfly layer, the three diagonals (a, b, c) of (v[i], v[i + rot], v[i - rot]).
fn butterfly_layers(
    kind: DftType,
    log_slots: usize,
    dslots: usize,
    roots: &[Complex],
    pow5: &[usize],
    prec: u32,
) -> Vec<[Vec<Complex>; 3]> {
    let slots: usize = 1 << log_slots;
    let size: usize = dslots / slots;
    let one: Complex = complex(prec, 1.0, 0.0);

    let ms: Vec<usize> = match kind {
        DftType::HomomorphicDecode => (1..log_slots + 1).map(|l| 1 << l).collect(),
        DftType::HomomorphicEncode => (1..log_slots + 1).rev().map(|l| 1 << l).collect(),
    };

    ms.into_iter()
        .map(|m| {
            let mut a: Vec<Complex> = complex_zeros(prec, dslots);
            let mut b: Vec<Complex> = complex_zeros(prec, dslots);
            let mut c: Vec<Complex> = complex_zeros(prec, dslots);

            let tt: usize = m >> 1;
            let gap: usize = slots / m;
            let mask: usize = (m << 2) - 1;

            (0..slots).step_by(m).for_each(|i| {
                (0..tt).for_each(|j| {
                    let (idx1, idx2) = (i + j, i + j + tt);
                    (0..size).for_each(|u| {
                        let (i1, i2) = (idx1 + u * slots, idx2 + u * slots);
                        match kind {
                            DftType::HomomorphicDecode => {
                                let w: &Complex = &roots[(pow5[j] & mask) * gap];
                                a[i1] = one.clone();
                                a[i2] = Complex::with_val(prec, -w);
                                b[i1] = w.clone();
                                c[i2] = one.clone();
                            }
                            DftType::HomomorphicEncode => {
                                let w: &Complex = &roots[((m << 2) - (pow5[j] & mask)) * gap];
                                a[i1] = one.clone();
                                a[i2] = Complex::with_val(prec, -w);
                                b[i1] = one.clone();
                                c[i2] = w.clone();
                            }
                        }
                    })
                })
            });

            [a, b, c]
        })
        .collect()
}

fn rotation(kind: DftType, log_slots: usize, fft_level: usize) -> usize {
    match kind {
        DftType::HomomorphicEncode => 1 << (fft_level - 1),
        DftType::HomomorphicDecode => 1 << (log_slots - fft_level),
    }
}

fn add_to_diagonal(mat: &mut Diagonals, k: usize, v: Vec<Complex>) {
    match mat.get_mut(&k) {
        Some(acc) => acc.iter_mut().zip(v.iter()).for_each(|(x, y)| *x += y),
        None => {
            mat.insert(k, v);
        }
    }
}

fn mul_slots(a: &[Complex], b: &[Complex]) -> Vec<Complex> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| Complex::with_val(x.prec(), x * y))
        .collect()
}

fn diag_matrix(kind: DftType, log_slots: usize, fft_level: usize, layer: &[Vec<Complex>; 3]) -> Diagonals {
    let rot: usize = rotation(kind, log_slots, fft_level);
    let mut mat: Diagonals = Map::new();
    add_to_diagonal(&mut mat, 0, layer[0].clone());
    add_to_diagonal(&mut mat, rot, layer[1].clone());
    add_to_diagonal(&mut mat, (1 << log_slots) - rot, layer[2].clone());
    mat
}

/// Returns L * M, where L is the butterfly layer at `next_level`.
fn multiply_with_next_level(
    mat: &Diagonals,
    kind: DftType,
    log_slots: usize,
    n: usize,
    next_level: usize,
    layer: &[Vec<Complex>; 3],
) -> Diagonals {
    let rot: usize = rotation(kind, log_slots, next_level) & (n - 1);
    let mut out: Diagonals = Map::new();

    mat.sorted_keys().into_iter().for_each(|i| {
        let v: &Vec<Complex> = &mat.0[&i];
        let len: usize = v.len();
        add_to_diagonal(&mut out, i, mul_slots(v, &layer[0]));
        add_to_diagonal(&mut out, (i + rot) & (n - 1), mul_slots(&slots_rotate(v, rot), &layer[1]));
        add_to_diagonal(
            &mut out,
            (i + n - rot) & (n - 1),
            mul_slots(&slots_rotate(v, (len - rot) % len), &layer[2]),
        );
    });

    out
}

/// Maps (re, im) halves to re + i * im on both halves.
fn repack_matrix(log_slots: usize, prec: u32) -> Diagonals {
    let slots: usize = 1 << log_slots;
    let one: Complex = complex(prec, 1.0, 0.0);
    let i: Complex = complex(prec, 0.0, 1.0);

    let a: Vec<Complex> = (0..slots << 1).map(|k| if k < slots { one.clone() } else { i.clone() }).collect();
    let b: Vec<Complex> = (0..slots << 1).map(|k| if k < slots { i.clone() } else { one.clone() }).collect();

    let mut mat: Diagonals = Map::new();
    mat.insert(0, a);
    mat.insert(slots, b);
    mat
}

/// Encoded DFT: one linear transformation per entry of `levels`.
#[derive(Clone, Debug)]
pub struct DftMatrix {
    pub kind: DftType,
    pub format: DftFormat,
    pub log_slots: usize,
    pub log_dslots: usize,
    pub levels: Vec<usize>,
    pub matrices: Vec<EncodedLinearTransformation>,
}

impl DftMatrix {
    /// Matrix i is encoded at level_start minus the levels consumed by the
    /// previous matrices, with a scale equal to the product of the moduli it
    /// consumes, so that the DFT preserves the scale.
    pub fn new(literal: &DftMatrixLiteral, params: &Arc<Parameters>, source: &mut Source) -> Result<Self> {
        if literal.levels.is_empty() || literal.levels.contains(&0) {
            return config(format!("invalid DFT levels {:?}", literal.levels));
        }

        if literal.log_slots == 0 || literal.log_slots > params.log_max_slots() {
            return config(format!(
                "DFT log_slots={} must be in [1, {}]",
                literal.log_slots,
                params.log_max_slots()
            ));
        }

        if literal.levels.len() > literal.log_slots {
            return config(format!(
                "{} DFT matrices > {} butterfly layers",
                literal.levels.len(),
                literal.log_slots
            ));
        }

        if literal.level_start > params.max_level() || literal.depth() > literal.level_start {
            return config(format!(
                "DFT depth {} does not fit below level_start={} (max_level={})",
                literal.depth(),
                literal.level_start,
                params.max_level()
            ));
        }

        let prec: u32 = params.prec();
        let log_dslots: usize = literal.log_dslots(params.log_n());

        let mut level: usize = literal.level_start;
        let mut matrices: Vec<EncodedLinearTransformation> = Vec::with_capacity(literal.levels.len());

        for (mat, &consumed) in literal.gen_matrices(params.log_n(), prec).into_iter().zip(literal.levels.iter()) {
            let scale: Float = (0..consumed).fold(Float::with_val(prec, 1), |acc, k| acc * params.q(level - k));
            let lt: LinearTransformation = LinearTransformation::new(
                mat.0.into_iter().map(|(k, v)| (k as isize, v)),
                log_dslots,
                literal.log_bsgs_ratio,
                level,
                scale,
            )?;
            matrices.push(lt.encode(params, source)?);
            level -= consumed;
        }

        Ok(Self {
            kind: literal.kind,
            format: literal.format,
            log_slots: literal.log_slots,
            log_dslots,
            levels: literal.levels.clone(),
            matrices,
        })
    }

    pub fn depth(&self) -> usize {
        self.levels.iter().sum()
    }

    fn repacks(&self) -> bool {
        self.format == DftFormat::RepackImagAsReal && self.log_dslots != self.log_slots
    }
}

impl Evaluator {
    /// Applies each matrix, rescaling by the moduli it consumes.
    #[instrument(skip_all, fields(kind = ?mat.kind, level = el.level))]
    pub fn dft(&mut self, el: &Element, mat: &DftMatrix) -> Result<Element> {
        let mut out: Element = el.clone();

        for (lt, &consumed) in mat.matrices.iter().zip(mat.levels.iter()) {
            out = self.evaluate_linear_transformation(&out, lt)?;
            for _ in 0..consumed {
                self.rescale(&mut out)?;
            }
        }

        if mat.kind == DftType::HomomorphicDecode {
            out.log_slots = mat.log_slots;
        }

        Ok(out)
    }

    /// Homomorphic encoding: returns the real part and, for the split
    /// format, the imaginary part of the coefficients in the slots.
    #[instrument(skip_all, fields(level = el.level))]
    pub fn coeffs_to_slots(&mut self, el: &Element, mat: &DftMatrix) -> Result<(Element, Option<Element>)> {
        if mat.kind != DftType::HomomorphicEncode {
            return precondition("coeffs_to_slots requires an encoding matrix");
        }

        let zv: Element = self.dft(el, mat)?;

        if mat.format == DftFormat::Standard {
            return Ok((zv, None));
        }

        let conj: Element = self.conjugate_new(&zv)?;
        let mut real: Element = self.add_new(&zv, &conj)?;
        let mut imag: Element = self.sub_new(&zv, &conj)?;
        self.mul(&mut imag, (0.0, -1.0))?;

        if mat.repacks() {
            let slots: usize = 1 << mat.log_slots;
            self.rotate(&mut imag, slots)?;
            self.add(&mut real, &imag)?;
            real.log_slots = mat.log_dslots;
            return Ok((real, None));
        }

        Ok((real, Some(imag)))
    }

    /// Homomorphic decoding of real + i * imag.
    #[instrument(skip_all, fields(level = real.level))]
    pub fn slots_to_coeffs(&mut self, real: &Element, imag: Option<&Element>, mat: &DftMatrix) -> Result<Element> {
        if mat.kind != DftType::HomomorphicDecode {
            return precondition("slots_to_coeffs requires a decoding matrix");
        }

        let mut el: Element = real.clone();
        if let Some(imag) = imag {
            self.mul_then_add(imag, (0.0, 1.0), &mut el)?;
        }

        self.dft(&el, mat)
    }
}
