use backend::{Complex, Stats as SliceStats, complex_to_f64};
use serde::Serialize;

use crate::error::{Result, precondition};

/// Smallest error accounted for in the precision, capping it at ~53.15 bits.
const MIN_ERROR: f64 = 1e-16;

/// One value per measurement channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Channels {
    pub real: f64,
    pub imag: f64,
    pub l2: f64,
}

impl Channels {
    fn splat(x: f64) -> Self {
        Self { real: x, imag: x, l2: x }
    }

    fn zip(self, other: Channels, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            real: f(self.real, other.real),
            imag: f(self.imag, other.imag),
            l2: f(self.l2, other.l2),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            real: f(self.real),
            imag: f(self.imag),
            l2: f(self.l2),
        }
    }
}

/// Min, max, mean, median and standard deviation of per-slot samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub min: Channels,
    pub max: Channels,
    pub mean: Channels,
    pub median: Channels,
    pub std: Channels,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            min: Channels::splat(f64::INFINITY),
            max: Channels::splat(f64::NEG_INFINITY),
            mean: Channels::default(),
            median: Channels::default(),
            std: Channels::default(),
        }
    }
}

impl Summary {
    fn new(real: &[f64], imag: &[f64], l2: &[f64]) -> Self {
        let channel = |f: fn(&[f64]) -> f64| Channels {
            real: f(real),
            imag: f(imag),
            l2: f(l2),
        };
        Self {
            min: channel(<[f64] as SliceStats>::min),
            max: channel(<[f64] as SliceStats>::max),
            mean: channel(<[f64] as SliceStats>::mean),
            median: channel(<[f64] as SliceStats>::median),
            std: channel(<[f64] as SliceStats>::std),
        }
    }

    /// Running aggregate: extrema are kept, means and medians summed,
    /// variances summed.
    fn accumulate(&mut self, s: &Summary) {
        self.min = self.min.zip(s.min, f64::min);
        self.max = self.max.zip(s.max, f64::max);
        self.mean = self.mean.zip(s.mean, |a, b| a + b);
        self.median = self.median.zip(s.median, |a, b| a + b);
        self.std = self.std.zip(s.std, |a, b| a + b * b);
    }

    fn average(&mut self, n: f64) {
        self.mean = self.mean.map(|x| x / n);
        self.median = self.median.map(|x| x / n);
        self.std = self.std.map(|x| (x / n).sqrt());
    }

    fn columns(&self, worst: Channels) -> [[f64; 4]; 3] {
        let row = |f: fn(&Channels) -> f64| [f(&worst), f(&self.mean), f(&self.median), f(&self.std)];
        [row(|c| c.real), row(|c| c.imag), row(|c| c.l2)]
    }
}

/// Precision, in bits, of one decrypted vector against its expected value,
/// together with the log2 of the error.
#[derive(Clone, Debug, Serialize)]
pub struct PrecisionStats {
    /// -log2(max(err, 1e-16)); `prec.min` is the worst slot.
    pub prec: Summary,
    /// log2(err) without the 1e-16 floor; an exact slot counts as log2 of the
    /// smallest positive f64. `log2_err.max` is the worst slot.
    pub log2_err: Summary,
}

impl PrecisionStats {
    /// Compares the first 2^log_slots slots of `want` and `have`.
    pub fn new(want: &[Complex], have: &[Complex], log_slots: usize) -> Result<Self> {
        let slots: usize = 1 << log_slots;
        if want.len() < slots || have.len() < slots {
            return precondition(format!(
                "precision stats: {slots} slots but got {} and {} values",
                want.len(),
                have.len()
            ));
        }

        let mut err: [Vec<f64>; 3] = [
            Vec::with_capacity(slots),
            Vec::with_capacity(slots),
            Vec::with_capacity(slots),
        ];

        want.iter().zip(have.iter()).take(slots).for_each(|(w, h)| {
            let (wr, wi) = complex_to_f64(w);
            let (hr, hi) = complex_to_f64(h);
            let dr: f64 = (wr - hr).abs();
            let di: f64 = (wi - hi).abs();
            err[0].push(dr);
            err[1].push(di);
            err[2].push(dr.hypot(di));
        });

        let prec: Vec<Vec<f64>> = err.iter().map(|e| e.iter().map(|&x| precision(x)).collect()).collect();
        let log2_err: Vec<Vec<f64>> = err.iter().map(|e| e.iter().map(|&x| log2_error(x)).collect()).collect();

        Ok(Self {
            prec: Summary::new(&prec[0], &prec[1], &prec[2]),
            log2_err: Summary::new(&log2_err[0], &log2_err[1], &log2_err[2]),
        })
    }
}

fn precision(err: f64) -> f64 {
    -err.max(MIN_ERROR).log2()
}

fn log2_error(err: f64) -> f64 {
    err.max(f64::MIN_POSITIVE).log2()
}

/// Aggregate of the [PrecisionStats] of many trials.
///
/// Keeps the minimum of the minima and the maximum of the maxima; means and
/// medians are averaged and standard deviations combined in quadrature.
#[derive(Clone, Debug, Serialize)]
pub struct Stats {
    pub prec: Summary,
    pub log2_err: Summary,
    pub count: usize,
    finalized: bool,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            prec: Summary::default(),
            log2_err: Summary::default(),
            count: 0,
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn add(&mut self, s: &PrecisionStats) -> Result<()> {
        if self.finalized {
            return precondition("cannot add to finalized stats");
        }
        self.prec.accumulate(&s.prec);
        self.log2_err.accumulate(&s.log2_err);
        self.count += 1;
        Ok(())
    }

    /// Turns the running sums into averages. Calling it again has no effect.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        if self.count == 0 {
            return;
        }
        let n: f64 = self.count as f64;
        self.prec.average(n);
        self.log2_err.average(n);
    }

    /// Per channel (real, imag, L2): [min, mean, median, std] of the precision,
    /// followed by [max, mean, median, std] of the log2 error.
    pub fn tuple(&self) -> [[f64; 4]; 6] {
        let [pr, pi, pl] = self.prec.columns(self.prec.min);
        let [er, ei, el] = self.log2_err.columns(self.log2_err.max);
        [pr, pi, pl, er, ei, el]
    }

    pub fn row(&self) -> Vec<String> {
        self.tuple()
            .iter()
            .flat_map(|channel| channel.iter().map(|x| format!("{x:.2}")))
            .collect()
    }

    pub fn csv_header() -> Vec<String> {
        let prec = ["real", "imag", "l2"]
            .iter()
            .flat_map(|channel| ["min", "mean", "median", "std"].map(|stat| format!("{channel}_{stat}")));
        let err = ["real", "imag", "l2"]
            .iter()
            .flat_map(|channel| ["max", "mean", "median", "std"].map(|stat| format!("{channel}_log2_err_{stat}")));
        prec.chain(err).collect()
    }
}
