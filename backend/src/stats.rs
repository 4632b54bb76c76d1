use rug::Float;
use rug::float::Round;
use rug::ops::{AddAssignRound, DivAssignRound, SubAssignRound};

/// Summary statistics of a sample of f64 values.
pub trait Stats {
    /// Returns the arithmetic mean.
    fn mean(&self) -> f64;
    /// Returns the median (average of the two middle values for even lengths).
    fn median(&self) -> f64;
    /// Returns the population standard deviation.
    fn std(&self) -> f64;
    fn min(&self) -> f64;
    fn max(&self) -> f64;
}

const STATS_PREC: u32 = 128;

impl Stats for [f64] {
    fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mut avg: Float = Float::with_val(STATS_PREC, 0);
        self.iter().for_each(|x| {
            avg.add_assign_round(*x, Round::Nearest);
        });
        avg.div_assign_round(self.len() as u64, Round::Nearest);
        avg.to_f64()
    }

    fn median(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n: usize = sorted.len();
        if n & 1 == 1 {
            sorted[n >> 1]
        } else {
            (sorted[(n >> 1) - 1] + sorted[n >> 1]) / 2.0
        }
    }

    fn std(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        // std = sqrt(sum((xi - avg)^2) / n)
        let avg: Float = Float::with_val(STATS_PREC, self.mean());
        let mut std: Float = Float::with_val(STATS_PREC, 0);
        self.iter().for_each(|x| {
            let mut d: Float = Float::with_val(STATS_PREC, *x);
            d.sub_assign_round(&avg, Round::Nearest);
            std += &d * &d;
        });
        std.div_assign_round(self.len() as u64, Round::Nearest);
        std.sqrt().to_f64()
    }

    fn min(&self) -> f64 {
        self.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn max(&self) -> f64 {
        self.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}
