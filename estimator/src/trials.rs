use std::sync::Arc;

use rayon::prelude::*;
use sampling::source::Source;
use tracing::{debug, info, instrument};

use crate::error::{Result, config};
use crate::evaluator::Evaluator;
use crate::parameters::Parameters;
use crate::stats::{PrecisionStats, Stats};

/// Repeats a circuit over independent noise realizations.
///
/// Trial i runs on its own [Evaluator] seeded with the i-th seed drawn from
/// the master seed, so results do not depend on the thread schedule.
#[derive(Clone, Copy, Debug)]
pub struct MonteCarlo {
    pub trials: usize,
    pub seed: [u8; 32],
}

impl MonteCarlo {
    pub fn new(trials: usize, seed: [u8; 32]) -> Self {
        Self { trials, seed }
    }

    #[instrument(skip_all, fields(trials = self.trials, log_n = params.log_n()))]
    pub fn run<F>(&self, params: &Arc<Parameters>, circuit: F) -> Result<Stats>
    where
        F: Fn(&mut Evaluator) -> Result<PrecisionStats> + Sync,
    {
        if self.trials == 0 {
            return config("monte carlo: zero trials");
        }

        let mut master: Source = Source::new(self.seed);
        let seeds: Vec<[u8; 32]> = (0..self.trials).map(|_| master.new_seed()).collect();

        let results: Vec<Result<PrecisionStats>> = seeds
            .into_par_iter()
            .enumerate()
            .map(|(i, seed)| {
                let mut eval: Evaluator = Evaluator::new(params.clone(), Source::new(seed));
                let res: Result<PrecisionStats> = circuit(&mut eval);
                if let Ok(stats) = &res {
                    debug!(trial = i, min_l2 = stats.prec.min.l2, mean_l2 = stats.prec.mean.l2, "trial done");
                }
                res
            })
            .collect();

        let mut stats: Stats = Stats::new();
        for res in results {
            stats.add(&res?)?;
        }
        stats.finalize();

        info!(
            trials = stats.count,
            min_l2 = stats.prec.min.l2,
            mean_l2 = stats.prec.mean.l2,
            std_l2 = stats.prec.std.l2,
            "monte carlo done"
        );

        Ok(stats)
    }
}
