use std::sync::Arc;

use backend::Float;

use crate::element::Element;
use crate::error::{Result, config};
use crate::evaluator::Evaluator;
use crate::parameters::Parameters;

impl Evaluator {
    /// Approximates 1/x for x in [2^log2_min, 2 - 2^log2_min] with Goldschmidt's iteration.
    ///
    /// Each iteration after the first consumes one level.
    pub fn goldschmidt_division(&mut self, el: &Element, log2_min: f64) -> Result<Element> {
        let params: Arc<Parameters> = el.params().clone();

        let prec_target: f64 = (params.max_slots() as f64) / params.default_scale().to_f64();

        let mut start: f64 = 1.0 - log2_min.exp2();
        if !(start > 0.0 && start < 1.0) {
            return config(format!("goldschmidt: log2_min={log2_min} must be in (-52, 0)"));
        }

        let mut iters: usize = 1;
        while start >= prec_target {
            start *= start;
            iters += 1;
        }
        let iters: usize = iters.max(3);

        let mut a: Element = self.mul_new(el, -1i64)?;
        let mut b: Element = self.add_new(&a, 1i64)?;
        self.add(&mut a, 2i64)?;

        for _ in 1..iters {
            let sq: Element = b.clone();
            self.mul_relin(&mut b, &sq)?;
            self.rescale(&mut b)?;

            let mut tmp: Element = self.mul_relin_new(&a, &b)?;
            self.rescale(&mut tmp)?;

            let scale: Float = tmp.scale.clone();
            self.set_scale(&mut a, &scale)?;
            self.add(&mut a, &tmp)?;
        }

        Ok(a)
    }
}
