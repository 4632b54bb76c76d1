use std::sync::Arc;

use backend::{Complex, DEFAULT_PREC, Float, complex, pi};
use sampling::source::Source;

use crate::{
    element::Element,
    error::Error,
    evaluator::Evaluator,
    linear_transform::{BsgsIndex, EncodedLinearTransformation, LinearTransformation, bsgs_index, find_best_bsgs_ratio},
    parameters::Parameters,
    test_estimator::{max_diff, new_params, noiseless_literal, random_values},
};

#[test]
fn bsgs_index_split() {
    let diagonals: Vec<usize> = vec![0, 1, 2, 5, 9, 15];
    let idx: BsgsIndex = bsgs_index(&diagonals, 16, 4);
    assert_eq!(idx.giant, vec![0, 4, 8, 12]);
    assert_eq!(idx.baby, vec![0, 1, 2, 3]);
    assert_eq!(idx.index.get(&0), Some(&vec![0, 1, 2]));
    assert_eq!(idx.index.get(&4), Some(&vec![1]));
    assert_eq!(idx.index.get(&12), Some(&vec![3]));
}

#[test]
fn find_best_bsgs_ratio_ties() {
    let all: Vec<usize> = (0..16).collect();
    // n1 = 4 gives 3 baby steps for 3 giant steps.
    assert_eq!(find_best_bsgs_ratio(&all, 16, 0), 4);
    // n1 = 8 overshoots a ratio of 2.
    assert_eq!(find_best_bsgs_ratio(&all, 16, 1), 4);
    assert_eq!(find_best_bsgs_ratio(&all, 16, 2), 4);
    // No split below 16 reaches a ratio of 8.
    assert_eq!(find_best_bsgs_ratio(&all, 16, 3), 1);
    assert_eq!(find_best_bsgs_ratio(&[0usize], 16, 2), 1);
}

#[test]
fn bsgs_matches_plaintext() {
    [3usize, 4].iter().for_each(|&log_slots| {
        println!("test bsgs_matches_plaintext log_slots: {}", log_slots);
        test_bsgs_matches_plaintext(log_slots);
    });
}

fn test_bsgs_matches_plaintext(log_slots: usize) {
    let params: Arc<Parameters> = new_params(&noiseless_literal(6, 40, 3));
    let slots: usize = 1 << log_slots;
    let mut source: Source = Source::new([3u8; 32]);

    let diagonals: Vec<(isize, Vec<Complex>)> = [-1isize, 0, 1, 2, 5, (slots - 3) as isize]
        .iter()
        .map(|&d| (d, random_values(&mut source, slots, 1.0)))
        .collect();

    let lt: LinearTransformation =
        LinearTransformation::new(diagonals, log_slots, 1, params.max_level(), params.default_scale().clone()).unwrap();

    let values: Vec<Complex> = random_values(&mut source, slots, 1.0);
    let want: Vec<Complex> = lt.apply_plaintext(&values);

    let ct: Element = Element::new(&params, Some(&values[..]), 1, log_slots, params.default_scale().clone()).unwrap();

    let mut eval: Evaluator = Evaluator::new(params.clone(), Source::new([0u8; 32]));

    let mut n1: usize = 1;
    while n1 <= slots {
        let out: Element = eval.evaluate_linear_transformation_with_n1(&ct, &lt, n1).unwrap();
        assert_eq!(out.level, ct.level);
        assert_eq!(out.scale, Float::with_val(DEFAULT_PREC, &ct.scale * &lt.scale));
        let diff: f64 = max_diff(&out.decode(), &want);
        println!("test bsgs_matches_plaintext n1: {} diff: {:e}", n1, diff);
        assert!(diff < 1e-20);
        n1 <<= 1;
    }

    assert!(matches!(
        eval.evaluate_linear_transformation_with_n1(&ct, &lt, 3),
        Err(Error::Config(_))
    ));
}

/// The 16-point DFT written as diagonals maps the all-ones vector to (16, 0, ..., 0).
#[test]
fn dft_of_ones() {
    let log_slots: usize = 4;
    let slots: usize = 1 << log_slots;
    let prec: u32 = DEFAULT_PREC;
    let params: Arc<Parameters> = new_params(&noiseless_literal(6, 40, 5));

    // M[k][l] = exp(-2*pi*i*k*l/16), diagonal d holds M[k][k + d].
    let omega = |e: usize| -> Complex {
        let mut angle: Float = pi(prec) * 2u32;
        angle *= (e % slots) as u64;
        angle /= slots as u64;
        let (sin, cos) = angle.sin_cos(Float::new(prec));
        Complex::with_val(prec, (cos, -sin))
    };

    let diagonals: Vec<(isize, Vec<Complex>)> = (0..slots)
        .map(|d| (d as isize, (0..slots).map(|k| omega(k * ((k + d) % slots))).collect()))
        .collect();

    let lt: LinearTransformation =
        LinearTransformation::new(diagonals, log_slots, 2, params.max_level(), params.default_scale().clone()).unwrap();

    let ones: Vec<Complex> = vec![complex(prec, 1.0, 0.0); slots];
    let mut want: Vec<Complex> = vec![complex(prec, 0.0, 0.0); slots];
    want[0] = complex(prec, slots as f64, 0.0);

    assert!(max_diff(&lt.apply_plaintext(&ones), &want) < 1e-30);

    let mut source: Source = Source::new([0u8; 32]);
    let encoded: EncodedLinearTransformation = lt.encode(&params, &mut source).unwrap();
    assert_eq!(encoded.n1, 4);
    assert_eq!(encoded.diagonals.len(), slots);

    let ct: Element = Element::new(&params, Some(&ones[..]), 1, log_slots, params.default_scale().clone()).unwrap();
    let mut eval: Evaluator = Evaluator::new(params.clone(), Source::new([0u8; 32]));
    let out: Element = eval.evaluate_linear_transformation(&ct, &encoded).unwrap();
    assert!(max_diff(&out.decode(), &want) < 1e-20);
}

#[test]
fn diagonals_wrap_and_sum() {
    let prec: u32 = DEFAULT_PREC;
    let scale: Float = Float::with_val(prec, 1);
    let one: Vec<Complex> = vec![complex(prec, 1.0, 0.0); 8];

    let lt: LinearTransformation = LinearTransformation::new(vec![(-1, one.clone()), (7, one.clone())], 3, 1, 0, scale.clone()).unwrap();
    assert_eq!(lt.diagonals.len(), 1);
    assert_eq!(lt.diagonals.get(&7).unwrap()[0], complex(prec, 2.0, 0.0));

    let long: Vec<Complex> = vec![complex(prec, 1.0, 0.0); 9];
    assert!(matches!(
        LinearTransformation::new(vec![(0, long)], 3, 1, 0, scale),
        Err(Error::Config(_))
    ));
}
