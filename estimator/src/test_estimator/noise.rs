use std::sync::Arc;

use backend::{Complex, Float, Stats, complex_to_f64, complex_zeros};
use sampling::source::Source;

use crate::{
    error::Result,
    noise,
    parameters::{Parameters, ParametersLiteral},
    test_estimator::new_params,
};

type Sampler = fn(&Parameters, &mut Source) -> Result<Vec<Complex>>;

fn std_of(params: &Parameters, source: &mut Source, draws: usize, sampler: Sampler) -> f64 {
    let values: Vec<f64> = (0..draws)
        .flat_map(|_| sampler(params, source).unwrap())
        .flat_map(|x| {
            let (re, im) = complex_to_f64(&x);
            [re, im]
        })
        .collect();
    values.std()
}

fn modes(log_n: usize) -> (Arc<Parameters>, Arc<Parameters>) {
    let literal = |heuristic: bool| ParametersLiteral {
        log_n,
        log_q: vec![50, 40, 40],
        log_p: vec![55, 55],
        h: 64,
        heuristic,
        ..Default::default()
    };
    (new_params(&literal(false)), new_params(&literal(true)))
}

#[test]
fn heuristic_matches_exact() {
    let samplers: [(&str, Sampler); 5] = [
        ("rounding", |p, s| Ok(noise::rounding_noise(p, s))),
        ("sparse_rounding", |p, s| Ok(noise::sparse_rounding_noise(p, s, p.log_max_slots()))),
        ("normal", |p, s| noise::normal_noise(p, s, p.sigma())),
        ("encryption_pk", noise::encryption_noise_pk),
        ("key_switching", |p, s| {
            let zeros: Vec<Complex> = complex_zeros(p.prec(), p.max_slots());
            noise::key_switching_noise_raw(p, s, 1, &zeros, p.sk().s())
        }),
    ];

    let (exact, heuristic) = modes(11);

    samplers.iter().for_each(|(name, sampler)| {
        let mut source: Source = Source::new([0u8; 32]);
        let want: f64 = std_of(&exact, &mut source, 8, *sampler);
        let have: f64 = std_of(&heuristic, &mut source, 8, *sampler);
        println!("test heuristic_matches_exact {}: {} ~ {}", name, have, want);
        assert!((have / want - 1.0).abs() < 0.05, "{name}: {have} != {want}");
    });
}

#[test]
fn rounding_noise_std() {
    (8..12).for_each(|log_n| {
        println!("test rounding_noise_std log_n: {}", log_n);
        let (exact, _) = modes(log_n);
        let mut source: Source = Source::new([0u8; 32]);
        let have: f64 = std_of(&exact, &mut source, 32, |p, s| Ok(noise::rounding_noise(p, s)));
        let want: f64 = ((1usize << (log_n - 1)) as f64 / 12.0).sqrt();
        assert!((have / want - 1.0).abs() < 0.05, "{have} != {want}");
    });
}

#[test]
fn sparse_noise_is_periodic() {
    let (exact, _) = modes(8);
    let mut source: Source = Source::new([0u8; 32]);
    let log_slots: usize = 4;
    let slots: usize = 1 << log_slots;
    let e: Vec<Complex> = noise::sparse_rounding_noise(&exact, &mut source, log_slots);
    assert_eq!(e.len(), exact.max_slots());
    (slots..e.len()).for_each(|i| assert_eq!(e[i], e[i - slots]));
}

#[test]
fn irwin_hall_noise_std() {
    let (exact, heuristic) = modes(10);
    let prec: u32 = exact.prec();
    let q0: Float = Float::with_val(prec, 1);
    let h: usize = 64;

    let mut source: Source = Source::new([0u8; 32]);
    let want: f64 = std_of(&exact, &mut source, 8, |p, s| noise::irwin_hall_noise(p, s, 64, &Float::with_val(p.prec(), 1)));
    let have: f64 = std_of(&heuristic, &mut source, 8, |p, s| noise::irwin_hall_noise(p, s, 64, &Float::with_val(p.prec(), 1)));
    println!("test irwin_hall_noise_std: {} ~ {}", have, want);
    assert!((have / want - 1.0).abs() < 0.05);

    let e: Vec<Complex> = noise::irwin_hall_noise(&exact, &mut source, h, &q0).unwrap();
    assert_eq!(e.len(), exact.max_slots());
}

#[test]
fn noiseless_samplers_are_zero() {
    let literal: ParametersLiteral = ParametersLiteral {
        log_n: 6,
        log_q: vec![50, 40],
        log_p: vec![55],
        h: 16,
        noiseless: true,
        ..Default::default()
    };
    let params: Arc<Parameters> = new_params(&literal);
    let mut source: Source = Source::new([0u8; 32]);
    let zeros: Vec<Complex> = complex_zeros(params.prec(), params.max_slots());

    assert_eq!(noise::rounding_noise(&params, &mut source), zeros);
    assert_eq!(noise::encryption_noise_sk(&params, &mut source).unwrap(), zeros);
    assert_eq!(noise::encryption_noise_pk(&params, &mut source).unwrap(), zeros);
    assert_eq!(
        noise::key_switching_noise(&params, &mut source, 1, &zeros, params.sk().s()).unwrap(),
        zeros
    );
}
