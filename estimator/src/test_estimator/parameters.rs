use std::sync::Arc;

use backend::{Complex, Float, complex_zeros};
use sampling::source::Source;

use crate::{
    error::Error,
    noise,
    parameters::{Parameters, ParametersLiteral, generate_primes},
    test_estimator::new_params,
};

fn small_literal() -> ParametersLiteral {
    ParametersLiteral {
        log_n: 10,
        log_q: vec![55, 45, 45, 45],
        log_p: vec![58, 58],
        h: 64,
        ..Default::default()
    }
}

#[test]
fn generated_primes() {
    let log_n: usize = 10;
    let log_q: Vec<usize> = vec![40, 40, 40, 50, 61];
    let mut used: Vec<u64> = Vec::new();
    let primes: Vec<u64> = generate_primes(log_n, &log_q, &mut used).unwrap();

    assert_eq!(primes, used);
    primes.iter().zip(log_q.iter()).for_each(|(&q, &logq)| {
        println!("test generated_primes 2^{}: {}", logq, q);
        assert_eq!(q % (1 << (log_n + 1)), 1);
        assert!(((q as f64).log2() - logq as f64).abs() < 0.01);
    });

    let mut sorted: Vec<u64> = primes.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), primes.len());

    assert!(matches!(generate_primes(log_n, &[62], &mut used), Err(Error::Config(_))));
    assert!(matches!(generate_primes(log_n, &[11], &mut used), Err(Error::Config(_))));
}

#[test]
fn accessors() {
    let params: Arc<Parameters> = new_params(&small_literal());
    let prec: u32 = params.prec();

    assert_eq!(params.n(), 1024);
    assert_eq!(params.max_slots(), 512);
    assert_eq!(params.max_level(), 3);
    assert_eq!(params.level_p(), 1);
    assert_eq!(params.sk().weight(), 64);
    assert_eq!(params.sk().s().len(), params.max_slots());
    assert_eq!(params.default_scale().to_f64(), (40.0f64).exp2());

    let want: Float = Float::with_val(prec, params.q(0) * params.q(1));
    assert_eq!(params.q_product(1), want);

    // Two special primes: digits of two moduli, the last one truncated.
    assert_eq!(params.decomp_rns(0), 1);
    assert_eq!(params.decomp_rns(1), 1);
    assert_eq!(params.decomp_rns(2), 2);
    assert_eq!(params.decomp_rns(3), 2);
    assert_eq!(params.q_alpha(1, 2), *params.q(2));
    assert_eq!(params.q_alpha(1, 3), Float::with_val(prec, params.q(2) * params.q(3)));

    let log_qp: f64 = params.log_qp();
    assert!((log_qp - (55.0 + 3.0 * 45.0 + 2.0 * 58.0)).abs() < 0.1);

    let in_scale: Float = params.default_scale().clone();
    let target: Float = Float::with_val(prec, 1u64 << 35);
    let f: Float = params.optimal_scaling_factor(&in_scale, &target, 2);
    assert_eq!(f, Float::with_val(prec, &target * params.q(2)) / &in_scale);
}

#[test]
fn secret_proxy() {
    let params: Arc<Parameters> = new_params(&small_literal());
    let mut source: Source = Source::new([9u8; 32]);

    let eph: Parameters = params.with_secret(16, &mut source).unwrap();
    assert_eq!(eph.sk().weight(), 16);
    assert_eq!(eph.h(), 16);
    assert_eq!(eph.q_chain(), params.q_chain());

    // s is the FFT of an integer vector of weight h, so sum |s_j|^2 = (N/2) * h.
    let energy: f64 = eph
        .sk()
        .s()
        .iter()
        .map(|x| Float::with_val(eph.prec(), x.abs_ref()).to_f64().powi(2))
        .sum();
    let want: f64 = (eph.n() >> 1) as f64 * 16.0;
    assert!((energy / want - 1.0).abs() < 1e-9, "{energy} != {want}");

    eph.sk().s().iter().zip(eph.sk().s2().iter()).for_each(|(s, s2)| {
        let sq: Complex = Complex::with_val(eph.prec(), s.square_ref());
        assert_eq!(&sq, s2);
    });

    assert_eq!(eph.sk().pow(1).unwrap(), eph.sk().s());
    assert_eq!(eph.sk().pow(2).unwrap(), eph.sk().s2());
    assert!(matches!(eph.sk().pow(0), Err(Error::Precondition(_))));
    assert!(matches!(eph.sk().pow(3), Err(Error::Precondition(_))));

    // Rounding errors are only tracked up to s^2.
    let mut values: Vec<Complex> = complex_zeros(eph.prec(), eph.max_slots());
    assert!(noise::add_rounding_noise(&eph, &mut source, &mut values, 2).is_ok());
    assert!(matches!(
        noise::add_rounding_noise(&eph, &mut source, &mut values, 3),
        Err(Error::Precondition(_))
    ));

    assert!(matches!(params.with_secret(params.n() + 1, &mut source), Err(Error::Config(_))));
}

#[test]
fn invalid_literals() {
    let mut source: Source = Source::new([0u8; 32]);
    let cases: Vec<(&str, ParametersLiteral)> = vec![
        ("log_n", ParametersLiteral { log_n: 0, ..small_literal() }),
        ("weight", ParametersLiteral { h: 1025, ..small_literal() }),
        ("empty chain", ParametersLiteral { log_q: vec![], ..small_literal() }),
        ("empty p", ParametersLiteral { log_p: vec![], ..small_literal() }),
        ("q and log_q", ParametersLiteral { q: vec![1 << 40], ..small_literal() }),
        ("prec", ParametersLiteral { prec: 32, ..small_literal() }),
        ("sigma", ParametersLiteral { sigma: -1.0, ..small_literal() }),
        ("packing base", ParametersLiteral { sparse_packing_base: 0.5, ..small_literal() }),
    ];
    cases.iter().for_each(|(name, literal)| {
        println!("test invalid_literals {}", name);
        assert!(matches!(Parameters::new(literal, &mut source), Err(Error::Config(_))));
    });
}

#[test]
fn explicit_moduli() {
    let params: Arc<Parameters> = new_params(&small_literal());
    let q: Vec<u64> = vec![(1u64 << 55) + 1, (1u64 << 45) + 1];
    let p: Vec<u64> = vec![(1u64 << 61) - 1];

    let sub: Parameters = params.with_moduli(&q, &p).unwrap();
    assert_eq!(sub.max_level(), 1);
    assert_eq!(sub.level_p(), 0);
    assert_eq!(*sub.q(1), Float::with_val(sub.prec(), q[1]));

    let cases: Vec<(&str, Vec<u64>, Vec<u64>)> = vec![
        ("empty q", vec![], p.clone()),
        ("empty p", q.clone(), vec![]),
        ("q = 1", vec![q[0], 1], p.clone()),
        ("p = 0", q.clone(), vec![0]),
    ];
    cases.iter().for_each(|(name, q, p)| {
        println!("test explicit_moduli {}", name);
        assert!(matches!(params.with_moduli(q, p), Err(Error::Config(_))));
    });
}

#[test]
fn literal_json() {
    let literal: ParametersLiteral = small_literal();
    let json: String = literal.to_json().unwrap();
    assert_eq!(ParametersLiteral::from_json(&json).unwrap(), literal);

    // Missing fields take their default value.
    let partial: ParametersLiteral = ParametersLiteral::from_json(r#"{"log_n": 12, "h": 32}"#).unwrap();
    assert_eq!(partial.log_n, 12);
    assert_eq!(partial.h, 32);
    assert_eq!(partial.log_q, ParametersLiteral::default().log_q);

    assert!(matches!(ParametersLiteral::from_json("{\"log_n\": \"x\"}"), Err(Error::Json(_))));
}
