use std::sync::Arc;

use backend::{Complex, DEFAULT_PREC, complex, complex_zeros};

use crate::{
    element::KeyType,
    error::{Error, Result},
    evaluator::Evaluator,
    parameters::{Parameters, ParametersLiteral},
    stats::{PrecisionStats, Stats},
    test_estimator::new_params,
    trials::MonteCarlo,
};

fn shifted(n: usize, re: f64, im: f64) -> Vec<Complex> {
    vec![complex(DEFAULT_PREC, re, im); n]
}

#[test]
fn precision_stats() {
    let zeros: Vec<Complex> = complex_zeros(DEFAULT_PREC, 16);

    let exact: PrecisionStats = PrecisionStats::new(&zeros, &zeros, 4).unwrap();
    let cap: f64 = -(1e-16f64).log2();
    assert!((exact.prec.min.l2 - cap).abs() < 1e-9);
    assert!((exact.prec.max.real - cap).abs() < 1e-9);
    assert!(exact.prec.std.imag.abs() < 1e-9);

    let err: f64 = (-10.0f64).exp2();
    let stats: PrecisionStats = PrecisionStats::new(&zeros, &shifted(16, err, 0.0), 4).unwrap();
    assert!((stats.prec.mean.real - 10.0).abs() < 1e-9);
    assert!((stats.prec.median.l2 - 10.0).abs() < 1e-9);
    assert!((stats.prec.min.imag - cap).abs() < 1e-9);
    assert!((stats.log2_err.mean.real + 10.0).abs() < 1e-9);
    assert!((stats.log2_err.max.l2 + 10.0).abs() < 1e-9);
    assert!(stats.log2_err.std.real.abs() < 1e-9);
    assert_eq!(stats.log2_err.max.imag, f64::MIN_POSITIVE.log2());

    // Only the first 2^log_slots slots are compared.
    let mut have: Vec<Complex> = zeros.clone();
    have[8] = complex(DEFAULT_PREC, 1.0, 1.0);
    let stats: PrecisionStats = PrecisionStats::new(&zeros, &have, 3).unwrap();
    assert!((stats.prec.min.l2 - cap).abs() < 1e-9);

    // The log2 error is not floored: 2^-60 is below the precision cap.
    let tiny: PrecisionStats = PrecisionStats::new(&zeros, &shifted(16, (-60.0f64).exp2(), 0.0), 4).unwrap();
    assert!((tiny.prec.max.real - cap).abs() < 1e-9);
    assert!((tiny.log2_err.mean.real + 60.0).abs() < 1e-9);
    assert!((tiny.log2_err.max.l2 + 60.0).abs() < 1e-9);

    assert!(matches!(
        PrecisionStats::new(&zeros[..4], &zeros, 3),
        Err(Error::Precondition(_))
    ));
}

#[test]
fn stats_aggregate() {
    let zeros: Vec<Complex> = complex_zeros(DEFAULT_PREC, 8);
    let a: PrecisionStats = PrecisionStats::new(&zeros, &shifted(8, (-10.0f64).exp2(), 0.0), 3).unwrap();
    let b: PrecisionStats = PrecisionStats::new(&zeros, &shifted(8, (-20.0f64).exp2(), 0.0), 3).unwrap();

    let mut stats: Stats = Stats::new();
    stats.add(&a).unwrap();
    stats.add(&b).unwrap();
    assert!(!stats.is_finalized());
    stats.finalize();
    assert!(stats.is_finalized());

    assert_eq!(stats.count, 2);
    assert!((stats.prec.min.real - 10.0).abs() < 1e-9);
    assert!((stats.prec.max.real - 20.0).abs() < 1e-9);
    assert!((stats.prec.mean.real - 15.0).abs() < 1e-9);
    assert!((stats.prec.median.real - 15.0).abs() < 1e-9);
    assert!(stats.prec.std.real.abs() < 1e-9);

    assert!((stats.log2_err.min.real + 20.0).abs() < 1e-9);
    assert!((stats.log2_err.max.real + 10.0).abs() < 1e-9);
    assert!((stats.log2_err.mean.l2 + 15.0).abs() < 1e-9);
    assert!((stats.log2_err.median.real + 15.0).abs() < 1e-9);

    let tuple: [[f64; 4]; 6] = stats.tuple();
    stats.finalize();
    assert_eq!(stats.tuple(), tuple);

    assert!(matches!(stats.add(&a), Err(Error::Precondition(_))));
    assert_eq!(stats.count, 2);

    let header: Vec<String> = Stats::csv_header();
    let row: Vec<String> = stats.row();
    assert_eq!(header.len(), 24);
    assert_eq!(row.len(), 24);
    assert_eq!(header[0], "real_min");
    assert_eq!(row[0], "10.00");
    assert_eq!(header[12], "real_log2_err_max");
    assert_eq!(row[12], "-10.00");
    assert_eq!(row[13], "-15.00");

    let mut empty: Stats = Stats::default();
    empty.finalize();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.prec.mean.l2, 0.0);
}

#[test]
fn monte_carlo() {
    let params: Arc<Parameters> = new_params(&ParametersLiteral {
        log_n: 6,
        log_q: vec![55, 40],
        log_p: vec![61],
        h: 16,
        ..Default::default()
    });
    let log_slots: usize = params.log_max_slots();

    let circuit = |eval: &mut Evaluator| -> Result<PrecisionStats> {
        let (values, ct) = eval.new_test_vector((-1.0, -1.0), (1.0, 1.0), log_slots, KeyType::SecretKey)?;
        PrecisionStats::new(&values, &ct.decode(), log_slots)
    };

    assert!(matches!(
        MonteCarlo::new(0, [0u8; 32]).run(&params, circuit),
        Err(Error::Config(_))
    ));

    let stats: Stats = MonteCarlo::new(4, [7u8; 32]).run(&params, circuit).unwrap();
    assert_eq!(stats.count, 4);
    assert!(stats.is_finalized());
    assert!(stats.prec.min.l2 > 20.0);
    assert!(stats.prec.min.l2 <= stats.prec.mean.l2);

    let again: Stats = MonteCarlo::new(4, [7u8; 32]).run(&params, circuit).unwrap();
    assert_eq!(stats.tuple(), again.tuple());
}
