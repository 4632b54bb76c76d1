use std::sync::Arc;

use backend::{Complex, bit_reverse_inplace};
use sampling::source::Source;

use crate::{
    dft::{DftFormat, DftMatrix, DftMatrixLiteral, DftType},
    element::Element,
    error::Error,
    evaluator::Evaluator,
    parameters::Parameters,
    test_estimator::{max_diff, new_params, noiseless_literal, random_values},
};

fn literal(kind: DftType, format: DftFormat, log_slots: usize, level_start: usize, depth: usize) -> DftMatrixLiteral {
    DftMatrixLiteral {
        kind,
        format,
        log_slots,
        level_start,
        levels: vec![1; depth],
        scaling: None,
        log_bsgs_ratio: 1,
    }
}

/// The decoding matrices are the butterflies of the special FFT, without the bit-reversal.
#[test]
fn decode_matches_fft() {
    [1usize, 2, 4].iter().for_each(|&depth| {
        println!("test decode_matches_fft depth: {}", depth);
        test_decode_matches_fft(depth);
    });
}

fn test_decode_matches_fft(depth: usize) {
    let params: Arc<Parameters> = new_params(&noiseless_literal(5, 40, depth + 1));
    let log_slots: usize = params.log_max_slots();
    let slots: usize = params.max_slots();

    let mut source: Source = Source::new([0u8; 32]);
    let mat: DftMatrix = DftMatrix::new(
        &literal(DftType::HomomorphicDecode, DftFormat::Standard, log_slots, depth, depth),
        &params,
        &mut source,
    )
    .unwrap();
    assert_eq!(mat.depth(), depth);

    let values: Vec<Complex> = random_values(&mut source, slots, 1.0);

    let mut want: Vec<Complex> = values.clone();
    bit_reverse_inplace(&mut want);
    params.encoder().fft(&mut want, log_slots);

    let ct: Element = Element::new(&params, Some(&values[..]), 1, log_slots, params.default_scale().clone()).unwrap();
    let mut eval: Evaluator = Evaluator::new(params.clone(), Source::new([0u8; 32]));
    let out: Element = eval.dft(&ct, &mat).unwrap();

    assert_eq!(out.level, ct.level - depth);
    assert_eq!(out.scale, ct.scale);
    assert!(max_diff(&out.decode(), &want) < 1e-20);
}

/// CoeffsToSlots followed by SlotsToCoeffs is the identity for every output format.
#[test]
fn encode_decode_identity() {
    [
        (DftFormat::Standard, 4, 5),
        (DftFormat::SplitRealAndImag, 4, 5),
        (DftFormat::Standard, 3, 5),
        (DftFormat::RepackImagAsReal, 4, 5),
        (DftFormat::RepackImagAsReal, 3, 5),
    ]
    .iter()
    .for_each(|&(format, log_slots, log_n)| {
        println!(
            "test encode_decode_identity format: {:?} log_slots: {} log_n: {}",
            format, log_slots, log_n
        );
        test_encode_decode_identity(format, log_slots, log_n);
    });
}

fn test_encode_decode_identity(format: DftFormat, log_slots: usize, log_n: usize) {
    let params: Arc<Parameters> = new_params(&noiseless_literal(log_n, 40, 6));
    let slots: usize = 1 << log_slots;
    let max_level: usize = params.max_level();

    let mut source: Source = Source::new([0u8; 32]);
    let c2s: DftMatrix = DftMatrix::new(
        &literal(DftType::HomomorphicEncode, format, log_slots, max_level, 2),
        &params,
        &mut source,
    )
    .unwrap();
    let s2c: DftMatrix = DftMatrix::new(
        &literal(DftType::HomomorphicDecode, format, log_slots, max_level - 2, 2),
        &params,
        &mut source,
    )
    .unwrap();

    let values: Vec<Complex> = random_values(&mut source, slots, 1.0);
    let ct: Element = Element::new(&params, Some(&values[..]), 1, log_slots, params.default_scale().clone()).unwrap();

    let mut eval: Evaluator = Evaluator::new(params.clone(), Source::new([0u8; 32]));
    let (real, imag) = eval.coeffs_to_slots(&ct, &c2s).unwrap();

    // Without room to repack, the imaginary part comes back as a second element.
    let split: bool = format != DftFormat::Standard && c2s.log_dslots == log_slots;
    assert_eq!(imag.is_some(), split);
    assert_eq!(real.level, max_level - 2);

    let out: Element = eval.slots_to_coeffs(&real, imag.as_ref(), &s2c).unwrap();

    assert_eq!(out.level, max_level - 4);
    assert_eq!(out.log_slots, log_slots);
    assert!(max_diff(&out.decode(), &values) < 1e-20);

    assert!(matches!(
        eval.coeffs_to_slots(&ct, &s2c),
        Err(Error::Precondition(_))
    ));
}

#[test]
fn invalid_literals() {
    let params: Arc<Parameters> = new_params(&noiseless_literal(5, 40, 3));
    let mut source: Source = Source::new([0u8; 32]);

    let mut lit: DftMatrixLiteral = literal(DftType::HomomorphicEncode, DftFormat::Standard, 4, 2, 2);
    assert!(DftMatrix::new(&lit, &params, &mut source).is_ok());

    lit.levels = vec![1, 0];
    assert!(matches!(DftMatrix::new(&lit, &params, &mut source), Err(Error::Config(_))));

    lit.levels = vec![1, 1, 1];
    assert!(matches!(DftMatrix::new(&lit, &params, &mut source), Err(Error::Config(_))));

    lit.levels = vec![1; 5];
    lit.level_start = 2;
    assert!(matches!(DftMatrix::new(&lit, &params, &mut source), Err(Error::Config(_))));
}
