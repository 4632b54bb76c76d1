use crate::{distributions::Distributions, source::Source};

fn mean_and_std(xs: &[f64]) -> (f64, f64) {
    let n: f64 = xs.len() as f64;
    let mean: f64 = xs.iter().sum::<f64>() / n;
    let var: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[test]
fn source_is_reproducible() {
    let mut a: Source = Source::new([7u8; 32]);
    let mut b: Source = Source::new([7u8; 32]);
    (0..64).for_each(|_| assert_eq!(a.next_f64(-1.0, 1.0), b.next_f64(-1.0, 1.0)));

    let mut ca: Source = a.branch();
    let mut cb: Source = b.branch();
    (0..64).for_each(|_| assert_eq!(ca.next_usize(1000), cb.next_usize(1000)));
}

#[test]
fn next_usize_in_range() {
    let mut source: Source = Source::new([0u8; 32]);
    [1usize, 2, 3, 17, 1024].iter().for_each(|&max| {
        (0..256).for_each(|_| assert!(source.next_usize(max) < max));
    });
}

#[test]
fn distributions_moments() {
    let mut source: Source = Source::new([0u8; 32]);
    let n: usize = 1 << 16;

    let rounding: Vec<f64> = (0..n).map(|_| Distributions::rounding().sample(&mut source)).collect();
    let (mean, std) = mean_and_std(&rounding);
    println!("rounding: mean={mean} std={std}");
    assert!(mean.abs() < 0.01);
    assert!((std - (1.0f64 / 12.0).sqrt()).abs() < 0.01);

    let normal: Distributions = Distributions::normal(3.2, 6.0 * 3.2).unwrap();
    let gaussian: Vec<f64> = (0..n).map(|_| normal.sample(&mut source)).collect();
    let (mean, std) = mean_and_std(&gaussian);
    println!("normal: mean={mean} std={std}");
    assert!(mean.abs() < 0.1);
    assert!((std - 3.2).abs() < 0.1);
    assert!(gaussian.iter().all(|x| x.abs() <= 6.0 * 3.2));

    let ternary: Vec<f64> = (0..n).map(|_| Distributions::Ternary(0.5).sample(&mut source)).collect();
    let (_, std) = mean_and_std(&ternary);
    println!("ternary: std={std}");
    assert!((std - 0.5f64.sqrt()).abs() < 0.02);

    let h: usize = 64;
    let irwin_hall: Vec<f64> = (0..n / 16).map(|_| Distributions::IrwinHall(h).sample(&mut source)).collect();
    assert!(irwin_hall.iter().all(|x| x.fract() == 0.0));
    let (mean, std) = mean_and_std(&irwin_hall);
    println!("irwin-hall: mean={mean} std={std}");
    assert!(mean.abs() < 0.5);
    assert!((std - ((h + 1) as f64 / 12.0).sqrt()).abs() < 0.3);
}
