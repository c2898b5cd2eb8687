use jpegdec_rs::jpeg1::dct::{idct_8x8, idct_8x8_reference};
use std::time::Instant;

fn main() {
    println!("Benchmarking IDCT implementations...");

    #[rustfmt::skip]
    let input = [
        80.0, 40.0, -16.0, 8.0, 0.0, 0.0, 0.0, 0.0,
        24.0, 8.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        -8.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ]; // Dequantized coefficients of a smooth block

    let iterations = 200_000;

    let mut output_reference = [0.0f64; 64];
    let start = Instant::now();
    for _ in 0..iterations {
        idct_8x8_reference(std::hint::black_box(&input), &mut output_reference);
        std::hint::black_box(output_reference);
    }
    let duration_reference = start.elapsed();
    println!(
        "Reference (direct sum) IDCT: {:?} for {} iterations",
        duration_reference, iterations
    );

    let mut output_fast = [0.0f64; 64];
    let start = Instant::now();
    for _ in 0..iterations {
        output_fast.copy_from_slice(std::hint::black_box(&input));
        idct_8x8(&mut output_fast);
        std::hint::black_box(output_fast);
    }
    let duration_fast = start.elapsed();
    println!(
        "Fast (butterfly) IDCT: {:?} for {} iterations",
        duration_fast, iterations
    );

    let speedup = duration_reference.as_secs_f64() / duration_fast.as_secs_f64();
    println!("Speedup: {:.2}x", speedup);

    let max_diff = output_reference
        .iter()
        .zip(output_fast.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    println!("Max difference between reference and fast: {}", max_diff);

    if max_diff < 1e-9 {
        println!("Accuracy: PASSED (Tolerance < 1e-9)");
    } else {
        println!("Accuracy: FAILED (Tolerance > 1e-9)");
    }
}
