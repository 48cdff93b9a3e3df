#[macro_use]
extern crate criterion;
extern crate escapetime;

use criterion::{black_box, Criterion};
use escapetime::numeric::{BigFloat, Double, Rational, Single};
use escapetime::{iterate, FractalFamily, Limits, Numeric};

// A point on the boundary of the main cardioid never escapes, so every
// iteration counts against the full budget.
const BOUNDARY: (f64, f64) = (-0.75, 0.0);

fn run<B: Numeric>(backend: &B, limits: &Limits) -> usize {
    iterate(
        backend,
        &FractalFamily::Mandelbrot,
        black_box(BOUNDARY.0),
        black_box(BOUNDARY.1),
        limits,
    )
    .iterations
}

fn single(c: &mut Criterion) {
    let limits = Limits::default();
    c.bench_function("mandelbrot single", move |b| b.iter(|| run(&Single, &limits)));
}

fn double(c: &mut Criterion) {
    let limits = Limits::default();
    c.bench_function("mandelbrot double", move |b| b.iter(|| run(&Double, &limits)));
}

fn bigfloat(c: &mut Criterion) {
    let limits = Limits::default();
    let backend = BigFloat { precision_bits: 128 };
    c.bench_function("mandelbrot bigfloat 128", move |b| {
        b.iter(|| run(&backend, &limits))
    });
}

fn rational(c: &mut Criterion) {
    let limits = Limits::default();
    let backend = Rational { precision_bits: 128 };
    c.bench_function("mandelbrot rational 128", move |b| {
        b.iter(|| run(&backend, &limits))
    });
}

fn newton(c: &mut Criterion) {
    let limits = Limits::default();
    c.bench_function("newton double", move |b| {
        b.iter(|| {
            iterate(
                &Double,
                &FractalFamily::Newton,
                black_box(0.3),
                black_box(0.9),
                &limits,
            )
        })
    });
}

criterion_group!(backends, single, double, bigfloat, rational, newton);
criterion_main!(backends);
