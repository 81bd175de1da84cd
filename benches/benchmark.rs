use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ndarray::Array2;
use ndarray_rand::{RandomExt, rand_distr::Uniform};
use tpsrs::ThinPlateSpline;

fn control_points(n: usize) -> (Array2<f64>, Array2<f64>) {
    let src = Array2::random((n, 2), Uniform::new(0., 100.));
    let dst = &src + Array2::random((n, 2), Uniform::new(-2., 2.));
    (src, dst)
}

fn fit_benchmark(c: &mut Criterion) {
    let mut fit = c.benchmark_group("fit");
    fit.sample_size(10);

    for n in [50, 200] {
        let (src, dst) = control_points(n);
        fit.bench_function(format!("fit {n} points"), |b| {
            b.iter_batched(
                || (src.clone(), dst.clone()),
                |(src, dst)| tpsrs::generate(src, dst),
                BatchSize::SmallInput,
            )
        });
    }
}

fn project_benchmark(c: &mut Criterion) {
    let mut project = c.benchmark_group("project");
    project.sample_size(10);

    let (src, dst) = control_points(100);
    let tps = ThinPlateSpline::generate(&src, &dst).unwrap();
    let queries = Array2::random((100_000, 2), Uniform::new(0., 100.));

    project.bench_function("project blocking", |b| {
        b.iter(|| tps.project_points(queries.view()))
    });

    #[cfg(feature = "parallel")]
    project.bench_function("project parallel", |b| {
        b.iter(|| tps.project_points_par(queries.view()))
    });
}

criterion_group!(benches, fit_benchmark, project_benchmark);
criterion_main!(benches);
