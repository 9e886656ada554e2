//! Equation pipeline benchmarks
//!
//! - Equation compilation
//! - Column-wise evaluation of a compiled equation
//! - Seeded train/test split
//! - Scoring a hall of fame against test rows

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use med_sweep::dataset::Dataset;
use med_sweep::equation::compile;
use med_sweep::evaluate::evaluate;
use med_sweep::hall_of_fame::{EquationRecord, HallOfFame};
use med_sweep::split::split;
use std::sync::Arc;

const EQUATION: &str = "exp(0.5 * param1) / (param2 + 1.5) - log(param1 + 1) ^ 2";

/// Create a dataset with two parameters and a target
#[allow(clippy::cast_precision_loss)]
fn create_test_dataset(num_rows: usize) -> Dataset {
    let schema = Schema::new(vec![
        Field::new("param1", DataType::Float64, false),
        Field::new("param2", DataType::Float64, false),
        Field::new("target_col", DataType::Float64, false),
    ]);

    let p1: Vec<f64> = (0..num_rows).map(|i| (i % 97) as f64 * 0.1).collect();
    let p2: Vec<f64> = (0..num_rows).map(|i| (i % 13) as f64).collect();
    let target: Vec<f64> = p1.iter().zip(&p2).map(|(a, b)| a * a + b).collect();

    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from(p1)),
            Arc::new(Float64Array::from(p2)),
            Arc::new(Float64Array::from(target)),
        ],
    )
    .unwrap();
    Dataset::new(batch)
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_equation", |b| {
        b.iter(|| {
            let f = compile(black_box(EQUATION), &["param1", "param2"]).unwrap();
            black_box(f);
        });
    });
}

fn bench_evaluate_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_columns");
    let f = compile(EQUATION, &["param1", "param2"]).unwrap();

    for size in [1_000, 10_000, 100_000] {
        let data = create_test_dataset(size);
        let p1 = data.numeric_column("param1").unwrap();
        let p2 = data.numeric_column("param2").unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = f.evaluate_columns(&[&p1[..], &p2[..]]).unwrap();
                black_box(out);
            });
        });
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for size in [1_000, 10_000, 100_000] {
        let data = create_test_dataset(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let parts = split(&data, 0.7, black_box(88)).unwrap();
                black_box(parts);
            });
        });
    }

    group.finish();
}

/// Full scoring: sort, compile, evaluate and build the result table
fn bench_score_hall_of_fame(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_hall_of_fame");
    let hall_of_fame = HallOfFame::from_records(vec![
        EquationRecord::new("param1", 1),
        EquationRecord::new("param1 * param1", 3),
        EquationRecord::new("param1 * param1 + param2", 5),
        EquationRecord::new(EQUATION, 14),
    ]);

    for size in [1_000, 10_000] {
        let data = create_test_dataset(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let table =
                    evaluate(&data, &hall_of_fame, &["param1", "param2"], "target_col").unwrap();
                black_box(table);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_evaluate_columns,
    bench_split,
    bench_score_hall_of_fame
);
criterion_main!(benches);
