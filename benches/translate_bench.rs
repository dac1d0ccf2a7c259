//! Translation Benchmark
//!
//! Measures batch translation throughput (methods/sec) with and without the
//! thread pool and the cast-expansion pass.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use jsil::metadata::{MethodRef, PrimitiveKind, TypeRef, well_known};
use jsil::translator::il::*;
use jsil::{InMemoryMetadata, NullSink, TranslationSession, TranslatorOptions};
use std::sync::Arc;

// =============================================================================
// Inputs
// =============================================================================

/// A loop that sums and widens `statements` times.
fn method_body(index: usize, statements: usize) -> MethodBody {
    let int32 = TypeRef::value_type("System.Int32");
    let i = ILVariable::local("i", int32.clone());
    let total = ILVariable::local("total", TypeRef::value_type("System.Int64"));

    let mut nodes = Vec::with_capacity(statements);
    for step in 0..statements {
        let step = i32::try_from(step).unwrap_or(i32::MAX);
        let sum = ILExpression::new(ILCode::Add)
            .with_argument(ILExpression::ldloc(&i))
            .with_argument(ILExpression::ldc_i4(step))
            .typed(int32.clone());
        let widened = ILExpression::new(ILCode::Conv(PrimitiveKind::Int64)).with_argument(sum);
        nodes.push(ILNode::Expression(ILExpression::stloc(&total, widened)));
    }

    let method = MethodRef::new(
        TypeRef::class("Bench.Program"),
        &format!("M{index}"),
        TypeRef::value_type(well_known::VOID),
    )
    .static_method();
    MethodBody::new(
        method,
        ILBlock::new(vec![ILNode::WhileLoop {
            condition: None,
            body: ILBlock::new(nodes),
        }]),
    )
}

fn batch(methods: usize, statements: usize) -> Vec<MethodBody> {
    (0..methods).map(|i| method_body(i, statements)).collect()
}

fn session(use_threads: bool, simplify_casts: bool) -> TranslationSession {
    let options = TranslatorOptions {
        use_threads,
        simplify_casts,
        ..TranslatorOptions::default()
    };
    TranslationSession::new(Arc::new(InMemoryMetadata::new()), options)
        .unwrap_or_else(|err| panic!("session setup failed: {err:#}"))
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_single_method(c: &mut Criterion) {
    let session = session(false, true);
    let body = method_body(0, 64);
    c.bench_function("translate_single_method", |b| {
        b.iter(|| black_box(session.translate(black_box(&body), &NullSink)));
    });
}

fn bench_batch_threads(c: &mut Criterion) {
    let bodies = batch(256, 32);
    let mut group = c.benchmark_group("translate_batch");
    group.throughput(Throughput::Elements(bodies.len() as u64));

    for use_threads in [false, true] {
        let session = session(use_threads, true);
        group.bench_with_input(
            BenchmarkId::new("threads", use_threads),
            &bodies,
            |b, bodies| {
                b.iter(|| black_box(session.translate_batch(bodies, &NullSink)));
            },
        );
    }
    group.finish();
}

fn bench_cast_expansion(c: &mut Criterion) {
    let bodies = batch(64, 64);
    let mut group = c.benchmark_group("simplify_casts");

    for simplify_casts in [false, true] {
        let session = session(false, simplify_casts);
        group.bench_with_input(
            BenchmarkId::from_parameter(simplify_casts),
            &bodies,
            |b, bodies| {
                b.iter(|| black_box(session.translate_batch(bodies, &NullSink)));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_single_method,
    bench_batch_threads,
    bench_cast_expansion
);
criterion_main!(benches);
