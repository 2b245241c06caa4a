use chc_core::RngHandle;
use chc_graph::{gen_linear_system, GraphBuilder, Normalizer};
use chc_logic::TermContext;
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_build_graph(c: &mut Criterion) {
    c.bench_function("normalize_and_build_24_clauses", |b| {
        b.iter(|| {
            let mut ctx = TermContext::new();
            let mut rng = RngHandle::from_seed(7);
            let system = gen_linear_system(&mut ctx, 4, 24, &mut rng).unwrap();
            let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
            GraphBuilder::new().build(normalized).unwrap()
        })
    });
}

criterion_group!(benches, bench_build_graph);
criterion_main!(benches);
