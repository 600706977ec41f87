use criterion::{criterion_group, criterion_main, Criterion};
use lanelr::{
    grammar::{Grammar, GrammarDef, GrammarError},
    Options, Phase2,
};
use lanelr_tests::grammars;
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_simple_1, bench_simple_2, bench_min_caml);

fn bench_simple_1(c: &mut Criterion) {
    bench_generate(c, "g_simple1", grammars::g_simple1);
    bench_generate(c, "g_simple2", grammars::g_simple2);
}

fn bench_simple_2(c: &mut Criterion) {
    bench_generate(c, "g1", grammars::g1);
    bench_generate(c, "g2", grammars::g2);
    bench_generate(c, "g4", grammars::g4);
}

fn bench_min_caml(c: &mut Criterion) {
    bench_generate(c, "min_caml", grammars::min_caml);
}

fn bench_generate(
    c: &mut Criterion,
    name: &str,
    f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarError>,
) {
    let grammar = Grammar::define(f).unwrap();
    let mut group = c.benchmark_group(name);
    group.bench_function("LALR", |b| {
        b.iter(|| black_box(Options::new().use_lalr().generate(&grammar)));
    });
    group.bench_function("LaneTracing", |b| {
        b.iter(|| {
            black_box(
                Options::new()
                    .use_lane_tracing(Phase2::PGM)
                    .generate(&grammar),
            )
        });
    });
    group.finish();
}
