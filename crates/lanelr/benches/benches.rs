use criterion::{criterion_group, criterion_main, Criterion};
use lanelr::{
    grammar::{Assoc, Grammar, GrammarError, SymbolID::*},
    Options, Phase2,
};
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_arithmetic);

fn arithmetic() -> Result<Grammar, GrammarError> {
    Grammar::define(|g| {
        let plus = g.quoted_terminal("+", None)?;
        let star = g.quoted_terminal("*", None)?;
        let lparen = g.quoted_terminal("(", None)?;
        let rparen = g.quoted_terminal(")", None)?;
        let num = g.terminal("NUM", None)?;

        let expr = g.nonterminal("expr")?;
        let term = g.nonterminal("term")?;
        let factor = g.nonterminal("factor")?;

        g.rule(expr, [N(expr), T(plus), N(term)], None)?;
        g.rule(expr, [N(term)], None)?;
        g.rule(term, [N(term), T(star), N(factor)], None)?;
        g.rule(term, [N(factor)], None)?;
        g.rule(factor, [T(num)], None)?;
        g.rule(factor, [T(lparen), N(expr), T(rparen)], None)?;
        Ok(())
    })
}

fn arithmetic_prec() -> Result<Grammar, GrammarError> {
    Grammar::define(|g| {
        let add = g.precedence(Assoc::Left);
        let mul = g.precedence(Assoc::Left);
        let neg = g.precedence(Assoc::Right);

        let plus = g.quoted_terminal("+", Some(add))?;
        let minus = g.quoted_terminal("-", Some(add))?;
        let star = g.quoted_terminal("*", Some(mul))?;
        let slash = g.quoted_terminal("/", Some(mul))?;
        g.terminal("UMINUS", Some(neg))?;
        let lparen = g.quoted_terminal("(", None)?;
        let rparen = g.quoted_terminal(")", None)?;
        let num = g.terminal("NUM", None)?;

        let expr = g.nonterminal("expr")?;
        for op in [plus, minus, star, slash] {
            g.rule(expr, [N(expr), T(op), N(expr)], None)?;
        }
        g.rule(expr, [T(minus), N(expr)], Some("UMINUS"))?;
        g.rule(expr, [T(lparen), N(expr), T(rparen)], None)?;
        g.rule(expr, [T(num)], None)?;
        Ok(())
    })
}

fn bench_arithmetic(c: &mut Criterion) {
    bench_generate(c, "arithmetic", arithmetic);
    bench_generate(c, "arithmetic_prec", arithmetic_prec);
}

fn bench_generate(
    c: &mut Criterion,
    name: &str,
    f: impl FnOnce() -> Result<Grammar, GrammarError>,
) {
    let grammar = f().unwrap();

    let mut group = c.benchmark_group(name);
    group.bench_function("Canonical", |b| {
        b.iter(|| black_box(Options::new().use_canonical().generate(&grammar)));
    });
    group.bench_function("PGM", |b| {
        b.iter(|| black_box(Options::new().use_pgm().generate(&grammar)));
    });
    group.bench_function("LALR", |b| {
        b.iter(|| black_box(Options::new().use_lalr().generate(&grammar)));
    });
    group.bench_function("LaneTracing", |b| {
        b.iter(|| {
            black_box(
                Options::new()
                    .use_lane_tracing(Phase2::LTT)
                    .generate(&grammar),
            )
        });
    });
    group.finish();
}
