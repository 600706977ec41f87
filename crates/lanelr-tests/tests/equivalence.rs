//! Different constructions of the same grammar must recognize the same
//! language and produce the same reductions.

use lanelr::{
    automaton::{Automaton, StateID},
    grammar::{Grammar, GrammarDef, GrammarError},
    table::ParsingTable,
    types::Set,
    Options, Phase2,
};
use lanelr_tests::{grammars, init_tracing, parse, sentences, token_strings};

type Define = fn(&mut GrammarDef<'_>) -> Result<(), GrammarError>;

fn assert_same_language(
    g: &Grammar,
    expected: &ParsingTable,
    actual: &ParsingTable,
    max_len: usize,
) {
    for tokens in token_strings(g, max_len) {
        assert_eq!(
            parse(expected, &tokens).ok(),
            parse(actual, &tokens).ok(),
            "input: {:?}",
            tokens
        );
    }
    if actual.conflicts().unresolved() > 0 {
        return;
    }
    for sentence in sentences(g, max_len + 1) {
        assert!(
            parse(actual, &sentence).is_ok(),
            "rejected sentence: {:?}",
            sentence
        );
    }
}

fn check_lalr_against_lr1(f: Define, max_len: usize) -> anyhow::Result<()> {
    init_tracing();
    let g = Grammar::define(f)?;
    let lalr = Options::new().use_lalr().generate(&g)?;
    assert_eq!(lalr.table.conflicts().reduce_reduce, 0);

    for options in [Options::new().use_canonical(), Options::new().use_pgm()] {
        let lr1 = options.generate(&g)?;
        assert_eq!(
            lr1.table.conflicts().unresolved(),
            lalr.table.conflicts().unresolved()
        );
        assert!(lr1.stats.states >= lalr.stats.states);
        assert_same_language(&g, &lr1.table, &lalr.table, max_len);
    }
    Ok(())
}

#[test]
fn lalr_matches_lr1_g_simple1() -> anyhow::Result<()> {
    check_lalr_against_lr1(grammars::g_simple1, 6)
}

#[test]
fn lalr_matches_lr1_g_simple2() -> anyhow::Result<()> {
    check_lalr_against_lr1(grammars::g_simple2, 5)
}

#[test]
fn lalr_matches_lr1_g1() -> anyhow::Result<()> {
    check_lalr_against_lr1(grammars::g1, 7)
}

#[test]
fn lalr_matches_lr1_g4() -> anyhow::Result<()> {
    check_lalr_against_lr1(grammars::g4, 6)
}

#[test]
fn lalr_matches_lr1_ambiguous_arith() -> anyhow::Result<()> {
    check_lalr_against_lr1(grammars::ambiguous_arith, 7)
}

fn check_lane_tracing_against_canonical(f: Define, max_len: usize) -> anyhow::Result<()> {
    init_tracing();
    let g = Grammar::define(f)?;
    let canonical = Options::new().use_canonical().generate(&g)?;

    for phase2 in [Phase2::PGM, Phase2::LTT] {
        let traced = Options::new().use_lane_tracing(phase2).generate(&g)?;
        assert_eq!(
            traced.table.conflicts().unresolved(),
            canonical.table.conflicts().unresolved()
        );
        assert_same_language(&g, &canonical.table, &traced.table, max_len);
    }
    Ok(())
}

#[test]
fn lane_tracing_matches_canonical_non_lalr() -> anyhow::Result<()> {
    check_lane_tracing_against_canonical(grammars::non_lalr, 4)
}

#[test]
fn lane_tracing_matches_canonical_non_lalr_nullable() -> anyhow::Result<()> {
    check_lane_tracing_against_canonical(grammars::non_lalr_nullable, 5)
}

#[test]
fn lane_tracing_matches_canonical_g2() -> anyhow::Result<()> {
    check_lane_tracing_against_canonical(grammars::g2, 7)
}

#[test]
fn lane_tracing_matches_canonical_g_simple2() -> anyhow::Result<()> {
    check_lane_tracing_against_canonical(grammars::g_simple2, 5)
}

#[test]
fn dumped_table_parses_the_same() -> anyhow::Result<()> {
    init_tracing();
    let defs: [Define; 3] = [grammars::g_simple1, grammars::g2, grammars::non_lalr];
    for f in defs {
        let g = Grammar::define(f)?;
        for options in [
            Options::new().use_lalr().clone(),
            Options::new().use_pgm().clone(),
            Options::new().use_lane_tracing(Phase2::LTT).clone(),
        ] {
            let output = options.generate(&g)?;
            let text = output.table.dump();
            let restored = ParsingTable::parse(&text)?;
            assert_eq!(restored, output.table);
            assert_same_language(&g, &output.table, &restored, 4);
        }
    }
    Ok(())
}

#[test]
fn compacted_table_parses_the_same() -> anyhow::Result<()> {
    init_tracing();
    let defs: [Define; 2] = [grammars::non_lalr, grammars::g2];
    for f in defs {
        let g = Grammar::define(f)?;
        let output = Options::new()
            .use_lane_tracing(Phase2::PGM)
            .generate(&g)?;
        let (compact, remap) = output.table.compact_unreachable();
        assert_eq!(compact.num_states(), output.stats.states);
        for state in output.automaton.states() {
            if let Some(virtual_) = remap.virtual_of(state.id) {
                assert_eq!(remap.actual_of(virtual_), Some(state.id));
            }
        }
        assert_same_language(&g, &output.table, &compact, 5);
    }
    Ok(())
}

/// Walk `fine` and `coarse` in lockstep from the start state; every state
/// of `fine` must map onto an isocore state of `coarse` with superset
/// contexts.
fn assert_covers(fine: &Automaton, coarse: &Automaton) {
    let mut seen: Set<(StateID, StateID)> = Set::default();
    let mut stack = vec![(StateID::START, StateID::START)];
    while let Some((f, c)) = stack.pop() {
        if !seen.insert((f, c)) {
            continue;
        }
        let fine_state = fine.state(f);
        let coarse_state = coarse.state(c);
        assert!(coarse_state.has_same_cores(fine_state.cores()));
        for (a, b) in fine_state.cores().iter().zip(coarse_state.cores()) {
            assert!(
                a.context.is_subset(&b.context),
                "state {} against {}",
                f,
                c
            );
        }
        for (symbol, next) in &fine_state.successors {
            let coarse_next = coarse_state.successors.get(symbol).copied();
            assert!(coarse_next.is_some(), "state {} lost a transition", c);
            if let Some(coarse_next) = coarse_next {
                stack.push((*next, coarse_next));
            }
        }
    }
}

#[test]
fn merging_never_drops_lookaheads() -> anyhow::Result<()> {
    init_tracing();
    let defs: [Define; 5] = [
        grammars::g_simple2,
        grammars::g2,
        grammars::non_lalr,
        grammars::non_lalr_nullable,
        grammars::min_caml,
    ];
    for f in defs {
        let g = Grammar::define(f)?;
        let canonical = Options::new().use_canonical().generate(&g)?;
        for options in [
            Options::new().use_pgm().clone(),
            Options::new().use_lalr().clone(),
            Options::new().use_lane_tracing(Phase2::PGM).clone(),
            Options::new().use_lane_tracing(Phase2::LTT).clone(),
        ] {
            let merged = options.generate(&g)?;
            assert_covers(&canonical.automaton, &merged.automaton);
        }
    }
    Ok(())
}
