use lanelr::{
    grammar::{Grammar, GrammarDef, GrammarError},
    Options, Phase2,
};
use lanelr_tests::{grammars, init_tracing};

fn smoketest_grammar(f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarError>) {
    init_tracing();
    let grammar = Grammar::define(f).unwrap();
    eprintln!("grammar:\n{}", grammar);
    eprintln!();

    for options in [
        Options::new().use_lr0().clone(),
        Options::new().use_lalr().clone(),
        Options::new().use_canonical().clone(),
        Options::new().use_pgm().clone(),
        Options::new().use_lane_tracing(Phase2::PGM).clone(),
        Options::new().use_lane_tracing(Phase2::LTT).clone(),
    ] {
        let output = options.generate(&grammar).unwrap();
        eprintln!("{:?} states:\n---\n{}", options.mode(), output.automaton.display(&grammar));
        assert_eq!(output.table.num_states(), output.automaton.len());
        assert!(output.stats.final_states <= output.stats.states);
    }
}

#[test]
fn smoketest_g_simple1() {
    smoketest_grammar(grammars::g_simple1);
}

#[test]
fn smoketest_g_simple2() {
    smoketest_grammar(grammars::g_simple2);
}

#[test]
fn smoketest_g1() {
    smoketest_grammar(grammars::g1);
}

#[test]
fn smoketest_g2() {
    smoketest_grammar(grammars::g2);
}

#[test]
fn smoketest_g4() {
    smoketest_grammar(grammars::g4);
}

#[test]
fn smoketest_min_caml() {
    smoketest_grammar(grammars::min_caml);
}
