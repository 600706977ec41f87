//! Grammar definition for integration tests.

use lanelr::grammar::{Assoc, GrammarDef, GrammarError, SymbolID::*};

pub fn g_simple1(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let equal = g.terminal("EQUAL", None)?;
    let plus = g.terminal("PLUS", None)?;
    let ident = g.terminal("ID", None)?;
    let num = g.terminal("NUM", None)?;

    let a = g.nonterminal("A")?;
    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;

    g.start_symbol(a)?;

    g.rule(a, [N(e), T(equal), N(e)], None)?;
    g.rule(a, [T(ident)], None)?;
    g.rule(e, [N(e), T(plus), N(t)], None)?;
    g.rule(e, [N(t)], None)?;
    g.rule(t, [T(num)], None)?;
    g.rule(t, [T(ident)], None)?;
    Ok(())
}

pub fn g_simple2(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    // declare terminal symbols.
    let lparen = g.terminal("LPAREN", None)?;
    let rparen = g.terminal("RPAREN", None)?;
    let plus = g.terminal("PLUS", None)?;
    let minus = g.terminal("MINUS", None)?;
    let star = g.terminal("STAR", None)?;
    let slash = g.terminal("SLASH", None)?;
    let num = g.terminal("NUM", None)?;

    // declare nonterminal symbols.
    let expr = g.nonterminal("EXPR")?;
    let factor = g.nonterminal("FACTOR")?;
    let term = g.nonterminal("TERM")?;

    g.start_symbol(expr)?;

    // declare syntax rules.
    g.rule(expr, [N(expr), T(plus), N(factor)], None)?; // expr '+' factor
    g.rule(expr, [N(expr), T(minus), N(factor)], None)?; // expr '-' factor
    g.rule(expr, [N(factor)], None)?; // factor
    g.rule(factor, [N(factor), T(star), N(term)], None)?; // factor '*' term
    g.rule(factor, [N(factor), T(slash), N(term)], None)?; // factor '/' term
    g.rule(factor, [N(term)], None)?; // term
    g.rule(term, [T(num)], None)?; // num
    g.rule(term, [T(lparen), N(expr), T(rparen)], None)?; // '(' expr ')'
    Ok(())
}

pub fn g1(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let plus = g.terminal("PLUS", None)?;
    let star = g.terminal("STAR", None)?;
    let a = g.terminal("A", None)?;

    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;

    g.start_symbol(e)?;

    g.rule(e, [N(e), T(plus), N(t)], None)?;
    g.rule(e, [N(t)], None)?;
    g.rule(t, [N(t), T(star), T(a)], None)?;
    g.rule(t, [T(a)], None)?;
    Ok(())
}

/// LR(1) but not LALR(1): `ID` is reduced to `TYPE` or `NAME` depending on
/// whether a parameter or a return type is being read.
pub fn g2(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let comma = g.terminal("COMMA", None)?;
    let colon = g.terminal("COLON", None)?;
    let ident = g.terminal("ID", None)?;

    let def = g.nonterminal("DEF")?;
    let param_spec = g.nonterminal("PARAM_SPEC")?;
    let return_spec = g.nonterminal("RETURN_SPEC")?;
    let type_ = g.nonterminal("TYPE")?;
    let name = g.nonterminal("NAME")?;
    let name_list = g.nonterminal("NAME_LIST")?;

    g.rule(def, [N(param_spec), N(return_spec), T(comma)], None)?;
    g.rule(param_spec, [N(type_)], None)?;
    g.rule(param_spec, [N(name_list), T(colon), N(type_)], None)?;
    g.rule(return_spec, [N(type_)], None)?;
    g.rule(return_spec, [N(name), T(colon), N(type_)], None)?;
    g.rule(type_, [T(ident)], None)?;
    g.rule(name, [T(ident)], None)?;
    g.rule(name_list, [N(name)], None)?;
    g.rule(name_list, [N(name), T(comma), N(name_list)], None)?;
    Ok(())
}

pub fn g4(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let plus = g.terminal("PLUS", None)?;
    let lparen = g.terminal("LPAREN", None)?;
    let rparen = g.terminal("RPAREN", None)?;
    let num = g.terminal("NUM", None)?;

    let e = g.nonterminal("E")?;
    let t = g.nonterminal("T")?;
    // E → E + T | T
    // T → ( E ) | n

    g.rule(e, [N(e), T(plus), N(t)], None)?;
    g.rule(e, [N(t)], None)?;
    g.rule(t, [T(lparen), N(e), T(rparen)], None)?;
    g.rule(t, [T(num)], None)?;
    Ok(())
}

/// `E -> E '+' E | E '*' E | id`, with `*` binding tighter than `+`.
pub fn ambiguous_arith(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let add = g.precedence(Assoc::Left);
    let mul = g.precedence(Assoc::Left);

    let plus = g.quoted_terminal("+", Some(add))?;
    let star = g.quoted_terminal("*", Some(mul))?;
    let id = g.terminal("id", None)?;

    let e = g.nonterminal("E")?;

    g.rule(e, [N(e), T(plus), N(e)], None)?;
    g.rule(e, [N(e), T(star), N(e)], None)?;
    g.rule(e, [T(id)], None)?;
    Ok(())
}

/// The dangling `else`, with or without a `%expect 1` declaration.
pub fn dangling_if(expect: bool) -> impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarError> {
    move |g| {
        let if_ = g.terminal("IF", None)?;
        let then = g.terminal("THEN", None)?;
        let else_ = g.terminal("ELSE", None)?;
        let cond = g.terminal("COND", None)?;
        let other = g.terminal("OTHER", None)?;

        let stmt = g.nonterminal("Stmt")?;
        let if_stmt = g.nonterminal("IfStmt")?;

        g.rule(stmt, [N(if_stmt)], None)?;
        g.rule(stmt, [T(other)], None)?;
        g.rule(if_stmt, [T(if_), T(cond), T(then), N(stmt)], None)?;
        g.rule(
            if_stmt,
            [T(if_), T(cond), T(then), N(stmt), T(else_), N(stmt)],
            None,
        )?;

        if expect {
            g.expect(1);
        }
        Ok(())
    }
}

/// `A` and `B` only derive each other.
pub fn vanishing_cycle(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let x = g.terminal("x", None)?;

    let s = g.nonterminal("S")?;
    let a = g.nonterminal("A")?;
    let b = g.nonterminal("B")?;

    g.rule(s, [N(a)], None)?;
    g.rule(s, [T(x)], None)?;
    g.rule(a, [N(b)], None)?;
    g.rule(b, [N(a)], None)?;
    Ok(())
}

/// `e` reduces to `E` or `F` depending on the lane it was reached by, and
/// LALR(1) merging conflates both lanes.
pub fn non_lalr(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let a = g.terminal("a", None)?;
    let b = g.terminal("b", None)?;
    let c = g.terminal("c", None)?;
    let d = g.terminal("d", None)?;
    let e_ = g.terminal("e", None)?;

    let s = g.nonterminal("S")?;
    let e = g.nonterminal("E")?;
    let f = g.nonterminal("F")?;

    g.rule(s, [T(a), N(e), T(c)], None)?;
    g.rule(s, [T(a), N(f), T(d)], None)?;
    g.rule(s, [T(b), N(f), T(c)], None)?;
    g.rule(s, [T(b), N(e), T(d)], None)?;
    g.rule(e, [T(e_)], None)?;
    g.rule(f, [T(e_)], None)?;
    Ok(())
}

/// A nullable prefix in front of the conflicting lanes, so that the lanes
/// reach the conflict through vanishing symbols.
pub fn non_lalr_nullable(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let a = g.terminal("a", None)?;
    let b = g.terminal("b", None)?;
    let c = g.terminal("c", None)?;
    let d = g.terminal("d", None)?;
    let e_ = g.terminal("e", None)?;
    let z = g.terminal("z", None)?;

    let s = g.nonterminal("S")?;
    let e = g.nonterminal("E")?;
    let f = g.nonterminal("F")?;
    let opt = g.nonterminal("Opt")?;

    g.rule(s, [T(a), N(opt), N(e), T(c)], None)?;
    g.rule(s, [T(a), N(opt), N(f), T(d)], None)?;
    g.rule(s, [T(b), N(opt), N(f), T(c)], None)?;
    g.rule(s, [T(b), N(opt), N(e), T(d)], None)?;
    g.rule(e, [T(e_)], None)?;
    g.rule(f, [T(e_)], None)?;
    g.rule(opt, [], None)?;
    g.rule(opt, [T(z)], None)?;
    Ok(())
}

pub fn min_caml(g: &mut GrammarDef<'_>) -> Result<(), GrammarError> {
    let l_paren = g.terminal("LPAREN", None)?;
    let r_paren = g.terminal("RPAREN", None)?;
    let t_true = g.terminal("TRUE", None)?;
    let t_false = g.terminal("FALSE", None)?;
    let integer = g.terminal("INTEGER", None)?;
    let float = g.terminal("FLOAT", None)?;
    let ident = g.terminal("IDENT", None)?;
    let t_not = g.terminal("NOT", None)?;
    let plus = g.terminal("PLUS", None)?;
    let plus_dot = g.terminal("PLUS_DOT", None)?;
    let minus = g.terminal("MINUS", None)?;
    let minus_dot = g.terminal("MINUS_DOT", None)?;
    let star_dot = g.terminal("STAR_DOT", None)?;
    let slash_dot = g.terminal("SLASH_DOT", None)?;
    let equal = g.terminal("EQUAL", None)?;
    let less_greater = g.terminal("LESS_GREATER", None)?;
    let less = g.terminal("LESS", None)?;
    let greater = g.terminal("GREATER", None)?;
    let less_equal = g.terminal("LESS_EQUAL", None)?;
    let greater_equal = g.terminal("GREATER_EQUAL", None)?;
    let less_minus = g.terminal("LESS_MINUS", None)?;
    let comma = g.terminal("COMMA", None)?;
    let semicolon = g.terminal("SEMICOLON", None)?;
    let t_if = g.terminal("IF", None)?;
    let t_then = g.terminal("THEN", None)?;
    let t_else = g.terminal("ELSE", None)?;
    let t_let = g.terminal("LET", None)?;
    let t_rec = g.terminal("REC", None)?;
    let t_in = g.terminal("IN", None)?;
    let array_make = g.terminal("ARRAY_MAKE", None)?;
    let dot = g.terminal("DOT", None)?;

    let exp = g.nonterminal("EXPR")?;
    let simple_exp = g.nonterminal("SIMPLE_EXP")?;
    let app_exp = g.nonterminal("APP_EXP")?;
    let neg_exp = g.nonterminal("NEG_EXP")?;
    let mult_exp = g.nonterminal("MULT_EXP")?;
    let add_exp = g.nonterminal("ADD_EXP")?;
    let rel_exp = g.nonterminal("REL_EXP")?;
    let tuple_exp = g.nonterminal("TUPLE_EXP")?;
    let put_exp = g.nonterminal("PUT_EXP")?;
    let if_exp = g.nonterminal("IF_EXP")?;
    let let_expr = g.nonterminal("LET_EXP")?;
    let formal_args = g.nonterminal("FORMAL_ARGS")?;
    let actual_args = g.nonterminal("ACTUAL_ARGS")?;
    let tuple_exp_rest = g.nonterminal("TUPLE_EXP_REST")?;
    let fundef = g.nonterminal("FUNDEF")?;
    let pat = g.nonterminal("PAT")?;

    g.start_symbol(exp)?;

    g.rule(simple_exp, [T(l_paren), N(exp), T(r_paren)], None)?;
    g.rule(simple_exp, [T(l_paren), T(r_paren)], None)?;
    for t in [t_true, t_false, integer, float, ident] {
        g.rule(simple_exp, [T(t)], None)?;
    }
    g.rule(
        simple_exp,
        [N(simple_exp), T(dot), T(l_paren), N(exp), T(r_paren)],
        None,
    )?;

    g.rule(app_exp, [N(simple_exp)], None)?;
    g.rule(app_exp, [N(simple_exp), N(actual_args)], None)?;
    g.rule(app_exp, [T(array_make), N(simple_exp), N(simple_exp)], None)?;
    g.rule(app_exp, [T(t_not), N(app_exp)], None)?;

    g.rule(neg_exp, [N(app_exp)], None)?;
    g.rule(neg_exp, [T(minus), N(neg_exp)], None)?;
    g.rule(neg_exp, [T(minus_dot), N(neg_exp)], None)?;

    g.rule(mult_exp, [N(neg_exp)], None)?;
    for op in [star_dot, slash_dot] {
        g.rule(mult_exp, [N(mult_exp), T(op), N(neg_exp)], None)?;
    }

    g.rule(add_exp, [N(mult_exp)], None)?;
    for op in [plus, minus, plus_dot, minus_dot] {
        g.rule(add_exp, [N(add_exp), T(op), N(mult_exp)], None)?;
    }

    g.rule(rel_exp, [N(add_exp)], None)?;
    for op in [
        equal,
        less_greater,
        less,
        greater,
        less_equal,
        greater_equal,
    ] {
        g.rule(rel_exp, [N(rel_exp), T(op), N(add_exp)], None)?;
    }

    g.rule(tuple_exp, [N(rel_exp)], None)?;
    g.rule(tuple_exp, [N(rel_exp), T(comma), N(tuple_exp_rest)], None)?;
    g.rule(tuple_exp_rest, [N(rel_exp)], None)?;
    g.rule(
        tuple_exp_rest,
        [N(rel_exp), T(comma), N(tuple_exp_rest)],
        None,
    )?;

    g.rule(put_exp, [N(tuple_exp)], None)?;
    g.rule(
        put_exp,
        [
            N(simple_exp),
            T(dot),
            T(l_paren),
            N(exp),
            T(r_paren),
            T(less_minus),
            N(exp),
        ],
        None,
    )?;

    g.rule(if_exp, [N(put_exp)], None)?;
    g.rule(
        if_exp,
        [T(t_if), N(exp), T(t_then), N(exp), T(t_else), N(exp)],
        None,
    )?;

    g.rule(
        let_expr,
        [T(t_let), T(ident), T(equal), N(exp), T(t_in), N(exp)],
        None,
    )?;
    g.rule(
        let_expr,
        [T(t_let), T(t_rec), N(fundef), T(t_in), N(exp)],
        None,
    )?;
    g.rule(
        let_expr,
        [
            T(t_let),
            T(l_paren),
            N(pat),
            T(r_paren),
            T(equal),
            N(exp),
            T(t_in),
            N(exp),
        ],
        None,
    )?;

    g.rule(fundef, [T(ident), N(formal_args), T(equal), N(exp)], None)?;

    g.rule(formal_args, [T(ident), N(formal_args)], None)?;
    g.rule(formal_args, [T(ident)], None)?;

    g.rule(actual_args, [N(actual_args), N(simple_exp)], None)?;
    g.rule(actual_args, [N(simple_exp)], None)?;

    g.rule(pat, [N(pat), T(comma), T(ident)], None)?;
    g.rule(pat, [T(ident), T(comma), T(ident)], None)?;

    g.rule(exp, [N(if_exp)], None)?;
    g.rule(exp, [N(if_exp), T(semicolon), N(exp)], None)?;
    g.rule(exp, [N(let_expr)], None)?;
    Ok(())
}
