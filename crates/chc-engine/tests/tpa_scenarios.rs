use chc_core::{options, CancellationToken, Options, VerificationAnswer};
use chc_engine::{solve_trivial, Engine, TpaEngine};
use chc_graph::{
    ClauseSystem, GraphBuilder, NormalGraph, Normalizer, PredicateInstance,
};
use chc_logic::{Sort, TermContext};
use chc_validate::{Validation, Validator};

fn witness_options(engine: &str) -> Options {
    let mut opts = Options::new();
    opts.set(options::LOGIC, "QF_LIA");
    opts.set(options::ENGINE, engine);
    opts.set(options::COMPUTE_WITNESS, "true");
    opts
}

fn build_graph(ctx: &mut TermContext, system: &ClauseSystem) -> NormalGraph {
    let normalized = Normalizer::new().normalize(ctx, system).unwrap();
    let graph = GraphBuilder::new().build(normalized).unwrap();
    assert!(graph.is_normal());
    graph.to_normal_graph().unwrap()
}

/// `x' = 0 ⇒ S(x')`, `S(x) ∧ x' = x + 1 ⇒ S(x')`, query per caller.
fn counter_system(ctx: &mut TermContext, bad: impl Fn(&mut TermContext, chc_logic::TermRef) -> chc_logic::TermRef) -> ClauseSystem {
    let mut system = ClauseSystem::new();
    let s = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let zero = ctx.int_const(0);
    let init = ctx.eq(xp, zero);
    system
        .add_clause(ctx, PredicateInstance::new(s, vec![xp]), vec![], init)
        .unwrap();
    let one = ctx.int_const(1);
    let sum = ctx.add2(x, one);
    let step = ctx.eq(xp, sum);
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s, vec![xp]),
            vec![PredicateInstance::new(s, vec![x])],
            step,
        )
        .unwrap();
    let query = bad(ctx, x);
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s, vec![x])],
            query,
        )
        .unwrap();
    system
}

#[test]
fn counter_is_safe_with_validated_witness() {
    let mut ctx = TermContext::new();
    let system = counter_system(&mut ctx, |ctx, x| {
        let zero = ctx.int_const(0);
        ctx.lt(x, zero)
    });
    let graph = build_graph(&mut ctx, &system);
    assert!(graph.is_linear_chain());
    let engine = TpaEngine::new(witness_options("tpa-split")).unwrap();
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Safe);
    assert!(result.validity_witness().is_some());
    let verdict = Validator::new()
        .validate(&mut ctx, graph.graph(), &result)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn counter_is_unsafe_with_validated_derivation() {
    let mut ctx = TermContext::new();
    let system = counter_system(&mut ctx, |ctx, x| {
        let one = ctx.int_const(1);
        ctx.gt(x, one)
    });
    let graph = build_graph(&mut ctx, &system);
    let engine = TpaEngine::new(witness_options("tpa-split")).unwrap();
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let witness = result.invalidity_witness().expect("witness was requested");
    // Reaching x = 2 takes exactly two loop applications.
    assert_eq!(witness.steps().len(), 4);
    let verdict = Validator::new()
        .validate(&mut ctx, graph.graph(), &result)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

/// Two chained counters: `S1` counts up, `S2` continues from `S1`.
fn chain_of_two(ctx: &mut TermContext, second_delta: i64) -> ClauseSystem {
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let init = ctx.eq(xp, zero);
    system
        .add_clause(ctx, PredicateInstance::new(s1, vec![xp]), vec![], init)
        .unwrap();
    let inc = {
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s1, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            inc,
        )
        .unwrap();
    let tru = ctx.tru();
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s2, vec![x]),
            vec![PredicateInstance::new(s1, vec![x])],
            tru,
        )
        .unwrap();
    let delta = ctx.int_const(second_delta);
    let moved = {
        let sum = ctx.add2(x, delta);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s2, vec![x])],
            moved,
        )
        .unwrap();
    let bad = ctx.lt(x, zero);
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s2, vec![x])],
            bad,
        )
        .unwrap();
    system
}

#[test]
fn chain_of_two_with_decrement_is_unsafe() {
    let mut ctx = TermContext::new();
    let system = chain_of_two(&mut ctx, -1);
    let graph = build_graph(&mut ctx, &system);
    let engine = TpaEngine::new(witness_options("tpa-split")).unwrap();
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let verdict = Validator::new()
        .validate(&mut ctx, graph.graph(), &result)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn chain_of_two_with_increment_is_safe() {
    let mut ctx = TermContext::new();
    let system = chain_of_two(&mut ctx, 2);
    let graph = build_graph(&mut ctx, &system);
    let engine = TpaEngine::new(witness_options("tpa-split")).unwrap();
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Safe);
}

#[test]
fn lockstep_counters_regression_is_safe() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let inv1 = system
        .register_predicate("inv1", vec![Sort::Int, Sort::Int])
        .unwrap();
    let inv2 = system
        .register_predicate("inv2", vec![Sort::Int, Sort::Int])
        .unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let yp = ctx.int_var("yp");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let five = ctx.int_const(5);
    let ten = ctx.int_const(10);

    // inv1(0, 5) on entry.
    let init = {
        let x_zero = ctx.eq(xp, zero);
        let y_five = ctx.eq(yp, five);
        ctx.and2(x_zero, y_five)
    };
    system
        .add_clause(&ctx, PredicateInstance::new(inv1, vec![xp, yp]), vec![], init)
        .unwrap();

    // inv1 increments x while x < 5.
    let count_up = {
        let sum = ctx.add2(x, one);
        let x_step = ctx.eq(xp, sum);
        let y_keep = ctx.eq(yp, y);
        let guard = ctx.lt(x, five);
        ctx.and([x_step, y_keep, guard])
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(inv1, vec![xp, yp]),
            vec![PredicateInstance::new(inv1, vec![x, y])],
            count_up,
        )
        .unwrap();

    // Transition to inv2 once x ≥ 5.
    let handoff = ctx.geq(x, five);
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(inv2, vec![x, y]),
            vec![PredicateInstance::new(inv1, vec![x, y])],
            handoff,
        )
        .unwrap();

    // inv2 increments both counters.
    let lockstep = {
        let xs = ctx.add2(x, one);
        let x_step = ctx.eq(xp, xs);
        let ys = ctx.add2(y, one);
        let y_step = ctx.eq(yp, ys);
        ctx.and2(x_step, y_step)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(inv2, vec![xp, yp]),
            vec![PredicateInstance::new(inv2, vec![x, y])],
            lockstep,
        )
        .unwrap();

    // Query: x = 10 ∧ x ≠ y.
    let bad = {
        let at_ten = ctx.eq(x, ten);
        let equal = ctx.eq(x, y);
        let unequal = ctx.not(equal);
        ctx.and2(at_ten, unequal)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(inv2, vec![x, y])],
            bad,
        )
        .unwrap();

    let graph = build_graph(&mut ctx, &system);
    let mut opts = Options::new();
    opts.set(options::LOGIC, "QF_LIA");
    opts.set(options::ENGINE, "tpa-split");
    let engine = TpaEngine::new(opts).unwrap();
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Safe);
    // Witnesses were not requested.
    assert!(result.validity_witness().is_none());
}

#[test]
fn cancellation_returns_unknown() {
    let mut ctx = TermContext::new();
    let system = counter_system(&mut ctx, |ctx, x| {
        let zero = ctx.int_const(0);
        ctx.lt(x, zero)
    });
    let graph = build_graph(&mut ctx, &system);
    let token = CancellationToken::new();
    token.cancel();
    let engine = TpaEngine::new(witness_options("tpa")).unwrap().with_cancellation(token);
    let result = engine.solve(&mut ctx, &graph).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unknown);
    assert!(result.validity_witness().is_none());
    assert!(result.invalidity_witness().is_none());
}

#[test]
fn unsupported_configurations_are_rejected() {
    let mut opts = Options::new();
    opts.set(options::ENGINE, "spacer");
    assert!(TpaEngine::new(opts).is_err());
    let mut opts = Options::new();
    opts.set(options::LOGIC, "QF_NRA");
    assert!(TpaEngine::new(opts).is_err());
}

#[test]
fn non_chain_graphs_are_rejected() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
    let q = system.register_predicate("q", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let zero = ctx.int_const(0);
    let fact = ctx.geq(x, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(p, vec![x]), vec![], fact)
        .unwrap();
    let other = ctx.leq(x, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(q, vec![x]), vec![], other)
        .unwrap();
    let bad = ctx.lt(x, zero);
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(q, vec![x])],
            bad,
        )
        .unwrap();
    let graph = build_graph(&mut ctx, &system);
    let engine = TpaEngine::new(witness_options("tpa")).unwrap();
    assert!(engine.solve(&mut ctx, &graph).is_err());
}

#[test]
fn trivial_solver_decides_collapsed_graphs() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let x = ctx.int_var("x");
    let zero = ctx.int_const(0);
    // Satisfiable entry-to-exit constraint: x ≥ 0 reachable.
    let reachable = ctx.geq(x, zero);
    system
        .add_clause(&ctx, PredicateInstance::falsity(), vec![], reachable)
        .unwrap();
    let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
    let graph = GraphBuilder::new().build(normalized).unwrap();
    let result = solve_trivial(&mut ctx, &graph, &witness_options("tpa")).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let verdict = Validator::new().validate(&mut ctx, &graph, &result).unwrap();
    assert_eq!(verdict, Validation::Validated);
}
