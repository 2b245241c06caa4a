use chc_core::{options, Options, VerificationAnswer};
use chc_engine::{Engine, TpaEngine};
use chc_graph::{ClauseSystem, GraphBuilder, HyperGraph, Normalizer, PredicateInstance};
use chc_logic::{Sort, TermContext, TermRef};
use chc_transform::{MultiEdgeMerger, Transformation};
use chc_validate::{Validation, Validator};

fn witness_options() -> Options {
    let mut opts = Options::new();
    opts.set(options::LOGIC, "QF_LIA");
    opts.set(options::ENGINE, "tpa-split");
    opts.set(options::COMPUTE_WITNESS, "true");
    opts
}

fn build(ctx: &mut TermContext, system: &ClauseSystem) -> HyperGraph {
    let normalized = Normalizer::new().normalize(ctx, system).unwrap();
    GraphBuilder::new().build(normalized).unwrap()
}

/// Planar counter pair: two parallel self-loops (one per coordinate) that
/// only together can push both coordinates past the bound.
fn parallel_loop_system(
    ctx: &mut TermContext,
    x_update: impl Fn(&mut TermContext, TermRef, TermRef) -> TermRef,
) -> ClauseSystem {
    let mut system = ClauseSystem::new();
    let s1 = system
        .register_predicate("s1", vec![Sort::Int, Sort::Int])
        .unwrap();
    let x = ctx.int_var("x");
    let y = ctx.int_var("y");
    let xp = ctx.int_var("xp");
    let yp = ctx.int_var("yp");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let two = ctx.int_const(2);

    let init = {
        let xz = ctx.eq(xp, zero);
        let yz = ctx.eq(yp, zero);
        ctx.and2(xz, yz)
    };
    system
        .add_clause(ctx, PredicateInstance::new(s1, vec![xp, yp]), vec![], init)
        .unwrap();

    let bump_x = {
        let moved = x_update(ctx, x, xp);
        let keep_y = ctx.eq(yp, y);
        ctx.and2(moved, keep_y)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s1, vec![xp, yp]),
            vec![PredicateInstance::new(s1, vec![x, y])],
            bump_x,
        )
        .unwrap();

    let bump_y = {
        let sum = ctx.add2(y, one);
        let moved = ctx.eq(yp, sum);
        let keep_x = ctx.eq(xp, x);
        ctx.and2(moved, keep_x)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s1, vec![xp, yp]),
            vec![PredicateInstance::new(s1, vec![x, y])],
            bump_y,
        )
        .unwrap();

    let bad = {
        let x_high = ctx.gt(x, two);
        let y_high = ctx.gt(y, two);
        ctx.and2(x_high, y_high)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s1, vec![x, y])],
            bad,
        )
        .unwrap();
    system
}

#[test]
fn parallel_loops_merge_and_identity_lift_fails_validation() {
    let mut ctx = TermContext::new();
    let system = parallel_loop_system(&mut ctx, |ctx, x, xp| {
        let one = ctx.int_const(1);
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    });
    let original = build(&mut ctx, &system);
    assert_eq!(original.edges().len(), 4);
    let (merged, translator) = MultiEdgeMerger::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    assert_eq!(merged.edges().len(), 3);

    let engine = TpaEngine::new(witness_options()).unwrap();
    let result = engine
        .solve(&mut ctx, &merged.clone().to_normal_graph().unwrap())
        .unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);

    // Lifting the derivation as-is leaves steps on the merged edge, which
    // the original graph cannot justify.
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &result)
        .unwrap();
    assert_eq!(verdict, Validation::NotValidated);

    // The disambiguating lift picks the loop that actually fired per step.
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn merged_disjuncts_with_auxiliary_variables_translate() {
    let mut ctx = TermContext::new();
    // The x loop jumps by an unconstrained positive amount.
    let system = parallel_loop_system(&mut ctx, |ctx, x, xp| {
        let c = ctx.int_var("c");
        let zero = ctx.int_const(0);
        let sum = ctx.add2(x, c);
        let moved = ctx.eq(xp, sum);
        let positive = ctx.gt(c, zero);
        ctx.and2(moved, positive)
    });
    let original = build(&mut ctx, &system);
    let (merged, translator) = MultiEdgeMerger::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    assert_eq!(merged.edges().len(), 3);

    let engine = TpaEngine::new(witness_options()).unwrap();
    let result = engine
        .solve(&mut ctx, &merged.clone().to_normal_graph().unwrap())
        .unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn merging_without_parallel_edges_is_identity() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let zero = ctx.int_const(0);
    let fact = ctx.geq(xp, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let bad = ctx.lt(x, zero);
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s1, vec![x])],
            bad,
        )
        .unwrap();
    let graph = build(&mut ctx, &system);
    let constraints: Vec<_> = graph.edges().iter().map(|e| e.constraint).collect();
    let (merged, _translator) = MultiEdgeMerger::new().transform(&mut ctx, graph).unwrap();
    assert_eq!(merged.edges().len(), constraints.len());
    for (edge, constraint) in merged.edges().iter().zip(constraints) {
        assert_eq!(edge.constraint, constraint);
    }
}
