use chc_core::{options, Options, VerificationAnswer};
use chc_engine::solve_trivial;
use chc_graph::{
    ClauseSystem, GraphBuilder, HyperGraph, Normalizer, PredicateInstance, ValidityWitness,
    VerificationResult,
};
use chc_logic::{Sort, TermContext, TermRef};
use chc_transform::{
    SimpleChainSummarizer, SimpleNodeEliminator, Transformation, TransformationPipeline,
};
use chc_validate::{Validation, Validator};

fn witness_options() -> Options {
    let mut opts = Options::new();
    opts.set(options::LOGIC, "QF_LIA");
    opts.set(options::COMPUTE_WITNESS, "true");
    opts
}

fn build(ctx: &mut TermContext, system: &ClauseSystem) -> HyperGraph {
    let normalized = Normalizer::new().normalize(ctx, system).unwrap();
    GraphBuilder::new().build(normalized).unwrap()
}

/// `x' >= 0 ⇒ S1(x')`, `S1(x) ∧ x' = x+1 ⇒ S2(x')`, `S2(x) ⇒ S3(x+2)`,
/// `S3(y) ∧ y < 0 ⇒ ⊥`: one loop-free chain through all three predicates.
fn single_chain_system(ctx: &mut TermContext) -> ClauseSystem {
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let s3 = system.register_predicate("s3", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let two = ctx.int_const(2);

    let fact = ctx.geq(xp, zero);
    system
        .add_clause(ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let inc = {
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            inc,
        )
        .unwrap();
    let shifted = ctx.add2(x, two);
    let tru = ctx.tru();
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s3, vec![shifted]),
            vec![PredicateInstance::new(s2, vec![x])],
            tru,
        )
        .unwrap();
    let bad = ctx.lt(y, zero);
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s3, vec![y])],
            bad,
        )
        .unwrap();
    system
}

#[test]
fn loop_free_chain_collapses_and_empty_witness_back_translates() {
    let mut ctx = TermContext::new();
    let system = single_chain_system(&mut ctx);
    let original = build(&mut ctx, &system);
    let (summarized, translator) = SimpleChainSummarizer::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    assert_eq!(summarized.edges().len(), 1);
    let edge = &summarized.edges()[0];
    assert_eq!(edge.sources, vec![summarized.entry()]);
    assert_eq!(edge.target, summarized.exit());

    let result =
        VerificationResult::new(VerificationAnswer::Safe).with_validity(ValidityWitness::new());
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn chains_around_a_loop_preserve_the_loop_node() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let s3 = system.register_predicate("s3", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let two = ctx.int_const(2);
    let minus_two = ctx.int_const(-2);

    let fact = ctx.geq(xp, minus_two);
    system
        .add_clause(&ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let enter_loop = {
        let sum = ctx.add2(x, two);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            enter_loop,
        )
        .unwrap();
    let spin = {
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s2, vec![x])],
            spin,
        )
        .unwrap();
    let leave = ctx.add2(x, one);
    let tru = ctx.tru();
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s3, vec![leave]),
            vec![PredicateInstance::new(s2, vec![x])],
            tru,
        )
        .unwrap();
    let bad = ctx.lt(y, zero);
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s3, vec![y])],
            bad,
        )
        .unwrap();

    let original = build(&mut ctx, &system);
    let (summarized, translator) = SimpleChainSummarizer::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    // Only the looping node survives: entry chain in, self-loop, exit chain out.
    assert_eq!(summarized.edges().len(), 3);
    assert!(summarized.node_for(s2).is_some());
    assert!(summarized.node_for(s1).is_none());
    assert!(summarized.node_for(s3).is_none());

    let base = summarized.manager().base_vars(&mut ctx, s2);
    let zero_term = ctx.int_const(0);
    let loop_invariant = ctx.geq(base[0], zero_term);
    let witness = ValidityWitness::new().with(s2, loop_invariant);
    let result = VerificationResult::new(VerificationAnswer::Safe).with_validity(witness);
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

/// `x' >= 0 ⇒ S1(x')`, `S1(y) ∧ y >= 10 ⇒ ⊥`: a two-edge chain straight to
/// the exit, unsafe.
#[test]
fn two_step_chain_unsafe_witness_expands() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let ten = ctx.int_const(10);
    let fact = ctx.geq(xp, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let bad = ctx.geq(y, ten);
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s1, vec![y])],
            bad,
        )
        .unwrap();

    let original = build(&mut ctx, &system);
    let (summarized, translator) = SimpleChainSummarizer::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    assert_eq!(summarized.edges().len(), 1);
    let result = solve_trivial(&mut ctx, &summarized, &witness_options()).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let verdict = Validator::new()
        .validate(&mut ctx, &summarized, &result)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);

    let translated = translator.translate(&mut ctx, result).unwrap();
    assert_eq!(
        translated.invalidity_witness().unwrap().steps().len(),
        original.edges().len()
    );
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

/// Three edges through two predicates, unsafe via negative counting.
#[test]
fn three_step_chain_unsafe_witness_expands() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let minus_ten = ctx.int_const(-10);
    let fact = ctx.lt(xp, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let dec = {
        let diff = ctx.sub(x, one);
        ctx.eq(xp, diff)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            dec,
        )
        .unwrap();
    let bad = ctx.lt(y, minus_ten);
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s2, vec![y])],
            bad,
        )
        .unwrap();

    let original = build(&mut ctx, &system);
    let (summarized, translator) = SimpleChainSummarizer::new()
        .transform(&mut ctx, original.clone())
        .unwrap();
    assert_eq!(summarized.edges().len(), 1);
    let result = solve_trivial(&mut ctx, &summarized, &witness_options()).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let translated = translator.translate(&mut ctx, result).unwrap();
    assert_eq!(translated.invalidity_witness().unwrap().steps().len(), 3);
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

/// Two chains converging into a hyper query; summarization plus node
/// elimination collapse everything, and the lifted derivation validates.
#[test]
fn converging_chains_unsafe_through_pipeline() {
    let mut ctx = TermContext::new();
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let s3 = system.register_predicate("s3", vec![Sort::Int]).unwrap();
    let s4 = system.register_predicate("s4", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);

    let below = ctx.lt(xp, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(s1, vec![xp]), vec![], below)
        .unwrap();
    let dec = {
        let diff = ctx.sub(x, one);
        ctx.eq(xp, diff)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            dec,
        )
        .unwrap();
    let above = ctx.gt(xp, zero);
    system
        .add_clause(&ctx, PredicateInstance::new(s3, vec![xp]), vec![], above)
        .unwrap();
    let inc = {
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::new(s4, vec![xp]),
            vec![PredicateInstance::new(s3, vec![x])],
            inc,
        )
        .unwrap();
    let meet = {
        let sum = ctx.add2(x, y);
        ctx.eq(sum, zero)
    };
    system
        .add_clause(
            &ctx,
            PredicateInstance::falsity(),
            vec![
                PredicateInstance::new(s2, vec![x]),
                PredicateInstance::new(s4, vec![y]),
            ],
            meet,
        )
        .unwrap();

    let original = build(&mut ctx, &system);
    let pipeline = TransformationPipeline::new()
        .with(Box::new(SimpleChainSummarizer::new()))
        .with(Box::new(SimpleNodeEliminator::new()));
    let (collapsed, translator) = pipeline.transform(&mut ctx, original.clone()).unwrap();
    assert_eq!(collapsed.edges().len(), 1);
    let result = solve_trivial(&mut ctx, &collapsed, &witness_options()).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

/// One predicate derived twice by the same chain, queried as a pair.
fn twice_used_chain(ctx: &mut TermContext, make_bad: impl Fn(&mut TermContext, TermRef, TermRef) -> TermRef) -> (ClauseSystem, chc_graph::SymRef) {
    let mut system = ClauseSystem::new();
    let s1 = system.register_predicate("s1", vec![Sort::Int]).unwrap();
    let s2 = system.register_predicate("s2", vec![Sort::Int]).unwrap();
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");
    let y = ctx.int_var("y");
    let zero = ctx.int_const(0);
    let one = ctx.int_const(1);
    let fact = ctx.geq(xp, zero);
    system
        .add_clause(ctx, PredicateInstance::new(s1, vec![xp]), vec![], fact)
        .unwrap();
    let inc = {
        let sum = ctx.add2(x, one);
        ctx.eq(xp, sum)
    };
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            inc,
        )
        .unwrap();
    let bad = make_bad(ctx, x, y);
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![
                PredicateInstance::new(s2, vec![x]),
                PredicateInstance::new(s2, vec![y]),
            ],
            bad,
        )
        .unwrap();
    (system, s2)
}

#[test]
fn same_chain_twice_equal_states_unsafe() {
    let mut ctx = TermContext::new();
    let (system, _) = twice_used_chain(&mut ctx, |ctx, x, y| ctx.eq(x, y));
    let original = build(&mut ctx, &system);
    let pipeline = TransformationPipeline::new()
        .with(Box::new(SimpleChainSummarizer::new()))
        .with(Box::new(SimpleNodeEliminator::new()));
    let (collapsed, translator) = pipeline.transform(&mut ctx, original.clone()).unwrap();
    let result = solve_trivial(&mut ctx, &collapsed, &witness_options()).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}

#[test]
fn same_chain_twice_distinct_states_unsafe() {
    let mut ctx = TermContext::new();
    let (system, _) = twice_used_chain(&mut ctx, |ctx, x, y| {
        let equal = ctx.eq(x, y);
        ctx.not(equal)
    });
    let original = build(&mut ctx, &system);
    let pipeline = TransformationPipeline::new()
        .with(Box::new(SimpleChainSummarizer::new()))
        .with(Box::new(SimpleNodeEliminator::new()));
    let (collapsed, translator) = pipeline.transform(&mut ctx, original.clone()).unwrap();
    let result = solve_trivial(&mut ctx, &collapsed, &witness_options()).unwrap();
    assert_eq!(result.answer(), VerificationAnswer::Unsafe);
    let translated = translator.translate(&mut ctx, result).unwrap();
    let verdict = Validator::new()
        .validate(&mut ctx, &original, &translated)
        .unwrap();
    assert_eq!(verdict, Validation::Validated);
}
