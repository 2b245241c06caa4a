use chc_graph::{ClauseSystem, Normalizer, PredicateInstance, SymbolTable, Version};
use chc_logic::{Sort, TermContext};

/// Builds the two-predicate system used across the suite:
/// `x' >= 0 => S1(x')`, `S1(x) ∧ x' = x + 1 => S2(x')`, `S2(y) ∧ y < 0 => ⊥`.
fn sample_system(ctx: &mut TermContext) -> ClauseSystem {
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

    let sum = ctx.add2(x, one);
    let step = ctx.eq(xp, sum);
    system
        .add_clause(
            ctx,
            PredicateInstance::new(s2, vec![xp]),
            vec![PredicateInstance::new(s1, vec![x])],
            step,
        )
        .unwrap();

    let bad = ctx.lt(y, zero);
    system
        .add_clause(
            ctx,
            PredicateInstance::falsity(),
            vec![PredicateInstance::new(s2, vec![y])],
            bad,
        )
        .unwrap();
    system
}

#[test]
fn every_instance_uses_canonical_vectors() {
    let mut ctx = TermContext::new();
    let system = sample_system(&mut ctx);
    let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
    for clause in &normalized.clauses {
        if clause.head.symbol != SymbolTable::FALSE {
            let expected = normalized
                .manager
                .vars(&mut ctx, clause.head.symbol, Version::Primed);
            assert_eq!(clause.head.args, expected);
        }
        for (occurrence, instance) in clause.body.iter().enumerate() {
            let expected = normalized.manager.vars(
                &mut ctx,
                instance.symbol,
                Version::Instance(occurrence as u32),
            );
            assert_eq!(instance.args, expected);
        }
    }
}

#[test]
fn normalization_is_idempotent() {
    let mut ctx = TermContext::new();
    let system = sample_system(&mut ctx);
    let first = Normalizer::new().normalize(&mut ctx, &system).unwrap();

    let mut canonical = ClauseSystem::new();
    canonical.register_predicate("s1", vec![Sort::Int]).unwrap();
    canonical.register_predicate("s2", vec![Sort::Int]).unwrap();
    for clause in &first.clauses {
        canonical
            .add_clause(
                &ctx,
                clause.head.clone(),
                clause.body.clone(),
                clause.constraint,
            )
            .unwrap();
    }
    let second = Normalizer::new().normalize(&mut ctx, &canonical).unwrap();
    assert_eq!(first.clauses.len(), second.clauses.len());
    for (a, b) in first.clauses.iter().zip(second.clauses.iter()) {
        assert_eq!(a.head, b.head);
        assert_eq!(a.body, b.body);
        assert_eq!(a.constraint, b.constraint);
        assert_eq!(a.aux_vars, b.aux_vars);
    }
}

#[test]
fn constraint_never_mentions_foreign_primed_vectors() {
    let mut ctx = TermContext::new();
    let system = sample_system(&mut ctx);
    let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
    for clause in &normalized.clauses {
        let head_vars: Vec<_> = clause.head.args.clone();
        for sym in normalized.symbols.user_symbols() {
            if clause.head.symbol == sym {
                continue;
            }
            let primed = normalized.manager.vars(&mut ctx, sym, Version::Primed);
            for v in ctx.free_vars(clause.constraint) {
                assert!(
                    !primed.contains(&v) || head_vars.contains(&v),
                    "constraint leaks a primed vector of another symbol"
                );
            }
        }
    }
}
