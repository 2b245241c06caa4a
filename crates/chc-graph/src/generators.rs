//! Deterministic random clause-system generators for the fuzz suites.

use chc_core::{ChcError, RngHandle};
use chc_logic::{Sort, TermContext};
use rand::Rng;

use crate::clauses::{ClauseSystem, PredicateInstance};

/// Generates a linear-arithmetic clause system within a bounded grammar.
///
/// The system has `predicates` unary integer predicates connected by a
/// fact, `transitions` update clauses (increments, resets, and guarded
/// copies), and one query. Output is fully determined by the RNG seed.
pub fn gen_linear_system(
    ctx: &mut TermContext,
    predicates: usize,
    transitions: usize,
    rng: &mut RngHandle,
) -> Result<ClauseSystem, ChcError> {
    let predicates = predicates.max(1);
    let mut system = ClauseSystem::new();
    let mut syms = Vec::new();
    for i in 0..predicates {
        syms.push(system.register_predicate(&format!("p{i}"), vec![Sort::Int])?);
    }
    let x = ctx.int_var("x");
    let xp = ctx.int_var("xp");

    // Fact: xp = c ⇒ p0(xp)
    let init = rng.gen_range(-2i64..=2);
    let init_const = ctx.int_const(init);
    let init_eq = ctx.eq(xp, init_const);
    system.add_clause(
        ctx,
        PredicateInstance::new(syms[0], vec![xp]),
        vec![],
        init_eq,
    )?;

    for _ in 0..transitions {
        let src = syms[rng.gen_range(0..predicates)];
        let dst = syms[rng.gen_range(0..predicates)];
        let shape = rng.gen_range(0..3u8);
        let constraint = match shape {
            0 => {
                // xp = x + c
                let c = ctx.int_const(rng.gen_range(-2i64..=2));
                let sum = ctx.add2(x, c);
                ctx.eq(xp, sum)
            }
            1 => {
                // reset: xp = c
                let c = ctx.int_const(rng.gen_range(-2i64..=2));
                ctx.eq(xp, c)
            }
            _ => {
                // guarded copy: xp = x ∧ x ≤ c
                let c = ctx.int_const(rng.gen_range(0i64..=4));
                let copy = ctx.eq(xp, x);
                let guard = ctx.leq(x, c);
                ctx.and2(copy, guard)
            }
        };
        system.add_clause(
            ctx,
            PredicateInstance::new(dst, vec![xp]),
            vec![PredicateInstance::new(src, vec![x])],
            constraint,
        )?;
    }

    // Query: pk(x) ∧ x < c ⇒ ⊥
    let queried = syms[rng.gen_range(0..predicates)];
    let bound = ctx.int_const(rng.gen_range(-3i64..=0));
    let bad = ctx.lt(x, bound);
    system.add_clause(
        ctx,
        PredicateInstance::falsity(),
        vec![PredicateInstance::new(queried, vec![x])],
        bad,
    )?;
    Ok(system)
}
