//! Rewrites clauses into the canonical normal form.
//!
//! After normalization every predicate occurrence uses the canonical vector
//! of its symbol: occurrence-indexed state vectors in body position, the
//! primed vector in head position. Argument shapes are captured as
//! equalities conjoined into the constraint.

use std::collections::BTreeSet;

use chc_core::{ChcError, ErrorInfo};
use chc_logic::{TermContext, TermRef};

use crate::clauses::{ClauseSystem, PredicateInstance, SymbolTable};
use crate::versions::{Version, VersionManager};

/// A clause in canonical form.
#[derive(Debug, Clone)]
pub struct NormalizedClause {
    /// Head instance over the primed vector (or `⊥`).
    pub head: PredicateInstance,
    /// Body instances over occurrence-indexed state vectors.
    pub body: Vec<PredicateInstance>,
    /// Constraint including the canonicalization equalities.
    pub constraint: TermRef,
    /// Free constraint variables outside every canonical vector.
    pub aux_vars: Vec<TermRef>,
}

/// Output of normalization: canonical clauses plus the variable mapping.
#[derive(Debug, Clone)]
pub struct NormalizedSystem {
    /// Predicate registry carried over from the input system.
    pub symbols: SymbolTable,
    /// Canonical clauses. Tautologies and vacuous clauses are dropped.
    pub clauses: Vec<NormalizedClause>,
    /// Manager recording the canonical vectors, for back-translation.
    pub manager: VersionManager,
}

/// Clause normalizer.
#[derive(Debug, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Creates a normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalizes a clause system.
    pub fn normalize(
        &self,
        ctx: &mut TermContext,
        system: &ClauseSystem,
    ) -> Result<NormalizedSystem, ChcError> {
        let symbols = system.symbols().clone();
        let manager = VersionManager::new(&symbols);
        let mut clauses = Vec::new();
        for clause in system.clauses() {
            // A `⊤` head makes the clause a tautology.
            if clause.head.symbol == SymbolTable::TRUE {
                continue;
            }
            // A `⊥` body member makes the clause vacuous.
            if clause
                .body
                .iter()
                .any(|instance| instance.symbol == SymbolTable::FALSE)
            {
                continue;
            }
            let mut equalities = Vec::new();
            let mut body = Vec::new();
            let mut canonical_vars: BTreeSet<TermRef> = BTreeSet::new();
            let mut occurrence_counts: std::collections::BTreeMap<_, u32> =
                std::collections::BTreeMap::new();
            for instance in &clause.body {
                if instance.symbol == SymbolTable::TRUE {
                    continue;
                }
                let occurrence = {
                    let counter = occurrence_counts.entry(instance.symbol).or_insert(0);
                    let current = *counter;
                    *counter += 1;
                    current
                };
                let canon =
                    manager.vars(ctx, instance.symbol, Version::Instance(occurrence));
                for (&var, &arg) in canon.iter().zip(instance.args.iter()) {
                    equalities.push(ctx.eq(var, arg));
                }
                canonical_vars.extend(canon.iter().copied());
                body.push(PredicateInstance::new(instance.symbol, canon));
            }
            let head = if clause.head.symbol == SymbolTable::FALSE {
                if !clause.head.args.is_empty() {
                    return Err(ChcError::Clause(ErrorInfo::new(
                        "false-with-arguments",
                        "the query symbol takes no arguments",
                    )));
                }
                PredicateInstance::falsity()
            } else {
                let canon = manager.vars(ctx, clause.head.symbol, Version::Primed);
                for (&var, &arg) in canon.iter().zip(clause.head.args.iter()) {
                    equalities.push(ctx.eq(var, arg));
                }
                canonical_vars.extend(canon.iter().copied());
                PredicateInstance::new(clause.head.symbol, canon)
            };
            let mut parts = vec![clause.constraint];
            parts.extend(equalities);
            let constraint = ctx.and(parts);
            let aux_vars = ctx
                .free_vars(constraint)
                .into_iter()
                .filter(|v| !canonical_vars.contains(v))
                .collect();
            clauses.push(NormalizedClause {
                head,
                body,
                constraint,
                aux_vars,
            });
        }
        Ok(NormalizedSystem {
            symbols,
            clauses,
            manager,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chc_logic::Sort;

    #[test]
    fn tautologies_and_vacuous_clauses_are_dropped() {
        let mut ctx = TermContext::new();
        let mut system = ClauseSystem::new();
        let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
        let x = ctx.int_var("x");
        let tru = ctx.tru();
        system
            .add_clause(&ctx, PredicateInstance::truth(), vec![], tru)
            .unwrap();
        system
            .add_clause(
                &ctx,
                PredicateInstance::new(p, vec![x]),
                vec![PredicateInstance::falsity()],
                tru,
            )
            .unwrap();
        let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
        assert!(normalized.clauses.is_empty());
    }

    #[test]
    fn body_truth_is_removed() {
        let mut ctx = TermContext::new();
        let mut system = ClauseSystem::new();
        let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
        let x = ctx.int_var("x");
        let tru = ctx.tru();
        system
            .add_clause(
                &ctx,
                PredicateInstance::new(p, vec![x]),
                vec![PredicateInstance::truth()],
                tru,
            )
            .unwrap();
        let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
        assert_eq!(normalized.clauses.len(), 1);
        assert!(normalized.clauses[0].body.is_empty());
    }

    #[test]
    fn duplicate_body_occurrences_get_distinct_vectors() {
        let mut ctx = TermContext::new();
        let mut system = ClauseSystem::new();
        let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
        let x = ctx.int_var("x");
        let y = ctx.int_var("y");
        let constraint = ctx.eq(x, y);
        system
            .add_clause(
                &ctx,
                PredicateInstance::falsity(),
                vec![
                    PredicateInstance::new(p, vec![x]),
                    PredicateInstance::new(p, vec![y]),
                ],
                constraint,
            )
            .unwrap();
        let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
        let clause = &normalized.clauses[0];
        assert_eq!(clause.body.len(), 2);
        assert_ne!(clause.body[0].args, clause.body[1].args);
    }

    #[test]
    fn original_arguments_become_auxiliary_variables() {
        let mut ctx = TermContext::new();
        let mut system = ClauseSystem::new();
        let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
        let x = ctx.int_var("x");
        let zero = ctx.int_const(0);
        let guard = ctx.geq(x, zero);
        system
            .add_clause(&ctx, PredicateInstance::new(p, vec![x]), vec![], guard)
            .unwrap();
        let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
        let clause = &normalized.clauses[0];
        assert_eq!(clause.aux_vars, vec![x]);
    }
}
