//! Re-checks engine answers against the original graph.
//!
//! The validator is independent of every engine: it only uses the term
//! subsystem. Ill-formed witnesses are reported as not validated, never as
//! panics.


use chc_core::{ChcError, VerificationAnswer};
use chc_logic::{is_sat, TermContext};
use chc_graph::{
    HyperGraph, InvalidityWitness, SymbolTable, ValidityWitness, VerificationResult,
};

/// Validation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// The witness certifies the answer on this graph.
    Validated,
    /// The witness is missing, ill-formed, or fails a check.
    NotValidated,
}

/// Witness validator.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Checks a verification result against a graph.
    pub fn validate(
        &self,
        ctx: &mut TermContext,
        graph: &HyperGraph,
        result: &VerificationResult,
    ) -> Result<Validation, ChcError> {
        match result.answer() {
            VerificationAnswer::Safe => match result.validity_witness() {
                Some(witness) => self.validate_safety(ctx, graph, witness),
                None => Ok(Validation::NotValidated),
            },
            VerificationAnswer::Unsafe => match result.invalidity_witness() {
                Some(witness) => self.validate_unsafety(ctx, graph, witness),
                None => Ok(Validation::NotValidated),
            },
            VerificationAnswer::Unknown => Ok(Validation::NotValidated),
        }
    }

    /// For every edge, `∧ source interpretations ∧ constraint ∧ ¬target
    /// interpretation` must be unsatisfiable.
    fn validate_safety(
        &self,
        ctx: &mut TermContext,
        graph: &HyperGraph,
        witness: &ValidityWitness,
    ) -> Result<Validation, ChcError> {
        for edge in graph.edges() {
            let mut parts = Vec::new();
            for position in 0..edge.sources.len() {
                let source = edge.sources[position];
                let sym = graph.node_symbol(source);
                if sym == SymbolTable::TRUE {
                    continue;
                }
                let Some(interpretation) = witness.get(sym) else {
                    return Ok(Validation::NotValidated);
                };
                let base = graph.manager().base_vars(ctx, sym);
                let occurrence = graph.source_vars(ctx, edge, position);
                let renaming = base.into_iter().zip(occurrence).collect();
                parts.push(ctx.substitute(interpretation, &renaming));
            }
            parts.push(edge.constraint);
            let target_sym = graph.node_symbol(edge.target);
            let head = if target_sym == SymbolTable::FALSE {
                ctx.fls()
            } else {
                let Some(interpretation) = witness.get(target_sym) else {
                    return Ok(Validation::NotValidated);
                };
                let base = graph.manager().base_vars(ctx, target_sym);
                let primed = graph.manager().primed_vars(ctx, target_sym);
                let renaming = base.into_iter().zip(primed).collect();
                ctx.substitute(interpretation, &renaming)
            };
            let negated_head = ctx.not(head);
            parts.push(negated_head);
            let query = ctx.and(parts);
            if is_sat(ctx, query)? {
                return Ok(Validation::NotValidated);
            }
        }
        Ok(Validation::Validated)
    }

    /// Structural checks on the derivation tree plus per-step
    /// satisfiability under the recorded assignments.
    fn validate_unsafety(
        &self,
        ctx: &mut TermContext,
        graph: &HyperGraph,
        witness: &InvalidityWitness,
    ) -> Result<Validation, ChcError> {
        let Some(root) = witness.root() else {
            return Ok(Validation::NotValidated);
        };
        let Ok(root_edge) = graph.edge(root.edge) else {
            return Ok(Validation::NotValidated);
        };
        if root_edge.target != graph.exit() {
            return Ok(Validation::NotValidated);
        }
        let steps = witness.steps();
        for (index, step) in steps.iter().enumerate() {
            let Ok(edge) = graph.edge(step.edge) else {
                return Ok(Validation::NotValidated);
            };
            let derived_sources: Vec<usize> = (0..edge.sources.len())
                .filter(|&p| graph.node_symbol(edge.sources[p]) != SymbolTable::TRUE)
                .collect();
            if derived_sources.len() != step.premises.len() {
                return Ok(Validation::NotValidated);
            }
            for (slot, &premise) in derived_sources.iter().zip(step.premises.iter()) {
                // Premises must be earlier steps deriving the right node,
                // with matching state values across the join.
                if premise >= index {
                    return Ok(Validation::NotValidated);
                }
                let premise_step = &steps[premise];
                let Ok(premise_edge) = graph.edge(premise_step.edge) else {
                    return Ok(Validation::NotValidated);
                };
                let source = edge.sources[*slot];
                if premise_edge.target != source {
                    return Ok(Validation::NotValidated);
                }
                let primed = graph.next_state_vars(ctx, source);
                let occurrence = graph.source_vars(ctx, edge, *slot);
                for (pv, ov) in primed.iter().zip(occurrence.iter()) {
                    match (premise_step.assignment.get(pv), step.assignment.get(ov)) {
                        (Some(a), Some(b)) if a == b => {}
                        _ => return Ok(Validation::NotValidated),
                    }
                }
            }
            let grounded = ctx.substitute(edge.constraint, &step.assignment);
            if !is_sat(ctx, grounded)? {
                return Ok(Validation::NotValidated);
            }
        }
        Ok(Validation::Validated)
    }
}
