//! Engine contract and the trivial solver for collapsed graphs.

use std::collections::BTreeMap;

use chc_core::{ChcError, ErrorInfo, Options, VerificationAnswer};
use chc_graph::{
    DerivationStep, HyperGraph, InvalidityWitness, NormalGraph, ValidityWitness,
    VerificationResult,
};
use chc_logic::{get_model, TermContext};

/// A verification engine. The contract is stable across engines: consume a
/// normal graph, produce an answer with optional witnesses.
pub trait Engine {
    /// Short name for diagnostics and option matching.
    fn name(&self) -> &'static str;

    /// Solves the graph.
    fn solve(
        &self,
        ctx: &mut TermContext,
        graph: &NormalGraph,
    ) -> Result<VerificationResult, ChcError>;
}

/// Decides a graph whose every edge connects `Entry` directly to `Exit`.
///
/// Such graphs appear after aggressive transformation passes collapse all
/// intermediate structure. The graph is unsafe iff some edge constraint is
/// satisfiable; the model becomes a one-step derivation.
pub fn solve_trivial(
    ctx: &mut TermContext,
    graph: &HyperGraph,
    options: &Options,
) -> Result<VerificationResult, ChcError> {
    let entry = graph.entry();
    let exit = graph.exit();
    for edge in graph.edges() {
        let trivial = edge.target == exit && edge.sources.iter().all(|&s| s == entry);
        if !trivial {
            return Err(ChcError::Graph(
                ErrorInfo::new(
                    "not-trivial",
                    "the trivial solver only accepts entry-to-exit graphs",
                )
                .with_context("edge", edge.id.as_raw().to_string()),
            ));
        }
    }
    for edge in graph.edges() {
        if let Some(model) = get_model(ctx, edge.constraint)? {
            let mut result = VerificationResult::new(VerificationAnswer::Unsafe);
            if options.compute_witness() {
                let mut assignment = BTreeMap::new();
                for (var, value) in model {
                    let constant = crate::values::value_term(ctx, value);
                    assignment.insert(var, constant);
                }
                let witness = InvalidityWitness::from_steps(vec![DerivationStep {
                    edge: edge.id,
                    premises: Vec::new(),
                    assignment,
                }]);
                result = result.with_invalidity(witness);
            }
            return Ok(result);
        }
    }
    let mut result = VerificationResult::new(VerificationAnswer::Safe);
    if options.compute_witness() {
        // No state nodes remain, so the empty interpretation suffices.
        result = result.with_validity(ValidityWitness::new());
    }
    Ok(result)
}

/// Whether the `engine` option value names an engine implemented here.
pub fn engine_is_supported(name: &str) -> bool {
    matches!(name, "tpa" | "tpa-split")
}
