//! Per-edge constraint simplification.

use chc_core::ChcError;
use chc_graph::HyperGraph;
use chc_logic::{simplify, TermContext};

use crate::framework::{BackTranslator, IdentityBackTranslator, Transformation};
use crate::rebuild::WorkGraph;

/// Rewrites every edge constraint through the term simplifier.
///
/// Structure and edge order are preserved, so the back-translation is the
/// identity.
#[derive(Debug, Default)]
pub struct ConstraintSimplifier;

impl ConstraintSimplifier {
    /// Creates the transformation.
    pub fn new() -> Self {
        Self
    }
}

impl Transformation for ConstraintSimplifier {
    fn name(&self) -> &'static str {
        "constraint-simplifier"
    }

    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        let mut work = WorkGraph::from_graph(graph);
        for edge in &mut work.edges {
            edge.constraint = simplify(ctx, edge.constraint);
        }
        let (rebuilt, _) = work.finalize()?;
        Ok((
            rebuilt,
            Box::new(IdentityBackTranslator) as Box<dyn BackTranslator>,
        ))
    }
}
