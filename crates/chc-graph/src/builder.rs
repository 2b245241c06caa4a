//! Builds a hypergraph from a normalized clause system.

use chc_core::ChcError;

use crate::clauses::SymbolTable;
use crate::hypergraph::HyperGraph;
use crate::normalizer::NormalizedSystem;

/// Graph builder.
#[derive(Debug, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self
    }

    /// Produces a hypergraph: one node per user predicate symbol plus
    /// `Entry` and `Exit`; one edge per clause, with facts entering from
    /// `Entry` and queries targeting `Exit`.
    pub fn build(&self, normalized: NormalizedSystem) -> Result<HyperGraph, ChcError> {
        let NormalizedSystem {
            symbols,
            clauses,
            manager,
        } = normalized;
        let mut graph = HyperGraph::new(symbols.clone(), manager);
        for sym in symbols.user_symbols() {
            graph.add_node(sym)?;
        }
        let missing_node = |name: &str| {
            ChcError::Graph(
                chc_core::ErrorInfo::new("missing-node", "clause references a symbol with no node")
                    .with_context("symbol", name),
            )
        };
        for clause in clauses {
            let target = if clause.head.symbol == SymbolTable::FALSE {
                graph.exit()
            } else {
                graph
                    .node_for(clause.head.symbol)
                    .ok_or_else(|| missing_node(symbols.name(clause.head.symbol)))?
            };
            let sources = if clause.body.is_empty() {
                vec![graph.entry()]
            } else {
                clause
                    .body
                    .iter()
                    .map(|instance| {
                        graph
                            .node_for(instance.symbol)
                            .ok_or_else(|| missing_node(symbols.name(instance.symbol)))
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };
            graph.add_edge(sources, target, clause.constraint)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::{ClauseSystem, PredicateInstance};
    use crate::normalizer::Normalizer;
    use chc_logic::{Sort, TermContext};

    #[test]
    fn facts_and_queries_use_the_synthetic_nodes() {
        let mut ctx = TermContext::new();
        let mut system = ClauseSystem::new();
        let p = system.register_predicate("p", vec![Sort::Int]).unwrap();
        let x = ctx.int_var("x");
        let zero = ctx.int_const(0);
        let fact_guard = ctx.geq(x, zero);
        system
            .add_clause(&ctx, PredicateInstance::new(p, vec![x]), vec![], fact_guard)
            .unwrap();
        let query_guard = ctx.lt(x, zero);
        system
            .add_clause(
                &ctx,
                PredicateInstance::falsity(),
                vec![PredicateInstance::new(p, vec![x])],
                query_guard,
            )
            .unwrap();
        let normalized = Normalizer::new().normalize(&mut ctx, &system).unwrap();
        let graph = GraphBuilder::new().build(normalized).unwrap();
        assert_eq!(graph.edges().len(), 2);
        let entry = graph.entry();
        let exit = graph.exit();
        let node = graph.node_for(p).unwrap();
        assert_eq!(graph.edges()[0].sources, vec![entry]);
        assert_eq!(graph.edges()[0].target, node);
        assert_eq!(graph.edges()[1].sources, vec![node]);
        assert_eq!(graph.edges()[1].target, exit);
        assert!(graph.is_normal());
    }
}
