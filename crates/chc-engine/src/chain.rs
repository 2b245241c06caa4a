//! Chain-structure analysis of normal graphs.

use chc_core::{ChcError, EdgeId, ErrorInfo, NodeId};
use chc_graph::{NormalGraph, SymRef};
use chc_logic::TermRef;

/// One state node of the chain with its classified edges.
#[derive(Debug, Clone)]
pub(crate) struct ChainNode {
    pub(crate) node: NodeId,
    pub(crate) sym: SymRef,
    /// Self-loop edges on this node.
    pub(crate) loop_edges: Vec<(EdgeId, TermRef)>,
    /// Edges to the next chain node (empty on the last node).
    pub(crate) step_edges: Vec<(EdgeId, TermRef)>,
    /// Edges to `Exit`.
    pub(crate) exit_edges: Vec<(EdgeId, TermRef)>,
}

/// A normal graph decomposed as `Entry → q0 → … → qm → Exit` with optional
/// self-loops and per-node exit edges.
#[derive(Debug, Clone)]
pub(crate) struct ChainStructure {
    pub(crate) nodes: Vec<ChainNode>,
    /// Edges `Entry → q0`.
    pub(crate) init_edges: Vec<(EdgeId, TermRef)>,
    /// Direct `Entry → Exit` refutation candidates.
    pub(crate) entry_exit_edges: Vec<(EdgeId, TermRef)>,
}

fn not_a_chain(detail: &str) -> ChcError {
    ChcError::Graph(ErrorInfo::new("not-a-chain", detail).with_hint(
        "run the transformation pipeline first; the engine only solves linearly chained systems",
    ))
}

/// Classifies the graph or rejects it.
pub(crate) fn analyze(graph: &NormalGraph) -> Result<ChainStructure, ChcError> {
    let inner = graph.graph();
    let entry = inner.entry();
    let exit = inner.exit();

    let mut init_edges = Vec::new();
    let mut entry_exit_edges = Vec::new();
    let mut first_node = None;
    for edge in inner.edges() {
        if edge.sources[0] != entry {
            continue;
        }
        if edge.target == exit {
            entry_exit_edges.push((edge.id, edge.constraint));
            continue;
        }
        match first_node {
            None => first_node = Some(edge.target),
            Some(existing) if existing == edge.target => {}
            Some(_) => return Err(not_a_chain("entry feeds more than one node")),
        }
        init_edges.push((edge.id, edge.constraint));
    }

    let mut nodes = Vec::new();
    let mut classified = entry_exit_edges.len() + init_edges.len();
    let mut visited = std::collections::BTreeSet::new();
    let mut current = first_node;
    while let Some(node) = current {
        if !visited.insert(node) {
            return Err(not_a_chain("the chain revisits a node"));
        }
        let sym = inner.node_symbol(node);
        let mut loop_edges = Vec::new();
        let mut step_edges = Vec::new();
        let mut exit_edges = Vec::new();
        let mut next = None;
        for edge in inner.edges() {
            if edge.sources[0] != node {
                continue;
            }
            if edge.target == node {
                loop_edges.push((edge.id, edge.constraint));
            } else if edge.target == exit {
                exit_edges.push((edge.id, edge.constraint));
            } else {
                match next {
                    None => next = Some(edge.target),
                    Some(existing) if existing == edge.target => {}
                    Some(_) => return Err(not_a_chain("a node steps to more than one successor")),
                }
                step_edges.push((edge.id, edge.constraint));
            }
        }
        classified += loop_edges.len() + step_edges.len() + exit_edges.len();
        nodes.push(ChainNode {
            node,
            sym,
            loop_edges,
            step_edges,
            exit_edges,
        });
        current = next;
    }

    if classified != inner.edges().len() {
        return Err(not_a_chain("the graph has edges outside the chain"));
    }
    Ok(ChainStructure {
        nodes,
        init_edges,
        entry_exit_edges,
    })
}
