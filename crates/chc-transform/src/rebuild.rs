//! Working representation shared by the transformations.
//!
//! Transformations edit a mutable copy of the edge list under stable
//! working identifiers, then rebuild a fresh graph once. The working id of
//! an input edge is its raw edge id; synthetic edges draw fresh ids above
//! that range, so translators can tell survivors from products.

use std::collections::BTreeMap;

use chc_core::{ChcError, EdgeId, ErrorInfo, NodeId};
use chc_logic::{get_model, TermContext, TermRef, Value};
use chc_graph::{HyperGraph, SymRef, SymbolTable, VersionManager};

/// Edge under transformation.
#[derive(Debug, Clone)]
pub(crate) struct WorkEdge {
    pub(crate) wid: u64,
    pub(crate) sources: Vec<NodeId>,
    pub(crate) target: NodeId,
    pub(crate) constraint: TermRef,
}

impl WorkEdge {
    /// Occurrence index of the source at `position` among equal sources.
    pub(crate) fn occurrence_at(&self, position: usize) -> u32 {
        let node = self.sources[position];
        self.sources[..position]
            .iter()
            .filter(|&&n| n == node)
            .count() as u32
    }
}

/// Mutable graph copy with stable working ids.
#[derive(Debug)]
pub(crate) struct WorkGraph {
    pub(crate) symbols: SymbolTable,
    pub(crate) manager: VersionManager,
    /// User nodes surviving so far, in input-graph node order.
    pub(crate) nodes: Vec<(NodeId, SymRef)>,
    pub(crate) edges: Vec<WorkEdge>,
    pub(crate) entry: NodeId,
    pub(crate) exit: NodeId,
    next_wid: u64,
}

impl WorkGraph {
    pub(crate) fn from_graph(graph: HyperGraph) -> Self {
        let entry = graph.entry();
        let exit = graph.exit();
        let nodes = graph
            .nodes()
            .into_iter()
            .filter(|&n| n != entry && n != exit)
            .map(|n| (n, graph.node_symbol(n)))
            .collect();
        let edges: Vec<WorkEdge> = graph
            .edges()
            .iter()
            .map(|e| WorkEdge {
                wid: e.id.as_raw(),
                sources: e.sources.clone(),
                target: e.target,
                constraint: e.constraint,
            })
            .collect();
        let next_wid = edges.iter().map(|e| e.wid + 1).max().unwrap_or(0);
        Self {
            symbols: graph.symbols().clone(),
            manager: graph.manager().clone(),
            nodes,
            edges,
            entry,
            exit,
            next_wid,
        }
    }

    pub(crate) fn fresh_wid(&mut self) -> u64 {
        let wid = self.next_wid;
        self.next_wid += 1;
        wid
    }

    pub(crate) fn edge(&self, wid: u64) -> Option<&WorkEdge> {
        self.edges.iter().find(|e| e.wid == wid)
    }

    pub(crate) fn node_symbol(&self, node: NodeId) -> Option<SymRef> {
        if node == self.entry {
            return Some(SymbolTable::TRUE);
        }
        if node == self.exit {
            return Some(SymbolTable::FALSE);
        }
        self.nodes
            .iter()
            .find(|(n, _)| *n == node)
            .map(|(_, sym)| *sym)
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) {
        self.nodes.retain(|(n, _)| *n != node);
    }

    pub(crate) fn remove_edges(&mut self, wids: &[u64]) {
        self.edges.retain(|e| !wids.contains(&e.wid));
    }

    /// Builds the final graph. Returns the graph together with the mapping
    /// from working ids to the ids of the rebuilt edge list.
    pub(crate) fn finalize(self) -> Result<(HyperGraph, BTreeMap<u64, EdgeId>), ChcError> {
        let mut graph = HyperGraph::new(self.symbols, self.manager);
        let mut node_map: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        node_map.insert(self.entry, graph.entry());
        node_map.insert(self.exit, graph.exit());
        for (old, sym) in &self.nodes {
            let new = graph.add_node(*sym)?;
            node_map.insert(*old, new);
        }
        let missing = |node: NodeId| {
            ChcError::Graph(
                ErrorInfo::new("dangling-edge", "edge references a removed node")
                    .with_context("node", node.as_raw().to_string()),
            )
        };
        let mut wid_map = BTreeMap::new();
        for edge in self.edges {
            let sources = edge
                .sources
                .iter()
                .map(|n| node_map.get(n).copied().ok_or_else(|| missing(*n)))
                .collect::<Result<Vec<_>, _>>()?;
            let target = node_map
                .get(&edge.target)
                .copied()
                .ok_or_else(|| missing(edge.target))?;
            let id = graph.add_edge(sources, target, edge.constraint)?;
            wid_map.insert(edge.wid, id);
        }
        Ok((graph, wid_map))
    }
}

/// Turns a model value into a constant term.
pub(crate) fn value_term(ctx: &mut TermContext, value: Value) -> TermRef {
    match value {
        Value::Int(v) => ctx.int_const(v),
        Value::Bool(true) => ctx.tru(),
        Value::Bool(false) => ctx.fls(),
    }
}

/// Completes a partial assignment so that it binds every free variable of
/// `constraint`, solving for the missing values.
pub(crate) fn complete_assignment(
    ctx: &mut TermContext,
    constraint: TermRef,
    partial: BTreeMap<TermRef, TermRef>,
) -> Result<BTreeMap<TermRef, TermRef>, ChcError> {
    let free = ctx.free_vars(constraint);
    if free.iter().all(|v| partial.contains_key(v)) {
        return Ok(partial);
    }
    let grounded = ctx.substitute(constraint, &partial);
    let Some(model) = get_model(ctx, grounded)? else {
        return Err(ChcError::Witness(ErrorInfo::new(
            "assignment-gap",
            "recorded assignment cannot be completed against the edge constraint",
        )));
    };
    let mut out = partial;
    for v in free {
        if out.contains_key(&v) {
            continue;
        }
        let value = model.get(&v).copied().unwrap_or(match ctx.sort_of(v) {
            chc_logic::Sort::Int => Value::Int(0),
            chc_logic::Sort::Bool => Value::Bool(false),
        });
        let constant = value_term(ctx, value);
        out.insert(v, constant);
    }
    Ok(out)
}

/// Derivation step addressed by working id instead of graph edge id.
///
/// Translators expand summarized or composed steps in this id space and
/// only map back to concrete edge ids at the very end.
#[derive(Debug, Clone)]
pub(crate) struct WidStep {
    pub(crate) wid: u64,
    pub(crate) premises: Vec<usize>,
    pub(crate) assignment: BTreeMap<TermRef, TermRef>,
}

pub(crate) fn witness_to_wid_steps(
    witness: &chc_graph::InvalidityWitness,
    final_to_wid: &BTreeMap<u64, u64>,
) -> Result<Vec<WidStep>, ChcError> {
    witness
        .steps()
        .iter()
        .map(|step| {
            let wid = final_to_wid
                .get(&step.edge.as_raw())
                .copied()
                .ok_or_else(|| unknown_step_edge(step.edge))?;
            Ok(WidStep {
                wid,
                premises: step.premises.clone(),
                assignment: step.assignment.clone(),
            })
        })
        .collect()
}

pub(crate) fn wid_steps_to_witness(
    steps: Vec<WidStep>,
    wid_to_original: &BTreeMap<u64, EdgeId>,
) -> Result<chc_graph::InvalidityWitness, ChcError> {
    let mut out = Vec::new();
    for step in steps {
        let edge = wid_to_original.get(&step.wid).copied().ok_or_else(|| {
            ChcError::Witness(
                ErrorInfo::new(
                    "unexpanded-step",
                    "derivation step survived translation without an original edge",
                )
                .with_context("wid", step.wid.to_string()),
            )
        })?;
        out.push(chc_graph::DerivationStep {
            edge,
            premises: step.premises,
            assignment: step.assignment,
        });
    }
    Ok(chc_graph::InvalidityWitness::from_steps(out))
}

fn unknown_step_edge(edge: EdgeId) -> ChcError {
    ChcError::Witness(
        ErrorInfo::new("foreign-edge", "derivation step uses an edge unknown to this graph")
            .with_context("edge", edge.as_raw().to_string()),
    )
}
