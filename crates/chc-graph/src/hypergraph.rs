//! Directed hypergraph over predicate symbols.

use std::collections::{BTreeMap, BTreeSet};

use chc_core::{ChcError, EdgeId, ErrorInfo, NodeId};
use chc_logic::{TermContext, TermRef};

use crate::clauses::{SymbolTable, SymRef};
use crate::versions::{Version, VersionManager};

/// Edge with an ordered source list, a target, and a constraint.
///
/// Sources may repeat a node; the `j`-th occurrence of a node within the
/// source list reads the symbol's `Instance(j)` vector in the constraint,
/// and the target is described by its primed vector.
#[derive(Debug, Clone)]
pub struct HyperEdge {
    /// Identifier, unique within one graph.
    pub id: EdgeId,
    /// Ordered source nodes.
    pub sources: Vec<NodeId>,
    /// Target node.
    pub target: NodeId,
    /// Boolean constraint relating source and target vectors.
    pub constraint: TermRef,
}

impl HyperEdge {
    /// Occurrence index of the source at `position` among equal sources.
    pub fn occurrence_at(&self, position: usize) -> u32 {
        let node = self.sources[position];
        self.sources[..position]
            .iter()
            .filter(|&&n| n == node)
            .count() as u32
    }
}

/// Directed hypergraph built from a normalized clause system.
///
/// Graphs are value-owned: they are built once and never mutated after
/// construction; transformations consume a graph and produce a new one.
#[derive(Debug, Clone)]
pub struct HyperGraph {
    symbols: SymbolTable,
    manager: VersionManager,
    node_syms: Vec<SymRef>,
    node_of_sym: BTreeMap<SymRef, NodeId>,
    edges: Vec<HyperEdge>,
}

impl HyperGraph {
    /// Creates a graph holding only the `Entry` and `Exit` nodes.
    pub fn new(symbols: SymbolTable, manager: VersionManager) -> Self {
        let mut graph = Self {
            symbols,
            manager,
            node_syms: Vec::new(),
            node_of_sym: BTreeMap::new(),
            edges: Vec::new(),
        };
        graph.push_node(SymbolTable::TRUE);
        graph.push_node(SymbolTable::FALSE);
        graph
    }

    fn push_node(&mut self, sym: SymRef) -> NodeId {
        let id = NodeId::from_raw(self.node_syms.len() as u64);
        self.node_syms.push(sym);
        self.node_of_sym.insert(sym, id);
        id
    }

    /// The entry node, mapped to `⊤`.
    pub fn entry(&self) -> NodeId {
        NodeId::from_raw(0)
    }

    /// The exit node, mapped to `⊥`.
    pub fn exit(&self) -> NodeId {
        NodeId::from_raw(1)
    }

    /// Adds a node for a user predicate symbol.
    pub fn add_node(&mut self, sym: SymRef) -> Result<NodeId, ChcError> {
        if self.node_of_sym.contains_key(&sym) {
            return Err(ChcError::Graph(
                ErrorInfo::new("duplicate-node", "symbol already has a node")
                    .with_context("symbol", self.symbols.name(sym)),
            ));
        }
        Ok(self.push_node(sym))
    }

    /// Adds a hyperedge. Edges into `Entry` or out of `Exit` are rejected.
    pub fn add_edge(
        &mut self,
        sources: Vec<NodeId>,
        target: NodeId,
        constraint: TermRef,
    ) -> Result<EdgeId, ChcError> {
        if target == self.entry() {
            return Err(ChcError::Graph(ErrorInfo::new(
                "edge-into-entry",
                "no edge may target the entry node",
            )));
        }
        for &source in &sources {
            if source == self.exit() {
                return Err(ChcError::Graph(ErrorInfo::new(
                    "edge-from-exit",
                    "no edge may leave the exit node",
                )));
            }
            self.check_node(source)?;
        }
        self.check_node(target)?;
        if sources.is_empty() {
            return Err(ChcError::Graph(ErrorInfo::new(
                "empty-sources",
                "every edge needs at least one source",
            )));
        }
        let id = EdgeId::from_raw(self.edges.len() as u64);
        self.edges.push(HyperEdge {
            id,
            sources,
            target,
            constraint,
        });
        Ok(id)
    }

    fn check_node(&self, node: NodeId) -> Result<(), ChcError> {
        if node.as_raw() as usize >= self.node_syms.len() {
            return Err(ChcError::Graph(
                ErrorInfo::new("unknown-node", "node does not belong to this graph")
                    .with_context("node", node.as_raw().to_string()),
            ));
        }
        Ok(())
    }

    /// All node identifiers, `Entry` and `Exit` included.
    pub fn nodes(&self) -> Vec<NodeId> {
        (0..self.node_syms.len() as u64).map(NodeId::from_raw).collect()
    }

    /// Symbol mapped to a node.
    pub fn node_symbol(&self, node: NodeId) -> SymRef {
        self.node_syms[node.as_raw() as usize]
    }

    /// Node mapped to a symbol, if present in this graph.
    pub fn node_for(&self, sym: SymRef) -> Option<NodeId> {
        self.node_of_sym.get(&sym).copied()
    }

    /// The ordered edge list.
    pub fn edges(&self) -> &[HyperEdge] {
        &self.edges
    }

    /// Looks up an edge.
    pub fn edge(&self, id: EdgeId) -> Result<&HyperEdge, ChcError> {
        self.edges
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| {
                ChcError::Graph(
                    ErrorInfo::new("unknown-edge", "edge does not belong to this graph")
                        .with_context("edge", id.as_raw().to_string()),
                )
            })
    }

    /// Edges targeting `node`.
    pub fn incoming(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.target == node)
            .map(|e| e.id)
            .collect()
    }

    /// Edges listing `node` among their sources.
    pub fn outgoing(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.sources.contains(&node))
            .map(|e| e.id)
            .collect()
    }

    /// The predicate registry.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The version manager carried with this graph.
    pub fn manager(&self) -> &VersionManager {
        &self.manager
    }

    /// Mutable access to the version manager (fresh-vector allocation).
    pub fn manager_mut(&mut self) -> &mut VersionManager {
        &mut self.manager
    }

    /// State vector of a node (empty for `Entry`/`Exit`).
    pub fn state_vars(&self, ctx: &mut TermContext, node: NodeId) -> Vec<TermRef> {
        let sym = self.node_symbol(node);
        if sym == SymbolTable::TRUE || sym == SymbolTable::FALSE {
            return Vec::new();
        }
        self.manager.base_vars(ctx, sym)
    }

    /// Next-state vector of a node (empty for `Entry`/`Exit`).
    pub fn next_state_vars(&self, ctx: &mut TermContext, node: NodeId) -> Vec<TermRef> {
        let sym = self.node_symbol(node);
        if sym == SymbolTable::TRUE || sym == SymbolTable::FALSE {
            return Vec::new();
        }
        self.manager.primed_vars(ctx, sym)
    }

    /// Occurrence-indexed source vector used by an edge constraint.
    pub fn source_vars(
        &self,
        ctx: &mut TermContext,
        edge: &HyperEdge,
        position: usize,
    ) -> Vec<TermRef> {
        let node = edge.sources[position];
        let sym = self.node_symbol(node);
        if sym == SymbolTable::TRUE {
            return Vec::new();
        }
        self.manager
            .vars(ctx, sym, Version::Instance(edge.occurrence_at(position)))
    }

    /// Whether every edge has exactly one source.
    pub fn is_normal(&self) -> bool {
        self.edges.iter().all(|e| e.sources.len() == 1)
    }

    /// Reinterprets the graph as a normal graph.
    pub fn to_normal_graph(self) -> Result<NormalGraph, ChcError> {
        if !self.is_normal() {
            return Err(ChcError::Graph(ErrorInfo::new(
                "not-normal",
                "graph still contains hyperedges",
            )));
        }
        Ok(NormalGraph { graph: self })
    }

    /// Nodes lying on some cycle (through any edge role).
    pub fn nodes_on_cycles(&self) -> BTreeSet<NodeId> {
        let mut on_cycle = BTreeSet::new();
        for start in self.nodes() {
            if on_cycle.contains(&start) {
                continue;
            }
            // Reachability from each successor of `start` back to `start`.
            let mut stack: Vec<NodeId> = Vec::new();
            let mut seen: BTreeSet<NodeId> = BTreeSet::new();
            for edge in &self.edges {
                if edge.sources.contains(&start) && seen.insert(edge.target) {
                    stack.push(edge.target);
                }
            }
            while let Some(node) = stack.pop() {
                if node == start {
                    on_cycle.insert(start);
                    break;
                }
                for edge in &self.edges {
                    if edge.sources.contains(&node) && seen.insert(edge.target) {
                        stack.push(edge.target);
                    }
                }
            }
        }
        on_cycle
    }
}

/// A hypergraph whose every edge has exactly one source.
#[derive(Debug, Clone)]
pub struct NormalGraph {
    graph: HyperGraph,
}

impl NormalGraph {
    /// The underlying graph.
    pub fn graph(&self) -> &HyperGraph {
        &self.graph
    }

    /// Consumes the wrapper.
    pub fn into_graph(self) -> HyperGraph {
        self.graph
    }

    /// Single source of an edge.
    pub fn source(&self, edge: &HyperEdge) -> NodeId {
        edge.sources[0]
    }

    /// Whether the graph is a linear chain: every non-`Exit` node has
    /// exactly one outgoing non-loop edge and every non-`Entry` node has
    /// exactly one incoming non-loop edge. Self-loops on state nodes are
    /// allowed and do not count against either degree.
    pub fn is_linear_chain(&self) -> bool {
        let entry = self.graph.entry();
        let exit = self.graph.exit();
        for node in self.graph.nodes() {
            let out_degree = self
                .graph
                .edges()
                .iter()
                .filter(|e| e.sources[0] == node && e.target != node)
                .count();
            let in_degree = self
                .graph
                .edges()
                .iter()
                .filter(|e| e.target == node && e.sources[0] != node)
                .count();
            if node != exit && out_degree != 1 {
                return false;
            }
            if node != entry && in_degree != 1 {
                return false;
            }
        }
        true
    }
}
