//! Contracts maximal simple chains into single summary edges.

use std::collections::{BTreeMap, BTreeSet};

use chc_core::{ChcError, EdgeId, ErrorInfo, NodeId, VerificationAnswer};
use chc_graph::{
    HyperGraph, SymRef, SymbolTable, ValidityWitness, VerificationResult, VersionManager,
};
use chc_logic::{project, TermContext, TermRef};

use crate::framework::{BackTranslator, Transformation};
use crate::rebuild::{
    complete_assignment, wid_steps_to_witness, witness_to_wid_steps, WidStep, WorkGraph,
};

/// Summarizes chains whose interior nodes have in-degree one, out-degree
/// one, and no self-loop, touching only single-source edges.
///
/// The summary constraint is the conjunction of the member constraints
/// under instance versioning: every interior state vector is replaced by a
/// fresh vector, so the intermediates become auxiliary variables of the new
/// edge. Chains ending at `Exit` are summarized like any other.
#[derive(Debug, Default)]
pub struct SimpleChainSummarizer;

impl SimpleChainSummarizer {
    /// Creates the transformation.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone)]
struct ChainPart {
    wid: u64,
    source_sym: SymRef,
    target_sym: SymRef,
    /// Constraint as it appeared on the member edge (convention form).
    constraint: TermRef,
    /// Member auxiliaries to their stand-ins in the summary constraint.
    aux_renaming: BTreeMap<TermRef, TermRef>,
    /// Vector standing for the source state in the summary constraint.
    source_vector: Vec<TermRef>,
    /// Vector standing for the target state in the summary constraint.
    target_vector: Vec<TermRef>,
}

#[derive(Debug, Clone)]
struct ChainRecord {
    summary_wid: u64,
    summary_constraint: TermRef,
    parts: Vec<ChainPart>,
}

struct ChainBackTranslator {
    records: Vec<ChainRecord>,
    final_to_wid: BTreeMap<u64, u64>,
    wid_to_original: BTreeMap<u64, EdgeId>,
    manager: VersionManager,
}

impl Transformation for SimpleChainSummarizer {
    fn name(&self) -> &'static str {
        "simple-chain-summarizer"
    }

    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        let wid_to_original: BTreeMap<u64, EdgeId> =
            graph.edges().iter().map(|e| (e.id.as_raw(), e.id)).collect();
        let mut work = WorkGraph::from_graph(graph);
        let mut records = Vec::new();
        while let Some(chain) = find_chain(&work) {
            let record = contract_chain(ctx, &mut work, &chain)?;
            records.push(record);
        }
        let manager = work.manager.clone();
        let (rebuilt, wid_map) = work.finalize()?;
        let final_to_wid = wid_map.iter().map(|(&wid, id)| (id.as_raw(), wid)).collect();
        Ok((
            rebuilt,
            Box::new(ChainBackTranslator {
                records,
                final_to_wid,
                wid_to_original,
                manager,
            }),
        ))
    }
}

/// A node is chain-interior when exactly one single-source edge enters it,
/// exactly one leaves it, and neither is a self-loop.
fn interior_eligible(work: &WorkGraph, node: NodeId) -> bool {
    let incoming: Vec<_> = work.edges.iter().filter(|e| e.target == node).collect();
    let outgoing: Vec<_> = work
        .edges
        .iter()
        .filter(|e| e.sources.contains(&node))
        .collect();
    incoming.len() == 1
        && outgoing.len() == 1
        && incoming[0].sources.len() == 1
        && incoming[0].sources[0] != node
        && outgoing[0].sources.len() == 1
        && outgoing[0].sources[0] == node
        && outgoing[0].target != node
}

/// Finds one maximal chain (as a working-id edge sequence), if any.
fn find_chain(work: &WorkGraph) -> Option<Vec<u64>> {
    let seed = work
        .nodes
        .iter()
        .map(|(node, _)| *node)
        .find(|&node| interior_eligible(work, node))?;
    let incoming = work.edges.iter().find(|e| e.target == seed)?;
    let outgoing = work
        .edges
        .iter()
        .find(|e| e.sources.contains(&seed) && e.target != seed)?;
    let mut chain = std::collections::VecDeque::from([incoming.wid, outgoing.wid]);
    let mut interior: BTreeSet<NodeId> = BTreeSet::from([seed]);
    let mut first = incoming.sources[0];
    let mut last = outgoing.target;
    while first != last && interior_eligible(work, first) && !interior.contains(&first) {
        let edge = work.edges.iter().find(|e| e.target == first)?;
        chain.push_front(edge.wid);
        interior.insert(first);
        first = edge.sources[0];
    }
    while last != first && interior_eligible(work, last) && !interior.contains(&last) {
        let edge = work.edges.iter().find(|e| e.sources == vec![last])?;
        chain.push_back(edge.wid);
        interior.insert(last);
        last = edge.target;
    }
    Some(chain.into())
}

fn chain_member(work: &WorkGraph, wid: u64) -> Result<crate::rebuild::WorkEdge, ChcError> {
    work.edge(wid).cloned().ok_or_else(|| {
        ChcError::Graph(
            ErrorInfo::new("unknown-edge", "chain member disappeared during contraction")
                .with_context("wid", wid.to_string()),
        )
    })
}

fn contract_chain(
    ctx: &mut TermContext,
    work: &mut WorkGraph,
    chain: &[u64],
) -> Result<ChainRecord, ChcError> {
    let first_edge = chain_member(work, chain[0])?;
    let last_edge = chain_member(work, chain[chain.len() - 1])?;
    let head_node = first_edge.sources[0];
    let tail_node = last_edge.target;

    let mut conjuncts = Vec::new();
    let mut parts: Vec<ChainPart> = Vec::new();
    let mut prev_vector: Vec<TermRef> = Vec::new();
    let mut interior_nodes = Vec::new();
    for (index, &wid) in chain.iter().enumerate() {
        let edge = chain_member(work, wid)?;
        let source_sym = work
            .node_symbol(edge.sources[0])
            .ok_or_else(|| dangling(edge.sources[0]))?;
        let target_sym = work
            .node_symbol(edge.target)
            .ok_or_else(|| dangling(edge.target))?;
        let mut renaming: BTreeMap<TermRef, TermRef> = BTreeMap::new();
        let source_vector = if index == 0 {
            if source_sym == SymbolTable::TRUE {
                Vec::new()
            } else {
                work.manager.base_vars(ctx, source_sym)
            }
        } else {
            let base = work.manager.base_vars(ctx, source_sym);
            for (b, p) in base.iter().zip(prev_vector.iter()) {
                renaming.insert(*b, *p);
            }
            prev_vector.clone()
        };
        let target_vector = if index + 1 == chain.len() {
            if target_sym == SymbolTable::FALSE {
                Vec::new()
            } else {
                work.manager.primed_vars(ctx, target_sym)
            }
        } else {
            interior_nodes.push(edge.target);
            let fresh = work.manager.fresh_vars(ctx, target_sym);
            let primed = work.manager.primed_vars(ctx, target_sym);
            for (p, f) in primed.iter().zip(fresh.iter()) {
                renaming.insert(*p, *f);
            }
            fresh
        };
        let protected: BTreeSet<TermRef> = {
            let mut set = BTreeSet::new();
            if source_sym != SymbolTable::TRUE {
                set.extend(work.manager.base_vars(ctx, source_sym));
            }
            if target_sym != SymbolTable::FALSE {
                set.extend(work.manager.primed_vars(ctx, target_sym));
            }
            set
        };
        let mut aux_renaming = BTreeMap::new();
        for v in ctx.free_vars(edge.constraint) {
            if protected.contains(&v) {
                continue;
            }
            let sort = ctx.sort_of(v);
            let fresh = work.manager.fresh_aux(ctx, sort, "aux");
            aux_renaming.insert(v, fresh);
            renaming.insert(v, fresh);
        }
        conjuncts.push(ctx.substitute(edge.constraint, &renaming));
        parts.push(ChainPart {
            wid,
            source_sym,
            target_sym,
            constraint: edge.constraint,
            aux_renaming,
            source_vector,
            target_vector: target_vector.clone(),
        });
        prev_vector = target_vector;
    }
    let summary_constraint = ctx.and(conjuncts);
    let summary_wid = work.fresh_wid();
    work.remove_edges(chain);
    for node in interior_nodes {
        work.remove_node(node);
    }
    work.edges.push(crate::rebuild::WorkEdge {
        wid: summary_wid,
        sources: vec![head_node],
        target: tail_node,
        constraint: summary_constraint,
    });
    Ok(ChainRecord {
        summary_wid,
        summary_constraint,
        parts,
    })
}

fn dangling(node: NodeId) -> ChcError {
    ChcError::Graph(
        ErrorInfo::new("dangling-edge", "chain member references a removed node")
            .with_context("node", node.as_raw().to_string()),
    )
}

impl BackTranslator for ChainBackTranslator {
    fn translate(
        &self,
        ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError> {
        let (answer, validity, invalidity) = result.into_parts();
        let mut out = VerificationResult::new(answer);
        if let Some(witness) = validity {
            if answer == VerificationAnswer::Safe {
                out = out.with_validity(self.fill_interior_interpretations(ctx, witness)?);
            } else {
                out = out.with_validity(witness);
            }
        }
        if let Some(witness) = invalidity {
            if answer == VerificationAnswer::Unsafe {
                out = out.with_invalidity(self.expand_derivation(ctx, &witness)?);
            } else {
                out = out.with_invalidity(witness);
            }
        }
        Ok(out)
    }
}

impl ChainBackTranslator {
    /// Synthesizes interpretations for the removed interior nodes as the
    /// symbolic strongest postcondition along each stored chain prefix.
    fn fill_interior_interpretations(
        &self,
        ctx: &mut TermContext,
        witness: ValidityWitness,
    ) -> Result<ValidityWitness, ChcError> {
        let mut interps: BTreeMap<SymRef, TermRef> = witness.iter().collect();
        for record in self.records.iter().rev() {
            for index in 0..record.parts.len().saturating_sub(1) {
                let part = &record.parts[index];
                let source_interp = if part.source_sym == SymbolTable::TRUE {
                    ctx.tru()
                } else {
                    *interps.get(&part.source_sym).ok_or_else(|| {
                        missing_interpretation(part.source_sym)
                    })?
                };
                let conj = ctx.and2(source_interp, part.constraint);
                let primed = self.manager.primed_vars(ctx, part.target_sym);
                let keep: BTreeSet<TermRef> = primed.iter().copied().collect();
                let post = project(ctx, conj, &keep)?;
                let base = self.manager.base_vars(ctx, part.target_sym);
                let renaming = primed.into_iter().zip(base).collect();
                let interpretation = ctx.substitute(post, &renaming);
                interps.insert(part.target_sym, interpretation);
            }
        }
        let mut out = ValidityWitness::new();
        for (sym, interpretation) in interps {
            out.set(sym, interpretation);
        }
        Ok(out)
    }

    /// Re-expands every derivation step over a summary edge into the stored
    /// member edge sequence, partitioning the assignment accordingly.
    fn expand_derivation(
        &self,
        ctx: &mut TermContext,
        witness: &chc_graph::InvalidityWitness,
    ) -> Result<chc_graph::InvalidityWitness, ChcError> {
        let mut steps = witness_to_wid_steps(witness, &self.final_to_wid)?;
        for record in self.records.iter().rev() {
            steps = self.expand_record(ctx, steps, record)?;
        }
        wid_steps_to_witness(steps, &self.wid_to_original)
    }

    fn expand_record(
        &self,
        ctx: &mut TermContext,
        steps: Vec<WidStep>,
        record: &ChainRecord,
    ) -> Result<Vec<WidStep>, ChcError> {
        let mut out: Vec<WidStep> = Vec::new();
        let mut index_map: BTreeMap<usize, usize> = BTreeMap::new();
        for (old_index, step) in steps.into_iter().enumerate() {
            if step.wid != record.summary_wid {
                let premises = remap_premises(&step.premises, &index_map)?;
                out.push(WidStep { premises, ..step });
                index_map.insert(old_index, out.len() - 1);
                continue;
            }
            let mut assignment =
                complete_assignment(ctx, record.summary_constraint, step.assignment)?;
            // Positions unconstrained by the summary get one shared default
            // value, keeping adjacent member states consistent.
            for part in &record.parts {
                for v in part
                    .source_vector
                    .iter()
                    .chain(part.target_vector.iter())
                    .copied()
                    .collect::<Vec<_>>()
                {
                    if !assignment.contains_key(&v) {
                        let default = default_constant(ctx, v);
                        assignment.insert(v, default);
                    }
                }
            }
            let mut prev_index: Option<usize> = None;
            for (i, part) in record.parts.iter().enumerate() {
                let mut part_assignment: BTreeMap<TermRef, TermRef> = BTreeMap::new();
                if part.source_sym != SymbolTable::TRUE {
                    let base = self.manager.base_vars(ctx, part.source_sym);
                    for (b, s) in base.iter().zip(part.source_vector.iter()) {
                        if let Some(&value) = assignment.get(s) {
                            part_assignment.insert(*b, value);
                        }
                    }
                }
                if part.target_sym != SymbolTable::FALSE {
                    let primed = self.manager.primed_vars(ctx, part.target_sym);
                    for (p, t) in primed.iter().zip(part.target_vector.iter()) {
                        if let Some(&value) = assignment.get(t) {
                            part_assignment.insert(*p, value);
                        }
                    }
                }
                for (&orig, &fresh) in &part.aux_renaming {
                    if let Some(&value) = assignment.get(&fresh) {
                        part_assignment.insert(orig, value);
                    }
                }
                let part_assignment =
                    complete_assignment(ctx, part.constraint, part_assignment)?;
                let premises = if i == 0 {
                    remap_premises(&step.premises, &index_map)?
                } else {
                    vec![prev_index.ok_or_else(|| broken_expansion())?]
                };
                out.push(WidStep {
                    wid: part.wid,
                    premises,
                    assignment: part_assignment,
                });
                prev_index = Some(out.len() - 1);
            }
            index_map.insert(old_index, out.len() - 1);
        }
        Ok(out)
    }
}

fn remap_premises(
    premises: &[usize],
    index_map: &BTreeMap<usize, usize>,
) -> Result<Vec<usize>, ChcError> {
    premises
        .iter()
        .map(|p| {
            index_map.get(p).copied().ok_or_else(|| {
                ChcError::Witness(ErrorInfo::new(
                    "premise-order",
                    "derivation premises are not in arena order",
                ))
            })
        })
        .collect()
}

fn default_constant(ctx: &mut TermContext, var: TermRef) -> TermRef {
    match ctx.sort_of(var) {
        chc_logic::Sort::Int => ctx.int_const(0),
        chc_logic::Sort::Bool => ctx.fls(),
    }
}

fn missing_interpretation(sym: SymRef) -> ChcError {
    ChcError::Witness(
        ErrorInfo::new(
            "missing-interpretation",
            "witness lacks an interpretation required for chain expansion",
        )
        .with_context("symbol", sym.as_raw().to_string()),
    )
}

fn broken_expansion() -> ChcError {
    ChcError::Witness(ErrorInfo::new(
        "broken-expansion",
        "chain expansion lost track of the previous member step",
    ))
}
