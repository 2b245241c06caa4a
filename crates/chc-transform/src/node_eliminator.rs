//! Eliminates acyclic nodes by composing their incoming and outgoing edges.

use std::collections::{BTreeMap, BTreeSet};

use chc_core::{ChcError, EdgeId, ErrorInfo, NodeId, VerificationAnswer};
use chc_graph::{
    HyperGraph, SymRef, SymbolTable, ValidityWitness, Version, VerificationResult, VersionManager,
};
use chc_logic::{project, TermContext, TermRef};

use crate::framework::{BackTranslator, Transformation};
use crate::rebuild::{
    complete_assignment, wid_steps_to_witness, witness_to_wid_steps, WidStep, WorkEdge, WorkGraph,
};

/// Eliminates nodes lying on no cycle whose incoming and outgoing edges are
/// all single-source, pairing each incoming edge with each outgoing edge.
#[derive(Debug, Default)]
pub struct NonLoopEliminator;

impl NonLoopEliminator {
    /// Creates the transformation.
    pub fn new() -> Self {
        Self
    }
}

/// Generalizes [`NonLoopEliminator`] to nodes occurring among the sources
/// of outgoing hyperedges: each occurrence is spliced with the sources of a
/// chosen incoming edge, preserving source-list multiplicity and order.
#[derive(Debug, Default)]
pub struct SimpleNodeEliminator;

impl SimpleNodeEliminator {
    /// Creates the transformation.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    NonLoop,
    Simple,
}

impl Transformation for NonLoopEliminator {
    fn name(&self) -> &'static str {
        "non-loop-eliminator"
    }

    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        eliminate(ctx, graph, Mode::NonLoop)
    }
}

impl Transformation for SimpleNodeEliminator {
    fn name(&self) -> &'static str {
        "simple-node-eliminator"
    }

    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        eliminate(ctx, graph, Mode::Simple)
    }
}

#[derive(Debug, Clone)]
struct IncomingInfo {
    wid: u64,
    source_sym: SymRef,
    constraint: TermRef,
}

#[derive(Debug, Clone)]
struct ReplacedOccurrence {
    position: usize,
    in_wid: u64,
    in_source_sym: SymRef,
    in_constraint: TermRef,
    in_aux_renaming: BTreeMap<TermRef, TermRef>,
    /// Final convention vector of the spliced source in the new edge.
    spliced_vector: Vec<TermRef>,
    /// Fresh vector standing for the eliminated node's state here.
    node_vector: Vec<TermRef>,
    /// Vector the out-edge constraint used for this occurrence.
    out_vector: Vec<TermRef>,
}

#[derive(Debug, Clone)]
struct KeptPosition {
    position: usize,
    sym: SymRef,
    old_vector: Vec<TermRef>,
    new_vector: Vec<TermRef>,
}

#[derive(Debug, Clone)]
struct ProducedEdge {
    wid: u64,
    out_wid: u64,
    out_constraint: TermRef,
    out_aux_renaming: BTreeMap<TermRef, TermRef>,
    target_sym: SymRef,
    replaced: Vec<ReplacedOccurrence>,
    kept: Vec<KeptPosition>,
    produced_constraint: TermRef,
}

#[derive(Debug, Clone)]
struct EliminationRecord {
    node_sym: SymRef,
    incoming: Vec<IncomingInfo>,
    produced: Vec<ProducedEdge>,
}

struct EliminatorBackTranslator {
    records: Vec<EliminationRecord>,
    final_to_wid: BTreeMap<u64, u64>,
    wid_to_original: BTreeMap<u64, EdgeId>,
    manager: VersionManager,
}

fn eliminate(
    ctx: &mut TermContext,
    graph: HyperGraph,
    mode: Mode,
) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
    let wid_to_original: BTreeMap<u64, EdgeId> =
        graph.edges().iter().map(|e| (e.id.as_raw(), e.id)).collect();
    let mut work = WorkGraph::from_graph(graph);
    let mut records = Vec::new();
    while let Some(node) = pick_eligible(&work, mode) {
        let record = eliminate_node(ctx, &mut work, node)?;
        records.push(record);
    }
    let manager = work.manager.clone();
    let (rebuilt, wid_map) = work.finalize()?;
    let final_to_wid = wid_map.iter().map(|(&wid, id)| (id.as_raw(), wid)).collect();
    Ok((
        rebuilt,
        Box::new(EliminatorBackTranslator {
            records,
            final_to_wid,
            wid_to_original,
            manager,
        }),
    ))
}

fn on_cycle(work: &WorkGraph, start: NodeId) -> bool {
    let mut stack = Vec::new();
    let mut seen = BTreeSet::new();
    for edge in &work.edges {
        if edge.sources.contains(&start) && seen.insert(edge.target) {
            stack.push(edge.target);
        }
    }
    while let Some(node) = stack.pop() {
        if node == start {
            return true;
        }
        for edge in &work.edges {
            if edge.sources.contains(&node) && seen.insert(edge.target) {
                stack.push(edge.target);
            }
        }
    }
    false
}

fn pick_eligible(work: &WorkGraph, mode: Mode) -> Option<NodeId> {
    work.nodes.iter().map(|(node, _)| *node).find(|&node| {
        if on_cycle(work, node) {
            return false;
        }
        let incoming_ok = work
            .edges
            .iter()
            .filter(|e| e.target == node)
            .all(|e| e.sources.len() == 1);
        if !incoming_ok {
            return false;
        }
        match mode {
            Mode::Simple => true,
            Mode::NonLoop => work
                .edges
                .iter()
                .filter(|e| e.sources.contains(&node))
                .all(|e| e.sources.len() == 1),
        }
    })
}

/// Index tuples over `options` choices for `slots` slots.
fn choice_tuples(options: usize, slots: usize) -> Vec<Vec<usize>> {
    let mut tuples: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..slots {
        let mut next = Vec::new();
        for prefix in &tuples {
            for option in 0..options {
                let mut tuple = prefix.clone();
                tuple.push(option);
                next.push(tuple);
            }
        }
        tuples = next;
    }
    tuples
}

fn eliminate_node(
    ctx: &mut TermContext,
    work: &mut WorkGraph,
    node: NodeId,
) -> Result<EliminationRecord, ChcError> {
    let node_sym = work
        .node_symbol(node)
        .ok_or_else(|| dangling(node))?;
    let in_edges: Vec<WorkEdge> = work
        .edges
        .iter()
        .filter(|e| e.target == node)
        .cloned()
        .collect();
    let out_edges: Vec<WorkEdge> = work
        .edges
        .iter()
        .filter(|e| e.sources.contains(&node))
        .cloned()
        .collect();
    let incoming: Vec<IncomingInfo> = in_edges
        .iter()
        .map(|e| {
            Ok(IncomingInfo {
                wid: e.wid,
                source_sym: work.node_symbol(e.sources[0]).ok_or_else(|| dangling(e.sources[0]))?,
                constraint: e.constraint,
            })
        })
        .collect::<Result<_, ChcError>>()?;

    let mut produced = Vec::new();
    let mut new_edges = Vec::new();
    for out in &out_edges {
        let occ_positions: Vec<usize> = (0..out.sources.len())
            .filter(|&p| out.sources[p] == node)
            .collect();
        for choice in choice_tuples(in_edges.len(), occ_positions.len()) {
            let mut new_sources = out.sources.clone();
            for (slot, &position) in occ_positions.iter().enumerate() {
                new_sources[position] = in_edges[choice[slot]].sources[0];
            }
            let final_occurrence = |position: usize| -> u32 {
                new_sources[..position]
                    .iter()
                    .filter(|&&n| n == new_sources[position])
                    .count() as u32
            };

            let mut conjuncts = Vec::new();
            let mut replaced = Vec::new();
            let mut kept = Vec::new();
            let mut out_renaming: BTreeMap<TermRef, TermRef> = BTreeMap::new();
            let mut node_vectors: BTreeMap<usize, Vec<TermRef>> = BTreeMap::new();
            let mut out_protected: BTreeSet<TermRef> = BTreeSet::new();
            for position in 0..out.sources.len() {
                let occurrence = out.occurrence_at(position);
                if occ_positions.contains(&position) {
                    let old_vector =
                        work.manager
                            .vars(ctx, node_sym, Version::Instance(occurrence));
                    let node_vector = work.manager.fresh_vars(ctx, node_sym);
                    for (o, f) in old_vector.iter().zip(node_vector.iter()) {
                        out_renaming.insert(*o, *f);
                    }
                    out_protected.extend(old_vector.iter().copied());
                    node_vectors.insert(position, node_vector);
                } else {
                    let sym = work
                        .node_symbol(out.sources[position])
                        .ok_or_else(|| dangling(out.sources[position]))?;
                    if sym == SymbolTable::TRUE {
                        continue;
                    }
                    let old_vector = work.manager.vars(ctx, sym, Version::Instance(occurrence));
                    let new_vector = work.manager.vars(
                        ctx,
                        sym,
                        Version::Instance(final_occurrence(position)),
                    );
                    if old_vector != new_vector {
                        for (o, n) in old_vector.iter().zip(new_vector.iter()) {
                            out_renaming.insert(*o, *n);
                        }
                    }
                    out_protected.extend(old_vector.iter().copied());
                    kept.push(KeptPosition {
                        position,
                        sym,
                        old_vector,
                        new_vector,
                    });
                }
            }
            let target_sym = work
                .node_symbol(out.target)
                .ok_or_else(|| dangling(out.target))?;
            if target_sym != SymbolTable::FALSE {
                out_protected.extend(work.manager.primed_vars(ctx, target_sym));
            }
            let mut out_aux_renaming = BTreeMap::new();
            for v in ctx.free_vars(out.constraint) {
                if out_protected.contains(&v) {
                    continue;
                }
                let sort = ctx.sort_of(v);
                let fresh = work.manager.fresh_aux(ctx, sort, "aux");
                out_aux_renaming.insert(v, fresh);
                out_renaming.insert(v, fresh);
            }
            conjuncts.push(ctx.substitute(out.constraint, &out_renaming));

            for (slot, &position) in occ_positions.iter().enumerate() {
                let e_in = &in_edges[choice[slot]];
                let in_source_sym = work
                    .node_symbol(e_in.sources[0])
                    .ok_or_else(|| dangling(e_in.sources[0]))?;
                let mut renaming: BTreeMap<TermRef, TermRef> = BTreeMap::new();
                let mut protected: BTreeSet<TermRef> = BTreeSet::new();
                let spliced_vector = if in_source_sym == SymbolTable::TRUE {
                    Vec::new()
                } else {
                    let base = work.manager.base_vars(ctx, in_source_sym);
                    let new_vector = work.manager.vars(
                        ctx,
                        in_source_sym,
                        Version::Instance(final_occurrence(position)),
                    );
                    if base != new_vector {
                        for (b, n) in base.iter().zip(new_vector.iter()) {
                            renaming.insert(*b, *n);
                        }
                    }
                    protected.extend(base.iter().copied());
                    new_vector
                };
                let primed = work.manager.primed_vars(ctx, node_sym);
                let node_vector = node_vectors
                    .get(&position)
                    .cloned()
                    .ok_or_else(|| broken_composition())?;
                for (p, f) in primed.iter().zip(node_vector.iter()) {
                    renaming.insert(*p, *f);
                }
                protected.extend(primed.iter().copied());
                let mut in_aux_renaming = BTreeMap::new();
                for v in ctx.free_vars(e_in.constraint) {
                    if protected.contains(&v) {
                        continue;
                    }
                    let sort = ctx.sort_of(v);
                    let fresh = work.manager.fresh_aux(ctx, sort, "aux");
                    in_aux_renaming.insert(v, fresh);
                    renaming.insert(v, fresh);
                }
                conjuncts.push(ctx.substitute(e_in.constraint, &renaming));
                replaced.push(ReplacedOccurrence {
                    position,
                    in_wid: e_in.wid,
                    in_source_sym,
                    in_constraint: e_in.constraint,
                    in_aux_renaming,
                    spliced_vector,
                    node_vector,
                    out_vector: work
                        .manager
                        .vars(ctx, node_sym, Version::Instance(out.occurrence_at(position))),
                });
            }

            let produced_constraint = ctx.and(conjuncts);
            let wid = work.fresh_wid();
            // The entry node carries no state, so repeated entry sources
            // collapse to one.
            let mut edge_sources = Vec::new();
            for &source in &new_sources {
                if source == work.entry && edge_sources.contains(&work.entry) {
                    continue;
                }
                edge_sources.push(source);
            }
            new_edges.push(WorkEdge {
                wid,
                sources: edge_sources,
                target: out.target,
                constraint: produced_constraint,
            });
            produced.push(ProducedEdge {
                wid,
                out_wid: out.wid,
                out_constraint: out.constraint,
                out_aux_renaming,
                target_sym,
                replaced,
                kept,
                produced_constraint,
            });
        }
    }

    let removed: Vec<u64> = in_edges
        .iter()
        .map(|e| e.wid)
        .chain(out_edges.iter().map(|e| e.wid))
        .collect();
    work.remove_edges(&removed);
    work.remove_node(node);
    work.edges.extend(new_edges);
    Ok(EliminationRecord {
        node_sym,
        incoming,
        produced,
    })
}

impl BackTranslator for EliminatorBackTranslator {
    fn translate(
        &self,
        ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError> {
        let (answer, validity, invalidity) = result.into_parts();
        let mut out = VerificationResult::new(answer);
        if let Some(witness) = validity {
            if answer == VerificationAnswer::Safe {
                out = out.with_validity(self.fill_eliminated_interpretations(ctx, witness)?);
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

impl EliminatorBackTranslator {
    /// Interpretation of an eliminated node: the strongest postcondition
    /// over its removed incoming edges, as a disjunction.
    fn fill_eliminated_interpretations(
        &self,
        ctx: &mut TermContext,
        witness: ValidityWitness,
    ) -> Result<ValidityWitness, ChcError> {
        let mut interps: BTreeMap<SymRef, TermRef> = witness.iter().collect();
        for record in self.records.iter().rev() {
            let primed = self.manager.primed_vars(ctx, record.node_sym);
            let keep: BTreeSet<TermRef> = primed.iter().copied().collect();
            let base = self.manager.base_vars(ctx, record.node_sym);
            let mut disjuncts = Vec::new();
            for edge in &record.incoming {
                let source_interp = if edge.source_sym == SymbolTable::TRUE {
                    ctx.tru()
                } else {
                    *interps
                        .get(&edge.source_sym)
                        .ok_or_else(|| missing_interpretation(edge.source_sym))?
                };
                let conj = ctx.and2(source_interp, edge.constraint);
                let post = project(ctx, conj, &keep)?;
                let renaming = primed.iter().copied().zip(base.iter().copied()).collect();
                disjuncts.push(ctx.substitute(post, &renaming));
            }
            let interpretation = ctx.or(disjuncts);
            interps.insert(record.node_sym, interpretation);
        }
        let mut out = ValidityWitness::new();
        for (sym, interpretation) in interps {
            out.set(sym, interpretation);
        }
        Ok(out)
    }

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
        record: &EliminationRecord,
    ) -> Result<Vec<WidStep>, ChcError> {
        let mut out: Vec<WidStep> = Vec::new();
        let mut index_map: BTreeMap<usize, usize> = BTreeMap::new();
        for (old_index, step) in steps.into_iter().enumerate() {
            let Some(produced) = record.produced.iter().find(|p| p.wid == step.wid) else {
                let premises = remap_premises(&step.premises, &index_map)?;
                out.push(WidStep { premises, ..step });
                index_map.insert(old_index, out.len() - 1);
                continue;
            };
            let mut assignment =
                complete_assignment(ctx, produced.produced_constraint, step.assignment)?;
            let mut vectors: Vec<TermRef> = Vec::new();
            for occurrence in &produced.replaced {
                vectors.extend(occurrence.spliced_vector.iter().copied());
                vectors.extend(occurrence.node_vector.iter().copied());
            }
            for keep in &produced.kept {
                vectors.extend(keep.new_vector.iter().copied());
            }
            if produced.target_sym != SymbolTable::FALSE {
                vectors.extend(self.manager.primed_vars(ctx, produced.target_sym));
            }
            for v in vectors {
                if !assignment.contains_key(&v) {
                    let default = default_constant(ctx, v);
                    assignment.insert(v, default);
                }
            }
            // Premise of the produced step per source position.
            let premises = remap_premises(&step.premises, &index_map)?;
            let mut premise_by_position: BTreeMap<usize, usize> = BTreeMap::new();
            {
                let mut next = premises.iter();
                let mut positions: Vec<(usize, SymRef)> = Vec::new();
                for occurrence in &produced.replaced {
                    positions.push((occurrence.position, occurrence.in_source_sym));
                }
                for keep in &produced.kept {
                    positions.push((keep.position, keep.sym));
                }
                positions.sort_by_key(|(p, _)| *p);
                for (position, sym) in positions {
                    if sym == SymbolTable::TRUE {
                        continue;
                    }
                    let premise = next.next().ok_or_else(|| broken_composition())?;
                    premise_by_position.insert(position, *premise);
                }
            }

            // One step per spliced incoming edge, in position order.
            let mut in_step_by_position: BTreeMap<usize, usize> = BTreeMap::new();
            let node_primed = self.manager.primed_vars(ctx, record.node_sym);
            for occurrence in &produced.replaced {
                let mut part_assignment: BTreeMap<TermRef, TermRef> = BTreeMap::new();
                if occurrence.in_source_sym != SymbolTable::TRUE {
                    let base = self.manager.base_vars(ctx, occurrence.in_source_sym);
                    for (b, s) in base.iter().zip(occurrence.spliced_vector.iter()) {
                        if let Some(&value) = assignment.get(s) {
                            part_assignment.insert(*b, value);
                        }
                    }
                }
                for (p, f) in node_primed.iter().zip(occurrence.node_vector.iter()) {
                    if let Some(&value) = assignment.get(f) {
                        part_assignment.insert(*p, value);
                    }
                }
                for (&orig, &fresh) in &occurrence.in_aux_renaming {
                    if let Some(&value) = assignment.get(&fresh) {
                        part_assignment.insert(orig, value);
                    }
                }
                let part_assignment =
                    complete_assignment(ctx, occurrence.in_constraint, part_assignment)?;
                let part_premises = if occurrence.in_source_sym == SymbolTable::TRUE {
                    Vec::new()
                } else {
                    vec![premise_by_position
                        .get(&occurrence.position)
                        .copied()
                        .ok_or_else(|| broken_composition())?]
                };
                out.push(WidStep {
                    wid: occurrence.in_wid,
                    premises: part_premises,
                    assignment: part_assignment,
                });
                in_step_by_position.insert(occurrence.position, out.len() - 1);
            }

            // The original outgoing edge, premised on the new steps.
            let mut out_assignment: BTreeMap<TermRef, TermRef> = BTreeMap::new();
            for occurrence in &produced.replaced {
                for (o, f) in occurrence
                    .out_vector
                    .iter()
                    .zip(occurrence.node_vector.iter())
                {
                    if let Some(&value) = assignment.get(f) {
                        out_assignment.insert(*o, value);
                    }
                }
            }
            for keep in &produced.kept {
                for (o, n) in keep.old_vector.iter().zip(keep.new_vector.iter()) {
                    if let Some(&value) = assignment.get(n) {
                        out_assignment.insert(*o, value);
                    }
                }
            }
            if produced.target_sym != SymbolTable::FALSE {
                for v in self.manager.primed_vars(ctx, produced.target_sym) {
                    if let Some(&value) = assignment.get(&v) {
                        out_assignment.insert(v, value);
                    }
                }
            }
            for (&orig, &fresh) in &produced.out_aux_renaming {
                if let Some(&value) = assignment.get(&fresh) {
                    out_assignment.insert(orig, value);
                }
            }
            let out_assignment =
                complete_assignment(ctx, produced.out_constraint, out_assignment)?;
            let mut out_premises = Vec::new();
            {
                let mut positions: Vec<(usize, SymRef, bool)> = Vec::new();
                for occurrence in &produced.replaced {
                    positions.push((occurrence.position, record.node_sym, true));
                }
                for keep in &produced.kept {
                    positions.push((keep.position, keep.sym, false));
                }
                positions.sort_by_key(|(p, _, _)| *p);
                for (position, sym, is_replaced) in positions {
                    if is_replaced {
                        out_premises.push(
                            in_step_by_position
                                .get(&position)
                                .copied()
                                .ok_or_else(|| broken_composition())?,
                        );
                    } else if sym != SymbolTable::TRUE {
                        out_premises.push(
                            premise_by_position
                                .get(&position)
                                .copied()
                                .ok_or_else(|| broken_composition())?,
                        );
                    }
                }
            }
            out.push(WidStep {
                wid: produced.out_wid,
                premises: out_premises,
                assignment: out_assignment,
            });
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

fn dangling(node: NodeId) -> ChcError {
    ChcError::Graph(
        ErrorInfo::new("dangling-edge", "elimination referenced a removed node")
            .with_context("node", node.as_raw().to_string()),
    )
}

fn broken_composition() -> ChcError {
    ChcError::Witness(ErrorInfo::new(
        "broken-composition",
        "composed edge bookkeeping is inconsistent",
    ))
}

fn missing_interpretation(sym: SymRef) -> ChcError {
    ChcError::Witness(
        ErrorInfo::new(
            "missing-interpretation",
            "witness lacks an interpretation required for node elimination",
        )
        .with_context("symbol", sym.as_raw().to_string()),
    )
}
