//! Merges parallel edge bundles into disjunctive edges.

use std::collections::{BTreeMap, BTreeSet};

use chc_core::{ChcError, EdgeId, ErrorInfo, VerificationAnswer};
use chc_graph::{HyperGraph, InvalidityWitness, SymbolTable, VerificationResult};
use chc_logic::{TermContext, TermRef};

use crate::framework::{BackTranslator, Transformation};
use crate::rebuild::{complete_assignment, WorkGraph};

/// Replaces every bundle of edges sharing a source list and target by one
/// edge whose constraint is the disjunction of theirs.
///
/// Each disjunct is existentially closed over its auxiliary variables by
/// renaming them apart, so auxiliaries of different bundle members cannot
/// collide. Strictly decreases the edge count when a bundle exists and is
/// the identity otherwise.
#[derive(Debug, Default)]
pub struct MultiEdgeMerger;

impl MultiEdgeMerger {
    /// Creates the transformation.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone)]
struct Disjunct {
    wid: u64,
    renamed_constraint: TermRef,
    /// Original auxiliary variable to its renamed stand-in.
    aux_renaming: BTreeMap<TermRef, TermRef>,
}

#[derive(Debug, Clone)]
struct MergedBundle {
    merged_wid: u64,
    merged_constraint: TermRef,
    disjuncts: Vec<Disjunct>,
}

struct MergerBackTranslator {
    bundles: Vec<MergedBundle>,
    final_to_wid: BTreeMap<u64, u64>,
    wid_to_original: BTreeMap<u64, EdgeId>,
}

impl Transformation for MultiEdgeMerger {
    fn name(&self) -> &'static str {
        "multi-edge-merger"
    }

    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        let wid_to_original: BTreeMap<u64, EdgeId> =
            graph.edges().iter().map(|e| (e.id.as_raw(), e.id)).collect();
        let mut work = WorkGraph::from_graph(graph);

        // Group parallel edges by endpoint signature, keeping edge order.
        let mut groups: BTreeMap<(Vec<u64>, u64), Vec<u64>> = BTreeMap::new();
        for edge in &work.edges {
            let key = (
                edge.sources.iter().map(|n| n.as_raw()).collect(),
                edge.target.as_raw(),
            );
            groups.entry(key).or_default().push(edge.wid);
        }
        let mut bundles = Vec::new();
        let mut replaced: BTreeMap<u64, u64> = BTreeMap::new();
        let mut dropped: BTreeSet<u64> = BTreeSet::new();
        for wids in groups.values() {
            if wids.len() < 2 {
                continue;
            }
            let lead = wids[0];
            let lead_edge = work
                .edge(lead)
                .cloned()
                .ok_or_else(|| missing_edge(lead))?;
            // Canonical vectors of this endpoint signature; everything else
            // in a member constraint is auxiliary.
            let mut canonical: BTreeSet<TermRef> = BTreeSet::new();
            for position in 0..lead_edge.sources.len() {
                let sym = work
                    .node_symbol(lead_edge.sources[position])
                    .ok_or_else(|| missing_edge(lead))?;
                if sym == SymbolTable::TRUE {
                    continue;
                }
                canonical.extend(work.manager.vars(
                    ctx,
                    sym,
                    chc_graph::Version::Instance(lead_edge.occurrence_at(position)),
                ));
            }
            let target_sym = work
                .node_symbol(lead_edge.target)
                .ok_or_else(|| missing_edge(lead))?;
            if target_sym != SymbolTable::FALSE {
                canonical.extend(work.manager.primed_vars(ctx, target_sym));
            }
            let mut disjuncts = Vec::new();
            let mut renamed_constraints = Vec::new();
            for &wid in wids {
                let member = work.edge(wid).cloned().ok_or_else(|| missing_edge(wid))?;
                let mut aux_renaming = BTreeMap::new();
                for v in ctx.free_vars(member.constraint) {
                    if canonical.contains(&v) {
                        continue;
                    }
                    let sort = ctx.sort_of(v);
                    let fresh = work.manager.fresh_aux(ctx, sort, "aux");
                    aux_renaming.insert(v, fresh);
                }
                let renamed = ctx.substitute(member.constraint, &aux_renaming);
                renamed_constraints.push(renamed);
                disjuncts.push(Disjunct {
                    wid,
                    renamed_constraint: renamed,
                    aux_renaming,
                });
            }
            let merged_constraint = ctx.or(renamed_constraints);
            let merged_wid = work.fresh_wid();
            replaced.insert(lead, merged_wid);
            for &wid in &wids[1..] {
                dropped.insert(wid);
            }
            bundles.push(MergedBundle {
                merged_wid,
                merged_constraint,
                disjuncts,
            });
        }

        // Rewrite the edge list in place: the lead position carries the
        // merged edge, the other members disappear.
        let mut edges = Vec::new();
        for mut edge in std::mem::take(&mut work.edges) {
            if dropped.contains(&edge.wid) {
                continue;
            }
            if let Some(&merged_wid) = replaced.get(&edge.wid) {
                let bundle = bundles
                    .iter()
                    .find(|b| b.merged_wid == merged_wid)
                    .ok_or_else(|| missing_edge(merged_wid))?;
                edge.wid = merged_wid;
                edge.constraint = bundle.merged_constraint;
            }
            edges.push(edge);
        }
        work.edges = edges;

        let (rebuilt, wid_map) = work.finalize()?;
        let final_to_wid = wid_map.iter().map(|(&wid, id)| (id.as_raw(), wid)).collect();
        Ok((
            rebuilt,
            Box::new(MergerBackTranslator {
                bundles,
                final_to_wid,
                wid_to_original,
            }),
        ))
    }
}

fn missing_edge(wid: u64) -> ChcError {
    ChcError::Graph(
        ErrorInfo::new("unknown-edge", "working edge disappeared during merging")
            .with_context("wid", wid.to_string()),
    )
}

impl BackTranslator for MergerBackTranslator {
    fn translate(
        &self,
        ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError> {
        let (answer, validity, invalidity) = result.into_parts();
        let mut out = VerificationResult::new(answer);
        // Interpretations are untouched by merging.
        if let Some(witness) = validity {
            out = out.with_validity(witness);
        }
        if let Some(witness) = invalidity {
            if answer == VerificationAnswer::Unsafe {
                out = out.with_invalidity(self.disambiguate(ctx, witness)?);
            }
        }
        Ok(out)
    }
}

impl MergerBackTranslator {
    /// Rewrites each derivation step over a merged edge to the bundle
    /// member whose constraint the recorded assignment satisfies.
    ///
    /// The identity lift is not sound here: the merged edge does not exist
    /// on the original graph, and only one disjunct actually fired.
    fn disambiguate(
        &self,
        ctx: &mut TermContext,
        witness: InvalidityWitness,
    ) -> Result<InvalidityWitness, ChcError> {
        let mut steps = Vec::new();
        for step in witness.steps() {
            let wid = self
                .final_to_wid
                .get(&step.edge.as_raw())
                .copied()
                .ok_or_else(|| foreign_step(step.edge))?;
            let Some(bundle) = self.bundles.iter().find(|b| b.merged_wid == wid) else {
                let original = self
                    .wid_to_original
                    .get(&wid)
                    .copied()
                    .ok_or_else(|| foreign_step(step.edge))?;
                let mut rewritten = step.clone();
                rewritten.edge = original;
                steps.push(rewritten);
                continue;
            };
            let assignment = complete_assignment(
                ctx,
                bundle.merged_constraint,
                step.assignment.clone(),
            )?;
            let mut picked = None;
            for disjunct in &bundle.disjuncts {
                let grounded = ctx.substitute(disjunct.renamed_constraint, &assignment);
                if ctx.is_true(grounded) {
                    picked = Some(disjunct);
                    break;
                }
            }
            let Some(disjunct) = picked else {
                return Err(ChcError::Witness(ErrorInfo::new(
                    "no-disjunct",
                    "assignment satisfies no member of the merged edge",
                )));
            };
            let fresh_of_bundle: BTreeSet<TermRef> = bundle
                .disjuncts
                .iter()
                .flat_map(|d| d.aux_renaming.values().copied())
                .collect();
            let mut rewritten_assignment: std::collections::BTreeMap<_, _> = assignment
                .iter()
                .filter(|(v, _)| !fresh_of_bundle.contains(v))
                .map(|(&v, &c)| (v, c))
                .collect();
            for (&orig, &fresh) in &disjunct.aux_renaming {
                if let Some(&value) = assignment.get(&fresh) {
                    rewritten_assignment.insert(orig, value);
                }
            }
            let original = self
                .wid_to_original
                .get(&disjunct.wid)
                .copied()
                .ok_or_else(|| foreign_step(step.edge))?;
            let mut rewritten = step.clone();
            rewritten.edge = original;
            rewritten.assignment = rewritten_assignment;
            steps.push(rewritten);
        }
        Ok(InvalidityWitness::from_steps(steps))
    }
}

fn foreign_step(edge: EdgeId) -> ChcError {
    ChcError::Witness(
        ErrorInfo::new("foreign-edge", "derivation step uses an edge unknown to this graph")
            .with_context("edge", edge.as_raw().to_string()),
    )
}
