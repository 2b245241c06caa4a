//! Transition-power-abstraction engine.
//!
//! For every self-looping chain node the engine maintains power relations
//! `Tr^(k)` covering up to `2^k` loop iterations, built by composing the
//! previous level with itself under fresh intermediate versions. The
//! under-approximate side drives counterexample search (confirmed by a
//! bounded concrete re-unrolling before UNSAFE is reported); the
//! over-approximate side synthesizes per-node inductive invariants by
//! interpolating between the reachable states and the must-avoid states.

use std::collections::{BTreeMap, BTreeSet};

use chc_core::{CancellationToken, ChcError, ErrorInfo, Options, VerificationAnswer};
use chc_graph::{
    DerivationStep, InvalidityWitness, NormalGraph, ValidityWitness, VerificationResult,
};
use chc_logic::{
    get_model, interpolate, interval_hull, is_sat, project, Sort, TermContext, TermRef,
};

use crate::chain::{analyze, ChainStructure};
use crate::engine::{engine_is_supported, Engine};
use crate::values::{ground_assignment, value_term};

const MAX_LEVEL: usize = 10;
const MAX_BMC_TOTAL: usize = 24;
const MAX_BMC_ATTEMPTS: usize = 600;

/// The TPA engine, configured by the `engine` option (`tpa` or `tpa-split`).
///
/// In `tpa-split` mode the under-approximation runs one power level ahead
/// of the over-approximation, detecting counterexamples earlier.
pub struct TpaEngine {
    options: Options,
    token: CancellationToken,
    split: bool,
}

impl TpaEngine {
    /// Creates the engine after validating the configuration.
    pub fn new(options: Options) -> Result<Self, ChcError> {
        if options.logic() != "QF_LIA" {
            return Err(ChcError::Logic(
                ErrorInfo::new("unsupported-logic", "this build only supports QF_LIA")
                    .with_context("logic", options.logic()),
            ));
        }
        let engine = options.engine();
        if !engine_is_supported(engine) {
            return Err(ChcError::Logic(
                ErrorInfo::new("unsupported-engine", "engine not available in this build")
                    .with_context("engine", engine),
            ));
        }
        let split = engine == "tpa-split";
        Ok(Self {
            options,
            token: CancellationToken::new(),
            split,
        })
    }

    /// Installs a caller-provided cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    fn check_cancelled(&self) -> Result<(), ChcError> {
        if self.token.is_cancelled() {
            return Err(ChcError::cancelled("tpa"));
        }
        Ok(())
    }
}

impl Engine for TpaEngine {
    fn name(&self) -> &'static str {
        "tpa"
    }

    /// Cancellation and solver failures surface as UNKNOWN with witnesses
    /// unset; structural errors propagate.
    fn solve(
        &self,
        ctx: &mut TermContext,
        graph: &NormalGraph,
    ) -> Result<VerificationResult, ChcError> {
        match self.solve_inner(ctx, graph) {
            Ok(result) => Ok(result),
            Err(ChcError::Cancelled(_)) | Err(ChcError::Solver(_)) => {
                Ok(VerificationResult::new(VerificationAnswer::Unknown))
            }
            Err(other) => Err(other),
        }
    }
}

impl TpaEngine {
    fn solve_inner(
        &self,
        ctx: &mut TermContext,
        graph: &NormalGraph,
    ) -> Result<VerificationResult, ChcError> {
        let structure = analyze(graph)?;
        let compute = self.options.compute_witness();

        for (id, constraint) in &structure.entry_exit_edges {
            self.check_cancelled()?;
            if let Some(model) = get_model(ctx, *constraint)? {
                let mut result = VerificationResult::new(VerificationAnswer::Unsafe);
                if compute {
                    let mut assignment = BTreeMap::new();
                    for (var, value) in model {
                        let constant = value_term(ctx, value);
                        assignment.insert(var, constant);
                    }
                    result = result.with_invalidity(InvalidityWitness::from_steps(vec![
                        DerivationStep {
                            edge: *id,
                            premises: Vec::new(),
                            assignment,
                        },
                    ]));
                }
                return Ok(result);
            }
        }
        if structure.nodes.is_empty() {
            let mut result = VerificationResult::new(VerificationAnswer::Safe);
            if compute {
                result = result.with_validity(ValidityWitness::new());
            }
            return Ok(result);
        }

        let mut solve = Solve::prepare(self, ctx, graph, structure)?;
        for level in 0..=MAX_LEVEL {
            self.check_cancelled()?;
            let under_level = if self.split { level + 1 } else { level };
            if let Some(witness) = solve.try_refute(ctx, under_level)? {
                let mut result = VerificationResult::new(VerificationAnswer::Unsafe);
                if compute {
                    result = result.with_invalidity(witness);
                }
                return Ok(result);
            }
            if let Some(invariants) = solve.try_prove(ctx, level)? {
                let mut result = VerificationResult::new(VerificationAnswer::Safe);
                if compute {
                    let mut witness = ValidityWitness::new();
                    for (node, invariant) in solve.nodes.iter().zip(invariants) {
                        witness.set(node.sym, invariant);
                    }
                    result = result.with_validity(witness);
                }
                return Ok(result);
            }
        }
        Ok(VerificationResult::new(VerificationAnswer::Unknown))
    }
}

/// Per-node solve context.
struct NodeContext {
    sym: chc_graph::SymRef,
    base: Vec<TermRef>,
    primed: Vec<TermRef>,
    /// One-step loop relation over `base ∪ primed`.
    transition: TermRef,
    /// `levels[k]` covers up to `2^k` loop iterations (reflexive).
    levels: Vec<TermRef>,
    /// Must-avoid states, projected onto `base`.
    bad: Option<TermRef>,
}

struct Solve<'a> {
    engine: &'a TpaEngine,
    structure: ChainStructure,
    nodes: Vec<NodeContext>,
    fresh: u64,
}

impl<'a> Solve<'a> {
    fn prepare(
        engine: &'a TpaEngine,
        ctx: &mut TermContext,
        graph: &NormalGraph,
        structure: ChainStructure,
    ) -> Result<Self, ChcError> {
        let mut nodes = Vec::new();
        for chain_node in &structure.nodes {
            let base = graph.graph().state_vars(ctx, chain_node.node);
            let primed = graph.graph().next_state_vars(ctx, chain_node.node);
            let mut relation_keep: BTreeSet<TermRef> = base.iter().copied().collect();
            relation_keep.extend(primed.iter().copied());
            let mut loop_parts = Vec::new();
            for (_, constraint) in &chain_node.loop_edges {
                loop_parts.push(project(ctx, *constraint, &relation_keep)?);
            }
            let transition = ctx.or(loop_parts);
            let mut identity_parts = Vec::new();
            for (b, p) in base.iter().zip(primed.iter()) {
                identity_parts.push(ctx.eq(*p, *b));
            }
            let identity = ctx.and(identity_parts);
            let level_zero = ctx.or2(identity, transition);
            let base_keep: BTreeSet<TermRef> = base.iter().copied().collect();
            let bad = if chain_node.exit_edges.is_empty() {
                None
            } else {
                let mut parts = Vec::new();
                for (_, constraint) in &chain_node.exit_edges {
                    parts.push(project(ctx, *constraint, &base_keep)?);
                }
                Some(ctx.or(parts))
            };
            nodes.push(NodeContext {
                sym: chain_node.sym,
                base,
                primed,
                transition,
                levels: vec![level_zero],
                bad,
            });
        }
        Ok(Self {
            engine,
            structure,
            nodes,
            fresh: 0,
        })
    }

    fn fresh_vector(&mut self, ctx: &mut TermContext, like: &[TermRef]) -> Vec<TermRef> {
        let tag = self.fresh;
        self.fresh += 1;
        like.iter()
            .enumerate()
            .map(|(position, v)| {
                let name = format!("tpa!{tag}!{position}");
                match ctx.sort_of(*v) {
                    Sort::Int => ctx.int_var(name),
                    Sort::Bool => ctx.bool_var(name),
                }
            })
            .collect()
    }

    /// Power relation of node `i` at `level`, built on demand.
    fn ensure_level(
        &mut self,
        ctx: &mut TermContext,
        i: usize,
        level: usize,
    ) -> Result<TermRef, ChcError> {
        while self.nodes[i].levels.len() <= level {
            self.engine.check_cancelled()?;
            let previous = *self.nodes[i]
                .levels
                .last()
                .ok_or_else(|| internal("missing power level"))?;
            let base = self.nodes[i].base.clone();
            let primed = self.nodes[i].primed.clone();
            let mid = self.fresh_vector(ctx, &base);
            let first_half = {
                let renaming = primed.iter().copied().zip(mid.iter().copied()).collect();
                ctx.substitute(previous, &renaming)
            };
            let second_half = {
                let renaming = base.iter().copied().zip(mid.iter().copied()).collect();
                ctx.substitute(previous, &renaming)
            };
            let composed = ctx.and2(first_half, second_half);
            let mut keep: BTreeSet<TermRef> = base.iter().copied().collect();
            keep.extend(primed.iter().copied());
            let projected = project(ctx, composed, &keep)?;
            self.nodes[i].levels.push(projected);
        }
        Ok(self.nodes[i].levels[level])
    }

    /// States of node 0 reachable over the initial edges.
    fn init_set(&mut self, ctx: &mut TermContext) -> Result<TermRef, ChcError> {
        let primed = self.nodes[0].primed.clone();
        let base = self.nodes[0].base.clone();
        let keep: BTreeSet<TermRef> = primed.iter().copied().collect();
        let mut parts = Vec::new();
        for (_, constraint) in &self.structure.init_edges.clone() {
            let projected = project(ctx, *constraint, &keep)?;
            let renaming = primed.iter().copied().zip(base.iter().copied()).collect();
            parts.push(ctx.substitute(projected, &renaming));
        }
        Ok(ctx.or(parts))
    }

    /// Image of `set` (over `base` of node `i`) through `relation`.
    fn post_loop(
        &mut self,
        ctx: &mut TermContext,
        i: usize,
        set: TermRef,
        relation: TermRef,
    ) -> Result<TermRef, ChcError> {
        let base = self.nodes[i].base.clone();
        let primed = self.nodes[i].primed.clone();
        let conj = ctx.and2(set, relation);
        let keep: BTreeSet<TermRef> = primed.iter().copied().collect();
        let projected = project(ctx, conj, &keep)?;
        let renaming = primed.into_iter().zip(base).collect();
        Ok(ctx.substitute(projected, &renaming))
    }

    /// Image of node `i` states over the step edges into node `i + 1`.
    fn post_step(
        &mut self,
        ctx: &mut TermContext,
        i: usize,
        set: TermRef,
    ) -> Result<TermRef, ChcError> {
        let next_primed = self.nodes[i + 1].primed.clone();
        let next_base = self.nodes[i + 1].base.clone();
        let keep: BTreeSet<TermRef> = next_primed.iter().copied().collect();
        let mut parts = Vec::new();
        for (_, constraint) in &self.structure.nodes[i].step_edges.clone() {
            let conj = ctx.and2(set, *constraint);
            let projected = project(ctx, conj, &keep)?;
            let renaming = next_primed
                .iter()
                .copied()
                .zip(next_base.iter().copied())
                .collect();
            parts.push(ctx.substitute(projected, &renaming));
        }
        Ok(ctx.or(parts))
    }

    /// Under-approximate pass: exact forward images meet an exit edge
    /// satisfiably, confirmed by concrete re-unrolling.
    fn try_refute(
        &mut self,
        ctx: &mut TermContext,
        level: usize,
    ) -> Result<Option<InvalidityWitness>, ChcError> {
        let mut current = self.init_set(ctx)?;
        for i in 0..self.nodes.len() {
            self.engine.check_cancelled()?;
            let relation = self.ensure_level(ctx, i, level)?;
            let reach = self.post_loop(ctx, i, current, relation)?;
            for (_, constraint) in &self.structure.nodes[i].exit_edges.clone() {
                self.engine.check_cancelled()?;
                let query = ctx.and2(reach, *constraint);
                if is_sat(ctx, query)? {
                    if let Some(witness) = self.find_concrete(ctx, i)? {
                        return Ok(Some(witness));
                    }
                }
            }
            if i + 1 < self.nodes.len() {
                current = self.post_step(ctx, i, reach)?;
            }
        }
        Ok(None)
    }

    /// Over-approximate pass: per-node inductive invariants.
    fn try_prove(
        &mut self,
        ctx: &mut TermContext,
        level: usize,
    ) -> Result<Option<Vec<TermRef>>, ChcError> {
        let mut entry = self.init_set(ctx)?;
        let mut invariants = Vec::new();
        for i in 0..self.nodes.len() {
            self.engine.check_cancelled()?;
            let relation = self.ensure_level(ctx, i, level)?;
            let reach = self.post_loop(ctx, i, entry, relation)?;
            let base = self.nodes[i].base.clone();
            let bad = self.nodes[i].bad;

            let mut candidates = Vec::new();
            if let Some(bad) = bad {
                let overlap = ctx.and2(reach, bad);
                if !is_sat(ctx, overlap)? {
                    candidates.push(interpolate(ctx, reach, bad)?);
                }
            }
            let hull = self.octagon_hull(ctx, reach, &base)?;
            if let Some(bad) = bad {
                let overlap = ctx.and2(hull, bad);
                if !is_sat(ctx, overlap)? {
                    candidates.push(interpolate(ctx, hull, bad)?);
                }
            }
            candidates.push(reach);
            candidates.push(hull);
            // Widened variants: drop one hull bound at a time.
            let hull_conjuncts = ctx.conjuncts(hull);
            if hull_conjuncts.len() > 1 {
                for skip in 0..hull_conjuncts.len() {
                    let rest: Vec<TermRef> = hull_conjuncts
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| *idx != skip)
                        .map(|(_, &t)| t)
                        .collect();
                    candidates.push(ctx.and(rest));
                }
            }

            let mut chosen = None;
            for candidate in candidates {
                if self.acceptable(ctx, i, entry, candidate)? {
                    chosen = Some(candidate);
                    break;
                }
            }
            let Some(invariant) = chosen else {
                return Ok(None);
            };
            if i + 1 < self.nodes.len() {
                entry = self.post_step(ctx, i, invariant)?;
            }
            invariants.push(invariant);
        }
        Ok(Some(invariants))
    }

    /// Convex over-approximation of `reach`: interval bounds per state
    /// variable plus difference bounds per variable pair, so relational
    /// facts like lockstep counters survive the merge of the power
    /// relation's case splits.
    fn octagon_hull(
        &mut self,
        ctx: &mut TermContext,
        reach: TermRef,
        base: &[TermRef],
    ) -> Result<TermRef, ChcError> {
        let int_vars: Vec<TermRef> = base
            .iter()
            .copied()
            .filter(|v| ctx.sort_of(*v) == Sort::Int)
            .collect();
        let mut extended = int_vars.clone();
        let mut definitions = Vec::new();
        let mut substitute_back: BTreeMap<TermRef, TermRef> = BTreeMap::new();
        for (p, &u) in int_vars.iter().enumerate() {
            for &v in int_vars.iter().skip(p + 1) {
                let tag = self.fresh;
                self.fresh += 1;
                let diff_var = ctx.int_var(format!("tpa!diff!{tag}"));
                let difference = ctx.sub(u, v);
                definitions.push(ctx.eq(diff_var, difference));
                substitute_back.insert(diff_var, difference);
                extended.push(diff_var);
            }
        }
        let mut parts = vec![reach];
        parts.extend(definitions);
        let augmented = ctx.and(parts);
        let hull = interval_hull(ctx, augmented, &extended)?;
        Ok(ctx.substitute(hull, &substitute_back))
    }

    /// Initiation, consecution, and exit-exclusion checks for a candidate.
    fn acceptable(
        &mut self,
        ctx: &mut TermContext,
        i: usize,
        entry: TermRef,
        candidate: TermRef,
    ) -> Result<bool, ChcError> {
        self.engine.check_cancelled()?;
        let not_candidate = ctx.not(candidate);
        let initiation = ctx.and2(entry, not_candidate);
        if is_sat(ctx, initiation)? {
            return Ok(false);
        }
        let node = &self.nodes[i];
        let renaming = node
            .base
            .iter()
            .copied()
            .zip(node.primed.iter().copied())
            .collect();
        let transition = node.transition;
        let primed_candidate = ctx.substitute(candidate, &renaming);
        let not_primed = ctx.not(primed_candidate);
        let consecution = ctx.and([candidate, transition, not_primed]);
        if is_sat(ctx, consecution)? {
            return Ok(false);
        }
        if let Some(bad) = self.nodes[i].bad {
            let overlap = ctx.and2(candidate, bad);
            if is_sat(ctx, overlap)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Bounded concrete re-unrolling of the chain up to the bad node.
    ///
    /// Witness production is best-effort: exhausting the budget yields
    /// `None` and the refutation attempt falls through to further
    /// refinement rather than failing the solve.
    fn find_concrete(
        &mut self,
        ctx: &mut TermContext,
        bad_index: usize,
    ) -> Result<Option<InvalidityWitness>, ChcError> {
        let mut attempts = 0usize;
        for total in 0..=MAX_BMC_TOTAL {
            for counts in compositions(total, bad_index + 1) {
                attempts += 1;
                if attempts > MAX_BMC_ATTEMPTS {
                    return Ok(None);
                }
                self.engine.check_cancelled()?;
                if let Some(witness) = self.try_counts(ctx, &counts, bad_index)? {
                    return Ok(Some(witness));
                }
            }
        }
        Ok(None)
    }

    /// One unrolling with fixed per-node loop counts.
    fn try_counts(
        &mut self,
        ctx: &mut TermContext,
        counts: &[usize],
        bad_index: usize,
    ) -> Result<Option<InvalidityWitness>, ChcError> {
        let mut states: Vec<Vec<Vec<TermRef>>> = Vec::new();
        for (j, &count) in counts.iter().enumerate() {
            let base = self.nodes[j].base.clone();
            let mut per_node = Vec::new();
            for _ in 0..=count {
                let vector = self.fresh_vector(ctx, &base);
                per_node.push(vector);
            }
            states.push(per_node);
        }

        let mut parts = Vec::new();
        let init_edges = self.structure.init_edges.clone();
        let primed0 = self.nodes[0].primed.clone();
        let mut init_parts = Vec::new();
        for (_, constraint) in &init_edges {
            init_parts.push(self.instantiate(ctx, *constraint, &[(
                primed0.clone(),
                states[0][0].clone(),
            )]));
        }
        parts.push(ctx.or(init_parts));
        for (j, &count) in counts.iter().enumerate() {
            let base = self.nodes[j].base.clone();
            let primed = self.nodes[j].primed.clone();
            let loop_edges = self.structure.nodes[j].loop_edges.clone();
            for t in 0..count {
                let mut loop_parts = Vec::new();
                for (_, constraint) in &loop_edges {
                    loop_parts.push(self.instantiate(ctx, *constraint, &[
                        (base.clone(), states[j][t].clone()),
                        (primed.clone(), states[j][t + 1].clone()),
                    ]));
                }
                parts.push(ctx.or(loop_parts));
            }
            if j < bad_index {
                let step_edges = self.structure.nodes[j].step_edges.clone();
                let next_primed = self.nodes[j + 1].primed.clone();
                let mut step_parts = Vec::new();
                for (_, constraint) in &step_edges {
                    step_parts.push(self.instantiate(ctx, *constraint, &[
                        (base.clone(), states[j][count].clone()),
                        (next_primed.clone(), states[j + 1][0].clone()),
                    ]));
                }
                parts.push(ctx.or(step_parts));
            }
        }
        let exit_edges = self.structure.nodes[bad_index].exit_edges.clone();
        let bad_base = self.nodes[bad_index].base.clone();
        let last_state = states[bad_index][counts[bad_index]].clone();
        let mut exit_parts = Vec::new();
        for (_, constraint) in &exit_edges {
            exit_parts.push(self.instantiate(ctx, *constraint, &[(
                bad_base.clone(),
                last_state.clone(),
            )]));
        }
        parts.push(ctx.or(exit_parts));

        let formula = ctx.and(parts);
        let Some(model) = get_model(ctx, formula)? else {
            return Ok(None);
        };
        let value_of = |ctx: &mut TermContext, vector: &[TermRef]| -> Vec<TermRef> {
            vector
                .iter()
                .map(|v| {
                    let value = model.get(v).copied().unwrap_or(match ctx.sort_of(*v) {
                        Sort::Int => chc_logic::Value::Int(0),
                        Sort::Bool => chc_logic::Value::Bool(false),
                    });
                    value_term(ctx, value)
                })
                .collect()
        };

        let mut steps: Vec<DerivationStep> = Vec::new();
        let init_values = value_of(ctx, &states[0][0]);
        let Some(()) = self.emit_step(ctx, &mut steps, &init_edges, &[(
            primed0.clone(),
            init_values,
        )], Vec::new())?
        else {
            return Ok(None);
        };
        for (j, &count) in counts.iter().enumerate() {
            let base = self.nodes[j].base.clone();
            let primed = self.nodes[j].primed.clone();
            let loop_edges = self.structure.nodes[j].loop_edges.clone();
            for t in 0..count {
                let from = value_of(ctx, &states[j][t]);
                let to = value_of(ctx, &states[j][t + 1]);
                let premises = vec![steps.len() - 1];
                let Some(()) = self.emit_step(ctx, &mut steps, &loop_edges, &[
                    (base.clone(), from),
                    (primed.clone(), to),
                ], premises)?
                else {
                    return Ok(None);
                };
            }
            if j < bad_index {
                let step_edges = self.structure.nodes[j].step_edges.clone();
                let next_primed = self.nodes[j + 1].primed.clone();
                let from = value_of(ctx, &states[j][count]);
                let to = value_of(ctx, &states[j + 1][0]);
                let premises = vec![steps.len() - 1];
                let Some(()) = self.emit_step(ctx, &mut steps, &step_edges, &[
                    (base.clone(), from),
                    (next_primed.clone(), to),
                ], premises)?
                else {
                    return Ok(None);
                };
            }
        }
        let from = value_of(ctx, &last_state);
        let premises = vec![steps.len() - 1];
        let Some(()) = self.emit_step(ctx, &mut steps, &exit_edges, &[(
            bad_base.clone(),
            from,
        )], premises)?
        else {
            return Ok(None);
        };
        Ok(Some(InvalidityWitness::from_steps(steps)))
    }

    /// Renames the given vectors and freshens the remaining variables.
    fn instantiate(
        &mut self,
        ctx: &mut TermContext,
        constraint: TermRef,
        vectors: &[(Vec<TermRef>, Vec<TermRef>)],
    ) -> TermRef {
        let mut renaming: BTreeMap<TermRef, TermRef> = BTreeMap::new();
        for (from, to) in vectors {
            for (f, t) in from.iter().zip(to.iter()) {
                renaming.insert(*f, *t);
            }
        }
        for v in ctx.free_vars(constraint) {
            if renaming.contains_key(&v) {
                continue;
            }
            let tag = self.fresh;
            self.fresh += 1;
            let name = format!("tpa!aux!{tag}");
            let fresh = match ctx.sort_of(v) {
                Sort::Int => ctx.int_var(name),
                Sort::Bool => ctx.bool_var(name),
            };
            renaming.insert(v, fresh);
        }
        ctx.substitute(constraint, &renaming)
    }

    /// Appends one derivation step, picking the first edge of `edges` whose
    /// constraint can be grounded at the given state values.
    fn emit_step(
        &mut self,
        ctx: &mut TermContext,
        steps: &mut Vec<DerivationStep>,
        edges: &[(chc_core::EdgeId, TermRef)],
        vectors: &[(Vec<TermRef>, Vec<TermRef>)],
        premises: Vec<usize>,
    ) -> Result<Option<()>, ChcError> {
        let mut partial: BTreeMap<TermRef, TermRef> = BTreeMap::new();
        for (vars, values) in vectors {
            for (v, c) in vars.iter().zip(values.iter()) {
                partial.insert(*v, *c);
            }
        }
        for (id, constraint) in edges {
            if let Some(assignment) = ground_assignment(ctx, *constraint, &partial)? {
                steps.push(DerivationStep {
                    edge: *id,
                    premises,
                    assignment,
                });
                return Ok(Some(()));
            }
        }
        Ok(None)
    }
}

fn compositions(total: usize, slots: usize) -> Vec<Vec<usize>> {
    if slots == 0 {
        return if total == 0 {
            vec![Vec::new()]
        } else {
            Vec::new()
        };
    }
    let mut out = Vec::new();
    for first in 0..=total {
        for mut rest in compositions(total - first, slots - 1) {
            let mut tuple = Vec::with_capacity(slots);
            tuple.push(first);
            tuple.append(&mut rest);
            out.push(tuple);
        }
    }
    out
}

fn internal(detail: &str) -> ChcError {
    ChcError::Solver(ErrorInfo::new("tpa-internal", detail))
}
