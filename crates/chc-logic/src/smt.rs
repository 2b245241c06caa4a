//! Bridge between the term DAG and the Z3 solver.
//!
//! The theory work — satisfiability, models, simplification, quantifier
//! elimination — is delegated to Z3; this module only encodes `TermRef`
//! handles into Z3 asts and reads answers back into the DAG. Variables are
//! addressed by their handle index so the round trip is lossless. Every
//! public call owns a fresh Z3 context configured with a query timeout;
//! a timeout surfaces as a solver failure, never as a wrong verdict.
//!
//! Z3 has no interpolation API anymore, so `interpolate` is a strategy on
//! top of the solver primitives: project one side onto the shared
//! variables, then greedily drop conjuncts while the pair stays
//! unsatisfiable. `interval_hull` likewise bisects per-variable bounds
//! with plain satisfiability probes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chc_core::{ChcError, ErrorInfo};
use z3::ast::{Ast, Bool, Dynamic, Int};
use z3::{AstKind, Config, Context, DeclKind, Goal, SatResult, Solver, Tactic};

use crate::term::{AtomOp, Sort, TermContext, TermData, TermRef, Value};

/// Per-query timeout handed to Z3, in milliseconds.
const QUERY_TIMEOUT_MS: &str = "10000";
/// Probe radius for the interval hull; values beyond it count as unbounded.
const HULL_PROBE: i64 = 1 << 20;

fn base_config() -> Config {
    let mut cfg = Config::new();
    cfg.set_param_value("timeout", QUERY_TIMEOUT_MS);
    cfg
}

fn solver_error(code: &str, message: impl Into<String>) -> ChcError {
    ChcError::Solver(ErrorInfo::new(code, message))
}

fn unknown_verdict() -> ChcError {
    solver_error(
        "z3-unknown",
        "the solver gave up on a query (timeout or incompleteness)",
    )
}

/// Encodes DAG terms into Z3 asts within one Z3 context.
struct Encoder<'a, 'z> {
    terms: &'a TermContext,
    zctx: &'z Context,
    cache: HashMap<TermRef, Dynamic<'z>>,
}

impl<'a, 'z> Encoder<'a, 'z> {
    fn new(terms: &'a TermContext, zctx: &'z Context) -> Self {
        Self {
            terms,
            zctx,
            cache: HashMap::new(),
        }
    }

    /// Z3 constant name for a variable handle; decodable back to the handle.
    fn var_name(t: TermRef) -> String {
        format!("t{}", t.as_raw())
    }

    fn encode(&mut self, t: TermRef) -> Result<Dynamic<'z>, ChcError> {
        if let Some(cached) = self.cache.get(&t) {
            return Ok(cached.clone());
        }
        let encoded: Dynamic<'z> = match self.terms.data(t).clone() {
            TermData::True => Dynamic::from(Bool::from_bool(self.zctx, true)),
            TermData::False => Dynamic::from(Bool::from_bool(self.zctx, false)),
            TermData::IntConst(v) => Dynamic::from(Int::from_i64(self.zctx, v)),
            TermData::Var { sort, .. } => match sort {
                Sort::Int => Dynamic::from(Int::new_const(self.zctx, Self::var_name(t))),
                Sort::Bool => Dynamic::from(Bool::new_const(self.zctx, Self::var_name(t))),
            },
            TermData::Not(a) => {
                let a = self.encode_bool(a)?;
                Dynamic::from(a.not())
            }
            TermData::And(args) => {
                let parts = args
                    .iter()
                    .map(|&a| self.encode_bool(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Bool> = parts.iter().collect();
                Dynamic::from(Bool::and(self.zctx, &refs))
            }
            TermData::Or(args) => {
                let parts = args
                    .iter()
                    .map(|&a| self.encode_bool(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Bool> = parts.iter().collect();
                Dynamic::from(Bool::or(self.zctx, &refs))
            }
            TermData::Add(args) => {
                let parts = args
                    .iter()
                    .map(|&a| self.encode_int(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Int> = parts.iter().collect();
                Dynamic::from(Int::add(self.zctx, &refs))
            }
            TermData::MulConst(c, a) => {
                let factor = Int::from_i64(self.zctx, c);
                let a = self.encode_int(a)?;
                Dynamic::from(Int::mul(self.zctx, &[&factor, &a]))
            }
            TermData::Atom(op, a, b) => {
                let a = self.encode_int(a)?;
                let b = self.encode_int(b)?;
                Dynamic::from(match op {
                    AtomOp::Leq => a.le(&b),
                    AtomOp::Lt => a.lt(&b),
                })
            }
            TermData::Eq(a, b) => {
                let a = self.encode(a)?;
                let b = self.encode(b)?;
                Dynamic::from(a._eq(&b))
            }
        };
        self.cache.insert(t, encoded.clone());
        Ok(encoded)
    }

    fn encode_bool(&mut self, t: TermRef) -> Result<Bool<'z>, ChcError> {
        self.encode(t)?
            .as_bool()
            .ok_or_else(|| solver_error("sort-confusion", "expected a boolean term"))
    }

    fn encode_int(&mut self, t: TermRef) -> Result<Int<'z>, ChcError> {
        self.encode(t)?
            .as_int()
            .ok_or_else(|| solver_error("sort-confusion", "expected an integer term"))
    }
}

fn unsupported(detail: impl Into<String>) -> ChcError {
    solver_error("unsupported-term", detail)
}

/// Reads a Z3 ast back into the DAG. Only the fragment Z3 produces for
/// quantifier-free linear integer goals is understood; anything else is a
/// solver failure, which engines treat as UNKNOWN.
fn decode(terms: &mut TermContext, ast: &Dynamic) -> Result<TermRef, ChcError> {
    match ast.kind() {
        AstKind::Numeral => ast
            .as_int()
            .and_then(|i| i.as_i64())
            .map(|v| terms.int_const(v))
            .ok_or_else(|| unsupported("numeral outside the machine integer range")),
        AstKind::App => decode_app(terms, ast),
        other => Err(unsupported(format!("ast kind {other:?}"))),
    }
}

fn decode_app(terms: &mut TermContext, ast: &Dynamic) -> Result<TermRef, ChcError> {
    let decl = ast.decl();
    let children: Vec<Dynamic> = ast.children();
    let mut decoded = Vec::with_capacity(children.len());
    for child in &children {
        decoded.push(decode(terms, child)?);
    }
    match decl.kind() {
        DeclKind::TRUE => Ok(terms.tru()),
        DeclKind::FALSE => Ok(terms.fls()),
        DeclKind::AND => Ok(terms.and(decoded)),
        DeclKind::OR => Ok(terms.or(decoded)),
        DeclKind::NOT => Ok(terms.not(decoded[0])),
        DeclKind::IMPLIES => Ok(terms.implies(decoded[0], decoded[1])),
        DeclKind::IFF | DeclKind::EQ => Ok(terms.eq(decoded[0], decoded[1])),
        DeclKind::XOR => {
            let equal = terms.eq(decoded[0], decoded[1]);
            Ok(terms.not(equal))
        }
        DeclKind::DISTINCT => {
            let mut parts = Vec::new();
            for i in 0..decoded.len() {
                for j in i + 1..decoded.len() {
                    let equal = terms.eq(decoded[i], decoded[j]);
                    parts.push(terms.not(equal));
                }
            }
            Ok(terms.and(parts))
        }
        DeclKind::ITE => {
            if terms.sort_of(decoded[1]) == Sort::Bool {
                let positive = terms.and2(decoded[0], decoded[1]);
                let flipped = terms.not(decoded[0]);
                let negative = terms.and2(flipped, decoded[2]);
                Ok(terms.or2(positive, negative))
            } else {
                Err(unsupported("integer conditional in solver output"))
            }
        }
        DeclKind::LE => Ok(terms.leq(decoded[0], decoded[1])),
        DeclKind::LT => Ok(terms.lt(decoded[0], decoded[1])),
        DeclKind::GE => Ok(terms.geq(decoded[0], decoded[1])),
        DeclKind::GT => Ok(terms.gt(decoded[0], decoded[1])),
        DeclKind::ADD => Ok(terms.add(decoded)),
        DeclKind::SUB => {
            let mut acc = decoded[0];
            for &d in &decoded[1..] {
                acc = terms.sub(acc, d);
            }
            Ok(acc)
        }
        DeclKind::UMINUS => Ok(terms.neg(decoded[0])),
        DeclKind::MUL => {
            let mut constant = 1i64;
            let mut symbolic = None;
            for d in decoded {
                if let Some(v) = terms.int_value(d) {
                    constant = constant
                        .checked_mul(v)
                        .ok_or_else(|| unsupported("product outside the machine integer range"))?;
                } else if symbolic.is_none() {
                    symbolic = Some(d);
                } else {
                    return Err(unsupported("nonlinear product in solver output"));
                }
            }
            Ok(match symbolic {
                Some(s) => terms.mul_const(constant, s),
                None => terms.int_const(constant),
            })
        }
        DeclKind::UNINTERPRETED if children.is_empty() => {
            let name = decl.name();
            name.strip_prefix('t')
                .and_then(|raw| raw.parse::<u32>().ok())
                .map(TermRef::from_raw)
                .filter(|&t| terms.is_var(t))
                .ok_or_else(|| unsupported(format!("unknown constant {name}")))
        }
        other => Err(unsupported(format!("declaration kind {other:?}"))),
    }
}

/// Decides satisfiability of a boolean term.
pub fn is_sat(ctx: &mut TermContext, t: TermRef) -> Result<bool, ChcError> {
    let cfg = base_config();
    let zctx = Context::new(&cfg);
    let mut encoder = Encoder::new(&*ctx, &zctx);
    let formula = encoder.encode_bool(t)?;
    let solver = Solver::new(&zctx);
    solver.assert(&formula);
    match solver.check() {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown => Err(unknown_verdict()),
    }
}

/// Returns a satisfying assignment for `t`, or `None` when `t` is
/// unsatisfiable. Every free variable of `t` is bound, with model
/// completion supplying defaults for don't-care positions.
pub fn get_model(
    ctx: &mut TermContext,
    t: TermRef,
) -> Result<Option<BTreeMap<TermRef, Value>>, ChcError> {
    let free = ctx.free_vars(t);
    let cfg = base_config();
    let zctx = Context::new(&cfg);
    let mut encoder = Encoder::new(&*ctx, &zctx);
    let formula = encoder.encode_bool(t)?;
    let solver = Solver::new(&zctx);
    solver.assert(&formula);
    match solver.check() {
        SatResult::Unsat => Ok(None),
        SatResult::Unknown => Err(unknown_verdict()),
        SatResult::Sat => {
            let model = solver
                .get_model()
                .ok_or_else(|| solver_error("z3-model", "satisfiable query returned no model"))?;
            let mut assignment = BTreeMap::new();
            for v in free {
                let ast = encoder.encode(v)?;
                let value = if let Some(int_ast) = ast.as_int() {
                    Value::Int(
                        model
                            .eval(&int_ast, true)
                            .and_then(|i| i.as_i64())
                            .unwrap_or(0),
                    )
                } else {
                    let bool_ast = ast.as_bool().ok_or_else(|| {
                        solver_error("sort-confusion", "variable with unknown sort")
                    })?;
                    Value::Bool(
                        model
                            .eval(&bool_ast, true)
                            .and_then(|b| b.as_bool())
                            .unwrap_or(false),
                    )
                };
                assignment.insert(v, value);
            }
            Ok(Some(assignment))
        }
    }
}

/// Existentially eliminates every variable of `t` outside `keep`, via Z3's
/// quantifier-elimination tactic. The result is quantifier free and
/// equivalent to `∃ eliminated. t`.
pub fn project(
    ctx: &mut TermContext,
    t: TermRef,
    keep: &BTreeSet<TermRef>,
) -> Result<TermRef, ChcError> {
    let eliminate: Vec<TermRef> = ctx
        .free_vars(t)
        .into_iter()
        .filter(|v| !keep.contains(v))
        .collect();
    if eliminate.is_empty() {
        return Ok(t);
    }
    let cfg = base_config();
    let zctx = Context::new(&cfg);
    let subgoals: Vec<Vec<Dynamic>> = {
        let mut encoder = Encoder::new(&*ctx, &zctx);
        let body = encoder.encode_bool(t)?;
        let bounds = eliminate
            .iter()
            .map(|&v| encoder.encode(v))
            .collect::<Result<Vec<_>, _>>()?;
        let bound_refs: Vec<&dyn Ast> = bounds.iter().map(|d| d as &dyn Ast).collect();
        let quantified = z3::ast::exists_const(&zctx, &bound_refs, &[], &body);
        let goal = Goal::new(&zctx, false, false, false);
        goal.assert(&quantified);
        let tactic = Tactic::new(&zctx, "qe");
        let outcome = tactic
            .apply(&goal, None)
            .map_err(|detail| solver_error("qe-failed", detail))?;
        outcome
            .list_subgoals()
            .map(|subgoal| {
                subgoal
                    .get_formulas::<Bool>()
                    .into_iter()
                    .map(Dynamic::from)
                    .collect()
            })
            .collect()
    };
    let mut disjuncts = Vec::new();
    for formulas in &subgoals {
        let mut parts = Vec::new();
        for formula in formulas {
            parts.push(decode(ctx, formula)?);
        }
        disjuncts.push(ctx.and(parts));
    }
    Ok(ctx.or(disjuncts))
}

/// Simplifies a term through Z3's rewriter.
///
/// Best effort: if the rewritten ast falls outside the fragment the DAG
/// can represent, the input term is returned unchanged.
pub fn simplify(ctx: &mut TermContext, t: TermRef) -> TermRef {
    simplify_checked(ctx, t).unwrap_or(t)
}

fn simplify_checked(ctx: &mut TermContext, t: TermRef) -> Result<TermRef, ChcError> {
    let cfg = base_config();
    let zctx = Context::new(&cfg);
    let simplified = {
        let mut encoder = Encoder::new(&*ctx, &zctx);
        encoder.encode(t)?.simplify()
    };
    decode(ctx, &simplified)
}

/// Computes an interpolant for the unsatisfiable pair `(a, b)`.
///
/// The result `i` satisfies `a ⇒ i`, `i ∧ b` unsatisfiable, and mentions
/// only variables shared between `a` and `b`: `a` is projected onto the
/// shared variables, then conjuncts are greedily dropped while `i ∧ b`
/// stays unsatisfiable. Errors if `a ∧ b` is satisfiable.
pub fn interpolate(ctx: &mut TermContext, a: TermRef, b: TermRef) -> Result<TermRef, ChcError> {
    let conj = ctx.and2(a, b);
    if is_sat(ctx, conj)? {
        return Err(solver_error(
            "interpolation-sat",
            "interpolation requested for a satisfiable pair",
        ));
    }
    let fa = ctx.free_vars(a);
    let fb: BTreeSet<TermRef> = ctx.free_vars(b).into_iter().collect();
    let shared: BTreeSet<TermRef> = fa.into_iter().filter(|v| fb.contains(v)).collect();
    let projected = project(ctx, a, &shared)?;
    let mut kept: Vec<Vec<TermRef>> = ctx
        .disjuncts(projected)
        .into_iter()
        .map(|d| ctx.conjuncts(d))
        .collect();
    for case in 0..kept.len() {
        let mut member = 0;
        while member < kept[case].len() {
            let mut trial = kept.clone();
            trial[case].remove(member);
            let candidate = reassemble(ctx, &trial);
            let overlap = ctx.and2(candidate, b);
            if !is_sat(ctx, overlap)? {
                kept = trial;
            } else {
                member += 1;
            }
        }
    }
    Ok(reassemble(ctx, &kept))
}

fn reassemble(ctx: &mut TermContext, cases: &[Vec<TermRef>]) -> TermRef {
    let mut disjuncts = Vec::new();
    for case in cases {
        disjuncts.push(ctx.and(case.iter().copied()));
    }
    ctx.or(disjuncts)
}

/// Over-approximates `t` by per-variable interval bounds.
///
/// Each bound is found by bisecting satisfiability probes; a variable that
/// reaches past the probe radius counts as unbounded on that side. The
/// result is implied by `t` and merges disjunctive case splits into one
/// convex conjunction, which is what invariant generalization works on.
pub fn interval_hull(
    ctx: &mut TermContext,
    t: TermRef,
    vars: &[TermRef],
) -> Result<TermRef, ChcError> {
    if !is_sat(ctx, t)? {
        return Ok(ctx.fls());
    }
    let int_vars: Vec<TermRef> = vars
        .iter()
        .copied()
        .filter(|&v| ctx.sort_of(v) == Sort::Int)
        .collect();
    let cfg = base_config();
    let zctx = Context::new(&cfg);
    let mut bounds: Vec<(TermRef, Option<i64>, Option<i64>)> = Vec::new();
    {
        let mut encoder = Encoder::new(&*ctx, &zctx);
        let body = encoder.encode_bool(t)?;
        for &v in &int_vars {
            let var_ast = encoder.encode_int(v)?;
            let sat_below = |limit: i64| -> Result<bool, ChcError> {
                let solver = Solver::new(&zctx);
                solver.assert(&body);
                solver.assert(&var_ast.le(&Int::from_i64(&zctx, limit)));
                match solver.check() {
                    SatResult::Sat => Ok(true),
                    SatResult::Unsat => Ok(false),
                    SatResult::Unknown => Err(unknown_verdict()),
                }
            };
            let sat_above = |limit: i64| -> Result<bool, ChcError> {
                let solver = Solver::new(&zctx);
                solver.assert(&body);
                solver.assert(&var_ast.ge(&Int::from_i64(&zctx, limit)));
                match solver.check() {
                    SatResult::Sat => Ok(true),
                    SatResult::Unsat => Ok(false),
                    SatResult::Unknown => Err(unknown_verdict()),
                }
            };
            // Smallest value of v: bisect once the probe shows a floor.
            let lower = if sat_below(-HULL_PROBE)? || !sat_below(HULL_PROBE)? {
                None
            } else {
                let mut lo = -HULL_PROBE;
                let mut hi = HULL_PROBE;
                while lo + 1 < hi {
                    let mid = lo + (hi - lo) / 2;
                    if sat_below(mid)? {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                Some(hi)
            };
            let upper = if sat_above(HULL_PROBE)? || !sat_above(-HULL_PROBE)? {
                None
            } else {
                let mut lo = -HULL_PROBE;
                let mut hi = HULL_PROBE;
                while lo + 1 < hi {
                    let mid = lo + (hi - lo) / 2;
                    if sat_above(mid)? {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                Some(lo)
            };
            bounds.push((v, lower, upper));
        }
    }
    let mut parts = Vec::new();
    for (v, lower, upper) in bounds {
        if let Some(lo) = lower {
            let bound = ctx.int_const(lo);
            parts.push(ctx.geq(v, bound));
        }
        if let Some(hi) = upper {
            let bound = ctx.int_const(hi);
            parts.push(ctx.leq(v, bound));
        }
    }
    Ok(ctx.and(parts))
}
