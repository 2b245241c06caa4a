//! Hash-consed term DAG and normalizing constructors.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sort {
    /// Mathematical integers.
    Int,
    /// Booleans.
    Bool,
}

/// Comparison operator kept on arithmetic atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomOp {
    /// Non-strict less-or-equal.
    Leq,
    /// Strict less-than.
    Lt,
}

/// Shared, immutable reference into a [`TermContext`].
///
/// Handles are small `Copy` values whose validity is tied to the owning
/// context; two handles from the same context are equal iff the terms are
/// structurally identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermRef(u32);

impl TermRef {
    /// Returns the raw index of this handle within its context.
    pub fn as_raw(&self) -> u32 {
        self.0
    }

    /// Rebuilds a handle from its raw index. The caller must know the
    /// index came from the same context.
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Interned node of the term DAG.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TermData {
    True,
    False,
    IntConst(i64),
    Var { name: String, sort: Sort },
    Not(TermRef),
    And(Vec<TermRef>),
    Or(Vec<TermRef>),
    Add(Vec<TermRef>),
    MulConst(i64, TermRef),
    Atom(AtomOp, TermRef, TermRef),
    Eq(TermRef, TermRef),
}

/// Concrete value a term evaluates to under a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

/// Owner of the term DAG.
///
/// All terms of one solve live in a single context; the context is
/// monotonically extended and never shrinks. Constructors hash-cons, so
/// structural equality is handle equality.
#[derive(Debug, Default)]
pub struct TermContext {
    nodes: Vec<TermData>,
    interned: HashMap<TermData, TermRef>,
}

impl TermContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, data: TermData) -> TermRef {
        if let Some(&existing) = self.interned.get(&data) {
            return existing;
        }
        let id = TermRef(self.nodes.len() as u32);
        self.nodes.push(data.clone());
        self.interned.insert(data, id);
        id
    }

    pub(crate) fn data(&self, t: TermRef) -> &TermData {
        &self.nodes[t.0 as usize]
    }

    /// The constant `true`.
    pub fn tru(&mut self) -> TermRef {
        self.intern(TermData::True)
    }

    /// The constant `false`.
    pub fn fls(&mut self) -> TermRef {
        self.intern(TermData::False)
    }

    /// An integer constant.
    pub fn int_const(&mut self, value: i64) -> TermRef {
        self.intern(TermData::IntConst(value))
    }

    /// An integer variable. Variables are identified by name and sort.
    pub fn int_var(&mut self, name: impl Into<String>) -> TermRef {
        self.intern(TermData::Var {
            name: name.into(),
            sort: Sort::Int,
        })
    }

    /// A boolean variable.
    pub fn bool_var(&mut self, name: impl Into<String>) -> TermRef {
        self.intern(TermData::Var {
            name: name.into(),
            sort: Sort::Bool,
        })
    }

    /// Returns the sort of a term.
    pub fn sort_of(&self, t: TermRef) -> Sort {
        match self.data(t) {
            TermData::True | TermData::False => Sort::Bool,
            TermData::IntConst(_) => Sort::Int,
            TermData::Var { sort, .. } => *sort,
            TermData::Not(_) | TermData::And(_) | TermData::Or(_) => Sort::Bool,
            TermData::Add(_) | TermData::MulConst(..) => Sort::Int,
            TermData::Atom(..) | TermData::Eq(..) => Sort::Bool,
        }
    }

    /// Whether `t` is the constant true.
    pub fn is_true(&self, t: TermRef) -> bool {
        matches!(self.data(t), TermData::True)
    }

    /// Whether `t` is the constant false.
    pub fn is_false(&self, t: TermRef) -> bool {
        matches!(self.data(t), TermData::False)
    }

    /// Whether `t` is a variable.
    pub fn is_var(&self, t: TermRef) -> bool {
        matches!(self.data(t), TermData::Var { .. })
    }

    /// Returns the name of a variable term.
    pub fn var_name(&self, t: TermRef) -> Option<&str> {
        match self.data(t) {
            TermData::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the integer value of a constant term.
    pub fn int_value(&self, t: TermRef) -> Option<i64> {
        match self.data(t) {
            TermData::IntConst(v) => Some(*v),
            _ => None,
        }
    }

    /// Conjunction. Flattens nested conjunctions, drops `true`, and
    /// collapses to `false` on any false conjunct.
    pub fn and(&mut self, args: impl IntoIterator<Item = TermRef>) -> TermRef {
        let mut flat = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for arg in args {
            match self.data(arg) {
                TermData::True => {}
                TermData::False => return self.fls(),
                TermData::And(inner) => {
                    for &t in inner.clone().iter() {
                        if seen.insert(t) {
                            flat.push(t);
                        }
                    }
                }
                _ => {
                    if seen.insert(arg) {
                        flat.push(arg);
                    }
                }
            }
        }
        match flat.len() {
            0 => self.tru(),
            1 => flat[0],
            _ => self.intern(TermData::And(flat)),
        }
    }

    /// Binary conjunction convenience.
    pub fn and2(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.and([a, b])
    }

    /// Disjunction. Flattens nested disjunctions, drops `false`, and
    /// collapses to `true` on any true disjunct.
    pub fn or(&mut self, args: impl IntoIterator<Item = TermRef>) -> TermRef {
        let mut flat = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for arg in args {
            match self.data(arg) {
                TermData::False => {}
                TermData::True => return self.tru(),
                TermData::Or(inner) => {
                    for &t in inner.clone().iter() {
                        if seen.insert(t) {
                            flat.push(t);
                        }
                    }
                }
                _ => {
                    if seen.insert(arg) {
                        flat.push(arg);
                    }
                }
            }
        }
        match flat.len() {
            0 => self.fls(),
            1 => flat[0],
            _ => self.intern(TermData::Or(flat)),
        }
    }

    /// Binary disjunction convenience.
    pub fn or2(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.or([a, b])
    }

    /// Negation with double-negation and constant elimination.
    pub fn not(&mut self, t: TermRef) -> TermRef {
        match self.data(t) {
            TermData::True => self.fls(),
            TermData::False => self.tru(),
            TermData::Not(inner) => *inner,
            _ => self.intern(TermData::Not(t)),
        }
    }

    /// Implication encoded as `¬a ∨ b`.
    pub fn implies(&mut self, a: TermRef, b: TermRef) -> TermRef {
        let na = self.not(a);
        self.or2(na, b)
    }

    /// Integer addition. Flattens and folds constants.
    pub fn add(&mut self, args: impl IntoIterator<Item = TermRef>) -> TermRef {
        let mut flat = Vec::new();
        let mut constant = 0i64;
        for arg in args {
            match self.data(arg) {
                TermData::IntConst(v) => constant += *v,
                TermData::Add(inner) => {
                    for &t in inner.clone().iter() {
                        match self.data(t) {
                            TermData::IntConst(v) => constant += *v,
                            _ => flat.push(t),
                        }
                    }
                }
                _ => flat.push(arg),
            }
        }
        if constant != 0 || flat.is_empty() {
            let k = self.int_const(constant);
            flat.push(k);
        }
        match flat.len() {
            1 => flat[0],
            _ => self.intern(TermData::Add(flat)),
        }
    }

    /// Binary addition convenience.
    pub fn add2(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.add([a, b])
    }

    /// Integer subtraction `a - b`.
    pub fn sub(&mut self, a: TermRef, b: TermRef) -> TermRef {
        let nb = self.neg(b);
        self.add([a, nb])
    }

    /// Integer negation.
    pub fn neg(&mut self, t: TermRef) -> TermRef {
        self.mul_const(-1, t)
    }

    /// Multiplication by an integer constant.
    pub fn mul_const(&mut self, c: i64, t: TermRef) -> TermRef {
        if c == 0 {
            return self.int_const(0);
        }
        if c == 1 {
            return t;
        }
        match self.data(t) {
            TermData::IntConst(v) => {
                let v = *v;
                self.int_const(c * v)
            }
            TermData::MulConst(d, inner) => {
                let (d, inner) = (*d, *inner);
                self.mul_const(c * d, inner)
            }
            _ => self.intern(TermData::MulConst(c, t)),
        }
    }

    fn atom(&mut self, op: AtomOp, lhs: TermRef, rhs: TermRef) -> TermRef {
        if let (Some(a), Some(b)) = (self.int_value(lhs), self.int_value(rhs)) {
            let holds = match op {
                AtomOp::Leq => a <= b,
                AtomOp::Lt => a < b,
            };
            return if holds { self.tru() } else { self.fls() };
        }
        self.intern(TermData::Atom(op, lhs, rhs))
    }

    /// `a ≤ b`.
    pub fn leq(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.atom(AtomOp::Leq, a, b)
    }

    /// `a < b`.
    pub fn lt(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.atom(AtomOp::Lt, a, b)
    }

    /// `a ≥ b`.
    pub fn geq(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.atom(AtomOp::Leq, b, a)
    }

    /// `a > b`.
    pub fn gt(&mut self, a: TermRef, b: TermRef) -> TermRef {
        self.atom(AtomOp::Lt, b, a)
    }

    /// Equality on integers, bi-implication on booleans.
    pub fn eq(&mut self, a: TermRef, b: TermRef) -> TermRef {
        if a == b {
            return self.tru();
        }
        if let (Some(x), Some(y)) = (self.int_value(a), self.int_value(b)) {
            return if x == y { self.tru() } else { self.fls() };
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.intern(TermData::Eq(a, b))
    }

    /// Returns the conjuncts of a conjunction, or the term itself.
    pub fn conjuncts(&self, t: TermRef) -> Vec<TermRef> {
        match self.data(t) {
            TermData::And(args) => args.clone(),
            _ => vec![t],
        }
    }

    /// Returns the disjuncts of a disjunction, or the term itself.
    pub fn disjuncts(&self, t: TermRef) -> Vec<TermRef> {
        match self.data(t) {
            TermData::Or(args) => args.clone(),
            _ => vec![t],
        }
    }

    /// Enumerates the free variables of `t` in deterministic handle order.
    pub fn free_vars(&self, t: TermRef) -> Vec<TermRef> {
        let mut out = std::collections::BTreeSet::new();
        let mut stack = vec![t];
        let mut visited = std::collections::BTreeSet::new();
        while let Some(cur) = stack.pop() {
            if !visited.insert(cur) {
                continue;
            }
            match self.data(cur) {
                TermData::Var { .. } => {
                    out.insert(cur);
                }
                TermData::Not(a) | TermData::MulConst(_, a) => stack.push(*a),
                TermData::And(args) | TermData::Or(args) | TermData::Add(args) => {
                    stack.extend(args.iter().copied())
                }
                TermData::Atom(_, a, b) | TermData::Eq(a, b) => {
                    stack.push(*a);
                    stack.push(*b);
                }
                _ => {}
            }
        }
        out.into_iter().collect()
    }

    /// Simultaneous substitution of variables. Rebuilds bottom-up through
    /// the normalizing constructors, so the result is renormalized.
    pub fn substitute(&mut self, t: TermRef, map: &BTreeMap<TermRef, TermRef>) -> TermRef {
        let mut memo: BTreeMap<TermRef, TermRef> = BTreeMap::new();
        self.substitute_rec(t, map, &mut memo)
    }

    fn substitute_rec(
        &mut self,
        t: TermRef,
        map: &BTreeMap<TermRef, TermRef>,
        memo: &mut BTreeMap<TermRef, TermRef>,
    ) -> TermRef {
        if let Some(&replacement) = map.get(&t) {
            return replacement;
        }
        if let Some(&cached) = memo.get(&t) {
            return cached;
        }
        let result = match self.data(t).clone() {
            TermData::True
            | TermData::False
            | TermData::IntConst(_)
            | TermData::Var { .. } => t,
            TermData::Not(a) => {
                let a = self.substitute_rec(a, map, memo);
                self.not(a)
            }
            TermData::And(args) => {
                let args: Vec<_> = args
                    .into_iter()
                    .map(|a| self.substitute_rec(a, map, memo))
                    .collect();
                self.and(args)
            }
            TermData::Or(args) => {
                let args: Vec<_> = args
                    .into_iter()
                    .map(|a| self.substitute_rec(a, map, memo))
                    .collect();
                self.or(args)
            }
            TermData::Add(args) => {
                let args: Vec<_> = args
                    .into_iter()
                    .map(|a| self.substitute_rec(a, map, memo))
                    .collect();
                self.add(args)
            }
            TermData::MulConst(c, a) => {
                let a = self.substitute_rec(a, map, memo);
                self.mul_const(c, a)
            }
            TermData::Atom(op, a, b) => {
                let a = self.substitute_rec(a, map, memo);
                let b = self.substitute_rec(b, map, memo);
                self.atom(op, a, b)
            }
            TermData::Eq(a, b) => {
                let a = self.substitute_rec(a, map, memo);
                let b = self.substitute_rec(b, map, memo);
                self.eq(a, b)
            }
        };
        memo.insert(t, result);
        result
    }

    /// Builds a renaming map from paired variable vectors.
    ///
    /// The vectors must have equal length; positions are matched pairwise.
    pub fn renaming(from: &[TermRef], to: &[TermRef]) -> BTreeMap<TermRef, TermRef> {
        from.iter().copied().zip(to.iter().copied()).collect()
    }

    /// Evaluates `t` under a variable assignment. Returns `None` if a free
    /// variable is unassigned.
    pub fn evaluate(&self, t: TermRef, assignment: &BTreeMap<TermRef, Value>) -> Option<Value> {
        match self.data(t) {
            TermData::True => Some(Value::Bool(true)),
            TermData::False => Some(Value::Bool(false)),
            TermData::IntConst(v) => Some(Value::Int(*v)),
            TermData::Var { .. } => assignment.get(&t).copied(),
            TermData::Not(a) => match self.evaluate(*a, assignment)? {
                Value::Bool(b) => Some(Value::Bool(!b)),
                Value::Int(_) => None,
            },
            TermData::And(args) => {
                let mut acc = true;
                for &a in args {
                    match self.evaluate(a, assignment)? {
                        Value::Bool(b) => acc &= b,
                        Value::Int(_) => return None,
                    }
                }
                Some(Value::Bool(acc))
            }
            TermData::Or(args) => {
                let mut acc = false;
                for &a in args {
                    match self.evaluate(a, assignment)? {
                        Value::Bool(b) => acc |= b,
                        Value::Int(_) => return None,
                    }
                }
                Some(Value::Bool(acc))
            }
            TermData::Add(args) => {
                let mut acc = 0i64;
                for &a in args {
                    match self.evaluate(a, assignment)? {
                        Value::Int(v) => acc += v,
                        Value::Bool(_) => return None,
                    }
                }
                Some(Value::Int(acc))
            }
            TermData::MulConst(c, a) => match self.evaluate(*a, assignment)? {
                Value::Int(v) => Some(Value::Int(c * v)),
                Value::Bool(_) => None,
            },
            TermData::Atom(op, a, b) => {
                let (a, b) = (self.evaluate(*a, assignment)?, self.evaluate(*b, assignment)?);
                match (a, b) {
                    (Value::Int(x), Value::Int(y)) => Some(Value::Bool(match op {
                        AtomOp::Leq => x <= y,
                        AtomOp::Lt => x < y,
                    })),
                    _ => None,
                }
            }
            TermData::Eq(a, b) => {
                let (a, b) = (self.evaluate(*a, assignment)?, self.evaluate(*b, assignment)?);
                match (a, b) {
                    (Value::Int(x), Value::Int(y)) => Some(Value::Bool(x == y)),
                    (Value::Bool(x), Value::Bool(y)) => Some(Value::Bool(x == y)),
                    _ => None,
                }
            }
        }
    }

    /// Renders a term for diagnostics.
    pub fn display(&self, t: TermRef) -> String {
        let mut out = String::new();
        self.display_into(t, &mut out);
        out
    }

    fn display_into(&self, t: TermRef, out: &mut String) {
        use fmt::Write;
        match self.data(t) {
            TermData::True => out.push_str("true"),
            TermData::False => out.push_str("false"),
            TermData::IntConst(v) => {
                let _ = write!(out, "{v}");
            }
            TermData::Var { name, .. } => out.push_str(name),
            TermData::Not(a) => {
                out.push_str("(not ");
                self.display_into(*a, out);
                out.push(')');
            }
            TermData::And(args) => self.display_nary("and", args, out),
            TermData::Or(args) => self.display_nary("or", args, out),
            TermData::Add(args) => self.display_nary("+", args, out),
            TermData::MulConst(c, a) => {
                let _ = write!(out, "(* {c} ");
                self.display_into(*a, out);
                out.push(')');
            }
            TermData::Atom(op, a, b) => {
                out.push_str(match op {
                    AtomOp::Leq => "(<= ",
                    AtomOp::Lt => "(< ",
                });
                self.display_into(*a, out);
                out.push(' ');
                self.display_into(*b, out);
                out.push(')');
            }
            TermData::Eq(a, b) => {
                out.push_str("(= ");
                self.display_into(*a, out);
                out.push(' ');
                self.display_into(*b, out);
                out.push(')');
            }
        }
    }

    fn display_nary(&self, op: &str, args: &[TermRef], out: &mut String) {
        out.push('(');
        out.push_str(op);
        for &a in args {
            out.push(' ');
            self.display_into(a, out);
        }
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_dedups() {
        let mut ctx = TermContext::new();
        let x = ctx.int_var("x");
        let y = ctx.int_var("x");
        assert_eq!(x, y);
        let a = ctx.add2(x, y);
        let b = ctx.add2(y, x);
        assert_eq!(a, b);
    }

    #[test]
    fn boolean_constructors_normalize() {
        let mut ctx = TermContext::new();
        let t = ctx.tru();
        let f = ctx.fls();
        let b = ctx.bool_var("b");
        assert_eq!(ctx.and([t, b]), b);
        assert_eq!(ctx.and([f, b]), f);
        assert_eq!(ctx.or([f, b]), b);
        let nb = ctx.not(b);
        assert_eq!(ctx.not(nb), b);
    }

    #[test]
    fn arithmetic_folds_constants() {
        let mut ctx = TermContext::new();
        let two = ctx.int_const(2);
        let three = ctx.int_const(3);
        let sum = ctx.add2(two, three);
        assert_eq!(ctx.int_value(sum), Some(5));
        let five = ctx.int_const(5);
        let equal = ctx.eq(sum, five);
        assert!(ctx.is_true(equal));
    }

    #[test]
    fn substitution_renormalizes() {
        let mut ctx = TermContext::new();
        let x = ctx.int_var("x");
        let zero = ctx.int_const(0);
        let atom = ctx.leq(zero, x);
        let map = TermContext::renaming(&[x], &[zero]);
        let substituted = ctx.substitute(atom, &map);
        assert!(ctx.is_true(substituted));
    }

    #[test]
    fn free_vars_deduplicate() {
        let mut ctx = TermContext::new();
        let x = ctx.int_var("x");
        let y = ctx.int_var("y");
        let sum = ctx.add2(x, y);
        let atom = ctx.leq(sum, x);
        assert_eq!(ctx.free_vars(atom), vec![x, y]);
    }
}
