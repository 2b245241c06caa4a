//! Canonical variable vectors and version renamings per predicate symbol.

use std::collections::BTreeMap;

use chc_logic::{Sort, TermContext, TermRef};

use crate::clauses::{SymbolTable, SymRef};

/// Version of a symbol's canonical variable vector.
///
/// `Instance(0)` is the base (state) vector; `Primed` is the next-state
/// vector used in head position; higher instances are per-occurrence copies
/// used when a symbol appears several times in one clause or when
/// transformations compose constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    /// Occurrence-indexed state copy; index 0 is the base vector.
    Instance(u32),
    /// Next-state vector.
    Primed,
}

/// Supplies canonical variable vectors and renamings between versions.
///
/// Variable identity is a pure function of symbol, position, and version,
/// so independently constructed managers over the same table agree. The
/// manager also hands out fresh auxiliary vectors for constraint
/// composition; those draw from a private counter carried with the graph.
#[derive(Debug, Clone)]
pub struct VersionManager {
    sorts: BTreeMap<SymRef, Vec<Sort>>,
    names: BTreeMap<SymRef, String>,
    next_fresh: u64,
}

impl VersionManager {
    /// Creates a manager over the given symbol registry.
    pub fn new(symbols: &SymbolTable) -> Self {
        let mut sorts = BTreeMap::new();
        let mut names = BTreeMap::new();
        for sym in symbols.user_symbols() {
            sorts.insert(sym, symbols.signature(sym).args.clone());
            names.insert(sym, symbols.name(sym).to_string());
        }
        Self {
            sorts,
            names,
            next_fresh: 0,
        }
    }

    fn make_var(
        &self,
        ctx: &mut TermContext,
        sym: SymRef,
        position: usize,
        suffix: &str,
    ) -> TermRef {
        let name = format!("{}!{}{}", self.names[&sym], position, suffix);
        match self.sorts[&sym][position] {
            Sort::Int => ctx.int_var(name),
            Sort::Bool => ctx.bool_var(name),
        }
    }

    /// Returns the canonical vector of `sym` in the requested version.
    pub fn vars(&self, ctx: &mut TermContext, sym: SymRef, version: Version) -> Vec<TermRef> {
        let arity = self.sorts.get(&sym).map_or(0, Vec::len);
        (0..arity)
            .map(|position| match version {
                Version::Instance(0) => self.make_var(ctx, sym, position, ""),
                Version::Instance(instance) => {
                    self.make_var(ctx, sym, position, &format!("#{instance}"))
                }
                Version::Primed => self.make_var(ctx, sym, position, "'"),
            })
            .collect()
    }

    /// Base (state) vector of `sym`.
    pub fn base_vars(&self, ctx: &mut TermContext, sym: SymRef) -> Vec<TermRef> {
        self.vars(ctx, sym, Version::Instance(0))
    }

    /// Primed (next-state) vector of `sym`.
    pub fn primed_vars(&self, ctx: &mut TermContext, sym: SymRef) -> Vec<TermRef> {
        self.vars(ctx, sym, Version::Primed)
    }

    /// Renaming from one version of `sym` to another.
    pub fn renaming(
        &self,
        ctx: &mut TermContext,
        sym: SymRef,
        from: Version,
        to: Version,
    ) -> BTreeMap<TermRef, TermRef> {
        let from_vars = self.vars(ctx, sym, from);
        let to_vars = self.vars(ctx, sym, to);
        from_vars.into_iter().zip(to_vars).collect()
    }

    /// Hands out a fresh vector for `sym`, distinct from every canonical
    /// version and every earlier fresh vector.
    pub fn fresh_vars(&mut self, ctx: &mut TermContext, sym: SymRef) -> Vec<TermRef> {
        let tag = self.next_fresh;
        self.next_fresh += 1;
        let arity = self.sorts.get(&sym).map_or(0, Vec::len);
        (0..arity)
            .map(|position| self.make_var(ctx, sym, position, &format!("@{tag}")))
            .collect()
    }

    /// Hands out a single fresh auxiliary variable.
    pub fn fresh_aux(&mut self, ctx: &mut TermContext, sort: Sort, hint: &str) -> TermRef {
        let tag = self.next_fresh;
        self.next_fresh += 1;
        let name = format!("{hint}@{tag}");
        match sort {
            Sort::Int => ctx.int_var(name),
            Sort::Bool => ctx.bool_var(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (SymbolTable, SymRef) {
        let mut symbols = SymbolTable::new();
        let p = symbols.register("p", vec![Sort::Int, Sort::Bool]).unwrap();
        (symbols, p)
    }

    #[test]
    fn versions_are_disjoint() {
        let (symbols, p) = table();
        let manager = VersionManager::new(&symbols);
        let mut ctx = TermContext::new();
        let base = manager.base_vars(&mut ctx, p);
        let primed = manager.primed_vars(&mut ctx, p);
        let second = manager.vars(&mut ctx, p, Version::Instance(1));
        assert_eq!(base.len(), 2);
        for v in &base {
            assert!(!primed.contains(v));
            assert!(!second.contains(v));
        }
    }

    #[test]
    fn vectors_are_stable_across_calls() {
        let (symbols, p) = table();
        let manager = VersionManager::new(&symbols);
        let mut ctx = TermContext::new();
        assert_eq!(manager.base_vars(&mut ctx, p), manager.base_vars(&mut ctx, p));
        assert_eq!(
            manager.primed_vars(&mut ctx, p),
            manager.primed_vars(&mut ctx, p)
        );
    }

    #[test]
    fn fresh_vectors_never_repeat() {
        let (symbols, p) = table();
        let mut manager = VersionManager::new(&symbols);
        let mut ctx = TermContext::new();
        let a = manager.fresh_vars(&mut ctx, p);
        let b = manager.fresh_vars(&mut ctx, p);
        assert_ne!(a, b);
    }
}
