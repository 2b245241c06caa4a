//! Horn clauses over uninterpreted predicates.

use std::collections::BTreeMap;

use chc_core::{ChcError, ErrorInfo};
use chc_logic::{Sort, TermContext, TermRef};
use serde::{Deserialize, Serialize};

/// Interned reference to a predicate symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymRef(u32);

impl SymRef {
    /// Returns the raw index of this symbol.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// Name and argument sorts of a predicate symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateSignature {
    /// User-visible name.
    pub name: String,
    /// Argument sorts, in order.
    pub args: Vec<Sort>,
}

/// Registry of predicate symbols.
///
/// The two distinguished symbols `⊤` and `⊥` are owned by the table and can
/// never be registered by users.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    signatures: Vec<PredicateSignature>,
    by_name: BTreeMap<String, SymRef>,
}

impl SymbolTable {
    /// The distinguished always-true symbol denoting the entry.
    pub const TRUE: SymRef = SymRef(0);
    /// The distinguished always-false symbol denoting the query.
    pub const FALSE: SymRef = SymRef(1);

    /// Creates a table holding only the distinguished symbols.
    pub fn new() -> Self {
        let mut table = Self {
            signatures: Vec::new(),
            by_name: BTreeMap::new(),
        };
        table.insert_raw("true", Vec::new());
        table.insert_raw("false", Vec::new());
        table
    }

    fn insert_raw(&mut self, name: &str, args: Vec<Sort>) -> SymRef {
        let id = SymRef(self.signatures.len() as u32);
        self.signatures.push(PredicateSignature {
            name: name.to_string(),
            args,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Registers an uninterpreted predicate.
    ///
    /// Re-registering with an identical signature returns the existing
    /// symbol; a conflicting signature is a malformed clause system.
    pub fn register(&mut self, name: &str, args: Vec<Sort>) -> Result<SymRef, ChcError> {
        if name == "true" || name == "false" {
            return Err(ChcError::Clause(
                ErrorInfo::new("reserved-symbol", "the symbol name is reserved")
                    .with_context("name", name),
            ));
        }
        if let Some(&existing) = self.by_name.get(name) {
            if self.signatures[existing.0 as usize].args == args {
                return Ok(existing);
            }
            return Err(ChcError::Clause(
                ErrorInfo::new(
                    "conflicting-signature",
                    "predicate registered twice with different signatures",
                )
                .with_context("name", name),
            ));
        }
        Ok(self.insert_raw(name, args))
    }

    /// Returns the signature of a symbol.
    pub fn signature(&self, sym: SymRef) -> &PredicateSignature {
        &self.signatures[sym.0 as usize]
    }

    /// Returns the name of a symbol.
    pub fn name(&self, sym: SymRef) -> &str {
        &self.signature(sym).name
    }

    /// Returns the arity of a symbol.
    pub fn arity(&self, sym: SymRef) -> usize {
        self.signature(sym).args.len()
    }

    /// Looks up a symbol by name.
    pub fn lookup(&self, name: &str) -> Option<SymRef> {
        self.by_name.get(name).copied()
    }

    /// Iterates over the user-registered symbols, excluding `⊤` and `⊥`.
    pub fn user_symbols(&self) -> impl Iterator<Item = SymRef> + '_ {
        (2..self.signatures.len() as u32).map(SymRef)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A predicate symbol applied to an ordered list of argument terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateInstance {
    /// Applied symbol.
    pub symbol: SymRef,
    /// Argument terms, matching the symbol's signature.
    pub args: Vec<TermRef>,
}

impl PredicateInstance {
    /// Creates an instance.
    pub fn new(symbol: SymRef, args: Vec<TermRef>) -> Self {
        Self { symbol, args }
    }

    /// The distinguished `⊤` instance.
    pub fn truth() -> Self {
        Self::new(SymbolTable::TRUE, Vec::new())
    }

    /// The distinguished `⊥` instance.
    pub fn falsity() -> Self {
        Self::new(SymbolTable::FALSE, Vec::new())
    }
}

/// A constrained Horn clause: `(∧ body) ∧ constraint ⇒ head`.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Head predicate instance.
    pub head: PredicateInstance,
    /// Body predicate instances.
    pub body: Vec<PredicateInstance>,
    /// Boolean theory constraint.
    pub constraint: TermRef,
}

/// A finite set of Horn clauses with their predicate registry.
#[derive(Debug, Clone, Default)]
pub struct ClauseSystem {
    symbols: SymbolTable,
    clauses: Vec<Clause>,
}

impl ClauseSystem {
    /// Creates an empty system.
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            clauses: Vec::new(),
        }
    }

    /// Registers an uninterpreted predicate signature.
    pub fn register_predicate(&mut self, name: &str, args: Vec<Sort>) -> Result<SymRef, ChcError> {
        self.symbols.register(name, args)
    }

    /// Appends a Horn clause after signature and sort checking.
    pub fn add_clause(
        &mut self,
        ctx: &TermContext,
        head: PredicateInstance,
        body: Vec<PredicateInstance>,
        constraint: TermRef,
    ) -> Result<(), ChcError> {
        self.check_instance(ctx, &head)?;
        for instance in &body {
            self.check_instance(ctx, instance)?;
        }
        if ctx.sort_of(constraint) != Sort::Bool {
            return Err(ChcError::Clause(ErrorInfo::new(
                "non-boolean-constraint",
                "clause constraint must be boolean",
            )));
        }
        self.clauses.push(Clause {
            head,
            body,
            constraint,
        });
        Ok(())
    }

    fn check_instance(&self, ctx: &TermContext, instance: &PredicateInstance) -> Result<(), ChcError> {
        if instance.symbol.0 as usize >= self.symbols.signatures.len() {
            return Err(ChcError::Clause(ErrorInfo::new(
                "unknown-symbol",
                "predicate instance uses an unregistered symbol",
            )));
        }
        let signature = self.symbols.signature(instance.symbol);
        if signature.args.len() != instance.args.len() {
            return Err(ChcError::Clause(
                ErrorInfo::new("arity-mismatch", "argument count does not match the signature")
                    .with_context("name", signature.name.clone())
                    .with_context("expected", signature.args.len().to_string())
                    .with_context("actual", instance.args.len().to_string()),
            ));
        }
        for (arg, expected) in instance.args.iter().zip(signature.args.iter()) {
            if ctx.sort_of(*arg) != *expected {
                return Err(ChcError::Clause(
                    ErrorInfo::new("sort-mismatch", "argument sort does not match the signature")
                        .with_context("name", signature.name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// Returns the clauses in insertion order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns the predicate registry.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
