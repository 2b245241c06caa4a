//! Safety and unsafety witnesses, and the engine result type.

use std::collections::BTreeMap;

use chc_core::{EdgeId, VerificationAnswer};
use chc_logic::TermRef;

use crate::clauses::SymRef;

/// Interpretation per predicate symbol, over the symbol's base vector.
///
/// A witness validates a system when substituting each interpretation makes
/// every clause a theory tautology. Symbols absent from the graph default to
/// `true`; absent required entries fail validation.
#[derive(Debug, Clone, Default)]
pub struct ValidityWitness {
    interpretations: BTreeMap<SymRef, TermRef>,
}

impl ValidityWitness {
    /// Creates an empty witness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interpretation, replacing any previous one.
    pub fn set(&mut self, sym: SymRef, interpretation: TermRef) {
        self.interpretations.insert(sym, interpretation);
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, sym: SymRef, interpretation: TermRef) -> Self {
        self.set(sym, interpretation);
        self
    }

    /// Returns the interpretation of a symbol, if present.
    pub fn get(&self, sym: SymRef) -> Option<TermRef> {
        self.interpretations.get(&sym).copied()
    }

    /// Iterates over all interpretations.
    pub fn iter(&self) -> impl Iterator<Item = (SymRef, TermRef)> + '_ {
        self.interpretations.iter().map(|(&s, &t)| (s, t))
    }
}

/// One step of a derivation: an edge instantiated by a model.
///
/// `premises` holds the arena indices of the steps deriving each source, in
/// source-list order; steps whose sources are all `Entry` have no premises.
/// The assignment binds every variable of the edge constraint (source
/// instance vectors, target primed vector, auxiliaries) to constant terms.
#[derive(Debug, Clone)]
pub struct DerivationStep {
    /// Edge being applied.
    pub edge: EdgeId,
    /// Indices of premise steps within the witness arena.
    pub premises: Vec<usize>,
    /// Constant binding for the edge's variables.
    pub assignment: BTreeMap<TermRef, TermRef>,
}

/// Derivation tree witnessing unsafety, stored as an arena.
///
/// Steps are indexed by position; the final step is the root and targets
/// `Exit`. The arena layout avoids pointer cycles and keeps back-translation
/// a per-step rewrite.
#[derive(Debug, Clone, Default)]
pub struct InvalidityWitness {
    steps: Vec<DerivationStep>,
}

impl InvalidityWitness {
    /// Creates an empty derivation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step and returns its arena index.
    pub fn push(&mut self, step: DerivationStep) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// All steps in arena order.
    pub fn steps(&self) -> &[DerivationStep] {
        &self.steps
    }

    /// The root step, which must target `Exit`.
    pub fn root(&self) -> Option<&DerivationStep> {
        self.steps.last()
    }

    /// Rebuilds the witness from raw steps.
    pub fn from_steps(steps: Vec<DerivationStep>) -> Self {
        Self { steps }
    }
}

/// Outcome of one engine invocation.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    answer: VerificationAnswer,
    validity: Option<ValidityWitness>,
    invalidity: Option<InvalidityWitness>,
}

impl VerificationResult {
    /// Creates a result with no witness attached.
    pub fn new(answer: VerificationAnswer) -> Self {
        Self {
            answer,
            validity: None,
            invalidity: None,
        }
    }

    /// Attaches a validity witness.
    pub fn with_validity(mut self, witness: ValidityWitness) -> Self {
        self.validity = Some(witness);
        self
    }

    /// Attaches an invalidity witness.
    pub fn with_invalidity(mut self, witness: InvalidityWitness) -> Self {
        self.invalidity = Some(witness);
        self
    }

    /// The verdict.
    pub fn answer(&self) -> VerificationAnswer {
        self.answer
    }

    /// The safety witness, when computed.
    pub fn validity_witness(&self) -> Option<&ValidityWitness> {
        self.validity.as_ref()
    }

    /// The unsafety witness, when computed.
    pub fn invalidity_witness(&self) -> Option<&InvalidityWitness> {
        self.invalidity.as_ref()
    }

    /// Decomposes the result for witness translation.
    pub fn into_parts(
        self,
    ) -> (
        VerificationAnswer,
        Option<ValidityWitness>,
        Option<InvalidityWitness>,
    ) {
        (self.answer, self.validity, self.invalidity)
    }
}
