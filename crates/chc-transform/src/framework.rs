//! Transformation and back-translation contracts, plus the pipeline.

use chc_core::ChcError;
use chc_graph::{HyperGraph, VerificationResult};
use chc_logic::TermContext;

/// A semantics-preserving graph transformation.
///
/// The result graph is equivalent in verification outcome to the input, and
/// the returned translator lifts witnesses on the result back to witnesses
/// on the input.
pub trait Transformation {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Consumes the graph and produces the transformed graph plus its
    /// back-translator.
    fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError>;
}

/// Lifts a witness on the transformed graph to the untransformed graph.
///
/// The witness kind is preserved: validity in, validity out; invalidity in,
/// invalidity out. Results without a witness pass through unchanged.
pub trait BackTranslator {
    /// Translates a verification result.
    fn translate(
        &self,
        ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError>;
}

/// Back-translator for transformations that preserve edges and witnesses.
#[derive(Debug, Default)]
pub struct IdentityBackTranslator;

impl BackTranslator for IdentityBackTranslator {
    fn translate(
        &self,
        _ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError> {
        Ok(result)
    }
}

/// Applies transformations in order and composes their back-translators.
///
/// Back-translation visits the translators in reverse registration order.
#[derive(Default)]
pub struct TransformationPipeline {
    steps: Vec<Box<dyn Transformation>>,
}

impl TransformationPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transformation.
    pub fn push(&mut self, step: Box<dyn Transformation>) {
        self.steps.push(step);
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with(mut self, step: Box<dyn Transformation>) -> Self {
        self.push(step);
        self
    }

    /// Runs the whole pipeline.
    pub fn transform(
        &self,
        ctx: &mut TermContext,
        graph: HyperGraph,
    ) -> Result<(HyperGraph, Box<dyn BackTranslator>), ChcError> {
        let mut current = graph;
        let mut translators = Vec::new();
        for step in &self.steps {
            let (next, translator) = step.transform(ctx, current)?;
            current = next;
            translators.push(translator);
        }
        Ok((current, Box::new(ComposedBackTranslator { translators })))
    }
}

struct ComposedBackTranslator {
    translators: Vec<Box<dyn BackTranslator>>,
}

impl BackTranslator for ComposedBackTranslator {
    fn translate(
        &self,
        ctx: &mut TermContext,
        result: VerificationResult,
    ) -> Result<VerificationResult, ChcError> {
        let mut current = result;
        for translator in self.translators.iter().rev() {
            current = translator.translate(ctx, current)?;
        }
        Ok(current)
    }
}
