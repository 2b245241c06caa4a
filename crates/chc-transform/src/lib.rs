#![deny(missing_docs)]
#![doc = "Semantics-preserving graph transformations with witness back-translation."]

mod chain_summarizer;
mod framework;
mod multi_edge_merger;
mod node_eliminator;
mod rebuild;
mod simplifier;

pub use chain_summarizer::SimpleChainSummarizer;
pub use framework::{BackTranslator, IdentityBackTranslator, Transformation, TransformationPipeline};
pub use multi_edge_merger::MultiEdgeMerger;
pub use node_eliminator::{NonLoopEliminator, SimpleNodeEliminator};
pub use simplifier::ConstraintSimplifier;
