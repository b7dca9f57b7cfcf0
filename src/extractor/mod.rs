pub mod info;
pub mod models;
pub mod resolver;
pub mod rules;
pub mod selector;
pub mod traits;

pub use info::VideoInfoFetcher;
pub use models::{Quality, RenditionDescriptor, ResolvedReference, VideoIdentifier, VideoInfo};
pub use resolver::IdentifierResolver;
pub use rules::ExtractionRule;
pub use traits::{IdentifierStrategy, StrategyOutcome};
