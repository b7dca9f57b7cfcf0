use crate::extractor::models::ResolvedReference;
use crate::transport::Transport;
use crate::utils::error::ResolutionHint;
use async_trait::async_trait;

/// Result of one identifier strategy
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// The strategy produced an identifier; stop here
    Resolved(ResolvedReference),
    /// The reference does not have the shape this strategy handles
    NotApplicable,
    /// The strategy applied but came up empty; try the next one
    Missed(ResolutionHint),
}

/// One link in the identifier fallback chain
///
/// Strategies never fail the chain: network or parse problems inside a
/// strategy are logged and reported as [`StrategyOutcome::Missed`] or
/// [`StrategyOutcome::NotApplicable`] so the resolver can move on.
#[async_trait]
pub trait IdentifierStrategy: Send + Sync {
    /// Stable name, used in logs and in [`ResolvedReference::source`]
    fn id(&self) -> &'static str;

    async fn resolve(&self, reference: &str, transport: &dyn Transport) -> StrategyOutcome;
}
