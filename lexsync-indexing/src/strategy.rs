//! Synchronization strategies and the policies they produce.
//!
//! A strategy decides how far a flushing session blocks: on durability, on
//! search visibility, and whether flush failures propagate to the caller
//! or go to the failure handler. Strategies are pure policy; they shape a
//! [`SynchronizationPolicy`] through a builder and never touch the index
//! themselves.

use crate::error::{ConfigError, FlushError};
use crate::plan::IndexingPlan;
use lexsync_engine::{CommitStrategy, FailureHandler, IndexingFailure, RefreshStrategy};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Whether flush failures reach the flushing caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportMode {
    /// Failures propagate to the caller and can abort its transaction.
    #[default]
    Synchronous,

    /// Failures are routed to the failure handler; the caller sees
    /// success. For callers that opted out of waiting on the outcome.
    Background,
}

/// Pluggable synchronization behavior.
///
/// The coordinator seeds the builder with the mapping's failure handler
/// before calling `apply`; a strategy only overrides what it cares about.
pub trait SynchronizationStrategy: Send + Sync {
    /// Shapes the policy for this strategy.
    fn apply(&self, builder: &mut SynchronizationPolicyBuilder);
}

/// Builder handed to [`SynchronizationStrategy::apply`].
pub struct SynchronizationPolicyBuilder {
    commit: CommitStrategy,
    refresh: RefreshStrategy,
    report_mode: ReportMode,
    failure_handler: Arc<dyn FailureHandler>,
}

impl SynchronizationPolicyBuilder {
    /// Creates a builder with the least blocking settings and the given
    /// failure handler.
    #[must_use]
    pub fn new(failure_handler: Arc<dyn FailureHandler>) -> Self {
        Self {
            commit: CommitStrategy::None,
            refresh: RefreshStrategy::None,
            report_mode: ReportMode::Synchronous,
            failure_handler,
        }
    }

    /// Sets how hard flushes block on durability.
    pub fn commit(&mut self, commit: CommitStrategy) -> &mut Self {
        self.commit = commit;
        self
    }

    /// Sets how hard flushes block on search visibility.
    pub fn refresh(&mut self, refresh: RefreshStrategy) -> &mut Self {
        self.refresh = refresh;
        self
    }

    /// Sets where flush failures go.
    pub fn report_mode(&mut self, mode: ReportMode) -> &mut Self {
        self.report_mode = mode;
        self
    }

    /// Replaces the failure handler. The mapping's handler is already in
    /// place; only strategies with their own reporting pipeline need this.
    pub fn failure_handler(&mut self, handler: Arc<dyn FailureHandler>) -> &mut Self {
        self.failure_handler = handler;
        self
    }

    /// Finishes the policy. `name` shows up in logs only.
    #[must_use]
    pub fn build(self, name: impl Into<String>) -> SynchronizationPolicy {
        SynchronizationPolicy {
            name: name.into(),
            commit: self.commit,
            refresh: self.refresh,
            report_mode: self.report_mode,
            failure_handler: self.failure_handler,
        }
    }
}

/// The resolved synchronization behavior for plan flushes.
///
/// A pure value: cheap to clone, safe to share across transactions. Hooks
/// and overrides carry their own copy.
#[derive(Clone)]
pub struct SynchronizationPolicy {
    name: String,
    commit: CommitStrategy,
    refresh: RefreshStrategy,
    report_mode: ReportMode,
    failure_handler: Arc<dyn FailureHandler>,
}

impl fmt::Debug for SynchronizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizationPolicy")
            .field("name", &self.name)
            .field("commit", &self.commit)
            .field("refresh", &self.refresh)
            .field("report_mode", &self.report_mode)
            .finish_non_exhaustive()
    }
}

impl SynchronizationPolicy {
    /// The name the policy was resolved under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How hard flushes block on durability.
    #[must_use]
    pub fn commit(&self) -> CommitStrategy {
        self.commit
    }

    /// How hard flushes block on search visibility.
    #[must_use]
    pub fn refresh(&self) -> RefreshStrategy {
        self.refresh
    }

    /// Where flush failures go.
    #[must_use]
    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    /// The failure handler for writes nobody can observe.
    #[must_use]
    pub fn failure_handler(&self) -> Arc<dyn FailureHandler> {
        Arc::clone(&self.failure_handler)
    }

    /// Executes a plan under this policy.
    ///
    /// `Synchronous` mode propagates flush errors to the caller;
    /// `Background` mode reports them to the failure handler and returns
    /// Ok.
    pub fn execute(&self, plan: IndexingPlan) -> Result<(), FlushError> {
        match plan.execute() {
            Ok(outcome) => {
                debug!("Flushed indexing plan under '{}': {}", self.name, outcome);
                Ok(())
            }
            Err(err) => match self.report_mode {
                ReportMode::Synchronous => Err(err),
                ReportMode::Background => {
                    let failure = IndexingFailure::new("indexing", err.to_string())
                        .with_entities(err.failed_references().to_vec());
                    self.failure_handler.handle(failure);
                    Ok(())
                }
            },
        }
    }
}

/// The built-in strategies.
///
/// | name | commit | refresh | report |
/// |---|---|---|---|
/// | `async` | none | none | background |
/// | `write-sync` | force | none | synchronous |
/// | `read-sync` | none | force | synchronous |
/// | `sync` | force | force | synchronous |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStrategy {
    /// Do not block at all; failures go to the failure handler.
    Async,

    /// Block until the works are durable. The default.
    WriteSync,

    /// Block until the works are visible to searches.
    ReadSync,

    /// Block until the works are durable and visible.
    Sync,
}

impl BuiltinStrategy {
    /// All built-ins, in documentation order.
    pub const ALL: [BuiltinStrategy; 4] = [
        BuiltinStrategy::Async,
        BuiltinStrategy::WriteSync,
        BuiltinStrategy::ReadSync,
        BuiltinStrategy::Sync,
    ];

    /// Looks a built-in up by its configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "async" => Some(BuiltinStrategy::Async),
            "write-sync" => Some(BuiltinStrategy::WriteSync),
            "read-sync" => Some(BuiltinStrategy::ReadSync),
            "sync" => Some(BuiltinStrategy::Sync),
            _ => None,
        }
    }

    /// The configuration name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinStrategy::Async => "async",
            BuiltinStrategy::WriteSync => "write-sync",
            BuiltinStrategy::ReadSync => "read-sync",
            BuiltinStrategy::Sync => "sync",
        }
    }
}

impl SynchronizationStrategy for BuiltinStrategy {
    fn apply(&self, builder: &mut SynchronizationPolicyBuilder) {
        match self {
            BuiltinStrategy::Async => {
                builder.report_mode(ReportMode::Background);
            }
            BuiltinStrategy::WriteSync => {
                builder.commit(CommitStrategy::Force);
            }
            BuiltinStrategy::ReadSync => {
                builder.refresh(RefreshStrategy::Force);
            }
            BuiltinStrategy::Sync => {
                builder
                    .commit(CommitStrategy::Force)
                    .refresh(RefreshStrategy::Force);
            }
        }
    }
}

/// Resolves configured strategy names to handles.
///
/// Embedders with a plugin registry implement this to expose custom
/// strategies; the bundled resolver knows the built-ins.
pub trait StrategyResolver: Send + Sync {
    /// Resolves a configured name. `key` is the full property name the
    /// value came from, for error messages.
    fn resolve(&self, name: &str, key: &str) -> Result<StrategyHandle, ConfigError>;
}

/// A resolved strategy plus its registry release hook.
///
/// The hook runs exactly once: explicitly through [`release`](Self::release)
/// (the coordinator does this on stop), or on drop as a backstop.
pub struct StrategyHandle {
    strategy: Arc<dyn SynchronizationStrategy>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for StrategyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyHandle").finish_non_exhaustive()
    }
}

impl StrategyHandle {
    /// Wraps a strategy with no release hook.
    #[must_use]
    pub fn new(strategy: Arc<dyn SynchronizationStrategy>) -> Self {
        Self {
            strategy,
            release: None,
        }
    }

    /// Wraps a strategy whose registry wants to know when the handle is
    /// done with it.
    #[must_use]
    pub fn with_release(
        strategy: Arc<dyn SynchronizationStrategy>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            strategy,
            release: Some(Box::new(release)),
        }
    }

    /// The strategy itself.
    #[must_use]
    pub fn strategy(&self) -> &dyn SynchronizationStrategy {
        self.strategy.as_ref()
    }

    /// Runs the release hook. Releasing twice is a no-op.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for StrategyHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Resolver for the built-in strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStrategyResolver;

impl StrategyResolver for BuiltinStrategyResolver {
    fn resolve(&self, name: &str, key: &str) -> Result<StrategyHandle, ConfigError> {
        match BuiltinStrategy::from_name(name) {
            Some(builtin) => Ok(StrategyHandle::new(Arc::new(builtin))),
            None => Err(ConfigError::UnknownStrategy {
                key: key.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
