//! Settings keys and pure resolution of the listener and strategy
//! properties.
//!
//! Resolution takes a [`ConfigSource`] and returns plain data: the resolved
//! value plus any deprecation notices reading it produced. Resolution never
//! logs and never mutates anything, which keeps every key combination
//! unit-testable; the coordinator decides what to do with the notices.

use crate::config::{self, ConfigSource};
use crate::error::ConfigError;
use std::fmt;

/// Current toggle for listener-driven indexing. Default: true.
pub const INDEXING_LISTENERS_ENABLED: &str = "indexing.listeners.enabled";

/// Deprecated alias of [`INDEXING_LISTENERS_ENABLED`].
pub const AUTOMATIC_INDEXING_ENABLED: &str = "automatic_indexing.enabled";

/// Deprecated name-valued toggle: `none` disables listeners, `session`
/// enables them.
pub const AUTOMATIC_INDEXING_STRATEGY: &str = "automatic_indexing.strategy";

/// Deprecated dirty-check tuning flag. Default: true.
pub const AUTOMATIC_INDEXING_ENABLE_DIRTY_CHECK: &str = "automatic_indexing.enable_dirty_check";

/// Current selector for the synchronization strategy.
pub const INDEXING_PLAN_SYNCHRONIZATION_STRATEGY: &str = "indexing.plan.synchronization.strategy";

/// Deprecated alias of [`INDEXING_PLAN_SYNCHRONIZATION_STRATEGY`].
pub const AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY: &str =
    "automatic_indexing.synchronization.strategy";

/// Strategy name resolved when no selector is set.
pub const DEFAULT_SYNCHRONIZATION_STRATEGY: &str = "write-sync";

/// Default for the listener toggles.
pub const DEFAULT_LISTENERS_ENABLED: bool = true;

/// Default for the dirty-check flag.
pub const DEFAULT_DIRTY_CHECK: bool = true;

/// A resolved value plus the deprecation notices reading it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub warnings: Vec<DeprecationNotice>,
}

/// Deprecation notices produced while resolving settings.
///
/// Notices are data, not errors: resolution succeeds regardless, and
/// operational tooling matches on the exact rendered messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeprecationNotice {
    /// A deprecated property was used instead of its replacement.
    PropertyRenamed {
        deprecated: String,
        replacement: String,
    },

    /// The deprecated strategy selector was used.
    SynchronizationStrategyRenamed {
        deprecated: String,
        replacement: String,
    },

    /// The deprecated dirty-check flag was set to a non-default value.
    DirtyCheckDeprecated { key: String },
}

impl fmt::Display for DeprecationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeprecationNotice::PropertyRenamed {
                deprecated,
                replacement,
            } => write!(
                f,
                "configuration property '{deprecated}' is deprecated; use '{replacement}' instead"
            ),
            DeprecationNotice::SynchronizationStrategyRenamed {
                deprecated,
                replacement,
            } => write!(
                f,
                "configuration property '{deprecated}' is deprecated; use '{replacement}' instead (strategy names are unchanged)"
            ),
            DeprecationNotice::DirtyCheckDeprecated { key } => write!(
                f,
                "configuration property '{key}' is deprecated; dirty checking will always be enabled and the property will be removed"
            ),
        }
    }
}

/// Resolved listener registration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerSettings {
    /// Whether entity-change listeners are registered at all.
    pub enabled: bool,

    /// Whether registered listeners skip reindexing when the changed
    /// fields cannot affect the index.
    pub dirty_check_enabled: bool,
}

/// Which synchronization strategy the coordinator should install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategySelection {
    /// Queue-backed indexing forces write-sync behavior; the resolver is
    /// bypassed entirely.
    ForcedWriteSync,

    /// Resolve `name` through the strategy resolver. `key` is the full
    /// property name the value came from, for error messages.
    Resolve { name: String, key: String },
}

/// Resolves the listener toggles.
///
/// The deprecated boolean alias wins over the current key (setting both is
/// a hard error, even when the values agree). When the result so far is
/// enabled, the deprecated name-valued toggle may still disable it; it is
/// not read at all otherwise. The dirty-check flag is read only when
/// listeners end up enabled and never gates registration.
pub fn resolve_listener_settings(
    source: &dyn ConfigSource,
) -> Result<Resolved<ListenerSettings>, ConfigError> {
    let legacy = config::get_bool(source, AUTOMATIC_INDEXING_ENABLED)?;
    let current = config::get_bool(source, INDEXING_LISTENERS_ENABLED)?;

    if legacy.is_some() && current.is_some() {
        return Err(ConfigError::AmbiguousListenerFlags {
            current: source.describe_key(INDEXING_LISTENERS_ENABLED),
            legacy: source.describe_key(AUTOMATIC_INDEXING_ENABLED),
        });
    }

    let mut warnings = Vec::new();
    let mut enabled = if let Some(value) = legacy {
        warnings.push(DeprecationNotice::PropertyRenamed {
            deprecated: source.describe_key(AUTOMATIC_INDEXING_ENABLED),
            replacement: source.describe_key(INDEXING_LISTENERS_ENABLED),
        });
        value
    } else if let Some(value) = current {
        value
    } else {
        DEFAULT_LISTENERS_ENABLED
    };

    // The name-valued toggle can only keep or revoke an enabled state.
    if enabled {
        if let Some(name) = config::get_string(source, AUTOMATIC_INDEXING_STRATEGY) {
            warnings.push(DeprecationNotice::PropertyRenamed {
                deprecated: source.describe_key(AUTOMATIC_INDEXING_STRATEGY),
                replacement: source.describe_key(INDEXING_LISTENERS_ENABLED),
            });
            enabled = match name.as_str() {
                "none" => false,
                "session" => true,
                _ => {
                    return Err(ConfigError::InvalidStrategyName {
                        key: source.describe_key(AUTOMATIC_INDEXING_STRATEGY),
                        raw: name,
                    });
                }
            };
        }
    }

    let mut dirty_check_enabled = DEFAULT_DIRTY_CHECK;
    if enabled {
        if let Some(value) = config::get_bool(source, AUTOMATIC_INDEXING_ENABLE_DIRTY_CHECK)? {
            if value != DEFAULT_DIRTY_CHECK {
                warnings.push(DeprecationNotice::DirtyCheckDeprecated {
                    key: source.describe_key(AUTOMATIC_INDEXING_ENABLE_DIRTY_CHECK),
                });
            }
            dirty_check_enabled = value;
        }
    }

    Ok(Resolved {
        value: ListenerSettings {
            enabled,
            dirty_check_enabled,
        },
        warnings,
    })
}

/// Resolves which synchronization strategy to install.
///
/// The ambiguity check runs first, so setting both selectors is reported
/// as such even when queue-backed indexing would reject either key anyway.
pub fn resolve_strategy_selection(
    source: &dyn ConfigSource,
    uses_queue: bool,
) -> Result<Resolved<StrategySelection>, ConfigError> {
    let legacy = config::get_string(source, AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY);
    let current = config::get_string(source, INDEXING_PLAN_SYNCHRONIZATION_STRATEGY);

    if legacy.is_some() && current.is_some() {
        return Err(ConfigError::AmbiguousStrategyKeys {
            current: source.describe_key(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY),
            legacy: source.describe_key(AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY),
        });
    }

    if uses_queue {
        if legacy.is_some() {
            return Err(ConfigError::StrategyConfiguredWithQueue {
                key: source.describe_key(AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY),
            });
        }
        if current.is_some() {
            return Err(ConfigError::StrategyConfiguredWithQueue {
                key: source.describe_key(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY),
            });
        }
        return Ok(Resolved {
            value: StrategySelection::ForcedWriteSync,
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    let (name, key) = if let Some(name) = legacy {
        warnings.push(DeprecationNotice::SynchronizationStrategyRenamed {
            deprecated: source.describe_key(AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY),
            replacement: source.describe_key(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY),
        });
        (
            name,
            source.describe_key(AUTOMATIC_INDEXING_SYNCHRONIZATION_STRATEGY),
        )
    } else if let Some(name) = current {
        (
            name,
            source.describe_key(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY),
        )
    } else {
        (
            DEFAULT_SYNCHRONIZATION_STRATEGY.to_string(),
            source.describe_key(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY),
        )
    };

    Ok(Resolved {
        value: StrategySelection::Resolve { name, key },
        warnings,
    })
}
