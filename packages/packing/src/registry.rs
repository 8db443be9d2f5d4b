//! Name-keyed table of packing strategy constructors.

use std::collections::BTreeMap;

use tracing::debug;

use crate::strategies::{HighResPlusFullLowResPacking, SingleVideoPacking};
use crate::{PackingError, PackingStrategy};

/// Constructor for a fresh, uninitialized strategy.
pub type StrategyFactory = fn() -> Box<dyn PackingStrategy>;

/// Registry of packing strategies, looked up by name.
///
/// Every lookup returns a new strategy instance, so each generator owns its
/// strategy exclusively.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the strategies shipped with this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(HighResPlusFullLowResPacking::NAME, || {
            Box::new(HighResPlusFullLowResPacking::new())
        });
        registry.register(SingleVideoPacking::NAME, || Box::new(SingleVideoPacking::new()));
        registry
    }

    /// Register a strategy under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        let name = name.into();
        debug!(strategy = %name, "registered packing strategy");
        self.factories.insert(name, factory);
    }

    /// Create a new instance of the strategy registered as `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn PackingStrategy>, PackingError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PackingError::UnknownStrategy(name.to_string()))
    }

    /// Whether a strategy is registered as `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
