// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Plugin registry.
//!
//! One evaluator per tier number, iterated in ascending tier order by the
//! orchestrator. New tiers register without touching orchestration code.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::TierPlugin;

/// Registry of tier plugins keyed by tier number.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<u8, Arc<dyn TierPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. A plugin already holding the same tier number is
    /// replaced with a warning.
    pub fn register(&self, plugin: Arc<dyn TierPlugin>) {
        let tier = plugin.tier_number();
        let mut plugins = self.plugins.write();
        if let Some(existing) = plugins.get(&tier) {
            warn!(
                tier,
                old = existing.name(),
                new = plugin.name(),
                "replacing registered plugin for tier"
            );
        }
        debug!(tier, name = plugin.name(), "registered tier plugin");
        plugins.insert(tier, plugin);
    }

    /// Plugin registered for a tier number, if any.
    pub fn get(&self, tier: u8) -> Option<Arc<dyn TierPlugin>> {
        self.plugins.read().get(&tier).cloned()
    }

    /// Plugin looked up by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn TierPlugin>> {
        self.plugins
            .read()
            .values()
            .find(|plugin| plugin.name() == name)
            .cloned()
    }

    /// All plugins in ascending tier order.
    pub fn in_tier_order(&self) -> Vec<Arc<dyn TierPlugin>> {
        self.plugins.read().values().cloned().collect()
    }

    /// Registered (tier, name) pairs.
    pub fn list(&self) -> Vec<(u8, String)> {
        self.plugins
            .read()
            .iter()
            .map(|(tier, plugin)| (*tier, plugin.name().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvalError, TierContext, TierInput, TierOutput};
    use async_trait::async_trait;
    use peerjudge_core::Tier3Result;

    struct StubPlugin {
        name: &'static str,
        tier: u8,
    }

    #[async_trait]
    impl TierPlugin for StubPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn tier_number(&self) -> u8 {
            self.tier
        }

        async fn evaluate(
            &self,
            _input: &TierInput,
            _context: &TierContext,
        ) -> Result<TierOutput, EvalError> {
            Ok(TierOutput::Tier3(Tier3Result::neutral()))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(StubPlugin {
            name: "graph_metrics",
            tier: 3,
        }));
        registry.register(Arc::new(StubPlugin {
            name: "traditional_metrics",
            tier: 1,
        }));

        assert!(registry.get(1).is_some());
        assert!(registry.get(2).is_none());
        assert!(registry.get_by_name("graph_metrics").is_some());
    }

    #[test]
    fn test_iteration_is_tier_ordered() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(StubPlugin { name: "c", tier: 3 }));
        registry.register(Arc::new(StubPlugin { name: "a", tier: 1 }));
        registry.register(Arc::new(StubPlugin { name: "b", tier: 2 }));

        let tiers: Vec<u8> = registry
            .in_tier_order()
            .iter()
            .map(|plugin| plugin.tier_number())
            .collect();
        assert_eq!(tiers, vec![1, 2, 3]);
    }

    #[test]
    fn test_same_tier_replaces() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(StubPlugin { name: "old", tier: 1 }));
        registry.register(Arc::new(StubPlugin { name: "new", tier: 1 }));

        assert_eq!(registry.list(), vec![(1, "new".to_string())]);
    }
}
