use std::collections::HashMap;

use tracing::info;

use crate::transport::Transport;

/// Holds the transport adapters available to the delivery engine.
///
/// Transports are stored by their [`Transport::name`]; campaign definitions
/// select one by that name.
pub struct TransportRegistry {
    transports: HashMap<String, Box<dyn Transport + Send + Sync>>,
}

impl TransportRegistry {
    /// Create an empty registry with no transports.
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    /// Register a transport adapter.
    ///
    /// If a transport with the same name is already registered it is
    /// replaced.
    pub fn register(&mut self, transport: Box<dyn Transport + Send + Sync>) {
        let name = transport.name().to_string();
        info!(transport = %name, "registering transport adapter");
        self.transports.insert(name, transport);
    }

    /// Return the named transport, if it exists.
    pub fn get(&self, name: &str) -> Option<&(dyn Transport + Send + Sync)> {
        self.transports.get(name).map(|b| b.as_ref())
    }

    /// Names of all registered transports, sorted for deterministic output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transports.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{error::TransportError, types::OutboundDelivery};

    struct Named(&'static str);

    #[async_trait]
    impl Transport for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn send(&self, _delivery: &OutboundDelivery) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn registered_transports_are_found_by_name() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(Named("log")));
        registry.register(Box::new(Named("zalo")));

        assert!(registry.get("log").is_some());
        assert!(registry.get("zalo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["log", "zalo"]);
    }

    #[test]
    fn registering_the_same_name_replaces_the_adapter() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(Named("log")));
        registry.register(Box::new(Named("log")));
        assert_eq!(registry.names(), vec!["log"]);
    }
}
