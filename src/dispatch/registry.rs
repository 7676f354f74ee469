// ABOUTME: Read-only carrier table built from configuration
// ABOUTME: Looks carriers up by name for outbound links and by credentials for inbound binds

use crate::dispatch::config::{CarrierConfig, GatewayConfig};
use crate::server::Authenticator;
use std::collections::{BTreeMap, HashMap};

/// Carrier configurations keyed by carrier name.
#[derive(Debug, Clone, Default)]
pub struct CarrierRegistry {
    carriers: BTreeMap<String, CarrierConfig>,
    by_system_id: HashMap<String, String>,
}

impl CarrierRegistry {
    pub fn new(carriers: BTreeMap<String, CarrierConfig>) -> Self {
        let by_system_id = carriers
            .iter()
            .map(|(name, carrier)| (carrier.system_id.clone(), name.clone()))
            .collect();
        Self {
            carriers,
            by_system_id,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.carriers.clone())
    }

    pub fn get(&self, carrier: &str) -> Option<&CarrierConfig> {
        self.carriers.get(carrier)
    }

    pub fn contains(&self, carrier: &str) -> bool {
        self.carriers.contains_key(carrier)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.carriers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }
}

impl Authenticator for CarrierRegistry {
    /// Exact match on both system id and password.
    fn authenticate(&self, system_id: &str, password: &str) -> Option<String> {
        let carrier = self.by_system_id.get(system_id)?;
        let config = self.carriers.get(carrier)?;
        (config.password == password).then(|| carrier.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::config::tests::SAMPLE;

    fn registry() -> CarrierRegistry {
        CarrierRegistry::from_config(&GatewayConfig::from_yaml(SAMPLE).unwrap())
    }

    #[test]
    fn credentials_resolve_to_their_carrier() {
        let registry = registry();
        assert_eq!(
            registry.authenticate("mtn_smpp_user", "mtnpass1").as_deref(),
            Some("mtn")
        );
        assert_eq!(
            registry.authenticate("vf_smpp_user", "vfpass12").as_deref(),
            Some("vodafone")
        );
    }

    #[test]
    fn wrong_or_partial_credentials_are_rejected() {
        let registry = registry();
        assert_eq!(registry.authenticate("mtn_smpp_user", "vfpass12"), None);
        assert_eq!(registry.authenticate("mtn_smpp_user", "mtnpass"), None);
        assert_eq!(registry.authenticate("MTN_SMPP_USER", "mtnpass1"), None);
        assert_eq!(registry.authenticate("", ""), None);
    }

    #[test]
    fn lookup_by_name() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("vodafone"));
        assert_eq!(registry.get("mtn").unwrap().port, 5016);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["mtn", "vodafone"]);
    }
}
