// ABOUTME: Resolves a destination number to the carrier that serves it
// ABOUTME: Numbers are normalized to international form, then matched by longest national prefix

use crate::dispatch::config::GatewayConfig;
use crate::dispatch::error::DispatchError;

/// National numbering rules used for normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPlan {
    pub country_code: String,
    /// Digits after the country code.
    pub national_length: usize,
}

impl Default for NumberPlan {
    fn default() -> Self {
        Self {
            country_code: "233".to_string(),
            national_length: 9,
        }
    }
}

impl NumberPlan {
    /// International form of `number`, or `None` if it is not a number of
    /// this plan. Formatting characters such as `+`, spaces and dashes are
    /// ignored.
    ///
    /// ```
    /// use smpp_gateway::dispatch::NumberPlan;
    ///
    /// let plan = NumberPlan::default();
    /// assert_eq!(plan.normalize("024 123 4567").as_deref(), Some("233241234567"));
    /// assert_eq!(plan.normalize("+233241234567").as_deref(), Some("233241234567"));
    /// assert_eq!(plan.normalize("12345"), None);
    /// ```
    pub fn normalize(&self, number: &str) -> Option<String> {
        let digits: String = number.chars().filter(char::is_ascii_digit).collect();

        if let Some(national) = digits.strip_prefix('0') {
            if national.len() == self.national_length {
                return Some(format!("{}{national}", self.country_code));
            }
        }
        if let Some(national) = digits.strip_prefix(self.country_code.as_str()) {
            if national.len() == self.national_length {
                return Some(digits);
            }
        }
        None
    }

    /// National part of an already normalized number.
    fn national<'a>(&self, msisdn: &'a str) -> &'a str {
        msisdn.strip_prefix(self.country_code.as_str()).unwrap_or(msisdn)
    }
}

/// Where one destination goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub carrier: String,
    /// Destination in international form.
    pub msisdn: String,
    /// Whether the carrier was chosen by fallback rather than a prefix.
    pub fallback: bool,
}

/// Longest-prefix carrier lookup with a default carrier.
#[derive(Debug, Clone)]
pub struct Router {
    plan: NumberPlan,
    // Longest prefix first.
    prefixes: Vec<(String, String)>,
    default_carrier: String,
}

impl Router {
    pub fn new(
        plan: NumberPlan,
        prefixes: impl IntoIterator<Item = (String, String)>,
        default_carrier: impl Into<String>,
    ) -> Self {
        let mut prefixes: Vec<(String, String)> = prefixes.into_iter().collect();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self {
            plan,
            prefixes,
            default_carrier: default_carrier.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let plan = NumberPlan {
            country_code: config.dispatch.country_code.clone(),
            national_length: config.dispatch.national_length,
        };
        let prefixes = config.carriers.iter().flat_map(|(name, carrier)| {
            carrier
                .number_prefixes
                .iter()
                .map(move |prefix| (prefix.clone(), name.clone()))
        });
        Self::new(plan, prefixes, config.dispatch.default_carrier.as_str())
    }

    pub fn plan(&self) -> &NumberPlan {
        &self.plan
    }

    pub fn default_carrier(&self) -> &str {
        &self.default_carrier
    }

    /// Picks the carrier for `destination`.
    ///
    /// Numbers matching no prefix go to the default carrier; only numbers
    /// that cannot be normalized are an error.
    pub fn resolve(&self, destination: &str) -> Result<Route, DispatchError> {
        let msisdn = self
            .plan
            .normalize(destination)
            .ok_or_else(|| DispatchError::InvalidNumber(destination.to_string()))?;

        let national = self.plan.national(&msisdn);
        let matched = self
            .prefixes
            .iter()
            .find(|(prefix, _)| national.starts_with(prefix.as_str()));

        Ok(match matched {
            Some((_, carrier)) => Route {
                carrier: carrier.clone(),
                msisdn,
                fallback: false,
            },
            None => Route {
                carrier: self.default_carrier.clone(),
                msisdn,
                fallback: true,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        let prefixes = [
            ("24", "mtn"),
            ("54", "mtn"),
            ("20", "vodafone"),
            ("2", "glo"),
            ("245", "airteltigo"),
        ]
        .map(|(p, c)| (p.to_string(), c.to_string()));
        Router::new(NumberPlan::default(), prefixes, "mtn")
    }

    #[test]
    fn normalizes_national_and_international_forms() {
        let plan = NumberPlan::default();
        assert_eq!(plan.normalize("0241234567").as_deref(), Some("233241234567"));
        assert_eq!(plan.normalize("233241234567").as_deref(), Some("233241234567"));
        assert_eq!(plan.normalize("+233 (24) 123-4567").as_deref(), Some("233241234567"));
        assert_eq!(plan.normalize("241234567"), None);
        assert_eq!(plan.normalize("02412345678"), None);
        assert_eq!(plan.normalize(""), None);
    }

    #[test]
    fn prefix_24_resolves_to_mtn() {
        let route = router().resolve("233241234567").unwrap();
        assert_eq!(route.carrier, "mtn");
        assert_eq!(route.msisdn, "233241234567");
        assert!(!route.fallback);
    }

    #[test]
    fn longest_prefix_wins() {
        let router = router();
        assert_eq!(router.resolve("0245123456").unwrap().carrier, "airteltigo");
        assert_eq!(router.resolve("0201234567").unwrap().carrier, "vodafone");
        assert_eq!(router.resolve("0261234567").unwrap().carrier, "glo");
    }

    #[test]
    fn unmatched_numbers_fall_back_to_the_default_carrier() {
        let route = router().resolve("233991234567").unwrap();
        assert_eq!(route.carrier, "mtn");
        assert!(route.fallback);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = router().resolve("12345").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidNumber(n) if n == "12345"));
        assert!(!router().resolve("abc").unwrap_err().is_retryable());
    }

    #[test]
    fn builds_from_configuration() {
        let config =
            GatewayConfig::from_yaml(crate::dispatch::config::tests::SAMPLE).unwrap();
        let router = Router::from_config(&config);
        assert_eq!(router.default_carrier(), "mtn");
        assert_eq!(router.resolve("0501234567").unwrap().carrier, "vodafone");
        assert_eq!(router.resolve("0551234567").unwrap().carrier, "mtn");
    }
}
