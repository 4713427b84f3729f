//! Request classification
//!
//! Labels inbound requests as business traffic or infrastructure noise
//! using an ordered, first-match-wins rule set: noise paths, probe
//! user-agents, then monitoring identities. Classification is pure and
//! idempotent; the rule set carries a version so cached labels can be
//! invalidated when rules change.

use crate::config::ClassifierConfig;
use crate::models::{Classification, RequestClass, RequestRecord};
use std::collections::HashSet;

/// Deterministic request classifier.
pub struct RequestClassifier {
    noise_paths: HashSet<String>,
    probe_agent_prefixes: Vec<String>,
    monitoring_identities: HashSet<String>,
    rules_version: u64,
}

impl RequestClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self::with_version(config, 1)
    }

    /// Build a classifier carrying an explicit rules version. Callers that
    /// swap rule sets at runtime bump the version so stale cached labels
    /// are recomputed on the next read.
    pub fn with_version(config: ClassifierConfig, rules_version: u64) -> Self {
        Self {
            noise_paths: config.noise_paths.into_iter().collect(),
            probe_agent_prefixes: config
                .probe_agent_prefixes
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            monitoring_identities: config.monitoring_identities.into_iter().collect(),
            rules_version,
        }
    }

    /// Version of the active rule set.
    pub fn rules_version(&self) -> u64 {
        self.rules_version
    }

    /// Classify a request. Rules are evaluated in order; the first match
    /// wins. No side effects.
    pub fn classify(&self, record: &RequestRecord) -> RequestClass {
        if self.noise_paths.contains(strip_query(&record.path)) {
            return RequestClass::Noise;
        }

        let agent = record.user_agent.to_ascii_lowercase();
        if self
            .probe_agent_prefixes
            .iter()
            .any(|prefix| agent.starts_with(prefix.as_str()))
        {
            return RequestClass::Noise;
        }

        if self.monitoring_identities.contains(&record.source_identity) {
            return RequestClass::Noise;
        }

        RequestClass::Business
    }

    /// Classification paired with the rules version it was computed under,
    /// as cached on stored records.
    pub fn classification_for(&self, record: &RequestRecord) -> Classification {
        Classification {
            class: self.classify(record),
            rules_version: self.rules_version,
        }
    }

    /// Whether a cached classification is still valid under the active
    /// rule set.
    pub fn is_current(&self, classification: &Classification) -> bool {
        classification.rules_version == self.rules_version
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

fn strip_query(path: &str) -> &str {
    match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, identity: &str, agent: &str) -> RequestRecord {
        RequestRecord::new(1704067200, path, identity, agent)
    }

    #[test]
    fn test_noise_path() {
        let classifier = RequestClassifier::default();
        for path in ["/health", "/healthz", "/ping", "/metrics", "/ready", "/live"] {
            let r = record(path, "10.0.0.1", "curl/8.0");
            assert_eq!(classifier.classify(&r), RequestClass::Noise, "path {path}");
        }
    }

    #[test]
    fn test_noise_path_with_query_string() {
        let classifier = RequestClassifier::default();
        let r = record("/health?verbose=1", "10.0.0.1", "curl/8.0");
        assert_eq!(classifier.classify(&r), RequestClass::Noise);
    }

    #[test]
    fn test_probe_user_agent() {
        let classifier = RequestClassifier::default();
        let r = record("/api/orders", "10.0.0.1", "kube-probe/1.28");
        assert_eq!(classifier.classify(&r), RequestClass::Noise);

        let r = record("/api/orders", "10.0.0.1", "ELB-HealthChecker/2.0");
        assert_eq!(classifier.classify(&r), RequestClass::Noise);
    }

    #[test]
    fn test_probe_user_agent_case_insensitive() {
        let classifier = RequestClassifier::default();
        let r = record("/api/orders", "10.0.0.1", "Kube-Probe/1.28");
        assert_eq!(classifier.classify(&r), RequestClass::Noise);
    }

    #[test]
    fn test_monitoring_identity() {
        let config = ClassifierConfig {
            monitoring_identities: vec!["monitoring-sa".to_string()],
            ..ClassifierConfig::default()
        };
        let classifier = RequestClassifier::new(config);
        let r = record("/api/orders", "monitoring-sa", "Mozilla/5.0");
        assert_eq!(classifier.classify(&r), RequestClass::Noise);
    }

    #[test]
    fn test_business_fallthrough() {
        let classifier = RequestClassifier::default();
        let r = record("/api/orders", "10.0.0.1", "Mozilla/5.0");
        assert_eq!(classifier.classify(&r), RequestClass::Business);
    }

    #[test]
    fn test_classification_idempotent() {
        let classifier = RequestClassifier::default();
        let r = record("/api/orders", "10.0.0.1", "Mozilla/5.0");
        let first = classifier.classify(&r);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&r), first);
        }
    }

    #[test]
    fn test_rules_version_invalidation() {
        let classifier = RequestClassifier::default();
        let r = record("/api/orders", "10.0.0.1", "Mozilla/5.0");
        let cached = classifier.classification_for(&r);
        assert!(classifier.is_current(&cached));

        let updated = RequestClassifier::with_version(ClassifierConfig::default(), 2);
        assert!(!updated.is_current(&cached));
    }
}
