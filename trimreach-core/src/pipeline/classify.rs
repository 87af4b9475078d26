//! Chain classification into report buckets.

use crate::index::IndexSpace;
use crate::method::{MethodInfo, NodeId};

/// Bucket for chains whose dangerous frame never resolved.
pub const RESOLUTION_FAILURE: &str = "resolution failure";

/// A chain matches when, for every needle, some frame contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: &'static str,
    pub all_of: &'static [&'static str],
}

/// Well-known chains that would otherwise swamp their namespace bucket.
pub const DEFAULT_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: "eventsource_customattributehelper",
        all_of: &["System.Diagnostics.Tracing.EventSource::GetCustomAttributeHelper"],
    },
    CategoryRule {
        category: "eventsource_traceloggingeventtypes",
        all_of: &[
            "EventSource::WriteEventWithRelatedActivityIdCore",
            "TraceLoggingEventTypes::.ctor(System.String",
        ],
    },
];

impl CategoryRule {
    pub fn matches(&self, frames: &[String]) -> bool {
        self.all_of
            .iter()
            .all(|needle| frames.iter().any(|f| f.contains(needle)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainClassifier {
    rules: &'static [CategoryRule],
}

impl Default for ChainClassifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES,
        }
    }
}

impl ChainClassifier {
    pub fn with_rules(rules: &'static [CategoryRule]) -> Self {
        Self { rules }
    }

    /// Rule match first, then the dangerous frame's namespace, then its
    /// declaring type when the namespace is empty.
    pub fn classify(&self, nodes: &[NodeId], frames: &[String], space: &IndexSpace<MethodInfo>) -> String {
        let Some(source) = nodes.first().and_then(|&n| space.method_of(n)) else {
            return RESOLUTION_FAILURE.to_string();
        };
        if let Some(rule) = self.rules.iter().find(|r| r.matches(frames)) {
            return rule.category.to_string();
        }
        if source.namespace.is_empty() {
            source.declaring_type.clone()
        } else {
            source.namespace.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodId;

    fn space() -> IndexSpace<MethodInfo> {
        let mut space = IndexSpace::new();
        for (id, ty, ns, sig) in [
            ("r", "System.Reflection.Assembly", "System.Reflection", "Load(System.String)"),
            ("g", "GlobalHelper", "", "Run()"),
            ("e", "System.Diagnostics.Tracing.EventSource", "System.Diagnostics.Tracing", "GetCustomAttributeHelper()"),
        ] {
            space.insert(
                &MethodId::new(id),
                MethodInfo {
                    id: MethodId::new(id),
                    name: sig.split('(').next().unwrap_or(sig).to_string(),
                    signature: sig.to_string(),
                    declaring_type: ty.to_string(),
                    namespace: ns.to_string(),
                    assembly: "Lib".to_string(),
                    is_public: false,
                    is_virtual: false,
                },
            );
        }
        space.intern(&MethodId::new("ghost"));
        space
    }

    fn frames(space: &IndexSpace<MethodInfo>, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|&n| space.method_of(n).map(MethodInfo::full_name))
            .collect()
    }

    #[test]
    fn test_namespace_of_dangerous_frame() {
        let space = space();
        let nodes = [0, 1];
        let c = ChainClassifier::default().classify(&nodes, &frames(&space, &nodes), &space);
        assert_eq!(c, "System.Reflection");
    }

    #[test]
    fn test_empty_namespace_uses_type_name() {
        let space = space();
        let nodes = [1, 0];
        let c = ChainClassifier::default().classify(&nodes, &frames(&space, &nodes), &space);
        assert_eq!(c, "GlobalHelper");
    }

    #[test]
    fn test_known_rule_wins() {
        let space = space();
        let nodes = [0, 2];
        let c = ChainClassifier::default().classify(&nodes, &frames(&space, &nodes), &space);
        assert_eq!(c, "eventsource_customattributehelper");
    }

    #[test]
    fn test_two_needle_rule_needs_both() {
        let rule = DEFAULT_RULES[1];
        let one = vec!["X.EventSource::WriteEventWithRelatedActivityIdCore(System.Int32)".to_string()];
        assert!(!rule.matches(&one));
        let both = vec![
            one[0].clone(),
            "X.TraceLoggingEventTypes::.ctor(System.String,System.Int32)".to_string(),
        ];
        assert!(rule.matches(&both));
    }

    #[test]
    fn test_unresolved_source_is_resolution_failure() {
        let space = space();
        let nodes = [3, 0];
        let c = ChainClassifier::default().classify(&nodes, &frames(&space, &nodes), &space);
        assert_eq!(c, RESOLUTION_FAILURE);
    }
}
