//! Per-namespace coverage: how many declaring types expose at least one
//! reported chain, against how many types the namespace has.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::index::IndexSpace;
use crate::method::MethodInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceCoverage {
    pub namespace: String,
    pub hit_types: usize,
    pub total_types: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    /// Namespaces with hits by descending hit count, then zero-hit
    /// namespaces alphabetically.
    pub namespaces: Vec<NamespaceCoverage>,
}

impl CoverageSummary {
    pub fn hit_namespaces(&self) -> impl Iterator<Item = &NamespaceCoverage> {
        self.namespaces.iter().filter(|n| n.hit_types > 0)
    }

    /// `ns: hits / total` lines, in summary order.
    pub fn lines(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .map(|n| format!("{}: {} / {}", n.namespace, n.hit_types, n.total_types))
            .collect()
    }
}

/// Collects hit types as chains are reported.
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    hits: BTreeMap<String, BTreeSet<String>>,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the declaring type of a chain's entry method.
    pub fn record(&mut self, entry: &MethodInfo) {
        if entry.namespace.is_empty() {
            return;
        }
        self.hits
            .entry(entry.namespace.clone())
            .or_default()
            .insert(entry.declaring_type.clone());
    }

    pub fn summarize(&self, space: &IndexSpace<MethodInfo>) -> CoverageSummary {
        let mut totals: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (_, method) in space.iter() {
            if !method.namespace.is_empty() {
                totals
                    .entry(method.namespace.as_str())
                    .or_default()
                    .insert(method.declaring_type.as_str());
            }
        }

        let mut hit: Vec<NamespaceCoverage> = self
            .hits
            .iter()
            .map(|(ns, types)| NamespaceCoverage {
                namespace: ns.clone(),
                hit_types: types.len(),
                total_types: totals.get(ns.as_str()).map(BTreeSet::len).unwrap_or(types.len()),
            })
            .collect();
        hit.sort_by(|a, b| b.hit_types.cmp(&a.hit_types).then_with(|| a.namespace.cmp(&b.namespace)));

        let zero = totals
            .iter()
            .filter(|(ns, _)| !self.hits.contains_key(**ns))
            .map(|(ns, types)| NamespaceCoverage {
                namespace: ns.to_string(),
                hit_types: 0,
                total_types: types.len(),
            });

        CoverageSummary {
            namespaces: hit.into_iter().chain(zero).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodId;

    fn method(id: &str, ty: &str, ns: &str) -> MethodInfo {
        MethodInfo {
            id: MethodId::new(id),
            name: "M".into(),
            signature: "M()".into(),
            declaring_type: ty.into(),
            namespace: ns.into(),
            assembly: "Lib".into(),
            is_public: true,
            is_virtual: false,
        }
    }

    #[test]
    fn test_summary_order_and_counts() {
        let methods = [
            method("1", "Net.Http", "Net"),
            method("2", "Net.Sockets", "Net"),
            method("3", "Net.Sockets", "Net"),
            method("4", "Xml.Reader", "Xml"),
            method("5", "Xml.Writer", "Xml"),
            method("6", "Alpha.A", "Alpha"),
            method("7", "Global", ""),
        ];
        let mut space = IndexSpace::new();
        for m in &methods {
            space.insert(&m.id, m.clone());
        }

        let mut tracker = CoverageTracker::new();
        tracker.record(&methods[3]);
        tracker.record(&methods[4]);
        tracker.record(&methods[1]);
        tracker.record(&methods[2]);
        tracker.record(&methods[6]);

        let summary = tracker.summarize(&space);
        assert_eq!(
            summary.lines(),
            vec!["Xml: 2 / 2", "Net: 1 / 2", "Alpha: 0 / 1"]
        );
        assert_eq!(summary.hit_namespaces().count(), 2);
    }
}
