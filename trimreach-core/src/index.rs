//! Bijective mapping between method identities and dense node indices.
//!
//! Indices are assigned once, in first-seen order, and never removed. A
//! node may exist without metadata: edges can reference methods the graph
//! builder failed to resolve, and those indices map to `None`.

use std::collections::HashMap;

use crate::method::{MethodId, MethodInfo, NodeId};

/// Dense index space over every method referenced by the program graph.
#[derive(Debug, Clone)]
pub struct IndexSpace<M = MethodInfo> {
    ids: Vec<MethodId>,
    methods: Vec<Option<M>>,
    lookup: HashMap<MethodId, NodeId>,
}

impl<M> Default for IndexSpace<M> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            methods: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<M> IndexSpace<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `id`, assigning the next free one if unseen.
    pub fn intern(&mut self, id: &MethodId) -> NodeId {
        if let Some(&index) = self.lookup.get(id) {
            return index;
        }
        let index = self.ids.len() as NodeId;
        self.ids.push(id.clone());
        self.methods.push(None);
        self.lookup.insert(id.clone(), index);
        index
    }

    /// Interns `id` and attaches its metadata. Existing metadata is kept.
    pub fn insert(&mut self, id: &MethodId, method: M) -> NodeId {
        let index = self.intern(id);
        let slot = &mut self.methods[index as usize];
        if slot.is_none() {
            *slot = Some(method);
        }
        index
    }

    pub fn index_of(&self, id: &MethodId) -> Option<NodeId> {
        self.lookup.get(id).copied()
    }

    /// Metadata for `index`, or `None` when the method never resolved.
    pub fn method_of(&self, index: NodeId) -> Option<&M> {
        self.methods.get(index as usize).and_then(Option::as_ref)
    }

    pub fn id_of(&self, index: NodeId) -> Option<&MethodId> {
        self.ids.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of indices that carry metadata.
    pub fn resolved_count(&self) -> usize {
        self.methods.iter().filter(|m| m.is_some()).count()
    }

    /// Iterates resolved methods with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &M)> {
        self.methods
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.as_ref().map(|m| (i as NodeId, m)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut space: IndexSpace<String> = IndexSpace::new();
        let a = space.intern(&"a".into());
        let b = space.intern(&"b".into());
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(space.intern(&"a".into()), 0);
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn test_unresolved_index_maps_to_none() {
        let mut space: IndexSpace<String> = IndexSpace::new();
        let known = space.insert(&"known".into(), "Known::M()".to_string());
        let unknown = space.intern(&"unknown".into());

        assert_eq!(space.method_of(known).map(String::as_str), Some("Known::M()"));
        assert!(space.method_of(unknown).is_none());
        assert!(space.method_of(99).is_none());
        assert_eq!(space.resolved_count(), 1);
    }

    #[test]
    fn test_insert_after_intern_attaches_metadata() {
        let mut space: IndexSpace<String> = IndexSpace::new();
        let idx = space.intern(&"late".into());
        assert_eq!(space.insert(&"late".into(), "Late::M()".to_string()), idx);
        assert_eq!(space.method_of(idx).map(String::as_str), Some("Late::M()"));
        assert_eq!(space.id_of(idx).map(MethodId::as_str), Some("late"));
    }

    #[test]
    fn test_iter_skips_unresolved() {
        let mut space: IndexSpace<String> = IndexSpace::new();
        space.insert(&"a".into(), "A".to_string());
        space.intern(&"b".into());
        space.insert(&"c".into(), "C".to_string());
        let seen: Vec<NodeId> = space.iter().map(|(i, _)| i).collect();
        assert_eq!(seen, vec![0, 2]);
    }
}
