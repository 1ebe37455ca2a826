//! Case-normalized attribute catalog for one component.
//!
//! Declared monitoring intent may not match a component's attribute names
//! case-for-case. The catalog is built once per component from its
//! introspection result and answers lookups in O(1): an exact-name check
//! first, then a lower-cased fallback map, so an exact match always wins
//! over a case-toggle. Claimed entries are consumed and cannot be matched
//! twice.

use std::collections::HashMap;

use crate::source::AttributeInfo;

#[derive(Debug)]
pub struct AttributeCatalog {
    entries: Vec<Option<AttributeInfo>>,
    by_name: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl AttributeCatalog {
    pub fn new(infos: Vec<AttributeInfo>) -> Self {
        let mut by_name = HashMap::with_capacity(infos.len());
        let mut folded = HashMap::with_capacity(infos.len());
        for (index, info) in infos.iter().enumerate() {
            by_name.insert(info.name.clone(), index);
            // First declaration wins when two names fold to the same key.
            folded.entry(info.name.to_lowercase()).or_insert(index);
        }
        Self {
            entries: infos.into_iter().map(Some).collect(),
            by_name,
            folded,
        }
    }

    /// Non-consuming lookup: exact name first, case-folded second.
    pub fn peek(&self, name: &str) -> Option<&AttributeInfo> {
        let index = self.index_of(name)?;
        self.entries[index].as_ref()
    }

    /// Consume an entry by exact name.
    pub fn take_exact(&mut self, name: &str) -> Option<AttributeInfo> {
        let index = *self.by_name.get(name)?;
        self.remove(index)
    }

    /// Consume an entry by case-folded name.
    pub fn take_folded(&mut self, name: &str) -> Option<AttributeInfo> {
        let index = *self.folded.get(&name.to_lowercase())?;
        self.remove(index)
    }

    /// Remaining composite entries, in declaration order.
    pub fn composites(&self) -> impl Iterator<Item = &AttributeInfo> {
        self.entries
            .iter()
            .filter_map(Option::as_ref)
            .filter(|info| info.is_composite())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        match self.by_name.get(name) {
            Some(index) => Some(*index),
            None => self.folded.get(&name.to_lowercase()).copied(),
        }
    }

    fn remove(&mut self, index: usize) -> Option<AttributeInfo> {
        let info = self.entries[index].take()?;
        self.by_name.remove(&info.name);
        let fold_key = info.name.to_lowercase();
        if self.folded.get(&fold_key) == Some(&index) {
            self.folded.remove(&fold_key);
        }
        Some(info)
    }
}
