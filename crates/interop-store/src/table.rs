//! Name-indexed storage for one declaration category.

use rustc_hash::FxHashMap;

use interop_core::Declaration;

/// Committed entries of one category, in insertion order, with a name index.
///
/// The index may be stale while entries are appended with
/// [`push_unindexed`](Table::push_unindexed); [`rebuild_index`](Table::rebuild_index)
/// must run before the next lookup.
#[derive(Debug, Clone)]
pub struct Table<T> {
    entries: Vec<T>,
    index: FxHashMap<String, usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T: Declaration> Table<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.index.get(name).map(|&i| &mut self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Append and index an entry. The caller guarantees the name is new.
    pub fn insert(&mut self, entry: T) {
        self.index.insert(entry.name().to_string(), self.entries.len());
        self.entries.push(entry);
    }

    /// Append without touching the index.
    pub fn push_unindexed(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn rebuild_index(&mut self) {
        self.index.clear();
        self.index.reserve(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.name().to_string(), i);
        }
    }

    /// Remove by name, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let position = self.index.remove(name)?;
        let removed = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    /// Mutable access to the entries. Names must not change.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::NativeConstant;

    fn table(names: &[&str]) -> Table<NativeConstant> {
        let mut t = Table::default();
        for name in names {
            t.insert(NativeConstant::new(*name, "1"));
        }
        t
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let t = table(&["WM_PAINT"]);
        assert!(t.get("WM_PAINT").is_some());
        assert!(t.get("wm_paint").is_none());
    }

    #[test]
    fn remove_keeps_order_and_index() {
        let mut t = table(&["A", "B", "C"]);
        assert_eq!(t.remove("A").map(|c| c.name), Some("A".to_string()));
        let names: Vec<_> = t.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["B", "C"]);
        assert_eq!(t.get("C").map(|c| c.name.as_str()), Some("C"));
        assert!(t.remove("A").is_none());
    }

    #[test]
    fn unindexed_entries_need_rebuild() {
        let mut t = Table::default();
        t.push_unindexed(NativeConstant::new("A", "1"));
        assert!(t.get("A").is_none());
        t.rebuild_index();
        assert!(t.get("A").is_some());
    }
}
