use std::collections::HashMap;
use std::sync::OnceLock;

use super::Parameter;

/// Collections at or above this size resolve names through memoized maps.
pub const LOOKUP_THRESHOLD: usize = 5;

/// Strip one leading `:` or `@` from a parameter name.
#[must_use]
pub fn strip_sigil(name: &str) -> &str {
    name.strip_prefix([':', '@']).unwrap_or(name)
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Lazily built name -> index maps, first occurrence wins.
#[derive(Debug, Default)]
pub(super) struct NameLookup {
    exact: OnceLock<HashMap<String, usize>>,
    folded: OnceLock<HashMap<String, usize>>,
}

impl NameLookup {
    pub(super) fn invalidate(&mut self) {
        self.exact.take();
        self.folded.take();
    }

    /// Exact match preferred, case-insensitive otherwise.
    pub(super) fn index_of(&self, items: &[Parameter], name: &str) -> Option<usize> {
        let wanted = strip_sigil(name.trim());
        if items.len() < LOOKUP_THRESHOLD {
            let wanted_folded = fold(wanted);
            let first = items
                .iter()
                .position(|p| fold(p.clean_name()) == wanted_folded)?;
            let exact = items[first..]
                .iter()
                .position(|p| p.clean_name() == wanted)
                .map(|offset| first + offset);
            return Some(exact.unwrap_or(first));
        }

        let exact = self.exact.get_or_init(|| build(items, str::to_string));
        if let Some(&idx) = exact.get(wanted) {
            return Some(idx);
        }
        let folded = self.folded.get_or_init(|| build(items, fold));
        folded.get(&fold(wanted)).copied()
    }

    #[cfg(test)]
    fn is_built(&self) -> bool {
        self.exact.get().is_some()
    }
}

fn build(items: &[Parameter], key: impl Fn(&str) -> String) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(items.len());
    for (idx, param) in items.iter().enumerate() {
        map.entry(key(param.clean_name())).or_insert(idx);
    }
    map
}
