//! Short, collision-free aliases for joined sources.

use std::collections::HashMap;

/// Hands out aliases for display names: the first letter of the name,
/// suffixed with a counter when another name already took that letter.
///
/// One registry lives for exactly one compile call.
#[derive(Debug, Default, Clone)]
pub struct AliasRegistry {
    assigned: HashMap<String, String>,
    taken: HashMap<String, usize>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for `name`; the same name always gets the same alias.
    pub fn alias_for(&mut self, name: &str) -> String {
        if let Some(alias) = self.assigned.get(name) {
            return alias.clone();
        }

        let prefix: String = name.chars().take(1).collect();
        let count = self.taken.entry(prefix.clone()).or_insert(0);
        let alias = if *count == 0 {
            prefix
        } else {
            format!("{}{}", prefix, count)
        };
        *count += 1;

        self.assigned.insert(name.to_string(), alias.clone());
        alias
    }

    /// Alias already assigned to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.assigned.get(name).map(String::as_str)
    }
}
