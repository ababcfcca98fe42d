//! Per-request atom sets and the lookup wrapper used for substitution.

use indexmap::IndexMap;

/// Rendered in place of any atom the request did not provide.
pub const PLACEHOLDER: &str = "-";

/// Ordered mapping of atom name to value for one request.
pub type Atoms = IndexMap<String, String>;

/// Read side of an atom set. Lookups never fail: unknown keys yield [`PLACEHOLDER`].
///
/// Keys are matched exactly first and then case-insensitively, so
/// `%({User-Agent}i)s` finds the stored `{user-agent}i`. Double quotes in
/// values are escaped on construction to keep quoted format fields balanced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeAtoms {
    values: Atoms,
}

impl SafeAtoms {
    pub fn new(atoms: Atoms) -> Self {
        let values = atoms
            .into_iter()
            .map(|(key, value)| (key, escape_quotes(&value)))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or(PLACEHOLDER)
    }

    /// Like [`get`](Self::get) but distinguishes absent keys.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        self.values
            .iter()
            .find(|(stored, _)| stored.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Set a value verbatim (no quote escaping), replacing any existing one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Return a copy with `f` applied to the value of `key`, if present.
    pub fn map_value<F: FnOnce(&str) -> String>(mut self, key: &str, f: F) -> Self {
        if let Some(value) = self.values.get_mut(key) {
            *value = f(value);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Atoms> for SafeAtoms {
    fn from(atoms: Atoms) -> Self {
        SafeAtoms::new(atoms)
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}
