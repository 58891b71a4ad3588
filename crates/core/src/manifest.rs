//! Ordered set of resource keys to pre-warm.

/// Resource keys that must be present in the current store.
///
/// Insertion order is kept; repeated keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    keys: Vec<String>,
}

impl Manifest {
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !out.contains(&key) {
                out.push(key);
            }
        }
        Self { keys: out }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
