//! Per-attribute mutation tracking.

use std::collections::BTreeSet;

/// Attribute of a [`Definition`](super::Definition) that can be marked as
/// explicitly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum Change {
    Class,
    Arguments,
    MethodCalls,
    Properties,
    Tags,
    Autowired,
    Lazy,
    Deprecated,
    Decorated,
    BindingType,
}

/// Set of attributes mutated since the definition was created.
///
/// The compiler uses this to tell an explicit `false` apart from a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    changed: BTreeSet<Change>,
}

impl Changes {
    pub fn mark(&mut self, change: Change) {
        self.changed.insert(change);
    }

    pub fn is_changed(&self, change: Change) -> bool {
        self.changed.contains(&change)
    }

    pub fn iter(&self) -> impl Iterator<Item = Change> + '_ {
        self.changed.iter().copied()
    }

    /// Replaces the whole set.
    pub fn set(&mut self, changes: impl IntoIterator<Item = Change>) {
        self.changed = changes.into_iter().collect();
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}
