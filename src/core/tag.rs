//! Hierarchical tags
//!
//! Dot-delimited identifiers ("Simulator.MiniGame.Type.Lockpick") interned
//! into a process-wide table. A `Tag` is a `Copy` index, so equality and
//! hashing are O(1). Parent links are resolved once at intern time, which
//! makes hierarchical matching a walk over a few integers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use ahash::AHashMap;

/// Interned hierarchical tag. `Tag::NONE` is the invalid/empty tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

struct TagEntry {
    name: Arc<str>,
    parent: Option<u32>,
}

struct TagTable {
    entries: Vec<TagEntry>,
    by_name: AHashMap<Arc<str>, u32>,
}

impl TagTable {
    fn new() -> Self {
        // Slot 0 is reserved for the empty tag
        let empty: Arc<str> = Arc::from("");
        let mut by_name = AHashMap::new();
        by_name.insert(empty.clone(), 0);
        Self {
            entries: vec![TagEntry { name: empty, parent: None }],
            by_name,
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }

        let parent = name
            .rfind('.')
            .map(|split| self.intern(&name[..split]));

        let index = self.entries.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.entries.push(TagEntry { name: name.clone(), parent });
        self.by_name.insert(name, index);
        index
    }
}

fn table() -> &'static RwLock<TagTable> {
    static TABLE: OnceLock<RwLock<TagTable>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(TagTable::new()))
}

impl Tag {
    /// The empty tag. Never matches anything, including itself via `matches`.
    pub const NONE: Tag = Tag(0);

    /// Intern a dotted tag name. Surrounding whitespace and stray dots are
    /// trimmed; an empty name yields `Tag::NONE`.
    pub fn new(name: &str) -> Self {
        let name = name.trim().trim_matches('.');
        if name.is_empty() {
            return Self::NONE;
        }

        if let Ok(guard) = table().read() {
            if let Some(&index) = guard.by_name.get(name) {
                return Tag(index);
            }
        }

        match table().write() {
            Ok(mut guard) => Tag(guard.intern(name)),
            Err(poisoned) => Tag(poisoned.into_inner().intern(name)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Full dotted name of this tag
    pub fn name(&self) -> Arc<str> {
        match table().read() {
            Ok(guard) => guard.entries[self.0 as usize].name.clone(),
            Err(poisoned) => poisoned.into_inner().entries[self.0 as usize].name.clone(),
        }
    }

    /// Immediate parent ("a.b.c" -> "a.b"), or `None` for a root tag
    pub fn parent(&self) -> Option<Tag> {
        let parent = match table().read() {
            Ok(guard) => guard.entries[self.0 as usize].parent,
            Err(poisoned) => poisoned.into_inner().entries[self.0 as usize].parent,
        };
        parent.map(Tag)
    }

    /// True when `self` is `query` or a descendant of it.
    ///
    /// "Input.Numpad.1".matches("Input.Numpad") is true; the reverse is not.
    pub fn matches(&self, query: &Tag) -> bool {
        if !self.is_valid() || !query.is_valid() {
            return false;
        }

        let mut current = Some(*self);
        while let Some(tag) = current {
            if tag == *query {
                return true;
            }
            current = tag.parent();
        }
        false
    }

    pub fn matches_exact(&self, query: &Tag) -> bool {
        self.is_valid() && self == query
    }

    /// True when this tag matches any tag in `set`
    pub fn matches_any(&self, set: &[Tag]) -> bool {
        set.iter().any(|query| self.matches(query))
    }

    /// Last segment of the name ("Input.Numpad.7" -> "7")
    pub fn leaf(&self) -> String {
        let name = self.name();
        name.rsplit('.').next().unwrap_or_default().to_string()
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.name())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Tag::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let a = Tag::new("Test.Tag.Alpha");
        let b = Tag::new("Test.Tag.Alpha");
        assert_eq!(a, b);
        assert_eq!(&*a.name(), "Test.Tag.Alpha");
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(Tag::new(""), Tag::NONE);
        assert_eq!(Tag::new("  "), Tag::NONE);
        assert!(!Tag::NONE.is_valid());
    }

    #[test]
    fn test_hierarchical_match() {
        let child = Tag::new("Test.Input.Numpad.1");
        let parent = Tag::new("Test.Input.Numpad");
        let sibling = Tag::new("Test.Input.QTE");

        assert!(child.matches(&parent));
        assert!(!parent.matches(&child));
        assert!(!child.matches(&sibling));
        assert!(child.matches(&child));
        assert!(!child.matches_exact(&parent));
    }

    #[test]
    fn test_prefix_is_segment_based() {
        // "Test.Foo.Barn" must not match "Test.Foo.Bar"
        let tag = Tag::new("Test.Foo.Barn");
        assert!(!tag.matches(&Tag::new("Test.Foo.Bar")));
        assert!(tag.matches(&Tag::new("Test.Foo")));
    }

    #[test]
    fn test_none_never_matches() {
        assert!(!Tag::NONE.matches(&Tag::NONE));
        assert!(!Tag::new("Test.A").matches(&Tag::NONE));
    }

    #[test]
    fn test_parent_and_leaf() {
        let tag = Tag::new("Test.Input.Numpad.7");
        assert_eq!(tag.parent(), Some(Tag::new("Test.Input.Numpad")));
        assert_eq!(tag.leaf(), "7");
        assert_eq!(Tag::new("Root").parent(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let tag = Tag::new("Test.Serde.Tag");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"Test.Serde.Tag\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
