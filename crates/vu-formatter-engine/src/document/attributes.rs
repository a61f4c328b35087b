use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Attribute names mapped to values, in definition order.
///
/// Redefining a name keeps its original position; unsetting and defining it
/// again moves it to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: Vec<(String, String)>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Copy of this set without any attribute named in `excluded`.
    pub fn without(&self, excluded: &HashSet<String>) -> Self {
        self.entries
            .iter()
            .filter(|(k, _)| !excluded.contains(k))
            .cloned()
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k:?}=>{v:?}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for AttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = AttributeSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of attribute names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = AttributeSet::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    set.set(k, v);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One attribute definition attached to a node: `:name: value` or `:name!:`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub name: String,
    /// `None` unsets the attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AttributeEntry {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Replays attribute definitions in document order so that the attributes
/// visible at any node are known.
///
/// The parsed tree only carries the entries; it does not know what is in
/// effect at a given position. The tracker owns that state for one walk.
#[derive(Debug, Clone)]
pub struct AttributeTracker {
    visible: AttributeSet,
}

impl AttributeTracker {
    pub fn new(initial: AttributeSet) -> Self {
        Self { visible: initial }
    }

    pub fn playback(&mut self, entries: &[AttributeEntry]) {
        for entry in entries {
            match &entry.value {
                Some(value) => self.visible.set(entry.name.as_str(), value.as_str()),
                None => {
                    self.visible.unset(&entry.name);
                }
            }
        }
    }

    pub fn visible_attributes(&self) -> &AttributeSet {
        &self.visible
    }

    /// Attributes visible now whose names are not part of `baseline`.
    pub fn snapshot_minus(&self, baseline: &HashSet<String>) -> AttributeSet {
        self.visible.without(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(set: &AttributeSet) -> Vec<&str> {
        set.names().collect()
    }

    #[test]
    fn keeps_definition_order() {
        let set: AttributeSet = [("b", "1"), ("a", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(names(&set), vec!["b", "a", "c"]);
    }

    #[test]
    fn redefinition_keeps_position() {
        let mut set: AttributeSet = [("a", "1"), ("b", "2")].into_iter().collect();
        set.set("a", "3");
        assert_eq!(names(&set), vec!["a", "b"]);
        assert_eq!(set.get("a"), Some("3"));
    }

    #[test]
    fn unset_then_set_moves_to_end() {
        let mut set: AttributeSet = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(set.unset("a"), Some("1".to_string()));
        assert_eq!(set.unset("a"), None);
        set.set("a", "1");
        assert_eq!(names(&set), vec!["b", "a"]);
    }

    #[test]
    fn json_roundtrip_preserves_order() {
        let json = r#"{"zeta":"1","alpha":"","mid":"x"}"#;
        let set: AttributeSet = serde_json::from_str(json).unwrap();
        assert_eq!(names(&set), vec!["zeta", "alpha", "mid"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), json);
    }

    #[test]
    fn tracker_replays_entries() {
        let mut tracker = AttributeTracker::new([("doc", "1")].into_iter().collect());
        tracker.playback(&[
            AttributeEntry::set("VK_KHR_foo", ""),
            AttributeEntry::set("level", "2"),
        ]);
        tracker.playback(&[AttributeEntry::unset("level")]);

        let visible = tracker.visible_attributes();
        assert_eq!(names(visible), vec!["doc", "VK_KHR_foo"]);
    }

    #[test]
    fn snapshot_excludes_baseline() {
        let mut tracker =
            AttributeTracker::new([("doc", "1"), ("other", "2")].into_iter().collect());
        tracker.playback(&[AttributeEntry::set("local", "x"), AttributeEntry::set("doc", "9")]);

        let baseline: HashSet<String> = ["doc", "other"].iter().map(|s| s.to_string()).collect();
        let snapshot = tracker.snapshot_minus(&baseline);

        assert_eq!(snapshot.iter().collect::<Vec<_>>(), vec![("local", "x")]);
    }

    #[test]
    fn display_lists_pairs() {
        let set: AttributeSet = [("a", "1"), ("b", "")].into_iter().collect();
        assert_eq!(set.to_string(), r#"{"a"=>"1", "b"=>""}"#);
    }
}
