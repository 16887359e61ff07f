use std::fmt::{self, Display, Formatter};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Value attached to a flag.
///
/// Flags without values are stored as an empty scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptValue {
    Scalar(String),
    List(Vec<String>),
    /// Sub-binding carried by a `bind` statement, e.g. `-monitorName m1 -weight 2`.
    Nested(OptionMap),
}

impl OptValue {
    /// First scalar value, if there is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptValue::Scalar(s) => Some(s.as_str()),
            OptValue::List(items) => items.first().map(String::as_str),
            OptValue::Nested(map) => map.get_str("name"),
        }
    }

    /// All scalar values in order. Nested maps yield their `name`.
    pub fn values(&self) -> Vec<&str> {
        match self {
            OptValue::Scalar(s) => vec![s.as_str()],
            OptValue::List(items) => items.iter().map(String::as_str).collect(),
            OptValue::Nested(map) => map.get_str("name").into_iter().collect(),
        }
    }

    pub fn as_map(&self) -> Option<&OptionMap> {
        match self {
            OptValue::Nested(map) => Some(map),
            _ => None,
        }
    }

    fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            OptValue::Scalar(values.remove(0))
        } else if values.is_empty() {
            OptValue::Scalar(String::new())
        } else {
            OptValue::List(values)
        }
    }
}

impl Display for OptValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OptValue::Scalar(s) => write!(f, "{s}"),
            OptValue::List(items) => write!(f, "{}", items.join(" ")),
            OptValue::Nested(map) => {
                let mut first = true;
                for (key, value) in map.iter() {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    if key == "name" {
                        write!(f, "{value}")?;
                    } else {
                        write!(f, "{key} {value}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Insertion-ordered flag map with ASCII case-insensitive lookup.
///
/// Keys keep their leading `-` and their spelling from the source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap {
    entries: Vec<(String, OptValue)>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&OptValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// First scalar value of `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: OptValue) {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add values to `key`, collapsing repeats into a list.
    pub fn append(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        let Some(idx) = self.position(&key) else {
            self.entries.push((key, OptValue::from_values(values)));
            return;
        };

        let slot = &mut self.entries[idx].1;
        let mut merged: Vec<String> = match std::mem::replace(slot, OptValue::List(vec![])) {
            OptValue::Scalar(s) if s.is_empty() => Vec::new(),
            OptValue::Scalar(s) => vec![s],
            OptValue::List(items) => items,
            OptValue::Nested(map) => map.get_str("name").map(str::to_string).into_iter().collect(),
        };
        merged.extend(values);
        *slot = OptValue::from_values(merged);
    }

    pub fn remove(&mut self, key: &str) -> Option<OptValue> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).1)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Overlay `other` onto `self`; later values win.
    pub fn merge(&mut self, other: &OptionMap) {
        for (key, value) in other.iter() {
            self.insert(key.to_string(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for OptionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Command verb opening a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Add,
    Bind,
    Unbind,
    Set,
    Unset,
    Enable,
    Disable,
    Link,
}

impl Verb {
    pub fn parse(word: &str) -> Option<Self> {
        let verb = match word.to_ascii_lowercase().as_str() {
            "add" => Verb::Add,
            "bind" => Verb::Bind,
            "unbind" => Verb::Unbind,
            "set" => Verb::Set,
            "unset" => Verb::Unset,
            "enable" => Verb::Enable,
            "disable" => Verb::Disable,
            "link" => Verb::Link,
            _ => return None,
        };
        Some(verb)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Add => "add",
            Verb::Bind => "bind",
            Verb::Unbind => "unbind",
            Verb::Set => "set",
            Verb::Unset => "unset",
            Verb::Enable => "enable",
            Verb::Disable => "disable",
            Verb::Link => "link",
        }
    }
}

/// Whether the statement matched a known command family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Command { verb: Verb, object_type: String },
    PassThrough,
}

/// One parsed configuration statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    /// Subject name, quotes preserved. `None` for singleton objects such as `ns config`.
    pub name: Option<String>,
    /// Positional tokens after the name, before the first flag.
    pub positional: Vec<String>,
    pub opts: OptionMap,
    /// Source file the statement came from.
    pub source: String,
    /// 1-based line number in `source`.
    pub line: usize,
    /// Full statement text.
    pub raw: String,
}

impl Statement {
    pub fn verb(&self) -> Option<&Verb> {
        match &self.kind {
            StatementKind::Command { verb, .. } => Some(verb),
            StatementKind::PassThrough => None,
        }
    }

    pub fn object_type(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Command { object_type, .. } => Some(object_type),
            StatementKind::PassThrough => None,
        }
    }

    /// True when this statement is `<verb> <object_type> ...`.
    pub fn is(&self, verb: Verb, object_type: &str) -> bool {
        match &self.kind {
            StatementKind::Command {
                verb: v,
                object_type: o,
            } => *v == verb && o.eq_ignore_ascii_case(object_type),
            StatementKind::PassThrough => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn positional(&self, idx: usize) -> Option<&str> {
        self.positional.get(idx).map(String::as_str)
    }
}
