//! Property values stored in a component's property bag.

use serde::{Deserialize, Serialize};

/// A configuration value. Untagged so job files can write plain literals:
/// `EtaWindow = 0.4`, `NRings = [8, 64]`, `LayerRings = [["PSB", "PSE"]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
    Tags(Vec<String>),
    TagGroups(Vec<Vec<String>>),
}

impl PropertyValue {
    /// Build a tag list from string slices.
    pub fn tags(tags: &[&str]) -> Self {
        PropertyValue::Tags(tags.iter().map(|t| t.to_string()).collect())
    }

    /// Build a list of tag groups from nested string slices.
    pub fn tag_groups(groups: &[&[&str]]) -> Self {
        PropertyValue::TagGroups(
            groups
                .iter()
                .map(|g| g.iter().map(|t| t.to_string()).collect())
                .collect(),
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            PropertyValue::Tags(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tag_groups(&self) -> Option<&[Vec<String>]> {
        match self {
            PropertyValue::TagGroups(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, used in schema error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "integer",
            PropertyValue::Number(_) => "number",
            PropertyValue::Text(_) => "string",
            PropertyValue::Numbers(_) => "number list",
            PropertyValue::Tags(_) => "tag list",
            PropertyValue::TagGroups(_) => "tag groups",
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::Numbers(v)
    }
}

impl From<&[f64]> for PropertyValue {
    fn from(v: &[f64]) -> Self {
        PropertyValue::Numbers(v.to_vec())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::Tags(v)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Number(v) => write!(f, "{v}"),
            PropertyValue::Text(v) => write!(f, "{v:?}"),
            PropertyValue::Numbers(v) => write!(f, "{v:?}"),
            PropertyValue::Tags(v) => write!(f, "{v:?}"),
            PropertyValue::TagGroups(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::Int(42).as_int(), Some(42));
        assert_eq!(PropertyValue::Int(42).as_number(), Some(42.0));
        assert_eq!(PropertyValue::Number(0.4).as_number(), Some(0.4));
        assert_eq!(PropertyValue::from("Cells").as_str(), Some("Cells"));
        assert_eq!(PropertyValue::Text("x".into()).as_number(), None);
    }

    #[test]
    fn test_untagged_json_literals() {
        let v: PropertyValue = serde_json::from_str("[8, 64, 8]").unwrap();
        assert_eq!(v, PropertyValue::Numbers(vec![8.0, 64.0, 8.0]));

        let v: PropertyValue = serde_json::from_str(r#"["EMB1", "EMEC1"]"#).unwrap();
        assert_eq!(v, PropertyValue::tags(&["EMB1", "EMEC1"]));

        let v: PropertyValue = serde_json::from_str(r#"[["PSB"], ["EMB2", "EMEC2"]]"#).unwrap();
        assert_eq!(v, PropertyValue::tag_groups(&[&["PSB"], &["EMB2", "EMEC2"]]));

        let v: PropertyValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, PropertyValue::Int(3));

        let v: PropertyValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, PropertyValue::Number(2.5));
    }
}
