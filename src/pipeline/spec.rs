//! Recipe data structures.
//!
//! A recipe is written either as one object keyed by stage name
//!
//! ```json
//! {"dropna": ["id"], "typeCast": {"price": "number"}, "onehot": ["region"]}
//! ```
//!
//! or as an array of single-key stages, which allows a stage kind to appear
//! more than once:
//!
//! ```json
//! [{"derive": [{"new": "total", "expr": "price * qty"}]}, {"select": ["id", "total"]}]
//! ```
//!
//! Either way the stages run in the fixed order given by [`Stage::priority`],
//! never in the order they were written.

use crate::error::{EngineError, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Ordered sequence of transform stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    stages: Vec<Stage>,
}

impl Recipe {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Parses a recipe from its JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRecipe`] for unknown stage names, wrongly
    /// shaped stage bodies, unknown cast types, cap methods or operators.
    pub fn from_value(value: Value) -> Result<Self> {
        let stages = match value {
            Value::Null => Vec::new(),
            Value::Array(_) => serde_json::from_value::<Vec<Stage>>(value)
                .map_err(|e| EngineError::InvalidRecipe(e.to_string()))?,
            Value::Object(_) => serde_json::from_value::<KeyedRecipe>(value)
                .map_err(|e| EngineError::InvalidRecipe(e.to_string()))?
                .into_stages(),
            other => {
                return Err(EngineError::InvalidRecipe(format!(
                    "expected an object or an array of stages, got {other}"
                )));
            }
        };
        Ok(Self { stages })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidRecipe(format!("recipe is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Stages as written.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages in execution order. The sort is stable, so repeated stages of
    /// one kind keep their written order.
    pub fn ordered(&self) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self.stages.iter().collect();
        stages.sort_by_key(|s| s.priority());
        stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Serialize for Recipe {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.stages.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Recipe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// One transform stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Old name to new name; unmapped columns pass through
    Rename(Entries<String>),

    /// Keep only these columns, in this order
    Select(Vec<String>),

    /// Strip surrounding whitespace from non-null values
    Trim(Vec<String>),

    /// Coerce columns to a target type
    TypeCast(Entries<CastType>),

    /// Replace missing values with a per-column default
    Fillna(Entries<Value>),

    /// Drop rows missing a value in any listed column
    Dropna(Vec<String>),

    /// Keep rows where every predicate holds
    Filter(Vec<Predicate>),

    /// Clamp outliers per column
    Cap(Entries<CapRule>),

    /// Add computed columns
    Derive(Vec<Derivation>),

    /// Replace a categorical column with one 0/1 column per value
    Onehot(Vec<String>),

    Scale(ScaleSpec),
}

impl Stage {
    /// Execution slot, 1 (first) to 11 (last).
    pub fn priority(&self) -> u8 {
        match self {
            Self::Rename(_) => 1,
            Self::Select(_) => 2,
            Self::Trim(_) => 3,
            Self::TypeCast(_) => 4,
            Self::Fillna(_) => 5,
            Self::Dropna(_) => 6,
            Self::Filter(_) => 7,
            Self::Cap(_) => 8,
            Self::Derive(_) => 9,
            Self::Onehot(_) => 10,
            Self::Scale(_) => 11,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rename(_) => "rename",
            Self::Select(_) => "select",
            Self::Trim(_) => "trim",
            Self::TypeCast(_) => "typeCast",
            Self::Fillna(_) => "fillna",
            Self::Dropna(_) => "dropna",
            Self::Filter(_) => "filter",
            Self::Cap(_) => "cap",
            Self::Derive(_) => "derive",
            Self::Onehot(_) => "onehot",
            Self::Scale(_) => "scale.standardize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    Number,
    String,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(alias = "col")]
    pub column: String,

    #[serde(alias = "op")]
    pub operator: Operator,

    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapRule {
    pub method: CapMethod,

    /// IQR multiplier (default 1.5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mult: Option<f64>,

    /// Z-score bound (default 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapMethod {
    Iqr,
    Zscore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    #[serde(rename = "new")]
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleSpec {
    #[serde(default)]
    pub standardize: Vec<String>,
}

/// Object-shaped recipe. Absent and null keys are skipped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct KeyedRecipe {
    rename: Option<Entries<String>>,
    select: Option<Vec<String>>,
    trim: Option<Vec<String>>,
    type_cast: Option<Entries<CastType>>,
    fillna: Option<Entries<Value>>,
    dropna: Option<Vec<String>>,
    filter: Option<Vec<Predicate>>,
    cap: Option<Entries<CapRule>>,
    derive: Option<Vec<Derivation>>,
    onehot: Option<Vec<String>>,
    scale: Option<ScaleSpec>,
}

impl KeyedRecipe {
    fn into_stages(self) -> Vec<Stage> {
        [
            self.rename.map(Stage::Rename),
            self.select.map(Stage::Select),
            self.trim.map(Stage::Trim),
            self.type_cast.map(Stage::TypeCast),
            self.fillna.map(Stage::Fillna),
            self.dropna.map(Stage::Dropna),
            self.filter.map(Stage::Filter),
            self.cap.map(Stage::Cap),
            self.derive.map(Stage::Derive),
            self.onehot.map(Stage::Onehot),
            self.scale.map(Stage::Scale),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// JSON object kept as ordered `(key, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<V>(pub Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Entries<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Entries<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<V: Serialize> Serialize for Entries<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by column name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    entries.push((k, v));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_recipe() -> anyhow::Result<()> {
        let recipe = Recipe::from_value(json!({
            "onehot": ["region"],
            "select": ["id", "region"],
            "typeCast": {"id": "number"},
            "cap": {"price": {"method": "iqr"}},
            "filter": [{"col": "id", "op": ">", "value": 3}],
            "derive": null
        }))?;

        let order: Vec<&str> = recipe.ordered().iter().map(|s| s.name()).collect();
        assert_eq!(order, ["select", "typeCast", "filter", "cap", "onehot"]);

        let Some(Stage::Filter(preds)) = recipe.stages().iter().find(|s| s.priority() == 7) else {
            panic!("filter stage missing");
        };
        assert_eq!(preds[0].column, "id");
        assert_eq!(preds[0].operator, Operator::Gt);
        Ok(())
    }

    #[test]
    fn test_staged_recipe_keeps_repeats_in_order() -> anyhow::Result<()> {
        let recipe = Recipe::from_json(
            r#"[
                {"derive": [{"new": "b", "expr": "a * 2"}]},
                {"rename": {"x": "y"}},
                {"derive": [{"new": "c", "expr": "b + 1"}]}
            ]"#,
        )?;
        let ordered = recipe.ordered();
        assert_eq!(ordered[0].name(), "rename");
        assert!(matches!(ordered[1], Stage::Derive(d) if d[0].name == "b"));
        assert!(matches!(ordered[2], Stage::Derive(d) if d[0].name == "c"));
        Ok(())
    }

    #[test]
    fn test_entries_keep_key_order() -> anyhow::Result<()> {
        let recipe = Recipe::from_value(json!({"rename": {"b": "x", "a": "y"}}))?;
        let Stage::Rename(map) = &recipe.stages()[0] else {
            panic!("expected rename");
        };
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(map.get("a").map(String::as_str), Some("y"));
        Ok(())
    }

    #[test]
    fn test_structural_errors() {
        let bad = [
            json!({"pivot": ["a"]}),
            json!({"typeCast": {"a": "boolean"}}),
            json!({"filter": [{"column": "a", "operator": "~=", "value": 1}]}),
            json!({"cap": {"a": {"method": "winsor"}}}),
            json!({"select": "a"}),
            json!([{"select": ["a"], "trim": ["a"]}]),
            json!("select"),
        ];
        for value in bad {
            let err = Recipe::from_value(value.clone()).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidRecipe(_)),
                "{value} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_null_recipe_is_empty() -> anyhow::Result<()> {
        assert!(Recipe::from_value(Value::Null)?.is_empty());
        assert!(Recipe::from_value(json!({}))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_serialize_as_stage_list() -> anyhow::Result<()> {
        let recipe = Recipe::new(vec![
            Stage::Dropna(vec!["a".to_owned()]),
            Stage::TypeCast([("b", CastType::Number)].into_iter().collect()),
        ]);
        let value = serde_json::to_value(&recipe)?;
        assert_eq!(value, json!([{"dropna": ["a"]}, {"typeCast": {"b": "number"}}]));
        assert_eq!(Recipe::from_value(value)?, recipe);
        Ok(())
    }
}
