//! Wire types of the external knowledge retrieval API.

use serde::{Deserialize, Deserializer, Serialize};

use docrag_core::types::{RetrievedChunk, SearchFilter};

/// Metadata key whose value selects a project.
pub const PROJECT_KEY: &str = "project_name";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrievalRequest {
    pub knowledge_id: String,
    pub query: String,
    pub retrieval_setting: RetrievalSetting,
    #[serde(default)]
    pub metadata_condition: Option<MetadataCondition>,
}

impl RetrievalRequest {
    /// Only the first condition is consulted, and only when it names `project_name`.
    pub fn filter(&self) -> SearchFilter {
        let project = self.metadata_condition.as_ref()
            .and_then(|m| m.conditions.first())
            .filter(|c| c.name.first().map(String::as_str) == Some(PROJECT_KEY))
            .and_then(|c| c.value.as_ref())
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        SearchFilter { project }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RetrievalSetting {
    pub top_k: usize,
    #[serde(default)]
    pub score_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetadataCondition {
    #[serde(default)]
    pub logical_operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    #[serde(deserialize_with = "string_or_list")]
    pub name: Vec<String>,
    pub comparison_operator: ComparisonOperator,
    /// Absent for `empty` / `not empty`.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not contains")]
    NotContains,
    #[serde(rename = "start with")]
    StartWith,
    #[serde(rename = "end with")]
    EndWith,
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "not empty")]
    NotEmpty,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "≠")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "≥")]
    Ge,
    #[serde(rename = "≤")]
    Le,
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after")]
    After,
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub content: String,
    pub score: f32,
    pub title: String,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub doc_id: String,
    pub doc_project: String,
    pub doc_url: String,
}

impl From<RetrievedChunk> for Record {
    fn from(c: RetrievedChunk) -> Self {
        Record {
            content: c.body,
            score: c.score,
            title: c.title,
            metadata: RecordMetadata { doc_id: c.doc_id, doc_project: c.doc_project, doc_url: c.doc_url },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: u32,
    pub error_msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_name_accepts_string_or_list() {
        let one: Condition = serde_json::from_str(r#"{"name":"project_name","comparison_operator":"is","value":"zx"}"#).unwrap();
        let many: Condition = serde_json::from_str(r#"{"name":["project_name","x"],"comparison_operator":"≥"}"#).unwrap();
        assert_eq!(one.name, vec!["project_name"]);
        assert_eq!(many.name, vec!["project_name", "x"]);
        assert_eq!(many.comparison_operator, ComparisonOperator::Ge);
        assert_eq!(many.value, None);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let bad = serde_json::from_str::<Condition>(r#"{"name":"a","comparison_operator":"like"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn project_filter_comes_from_first_condition_only() {
        let req: RetrievalRequest = serde_json::from_str(
            r#"{"knowledge_id":"k","query":"q","retrieval_setting":{"top_k":3,"score_threshold":0.5},
                "metadata_condition":{"conditions":[{"name":"author","comparison_operator":"is","value":"x"},
                                                    {"name":"project_name","comparison_operator":"is","value":"zx"}]}}"#,
        ).unwrap();
        assert_eq!(req.filter(), SearchFilter::default());
        assert_eq!(req.metadata_condition.unwrap().logical_operator, LogicalOperator::And);
    }

    #[test]
    fn metadata_uses_camel_case_keys() {
        let record = Record::from(RetrievedChunk {
            body: "b".into(), score: 0.5, title: "t".into(),
            doc_id: "d".into(), doc_project: "p".into(), doc_url: "u".into(),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metadata"]["docId"], "d");
        assert_eq!(json["metadata"]["docProject"], "p");
        assert_eq!(json["metadata"]["docUrl"], "u");
    }
}
