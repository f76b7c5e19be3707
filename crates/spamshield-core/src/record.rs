//! Message records and the tag vocabulary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result as CoreResult};

/// Stable position of a record in the set it arrived in.
///
/// Assigned once when the `RecordSet` is built and never reassigned; every
/// intermediate partition is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIndex(pub usize);

impl std::fmt::Display for RowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque record identifier supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Final category assigned to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpamTag {
    #[serde(rename = "NO_RECORD")]
    NoRecord,
    #[serde(rename = "SPAM_CODE")]
    SpamCode,
    #[serde(rename = "URL_ONLY")]
    UrlOnly,
    #[serde(rename = "IMSI_ONLY")]
    ImsiOnly,
    #[serde(rename = "COMMERCIAL")]
    Commercial,
    #[serde(rename = "LOAN/SCAM/SPAM")]
    LoanScamSpam,
    #[serde(rename = "P2P")]
    P2p,
}

impl SpamTag {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoRecord => "NO_RECORD",
            Self::SpamCode => "SPAM_CODE",
            Self::UrlOnly => "URL_ONLY",
            Self::ImsiOnly => "IMSI_ONLY",
            Self::Commercial => "COMMERCIAL",
            Self::LoanScamSpam => "LOAN/SCAM/SPAM",
            Self::P2p => "P2P",
        }
    }
}

impl std::str::FromStr for SpamTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_RECORD" => Ok(Self::NoRecord),
            "SPAM_CODE" => Ok(Self::SpamCode),
            "URL_ONLY" => Ok(Self::UrlOnly),
            "IMSI_ONLY" => Ok(Self::ImsiOnly),
            "COMMERCIAL" => Ok(Self::Commercial),
            "LOAN/SCAM/SPAM" => Ok(Self::LoanScamSpam),
            "P2P" => Ok(Self::P2p),
            other => Err(format!("unknown spam tag '{other}'")),
        }
    }
}

impl std::fmt::Display for SpamTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One message as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// `null` and scalar values are read as text, missing as empty.
    #[serde(default, deserialize_with = "loose_text")]
    pub sender: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub content: String,
    /// Incoming values outside the tag vocabulary (e.g. legacy labels) are
    /// read as unset; the pipeline overwrites this field anyway.
    #[serde(default, deserialize_with = "lenient_tag")]
    pub spam_tag: Option<SpamTag>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<LooseText>::deserialize(deserializer)? {
        None => String::new(),
        Some(LooseText::Text(text)) => text,
        Some(LooseText::Int(n)) => n.to_string(),
        Some(LooseText::Float(x)) => x.to_string(),
        Some(LooseText::Bool(b)) => b.to_string(),
    })
}

fn lenient_tag<'de, D>(deserializer: D) -> Result<Option<SpamTag>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|label| match label.parse() {
        Ok(tag) => Some(tag),
        Err(e) => {
            tracing::debug!("Ignoring input spam_tag: {}", e);
            None
        }
    }))
}

impl Record {
    pub fn new(id: impl Into<RecordId>, sender: &str, content: &str) -> Self {
        Self {
            id: id.into(),
            sender: sender.to_string(),
            content: content.to_string(),
            spam_tag: None,
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Ordered record collection. A record's position is its `RowIndex`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: RowIndex) -> Option<&Record> {
        self.records.get(index.0)
    }

    /// All row indices, in order.
    pub fn indices(&self) -> impl Iterator<Item = RowIndex> + '_ {
        (0..self.records.len()).map(RowIndex)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowIndex, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RowIndex(i), r))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Overwrite the tag of one record. Returns false for an unknown index.
    pub fn set_tag(&mut self, index: RowIndex, tag: SpamTag) -> bool {
        match self.records.get_mut(index.0) {
            Some(record) => {
                record.spam_tag = Some(tag);
                true
            }
            None => false,
        }
    }

    /// Parse either a bare array of records or `{"records": [...]}`.
    ///
    /// Malformed JSON is `Error::Json`; well-formed JSON of the wrong shape
    /// is `Error::InvalidInput`.
    pub fn from_json_str(raw: &str) -> CoreResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let list = match value {
            list @ serde_json::Value::Array(_) => list,
            serde_json::Value::Object(mut map) => map.remove("records").ok_or_else(|| {
                Error::InvalidInput("expected a \"records\" field".into())
            })?,
            other => {
                return Err(Error::InvalidInput(format!(
                    "expected an array of records, got {}",
                    json_kind(&other)
                )))
            }
        };
        let records: Vec<Record> = serde_json::from_value(list)
            .map_err(|e| Error::InvalidInput(format!("bad record list: {e}")))?;
        Ok(Self::new(records))
    }

    pub fn read_json(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn write_json(&self, path: &Path) -> CoreResult<()> {
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)?;
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}
