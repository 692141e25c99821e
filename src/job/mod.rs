//! Job and outcome types exchanged with the queues
//!
//! Inbound messages are JSON objects whose field names are matched
//! case-insensitively. Outcome records are written with the exact wire names
//! the downstream persistence consumer expects.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

const FIELD_JOB_ID: &str = "codsysfilaenviomensagens";
const FIELD_URL: &str = "url";
const FIELD_HEADER: &str = "header";
const FIELD_BODY: &str = "body";
const FIELD_INSTANCE: &str = "instancia";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has the wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// One outbound message to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundJob {
    pub id: i64,
    pub url: String,
    /// Compact `Name:Value;Name:Value` header spec
    pub header: Option<String>,
    /// JSON-encoded request body; the media relay may replace it before dispatch
    pub body: Option<String>,
    /// Originating system tag, carried through untouched
    pub instance: Option<String>,
}

impl OutboundJob {
    /// Decode a raw queue message.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(object) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let fields = fold_keys(object);

        let id = match fields.get(FIELD_JOB_ID) {
            None | Some(Value::Null) => {
                return Err(DecodeError::MissingField("CodSysFilaEnvioMensagens"));
            }
            Some(value) => value.as_i64().ok_or(DecodeError::WrongType {
                field: "CodSysFilaEnvioMensagens",
                expected: "integer",
            })?,
        };

        let url = optional_string(&fields, FIELD_URL, "Url")?
            .ok_or(DecodeError::MissingField("Url"))?;

        Ok(Self {
            id,
            url,
            header: optional_string(&fields, FIELD_HEADER, "Header")?,
            body: optional_string(&fields, FIELD_BODY, "Body")?,
            instance: optional_string(&fields, FIELD_INSTANCE, "Instancia")?,
        })
    }

    /// Body as sent on the wire; an absent body is an empty JSON object.
    pub fn body_or_empty(&self) -> &str {
        self.body.as_deref().unwrap_or("{}")
    }
}

/// Lowercase every key so lookups ignore case.
fn fold_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}

fn optional_string(
    fields: &Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "string",
        }),
    }
}

/// Final disposition of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Delivered,
    Failed,
}

impl OutcomeStatus {
    pub fn code(self) -> i32 {
        match self {
            OutcomeStatus::Delivered => 3,
            OutcomeStatus::Failed => -100,
        }
    }

    pub fn from_http_success(success: bool) -> Self {
        if success {
            OutcomeStatus::Delivered
        } else {
            OutcomeStatus::Failed
        }
    }
}

impl Serialize for OutcomeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Result of processing one job, sent to the result queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    #[serde(rename = "CodSysFilaEnvioMensagens")]
    pub job_id: i64,
    #[serde(rename = "Status")]
    pub status: OutcomeStatus,
    #[serde(rename = "ResponseContent")]
    pub response_content: String,
}

impl OutcomeRecord {
    pub fn failed(job_id: i64, reason: impl Into<String>) -> Self {
        Self {
            job_id,
            status: OutcomeStatus::Failed,
            response_content: reason.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
