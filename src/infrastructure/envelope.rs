// Response envelope normalisation
//
// Endpoints answer either with the payload itself or with
// `{"statusCode": n, "body": "<JSON>"}`, where `body` needs a second decode.
// A `statusCode` that is present must be an integer HTTP status; anything
// else (`500.0`, `"500"`) is a shape error, and a missing one reads as 200.
use crate::infrastructure::error::ApiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Wrap whatever the endpoint returned into an envelope.
    ///
    /// An envelope is passed through; a raw object becomes
    /// `{statusCode: 200, body: <object as JSON>}`.
    pub fn from_raw(raw: Value) -> Result<Self, ApiError> {
        match raw {
            Value::Object(mut fields) if fields.contains_key("body") => {
                let status_code = status_code(&mut fields)?;
                let body = match fields.remove("body") {
                    Some(Value::String(text)) => text,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(Self { status_code, body })
            }
            other => Ok(Self {
                status_code: 200,
                body: other.to_string(),
            }),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(ApiError::Upstream(i64::from(self.status_code)));
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Strip the envelope, if any, and return the payload it carries.
///
/// - object with `body`: a `statusCode` outside 2xx fails with
///   [`ApiError::Upstream`], a non-integer one with [`ApiError::Shape`];
///   a string `body` is JSON-decoded, any other
///   `body` value is returned as-is.
/// - anything else is already the payload.
pub fn unwrap_body(raw: Value) -> Result<Value, ApiError> {
    let mut fields = match raw {
        Value::Object(fields) if fields.contains_key("body") => fields,
        payload => return Ok(payload),
    };

    let code = status_code(&mut fields)?;
    if !(200..300).contains(&code) {
        return Err(ApiError::Upstream(i64::from(code)));
    }

    match fields.remove("body") {
        Some(Value::String(text)) => Ok(serde_json::from_str(&text)?),
        Some(other) => Ok(other),
        None => Ok(Value::Null),
    }
}

fn status_code(fields: &mut Map<String, Value>) -> Result<u16, ApiError> {
    match fields.remove("statusCode") {
        Some(code) => Ok(serde_json::from_value(code)?),
        None => Ok(200),
    }
}

pub fn decode_body<T: DeserializeOwned>(raw: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(unwrap_body(raw)?)?)
}
