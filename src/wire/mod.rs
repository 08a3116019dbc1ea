//! Wire protocol shared by the HTTP server and client
//!
//! Every call is one JSON object POSTed to a single endpoint:
//!
//! ```text
//! { "queueId": "jobs", "api": "receive", "owner": "worker-1" }
//! { "queueId": "jobs", "api": "claim", "data": { "owner": "worker-1", "groupId": "g1" } }
//! ```
//!
//! and every answer is HTTP 200 with either `{ "statusCode": 0, "result": ... }`
//! or `{ "statusCode": 1, "error": "failure" }`. Validation happens here, so
//! a malformed request never reaches the engine.

use crate::queue::{Message, QueueOptionsPatch};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Error text sent for every application failure
pub const FAILURE: &str = "failure";

pub const STATUS_OK: u8 = 0;
pub const STATUS_FAILURE: u8 = 1;

/// Operations accepted by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Api {
    #[strum(to_string = "setOptions", serialize = "setoptions")]
    SetOptions,
    #[strum(serialize = "claim")]
    Claim,
    #[strum(serialize = "send")]
    Send,
    #[strum(serialize = "receive")]
    Receive,
    #[strum(serialize = "remove")]
    Remove,
}

/// Why a request body was rejected before dispatch
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("request body is not a JSON object")]
    NotAnObject,

    #[error("request has no queueId")]
    MissingQueueId,

    #[error("request has no api")]
    MissingApi,

    #[error("unknown api '{0}'")]
    UnknownApi(String),

    #[error("{api}: payload is empty")]
    MissingData { api: Api },

    #[error("{api}: payload is not a JSON object")]
    DataNotAnObject { api: Api },

    #[error("{api}: badly formed payload: {source}")]
    InvalidData {
        api: Api,
        #[source]
        source: serde_json::Error,
    },

    #[error("receive: no owner specified")]
    MissingOwner,
}

/// Request envelope as it travels on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRequest {
    #[serde(default, alias = "queueid", skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// `claim` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub owner: String,
    #[serde(alias = "groupid")]
    pub group_id: String,
}

/// `remove` payload; any message object carrying both fields qualifies
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    #[serde(alias = "messageid")]
    id: String,
    #[serde(alias = "groupid")]
    group_id: String,
}

/// A validated request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SetOptions {
        queue_id: String,
        options: QueueOptionsPatch,
    },
    Claim {
        queue_id: String,
        owner: String,
        group_id: String,
    },
    Send {
        queue_id: String,
        message: Message,
    },
    Receive {
        queue_id: String,
        owner: String,
    },
    Remove {
        queue_id: String,
        message: Message,
    },
}

impl Request {
    pub fn api(&self) -> Api {
        match self {
            Request::SetOptions { .. } => Api::SetOptions,
            Request::Claim { .. } => Api::Claim,
            Request::Send { .. } => Api::Send,
            Request::Receive { .. } => Api::Receive,
            Request::Remove { .. } => Api::Remove,
        }
    }

    pub fn queue_id(&self) -> &str {
        match self {
            Request::SetOptions { queue_id, .. }
            | Request::Claim { queue_id, .. }
            | Request::Send { queue_id, .. }
            | Request::Receive { queue_id, .. }
            | Request::Remove { queue_id, .. } => queue_id,
        }
    }

    /// Decode and validate a raw request body
    pub fn parse(body: &[u8]) -> Result<Request, WireError> {
        let value: Value = serde_json::from_slice(body).map_err(WireError::InvalidJson)?;
        // Derived deserializers would also take a positional array
        if !value.is_object() {
            return Err(WireError::NotAnObject);
        }
        let envelope: WireRequest =
            serde_json::from_value(value).map_err(WireError::InvalidJson)?;
        Request::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: WireRequest) -> Result<Request, WireError> {
        let queue_id = envelope
            .queue_id
            .filter(|id| !id.is_empty())
            .ok_or(WireError::MissingQueueId)?;
        let api_name = envelope.api.ok_or(WireError::MissingApi)?;
        let api = Api::from_str(&api_name).map_err(|_| WireError::UnknownApi(api_name))?;

        let request = match api {
            Api::SetOptions => Request::SetOptions {
                queue_id,
                options: payload(api, envelope.data)?,
            },
            Api::Claim => {
                let claim: ClaimData = payload(api, envelope.data)?;
                Request::Claim {
                    queue_id,
                    owner: claim.owner,
                    group_id: claim.group_id,
                }
            }
            Api::Send => Request::Send {
                queue_id,
                message: payload(api, envelope.data)?,
            },
            Api::Receive => Request::Receive {
                queue_id,
                owner: envelope.owner.ok_or(WireError::MissingOwner)?,
            },
            Api::Remove => {
                let reference: MessageRef = payload(api, envelope.data)?;
                Request::Remove {
                    queue_id,
                    message: Message::new(reference.id, reference.group_id, Value::Null),
                }
            }
        };
        Ok(request)
    }

    /// Envelope for sending this request
    pub fn to_envelope(&self) -> Result<WireRequest, serde_json::Error> {
        let mut envelope = WireRequest {
            queue_id: Some(self.queue_id().to_string()),
            api: Some(self.api().to_string()),
            ..WireRequest::default()
        };
        match self {
            Request::SetOptions { options, .. } => {
                envelope.data = Some(serde_json::to_value(options)?);
            }
            Request::Claim {
                owner, group_id, ..
            } => {
                envelope.data = Some(serde_json::to_value(ClaimData {
                    owner: owner.clone(),
                    group_id: group_id.clone(),
                })?);
            }
            Request::Send { message, .. } | Request::Remove { message, .. } => {
                envelope.data = Some(serde_json::to_value(message)?);
            }
            Request::Receive { owner, .. } => {
                envelope.owner = Some(owner.clone());
            }
        }
        Ok(envelope)
    }
}

fn payload<T: DeserializeOwned>(api: Api, data: Option<Value>) -> Result<T, WireError> {
    match data {
        None | Some(Value::Null) => Err(WireError::MissingData { api }),
        Some(value) if !value.is_object() => Err(WireError::DataNotAnObject { api }),
        Some(value) => {
            serde_json::from_value(value).map_err(|source| WireError::InvalidData { api, source })
        }
    }
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    #[serde(alias = "statuscode")]
    pub status_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    pub fn ok() -> Self {
        Self {
            status_code: STATUS_OK,
            result: None,
            error: None,
        }
    }

    pub fn with_result(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::ok()
        }
    }

    pub fn failure() -> Self {
        Self {
            status_code: STATUS_FAILURE,
            result: None,
            error: Some(FAILURE.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Messages carried by a `receive` answer; absent result reads as empty
    pub fn messages(&self) -> Result<Vec<Message>, serde_json::Error> {
        match &self.result {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Vec::<Message>::deserialize(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn parse(value: Value) -> Result<Request, WireError> {
        Request::parse(value.to_string().as_bytes())
    }

    #[test]
    fn test_api_names_round_trip_through_strum() {
        for api in Api::iter() {
            assert_eq!(Api::from_str(&api.to_string()).unwrap(), api);
        }
        assert_eq!(Api::from_str("setoptions").unwrap(), Api::SetOptions);
        assert_eq!(Api::SetOptions.to_string(), "setOptions");
        assert!(Api::from_str("purge").is_err());
    }

    #[test]
    fn test_parse_claim() {
        let request = parse(json!({
            "queueId": "q",
            "api": "claim",
            "data": {"owner": "A", "groupId": "g1"}
        }))
        .unwrap();

        assert_eq!(
            request,
            Request::Claim {
                queue_id: "q".to_string(),
                owner: "A".to_string(),
                group_id: "g1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_accepts_lowercase_field_names() {
        let request = parse(json!({
            "queueid": "q",
            "api": "claim",
            "data": {"owner": "A", "groupid": "g1"}
        }))
        .unwrap();
        assert_eq!(request.api(), Api::Claim);
        assert_eq!(request.queue_id(), "q");
    }

    #[test]
    fn test_parse_rejects_malformed_envelopes() {
        assert!(matches!(
            Request::parse(b"{not json"),
            Err(WireError::InvalidJson(_))
        ));
        assert!(matches!(
            parse(json!(["q", "send"])),
            Err(WireError::NotAnObject)
        ));
        assert!(matches!(
            parse(json!(["q", "receive", null, "A"])),
            Err(WireError::NotAnObject)
        ));
        assert!(matches!(parse(json!("q")), Err(WireError::NotAnObject)));
        assert!(matches!(
            parse(json!({"api": "receive", "owner": "A"})),
            Err(WireError::MissingQueueId)
        ));
        assert!(matches!(
            parse(json!({"queueId": "", "api": "receive", "owner": "A"})),
            Err(WireError::MissingQueueId)
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "owner": "A"})),
            Err(WireError::MissingApi)
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "purge"})),
            Err(WireError::UnknownApi(name)) if name == "purge"
        ));
    }

    #[test]
    fn test_parse_rejects_incomplete_payloads() {
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "setOptions"})),
            Err(WireError::MissingData { api: Api::SetOptions })
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "claim", "data": {"owner": "A"}})),
            Err(WireError::InvalidData { api: Api::Claim, .. })
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "send", "data": {"groupId": "g1"}})),
            Err(WireError::InvalidData { api: Api::Send, .. })
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "receive"})),
            Err(WireError::MissingOwner)
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "remove", "data": {"id": "m1"}})),
            Err(WireError::InvalidData { api: Api::Remove, .. })
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "claim", "data": ["A", "g1"]})),
            Err(WireError::DataNotAnObject { api: Api::Claim })
        ));
        assert!(matches!(
            parse(json!({"queueId": "q", "api": "remove", "data": ["m1", "g1"]})),
            Err(WireError::DataNotAnObject { api: Api::Remove })
        ));
    }

    #[test]
    fn test_envelope_for_each_request_parses_back() {
        let requests = vec![
            Request::SetOptions {
                queue_id: "q".to_string(),
                options: QueueOptionsPatch::default().with_receive_limit(3),
            },
            Request::Claim {
                queue_id: "q".to_string(),
                owner: "A".to_string(),
                group_id: "g1".to_string(),
            },
            Request::Send {
                queue_id: "q".to_string(),
                message: Message::new("m1", "g1", json!({"k": "v"})),
            },
            Request::Receive {
                queue_id: "q".to_string(),
                owner: "A".to_string(),
            },
            Request::Remove {
                queue_id: "q".to_string(),
                message: Message::new("m1", "g1", Value::Null),
            },
        ];

        for request in requests {
            let body = serde_json::to_vec(&request.to_envelope().unwrap()).unwrap();
            assert_eq!(Request::parse(&body).unwrap(), request);
        }
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(WireResponse::failure()).unwrap(),
            json!({"statusCode": 1, "error": "failure"})
        );
        assert_eq!(
            serde_json::to_value(WireResponse::ok()).unwrap(),
            json!({"statusCode": 0})
        );

        let response: WireResponse = serde_json::from_value(json!({
            "statuscode": 0,
            "result": [{"id": "m1", "groupId": "g1", "sequenceNumber": 4}]
        }))
        .unwrap();
        assert!(response.is_ok());
        let messages = response.messages().unwrap();
        assert_eq!(messages[0].sequence_number, Some(4));
        assert!(WireResponse::ok().messages().unwrap().is_empty());
    }
}
