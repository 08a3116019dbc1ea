//! Message type shared by the engine, the wire protocol and the clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Group id that addresses every currently owned group of a queue
pub const BROADCAST_GROUP: &str = "*";

/// A queued message
///
/// `sequence_number` is assigned by the queue on send and is strictly
/// increasing per queue. `contents` is opaque JSON; when the payload has been
/// offloaded to blob storage it is `null` and `blob_ref` names the blob.
///
/// # Example
///
/// ```rust
/// use memsqs::queue::Message;
/// use serde_json::json;
///
/// let message = Message::new("m1", "orders-42", json!({"total": 12}));
/// assert_eq!(message.group_id, "orders-42");
///
/// let single = Message::ungrouped("m2", json!("ping"));
/// assert_eq!(single.group_id, "m2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "messageid")]
    pub id: String,
    #[serde(default, alias = "groupid")]
    pub group_id: String,
    #[serde(default, alias = "seqno", skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub contents: Value,
    #[serde(default, alias = "blobid", skip_serializing_if = "Option::is_none")]
    pub blob_ref: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, group_id: impl Into<String>, contents: Value) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            sequence_number: None,
            contents,
            blob_ref: None,
        }
    }

    /// A message that forms its own singleton group
    pub fn ungrouped(id: impl Into<String>, contents: Value) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, contents)
    }

    /// A message fanned out to every owned group of the queue
    pub fn broadcast(id: impl Into<String>, contents: Value) -> Self {
        Self::new(id, BROADCAST_GROUP, contents)
    }

    pub fn is_broadcast(&self) -> bool {
        self.group_id == BROADCAST_GROUP
    }

    /// Group this message is filed under; unpartitioned messages use their id
    pub fn effective_group(&self) -> &str {
        if self.group_id.is_empty() {
            &self.id
        } else {
            &self.group_id
        }
    }

    /// `{ id, groupId, blobRef? }` reference used for acknowledgement
    ///
    /// The blob reference is kept so an offloaded payload can be released
    /// once the message is removed.
    pub fn reference(&self) -> Message {
        let mut reference = Message::new(self.id.clone(), self.group_id.clone(), Value::Null);
        reference.blob_ref = self.blob_ref.clone();
        reference
    }
}
