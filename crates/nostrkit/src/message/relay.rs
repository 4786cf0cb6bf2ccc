// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Messages sent by relays, received by clients

use serde_json::Value;

use super::{MessageHandleError, SubscriptionId};
use crate::event::id::EventId;
use crate::event::Event;

/// Relay message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// `["EVENT", <subscription-id>, <event>]`
    Event {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Event
        event: Box<Event>,
    },
    /// `["OK", <event-id>, <accepted>, <message>]`
    Ok {
        /// Event id
        event_id: EventId,
        /// Accepted by the relay policy
        status: bool,
        /// Human-readable message
        message: String,
    },
    /// `["EOSE", <subscription-id>]`
    EndOfStoredEvents(SubscriptionId),
    /// `["NOTICE", <message>]`
    Notice(String),
    /// `["CLOSED", <subscription-id>, <message>]`
    Closed {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Human-readable message
        message: String,
    },
    /// `["AUTH", <challenge>]`
    Auth {
        /// Challenge to sign
        challenge: String,
    },
    /// `["COUNT", <subscription-id>, {"count": <n>}]`
    Count {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Number of matching events
        count: usize,
    },
}

impl RelayMessage {
    /// Parse a frame received from a relay.
    ///
    /// Event frames are deserialized only; the signature is NOT checked
    /// here (verification policy belongs to the dispatcher).
    pub fn from_json<S>(json: S) -> Result<Self, MessageHandleError>
    where
        S: AsRef<str>,
    {
        let json: &str = json.as_ref();

        if json.is_empty() {
            return Err(MessageHandleError::EmptyMsg);
        }

        let value: Value =
            serde_json::from_str(json).map_err(|_| MessageHandleError::Json)?;
        let array: &Vec<Value> = match &value {
            Value::Array(array) if !array.is_empty() => array,
            _ => return Err(MessageHandleError::MalformedFrame),
        };

        let tag: &str = array[0]
            .as_str()
            .ok_or(MessageHandleError::MalformedFrame)?;

        match tag {
            "EVENT" => {
                if array.len() != 3 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                let subscription_id: SubscriptionId = from_value(&array[1])?;
                let event: Event = Event::from_json(array[2].to_string())
                    .map_err(|_| MessageHandleError::Json)?;
                Ok(Self::Event {
                    subscription_id,
                    event: Box::new(event),
                })
            }
            "OK" => {
                if array.len() != 4 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                Ok(Self::Ok {
                    event_id: from_value(&array[1])?,
                    status: array[2]
                        .as_bool()
                        .ok_or(MessageHandleError::MalformedFrame)?,
                    message: from_value(&array[3])?,
                })
            }
            "EOSE" => {
                if array.len() != 2 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                Ok(Self::EndOfStoredEvents(from_value(&array[1])?))
            }
            "NOTICE" => {
                if array.len() != 2 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                Ok(Self::Notice(from_value(&array[1])?))
            }
            "CLOSED" => {
                if array.len() != 3 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                Ok(Self::Closed {
                    subscription_id: from_value(&array[1])?,
                    message: from_value(&array[2])?,
                })
            }
            "AUTH" => {
                if array.len() != 2 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                Ok(Self::Auth {
                    challenge: from_value(&array[1])?,
                })
            }
            "COUNT" => {
                if array.len() != 3 {
                    return Err(MessageHandleError::MalformedFrame);
                }
                let count: u64 = array[2]
                    .get("count")
                    .and_then(|c| c.as_u64())
                    .ok_or(MessageHandleError::MalformedFrame)?;
                Ok(Self::Count {
                    subscription_id: from_value(&array[1])?,
                    count: count as usize,
                })
            }
            other => Err(MessageHandleError::UnknownMessageType(other.to_string())),
        }
    }
}

fn from_value<T>(value: &Value) -> Result<T, MessageHandleError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(value.clone()).map_err(|_| MessageHandleError::Json)
}
