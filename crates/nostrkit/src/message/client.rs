// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Messages sent by clients, received by relays

use serde_json::{json, Value};

use super::SubscriptionId;
use crate::event::Event;
use crate::filter::Filter;

/// Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `["EVENT", <event>]`
    Event(Box<Event>),
    /// `["REQ", <subscription-id>, <filter>, ...]`
    Req {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Filters
        filters: Vec<Filter>,
    },
    /// `["CLOSE", <subscription-id>]`
    Close(SubscriptionId),
    /// `["AUTH", <signed-event>]`
    Auth(Box<Event>),
    /// `["COUNT", <subscription-id>, <filter>, ...]`
    Count {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Filters
        filters: Vec<Filter>,
    },
}

impl ClientMessage {
    /// `EVENT` message
    #[inline]
    pub fn event(event: Event) -> Self {
        Self::Event(Box::new(event))
    }

    /// `REQ` message
    #[inline]
    pub fn req(subscription_id: SubscriptionId, filters: Vec<Filter>) -> Self {
        Self::Req {
            subscription_id,
            filters,
        }
    }

    /// `CLOSE` message
    #[inline]
    pub fn close(subscription_id: SubscriptionId) -> Self {
        Self::Close(subscription_id)
    }

    /// `AUTH` message
    #[inline]
    pub fn auth(event: Event) -> Self {
        Self::Auth(Box::new(event))
    }

    /// `COUNT` message
    #[inline]
    pub fn count(subscription_id: SubscriptionId, filters: Vec<Filter>) -> Self {
        Self::Count {
            subscription_id,
            filters,
        }
    }

    /// Check if this is an `EVENT` message
    #[inline]
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(..))
    }

    /// Check if this is a `REQ` message
    #[inline]
    pub fn is_req(&self) -> bool {
        matches!(self, Self::Req { .. })
    }

    /// Check if this is a `CLOSE` message
    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(..))
    }

    /// Serialize as a JSON array
    pub fn as_json(&self) -> String {
        self.as_value().to_string()
    }

    fn as_value(&self) -> Value {
        match self {
            Self::Event(event) => json!(["EVENT", event]),
            Self::Req {
                subscription_id,
                filters,
            } => {
                let mut array: Vec<Value> = vec![json!("REQ"), json!(subscription_id)];
                array.extend(filters.iter().map(|f| json!(f)));
                Value::Array(array)
            }
            Self::Close(subscription_id) => json!(["CLOSE", subscription_id]),
            Self::Auth(event) => json!(["AUTH", event]),
            Self::Count {
                subscription_id,
                filters,
            } => {
                let mut array: Vec<Value> = vec![json!("COUNT"), json!(subscription_id)];
                array.extend(filters.iter().map(|f| json!(f)));
                Value::Array(array)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::kind::Kind;
    use crate::key::PublicKey;

    #[test]
    fn test_req_serialization() {
        let pk = PublicKey::from_hex(
            "379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe",
        )
        .unwrap();
        let filters = vec![
            Filter::new().kind(Kind::new(4)),
            Filter::new().pubkey(pk),
        ];

        let msg = ClientMessage::req(SubscriptionId::new("test"), filters);
        assert_eq!(
            msg.as_json(),
            r##"["REQ","test",{"kinds":[4]},{"#p":["379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe"]}]"##
        );
    }

    #[test]
    fn test_close_serialization() {
        let msg = ClientMessage::close(SubscriptionId::new("test"));
        assert_eq!(msg.as_json(), r#"["CLOSE","test"]"#);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::from_json(r#"{"id":"70b10f70c1318967eddf12527799411b1a9780ad9c43858f5e5fcd45486a13a5","pubkey":"379e863e8357163b5bce5d2688dc4f1dcc2d505222fb8d74db600f30535dfdfe","created_at":1612809991,"kind":1,"tags":[],"content":"test","sig":"273a9cd5d11455590f4359500bccb7a89428262b96b3ea87a756b770964472f8c3e87f5d5e64d8d2e859a71462a3f477b554565c4f2f326cb01dd7620db71502"}"#).unwrap();
        let msg = ClientMessage::event(event);
        let json = msg.as_json();
        assert!(json.starts_with(r#"["EVENT",{"#));
        assert!(json.contains(r#""kind":1"#));
    }
}
