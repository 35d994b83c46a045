//! Inbound messages posted by the page
//!
//! The page calls `post_message(channel, body)`; the channel names follow the
//! WebXR polyfill's native message handlers.

use serde_json::{Map, Value};

use crate::config::session::ERROR_BRIDGE_CALLBACK;
use crate::error::MessageError;

pub const CHANNEL_INIT: &str = "initAR";
pub const CHANNEL_REQUEST_SESSION: &str = "requestSession";
pub const CHANNEL_STOP: &str = "stopAR";
pub const CHANNEL_HIT_TEST: &str = "hitTest";

/// Command from the web runtime to the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    Init {
        callback: Option<String>,
    },
    RequestSession {
        options: Map<String, Value>,
        data_callback: String,
        callback: Option<String>,
    },
    StopSession {
        callback: Option<String>,
    },
    /// Hit testing is not implemented; the message is recognised and dropped.
    HitTest,
    /// Uncaught script error forwarded by the injected error hook
    ErrorReport {
        message: String,
    },
}

impl BridgeMessage {
    pub fn parse(channel: &str, body: &Value) -> Result<Self, MessageError> {
        let callback = string_field(body, "callback");

        match channel {
            CHANNEL_INIT if callback.as_deref() == Some(ERROR_BRIDGE_CALLBACK) => {
                Ok(Self::ErrorReport {
                    message: string_field(body, "error_message").unwrap_or_default(),
                })
            }
            CHANNEL_INIT => Ok(Self::Init { callback }),
            CHANNEL_REQUEST_SESSION => {
                let options = body
                    .get("options")
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or(MessageError::MissingField {
                        channel: CHANNEL_REQUEST_SESSION,
                        field: "options",
                    })?;
                let data_callback =
                    string_field(body, "data_callback").ok_or(MessageError::MissingField {
                        channel: CHANNEL_REQUEST_SESSION,
                        field: "data_callback",
                    })?;
                Ok(Self::RequestSession {
                    options,
                    data_callback,
                    callback,
                })
            }
            CHANNEL_STOP => Ok(Self::StopSession { callback }),
            CHANNEL_HIT_TEST => Ok(Self::HitTest),
            other => Err(MessageError::UnknownChannel(other.to_string())),
        }
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_session() {
        let msg = BridgeMessage::parse(
            CHANNEL_REQUEST_SESSION,
            &json!({"options": {"ui": false}, "data_callback": "cb", "callback": "ack"}),
        )
        .unwrap();
        match msg {
            BridgeMessage::RequestSession {
                options,
                data_callback,
                callback,
            } => {
                assert_eq!(options.get("ui"), Some(&json!(false)));
                assert_eq!(data_callback, "cb");
                assert_eq!(callback.as_deref(), Some("ack"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_session_requires_options() {
        let err = BridgeMessage::parse(CHANNEL_REQUEST_SESSION, &json!({"data_callback": "cb"}))
            .unwrap_err();
        assert!(matches!(
            err,
            MessageError::MissingField {
                field: "options",
                ..
            }
        ));

        let err = BridgeMessage::parse(
            CHANNEL_REQUEST_SESSION,
            &json!({"options": "nope", "data_callback": "cb"}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MessageError::MissingField {
                field: "options",
                ..
            }
        ));
    }

    #[test]
    fn test_request_session_requires_data_callback() {
        let err = BridgeMessage::parse(
            CHANNEL_REQUEST_SESSION,
            &json!({"options": {}, "data_callback": 5}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MessageError::MissingField {
                field: "data_callback",
                ..
            }
        ));
    }

    #[test]
    fn test_error_report_rides_init_channel() {
        let msg = BridgeMessage::parse(
            CHANNEL_INIT,
            &json!({"callback": "console_error_bridge", "error_message": "boom"}),
        )
        .unwrap();
        assert_eq!(
            msg,
            BridgeMessage::ErrorReport {
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_init_stop_and_hit_test() {
        assert_eq!(
            BridgeMessage::parse(CHANNEL_INIT, &json!({"callback": "hello"})).unwrap(),
            BridgeMessage::Init {
                callback: Some("hello".into())
            }
        );
        assert_eq!(
            BridgeMessage::parse(CHANNEL_STOP, &Value::Null).unwrap(),
            BridgeMessage::StopSession { callback: None }
        );
        assert_eq!(
            BridgeMessage::parse(CHANNEL_HIT_TEST, &json!({"x": 0.5})).unwrap(),
            BridgeMessage::HitTest
        );
    }

    #[test]
    fn test_unknown_channel() {
        assert!(matches!(
            BridgeMessage::parse("teleport", &json!({})),
            Err(MessageError::UnknownChannel(c)) if c == "teleport"
        ));
    }
}
