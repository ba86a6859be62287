use crate::SessionId;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::TryFrom;

/// Body of a `draw` event. Relayed verbatim, so the server never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawPayload(pub Value);

impl DrawPayload {
    /// Reads the payload as a stroke segment, if it has that shape.
    pub fn segment(&self) -> Option<DrawSegment> {
        serde_json::from_value(self.0.clone()).ok()
    }
}

/// One stroke segment as browsers send it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawSegment {
    pub x: f64,
    pub y: f64,
    pub prev_x: Option<f64>,
    pub prev_y: Option<f64>,
    /// `false` when the pointer moved without drawing.
    pub drawing: bool,
}

impl From<DrawSegment> for DrawPayload {
    fn from(segment: DrawSegment) -> Self {
        Self(json!({
            "x": segment.x,
            "y": segment.y,
            "prevX": segment.prev_x,
            "prevY": segment.prev_y,
            "drawing": segment.drawing,
        }))
    }
}

/// Client -> server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinSession(SessionId),
    Draw(DrawPayload),
    ClearCanvas,
}

/// Inbound frame before its event name is interpreted. A missing `data` reads as null.
#[derive(Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<ClientFrame> for ClientMessage {
    type Error = String;

    fn try_from(frame: ClientFrame) -> Result<Self, Self::Error> {
        match frame.event.as_str() {
            "joinSession" => match frame.data {
                Value::String(session_id) => Ok(ClientMessage::JoinSession(session_id.into())),
                other => Err(format!("joinSession expects a session id, got {}", other)),
            },
            "draw" => Ok(ClientMessage::Draw(DrawPayload(frame.data))),
            "clearCanvas" => Ok(ClientMessage::ClearCanvas),
            other => Err(format!("unknown event {:?}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for ClientMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let frame = ClientFrame::deserialize(deserializer)?;
        ClientMessage::try_from(frame).map_err(de::Error::custom)
    }
}

/// Server -> client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Draw(DrawPayload),
    ClearCanvas,
}

impl ClientMessage {
    /// The message peers receive for this event, or `None` for membership messages.
    pub fn into_relayed(self) -> Option<ServerMessage> {
        match self {
            ClientMessage::JoinSession(_) => None,
            ClientMessage::Draw(payload) => Some(ServerMessage::Draw(payload)),
            ClientMessage::ClearCanvas => Some(ServerMessage::ClearCanvas),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_join_session() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"joinSession","data":"abcd1234"}"#).expect("");
        assert_eq!(message, ClientMessage::JoinSession("abcd1234".into()));
    }

    #[test]
    fn it_parses_draw_with_null_previous_point() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"event":"draw","data":{"x":10,"y":20,"prevX":null,"prevY":null,"drawing":true}}"#,
        )
        .expect("");
        let payload = match message {
            ClientMessage::Draw(payload) => payload,
            other => panic!("unexpected message {:?}", other),
        };
        assert_eq!(
            payload.segment(),
            Some(DrawSegment {
                x: 10.0,
                y: 20.0,
                prev_x: None,
                prev_y: None,
                drawing: true,
            })
        );
    }

    #[test]
    fn it_keeps_malformed_draw_payload_untouched() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"draw","data":{"x":"left","extra":[1,2]}}"#)
                .expect("");
        let relayed = message.into_relayed().expect("draw is relayed");
        let frame = serde_json::to_value(&relayed).expect("");
        assert_eq!(
            frame,
            json!({"event": "draw", "data": {"x": "left", "extra": [1, 2]}})
        );
        if let ServerMessage::Draw(payload) = relayed {
            assert_eq!(payload.segment(), None);
        }
    }

    #[test]
    fn it_parses_clear_canvas_without_data() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"clearCanvas"}"#).expect("");
        assert_eq!(message, ClientMessage::ClearCanvas);
        assert_eq!(
            serde_json::to_string(&ServerMessage::ClearCanvas).expect(""),
            r#"{"event":"clearCanvas"}"#
        );
    }

    #[test]
    fn it_reads_draw_without_data_as_null_payload() {
        let message: ClientMessage = serde_json::from_str(r#"{"event":"draw"}"#).expect("");
        assert_eq!(message, ClientMessage::Draw(DrawPayload(Value::Null)));
        assert_eq!(
            serde_json::to_string(&message.into_relayed().expect("")).expect(""),
            r#"{"event":"draw","data":null}"#
        );
    }

    #[test]
    fn it_rejects_join_without_session_id() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"joinSession"}"#).is_err());
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"event":"joinSession","data":{}}"#).is_err()
        );
    }

    #[test]
    fn it_round_trips_client_messages() {
        let join = ClientMessage::JoinSession("abcd1234".into());
        let frame = serde_json::to_string(&join).expect("");
        assert_eq!(frame, r#"{"event":"joinSession","data":"abcd1234"}"#);
        assert_eq!(serde_json::from_str::<ClientMessage>(&frame).expect(""), join);
    }

    #[test]
    fn it_rejects_unknown_events() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"erase","data":1}"#).is_err());
    }

    #[test]
    fn it_does_not_relay_join() {
        assert_eq!(
            ClientMessage::JoinSession("abcd1234".into()).into_relayed(),
            None
        );
    }

    #[test]
    fn it_builds_payload_from_segment() {
        let segment = DrawSegment {
            x: 1.5,
            y: 2.5,
            prev_x: Some(1.0),
            prev_y: None,
            drawing: false,
        };
        let payload = DrawPayload::from(segment);
        assert_eq!(payload.segment(), Some(segment));
        assert_eq!(payload.0["prevY"], Value::Null);
    }
}
