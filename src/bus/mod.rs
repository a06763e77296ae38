use chrono::{DateTime, Utc};

/// What an inbound event carries, already decoded from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Contact { phone: String },
    Location { lat: f64, lon: f64 },
    /// An inline-button press; `data` is the raw `action:session:ref` string.
    Action { data: String },
}

/// One unit of inbound work: a customer message, a shared contact or
/// location, or a button action. Events for different sessions are handled
/// concurrently; events for the same session are serialized by the store.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Chat the event originated from (customer chat or merchant channel).
    pub chat_id: String,
    /// Display name of the human who triggered the event.
    pub sender_name: String,
    pub username: Option<String>,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_name: String::new(),
            username: None,
            payload: Payload::Text(content.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Decoded inline-button action. The wire format is
/// `action:sessionId:reference`, where the reference is an order id for
/// merchant decisions and a transaction reference for payment actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Accept { chat_id: String, order_id: String },
    Decline { chat_id: String, order_id: String },
    CheckPayment { chat_id: String, tx_ref: String },
    CancelPayment { chat_id: String, tx_ref: String },
}

impl Action {
    /// Parse callback data. Unparseable payloads yield `None` and are
    /// silently ignored by the caller.
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        let kind = parts.next()?;
        let chat_id = parts.next()?.to_string();
        let reference = parts.next()?.to_string();
        if chat_id.is_empty() || reference.is_empty() {
            return None;
        }
        match kind {
            "accept" => Some(Self::Accept {
                chat_id,
                order_id: reference,
            }),
            "decline" => Some(Self::Decline {
                chat_id,
                order_id: reference,
            }),
            "paycheck" => Some(Self::CheckPayment {
                chat_id,
                tx_ref: reference,
            }),
            "paycancel" => Some(Self::CancelPayment {
                chat_id,
                tx_ref: reference,
            }),
            _ => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Accept { chat_id, order_id } => format!("accept:{chat_id}:{order_id}"),
            Self::Decline { chat_id, order_id } => format!("decline:{chat_id}:{order_id}"),
            Self::CheckPayment { chat_id, tx_ref } => format!("paycheck:{chat_id}:{tx_ref}"),
            Self::CancelPayment { chat_id, tx_ref } => format!("paycancel:{chat_id}:{tx_ref}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_constructor_fills_payload() {
        let event = InboundEvent::text("42", "hello");
        assert_eq!(event.chat_id, "42");
        assert_eq!(event.payload, Payload::Text("hello".into()));
    }

    #[test]
    fn actions_round_trip_through_the_wire_format() {
        let action = Action::Accept {
            chat_id: "12345".into(),
            order_id: "#87654321".into(),
        };
        assert_eq!(action.encode(), "accept:12345:#87654321");
        assert_eq!(Action::parse(&action.encode()), Some(action));

        let pay = Action::CheckPayment {
            chat_id: "12345".into(),
            tx_ref: "TXN-AB12CD34EF56".into(),
        };
        assert_eq!(Action::parse(&pay.encode()), Some(pay));
    }

    #[test]
    fn malformed_payloads_parse_to_none() {
        assert_eq!(Action::parse(""), None);
        assert_eq!(Action::parse("accept"), None);
        assert_eq!(Action::parse("accept:12345"), None);
        assert_eq!(Action::parse("accept::#1"), None);
        assert_eq!(Action::parse("explode:12345:#1"), None);
    }
}
