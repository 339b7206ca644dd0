use crate::lsp::types::{Message, RequestMessage, ResponseMessage};
use anyhow::anyhow;

pub fn parse_request(json: &serde_json::Value) -> anyhow::Result<Option<Message>> {
    if json.get("method").is_some() {
        let request: RequestMessage = serde_json::from_value(json.clone())?;
        if request.id.is_set() {
            return Ok(Some(Message::Request(request)));
        }
        return Ok(Some(Message::Notification(request)));
    }
    Ok(None)
}

pub fn parse_response(json: &serde_json::Value) -> anyhow::Result<Option<Message>> {
    if json.get("result").is_some() || json.get("error").is_some() {
        let response: ResponseMessage = serde_json::from_value(json.clone())?;
        return Ok(Some(Message::Response(response)));
    }
    Ok(None)
}

/// Parse a full JSON payload (bytes) into a `Message` (Request/Notification/Response).
pub fn parse_message(payload: &[u8]) -> anyhow::Result<Message> {
    let json: serde_json::Value = serde_json::from_slice(payload)?;
    if let Some(request) = parse_request(&json)? {
        return Ok(request);
    }
    if let Some(response) = parse_response(&json)? {
        return Ok(response);
    }
    Err(anyhow!("payload is neither a request nor a response"))
}

#[cfg(test)]
mod tests {
    use super::parse_message;
    use crate::lsp::types::{Message, RequestId};

    #[test]
    fn test_classifies_request_notification_and_response() {
        let request = parse_message(br#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#).unwrap();
        assert!(matches!(request, Message::Request(ref r) if r.id == RequestId::Int(1)));

        let notification =
            parse_message(br#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#).unwrap();
        assert!(matches!(notification, Message::Notification(_)));

        let response = parse_message(br#"{"jsonrpc":"2.0","id":"a","result":null}"#).unwrap();
        match response {
            Message::Response(r) => assert_eq!(r.id, RequestId::Str("a".to_string())),
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn test_error_response_is_a_response() {
        let message = parse_message(
            br#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"nope"}}"#,
        )
        .unwrap();
        match message {
            Message::Response(r) => assert_eq!(r.error.unwrap().code, -32601),
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn test_rejects_other_payloads() {
        assert!(parse_message(br#"{"jsonrpc":"2.0"}"#).is_err());
        assert!(parse_message(b"not json").is_err());
    }
}
