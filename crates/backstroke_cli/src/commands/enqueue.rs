use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use backstroke::{OperationPayload, OperationQueue, SqlQueue, connect_and_migrate};
use serde_json::Value;

fn read_payload(file: &Path) -> std::io::Result<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
    }
}

/// Parse and validate a payload, stamping the correlation id when given.
fn prepare_payload(
    raw: &str,
    from_request: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut payload: Value = serde_json::from_str(raw)?;
    // Reject payloads the worker could not decode.
    serde_json::from_value::<OperationPayload>(payload.clone())
        .map_err(|e| format!("Invalid operation payload: {e}"))?;

    if let Some(request) = from_request {
        let object = payload
            .as_object_mut()
            .ok_or("Operation payload must be a JSON object")?;
        object.insert("fromRequest".to_string(), Value::String(request));
    }
    Ok(payload)
}

pub(crate) async fn handle_enqueue(
    file: &Path,
    from_request: Option<String>,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = prepare_payload(&read_payload(file)?, from_request)?;

    let db = connect_and_migrate(database_url).await?;
    let queue: Arc<dyn OperationQueue> = Arc::new(SqlQueue::new(Arc::new(db)));
    let id = queue.push(payload).await?;
    tracing::info!(operation_id = %id, "operation enqueued");
    println!("{id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "type": "MANUAL",
        "user": {"username": "rgaus", "accessToken": "ghp_x"},
        "link": {"id": 8, "enabled": true, "upstreamType": "repo", "forkType": "repo"}
    }"#;

    #[test]
    fn valid_payload_passes_through() {
        let payload = prepare_payload(PAYLOAD, None).unwrap();
        assert_eq!(payload["type"], "MANUAL");
        assert!(payload.get("fromRequest").is_none());
    }

    #[test]
    fn correlation_id_is_stamped() {
        let payload = prepare_payload(PAYLOAD, Some("req-1".into())).unwrap();
        assert_eq!(payload["fromRequest"], "req-1");
    }

    #[test]
    fn payload_without_link_is_rejected() {
        let err = prepare_payload(r#"{"type": "MANUAL"}"#, None).unwrap_err();
        assert!(err.to_string().starts_with("Invalid operation payload"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(prepare_payload("{not json", None).is_err());
    }
}
