//! Opaque pagination cursors.
//!
//! A cursor is the serialized sort key of the last tuple returned, plus a
//! fingerprint of that key, base64-encoded (URL-safe, unpadded). Decoding
//! yields the position to resume strictly after. Raw database keys are
//! never exposed; the fingerprint lets us reject tokens that were not
//! minted by this encoding (truncation, stitched-together strings).
use crate::model::SortKey;
use crate::store::StoreError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    key: SortKey,
    fingerprint: Uuid,
}

fn fingerprint(key: &SortKey) -> Uuid {
    // Stable digest over every field of the key, in order.
    let material = format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
        key.namespace,
        key.object,
        key.relation,
        key.subject_kind,
        key.subject_namespace,
        key.subject_object,
        key.subject_relation,
    );
    Uuid::new_v5(&Uuid::nil(), material.as_bytes())
}

pub fn encode(key: &SortKey) -> String {
    let payload = TokenPayload {
        key: key.clone(),
        fingerprint: fingerprint(key),
    };
    // Serialization of plain strings and UUIDs cannot fail.
    let json = serde_json::to_vec(&payload).expect("serialize page token");
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(token: &str) -> Result<SortKey, StoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|err| StoreError::InvalidCursor(err.to_string()))?;
    let payload: TokenPayload = serde_json::from_slice(&bytes)
        .map_err(|err| StoreError::InvalidCursor(err.to_string()))?;
    if payload.fingerprint != fingerprint(&payload.key) {
        return Err(StoreError::InvalidCursor(
            "fingerprint mismatch".to_string(),
        ));
    }
    Ok(payload.key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::UuidMapper;
    use crate::model::{RelationTuple, Subject};

    fn key() -> SortKey {
        RelationTuple {
            namespace: "files".to_string(),
            object: UuidMapper::object_id("readme"),
            relation: "view".to_string(),
            subject: Subject::Id(UuidMapper::object_id("alice")),
        }
        .sort_key()
    }

    #[test]
    fn round_trip() {
        let key = key();
        let token = encode(&key);
        assert_eq!(decode(&token).expect("decode"), key);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode("not base64!"),
            Err(StoreError::InvalidCursor(_))
        ));
        assert!(matches!(
            decode(&URL_SAFE_NO_PAD.encode(b"{\"key\":42}")),
            Err(StoreError::InvalidCursor(_))
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = encode(&key());
        let mut json = URL_SAFE_NO_PAD.decode(&token).expect("decode");
        // Flip a byte inside the namespace string.
        let position = json
            .iter()
            .position(|&b| b == b'f')
            .expect("namespace byte");
        json[position] = b'g';
        let tampered = URL_SAFE_NO_PAD.encode(json);
        assert!(matches!(
            decode(&tampered),
            Err(StoreError::InvalidCursor(_))
        ));
    }
}
