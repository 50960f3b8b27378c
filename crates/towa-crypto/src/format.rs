//! Envelope wire format.
//!
//! Envelopes travel as compact JSON with camelCase keys and lowercase hex
//! byte fields:
//!
//! ```text
//! {
//!   "version": 1,
//!   "question": "favorite color?",
//!   "kdfParams": { "salt": "<64 hex>", "iterations": 3, "memoryKiB": 65536, "parallelism": 1 },
//!   "wrappedMessageKey": "<64 hex>",
//!   "wrapIv": "<24 hex>",
//!   "wrapTag": "<32 hex>",
//!   "answerCheck": "<32 hex>",
//!   "encryptedContent": "<hex>",
//!   "contentIv": "<24 hex>",
//!   "contentTag": "<32 hex>"
//! }
//! ```
//!
//! Decoding is strict: unknown fields, wrong lengths, uppercase hex and KDF
//! parameters outside the accepted bounds are all rejected.

use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, ENVELOPE_VERSION};
use crate::error::{CryptoResult, LetterError, LetterResult};
use crate::kdf::KdfParams;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireKdfParams {
    salt: String,
    iterations: u32,
    #[serde(rename = "memoryKiB")]
    memory_kib: u32,
    parallelism: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireEnvelope {
    version: u32,
    question: String,
    kdf_params: WireKdfParams,
    wrapped_message_key: String,
    wrap_iv: String,
    wrap_tag: String,
    answer_check: String,
    encrypted_content: String,
    content_iv: String,
    content_tag: String,
}

/// Encode an envelope to its canonical JSON form.
pub fn encode_envelope(envelope: &Envelope) -> CryptoResult<String> {
    let wire = WireEnvelope {
        version: envelope.version,
        question: envelope.question.clone(),
        kdf_params: WireKdfParams {
            salt: hex::encode(envelope.salt),
            iterations: envelope.kdf_params.iterations,
            memory_kib: envelope.kdf_params.memory_kib,
            parallelism: envelope.kdf_params.parallelism,
        },
        wrapped_message_key: hex::encode(envelope.wrapped_message_key),
        wrap_iv: hex::encode(envelope.wrap_iv),
        wrap_tag: hex::encode(envelope.wrap_tag),
        answer_check: hex::encode(envelope.answer_check),
        encrypted_content: hex::encode(&envelope.encrypted_content),
        content_iv: hex::encode(envelope.content_iv),
        content_tag: hex::encode(envelope.content_tag),
    };
    Ok(serde_json::to_string(&wire)?)
}

/// Decode and validate an envelope.
pub fn decode_envelope(data: &[u8]) -> LetterResult<Envelope> {
    let wire: WireEnvelope = serde_json::from_slice(data)
        .map_err(|e| LetterError::MalformedEnvelope(e.to_string()))?;

    if wire.version != ENVELOPE_VERSION {
        return Err(LetterError::MalformedEnvelope(format!(
            "unsupported version {}",
            wire.version
        )));
    }

    let kdf_params = KdfParams::new(
        wire.kdf_params.iterations,
        wire.kdf_params.memory_kib,
        wire.kdf_params.parallelism,
    );
    kdf_params
        .validate()
        .map_err(|e| LetterError::MalformedEnvelope(e.to_string()))?;

    Ok(Envelope {
        version: wire.version,
        question: wire.question,
        salt: hex_array("kdfParams.salt", &wire.kdf_params.salt)?,
        kdf_params,
        wrapped_message_key: hex_array("wrappedMessageKey", &wire.wrapped_message_key)?,
        wrap_iv: hex_array("wrapIv", &wire.wrap_iv)?,
        wrap_tag: hex_array("wrapTag", &wire.wrap_tag)?,
        answer_check: hex_array("answerCheck", &wire.answer_check)?,
        encrypted_content: hex_vec("encryptedContent", &wire.encrypted_content)?,
        content_iv: hex_array("contentIv", &wire.content_iv)?,
        content_tag: hex_array("contentTag", &wire.content_tag)?,
    })
}

fn hex_vec(field: &str, value: &str) -> LetterResult<Vec<u8>> {
    if value.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(LetterError::MalformedEnvelope(format!(
            "{} must be lowercase hex",
            field
        )));
    }
    hex::decode(value).map_err(|e| LetterError::MalformedEnvelope(format!("{}: {}", field, e)))
}

fn hex_array<const N: usize>(field: &str, value: &str) -> LetterResult<[u8; N]> {
    let bytes = hex_vec(field, value)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        LetterError::MalformedEnvelope(format!(
            "{}: expected {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}

/// Serde helper for `Vec<u8>` fields carried as base64 strings.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}
