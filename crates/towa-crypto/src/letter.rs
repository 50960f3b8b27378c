//! Letter content: HTML body plus attachments, sealed as one JSON plaintext.

use serde::{Deserialize, Serialize};

use crate::envelope::{open, seal, Envelope, SealOptions, SealedLetter};
use crate::error::{CryptoError, LetterError, LetterResult};
use crate::format::base64_bytes;

/// A file attached to a letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// The plaintext of a letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterContent {
    pub html: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl LetterContent {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Total size of all attachment data in bytes.
    pub fn attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(|a| a.data.len() as u64).sum()
    }
}

/// Serialize and seal letter content.
///
/// The size ceiling applies to the serialized JSON.
pub fn seal_letter(
    content: &LetterContent,
    question: &str,
    answer: &str,
    options: &SealOptions,
) -> LetterResult<SealedLetter> {
    let plaintext = serde_json::to_vec(content).map_err(CryptoError::from)?;
    seal(&plaintext, question, answer, options)
}

/// Open an envelope and parse the letter content.
pub fn open_letter(envelope: &Envelope, answer: &str) -> LetterResult<LetterContent> {
    let plaintext = open(envelope, answer)?;
    serde_json::from_slice(&plaintext)
        .map_err(|e| LetterError::MalformedEnvelope(format!("content is not a letter: {}", e)))
}
