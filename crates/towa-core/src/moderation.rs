//! Allow-all moderation gate.
//!
//! Stands in for an external moderation service. Every request is approved;
//! the gate still exists so callers are wired the way a real gate needs.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::{ModerationRequest, ModerationVerdict};
use crate::traits::ModerationGate;

/// Moderation gate that approves everything.
#[derive(Debug, Clone, Default)]
pub struct AllowAllModeration;

#[async_trait]
impl ModerationGate for AllowAllModeration {
    async fn check(&self, request: &ModerationRequest) -> Result<ModerationVerdict> {
        debug!(
            subsystem = "api",
            component = "moderation",
            op = "check",
            content_len = request.text.len(),
            attachment_count = request.attachment_count,
            attachment_bytes = request.attachment_bytes,
            "Moderation check requested"
        );

        Ok(ModerationVerdict {
            approved: true,
            confidence: 0.95,
            flags: Vec::new(),
            message: "Content approved by moderation system".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allow_all_approves() {
        let gate = AllowAllModeration;
        let verdict = gate
            .check(&ModerationRequest {
                text: "Hello".to_string(),
                attachment_count: 2,
                attachment_bytes: 1024,
            })
            .await
            .unwrap();
        assert!(verdict.approved);
        assert!(verdict.flags.is_empty());
        assert_eq!(verdict.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_allow_all_approves_empty_request() {
        let verdict = AllowAllModeration
            .check(&ModerationRequest::default())
            .await
            .unwrap();
        assert!(verdict.approved);
    }
}
