//! Inline Row Verification
//!
//! Seam for the fingerprint verifier that runs inside the batch
//! applier's transaction. The hash itself lives outside the core; the
//! applier only asks which pagination keys mismatch and aborts the
//! batch atomically when any do.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, Transaction};

use crate::copy::InsertRowBatch;
use crate::error::Result;
use crate::schema::QualifiedTableName;

/// Verifier selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerifierType {
    #[default]
    NoVerification,
    InlineFingerprint,
}

/// Fingerprint check executed inside the batch transaction. Returns the
/// pagination keys whose target rows do not match the batch.
#[async_trait]
pub trait InlineRowVerifier: Send + Sync {
    async fn verify_batch(
        &self,
        tx: &mut Transaction<'_, MySql>,
        target: &QualifiedTableName,
        batch: &InsertRowBatch,
    ) -> Result<Vec<u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_type_parsing() {
        let parsed: VerifierType = serde_json::from_str("\"inline_fingerprint\"").unwrap();
        assert_eq!(parsed, VerifierType::InlineFingerprint);
        assert_eq!(VerifierType::default(), VerifierType::NoVerification);
    }
}
