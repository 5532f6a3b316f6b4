//! Error types for the assistant core

use crate::session::ConversationStep;
use casegen_retriever::RetrieverError;

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Failure of one assistant command.
///
/// Retrieval errors keep their typed form so callers can tell an invariant
/// violation apart from a provider outage. Collaborator failures arrive as
/// `anyhow::Error` because their implementations live outside this crate.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    /// The document behind a link could not be fetched
    #[error("Could not load document '{link}': {source}")]
    DocumentSource {
        link: String,
        #[source]
        source: anyhow::Error,
    },

    /// The fetched document had no text to ingest
    #[error("Document '{link}' is empty")]
    EmptyDocument { link: String },

    /// The test case generator failed
    #[error("Test case generation failed: {0}")]
    Generator(#[source] anyhow::Error),

    #[error("Feature name must not be empty")]
    EmptyFeatureName,

    /// The command needs state an earlier step should have produced
    #[error("Cannot {action} yet. {expected}")]
    OutOfOrder {
        action: &'static str,
        expected: ConversationStep,
    },

    #[error("Invalid assistant configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssistantError {
    /// Whether the failure points at a bug rather than bad input or an outage.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Retriever(e) if e.is_invariant_violation())
    }
}
