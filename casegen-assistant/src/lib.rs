//! # casegen-assistant
//!
//! Conversational core of a test case generation assistant. A user loads a
//! specification document and an existing test case document, names a
//! feature, and gets new test cases drafted from the excerpts of both
//! documents most relevant to that feature.
//!
//! ## Flow
//!
//! ```text
//! load_specification → load_test_cases → specify_feature → generate_test_cases
//!                                             ↑                      │
//!                                             └──── menu choice ─────┘
//! ```
//!
//! Each step is a [`Command`] variant. [`Assistant::dispatch`] runs one and
//! returns a typed result; [`Assistant::respond`] also records the exchange
//! in the user's session and turns failures into a reply.
//!
//! ## Components
//!
//! - [`session`]: per-user state with idle expiry
//! - [`documents`]: turns a document link into text
//! - [`generation`]: prompt rendering and the test case generator contract
//! - [`server`]: line-delimited JSON loop over any async reader and writer
//!
//! Documents are split, embedded and searched by `casegen-retriever`; each
//! user's chunks are kept apart by a `user_id` metadata filter.
//!
//! ## Quick Start
//!
//! ```no_run
//! use casegen_assistant::{Assistant, AssistantConfig, Command};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let assistant = Assistant::from_config(&AssistantConfig::default())?;
//! let reply = assistant
//!     .respond(
//!         "here is the spec",
//!         Command::LoadSpecification {
//!             user_id: "u1".to_string(),
//!             doc_link: "docs/spec.txt".to_string(),
//!         },
//!     )
//!     .await;
//! println!("{}", reply.response());
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod commands;
pub mod documents;
pub mod error;
pub mod generation;
pub mod server;
pub mod session;

pub use assistant::{Assistant, SPECIFICATION_COLLECTION, TEST_CASES_COLLECTION};
pub use commands::{ChatRequest, Command, CommandOutput};
pub use error::{AssistantError, Result};

use casegen_retriever::config::CasegenConfig;
use generation::GeneratorConfig;
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Configuration for the assistant and the retrieval stack under it.
///
/// The retrieval sections (`[embedding]`, `[retrieval]`, `[ingestion]`) sit at
/// the top level of the file next to `[session]` and `[generator]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    #[serde(flatten)]
    pub retriever: CasegenConfig,
    pub session: SessionConfig,
    pub generator: GeneratorConfig,
    /// Directory relative document links are resolved against
    pub documents_root: Option<PathBuf>,
}

impl AssistantConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AssistantError::Config(message) => {
                AssistantError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AssistantError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retriever.validate()?;
        if self.session.ttl_secs == 0 {
            return Err(AssistantError::Config(
                "session.ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.session.reap_interval_secs == Some(0) {
            return Err(AssistantError::Config(
                "session.reap_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serve the chat loop on stdin and stdout until stdin closes.
pub async fn run_stdio(config: AssistantConfig) -> anyhow::Result<()> {
    info!("Starting casegen assistant");
    let assistant = Assistant::from_config(&config)?;

    let reaper = config
        .session
        .reap_interval_secs
        .map(|secs| assistant.sessions().spawn_reaper(Duration::from_secs(secs)));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = server::serve(&assistant, stdin, tokio::io::stdout()).await;

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    result.map(|_| ())
}
