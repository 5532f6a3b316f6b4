//! Command dispatch over the session store and the retrieval stack

use crate::AssistantConfig;
use crate::commands::{Command, CommandOutput};
use crate::documents::{DocumentSource, FileDocumentSource};
use crate::error::{AssistantError, Result};
use crate::generation::{PromptTemplate, TestCaseGenerator, create_generator};
use crate::session::{ConversationStep, MENU_OPTIONS, SessionStore};
use casegen_retriever::retrieval::{IngestReport, Retriever};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Collection holding specification chunks.
pub const SPECIFICATION_COLLECTION: &str = "specification";
/// Collection holding existing test case chunks.
pub const TEST_CASES_COLLECTION: &str = "test_cases";

const SPECIFICATION_LOADED: &str = "✅ Specification document has been loaded successfully.\n\
     Now, send a link to the Test Cases document.";
const TEST_CASES_LOADED: &str = "✅ Test Cases document has been loaded successfully.\n\
     Now, specify the name of the feature for which you want to generate test cases.";
const UPLOAD_NEW_DOCUMENTS: &str =
    "User wants to upload new documents. Awaiting for a link to Specification document";
const SESSION_CLEARED: &str = "The user's session has been cleared.";

/// The conversational core: one instance serves every user.
#[derive(Clone)]
pub struct Assistant {
    sessions: Arc<SessionStore>,
    retriever: Retriever,
    documents: Arc<dyn DocumentSource>,
    generator: Arc<dyn TestCaseGenerator>,
    template: PromptTemplate,
}

impl Assistant {
    pub fn new(
        sessions: Arc<SessionStore>,
        retriever: Retriever,
        documents: Arc<dyn DocumentSource>,
        generator: Arc<dyn TestCaseGenerator>,
    ) -> Self {
        Self {
            sessions,
            retriever,
            documents,
            generator,
            template: PromptTemplate::default(),
        }
    }

    pub fn with_template(self, template: PromptTemplate) -> Self {
        Self { template, ..self }
    }

    /// Build every collaborator from configuration.
    ///
    /// Does not start the session reaper; that needs a running runtime.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let retriever = Retriever::from_config(&config.retriever)?;
        let sessions = Arc::new(SessionStore::new(config.session.clone()));
        let documents: Arc<dyn DocumentSource> = match &config.documents_root {
            Some(root) => Arc::new(FileDocumentSource::new(root)),
            None => Arc::new(FileDocumentSource::default()),
        };
        let generator = create_generator(&config.generator)?;
        let template = config.generator.template()?;

        info!(
            "Assistant ready with {} generator",
            generator.generator_name()
        );
        Ok(Self::new(sessions, retriever, documents, generator).with_template(template))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Run one command.
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutput> {
        debug!("Dispatching {} for user {}", command.name(), command.user_id());

        match command {
            Command::LoadSpecification { user_id, doc_link } => {
                self.load_document(&user_id, &doc_link, SPECIFICATION_COLLECTION)
                    .await?;
                self.sessions
                    .update(&user_id, |session| {
                        session.spec_doc_link = Some(doc_link);
                        session.step = ConversationStep::AwaitingTestCases;
                    })
                    .await;
                Ok(CommandOutput::text(SPECIFICATION_LOADED))
            }
            Command::LoadTestCases { user_id, doc_link } => {
                self.load_document(&user_id, &doc_link, TEST_CASES_COLLECTION)
                    .await?;
                self.sessions
                    .update(&user_id, |session| {
                        session.test_cases_doc_link = Some(doc_link);
                        session.documents_loaded = true;
                        session.step = ConversationStep::AwaitingFeature;
                    })
                    .await;
                Ok(CommandOutput::text(TEST_CASES_LOADED))
            }
            Command::SpecifyFeature {
                user_id,
                feature_name,
            } => {
                let feature = feature_name.trim();
                if feature.is_empty() {
                    return Err(AssistantError::EmptyFeatureName);
                }
                let step = self
                    .sessions
                    .update(&user_id, |session| {
                        session.feature = Some(feature.to_string());
                        session.step = ConversationStep::AwaitingGeneration;
                        session.step
                    })
                    .await;
                Ok(CommandOutput::text(step.prompt()))
            }
            Command::GenerateTestCases { user_id } => self.generate(&user_id).await,
            Command::ChatHistory { user_id } => {
                let transcript = self
                    .sessions
                    .get(&user_id)
                    .await
                    .map(|session| session.transcript())
                    .unwrap_or_default();
                Ok(CommandOutput::text(transcript))
            }
            Command::CurrentStep { user_id } => Ok(CommandOutput::text(
                self.sessions.current_step(&user_id).await.prompt(),
            )),
            Command::UploadNewDocuments { user_id } => {
                self.sessions
                    .update(&user_id, |session| session.reset_context())
                    .await;
                Ok(CommandOutput::text(UPLOAD_NEW_DOCUMENTS))
            }
            Command::ClearSession { user_id } => {
                self.sessions.clear(&user_id).await;
                info!("Cleared session for user {}", user_id);
                Ok(CommandOutput::reset(SESSION_CLEARED))
            }
        }
    }

    /// Run one command on behalf of a chat message and record the exchange.
    ///
    /// Failures come back as a `⚠️ Error processing request` reply; the typed
    /// error is logged. Clearing a session leaves no history behind.
    pub async fn respond(&self, message: &str, command: Command) -> CommandOutput {
        let user_id = command.user_id().to_string();
        let name = command.name();
        let clears_session = matches!(command, Command::ClearSession { .. });

        let output = match self.dispatch(command).await {
            Ok(output) => output,
            Err(e) => {
                if e.is_internal() {
                    error!("Internal error in {} for user {}: {:?}", name, user_id, e);
                } else {
                    error!("Command {} for user {} failed: {}", name, user_id, e);
                }
                CommandOutput::text(format!("⚠️ Error processing request: {e}"))
            }
        };

        if !clears_session {
            self.sessions
                .record_exchange(&user_id, message, output.response())
                .await;
        }
        output
    }

    async fn load_document(&self, user_id: &str, link: &str, collection: &str) -> Result<IngestReport> {
        let document = self
            .documents
            .fetch(link)
            .await
            .map_err(|source| AssistantError::DocumentSource {
                link: link.to_string(),
                source,
            })?;
        if document.trim().is_empty() {
            return Err(AssistantError::EmptyDocument {
                link: link.to_string(),
            });
        }

        let report = self
            .retriever
            .ingestion
            .ingest(user_id, collection, &document)
            .await?;
        info!(
            "Loaded '{}' into {} for user {} as {} chunks",
            link,
            collection,
            user_id,
            report.chunk_count()
        );
        Ok(report)
    }

    async fn generate(&self, user_id: &str) -> Result<CommandOutput> {
        let Some(session) = self.sessions.get(user_id).await else {
            return Err(AssistantError::OutOfOrder {
                action: "generate test cases",
                expected: ConversationStep::default(),
            });
        };
        if !session.documents_loaded {
            return Err(AssistantError::OutOfOrder {
                action: "generate test cases",
                expected: session.step,
            });
        }
        let Some(feature) = session.feature else {
            return Err(AssistantError::OutOfOrder {
                action: "generate test cases",
                expected: ConversationStep::AwaitingFeature,
            });
        };

        let start = Instant::now();
        let engine = &self.retriever.engine;
        let (specification, test_cases) = futures::try_join!(
            engine.find_similar(&feature, SPECIFICATION_COLLECTION, user_id),
            engine.find_similar(&feature, TEST_CASES_COLLECTION, user_id)
        )?;
        debug!(
            "Feature '{}' matched {} specification and {} test case chunks",
            feature,
            specification.len(),
            test_cases.len()
        );

        let request = self.template.request(&feature, specification, test_cases);
        let generated = self
            .generator
            .generate(&request)
            .await
            .map_err(AssistantError::Generator)?;

        self.sessions
            .update(user_id, |session| {
                session.step = ConversationStep::AwaitingMenuChoice
            })
            .await;
        info!(
            "Generated test cases for '{}' (user {}) in {:?}",
            feature,
            user_id,
            start.elapsed()
        );
        Ok(CommandOutput::menu(generated, &MENU_OPTIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::InMemoryDocumentSource;
    use crate::generation::DryRunGenerator;
    use crate::session::SessionConfig;
    use casegen_retriever::config::CasegenConfig;

    fn assistant(documents: InMemoryDocumentSource) -> Assistant {
        Assistant::new(
            Arc::new(SessionStore::new(SessionConfig::default())),
            Retriever::from_config(&CasegenConfig::default()).unwrap(),
            Arc::new(documents),
            Arc::new(DryRunGenerator),
        )
        .with_template(PromptTemplate::new("{feature}|{specification}|{test_cases}"))
    }

    fn user() -> String {
        "u1".to_string()
    }

    #[tokio::test]
    async fn test_specify_feature() {
        let assistant = assistant(InMemoryDocumentSource::new());
        let output = assistant
            .dispatch(Command::SpecifyFeature {
                user_id: user(),
                feature_name: "  Login ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(output, CommandOutput::text("Awaiting for generating test cases."));

        let session = assistant.sessions().get("u1").await.unwrap();
        assert_eq!(session.feature.as_deref(), Some("Login"));
    }

    #[tokio::test]
    async fn test_blank_feature_rejected() {
        let assistant = assistant(InMemoryDocumentSource::new());
        let result = assistant
            .dispatch(Command::SpecifyFeature {
                user_id: user(),
                feature_name: "   ".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AssistantError::EmptyFeatureName)));
    }

    #[tokio::test]
    async fn test_generate_before_documents() {
        let assistant = assistant(InMemoryDocumentSource::new());
        let err = assistant
            .dispatch(Command::GenerateTestCases { user_id: user() })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot generate test cases yet. Awaiting for a link to Specification document"
        );
    }

    #[tokio::test]
    async fn test_load_reports_missing_document() {
        let assistant = assistant(InMemoryDocumentSource::new());
        let output = assistant
            .respond(
                "here is the spec",
                Command::LoadSpecification {
                    user_id: user(),
                    doc_link: "nowhere".to_string(),
                },
            )
            .await;
        assert!(output.response().starts_with("⚠️ Error processing request: Could not load document 'nowhere'"));
        assert_eq!(
            assistant.sessions().current_step("u1").await,
            ConversationStep::AwaitingSpecification
        );
    }

    #[tokio::test]
    async fn test_empty_document_rejected() {
        let assistant = assistant(InMemoryDocumentSource::new().with_document("blank", "  \n"));
        let result = assistant
            .dispatch(Command::LoadTestCases {
                user_id: user(),
                doc_link: "blank".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AssistantError::EmptyDocument { .. })));
    }

    #[tokio::test]
    async fn test_upload_new_documents_resets_context() {
        let assistant = assistant(InMemoryDocumentSource::new().with_document("spec", "Feature 1: Login"));
        assistant
            .dispatch(Command::LoadSpecification {
                user_id: user(),
                doc_link: "spec".to_string(),
            })
            .await
            .unwrap();

        let output = assistant
            .dispatch(Command::UploadNewDocuments { user_id: user() })
            .await
            .unwrap();
        assert_eq!(output.response(), UPLOAD_NEW_DOCUMENTS);

        let session = assistant.sessions().get("u1").await.unwrap();
        assert_eq!(session.spec_doc_link, None);
        assert_eq!(session.step, ConversationStep::AwaitingSpecification);
    }
}
