use anyhow::anyhow;
use async_trait::async_trait;
use casegen_assistant::documents::{FileDocumentSource, InMemoryDocumentSource};
use casegen_assistant::generation::{GenerationRequest, PromptTemplate, TestCaseGenerator};
use casegen_assistant::session::{ConversationStep, ManualClock, SessionConfig, SessionStore};
use casegen_assistant::{Assistant, Command, CommandOutput, SPECIFICATION_COLLECTION};
use casegen_embed::{EmbeddingProvider, EmbeddingResult, TaskType, normalize};
use casegen_retriever::config::CasegenConfig;
use casegen_retriever::retrieval::Retriever;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tracing_test::traced_test;

const SPEC: &str = "Overview of the product\n\
Feature 1: Login\nUsers sign in with email and password.\n\
Feature 2: Export\nReports can be exported as CSV.";

const CASES: &str = "Feature 1: Login\nTC-1 valid credentials open the dashboard.\n\
Feature 2: Export\nTC-7 export produces a CSV file.";

/// One dimension per keyword plus a catch-all, so texts sharing a keyword
/// land on the same unit vector.
struct KeywordProvider {
    keywords: Vec<&'static str>,
}

impl KeywordProvider {
    fn new() -> Self {
        Self {
            keywords: vec!["login", "export"],
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect();
        let matched = vector.iter().any(|v| *v > 0.0);
        vector.push(if matched { 0.0 } else { 1.0 });
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed_texts(
        &self,
        texts: &[String],
        _task: TaskType,
    ) -> casegen_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| self.embed(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        self.keywords.len() + 1
    }

    fn provider_name(&self) -> &str {
        "keyword"
    }
}

#[derive(Default)]
struct RecordingGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
}

#[async_trait]
impl TestCaseGenerator for RecordingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("Generated cases for {}", request.feature))
    }

    fn generator_name(&self) -> &str {
        "recording"
    }
}

struct OfflineGenerator;

#[async_trait]
impl TestCaseGenerator for OfflineGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<String> {
        Err(anyhow!("model offline"))
    }

    fn generator_name(&self) -> &str {
        "offline"
    }
}

fn retriever() -> Retriever {
    Retriever::with_provider(&CasegenConfig::default(), Arc::new(KeywordProvider::new())).unwrap()
}

fn build(
    sessions: SessionStore,
    documents: Arc<dyn casegen_assistant::documents::DocumentSource>,
    generator: Arc<dyn TestCaseGenerator>,
) -> Assistant {
    Assistant::new(Arc::new(sessions), retriever(), documents, generator)
        .with_template(PromptTemplate::new("{feature}\n{specification}\n{test_cases}"))
}

fn load_spec(user: &str, link: &str) -> Command {
    Command::LoadSpecification {
        user_id: user.to_string(),
        doc_link: link.to_string(),
    }
}

fn load_cases(user: &str, link: &str) -> Command {
    Command::LoadTestCases {
        user_id: user.to_string(),
        doc_link: link.to_string(),
    }
}

fn feature(user: &str, name: &str) -> Command {
    Command::SpecifyFeature {
        user_id: user.to_string(),
        feature_name: name.to_string(),
    }
}

fn generate(user: &str) -> Command {
    Command::GenerateTestCases {
        user_id: user.to_string(),
    }
}

fn current_step(user: &str) -> Command {
    Command::CurrentStep {
        user_id: user.to_string(),
    }
}

#[tokio::test]
async fn test_full_flow_from_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("spec.txt"), SPEC).unwrap();
    std::fs::write(dir.path().join("cases.txt"), CASES).unwrap();

    let generator = Arc::new(RecordingGenerator::default());
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(FileDocumentSource::new(dir.path())),
        generator.clone(),
    );

    let reply = assistant.respond("my spec", load_spec("u1", "spec.txt")).await;
    assert_eq!(
        reply.response(),
        "✅ Specification document has been loaded successfully.\nNow, send a link to the Test Cases document."
    );
    assert_eq!(
        assistant.respond("where am I", current_step("u1")).await.response(),
        "Awaiting for a link to Test Cases document."
    );

    let reply = assistant.respond("my cases", load_cases("u1", "cases.txt")).await;
    assert!(reply.response().starts_with("✅ Test Cases document has been loaded successfully."));

    let reply = assistant.respond("Login", feature("u1", "Login")).await;
    assert_eq!(reply.response(), "Awaiting for generating test cases.");

    let reply = assistant.respond("go", generate("u1")).await;
    assert_eq!(
        reply,
        CommandOutput::Menu {
            response: "Generated cases for Login".to_string(),
            menu: vec![
                "🔄 Extract another feature".to_string(),
                "📄 Upload new documents".to_string(),
                "❌ End session".to_string(),
            ],
        }
    );

    let requests = generator.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].specification,
        vec!["Overview of the product\nFeature 1: Login\nUsers sign in with email and password."]
    );
    assert_eq!(
        requests[0].test_cases,
        vec!["Feature 1: Login\nTC-1 valid credentials open the dashboard."]
    );
    assert!(requests[0].prompt.starts_with("Login\nOverview of the product\nFeature 1: Login"));

    let step = assistant.sessions().current_step("u1").await;
    assert_eq!(step, ConversationStep::AwaitingMenuChoice);

    let history = assistant
        .dispatch(Command::ChatHistory {
            user_id: "u1".to_string(),
        })
        .await
        .unwrap();
    assert!(history.response().starts_with("User: my spec\nAssistant: ✅ Specification"));
    assert!(history.response().contains("User: go\nAssistant: Generated cases for Login\n"));

    let reply = assistant
        .respond(
            "bye",
            Command::ClearSession {
                user_id: "u1".to_string(),
            },
        )
        .await;
    assert_eq!(reply, CommandOutput::reset("The user's session has been cleared."));
    assert!(assistant.sessions().get("u1").await.is_none());
}

#[tokio::test]
async fn test_users_only_see_their_own_documents() {
    let documents = InMemoryDocumentSource::new()
        .with_document("spec-a", "Feature 1: Login\nAlice's login rules.")
        .with_document("spec-b", "Feature 1: Login\nBob's login rules.")
        .with_document("cases", CASES);
    let generator = Arc::new(RecordingGenerator::default());
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(documents),
        generator.clone(),
    );

    for (user, spec) in [("alice", "spec-a"), ("bob", "spec-b")] {
        assistant.dispatch(load_spec(user, spec)).await.unwrap();
        assistant.dispatch(load_cases(user, "cases")).await.unwrap();
        assistant.dispatch(feature(user, "login")).await.unwrap();
    }
    assistant.dispatch(generate("bob")).await.unwrap();

    let requests = generator.requests.lock().unwrap().clone();
    assert_eq!(requests[0].specification, vec!["Feature 1: Login\nBob's login rules."]);

    let stats = assistant
        .retriever()
        .db
        .stats(SPECIFICATION_COLLECTION)
        .await
        .unwrap();
    assert_eq!(stats.chunks, 2);
}

#[tokio::test]
async fn test_generate_requires_loaded_documents() {
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(InMemoryDocumentSource::new().with_document("spec", SPEC)),
        Arc::new(RecordingGenerator::default()),
    );
    assistant.dispatch(load_spec("u1", "spec")).await.unwrap();

    let reply = assistant.respond("generate", generate("u1")).await;
    assert_eq!(
        reply.response(),
        "⚠️ Error processing request: Cannot generate test cases yet. \
         Awaiting for a link to Test Cases document."
    );
}

#[tokio::test]
#[traced_test]
async fn test_generator_failure_degrades_to_message() {
    let documents = InMemoryDocumentSource::new()
        .with_document("spec", SPEC)
        .with_document("cases", CASES);
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(documents),
        Arc::new(OfflineGenerator),
    );
    assistant.dispatch(load_spec("u1", "spec")).await.unwrap();
    assistant.dispatch(load_cases("u1", "cases")).await.unwrap();
    assistant.dispatch(feature("u1", "Export")).await.unwrap();

    let reply = assistant.respond("go", generate("u1")).await;
    assert_eq!(
        reply,
        CommandOutput::text("⚠️ Error processing request: Test case generation failed: model offline")
    );
    assert_eq!(
        assistant.sessions().current_step("u1").await,
        ConversationStep::AwaitingGeneration
    );
    assert!(logs_contain("Command generate_test_cases for user u1 failed"));
}

#[tokio::test]
async fn test_idle_session_expires_but_documents_stay() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let sessions = SessionStore::with_clock(
        SessionConfig {
            ttl_secs: 60,
            ..SessionConfig::default()
        },
        clock.clone(),
    );
    let assistant = build(
        sessions,
        Arc::new(InMemoryDocumentSource::new().with_document("spec", SPEC)),
        Arc::new(RecordingGenerator::default()),
    );

    assistant.respond("spec", load_spec("u1", "spec")).await;
    clock.advance(Duration::from_secs(61));

    assert_eq!(
        assistant.respond("hello?", current_step("u1")).await.response(),
        "Awaiting for a link to Specification document"
    );
    let session = assistant.sessions().get("u1").await.unwrap();
    assert_eq!(session.spec_doc_link, None);
    assert_eq!(session.history.len(), 2);

    let stats = assistant
        .retriever()
        .db
        .stats(SPECIFICATION_COLLECTION)
        .await
        .unwrap();
    assert_eq!(stats.chunks, 2);
}

#[tokio::test]
async fn test_reloading_a_shorter_spec_drops_old_features() {
    let documents = InMemoryDocumentSource::new()
        .with_document("v1", SPEC)
        .with_document("v2", "Feature 1: Login\nSingle sign-on only.")
        .with_document("cases", CASES);
    let generator = Arc::new(RecordingGenerator::default());
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(documents),
        generator.clone(),
    );

    assistant.dispatch(load_spec("u1", "v1")).await.unwrap();
    assistant
        .dispatch(Command::UploadNewDocuments {
            user_id: "u1".to_string(),
        })
        .await
        .unwrap();
    assistant.dispatch(load_spec("u1", "v2")).await.unwrap();
    assistant.dispatch(load_cases("u1", "cases")).await.unwrap();
    assistant.dispatch(feature("u1", "Export")).await.unwrap();
    assistant.dispatch(generate("u1")).await.unwrap();

    let requests = generator.requests.lock().unwrap().clone();
    assert!(requests[0].specification.is_empty());
    assert_eq!(
        requests[0].test_cases,
        vec!["Feature 2: Export\nTC-7 export produces a CSV file."]
    );
}

#[tokio::test]
async fn test_concurrent_users() {
    let documents = InMemoryDocumentSource::new()
        .with_document("spec", SPEC)
        .with_document("cases", CASES);
    let generator = Arc::new(RecordingGenerator::default());
    let assistant = build(
        SessionStore::new(SessionConfig::default()),
        Arc::new(documents),
        generator.clone(),
    );

    let mut tasks = Vec::new();
    for i in 0..4 {
        let assistant = assistant.clone();
        tasks.push(tokio::spawn(async move {
            let user = format!("user{i}");
            assistant.dispatch(load_spec(&user, "spec")).await.unwrap();
            assistant.dispatch(load_cases(&user, "cases")).await.unwrap();
            assistant.dispatch(feature(&user, "Login")).await.unwrap();
            assistant.dispatch(generate(&user)).await.unwrap()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().response(), "Generated cases for Login");
    }

    let requests = generator.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.specification.len() == 1));
    assert_eq!(assistant.sessions().len().await, 4);
}
