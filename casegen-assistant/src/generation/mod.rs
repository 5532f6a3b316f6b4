//! Test case generation contract and prompt rendering
//!
//! The assistant gathers the specification and test case excerpts relevant
//! to a feature, renders them into a [`PromptTemplate`] and hands the result
//! to a [`TestCaseGenerator`]. The generator is usually a hosted language
//! model; [`DryRunGenerator`] returns the prompt itself for offline runs.

pub mod gemini;

pub use gemini::GeminiGenerator;

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Template used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = "\
You are a QA engineer. Write test cases for the feature \"{feature}\".

Use the specification excerpts below as the source of truth. Follow the
structure, numbering and wording style of the existing test cases. Cover
positive, negative and boundary scenarios and do not repeat existing cases.

Specification:
{specification}

Existing test cases:
{test_cases}
";

/// Everything the generator needs for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub feature: String,
    pub specification: Vec<String>,
    pub test_cases: Vec<String>,
    /// `specification` and `test_cases` rendered into the prompt template
    pub prompt: String,
}

#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;

    fn generator_name(&self) -> &str;
}

/// Prompt text with `{specification}`, `{test_cases}` and `{feature}` slots.
///
/// Substitution is a single pass, so braces inside the substituted text are
/// left alone. Unknown `{names}` stay as written.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("prompt template {}: {}", path.display(), e))
        })?;
        Ok(Self::new(template))
    }

    /// Excerpts are joined with newlines.
    pub fn render(&self, feature: &str, specification: &[String], test_cases: &[String]) -> String {
        let specification = specification.join("\n");
        let test_cases = test_cases.join("\n");

        let mut out = String::with_capacity(self.template.len() + specification.len() + test_cases.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let slot = match &after[..close] {
                    "specification" => specification.as_str(),
                    "test_cases" => test_cases.as_str(),
                    "feature" => feature,
                    _ => return None,
                };
                Some((slot, close))
            });
            match value {
                Some((slot, close)) => {
                    out.push_str(slot);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn request(&self, feature: &str, specification: Vec<String>, test_cases: Vec<String>) -> GenerationRequest {
        let prompt = self.render(feature, &specification, &test_cases);
        GenerationRequest {
            feature: feature.to_string(),
            specification,
            test_cases,
            prompt,
        }
    }
}

/// Returns the rendered prompt instead of calling a model.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunGenerator;

#[async_trait]
impl TestCaseGenerator for DryRunGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        Ok(request.prompt.clone())
    }

    fn generator_name(&self) -> &str {
        "dry_run"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    #[default]
    DryRun,
    Gemini,
}

/// Generator backend and prompt settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    /// File holding a custom prompt template
    pub template_path: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::default(),
            model: "gemini-1.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            template_path: None,
        }
    }
}

impl GeneratorConfig {
    pub fn template(&self) -> Result<PromptTemplate> {
        match &self.template_path {
            Some(path) => PromptTemplate::from_file(path),
            None => Ok(PromptTemplate::default()),
        }
    }
}

pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn TestCaseGenerator>> {
    match config.kind {
        GeneratorKind::DryRun => Ok(Arc::new(DryRunGenerator)),
        GeneratorKind::Gemini => Ok(Arc::new(GeminiGenerator::from_env(config)?)),
    }
}
