//! Feature specification generation on top of the gateway.
//!
//! Three calls: follow-up questions for a feature request, the specification
//! documents themselves, and free-form chat about finished specifications.

use crate::adapters::GenerationRequest;
use crate::config::LlmConfig;
use crate::gateway::LlmGateway;
use crate::log_debug;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

const QUESTIONS_MAX_TOKENS: u32 = 2000;
const SPECIFICATIONS_MAX_TOKENS: u32 = 4000;
const CHAT_MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

/// Input widget kind for a follow-up question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Textarea,
    Select,
}

/// A follow-up question about a feature request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// The generated documents: PLANNING.md, TASK.md and SPECS.md
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifications {
    pub planning: String,
    pub tasks: String,
    pub specs: String,
}

impl Specifications {
    /// File names paired with their contents
    pub fn documents(&self) -> [(&'static str, &str); 3] {
        [
            ("PLANNING.md", self.planning.as_str()),
            ("TASK.md", self.tasks.as_str()),
            ("SPECS.md", self.specs.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation about the specifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Specification generator bound to a gateway and a configuration
pub struct SpecGenerator<'a> {
    gateway: &'a LlmGateway,
    config: LlmConfig,
}

impl<'a> SpecGenerator<'a> {
    pub fn new(gateway: &'a LlmGateway, config: LlmConfig) -> Self {
        Self { gateway, config }
    }

    /// Ask the model which questions need answering before a spec can be written
    pub async fn follow_up_questions(
        &self,
        feature_request: &str,
        repo_context: Option<&str>,
    ) -> Result<Vec<Question>> {
        let prompt = questions_prompt(feature_request, repo_context);
        let text = self
            .generate(prompt, QUESTIONS_MAX_TOKENS)
            .await
            .context("Failed to generate follow-up questions")?;
        parse_json_reply(&text).context("Failed to generate follow-up questions")
    }

    /// Write the three specification documents
    pub async fn specifications(
        &self,
        feature_request: &str,
        answers: &BTreeMap<String, String>,
        repo_context: Option<&str>,
    ) -> Result<Specifications> {
        let prompt = specifications_prompt(feature_request, answers, repo_context);
        let text = self
            .generate(prompt, SPECIFICATIONS_MAX_TOKENS)
            .await
            .context("Failed to generate specifications")?;
        parse_json_reply(&text).context("Failed to generate specifications")
    }

    /// Answer a question about existing specifications
    pub async fn chat(
        &self,
        message: &str,
        specifications: &Specifications,
        history: &[ChatMessage],
    ) -> Result<String> {
        let prompt = chat_prompt(message, specifications, history);
        self.generate(prompt, CHAT_MAX_TOKENS)
            .await
            .context("Failed to generate chat response")
    }

    async fn generate(&self, prompt: String, max_tokens: u32) -> Result<String> {
        let request = GenerationRequest::new(prompt, self.config.clone())
            .temperature(TEMPERATURE)
            .max_tokens(max_tokens);
        let result = self.gateway.generate_text(request).await?;
        Ok(result.text)
    }
}

fn context_section(repo_context: Option<&str>) -> String {
    repo_context
        .filter(|context| !context.trim().is_empty())
        .map(|context| format!("REPOSITORY CONTEXT:\n{context}\n"))
        .unwrap_or_default()
}

fn questions_prompt(feature_request: &str, repo_context: Option<&str>) -> String {
    format!(
        r#"You are an expert feature specification analyst. Based on the initial feature request below, generate a comprehensive set of follow-up questions to gather all necessary information for creating detailed feature specifications.

FEATURE REQUEST:
{feature_request}

{context}
Create follow-up questions covering:
1. Project name and goals
2. Target audience
3. Functional requirements specific to this feature
4. Non-functional requirements
5. User scenarios
6. UI/UX guidelines
7. Technical constraints or preferences
8. Business value
9. Timeline constraints
10. Any additional questions specific to this particular feature request

Return your response as a JSON array of question objects with the following structure:
[
  {{
    "id": "unique_id",
    "label": "Question text",
    "type": "text|textarea|select",
    "options": ["option1", "option2"] (only for select type),
    "required": true|false,
    "placeholder": "Example answer"
  }}
]

Make your questions specific to the feature request rather than generic.

IMPORTANT: Respond with valid JSON and nothing else."#,
        context = context_section(repo_context)
    )
}

fn specifications_prompt(
    feature_request: &str,
    answers: &BTreeMap<String, String>,
    repo_context: Option<&str>,
) -> String {
    let formatted_answers = answers.iter().fold(String::new(), |mut out, (key, value)| {
        let _ = writeln!(out, "{key}: {value}");
        out
    });

    format!(
        r#"You are an expert feature specification writer. Based on the information provided, create comprehensive specification documents for the requested feature.

FEATURE REQUEST:
{feature_request}

USER RESPONSES:
{formatted_answers}
{context}
Generate three markdown documents:

1. PLANNING.md - A technical planning document covering:
   - Overview of the feature purpose and value
   - Architectural approach
   - Technical stack and dependencies
   - Design constraints
   - Security and privacy considerations
   - Performance considerations
   - Testing strategy
   - Future considerations

2. TASK.md - An implementation task breakdown including:
   - Priority 1 (Must-have) tasks with subtasks
   - Priority 2 (Should-have) tasks with subtasks
   - Priority 3 (Nice-to-have) tasks with subtasks
   - Technical debt & refactoring considerations
   - Testing tasks

3. SPECS.md - Behavior-driven specifications including:
   - Overview of the feature
   - User stories with Gherkin-formatted scenarios
   - Edge cases and error scenarios
   - Assumptions
   - Acceptance criteria

Format each document with clear structure, using markdown for headings, lists, code blocks, and tables where appropriate. Be specific rather than generic, and tailor the content to the provided feature information and repository context.

Return your response as a JSON object with the following structure:
{{
  "planning": "Full PLANNING.md content",
  "tasks": "Full TASK.md content",
  "specs": "Full SPECS.md content"
}}

IMPORTANT: Respond with valid JSON and nothing else."#,
        context = context_section(repo_context)
    )
}

fn chat_prompt(message: &str, specifications: &Specifications, history: &[ChatMessage]) -> String {
    let formatted_history = history
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r"You are an AI assistant specializing in feature specifications. You have access to the following specification documents for a feature:

PLANNING.md:
{planning}

TASK.md:
{tasks}

SPECS.md:
{specs}

CHAT HISTORY:
{formatted_history}

USER QUESTION:
{message}

Provide a helpful, accurate, and concise response to the user's question based on the specification documents. If the question is about something not covered in the specifications, you can provide general guidance but make it clear that it's not specifically addressed in the documents.",
        planning = specifications.planning,
        tasks = specifications.tasks,
        specs = specifications.specs,
    )
}

/// Parse a model reply that should contain a single JSON value
fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_code_fence(text);
    serde_json::from_str(cleaned).map_err(|e| {
        log_debug!("JSON parse error: {} text: {}", e, text);
        anyhow!("Failed to parse the response from the LLM. The response was not valid JSON.")
    })
}

/// Remove a surrounding Markdown code fence (with or without a `json` tag)
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
