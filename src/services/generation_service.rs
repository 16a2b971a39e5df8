use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::test_run::{Difficulty, Topic};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const STUDY_PLAN_APOLOGY: &str =
    "We could not generate a study plan right now. Please try again in a few minutes.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

/// Client for the external generative-text capability: one fixed endpoint,
/// text in, text out, no streaming and no multi-turn state.
#[derive(Clone)]
pub struct GenerationService {
    client: Client,
    base_url: String,
    api_key: String,
    max_questions: usize,
}

impl GenerationService {
    pub fn new(base_url: String, api_key: String, client: Client, max_questions: usize) -> Self {
        Self {
            client,
            base_url,
            api_key,
            max_questions,
        }
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API error {}: {}", status, body)));
        }

        let body: GenerateResponse = res
            .json()
            .await
            .map_err(|e| Error::Generation(format!("unreadable response body: {}", e)))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Generation("no content generated".to_string()))
    }

    /// Generates up to `max_questions` multiple-choice questions. Fails only
    /// on transport errors; unusable output degrades to a placeholder set, so
    /// callers must not assume a fixed count.
    pub async fn generate_mock_questions(
        &self,
        topic: Topic,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>> {
        let prompt = format!(
            "Generate {count} multiple choice questions for {topic} at {difficulty} difficulty level. \
             Return as JSON array with format: \
             [{{\"question\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correct\": 0, \"explanation\": \"...\"}}]",
            count = self.max_questions,
            topic = topic.as_str(),
            difficulty = difficulty.as_str(),
        );
        let text = self.generate_content(&prompt).await?;
        Ok(self.questions_from_text(topic, &text))
    }

    /// Parse-or-placeholder conversion of generated text, truncated to the
    /// configured cap.
    pub fn questions_from_text(&self, topic: Topic, text: &str) -> Vec<Question> {
        let mut questions = match parse_questions(text) {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!("generated questions unusable: {}", e);
                vec![placeholder_question(topic)]
            }
        };
        questions.truncate(self.max_questions);
        questions
    }

    /// Free-text study plan, returned verbatim. Content quality is the
    /// caller's problem; only transport failures are errors.
    pub async fn generate_study_plan(&self, skills: &[String], experience: &str) -> Result<String> {
        let prompt = format!(
            "Create a personalized study plan for someone with {} experience in these skills: {}. \
             Include recommended topics, timeline, and resources. Keep it practical and actionable.",
            experience,
            skills.join(", "),
        );
        self.generate_content(&prompt).await
    }

    pub async fn study_plan_or_apology(&self, skills: &[String], experience: &str) -> String {
        match self.generate_study_plan(skills, experience).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!("study plan generation failed: {}", e);
                STUDY_PLAN_APOLOGY.to_string()
            }
        }
    }

    pub async fn generate_interview_questions(
        &self,
        role_title: &str,
        company: &str,
    ) -> Result<String> {
        let prompt = format!(
            "Generate 5 common interview questions for a {} position at {}. \
             Include both technical and behavioral questions with brief tips for answering each.",
            role_title, company,
        );
        self.generate_content(&prompt).await
    }
}

/// Parses generated text as a JSON array of questions, keeping only
/// well-formed items. Model output is frequently wrapped in a markdown code
/// fence; strip it before parsing.
pub fn parse_questions(raw: &str) -> anyhow::Result<Vec<Question>> {
    let cleaned = strip_code_fence(raw);
    let parsed: Vec<Question> = serde_json::from_str(cleaned)?;
    let questions: Vec<Question> = parsed.into_iter().filter(|q| q.is_well_formed()).collect();
    if questions.is_empty() {
        anyhow::bail!("no well-formed questions in response");
    }
    Ok(questions)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rsplit_once("```") {
        Some((body, _)) => body.trim(),
        None => rest.trim(),
    }
}

fn placeholder_question(topic: Topic) -> Question {
    Question {
        text: format!("What is a fundamental concept in {}?", topic.as_str()),
        options: vec![
            "Option A".to_string(),
            "Option B".to_string(),
            "Option C".to_string(),
            "Option D".to_string(),
        ],
        correct_index: 0,
        explanation: "This is the correct answer because...".to_string(),
    }
}

/// Fixed built-in substitute used when generation fails outright. Topics
/// without a bank of their own borrow the JavaScript set.
pub fn fallback_bank(topic: Topic) -> Vec<Question> {
    match topic {
        Topic::React => react_bank(),
        _ => javascript_bank(),
    }
}

fn javascript_bank() -> Vec<Question> {
    vec![
        Question {
            text: "What is the difference between 'let' and 'var' in JavaScript?".to_string(),
            options: vec![
                "let has function scope, var has block scope".to_string(),
                "let has block scope, var has function scope".to_string(),
                "There is no difference".to_string(),
                "let is hoisted, var is not".to_string(),
            ],
            correct_index: 1,
            explanation: "let has block scope while var has function scope. This means let \
                          variables are only accessible within the block they are declared in."
                .to_string(),
        },
        Question {
            text: "Which method is used to add an element to the end of an array?".to_string(),
            options: vec![
                "push()".to_string(),
                "pop()".to_string(),
                "shift()".to_string(),
                "unshift()".to_string(),
            ],
            correct_index: 0,
            explanation: "The push() method adds one or more elements to the end of an array \
                          and returns the new length of the array."
                .to_string(),
        },
    ]
}

fn react_bank() -> Vec<Question> {
    vec![Question {
        text: "What is JSX in React?".to_string(),
        options: vec![
            "A JavaScript library".to_string(),
            "A syntax extension for JavaScript".to_string(),
            "A database query language".to_string(),
            "A CSS framework".to_string(),
        ],
        correct_index: 1,
        explanation: "JSX is a syntax extension for JavaScript that allows you to write \
                      HTML-like code in JavaScript files."
            .to_string(),
    }]
}
