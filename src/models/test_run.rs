use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer slot value for a question the user has not answered yet.
pub const UNANSWERED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    NotStarted,
    Configuring,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Javascript,
    React,
    Python,
    Java,
    DataStructures,
    Algorithms,
    Database,
    SystemDesign,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Javascript => "javascript",
            Topic::React => "react",
            Topic::Python => "python",
            Topic::Java => "java",
            Topic::DataStructures => "data-structures",
            Topic::Algorithms => "algorithms",
            Topic::Database => "database",
            Topic::SystemDesign => "system-design",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Topic::Javascript => "JavaScript",
            Topic::React => "React.js",
            Topic::Python => "Python",
            Topic::Java => "Java",
            Topic::DataStructures => "Data Structures",
            Topic::Algorithms => "Algorithms",
            Topic::Database => "Database & SQL",
            Topic::SystemDesign => "System Design",
        }
    }

    pub const ALL: [Topic; 8] = [
        Topic::Javascript,
        Topic::React,
        Topic::Python,
        Topic::Java,
        Topic::DataStructures,
        Topic::Algorithms,
        Topic::Database,
        Topic::SystemDesign,
    ];
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed attempt at a question set. Questions are fixed once the run
/// starts; answers stay mutable until the run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    pub phase: TestPhase,
    pub topic: Option<Topic>,
    pub difficulty: Option<Difficulty>,
    pub questions: Vec<Question>,
    pub answers: Vec<i32>,
    pub current_index: usize,
    pub remaining_seconds: u32,
    /// Non-blocking notice surfaced when the built-in fallback set is used.
    pub notice: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestRun {
    pub fn idle() -> Self {
        Self {
            phase: TestPhase::NotStarted,
            topic: None,
            difficulty: None,
            questions: Vec::new(),
            answers: Vec::new(),
            current_index: 0,
            remaining_seconds: 0,
            notice: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn current_answered(&self) -> bool {
        self.answers
            .get(self.current_index)
            .is_some_and(|a| *a != UNANSWERED)
    }
}

impl Default for TestRun {
    fn default() -> Self {
        Self::idle()
    }
}
