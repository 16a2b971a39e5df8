use serde::{Deserialize, Serialize};

pub const OPTIONS_PER_QUESTION: usize = 4;

/// One multiple-choice test item. Option order is significant: the index is
/// the answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub options: Vec<String>,
    #[serde(rename = "correct")]
    pub correct_index: usize,
    pub explanation: String,
}

impl Question {
    /// Shape check applied at the generation parse boundary; generated JSON
    /// is not trusted past this point.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTIONS_PER_QUESTION
            && self.correct_index < self.options.len()
            && !self.text.trim().is_empty()
    }
}
