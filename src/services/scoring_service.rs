use crate::models::question::Question;
use serde::{Deserialize, Serialize};

pub struct ScoringService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub selected_index: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub band: String,
    pub questions: Vec<GradedQuestion>,
}

impl ScoringService {
    /// Count of answers matching the stored correct index. Deterministic and
    /// idempotent for fixed inputs.
    pub fn score(questions: &[Question], answers: &[i32]) -> usize {
        questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| **a >= 0 && **a as usize == q.correct_index)
            .count()
    }

    pub fn percentage(score: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        ((score as f64 / total as f64) * 100.0).round() as u32
    }

    /// Band boundaries are inclusive at the lower bound.
    pub fn band(percentage: u32) -> &'static str {
        if percentage >= 70 {
            "Excellent"
        } else if percentage >= 50 {
            "Good"
        } else {
            "Needs Improvement"
        }
    }

    pub fn report(questions: &[Question], answers: &[i32]) -> TestReport {
        let score = Self::score(questions, answers);
        let total = questions.len();
        let percentage = Self::percentage(score, total);
        let graded = questions
            .iter()
            .zip(answers)
            .map(|(q, a)| {
                let selected_index = (*a >= 0).then_some(*a as usize);
                GradedQuestion {
                    text: q.text.clone(),
                    options: q.options.clone(),
                    selected_index,
                    correct_index: q.correct_index,
                    is_correct: selected_index == Some(q.correct_index),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();
        TestReport {
            score,
            total,
            percentage,
            band: Self::band(percentage).to_string(),
            questions: graded,
        }
    }
}
