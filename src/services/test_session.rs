use crate::error::{Error, Result};
use crate::models::identity::SessionState;
use crate::models::question::Question;
use crate::models::test_run::{Difficulty, TestPhase, TestRun, Topic, UNANSWERED};
use crate::services::generation_service::{fallback_bank, GenerationService};
use crate::services::scoring_service::{ScoringService, TestReport};
use crate::utils::time::format_clock;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub const FALLBACK_NOTICE: &str = "Generated sample questions for practice.";

/// Timed mock-test state machine: `NotStarted`, `Configuring`, `Running`,
/// `Completed`, with reset back to `NotStarted`.
///
/// The run lives behind one mutex so the countdown task and the UI mutate a
/// single consistent snapshot. Each start bumps an epoch; the timer and any
/// slow generation response check it before touching state, so work belonging
/// to an abandoned run is discarded instead of applied.
pub struct TestSession {
    run: Arc<Mutex<TestRun>>,
    generation: GenerationService,
    session_rx: tokio::sync::watch::Receiver<SessionState>,
    seconds_per_question: u32,
    cache: Mutex<HashMap<(Topic, Difficulty), Vec<Question>>>,
    generating: AtomicBool,
    epoch: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl TestSession {
    pub fn new(
        generation: GenerationService,
        session_rx: tokio::sync::watch::Receiver<SessionState>,
        seconds_per_question: u32,
    ) -> Self {
        Self {
            run: Arc::new(Mutex::new(TestRun::idle())),
            generation,
            session_rx,
            seconds_per_question,
            cache: Mutex::new(HashMap::new()),
            generating: AtomicBool::new(false),
            epoch: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> TestRun {
        self.run_guard().clone()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    pub fn select_topic(&self, topic: Topic) {
        let mut run = self.run_guard();
        if !matches!(run.phase, TestPhase::NotStarted | TestPhase::Configuring) {
            return;
        }
        run.topic = Some(topic);
        run.phase = TestPhase::Configuring;
    }

    pub fn select_difficulty(&self, difficulty: Difficulty) {
        let mut run = self.run_guard();
        if !matches!(run.phase, TestPhase::NotStarted | TestPhase::Configuring) {
            return;
        }
        run.difficulty = Some(difficulty);
        run.phase = TestPhase::Configuring;
    }

    /// Starts a run for the selected configuration. Questions come from the
    /// per-configuration cache when present; otherwise one generation request
    /// is made, degrading to the built-in bank (with a non-blocking notice)
    /// when it fails. Refused while guest, while either selector is empty, or
    /// while a generation request is already in flight.
    pub async fn start(&self) -> Result<()> {
        if self.session_rx.borrow().is_guest {
            return Err(Error::validation("session", "Log in to start a test"));
        }
        let (topic, difficulty) = {
            let run = self.run_guard();
            if run.phase == TestPhase::Running {
                return Err(Error::validation("phase", "A test is already running"));
            }
            match (run.topic, run.difficulty) {
                (Some(t), Some(d)) => (t, d),
                _ => {
                    return Err(Error::validation(
                        "selection",
                        "Please select both topic and difficulty level",
                    ))
                }
            }
        };
        if self.generating.swap(true, Ordering::SeqCst) {
            return Err(Error::validation(
                "generation",
                "Question generation is already in flight",
            ));
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let cached = self.cache_guard().get(&(topic, difficulty)).cloned();
        let (questions, notice) = match cached {
            Some(questions) => (questions, None),
            None => match self.generation.generate_mock_questions(topic, difficulty).await {
                Ok(questions) if !questions.is_empty() => (questions, None),
                Ok(_) => {
                    tracing::warn!(topic = %topic, "generation returned no questions");
                    (fallback_bank(topic), Some(FALLBACK_NOTICE.to_string()))
                }
                Err(e) => {
                    tracing::error!("question generation failed: {}", e);
                    (fallback_bank(topic), Some(FALLBACK_NOTICE.to_string()))
                }
            },
        };
        self.generating.store(false, Ordering::SeqCst);

        // The user reset or restarted while the request was in flight.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("discarding generation result for an abandoned start");
            return Ok(());
        }

        self.cache_guard()
            .insert((topic, difficulty), questions.clone());

        {
            let mut run = self.run_guard();
            run.remaining_seconds = self.seconds_per_question * questions.len() as u32;
            run.answers = vec![UNANSWERED; questions.len()];
            run.questions = questions;
            run.current_index = 0;
            run.notice = notice;
            run.phase = TestPhase::Running;
            run.started_at = Some(Utc::now());
            run.completed_at = None;
        }
        self.spawn_timer(epoch);
        Ok(())
    }

    /// Records an answer for the current question, overwriting any prior
    /// choice. Answers stay mutable until the run completes.
    pub fn select_answer(&self, option_index: usize) -> Result<()> {
        let mut run = self.run_guard();
        if run.phase != TestPhase::Running {
            return Err(Error::validation("phase", "No test is running"));
        }
        let index = run.current_index;
        let Some(question) = run.questions.get(index) else {
            return Err(Error::validation("question", "No current question"));
        };
        if option_index >= question.options.len() {
            return Err(Error::validation("answer", "Option index out of range"));
        }
        run.answers[index] = option_index as i32;
        Ok(())
    }

    /// Advances the cursor, finishing the run when already on the last
    /// question. Refused until the current question has an answer.
    pub fn next(&self) -> Result<()> {
        let finished = {
            let mut run = self.run_guard();
            if run.phase != TestPhase::Running {
                return Err(Error::validation("phase", "No test is running"));
            }
            if !run.current_answered() {
                return Err(Error::validation("answer", "Answer the current question first"));
            }
            if run.current_index + 1 < run.questions.len() {
                run.current_index += 1;
                false
            } else {
                finish_run(&mut run);
                true
            }
        };
        if finished {
            self.cancel_timer();
        }
        Ok(())
    }

    /// Moves the cursor back with a floor of zero. Previously answered
    /// questions stay answerable.
    pub fn previous(&self) {
        let mut run = self.run_guard();
        if run.phase == TestPhase::Running && run.current_index > 0 {
            run.current_index -= 1;
        }
    }

    /// Explicit finish. The countdown reaching zero takes the identical path,
    /// so a timer-forced completion is indistinguishable from this one.
    pub fn finish(&self) {
        {
            let mut run = self.run_guard();
            finish_run(&mut run);
        }
        self.cancel_timer();
    }

    /// Per-question correctness and banding for the completed run.
    pub fn report(&self) -> Option<TestReport> {
        let run = self.run_guard();
        (run.phase == TestPhase::Completed)
            .then(|| ScoringService::report(&run.questions, &run.answers))
    }

    /// Clears everything back to `NotStarted`, including selectors and the
    /// question cache, and invalidates any in-flight work.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancel_timer();
        *self.run_guard() = TestRun::idle();
        self.cache_guard().clear();
    }

    pub fn remaining_clock(&self) -> String {
        format_clock(self.run_guard().remaining_seconds)
    }

    fn spawn_timer(&self, epoch: u64) {
        let run = Arc::clone(&self.run);
        let epochs = Arc::clone(&self.epoch);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
            // The first interval tick completes immediately.
            tick.tick().await;
            loop {
                tick.tick().await;
                if epochs.load(Ordering::SeqCst) != epoch {
                    break;
                }
                let mut guard = run.lock().unwrap_or_else(|e| e.into_inner());
                if guard.phase != TestPhase::Running {
                    break;
                }
                guard.remaining_seconds = guard.remaining_seconds.saturating_sub(1);
                if guard.remaining_seconds == 0 {
                    finish_run(&mut guard);
                    break;
                }
            }
        });
        let mut slot = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&self) {
        let mut slot = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn run_guard(&self) -> MutexGuard<'_, TestRun> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cache_guard(&self) -> MutexGuard<'_, HashMap<(Topic, Difficulty), Vec<Question>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

fn finish_run(run: &mut TestRun) {
    if run.phase != TestPhase::Running {
        return;
    }
    run.phase = TestPhase::Completed;
    run.completed_at = Some(Utc::now());
}
