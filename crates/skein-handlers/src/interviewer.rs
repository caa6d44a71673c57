//! Interviewer implementations for human-interaction nodes
//!
//! A wait-for-human node builds a `Question` and hands it to the
//! configured [`Interviewer`]. Implementations here cover the common
//! embedding modes: headless auto-approval, a host callback, and a
//! queue bridged to a UI with timeout support. `RecordingInterviewer`
//! wraps any of them and keeps a transcript.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use skein_model::{Answer, Question, QuestionType};

/// Turns questions into answers, however the host sees fit
#[async_trait]
pub trait Interviewer: Send + Sync {
    /// Present one question and wait for its answer
    async fn ask(&self, question: Question) -> Answer;
}

/// Headless interviewer: approves everything.
///
/// Yes/no and confirmation questions get `yes`; multiple choice picks
/// the first choice; freeform returns the question's default, or empty
/// text.
#[derive(Debug, Default)]
pub struct AutoApproveInterviewer;

#[async_trait]
impl Interviewer for AutoApproveInterviewer {
    async fn ask(&self, question: Question) -> Answer {
        match question.question_type {
            QuestionType::YesNo | QuestionType::Confirmation => Answer::yes(),
            QuestionType::MultipleChoice => match question.choices.first() {
                Some(choice) => Answer::choice(choice.clone()),
                None => Answer::yes(),
            },
            QuestionType::Freeform => {
                Answer::text(question.default.unwrap_or_default())
            }
        }
    }
}

/// Interviewer backed by a host-provided closure
pub struct CallbackInterviewer {
    callback: Box<dyn Fn(&Question) -> Answer + Send + Sync>,
}

impl CallbackInterviewer {
    /// Wrap a closure as an interviewer
    pub fn new(callback: impl Fn(&Question) -> Answer + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl Interviewer for CallbackInterviewer {
    async fn ask(&self, question: Question) -> Answer {
        (self.callback)(&question)
    }
}

/// Queue interviewer bridging the pipeline to an asynchronous UI.
///
/// `ask` parks the question where the host can read it via
/// `pending_question`, then waits for `respond`. A question with a
/// `timeout_seconds` bound that elapses yields `Answer::timeout()`
/// instead of blocking the run.
pub struct QueueInterviewer {
    answers_tx: mpsc::UnboundedSender<Answer>,
    answers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Answer>>,
    pending: Mutex<Option<Question>>,
}

impl Default for QueueInterviewer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueInterviewer {
    /// Create a queue interviewer with no pending question
    pub fn new() -> Self {
        let (answers_tx, answers_rx) = mpsc::unbounded_channel();
        Self {
            answers_tx,
            answers_rx: tokio::sync::Mutex::new(answers_rx),
            pending: Mutex::new(None),
        }
    }

    /// The question currently awaiting an answer, if any
    pub fn pending_question(&self) -> Option<Question> {
        self.pending.lock().clone()
    }

    /// Deliver an answer to the waiting `ask` call
    pub fn respond(&self, answer: Answer) {
        let _ = self.answers_tx.send(answer);
    }
}

#[async_trait]
impl Interviewer for QueueInterviewer {
    async fn ask(&self, question: Question) -> Answer {
        let wait = question.timeout_seconds.map(Duration::from_secs_f64);
        *self.pending.lock() = Some(question);

        let mut rx = self.answers_rx.lock().await;
        let answer = match wait {
            Some(bound) => match tokio::time::timeout(bound, rx.recv()).await {
                Ok(Some(answer)) => answer,
                Ok(None) | Err(_) => Answer::timeout(),
            },
            None => rx.recv().await.unwrap_or_else(Answer::timeout),
        };

        *self.pending.lock() = None;
        answer
    }
}

/// One question/answer exchange from a recorded session
#[derive(Debug, Clone)]
pub struct QAPair {
    /// The question as presented
    pub question: Question,
    /// The answer that came back
    pub answer: Answer,
}

/// Wraps another interviewer and keeps a transcript of every exchange
pub struct RecordingInterviewer {
    inner: Arc<dyn Interviewer>,
    transcript: Mutex<Vec<QAPair>>,
}

impl RecordingInterviewer {
    /// Record around the given interviewer
    pub fn new(inner: Arc<dyn Interviewer>) -> Self {
        Self {
            inner,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// A copy of the exchanges so far, in order
    pub fn transcript(&self) -> Vec<QAPair> {
        self.transcript.lock().clone()
    }
}

#[async_trait]
impl Interviewer for RecordingInterviewer {
    async fn ask(&self, question: Question) -> Answer {
        let answer = self.inner.ask(question.clone()).await;
        self.transcript.lock().push(QAPair {
            question,
            answer: answer.clone(),
        });
        answer
    }
}
