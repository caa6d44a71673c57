//! Wait-for-human node handler
//!
//! Builds a `Question` from the node's prompt and the labels of its
//! outgoing edges, hands it to the configured [`Interviewer`], and maps
//! the `Answer` back onto edge selection: the answered label becomes
//! the outcome's preferred label, and the raw answer is stored under
//! `{node_id}.answer`.
//!
//! Edge labels that all read as yes/no variants produce a `YesNo`
//! question; otherwise labeled edges become multiple-choice entries
//! (with accelerator keys when present) and an unlabeled node falls
//! back to freeform.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::interviewer::Interviewer;
use skein_engine::{Handler, Result};
use skein_model::{
    parse_accelerator, Answer, Choice, Context, Graph, Node, Outcome, Question, QuestionType,
    Status,
};

const YES_NO_WORDS: [&str; 6] = ["yes", "no", "y", "n", "true", "false"];

/// Handler for human-interaction nodes
pub struct WaitHumanHandler {
    interviewer: Arc<dyn Interviewer>,
}

impl WaitHumanHandler {
    /// Create a wait-for-human handler over the given interviewer
    pub fn new(interviewer: Arc<dyn Interviewer>) -> Self {
        Self { interviewer }
    }

    fn build_question(node: &Node, graph: &Graph) -> Question {
        let mut choices = Vec::new();
        for (index, edge) in graph.outgoing_edges(&node.id).iter().enumerate() {
            if edge.label.is_empty() {
                continue;
            }
            let (key, label) = parse_accelerator(&edge.label);
            let key = if key.is_empty() {
                (index + 1).to_string()
            } else {
                key
            };
            choices.push(Choice::new(key, label));
        }

        let all_yes_no = !choices.is_empty()
            && choices
                .iter()
                .all(|c| YES_NO_WORDS.contains(&c.label.to_lowercase().as_str()));

        let text = if node.prompt.is_empty() {
            node.display_name().to_string()
        } else {
            node.prompt.clone()
        };

        let question_type = if all_yes_no {
            QuestionType::YesNo
        } else if !choices.is_empty() {
            QuestionType::MultipleChoice
        } else {
            QuestionType::Freeform
        };

        let mut question = Question::new(text, question_type).with_stage(node.id.clone());
        if question_type == QuestionType::MultipleChoice {
            question = question.with_choices(choices);
        }
        question.timeout_seconds = node.timeout;
        question
    }

    /// Status to report when the question went unanswered, honoring the
    /// node's `auto_status` override.
    fn unanswered_outcome(node: &Node, reason: &str) -> Outcome {
        match node.auto_status.as_str() {
            "success" => Outcome::new(Status::Success).with_notes(reason),
            "partial_success" => Outcome::new(Status::PartialSuccess).with_notes(reason),
            "skipped" => Outcome::new(Status::Skipped).with_notes(reason),
            _ => Outcome::fail(reason),
        }
    }

    fn preferred_label(answer: &Answer) -> String {
        if answer.is_yes() {
            return "yes".to_string();
        }
        if answer.is_no() {
            return "no".to_string();
        }
        if let Some(choice) = &answer.selected {
            return choice.label.clone();
        }
        answer.text.clone()
    }
}

#[async_trait]
impl Handler for WaitHumanHandler {
    async fn execute(
        &self,
        node: &Node,
        _context: &Arc<Context>,
        graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        let question = Self::build_question(node, graph);
        log::info!(
            "node '{}' waiting for human input: {}",
            node.id,
            question.text
        );

        let answer = self.interviewer.ask(question).await;

        if answer.timed_out() {
            return Ok(Self::unanswered_outcome(node, "timed out waiting for answer"));
        }
        if answer.was_skipped() {
            return Ok(Self::unanswered_outcome(node, "question skipped"));
        }

        let preferred = Self::preferred_label(&answer);
        let stored = answer
            .value
            .as_ref()
            .map(|v| v.as_str().to_string())
            .unwrap_or_else(|| answer.text.clone());

        Ok(Outcome::success()
            .with_preferred_label(preferred)
            .with_update(format!("{}.answer", node.id), stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interviewer::{AutoApproveInterviewer, CallbackInterviewer};
    use serde_json::json;
    use skein_model::Edge;

    fn review_graph() -> Graph {
        let mut graph = Graph::new("g");
        graph.add_node(Node::new("review").with_shape("hexagon").with_prompt("Approve?"));
        graph.add_node(Node::new("ship"));
        graph.add_node(Node::new("rework"));
        graph.add_edge(Edge::new("review", "ship").with_label("Yes"));
        graph.add_edge(Edge::new("review", "rework").with_label("No"));
        graph
    }

    #[tokio::test]
    async fn test_yes_no_edges_become_yes_no_question() {
        let asked = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&asked);
        let handler = WaitHumanHandler::new(Arc::new(CallbackInterviewer::new(move |q| {
            *sink.lock() = Some(q.clone());
            Answer::no()
        })));

        let graph = Arc::new(review_graph());
        let node = graph.node("review").unwrap().clone();
        let ctx = Arc::new(Context::new());

        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();

        let question = asked.lock().clone().unwrap();
        assert_eq!(question.question_type, QuestionType::YesNo);
        assert_eq!(outcome.preferred_label, "no");
        assert_eq!(
            outcome.context_updates.get("review.answer"),
            Some(&json!("NO"))
        );
    }

    #[tokio::test]
    async fn test_labeled_edges_become_choices() {
        let handler = WaitHumanHandler::new(Arc::new(AutoApproveInterviewer));

        let mut graph = Graph::new("g");
        graph.add_node(Node::new("pick").with_shape("hexagon"));
        graph.add_node(Node::new("a"));
        graph.add_node(Node::new("b"));
        graph.add_edge(Edge::new("pick", "a").with_label("[D] Deploy"));
        graph.add_edge(Edge::new("pick", "b").with_label("[R] Rollback"));
        let graph = Arc::new(graph);

        let node = graph.node("pick").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();

        // Auto-approve picks the first choice
        assert_eq!(outcome.preferred_label, "Deploy");
    }

    #[tokio::test]
    async fn test_timeout_respects_auto_status() {
        let handler = WaitHumanHandler::new(Arc::new(CallbackInterviewer::new(|_| {
            Answer::timeout()
        })));

        let graph = Arc::new(review_graph());
        let ctx = Arc::new(Context::new());

        let mut node = graph.node("review").unwrap().clone();
        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert!(outcome.failed());

        node.auto_status = "skipped".to_string();
        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Skipped);
    }

    #[tokio::test]
    async fn test_freeform_answer_stored() {
        let handler = WaitHumanHandler::new(Arc::new(CallbackInterviewer::new(|_| {
            Answer::text("use the staging cluster")
        })));

        let mut graph = Graph::new("g");
        graph.add_node(Node::new("ask").with_shape("hexagon").with_prompt("Where?"));
        graph.add_node(Node::new("next"));
        graph.add_edge(Edge::new("ask", "next"));
        let graph = Arc::new(graph);

        let node = graph.node("ask").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(
            outcome.context_updates.get("ask.answer"),
            Some(&json!("use the staging cluster"))
        );
        assert_eq!(outcome.preferred_label, "use the staging cluster");
    }
}
