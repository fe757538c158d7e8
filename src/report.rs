use tracing::{debug, info, warn};

use crate::acceptance::Rejection;
use crate::question::{AnswerCandidate, Question, SourceKind};
use crate::resolve::Attempt;

/// Observer for answer-chain events, injected so the chain can be exercised
/// with a recording reporter.
pub trait Reporter: Send + Sync {
    fn attempting(&self, _kind: SourceKind, _question: &Question) {}
    fn fell_through(&self, _kind: SourceKind, _attempt: &Attempt) {}
    fn rejected(&self, _kind: SourceKind, _rejection: &Rejection) {}
    fn accepted(&self, _candidate: &AnswerCandidate) {}
    fn exhausted(&self, _question: &Question) {}
}

/// Forwards chain events to `tracing`.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn attempting(&self, kind: SourceKind, question: &Question) {
        debug!(kind = %kind, question = question.text(), "Trying resolver");
    }

    fn fell_through(&self, kind: SourceKind, attempt: &Attempt) {
        match attempt {
            Attempt::Transient(reason) => warn!(kind = %kind, reason = %reason, "Resolver failed transiently"),
            Attempt::Fatal(reason) => warn!(kind = %kind, reason = %reason, "Resolver failed"),
            _ => debug!(kind = %kind, "Resolver found nothing"),
        }
    }

    fn rejected(&self, kind: SourceKind, rejection: &Rejection) {
        info!(kind = %kind, reason = %rejection, "Candidate rejected");
    }

    fn accepted(&self, candidate: &AnswerCandidate) {
        info!(
            kind = %candidate.kind,
            words = candidate.word_count,
            "Answer accepted"
        );
    }

    fn exhausted(&self, question: &Question) {
        warn!(question = question.text(), "No answer found");
    }
}
