use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ingest::{Ingestor, SourceSpec};
use crate::resolve::AnswerChain;
use crate::store::types::Row;
use crate::store::{Sheet, StoreError, StoreIndex};

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Existing blank rows that received an answer.
    pub backfilled: usize,
    /// New rows written.
    pub appended: usize,
    /// New rows written with an accepted answer.
    pub answered: usize,
    /// Questions left without an answer (existing or new).
    pub unanswered: usize,
    /// Ingested questions already present in the store.
    pub duplicates: usize,
    pub write_failures: usize,
}

/// One batch run: answer blank rows already in the store, then harvest new
/// questions from the configured sources.
pub struct Pipeline {
    chain: AnswerChain,
    ingestor: Ingestor,
    sheet: Arc<dyn Sheet>,
    sources: Vec<SourceSpec>,
    /// Pause after each store write.
    write_pause: Duration,
}

impl Pipeline {
    pub fn new(
        chain: AnswerChain,
        ingestor: Ingestor,
        sheet: Arc<dyn Sheet>,
        sources: Vec<SourceSpec>,
        write_pause: Duration,
    ) -> Self {
        Self {
            chain,
            ingestor,
            sheet,
            sources,
            write_pause,
        }
    }

    /// Only a store that cannot be read fails the run.
    pub async fn run(&self) -> Result<RunSummary, StoreError> {
        let rows = self.sheet.rows().await?;
        let mut index = StoreIndex::from_rows(&rows);
        info!(rows = rows.len(), known = index.len(), "Store loaded");

        let mut summary = RunSummary::default();
        self.backfill(&rows, &mut summary).await;
        self.harvest(&mut index, &mut summary).await;

        info!(
            backfilled = summary.backfilled,
            appended = summary.appended,
            answered = summary.answered,
            unanswered = summary.unanswered,
            duplicates = summary.duplicates,
            write_failures = summary.write_failures,
            "Run complete"
        );
        Ok(summary)
    }

    async fn backfill(&self, rows: &[Row], summary: &mut RunSummary) {
        for (position, row) in rows.iter().enumerate() {
            if row.is_answered() || row.question.trim().is_empty() {
                continue;
            }
            let question = row.to_question();
            info!(row = position, question = question.text(), "Filling answer");

            let Some(answer) = self.chain.resolve(&question).await else {
                summary.unanswered += 1;
                continue;
            };

            match self.sheet.update_answer(position, &answer.text).await {
                Ok(()) => {
                    info!(row = position, kind = %answer.kind, "Row updated");
                    summary.backfilled += 1;
                }
                Err(e) => {
                    error!(row = position, error = %e, "Failed to update row");
                    summary.write_failures += 1;
                }
            }
            self.pause().await;
        }
    }

    async fn harvest(&self, index: &mut StoreIndex, summary: &mut RunSummary) {
        let questions = self.ingestor.ingest(&self.sources).await;

        for question in questions {
            if !index.insert(question.digest()) {
                summary.duplicates += 1;
                continue;
            }

            let answer = self.chain.resolve(&question).await;
            if answer.is_none() {
                warn!(question = question.text(), "Appending without answer");
                summary.unanswered += 1;
            }

            let row = Row::harvested(&question, answer.as_ref(), chrono::Utc::now());
            match self.sheet.append(&row).await {
                Ok(()) => {
                    summary.appended += 1;
                    if answer.is_some() {
                        summary.answered += 1;
                    }
                }
                Err(e) => {
                    error!(question = question.text(), error = %e, "Failed to append row");
                    summary.write_failures += 1;
                }
            }
            self.pause().await;
        }
    }

    async fn pause(&self) {
        if !self.write_pause.is_zero() {
            tokio::time::sleep(self.write_pause).await;
        }
    }
}
