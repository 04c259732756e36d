//! One briefing run, start to finish:
//!
//! ```text
//! Idle -> PromptBuilt -> Fetched -> Rendered -> Delivered
//!   \__________\____________\__________\_______-> Failed
//! ```
//!
//! Stages run strictly in order. The first failing stage ends the run in
//! `Failed`; nothing is sent after a failure.

use std::fmt;

use crate::delivery::{DeliveryChannel, DeliveryOutcome};
use crate::domain::briefing::BriefingRequest;
use crate::domain::contract::SchemaContract;
use crate::error::{BriefingError, Result};
use crate::llm::{fetch_briefing, ModelClient};
use crate::prompt::build_prompt;
use crate::render::render_report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PromptBuilt,
    Fetched,
    Rendered,
    Delivered,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    /// Each state has one successor; any non-terminal state may fail.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, PromptBuilt)
            | (PromptBuilt, Fetched)
            | (Fetched, Rendered)
            | (Rendered, Delivered) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::PromptBuilt => "prompt_built",
            Self::Fetched => "fetched",
            Self::Rendered => "rendered",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub final_state: PipelineState,
    /// Every state the run passed through, starting with `Idle`.
    pub visited: Vec<PipelineState>,
    pub outcome: Result<DeliveryOutcome>,
}

impl RunReport {
    pub fn is_delivered(&self) -> bool {
        self.final_state == PipelineState::Delivered
    }
}

struct Tracker {
    visited: Vec<PipelineState>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            visited: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> PipelineState {
        self.visited
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    fn advance(&mut self, next: PipelineState) {
        let from = self.current();
        debug_assert!(from.can_transition_to(next), "illegal transition {from} -> {next}");
        tracing::debug!(%from, to = %next, "pipeline transition");
        self.visited.push(next);
    }

    fn finish(mut self, outcome: Result<DeliveryOutcome>) -> RunReport {
        if let Err(err) = &outcome {
            let failed_in = self.current();
            self.advance(PipelineState::Failed);
            match err {
                // The delivery channel has already logged exhaustion.
                BriefingError::DeliveryExhausted { attempts, .. } => tracing::info!(
                    stage = %failed_in,
                    attempts,
                    "briefing run stopped after delivery gave up"
                ),
                _ => tracing::error!(
                    stage = %failed_in,
                    error_kind = err.kind(),
                    error = %err,
                    "briefing run failed"
                ),
            }
        }
        RunReport {
            final_state: self.current(),
            visited: self.visited,
            outcome,
        }
    }
}

pub struct Orchestrator<'a> {
    model: &'a dyn ModelClient,
    delivery: &'a DeliveryChannel,
}

impl<'a> Orchestrator<'a> {
    pub fn new(model: &'a dyn ModelClient, delivery: &'a DeliveryChannel) -> Self {
        Self { model, delivery }
    }

    pub async fn run(&self, request: &BriefingRequest) -> RunReport {
        let mut tracker = Tracker::new();
        let outcome = self.run_stages(request, &mut tracker).await;
        tracker.finish(outcome)
    }

    async fn run_stages(
        &self,
        request: &BriefingRequest,
        tracker: &mut Tracker,
    ) -> Result<DeliveryOutcome> {
        let prompt = build_prompt(request);
        tracker.advance(PipelineState::PromptBuilt);

        let contract = SchemaContract::new(request);
        let doc = fetch_briefing(self.model, &contract, &prompt).await?;
        tracker.advance(PipelineState::Fetched);
        tracing::info!(
            watchlist = doc.watchlist.len(),
            open_positions = doc.open_positions.len(),
            opportunities = doc.opportunities.len(),
            "briefing validated"
        );

        let report = render_report(&doc, request.reference_date)?;
        tracker.advance(PipelineState::Rendered);

        let outcome = self.delivery.send(&report).await?;
        tracker.advance(PipelineState::Delivered);
        Ok(outcome)
    }
}
