use std::sync::{Arc, Mutex};

use briefing_core::config::BriefingProfile;
use briefing_core::delivery::retry::{RecordingSleeper, RetryPolicy};
use briefing_core::delivery::{DeliveryChannel, Mailer};
use briefing_core::domain::briefing::{BriefingRequest, RiskBand};
use briefing_core::llm::{ModelClient, Provider};
use briefing_core::pipeline::{Orchestrator, PipelineState};
use briefing_core::render::RenderedReport;
use briefing_core::BriefingError;
use chrono::NaiveDate;
use serde_json::{json, Value};

struct StubModel {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    fn new(response: Value) -> Self {
        Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ModelClient for StubModel {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, prompt: &str) -> briefing_core::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<RenderedReport>>,
}

#[async_trait::async_trait]
impl Mailer for CapturingMailer {
    async fn deliver(&self, report: &RenderedReport) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(report.clone());
        Ok(())
    }
}

fn request() -> BriefingRequest {
    let profile = BriefingProfile {
        watchlist: vec!["MSFT".to_string(), "NVDA".to_string()],
        open_positions: [("NVDA".to_string(), 182.72)].into_iter().collect(),
        risk_band: RiskBand {
            lower_pct: 5.5,
            upper_pct: 7.0,
        },
    };
    BriefingRequest::from_profile(NaiveDate::from_ymd_opt(2025, 8, 11).unwrap(), &profile)
}

fn briefing(watchlist_ticker: &str) -> Value {
    json!({
        "date": "Monday, August 11, 2025",
        "market_overview": {
            "sentiment": "Neutral",
            "indexes": {"sp500": "-0.1%", "nasdaq": "+0.3%"},
            "news": ["Chip stocks steady ahead of CPI."]
        },
        "watchlist": [
            {"ticker": watchlist_ticker, "rsi": 52.4, "macd": "neutral", "rank": "Good", "action": "Hold"}
        ],
        "open_positions": [
            {"ticker": "NVDA", "entry_price": 182.72, "current_price": 175.10}
        ],
        "journal": {
            "did_right": ["Sized NVDA within the risk band"],
            "improve": ["Log entries before the open"],
            "traps": ["Averaging down without a plan"]
        },
        "opportunities": [
            {"ticker": "MSFT", "setup": "oversold bounce", "entry_hint": "Reclaim of the 50-day MA"}
        ],
        "reminders": [
            "Max risk per trade: 5.5%–7.0%",
            "Stop-loss discipline check",
            "Emotional check-in & predicted mood"
        ]
    })
}

fn channel(mailer: Arc<CapturingMailer>, sleeper: Arc<RecordingSleeper>) -> DeliveryChannel {
    DeliveryChannel::new(mailer, sleeper, RetryPolicy::default())
}

#[tokio::test]
async fn delivers_rendered_briefing_for_open_position() {
    let req = request();
    let model = StubModel::new(briefing("MSFT"));
    let mailer = Arc::new(CapturingMailer::default());
    let sleeper = Arc::new(RecordingSleeper::default());
    let delivery = channel(mailer.clone(), sleeper.clone());

    let report = Orchestrator::new(&model, &delivery).run(&req).await;

    assert_eq!(report.final_state, PipelineState::Delivered);
    assert!(report.is_delivered());
    assert_eq!(report.outcome.unwrap().attempts, 1);
    assert!(sleeper.waits().is_empty());

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "📊 Daily Market Briefing – August 11, 2025");
    assert!(sent[0].html.contains("$182.72"));
    assert!(sent[0].html.contains("$175.10"));
    assert!(sent[0].html.contains("Sized NVDA within the risk band"));
    assert!(sent[0].html.contains("Emotional check-in & predicted mood"));

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Monday, August 11, 2025"));
    assert!(prompts[0].contains("Watchlist universe: MSFT, NVDA."));
}

#[tokio::test]
async fn ticker_outside_universe_fails_without_delivery() {
    let req = request();
    let model = StubModel::new(briefing("TSLA"));
    let mailer = Arc::new(CapturingMailer::default());
    let delivery = channel(mailer.clone(), Arc::new(RecordingSleeper::default()));

    let report = Orchestrator::new(&model, &delivery).run(&req).await;

    assert_eq!(report.final_state, PipelineState::Failed);
    match report.outcome {
        Err(BriefingError::SchemaViolation { path, value, .. }) => {
            assert_eq!(path, "watchlist[0].ticker");
            assert!(value.contains("TSLA"));
        }
        other => panic!("expected SchemaViolation, got {other:?}"),
    }
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn partial_document_fails_without_delivery() {
    let req = request();
    let model = StubModel::new(json!({
        "watchlist": [{"ticker": "TSLA", "rsi": 40, "macd": "bearish", "rank": "Poor", "action": "Sell"}]
    }));
    let mailer = Arc::new(CapturingMailer::default());
    let delivery = channel(mailer.clone(), Arc::new(RecordingSleeper::default()));

    let report = Orchestrator::new(&model, &delivery).run(&req).await;

    assert_eq!(report.final_state, PipelineState::Failed);
    assert!(matches!(
        report.outcome,
        Err(BriefingError::SchemaViolation { .. })
    ));
    assert!(mailer.sent.lock().unwrap().is_empty());
}
