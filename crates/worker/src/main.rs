use anyhow::Context;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use briefing_core::config::Settings;
use briefing_core::delivery::DeliveryChannel;
use briefing_core::domain::briefing::BriefingRequest;
use briefing_core::llm::openai::OpenAiClient;
use briefing_core::pipeline::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    if let Err(err) = run(&settings).await {
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }
    Ok(())
}

/// One run: build the briefing for today in Manila and email it.
async fn run(settings: &Settings) -> anyhow::Result<()> {
    // Everything that can fail on configuration fails here, before any
    // network call.
    let reference_date = briefing_core::time::reference_date(chrono::Utc::now())?;
    let profile = settings.profile()?;
    let model = OpenAiClient::from_settings(settings)?;
    let delivery = DeliveryChannel::smtp_from_settings(settings)?;

    let request = BriefingRequest::from_profile(reference_date, &profile);
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("briefing_run", %run_id, %reference_date);

    async {
        tracing::info!(
            model = model.model(),
            watchlist = request.watchlist_universe.len(),
            open_positions = request.open_positions.len(),
            "briefing run starting"
        );

        let report = Orchestrator::new(&model, &delivery).run(&request).await;
        let outcome = report.outcome.context("daily briefing run failed")?;
        tracing::info!(
            final_state = %report.final_state,
            attempts = outcome.attempts,
            "briefing run finished"
        );
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
