use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionRepository};
use crate::routes::with_intake_routes;
use applicant_intake::config::AppConfig;
use applicant_intake::error::AppError;
use applicant_intake::telemetry;
use applicant_intake::workflows::intake::{
    FlowEngine, HttpTransport, IntakeService, QuestionCatalog, Validator,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = FlowEngine::new(
        Arc::new(QuestionCatalog::standard()),
        Validator::new(config.intake.validation_policy()?),
    );
    let transport = HttpTransport::new(config.intake.endpoint_url.clone(), config.intake.timeout);
    let intake_service = Arc::new(IntakeService::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(transport),
        engine,
    ));

    let app = with_intake_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        endpoint = %config.intake.endpoint_url,
        "applicant intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
