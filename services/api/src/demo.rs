use crate::infra::{DryRunTransport, InMemorySessionRepository};
use applicant_intake::config::AppConfig;
use applicant_intake::error::AppError;
use applicant_intake::telemetry;
use applicant_intake::workflows::intake::{
    build_payload, AnswerValue, FileAttachment, FlowEngine, HttpTransport, IntakeService,
    PayloadValue, QuestionCatalog, SubmissionTransport, Validator,
};
use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_RESUME: &[u8] = b"%PDF-1.4\n% sample resume for the intake demo\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum DemoTrack {
    Experienced,
    #[default]
    Fresher,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Applicant track to script through the branch selector.
    #[arg(long, value_enum, default_value_t = DemoTrack::Fresher)]
    pub(crate) track: DemoTrack,
    /// Resume to attach. A small generated PDF is used when omitted.
    #[arg(long)]
    pub(crate) resume: Option<PathBuf>,
    /// Send the payload to the configured endpoint instead of printing it only.
    #[arg(long)]
    pub(crate) transmit: bool,
    /// Date stamped into the transmitted filename (defaults to today, UTC).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        track,
        resume,
        transmit,
        today,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let engine = FlowEngine::new(
        Arc::new(QuestionCatalog::standard()),
        Validator::new(config.intake.validation_policy()?),
    );
    let mut answers = scripted_answers(track);
    answers.push(load_resume(resume).await?.into());

    println!("Applicant intake demo ({track:?} track, stamped {today})");
    if transmit {
        println!("Delivering to {}", config.intake.endpoint_url);
        let transport =
            HttpTransport::new(config.intake.endpoint_url.clone(), config.intake.timeout);
        walk(engine, Arc::new(transport), answers, today).await
    } else {
        let transport = Arc::new(DryRunTransport::default());
        walk(engine, transport.clone(), answers, today).await?;
        println!(
            "\nDry run: {} payload(s) kept locally. Pass --transmit to send.",
            transport.delivered().len()
        );
        Ok(())
    }
}

async fn walk<T>(
    engine: FlowEngine,
    transport: Arc<T>,
    answers: Vec<AnswerValue>,
    today: NaiveDate,
) -> Result<(), AppError>
where
    T: SubmissionTransport + 'static,
{
    let service = IntakeService::new(
        Arc::new(InMemorySessionRepository::default()),
        transport,
        engine,
    );
    let mut record = service.start()?;
    println!("Session {}\n", record.id.0);

    for answer in answers {
        let view = record.view();
        let Some(question) = view.current_question else {
            break;
        };
        println!(
            "[{}/{}] {}",
            view.position + 1,
            view.sequence_length,
            question.label
        );
        println!("      > {}", describe(&answer));
        record = service.answer(&record.id, answer)?;
    }

    let flow = record.flow.as_ref();
    let payload = flow.map(|flow| build_payload(flow.answers(), today));
    if let Some(payload) = &payload {
        println!("\nPayload fields");
        for field in payload.fields() {
            match &field.value {
                PayloadValue::Text(text) => println!("- {}: {}", field.name, text),
                PayloadValue::File {
                    attachment,
                    transmitted_filename,
                } => println!(
                    "- {}: <{} bytes {} sent as {}>",
                    field.name, attachment.size, attachment.mime_type, transmitted_filename
                ),
            }
        }
    }

    let receipt = service.submit_on(&record.id, today).await?;
    println!(
        "\nSubmitted {} with {} field(s)",
        receipt.filename,
        receipt.fields.len()
    );
    Ok(())
}

fn describe(answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Text(text) if text.is_empty() => "(skipped)".to_string(),
        AnswerValue::Text(text) => text.clone(),
        AnswerValue::File(file) => {
            format!("{} ({} bytes, {})", file.name, file.size, file.mime_type)
        }
    }
}

async fn load_resume(path: Option<PathBuf>) -> Result<FileAttachment, AppError> {
    let Some(path) = path else {
        return Ok(FileAttachment::from_bytes(
            "resume.pdf",
            "application/pdf",
            SAMPLE_RESUME,
        ));
    };

    let metadata = tokio::fs::metadata(&path).await?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".to_string());
    let mime_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(FileAttachment::from_path(name, mime_type, metadata.len(), path))
}

fn scripted_answers(track: DemoTrack) -> Vec<AnswerValue> {
    let mut answers: Vec<AnswerValue> = vec![
        "Jane Doe".into(),
        "jane.doe@example.com".into(),
        "+91 9876543210".into(),
        "https://linkedin.com/in/jane-doe".into(),
    ];
    match track {
        DemoTrack::Experienced => answers.extend(
            ["Experienced", "5 years", "30 days", "10 LPA", "15 LPA"].map(AnswerValue::from),
        ),
        DemoTrack::Fresher => answers.extend(
            [
                "Fresher",
                "Web development, machine learning",
                "2024",
                "I have a basic understanding of AI and its applications.",
            ]
            .map(AnswerValue::from),
        ),
    }
    answers.extend(
        [
            "Bengaluru",
            "I enjoy turning ambiguous problems into shipped software.",
        ]
        .map(AnswerValue::from),
    );
    answers
}
