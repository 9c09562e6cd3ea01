use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::StreamExt;
use uuid::Uuid;

use boardlens::application::services::{AnalysisEvent, IntakeRequest, NewAnalysis};
use boardlens::domain::{CompanyId, DocumentType, SourceFile, UserId};
use boardlens::infrastructure::observability::{TracingConfig, init_tracing};
use boardlens::presentation::{AppState, Settings};

/// Extract, chunk and analyze board documents (pdf, xlsx, docx, pptx).
#[derive(Parser)]
#[command(name = "boardlens", version)]
struct Args {
    /// Files to process, in the order they should appear in the combined text.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print a per-chunk summary instead of the combined text.
    #[arg(long)]
    chunks: bool,

    /// Upload each file and create a document record.
    #[arg(long, requires_all = ["company", "user"])]
    ingest: bool,

    /// Run a structured analysis over all files.
    #[arg(long, requires_all = ["company", "user"])]
    analyze: bool,

    /// Print partial analysis snapshots as they arrive.
    #[arg(long, requires = "analyze")]
    stream: bool,

    #[arg(long, env = "BOARDLENS_COMPANY_ID")]
    company: Option<Uuid>,

    #[arg(long, env = "BOARDLENS_USER_ID")]
    user: Option<String>,

    /// governance, financial, compliance, risk, strategy, minutes, report, policy or other.
    #[arg(long, default_value = "report")]
    document_type: DocumentType,

    /// Extra instructions prepended to the analysis request.
    #[arg(long)]
    prompt: Option<String>,

    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (settings, environment) = Settings::load().context("failed to load settings")?;
    init_tracing(
        TracingConfig::new(environment.as_str(), settings.logging.enable_json)
            .with_default_filter(settings.logging.level.clone()),
    );

    let files = read_files(&args.files).await?;
    let state = AppState::from_settings(settings).await?;

    if args.ingest {
        ingest(&state, &args, &files).await?;
    }

    if args.analyze {
        return analyze(&state, &args, files).await;
    }

    let batch = state
        .pipeline
        .process_until(&files, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    if args.chunks {
        for chunk in &batch.chunks {
            let preview: String = chunk.text.chars().take(80).collect();
            println!(
                "#{:<4} {:>6} tokens  {}",
                chunk.index,
                chunk.token_count,
                preview.replace('\n', " ")
            );
        }
    } else {
        println!("{}", batch.combined_text);
    }

    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("not a file: {}", path.display()))?;
        files.push(SourceFile::new(file_name, data));
    }
    Ok(files)
}

fn identity(args: &Args) -> Result<(CompanyId, UserId)> {
    match (args.company, args.user.as_deref()) {
        (Some(company), Some(user)) => Ok((CompanyId::from_uuid(company), UserId::new(user))),
        _ => bail!("--company and --user are required"),
    }
}

async fn ingest(state: &AppState, args: &Args, files: &[SourceFile]) -> Result<()> {
    let (company_id, user_id) = identity(args)?;
    for file in files {
        let outcome = state
            .intake_service
            .ingest(IntakeRequest {
                user_id: user_id.clone(),
                company_id,
                file: file.clone(),
                content_type: None,
            })
            .await?;
        println!(
            "{}  {}  {} chunks  {}",
            outcome.document.id, outcome.document.name, outcome.chunk_count, outcome.document.url
        );
    }
    Ok(())
}

async fn analyze(state: &AppState, args: &Args, files: Vec<SourceFile>) -> Result<()> {
    let Some(service) = state.analysis_service.clone() else {
        bail!("analysis requires APP_LLM__API_KEY");
    };
    let (company_id, analyzer_id) = identity(args)?;

    let title = args.title.clone().unwrap_or_else(|| {
        files
            .iter()
            .map(|f| f.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    });
    let analysis = service
        .create(NewAnalysis {
            company_id,
            analyzer_id,
            document_ids: Vec::new(),
            document_type: args.document_type,
            title,
        })
        .await?;

    let finished = if args.stream {
        let mut events = Arc::clone(&service)
            .run_streaming(analysis.id, files, args.prompt.clone())
            .await?;
        let mut finished = None;
        while let Some(event) = events.next().await {
            match event? {
                AnalysisEvent::Partial {
                    chunk_index,
                    total_chunks,
                    snapshot,
                } => eprintln!("[part {}/{}] {}", chunk_index + 1, total_chunks, snapshot),
                AnalysisEvent::Finished(analysis) => finished = Some(analysis),
            }
        }
        finished.context("analysis stream ended without a result")?
    } else {
        service.run(analysis.id, files, args.prompt.clone()).await?
    };

    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}
