use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use resumecraft::canvas::engine::EditorConfig;
use resumecraft::canvas::geom::Point;
use resumecraft::config::ClientConfig;
use resumecraft::error::{ApiError, ConfigError, ErrorCode, RenderFailure};
use resumecraft::net::api::{HttpApi, TemplateApi};
use resumecraft::render_job::RenderState;
use resumecraft::session::EditorSession;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("http error: {0}")]
    Api(#[from] ApiError),
    #[error("template load failed: {message} ({code})")]
    Load { code: &'static str, message: String },
    #[error("render failed: {0}")]
    Render(RenderFailure),
    #[error("render ended without a result")]
    NoResult,
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "resumecraft-cli", about = "Resume template editor and render CLI")]
struct Cli {
    #[arg(long, env = "RESUME_API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "RESUME_ASSET_BASE_URL")]
    asset_base_url: Option<String>,

    /// Bearer credential passed through to every request.
    #[arg(long, env = "RESUME_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Template(TemplateCommand),
    /// Load a template, apply edits, render it, and print the result URL.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct TemplateCommand {
    #[command(subcommand)]
    command: TemplateSubcommand,
}

#[derive(Subcommand, Debug)]
enum TemplateSubcommand {
    /// Print the blocks a template seeds.
    Show { template_id: String },
}

#[derive(Args, Debug)]
struct RenderArgs {
    template_id: String,

    /// Replace a block's text, e.g. `--text NAME="Ada Lovelace"`.
    #[arg(long = "text", value_name = "TITLE=VALUE", value_parser = parse_text_edit)]
    texts: Vec<TextEdit>,

    /// Move a block's top-left corner, e.g. `--move NAME=40,60`.
    #[arg(long = "move", value_name = "TITLE=X,Y", value_parser = parse_move_edit)]
    moves: Vec<MoveEdit>,

    /// Download the rendered image to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
struct TextEdit {
    title: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq)]
struct MoveEdit {
    title: String,
    x: f64,
    y: f64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring .env: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let api = Arc::new(HttpApi::new(&config)?);

    match cli.command {
        Command::Template(template) => match template.command {
            TemplateSubcommand::Show { template_id } => run_template_show(config, api, &template_id).await,
        },
        Command::Render(args) => run_render(config, api, args).await,
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_base_url.as_deref() {
        config = config.with_api_base_url(url)?;
    }
    if let Some(url) = cli.asset_base_url.as_deref() {
        config = config.with_asset_base_url(url)?;
    }
    if let Some(token) = cli.auth_token.as_deref().filter(|t| !t.trim().is_empty()) {
        config.auth_token = Some(token.to_owned());
    }
    Ok(config)
}

async fn open_session(config: ClientConfig, api: Arc<HttpApi>, template_id: &str) -> Result<EditorSession, CliError> {
    let mut session = EditorSession::new(config, EditorConfig::default(), api.clone(), api);
    if let Err(e) = session.open(template_id).await {
        return Err(CliError::Load { code: e.error_code(), message: e.to_string() });
    }
    if let Some(warning) = session.background_warning() {
        warn!(%warning, "continuing without background");
    }
    Ok(session)
}

async fn run_template_show(config: ClientConfig, api: Arc<HttpApi>, template_id: &str) -> Result<(), CliError> {
    let session = open_session(config, api, template_id).await?;
    let Some(engine) = session.engine() else {
        return Err(CliError::Load { code: "E_TEMPLATE_MALFORMED", message: "no editor".to_owned() });
    };
    let summary = json!({
        "template_id": session.template_id(),
        "name": session.template_name(),
        "background": engine.scene().background_source(),
        "blocks": engine.doc().sorted_blocks(),
    });
    print_json(&summary)
}

async fn run_render(config: ClientConfig, api: Arc<HttpApi>, args: RenderArgs) -> Result<(), CliError> {
    let mut session = open_session(config, api.clone(), &args.template_id).await?;

    for edit in &args.texts {
        if session.set_text(&edit.title, &edit.value).is_empty() {
            return Err(CliError::UnknownBlock(edit.title.clone()));
        }
    }
    for edit in &args.moves {
        let Some(end) = session.move_block(&edit.title, Point::new(edit.x, edit.y)) else {
            return Err(CliError::UnknownBlock(edit.title.clone()));
        };
        if (end.x, end.y) != (edit.x, edit.y) {
            warn!(block = %edit.title, x = end.x, y = end.y, "move clamped to the page");
        }
    }

    session.submit_render().await;
    match session.wait_for_render().await {
        RenderState::Succeeded { .. } => {}
        RenderState::Failed(failure) => return Err(CliError::Render(failure.clone())),
        RenderState::Idle | RenderState::Submitting | RenderState::Polling { .. } => return Err(CliError::NoResult),
    }
    let Some(url) = session.result_url() else {
        return Err(CliError::NoResult);
    };

    if let Some(path) = args.output.as_ref() {
        let bytes = api.fetch_asset(&url).await?;
        tokio::fs::write(path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "result saved");
    }
    println!("{url}");
    Ok(())
}

fn parse_text_edit(raw: &str) -> Result<TextEdit, String> {
    let (title, value) = raw.split_once('=').ok_or_else(|| format!("expected TITLE=VALUE, got `{raw}`"))?;
    let title = title.trim();
    if title.is_empty() {
        return Err("block title must not be empty".to_owned());
    }
    Ok(TextEdit { title: title.to_owned(), value: value.to_owned() })
}

fn parse_move_edit(raw: &str) -> Result<MoveEdit, String> {
    let (title, coords) = raw.split_once('=').ok_or_else(|| format!("expected TITLE=X,Y, got `{raw}`"))?;
    let title = title.trim();
    if title.is_empty() {
        return Err("block title must not be empty".to_owned());
    }
    let (x, y) = coords.split_once(',').ok_or_else(|| format!("expected X,Y, got `{coords}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("`{v}` is not a number"))
    };
    Ok(MoveEdit { title: title.to_owned(), x: parse(x)?, y: parse(y)? })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
