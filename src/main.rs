mod cli;
mod config;
mod context;
mod error;
mod llm;
mod prompts;
mod sanitize;
mod service;
mod task;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use crate::cli::{CliArgs, Command};
use crate::config::Config;
use crate::error::AssistError;
use crate::llm::LlmEngine;
use crate::service::ContentService;
use crate::task::{Language, TaskKind};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match cli::parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match args.command {
        Command::Help => {
            cli::print_usage();
            return ExitCode::SUCCESS;
        }
        Command::DefaultConfig => {
            print!("{}", Config::default_config_contents());
            return ExitCode::SUCCESS;
        }
        Command::Tasks => {
            for task in TaskKind::ALL {
                println!("{:<22} {}", task.key(), task.describe());
            }
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    // Initialize tracing; stdout is reserved for generated content
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.command == Command::Sanitize {
        return match cli::read_stdin() {
            Ok(raw) => {
                println!("{}", sanitize::sanitize(&raw));
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("failed to read stdin: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match Config::load(args.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let language = match args.language.as_deref() {
        Some(code) => match Language::from_code(code) {
            Some(l) => l,
            None => {
                let supported: Vec<&str> = Language::ALL.iter().map(Language::code).collect();
                error!(lang = code, "unsupported language, expected one of: {}", supported.join(", "));
                return ExitCode::from(2);
            }
        },
        None => config.default_language(),
    };

    let engine = match LlmEngine::new(&config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!("failed to initialize LLM engine: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        backend = engine.active_backend(),
        provider = engine.backend_info(),
        configured = engine.is_configured(),
        language = %language,
        "classroom-assist starting"
    );

    let service = ContentService::new(engine, language);

    match run(&service, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AssistError::ProviderNotConfigured(reason)) => {
            eprintln!("content generation is disabled: {reason}");
            ExitCode::FAILURE
        }
        Err(e @ AssistError::UnknownTaskKind(_)) => {
            eprintln!("{e} (run `classroom-assist tasks` for the list)");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(service: &ContentService, args: &CliArgs) -> error::Result<()> {
    match &args.command {
        Command::Generate { task } => {
            let context = args.context.load()?;
            let content = service.generate(task, context).await?;
            println!("{content}");
        }
        Command::Prompt { task } => {
            let context = args.context.load()?;
            println!("{}", service.preview(task, context)?);
        }
        Command::Check => run_checks(service),
        Command::Sanitize | Command::Tasks | Command::DefaultConfig | Command::Help => {}
    }
    Ok(())
}

fn run_checks(service: &ContentService) {
    info!("running pre-flight checks...");
    info!("config: OK");
    info!("  default_language: {}", service.default_language());

    let engine = service.engine();
    info!("  llm_backend: {}", engine.active_backend());
    info!("  registered backends: [{}]", engine.plugins.list().join(", "));

    match engine.disabled_reason() {
        None => info!("provider: OK ({})", engine.backend_info()),
        Some(reason) => error!("provider: NOT CONFIGURED ({reason})"),
    }
}
