use std::io::Read;
use std::path::PathBuf;

use crate::context::GenerationContext;
use crate::error::{AssistError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Compose, call the provider, print sanitized content.
    Generate { task: String },
    /// Print the composed prompt only.
    Prompt { task: String },
    /// Sanitize raw text read from stdin.
    Sanitize,
    /// List the recognised task kinds.
    Tasks,
    /// Validate config and provider availability.
    Check,
    DefaultConfig,
    Help,
}

/// Where the JSON context comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContextSource {
    #[default]
    Empty,
    File(PathBuf),
    Stdin,
    Inline(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub config_path: Option<PathBuf>,
    pub context: ContextSource,
    pub language: Option<String>,
}

/// Parse process arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut command: Option<Command> = None;
    let mut config_path = None;
    let mut context = ContextSource::Empty;
    let mut language = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(help()),
            "--default-config" => command = Some(Command::DefaultConfig),
            "--check" => command = Some(Command::Check),
            "--config" => config_path = Some(PathBuf::from(value_for(&mut iter, "--config")?)),
            "--context" => {
                let value = value_for(&mut iter, "--context")?;
                context = if value == "-" {
                    ContextSource::Stdin
                } else {
                    ContextSource::File(PathBuf::from(value))
                };
            }
            "--context-json" => {
                context = ContextSource::Inline(value_for(&mut iter, "--context-json")?.to_string())
            }
            "--lang" => language = Some(value_for(&mut iter, "--lang")?.to_string()),
            "generate" | "prompt" => {
                let task = iter
                    .next()
                    .ok_or_else(|| AssistError::Config(format!("`{arg}` needs a task kind")))?
                    .to_string();
                command = Some(if arg == "generate" {
                    Command::Generate { task }
                } else {
                    Command::Prompt { task }
                });
            }
            "sanitize" => command = Some(Command::Sanitize),
            "tasks" => command = Some(Command::Tasks),
            other => {
                return Err(AssistError::Config(format!(
                    "unexpected argument `{other}` (see --help)"
                )));
            }
        }
    }

    Ok(CliArgs {
        command: command.unwrap_or(Command::Help),
        config_path,
        context,
        language,
    })
}

fn help() -> CliArgs {
    CliArgs {
        command: Command::Help,
        config_path: None,
        context: ContextSource::Empty,
        language: None,
    }
}

fn value_for<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| AssistError::Config(format!("{flag} needs a value")))
}

impl ContextSource {
    /// Read and parse the context.  An absent source yields an empty context.
    pub fn load(&self) -> Result<GenerationContext> {
        match self {
            ContextSource::Empty => Ok(GenerationContext::new()),
            ContextSource::Inline(json) => GenerationContext::from_json_str(json),
            ContextSource::File(path) => {
                let json = std::fs::read_to_string(path)?;
                GenerationContext::from_json_str(&json)
            }
            ContextSource::Stdin => GenerationContext::from_json_str(&read_stdin()?),
        }
    }
}

pub fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn print_usage() {
    println!(
        "classroom-assist — lesson, test and student-analysis content for teachers

USAGE:
    classroom-assist [OPTIONS] <COMMAND>

COMMANDS:
    generate <TASK>     Generate content and print it
    prompt <TASK>       Print the prompt that would be sent, without calling the provider
    sanitize            Clean raw model output read from stdin
    tasks               List task kinds

OPTIONS:
    --context <FILE>        JSON object with the task's fields (\"-\" reads stdin)
    --context-json <JSON>   Inline JSON object with the task's fields
    --lang <th|en|zh>       Default response language (default: th)
    --config <PATH>         Path to config file (default: ~/.config/classroom-assist/config.toml)
    --default-config        Print default config to stdout and exit
    --check                 Validate config and provider availability, then exit
    -h, --help              Print this help message

LLM BACKEND:
    LLM_BACKEND             \"gemini\" (default) or \"openrouter\"
    GEMINI_API_KEY          Google AI Studio API key (gemini backend)
    GEMINI_MODEL            Model name, e.g. gemini-2.0-flash (gemini backend)
    GEMINI_BASE_URL         Override API base URL (gemini backend)
    OPENROUTER_API_KEY      OpenRouter API key (openrouter backend)
    OPENROUTER_MODEL        Model slug, e.g. google/gemini-2.0-flash-001 (openrouter backend)
    OPENROUTER_BASE_URL     Override API base URL (openrouter backend)

ENVIRONMENT:
    CLASSROOM_ASSIST_LANGUAGE   Default response language
    RUST_LOG                    Tracing filter (default: info)
"
    );
}
