//! assay: command-line front-end for the orchestrator
//!
//! Runs one operation against the configured model and prints the result.

use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use assay::credentials::TerminalPrompter;
use assay::{
    AiRequest, AiResponse, Assay, AssayError, ConfigProvider, FileConfig, FileSecretStore,
    Language, MapConfig, Orchestrator,
};
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Assay CLI
#[derive(Parser)]
#[command(name = "assay")]
#[command(version = assay::PKG_VERSION)]
#[command(about = "AI code assistance from the command line")]
struct Args {
    /// Config file (default: ~/.assay/config.toml, then /etc/assay/config.toml)
    #[arg(short, long, env = "ASSAY_CONFIG")]
    config: Option<PathBuf>,

    /// Secrets file for the stored API key (default: ~/.assay/secrets.toml)
    #[arg(long, env = "ASSAY_SECRETS")]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs)]
struct CodeInput {
    /// Source code (or omit to read from stdin)
    code: Option<String>,
    /// Language of the code
    #[arg(short, long, default_value = "typescript")]
    language: Language,
    /// Cursor line
    #[arg(long, default_value_t = 0)]
    line: u32,
    /// Print the response as it streams
    #[arg(short, long)]
    stream: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Complete a raw prompt
    Suggest {
        /// Prompt text (or omit to read from stdin)
        prompt: Option<String>,
        /// Print the completion as it streams
        #[arg(short, long)]
        stream: bool,
    },

    /// Suggest improvements for code
    Enhance(CodeInput),

    /// Generate unit tests for code
    Tests(CodeInput),

    /// Explain code
    Explain(CodeInput),

    /// Review a system architecture description
    Review {
        /// Architecture description or code (or omit to read from stdin)
        context: Option<String>,
        /// Language of the system
        #[arg(short, long, default_value = "typescript")]
        language: Language,
    },

    /// Delete the stored API key
    ClearKey,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(version = %assay::version_string(), "assay starting");
    let config = load_config(args.config.as_deref())?;
    let secrets = match args.secrets {
        Some(path) => FileSecretStore::new(path),
        None => FileSecretStore::user_default()?,
    };

    let orchestrator = Assay::builder()
        .config(config.as_ref())
        .secret_store(Arc::new(secrets))
        .prompter(Arc::new(TerminalPrompter))
        .build()?;

    match args.command {
        Command::Suggest { prompt, stream } => {
            let prompt = resolve_text(prompt, "suggest")?;
            if stream {
                let mut print = print_chunk;
                orchestrator.get_suggestions(&prompt, Some(&mut print)).await?;
                println!();
            } else {
                println!("{}", orchestrator.process_query(&prompt).await?);
            }
        }

        Command::Enhance(input) => run_task(&orchestrator, Task::Enhance, input).await?,
        Command::Tests(input) => run_task(&orchestrator, Task::Tests, input).await?,
        Command::Explain(input) => run_task(&orchestrator, Task::Explain, input).await?,

        Command::Review { context, language } => {
            let context = resolve_text(context, "review")?;
            let mut progress = |message: &str| eprintln!("{message}");
            let review = orchestrator
                .review_architecture(&context, language, Some(&mut progress))
                .await?;
            println!("score: {}/10", review.score);
            if !review.issues.is_empty() {
                println!("\nissues:");
                for issue in &review.issues {
                    println!("  - {issue}");
                }
            }
            if !review.recommendations.is_empty() {
                println!("\nrecommendations:");
                for rec in &review.recommendations {
                    println!("  - {rec}");
                }
            }
            if let Some(diagram) = &review.diagram {
                println!("\n{diagram}");
            }
        }

        Command::ClearKey => {
            orchestrator.clear_api_key().await?;
            println!("API key cleared");
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Task {
    Enhance,
    Tests,
    Explain,
}

async fn run_task(
    orchestrator: &Orchestrator,
    task: Task,
    input: CodeInput,
) -> Result<(), Box<dyn std::error::Error>> {
    let code = resolve_text(input.code, "code")?;
    let request = AiRequest::new(code, input.language).cursor(input.line, 0);

    let mut print = print_chunk;
    let on_chunk: assay::OnChunk<'_> = if input.stream {
        Some(&mut print)
    } else {
        None
    };

    let response = match task {
        Task::Enhance => orchestrator.get_enhanced_suggestions(&request, on_chunk).await?,
        Task::Tests => orchestrator.generate_tests(&request, on_chunk).await?,
        Task::Explain => orchestrator.explain_code(&request, on_chunk).await?,
    };

    if input.stream {
        println!();
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_chunk(chunk: &str) {
    print!("{chunk}");
    let _ = io::stdout().flush();
}

fn print_response(response: &AiResponse) {
    for suggestion in &response.suggestions {
        println!("{suggestion}");
    }
    if let Some(explanation) = &response.explanation {
        eprintln!("\n({explanation}, confidence {:.1})", response.confidence.unwrap_or(0.0));
    }
    if let Some(tests) = &response.tests {
        println!("{tests:#}");
    }
}

/// Explicit config files must exist; otherwise a missing default file
/// means "use built-in defaults".
fn load_config(
    explicit: Option<&std::path::Path>,
) -> Result<Box<dyn ConfigProvider>, AssayError> {
    match FileConfig::load(explicit) {
        Ok(config) => Ok(Box::new(config)),
        Err(AssayError::Configuration(msg))
            if explicit.is_none() && msg.starts_with("No config file found") =>
        {
            tracing::debug!(reason = %msg, "no config file; using defaults");
            Ok(Box::new(MapConfig::new()))
        }
        Err(e) => Err(e),
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    let stdin_text = if stdin_is_pipe {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    } else {
        None
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
