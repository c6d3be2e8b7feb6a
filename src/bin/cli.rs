//! Judgebox CLI
//!
//! Run and grade submissions locally, or against a remote execution service.

use clap::{Parser, Subcommand};
use console::style;
use judgebox::config::{config_path, save_config, validate_config, Config};
use judgebox::harness::load_case_file;
use judgebox::sandbox::{Language, Sandbox};
use judgebox::{ExecutionRequest, Harness, TestStatus, VERSION};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "judgebox",
    author = "Judgebox Contributors",
    version = VERSION,
    about = "Judgebox - code execution sandbox and test harness",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run a source file once
    Run {
        /// Language identifier (python, javascript, typescript, php, c, cpp, java, csharp)
        language: String,
        /// Source file
        file: PathBuf,
        /// File to feed as standard input
        #[arg(long)]
        stdin: Option<PathBuf>,
        /// Execution service URL (runs in-process when omitted)
        #[arg(long, env = "SANDBOX_URL")]
        remote: Option<String>,
    },

    /// Grade a source file against a problem's test cases
    Verify {
        /// Language identifier
        language: String,
        /// Source file
        file: PathBuf,
        /// Problem id used to look up stored test cases
        #[arg(long, short)]
        problem: i64,
        /// Test case file to use instead of the stored cases
        #[arg(long)]
        cases: Option<PathBuf>,
        /// Execution service URL (runs in-process when omitted)
        #[arg(long, env = "SANDBOX_URL")]
        remote: Option<String>,
    },

    /// List supported languages and whether their tools are installed
    Languages,

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing configuration file
        #[arg(long, short)]
        force: bool,
    },

    /// Validate the current configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; program output owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "judgebox=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            language,
            file,
            stdin,
            remote,
        } => run_file(&language, &file, stdin.as_deref(), remote).await,
        Commands::Verify {
            language,
            file,
            problem,
            cases,
            remote,
        } => verify_file(&language, &file, problem, cases.as_deref(), remote).await,
        Commands::Languages => list_languages().await,
        Commands::InitConfig { force } => init_config(force),
        Commands::CheckConfig => check_config(),
    }
}

/// Harness for this invocation; an explicit remote URL beats the configured one
fn harness_for(remote: Option<String>) -> anyhow::Result<Harness> {
    let mut config = Config::from_env()?;
    if remote.is_some() {
        config.harness.execution_url = remote;
    }
    Ok(Harness::from_config(&config)?)
}

fn print_section(title: &str, body: &str) {
    if body.is_empty() {
        return;
    }
    println!("{}", style(title).cyan().bold());
    print!("{}", body);
    if !body.ends_with('\n') {
        println!();
    }
}

/// Run a source file once
async fn run_file(
    language: &str,
    file: &Path,
    stdin: Option<&Path>,
    remote: Option<String>,
) -> anyhow::Result<()> {
    let harness = harness_for(remote)?;
    let executor = harness.executor();

    let source = tokio::fs::read_to_string(file).await?;
    let input = match stdin {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };

    let request = ExecutionRequest::new(language, source).with_stdin(input);
    let result = executor.execute(request).await?;

    print_section("Build output", &result.build_stdout);
    print_section("Build errors", &result.build_stderr);
    print_section("Output", &result.stdout);
    print_section("Errors", &result.stderr);

    let exit = if result.exit_code == 0 {
        style(result.exit_code.to_string()).green()
    } else {
        style(result.exit_code.to_string()).red()
    };
    println!("{} {} ({})", style("Exit code:").dim(), exit, executor.name());

    if result.exit_code != 0 {
        std::process::exit(result.exit_code);
    }
    Ok(())
}

/// Grade a source file
async fn verify_file(
    language: &str,
    file: &Path,
    problem_id: i64,
    cases: Option<&Path>,
    remote: Option<String>,
) -> anyhow::Result<()> {
    let harness = harness_for(remote)?;

    let code = tokio::fs::read_to_string(file).await?;
    let supplied = match cases {
        Some(path) => Some(load_case_file(path).await?),
        None => None,
    };

    let verification = harness.verify(language, &code, problem_id, supplied).await;

    for result in &verification.test_case_results {
        let status = match result.status {
            TestStatus::Accepted => style(result.status.as_str()).green(),
            TestStatus::WrongAnswer => style(result.status.as_str()).red(),
            _ => style(result.status.as_str()).yellow(),
        };
        println!("   {} {}", status, result.name);
        if !result.is_correct {
            println!("      └─ expected: {}", result.expected_output.trim());
            println!("      └─ actual:   {}", result.actual_output.trim());
        }
    }

    println!();
    if verification.success {
        println!("{} {}", style("✓").green(), verification.message);
        Ok(())
    } else {
        println!("{} {}", style("✗").red(), verification.message);
        std::process::exit(1);
    }
}

/// List languages with tool availability
async fn list_languages() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let sandbox = Sandbox::new(&config.sandbox);
    let registry = sandbox.registry();

    println!("{}", style("Supported languages").cyan().bold());
    for language in Language::ALL {
        let missing = registry.resolve(language).await.missing_tools();
        if missing.is_empty() {
            println!("   {} {}", style("✓").green(), language);
        } else {
            println!(
                "   {} {} (missing: {})",
                style("✗").red(),
                language,
                missing.join(", ")
            );
        }
    }
    Ok(())
}

/// Write the default configuration file
fn init_config(force: bool) -> anyhow::Result<()> {
    let path = config_path();

    if path.exists() && !force {
        println!(
            "{} {} already exists. Use --force to overwrite.",
            style("⚠").yellow(),
            path.display()
        );
        return Ok(());
    }

    save_config(&Config::default(), &path)?;
    println!("{} Wrote {}", style("✓").green(), path.display());
    Ok(())
}

/// Load and validate the configuration
fn check_config() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let result = validate_config(&config);

    println!("{}", style("Configuration").cyan().bold());
    println!("   └─ Config file: {}", config_path().display());
    println!("   └─ Workspace root: {}", config.sandbox.workspace_root.display());
    println!(
        "   └─ Limits: run {:?}, compile {:?}",
        config.sandbox.run_timeout, config.sandbox.compile_timeout
    );
    println!(
        "   └─ Executor: {}",
        config
            .harness
            .execution_url
            .as_deref()
            .unwrap_or("in-process sandbox")
    );
    println!();

    for error in &result.errors {
        println!("   {} {}", style("✗").red(), error);
    }
    for warning in &result.warnings {
        println!("   {} {}", style("⚠").yellow(), warning);
    }

    if result.valid {
        println!("{} Configuration is valid", style("✓").green());
        Ok(())
    } else {
        anyhow::bail!("configuration has {} error(s)", result.errors.len())
    }
}
