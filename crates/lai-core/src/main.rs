//! `latexai` command-line front end

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use lai_chat::{AcceptTarget, ChatSession, HttpChatSource};
use lai_compile::{CompilationController, HttpBuildService, TriggerOutcome};
use lai_core::{logging, AppConfig};
use lai_document::DocumentState;
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("latexai")
        .version(lai_core::VERSION)
        .about("AI-assisted LaTeX authoring")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to a TOML config file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("extract")
                .about("Split an assistant response around its [%LATEX%] payload")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("File holding the response text"),
                ),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile a LaTeX file through the build service")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("LaTeX source"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Where to write the PDF"),
                ),
        )
        .subcommand(
            Command::new("chat")
                .about("Stream one assistant turn")
                .arg(Arg::new("prompt").required(true).help("Message to send"))
                .arg(
                    Arg::new("doc")
                        .long("doc")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Write the accepted LaTeX into this file"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::new(),
    };
    let mut config = config.apply_env();
    if matches.get_flag("json-logs") {
        config.logging.format = lai_core::LogFormat::Json;
    }
    config.validate()?;
    Ok(config)
}

fn run_extract(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(path) = args.get_one::<PathBuf>("file") else {
        bail!("missing file");
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let result = lai_extract::extract(&content);
    println!("--- prefix ---\n{}", result.prefix);
    match &result.payload {
        Some(payload) => println!("--- payload ---\n{payload}"),
        None => println!("--- payload ---\n(none)"),
    }
    println!("--- suffix ---\n{}", result.suffix);
    Ok(())
}

async fn run_compile(config: &AppConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let (Some(file), Some(out)) = (args.get_one::<PathBuf>("file"), args.get_one::<PathBuf>("out"))
    else {
        bail!("missing file or --out");
    };
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let service = HttpBuildService::builder()
        .base_url(config.build.base_url.clone())
        .timeout(config.build.timeout())
        .build()?;
    let controller = CompilationController::new(Arc::new(service), DocumentState::with_text(source))
        .with_compiler(config.build.compiler.clone());

    match controller.trigger_compile().await {
        TriggerOutcome::Settled(report) if report.outcome.is_success() => {
            let Some(bytes) = controller.artifact_bytes() else {
                bail!("compiled artifact was released before it could be written");
            };
            tokio::fs::write(out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Wrote {} ({} bytes) in {:.1}s",
                out.display(),
                bytes.len(),
                report.elapsed.as_secs_f64()
            );
            Ok(())
        }
        TriggerOutcome::Settled(_) => {
            let message = controller.last_error().unwrap_or_default();
            bail!("Compilation Error: {message}")
        }
        TriggerOutcome::Rejected => bail!("a compile is already in progress"),
    }
}

async fn run_chat(config: &AppConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let Some(prompt) = args.get_one::<String>("prompt") else {
        bail!("missing prompt");
    };
    let source = HttpChatSource::with_timeout(config.chat.endpoint.clone(), config.chat.timeout())?;
    let chat = ChatSession::new(Arc::new(source), config.chat.prompt.text().map(String::from));

    let turn = chat.submit(prompt).await?;
    let Some(id) = turn.assistant else {
        bail!(
            "assistant sent no reply: {}",
            turn.error.unwrap_or_default()
        );
    };
    if let Some(message) = chat.messages().iter().find(|m| m.id == id) {
        println!("{}", message.content);
    }
    if let Some(error) = &turn.error {
        eprintln!("warning: {error}");
    }

    if let Some(path) = args.get_one::<PathBuf>("doc") {
        let document = DocumentState::new();
        match chat.accept(id, &document)? {
            AcceptTarget::Payload(_) => {}
            AcceptTarget::Raw(_) => eprintln!("warning: no LaTeX payload found, writing raw reply"),
        }
        tokio::fs::write(path, document.text())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return Ok(());
    };
    // Global flags are propagated down into the subcommand's matches
    let config = load_config(args)?;
    logging::init(&config.logging)?;

    match name {
        "extract" => run_extract(args),
        "compile" => run_compile(&config, args).await,
        "chat" => run_chat(&config, args).await,
        _ => Ok(()),
    }
}
