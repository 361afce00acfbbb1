use clap::Parser;
use nfe_organizer::cli::{OrganizeCommand, run_with_config};
use nfe_organizer::config::OrganizerConfig;
use nfe_organizer::output::OutputFormatter;
use nfe_organizer::prompt::{PromptError, prompt_for_path};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Organize NF-e XML files into <issuer>/<year>/<month>/<day>/<Entrada|Saída>
/// directories, with events collected under Eventos.
#[derive(Parser, Debug)]
#[command(name = "nfe-organizer", version, about)]
struct Args {
    /// Directory containing the XML files (asked for when omitted)
    source: Option<PathBuf>,

    /// Directory that receives the organized files (asked for when omitted)
    destination: Option<PathBuf>,

    /// Show where each file would go without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Revert the last organization into DESTINATION
    #[arg(
        long,
        value_name = "DESTINATION",
        conflicts_with_all = ["source", "destination", "dry_run"]
    )]
    undo: Option<PathBuf>,

    /// Configuration file (defaults to .nfe-organizer.toml, then ~/.config/nfe-organizer/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    OutputFormatter::header("NF-e XML organizer");
    OutputFormatter::plain(
        "Sorts invoices by issuer, issue date and type (Entrada/Saída/Eventos).",
    );

    let config = match OrganizerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    let command = match build_command(args, &config) {
        Ok(command) => command,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match run_with_config(command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Turns arguments into a command, prompting for any missing directory.
fn build_command(args: Args, config: &OrganizerConfig) -> Result<OrganizeCommand, PromptError> {
    if let Some(destination) = args.undo {
        return Ok(OrganizeCommand::Undo { destination });
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let attempts = config.prompt.max_attempts;

    let source = match args.source {
        Some(path) => path,
        None => prompt_for_path(
            &mut input,
            &mut output,
            "Enter the directory containing the XML files: ",
            attempts,
        )?,
    };

    let destination = match args.destination {
        Some(path) => path,
        None => prompt_for_path(
            &mut input,
            &mut output,
            "Enter the directory for the organized files: ",
            attempts,
        )?,
    };

    Ok(OrganizeCommand::Organize {
        source,
        destination,
        dry_run: args.dry_run,
    })
}
