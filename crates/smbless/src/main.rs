//! smbless - check and correct apps that install privileged helper tools.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use smbless_common::CheckError;
use smbless_inspect::{Codesign, Otool};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "smbless")]
#[command(
    author,
    version,
    about = "Check and correct apps that install privileged helper tools"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the trust contract of a built app bundle
    Check {
        /// Path to the built app bundle
        app: PathBuf,
    },

    /// Derive requirements from a built app and update the source Info.plists
    Setreq {
        /// Path to the built app bundle
        app: PathBuf,

        /// Path to the app's source Info.plist
        app_info: PathBuf,

        /// Path to each tool's source Info.plist
        #[arg(required = true)]
        tool_info: Vec<PathBuf>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        report(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let signing = Codesign::new();
    match cli.command {
        Commands::Check { app } => {
            let sections = Otool::host();
            smbless::check(&app, &signing, &sections)?;
        }
        Commands::Setreq {
            app,
            app_info,
            tool_info,
        } => {
            for path in smbless::setreq(&app, &app_info, &tool_info, &signing)? {
                println!("{}: updated", path.display());
            }
        }
    }
    Ok(())
}

/// Report a violated invariant as `<path>: <message>`, or
/// `<program>: <message>` when no single path is at fault.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CheckError>() {
        Some(check_err) => match check_err.path() {
            Some(path) => eprintln!("{}: {check_err}", reported_path(path)),
            None => eprintln!("{}: {check_err}", program_name()),
        },
        None => eprintln!("{}: {err:#}", program_name()),
    }
}

/// Path as shown to the user, with at most one trailing slash removed.
fn reported_path(path: &Path) -> String {
    let display = path.display().to_string();
    match display.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => display,
    }
}

fn program_name() -> String {
    let argv0 = std::env::args().next().unwrap_or_default();
    Path::new(&argv0)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "smbless".to_string())
}
