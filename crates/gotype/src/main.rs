use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use gotype::{
    diagnostic::{Severity, SourceFile},
    Config, Diagnostic, Profile,
};

#[derive(clap::Parser, Clone, Debug, PartialEq, Eq)]
struct Arguments {
    /// The Go source file to check
    path: PathBuf,

    /// Severity preset, overriding the one in the configuration file
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// JSON file with the configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one JSON object per diagnostic instead of rendering them
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let arguments = <Arguments as clap::Parser>::parse();

    match run(&arguments) {
        Ok(diagnostics) => {
            let failed = diagnostics
                .iter()
                .any(|diagnostic| diagnostic.severity == Severity::Error);
            ExitCode::from(u8::from(failed))
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
    }
}

fn run(arguments: &Arguments) -> Result<Vec<Diagnostic>, String> {
    let mut config = match &arguments.config {
        Some(path) => {
            let text = read(path)?;
            Config::from_json(&text)
                .map_err(|error| format!("invalid configuration {}: {error}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(profile) = arguments.profile {
        config.profile = profile;
    }

    let text = read(&arguments.path)?;
    let display_path = arguments.path.display().to_string();
    let source = SourceFile::new(&display_path, &text);

    let diagnostics = match gotype::check_source(&text, &config) {
        Ok(diagnostics) => diagnostics,
        Err(syntax) => {
            let mut string = String::new();
            syntax
                .write(&source, &mut string)
                .map_err(|error| error.to_string())?;
            return Err(format!("could not parse {display_path}\n{string}"));
        }
    };

    let mut out = std::io::stdout().lock();
    let result = if arguments.json {
        diagnostics.iter().try_for_each(|diagnostic| {
            serde_json::to_writer(&mut out, diagnostic)?;
            writeln!(out).map_err(serde_json::Error::io)
        })
        .map_err(|error| error.to_string())
    } else {
        let mut string = String::with_capacity(4096);
        for diagnostic in &diagnostics {
            diagnostic
                .write(&source, &mut string)
                .map_err(|error| error.to_string())?;
        }
        out.write_all(string.as_bytes()).map_err(|error| error.to_string())
    };
    result?;

    tracing::info!(count = diagnostics.len(), path = %display_path, "checked file");
    Ok(diagnostics)
}

fn read(path: &std::path::Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|error| format!("could not read {}: {error}", path.display()))
}
