pub mod candidate;
pub mod components;
pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod icons;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod theme;

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use error::{CollectionLoadError, ConfigError, PipelineError};
pub use pipeline::{BuildOutput, BuildStats, CancellationToken, Engine};

const DEFAULT_CONFIG: &str = "ironweave.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build {
        config: PathBuf,
        out: Option<PathBuf>,
        minify: bool,
    },
    Help,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Build {
            config,
            out,
            minify,
        } => run_build(config, out, minify),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut out = None;
    let mut minify = false;
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => return Ok(Command::Help),
            "-o" | "--out" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError::Usage(format!("{} requires a path", arg)))?;
                out = Some(PathBuf::from(value));
            }
            "-m" | "--minify" => minify = true,
            _ if arg.starts_with('-') => {
                return Err(CliError::Usage(format!("unknown option: {}", arg)));
            }
            _ if config.is_none() => config = Some(PathBuf::from(arg)),
            _ => return Err(CliError::Usage(format!("unexpected argument: {}", arg))),
        }
    }

    Ok(Command::Build {
        config: config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG)),
        out,
        minify,
    })
}

fn run_build(config_path: PathBuf, out: Option<PathBuf>, minify: bool) -> Result<(), CliError> {
    let mut config = config::load(&config_path)?;
    if minify {
        config.minify = true;
    }
    let out = out.or_else(|| config.output.as_ref().map(|path| config.resolve_path(path)));

    let output = Engine::new(config)?.build(&CancellationToken::new())?;
    if !output.diagnostics.is_empty() {
        tracing::info!(
            count = output.diagnostics.len(),
            "generation finished with diagnostics"
        );
    }

    match out {
        Some(path) => write_output(&path, &output.css),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.css.as_bytes())
                .map_err(|source| CliError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })
        }
    }
}

fn write_output(path: &Path, css: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, css).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = css.len(), "stylesheet written");
    Ok(())
}

fn print_help() {
    println!(
        "ironweave - utility-class stylesheet generator\n\n\
         Usage: ironweave [CONFIG] [--out PATH] [--minify]\n\n\
         CONFIG defaults to {}.\n\
         Set IRONWEAVE_LOG (e.g. ironweave=debug) to adjust logging.",
        DEFAULT_CONFIG
    );
}

#[cfg(test)]
mod tests {
    use super::{CliError, Command, parse_args, run};
    use std::fs;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn defaults_to_build_with_default_config() {
        assert_eq!(
            parse_args(Vec::new()).expect("parses"),
            Command::Build {
                config: PathBuf::from("ironweave.toml"),
                out: None,
                minify: false,
            }
        );
    }

    #[test]
    fn parses_out_and_minify() {
        assert_eq!(
            parse_args(args(&["site.toml", "--out", "public/styles.min.css", "-m"]))
                .expect("parses"),
            Command::Build {
                config: PathBuf::from("site.toml"),
                out: Some(PathBuf::from("public/styles.min.css")),
                minify: true,
            }
        );
        assert_eq!(parse_args(args(&["--help"])).expect("parses"), Command::Help);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse_args(args(&["--out"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(args(&["--watch"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(args(&["a.toml", "b.toml"])),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn build_writes_configured_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("page.templ"), r#"<p class="underline">"#).expect("write");
        fs::write(
            dir.path().join("ironweave.toml"),
            "content = [\"*.templ\"]\noutput = \"public/styles.min.css\"\npreflight = false\n",
        )
        .expect("write");

        run(Command::Build {
            config: dir.path().join("ironweave.toml"),
            out: None,
            minify: true,
        })
        .expect("build succeeds");

        let css = fs::read_to_string(dir.path().join("public/styles.min.css")).expect("output");
        assert_eq!(css, ".underline{text-decoration-line:underline}");
    }
}
