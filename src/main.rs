use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curlforge::config::load_config;
use curlforge::convert::{convert, count_commands, ConversionOptions, DEFAULT_FORMAT};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CURLFORGE_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "curlforge",
    version,
    about = "Convert curl commands into Postman collections and OpenAPI specs",
    disable_help_subcommand = true
)]
struct Cli {
    /// File with one or more curl commands (stdin when omitted or `-`)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Export format id (see `curlforge formats`)
    #[arg(short, long)]
    format: Option<String>,

    /// Directory to write the document and its auxiliary files into
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Rename a request, e.g. `--name 0=list_users`
    #[arg(long = "name", value_name = "IDX=NAME", value_parser = parse_request_name)]
    names: Vec<(usize, String)>,

    /// Rename a detected environment, e.g. `--env-name api_example_com=prod`
    #[arg(long = "env-name", value_name = "OLD=NEW", value_parser = parse_environment_name)]
    env_names: Vec<(String, String)>,

    /// Collection or API title
    #[arg(short, long)]
    title: Option<String>,

    /// Directory or file containing curlforge.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print counts and duplicate-name warnings to stderr
    #[arg(long)]
    summary: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available export formats
    Formats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Formats) = &cli.command {
        report::print_formats();
        return Ok(());
    }

    let base_dir = std::env::current_dir()?;
    let config_target = cli
        .config
        .as_ref()
        .map(|p| resolve_relative(&base_dir, p))
        .unwrap_or_else(|| base_dir.clone());
    let cfg = load_config(&config_target).context("loading configuration")?;

    let input = read_input(cli.input.as_deref())?;

    let mut options = ConversionOptions::new(input);
    options.format = cli
        .format
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.config.default_format.clone()))
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    options.title = cli
        .title
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.config.title.clone()));
    if let Some(loaded) = &cfg {
        options.request_names = loaded.config.request_names.clone();
        options.environment_names = loaded.config.environment_names.clone();
    }
    options.request_names.extend(cli.names.iter().cloned());
    options
        .environment_names
        .extend(cli.env_names.iter().cloned());

    let detected = count_commands(&options.input);
    let conversion = convert(&options)?;

    if cli.summary {
        report::print_summary(detected, &conversion);
    }

    let out_dir = cli
        .out
        .as_ref()
        .map(|p| resolve_relative(&base_dir, p))
        .or_else(|| cfg.as_ref().and_then(|c| c.output_dir()));

    match out_dir {
        Some(dir) => {
            let stem = output_stem(cli.input.as_deref());
            for written in report::write_outputs(&dir, &stem, &conversion.result)? {
                println!("Export written to {}", written.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&conversion.result.document)?),
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("reading input {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading input from stdin")?;
            Ok(buffer)
        }
    }
}

fn output_stem(input: Option<&Path>) -> String {
    input
        .filter(|path| *path != Path::new("-"))
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "curlforge".to_string())
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn parse_request_name(raw: &str) -> Result<(usize, String), String> {
    let (index, name) = split_pair(raw)?;
    let index = index
        .parse::<usize>()
        .map_err(|_| format!("request index must be a number, got `{index}`"))?;
    Ok((index, name.to_string()))
}

fn parse_environment_name(raw: &str) -> Result<(String, String), String> {
    let (old, new) = split_pair(raw)?;
    Ok((old.to_string(), new.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn resolve_relative_joins_when_needed() {
        let base = Path::new("/tmp/base");
        let relative = Path::new("out/exports");
        assert_eq!(resolve_relative(base, relative), base.join(relative));

        let absolute = Path::new("/var/data/exports");
        assert_eq!(resolve_relative(base, absolute), absolute);
    }

    #[test]
    fn parses_override_pairs() {
        assert_eq!(parse_request_name("2=list_users"), Ok((2, "list_users".to_string())));
        assert!(parse_request_name("x=list_users").is_err());
        assert!(parse_request_name("2=").is_err());
        assert_eq!(
            parse_environment_name("api_example_com = prod"),
            Ok(("api_example_com".to_string(), "prod".to_string()))
        );
        assert!(parse_environment_name("prod").is_err());
    }

    #[test]
    fn output_stem_follows_input_file() {
        assert_eq!(output_stem(Some(Path::new("dir/requests.sh"))), "requests");
        assert_eq!(output_stem(Some(Path::new("-"))), "curlforge");
        assert_eq!(output_stem(None), "curlforge");
    }

    #[test]
    fn write_outputs_creates_document_and_environments() -> Result<()> {
        let temp = tempdir()?;
        let conversion = convert(&ConversionOptions::new(
            "curl http://localhost:3000/a\ncurl http://localhost:3000/b",
        ))?;

        let out = temp.path().join("exports");
        let written = report::write_outputs(&out, "calls", &conversion.result)?;

        assert_eq!(
            written,
            vec![
                out.join("calls.json"),
                out.join("local.postman_environment.json"),
            ]
        );
        let document: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("calls.json"))?)?;
        assert_eq!(document["item"].as_array().map(Vec::len), Some(2));
        Ok(())
    }
}

mod report {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use colored::Colorize;

    use curlforge::convert::Conversion;
    use curlforge::export::{formats, ExportResult};

    pub fn print_formats() {
        for format in formats() {
            println!(
                "{} {} {}",
                format.id.bold(),
                format!("{} ({})", format.name, format.version).cyan(),
                format.description.dimmed()
            );
        }
    }

    pub fn print_summary(detected: usize, conversion: &Conversion) {
        let summary = &conversion.summary;
        eprintln!(
            "{} {}",
            "Detected:".bold(),
            format!("{detected} curl commands").dimmed()
        );
        eprintln!(
            "{} {}",
            "Requests:".bold(),
            summary.total_requests.to_string().green()
        );
        eprintln!("{} {}", "Hosts:".bold(), summary.total_hosts);
        eprintln!("{} {}", "Tokens:".bold(), summary.total_tokens);
        eprintln!("{} {}", "Environments:".bold(), summary.total_environments);

        for (name, indices) in &conversion.duplicates {
            let positions = indices
                .iter()
                .map(|index| (index + 1).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            eprintln!(
                "{} {} {}",
                "warning:".yellow().bold(),
                format!("duplicate name `{name}`").yellow(),
                format!("(requests {positions})").dimmed()
            );
        }
    }

    /// Writes `<stem>.<extension>` and every auxiliary file into `dir`,
    /// returning the written paths in order.
    pub fn write_outputs(dir: &Path, stem: &str, result: &ExportResult) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;

        let mut written = Vec::with_capacity(result.auxiliary_files.len() + 1);

        let main_path = dir.join(format!("{stem}.{}", result.format.extension));
        write_json(&main_path, &result.document)?;
        written.push(main_path);

        for file in &result.auxiliary_files {
            let path = dir.join(&file.name);
            write_json(&path, &file.data)?;
            written.push(path);
        }

        Ok(written)
    }

    fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
        let rendered = serde_json::to_string_pretty(value)?;
        std::fs::write(path, rendered)
            .with_context(|| format!("writing export to {}", path.display()))
    }
}
