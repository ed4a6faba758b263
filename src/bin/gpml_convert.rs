use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpml_convert::bridge_table::BridgeTable;
use gpml_convert::config::ConfigLoader;
use gpml_convert::domain::{PathwayTarget, Theme};
use gpml_convert::error::ConvertError;
use gpml_convert::output::{JsonOutput, LogProgress};
use gpml_convert::pipeline::{ConvertRequest, Converter, DEFAULT_SCALE, ProgressSink, ToolSet};
use gpml_convert::sparql::WikidataSparqlClient;

#[derive(Parser)]
#[command(name = "gpml-convert")]
#[command(about = "Convert WikiPathways GPML to JSON, SVG, PNG and other formats")]
#[command(version, author)]
struct Cli {
    /// Input GPML file, e.g. ./WP4542_103412.gpml
    path_in: Utf8PathBuf,

    /// Output file; its extension selects the target format
    path_out: Utf8PathBuf,

    /// WikiPathways id or IRI, e.g. WP4542
    #[arg(long)]
    pathway_id: Option<String>,

    /// WikiPathways revision, e.g. 103412
    #[arg(long)]
    pathway_version: Option<String>,

    /// Only used for PNG output
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    scale: u32,

    /// Only used for SVG output
    #[arg(long, value_enum, default_value_t = Theme::Plain)]
    theme: Theme,

    #[arg(long)]
    config: Option<String>,

    /// Print the conversion result as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ConvertError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ConvertError) -> u8 {
    match error {
        ConvertError::MalformedSvg(_) => 4,
        ConvertError::MissingInput(_)
        | ConvertError::UnsupportedInput(_)
        | ConvertError::UnsupportedExtension(_)
        | ConvertError::InvalidPathwayId(_) => 2,
        ConvertError::BridgeTableHttp(_)
        | ConvertError::BridgeTableStatus { .. }
        | ConvertError::SparqlHttp(_)
        | ConvertError::SparqlStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let target = PathwayTarget::resolve(
        cli.pathway_id.as_deref(),
        cli.path_in.as_str(),
        cli.pathway_version.as_deref(),
    )?;

    let table = BridgeTable::fetch(&settings.bridge_table_url, settings.http_timeout)?;
    let knowledge_graph =
        WikidataSparqlClient::new(&settings.sparql_endpoint, settings.http_timeout)?;
    let tools = ToolSet::from_settings(&settings);
    let converter = Converter::new(settings, &table, knowledge_graph, tools);

    let request = ConvertRequest {
        path_in: cli.path_in,
        path_out: cli.path_out,
        target,
        scale: cli.scale,
        theme: cli.theme,
    };
    let sink: &dyn ProgressSink = if cli.json { &JsonOutput } else { &LogProgress };
    let result = converter.convert(&request, sink)?;

    if cli.json {
        JsonOutput::print_convert(&result).map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    } else if result.action == "skipped" {
        println!("File {} already exists. Skipping.", result.path_out);
    } else {
        println!("Converted {} -> {}", result.path_in, result.path_out);
    }
    Ok(())
}
