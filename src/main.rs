use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;

use statblock_importer::config::{ConfigSource, ImporterConfig};
use statblock_importer::core::logging;
use statblock_importer::ingestion::statblock::{
    ImportOutcome, InMemorySpellCatalog, JsonFileStore, StatBlockImporter, StatBlockInput,
};

const USAGE: &str =
    "usage: statblock-import <input.json> [--catalog spells.json] [--out DIR] [--config FILE]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliArgs {
    input: PathBuf,
    catalog: Option<PathBuf>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut input = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--catalog" => &mut parsed.catalog,
            "--out" => &mut parsed.out,
            "--config" => &mut parsed.config,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    return Err("more than one input file given".to_string());
                }
                continue;
            }
        };
        let value = iter
            .next()
            .ok_or_else(|| format!("{arg} requires a value"))?;
        *slot = Some(PathBuf::from(value));
    }

    parsed.input = input.ok_or_else(|| "missing input file".to_string())?;
    Ok(parsed)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(reason) => {
            eprintln!("{reason}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let (config, source) = match &cli.config {
        Some(path) => match ImporterConfig::from_path(path) {
            Ok(config) => (config, ConfigSource::File(path.clone())),
            Err(err) => {
                logging::print_error(&err.to_string());
                return ExitCode::from(1);
            }
        },
        None => ImporterConfig::load(),
    };
    let _log_guard = logging::init(&config.logging);
    source.log();
    log::info!("{} v{} starting", statblock_importer::NAME, statblock_importer::VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            logging::print_error(&format!("failed to start runtime: {err}"));
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::print_error(&format!("{err:#}"));
            ExitCode::from(1)
        }
    }
}

async fn run(cli: CliArgs, config: ImporterConfig) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let input = StatBlockInput::from_json(&text)
        .with_context(|| format!("parsing {}", cli.input.display()))?;

    let catalog = match cli.catalog.as_deref().or(config.spells_path()) {
        Some(path) => InMemorySpellCatalog::from_json_file(path).await?,
        None => InMemorySpellCatalog::default(),
    };

    let importer = StatBlockImporter::new(config.import.clone());

    match cli.out.as_deref().or(config.store_dir()) {
        Some(dir) => {
            let store = JsonFileStore::new(dir);
            let report = importer.import_into(&input, &catalog, &store).await?;
            report_warnings(&report.warnings);
            logging::print_success(&format!(
                "wrote {} with {} items to {}",
                report.id,
                report.item_count,
                store.dir().display()
            ));
        }
        None => {
            let ImportOutcome { payload, warnings } = importer.import(&input, &catalog).await;
            report_warnings(&warnings);
            let json = serde_json::to_string_pretty(&payload).context("serializing payload")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn report_warnings(warnings: &[statblock_importer::ingestion::statblock::ImportWarning]) {
    for warning in warnings {
        logging::print_warning(&warning.to_string());
    }
}
