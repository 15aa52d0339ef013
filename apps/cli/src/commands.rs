//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use medsource_core::{
    Agent, AnswerOptions, AskRequest, OpenRouterClient, ProgressReporter, QuestionAnswer,
    RetrievalPath, ask,
};
use medsource_extract::Fetcher;
use medsource_shared::legend::{OUTCOME_CODES, SUSPICION_CODES, outcome_label, suspicion_label};
use medsource_shared::{
    AppConfig, SideEffectRecord, init_config, load_config, resolve_api_key, validate_api_key,
};
use medsource_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// medsource: sourced answers about medication side effects.
#[derive(Parser)]
#[command(
    name = "medsource",
    version,
    about = "Answer questions about medication side effects from FDA data and publisher pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ask a question about a medication's side effects.
    Ask(AskArgs),

    /// Fetch (or read) one page and show the side effects extracted from it.
    Extract {
        /// Page URL; also selects the extractor.
        url: String,

        /// Read HTML from this file instead of fetching the URL.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct AskArgs {
    /// The question, e.g. "What are the common side effects?"
    pub question: String,

    /// Medication name.
    #[arg(short, long)]
    pub medication: String,

    /// Extra page to fetch (repeatable).
    #[arg(long = "url")]
    pub urls: Vec<String>,

    /// Skip the drugs.com, Mayo Clinic and MedlinePlus pages.
    #[arg(long)]
    pub no_default_sources: bool,

    /// SQLite database path (overrides config).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Table holding the side-effect rows (overrides config).
    #[arg(long)]
    pub table: Option<String>,

    /// Model ID (overrides config).
    #[arg(long)]
    pub model: Option<String>,

    /// Also print the evidence: source map, rows, pages, and code legend.
    #[arg(long)]
    pub show_sources: bool,

    /// Print the full result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "medsource=info",
        1 => "medsource=debug",
        _ => "medsource=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ask(args) => cmd_ask(args).await,
        Command::Extract { url, file } => cmd_extract(&url, file.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// ask
// ---------------------------------------------------------------------------

async fn cmd_ask(args: AskArgs) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;
    let api_key = resolve_api_key(&config)?;

    for url in &args.urls {
        Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    }

    let mut options = AnswerOptions::from(&config.defaults);
    if let Some(table) = args.table {
        options.table = table;
    }

    let db_path = args
        .db
        .unwrap_or_else(|| PathBuf::from(&config.defaults.db_path));
    let storage = Storage::open(&db_path).await?;

    let mut client = OpenRouterClient::new(&config.openrouter, api_key, &options.table)?;
    if let Some(model) = args.model {
        client = client.with_model(model);
    }

    info!(
        medication = %args.medication,
        db = %db_path.display(),
        model = client.model(),
        "asking"
    );

    let fetcher = Fetcher::new(config.scrape.clone())?;
    let agent = Agent::new(storage, client.clone(), client, options);

    let request = AskRequest {
        question: args.question,
        medication: args.medication,
        extra_urls: args.urls,
        default_sources: !args.no_default_sources,
    };

    let reporter = CliProgress::new(!args.json);
    let result = ask(&agent, &fetcher, &request, &reporter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("{}", result.answer.trim());
    println!();

    if args.show_sources {
        print_sources(&result);
    }

    Ok(())
}

fn print_sources(result: &QuestionAnswer) {
    let path = match result.path {
        RetrievalPath::StructuredQuery => "generated SQL query",
        RetrievalPath::KeywordFallback => "keyword fallback",
    };
    println!("Retrieval: {path}");
    println!("Question ID: {}", result.question_id);

    println!();
    println!("Source map:");
    if result.source_map.is_empty() {
        println!("  (empty)");
    }
    for (phrase, sources) in result.source_map.iter() {
        println!("  {phrase}: {}", sources.join(", "));
    }

    println!();
    println!("Structured rows ({}):", result.rows.len());
    for row in &result.rows {
        println!("  {}", describe_row(row));
    }

    println!();
    println!("Web pages ({}):", result.documents.len());
    for doc in &result.documents {
        match doc.error() {
            Some(err) => println!("  {} (failed: {err})", doc.url()),
            None => println!("  {} ({} side effects)", doc.url(), doc.side_effects().len()),
        }
    }

    println!();
    println!("Outcome codes:");
    for (code, label) in OUTCOME_CODES {
        println!("  {code:<3} {label}");
    }
    println!("Drug suspicion codes:");
    for (code, label) in SUSPICION_CODES {
        println!("  {code:<3} {label}");
    }
    println!();
}

/// One-line row summary with FAERS codes spelled out.
fn describe_row(row: &SideEffectRecord) -> String {
    let mut line = row.side_effect().to_string();
    if let Some(outcome) = row.get("outcome") {
        match outcome_label(outcome) {
            Some(label) => line.push_str(&format!(" | outcome: {outcome} ({label})")),
            None => line.push_str(&format!(" | outcome: {outcome}")),
        }
    }
    if let Some(role) = row.get("drug_suspicion") {
        match suspicion_label(role) {
            Some(label) => line.push_str(&format!(" | suspicion: {role} ({label})")),
            None => line.push_str(&format!(" | suspicion: {role}")),
        }
    }
    if let Some(maker) = row.get("drug_manufacturer") {
        line.push_str(&format!(" | manufacturer: {maker}"));
    }
    line
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn documents_fetched(&self, fetched: usize, failed: usize) {
        if failed > 0 {
            self.spinner
                .println(format!("  fetched {fetched} page(s), {failed} failed"));
        }
    }

    fn done(&self, _answer: &QuestionAnswer) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

async fn cmd_extract(url: &str, file: Option<&Path>) -> Result<()> {
    Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let config = load_config()?;
    let fetcher = Fetcher::new(config.scrape)?;
    let extractor = fetcher.registry().detect(url).name().to_string();

    let doc = match file {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;
            fetcher.extract_html(url, &html)
        }
        None => fetcher.fetch_one(url).await,
    };

    if let Some(err) = doc.error() {
        return Err(eyre!("fetch failed: {err}"));
    }

    println!("Extractor: {extractor}");
    println!("Source:    {}", doc.source_id());
    println!("Side effects ({}):", doc.side_effects().len());
    for phrase in doc.side_effects() {
        println!("  - {phrase}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_with_repeated_urls() {
        let cli = Cli::try_parse_from([
            "medsource",
            "ask",
            "What are the common side effects?",
            "-m",
            "ondansetron",
            "--url",
            "https://a.org/1",
            "--url",
            "https://b.org/2",
            "--show-sources",
        ])
        .unwrap();

        let Command::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.medication, "ondansetron");
        assert_eq!(args.urls, vec!["https://a.org/1", "https://b.org/2"]);
        assert!(args.show_sources);
        assert!(!args.json);
        assert!(!args.no_default_sources);
    }

    #[test]
    fn ask_requires_medication() {
        assert!(Cli::try_parse_from(["medsource", "ask", "question"]).is_err());
    }

    #[test]
    fn parses_extract_with_file() {
        let cli = Cli::try_parse_from([
            "medsource",
            "extract",
            "https://www.drugs.com/sfx/x.html",
            "--file",
            "page.html",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Extract { file: Some(_), .. }));
    }

    #[test]
    fn describe_row_spells_out_codes() {
        let row = SideEffectRecord::new("ondansetron", "Headache")
            .unwrap()
            .with_column("outcome", Some("HO"))
            .with_column("drug_suspicion", Some("ps"))
            .with_column("drug_manufacturer", Some("Sandoz"));

        assert_eq!(
            describe_row(&row),
            "Headache | outcome: HO (Hospitalization - Initial or Prolonged) \
             | suspicion: ps (Primary Suspect Drug) | manufacturer: Sandoz"
        );
    }
}
