#![forbid(unsafe_code)]
//! # entity_trends CLI
//!
//! Runs the entity pipeline over a corpus of year folders and renders the
//! dashboard, one subcommand per stage.
//!
//! ## Example
//! ```bash
//! cargo run --release -- --data-dir corpus run --offline
//! cargo run --release -- dashboard --out site
//! ```
//!
//! Set `RUST_LOG=info` to follow progress. See `--help` for all options.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use entity_trends::config::{DEFAULT_BUBBLE_FROM_YEAR, DEFAULT_MAX_LENGTH, DEFAULT_TOP_N};
use entity_trends::url::overrides_from_json_file;
use entity_trends::{
    AliasTable, CommandRecognizer, DashboardOptions, EntityRecognizer, HeuristicRecognizer,
    HttpHeadCheck, LinkCheck, Offline, PipelineOptions, Result, UrlResolver, print_skipped_files,
    render_dashboard, run_combine, run_extraction, run_ranking, run_timeline, run_urls,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Corpus root holding one folder per year (e.g. data/2014/*.txt)
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for the per-year NER statistics files
    #[arg(long, global = true, default_value = "stats")]
    stats_dir: PathBuf,

    /// Directory for the CSV tables
    #[arg(long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// JSON alias table replacing the built-in one
    #[arg(long, global = true)]
    aliases: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag entities in every document and write <YYYY>_ner_statistics.txt per year
    Extract(ExtractArgs),
    /// Merge the yearly statistics into output_data.csv and top_<N>.csv
    Combine(CombineArgs),
    /// Resolve aliases and write entities_timeline.csv
    Timeline,
    /// Find the top document per entity and year, write entity_docnames.csv
    Documents(RankArgs),
    /// Resolve document names to URLs, write entity_urls.csv
    Urls(UrlArgs),
    /// Render the HTML dashboard
    Dashboard(DashboardArgs),
    /// Run extract, combine, timeline, documents and urls in order
    Run {
        #[command(flatten)]
        extract: ExtractArgs,
        #[command(flatten)]
        combine: CombineArgs,
        #[command(flatten)]
        rank: RankArgs,
        #[command(flatten)]
        urls: UrlArgs,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Skip documents whose cleaned text is longer than this many characters
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Entity labels to drop (comma separated); replaces the default set
    #[arg(long, value_delimiter = ',')]
    exclude_labels: Option<Vec<String>>,

    /// External NER command reading text on stdin and printing JSON lines
    /// ({"text": ..., "label": ...}); the built-in heuristic tagger is used otherwise
    #[arg(long)]
    ner_command: Option<String>,
}

#[derive(Args)]
struct CombineArgs {
    /// Number of entities in the combined top list
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,
}

#[derive(Args)]
struct RankArgs {
    /// First year of the document overview
    #[arg(long)]
    from_year: Option<i32>,

    /// Last year of the document overview
    #[arg(long)]
    to_year: Option<i32>,
}

#[derive(Args)]
struct UrlArgs {
    /// Do not contact the network; every derived URL counts as unavailable
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// URL template with {year} and {file} placeholders
    #[arg(long)]
    url_template: Option<String>,

    /// JSON object of extra file-name -> URL overrides
    #[arg(long)]
    url_overrides: Option<PathBuf>,
}

#[derive(Args)]
struct DashboardArgs {
    /// Timeline CSV (defaults to <output-dir>/entities_timeline.csv)
    #[arg(long)]
    timeline: Option<PathBuf>,

    /// Country,Year,Frequency table of grouped word counts
    #[arg(long)]
    word_frequencies: Option<PathBuf>,

    /// Folder with pre-rendered lda_vis_<year>.0.html pages
    #[arg(long)]
    topics_dir: Option<PathBuf>,

    /// Years offered on the topic page (comma separated)
    #[arg(long, value_delimiter = ',')]
    topic_years: Option<Vec<i32>>,

    /// latitude,longitude,country,ESG-term,link table for the map
    #[arg(long)]
    map: Option<PathBuf>,

    /// First year shown in the bubble chart
    #[arg(long, default_value_t = DEFAULT_BUBBLE_FROM_YEAR)]
    bubble_from_year: i32,

    /// Output directory of the dashboard
    #[arg(long, default_value = "dashboard")]
    out: PathBuf,

    /// Dashboard title
    #[arg(long, default_value = "ESG Dashboard")]
    title: String,
}

fn pipeline_options(cli: &Cli) -> PipelineOptions {
    PipelineOptions {
        data_dir: cli.data_dir.clone(),
        stats_dir: cli.stats_dir.clone(),
        output_dir: cli.output_dir.clone(),
        ..PipelineOptions::default()
    }
}

fn load_aliases(cli: &Cli) -> Result<AliasTable> {
    match &cli.aliases {
        Some(path) => {
            let table = AliasTable::from_json_file(path)?;
            info!("Loaded {} entities from {}", table.len(), path.display());
            Ok(table)
        }
        None => Ok(AliasTable::builtin()),
    }
}

fn extract(opts: &mut PipelineOptions, args: &ExtractArgs) -> Result<()> {
    opts.max_length = args.max_length;
    if let Some(labels) = &args.exclude_labels {
        opts.excluded_labels = labels.iter().map(|l| l.trim().to_string()).collect();
    }
    let recognizer: Box<dyn EntityRecognizer> = match &args.ner_command {
        Some(command) => Box::new(CommandRecognizer::parse(command)?),
        None => Box::new(HeuristicRecognizer),
    };

    let report = run_extraction(opts, recognizer.as_ref())?;
    for year in &report.years {
        println!(
            "{}: {} documents, {} distinct entities",
            year.year,
            year.documents,
            year.entities.len()
        );
    }
    println!(
        "All years: {} distinct entities, {} mentions",
        report.all_years.len(),
        report.all_years.total()
    );
    if !report.skipped.is_empty() {
        print_skipped_files(&report.skipped);
    }
    Ok(())
}

fn combine(opts: &mut PipelineOptions, args: &CombineArgs) -> Result<()> {
    opts.top_n = args.top;
    let summary = run_combine(opts)?;
    println!("Top {} entities:", summary.top.len());
    for (entity, frequency) in &summary.top {
        println!("{frequency:>8}  {entity}");
    }
    Ok(())
}

fn timeline(opts: &PipelineOptions, aliases: &AliasTable) -> Result<()> {
    let timeline = run_timeline(opts, aliases)?;
    for row in &timeline.rows {
        println!("{:>8}  {}", row.total(), row.entity);
    }
    Ok(())
}

fn documents(opts: &mut PipelineOptions, args: &RankArgs, aliases: &AliasTable) -> Result<()> {
    opts.from_year = args.from_year;
    opts.to_year = args.to_year;
    let (table, skipped) = run_ranking(opts, aliases)?;
    println!(
        "Document overview for {} entities over {} years written to {}",
        table.entities.len(),
        table.years.len(),
        opts.docnames_csv().display()
    );
    if !skipped.is_empty() {
        print_skipped_files(&skipped);
    }
    Ok(())
}

fn urls(opts: &PipelineOptions, args: &UrlArgs) -> Result<()> {
    let checker: Box<dyn LinkCheck> = if args.offline {
        Box::new(Offline)
    } else {
        Box::new(HttpHeadCheck::new()?)
    };
    let mut resolver = UrlResolver::new(checker);
    if let Some(template) = &args.url_template {
        resolver = resolver.with_template(template.clone());
    }
    if let Some(path) = &args.url_overrides {
        resolver = resolver.with_overrides(overrides_from_json_file(path)?);
    }
    let resolved = run_urls(opts, &mut resolver)?;
    println!(
        "Resolved {resolved} document URLs into {}",
        opts.urls_csv().display()
    );
    Ok(())
}

fn dashboard(cli: &Cli, args: &DashboardArgs, aliases: &AliasTable) -> Result<()> {
    let timeline = args
        .timeline
        .clone()
        .unwrap_or_else(|| pipeline_options(cli).timeline_csv());
    let mut opts = DashboardOptions::new(&timeline, &args.out);
    opts.word_frequencies_csv = args.word_frequencies.clone();
    opts.topics_dir = args.topics_dir.clone();
    if let Some(years) = &args.topic_years {
        opts.topic_years = years.clone();
    }
    opts.map_csv = args.map.clone();
    opts.bubble_from_year = args.bubble_from_year;
    opts.title = args.title.clone();

    let index = render_dashboard(&opts, aliases)?;
    println!("Dashboard written to {}", index.display());
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mut opts = pipeline_options(cli);
    match &cli.command {
        Commands::Extract(args) => extract(&mut opts, args),
        Commands::Combine(args) => combine(&mut opts, args),
        Commands::Timeline => timeline(&opts, &load_aliases(cli)?),
        Commands::Documents(args) => documents(&mut opts, args, &load_aliases(cli)?),
        Commands::Urls(args) => urls(&opts, args),
        Commands::Dashboard(args) => dashboard(cli, args, &load_aliases(cli)?),
        Commands::Run {
            extract: extract_args,
            combine: combine_args,
            rank,
            urls: url_args,
        } => {
            let aliases = load_aliases(cli)?;
            extract(&mut opts, extract_args)?;
            combine(&mut opts, combine_args)?;
            timeline(&opts, &aliases)?;
            documents(&mut opts, rank, &aliases)?;
            urls(&opts, url_args)
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("Error: {}", e);
        process::exit(1);
    }
}
