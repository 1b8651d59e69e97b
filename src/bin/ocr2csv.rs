use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ocr_table_grid::{
    AnchorOptions, ColumnOptions, ColumnPosition, DetectOptions, ExtractOptions, ExtractionReport,
    GridOptions, PageSelection, RegionSpec, RowLabelOptions, RowOptions, SegmentOptions, Strategy,
    detect_json_tables, extract_json_to_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "ocr2csv",
    version,
    about = "Rebuild tables from OCR fragments and export them as CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect table regions and write them back into the OCR JSON.
    Detect(DetectArgs),
    /// Extract tables and write merged CSV output.
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
struct Tolerances {
    /// Maximum vertical distance between fragments of one row.
    #[arg(long, default_value_t = RowOptions::default().y_tolerance)]
    y_tolerance: f64,

    /// Maximum vertical gap between consecutive rows of one table.
    #[arg(long, default_value_t = SegmentOptions::default().row_gap_tolerance)]
    row_gap: f64,

    /// Maximum horizontal distance for fragments to count as aligned.
    #[arg(long, default_value_t = SegmentOptions::default().column_alignment_tolerance)]
    alignment: f64,

    /// Minimum rows for a region to be reported.
    #[arg(long, default_value_t = SegmentOptions::default().min_rows)]
    min_rows: usize,

    /// Margin added around each detected region.
    #[arg(long, default_value_t = SegmentOptions::default().padding)]
    padding: f64,
}

impl Tolerances {
    fn detect_options(&self) -> DetectOptions {
        let mut options = DetectOptions::default();
        options.rows.y_tolerance = self.y_tolerance;
        options.segment.row_gap_tolerance = self.row_gap;
        options.segment.column_alignment_tolerance = self.alignment;
        options.segment.min_rows = self.min_rows;
        options.segment.padding = self.padding;
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PositionKind {
    Left,
    Center,
}

#[derive(Debug, Args)]
struct GridArgs {
    /// Maximum vertical distance between fragments of one grid row.
    #[arg(long, default_value_t = GridOptions::default().rows.y_tolerance)]
    cell_y_tolerance: f64,

    /// Positions closer than this to the previous column boundary share its column.
    #[arg(long, default_value_t = ColumnOptions::default().column_cluster_tolerance)]
    column_tolerance: f64,

    /// Fragment coordinate used to place it in a column.
    #[arg(long, value_enum, default_value_t = PositionKind::Left)]
    column_position: PositionKind,
}

impl GridArgs {
    fn column_options(&self) -> ColumnOptions {
        ColumnOptions {
            column_cluster_tolerance: self.column_tolerance,
            position: match self.column_position {
                PositionKind::Left => ColumnPosition::LeftEdge,
                PositionKind::Center => ColumnPosition::Center,
            },
        }
    }

    fn grid_options(&self) -> GridOptions {
        let mut options = GridOptions::default();
        options.rows.y_tolerance = self.cell_y_tolerance;
        options.columns = self.column_options();
        options
    }
}

#[derive(Debug, Args)]
struct FormArgs {
    /// Regex for column identifiers (anchor strategy).
    #[arg(long)]
    column_pattern: Option<String>,

    /// Row label keyword (anchor strategy). Repeatable; replaces the defaults.
    #[arg(long = "row-keyword")]
    row_keywords: Vec<String>,

    /// Row labels must extend past this x (anchor strategy).
    #[arg(long, default_value_t = AnchorOptions::default().label_x_threshold)]
    label_x: f64,

    /// Column identifiers must be centered below this y (anchor strategy).
    #[arg(long, default_value_t = AnchorOptions::default().column_anchor_min_y)]
    anchor_min_y: f64,

    /// Space kept above the first row label (anchor strategy).
    #[arg(long, default_value_t = AnchorOptions::default().vertical_buffer)]
    vertical_buffer: f64,

    /// Half-width of the outermost identifier columns (anchor strategy).
    #[arg(long, default_value_t = AnchorOptions::default().column_margin)]
    column_margin: f64,

    /// Row headers must extend past this x (row-labels strategy).
    #[arg(long, default_value_t = RowLabelOptions::default().header_x_threshold)]
    header_x: f64,

    /// Row headers need more characters than this (row-labels strategy).
    #[arg(long, default_value_t = RowLabelOptions::default().min_header_chars)]
    min_header_chars: usize,
}

#[derive(Debug, Args)]
struct DetectArgs {
    /// Input OCR JSON path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON path.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    tolerances: Tolerances,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    /// Row clustering and column detection.
    Geometric,
    /// Identifier-headed columns with right-aligned row labels.
    Anchor,
    /// Right-aligned row headers with detected columns.
    RowLabels,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input OCR JSON path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = StrategyKind::Geometric)]
    strategy: StrategyKind,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Known table region in format page:x1,y1,x2,y2. Repeatable.
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Shrink each --region to the text inside it before extraction.
    #[arg(long)]
    refine: bool,

    #[command(flatten)]
    form: FormArgs,

    #[command(flatten)]
    tolerances: Tolerances,

    #[command(flatten)]
    grid: GridArgs,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Drop page column from output CSV.
    #[arg(long = "nopage")]
    no_page: bool,

    /// Drop table_id column from output CSV.
    #[arg(long = "notable")]
    no_table: bool,

    /// Omit the CSV header line.
    #[arg(long)]
    no_header: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_strategy(args: &ExtractArgs) -> Strategy {
    let form = &args.form;
    match args.strategy {
        StrategyKind::Geometric => Strategy::Geometric,
        StrategyKind::Anchor => {
            let mut anchor = AnchorOptions {
                label_x_threshold: form.label_x,
                column_anchor_min_y: form.anchor_min_y,
                vertical_buffer: form.vertical_buffer,
                column_margin: form.column_margin,
                ..AnchorOptions::default()
            };
            if let Some(pattern) = &form.column_pattern {
                anchor.column_pattern.clone_from(pattern);
            }
            if !form.row_keywords.is_empty() {
                anchor.row_keywords.clone_from(&form.row_keywords);
            }
            Strategy::AnchorBased(anchor)
        }
        StrategyKind::RowLabels => Strategy::RowLabelled(RowLabelOptions {
            header_x_threshold: form.header_x,
            min_header_chars: form.min_header_chars,
            columns: args.grid.column_options(),
            ..RowLabelOptions::default()
        }),
    }
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let regions = args
        .regions
        .iter()
        .map(|value| {
            RegionSpec::from_str(value)
                .map_err(|error| anyhow!("invalid table region: {error}"))
                .with_context(|| format!("failed to parse --region '{value}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    Ok(ExtractOptions {
        pages,
        strategy: parse_strategy(args),
        detect: args.tolerances.detect_options(),
        grid: args.grid.grid_options(),
        regions,
        refine_regions: args.refine,
        delimiter: args.delimiter as u8,
        no_page: args.no_page,
        no_table: args.no_table,
        no_header: args.no_header,
        ..ExtractOptions::default()
    })
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} page={:?} region={:?}: {}",
                warning.code, warning.page, warning.region, warning.message
            );
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<ExtractionReport> {
    let options = parse_options(args)?;
    extract_json_to_csv(&args.input, &args.output, &options)
        .with_context(|| format!("failed to extract tables from '{}'", args.input.display()))
}

fn run_detect(args: &DetectArgs) -> Result<usize> {
    detect_json_tables(
        &args.input,
        &args.output,
        &args.tolerances.detect_options(),
    )
    .with_context(|| format!("failed to detect tables in '{}'", args.input.display()))
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ocr_table_grid=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => match run_detect(&args) {
            Ok(0) => ExitCode::from(2),
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Extract(args) => match run_extract(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.row_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
