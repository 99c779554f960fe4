use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use radfilter::config::Config;
use radfilter::core::column::Column;
use radfilter::core::relative_date::RelativeDate;
use radfilter::core::{query_string_to_filters, FilterGroup};
use radfilter::editor::FilterBuilder;
use radfilter::services::{
    radius_user_columns, DashboardClient, HttpSuggestionSource, SuggestionSource, WidgetConfig,
};
use radfilter::tui::{self, App, Exit, FilterBuilderDialog, Theme};

/// Nested AND/OR filter builder for RADIUS billing dashboards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum, global = true)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the query string of a filter file (json or yaml)
    Render { file: PathBuf },
    /// Parse a query string and print the filter tree as JSON
    Parse {
        query: String,
        /// JSON array of column definitions; defaults to the RADIUS user columns
        #[arg(long, value_name = "FILE")]
        columns: Option<PathBuf>,
    },
    /// Print the number of active conditions of a filter file
    Count { file: PathBuf },
    /// Print the rows of a JSON array that match a filter
    Eval {
        filter: PathBuf,
        rows: PathBuf,
        #[arg(long, value_name = "FILE")]
        columns: Option<PathBuf>,
    },
    /// List relative date tokens and what they resolve to right now
    Tokens,
    /// Send a widget's aggregate request to the dashboard API
    Query { widget: PathBuf },
    /// Open the terminal filter editor
    Edit {
        /// Filter to start from
        #[arg(long, value_name = "FILE")]
        filter: Option<PathBuf>,
        /// Where Save and Apply write the filter
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Color theme: dark or light
        #[arg(long, default_value = "dark")]
        theme: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() -> Result<()> {
    radfilter::errors::init()?;
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let log_path = cwd.join(radfilter::logging::LOG_FILE.as_str());
    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn) => Some(tracing::Level::WARN),
        Some(LogLevel::Info) => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => Some(tracing::Level::WARN),
    };
    radfilter::logging::init_with(Some(log_path), level)?;

    let config = match Config::from_path(args.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Falling back to built-in config: {e}");
            Config::defaults()?
        }
    };

    match args.command {
        Command::Render { file } => {
            let group = FilterGroup::load_from_file(&file)?;
            println!("{}", radfilter::filters_to_query_string(&group));
        }
        Command::Parse { query, columns } => {
            let columns = load_columns(columns.as_deref())?;
            match query_string_to_filters(&query, &columns)? {
                Some(group) => println!("{}", serde_json::to_string_pretty(&group)?),
                None => println!("null"),
            }
        }
        Command::Count { file } => {
            let group = FilterGroup::load_from_file(&file)?;
            println!("{}", group.active_filter_count());
        }
        Command::Eval {
            filter,
            rows,
            columns,
        } => {
            let group = FilterGroup::load_from_file(&filter)?;
            let columns = load_columns(columns.as_deref())?;
            let raw = fs::read_to_string(&rows)
                .wrap_err_with(|| format!("reading {}", rows.display()))?;
            let rows: Vec<Value> = serde_json::from_str(&raw)?;
            let now = chrono::Local::now().naive_local();
            let matching: Vec<&Value> = rows
                .iter()
                .filter(|row| group.matches(row, &columns, now))
                .collect();
            info!("{} of {} rows match", matching.len(), rows.len());
            println!("{}", serde_json::to_string_pretty(&matching)?);
        }
        Command::Tokens => {
            let now = chrono::Local::now().naive_local();
            for token in RelativeDate::all() {
                println!(
                    "{:<16} {:<16} {}",
                    token.to_string(),
                    token.label(),
                    token.resolve(now).format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Query { widget } => {
            let raw = fs::read_to_string(&widget)
                .wrap_err_with(|| format!("reading {}", widget.display()))?;
            let widget: WidgetConfig = serde_json::from_str(&raw)?;
            let client = DashboardClient::new(config.api.clone())?;
            let runtime = tokio::runtime::Runtime::new()?;
            let points = runtime.block_on(client.radius_data(&widget.request()))?;
            println!("{}", widget.title);
            for point in points {
                println!("{}\t{}", point.label, point.value);
            }
        }
        Command::Edit {
            filter,
            output,
            theme,
        } => edit(config, filter, output, &theme)?,
    }
    Ok(())
}

fn load_columns(path: Option<&Path>) -> Result<Vec<Column>> {
    let Some(path) = path else {
        return Ok(radius_user_columns());
    };
    let raw = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let columns: Vec<Column> = serde_json::from_str(&raw)?;
    if columns.is_empty() {
        return Err(eyre!("{} defines no columns", path.display()));
    }
    Ok(columns)
}

fn edit(
    config: Config,
    filter: Option<PathBuf>,
    output: Option<PathBuf>,
    theme: &str,
) -> Result<()> {
    let initial = filter
        .as_deref()
        .map(FilterGroup::load_from_file)
        .transpose()?;

    // suggestion fetches are spawned on this runtime from the UI thread
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let client = Arc::new(DashboardClient::new(config.api.clone())?);
    let source: Arc<dyn SuggestionSource> = Arc::new(HttpSuggestionSource::new(client));

    let mut builder = FilterBuilder::new(radius_user_columns(), initial, config.builder.clone())
        .with_on_change(|group| debug!("Filter changed: {} conditions", group.active_filter_count()));
    builder.open();

    let theme = Theme::named(theme);
    let mut dialog = FilterBuilderDialog::new(builder, config.clone())
        .with_theme(theme)
        .with_suggestion_source(source);
    if let Some(path) = output.clone() {
        dialog = dialog.with_save_path(path);
    }
    let mut app = App::new(dialog, config);

    let mut terminal = tui::init()?;
    let res = tui::run(&mut terminal, &mut app);
    tui::restore()?;
    res?;

    match app.into_exit() {
        Exit::Applied(group) => {
            if let Some(path) = output {
                group.save_to_file(&path)?;
                info!("Applied filter written to {}", path.display());
            }
            println!("{}", radfilter::filters_to_query_string(&group));
        }
        Exit::Discarded => info!("Editor closed without applying"),
    }
    Ok(())
}
