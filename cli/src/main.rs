use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use sqlite_cursor::{CellValue, Database, DatabaseConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status of `has-table` when the table is absent.
const EXIT_NOT_FOUND: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sqlcursor")]
#[command(about = "Query SQLite databases through typed cursors")]
#[command(version = PACKAGE_VERSION)]
struct Cli {
    /// YAML file with connection settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single SQL statement and print its rows.
    Query(QueryArgs),
    /// List the tables in a database.
    Tables(TablesArgs),
    /// Exit 0 if a table exists, 2 if it does not.
    HasTable(HasTableArgs),
    /// Run a batch of semicolon-separated statements.
    Exec(ExecArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// SQL statement to run.
    sql: String,
    /// Positional parameter value, bound in order starting at ?1.
    /// Integers, floats, and the keyword NULL are recognised; anything else
    /// binds as text.
    #[arg(long = "param", value_name = "VALUE", allow_hyphen_values = true)]
    params: Vec<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Table)]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct TablesArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
}

#[derive(Debug, Args)]
struct HasTableArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table name.
    name: String,
}

#[derive(Debug, Args)]
struct ExecArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// SQL batch to run.
    sql: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Query(args) => run_query(args, &config).map(|()| 0),
        Command::Tables(args) => run_tables(args, &config).map(|()| 0),
        Command::HasTable(args) => {
            run_has_table(args, &config).map(|found| if found { 0 } else { EXIT_NOT_FOUND })
        }
        Command::Exec(args) => run_exec(args, &config).map(|()| 0),
    });

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<DatabaseConfig, String> {
    match path {
        Some(path) => DatabaseConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(DatabaseConfig::default()),
    }
}

fn open_database(path: &Path, config: &DatabaseConfig) -> Result<Database, String> {
    Database::open_with_config(path, config)
        .map_err(|e| format!("Failed to open database '{}': {e}", path.display()))
}

// ---------------------------------------------------------------------------
// query command
// ---------------------------------------------------------------------------

fn run_query(args: QueryArgs, config: &DatabaseConfig) -> Result<(), String> {
    let db = open_database(&args.db, config)?;
    let params: Vec<CellValue<'static>> = args.params.iter().map(|raw| parse_param(raw)).collect();
    debug!(params = params.len(), "running query");

    let statement = db
        .prepare_with(&args.sql, &params)
        .map_err(|e| format!("Failed to prepare query: {e}"))?;
    let columns = (0..statement.column_count())
        .map(|column| statement.column_name(column))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to read column names: {e}"))?;

    let mut rows = Vec::new();
    for row in db
        .exec_statement(statement)
        .map_err(|e| format!("Query failed: {e}"))?
    {
        let row = row.map_err(|e| format!("Query failed: {e}"))?;
        rows.push(row.into_columns().into_iter().map(|cell| cell.value).collect::<Vec<_>>());
    }

    match args.format {
        CliOutputFormat::Table => print!("{}", format_table(&columns, &rows)),
        CliOutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(&format_json(&columns, &rows))
                .map_err(|e| format!("Failed to serialize rows: {e}"))?;
            println!("{rendered}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tables / has-table / exec commands
// ---------------------------------------------------------------------------

fn run_tables(args: TablesArgs, config: &DatabaseConfig) -> Result<(), String> {
    let db = open_database(&args.db, config)?;
    let tables = db
        .tables()
        .map_err(|e| format!("Failed to list tables: {e}"))?;
    for table in tables {
        println!("{table}");
    }
    Ok(())
}

fn run_has_table(args: HasTableArgs, config: &DatabaseConfig) -> Result<bool, String> {
    let db = open_database(&args.db, config)?;
    let found = db
        .has_table(&args.name)
        .map_err(|e| format!("Failed to look up table '{}': {e}", args.name))?;
    if found {
        println!("Table '{}' exists.", args.name);
    } else {
        println!("Table '{}' not found.", args.name);
    }
    Ok(found)
}

fn run_exec(args: ExecArgs, config: &DatabaseConfig) -> Result<(), String> {
    let db = open_database(&args.db, config)?;
    db.execute_batch(&args.sql)
        .map_err(|e| format!("Batch failed: {e}"))?;
    println!("Batch executed against '{}'.", args.db.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Interprets a `--param` value: integer, then finite float, then `NULL`,
/// otherwise text.
fn parse_param(raw: &str) -> CellValue<'static> {
    if let Ok(value) = raw.parse::<i64>() {
        return CellValue::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        if value.is_finite() {
            return CellValue::Float(value);
        }
    }
    if raw == "NULL" {
        return CellValue::Null;
    }
    CellValue::from(raw.to_string())
}

fn render_cell(value: &CellValue<'_>) -> String {
    if value.is_null() {
        "NULL".to_string()
    } else {
        value.to_string()
    }
}

/// Tab-separated header line followed by one line per row.
fn format_table(columns: &[String], rows: &[Vec<CellValue<'static>>]) -> String {
    let mut out = columns.join("\t");
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

fn cell_to_json(value: &CellValue<'_>) -> Value {
    match value {
        CellValue::Float(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        CellValue::Integer(v) => json!(v),
        CellValue::Text(v) => json!(v),
        // Hex, matching the table rendering.
        CellValue::Blob(_) => json!(value.to_string()),
        CellValue::Null => Value::Null,
    }
}

fn format_json(columns: &[String], rows: &[Vec<CellValue<'static>>]) -> Value {
    let rows: Vec<Value> = rows
        .iter()
        .map(|row| Value::Array(row.iter().map(cell_to_json).collect()))
        .collect();
    json!({ "columns": columns, "rows": rows })
}
