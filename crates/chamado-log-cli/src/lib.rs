//! Command-line interface for the chamado log.
//!
//! Thin shell over `chamado-log-core`: argument parsing, confirmation
//! prompts for the destructive operations and terminal rendering. All
//! date-sensitive behavior delegates to the engine with the machine's local
//! timezone.

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chamado_log_core::bucket;
use chamado_log_core::filter::{Filter, Selector, filter_tickets};
use chamado_log_core::report::{self, MonthKey};
use chamado_log_core::timestamp;
use chamado_log_core::{
    BACKUP_FILE_NAME, JsonFilePersister, NewTicket, Status, Ticket, TicketPatch, TicketStore,
};

/// Snapshot file name inside the per-user data directory.
const DATA_FILE_NAME: &str = "chamados.json";

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no ticket with id {0}")]
    UnknownId(i64),
    #[error("aborted")]
    Aborted,
    #[error(transparent)]
    Engine(#[from] chamado_log_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "chamados", version, about = "Registro pessoal de chamados")]
pub struct Cli {
    /// Snapshot file to operate on (defaults to the per-user data dir).
    #[arg(long, global = true, value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log a new chamado.
    Add {
        /// Work-order code.
        wo: String,
        /// Region code (UF).
        uf: String,
        #[arg(long, default_value = "Concluído")]
        status: Status,
        /// Mark the chamado as resolved on site (Concluído only).
        #[arg(long)]
        presencial: bool,
    },
    /// List chamados, grouped by day unless --flat is given.
    List {
        /// Category: todos, presenciais, or a status.
        #[arg(long, default_value = "todos")]
        selector: Selector,
        /// Case-insensitive substring of the WO code.
        #[arg(long, default_value = "")]
        search: String,
        /// Exact day: hoje, ontem, YYYY-MM-DD or DD/MM/YYYY.
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        flat: bool,
    },
    /// Edit fields of an existing chamado.
    Edit {
        id: i64,
        #[arg(long)]
        wo: Option<String>,
        #[arg(long)]
        uf: Option<String>,
        #[arg(long)]
        status: Option<Status>,
        /// true marks on-site, false clears the flag.
        #[arg(long)]
        presencial: Option<bool>,
        /// New timestamp (RFC 3339 or DD/MM/YYYY, HH:MM:SS).
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Delete a chamado.
    Rm {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Write the full collection as a portable JSON backup.
    Export {
        /// Output file (defaults to backup_chamados.json in the current dir).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Replace the whole collection with a backup file.
    Import {
        file: PathBuf,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Monthly statistics, optionally exported as CSV.
    Report {
        /// Month as YYYY-MM (defaults to the current month).
        month: Option<MonthKey>,
        /// Also write the month's CSV next to the current dir.
        #[arg(long)]
        csv: bool,
    },
    /// List the months that have chamados.
    Months,
}

pub fn run() -> i32 {
    init_logging();
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            if matches!(err, CliError::Aborted) { 2 } else { 1 }
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Resolve the snapshot path: explicit flag, then the per-user data dir,
/// then the current directory as a last resort.
fn data_file(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| {
        dirs::data_dir()
            .map(|dir| dir.join("chamado-log").join(DATA_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_FILE_NAME))
    })
}

fn open_store(cli_path: Option<PathBuf>) -> CliResult<TicketStore> {
    let path = data_file(cli_path);
    tracing::debug!(path = %path.display(), "opening snapshot");
    Ok(TicketStore::open(Box::new(JsonFilePersister::new(path)))?)
}

fn execute(cli: Cli) -> CliResult<()> {
    let mut store = open_store(cli.data_file)?;
    match cli.command {
        Commands::Add {
            wo,
            uf,
            status,
            presencial,
        } => handle_add(&mut store, wo, uf, status, presencial),
        Commands::List {
            selector,
            search,
            day,
            flat,
        } => handle_list(&store, selector, search, day.as_deref(), flat),
        Commands::Edit {
            id,
            wo,
            uf,
            status,
            presencial,
            timestamp,
        } => handle_edit(&mut store, id, TicketPatch { wo, uf, status, presencial, timestamp }),
        Commands::Rm { id, force } => handle_rm(&mut store, id, force),
        Commands::Export { out } => handle_export(&store, out),
        Commands::Import { file, force } => handle_import(&mut store, &file, force),
        Commands::Report { month, csv } => handle_report(&store, month, csv),
        Commands::Months => handle_months(&store),
    }
}

// =============================================================================
// Command handlers
// =============================================================================

fn handle_add(
    store: &mut TicketStore,
    wo: String,
    uf: String,
    status: Status,
    presencial: bool,
) -> CliResult<()> {
    let draft = NewTicket {
        wo,
        uf,
        status,
        presencial,
    };
    let ticket = store.add(&draft, Utc::now())?;
    println!("registrado: {}", render_ticket(ticket));

    let tz = Local;
    let today = Local::now().date_naive();
    println!("hoje: {} chamado(s)", store.count_on_day(today, &tz));
    Ok(())
}

fn handle_list(
    store: &TicketStore,
    selector: Selector,
    search: String,
    day: Option<&str>,
    flat: bool,
) -> CliResult<()> {
    let tz = Local;
    let today = Local::now().date_naive();
    let day = day.map(|raw| parse_day(raw, today)).transpose()?;
    let filter = Filter {
        selector,
        search,
        day,
    };
    let hits = filter_tickets(store.tickets(), &filter, &tz);
    if hits.is_empty() {
        println!("nenhum chamado encontrado");
        return Ok(());
    }

    if flat {
        for ticket in &hits {
            println!("{}", render_ticket(ticket));
        }
    } else {
        let owned: Vec<Ticket> = hits.iter().map(|t| (*t).clone()).collect();
        for year in bucket::bucket_by_day(&owned, &tz) {
            for month in &year.months {
                println!("== {} {} ==", month.title(), year.year);
                for bucket_day in &month.days {
                    println!(
                        "  {} ({})",
                        bucket::day_label_with_year(bucket_day.date, today),
                        bucket_day.tickets.len()
                    );
                    for ticket in &bucket_day.tickets {
                        println!("    {}", render_ticket(ticket));
                    }
                }
            }
        }
    }
    println!("total: {}", hits.len());
    Ok(())
}

fn handle_edit(store: &mut TicketStore, id: i64, patch: TicketPatch) -> CliResult<()> {
    if !store.edit(id, patch)? {
        return Err(CliError::UnknownId(id));
    }
    if let Some(ticket) = store.get(id) {
        println!("atualizado: {}", render_ticket(ticket));
    }
    Ok(())
}

fn handle_rm(store: &mut TicketStore, id: i64, force: bool) -> CliResult<()> {
    let Some(ticket) = store.get(id) else {
        return Err(CliError::UnknownId(id));
    };
    if !force {
        let prompt = format!("apagar o chamado {}?", ticket.wo);
        if !confirm(&prompt)? {
            return Err(CliError::Aborted);
        }
    }
    store.delete(id)?;
    println!("apagado: {id}");
    Ok(())
}

fn handle_export(store: &TicketStore, out: Option<PathBuf>) -> CliResult<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(BACKUP_FILE_NAME));
    fs::write(&path, store.export_json()?)?;
    println!("backup gravado em {}", path.display());
    Ok(())
}

fn handle_import(store: &mut TicketStore, file: &Path, force: bool) -> CliResult<()> {
    let payload = fs::read_to_string(file)?;
    if !force && !store.is_empty() {
        let prompt = format!(
            "substituir os {} chamado(s) atuais pelo conteúdo de {}?",
            store.len(),
            file.display()
        );
        if !confirm(&prompt)? {
            return Err(CliError::Aborted);
        }
    }
    let outcome = store.import_json(&payload)?;
    println!(
        "importados: {} (ignorados: {})",
        outcome.imported, outcome.skipped
    );
    Ok(())
}

fn handle_report(store: &TicketStore, month: Option<MonthKey>, csv: bool) -> CliResult<()> {
    let tz = Local;
    let key = month.unwrap_or_else(|| MonthKey::of(Local::now().date_naive()));
    let Some(stats) = report::monthly_report(store.tickets(), key, &tz) else {
        println!("sem chamados em {key}");
        return Ok(());
    };

    println!("relatório de {key}");
    println!("  total:       {}", stats.total);
    println!("  concluídos:  {}", stats.completed);
    println!("  presenciais: {}", stats.presencial);
    println!("  remotos:     {}", stats.remote);
    println!("  média/dia:   {:.2}", stats.average_per_day);

    if csv {
        // The report above proved the month is non-empty.
        if let Some(body) = report::monthly_csv(store.tickets(), key, &tz) {
            let path = PathBuf::from(report::csv_file_name(key));
            fs::write(&path, body)?;
            println!("csv gravado em {}", path.display());
        }
    }
    Ok(())
}

fn handle_months(store: &TicketStore) -> CliResult<()> {
    let months = report::available_months(store.tickets(), &Local);
    if months.is_empty() {
        println!("nenhum chamado registrado");
        return Ok(());
    }
    for key in months {
        println!("{key}");
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// One-line rendering used by every listing.
fn render_ticket(ticket: &Ticket) -> String {
    let when = ticket
        .parsed_timestamp_in(&Local)
        .map_or_else(|| "data inválida".to_string(), |i| timestamp::to_locale(&i, &Local));
    let presencial = if ticket.presencial() {
        " [presencial]"
    } else {
        ""
    };
    format!(
        "#{} {} {} {}{} ({})",
        ticket.id, ticket.wo, ticket.uf, ticket.status, presencial, when
    )
}

/// Parse the --day argument: relative keywords plus the two date shapes
/// users actually type.
fn parse_day(raw: &str, today: NaiveDate) -> CliResult<NaiveDate> {
    let raw = raw.trim();
    match raw.to_lowercase().as_str() {
        "hoje" => return Ok(today),
        "ontem" => {
            return today
                .pred_opt()
                .ok_or_else(|| CliError::InvalidArgument("ontem".into()));
        }
        _ => {}
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| {
            CliError::InvalidArgument(format!(
                "invalid day '{raw}' (expected hoje, ontem, YYYY-MM-DD or DD/MM/YYYY)"
            ))
        })
}

/// Ask for confirmation on stdin. Accepts the pt-BR and en affirmatives.
fn confirm(prompt: &str) -> CliResult<bool> {
    print!("{prompt} [s/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_add_with_defaults() {
        let cli = Cli::try_parse_from(["chamados", "add", "wo-1", "sp"]).unwrap();
        match cli.command {
            Commands::Add {
                wo,
                uf,
                status,
                presencial,
            } => {
                assert_eq!(wo, "wo-1");
                assert_eq!(uf, "sp");
                assert_eq!(status, Status::Concluido);
                assert!(!presencial);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_accent_free_status() {
        let cli = Cli::try_parse_from([
            "chamados", "add", "wo-1", "sp", "--status", "diagnostico",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { status, .. } => assert_eq!(status, Status::Diagnostico),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_list_selector_and_day() {
        let cli = Cli::try_parse_from([
            "chamados", "list", "--selector", "presenciais", "--day", "hoje",
        ])
        .unwrap();
        match cli.command {
            Commands::List { selector, day, .. } => {
                assert_eq!(selector, Selector::Presencial);
                assert_eq!(day.as_deref(), Some("hoje"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_report_month() {
        let cli = Cli::try_parse_from(["chamados", "report", "2024-03", "--csv"]).unwrap();
        match cli.command {
            Commands::Report { month, csv } => {
                assert_eq!(month, Some("2024-03".parse().unwrap()));
                assert!(csv);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_bad_selector() {
        assert!(Cli::try_parse_from(["chamados", "list", "--selector", "done"]).is_err());
    }

    #[test]
    fn parse_day_handles_keywords_and_formats() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        assert_eq!(parse_day("hoje", today).unwrap(), today);
        assert_eq!(
            parse_day("Ontem", today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(
            parse_day("2024-01-02", today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(
            parse_day("02/01/2024", today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!(parse_day("amanhã", today).is_err());
    }

    #[test]
    fn data_file_prefers_the_explicit_flag() {
        let explicit = PathBuf::from("/tmp/custom.json");
        assert_eq!(data_file(Some(explicit.clone())), explicit);
        assert!(data_file(None).ends_with(DATA_FILE_NAME));
    }

    #[test]
    fn add_and_rm_round_trip_through_a_temp_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chamados.json");

        let mut store = open_store(Some(path.clone())).unwrap();
        handle_add(&mut store, "wo9".into(), "mg".into(), Status::Concluido, true).unwrap();
        let id = store.tickets()[0].id;
        handle_rm(&mut store, id, true).unwrap();

        let reopened = open_store(Some(path)).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn rm_of_unknown_id_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = open_store(Some(dir.path().join("chamados.json"))).unwrap();
        assert!(matches!(
            handle_rm(&mut store, 7, true),
            Err(CliError::UnknownId(7))
        ));
    }
}
