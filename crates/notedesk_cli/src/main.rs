//! Command-line front end for the NoteDesk core.
//!
//! # Responsibility
//! - Verify `notedesk_core` linkage and schema bootstrap from a terminal.
//! - Drive the document routes against a local database for manual checks.

use clap::{Parser, Subcommand};
use log::info;
use notedesk_core::api::documents;
use notedesk_core::db::migrations::schema_version;
use notedesk_core::{
    init_logging, open_db, open_db_in_memory, util, CoreConfig, DataAccess, NewUser, SqliteStore,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notedesk", version, about = "NoteDesk core command-line tool")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database file (default: in-memory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON config file for cache, timing and log level
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print ping, crate version and schema version (default)
    Info,
    /// Register an account for an identity-provider subject id
    AddUser {
        #[arg(long)]
        clerk_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Create a root document through the POST route
    NewDocument {
        #[arg(long)]
        clerk_id: String,
        #[arg(long)]
        title: String,
    },
    /// List a user's root documents, then print timing metrics
    Documents {
        #[arg(long)]
        clerk_id: String,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => CoreConfig::from_path(path)?,
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = &cli.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok persistent_db={}",
        cli.db.is_some()
    );

    let conn = match &cli.db {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let data = DataAccess::from_config(SqliteStore::try_new(&conn)?, &config);

    match cli.command.unwrap_or(Command::Info) {
        Command::Info => {
            println!("notedesk_core ping={}", notedesk_core::ping());
            println!("notedesk_core version={}", notedesk_core::core_version());
            println!("schema_version={}", schema_version(&conn)?);
        }
        Command::AddUser {
            clerk_id,
            email,
            first_name,
            last_name,
        } => {
            let mut new_user = NewUser::new(clerk_id, email);
            new_user.first_name = first_name;
            new_user.last_name = last_name;
            let user = data.create_user(&new_user)?;
            println!(
                "{} {} ({})",
                user.id,
                util::get_initials(
                    user.first_name.as_deref().unwrap_or_default(),
                    user.last_name.as_deref().unwrap_or_default()
                ),
                user.email
            );
        }
        Command::NewDocument { clerk_id, title } => {
            let body = serde_json::json!({ "title": title }).to_string();
            let response = documents::create_document(&data, Some(clerk_id.as_str()), &body);
            println!("{} {}", response.status, response.body);
            if !response.is_success() {
                return Err(format!("request failed with status {}", response.status).into());
            }
        }
        Command::Documents { clerk_id } => {
            let user = data
                .get_user_by_clerk_id(&clerk_id)?
                .ok_or_else(|| format!("no user for clerk id `{clerk_id}`"))?;
            for document in data.get_documents_by_user_id(user.id)? {
                let created = util::format_epoch_ms(document.created_at).unwrap_or_default();
                println!("{}  {}  {}", document.id, created, document.title);
            }
            println!("{}", serde_json::to_string_pretty(&data.monitor().metrics())?);
        }
    }
    Ok(())
}
