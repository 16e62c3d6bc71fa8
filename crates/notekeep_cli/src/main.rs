//! notekeep: command-line front end for the note store.
//!
//! # Responsibility
//! - Resolve configuration, open storage, and load the store once per run.
//! - Translate subcommands into store operations and print plain-text views.

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use notekeep_core::db::open_db;
use notekeep_core::view::{category_heading, category_rows, render_cards, NoteCard, ViewMode};
use notekeep_core::{
    init_logging, CategoryFilter, JsonFileSeed, KeyValueStore, Note, NoteId, NoteStore,
    NoteStoreError, NotekeepConfig, SqliteKeyValueStore, ViewState,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notekeep")]
#[command(version, about = "Categorized short notes stored locally")]
struct Cli {
    /// SQLite database file (overrides NOTEKEEP_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON seed used when nothing was stored yet (overrides NOTEKEEP_SEED_PATH)
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides NOTEKEEP_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for log files (overrides NOTEKEEP_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes, newest first
    List {
        /// `all` or one of Work|Personal|Ideas|Important
        #[arg(short, long, default_value = "all")]
        category: String,

        #[arg(long, value_enum, default_value_t = ViewArg::Grid)]
        view: ViewArg,
    },

    /// Show one note in full
    Show { id: NoteId },

    /// Create a note
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        category: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Edit a note; omitted fields keep their current value
    Edit {
        id: NoteId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a note
    Delete { id: NoteId },

    /// Show note counts per category
    Counts,

    /// Check whether a title is already used in a category
    Check {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        category: String,

        /// Note being edited, ignored by the check
        #[arg(long)]
        exclude: Option<NoteId>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Grid,
    List,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Grid => ViewMode::Grid,
            ViewArg::List => ViewMode::List,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli);
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let mut store = open_store(&config)?;
    let mut state = ViewState::new();

    match cli.command {
        Commands::List { category, view } => {
            state.select(category.parse::<CategoryFilter>()?);
            state.set_mode(view.into());
            cmd_list(&store, &state);
        }
        Commands::Show { id } => {
            let note = find_note(&store, id)?;
            print_note(note, store.is_flagged(note));
        }
        Commands::Add {
            title,
            category,
            description,
        } => {
            let note = store.create(&title, &category, &description)?;
            println!("Created note {}", note.id);
        }
        Commands::Edit {
            id,
            title,
            category,
            description,
        } => {
            state.begin_edit(id);
            let current = find_note(&store, id)?.clone();
            let title = title.unwrap_or(current.title);
            let category = category.unwrap_or_else(|| current.category.to_string());
            let description = description.unwrap_or(current.description);
            let note = store.update(id, &title, &category, &description)?;
            state.finish_edit();
            println!("Updated note {}", note.id);
        }
        Commands::Delete { id } => {
            store.delete(id)?;
            println!("Deleted note {id}");
        }
        Commands::Counts => {
            for (filter, count) in category_rows(&store) {
                println!("{:<10} {count}", category_heading(filter));
            }
        }
        Commands::Check {
            title,
            category,
            exclude,
        } => {
            if let Some(id) = exclude {
                state.begin_edit(id);
            }
            match state.title_conflict(&store, &title, &category) {
                Some(message) => return Err(message.into()),
                None => println!("Title is available"),
            }
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> NotekeepConfig {
    let mut config = NotekeepConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(seed) = &cli.seed {
        config.seed_path = Some(seed.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config
}

fn open_store(config: &NotekeepConfig) -> Result<NoteStore<SqliteKeyValueStore>, Box<dyn Error>> {
    let storage = SqliteKeyValueStore::new(open_db(&config.db_path)?);
    let mut store = NoteStore::new(storage);
    if let Some(seed_path) = &config.seed_path {
        store = store.with_seed(JsonFileSeed::new(seed_path));
    }
    let source = store.load()?;
    info!(
        "event=cli_open module=cli status=ok source={:?} count={}",
        source,
        store.len()
    );
    Ok(store)
}

fn find_note<S: KeyValueStore>(
    store: &NoteStore<S>,
    id: NoteId,
) -> Result<&Note, NoteStoreError> {
    store.get(id).ok_or(NoteStoreError::NotFound(id))
}

fn cmd_list(store: &NoteStore<SqliteKeyValueStore>, state: &ViewState) {
    let cards = render_cards(store, state, Utc::now());
    println!("{} ({})", state.heading(), cards.len());
    if cards.is_empty() {
        println!("No notes yet. Create one with `notekeep add`.");
        return;
    }

    for card in &cards {
        match state.mode {
            ViewMode::Grid => print_grid_card(card),
            ViewMode::List => print_list_card(card),
        }
    }
}

fn print_grid_card(card: &NoteCard) {
    println!(
        "[{}] {} ({}) | {}{}",
        card.id,
        card.title,
        card.category,
        card.date_label,
        duplicate_badge(card.is_duplicate)
    );
}

fn print_list_card(card: &NoteCard) {
    println!(
        "[{}] {}{}",
        card.id,
        card.title,
        duplicate_badge(card.is_duplicate)
    );
    println!("    {} | {}", card.category, card.date_label);
    if !card.excerpt.is_empty() {
        println!("    {}", card.excerpt);
    }
}

fn print_note(note: &Note, is_duplicate: bool) {
    println!("{}{}", note.title, duplicate_badge(is_duplicate));
    println!("id:       {}", note.id);
    println!("category: {}", note.category);
    println!("created:  {}", note.created_at.to_rfc3339());
    println!("updated:  {}", note.updated_at.to_rfc3339());
    if !note.description.is_empty() {
        println!();
        println!("{}", note.description);
    }
}

fn duplicate_badge(is_duplicate: bool) -> &'static str {
    if is_duplicate {
        " [Duplicate]"
    } else {
        ""
    }
}
