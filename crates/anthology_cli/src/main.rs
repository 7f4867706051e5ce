//! Command-line front end for the Anthology reading journal.
//!
//! # Responsibility
//! - Resolve configuration, logging and the store from flags and config file.
//! - Map each subcommand onto one mapper or catalog service call.

use anthology_core::mapper::{entity, Entity};
use anthology_core::{
    init_logging, load_config, open_store, Author, Book, CatalogService, Genre, Quote, Reading,
    SaveOutcome, Store, SubGenre, Subject, UpdatePolicy,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "anthology", version, about = "Terminal reading journal")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides `[database] path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for log files; stderr when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create every journal table.
    Init,
    /// Print every stored record of one kind.
    List { kind: Kind },
    AddAuthor {
        firstname: String,
        lastname: String,
        #[arg(long, default_value = "")]
        midname: String,
        #[arg(long, default_value = "")]
        gender: String,
        #[arg(long, default_value = "")]
        country: String,
    },
    /// Save a book, creating or reusing the given authors ("First Last").
    AddBook {
        title: String,
        #[arg(long, default_value = "")]
        edition: String,
        #[arg(long, default_value = "")]
        publisher: String,
        #[arg(long, default_value = "")]
        year: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value_t = 0)]
        pages: i64,
        #[arg(long = "author")]
        authors: Vec<String>,
    },
    /// Link a stored author to a stored book.
    Link { author_id: i64, book_id: i64 },
    /// Print a book's citation and its authors.
    BookAuthors { book_id: i64 },
    /// Print the display names and descriptions of a record kind's fields.
    Fields { kind: Kind },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Author,
    Book,
    Genre,
    Subgenre,
    Subject,
    Quote,
    Reading,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.logging.dir = Some(dir);
    }
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    init_logging(&config.logging)?;

    let store = open_store(&config.database.path)
        .with_context(|| format!("opening {}", config.database.path.display()))?;
    let service = CatalogService::new(&store);
    service.provision()?;

    match cli.command {
        Command::Init => {
            info!(
                "event=cli_init module=cli status=ok path={}",
                config.database.path.display()
            );
            println!("initialized {}", config.database.path.display());
        }
        Command::List { kind } => {
            for line in list(&store, kind)? {
                println!("{line}");
            }
        }
        Command::AddAuthor {
            firstname,
            lastname,
            midname,
            gender,
            country,
        } => {
            let mut author = Author {
                midname,
                gender,
                country,
                ..Author::new(firstname, lastname)
            };
            let outcome = entity::save(&store, &mut author, UpdatePolicy::Skip)?;
            report(&author.to_string(), outcome)?;
        }
        Command::AddBook {
            title,
            edition,
            publisher,
            year,
            location,
            pages,
            authors,
        } => {
            let mut book = Book {
                publisher,
                publishyear: year,
                publishloc: location,
                numpages: pages,
                ..Book::new(title, edition)
            };
            let mut authors = authors
                .iter()
                .map(String::as_str)
                .map(parse_author)
                .collect::<Result<Vec<_>>>()?;
            let outcome = service.add_book(&mut book, &mut authors)?;
            report(&book.to_string(), outcome)?;
        }
        Command::Link { author_id, book_id } => {
            let outcome = service.link_author(author_id, book_id)?;
            report(&format!("author {author_id} -> book {book_id}"), outcome)?;
        }
        Command::BookAuthors { book_id } => {
            let Some(citation) = service.citation(book_id)? else {
                bail!("no book with id {book_id}");
            };
            println!("{citation}");
            for author in service.book_authors(book_id)? {
                println!("  [{}] {}", author.id, author);
            }
        }
        Command::Fields { kind } => print_fields(kind),
    }
    Ok(())
}

fn list(store: &Store, kind: Kind) -> Result<Vec<String>> {
    let lines = match kind {
        Kind::Author => entity::list_all::<Author>(store)?,
        Kind::Book => entity::list_all::<Book>(store)?,
        Kind::Genre => entity::list_all::<Genre>(store)?,
        Kind::Subgenre => entity::list_all::<SubGenre>(store)?,
        Kind::Subject => entity::list_all::<Subject>(store)?,
        Kind::Quote => entity::list_all::<Quote>(store)?,
        Kind::Reading => entity::list_all::<Reading>(store)?,
    };
    Ok(lines)
}

fn print_fields(kind: Kind) {
    match kind {
        Kind::Author => print_fields_of::<Author>(),
        Kind::Book => print_fields_of::<Book>(),
        Kind::Genre => print_fields_of::<Genre>(),
        Kind::Subgenre => print_fields_of::<SubGenre>(),
        Kind::Subject => print_fields_of::<Subject>(),
        Kind::Quote => print_fields_of::<Quote>(),
        Kind::Reading => print_fields_of::<Reading>(),
    }
}

fn print_fields_of<T: Entity>() {
    let descriptions = entity::alias_to_description::<T>();
    let types = entity::field_to_type::<T>();
    let fields = entity::alias_to_field::<T>();
    for alias in entity::aliases::<T>() {
        let kind = fields
            .get(alias)
            .and_then(|field| types.get(field))
            .map(ToString::to_string)
            .unwrap_or_default();
        let description = descriptions.get(alias).copied().unwrap_or_default();
        println!("{alias:<16} {kind:<10} {description}");
    }
}

/// Splits "First Last" or "First Middle Last" into an author.
fn parse_author(name: &str) -> Result<Author> {
    let parts = name.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [first, last] => Ok(Author::new(*first, *last)),
        [first, middle @ .., last] if !middle.is_empty() => Ok(Author {
            midname: middle.join(" "),
            ..Author::new(*first, *last)
        }),
        _ => bail!("author `{name}` must have at least a first and last name"),
    }
}

fn report(label: &str, outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Inserted(id) => println!("added [{id}] {label}"),
        SaveOutcome::Updated(id) => println!("updated [{id}] {label}"),
        SaveOutcome::Skipped => println!("unchanged {label}"),
        SaveOutcome::Failed(failure) => bail!("could not save {label}: {failure}"),
    }
    Ok(())
}
