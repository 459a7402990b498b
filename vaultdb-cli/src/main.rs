use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use vaultdb::{Collection, Database, DatabaseConfig, Document, Query, Schema, SortOrder};

/// vaultdb CLI: inspect and edit vaultdb collections from the command line
#[derive(Parser)]
#[command(name = "vaultdb", version, about)]
struct Cli {
    /// Directory holding the collection files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Collection file extension
    #[arg(long = "ext", default_value = vaultdb::database::DEFAULT_EXTENSION)]
    extension: String,

    /// Username for encrypted collections
    #[arg(long)]
    username: Option<String>,

    /// Password for encrypted collections
    #[arg(long)]
    password: Option<String>,

    /// Schema file (YAML) describing the collection's documents
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Sort {
    Asc,
    Desc,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Asc => SortOrder::Ascending,
            Sort::Desc => SortOrder::Descending,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Insert one document, or an array of documents
    Insert {
        /// Collection name
        collection: String,
        /// Document JSON (an object or an array of objects)
        json: String,
    },

    /// Find documents, newest first by default
    Find {
        /// Collection name
        collection: String,
        /// Query JSON (e.g. '{"age": {"$gte": 18}}')
        #[arg(long)]
        query: Option<String>,
        /// Sort order by creation time
        #[arg(long, value_enum, default_value = "desc")]
        sort: Sort,
    },

    /// Get a single document by ID
    Get {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
    },

    /// Count documents, optionally matching a query
    Count {
        /// Collection name
        collection: String,
        /// Query JSON
        #[arg(long)]
        query: Option<String>,
    },

    /// Merge a patch into the document with the given ID
    Update {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
        /// Patch JSON object
        patch: String,
    },

    /// Merge a patch into the first document matching a query
    UpdateOne {
        /// Collection name
        collection: String,
        /// Query JSON
        query: String,
        /// Patch JSON object
        patch: String,
    },

    /// Delete the document with the given ID
    Delete {
        /// Collection name
        collection: String,
        /// Document ID
        id: String,
    },

    /// Delete the first document matching a query
    DeleteOne {
        /// Collection name
        collection: String,
        /// Query JSON
        query: String,
    },
}

impl Command {
    fn collection(&self) -> &str {
        match self {
            Command::Insert { collection, .. }
            | Command::Find { collection, .. }
            | Command::Get { collection, .. }
            | Command::Count { collection, .. }
            | Command::Update { collection, .. }
            | Command::UpdateOne { collection, .. }
            | Command::Delete { collection, .. }
            | Command::DeleteOne { collection, .. } => collection,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = DatabaseConfig::new(&cli.data_dir).extension(cli.extension.as_str());
    config.username = cli.username.clone();
    config.password = cli.password.clone();

    // Without a schema every document is accepted as-is
    let schema = match &cli.schema {
        Some(path) => vaultdb::parse_schema(path)?,
        None => Schema::new(Default::default())?,
    };

    let db = Database::open(config)?;
    let collection = db.collection(cli.command.collection(), schema)?;
    log::debug!("Using collection file {}", collection.path().display());

    execute(&collection, cli.command, &cli.format)
}

fn execute(
    collection: &Collection,
    command: Command,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Insert { json, .. } => {
            let input: serde_json::Value = serde_json::from_str(&json)?;
            if input.is_array() {
                let docs: Vec<Document> = serde_json::from_str(&json)?;
                let inserted = collection.insert_many(docs)?;
                print_output(&inserted, format)?;
            } else {
                let inserted = collection.insert_one(parse_document(&json)?)?;
                print_output(&inserted, format)?;
            }
        }

        Command::Find { query, sort, .. } => {
            let query = query.as_deref().map(parse_query).transpose()?;
            let docs = collection.find(query.as_ref(), sort.into())?;
            print_output(&docs, format)?;
        }

        Command::Get { id, .. } => match collection.find_by_id(&id)? {
            Some(doc) => print_output(&doc, format)?,
            None => return Err(format!("No document with _id '{id}'").into()),
        },

        Command::Count { query, .. } => {
            let query = query.as_deref().map(parse_query).transpose()?;
            let count = collection.count(query.as_ref())?;
            print_output(&serde_json::json!({ "count": count }), format)?;
        }

        Command::Update { id, patch, .. } => {
            let updated = collection.update_by_id(&id, parse_document(&patch)?)?;
            print_output(&updated, format)?;
        }

        Command::UpdateOne { query, patch, .. } => {
            let updated = collection.update_one(&parse_query(&query)?, parse_document(&patch)?)?;
            print_output(&updated, format)?;
        }

        Command::Delete { id, .. } => {
            let removed = collection.delete_by_id(&id)?;
            print_output(&removed, format)?;
        }

        Command::DeleteOne { query, .. } => {
            let removed = collection.delete_one(&parse_query(&query)?)?;
            print_output(&removed, format)?;
        }
    }

    Ok(())
}

fn parse_document(json: &str) -> vaultdb::Result<Document> {
    Document::from_json_str(json)
}

fn parse_query(json: &str) -> vaultdb::Result<Query> {
    let value: vaultdb::Value = serde_json::from_str(json)?;
    Query::parse(&value)
}

fn print_output<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
