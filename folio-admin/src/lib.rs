//! Commands behind the `folio-admin` binary.
//!
//! Every command targets one entity table and prints JSON to the given
//! writer, one document per record or result.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use folio_model::{
    About, BlogPost, Category, Certification, Contact, Entity, Fields, Hero, Project, Skill,
};
use folio_sync::{Direction, Portfolio, Provides, SearchQuery};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "folio-admin")]
#[command(about = "Edit portfolio content in the hosted backend")]
pub struct Cli {
    /// Backend project URL
    #[arg(long, env = "FOLIO_URL", default_value = "http://localhost:54321")]
    pub url: String,

    /// API key sent with every request
    #[arg(long, env = "FOLIO_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Entity to operate on
    #[arg(value_enum)]
    pub entity: EntityName,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityName {
    Hero,
    About,
    Skills,
    Projects,
    Categories,
    Certifications,
    Blog,
    Contact,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print every active record
    List,
    /// Live search by text and column filters
    Search {
        /// Case-insensitive text to look for
        #[arg(default_value = "")]
        term: String,
        /// Equality filter, e.g. `--filter published=true`
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, Value)>,
    },
    /// Create a record from a JSON object
    Create { json: String },
    /// Apply a partial JSON update
    Update { id: String, json: String },
    /// Delete a record
    Delete { id: String },
    /// Swap a record with its neighbour
    Reorder {
        id: String,
        #[arg(value_parser = parse_direction)]
        direction: Direction,
    },
    /// Print the view state on every change until interrupted
    Watch {
        /// Stop after this many updates
        #[arg(long)]
        count: Option<usize>,
    },
}

/// Parses `key=value`. The value is read as JSON when possible
/// (`true`, `3`, `null`) and as a plain string otherwise.
pub fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing column name in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    raw.parse()
}

/// Runs `command` against the collection of `entity`.
pub async fn run<W: Write>(
    portfolio: &Portfolio,
    entity: EntityName,
    command: Command,
    out: &mut W,
) -> Result<()> {
    match entity {
        EntityName::Hero => run_on::<Hero, W>(portfolio, command, out).await,
        EntityName::About => run_on::<About, W>(portfolio, command, out).await,
        EntityName::Skills => run_on::<Skill, W>(portfolio, command, out).await,
        EntityName::Projects => run_on::<Project, W>(portfolio, command, out).await,
        EntityName::Categories => run_on::<Category, W>(portfolio, command, out).await,
        EntityName::Certifications => run_on::<Certification, W>(portfolio, command, out).await,
        EntityName::Blog => run_on::<BlogPost, W>(portfolio, command, out).await,
        EntityName::Contact => run_on::<Contact, W>(portfolio, command, out).await,
    }
}

async fn run_on<T, W>(portfolio: &Portfolio, command: Command, out: &mut W) -> Result<()>
where
    T: Entity,
    W: Write,
    Portfolio: Provides<T>,
{
    let collection = portfolio.get::<T>();
    let table = collection.table();

    match command {
        Command::List => {
            let fetched = collection.fetch(true).await;
            if let Some(e) = fetched.error {
                return Err(e).with_context(|| format!("failed to list {table}"));
            }
            print_json(out, &*fetched.records)?;
        }
        Command::Search { term, filters } => {
            let query = SearchQuery { term, filters };
            let found = collection
                .search(&query)
                .await
                .with_context(|| format!("search on {table} failed"))?;
            print_json(out, &found)?;
        }
        Command::Create { json } => {
            let draft: T = serde_json::from_str(&json).context("draft is not a valid record")?;
            let created = collection.create(&draft).await?;
            info!("Created {} {}", table, created.id());
            print_json(out, &created)?;
        }
        Command::Update { id, json } => {
            let patch: Fields = serde_json::from_str(&json).context("patch is not a JSON object")?;
            let updated = collection.update(&id, &patch).await?;
            print_json(out, &updated)?;
        }
        Command::Delete { id } => {
            if !collection.delete(&id).await? {
                bail!("no {table} record with id {id}");
            }
            writeln!(out, "deleted {id}")?;
        }
        Command::Reorder { id, direction } => {
            let moved = collection.reorder(&id, direction).await?;
            let status = if moved { "moved" } else { "unchanged" };
            writeln!(out, "{status} {id} {direction}")?;
        }
        Command::Watch { count } => watch::<T, W>(portfolio, count, out).await?,
    }
    Ok(())
}

async fn watch<T, W>(portfolio: &Portfolio, count: Option<usize>, out: &mut W) -> Result<()>
where
    T: Entity,
    W: Write,
    Portfolio: Provides<T>,
{
    let hook = portfolio.hook::<T>().await;
    let mut changes = hook.watch();
    let mut seen = 0;

    print_state(out, &hook)?;
    while count.is_none_or(|limit| seen < limit) {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                seen += 1;
                print_state(out, &hook)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    hook.unmount();
    Ok(())
}

fn print_state<T: Entity, W: Write>(out: &mut W, hook: &folio_sync::EntityHook<T>) -> Result<()> {
    let state = hook.state();
    let summary = serde_json::json!({
        "records": &*state.data,
        "is_loading": state.is_loading,
        "is_online": state.is_online,
        "error": state.error,
    });
    print_json(out, &summary)
}

fn print_json<W: Write, S: Serialize + ?Sized>(out: &mut W, value: &S) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
