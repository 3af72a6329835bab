//! `dashboard-amp`: runs the dashboard attribute-manager plugin by hand.
//!
//! Reads `config.toml` (or the path given with `--config`), layered with
//! `AMP_*` environment variables, opens the dashboard user store, and either
//! loads documents into it or prints the update descriptor for one user.
//!
//! ```
//! dashboard-amp import users.json
//! dashboard-amp fetch 5f0000000000000000000001
//! ```

use std::path::{Path, PathBuf};

use amp_core::{Document, UserId};
use amp_dashboard::{PluginConfig, SchemaGeneration, plugin_init};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Dashboard attribute-manager plugin")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Force a schema generation instead of deriving it from the config.
  #[arg(long)]
  schema: Option<SchemaGeneration>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Save one JSON document, or an array of them, into the dashboard store.
  Import { file: PathBuf },
  /// Print the id of every stored user.
  List,
  /// Print the `$set` / `$unset` update for a user.
  Fetch { user_id: UserId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("AMP"))
    .build()
    .context("failed to read config file")?;

  let mut plugin_cfg: PluginConfig = settings
    .try_deserialize()
    .context("failed to deserialise PluginConfig")?;
  plugin_cfg.store_uri = expand_tilde(&plugin_cfg.store_uri);
  if cli.schema.is_some() {
    plugin_cfg.schema = cli.schema;
  }

  let ctx = plugin_init(&plugin_cfg)
    .await
    .with_context(|| format!("failed to open store at {:?}", plugin_cfg.store_uri))?;

  match cli.command {
    Command::Import { file } => {
      for document in read_documents(&file)? {
        let user_id = ctx.source().save(document).await?;
        println!("{user_id}");
      }
    }
    Command::List => {
      for user_id in ctx.source().list_user_ids().await? {
        println!("{user_id}");
      }
    }
    Command::Fetch { user_id } => {
      let update = ctx
        .project(user_id)
        .await
        .with_context(|| format!("no update produced for {user_id}"))?;
      println!("{}", serde_json::to_string_pretty(&update)?);
    }
  }

  Ok(())
}

/// Parse `path` as a single document or an array of documents.
fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  let json: serde_json::Value = serde_json::from_str(&raw)
    .with_context(|| format!("parsing {}", path.display()))?;

  let items = match json {
    serde_json::Value::Array(items) => items,
    single => vec![single],
  };
  items
    .into_iter()
    .enumerate()
    .map(|(i, item)| {
      Document::from_json(item).with_context(|| format!("document #{i} in {}", path.display()))
    })
    .collect()
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
