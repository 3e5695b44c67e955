//! CLI for wrec.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wrec_core::config::{self, WrecConfig};
use wrec_core::filter::{self, FilterCriteria, MatchMode};
use wrec_core::sort::{SortKey, SortSpec};

use commands::{run_keys, run_list, run_watch};

/// Top-level CLI for wrec.
#[derive(Debug, Parser)]
#[command(name = "wrec")]
#[command(about = "wrec: browse archived resources and watch live recording size", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List captured resources from a HAR file or JSON snapshot.
    List {
        /// Path to a `.har` capture or a JSON collection snapshot.
        path: PathBuf,

        /// Media type to keep (exact match), or a preset name such as "HTML".
        #[arg(long = "type", value_name = "MIME")]
        mime: Option<String>,

        /// Text to search for in resource URLs.
        #[arg(long, short)]
        query: Option<String>,

        /// How the query is matched: contains, prefix or exact.
        #[arg(long = "match", value_name = "MODE", default_value_t = MatchMode::Contains)]
        match_mode: MatchMode,

        /// Column to sort by: url, timestamp (ts), mime, status or digest.
        #[arg(long, value_name = "KEY")]
        sort: Option<SortKey>,

        /// Sort in descending order.
        #[arg(long)]
        desc: bool,
    },

    /// Show sort keys, match modes and media-type presets.
    Keys,

    /// Poll the live size of a recording session until Ctrl-C.
    Watch {
        /// Recording session (collection) identifier.
        session: String,

        /// Archive API base URL (overrides `api_prefix` from config).
        #[arg(long, value_name = "URL")]
        api_prefix: Option<String>,

        /// Delay between size fetches in milliseconds (overrides config).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
}

/// Criteria from `list` flags; preset names are resolved to media types.
pub(crate) fn list_criteria(mime: Option<&str>, query: Option<&str>, match_mode: MatchMode) -> FilterCriteria {
    FilterCriteria::new(
        mime.map(filter::resolve_mime_filter).unwrap_or_default(),
        query.unwrap_or_default(),
        match_mode,
    )
}

/// Sort spec from `list` flags, starting from the configured default.
pub(crate) fn list_sort(cfg: &WrecConfig, sort: Option<SortKey>, desc: bool) -> SortSpec {
    let mut spec = match sort {
        Some(key) => SortSpec::ascending(key),
        None => cfg.sort_or_default(),
    };
    if desc {
        spec.descending = true;
    }
    spec
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::List {
                path,
                mime,
                query,
                match_mode,
                sort,
                desc,
            } => {
                let criteria = list_criteria(mime.as_deref(), query.as_deref(), match_mode);
                let spec = list_sort(&cfg, sort, desc);
                run_list(&path, criteria, spec)?;
            }
            CliCommand::Keys => run_keys(),
            CliCommand::Watch {
                session,
                api_prefix,
                interval_ms,
            } => run_watch(&cfg, &session, api_prefix.as_deref(), interval_ms).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
