//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::core::error::Result as GitResult;
use crate::core::model::{ResultItem, ResultSet, Source};
use crate::core::render::{OutputFormat, RenderConfig, Renderer};
use crate::core::util::parse_positive;
use crate::git::commit::{commits_to_items, image_item, paths_item};
use crate::git::doctor::doctor_result_set;
use crate::git::repository::Repository;
use crate::git::search::{count_result_set, matches_result_set, RepoSearchOptions};
use crate::git::stats::{commits_info_result_set, stats_user_result_set};
use crate::git::submodule::submodules_result_set;

/// gitscope - typed commit, code search, file status, submodule and contributor
/// queries over a git repository.
#[derive(Parser, Debug)]
#[command(name = "gitscope")]
#[command(
    author,
    version,
    about,
    long_about = r#"gitscope runs git, parses its text output and emits a unified,
machine-readable result model for every command.

Each command prints a ResultSet in the selected format (default: jsonl).

Output formats:
- jsonl: one JSON object per line (best for piping into tools)
- json: a single JSON array
- md: human-friendly Markdown
- raw: excerpts only (unstable; intended for debugging)

Examples:
    gitscope search "TODO" --page 2 --page-size 20
    gitscope status HEAD
    gitscope log main --page 1 --size 25
    gitscope submodules HEAD --path vendor/lib
    gitscope numstat --user "Jane Doe"
"#
)]
pub struct Cli {
    /// Repository working directory.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Directory git runs in (defaults to the current directory).\n\n\
Any directory inside a work tree, or a bare repository, is accepted."
    )]
    pub root: PathBuf,

    /// Output format (jsonl/json/md/raw).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select the output format for ResultSet.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\
- raw"
    )]
    pub format: String,

    /// git binary to invoke.
    #[arg(
        long,
        global = true,
        env = "GITSCOPE_GIT",
        default_value = "git",
        value_name = "PATH",
        long_help = "git binary to invoke. Every invocation runs with LC_ALL=C so the\n\
output gitscope parses does not depend on the user's locale."
    )]
    pub git: String,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        long_help = "Only log errors to stderr. Results are still printed to stdout.\n\
RUST_LOG, when set, takes precedence."
    )]
    pub quiet: bool,

    /// Verbose mode (log every git invocation).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log every git invocation and summary counts to stderr.\n\
RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that git is available.
    Doctor,

    #[command(flatten)]
    Query(QueryCommand),
}

/// Subcommands that run against an opened repository
#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Count (commit, file) pairs containing a keyword across all history.
    #[command(
        long_about = "Count, across every commit reachable from any ref, the files that\n\
contain KEYWORD as a fixed, case-sensitive string. Binary files are skipped.\n\n\
Examples:\n\
  gitscope count unsafe\n"
    )]
    Count {
        /// Keyword to count.
        keyword: String,
    },

    /// Search all history for a keyword and print one page of matches.
    #[command(
        long_about = "Search every commit reachable from any ref for KEYWORD (fixed string,\n\
case-insensitive). Each match is one commit:file block with two lines of context\n\
around each hit. The first item carries the history-wide total.\n\n\
Examples:\n\
  gitscope search parse_header\n\
  gitscope search TODO --page 3 --page-size 5 --order-by=--date-order\n"
    )]
    Search {
        /// Keyword to search for.
        keyword: String,

        /// Page to return (1-based).
        #[arg(long, default_value = "1", value_parser = parse_positive)]
        page: usize,

        /// Matches per page.
        #[arg(long, default_value = "10", value_parser = parse_positive)]
        page_size: usize,

        /// History ordering flag passed to the revision walk.
        #[arg(long, value_name = "FLAG", allow_hyphen_values = true, default_value = "")]
        order_by: String,

        /// Owner ID carried through for callers; not used by the search.
        #[arg(long, default_value = "0")]
        owner_id: i64,
    },

    /// Show one commit's metadata.
    Show {
        /// Revision (ID, branch, tag, HEAD~n, ...).
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Show the n-th parent (0-based) of a commit.
    Parent {
        rev: String,

        #[arg(default_value = "0")]
        n: usize,
    },

    /// List history starting at a commit.
    #[command(
        long_about = "List REV and its ancestors, newest first.\n\n\
Without options every ancestor is listed. --limit caps the count, --page/--size\n\
selects a window, and --until stops before (and excludes) the given commit.\n"
    )]
    Log {
        #[arg(default_value = "HEAD")]
        rev: String,

        /// Maximum number of commits.
        #[arg(long, conflicts_with_all = ["page", "until"])]
        limit: Option<usize>,

        /// Page of history (1-based).
        #[arg(long, value_parser = parse_positive, conflicts_with = "until")]
        page: Option<usize>,

        /// Page size used with --page (default 50).
        #[arg(long, value_parser = parse_positive, requires = "page")]
        size: Option<usize>,

        /// Stop at this commit ID, exclusive.
        #[arg(long, value_name = "COMMIT")]
        until: Option<String>,

        /// Print the number of commits instead of listing them.
        #[arg(long, conflicts_with_all = ["limit", "page", "until"])]
        count: bool,

        /// With --count, only count commits touching this path.
        #[arg(long, requires = "count")]
        path: Option<String>,
    },

    /// Most recent commit, as seen from REV, that touched PATH.
    LastChange { rev: String, path: String },

    /// Commits reachable from REV whose message contains KEYWORD.
    GrepLog { rev: String, keyword: String },

    /// Files changed between PAST and REV.
    ChangedSince { rev: String, past: String },

    /// Files added, removed and modified by a commit.
    Status {
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Submodules declared in a commit's .gitmodules.
    Submodules {
        #[arg(default_value = "HEAD")]
        rev: String,

        /// Only the submodule at this path.
        #[arg(long)]
        path: Option<String>,
    },

    /// Commits per day for an author.
    CollabCommits {
        /// Author pattern; all authors when omitted.
        #[arg(long, default_value = "")]
        user: String,
    },

    /// Lines inserted and deleted by an author.
    Numstat {
        /// Author pattern; all authors when omitted.
        #[arg(long, default_value = "")]
        user: String,
    },

    /// Whether the file at PATH in REV is an image.
    IsImage { rev: String, path: String },
}

/// Run one repository query and map it to a ResultSet
fn dispatch(repo: &Repository, command: QueryCommand) -> GitResult<ResultSet> {
    let result_set = match command {
        QueryCommand::Count { keyword } => count_result_set(repo.get_number_of_code_matches(&keyword)?),

        QueryCommand::Search {
            keyword,
            page,
            page_size,
            order_by,
            owner_id,
        } => {
            let opts = RepoSearchOptions {
                owner_id,
                order_by,
                page,
                page_size,
                ..RepoSearchOptions::new(keyword)
            };
            matches_result_set(&repo.search_matches_in_repo(&opts)?)
        }

        QueryCommand::Show { rev } => single(repo.get_commit(&rev)?.to_result_item()),

        QueryCommand::Parent { rev, n } => single(repo.get_commit(&rev)?.parent(n)?.to_result_item()),

        QueryCommand::Log {
            rev,
            limit,
            page,
            size,
            until,
            count,
            path,
        } => {
            let commit = repo.get_commit(&rev)?;
            if count {
                let total = match path {
                    Some(path) => repo.commits_count(commit.id.as_str(), Some(path.as_str()))?,
                    None => commit.commits_count()?,
                };
                return Ok(single(ResultItem::count(Source::Log, total).with_commit(commit.id.as_str())));
            }
            let commits = match (until, limit, page) {
                (Some(until), _, _) => commit.commits_before_until(&until)?,
                (None, Some(limit), _) => commit.commits_before_limit(limit)?,
                (None, None, Some(page)) => match size {
                    Some(size) => commit.commits_by_range_size(page, size)?,
                    None => commit.commits_by_range(page)?,
                },
                (None, None, None) => commit.commits_before()?,
            };
            commits_to_items(&commits).into_iter().collect()
        }

        QueryCommand::LastChange { rev, path } => {
            single(repo.get_commit(&rev)?.get_commit_by_path(&path)?.to_result_item().with_path(path))
        }

        QueryCommand::GrepLog { rev, keyword } => {
            let commits = repo.get_commit(&rev)?.search_commits(&keyword)?;
            commits_to_items(&commits).into_iter().collect()
        }

        QueryCommand::ChangedSince { rev, past } => {
            let commit = repo.get_commit(&rev)?;
            let changed = commit.files_changed_since(&past)?;
            single(paths_item(&commit, &changed))
        }

        QueryCommand::Status { rev } => {
            let commit = repo.get_commit(&rev)?;
            single(commit.file_status()?.to_result_item(commit.id.as_str()))
        }

        QueryCommand::Submodules { rev, path } => {
            let commit = repo.get_commit(&rev)?;
            match path {
                Some(path) => submodules_result_set(&commit, commit.submodule(&path)?),
                None => submodules_result_set(&commit, commit.submodules()?.values()),
            }
        }

        QueryCommand::CollabCommits { user } => {
            commits_info_result_set(&repo.commits_count_per_collaborator(&user)?)
        }

        QueryCommand::Numstat { user } => stats_user_result_set(&repo.num_stat_commits_per_user(&user)?),

        QueryCommand::IsImage { rev, path } => {
            let commit = repo.get_commit(&rev)?;
            let is_image = commit.is_image_file(&path);
            single(image_item(&commit, &path, is_image))
        }
    };

    Ok(result_set)
}

fn single(item: ResultItem) -> ResultSet {
    let mut result_set = ResultSet::new();
    result_set.push(item);
    result_set
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let render_config = RenderConfig::with_pretty(format, cli.pretty);

    let root = cli.root.canonicalize().unwrap_or(cli.root);

    let outcome = match cli.command {
        Commands::Doctor => Ok(doctor_result_set(&cli.git, &root)),
        Commands::Query(command) => Repository::open(&root, cli.git).and_then(|repo| {
            let result_set = dispatch(&repo, command)?;
            debug!(items = result_set.len(), cached_commits = repo.cached_commits(), "query finished");
            Ok(result_set)
        }),
    };

    let (result_set, failure) = match outcome {
        Ok(result_set) => {
            if result_set.has_errors() {
                warn!("some results carry errors");
            }
            (result_set, None)
        }
        Err(e) => {
            error!("{}", e);
            (single(ResultItem::error(e.to_scope_error())), Some(e))
        }
    };

    let renderer = Renderer::with_config(render_config);
    renderer.render_to(&result_set, io::stdout().lock())?;

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
