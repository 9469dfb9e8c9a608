use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ExecutionMode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub reader: ReaderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the config file; each flag wins over the file.
#[derive(Debug, Args)]
pub struct ReaderArgs {
    /// YAML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Corpus root: http(s) base URL or local directory.
    #[arg(long, global = true)]
    pub corpus_root: Option<String>,

    /// Manifest locator, relative to the corpus root.
    #[arg(long, global = true)]
    pub manifest: Option<String>,

    /// File holding bookmarks, edits and the last read position.
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Where the search index is built and queried.
    #[arg(long, global = true, value_parser = parse_mode)]
    pub search_mode: Option<ExecutionMode>,

    /// Log at info level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn parse_mode(raw: &str) -> Result<ExecutionMode, String> {
    ExecutionMode::parse(raw).map_err(|err| err.to_string())
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show one sub-chapter (the first one by default).
    Read(ReadArgs),
    /// Show the sub-chapter after the last read one.
    Next,
    /// Show the sub-chapter before the last read one.
    Prev,
    /// Show the last read sub-chapter again.
    Resume,
    /// Search every entry in the corpus.
    Search(SearchArgs),
    /// Save a local edit of one entry.
    Edit(EditArgs),
    /// Toggle a bookmark, or list bookmarks when no id is given.
    Bookmark(BookmarkArgs),
    /// Print the table of contents.
    Toc(TocArgs),
}

#[derive(Debug, Args)]
pub struct TocArgs {
    /// List the entries of one sub-chapter file without opening it.
    #[arg(long, value_name = "FILE")]
    pub preview: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Chapter (bab) number.
    #[arg(long, conflicts_with = "file")]
    pub chapter: Option<i64>,

    /// 0-based sub-chapter index inside the chapter.
    #[arg(long, default_value_t = 0, requires = "chapter")]
    pub subchapter: usize,

    /// Sub-chapter file reference from the manifest.
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Case-insensitive substring to look for.
    pub query: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub id: i64,

    /// New primary (Indonesian) text.
    #[arg(long)]
    pub indo: String,

    /// New secondary (English) text.
    #[arg(long)]
    pub inggris: String,
}

#[derive(Debug, Args)]
pub struct BookmarkArgs {
    pub id: Option<i64>,
}
