use std::sync::Arc;

use anyhow::Context as _;

use crate::cache::Subchapter;
use crate::cli::{BookmarkArgs, EditArgs, ReadArgs, ReaderArgs, SearchArgs, TocArgs};
use crate::config::{ExecutionMode, ReaderConfig};
use crate::formats::{Entry, IndexRecord, Manifest};
use crate::search::{SearchEngine, SearchHandle, SearchState, SearchTimings};
use crate::session::{Notifier, ReaderSession};
use crate::source;
use crate::state_store::FileStateStore;

/// Toasts go to stderr so stdout stays the rendered content.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        tracing::debug!(text = message, "notify");
        eprintln!("{message}");
    }
}

/// Config file, then `BAITREADER_SEARCH_MODE`, then command-line flags.
pub fn resolve_config(args: &ReaderArgs) -> anyhow::Result<ReaderConfig> {
    let mut config = match &args.config {
        Some(path) => ReaderConfig::load(path)?,
        None => ReaderConfig::default(),
    };
    if let Some(mode) = ExecutionMode::from_env()? {
        config.search_mode = mode;
    }
    if let Some(root) = &args.corpus_root {
        config.corpus_root = root.clone();
    }
    if let Some(manifest) = &args.manifest {
        config.manifest = manifest.clone();
    }
    if let Some(state_file) = &args.state_file {
        config.state_file = state_file.clone();
    }
    if let Some(mode) = args.search_mode {
        config.search_mode = mode;
    }
    Ok(config)
}

fn open_session(config: &ReaderConfig) -> anyhow::Result<ReaderSession> {
    let source = source::from_root(&config.corpus_root, config.fetch_timeout())
        .with_context(|| format!("open corpus root {}", config.corpus_root))?;
    let store = Arc::new(FileStateStore::new(config.state_file.clone()));
    Ok(ReaderSession::new(source, config.manifest.clone(), store)
        .with_notifier(Arc::new(StderrNotifier)))
}

pub async fn read(config: &ReaderConfig, args: ReadArgs) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let subchapter = if let Some(file) = args.file {
        let position = session
            .manifest()
            .await?
            .position_of_file(&file)
            .with_context(|| format!("no sub-chapter with file {file}"))?;
        Some(session.load_subchapter(position).await?.clone())
    } else if let Some(chapter) = args.chapter {
        Some(session.go_to(chapter, args.subchapter).await?.clone())
    } else {
        session.open_first().await?.cloned()
    };
    print_subchapter(&session, subchapter).await
}

pub async fn resume(config: &ReaderConfig) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let subchapter = session.resume().await?.cloned();
    print_subchapter(&session, subchapter).await
}

/// Steps from the last read position; `forward` picks the direction.
pub async fn step(config: &ReaderConfig, forward: bool) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    if session.resume().await?.is_none() {
        return print_subchapter(&session, None).await;
    }
    let subchapter = if forward {
        session.next().await?.cloned()
    } else {
        session.prev().await?.cloned()
    };
    match subchapter {
        Some(subchapter) => print_subchapter(&session, Some(subchapter)).await,
        None => Ok(()),
    }
}

async fn print_subchapter(
    session: &ReaderSession,
    subchapter: Option<Subchapter>,
) -> anyhow::Result<()> {
    let Some(subchapter) = subchapter else {
        println!("The table of contents is empty.");
        return Ok(());
    };

    let position = &subchapter.position;
    println!(
        "Bab {} / {} [{}]",
        position.chapter_number, position.title, position.file
    );
    if subchapter.is_empty() {
        println!("(no entries)");
        return Ok(());
    }

    let bookmarks = session.bookmarks().await?;
    for (number, entry) in subchapter.numbered() {
        let text = if session.shows_secondary(entry.id).await? {
            &entry.secondary_text
        } else {
            &entry.primary_text
        };
        let mut marks = String::new();
        if bookmarks.contains(&entry.id) {
            marks.push_str(" [bookmarked]");
        }
        if session.is_edited(entry.id).await? {
            marks.push_str(" [edited]");
        }
        if let Some(title) = &entry.title {
            println!("== {title}");
        }
        println!("{number}. {text} (id {}){marks}", entry.id);
        if let Some(description) = &entry.description {
            println!("   {description}");
        }
    }
    Ok(())
}

const PREVIEW_CHARS: usize = 40;

pub async fn toc(config: &ReaderConfig, args: TocArgs) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    match args.preview {
        Some(file) => {
            for entry in session.preview(&file).await? {
                println!("{}", format_preview(&entry));
            }
        }
        None => print!("{}", format_toc(session.manifest().await?)),
    }
    Ok(())
}

fn format_toc(manifest: &Manifest) -> String {
    let mut out = String::new();
    for chapter in &manifest.chapters {
        out.push_str(&format!("Bab {}: {}\n", chapter.number, chapter.title));
        for (index, subchapter) in chapter.subchapters.iter().enumerate() {
            out.push_str(&format!(
                "  {index}. {} [{}]\n",
                subchapter.title, subchapter.file
            ));
            if let Some(description) = subchapter
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
            {
                out.push_str(&format!("     {description}\n"));
            }
        }
    }
    out
}

/// `id. first 40 characters...`, as the sidebar preview shows it.
fn format_preview(entry: &Entry) -> String {
    let snippet: String = entry.primary_text.chars().take(PREVIEW_CHARS).collect();
    format!("{}. {snippet}...", entry.id)
}

pub async fn search(config: &ReaderConfig, args: SearchArgs) -> anyhow::Result<()> {
    if args.query.trim().is_empty() {
        return Ok(());
    }
    let source = source::from_root(&config.corpus_root, config.fetch_timeout())
        .with_context(|| format!("open corpus root {}", config.corpus_root))?;
    let engine = SearchEngine::from_config(source, config);
    tracing::info!(mode = ?engine.mode(), query = %args.query, "searching");

    let handle = SearchHandle::spawn(engine, SearchTimings::from_config(config));
    let mut updates = handle.subscribe();
    handle.input(&args.query);

    let view = loop {
        updates.changed().await.context("search loop stopped")?;
        let view = updates.borrow_and_update().clone();
        if view.seq > 0 && view.state == SearchState::Idle {
            break view;
        }
    };

    if let Some(error) = view.error {
        anyhow::bail!("search failed: {error}");
    }
    if view.results.is_empty() {
        eprintln!("No matches for {:?}.", view.query);
    }
    for record in &view.results {
        println!("{}", format_hit(record));
    }
    Ok(())
}

fn format_hit(record: &IndexRecord) -> String {
    format!(
        "Bab {} / {} #{} (id {}): {}",
        record.chapter_number,
        record.subchapter_title,
        record.local_index + 1,
        record.entry_id,
        record.primary_text
    )
}

pub async fn edit(config: &ReaderConfig, args: EditArgs) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    session
        .save_edit(args.id, &args.indo, &args.inggris)
        .await
        .with_context(|| format!("save edit for {}", args.id))?;
    println!("Saved edit for entry {}.", args.id);
    Ok(())
}

pub async fn bookmark(config: &ReaderConfig, args: BookmarkArgs) -> anyhow::Result<()> {
    let session = open_session(config)?;
    match args.id {
        Some(id) => {
            if session.toggle_bookmark(id).await? {
                println!("Bookmarked entry {id}.");
            } else {
                println!("Removed bookmark for entry {id}.");
            }
        }
        None => {
            for id in session.bookmarks().await? {
                println!("{id}");
            }
        }
    }
    Ok(())
}
