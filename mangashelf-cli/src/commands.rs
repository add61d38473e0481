//! Subcommand handlers. Each one prints either plain text or, with
//! `--json`, a single JSON document on stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use mangashelf_core::{Shelf, chapter_rows};
use mangashelf_model::{
    ViewerSettings, ViewerSettingsPatch, chapter_display_name,
};
use serde_json::json;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn emit(
        self,
        value: serde_json::Value,
        text: impl FnOnce() -> String,
    ) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            let text = text();
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Invalid path {}", path.display()))
}

fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub async fn scan(
    shelf: &Shelf,
    out: Output,
    root: Option<PathBuf>,
) -> Result<()> {
    let root = root.as_deref().map(absolute).transpose()?;
    let scan = shelf.refresh_library(root.as_deref()).await?;

    let mut rows = Vec::with_capacity(scan.manga.len());
    for manga in &scan.manga {
        let chapters = match shelf.chapters(manga).await {
            Ok(listing) => listing.len(),
            Err(e) => {
                tracing::warn!(
                    "Cannot list chapters of {}: {}",
                    manga.path.display(),
                    e
                );
                0
            }
        };
        rows.push((manga, chapters, shelf.summary(manga).await));
    }

    let value = json!({
        "root": scan.root,
        "manga": rows.iter().map(|(manga, chapters, summary)| json!({
            "title": manga.title,
            "path": manga.path,
            "cover": manga.cover_path,
            "status": manga.metadata.status,
            "chapterFiles": chapters,
            "totalChapters": manga.metadata.total_chapter_count,
            "downloaded": manga.metadata.download_complete_count,
            "readChapters": summary.read_count,
            "percent": summary.percent,
        })).collect::<Vec<_>>(),
    });
    out.emit(value, || {
        if rows.is_empty() {
            return format!("No manga found in {}", scan.root.display());
        }
        rows.iter()
            .map(|(manga, chapters, summary)| {
                format!(
                    "{}\t{}\t{} files\t{}\t{}",
                    manga.title,
                    manga.metadata.status,
                    chapters,
                    summary.label(),
                    manga.path.display()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub async fn chapters(
    shelf: &Shelf,
    out: Output,
    manga: PathBuf,
) -> Result<()> {
    let manga = shelf.manga(&absolute(&manga)?).await?;
    let listing = shelf.chapters(&manga).await?;
    let history = shelf.history().get_manga_history(&manga.path).await;
    let rows = chapter_rows(&listing, history.as_ref());

    let entries: Vec<_> = listing
        .chapters()
        .iter()
        .zip(&rows)
        .map(|(chapter, row)| {
            json!({
                "title": row.title,
                "path": chapter.path,
                "size": chapter.size,
                "read": row.is_read,
                "lastRead": row.is_last_read,
            })
        })
        .collect();
    let value = json!({ "manga": manga.title, "chapters": entries });
    out.emit(value, || {
        if listing.is_empty() {
            return format!("No PDF files found in {}", manga.title);
        }
        rows.iter()
            .map(|row| {
                let marker = if row.is_last_read {
                    ">"
                } else if row.is_read {
                    "*"
                } else {
                    " "
                };
                format!("{marker} {}\t{}", row.title, row.size)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub async fn progress(
    shelf: &Shelf,
    out: Output,
    manga: PathBuf,
    chapter: PathBuf,
    page: u32,
    total: u32,
) -> Result<()> {
    let manga = shelf.manga(&absolute(&manga)?).await?;
    let chapter = absolute(&chapter)?;
    let listing = shelf.chapters(&manga).await?;
    let Some(index) = listing.position(&chapter) else {
        bail!("{} is not a chapter of {}", chapter.display(), manga.title);
    };

    let mut session = shelf.start_reading(&manga, Some(index)).await?;
    let recorded = session.page_changed(page, total).await;

    let value = json!({
        "recorded": recorded.is_some(),
        "progress": recorded,
        "pageIndicator": session.page_indicator(),
        "reachedEnd": session.reached_end(),
    });
    out.emit(value, || {
        let mut text = match &recorded {
            Some(p) => format!(
                "{}: page {}/{}{}",
                chapter_display_name(&p.chapter_name),
                p.current_page,
                p.total_pages,
                if p.is_completed { " (completed)" } else { "" }
            ),
            None => format!(
                "Opened {}; page position not recorded",
                session.current_chapter().display_name()
            ),
        };
        if session.reached_end() {
            text.push_str("\nChapter finished, next chapter available");
        }
        text
    })
}

pub async fn mark_read(
    shelf: &Shelf,
    manga: PathBuf,
    chapter: PathBuf,
) -> Result<()> {
    let manga = absolute(&manga)?;
    let chapter = absolute(&chapter)?;
    if shelf.history().mark_chapter_as_read(&manga, &chapter).await {
        println!("Marked {} as read", chapter.display());
    } else if shelf.history().get_manga_history(&manga).await.is_none() {
        println!(
            "No reading history for {}; open a chapter first",
            manga.display()
        );
    } else {
        println!("{} was already read", chapter.display());
    }
    Ok(())
}

pub async fn resume(shelf: &Shelf, out: Output, manga: PathBuf) -> Result<()> {
    let manga = shelf.manga(&absolute(&manga)?).await?;
    let point = shelf.resume(&manga).await?;

    let value = json!({
        "manga": manga.title,
        "index": point.as_ref().map(|p| p.index),
        "chapter": point.as_ref().map(|p| &p.chapter.path),
        "progress": point.as_ref().map(|p| &p.progress),
    });
    out.emit(value, || match &point {
        Some(p) => format!(
            "Continue {} at page {}/{}",
            p.chapter.display_name(),
            p.progress.current_page,
            p.progress.total_pages
        ),
        None => format!("Nothing to resume for {}", manga.title),
    })
}

pub async fn history_recent(shelf: &Shelf, out: Output) -> Result<()> {
    let recent = shelf.history().get_recently_read_manga().await;
    out.emit(serde_json::to_value(&recent)?, || {
        if recent.is_empty() {
            return "No reading history".to_string();
        }
        recent
            .iter()
            .map(|h| {
                let last = h
                    .last_read_chapter
                    .as_ref()
                    .map(|p| {
                        format!(
                            "{} ({}/{})",
                            chapter_display_name(&p.chapter_name),
                            p.current_page,
                            p.total_pages
                        )
                    })
                    .unwrap_or_default();
                format!(
                    "{}\t{}\t{} read\t{}",
                    h.manga_title,
                    last,
                    h.read_count(),
                    format_time(h.last_access_time)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub async fn history_show(
    shelf: &Shelf,
    out: Output,
    manga: PathBuf,
) -> Result<()> {
    let manga = absolute(&manga)?;
    let history = shelf.history().get_manga_history(&manga).await;
    out.emit(serde_json::to_value(&history)?, || match &history {
        Some(h) => {
            let mut lines = vec![
                h.manga_title.clone(),
                format!("Last read: {}", format_time(h.last_access_time)),
            ];
            if let Some(p) = &h.last_read_chapter {
                lines.push(format!(
                    "Last chapter: {} page {}/{}",
                    chapter_display_name(&p.chapter_name),
                    p.current_page,
                    p.total_pages
                ));
            }
            lines.extend(
                h.read_chapters.iter().map(|c| format!("  {}", c.display())),
            );
            lines.join("\n")
        }
        None => format!("No reading history for {}", manga.display()),
    })
}

pub async fn history_clear(
    shelf: &Shelf,
    manga: Option<PathBuf>,
) -> Result<()> {
    match manga {
        Some(manga) => {
            let manga = absolute(&manga)?;
            if shelf.history().clear_manga_history(&manga).await {
                println!("Cleared history for {}", manga.display());
            } else {
                println!("No reading history for {}", manga.display());
            }
        }
        None => {
            if !shelf.history().clear_all_history().await {
                bail!(
                    "Reading history was cleared in memory but could not be \
                     removed from storage"
                );
            }
            println!("Cleared all reading history");
        }
    }
    Ok(())
}

fn settings_value(settings: &ViewerSettings) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(settings)?)
}

fn settings_text(settings: &ViewerSettings) -> String {
    format!(
        "showPageIndicator = {}\n\
         distanceBetweenPages = {}\n\
         defaultLibraryFolder = {}",
        settings.show_page_indicator,
        settings.distance_between_pages,
        settings.default_library_folder.display()
    )
}

pub async fn settings_show(shelf: &Shelf, out: Output) -> Result<()> {
    let settings = shelf.settings().current().await;
    out.emit(settings_value(&settings)?, || settings_text(&settings))
}

pub async fn settings_set(
    shelf: &Shelf,
    out: Output,
    show_page_indicator: Option<bool>,
    distance: Option<u32>,
    library: Option<PathBuf>,
) -> Result<()> {
    let patch = ViewerSettingsPatch {
        show_page_indicator,
        distance_between_pages: distance,
        default_library_folder: library.as_deref().map(absolute).transpose()?,
    };
    if patch.is_empty() {
        bail!(
            "Nothing to change: pass --show-page-indicator, --distance or \
             --library"
        );
    }
    if !shelf.settings().save(&patch).await {
        bail!("Failed to save settings");
    }
    settings_show(shelf, out).await
}

pub async fn settings_reset(shelf: &Shelf, out: Output) -> Result<()> {
    if !shelf.settings().reset().await {
        bail!("Failed to reset settings");
    }
    settings_show(shelf, out).await
}

pub async fn browse(
    shelf: &Shelf,
    out: Output,
    dir: Option<PathBuf>,
    select: bool,
) -> Result<()> {
    let dir = dir.as_deref().map(absolute).transpose()?;
    let picker = shelf.folder_picker(dir.as_deref()).await?;

    let value = json!({
        "current": picker.current(),
        "canGoUp": picker.can_go_up(),
        "folders": picker.entries().iter().map(|e| &e.path).collect::<Vec<_>>(),
    });
    out.emit(value, || {
        let mut lines = vec![picker.current().display().to_string()];
        lines.extend(picker.entries().iter().map(|e| format!("  {}/", e.name)));
        lines.join("\n")
    })?;

    if select {
        let folder = picker.current().to_path_buf();
        if !shelf.choose_library_folder(picker).await {
            bail!("Failed to save {} as library folder", folder.display());
        }
        if !out.json {
            println!("Library folder set to {}", folder.display());
        }
    }
    Ok(())
}
