//! CLI command handlers. Each returns the text to print; `main` does the printing.

use anyhow::Context;
use pagelocale_core::table::TranslationTable;
use pagelocale_dom::Page;
use std::path::Path;

use crate::localizer::{ApplyReport, Localizer};

/// Read and parse a page from disk.
pub async fn read_page(path: &Path) -> anyhow::Result<Page> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read page {}", path.display()))?;
    Ok(Page::parse(&source))
}

/// Write the page to `out`, or return it for stdout.
pub async fn emit_page(page: &Page, out: Option<&Path>) -> anyhow::Result<Option<String>> {
    let html = page.to_html();
    match out {
        Some(path) => {
            tokio::fs::write(path, html)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(None)
        }
        None => Ok(Some(html)),
    }
}

/// `load`: the startup hook against a page file.
pub async fn handle_load(
    localizer: &Localizer,
    page_path: &Path,
    out: Option<&Path>,
) -> anyhow::Result<(ApplyReport, Option<String>)> {
    let mut page = read_page(page_path).await?;
    let report = localizer.on_load(&mut page).await?;
    let html = emit_page(&page, out).await?;
    Ok((report, html))
}

/// `apply`: an explicit language change against a page file.
pub async fn handle_apply(
    localizer: &Localizer,
    lang: &str,
    page_path: &Path,
    out: Option<&Path>,
) -> anyhow::Result<(ApplyReport, Option<String>)> {
    let mut page = read_page(page_path).await?;
    let report = localizer.apply_language(&mut page, lang).await?;
    let html = emit_page(&page, out).await?;
    Ok((report, html))
}

/// `status`: stored preference, source, and policies.
pub async fn handle_status(localizer: &Localizer) -> anyhow::Result<String> {
    let cfg = localizer.config();
    let stored = localizer.store().get(&cfg.storage_key).await?;
    let active = match stored {
        Some(lang) => lang,
        None => format!("{} (default, nothing stored)", cfg.default_language),
    };

    Ok(format!(
        "Active language: {active}\n\
         Store: {} (key '{}')\n\
         Table: {} ({})\n\
         Marker: {}\n\
         Content mode: {}\n\
         Missing translations: {}\n\
         Missing language: {}",
        localizer.store().name(),
        cfg.storage_key,
        localizer.source().location(),
        localizer.source().name(),
        cfg.marker_attribute,
        cfg.content_mode.display_name(),
        cfg.missing_policy.display_name(),
        cfg.missing_language.display_name(),
    ))
}

/// `languages`: fetch the table and list what it offers.
pub async fn handle_languages(localizer: &Localizer) -> anyhow::Result<String> {
    let table = localizer.source().fetch().await?;
    Ok(format_languages(&table))
}

/// `audit`: marked keys without a usable translation.
pub async fn handle_audit(
    localizer: &Localizer,
    lang: &str,
    page_path: &Path,
) -> anyhow::Result<String> {
    let page = read_page(page_path).await?;
    let missing = localizer.audit(&page, lang).await?;
    Ok(format_audit(lang, &missing))
}

/// One line of summary for a finished pass.
pub fn format_report(report: &ApplyReport) -> String {
    match &report.applied {
        None => format!(
            "'{}' not in translation table, page left unchanged",
            report.requested
        ),
        Some(applied) if applied != &report.requested => format!(
            "'{}' not in translation table, applied '{applied}': {} translated, {} kept, {} cleared",
            report.requested,
            report.translated,
            report.untouched.len(),
            report.cleared.len()
        ),
        Some(applied) => format!(
            "applied '{applied}': {} translated, {} kept, {} cleared",
            report.translated,
            report.untouched.len(),
            report.cleared.len()
        ),
    }
}

fn format_languages(table: &TranslationTable) -> String {
    if table.is_empty() {
        return "Translation table is empty.".to_string();
    }
    table
        .languages()
        .into_iter()
        .map(|code| {
            let keys = table.language(code).map_or(0, |m| m.len());
            format!("{code}\t{keys} keys")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_audit(lang: &str, missing: &[String]) -> String {
    if missing.is_empty() {
        return format!("All marked keys have a translation in '{lang}'.");
    }
    let mut out = format!("{} key(s) without a translation in '{lang}':", missing.len());
    for key in missing {
        out.push_str("\n  ");
        out.push_str(key);
    }
    out
}
