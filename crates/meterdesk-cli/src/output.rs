//! Output renderers and formatting helpers for CLI commands.
//!
//! Renderers return the text to print so handlers and the browse loop can
//! route it to stdout or a test buffer.

use anyhow::anyhow;
use meterdesk_api_models::AdjustmentDecisionResponse;
use meterdesk_client::Screen;
use meterdesk_core::{ListError, ListView, ReportJob, RowId};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const MAX_CELL_WIDTH: usize = 32;

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map(|mut text| {
            text.push('\n');
            text
        })
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

pub(crate) fn render_page(screen: Screen, view: &ListView, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<&serde_json::Map<String, Value>> =
                view.page.rows.iter().map(|row| &row.fields).collect();
            to_json(&json!({
                "screen": screen.slug(),
                "page": view.query.page_index + 1,
                "pageSize": view.query.page_size,
                "pageCount": view.page.known_total().map(|_| view.page_count()),
                "totalCount": view.page.known_total(),
                "rows": rows,
                "error": view.error.as_ref().map(ListError::notice),
            }))
        }
        OutputFormat::Table => {
            let mut out = String::new();
            if let Some(error) = &view.error {
                push_line(&mut out, &format!("{}: {}", screen.title(), error.notice()));
                return Ok(out);
            }
            if view.page.rows.is_empty() {
                push_line(&mut out, &format!("{}: no rows", screen.title()));
                return Ok(out);
            }
            let columns = screen.columns();
            let cells: Vec<Vec<String>> = view
                .page
                .rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|column| truncate(&row.display_field(column)))
                        .collect()
                })
                .collect();
            let widths: Vec<usize> = columns
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    cells
                        .iter()
                        .map(|row| row[index].chars().count())
                        .chain(std::iter::once(column.len()))
                        .max()
                        .unwrap_or_default()
                })
                .collect();
            let header: Vec<String> = columns.iter().map(|column| column.to_uppercase()).collect();
            push_row(&mut out, &header, &widths);
            for row in &cells {
                push_row(&mut out, row, &widths);
            }
            let page_number = view.query.page_index + 1;
            let footer = match view.page.known_total() {
                Some(total) => format!(
                    "page {page_number} of {} ({total} rows)",
                    view.page_count().max(1)
                ),
                None => format!(
                    "page {page_number} ({} rows on this page)",
                    view.page.rows.len()
                ),
            };
            push_line(&mut out, &footer);
            Ok(out)
        }
    }
}

pub(crate) fn render_detail(
    screen: Screen,
    id: &RowId,
    record: &Value,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(record),
        OutputFormat::Table => {
            let mut out = String::new();
            push_line(&mut out, &format!("{} {id}", screen.title()));
            match record.as_object() {
                Some(fields) => {
                    let width = fields.keys().map(String::len).max().unwrap_or_default();
                    for (key, value) in fields {
                        push_line(&mut out, &format!("  {key:<width$}  {}", scalar(value)));
                    }
                }
                None => {
                    push_line(&mut out, &format!("  {}", scalar(record)));
                }
            }
            Ok(out)
        }
    }
}

pub(crate) fn render_jobs(jobs: &[ReportJob], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(jobs),
        OutputFormat::Table => {
            let mut out = String::new();
            push_line(&mut out, &format!("{:<24} {:<11} DETAIL", "JOB", "STATUS"));
            for job in jobs {
                let detail = job
                    .download_url
                    .as_deref()
                    .or(job.message.as_deref())
                    .unwrap_or("-");
                push_line(
                    &mut out,
                    &format!(
                        "{:<24} {:<11} {detail}",
                        job.id.as_str(),
                        job.status.as_str()
                    ),
                );
            }
            Ok(out)
        }
    }
}

pub(crate) fn render_decision(
    decision: &AdjustmentDecisionResponse,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(decision),
        OutputFormat::Table => Ok(format!(
            "adjustment {} is now {}\n",
            decision.id,
            decision.status.as_str()
        )),
    }
}

pub(crate) fn render_screens(format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let screens: Vec<Value> = Screen::ALL
                .iter()
                .map(|screen| {
                    json!({
                        "slug": screen.slug(),
                        "title": screen.title(),
                        "permissions": screen.permissions(),
                    })
                })
                .collect();
            to_json(&screens)
        }
        OutputFormat::Table => {
            let mut out = String::new();
            push_line(&mut out, &format!("{:<24} {:<30} PERMISSIONS", "SCREEN", "TITLE"));
            for screen in Screen::ALL {
                push_line(
                    &mut out,
                    &format!(
                        "{:<24} {:<30} {}",
                        screen.slug(),
                        screen.title(),
                        screen.permissions().join(", ")
                    ),
                );
            }
            Ok(out)
        }
    }
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    push_line(out, line.join("  ").trim_end());
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        return value.to_string();
    }
    let mut shortened: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
    shortened.push_str("...");
    shortened
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
