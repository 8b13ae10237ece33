//! Line-oriented interactive browser over one list screen.
//!
//! Each input line is one command; the list re-renders once the resulting
//! fetch settles. Search edits honour the configured debounce.

use std::io::Write;

use anyhow::anyhow;
use meterdesk_client::Screen;
use meterdesk_core::{
    CoreError, DetailController, DetailSource, DetailView, ListController, ListSource, RowId,
    Selection, SortDirection,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::cli::{BrowseArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, parse_key_value, parse_sort};
use crate::commands::list::{settle, source_for};
use crate::output::{render_detail, render_page};

const HELP: &str = "\
commands:
  search [text]       set or clear the search text
  filter key=value    select a filter value
  unfilter key        clear a filter
  sort field[:dir]    sort by a field (asc or desc)
  unsort              restore server ordering
  page n              jump to page n
  next | prev         move one page
  size n              rows per page
  open id             toggle the detail panel for id
  close               close the detail panel
  refresh             fetch the current page again
  quit                leave
";

/// One parsed browse command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BrowseCommand {
    Search(String),
    Filter(String, String),
    Unfilter(String),
    Sort(String, SortDirection),
    Unsort,
    /// Zero-based page index.
    Page(u32),
    Next,
    Prev,
    Size(u32),
    Open(RowId),
    Close,
    Refresh,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`.
pub(crate) fn parse_command(line: &str) -> Result<Option<BrowseCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
    let command = match verb.to_ascii_lowercase().as_str() {
        "search" | "s" => BrowseCommand::Search(rest.to_string()),
        "filter" | "f" => {
            let (key, value) = parse_key_value(rest)?;
            BrowseCommand::Filter(key, value)
        }
        "unfilter" => BrowseCommand::Unfilter(required(rest, "unfilter needs a filter key")?),
        "sort" => {
            let (field, direction) = parse_sort(rest)?;
            BrowseCommand::Sort(field, direction)
        }
        "unsort" => BrowseCommand::Unsort,
        "page" | "p" => {
            let number = parse_number(rest, "page")?;
            if number == 0 {
                return Err("page numbers start at 1".to_string());
            }
            BrowseCommand::Page(number - 1)
        }
        "next" | "n" => BrowseCommand::Next,
        "prev" => BrowseCommand::Prev,
        "size" => BrowseCommand::Size(parse_number(rest, "size")?),
        "open" | "o" => BrowseCommand::Open(RowId::new(required(rest, "open needs a row id")?)),
        "close" => BrowseCommand::Close,
        "refresh" | "r" => BrowseCommand::Refresh,
        "help" | "?" => BrowseCommand::Help,
        "quit" | "exit" | "q" => BrowseCommand::Quit,
        other => return Err(format!("unknown command '{other}' (type 'help')")),
    };
    Ok(Some(command))
}

fn required(value: &str, message: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(message.to_string())
    } else {
        Ok(value.to_string())
    }
}

fn parse_number(value: &str, name: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("{name} needs a whole number, got '{value}'"))
}

pub(crate) async fn handle_browse(
    ctx: &AppContext,
    args: BrowseArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    browse(ctx, args.screen, output, input, &mut out).await
}

/// Drive a list and detail controller from `input`, rendering to `out`.
pub(crate) async fn browse<R, W>(
    ctx: &AppContext,
    screen: Screen,
    output: OutputFormat,
    input: R,
    out: &mut W,
) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let list = ListController::new(
        source_for(ctx, screen),
        screen.list_options(ctx.config.debounce(), ctx.config.list.page_size),
    );
    let details = DetailController::new(source_for(ctx, screen));
    list.load();
    render_list(&list, screen, output, out).await?;

    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read input: {err}")))?
    {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                emit(out, &format!("{message}\n"))?;
                continue;
            }
        };
        match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => emit(out, HELP)?,
            BrowseCommand::Open(id) => open(&details, screen, id, output, out).await?,
            BrowseCommand::Close => {
                details.close();
                emit(out, "detail closed\n")?;
            }
            other => match apply(&list, other) {
                Ok(()) => render_list(&list, screen, output, out).await?,
                Err(message) => emit(out, &format!("{message}\n"))?,
            },
        }
    }
    Ok(())
}

fn apply<S: ListSource>(list: &ListController<S>, command: BrowseCommand) -> Result<(), String> {
    match command {
        BrowseCommand::Search(text) => list.set_search_text(text),
        BrowseCommand::Filter(key, value) => list.set_filter(key, value),
        BrowseCommand::Unfilter(key) => list.clear_filter(&key),
        BrowseCommand::Sort(field, direction) => list.set_sort(field, direction),
        BrowseCommand::Unsort => list.clear_sort(),
        BrowseCommand::Page(index) => list.set_page(index),
        BrowseCommand::Next => list.set_page(list.query().page_index.saturating_add(1)),
        BrowseCommand::Prev => list.set_page(list.query().page_index.saturating_sub(1)),
        BrowseCommand::Size(size) => list.set_page_size(size).map_err(|err| err.to_string())?,
        BrowseCommand::Refresh => list.refresh(),
        BrowseCommand::Open(_) | BrowseCommand::Close | BrowseCommand::Help | BrowseCommand::Quit => {}
    }
    Ok(())
}

async fn render_list<S: ListSource, W: Write>(
    list: &ListController<S>,
    screen: Screen,
    output: OutputFormat,
    out: &mut W,
) -> CliResult<()> {
    let view = settle(list).await?;
    emit(out, &render_page(screen, &view, output)?)
}

async fn open<S: DetailSource, W: Write>(
    details: &DetailController<S>,
    screen: Screen,
    id: RowId,
    output: OutputFormat,
    out: &mut W,
) -> CliResult<()> {
    let mut views = details.subscribe();
    if details.select(id.clone()) == Selection::Closed {
        return emit(out, &format!("detail {id} closed\n"));
    }
    let view = views
        .wait_for(|view| !view.is_open() || DetailView::is_settled(view))
        .await
        .map_err(|_| CliError::from(CoreError::Closed))?
        .clone();
    match (view.record, view.error) {
        (Some(record), _) => emit(out, &render_detail(screen, &id, &record, output)?),
        (None, Some(message)) => emit(out, &format!("{message}\n")),
        (None, None) => Ok(()),
    }
}

fn emit<W: Write>(out: &mut W, text: &str) -> CliResult<()> {
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}
