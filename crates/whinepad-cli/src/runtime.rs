// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use std::io::{BufRead, Write};
use tracing::warn;
use whinepad_app::{
    Align, CollectionStorage, ColumnKind, DismissSource, Navigator, OpenDialog, Scalar, Session,
    SessionCommand, SessionEvent,
};

const MAX_STARS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Route,
    Help,
    Quit,
    Session(SessionCommand),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "list" | "ls" => ShellCommand::List,
        "route" => ShellCommand::Route,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        "search" => ShellCommand::Session(SessionCommand::Search(rest.to_owned())),
        "sort" => ShellCommand::Session(SessionCommand::SortBy(required(verb, rest, "column")?)),
        "cell" => {
            let (row, column) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("cell needs a row and a column, for example `cell 0 name`"))?;
            ShellCommand::Session(SessionCommand::BeginCellEdit {
                row: parse_row(row)?,
                column: column.trim().to_owned(),
            })
        }
        "save" => ShellCommand::Session(SessionCommand::CommitCellEdit(rest.to_owned())),
        "cancel-cell" => ShellCommand::Session(SessionCommand::CancelCellEdit),
        "add" => ShellCommand::Session(SessionCommand::OpenAdd),
        "edit" => ShellCommand::Session(SessionCommand::OpenEdit(parse_row(rest)?)),
        "info" => ShellCommand::Session(SessionCommand::OpenInfo(parse_row(rest)?)),
        "delete" | "rm" => ShellCommand::Session(SessionCommand::OpenDelete(parse_row(rest)?)),
        "set" => {
            let (key, value) = match rest.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (rest, ""),
            };
            ShellCommand::Session(SessionCommand::SetField {
                key: required(verb, key, "column")?,
                value: value.to_owned(),
            })
        }
        "confirm" | "ok" => ShellCommand::Session(SessionCommand::Confirm),
        "dismiss" => {
            let source = if rest.is_empty() {
                DismissSource::CancelButton
            } else {
                DismissSource::parse(rest).ok_or_else(|| {
                    anyhow!("unknown dismiss source {rest:?}; use cancel, backdrop or escape")
                })?
            };
            ShellCommand::Session(SessionCommand::Dismiss(source))
        }
        unknown => bail!("unknown command {unknown:?}; type `help` for the command list"),
    };
    Ok(Some(command))
}

fn required(verb: &str, value: &str, what: &str) -> Result<String> {
    if value.is_empty() {
        bail!("{verb} needs a {what}");
    }
    Ok(value.to_owned())
}

fn parse_row(raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .with_context(|| format!("row must be a non-negative number, got {raw:?}"))
}

pub enum Step {
    Continue(String),
    Quit,
}

/// Line-oriented front end over a session.
pub struct Shell<S, N> {
    session: Session<S, N>,
}

impl<S: CollectionStorage, N: Navigator> Shell<S, N> {
    pub fn new(session: Session<S, N>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<S, N> {
        &self.session
    }

    pub fn into_session(self) -> Session<S, N> {
        self.session
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<Step> {
        let output = match command {
            ShellCommand::Quit => return Ok(Step::Quit),
            ShellCommand::Help => help_text().to_owned(),
            ShellCommand::Route => format!("{}\n", self.session.path()),
            ShellCommand::List => self.render_table(),
            ShellCommand::Session(command) => {
                let events = self.session.dispatch(command)?;
                self.render_events(&events)
            }
        };
        Ok(Step::Continue(output))
    }

    /// Renders the opening screen, including a dialog restored from the path.
    pub fn greeting(&self) -> String {
        let mut out = self.render_table();
        if let Some(dialog) = self.session.dialog() {
            out.push_str(&self.render_dialog(dialog));
        }
        out
    }

    fn render_events(&self, events: &[SessionEvent]) -> String {
        let mut out = String::new();
        let mut table = false;
        for event in events {
            match event {
                SessionEvent::CollectionChanged(_)
                | SessionEvent::SortChanged { .. }
                | SessionEvent::FilterChanged(_) => table = true,
                SessionEvent::CellEditStarted { row, column } => {
                    let current = self
                        .session
                        .snapshot()
                        .records()
                        .get(*row)
                        .map(|record| record.display(column))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "editing row {row} {column} (currently {current:?}); `save <value>` or `cancel-cell`\n"
                    ));
                }
                SessionEvent::DialogOpened(_) => {
                    if let Some(dialog) = self.session.dialog() {
                        out.push_str(&self.render_dialog(dialog));
                    }
                }
                SessionEvent::DialogClosed(kind) => {
                    out.push_str(&format!("closed {}\n", kind.chrome().header));
                }
                SessionEvent::FieldUpdated(key) => {
                    if let Some(dialog) = self.session.dialog() {
                        let value = dialog
                            .form
                            .as_ref()
                            .and_then(|form| form.get(key))
                            .unwrap_or_default();
                        out.push_str(&format!("{key} = {value:?}\n"));
                    }
                }
                SessionEvent::RouteChanged(path) => out.push_str(&format!("route {path}\n")),
                SessionEvent::CellEditClosed => {}
                SessionEvent::Ignored(reason) => out.push_str(&format!("ignored: {reason}\n")),
            }
        }
        if table {
            out.push_str(&self.render_table());
        }
        out
    }

    fn render_table(&self) -> String {
        let schema = self.session.schema();
        let columns: Vec<_> = schema.visible_columns().collect();
        let rows = self.session.visible_rows();
        let editing = self.session.cell_edit();

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        let mut header = vec!["#".to_owned()];
        header.extend(columns.iter().map(|column| {
            let marker = self.session.sort().marker_for(&column.key).unwrap_or("");
            format!("{}{marker}", column.label)
        }));
        grid.push(header);

        for (index, record) in &rows {
            let mut line = vec![index.to_string()];
            for column in &columns {
                let mut cell = match (column.kind, record.get(&column.key)) {
                    (ColumnKind::Rating, Some(value)) => stars(value),
                    (_, Some(value)) => value.display(),
                    (_, None) => String::new(),
                };
                if editing.is_some_and(|edit| edit.id == record.id && edit.column == column.key) {
                    cell = format!("[{cell}]");
                }
                line.push(cell);
            }
            grid.push(line);
        }

        let mut widths = vec![0usize; columns.len() + 1];
        for line in &grid {
            for (slot, cell) in widths.iter_mut().zip(line) {
                *slot = (*slot).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for line in &grid {
            let cells: Vec<String> = line
                .iter()
                .enumerate()
                .map(|(position, cell)| {
                    let align = match position {
                        0 => Align::Right,
                        _ => columns[position - 1].align,
                    };
                    pad(cell, widths[position], align)
                })
                .collect();
            out.push_str(cells.join(" | ").trim_end());
            out.push('\n');
        }
        if rows.is_empty() {
            out.push_str("(no matching records)\n");
        }
        out.push_str(&format!("{}\n", self.session.search_placeholder()));
        out
    }

    fn render_dialog(&self, dialog: &OpenDialog) -> String {
        let chrome = dialog.kind.chrome();
        let schema = self.session.schema();
        let mut out = format!("== {} ==\n", chrome.header);
        if let Some(message) = &dialog.message {
            out.push_str(message);
            out.push('\n');
        }
        if let Some(form) = &dialog.form {
            for (label, value) in form.rows(schema) {
                out.push_str(&format!("  {label}: {value}\n"));
            }
            if !form.is_readonly() {
                out.push_str("  (set <column> <value> to change a field)\n");
            }
        }
        let mut buttons = format!("[{}]", chrome.confirm_label);
        if chrome.has_cancel {
            buttons.push_str(" [Cancel]");
        }
        out.push_str(&buttons);
        out.push('\n');
        out
    }
}

fn stars(value: &Scalar) -> String {
    let filled = value.as_int().unwrap_or(0).clamp(0, MAX_STARS);
    (0..MAX_STARS)
        .map(|position| if position < filled { '★' } else { '☆' })
        .collect()
}

fn pad(cell: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{cell:<width$}"),
        Align::Right => format!("{cell:>width$}"),
        Align::Center => format!("{cell:^width$}"),
    }
}

pub fn help_text() -> &'static str {
    "commands:
  list                      show the table
  search <text>             filter rows (empty text clears)
  sort <column>             sort; repeat to flip direction
  cell <row> <column>       edit one cell inline
  save <value>              commit the inline edit
  cancel-cell               abandon the inline edit
  add                       open the add dialog
  edit <row>                open the edit dialog
  info <row>                open the details dialog
  delete <row>              ask to delete a row
  set <column> <value>      change a field in the open dialog
  confirm                   press the dialog's confirm button
  dismiss [cancel|backdrop|escape]
  route                     print the current path
  help                      this text
  quit
"
}

/// Reads commands until `quit` or end of input. Command errors are reported and
/// the loop carries on.
pub fn run_shell<S, N, R, W>(shell: &mut Shell<S, N>, input: R, mut output: W) -> Result<()>
where
    S: CollectionStorage,
    N: Navigator,
    R: BufRead,
    W: Write,
{
    output
        .write_all(shell.greeting().as_bytes())
        .context("write greeting")?;
    for line in input.lines() {
        let line = line.context("read command")?;
        let step = parse_command(&line).and_then(|command| match command {
            Some(command) => shell.execute(command),
            None => Ok(Step::Continue(String::new())),
        });
        match step {
            Ok(Step::Quit) => break,
            Ok(Step::Continue(text)) => output.write_all(text.as_bytes()).context("write output")?,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "command failed");
                writeln!(output, "error: {error:#}").context("write error")?;
            }
        }
        output.flush().context("flush output")?;
    }
    Ok(())
}
