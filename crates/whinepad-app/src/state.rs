// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{debug, info};

use crate::coerce::current_year;
use crate::dialog::{DialogKind, DialogMachine, DialogOutcome, DismissSource, OpenDialog};
use crate::filter::{FilterScope, matching_positions};
use crate::route::{Navigator, RouteState, RouteSync};
use crate::store::{CollectionStorage, RecordStore, StoreAction};
use crate::{FormDraft, Record, RecordId, Schema, Snapshot, SortState, SubscriberId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    /// One row from each column's first sample.
    #[default]
    FirstSample,
    /// One row per sample index.
    AllSamples,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionOptions {
    pub filter_scope: FilterScope,
    pub seed: Seed,
    /// Pins the year used for empty or unparseable year input.
    pub fallback_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub id: RecordId,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Search(String),
    SortBy(String),
    BeginCellEdit { row: usize, column: String },
    CommitCellEdit(String),
    CancelCellEdit,
    OpenAdd,
    OpenEdit(usize),
    OpenInfo(usize),
    OpenDelete(usize),
    SetField { key: String, value: String },
    Confirm,
    Dismiss(DismissSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CollectionChanged(usize),
    SortChanged { column: String, descending: bool },
    FilterChanged(String),
    RouteChanged(String),
    DialogOpened(DialogKind),
    DialogClosed(DialogKind),
    CellEditStarted { row: usize, column: String },
    CellEditClosed,
    FieldUpdated(String),
    Ignored(&'static str),
}

/// One editing session: the collection, its route, and the transient UI state
/// that decides which mutation the store receives next.
pub struct Session<S, N> {
    schema: Arc<Schema>,
    store: RecordStore<S>,
    route: RouteSync<N>,
    dialogs: DialogMachine,
    sort: SortState,
    filter: String,
    cell_edit: Option<CellEdit>,
    options: SessionOptions,
}

impl<S: CollectionStorage, N: Navigator> Session<S, N> {
    /// Loads the collection, decodes the path once, and reopens whatever dialog it names.
    pub fn open(
        schema: Arc<Schema>,
        storage: S,
        navigator: N,
        options: SessionOptions,
    ) -> Result<Self> {
        let year = options.fallback_year.unwrap_or_else(current_year);
        let defaults = match options.seed {
            Seed::FirstSample => vec![schema.initial_record(year)],
            Seed::AllSamples => schema.sample_records(year),
        };
        let mut store = RecordStore::open_with_defaults(Arc::clone(&schema), storage, defaults)?;
        if let Some(year) = options.fallback_year {
            store = store.with_fallback_year(year);
        }

        let route = RouteSync::load(navigator);
        let filter = route.state().filter_text().unwrap_or_default().to_owned();

        let mut session = Self {
            schema,
            store,
            route,
            dialogs: DialogMachine::default(),
            sort: SortState::default(),
            filter,
            cell_edit: None,
            options,
        };
        session.restore_route_dialog();
        info!(
            rows = session.store.snapshot().len(),
            path = %session.route.path(),
            "session opened"
        );
        Ok(session)
    }

    /// Ends the session and hands back its collaborators.
    pub fn close(mut self) -> (S, N) {
        self.dialogs.close();
        self.cell_edit = None;
        debug!("session closed");
        let Self { store, route, .. } = self;
        (store.into_storage(), route.into_navigator())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn storage(&self) -> &S {
        self.store.storage()
    }

    pub fn route(&self) -> &RouteState {
        self.route.state()
    }

    pub fn path(&self) -> String {
        self.route.path()
    }

    pub fn navigator(&self) -> &N {
        self.route.navigator()
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn filter_scope(&self) -> FilterScope {
        self.options.filter_scope
    }

    pub fn cell_edit(&self) -> Option<&CellEdit> {
        self.cell_edit.as_ref()
    }

    pub fn dialog(&self) -> Option<&OpenDialog> {
        self.dialogs.current()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Snapshot) + 'static) -> SubscriberId {
        self.store.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Collection positions that pass the current filter, with their records.
    pub fn visible_rows(&self) -> Vec<(usize, Record)> {
        let snapshot = self.store.snapshot();
        matching_positions(
            &self.schema,
            self.options.filter_scope,
            &snapshot,
            &self.filter,
        )
        .into_iter()
        .map(|index| (index, snapshot[index].clone()))
        .collect()
    }

    pub fn search_placeholder(&self) -> String {
        let count = self.store.snapshot().len();
        if count > 1 {
            format!("Search {count} items")
        } else {
            "Search".to_owned()
        }
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Result<Vec<SessionEvent>> {
        match command {
            SessionCommand::Search(text) => Ok(self.search(text)),
            SessionCommand::SortBy(column) => self.sort_by(column),
            SessionCommand::BeginCellEdit { row, column } => Ok(self.begin_cell_edit(row, column)),
            SessionCommand::CommitCellEdit(raw) => self.commit_cell_edit(raw),
            SessionCommand::CancelCellEdit => Ok(match self.cell_edit.take() {
                Some(_) => vec![SessionEvent::CellEditClosed],
                None => vec![SessionEvent::Ignored("no cell is being edited")],
            }),
            SessionCommand::OpenAdd => Ok(self.open_add()),
            SessionCommand::OpenEdit(row) => Ok(self.open_row_dialog(row, RowDialog::Edit)),
            SessionCommand::OpenInfo(row) => Ok(self.open_row_dialog(row, RowDialog::Info)),
            SessionCommand::OpenDelete(row) => Ok(self.open_row_dialog(row, RowDialog::Delete)),
            SessionCommand::SetField { key, value } => self.set_field(key, value),
            SessionCommand::Confirm => {
                let year = self.fallback_year();
                let outcome = self.dialogs.confirm(&self.schema, year);
                self.resolve(outcome)
            }
            SessionCommand::Dismiss(source) => {
                let outcome = self.dialogs.dismiss(source);
                self.resolve(outcome)
            }
        }
    }

    fn fallback_year(&self) -> i32 {
        self.options.fallback_year.unwrap_or_else(current_year)
    }

    /// While a routed dialog is open the path keeps naming it; the filter
    /// reaches the path when the dialog closes.
    fn search(&mut self, text: String) -> Vec<SessionEvent> {
        self.filter = text;
        let mut events = vec![SessionEvent::FilterChanged(self.filter.clone())];
        if self.routed_dialog_open() {
            debug!(filter = %self.filter, "filter route held behind open dialog");
        } else {
            events.push(SessionEvent::RouteChanged(self.settle_route()));
        }
        events
    }

    fn sort_by(&mut self, column: String) -> Result<Vec<SessionEvent>> {
        if self.schema.column(&column).is_none() {
            return Ok(vec![SessionEvent::Ignored("unknown column")]);
        }
        let next = self.sort.toggled(&column);
        let dispatched = self.store.dispatch(StoreAction::Sort {
            column: column.clone(),
            descending: next.descending,
        })?;
        self.sort = next;
        let mut events = vec![
            SessionEvent::SortChanged {
                column,
                descending: self.sort.descending,
            },
            SessionEvent::CollectionChanged(dispatched.snapshot.len()),
        ];
        events.extend(self.follow_dialog_record());
        Ok(events)
    }

    fn begin_cell_edit(&mut self, row: usize, column: String) -> Vec<SessionEvent> {
        let Some(id) = self.store.snapshot().id_at(row) else {
            return vec![SessionEvent::Ignored("row out of range")];
        };
        match self.schema.column(&column) {
            None => return vec![SessionEvent::Ignored("unknown column")],
            Some(config) if !config.kind.inline_editable() => {
                return vec![SessionEvent::Ignored("column is not editable inline")];
            }
            Some(_) => {}
        }
        self.cell_edit = Some(CellEdit {
            id,
            column: column.clone(),
        });
        vec![SessionEvent::CellEditStarted { row, column }]
    }

    fn commit_cell_edit(&mut self, raw: String) -> Result<Vec<SessionEvent>> {
        let Some(CellEdit { id, column }) = self.cell_edit.take() else {
            return Ok(vec![SessionEvent::Ignored("no cell is being edited")]);
        };
        let dispatched = self
            .store
            .dispatch(StoreAction::EditCell { id, column, raw })?;
        let mut events = vec![SessionEvent::CellEditClosed];
        if dispatched.applied {
            events.push(SessionEvent::CollectionChanged(dispatched.snapshot.len()));
            events.extend(self.follow_dialog_record());
        } else {
            events.push(SessionEvent::Ignored("edited row no longer exists"));
        }
        Ok(events)
    }

    fn open_add(&mut self) -> Vec<SessionEvent> {
        let form = FormDraft::blank(&self.schema, self.fallback_year());
        self.open_dialog(DialogKind::Add, Some(form), None, Some(RouteState::Add))
    }

    fn open_row_dialog(&mut self, row: usize, which: RowDialog) -> Vec<SessionEvent> {
        let snapshot = self.store.snapshot();
        let Some(record) = snapshot.records().get(row) else {
            debug!(row, "dialog requested for missing row");
            return vec![SessionEvent::Ignored("row out of range")];
        };
        let id = record.id;
        match which {
            RowDialog::Edit => {
                let form = FormDraft::prefilled(&self.schema, record);
                self.open_dialog(
                    DialogKind::Edit(id),
                    Some(form),
                    None,
                    Some(RouteState::Edit(row)),
                )
            }
            RowDialog::Info => {
                let form = FormDraft::readonly(&self.schema, record);
                self.open_dialog(
                    DialogKind::Info(id),
                    Some(form),
                    None,
                    Some(RouteState::Info(row)),
                )
            }
            RowDialog::Delete => {
                let name = record.display(&self.schema.title_column().key);
                let message = format!("Are you sure you want to delete \"{name}\"?");
                self.open_dialog(DialogKind::ConfirmDelete(id), None, Some(message), None)
            }
        }
    }

    fn open_dialog(
        &mut self,
        kind: DialogKind,
        form: Option<FormDraft>,
        message: Option<String>,
        route: Option<RouteState>,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(displaced) = self.dialogs.open(OpenDialog {
            kind,
            form,
            message,
        }) {
            events.push(SessionEvent::DialogClosed(displaced));
        }
        if self.cell_edit.take().is_some() {
            events.push(SessionEvent::CellEditClosed);
        }
        events.push(SessionEvent::DialogOpened(kind));

        let path = match route {
            Some(state) => Some(self.route.update(state)),
            None if self.route_names_dialog() => Some(self.settle_route()),
            None => None,
        };
        if let Some(path) = path {
            events.push(SessionEvent::RouteChanged(path));
        }
        events
    }

    fn set_field(&mut self, key: String, value: String) -> Result<Vec<SessionEvent>> {
        let Some(dialog) = self.dialogs.current_mut() else {
            bail!("no dialog is open -- use add or edit first");
        };
        let Some(form) = dialog.form.as_mut() else {
            bail!("this dialog has no form");
        };
        form.set(&self.schema, &key, &value)?;
        Ok(vec![SessionEvent::FieldUpdated(key)])
    }

    fn resolve(&mut self, outcome: DialogOutcome) -> Result<Vec<SessionEvent>> {
        match outcome {
            DialogOutcome::Ignored => Ok(vec![SessionEvent::Ignored("dialog did not close")]),
            DialogOutcome::Closed(kind) => Ok(self.after_close(kind)),
            DialogOutcome::Submitted(kind, action) => {
                let mut events = self.after_close(kind);
                let dispatched = self.store.dispatch(action)?;
                if dispatched.applied {
                    events.push(SessionEvent::CollectionChanged(dispatched.snapshot.len()));
                } else {
                    events.push(SessionEvent::Ignored("record no longer exists"));
                }
                Ok(events)
            }
        }
    }

    fn after_close(&mut self, kind: DialogKind) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::DialogClosed(kind)];
        if kind.is_routed() {
            events.push(SessionEvent::RouteChanged(self.settle_route()));
        }
        events
    }

    fn route_names_dialog(&self) -> bool {
        matches!(
            self.route.state(),
            RouteState::Add | RouteState::Edit(_) | RouteState::Info(_)
        )
    }

    fn routed_dialog_open(&self) -> bool {
        self.dialogs
            .current()
            .is_some_and(|dialog| dialog.kind.is_routed())
    }

    /// Re-encodes an edit or info route after the collection moved under it.
    /// A dialog whose record is gone is closed.
    fn follow_dialog_record(&mut self) -> Vec<SessionEvent> {
        let Some(kind) = self.dialogs.current().map(|dialog| dialog.kind) else {
            return Vec::new();
        };
        let id = match kind {
            DialogKind::Edit(id) | DialogKind::Info(id) => id,
            DialogKind::Add | DialogKind::ConfirmDelete(_) => return Vec::new(),
        };
        let Some(row) = self.store.snapshot().position(id) else {
            debug!(%id, "dialog record vanished; closing dialog");
            self.dialogs.close();
            return self.after_close(kind);
        };
        let state = match kind {
            DialogKind::Info(_) => RouteState::Info(row),
            _ => RouteState::Edit(row),
        };
        if self.route.state() == &state {
            return Vec::new();
        }
        vec![SessionEvent::RouteChanged(self.route.update(state))]
    }

    /// With no routed dialog open, the route reflects the filter alone.
    fn settle_route(&mut self) -> String {
        let state = RouteState::filter(&self.filter);
        self.route.update(state)
    }

    fn restore_route_dialog(&mut self) {
        let rows = self.store.snapshot().len();
        match self.route.state().clone() {
            RouteState::Add => {
                self.open_add();
            }
            RouteState::Edit(row) if row < rows => {
                self.open_row_dialog(row, RowDialog::Edit);
            }
            RouteState::Info(row) if row < rows => {
                self.open_row_dialog(row, RowDialog::Info);
            }
            RouteState::Edit(row) | RouteState::Info(row) => {
                debug!(row, rows, "route names a missing row; no dialog opened");
                self.settle_route();
            }
            RouteState::Closed | RouteState::Filter(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RowDialog {
    Edit,
    Info,
    Delete,
}
