// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::coerce::coerce_form;
use crate::{FormDraft, RecordId, Schema, StoreAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Add,
    Edit(RecordId),
    Info(RecordId),
    ConfirmDelete(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogChrome {
    pub header: &'static str,
    pub confirm_label: &'static str,
    pub modal: bool,
    /// Backdrop clicks and Escape close the dialog.
    pub extended_dismiss: bool,
    pub has_cancel: bool,
}

impl DialogKind {
    pub const fn chrome(self) -> DialogChrome {
        match self {
            Self::Add => DialogChrome {
                header: "Add new item",
                confirm_label: "Add",
                modal: true,
                extended_dismiss: true,
                has_cancel: true,
            },
            Self::Edit(_) => DialogChrome {
                header: "Edit item",
                confirm_label: "Save",
                modal: true,
                extended_dismiss: false,
                has_cancel: true,
            },
            Self::Info(_) => DialogChrome {
                header: "Item details",
                confirm_label: "ok",
                modal: true,
                extended_dismiss: true,
                has_cancel: false,
            },
            Self::ConfirmDelete(_) => DialogChrome {
                header: "Confirm deletion",
                confirm_label: "Delete",
                modal: true,
                extended_dismiss: false,
                has_cancel: true,
            },
        }
    }

    /// Add, edit and info dialogs are mirrored in the route.
    pub const fn is_routed(self) -> bool {
        !matches!(self, Self::ConfirmDelete(_))
    }

    pub const fn record(self) -> Option<RecordId> {
        match self {
            Self::Add => None,
            Self::Edit(id) | Self::Info(id) | Self::ConfirmDelete(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissSource {
    CancelButton,
    Backdrop,
    EscapeKey,
}

impl DismissSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cancel" => Some(Self::CancelButton),
            "backdrop" => Some(Self::Backdrop),
            "escape" | "esc" => Some(Self::EscapeKey),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDialog {
    pub kind: DialogKind,
    pub form: Option<FormDraft>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// No dialog open, or the dismiss source is disabled for this dialog.
    Ignored,
    Closed(DialogKind),
    Submitted(DialogKind, StoreAction),
}

/// At most one dialog exists; opening another replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogMachine {
    open: Option<OpenDialog>,
}

impl DialogMachine {
    pub fn current(&self) -> Option<&OpenDialog> {
        self.open.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut OpenDialog> {
        self.open.as_mut()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Returns the dialog that was displaced, if any.
    pub fn open(&mut self, dialog: OpenDialog) -> Option<DialogKind> {
        debug!(kind = ?dialog.kind, "dialog opened");
        self.open.replace(dialog).map(|previous| previous.kind)
    }

    pub fn confirm(&mut self, schema: &Schema, fallback_year: i32) -> DialogOutcome {
        let Some(dialog) = self.open.take() else {
            return DialogOutcome::Ignored;
        };
        let kind = dialog.kind;
        let form = dialog.form.map(FormDraft::into_values).unwrap_or_default();
        debug!(?kind, "dialog confirmed");

        match kind {
            DialogKind::Add => DialogOutcome::Submitted(
                kind,
                StoreAction::InsertNew {
                    fields: coerce_form(schema, &form, fallback_year),
                },
            ),
            DialogKind::Edit(id) => {
                DialogOutcome::Submitted(kind, StoreAction::ReplaceFromForm { id, form })
            }
            DialogKind::ConfirmDelete(id) => {
                DialogOutcome::Submitted(kind, StoreAction::Delete { id })
            }
            DialogKind::Info(_) => DialogOutcome::Closed(kind),
        }
    }

    pub fn dismiss(&mut self, source: DismissSource) -> DialogOutcome {
        let Some(dialog) = &self.open else {
            return DialogOutcome::Ignored;
        };
        let chrome = dialog.kind.chrome();
        let allowed = match source {
            DismissSource::CancelButton => chrome.has_cancel,
            DismissSource::Backdrop | DismissSource::EscapeKey => {
                chrome.modal && chrome.extended_dismiss
            }
        };
        if !allowed {
            debug!(kind = ?dialog.kind, ?source, "dismiss source disabled");
            return DialogOutcome::Ignored;
        }

        let kind = dialog.kind;
        self.open = None;
        debug!(?kind, ?source, "dialog dismissed");
        DialogOutcome::Closed(kind)
    }

    pub fn close(&mut self) -> Option<DialogKind> {
        self.open.take().map(|dialog| dialog.kind)
    }
}
