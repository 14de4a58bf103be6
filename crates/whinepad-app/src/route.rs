// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;
use url::form_urlencoded;

use crate::coerce::parse_leading_int;

/// The single active dialog or filter, mirrored to a `/action/id` path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouteState {
    #[default]
    Closed,
    Add,
    Edit(usize),
    Info(usize),
    Filter(String),
}

impl RouteState {
    /// An empty filter is no filter at all.
    pub fn filter(text: &str) -> Self {
        if text.is_empty() {
            Self::Closed
        } else {
            Self::Filter(text.to_owned())
        }
    }

    pub const fn action(&self) -> Option<&'static str> {
        match self {
            Self::Closed => None,
            Self::Add => Some("add"),
            Self::Edit(_) => Some("edit"),
            Self::Info(_) => Some("info"),
            Self::Filter(_) => Some("filter"),
        }
    }

    pub fn filter_text(&self) -> Option<&str> {
        match self {
            Self::Filter(text) => Some(text),
            _ => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Closed => "/".to_owned(),
            Self::Add => "/add".to_owned(),
            Self::Edit(row) => format!("/edit/{row}"),
            Self::Info(row) => format!("/info/{row}"),
            Self::Filter(text) if text.is_empty() => "/".to_owned(),
            Self::Filter(text) => {
                let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
                format!("/filter/{encoded}")
            }
        }
    }

    /// Anything that is not a well-formed `/add`, `/edit/<n>`, `/info/<n>` or
    /// `/filter/<text>` decodes to `Closed`.
    pub fn decode(path: &str) -> Self {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut segments = path.split('/');
        let action = segments.next().unwrap_or_default();
        let id = segments.next();

        match (action, id) {
            ("add", _) => Self::Add,
            ("edit", Some(id)) => row_index(id).map_or(Self::Closed, Self::Edit),
            ("info", Some(id)) => row_index(id).map_or(Self::Closed, Self::Info),
            ("filter", Some(id)) => Self::filter(&decode_component(id)),
            _ => Self::Closed,
        }
    }
}

fn row_index(raw: &str) -> Option<usize> {
    parse_leading_int(raw).and_then(|value| usize::try_from(value).ok())
}

fn decode_component(raw: &str) -> String {
    // Reserved form separators are literal inside a path segment.
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Where the path lives. Writes replace the current entry and never add history.
pub trait Navigator {
    fn current_path(&self) -> String;
    fn replace_path(&mut self, path: &str);
}

/// In-process history stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNavigator {
    entries: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![initial.to_owned()],
        }
    }

    /// A user-initiated navigation, which does add an entry.
    pub fn push_path(&mut self, path: &str) {
        self.entries.push(path.to_owned());
    }

    pub fn history_len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.entries.last().cloned().unwrap_or_else(|| "/".to_owned())
    }

    fn replace_path(&mut self, path: &str) {
        match self.entries.last_mut() {
            Some(last) => *last = path.to_owned(),
            None => self.entries.push(path.to_owned()),
        }
    }
}

/// Owns the route state and keeps the navigator's path in step with it.
#[derive(Debug)]
pub struct RouteSync<N> {
    navigator: N,
    state: RouteState,
}

impl<N: Navigator> RouteSync<N> {
    /// Reads the path exactly once.
    pub fn load(navigator: N) -> Self {
        let path = navigator.current_path();
        let state = RouteState::decode(&path);
        debug!(%path, ?state, "route decoded");
        Self { navigator, state }
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    pub fn path(&self) -> String {
        self.navigator.current_path()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn into_navigator(self) -> N {
        self.navigator
    }

    /// Returns the path that was written.
    pub fn update(&mut self, state: RouteState) -> String {
        let state = match state {
            RouteState::Filter(text) => RouteState::filter(&text),
            other => other,
        };
        let path = state.encode();
        self.navigator.replace_path(&path);
        debug!(%path, "route replaced");
        self.state = state;
        path
    }

    pub fn clear(&mut self) -> String {
        self.update(RouteState::Closed)
    }
}
