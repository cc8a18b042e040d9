use ratatui::widgets::ListState;

use crate::aggregator::{ScrapeKind, SearchParams, Status, Update};
use crate::source::{Record, SessionId};

/// Fields of the search form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Kind,
    Domain,
    Location,
    Count,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Kind => Field::Domain,
            Field::Domain => Field::Location,
            Field::Location => Field::Count,
            Field::Count => Field::Kind,
        }
    }

    fn previous(self) -> Self {
        match self {
            Field::Kind => Field::Count,
            Field::Domain => Field::Kind,
            Field::Location => Field::Domain,
            Field::Count => Field::Location,
        }
    }
}

/// The editable search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub kind: ScrapeKind,
    pub domain: String,
    pub location: String,
    /// Kept as text while editing; only digits are accepted.
    pub count: String,
    pub focus: Field,
}

impl SearchForm {
    pub fn new(default_count: u32) -> Self {
        Self {
            kind: ScrapeKind::Hackathons,
            domain: String::new(),
            location: String::new(),
            count: default_count.to_string(),
            focus: Field::Domain,
        }
    }

    pub fn params(&self) -> SearchParams {
        SearchParams {
            kind: self.kind,
            domain: self.domain.clone(),
            location: self.location.clone(),
            count: self.count.parse().unwrap_or(0),
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn toggle_kind(&mut self) {
        self.kind = match self.kind {
            ScrapeKind::Hackathons => ScrapeKind::Certificates,
            ScrapeKind::Certificates => ScrapeKind::Hackathons,
        };
    }

    /// Type a character into the focused field.
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Field::Kind if c == ' ' => self.toggle_kind(),
            Field::Kind => {}
            Field::Domain => self.domain.push(c),
            Field::Location => self.location.push(c),
            Field::Count if c.is_ascii_digit() && self.count.len() < 4 => self.count.push(c),
            Field::Count => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            Field::Kind => {}
            Field::Domain => {
                self.domain.pop();
            }
            Field::Location => {
                self.location.pop();
            }
            Field::Count => {
                self.count.pop();
            }
        }
    }
}

pub struct App {
    /// The aggregate as last published, newest first.
    pub items: Vec<Record>,
    pub status: Status,
    pub session: Option<SessionId>,
    /// Sources opened by the current session.
    pub sources: usize,
    /// Sources of the current session that failed.
    pub failed_sources: usize,
    pub form: SearchForm,
    /// Whether keystrokes go to the search form.
    pub editing: bool,
    /// Kind of the last submitted search, if any.
    pub last_search: Option<ScrapeKind>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
}

impl App {
    pub fn new(default_count: u32) -> Self {
        Self {
            items: Vec::new(),
            status: Status::Idle,
            session: None,
            sources: 0,
            failed_sources: 0,
            form: SearchForm::new(default_count),
            editing: false,
            last_search: None,
            list_state: ListState::default(),
            quit: false,
        }
    }

    /// Replace the displayed state with a fresh snapshot from the aggregator.
    pub fn apply_update(&mut self, update: Update) {
        self.items = update.records;
        self.status = update.status;
        self.session = update.session;
        self.sources = update.sources;
        self.failed_sources = update.failed_sources;

        // Keep the selection inside the list as it grows or is reset.
        match (self.list_state.selected(), self.items.len()) {
            (Some(_), 0) => self.list_state.select(None),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// Leave edit mode and return the parameters to search with.
    pub fn submit(&mut self) -> SearchParams {
        self.editing = false;
        let params = self.form.params();
        self.last_search = Some(params.kind);
        params
    }

    /// One-line description of where collection stands.
    pub fn status_line(&self) -> String {
        let n = self.items.len();
        match self.status {
            Status::Collecting => format!("Searching... {n} hackathons scraped so far"),
            Status::Completed if n == 0 && self.sources > 0 && self.failed_sources == self.sources => {
                "Failed to start stream: every provider was unreachable".to_string()
            }
            Status::Completed if n == 0 => {
                "No results found. Try adjusting your search filters.".to_string()
            }
            Status::Completed => format!("Scraping completed: found {n} hackathons"),
            Status::Idle if self.last_search == Some(ScrapeKind::Certificates) => {
                "Certificate listings are not streamed".to_string()
            }
            Status::Idle => "Press / to edit the search, s to start it".to_string(),
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(self.items.len() - 1));
        }
    }
}
