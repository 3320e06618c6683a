//! Interactive commands typed while `watch` is running
//!
//! One command per line:
//! - `q` / `r`: quit, refresh now
//! - `/text`: free-text search (`/` alone clears it)
//! - `node X`, `status X`: set the filter, no argument clears it
//! - `tag X`: toggle a label in the label filter
//! - `sort COL [asc|desc]`: sort; repeating the active column flips direction. `sort` alone clears
//! - `clear`: drop every filter and the search

use crate::view::{Column, Direction, SortSpec, ViewFilter};
use clap::ValueEnum;
use pvedash_proxy::LabelFilter;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Refresh,
    Search(String),
    Node(Option<String>),
    Status(Option<String>),
    ToggleTag(String),
    Sort(Option<(Column, Option<Direction>)>),
    Clear,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("unknown column: {0}")]
    Column(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// `Ok(None)` for a blank line
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(query) = line.strip_prefix('/') {
        return Ok(Some(Command::Search(query.trim().to_string())));
    }

    let mut words = line.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let single = |args: &[&str]| args.first().map(|a| a.to_string());

    let command = match (name, args.as_slice()) {
        ("q" | "quit", []) => Command::Quit,
        ("r" | "refresh", []) => Command::Refresh,
        ("clear", []) => Command::Clear,
        ("node", [] | [_]) => Command::Node(single(&args)),
        ("status", [] | [_]) => Command::Status(single(&args)),
        ("tag", [label]) => Command::ToggleTag(label.to_string()),
        ("tag", _) => return Err(CommandError::Usage("tag LABEL")),
        ("sort", []) => Command::Sort(None),
        ("sort", [column, rest @ ..]) if rest.len() <= 1 => {
            let column = Column::from_str(column, true).map_err(|_| CommandError::Column(column.to_string()))?;
            let direction = match rest.first().copied() {
                None => None,
                Some("asc") => Some(Direction::Asc),
                Some("desc") => Some(Direction::Desc),
                Some(_) => return Err(CommandError::Usage("sort COLUMN [asc|desc]")),
            };
            Command::Sort(Some((column, direction)))
        }
        ("sort", _) => return Err(CommandError::Usage("sort COLUMN [asc|desc]")),
        ("node", _) => return Err(CommandError::Usage("node [NAME]")),
        ("status", _) => return Err(CommandError::Usage("status [STATUS]")),
        _ => return Err(CommandError::Unknown(line.to_string())),
    };
    Ok(Some(command))
}

/// Filter and sort currently applied to the table
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub filter: ViewFilter,
    pub sort: Option<SortSpec>,
}

impl ViewState {
    /// Quit and Refresh do not touch the view
    pub fn apply(&mut self, command: &Command) {
        match command {
            Command::Quit | Command::Refresh => {}
            Command::Search(query) => self.filter.search = query.clone(),
            Command::Node(node) => self.filter.server.host = node.clone(),
            Command::Status(status) => self.filter.server.status = status.clone(),
            Command::ToggleTag(label) => self.toggle_label(label),
            Command::Sort(None) => self.sort = None,
            Command::Sort(Some((column, direction))) => {
                let direction = match (direction, self.sort) {
                    (Some(d), _) => *d,
                    (None, Some(active)) if active.column == *column => match active.direction {
                        Direction::Asc => Direction::Desc,
                        Direction::Desc => Direction::Asc,
                    },
                    (None, _) => Direction::Asc,
                };
                self.sort = Some(SortSpec { column: *column, direction });
            }
            Command::Clear => self.filter = ViewFilter::default(),
        }
    }

    fn toggle_label(&mut self, label: &str) {
        let mut labels: Vec<String> = self
            .filter
            .server
            .labels
            .as_ref()
            .map(|l| l.iter().map(str::to_string).collect())
            .unwrap_or_default();
        match labels.iter().position(|l| l == label) {
            Some(i) => {
                labels.remove(i);
            }
            None => labels.push(label.to_string()),
        }
        self.filter.server.labels = LabelFilter::new(labels);
    }
}

pub const HELP: &str =
    "[r] refresh  [q] quit  /text search  node X  status X  tag X  sort COL [asc|desc]  clear";
