//! Chat front-end: maps incoming messages to replies and runs exports on request.

use std::fmt;
use std::path::PathBuf;

use coinsheet_export::{Exporter, QuerySource, SpecExportOptions};
use tracing::{info, warn};

/// Label of the single button on the reply keyboard.
pub const C_BUTTON_DOWNLOAD: &str = "Download";
pub const C_TEXT_WELCOME: &str = "Welcome!.";
pub const C_TEXT_UNKNOWN_COMMAND: &str = "I don't know that command.";
pub const C_TEXT_CHOOSE_ACTION: &str = "Hello! Choose an action:";

/// Outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text {
        text: String,
        keyboard: Option<Vec<String>>,
    },
    /// Workbook attachment.
    Document {
        path: PathBuf,
        keyboard: Option<Vec<String>>,
    },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyboard = match self {
            Self::Text { text, keyboard } => {
                write!(f, "{text}")?;
                keyboard
            }
            Self::Document { path, keyboard } => {
                write!(f, "[document] {}", path.display())?;
                keyboard
            }
        };
        if let Some(l_buttons) = keyboard {
            write!(f, " [{}]", l_buttons.join("] ["))?;
        }
        Ok(())
    }
}

fn derive_main_keyboard() -> Option<Vec<String>> {
    Some(vec![C_BUTTON_DOWNLOAD.to_string()])
}

/// Command name of a `/command` message, without arguments or `@bot` suffix.
pub fn parse_command(text: &str) -> Option<&str> {
    let c_body = text.strip_prefix('/')?;
    let c_word = c_body.split_whitespace().next().unwrap_or_default();
    Some(c_word.split('@').next().unwrap_or_default())
}

/// One conversation bound to a query source.
pub struct ChatSession<S: QuerySource> {
    source: S,
    query: String,
    options: SpecExportOptions,
}

impl<S: QuerySource> ChatSession<S> {
    pub fn new(source: S, query: impl Into<String>, options: SpecExportOptions) -> Self {
        Self {
            source,
            query: query.into(),
            options,
        }
    }

    /// Reply to one incoming message; blank messages get none.
    pub fn handle(&mut self, message: &str) -> Option<Reply> {
        let c_message = message.trim();
        if c_message.is_empty() {
            return None;
        }

        if let Some(c_command) = parse_command(c_message) {
            return Some(match c_command {
                "start" => Reply::Text {
                    text: C_TEXT_WELCOME.to_string(),
                    keyboard: derive_main_keyboard(),
                },
                _ => Reply::Text {
                    text: C_TEXT_UNKNOWN_COMMAND.to_string(),
                    keyboard: None,
                },
            });
        }

        if c_message == C_BUTTON_DOWNLOAD {
            return Some(self.handle_download());
        }

        Some(Reply::Text {
            text: C_TEXT_CHOOSE_ACTION.to_string(),
            keyboard: derive_main_keyboard(),
        })
    }

    fn handle_download(&mut self) -> Reply {
        let mut exporter = Exporter::new(self.options.clone());
        match exporter.run(&mut self.source, &self.query) {
            Ok(outcome) => {
                info!(path = %outcome.path.display(), "sending export");
                Reply::Document {
                    path: outcome.path,
                    keyboard: derive_main_keyboard(),
                }
            }
            Err(err) => {
                warn!(error = %err, "download request failed");
                Reply::Text {
                    text: format!("Export failed: {}", err.kind()),
                    keyboard: derive_main_keyboard(),
                }
            }
        }
    }
}
