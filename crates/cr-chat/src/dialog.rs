use std::fmt;

use crate::error::{ChatError, Result};

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Turn {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Turn::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Turn::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An ordered conversation, completed from its final user turn.
pub type Dialog = Vec<Turn>;

/// Check that `dialog` is an optional leading system turn followed by
/// strictly alternating user/assistant turns that end with a user turn.
///
/// `index` is the dialog's position in the batch and is reported in errors.
pub fn validate(index: usize, dialog: &[Turn]) -> Result<()> {
    let malformed = |position: usize, reason: String| ChatError::MalformedDialog {
        dialog: index,
        position,
        reason,
    };

    if dialog.is_empty() {
        return Err(malformed(0, "dialog is empty".to_string()));
    }

    let offset = usize::from(dialog[0].role == Role::System);
    for (position, turn) in dialog.iter().enumerate().skip(offset) {
        let expected = if (position - offset) % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
        match (expected, turn.role) {
            (Role::User, Role::User) | (Role::Assistant, Role::Assistant) => {}
            (_, Role::System) => {
                return Err(malformed(
                    position,
                    "system turn is only allowed first".to_string(),
                ))
            }
            (expected, found) => {
                return Err(malformed(
                    position,
                    format!("expected {} turn, found {}", expected, found),
                ))
            }
        }
    }

    match dialog.last().map(Turn::role) {
        Some(Role::User) => Ok(()),
        Some(Role::System) => Err(malformed(dialog.len(), "dialog has no user turn".to_string())),
        _ => Err(malformed(
            dialog.len() - 1,
            "dialog must end with a user turn".to_string(),
        )),
    }
}
