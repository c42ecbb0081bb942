use std::fmt;

/// Outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text for the user, possibly several lines.
    Ok(String),
    /// One human-readable error line.
    Error(String),
    /// The user asked to leave.
    Exit,
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self::Ok(text.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The text carried by an `Ok` or `Error` reply.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Ok(text) | Self::Error(text) => Some(text),
            Self::Exit => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(text) => write!(f, "{text}"),
            Self::Error(text) => write!(f, "Error: {text}"),
            Self::Exit => write!(f, "Bye"),
        }
    }
}
