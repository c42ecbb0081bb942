use std::fmt;

/// Who the prompt is for. Combined with reachability at render time so a
/// background task can redraw it without touching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLabel {
    pub user: String,
    pub elevated: bool,
}

impl PromptLabel {
    pub fn new(user: impl Into<String>, elevated: bool) -> Self {
        Self {
            user: user.into(),
            elevated,
        }
    }

    /// `[online] alice> `, or `#` instead of `>` while elevated.
    pub fn render(&self, reachable: bool) -> String {
        let link = if reachable { "online" } else { "offline" };
        format!("[{link}] {self} ")
    }
}

impl fmt::Display for PromptLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.elevated { '#' } else { '>' };
        write!(f, "{}{marker}", self.user)
    }
}
