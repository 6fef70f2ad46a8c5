use serde::{Deserialize, Serialize};

/// Identity of the changeset a payload belongs to.
///
/// Only used for temp-file names and log correlation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetRef {
    pub id: String,
    pub author: String,
}

impl ChangeSetRef {
    pub fn new(id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
        }
    }
}

/// Script text to hand to mongosh, as produced by the statement generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub changeset: ChangeSetRef,
    pub fragments: Vec<String>,
}

impl ScriptPayload {
    pub fn new<I, S>(changeset: ChangeSetRef, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changeset,
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a payload from statements, skipping ones without script text.
    pub fn from_statements<'a, I>(changeset: ChangeSetRef, statements: I) -> Self
    where
        I: IntoIterator<Item = &'a ScriptStatement>,
    {
        Self {
            changeset,
            fragments: statements
                .into_iter()
                .filter_map(ScriptStatement::fragment)
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn first_fragment(&self) -> Option<&str> {
        self.fragments.first().map(String::as_str)
    }

    /// Script file body: fragments with carriage returns removed, joined
    /// without separators and terminated by `;\n`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut body = String::new();
        for fragment in &self.fragments {
            body.extend(fragment.chars().filter(|ch| *ch != '\r'));
        }
        body.push_str(";\n");
        body
    }
}

/// A literal mongosh statement as declared in a changeset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStatement {
    script: String,
    end_delimiter: String,
}

impl ScriptStatement {
    pub fn new(script: impl Into<String>) -> Self {
        Self::with_delimiter(script, None::<String>)
    }

    pub fn with_delimiter(script: impl Into<String>, end_delimiter: Option<impl Into<String>>) -> Self {
        Self {
            script: script.into(),
            end_delimiter: end_delimiter.map_or_else(|| ";".to_string(), Into::into),
        }
    }

    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Delimiter with literal `\r` / `\n` escapes expanded.
    #[must_use]
    pub fn end_delimiter(&self) -> String {
        self.end_delimiter.replace("\\r", "\r").replace("\\n", "\n")
    }

    /// Statement text followed by its delimiter.
    #[must_use]
    pub fn to_js(&self) -> String {
        format!("{}{}", self.script, self.end_delimiter())
    }

    /// Payload fragment for this statement: trimmed, one trailing `;`
    /// removed. `None` for blank scripts.
    #[must_use]
    pub fn fragment(&self) -> Option<String> {
        let trimmed = self.script.trim();
        if trimmed.is_empty() {
            return None;
        }
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
        Some(trimmed.to_string())
    }
}
