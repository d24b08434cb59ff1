/*!
 * Placeholder tokens and the map that ties them back to the original markup.
 */

use std::fmt;

/// Namespace used for tokens unless the source already contains it
pub const DEFAULT_NAMESPACE: &str = "SHIELD";

/// Non-translatable construct replaced by a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `:ref:`display <label>``
    RefDisplay {
        role: String,
        display: String,
        label: String,
    },
    /// `:ref:`label``
    RefBare { role: String, label: String },
    /// `` `display <url>`_ `` or `` `display <url>`__ ``
    Url {
        display: String,
        url: String,
        suffix: String,
    },
    /// `|name|`, optionally followed by `_` or `__`
    Substitution { name: String, suffix: String },
    /// Inline literals, code-like roles and named hyperlink references
    RawInline,
}

impl PlaceholderKind {
    /// Short tag embedded in the token
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RefDisplay { .. } => "REF",
            Self::RefBare { .. } => "LBL",
            Self::Url { .. } => "URL",
            Self::Substitution { .. } => "SUB",
            Self::RawInline => "RAW",
        }
    }

    /// Human readable kind name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefDisplay { .. } => "reference-with-display",
            Self::RefBare { .. } => "reference-bare",
            Self::Url { .. } => "url-with-text",
            Self::Substitution { .. } => "substitution",
            Self::RawInline => "raw-inline-markup",
        }
    }
}

/// One protected construct
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Position in the map, also the number in the token
    pub index: usize,
    /// Canonical token text, e.g. `{{SHIELD_REF_0}}`
    pub token: String,
    /// Exact substring the token replaced
    pub original: String,
    pub kind: PlaceholderKind,
    /// False when the construct was unterminated in the source
    pub well_formed: bool,
    /// Relative offset (0.0..=1.0) of the token in the shielded text
    pub position: f32,
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} `{}`", self.index, self.kind.name(), self.original)
    }
}

/// Mapping from tokens to original markup for one protect/restore cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderMap {
    namespace: String,
    source: String,
    placeholders: Vec<Placeholder>,
}

impl PlaceholderMap {
    pub fn new(namespace: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            source: source.into(),
            placeholders: Vec::new(),
        }
    }

    /// Register a construct and return its token
    pub fn push(&mut self, kind: PlaceholderKind, original: &str, well_formed: bool) -> String {
        let index = self.placeholders.len();
        let token = format_token(&self.namespace, kind.tag(), index);
        self.placeholders.push(Placeholder {
            index,
            token: token.clone(),
            original: original.to_string(),
            kind,
            well_formed,
            position: 0.0,
        });
        token
    }

    /// Record where each token ended up in the final shielded text
    pub(crate) fn locate_tokens(&mut self, shielded: &str) {
        let length = shielded.len().max(1) as f32;
        for placeholder in &mut self.placeholders {
            if let Some(offset) = shielded.find(&placeholder.token) {
                placeholder.position = offset as f32 / length;
            }
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Text that was protected
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, index: usize) -> Option<&Placeholder> {
        self.placeholders.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.placeholders.iter()
    }

    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Placeholders whose construct was unterminated in the source
    pub fn malformed(&self) -> impl Iterator<Item = &Placeholder> {
        self.placeholders.iter().filter(|p| !p.well_formed)
    }
}

/// Canonical token text
pub fn format_token(namespace: &str, tag: &str, index: usize) -> String {
    format!("{{{{{}_{}_{}}}}}", namespace, tag, index)
}
