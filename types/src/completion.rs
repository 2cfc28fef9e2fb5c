//! Wire model for the completion engine's request/response protocol.
//!
//! Requests are externally tagged (`{"Autocomplete": {...}}`), matching what
//! the engine expects on its stdin. Responses carry the raw editor-protocol
//! numeric `kind`; [`ResultEntry::kind`] converts at the boundary and returns
//! `None` for values outside the defined range — callers decide the fallback.

use serde::{Deserialize, Serialize};

/// A request body understood by the engine.
///
/// The engine dispatches on the outer tag. Only autocomplete is modeled;
/// other request families would be added as further variants.
#[derive(Debug, Clone, Serialize)]
pub enum EngineRequest {
    Autocomplete(AutocompleteRequest),
}

/// Parameters of one autocomplete query.
#[derive(Debug, Clone, Serialize)]
pub struct AutocompleteRequest {
    /// Absolute or editor-relative filename of the document being completed.
    pub filename: String,
    /// Text before the cursor, possibly truncated to the context window.
    pub before: String,
    /// Text after the cursor, possibly truncated to the context window.
    pub after: String,
    /// Whether `before` reaches the real start of the document.
    pub region_includes_beginning: bool,
    /// Whether `after` reaches the real end of the document.
    pub region_includes_end: bool,
    /// Upper bound on the number of results the engine should return.
    pub max_num_results: usize,
}

/// The engine's reply to an autocomplete request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AutocompleteResponse {
    #[serde(default)]
    pub docs: Vec<String>,
    /// The prefix the engine matched; completions replace it.
    pub old_prefix: String,
    pub results: Vec<ResultEntry>,
    /// Free-text notices from the engine (license nags, update hints).
    #[serde(default)]
    pub user_message: Vec<String>,
}

/// One completion candidate.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResultEntry {
    pub new_prefix: String,
    pub old_suffix: String,
    pub new_suffix: String,
    /// Raw editor-protocol completion kind; see [`ResultEntry::kind`].
    #[serde(default, rename = "kind")]
    pub raw_kind: Option<u64>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub documentation: Option<Documentation>,
    #[serde(default)]
    pub deprecated: Option<bool>,
}

impl ResultEntry {
    /// Typed completion kind, or `None` if the engine sent nothing or a
    /// value outside the editor-protocol range.
    #[must_use]
    pub fn kind(&self) -> Option<CompletionItemKind> {
        self.raw_kind.and_then(CompletionItemKind::from_editor)
    }

    /// The full insert text: `new_prefix` followed by `new_suffix`.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut text = self.new_prefix.clone();
        text.push_str(&self.new_suffix);
        text
    }
}

/// Documentation attached to a completion: either plain text or a
/// `{kind, value}` markup spec.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Documentation {
    Text(String),
    Markup { kind: String, value: String },
}

impl Documentation {
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Text(value) | Self::Markup { value, .. } => value,
        }
    }

    #[must_use]
    pub fn is_markdown(&self) -> bool {
        matches!(self, Self::Markup { kind, .. } if kind == "markdown")
    }
}

/// Editor-protocol completion item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionItemKind {
    Text = 1,
    Method = 2,
    Function = 3,
    Constructor = 4,
    Field = 5,
    Variable = 6,
    Class = 7,
    Interface = 8,
    Module = 9,
    Property = 10,
    Unit = 11,
    Value = 12,
    Enum = 13,
    Keyword = 14,
    Snippet = 15,
    Color = 16,
    File = 17,
    Reference = 18,
    Folder = 19,
    EnumMember = 20,
    Constant = 21,
    Struct = 22,
    Event = 23,
    Operator = 24,
    TypeParameter = 25,
}

impl CompletionItemKind {
    /// Convert from the editor-protocol numeric kind (1..=25).
    ///
    /// Returns `None` for values outside the defined range. Callers
    /// (boundary code) decide the fallback policy.
    #[must_use]
    pub fn from_editor(value: u64) -> Option<Self> {
        Some(match value {
            1 => Self::Text,
            2 => Self::Method,
            3 => Self::Function,
            4 => Self::Constructor,
            5 => Self::Field,
            6 => Self::Variable,
            7 => Self::Class,
            8 => Self::Interface,
            9 => Self::Module,
            10 => Self::Property,
            11 => Self::Unit,
            12 => Self::Value,
            13 => Self::Enum,
            14 => Self::Keyword,
            15 => Self::Snippet,
            16 => Self::Color,
            17 => Self::File,
            18 => Self::Reference,
            19 => Self::Folder,
            20 => Self::EnumMember,
            21 => Self::Constant,
            22 => Self::Struct,
            23 => Self::Event,
            24 => Self::Operator,
            25 => Self::TypeParameter,
            _ => return None,
        })
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Method => "method",
            Self::Function => "function",
            Self::Constructor => "constructor",
            Self::Field => "field",
            Self::Variable => "variable",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Module => "module",
            Self::Property => "property",
            Self::Unit => "unit",
            Self::Value => "value",
            Self::Enum => "enum",
            Self::Keyword => "keyword",
            Self::Snippet => "snippet",
            Self::Color => "color",
            Self::File => "file",
            Self::Reference => "reference",
            Self::Folder => "folder",
            Self::EnumMember => "enum member",
            Self::Constant => "constant",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Operator => "operator",
            Self::TypeParameter => "type parameter",
        }
    }
}
