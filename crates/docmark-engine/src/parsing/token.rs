//! # Token Model
//!
//! Tokens are immutable, position-tagged nodes shared as [`TokenRef`]
//! (`Arc<Token>`). Composite tokens own their children as a vector of
//! `TokenRef`; a tree is never mutated in place. A rewrite either keeps the
//! same `Arc` (no change, detectable with [`Arc::ptr_eq`]) or builds a new
//! token with [`Token::with_children`] / a new kind.
//!
//! [`TokenKind`] is a closed sum type; [`TokenKind::tag`] maps it to the
//! fieldless [`TokenTag`] used for rewriter type filters.

use std::sync::Arc;

use relative_path::RelativePathBuf;

use super::context::ParseFlags;
use super::rules::RuleId;
use super::source::SourceInfo;

pub type TokenRef = Arc<Token>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The rule that produced the token.
    pub rule: RuleId,
    pub flags: ParseFlags,
    pub source: SourceInfo,
    pub kind: TokenKind,
}

/// Table column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrefResolution {
    /// Not yet seen by a resolver.
    Unresolved,
    Resolved { href: String, name: Option<String> },
    /// The resolver did not know the uid; left for the renderer to flag.
    Missing,
}

/// A cross reference to be resolved by uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xref {
    pub uid: String,
    /// Raw query string after `?`, e.g. `displayProperty=fullName`.
    pub query: Option<String>,
    /// Literal title from `[title](xref:uid)`.
    pub title: Option<String>,
    /// Hard references fail the build when unresolved.
    pub throw_if_unresolved: bool,
    pub resolution: XrefResolution,
    /// Display content: the parsed title, or the resolved name.
    pub children: Vec<TokenRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeState {
    Unexpanded,
    Expanded,
    Failed(String),
}

/// A `[!include[title](path)]` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: RelativePathBuf,
    pub anchor: Option<String>,
    pub title: String,
    pub hover_title: Option<String>,
    pub state: IncludeState,
    /// Parsed content once expanded.
    pub children: Vec<TokenRef>,
}

/// An inclusive line range; `end: None` runs to the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: Option<usize>,
}

/// The query part of a code snippet path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeQuery {
    pub lines: Vec<LineRange>,
    pub tag: Option<String>,
    pub highlight: Vec<LineRange>,
}

/// A `[!code-lang[name](path?query "title")]` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnippet {
    pub lang: Option<String>,
    pub name: String,
    pub path: RelativePathBuf,
    pub query: Option<CodeQuery>,
    pub title: Option<String>,
}

/// The final token a pending token resolves into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingShape {
    Paragraph,
    Heading { level: u8, id: String },
    /// `widths[0]` is the header width, then one entry per body row; cell
    /// spans are stored row after row.
    Table { align: Vec<Align>, widths: Vec<usize> },
    TabTitle,
}

/// Block content whose inline tokenization waits for the second pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInline {
    pub shape: PendingShape,
    pub spans: Vec<SourceInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Document { children: Vec<TokenRef> },
    NewLine,
    Heading { level: u8, id: String, children: Vec<TokenRef> },
    Paragraph { children: Vec<TokenRef> },
    Code { lang: Option<String>, code: String, fenced: bool },
    CodeSnippet(CodeSnippet),
    Hr,
    Blockquote { children: Vec<TokenRef> },
    NoteMarker { kind: String },
    Note { kind: String, children: Vec<TokenRef> },
    /// Consecutive blocks split out of one source block; renders its children in order.
    BlockSplit { children: Vec<TokenRef> },
    List { ordered: bool, start: u32, children: Vec<TokenRef> },
    ListItem { loose: bool, children: Vec<TokenRef> },
    Html { raw: String },
    LinkDefinition { key: String, href: String, title: Option<String> },
    Table { align: Vec<Align>, children: Vec<TokenRef> },
    TableRow { header: bool, children: Vec<TokenRef> },
    TableCell { children: Vec<TokenRef> },
    TabGroup { id: String, active: usize, children: Vec<TokenRef> },
    TabItem { id: String, condition: Option<String>, visible: bool, children: Vec<TokenRef> },
    TabTitle { children: Vec<TokenRef> },
    TabContent { children: Vec<TokenRef> },
    YamlHeader { yaml: String },
    IncludeBlock(Include),
    Pending(PendingInline),
    Text { content: String },
    Escape { ch: char },
    Strong { children: Vec<TokenRef> },
    Em { children: Vec<TokenRef> },
    Del { children: Vec<TokenRef> },
    CodeSpan { code: String },
    Link { href: String, title: Option<String>, children: Vec<TokenRef> },
    Image { src: String, alt: String, title: Option<String> },
    Br,
    Tag { raw: String },
    Xref(Xref),
    IncludeInline(Include),
}

/// Fieldless mirror of [`TokenKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTag {
    Document,
    NewLine,
    Heading,
    Paragraph,
    Code,
    CodeSnippet,
    Hr,
    Blockquote,
    NoteMarker,
    Note,
    BlockSplit,
    List,
    ListItem,
    Html,
    LinkDefinition,
    Table,
    TableRow,
    TableCell,
    TabGroup,
    TabItem,
    TabTitle,
    TabContent,
    YamlHeader,
    IncludeBlock,
    Pending,
    Text,
    Escape,
    Strong,
    Em,
    Del,
    CodeSpan,
    Link,
    Image,
    Br,
    Tag,
    Xref,
    IncludeInline,
}

impl TokenKind {
    pub fn tag(&self) -> TokenTag {
        match self {
            TokenKind::Document { .. } => TokenTag::Document,
            TokenKind::NewLine => TokenTag::NewLine,
            TokenKind::Heading { .. } => TokenTag::Heading,
            TokenKind::Paragraph { .. } => TokenTag::Paragraph,
            TokenKind::Code { .. } => TokenTag::Code,
            TokenKind::CodeSnippet(_) => TokenTag::CodeSnippet,
            TokenKind::Hr => TokenTag::Hr,
            TokenKind::Blockquote { .. } => TokenTag::Blockquote,
            TokenKind::NoteMarker { .. } => TokenTag::NoteMarker,
            TokenKind::Note { .. } => TokenTag::Note,
            TokenKind::BlockSplit { .. } => TokenTag::BlockSplit,
            TokenKind::List { .. } => TokenTag::List,
            TokenKind::ListItem { .. } => TokenTag::ListItem,
            TokenKind::Html { .. } => TokenTag::Html,
            TokenKind::LinkDefinition { .. } => TokenTag::LinkDefinition,
            TokenKind::Table { .. } => TokenTag::Table,
            TokenKind::TableRow { .. } => TokenTag::TableRow,
            TokenKind::TableCell { .. } => TokenTag::TableCell,
            TokenKind::TabGroup { .. } => TokenTag::TabGroup,
            TokenKind::TabItem { .. } => TokenTag::TabItem,
            TokenKind::TabTitle { .. } => TokenTag::TabTitle,
            TokenKind::TabContent { .. } => TokenTag::TabContent,
            TokenKind::YamlHeader { .. } => TokenTag::YamlHeader,
            TokenKind::IncludeBlock(_) => TokenTag::IncludeBlock,
            TokenKind::Pending(_) => TokenTag::Pending,
            TokenKind::Text { .. } => TokenTag::Text,
            TokenKind::Escape { .. } => TokenTag::Escape,
            TokenKind::Strong { .. } => TokenTag::Strong,
            TokenKind::Em { .. } => TokenTag::Em,
            TokenKind::Del { .. } => TokenTag::Del,
            TokenKind::CodeSpan { .. } => TokenTag::CodeSpan,
            TokenKind::Link { .. } => TokenTag::Link,
            TokenKind::Image { .. } => TokenTag::Image,
            TokenKind::Br => TokenTag::Br,
            TokenKind::Tag { .. } => TokenTag::Tag,
            TokenKind::Xref(_) => TokenTag::Xref,
            TokenKind::IncludeInline(_) => TokenTag::IncludeInline,
        }
    }

    fn children(&self) -> &[TokenRef] {
        match self {
            TokenKind::Document { children }
            | TokenKind::Heading { children, .. }
            | TokenKind::Paragraph { children }
            | TokenKind::Blockquote { children }
            | TokenKind::Note { children, .. }
            | TokenKind::BlockSplit { children }
            | TokenKind::List { children, .. }
            | TokenKind::ListItem { children, .. }
            | TokenKind::Table { children, .. }
            | TokenKind::TableRow { children, .. }
            | TokenKind::TableCell { children }
            | TokenKind::TabGroup { children, .. }
            | TokenKind::TabItem { children, .. }
            | TokenKind::TabTitle { children }
            | TokenKind::TabContent { children }
            | TokenKind::Strong { children }
            | TokenKind::Em { children }
            | TokenKind::Del { children }
            | TokenKind::Link { children, .. } => children,
            TokenKind::Xref(xref) => &xref.children,
            TokenKind::IncludeBlock(include) | TokenKind::IncludeInline(include) => {
                &include.children
            }
            TokenKind::NewLine
            | TokenKind::Code { .. }
            | TokenKind::CodeSnippet(_)
            | TokenKind::Hr
            | TokenKind::NoteMarker { .. }
            | TokenKind::Html { .. }
            | TokenKind::LinkDefinition { .. }
            | TokenKind::YamlHeader { .. }
            | TokenKind::Pending(_)
            | TokenKind::Text { .. }
            | TokenKind::Escape { .. }
            | TokenKind::CodeSpan { .. }
            | TokenKind::Image { .. }
            | TokenKind::Br
            | TokenKind::Tag { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<TokenRef>> {
        match self {
            TokenKind::Document { children }
            | TokenKind::Heading { children, .. }
            | TokenKind::Paragraph { children }
            | TokenKind::Blockquote { children }
            | TokenKind::Note { children, .. }
            | TokenKind::BlockSplit { children }
            | TokenKind::List { children, .. }
            | TokenKind::ListItem { children, .. }
            | TokenKind::Table { children, .. }
            | TokenKind::TableRow { children, .. }
            | TokenKind::TableCell { children }
            | TokenKind::TabGroup { children, .. }
            | TokenKind::TabItem { children, .. }
            | TokenKind::TabTitle { children }
            | TokenKind::TabContent { children }
            | TokenKind::Strong { children }
            | TokenKind::Em { children }
            | TokenKind::Del { children }
            | TokenKind::Link { children, .. } => Some(children),
            TokenKind::Xref(xref) => Some(&mut xref.children),
            TokenKind::IncludeBlock(include) | TokenKind::IncludeInline(include) => {
                Some(&mut include.children)
            }
            TokenKind::NewLine
            | TokenKind::Code { .. }
            | TokenKind::CodeSnippet(_)
            | TokenKind::Hr
            | TokenKind::NoteMarker { .. }
            | TokenKind::Html { .. }
            | TokenKind::LinkDefinition { .. }
            | TokenKind::YamlHeader { .. }
            | TokenKind::Pending(_)
            | TokenKind::Text { .. }
            | TokenKind::Escape { .. }
            | TokenKind::CodeSpan { .. }
            | TokenKind::Image { .. }
            | TokenKind::Br
            | TokenKind::Tag { .. } => None,
        }
    }
}

impl Token {
    pub fn new(rule: RuleId, flags: ParseFlags, source: SourceInfo, kind: TokenKind) -> TokenRef {
        Arc::new(Token {
            rule,
            flags,
            source,
            kind,
        })
    }

    pub fn tag(&self) -> TokenTag {
        self.kind.tag()
    }

    /// Child tokens in order; empty for leaves.
    pub fn children(&self) -> &[TokenRef] {
        self.kind.children()
    }

    /// A copy of this token with its children replaced.
    ///
    /// Leaves are copied unchanged.
    pub fn with_children(&self, children: Vec<TokenRef>) -> TokenRef {
        let mut kind = self.kind.clone();
        if let Some(slot) = kind.children_mut() {
            *slot = children;
        }
        Arc::new(Token {
            rule: self.rule,
            flags: self.flags,
            source: self.source.clone(),
            kind,
        })
    }

    /// A copy of this token with a new kind, keeping rule, flags and source.
    pub fn with_kind(&self, kind: TokenKind) -> TokenRef {
        Arc::new(Token {
            rule: self.rule,
            flags: self.flags,
            source: self.source.clone(),
            kind,
        })
    }

    /// Concatenated text content of the subtree, as a renderer would show it.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            TokenKind::Text { content } => out.push_str(content),
            TokenKind::Escape { ch } => out.push(*ch),
            TokenKind::CodeSpan { code } => out.push_str(code),
            TokenKind::Image { alt, .. } => out.push_str(alt),
            TokenKind::Xref(xref) if xref.children.is_empty() => out.push_str(&xref.uid),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}
