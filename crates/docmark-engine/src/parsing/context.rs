use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Grammar options for one parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Enables the documentation extensions (notes, tabs, xrefs, includes,
    /// code snippets, YAML header).
    pub extensions: bool,
    /// GitHub flavoured syntax: tables, fenced code, bare urls, strikethrough.
    pub gfm: bool,
    /// Legacy compatibility: ATX headings do not need a space after `#`.
    pub legacy: bool,
    /// Upper bound for loop rewriters and whole-tree rewrite passes.
    pub max_loop_count: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extensions: true,
            gfm: true,
            legacy: true,
            max_loop_count: 10,
        }
    }
}

/// A `[key]: href "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    pub href: String,
    pub title: Option<String>,
}

/// Per-document parsing state.
///
/// Created for one parse, filled during the block pass (link definitions)
/// and read during the inline pass. Never shared between documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownContext {
    pub options: ParseOptions,
    links: BTreeMap<String, LinkDefinition>,
}

impl MarkdownContext {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            links: BTreeMap::new(),
        }
    }

    /// Records a link definition. The first definition of a key wins.
    pub fn define_link(&mut self, key: &str, def: LinkDefinition) {
        self.links.entry(normalize_key(key)).or_insert(def);
    }

    pub fn link(&self, key: &str) -> Option<&LinkDefinition> {
        self.links.get(&normalize_key(key))
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &LinkDefinition)> {
        self.links.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Case-folds a reference key and collapses internal whitespace.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Ambient context a token was produced in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParseFlags {
    /// Produced by the inline pass.
    pub inline: bool,
    /// Below the top level of the document (list item, quote, tab content).
    pub nested: bool,
    /// Inside a blockquote.
    pub in_quote: bool,
    /// Inside link text, where links and bare urls are not recognized.
    pub in_link: bool,
}

impl ParseFlags {
    pub fn top_level(self) -> bool {
        !self.nested
    }
}
