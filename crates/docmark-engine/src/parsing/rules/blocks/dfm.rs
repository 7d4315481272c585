//! Documentation directives: YAML header, file inclusion and code snippets.

use relative_path::RelativePathBuf;

use crate::error::Result;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::{MatchResult, Matcher};
use crate::parsing::parser::BlockParser;
use crate::parsing::rules::{BlockRule, RuleId};
use crate::parsing::token::{
    CodeQuery, CodeSnippet, Include, IncludeState, LineRange, TokenKind, TokenRef,
};

use super::{bracket_text, indent};

/// `---` front matter at the very start of a document. The body must be a
/// YAML mapping; anything else is left to the other rules.
pub(crate) struct YamlHeaderRule {
    matcher: Matcher,
}

impl YamlHeaderRule {
    pub(crate) fn new() -> Self {
        let ws = Matcher::white_space_in_line().star();
        let close = (Matcher::string("---") | Matcher::string("..."))
            + ws.clone()
            + (Matcher::new_line() | Matcher::end_of_string());
        let body_line =
            Matcher::negative(close.clone()) + Matcher::rest_of_line() + Matcher::new_line();
        Self {
            matcher: Matcher::string("---")
                + ws
                + Matcher::new_line()
                + body_line.star().group("yaml")
                + close
                + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for YamlHeaderRule {
    fn id(&self) -> RuleId {
        RuleId::YamlHeader
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if cursor.pos() != 0 || parser.flags().nested {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let yaml = m.group("yaml").unwrap_or_default();
        match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
            Ok(serde_yaml::Value::Mapping(_)) => {}
            Ok(_) => return Ok(None),
            Err(err) => {
                log::debug!("{}: not a yaml header: {err}", cursor.peek_span(m.length));
                return Ok(None);
            }
        }
        let yaml = yaml.trim_end_matches('\n').to_string();
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::YamlHeader,
            span,
            TokenKind::YamlHeader { yaml },
        )))
    }
}

/// `[!include[title](path "hover")]`, shared by the block and inline rules.
pub(crate) fn include_directive() -> Matcher {
    let ws = Matcher::white_space_in_line();
    Matcher::string_ignore_case("[!include")
        + ws.clone().star()
        + Matcher::ch('[')
        + bracket_text().group("title")
        + Matcher::string("](")
        + ws.clone().star()
        + Matcher::ch('<').optional()
        + Matcher::any_char_not(" \t\n)>\"'").plus().group("path")
        + Matcher::ch('>').optional()
        + (ws.clone().plus()
            + (Matcher::ch('"') + Matcher::any_char_not("\"\n").star().group("hover") + Matcher::ch('"')
                | Matcher::ch('\'')
                    + Matcher::any_char_not("'\n").star().group("hover")
                    + Matcher::ch('\'')))
        .optional()
        + ws.star()
        + Matcher::string(")]")
}

/// Splits `path#anchor`.
pub fn parse_include_target(target: &str) -> (RelativePathBuf, Option<String>) {
    match target.split_once('#') {
        Some((path, anchor)) => (
            RelativePathBuf::from(path),
            (!anchor.is_empty()).then(|| anchor.to_string()),
        ),
        None => (RelativePathBuf::from(target), None),
    }
}

pub(crate) fn include_from(m: &MatchResult<'_>) -> Include {
    let (path, anchor) = parse_include_target(m.group("path").unwrap_or_default());
    Include {
        path,
        anchor,
        title: m.group("title").unwrap_or_default().trim().to_string(),
        hover_title: m.group("hover").map(str::to_string),
        state: IncludeState::Unexpanded,
        children: Vec::new(),
    }
}

/// An include directive alone on its line.
pub(crate) struct IncludeBlockRule {
    matcher: Matcher,
}

impl IncludeBlockRule {
    pub(crate) fn new() -> Self {
        Self {
            matcher: indent()
                + include_directive()
                + Matcher::line_end()
                + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for IncludeBlockRule {
    fn id(&self) -> RuleId {
        RuleId::IncludeBlock
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let include = include_from(&m);
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::IncludeBlock,
            span,
            TokenKind::IncludeBlock(include),
        )))
    }
}

/// `[!code-lang[name](path#L1-L5 "title")]` on its own line.
pub(crate) struct CodeSnippetRule {
    matcher: Matcher,
}

impl CodeSnippetRule {
    pub(crate) fn new() -> Self {
        let ws = Matcher::white_space_in_line();
        Self {
            matcher: indent()
                + Matcher::string_ignore_case("[!code")
                + (Matcher::ch('-')
                    + (Matcher::word_char() | Matcher::any_char_in("+#.-"))
                        .plus()
                        .group("lang"))
                .optional()
                + Matcher::ch('[')
                + bracket_text().group("name")
                + Matcher::string("](")
                + ws.clone().star()
                + Matcher::any_char_not(" \t\n)\"'").plus().group("path")
                + (ws.clone().plus()
                    + Matcher::ch('"')
                    + Matcher::any_char_not("\"\n").star().group("title")
                    + Matcher::ch('"'))
                .optional()
                + ws.star()
                + Matcher::string(")]")
                + Matcher::line_end()
                + Matcher::new_line().star(),
        }
    }
}

impl BlockRule for CodeSnippetRule {
    fn id(&self) -> RuleId {
        RuleId::CodeSnippet
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let (path, query) = parse_code_query(m.group("path").unwrap_or_default());
        let snippet = CodeSnippet {
            lang: m.group("lang").map(str::to_string),
            name: m.group("name").unwrap_or_default().to_string(),
            path,
            query,
            title: m.group("title").map(str::to_string),
        };
        let span = cursor.consume(m.length);
        Ok(Some(parser.token(
            RuleId::CodeSnippet,
            span,
            TokenKind::CodeSnippet(snippet),
        )))
    }
}

/// Splits a snippet target into the path and its line/tag query.
///
/// Fragment forms: `#L3`, `#L3-L7`, `#tag`. Query forms (`&`-separated):
/// `name=tag`, `range=1-3,5-`, `start=1`, `end=5`, `highlight=2-3`.
pub fn parse_code_query(target: &str) -> (RelativePathBuf, Option<CodeQuery>) {
    let Some(at) = target.find(['#', '?']) else {
        return (RelativePathBuf::from(target), None);
    };
    let (path, query) = target.split_at(at);
    let parsed = match query.split_at(1) {
        ("#", fragment) => parse_fragment(fragment),
        (_, params) => parse_params(params),
    };
    (RelativePathBuf::from(path), Some(parsed))
}

fn parse_fragment(fragment: &str) -> CodeQuery {
    if fragment.starts_with('L') {
        if let Some(range) = parse_range(fragment) {
            return CodeQuery {
                lines: vec![range],
                ..CodeQuery::default()
            };
        }
    }
    CodeQuery {
        tag: (!fragment.is_empty()).then(|| fragment.to_string()),
        ..CodeQuery::default()
    }
}

fn parse_params(params: &str) -> CodeQuery {
    let mut query = CodeQuery::default();
    let mut start = None;
    let mut end = None;
    for pair in params.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key.to_ascii_lowercase().as_str() {
            "name" | "tag" => query.tag = Some(value.to_string()),
            "range" => query.lines.extend(parse_ranges(value)),
            "start" => start = value.parse().ok(),
            "end" => end = value.parse().ok(),
            "highlight" => query.highlight.extend(parse_ranges(value)),
            other => log::debug!("ignoring code snippet parameter '{other}'"),
        }
    }
    if start.is_some() || end.is_some() {
        query.lines.push(LineRange {
            start: start.unwrap_or(1),
            end,
        });
    }
    query
}

fn parse_ranges(value: &str) -> impl Iterator<Item = LineRange> + '_ {
    value.split(',').filter_map(parse_range)
}

/// `3`, `3-7`, `5-`, optionally with `L` prefixes (`L3-L7`).
fn parse_range(range: &str) -> Option<LineRange> {
    let number = |s: &str| s.trim().trim_start_matches('L').parse::<usize>().ok();
    match range.split_once('-') {
        Some((start, "")) => Some(LineRange {
            start: number(start)?,
            end: None,
        }),
        Some((start, end)) => Some(LineRange {
            start: number(start)?,
            end: Some(number(end)?),
        }),
        None => {
            let line = number(range)?;
            Some(LineRange {
                start: line,
                end: Some(line),
            })
        }
    }
}
