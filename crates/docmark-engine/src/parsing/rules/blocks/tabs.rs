use crate::error::Result;
use crate::parsing::context::ParseFlags;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::{MatchResult, Matcher};
use crate::parsing::parser::BlockParser;
use crate::parsing::rules::{BlockRule, RuleId, trimmed_range};
use crate::parsing::token::{PendingInline, PendingShape, TokenKind, TokenRef};

use super::{atx_heading_start, bracket_text, indent};

/// A group of tabs opened by headings of the form
/// `## [Title](#tab/id/condition)`.
///
/// Every tab heading at the group's level starts a new item. A `---` line or
/// the end of input closes the group; tab groups nested under deeper headings
/// are skipped over and tokenized with the item content.
pub(crate) struct TabGroupRule {
    heading: Matcher,
    plain_heading: Matcher,
}

struct TabBounds<'t> {
    heading: MatchResult<'t>,
    start: usize,
    content_start: usize,
    end: usize,
}

impl TabGroupRule {
    pub(crate) fn new() -> Self {
        let id_char = Matcher::word_char() | Matcher::any_char_in("-.");
        Self {
            heading: indent()
                + Matcher::ch('#').repeat(1, 6).group("level")
                + Matcher::white_space_in_line().plus()
                + Matcher::ch('[')
                + bracket_text().group("title")
                + Matcher::string("](#tab/")
                + id_char.clone().plus().group("id")
                + (Matcher::ch('/') + id_char.plus().group("condition")).optional()
                + Matcher::ch(')')
                + Matcher::line_end(),
            plain_heading: atx_heading_start(),
        }
    }

    fn level(m: &MatchResult<'_>) -> usize {
        m.group("level").map_or(0, str::len)
    }
}

/// Level of a plain ATX heading line.
fn heading_level(line: &str) -> usize {
    line.trim_start_matches(' ')
        .bytes()
        .take_while(|b| *b == b'#')
        .count()
}

impl BlockRule for TabGroupRule {
    fn id(&self) -> RuleId {
        RuleId::TabGroup
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let text = cursor.rest();
        let Some(first) = self.heading.match_at(text, 0) else {
            return Ok(None);
        };
        let level = Self::level(&first);
        let mut tabs = vec![TabBounds {
            content_start: first.length,
            heading: first,
            start: 0,
            end: text.len(),
        }];
        let mut consumed = text.len();
        let mut nested: Vec<usize> = Vec::new();
        let mut offset = tabs[0].content_start;
        while offset < text.len() {
            let line_start = offset;
            let line = text[line_start..]
                .split_inclusive('\n')
                .next()
                .unwrap_or_default();
            offset += line.len();

            if let Some(m) = self.heading.match_at(text, line_start) {
                let tab_level = Self::level(&m);
                if tab_level == level && nested.is_empty() {
                    if let Some(last) = tabs.last_mut() {
                        last.end = line_start;
                    }
                    tabs.push(TabBounds {
                        content_start: line_start + m.length,
                        heading: m,
                        start: line_start,
                        end: text.len(),
                    });
                } else if tab_level > level && nested.last().is_none_or(|l| tab_level > *l) {
                    nested.push(tab_level);
                } else if tab_level < level {
                    if let Some(last) = tabs.last_mut() {
                        last.end = line_start;
                    }
                    consumed = line_start;
                    break;
                }
                continue;
            }

            if line.trim() == "---" {
                if nested.pop().is_none() {
                    if let Some(last) = tabs.last_mut() {
                        last.end = line_start;
                    }
                    consumed = offset;
                    break;
                }
                continue;
            }

            if nested.is_empty()
                && self.plain_heading.match_at(text, line_start).is_some()
                && heading_level(line) <= level
            {
                if let Some(last) = tabs.last_mut() {
                    last.end = line_start;
                }
                consumed = line_start;
                break;
            }
        }
        while text[consumed..].starts_with('\n') {
            consumed += 1;
        }

        let span = cursor.consume(consumed);
        let flags = ParseFlags {
            nested: true,
            ..parser.flags()
        };
        let mut ids = Vec::with_capacity(tabs.len());
        let mut items = Vec::with_capacity(tabs.len());
        for tab in &tabs {
            let id = tab.heading.group("id").unwrap_or_default().to_string();
            let condition = tab.heading.group("condition").map(str::to_string);
            let (title_at, _) = tab.heading.group_offset("title").unwrap_or_default();
            let raw_title = tab.heading.group("title").unwrap_or_default();
            let (trim_at, title_len) = trimmed_range(raw_title);
            let title_span = span.slice(tab.start + title_at + trim_at, title_len);
            let title = parser.token(
                RuleId::TabGroup,
                span.slice(tab.start, tab.heading.length),
                TokenKind::Pending(PendingInline {
                    shape: PendingShape::TabTitle,
                    spans: vec![title_span],
                }),
            );

            let content_span = span.slice(tab.content_start, tab.end - tab.content_start);
            let blocks = parser.tokenize_nested(&content_span, flags)?;
            let content = parser.token(
                RuleId::TabGroup,
                content_span,
                TokenKind::TabContent { children: blocks },
            );

            items.push(parser.token(
                RuleId::TabGroup,
                span.slice(tab.start, tab.end - tab.start),
                TokenKind::TabItem {
                    id: id.clone(),
                    condition,
                    visible: true,
                    children: vec![title, content],
                },
            ));
            ids.push(id);
        }

        log::debug!("{span}: tab group with {} tabs", items.len());
        Ok(Some(parser.token(
            RuleId::TabGroup,
            span,
            TokenKind::TabGroup {
                id: ids.join("+"),
                active: 0,
                children: items,
            },
        )))
    }
}
