use crate::error::Result;
use crate::parsing::context::ParseFlags;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::Matcher;
use crate::parsing::parser::BlockParser;
use crate::parsing::rules::{BlockRule, RuleId};
use crate::parsing::source::SourceInfo;
use crate::parsing::token::{TokenKind, TokenRef};

use super::{atx_heading_start, fence_open, hr_line, indent, quote_start};

/// Bullet (`*`, `+`, `-`) or ordered (`1.`) list.
///
/// Items are found line by line: a bullet indented less than the current
/// item's content starts a new item, deeper lines continue the item, and a
/// non-blank line directly after item text is a lazy continuation unless it
/// starts another block.
pub(crate) struct ListRule {
    bullet: Matcher,
    interrupt: Matcher,
}

struct ItemBounds {
    start: usize,
    content_indent: usize,
}

impl ListRule {
    pub(crate) fn new() -> Self {
        let bullet = indent()
            + (Matcher::any_char_in("*+-") | Matcher::digit().repeat(1, 9) + Matcher::ch('.'))
                .group("bullet")
            + (Matcher::white_space_in_line().plus()
                | Matcher::lookahead(Matcher::new_line() | Matcher::end_of_string()));
        Self {
            bullet,
            interrupt: hr_line() | atx_heading_start() | fence_open() | quote_start(),
        }
    }
}

fn is_ordered(bullet: &str) -> bool {
    bullet.starts_with(|c: char| c.is_ascii_digit())
}

/// Removes the bullet from the first line and up to `indent` spaces from the
/// following ones.
fn item_content(text: &str, indent: usize) -> String {
    let mut lines = text.trim_end_matches('\n').split('\n');
    let mut content = String::with_capacity(text.len());
    if let Some(first) = lines.next() {
        content.push_str(first.get(indent..).unwrap_or_default());
    }
    for line in lines {
        content.push('\n');
        let spaces = line.len() - line.trim_start_matches(' ').len();
        content.push_str(&line[spaces.min(indent)..]);
    }
    content.push('\n');
    content
}

impl BlockRule for ListRule {
    fn id(&self) -> RuleId {
        RuleId::List
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        let Some(first) = cursor.try_match(&self.bullet) else {
            return Ok(None);
        };
        let first_bullet = first.group("bullet").unwrap_or_default();
        let ordered = is_ordered(first_bullet);
        let start = if ordered {
            first_bullet.trim_end_matches('.').parse().unwrap_or(1)
        } else {
            1
        };

        let text = cursor.rest();
        let mut items = vec![ItemBounds {
            start: 0,
            content_indent: first.length,
        }];
        let mut content_end = 0;
        let mut consumed = text.len();
        let mut prev_blank = false;
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            if line_start == 0 {
                content_end = offset;
                continue;
            }
            let body = line.trim_end_matches('\n');
            if body.is_empty() {
                prev_blank = true;
                continue;
            }
            let line_indent = body.len() - body.trim_start_matches(' ').len();
            let current_indent = items.last().map_or(0, |item| item.content_indent);
            let shallow = line_indent < current_indent;

            if shallow && self.interrupt.match_at(text, line_start).is_some() {
                consumed = line_start;
                break;
            }
            if shallow {
                if let Some(b) = self.bullet.match_at(text, line_start) {
                    if is_ordered(b.group("bullet").unwrap_or_default()) != ordered {
                        consumed = line_start;
                        break;
                    }
                    items.push(ItemBounds {
                        start: line_start,
                        content_indent: b.length,
                    });
                    content_end = offset;
                    prev_blank = false;
                    continue;
                }
                if prev_blank {
                    consumed = line_start;
                    break;
                }
            }
            content_end = offset;
            prev_blank = false;
        }

        let span = cursor.consume(consumed);
        let mut children = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let last = i + 1 == items.len();
            let end = if last {
                content_end
            } else {
                items[i + 1].start
            };
            let raw = &span.markdown()[item.start..end];
            let loose = raw.trim_end_matches('\n').contains("\n\n")
                || (!last && raw.ends_with("\n\n"));
            let item_span = span.slice(item.start, end - item.start);
            let inner = SourceInfo::derived(
                item_content(raw, item.content_indent),
                &item_span,
                item_span.line,
            );
            let flags = ParseFlags {
                nested: true,
                ..parser.flags()
            };
            let blocks = parser.tokenize_nested(&inner, flags)?;
            children.push(parser.token(
                RuleId::List,
                item_span,
                TokenKind::ListItem {
                    loose,
                    children: blocks,
                },
            ));
        }
        Ok(Some(parser.token(
            RuleId::List,
            span,
            TokenKind::List {
                ordered,
                start,
                children,
            },
        )))
    }
}
