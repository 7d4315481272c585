use crate::error::Result;
use crate::parsing::cursor::Cursor;
use crate::parsing::matcher::Matcher;
use crate::parsing::parser::BlockParser;
use crate::parsing::rules::{BlockRule, RuleId, trimmed_range};
use crate::parsing::token::{Align, PendingInline, PendingShape, TokenKind, TokenRef};

/// GFM (`| a | b |`) and no-pipe (`a | b`) tables.
///
/// Cell spans are collected row by row; padding and truncation of body rows
/// happen when the pending table is resolved.
pub(crate) struct TableRule {
    id: RuleId,
    matcher: Matcher,
}

impl TableRule {
    pub(crate) fn gfm() -> Self {
        let line_or_end = Matcher::new_line() | Matcher::end_of_string();
        let ws = Matcher::white_space_in_line().star();
        let row = ws.clone() + Matcher::ch('|') + Matcher::rest_of_line() + line_or_end.clone();
        Self {
            id: RuleId::Table,
            matcher: (ws.clone() + Matcher::ch('|') + Matcher::any_char_not("\n").plus())
                .group("header")
                + Matcher::new_line()
                + (ws.clone()
                    + Matcher::ch('|')
                    + ws
                    + Matcher::any_char_in("-:").plus()
                    + Matcher::any_char_in("-| :").star())
                .group("align")
                + line_or_end
                + row.star().group("rows")
                + Matcher::new_line().star(),
        }
    }

    pub(crate) fn np() -> Self {
        let line_or_end = Matcher::new_line() | Matcher::end_of_string();
        let ws = Matcher::white_space_in_line().star();
        let row = Matcher::any_char_not("\n|").star()
            + Matcher::ch('|')
            + Matcher::rest_of_line()
            + line_or_end.clone();
        Self {
            id: RuleId::NpTable,
            matcher: (ws.clone()
                + Matcher::any_char_not(" \t\n|")
                + Matcher::any_char_not("|\n").star()
                + Matcher::ch('|')
                + Matcher::rest_of_line())
            .group("header")
                + Matcher::new_line()
                + (ws.clone()
                    + Matcher::any_char_in("-:").plus()
                    + ws
                    + Matcher::ch('|')
                    + Matcher::any_char_in("-| :").star())
                .group("align")
                + line_or_end
                + row.star().group("rows")
                + Matcher::new_line().star(),
        }
    }
}

/// Splits a table line into trimmed cells, as `(offset, len)` pairs relative
/// to the line. One leading and one trailing pipe are dropped; `\|` does not
/// split.
pub fn split_cells(line: &str) -> Vec<(usize, usize)> {
    let mut start = line.len() - line.trim_start().len();
    let mut end = line.trim_end().len().max(start);
    if line[start..end].starts_with('|') {
        start += 1;
    }
    if end > start && line[start..end].ends_with('|') && !line[start..end - 1].ends_with('\\') {
        end -= 1;
    }

    let bytes = line.as_bytes();
    let trim = |s: usize, e: usize| {
        let (offset, len) = trimmed_range(&line[s..e]);
        (s + offset, len)
    };
    let mut cells = Vec::new();
    let mut cell_start = start;
    let mut i = start;
    while i < end {
        match bytes[i] {
            b'\\' => i = (i + 2).min(end),
            b'|' => {
                cells.push(trim(cell_start, i));
                cell_start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cells.push(trim(cell_start, end));
    cells
}

/// Alignment of one delimiter-row cell: `:--`, `:-:`, `--:` or `---`.
pub fn parse_align(cell: &str) -> Align {
    let cell = cell.trim();
    match (cell.starts_with(':'), cell.len() > 1 && cell.ends_with(':')) {
        (true, true) => Align::Center,
        (true, false) => Align::Left,
        (false, true) => Align::Right,
        (false, false) => Align::None,
    }
}

impl BlockRule for TableRule {
    fn id(&self) -> RuleId {
        self.id
    }

    fn try_match(
        &self,
        parser: &mut BlockParser<'_>,
        cursor: &mut Cursor<'_>,
    ) -> Result<Option<TokenRef>> {
        if !parser.options().gfm {
            return Ok(None);
        }
        let Some(m) = cursor.try_match(&self.matcher) else {
            return Ok(None);
        };
        let (header_at, _) = m.group_offset("header").unwrap_or_default();
        let header = m.group("header").unwrap_or_default();
        let align_line = m.group("align").unwrap_or_default();
        let align: Vec<Align> = split_cells(align_line)
            .into_iter()
            .map(|(o, l)| parse_align(&align_line[o..o + l]))
            .collect();
        let (rows_at, _) = m.group_offset("rows").unwrap_or_default();
        let rows = m.group("rows").unwrap_or_default();

        let span = cursor.consume(m.length);
        let header_cells = split_cells(header);
        let mut widths = vec![header_cells.len()];
        let mut spans: Vec<_> = header_cells
            .into_iter()
            .map(|(o, l)| span.slice(header_at + o, l))
            .collect();
        let mut line_at = rows_at;
        for line in rows.split_inclusive('\n') {
            let cells = split_cells(line.trim_end_matches('\n'));
            widths.push(cells.len());
            spans.extend(cells.into_iter().map(|(o, l)| span.slice(line_at + o, l)));
            line_at += line.len();
        }

        Ok(Some(parser.token(
            self.id,
            span,
            TokenKind::Pending(PendingInline {
                shape: PendingShape::Table { align, widths },
                spans,
            }),
        )))
    }
}
