//! Block rules, in grammar order.

mod basic;
mod dfm;
mod list;
mod quote;
mod table;
mod tabs;

pub(crate) use basic::{
    DefRule, FencesRule, HeadingRule, HrRule, HtmlRule, IndentedCodeRule, LHeadingRule,
    NewLineRule, ParagraphRule, TextRule,
};
pub(crate) use dfm::{
    CodeSnippetRule, IncludeBlockRule, YamlHeaderRule, include_directive, include_from,
};
pub use dfm::{parse_code_query, parse_include_target};
pub(crate) use list::ListRule;
pub(crate) use quote::{BlockquoteRule, NoteMarkerRule};
pub use table::{parse_align, split_cells};
pub(crate) use table::TableRule;
pub(crate) use tabs::TabGroupRule;

use crate::parsing::matcher::Matcher;
use crate::parsing::parser::EngineKind;

use super::BlockRule;

pub fn rules(kind: EngineKind) -> Vec<Box<dyn BlockRule>> {
    let dfm = kind == EngineKind::Dfm;
    let mut rules: Vec<Box<dyn BlockRule>> = Vec::new();
    if dfm {
        rules.push(Box::new(YamlHeaderRule::new()));
    }
    rules.push(Box::new(NewLineRule::new()));
    rules.push(Box::new(IndentedCodeRule::new()));
    rules.push(Box::new(FencesRule::new()));
    if dfm {
        rules.push(Box::new(CodeSnippetRule::new()));
        rules.push(Box::new(TabGroupRule::new()));
    }
    rules.push(Box::new(HeadingRule::new()));
    rules.push(Box::new(TableRule::np()));
    rules.push(Box::new(HrRule::new()));
    if dfm {
        rules.push(Box::new(IncludeBlockRule::new()));
        rules.push(Box::new(NoteMarkerRule::new()));
    }
    rules.push(Box::new(BlockquoteRule::new()));
    rules.push(Box::new(ListRule::new()));
    rules.push(Box::new(HtmlRule::new()));
    rules.push(Box::new(DefRule::new()));
    rules.push(Box::new(TableRule::gfm()));
    rules.push(Box::new(LHeadingRule::new()));
    rules.push(Box::new(ParagraphRule::new(kind)));
    rules.push(Box::new(TextRule::new()));
    rules
}

/// Up to three leading spaces.
pub(crate) fn indent() -> Matcher {
    Matcher::ch(' ').repeat(0, 3)
}

/// Bracketed text allowing one level of nested brackets: `a [b] c`.
pub(crate) fn bracket_text() -> Matcher {
    (Matcher::ch('[') + Matcher::any_char_not("]\n").star() + Matcher::ch(']')
        | Matcher::any_char_not("[]\n"))
    .star()
}

pub(crate) fn hr_line() -> Matcher {
    indent()
        + (Matcher::any_char_in("-*_") + Matcher::white_space_in_line().star()).repeat(3, usize::MAX)
        + (Matcher::new_line() | Matcher::end_of_string())
}

pub(crate) fn atx_heading_start() -> Matcher {
    indent()
        + Matcher::ch('#').repeat(1, 6)
        + (Matcher::white_space_in_line() | Matcher::new_line() | Matcher::end_of_string())
}

pub(crate) fn fence_open() -> Matcher {
    indent() + (Matcher::string("```") | Matcher::string("~~~"))
}

pub(crate) fn quote_start() -> Matcher {
    indent() + Matcher::ch('>')
}

/// Start of an html block: an opening or closing tag name, or a comment.
pub(crate) fn html_start() -> Matcher {
    indent()
        + (Matcher::string("<!--")
            | Matcher::ch('<')
                + Matcher::ch('/').optional()
                + Matcher::letter()
                + Matcher::word_char().star()
                + Matcher::lookahead(
                    Matcher::any_char_in(" \t>/\n") | Matcher::end_of_string(),
                ))
}

pub(crate) fn def_line() -> Matcher {
    let title_char = Matcher::negative(Matcher::any_char_in("\"')") + Matcher::line_end())
        + Matcher::any_char_not("\n");
    indent()
        + Matcher::ch('[')
        + Matcher::any_char_not("]\n").plus().group("key")
        + Matcher::string("]:")
        + Matcher::white_space_in_line().star()
        + Matcher::ch('<').optional()
        + Matcher::any_char_not(" \t\n>").plus().group("href")
        + Matcher::ch('>').optional()
        + (Matcher::white_space_in_line().plus()
            + Matcher::any_char_in("\"'(")
            + title_char.star().group("title")
            + Matcher::any_char_in("\"')"))
        .optional()
        + Matcher::line_end()
}

/// A setext underline after one line of text.
pub(crate) fn setext_heading() -> Matcher {
    Matcher::any_char_not("\n").plus().group("title")
        + Matcher::new_line()
        + indent()
        + (Matcher::ch('=').repeat(2, usize::MAX) | Matcher::ch('-').repeat(2, usize::MAX))
            .group("underline")
        + Matcher::line_end()
}

/// A line starting a `[!include...]` or `[!code...]` directive, or a note marker.
pub(crate) fn directive_start() -> Matcher {
    indent()
        + (Matcher::string_ignore_case("[!include")
            | Matcher::string_ignore_case("[!code")
            | note_marker())
}

/// `[!KIND]` at the start of a quoted line.
pub(crate) fn note_marker() -> Matcher {
    Matcher::string("[!")
        + Matcher::letter().plus().group("kind")
        + Matcher::ch(']')
        + Matcher::white_space_in_line().star()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("---\n", true)]
    #[case("* * *", true)]
    #[case("___  \n", true)]
    #[case("--\n", false)]
    #[case("- a\n", false)]
    fn hr_lines(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(hr_line().match_at(text, 0).is_some(), expected);
    }

    #[rstest]
    #[case("<div>", true)]
    #[case("</p>", true)]
    #[case("<!-- c -->", true)]
    #[case("<xref:System.String>", false)]
    #[case("<http://x.org>", false)]
    fn html_starts(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(html_start().match_at(text, 0).is_some(), expected);
    }

    #[test]
    fn def_line_groups() {
        let m = def_line()
            .match_at("[Foo]: http://x.org \"The (title)\"\n", 0)
            .unwrap();
        assert_eq!(m.group("key"), Some("Foo"));
        assert_eq!(m.group("href"), Some("http://x.org"));
        assert_eq!(m.group("title"), Some("The (title)"));
    }

    #[test]
    fn rule_matchers_never_match_empty() {
        for m in [
            hr_line(),
            atx_heading_start(),
            fence_open(),
            quote_start(),
            html_start(),
            def_line(),
            setext_heading(),
            directive_start(),
            note_marker(),
        ] {
            assert!(!m.can_match_empty(), "{m:?}");
        }
    }
}
