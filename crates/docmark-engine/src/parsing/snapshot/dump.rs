use std::fmt::Write;

use crate::parsing::token::{
    Include, IncludeState, PendingShape, Token, TokenKind, Xref, XrefResolution,
};

/// Renders `token` and its subtree as indented text.
///
/// ```text
/// Document
///   Heading level=1 id="title"
///     Text "Title"
/// ```
pub fn dump(token: &Token) -> String {
    let mut out = String::new();
    write_token(&mut out, token, 0);
    out
}

fn write_token(out: &mut String, token: &Token, depth: usize) {
    let _ = writeln!(out, "{:indent$}{}", "", describe(&token.kind), indent = depth * 2);
    for child in token.children() {
        write_token(out, child, depth + 1);
    }
}

fn describe(kind: &TokenKind) -> String {
    let name = format!("{:?}", kind.tag());
    let details = match kind {
        TokenKind::Heading { level, id, .. } => format!("level={level} id={id:?}"),
        TokenKind::Code { lang, code, fenced } => {
            let lang = lang.as_deref().map(|l| format!("lang={l} ")).unwrap_or_default();
            format!("{lang}fenced={fenced} {code:?}")
        }
        TokenKind::CodeSnippet(snippet) => {
            let mut s = format!("path={:?}", snippet.path.as_str());
            if let Some(lang) = &snippet.lang {
                let _ = write!(s, " lang={lang}");
            }
            if let Some(query) = &snippet.query {
                let _ = write!(s, " query={query:?}");
            }
            s
        }
        TokenKind::NoteMarker { kind } | TokenKind::Note { kind, .. } => kind.clone(),
        TokenKind::List { ordered, start, .. } => {
            if *ordered {
                format!("ordered start={start}")
            } else {
                "bullet".to_string()
            }
        }
        TokenKind::ListItem { loose, .. } => {
            if *loose {
                "loose".to_string()
            } else {
                String::new()
            }
        }
        TokenKind::Html { raw } | TokenKind::Tag { raw } => format!("{raw:?}"),
        TokenKind::LinkDefinition { key, href, .. } => format!("{key:?} -> {href:?}"),
        TokenKind::Table { align, .. } => format!("align={align:?}"),
        TokenKind::TableRow { header: true, .. } => "header".to_string(),
        TokenKind::TabGroup { id, active, .. } => format!("id={id:?} active={active}"),
        TokenKind::TabItem {
            id,
            condition,
            visible,
            ..
        } => {
            let mut s = format!("id={id:?}");
            if let Some(condition) = condition {
                let _ = write!(s, " condition={condition:?}");
            }
            if !visible {
                s.push_str(" hidden");
            }
            s
        }
        TokenKind::YamlHeader { yaml } => format!("{yaml:?}"),
        TokenKind::IncludeBlock(include) | TokenKind::IncludeInline(include) => {
            describe_include(include)
        }
        TokenKind::Pending(pending) => match &pending.shape {
            PendingShape::Paragraph => "paragraph".to_string(),
            PendingShape::Heading { level, .. } => format!("heading level={level}"),
            PendingShape::Table { widths, .. } => format!("table widths={widths:?}"),
            PendingShape::TabTitle => "tab title".to_string(),
        },
        TokenKind::Text { content } => format!("{content:?}"),
        TokenKind::Escape { ch } => format!("{ch:?}"),
        TokenKind::CodeSpan { code } => format!("{code:?}"),
        TokenKind::Link { href, title, .. } => match title {
            Some(title) => format!("href={href:?} title={title:?}"),
            None => format!("href={href:?}"),
        },
        TokenKind::Image { src, alt, .. } => format!("src={src:?} alt={alt:?}"),
        TokenKind::Xref(xref) => describe_xref(xref),
        _ => String::new(),
    };
    if details.is_empty() {
        name
    } else {
        format!("{name} {details}")
    }
}

fn describe_xref(xref: &Xref) -> String {
    let mut s = format!("uid={:?}", xref.uid);
    if let Some(query) = &xref.query {
        let _ = write!(s, " query={query:?}");
    }
    if xref.throw_if_unresolved {
        s.push_str(" hard");
    }
    match &xref.resolution {
        XrefResolution::Unresolved => {}
        XrefResolution::Resolved { href, .. } => {
            let _ = write!(s, " -> {href:?}");
        }
        XrefResolution::Missing => s.push_str(" missing"),
    }
    s
}

fn describe_include(include: &Include) -> String {
    let mut s = format!("path={:?}", include.path.as_str());
    if let Some(anchor) = &include.anchor {
        let _ = write!(s, " anchor={anchor:?}");
    }
    match &include.state {
        IncludeState::Unexpanded => {}
        IncludeState::Expanded => s.push_str(" expanded"),
        IncludeState::Failed(message) => {
            let _ = write!(s, " failed={message:?}");
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::context::ParseOptions;
    use crate::parsing::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading_and_paragraph() {
        let doc = parse("# Title\n\nSome *text*.\n", &ParseOptions::default()).unwrap();
        let expected = "\
Document
  Heading level=1 id=\"title\"
    Text \"Title\"
  Paragraph
    Text \"Some \"
    Em
      Text \"text\"
    Text \".\"
";
        assert_eq!(dump(&doc.root), expected);
    }

    #[test]
    fn extension_tokens() {
        let doc = parse(
            "> [!NOTE]\n> Careful.\n\nSee @a.b and <xref:c?q=1>.\n",
            &ParseOptions::default(),
        )
        .unwrap();
        insta::assert_snapshot!(dump(&doc.root), @r#"
        Document
          Blockquote
            NoteMarker NOTE
            Paragraph
              Text "Careful."
          Paragraph
            Text "See "
            Xref uid="a.b"
            Text " and "
            Xref uid="c" query="q=1" hard
            Text "."
        "#);
    }
}
