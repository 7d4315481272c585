use std::sync::Arc;

use crate::collaborators::{IncludeResolver, TabConditions, XrefResolver};
use crate::error::Result;
use crate::parsing::context::ParseOptions;
use crate::parsing::parser::EngineKind;
use crate::parsing::token::TokenRef;
use crate::parsing::ParsedDocument;

use super::engine::RewriteEngine;
use super::passes;
use super::rewriter::Rewriter;

/// Builds the standard rewriter for a grammar and runs it over a tree.
///
/// Passes that need a collaborator are only added once one is supplied.
///
/// ```
/// use docmark_engine::{MapXrefResolver, ParseOptions, Pipeline, parse};
///
/// let doc = parse("See @System.String.\n", &ParseOptions::default())?;
/// let root = Pipeline::for_document(&doc)
///     .with_xref_resolver(MapXrefResolver::new().with("System.String", "/s.html", "String"))
///     .run(&doc.root)?;
/// assert_eq!(root.plain_text(), "See String.");
/// # Ok::<(), docmark_engine::EngineError>(())
/// ```
#[derive(Clone)]
pub struct Pipeline {
    engine: RewriteEngine,
    xrefs: Option<Arc<dyn XrefResolver>>,
    includes: Option<Arc<dyn IncludeResolver>>,
    tabs: Option<Arc<dyn TabConditions>>,
}

impl Pipeline {
    pub fn new(kind: EngineKind, options: ParseOptions) -> Self {
        Self {
            engine: RewriteEngine::new(kind, options),
            xrefs: None,
            includes: None,
            tabs: None,
        }
    }

    pub fn for_document(doc: &ParsedDocument) -> Self {
        Self::new(doc.kind, doc.context.options.clone())
    }

    pub fn with_xref_resolver(mut self, resolver: impl XrefResolver + 'static) -> Self {
        self.xrefs = Some(Arc::new(resolver));
        self
    }

    pub fn with_include_resolver(mut self, resolver: impl IncludeResolver + 'static) -> Self {
        self.includes = Some(Arc::new(resolver));
        self
    }

    pub fn with_tab_conditions(mut self, conditions: impl TabConditions + 'static) -> Self {
        self.tabs = Some(Arc::new(conditions));
        self
    }

    pub fn engine(&self) -> &RewriteEngine {
        &self.engine
    }

    /// The rewriter applied on every pass, in order: table validation,
    /// includes, notes, text merging, cross references, tab visibility.
    pub fn rewriter(&self) -> Rewriter {
        let max = self.engine.options().max_loop_count;
        let mut steps = vec![passes::validate_tables()];
        if let Some(includes) = &self.includes {
            steps.push(passes::expand_includes(Arc::clone(includes)));
        }
        steps.push(passes::notes(max));
        steps.push(passes::merge_text());
        if let Some(xrefs) = &self.xrefs {
            steps.push(passes::resolve_xrefs(Arc::clone(xrefs)));
        }
        if let Some(tabs) = &self.tabs {
            steps.push(passes::tab_visibility(Arc::clone(tabs)));
        }
        Rewriter::sequence(steps)
    }

    pub fn run(&self, root: &TokenRef) -> Result<TokenRef> {
        log::debug!("{}: running {:?} rewriters", root.source, self.engine.kind());
        self.engine.rewrite(root, &self.rewriter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ActiveTabs, MapIncludeResolver, MapXrefResolver};
    use crate::parsing::parse;
    use crate::parsing::snapshot::dump;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_rewriter_without_collaborators() {
        let pipeline = Pipeline::new(EngineKind::Dfm, ParseOptions::default());
        let Rewriter::Sequence(steps) = pipeline.rewriter() else {
            panic!("expected a sequence");
        };
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn everything_together() {
        let text = "\
> [!NOTE]
> [!include[n](note.md)]

# [A](#tab/a/on)
x
# [B](#tab/b/off)
y
---
";
        let doc = parse(text, &ParseOptions::default()).unwrap();
        let root = Pipeline::for_document(&doc)
            .with_include_resolver(MapIncludeResolver::new().with("note.md", "Use @T.\n"))
            .with_xref_resolver(MapXrefResolver::new().with("T", "/t.html", "T"))
            .with_tab_conditions(ActiveTabs::new(["on"]))
            .run(&doc.root)
            .unwrap();
        let expected = "\
Document
  Note NOTE
    IncludeBlock path=\"note.md\" expanded
      Paragraph
        Text \"Use \"
        Xref uid=\"T\" -> \"/t.html\"
          Text \"T\"
        Text \".\"
  TabGroup id=\"a+b\" active=0
    TabItem id=\"a\" condition=\"on\"
      TabTitle
        Text \"A\"
      TabContent
        Paragraph
          Text \"x\"
    TabItem id=\"b\" condition=\"off\" hidden
      TabTitle
        Text \"B\"
      TabContent
        Paragraph
          Text \"y\"
";
        assert_eq!(dump(&root), expected);
    }
}
