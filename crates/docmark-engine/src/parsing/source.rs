use std::fmt;
use std::sync::Arc;

/// An immutable span of Markdown source.
///
/// Every token carries one. The span points into a shared buffer: the
/// preprocessed document text, or a derived buffer for content that had
/// prefixes removed (blockquote `>` markers, list indentation). Slicing the
/// buffer with the span reproduces the raw Markdown the token came from.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceInfo {
    file: Option<Arc<str>>,
    buffer: Arc<str>,
    start: usize,
    len: usize,
    /// 1-based line of the first character.
    pub line: usize,
    /// 1-based column of the first character.
    pub column: usize,
}

impl SourceInfo {
    /// Creates a span covering the whole of `text`, starting at line 1.
    pub fn document(text: impl Into<Arc<str>>, file: Option<Arc<str>>) -> Self {
        let buffer: Arc<str> = text.into();
        let len = buffer.len();
        Self {
            file,
            buffer,
            start: 0,
            len,
            line: 1,
            column: 1,
        }
    }

    /// Creates a span over a derived buffer whose first line maps to `line`
    /// of the original document.
    pub fn derived(text: impl Into<Arc<str>>, origin: &SourceInfo, line: usize) -> Self {
        let buffer: Arc<str> = text.into();
        let len = buffer.len();
        Self {
            file: origin.file.clone(),
            buffer,
            start: 0,
            len,
            line,
            column: 1,
        }
    }

    /// The raw Markdown text of this span.
    pub fn markdown(&self) -> &str {
        &self.buffer[self.start..self.start + self.len]
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Byte offset of the span start within its buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Exclusive byte offset of the span end within its buffer.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole buffer this span points into.
    pub fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    /// True when both spans point into the same buffer.
    pub fn same_buffer(&self, other: &SourceInfo) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// True when `other` lies inside this span of the same buffer.
    pub fn contains(&self, other: &SourceInfo) -> bool {
        self.same_buffer(other) && other.start >= self.start && other.end() <= self.end()
    }

    /// Returns the sub-span `[offset, offset + len)` relative to this span,
    /// with line and column advanced over the skipped text.
    ///
    /// Out-of-range requests are clamped to this span.
    pub fn slice(&self, offset: usize, len: usize) -> SourceInfo {
        let offset = offset.min(self.len);
        let len = len.min(self.len - offset);
        let skipped = &self.markdown()[..offset];
        let (line, column) = advance(self.line, self.column, skipped);
        SourceInfo {
            file: self.file.clone(),
            buffer: self.buffer.clone(),
            start: self.start + offset,
            len,
            line,
            column,
        }
    }

    /// Sub-span with a position the caller already tracked.
    pub(crate) fn sub_at(
        &self,
        offset: usize,
        len: usize,
        line: usize,
        column: usize,
    ) -> SourceInfo {
        SourceInfo {
            file: self.file.clone(),
            buffer: self.buffer.clone(),
            start: self.start + offset,
            len,
            line,
            column,
        }
    }

    /// Returns the span from the start of `self` to the end of `other`.
    ///
    /// Both spans must share a buffer and `other` must not end before `self`
    /// starts; otherwise `self` is returned unchanged.
    pub fn join(&self, other: &SourceInfo) -> SourceInfo {
        if !self.same_buffer(other) || other.end() < self.start {
            return self.clone();
        }
        SourceInfo {
            len: other.end() - self.start,
            ..self.clone()
        }
    }
}

/// Advances a line/column position over `text`.
pub(crate) fn advance(mut line: usize, mut column: usize, text: &str) -> (usize, usize) {
    for c in text.chars() {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}")?;
        }
        write!(f, "({},{})", self.line, self.column)
    }
}

impl fmt::Debug for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} {:?}", self.markdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_tracks_lines_and_columns() {
        let doc = SourceInfo::document("ab\ncd\nef", None);
        let sub = doc.slice(4, 3);
        assert_eq!(sub.markdown(), "d\ne");
        assert_eq!(sub.line, 2);
        assert_eq!(sub.column, 2);
    }

    #[test]
    fn slice_clamps_out_of_range() {
        let doc = SourceInfo::document("abc", None);
        let sub = doc.slice(2, 10);
        assert_eq!(sub.markdown(), "c");
        assert!(doc.slice(10, 1).is_empty());
    }

    #[test]
    fn contains_requires_same_buffer() {
        let doc = SourceInfo::document("hello world", None);
        let inner = doc.slice(6, 5);
        assert!(doc.contains(&inner));
        assert!(!inner.contains(&doc));

        let other = SourceInfo::document("hello world", None);
        assert!(!other.contains(&inner));
    }

    #[test]
    fn join_spans_both_ends() {
        let doc = SourceInfo::document("one two three", None);
        let a = doc.slice(0, 3);
        let b = doc.slice(8, 5);
        assert_eq!(a.join(&b).markdown(), "one two three");
    }

    #[test]
    fn display_includes_file() {
        let doc = SourceInfo::document("x\ny", Some("intro.md".into()));
        assert_eq!(doc.slice(2, 1).to_string(), "intro.md(2,1)");
    }
}
