//! Human-readable error reports.
//!
//! Errors carry byte offsets; [`Diagnostics`] turns them into
//! `name:line:col: error: message` lines, the format editors and terminals
//! know how to jump to.

use std::fmt;

use crate::error::{ErrorCategory, InvariantViolation, LexError, ParseError};

/// Maps byte offsets to 1-based line and column numbers. Columns count
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let column = self
            .source
            .get(start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - start);
        (line + 1, column + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse(ErrorCategory),
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub stage: Stage,
    pub message: String,
}

/// Every problem found in one document, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    name: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Collects lex and parse errors for `source`.
    pub fn collect(
        name: impl Into<String>,
        source: &str,
        lex_errors: &[LexError],
        parse_errors: &[ParseError],
    ) -> Self {
        let index = LineIndex::new(source);
        let mut diagnostics = Self::new(name);
        for err in lex_errors {
            diagnostics.push(&index, err.pos, Stage::Lex, err.to_string());
        }
        for err in parse_errors {
            diagnostics.push(&index, err.pos, Stage::Parse(err.category()), err.to_string());
        }
        diagnostics.sort();
        diagnostics
    }

    /// A report for a document that could not be processed at all.
    pub fn internal(name: impl Into<String>, err: &InvariantViolation) -> Self {
        let mut diagnostics = Self::new(name);
        diagnostics.entries.push(Diagnostic {
            line: 1,
            column: 1,
            stage: Stage::Internal,
            message: err.to_string(),
        });
        diagnostics
    }

    pub fn push(&mut self, index: &LineIndex<'_>, pos: usize, stage: Stage, message: String) {
        let (line, column) = index.line_col(pos);
        self.entries.push(Diagnostic {
            line,
            column,
            stage,
            message,
        });
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|d| (d.line, d.column));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.entries {
            let label = match d.stage {
                Stage::Internal => "internal error",
                _ => "error",
            };
            writeln!(f, "{}:{}:{}: {label}: {}", self.name, d.line, d.column, d.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LexErrorKind, ParseErrorKind};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, (1, 1))]
    #[case(3, (1, 4))]
    #[case(4, (2, 1))]
    #[case(8, (2, 4))]
    #[case(100, (3, 1))]
    fn offsets_to_positions(#[case] offset: usize, #[case] expected: (usize, usize)) {
        // the second line has a two-byte character
        let index = LineIndex::new("abc\nßxy\n");
        assert_eq!(index.line_col(offset), expected);
    }

    #[test]
    fn report_is_sorted_and_formatted() {
        let source = "---\ntitle: x\n---\n# A\n## B\n";
        let lex = [LexError::new(18, LexErrorKind::UnclosedLink)];
        let parse = [ParseError::new(0, ParseErrorKind::MissingMetaKey("lang"))];

        let diagnostics = Diagnostics::collect("post.md", source, &lex, &parse);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.to_string(),
            "post.md:1:1: error: missing mandatory meta key: lang\n\
             post.md:4:2: error: link is never closed\n"
        );
    }

    #[test]
    fn internal_errors_are_labelled() {
        let err = InvariantViolation::new("section still open");
        let diagnostics = Diagnostics::internal("a.md", &err);
        assert_eq!(
            diagnostics.to_string(),
            "a.md:1:1: internal error: internal invariant violated: section still open\n"
        );
    }
}
