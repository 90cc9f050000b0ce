//! Error types for every stage of the pipeline.
//!
//! Lexing and parsing never stop at the first problem: [`LexError`]s and
//! [`ParseError`]s are collected and handed back alongside the best-effort
//! result. Only an [`InvariantViolation`], which means the lexer or parser
//! itself is broken, aborts processing of a document.

use crate::token::TokenKind;

/// A recoverable token-level problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct LexError {
    /// Byte offset in the source.
    pub pos: usize,
    pub kind: LexErrorKind,
}

impl LexError {
    pub fn new(pos: usize, kind: LexErrorKind) -> Self {
        Self { pos, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("metadata block is never closed")]
    UnterminatedMeta,
    #[error("metadata block opened with `{open}` but closed with `{close}`")]
    MetaDelimiterMismatch { open: String, close: String },
    #[error("unterminated code span")]
    UnterminatedCodeSpan,
    #[error("code block is never closed")]
    UnterminatedCodeBlock,
    #[error("unknown entity `&{0};`")]
    UnknownEntity(String),
    #[error("entity `&{0}` is missing its closing `;`")]
    UnterminatedEntity(String),
    #[error("heading level {0} is not supported, only `#` and `##` are")]
    UnsupportedHeadingLevel(usize),
    #[error("`]` is not followed by a link target")]
    MissingLinkTarget,
    #[error("link is never closed")]
    UnclosedLink,
    #[error("html tag `<{0}>` is never closed")]
    UnterminatedHtmlTag(String),
    #[error("closing tag `</{0}` is missing its `>`")]
    MalformedClosingTag(String),
    #[error("unexpected character `{0}` in html tag")]
    UnexpectedTagCharacter(char),
    #[error("attribute value is missing its closing quote")]
    UnterminatedAttributeValue,
}

/// The three families of recoverable parse problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad nesting, mismatched delimiters, malformed block syntax.
    Structural,
    /// A reference without a matching definition.
    Resolution,
    /// Missing or malformed metadata.
    Configuration,
}

/// A recoverable problem found while parsing or resolving.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseError {
    /// Byte offset in the source.
    pub pos: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(pos: usize, kind: ParseErrorKind) -> Self {
        Self { pos, kind }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected {found:?} in {context}")]
    UnexpectedToken {
        found: TokenKind,
        context: &'static str,
    },
    #[error("expected {expected:?} in {context}, found {found:?}")]
    ExpectedToken {
        expected: TokenKind,
        found: TokenKind,
        context: &'static str,
    },
    #[error("metadata line is not of the form `key: value`")]
    MalformedMetaLine,
    #[error("document has more than one metadata block")]
    DuplicateMetaBlock,
    #[error("level-2 section opened before any level-1 section")]
    SectionWithoutParent,
    #[error("closing tag `</{close}>` does not match open tag `<{open}>`")]
    MismatchedHtmlTag { open: String, close: String },
    #[error("closing tag `</{0}>` has no matching open tag")]
    UnexpectedHtmlClose(String),
    #[error("<{tag}>: {message}")]
    TagHandler { tag: String, message: String },
    #[error("{0} is never closed")]
    UnclosedInline(&'static str),
    #[error("{inner} overlaps {outer}")]
    MisnestedInline {
        inner: &'static str,
        outer: &'static str,
    },
    #[error("link definition `{0}` has no target")]
    EmptyLinkDefinition(String),
    #[error("link `{0}` is defined more than once")]
    DuplicateLinkDefinition(String),
    #[error("sidenote `{0}` is defined more than once")]
    DuplicateSidenoteDefinition(String),
    #[error("invalid code block attribute `{0}`")]
    InvalidCodeAttribute(String),

    #[error("link reference `{0}` has no definition")]
    UnresolvedLink(String),
    #[error("sidenote `{0}` has no definition")]
    UnresolvedSidenote(String),
    #[error("section id `{0}` is used more than once")]
    DuplicateSectionId(String),

    #[error("missing mandatory meta key: {0}")]
    MissingMetaKey(&'static str),
    #[error("multiple definitions of meta key: {0}")]
    DuplicateMetaKey(String),
    #[error("unrecognized meta key: {0}")]
    UnknownMetaKey(String),
    #[error("invalid value for meta key {key}: {message}")]
    InvalidMetaValue { key: String, message: String },
}

impl ParseErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::UnresolvedLink(_)
            | ParseErrorKind::UnresolvedSidenote(_)
            | ParseErrorKind::DuplicateSectionId(_) => ErrorCategory::Resolution,
            ParseErrorKind::MissingMetaKey(_)
            | ParseErrorKind::DuplicateMetaKey(_)
            | ParseErrorKind::UnknownMetaKey(_)
            | ParseErrorKind::InvalidMetaValue { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::Structural,
        }
    }
}

/// A state the lexer or parser should never reach. Fatal for the document
/// being processed, never for its siblings in a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal invariant violated: {message}")]
pub struct InvariantViolation {
    pub message: String,
}

impl InvariantViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ParseErrorKind::SectionWithoutParent, ErrorCategory::Structural)]
    #[case(ParseErrorKind::UnresolvedSidenote("sn1".into()), ErrorCategory::Resolution)]
    #[case(ParseErrorKind::DuplicateSectionId("intro".into()), ErrorCategory::Resolution)]
    #[case(ParseErrorKind::MissingMetaKey("title"), ErrorCategory::Configuration)]
    #[case(ParseErrorKind::DuplicateMetaKey("lang".into()), ErrorCategory::Configuration)]
    fn categories(#[case] kind: ParseErrorKind, #[case] expected: ErrorCategory) {
        assert_eq!(ParseError::new(0, kind).category(), expected);
    }

    #[test]
    fn messages() {
        let err = ParseError::new(3, ParseErrorKind::MissingMetaKey("url-path"));
        assert_eq!(err.to_string(), "missing mandatory meta key: url-path");

        let err = LexError::new(
            0,
            LexErrorKind::MetaDelimiterMismatch {
                open: "---".into(),
                close: "+++".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "metadata block opened with `---` but closed with `+++`"
        );
    }
}
