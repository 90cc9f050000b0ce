//! Token stream produced by the lexer.
//!
//! Tokens borrow from the source text. Concatenating the `text` of every
//! token in order reproduces the source exactly; see [`reconstruct`].

use std::fmt;
use std::ops::Range;

/// Every kind of token the lexer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input. Always the last token, always empty.
    Eof,
    /// Indentation, line endings, blank lines and other bytes without
    /// semantic content.
    Whitespace,

    MetaBegin,
    MetaKey,
    MetaEnd,

    Section1Begin,
    Section1Content,
    Section1End,
    Section2Begin,
    Section2Content,
    Section2End,
    /// Explicit `{#id}` suffix on a heading.
    SectionId,

    ParagraphBegin,
    ParagraphEnd,

    Text,
    /// Backslash escape; the value is the escaped character.
    Escaped,
    /// Typographic shorthand or named entity.
    AmpSpecial,
    Emphasis,
    Strong,
    EmphasisStrong,
    Strikethrough,
    Marker,
    Mono,

    LinkBegin,
    LinkHref,
    LinkRef,
    SidenoteRef,
    LinkEnd,

    LinkDef,
    LinkDefTarget,
    SidenoteDef,
    SidenoteDefEnd,

    CodeBlockBegin,
    CodeBlockLang,
    CodeBlockAttr,
    /// One raw content line of a code block or raw HTML tag.
    CodeBlockSource,
    CodeBlockEnd,

    ImageBegin,
    ImagePath,
    ImageAlt,
    ImageEnd,

    BlockquoteBegin,
    BlockquoteMarker,
    BlockquoteAttribution,
    BlockquoteSource,
    BlockquoteEnd,

    HorizontalRule,

    HtmlTagOpen,
    HtmlAttrKey,
    HtmlAttrValue,
    HtmlTagOpenEnd,
    HtmlTagClose,
}

impl TokenKind {
    /// Kinds that may appear inside inline content.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            TokenKind::Text
                | TokenKind::Escaped
                | TokenKind::AmpSpecial
                | TokenKind::Emphasis
                | TokenKind::Strong
                | TokenKind::EmphasisStrong
                | TokenKind::Strikethrough
                | TokenKind::Marker
                | TokenKind::Mono
                | TokenKind::LinkBegin
                | TokenKind::LinkHref
                | TokenKind::LinkRef
                | TokenKind::SidenoteRef
                | TokenKind::LinkEnd
        )
    }

    /// Kinds that only delimit lines and carry no content.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::BlockquoteMarker)
    }
}

/// A lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Literal source slice covered by the token.
    pub text: &'a str,
    /// Semantic payload, a sub-slice of `text` (e.g. `code` for `` `code` ``).
    pub value: &'a str,
    /// Byte offset of `text` in the source.
    pub pos: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, pos: usize, text: &'a str) -> Self {
        Self {
            kind,
            text,
            value: text,
            pos,
        }
    }

    pub fn with_value(mut self, value: &'a str) -> Self {
        self.value = value;
        self
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn end(&self) -> usize {
        self.pos + self.text.len()
    }

    pub fn span(&self) -> Range<usize> {
        self.pos..self.end()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}..{}", self.kind, self.pos, self.end())?;
        if !self.text.is_empty() {
            write!(f, " {:?}", self.text)?;
        }
        if self.value != self.text {
            write!(f, " => {:?}", self.value)?;
        }
        Ok(())
    }
}

/// Concatenates the literal text of `tokens`.
pub fn reconstruct(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect()
}
