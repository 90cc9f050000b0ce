//! # Parser
//!
//! Single forward pass over the token stream that builds the [`Blog`] tree.
//!
//! Sections nest at most two levels deep, so instead of recursing the parser
//! keeps one slot per level: a level-1 section collects blocks until the
//! lexer's `Section1End`, and a level-2 section collects blocks until its
//! `Section2End`, when it is appended to its level-1 parent. Blocks go to the
//! innermost open section, or to [`Blog::top_level`] before the first one.
//!
//! Inline content is built with an explicit stack of open formatting frames,
//! see the `inline` module.
//!
//! ## Errors
//!
//! Structural problems are recorded as [`ParseError`]s and parsing carries on
//! with the next token. References are left unresolved; filling them in is
//! the job of [`crate::resolve`]. Token sequences the lexer can never produce
//! (a section closed twice, an unknown special) abort with an
//! [`InvariantViolation`].

mod block;
mod inline;

pub use block::line_range;

use log::debug;

use crate::ast::{Block, Blog, MetaValue, Paragraph, Section, SectionLevel};
use crate::error::{InvariantViolation, ParseError, ParseErrorKind};
use crate::html::{HtmlTag, TagOutput, TagRegistry};
use crate::token::{Token, TokenKind};

/// Tree and errors from one parsing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub blog: Blog,
    pub errors: Vec<ParseError>,
}

/// Parses a token stream with the default tag registry.
pub fn parse(tokens: &[Token<'_>]) -> Result<ParseOutput, InvariantViolation> {
    parse_with(tokens, &TagRegistry::default())
}

pub fn parse_with(
    tokens: &[Token<'_>],
    registry: &TagRegistry,
) -> Result<ParseOutput, InvariantViolation> {
    Parser::new(tokens, registry).parse()
}

pub struct Parser<'t, 'input> {
    tokens: &'t [Token<'input>],
    pos: usize,
    registry: &'t TagRegistry,
    blog: Blog,
    section1: Option<Section>,
    section2: Option<Section>,
    errors: Vec<ParseError>,
}

impl<'t, 'input> Parser<'t, 'input> {
    pub fn new(tokens: &'t [Token<'input>], registry: &'t TagRegistry) -> Self {
        Self {
            tokens,
            pos: 0,
            registry,
            blog: Blog::default(),
            section1: None,
            section2: None,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<ParseOutput, InvariantViolation> {
        self.skip_whitespace();
        if self.at(TokenKind::MetaBegin) {
            self.parse_meta()?;
        }

        while !self.at_end() {
            let kind = self.current();
            match kind {
                TokenKind::Eof => break,
                TokenKind::Whitespace => self.skip_whitespace(),
                TokenKind::MetaBegin => {
                    self.error_here(ParseErrorKind::DuplicateMetaBlock);
                    self.parse_meta()?;
                }
                TokenKind::Section1Begin => self.open_section(SectionLevel::One)?,
                TokenKind::Section2Begin => self.open_section(SectionLevel::Two)?,
                TokenKind::Section1End => self.close_section(SectionLevel::One)?,
                TokenKind::Section2End => self.close_section(SectionLevel::Two)?,
                TokenKind::ParagraphBegin => {
                    let paragraph = self.parse_paragraph()?;
                    self.add_block(Block::Paragraph(paragraph));
                }
                TokenKind::CodeBlockBegin => {
                    let code = self.parse_code_block();
                    self.add_block(Block::CodeBlock(code));
                }
                TokenKind::ImageBegin => {
                    let image = self.parse_image()?;
                    self.add_block(Block::Image(image));
                }
                TokenKind::BlockquoteBegin => {
                    let quote = self.parse_blockquote()?;
                    self.add_block(Block::Blockquote(quote));
                }
                TokenKind::HorizontalRule => {
                    self.bump();
                    self.add_block(Block::HorizontalRule);
                }
                TokenKind::LinkDef => self.parse_link_definition(),
                TokenKind::SidenoteDef => self.parse_sidenote_definition()?,
                TokenKind::HtmlTagOpen => self.parse_html_block()?,
                TokenKind::HtmlTagClose => {
                    let name = self.current_value().to_string();
                    self.error_here(ParseErrorKind::UnexpectedHtmlClose(name));
                    self.bump();
                }
                found => {
                    self.error_here(ParseErrorKind::UnexpectedToken {
                        found,
                        context: "document body",
                    });
                    self.bump();
                }
            }
        }

        if self.section1.is_some() || self.section2.is_some() {
            return Err(InvariantViolation::new(
                "section still open at end of input",
            ));
        }

        debug!(
            "parsed {} sections and {} top-level blocks with {} errors",
            self.blog.sections.len(),
            self.blog.top_level.len(),
            self.errors.len()
        );
        Ok(ParseOutput {
            blog: self.blog,
            errors: self.errors,
        })
    }

    // --- token navigation ---

    /// Current token kind, or `Eof` past the end.
    pub fn current(&self) -> TokenKind {
        self.nth(0)
    }

    /// Looks ahead `n` tokens.
    pub fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    /// Consumes the current token if it matches.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes and returns the current token.
    pub fn bump(&mut self) -> Option<Token<'input>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_token(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).copied()
    }

    fn current_value(&self) -> &'input str {
        self.tokens.get(self.pos).map(|t| t.value).unwrap_or("")
    }

    /// Source offset of the current token, or of the end of input.
    fn current_pos(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some(token) => token.pos,
            None => self.tokens.last().map(Token::end).unwrap_or(0),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.at(TokenKind::Whitespace) {
            self.bump();
        }
    }

    /// Consumes `kind` after optional whitespace, recording an error if it
    /// is missing.
    fn expect(&mut self, kind: TokenKind, context: &'static str) -> bool {
        self.skip_whitespace();
        if self.eat(kind) {
            return true;
        }
        let found = self.current();
        self.error_here(ParseErrorKind::ExpectedToken {
            expected: kind,
            found,
            context,
        });
        false
    }

    fn error(&mut self, pos: usize, kind: ParseErrorKind) {
        self.errors.push(ParseError::new(pos, kind));
    }

    fn error_here(&mut self, kind: ParseErrorKind) {
        let pos = self.current_pos();
        self.error(pos, kind);
    }

    // --- structure ---

    fn parse_meta(&mut self) -> Result<(), InvariantViolation> {
        self.bump();
        loop {
            match self.current() {
                TokenKind::MetaEnd => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::Eof => return Ok(()),
                TokenKind::Whitespace => {
                    self.bump();
                }
                TokenKind::MetaKey => {
                    let Some(key) = self.bump() else {
                        return Ok(());
                    };
                    let content = self.parse_inline_until(is_line_break)?;
                    self.blog.meta.insert(
                        key.value,
                        MetaValue {
                            content,
                            pos: key.pos,
                        },
                    );
                }
                kind if kind.is_inline() => {
                    self.error_here(ParseErrorKind::MalformedMetaLine);
                    while self.current().is_inline() {
                        self.bump();
                    }
                }
                found => {
                    self.error_here(ParseErrorKind::UnexpectedToken {
                        found,
                        context: "metadata",
                    });
                    return Ok(());
                }
            }
        }
    }

    fn open_section(&mut self, level: SectionLevel) -> Result<(), InvariantViolation> {
        let pos = self.current_pos();
        self.bump();
        match level {
            SectionLevel::One if self.section1.is_some() || self.section2.is_some() => {
                return Err(InvariantViolation::new(format!(
                    "level-1 section at {pos} opened inside another section"
                )));
            }
            SectionLevel::Two if self.section2.is_some() => {
                return Err(InvariantViolation::new(format!(
                    "level-2 section at {pos} opened inside another level-2 section"
                )));
            }
            SectionLevel::Two if self.section1.is_none() => {
                self.error(pos, ParseErrorKind::SectionWithoutParent);
            }
            _ => {}
        }

        let heading = self.parse_inline()?;
        self.skip_whitespace();
        let id = if self.at(TokenKind::SectionId) {
            self.bump().map(|t| t.value.to_string())
        } else {
            None
        };
        let content = match level {
            SectionLevel::One => TokenKind::Section1Content,
            SectionLevel::Two => TokenKind::Section2Content,
        };
        self.expect(content, "section heading");

        let section = Section {
            level,
            id,
            heading,
            content: Vec::new(),
            pos,
        };
        match level {
            SectionLevel::One => self.section1 = Some(section),
            SectionLevel::Two => self.section2 = Some(section),
        }
        Ok(())
    }

    fn close_section(&mut self, level: SectionLevel) -> Result<(), InvariantViolation> {
        let pos = self.current_pos();
        self.bump();
        match level {
            SectionLevel::One => {
                if self.section2.is_some() {
                    return Err(InvariantViolation::new(format!(
                        "level-1 section closed at {pos} while a level-2 section is open"
                    )));
                }
                let section = self.section1.take().ok_or_else(|| {
                    InvariantViolation::new(format!("level-1 section end at {pos} without begin"))
                })?;
                self.blog.sections.push(section);
            }
            SectionLevel::Two => {
                let section = self.section2.take().ok_or_else(|| {
                    InvariantViolation::new(format!("level-2 section end at {pos} without begin"))
                })?;
                match self.section1.as_mut() {
                    Some(parent) => parent.content.push(Block::Section(section)),
                    None => self.blog.top_level.push(Block::Section(section)),
                }
            }
        }
        Ok(())
    }

    /// Appends a block to the innermost open section.
    fn add_block(&mut self, block: Block) {
        if let Some(section) = self.section2.as_mut() {
            section.content.push(block);
        } else if let Some(section) = self.section1.as_mut() {
            section.content.push(block);
        } else {
            self.blog.top_level.push(block);
        }
    }

    fn parse_html_block(&mut self) -> Result<(), InvariantViolation> {
        let tag = self.parse_html_tag()?;
        self.dispatch_tag(tag);
        Ok(())
    }

    /// Runs the handler for `tag`, then for each nested tag it left behind,
    /// in document order.
    fn dispatch_tag(&mut self, mut tag: HtmlTag) {
        let registry = self.registry;
        match registry.dispatch(&mut self.blog, &mut tag) {
            Ok(TagOutput::Nothing) => {}
            Ok(TagOutput::Block(block)) => self.add_block(block),
            Ok(TagOutput::Inline(inline)) => self.add_block(Block::Paragraph(Paragraph {
                content: vec![inline],
            })),
            Err(message) => self.error(
                tag.pos,
                ParseErrorKind::TagHandler {
                    tag: tag.name.clone(),
                    message,
                },
            ),
        }
        for child in std::mem::take(&mut tag.children) {
            self.dispatch_tag(child);
        }
    }
}

fn is_line_break(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Whitespace && token.text.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Inline, plain_text};
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn parse_src(src: &str) -> ParseOutput {
        parse(&lex(src).tokens).expect("no invariant violation")
    }

    fn error_kinds(output: &ParseOutput) -> Vec<ParseErrorKind> {
        output.errors.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn metadata_values_are_inline_content() {
        let out = parse_src("---\ntitle: A *bold* move\nlang: en\n---\n");
        let title = out.blog.meta.get("title");
        assert_eq!(title.len(), 1);
        assert_eq!(
            title[0].content,
            vec![
                Inline::Text("A ".into()),
                Inline::Emphasis(vec![Inline::Text("bold".into())]),
                Inline::Text(" move".into()),
            ]
        );
        assert_eq!(out.blog.meta.first_text("lang").as_deref(), Some("en"));
        assert!(out.errors.is_empty());
    }

    #[test]
    fn duplicate_meta_keys_are_kept() {
        let out = parse_src("---\ntags: a\ntags: b\n---\n");
        assert_eq!(out.blog.meta.get("tags").len(), 2);
    }

    #[test]
    fn malformed_meta_line() {
        let out = parse_src("---\nnot a key value\nlang: en\n---\n");
        assert_eq!(error_kinds(&out), vec![ParseErrorKind::MalformedMetaLine]);
        assert_eq!(out.blog.meta.first_text("lang").as_deref(), Some("en"));
    }

    #[test]
    fn sections_nest_two_levels() {
        let out = parse_src("intro\n# One\na\n## Sub\nb\n# Two\nc\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.blog.top_level.len(), 1);
        assert_eq!(out.blog.sections.len(), 2);

        let one = &out.blog.sections[0];
        assert_eq!(plain_text(&one.heading), "One");
        assert_eq!(one.content.len(), 2);
        let sub: Vec<_> = one.subsections().collect();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].level, SectionLevel::Two);
        assert_eq!(plain_text(&sub[0].heading), "Sub");
        assert_eq!(sub[0].content.len(), 1);
    }

    #[test]
    fn orphan_level2_section_is_kept_with_error() {
        let out = parse_src("## Orphan\ntext\n# One\n");
        assert_eq!(error_kinds(&out), vec![ParseErrorKind::SectionWithoutParent]);
        assert!(matches!(
            out.blog.top_level.as_slice(),
            [Block::Section(Section { level: SectionLevel::Two, .. })]
        ));
        assert_eq!(out.blog.sections.len(), 1);
    }

    #[test]
    fn explicit_section_id() {
        let out = parse_src("# Intro {#start}\n");
        assert_eq!(out.blog.sections[0].id.as_deref(), Some("start"));
        assert_eq!(plain_text(&out.blog.sections[0].heading), "Intro");
    }

    #[test]
    fn mismatched_html_close() {
        let out = parse_src("<Abstract>\ntext\n</Todo>\n");
        assert_eq!(
            error_kinds(&out),
            vec![ParseErrorKind::MismatchedHtmlTag {
                open: "Abstract".into(),
                close: "Todo".into()
            }]
        );
    }

    #[test]
    fn stray_html_close() {
        let out = parse_src("</Abstract>\n");
        assert_eq!(
            error_kinds(&out),
            vec![ParseErrorKind::UnexpectedHtmlClose("Abstract".into())]
        );
    }

    #[test]
    fn abstract_tag_sets_abstract() {
        let out = parse_src("<Abstract>\nIn *short*.\n</Abstract>\n# One\n");
        assert_eq!(
            out.blog.abstract_text,
            Some(vec![
                Inline::Text("In ".into()),
                Inline::Emphasis(vec![Inline::Text("short".into())]),
                Inline::Text(".".into()),
            ])
        );
        assert!(out.blog.top_level.is_empty());
    }

    #[test]
    fn code_tag_becomes_block_in_section() {
        let out = parse_src("# One\n<Code Lang=\"go\">\nx := 1\n</Code>\n");
        assert!(out.errors.is_empty());
        match out.blog.sections[0].content.as_slice() {
            [Block::CodeBlock(code)] => {
                assert_eq!(code.lang.as_deref(), Some("go"));
                assert_eq!(code.content, vec!["x := 1".to_string()]);
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn second_abstract_is_a_tag_error() {
        let out = parse_src("<Abstract>a</Abstract>\n<Abstract>b</Abstract>\n");
        assert_eq!(out.errors.len(), 1);
        assert!(matches!(
            &out.errors[0].kind,
            ParseErrorKind::TagHandler { tag, .. } if tag == "Abstract"
        ));
    }

    #[test]
    fn tags_nested_in_abstract_are_dispatched() {
        let out = parse_src(
            "# S\n<Abstract>\nIntro\n<Code Lang=\"go\">\nx := 1\n</Code>\n</Abstract>\n",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(
            out.blog.abstract_text,
            Some(vec![Inline::Text("Intro".into())])
        );
        match out.blog.sections[0].content.as_slice() {
            [Block::CodeBlock(code)] => {
                assert_eq!(code.lang.as_deref(), Some("go"));
                assert_eq!(code.content, vec!["x := 1".to_string()]);
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn nested_handler_errors_are_reported() {
        let out = parse_src("<Abstract>
a
<Abstract>b</Abstract>
</Abstract>
");
        assert_eq!(out.errors.len(), 1);
        assert!(matches!(
            &out.errors[0].kind,
            ParseErrorKind::TagHandler { tag, .. } if tag == "Abstract"
        ));
        assert_eq!(out.errors[0].pos, 13);
    }

    #[test]
    fn nested_unknown_tags_reach_the_registry() {
        fn rule(_: &mut Blog, _: &mut HtmlTag) -> Result<TagOutput, String> {
            Ok(TagOutput::Block(Block::HorizontalRule))
        }
        let src = "<Abstract>\nIntro\n<Marquee>\n<Break/>\n</Marquee>\n</Abstract>\n";
        let mut registry = TagRegistry::default();
        registry.register("Break", rule);

        let out = parse_with(&lex(src).tokens, &registry).expect("no invariant violation");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        // the unknown <Marquee> is skipped but its own children still run
        assert_eq!(out.blog.top_level, vec![Block::HorizontalRule]);
    }

    #[test]
    fn sidenote_tag_becomes_a_paragraph() {
        let out = parse_src("# S\n<Sidenote Word=\"cat\">A small animal.</Sidenote>\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        match out.blog.sections[0].content.as_slice() {
            [Block::Paragraph(p)] => match p.content.as_slice() {
                [Inline::Sidenote(note)] => {
                    assert_eq!(plain_text(&note.word), "cat");
                    assert_eq!(
                        note.content,
                        Some(vec![Inline::Text("A small animal.".into())])
                    );
                }
                other => panic!("unexpected inlines: {other:?}"),
            },
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn sidenote_tag_long_form() {
        let out = parse_src(
            "<Sidenote>\n<Word>cat</Word>\n<Content>A *small* animal.</Content>\n</Sidenote>\n",
        );
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let [Block::Paragraph(p)] = out.blog.top_level.as_slice() else {
            panic!("unexpected blocks: {:?}", out.blog.top_level);
        };
        let [Inline::Sidenote(note)] = p.content.as_slice() else {
            panic!("unexpected inlines: {:?}", p.content);
        };
        assert_eq!(plain_text(&note.word), "cat");
        assert_eq!(
            note.content.as_deref().map(plain_text).as_deref(),
            Some("A small animal.")
        );
    }

    #[test]
    fn impossible_section_end_is_an_invariant_violation() {
        let tokens = [
            Token::new(TokenKind::Section1End, 0, ""),
            Token::new(TokenKind::Eof, 0, ""),
        ];
        assert!(parse(&tokens).is_err());
    }

    #[test]
    fn unknown_special_is_an_invariant_violation() {
        let tokens = [
            Token::new(TokenKind::ParagraphBegin, 0, ""),
            Token::new(TokenKind::AmpSpecial, 0, "&copy;"),
            Token::new(TokenKind::ParagraphEnd, 6, ""),
            Token::new(TokenKind::Eof, 6, ""),
        ];
        let err = parse(&tokens).expect_err("invariant violation");
        assert!(err.message.contains("&copy;"));
    }
}
