use crate::ast::{
    Blockquote, CodeBlock, Image, Inline, LineRange, LinkDefinition, Paragraph,
    SidenoteDefinition,
};
use crate::error::{InvariantViolation, ParseErrorKind};
use crate::html::HtmlTag;
use crate::token::TokenKind;

use super::Parser;

/// Parses `first-last` (or a single line number) into a range.
pub fn line_range(text: &str) -> Option<LineRange> {
    let (first, last) = text.split_once('-').unwrap_or((text, text));
    let first: u32 = first.trim().parse().ok()?;
    let last: u32 = last.trim().parse().ok()?;
    (first >= 1 && first <= last).then_some(LineRange { first, last })
}

impl<'t, 'input> Parser<'t, 'input> {
    pub(super) fn parse_paragraph(&mut self) -> Result<Paragraph, InvariantViolation> {
        self.bump();
        let content = self.parse_inline()?;
        self.expect(TokenKind::ParagraphEnd, "paragraph");
        Ok(Paragraph { content })
    }

    pub(super) fn parse_code_block(&mut self) -> CodeBlock {
        self.bump();
        let mut code = CodeBlock::default();

        self.skip_whitespace();
        if self.at(TokenKind::CodeBlockLang) {
            code.lang = self.bump().map(|t| t.value.to_string());
        }
        self.skip_whitespace();
        if let Some(attr) = self.at(TokenKind::CodeBlockAttr).then(|| self.bump()).flatten() {
            self.apply_code_attributes(&mut code, attr.value, attr.pos);
        }

        loop {
            match self.current() {
                TokenKind::Whitespace => {
                    self.bump();
                }
                TokenKind::CodeBlockSource => {
                    if let Some(line) = self.bump() {
                        code.content.push(line.value.to_string());
                    }
                }
                _ => break,
            }
        }
        self.expect(TokenKind::CodeBlockEnd, "code block");
        code
    }

    /// `source-link L:first-last`, in any order.
    fn apply_code_attributes(&mut self, code: &mut CodeBlock, attrs: &str, pos: usize) {
        for word in attrs.split_whitespace() {
            if let Some(range) = word.strip_prefix("L:") {
                match line_range(range) {
                    Some(lines) if code.lines.is_none() => code.lines = Some(lines),
                    _ => self.error(pos, ParseErrorKind::InvalidCodeAttribute(word.to_string())),
                }
            } else if code.source.is_none() {
                code.source = Some(word.to_string());
            } else {
                self.error(pos, ParseErrorKind::InvalidCodeAttribute(word.to_string()));
            }
        }
    }

    pub(super) fn parse_image(&mut self) -> Result<Image, InvariantViolation> {
        self.bump();
        let title = self.parse_inline()?;
        let path = if self.at(TokenKind::ImagePath) {
            self.bump().map(|t| t.value.to_string()).unwrap_or_default()
        } else {
            self.expect(TokenKind::ImagePath, "image");
            String::new()
        };
        let alt = if self.at(TokenKind::ImageAlt) {
            self.bump().map(|t| t.value.to_string())
        } else {
            None
        };
        self.expect(TokenKind::ImageEnd, "image");
        Ok(Image { path, title, alt })
    }

    pub(super) fn parse_blockquote(&mut self) -> Result<Blockquote, InvariantViolation> {
        self.bump();
        let mut quote = Blockquote {
            content: self.parse_inline()?,
            ..Blockquote::default()
        };
        trim_trailing_line_break(&mut quote.content);

        if self.eat(TokenKind::BlockquoteAttribution) {
            quote.author = self.parse_inline()?;
            if self.eat(TokenKind::BlockquoteSource) {
                quote.source = self.parse_inline()?;
            }
        }
        self.expect(TokenKind::BlockquoteEnd, "quotation");
        Ok(quote)
    }

    pub(super) fn parse_link_definition(&mut self) {
        let Some(def) = self.bump() else {
            return;
        };
        let name = def.value.to_string();
        self.skip_whitespace();
        let href = if self.at(TokenKind::LinkDefTarget) {
            self.bump().map(|t| t.value.trim()).unwrap_or("")
        } else {
            ""
        };

        if href.is_empty() {
            self.error(def.pos, ParseErrorKind::EmptyLinkDefinition(name));
        } else if self.blog.link_definitions.contains_key(&name) {
            self.error(def.pos, ParseErrorKind::DuplicateLinkDefinition(name));
        } else {
            self.blog.link_definitions.insert(
                name,
                LinkDefinition {
                    href: href.to_string(),
                    pos: def.pos,
                },
            );
        }
    }

    pub(super) fn parse_sidenote_definition(&mut self) -> Result<(), InvariantViolation> {
        let Some(def) = self.bump() else {
            return Ok(());
        };
        let name = def.value.to_string();
        let content = self.parse_inline()?;
        self.expect(TokenKind::SidenoteDefEnd, "sidenote definition");

        if self.blog.sidenote_definitions.contains_key(&name) {
            self.error(def.pos, ParseErrorKind::DuplicateSidenoteDefinition(name));
        } else {
            self.blog.sidenote_definitions.insert(
                name,
                SidenoteDefinition {
                    content,
                    pos: def.pos,
                },
            );
        }
        Ok(())
    }

    /// Parses an HTML tag with its attributes, content and nested tags.
    pub(super) fn parse_html_tag(&mut self) -> Result<HtmlTag, InvariantViolation> {
        let pos = self.current_pos();
        let name = self.bump().map(|t| t.value).unwrap_or("");
        let mut tag = HtmlTag::new(name, pos);

        loop {
            match self.current() {
                TokenKind::Whitespace | TokenKind::Text => {
                    // stray characters were already reported by the lexer
                    self.bump();
                }
                TokenKind::HtmlAttrKey => {
                    let key = self.bump().map(|t| t.value).unwrap_or("");
                    let value = if self.at(TokenKind::HtmlAttrValue) {
                        self.bump().map(|t| t.value).unwrap_or("")
                    } else {
                        ""
                    };
                    tag.attributes.push((key.to_string(), value.to_string()));
                }
                TokenKind::HtmlTagOpenEnd => {
                    self.bump();
                    break;
                }
                TokenKind::HtmlTagClose => {
                    self.bump();
                    return Ok(tag);
                }
                found => {
                    self.error_here(ParseErrorKind::UnexpectedToken {
                        found,
                        context: "html tag",
                    });
                    return Ok(tag);
                }
            }
        }

        loop {
            match self.current() {
                TokenKind::Whitespace => {
                    self.bump();
                }
                TokenKind::CodeBlockSource => {
                    if let Some(line) = self.bump() {
                        tag.lines.push(line.value.to_string());
                    }
                }
                TokenKind::HtmlTagOpen => {
                    let child = self.parse_html_tag()?;
                    tag.children.push(child);
                }
                TokenKind::HtmlTagClose => {
                    let pos = self.current_pos();
                    let close = self.bump().map(|t| t.value).unwrap_or("");
                    if close != tag.name {
                        self.error(
                            pos,
                            ParseErrorKind::MismatchedHtmlTag {
                                open: tag.name.clone(),
                                close: close.to_string(),
                            },
                        );
                    }
                    return Ok(tag);
                }
                kind if kind.is_inline() => {
                    let content = self.parse_inline()?;
                    if !tag.content.is_empty() {
                        tag.content.push(Inline::Text("\n".to_string()));
                    }
                    tag.content.extend(content);
                }
                TokenKind::Eof => return Ok(tag),
                found => {
                    self.error_here(ParseErrorKind::UnexpectedToken {
                        found,
                        context: "html tag content",
                    });
                    self.bump();
                }
            }
        }
    }
}

/// Drops the line break the lexer keeps at the end of a quotation's last
/// content line when an attribution follows.
fn trim_trailing_line_break(content: &mut Vec<Inline>) {
    if let Some(Inline::Text(text)) = content.last_mut() {
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        if text.is_empty() {
            content.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, plain_text};
    use crate::lexer::lex;
    use crate::parser::{ParseOutput, parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse_src(src: &str) -> ParseOutput {
        parse(&lex(src).tokens).expect("parse")
    }

    fn first_block(src: &str) -> Block {
        parse_src(src)
            .blog
            .top_level
            .into_iter()
            .next()
            .expect("a block")
    }

    #[rstest]
    #[case("1-7", Some(LineRange { first: 1, last: 7 }))]
    #[case("4", Some(LineRange { first: 4, last: 4 }))]
    #[case("7-1", None)]
    #[case("0-2", None)]
    #[case("a-b", None)]
    fn line_ranges(#[case] text: &str, #[case] expected: Option<LineRange>) {
        assert_eq!(line_range(text), expected);
    }

    #[test]
    fn fenced_code_block() {
        let block = first_block("```go https://example.com/main.go L:1-7\nfunc main() {}\n```\n");
        assert_eq!(
            block,
            Block::CodeBlock(CodeBlock {
                lang: Some("go".into()),
                source: Some("https://example.com/main.go".into()),
                lines: Some(LineRange { first: 1, last: 7 }),
                content: vec!["func main() {}".into()],
            })
        );
    }

    #[test]
    fn bad_code_attribute() {
        let out = parse_src("```go a b\n```\n");
        assert_eq!(
            out.errors.iter().map(|e| e.kind.clone()).collect::<Vec<_>>(),
            vec![ParseErrorKind::InvalidCodeAttribute("b".into())]
        );
    }

    #[test]
    fn image_block() {
        let block = first_block("![A *cat*](cat.png \"asleep\")\n");
        match block {
            Block::Image(image) => {
                assert_eq!(image.path, "cat.png");
                assert_eq!(image.alt.as_deref(), Some("asleep"));
                assert_eq!(plain_text(&image.title), "A cat");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn blockquote_parts() {
        let block = first_block("> Stay hungry.\n> Stay foolish.\n> -- Stewart Brand, *Whole Earth*\n");
        match block {
            Block::Blockquote(quote) => {
                assert_eq!(plain_text(&quote.content), "Stay hungry.\nStay foolish.");
                assert_eq!(plain_text(&quote.author), "Stewart Brand");
                assert_eq!(plain_text(&quote.source), "Whole Earth");
            }
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn definitions_are_collected() {
        let out = parse_src("[docs]: https://example.com\n[^sn]: A *side* note.\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.blog.link_definitions["docs"].href, "https://example.com");
        assert_eq!(
            plain_text(&out.blog.sidenote_definitions["sn"].content),
            "A side note."
        );
        assert!(out.blog.top_level.is_empty());
    }

    #[test]
    fn duplicate_definitions_keep_the_first() {
        let out = parse_src("[a]: one\n[a]: two\n[^b]: x\n[^b]: y\n");
        let kinds: Vec<_> = out.errors.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ParseErrorKind::DuplicateLinkDefinition("a".into()),
                ParseErrorKind::DuplicateSidenoteDefinition("b".into()),
            ]
        );
        assert_eq!(out.blog.link_definitions["a"].href, "one");
    }

    #[test]
    fn empty_link_definition() {
        let out = parse_src("[a]:\n");
        assert_eq!(
            out.errors[0].kind,
            ParseErrorKind::EmptyLinkDefinition("a".into())
        );
    }
}
