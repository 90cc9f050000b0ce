//! Inline content: an explicit stack of open formatting and link frames.
//!
//! Formatting tokens are toggles, so `*` either closes the innermost open
//! emphasis or opens a new one. Closing a frame that is not on top closes
//! everything above it first and records a misnesting error. Links are
//! barriers: a toggle never closes a frame outside the innermost open link.

use crate::ast::{AmpSpecial, Inline, Link, LinkTarget, Sidenote};
use crate::error::{InvariantViolation, ParseError, ParseErrorKind};
use crate::token::{Token, TokenKind};

use super::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Emphasis,
    Strong,
    EmphasisStrong,
    Strikethrough,
    Marker,
}

impl Toggle {
    fn name(self) -> &'static str {
        match self {
            Toggle::Emphasis => "emphasis",
            Toggle::Strong => "strong",
            Toggle::EmphasisStrong => "strong emphasis",
            Toggle::Strikethrough => "strikethrough",
            Toggle::Marker => "highlight",
        }
    }

    fn wrap(self, content: Vec<Inline>) -> Inline {
        match self {
            Toggle::Emphasis => Inline::Emphasis(content),
            Toggle::Strong => Inline::Strong(content),
            Toggle::EmphasisStrong => Inline::EmphasisStrong(content),
            Toggle::Strikethrough => Inline::Strikethrough(content),
            Toggle::Marker => Inline::Marker(content),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Href(String),
    Reference(String),
    Sidenote(String),
}

#[derive(Debug)]
enum FrameKind {
    Toggle(Toggle),
    Link(Option<Target>),
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    pos: usize,
    content: Vec<Inline>,
}

#[derive(Debug, Default)]
struct InlineBuilder {
    root: Vec<Inline>,
    frames: Vec<Frame>,
    errors: Vec<ParseError>,
}

impl InlineBuilder {
    fn push(&mut self, inline: Inline) {
        let content = match self.frames.last_mut() {
            Some(frame) => &mut frame.content,
            None => &mut self.root,
        };
        if let (Inline::Text(new), Some(Inline::Text(last))) = (&inline, content.last_mut()) {
            last.push_str(new);
            return;
        }
        content.push(inline);
    }

    fn push_all(&mut self, inlines: Vec<Inline>) {
        for inline in inlines {
            self.push(inline);
        }
    }

    fn open(&mut self, kind: FrameKind, pos: usize) {
        self.frames.push(Frame {
            kind,
            pos,
            content: Vec::new(),
        });
    }

    /// Index of the first frame above the innermost open link.
    fn link_floor(&self) -> usize {
        self.frames
            .iter()
            .rposition(|f| matches!(f.kind, FrameKind::Link(_)))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn toggle(&mut self, toggle: Toggle, pos: usize) {
        let floor = self.link_floor();
        let open = self.frames[floor..]
            .iter()
            .rposition(|f| matches!(f.kind, FrameKind::Toggle(t) if t == toggle));
        let Some(index) = open.map(|i| floor + i) else {
            self.open(FrameKind::Toggle(toggle), pos);
            return;
        };

        while self.frames.len() > index + 1 {
            if let Some(inner) = self.frames.pop() {
                if let FrameKind::Toggle(t) = inner.kind {
                    self.errors.push(ParseError::new(
                        inner.pos,
                        ParseErrorKind::MisnestedInline {
                            inner: t.name(),
                            outer: toggle.name(),
                        },
                    ));
                }
                self.close_frame(inner);
            }
        }
        if let Some(frame) = self.frames.pop() {
            self.push(toggle.wrap(frame.content));
        }
    }

    /// Closes frames above the innermost link, reporting each as unclosed.
    /// Returns the index of that link frame.
    fn unwind_to_link(&mut self) -> Option<usize> {
        let index = self.link_floor().checked_sub(1)?;
        while self.frames.len() > index + 1 {
            if let Some(inner) = self.frames.pop() {
                if let FrameKind::Toggle(t) = inner.kind {
                    self.errors.push(ParseError::new(
                        inner.pos,
                        ParseErrorKind::UnclosedInline(t.name()),
                    ));
                }
                self.close_frame(inner);
            }
        }
        Some(index)
    }

    fn set_target(&mut self, target: Target, token: &Token<'_>) {
        match self.unwind_to_link() {
            Some(index) => self.frames[index].kind = FrameKind::Link(Some(target)),
            None => self.errors.push(ParseError::new(
                token.pos,
                ParseErrorKind::UnexpectedToken {
                    found: token.kind,
                    context: "inline content",
                },
            )),
        }
    }

    fn close_link(&mut self, token: &Token<'_>) {
        if self.unwind_to_link().is_none() {
            self.errors.push(ParseError::new(
                token.pos,
                ParseErrorKind::UnexpectedToken {
                    found: token.kind,
                    context: "inline content",
                },
            ));
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let FrameKind::Link(target) = frame.kind else {
            return;
        };
        match target {
            Some(Target::Href(href)) => self.push(Inline::Link(Link {
                name: frame.content,
                target: LinkTarget::Href(href),
                pos: frame.pos,
            })),
            Some(Target::Reference(name)) => self.push(Inline::Link(Link {
                name: frame.content,
                target: LinkTarget::Reference { name, href: None },
                pos: frame.pos,
            })),
            Some(Target::Sidenote(reference)) => self.push(Inline::Sidenote(Sidenote {
                reference,
                word: frame.content,
                id: None,
                content: None,
                pos: frame.pos,
            })),
            None => {
                // the lexer already reported the missing target
                self.push(Inline::Text("[".to_string()));
                self.push_all(frame.content);
                if !token.text.is_empty() {
                    self.push(Inline::Text(token.text.to_string()));
                }
            }
        }
    }

    /// Folds a frame that never saw its closing token into its parent.
    fn close_frame(&mut self, frame: Frame) {
        match frame.kind {
            FrameKind::Toggle(t) => self.push(t.wrap(frame.content)),
            FrameKind::Link(_) => {
                self.push(Inline::Text("[".to_string()));
                self.push_all(frame.content);
            }
        }
    }

    fn finish(mut self) -> (Vec<Inline>, Vec<ParseError>) {
        while let Some(frame) = self.frames.pop() {
            if let FrameKind::Toggle(t) = frame.kind {
                self.errors.push(ParseError::new(
                    frame.pos,
                    ParseErrorKind::UnclosedInline(t.name()),
                ));
            }
            self.close_frame(frame);
        }
        (self.root, self.errors)
    }
}

impl<'t, 'input> Parser<'t, 'input> {
    /// Parses inline tokens up to the next block-level token.
    pub(super) fn parse_inline(&mut self) -> Result<Vec<Inline>, InvariantViolation> {
        self.parse_inline_until(|_| false)
    }

    /// Parses inline tokens until `stop` matches or a block-level token is
    /// reached. Trivia in between is skipped.
    pub(super) fn parse_inline_until(
        &mut self,
        stop: impl Fn(&Token<'input>) -> bool,
    ) -> Result<Vec<Inline>, InvariantViolation> {
        let mut builder = InlineBuilder::default();

        while let Some(token) = self.peek_token() {
            if stop(&token) {
                break;
            }
            if token.kind.is_trivia() {
                self.bump();
                continue;
            }
            if !token.kind.is_inline() {
                break;
            }
            self.bump();

            match token.kind {
                TokenKind::Text => builder.push(Inline::Text(token.value.to_string())),
                TokenKind::Escaped => builder.push(Inline::Text(token.value.to_string())),
                TokenKind::AmpSpecial => {
                    let special = AmpSpecial::from_source(token.text).ok_or_else(|| {
                        InvariantViolation::new(format!(
                            "unknown special `{}` at {}",
                            token.text, token.pos
                        ))
                    })?;
                    builder.push(Inline::AmpSpecial(special));
                }
                TokenKind::Mono => builder.push(Inline::Mono(token.value.to_string())),
                TokenKind::Emphasis => builder.toggle(Toggle::Emphasis, token.pos),
                TokenKind::Strong => builder.toggle(Toggle::Strong, token.pos),
                TokenKind::EmphasisStrong => builder.toggle(Toggle::EmphasisStrong, token.pos),
                TokenKind::Strikethrough => builder.toggle(Toggle::Strikethrough, token.pos),
                TokenKind::Marker => builder.toggle(Toggle::Marker, token.pos),
                TokenKind::LinkBegin => builder.open(FrameKind::Link(None), token.pos),
                TokenKind::LinkHref => {
                    builder.set_target(Target::Href(token.value.to_string()), &token)
                }
                TokenKind::LinkRef => {
                    builder.set_target(Target::Reference(token.value.to_string()), &token)
                }
                TokenKind::SidenoteRef => {
                    builder.set_target(Target::Sidenote(token.value.to_string()), &token)
                }
                TokenKind::LinkEnd => builder.close_link(&token),
                other => {
                    return Err(InvariantViolation::new(format!(
                        "{other:?} at {} is not inline content",
                        token.pos
                    )));
                }
            }
        }

        let (content, errors) = builder.finish();
        self.errors.extend(errors);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AmpSpecial, Block, Inline, Link, LinkTarget, Sidenote};
    use crate::error::ParseErrorKind;
    use crate::lexer::lex;
    use crate::parser::{ParseOutput, parse};
    use pretty_assertions::assert_eq;

    fn paragraph(src: &str) -> (Vec<Inline>, Vec<ParseErrorKind>) {
        let ParseOutput { blog, errors } = parse(&lex(src).tokens).expect("parse");
        let content = match blog.top_level.into_iter().next() {
            Some(Block::Paragraph(p)) => p.content,
            other => panic!("expected a paragraph, got {other:?}"),
        };
        (content, errors.into_iter().map(|e| e.kind).collect())
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn nested_formatting() {
        let (content, errors) = paragraph("**bold *and italic* too**");
        assert!(errors.is_empty());
        assert_eq!(
            content,
            vec![Inline::Strong(vec![
                text("bold "),
                Inline::Emphasis(vec![text("and italic")]),
                text(" too"),
            ])]
        );
    }

    #[test]
    fn escapes_join_text() {
        let (content, _) = paragraph(r"a \* b");
        assert_eq!(content, vec![text("a * b")]);
    }

    #[test]
    fn specials_and_mono() {
        let (content, _) = paragraph("wait... `x`");
        assert_eq!(
            content,
            vec![
                text("wait"),
                Inline::AmpSpecial(AmpSpecial::Ellipsis),
                text(" "),
                Inline::Mono("x".into()),
            ]
        );
    }

    #[test]
    fn misnested_toggles_are_reported() {
        let (content, errors) = paragraph("*a ~~b* c~~");
        assert_eq!(
            errors,
            vec![
                ParseErrorKind::MisnestedInline {
                    inner: "strikethrough",
                    outer: "emphasis"
                },
                ParseErrorKind::UnclosedInline("strikethrough"),
            ]
        );
        assert_eq!(
            content,
            vec![
                Inline::Emphasis(vec![text("a "), Inline::Strikethrough(vec![text("b")])]),
                text(" c"),
                Inline::Strikethrough(vec![]),
            ]
        );
    }

    #[test]
    fn unclosed_emphasis() {
        let (content, errors) = paragraph("*open");
        assert_eq!(errors, vec![ParseErrorKind::UnclosedInline("emphasis")]);
        assert_eq!(content, vec![Inline::Emphasis(vec![text("open")])]);
    }

    #[test]
    fn links_and_sidenotes() {
        let (content, errors) = paragraph("[*a*](https://x.org) [b][ref] [c][^sn]");
        assert!(errors.is_empty());
        assert_eq!(
            content,
            vec![
                Inline::Link(Link {
                    name: vec![Inline::Emphasis(vec![text("a")])],
                    target: LinkTarget::Href("https://x.org".into()),
                    pos: 0,
                }),
                text(" "),
                Inline::Link(Link {
                    name: vec![text("b")],
                    target: LinkTarget::Reference {
                        name: "ref".into(),
                        href: None
                    },
                    pos: 21,
                }),
                text(" "),
                Inline::Sidenote(Sidenote {
                    reference: "sn".into(),
                    word: vec![text("c")],
                    id: None,
                    content: None,
                    pos: 30,
                }),
            ]
        );
    }

    #[test]
    fn emphasis_cannot_close_across_link() {
        let (content, errors) = paragraph("*a [b*](x)");
        assert_eq!(
            errors,
            vec![
                ParseErrorKind::UnclosedInline("emphasis"),
                ParseErrorKind::UnclosedInline("emphasis"),
            ]
        );
        assert_eq!(
            content,
            vec![Inline::Emphasis(vec![
                text("a "),
                Inline::Link(Link {
                    name: vec![text("b"), Inline::Emphasis(vec![])],
                    target: LinkTarget::Href("x".into()),
                    pos: 3,
                }),
            ])]
        );
    }

    #[test]
    fn brackets_without_target_stay_text() {
        let (content, errors) = paragraph("[plain] text");
        assert!(errors.is_empty());
        assert_eq!(content, vec![text("[plain] text")]);
    }
}
