use crate::ast::AmpSpecial;
use crate::error::LexErrorKind;
use crate::token::TokenKind;

use super::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes inline content from the cursor up to `limit`.
    ///
    /// Ordinary characters accumulate into the pending text run, which is
    /// flushed as soon as a special token is emitted. The cursor never moves
    /// past `limit`.
    pub(super) fn lex_inline(&mut self, limit: usize) {
        while self.scanner.pos() < limit {
            let start = self.scanner.pos();
            let rest = self.scanner.slice(start, limit);
            let Some(c) = rest.chars().next() else {
                break;
            };

            match c {
                '\\' => match rest[1..].chars().next() {
                    Some(escaped) => {
                        let end = start + 1 + escaped.len_utf8();
                        self.scanner.advance_to(end);
                        self.emit_with_value(TokenKind::Escaped, start, end, (start + 1, end));
                    }
                    None => self.text(1),
                },
                '`' => match rest[1..].find('`') {
                    Some(close) => {
                        let end = start + 1 + close + 1;
                        self.scanner.advance_to(end);
                        self.emit_with_value(TokenKind::Mono, start, end, (start + 1, end - 1));
                    }
                    None => {
                        self.error(start, LexErrorKind::UnterminatedCodeSpan);
                        self.text(1);
                    }
                },
                '*' => {
                    let run = rest.bytes().take_while(|&b| b == b'*').count().min(3);
                    let kind = match run {
                        3 => TokenKind::EmphasisStrong,
                        2 => TokenKind::Strong,
                        _ => TokenKind::Emphasis,
                    };
                    self.special(kind, run);
                }
                '~' if rest.starts_with("~~") => self.special(TokenKind::Strikethrough, 2),
                '=' if rest.starts_with("==") => self.special(TokenKind::Marker, 2),
                '-' if rest.starts_with("---") => self.special(TokenKind::AmpSpecial, 3),
                '-' if rest.starts_with("--") => self.special(TokenKind::AmpSpecial, 2),
                '.' if rest.starts_with("...") => self.special(TokenKind::AmpSpecial, 3),
                '~' | '…' | '\u{a0}' => self.special(TokenKind::AmpSpecial, 1),
                '&' => self.lex_entity(limit),
                '[' => {
                    self.link_depth += 1;
                    self.special(TokenKind::LinkBegin, 1);
                }
                ']' if self.link_depth > 0 => self.lex_link_target(limit),
                _ => self.text(1),
            }
        }
    }

    /// Adds `n` characters to the pending text run.
    fn text(&mut self, n: usize) {
        if self.text_start.is_none() {
            self.text_start = Some(self.scanner.pos());
        }
        self.scanner.advance(n);
    }

    /// Emits the next `n` characters as one token of `kind`.
    fn special(&mut self, kind: TokenKind, n: usize) {
        let start = self.scanner.pos();
        self.scanner.advance(n);
        self.emit(kind, start, self.scanner.pos());
    }

    /// `&name;` entities. Uses the scanner checkpoint to back out of a name
    /// that turns out not to be terminated.
    fn lex_entity(&mut self, limit: usize) {
        let start = self.scanner.pos();
        self.scanner.mark();
        self.scanner.advance(1);
        let name = self
            .scanner
            .advance_while(limit, |c| c.is_ascii_alphanumeric());

        if name.is_empty() {
            self.scanner.reset();
            self.text(1);
            return;
        }
        if self.scanner.pos() < limit && self.scanner.eat(";") {
            if AmpSpecial::from_entity(name).is_some() {
                self.emit(TokenKind::AmpSpecial, start, self.scanner.pos());
            } else {
                self.error(start, LexErrorKind::UnknownEntity(name.to_string()));
                if self.text_start.is_none() {
                    self.text_start = Some(start);
                }
            }
            return;
        }

        self.error(start, LexErrorKind::UnterminatedEntity(name.to_string()));
        self.scanner.reset();
        self.text(1);
    }

    /// The `]` closing a link, with whatever target follows it.
    fn lex_link_target(&mut self, limit: usize) {
        let start = self.scanner.pos();
        let rest = self.scanner.slice(start, limit);

        let target = if let Some(inner) = rest.strip_prefix("](") {
            inner
                .find(')')
                .filter(|&close| close > 0)
                .map(|close| (TokenKind::LinkHref, 2, close, 1))
        } else if let Some(inner) = rest.strip_prefix("][^") {
            inner
                .find(']')
                .filter(|&close| close > 0)
                .map(|close| (TokenKind::SidenoteRef, 3, close, 1))
        } else if let Some(inner) = rest.strip_prefix("][") {
            inner
                .find(']')
                .filter(|&close| close > 0)
                .map(|close| (TokenKind::LinkRef, 2, close, 1))
        } else {
            None
        };

        self.link_depth -= 1;
        match target {
            Some((kind, open, len, close)) => {
                let value_start = start + open;
                let end = value_start + len + close;
                self.scanner.advance_to(end);
                self.emit_with_value(kind, start, end, (value_start, value_start + len));
                self.push_marker(TokenKind::LinkEnd);
            }
            None => {
                self.error(start, LexErrorKind::MissingLinkTarget);
                self.special(TokenKind::LinkEnd, 1);
            }
        }
    }
}
