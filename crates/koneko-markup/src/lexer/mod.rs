//! # Lexer
//!
//! Hand-written state machine turning source text into a flat [`Token`]
//! stream. Blocks are recognised line by line ([`LineClass`]), inline content
//! character by character.
//!
//! ## The Lossless Guarantee
//!
//! Every byte of the input appears in exactly one token. Bytes without a
//! semantic role (indentation, line endings, blank lines) go into
//! `Whitespace` tokens, and text accumulated before an inline special is
//! emitted as a `Text` token before the special itself:
//!
//! ```
//! use koneko_markup::lexer::lex;
//! use koneko_markup::token::reconstruct;
//!
//! let input = "# Hello\n\nSome *text* with `code`...\n";
//! let output = lex(input);
//! assert_eq!(reconstruct(&output.tokens), input);
//! ```
//!
//! ## Error Recovery
//!
//! Malformed input never stops the lexer. Each problem is recorded as a
//! positioned [`LexError`] and lexing resumes at the next plausible
//! boundary, with zero-length tokens synthesized where a closing delimiter
//! was missing.

mod classify;
mod inline;

pub use classify::LineClass;

use log::debug;

use crate::error::{LexError, LexErrorKind};
use crate::meta::VERBATIM_KEYS;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

use classify::{definition_name, heading_id, image_parts, tag_name_len};

/// Tags whose content is captured line by line without inline lexing.
pub const RAW_HTML_TAGS: &[&str] = &["Code"];

const META_DELIMITERS: [&str; 2] = ["---", "+++"];

/// Tokens and errors from one lexing pass.
#[derive(Debug, Clone, Default)]
pub struct LexOutput<'a> {
    pub tokens: Vec<Token<'a>>,
    pub errors: Vec<LexError>,
}

/// Lexes a whole document.
pub fn lex(source: &str) -> LexOutput<'_> {
    Lexer::new(source).run()
}

pub struct Lexer<'a> {
    scanner: Scanner<'a>,
    tokens: Vec<Token<'a>>,
    errors: Vec<LexError>,
    section1_open: bool,
    section2_open: bool,
    /// Links opened in the current block and not yet closed.
    link_depth: usize,
    /// Start of the text run being accumulated.
    text_start: Option<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            scanner: Scanner::new(source),
            tokens: Vec::new(),
            errors: Vec::new(),
            section1_open: false,
            section2_open: false,
            link_depth: 0,
            text_start: None,
        }
    }

    pub fn run(mut self) -> LexOutput<'a> {
        self.lex_leading_meta();
        while !self.scanner.eof() {
            self.lex_block();
        }
        self.close_sections(true);
        self.push_marker(TokenKind::Eof);

        debug!(
            "lexed {} bytes into {} tokens with {} errors",
            self.scanner.source().len(),
            self.tokens.len(),
            self.errors.len()
        );
        LexOutput {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    // --- emission ---

    /// Appends a token, first flushing any pending text run up to the
    /// token's start and merging adjacent whitespace.
    fn push(&mut self, token: Token<'a>) {
        if token.kind != TokenKind::Text
            && let Some(start) = self.text_start.take()
            && token.pos > start
        {
            let text = self.scanner.slice(start, token.pos);
            self.tokens.push(Token::new(TokenKind::Text, start, text));
        }

        if matches!(token.kind, TokenKind::Whitespace | TokenKind::Text) && token.is_empty() {
            return;
        }
        if token.kind == TokenKind::Whitespace
            && let Some(last) = self.tokens.last_mut()
            && last.kind == TokenKind::Whitespace
            && last.end() == token.pos
        {
            let merged = self.scanner.slice(last.pos, token.end());
            *last = Token::new(TokenKind::Whitespace, last.pos, merged);
            return;
        }
        self.tokens.push(token);
    }

    /// Emits the source between `start` and `end` as one token.
    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        let text = self.scanner.slice(start, end);
        self.push(Token::new(kind, start, text));
    }

    fn emit_with_value(&mut self, kind: TokenKind, start: usize, end: usize, value: (usize, usize)) {
        let text = self.scanner.slice(start, end);
        let value = self.scanner.slice(value.0, value.1);
        self.push(Token::new(kind, start, text).with_value(value));
    }

    /// Emits a zero-length token at the cursor.
    fn push_marker(&mut self, kind: TokenKind) {
        let pos = self.scanner.pos();
        self.push(Token::new(kind, pos, ""));
    }

    fn error(&mut self, pos: usize, kind: LexErrorKind) {
        self.errors.push(LexError::new(pos, kind));
    }

    /// Ends the pending text run at the cursor.
    fn flush_text(&mut self) {
        if let Some(start) = self.text_start.take() {
            let end = self.scanner.pos();
            if end > start {
                self.emit(TokenKind::Text, start, end);
            }
        }
    }

    /// Consumes input up to `end` into the pending text run.
    fn extend_text_to(&mut self, end: usize) {
        if self.text_start.is_none() {
            self.text_start = Some(self.scanner.pos());
        }
        self.scanner.advance_to(end);
    }

    /// Consumes input up to `end` as whitespace.
    fn whitespace_to(&mut self, end: usize) {
        let start = self.scanner.pos();
        self.scanner.advance_to(end);
        let end = self.scanner.pos();
        if end > start {
            self.emit(TokenKind::Whitespace, start, end);
        }
    }

    /// Consumes the indentation of the current line.
    fn skip_indent(&mut self) {
        let line = self.scanner.current_line();
        let indent = line.len() - line.trim_start().len();
        self.whitespace_to(self.scanner.pos() + indent);
    }

    /// Consumes the rest of the current line, terminator included, as
    /// whitespace.
    fn finish_line(&mut self) {
        self.whitespace_to(self.scanner.next_line_start());
    }

    /// Flushes text and closes links left open at the end of a block.
    fn end_inline_block(&mut self) {
        self.flush_text();
        while self.link_depth > 0 {
            self.error(self.scanner.pos(), LexErrorKind::UnclosedLink);
            self.push_marker(TokenKind::LinkEnd);
            self.link_depth -= 1;
        }
    }

    fn close_sections(&mut self, level1: bool) {
        if self.section2_open {
            self.push_marker(TokenKind::Section2End);
            self.section2_open = false;
        }
        if level1 && self.section1_open {
            self.push_marker(TokenKind::Section1End);
            self.section1_open = false;
        }
    }

    // --- metadata ---

    fn lex_leading_meta(&mut self) {
        while !self.scanner.eof() && self.scanner.current_line().trim().is_empty() {
            self.finish_line();
        }
        let line = self.scanner.current_line().trim();
        if let Some(delimiter) = META_DELIMITERS.iter().find(|d| **d == line) {
            self.lex_meta(delimiter);
        }
    }

    fn lex_meta(&mut self, open: &str) {
        self.skip_indent();
        let start = self.scanner.pos();
        self.scanner.advance(3);
        self.emit(TokenKind::MetaBegin, start, self.scanner.pos());
        self.finish_line();

        loop {
            if self.scanner.eof() {
                self.error(self.scanner.pos(), LexErrorKind::UnterminatedMeta);
                self.push_marker(TokenKind::MetaEnd);
                return;
            }
            let line = self.scanner.current_line();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.finish_line();
                continue;
            }
            if META_DELIMITERS.contains(&trimmed) {
                self.skip_indent();
                let start = self.scanner.pos();
                self.scanner.advance(3);
                self.emit(TokenKind::MetaEnd, start, self.scanner.pos());
                if trimmed != open {
                    self.error(
                        start,
                        LexErrorKind::MetaDelimiterMismatch {
                            open: open.to_string(),
                            close: trimmed.to_string(),
                        },
                    );
                }
                self.finish_line();
                return;
            }
            if matches!(
                LineClass::of(line),
                LineClass::Heading(_) | LineClass::HtmlOpen | LineClass::HtmlClose
            ) {
                self.error(self.scanner.pos(), LexErrorKind::UnterminatedMeta);
                self.push_marker(TokenKind::MetaEnd);
                return;
            }
            self.lex_meta_line();
        }
    }

    fn lex_meta_line(&mut self) {
        self.skip_indent();
        let body = self.scanner.current_line();
        let value_end = self.scanner.pos() + body.trim_end().len();

        let key_len = body
            .bytes()
            .position(|b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
            .unwrap_or(body.len());
        let mut verbatim = false;
        if key_len > 0 && body.as_bytes().get(key_len) == Some(&b':') {
            verbatim = VERBATIM_KEYS.contains(&&body[..key_len]);
            let start = self.scanner.pos();
            let after_colon = &body[key_len + 1..];
            let spaces = after_colon.len() - after_colon.trim_start().len();
            self.scanner.advance_to(start + key_len + 1 + spaces);
            self.emit_with_value(
                TokenKind::MetaKey,
                start,
                self.scanner.pos(),
                (start, start + key_len),
            );
        }

        let start = self.scanner.pos();
        if !verbatim {
            self.lex_inline(value_end);
        } else if start < value_end {
            self.scanner.advance_to(value_end);
            self.emit(TokenKind::Text, start, value_end);
        }
        self.end_inline_block();
        self.finish_line();
    }

    // --- blocks ---

    fn lex_block(&mut self) {
        let line = self.scanner.current_line();
        match LineClass::of(line) {
            LineClass::Blank => self.finish_line(),
            LineClass::HorizontalRule => {
                self.skip_indent();
                let start = self.scanner.pos();
                self.scanner.advance(3);
                self.emit(TokenKind::HorizontalRule, start, self.scanner.pos());
                self.finish_line();
            }
            LineClass::Heading(level) if level <= 2 => self.lex_heading(level),
            LineClass::Heading(level) => {
                self.error(
                    self.scanner.pos(),
                    LexErrorKind::UnsupportedHeadingLevel(level),
                );
                self.lex_paragraph();
            }
            LineClass::HtmlOpen => self.lex_html_tag(),
            LineClass::HtmlClose => self.lex_html_close(),
            LineClass::Fence => self.lex_code_block(),
            LineClass::Image => self.lex_image(),
            LineClass::Blockquote => self.lex_blockquote(),
            LineClass::SidenoteDef => self.lex_sidenote_def(),
            LineClass::LinkDef => self.lex_link_def(),
            LineClass::Paragraph => self.lex_paragraph(),
        }
    }

    fn lex_heading(&mut self, level: usize) {
        self.close_sections(level == 1);
        self.skip_indent();

        let (begin, content) = if level == 1 {
            (TokenKind::Section1Begin, TokenKind::Section1Content)
        } else {
            (TokenKind::Section2Begin, TokenKind::Section2Content)
        };

        let start = self.scanner.pos();
        let line = self.scanner.current_line();
        let after_hashes = &line[level..];
        let spaces = after_hashes.len() - after_hashes.trim_start().len();
        self.scanner.advance_to(start + level + spaces);
        self.emit(begin, start, self.scanner.pos());

        let text_start = self.scanner.pos();
        let text = self.scanner.current_line().trim_end();
        let content_end = text_start + text.len();
        match heading_id(text) {
            Some((open, id)) => {
                let heading_end = text_start + text[..open].trim_end().len();
                self.lex_inline(heading_end);
                self.end_inline_block();
                self.whitespace_to(text_start + open);
                let id_start = self.scanner.pos();
                self.emit_with_value(
                    TokenKind::SectionId,
                    id_start,
                    content_end,
                    (id_start + 2, id_start + 2 + id.len()),
                );
                self.scanner.advance_to(content_end);
            }
            None => {
                self.lex_inline(content_end);
                self.end_inline_block();
            }
        }
        self.finish_line();
        self.push_marker(content);

        if level == 1 {
            self.section1_open = true;
        } else {
            self.section2_open = true;
        }
    }

    fn lex_paragraph(&mut self) {
        self.skip_indent();
        self.push_marker(TokenKind::ParagraphBegin);
        loop {
            let content_end = self.scanner.line_content_end();
            self.lex_inline(content_end);
            let continues = self
                .scanner
                .next_line()
                .is_some_and(|next| LineClass::of(next) == LineClass::Paragraph);
            if !continues {
                break;
            }
            self.extend_text_to(self.scanner.next_line_start());
        }
        self.end_inline_block();
        self.push_marker(TokenKind::ParagraphEnd);
        self.finish_line();
    }

    fn lex_code_block(&mut self) {
        self.skip_indent();
        let start = self.scanner.pos();
        self.scanner.advance(3);
        self.emit(TokenKind::CodeBlockBegin, start, self.scanner.pos());

        let info_end = self.scanner.pos() + self.scanner.current_line().trim_end().len();
        self.whitespace_to(self.scanner.pos() + leading_ws(self.scanner.current_line()));
        if self.scanner.pos() < info_end {
            let lang_start = self.scanner.pos();
            self.scanner
                .advance_while(info_end, |c| !c.is_whitespace());
            self.emit(TokenKind::CodeBlockLang, lang_start, self.scanner.pos());
            self.whitespace_to(self.scanner.pos() + leading_ws(self.scanner.current_line()));
            if self.scanner.pos() < info_end {
                let attr_start = self.scanner.pos();
                self.scanner.advance_to(info_end);
                self.emit(TokenKind::CodeBlockAttr, attr_start, info_end);
            }
        }
        self.finish_line();

        loop {
            if self.scanner.eof() {
                self.error(self.scanner.pos(), LexErrorKind::UnterminatedCodeBlock);
                self.push_marker(TokenKind::CodeBlockEnd);
                return;
            }
            let line = self.scanner.current_line();
            if line.trim() == "```" {
                self.skip_indent();
                let start = self.scanner.pos();
                self.scanner.advance(3);
                self.emit(TokenKind::CodeBlockEnd, start, self.scanner.pos());
                self.finish_line();
                return;
            }
            self.lex_source_line();
        }
    }

    /// Emits the current line verbatim as a `CodeBlockSource`.
    fn lex_source_line(&mut self) {
        let start = self.scanner.pos();
        let end = self.scanner.line_content_end();
        self.scanner.advance_to(end);
        self.emit(TokenKind::CodeBlockSource, start, end);
        self.finish_line();
    }

    fn lex_image(&mut self) {
        self.skip_indent();
        let base = self.scanner.pos();
        let Some(parts) = image_parts(self.scanner.current_line()) else {
            // classified as an image, so this only happens on a lexer bug
            self.lex_paragraph();
            return;
        };

        self.scanner.advance(2);
        self.emit(TokenKind::ImageBegin, base, base + 2);
        self.lex_inline(base + parts.title.end);
        self.end_inline_block();

        let path_end = base + parts.path.end;
        self.scanner.advance_to(path_end);
        self.emit_with_value(
            TokenKind::ImagePath,
            base + parts.title.end,
            path_end,
            (base + parts.path.start, path_end),
        );
        if let Some((text, value)) = parts.alt {
            self.scanner.advance_to(base + text.end);
            self.emit_with_value(
                TokenKind::ImageAlt,
                base + text.start,
                base + text.end,
                (base + value.start, base + value.end),
            );
        }
        let close = base + parts.close;
        self.scanner.advance_to(close + 1);
        self.emit(TokenKind::ImageEnd, close, close + 1);
        self.finish_line();
    }

    fn lex_blockquote(&mut self) {
        self.skip_indent();
        self.push_marker(TokenKind::BlockquoteBegin);
        loop {
            self.skip_indent();
            let start = self.scanner.pos();
            self.scanner.eat(">");
            self.scanner.eat(" ");
            self.emit(TokenKind::BlockquoteMarker, start, self.scanner.pos());

            let content_end = self.scanner.line_content_end();
            let continues = self
                .scanner
                .next_line()
                .is_some_and(|next| LineClass::of(next) == LineClass::Blockquote);
            if !continues && self.scanner.starts_with("-- ") {
                self.lex_attribution(content_end);
                break;
            }
            self.lex_inline(content_end);
            if !continues {
                break;
            }
            self.extend_text_to(self.scanner.next_line_start());
        }
        self.end_inline_block();
        self.push_marker(TokenKind::BlockquoteEnd);
        self.finish_line();
    }

    /// `-- Author, Source` on the last line of a quotation.
    fn lex_attribution(&mut self, content_end: usize) {
        self.end_inline_block();
        let start = self.scanner.pos();
        self.scanner.advance(3);
        self.emit(TokenKind::BlockquoteAttribution, start, self.scanner.pos());

        let body = self.scanner.slice(self.scanner.pos(), content_end);
        if let Some(comma) = body.find(", ") {
            let comma = self.scanner.pos() + comma;
            self.lex_inline(comma);
            self.end_inline_block();
            self.scanner.advance_to(comma + 2);
            self.emit(TokenKind::BlockquoteSource, comma, comma + 2);
        }
        self.lex_inline(content_end);
        self.end_inline_block();
    }

    fn lex_sidenote_def(&mut self) {
        self.skip_indent();
        let start = self.scanner.pos();
        let line = self.scanner.current_line();
        let name_len = definition_name(line, true).map(str::len).unwrap_or(0);
        // `[^` name `]:`
        let head = 2 + name_len + 2;
        let spaces = leading_ws(line.get(head..).unwrap_or(""));
        self.scanner.advance_to(start + head + spaces);
        self.emit_with_value(
            TokenKind::SidenoteDef,
            start,
            self.scanner.pos(),
            (start + 2, start + 2 + name_len),
        );

        loop {
            let content_end = self.scanner.line_content_end();
            self.lex_inline(content_end);
            let continues = self
                .scanner
                .next_line()
                .is_some_and(|next| LineClass::of(next) == LineClass::Paragraph);
            if !continues {
                break;
            }
            self.extend_text_to(self.scanner.next_line_start());
        }
        self.end_inline_block();
        self.push_marker(TokenKind::SidenoteDefEnd);
        self.finish_line();
    }

    fn lex_link_def(&mut self) {
        self.skip_indent();
        let start = self.scanner.pos();
        let line = self.scanner.current_line();
        let name_len = definition_name(line, false).map(str::len).unwrap_or(0);
        // `[` name `]:`
        let head = 1 + name_len + 2;
        let spaces = leading_ws(line.get(head..).unwrap_or(""));
        self.scanner.advance_to(start + head + spaces);
        self.emit_with_value(
            TokenKind::LinkDef,
            start,
            self.scanner.pos(),
            (start + 1, start + 1 + name_len),
        );

        let target_start = self.scanner.pos();
        let target_end = target_start + self.scanner.current_line().trim_end().len();
        self.scanner.advance_to(target_end);
        self.push(Token::new(
            TokenKind::LinkDefTarget,
            target_start,
            self.scanner.slice(target_start, target_end),
        ));
        self.finish_line();
    }

    // --- html tags ---

    fn lex_html_tag(&mut self) {
        self.skip_indent();
        let start = self.scanner.pos();
        self.scanner.advance(1);
        let name_start = self.scanner.pos();
        let name_len = tag_name_len(self.scanner.rest());
        self.scanner.advance_to(name_start + name_len);
        let name = self.scanner.slice(name_start, name_start + name_len);
        self.emit_with_value(
            TokenKind::HtmlTagOpen,
            start,
            self.scanner.pos(),
            (name_start, name_start + name_len),
        );

        match self.lex_html_attributes(name) {
            OpenTagEnd::Open => {}
            OpenTagEnd::SelfClosing => {
                self.finish_line_if_blank();
                return;
            }
            OpenTagEnd::Eof => {
                // already reported; close it so the parser sees a whole tag
                let pos = self.scanner.pos();
                self.push(Token::new(TokenKind::HtmlTagClose, pos, "").with_value(name));
                return;
            }
        }
        if RAW_HTML_TAGS.contains(&name) {
            self.lex_raw_tag_content(name);
        } else {
            self.lex_tag_content(name);
        }
    }

    /// Lexes attributes up to `>` or `/>`.
    fn lex_html_attributes(&mut self, name: &'a str) -> OpenTagEnd {
        let len = self.scanner.source().len();
        loop {
            let ws_start = self.scanner.pos();
            self.scanner.advance_while(len, char::is_whitespace);
            self.emit(TokenKind::Whitespace, ws_start, self.scanner.pos());

            let start = self.scanner.pos();
            if self.scanner.eof() {
                self.error(start, LexErrorKind::UnterminatedHtmlTag(name.to_string()));
                self.push_marker(TokenKind::HtmlTagOpenEnd);
                return OpenTagEnd::Eof;
            }
            if self.scanner.eat("/>") {
                let text = self.scanner.slice(start, start + 2);
                self.push(Token::new(TokenKind::HtmlTagClose, start, text).with_value(name));
                return OpenTagEnd::SelfClosing;
            }
            if self.scanner.eat(">") {
                self.emit(TokenKind::HtmlTagOpenEnd, start, start + 1);
                return OpenTagEnd::Open;
            }

            let key = self.scanner.advance_while(len, |c| {
                c.is_ascii_alphanumeric() || c == '-' || c == '_'
            });
            if key.is_empty() {
                let unexpected = self.scanner.advance(1);
                let c = unexpected.chars().next().unwrap_or('\0');
                self.error(start, LexErrorKind::UnexpectedTagCharacter(c));
                self.emit(TokenKind::Text, start, self.scanner.pos());
                continue;
            }
            if !self.scanner.eat("=") {
                self.emit(TokenKind::HtmlAttrKey, start, self.scanner.pos());
                continue;
            }
            self.emit_with_value(
                TokenKind::HtmlAttrKey,
                start,
                self.scanner.pos(),
                (start, start + key.len()),
            );
            self.lex_attribute_value();
        }
    }

    fn lex_attribute_value(&mut self) {
        let start = self.scanner.pos();
        let line_end = self.scanner.line_content_end();
        if self.scanner.eat("\"") {
            let rest = self.scanner.slice(start + 1, line_end);
            match rest.find('"') {
                Some(close) => {
                    let end = start + 1 + close + 1;
                    self.scanner.advance_to(end);
                    self.emit_with_value(
                        TokenKind::HtmlAttrValue,
                        start,
                        end,
                        (start + 1, end - 1),
                    );
                }
                None => {
                    self.error(start, LexErrorKind::UnterminatedAttributeValue);
                    self.scanner.advance_to(line_end);
                    self.emit_with_value(
                        TokenKind::HtmlAttrValue,
                        start,
                        line_end,
                        (start + 1, line_end),
                    );
                }
            }
        } else {
            self.scanner
                .advance_while(line_end, |c| !(c.is_whitespace() || c == '>' || c == '/'));
            self.emit(TokenKind::HtmlAttrValue, start, self.scanner.pos());
        }
    }

    /// Content of a tag from [`RAW_HTML_TAGS`]: every line up to the
    /// matching close is kept verbatim.
    fn lex_raw_tag_content(&mut self, name: &'a str) {
        if self.scanner.current_line().trim().is_empty() {
            self.finish_line();
        } else {
            self.lex_source_line();
        }
        let close = format!("</{name}");
        loop {
            if self.scanner.eof() {
                self.error(
                    self.scanner.pos(),
                    LexErrorKind::UnterminatedHtmlTag(name.to_string()),
                );
                let pos = self.scanner.pos();
                self.push(Token::new(TokenKind::HtmlTagClose, pos, "").with_value(name));
                return;
            }
            if self.scanner.current_line().trim_start().starts_with(&close) {
                self.lex_html_close();
                return;
            }
            self.lex_source_line();
        }
    }

    /// Content of an ordinary tag: inline text, with nested tags allowed at
    /// line starts and the closing tag allowed anywhere on a line.
    fn lex_tag_content(&mut self, name: &'a str) {
        loop {
            if self.scanner.eof() {
                self.end_inline_block();
                self.error(
                    self.scanner.pos(),
                    LexErrorKind::UnterminatedHtmlTag(name.to_string()),
                );
                let pos = self.scanner.pos();
                self.push(Token::new(TokenKind::HtmlTagClose, pos, "").with_value(name));
                return;
            }

            let line = self.scanner.current_line();
            let body = line.trim_start();
            if body.is_empty() {
                self.end_inline_block();
                self.finish_line();
                continue;
            }
            if let Some(rest) = body.strip_prefix("</")
                && tag_name_len(rest) > 0
            {
                self.end_inline_block();
                self.lex_html_close();
                return;
            }
            if self.text_start.is_none()
                && let Some(rest) = body.strip_prefix('<')
                && tag_name_len(rest) > 0
            {
                self.lex_html_tag();
                continue;
            }

            if self.text_start.is_none() {
                self.skip_indent();
            }
            let content_end = self.scanner.line_content_end();
            let segment = self.scanner.slice(self.scanner.pos(), content_end);
            let segment_end = find_closing_tag(segment)
                .map(|i| self.scanner.pos() + i)
                .unwrap_or(content_end);
            self.lex_inline(segment_end);
            if segment_end < content_end {
                continue;
            }

            let continues = self.scanner.next_line().is_some_and(|next| {
                let next = next.trim_start();
                !next.is_empty() && !starts_with_tag(next)
            });
            if continues {
                self.extend_text_to(self.scanner.next_line_start());
            } else {
                self.end_inline_block();
                self.finish_line();
            }
        }
    }

    fn lex_html_close(&mut self) {
        self.skip_indent();
        let start = self.scanner.pos();
        self.scanner.advance(2);
        let name_start = self.scanner.pos();
        let name_len = tag_name_len(self.scanner.rest());
        self.scanner.advance_to(name_start + name_len);
        let name = self.scanner.slice(name_start, name_start + name_len);
        let line_end = self.scanner.line_content_end();
        self.scanner.advance_while(line_end, |c| c == ' ' || c == '\t');
        if !self.scanner.eat(">") {
            self.error(start, LexErrorKind::MalformedClosingTag(name.to_string()));
        }
        let text = self.scanner.slice(start, self.scanner.pos());
        self.push(Token::new(TokenKind::HtmlTagClose, start, text).with_value(name));
        self.finish_line_if_blank();
    }

    /// Finishes the line only if nothing but whitespace is left on it, so
    /// trailing content is lexed as the next block.
    fn finish_line_if_blank(&mut self) {
        if self.scanner.current_line().trim().is_empty() {
            self.finish_line();
        }
    }
}

/// How the attribute list of an opening tag ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenTagEnd {
    Open,
    SelfClosing,
    Eof,
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn starts_with_tag(s: &str) -> bool {
    let rest = s.strip_prefix("</").or_else(|| s.strip_prefix('<'));
    rest.is_some_and(|rest| tag_name_len(rest) > 0)
}

/// Offset of the first `</Name` in a line segment.
fn find_closing_tag(segment: &str) -> Option<usize> {
    segment
        .match_indices("</")
        .map(|(i, _)| i)
        .find(|&i| tag_name_len(&segment[i + 2..]) > 0)
}
