//! Word counts and reading-time estimates.

use crate::ast::{Blog, CodeBlock};
use crate::visit::Visitor;

pub const WORDS_PER_MINUTE: usize = 200;

/// Counts whitespace-separated words in the visible text of a post.
///
/// Words split across inline boundaries (`**bold**ness`) count once. Code
/// blocks count one word per whitespace-separated item on each line.
#[derive(Debug, Default)]
pub struct WordCounter {
    words: usize,
    in_word: bool,
}

impl WordCounter {
    pub fn count(blog: &Blog) -> usize {
        let mut counter = Self::default();
        counter.visit_blog(blog);
        counter.words
    }

    pub fn words(&self) -> usize {
        self.words
    }

    fn break_word(&mut self) {
        self.in_word = false;
    }
}

impl Visitor for WordCounter {
    fn visit_section(&mut self, section: &crate::ast::Section) {
        self.break_word();
        crate::visit::walk_section(self, section);
        self.break_word();
    }

    fn visit_block(&mut self, block: &crate::ast::Block) {
        self.break_word();
        crate::visit::walk_block(self, block);
        self.break_word();
    }

    fn visit_code_block(&mut self, code: &CodeBlock) {
        self.words += code
            .content
            .iter()
            .map(|line| line.split_whitespace().count())
            .sum::<usize>();
    }

    fn visit_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.in_word = false;
            } else if !self.in_word {
                self.in_word = true;
                self.words += 1;
            }
        }
    }
}

/// Minutes needed to read `blog`, never less than one.
pub fn estimate_reading_minutes(blog: &Blog) -> u32 {
    let words = WordCounter::count(blog);
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
