/// A cursor over the raw source text.
///
/// Comparisons happen on bytes, but every method that moves the cursor lands
/// on a UTF-8 character boundary, so slices taken between two cursor
/// positions are always valid `str`s. None of the methods panic: running off
/// the end of the input yields empty slices or `None`.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    mark: Option<usize>,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `src`.
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            mark: None,
        }
    }

    /// The complete source text.
    pub fn source(&self) -> &'a str {
        self.src
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns true once every byte has been consumed.
    pub fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Everything from the cursor to the end of the input.
    pub fn rest(&self) -> &'a str {
        self.slice(self.pos, self.src.len())
    }

    /// Returns the next `n` characters without consuming them.
    ///
    /// Fewer characters are returned near the end of the input, and an empty
    /// string at the end.
    pub fn peek(&self, n: usize) -> &'a str {
        let rest = self.rest();
        match rest.char_indices().nth(n) {
            Some((end, _)) => &rest[..end],
            None => rest,
        }
    }

    /// Peeks at the next character.
    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Checks if the remaining input starts with `pat`, comparing raw bytes.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().as_bytes().starts_with(pat.as_bytes())
    }

    /// Consumes up to `n` characters and returns them.
    pub fn advance(&mut self, n: usize) -> &'a str {
        let taken = self.peek(n);
        self.pos += taken.len();
        taken
    }

    /// Consumes `pat` if the input starts with it.
    pub fn eat(&mut self, pat: &str) -> bool {
        if self.starts_with(pat) {
            self.pos += pat.len();
            true
        } else {
            false
        }
    }

    /// Consumes characters while `pred` holds, stopping at `limit`.
    pub fn advance_while(&mut self, limit: usize, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        let window = self.slice(start, limit);
        let len = window
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(window.len());
        self.pos += len;
        self.slice(start, self.pos)
    }

    /// Moves the cursor forward to `target`.
    ///
    /// The target is clamped to the input length and rounded up to the next
    /// character boundary. Targets behind the cursor are ignored.
    pub fn advance_to(&mut self, target: usize) -> &'a str {
        let start = self.pos;
        let mut target = target.min(self.src.len());
        while !self.src.is_char_boundary(target) {
            target += 1;
        }
        if target > self.pos {
            self.pos = target;
        }
        self.slice(start, self.pos)
    }

    /// Saves the current position as the backtracking checkpoint.
    pub fn mark(&mut self) {
        self.mark = Some(self.pos);
    }

    /// Returns to the last checkpoint and clears it.
    ///
    /// Returns false if no checkpoint was set.
    pub fn reset(&mut self) -> bool {
        match self.mark.take() {
            Some(pos) => {
                self.pos = pos;
                true
            }
            None => false,
        }
    }

    /// Byte offset of the `\n` ending the current line, or the input length.
    pub fn line_end(&self) -> usize {
        self.rest()
            .find('\n')
            .map(|i| self.pos + i)
            .unwrap_or(self.src.len())
    }

    /// Like [`Scanner::line_end`], but excluding a `\r` before the newline.
    pub fn line_content_end(&self) -> usize {
        let end = self.line_end();
        if end > self.pos && self.src.as_bytes().get(end - 1) == Some(&b'\r') {
            end - 1
        } else {
            end
        }
    }

    /// Offset just past the current line's terminator.
    pub fn next_line_start(&self) -> usize {
        let end = self.line_end();
        if end < self.src.len() { end + 1 } else { end }
    }

    /// The rest of the current line, without its line terminator.
    pub fn current_line(&self) -> &'a str {
        self.slice(self.pos, self.line_content_end())
    }

    /// The line following the current one, if the input has one.
    pub fn next_line(&self) -> Option<&'a str> {
        let start = self.next_line_start();
        if start >= self.src.len() {
            return None;
        }
        let rest = &self.src[start..];
        let line = rest.split('\n').next().unwrap_or(rest);
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Returns the source between two offsets, or an empty string for an
    /// invalid range.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.src.get(start..end).unwrap_or("")
    }
}
