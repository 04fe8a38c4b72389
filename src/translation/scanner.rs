use std::borrow::Cow;

#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    /// PostgreSQL `E'...'` string, where backslash escapes the next byte.
    EscapeQuoted,
    DoubleQuoted,
    Backtick,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Placeholder numbers too large for `usize` saturate, so no argument list can satisfy them.
pub(super) fn placeholder_number(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}

/// True when the quote at `idx` opens an `E'...'` escape string.
pub(super) fn is_escape_string_start(bytes: &[u8], idx: usize) -> bool {
    idx >= 1
        && matches!(bytes[idx - 1], b'e' | b'E')
        && (idx == 1 || !is_ident_byte(bytes[idx - 2]))
}

pub(super) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// True when `idx` begins a bare word (keyword or identifier).
pub(super) fn is_word_start(bytes: &[u8], idx: usize) -> bool {
    let b = bytes[idx];
    (b.is_ascii_alphabetic() || b == b'_') && (idx == 0 || !is_ident_byte(bytes[idx - 1]))
}

pub(super) fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    idx
}

/// Copy-on-write output buffer: stays borrowed until the first replacement.
pub(super) struct Rewriter<'a> {
    sql: &'a str,
    out: Option<String>,
    copied: usize,
}

impl<'a> Rewriter<'a> {
    pub(super) fn new(sql: &'a str) -> Self {
        Self {
            sql,
            out: None,
            copied: 0,
        }
    }

    /// Replace `sql[start..end]` with `with`. Calls must come in ascending, non-overlapping order.
    pub(super) fn replace(&mut self, start: usize, end: usize, with: &str) {
        let buf = self
            .out
            .get_or_insert_with(|| String::with_capacity(self.sql.len() + 16));
        buf.push_str(&self.sql[self.copied..start]);
        buf.push_str(with);
        self.copied = end;
    }

    pub(super) fn finish(self) -> Cow<'a, str> {
        match self.out {
            Some(mut buf) => {
                buf.push_str(&self.sql[self.copied..]);
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(self.sql),
        }
    }
}
