use std::borrow::Cow;

use clap::ValueEnum;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, match_helper_call,
    matches_tag, try_start_dollar_quote,
};
use scanner::{
    Rewriter, State, is_escape_string_start, is_word_start, placeholder_number, scan_digits, word_end,
};

/// SQL dialect a statement is executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL: `$N` placeholders, `CURRENT_TIMESTAMP` style helpers.
    Postgres,
    /// `SQLite`: the dialect call sites are written in; never rewritten by default.
    Sqlite,
}

/// How `datetime('now')`-style helpers map onto PostgreSQL.
///
/// `Legacy` collapses every variant onto the session clock (`CURRENT_TIMESTAMP` /
/// `CURRENT_DATE`), which is what existing deployments run with. `Exact` keeps `SQLite`'s
/// distinction: bare `'now'` is UTC and `'localtime'` is the session's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NowSemantics {
    #[default]
    Legacy,
    Exact,
}

/// How to resolve translation for a statement relative to the pool default.
///
/// # Examples
/// ```rust
/// use sql_shim::prelude::*;
///
/// assert!(TranslationMode::ForceOn.resolve(false));
/// assert!(!TranslationMode::PoolDefault.resolve(false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    /// Follow the pool's default setting.
    #[default]
    PoolDefault,
    /// Force translation on, regardless of pool default.
    ForceOn,
    /// Force translation off, e.g. for SQL already written for the target backend.
    ForceOff,
}

impl TranslationMode {
    #[must_use]
    pub fn resolve(self, pool_default: bool) -> bool {
        match self {
            TranslationMode::PoolDefault => pool_default,
            TranslationMode::ForceOn => true,
            TranslationMode::ForceOff => false,
        }
    }
}

/// What a single translation pass rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Rewrite `?` / `?N` into `$N`.
    pub placeholders: bool,
    /// Rewrite `datetime('now')`-style helper calls.
    pub helpers: bool,
    pub now: NowSemantics,
}

impl TranslateOptions {
    /// Options for running legacy SQL against `target`.
    #[must_use]
    pub fn for_target(target: Dialect) -> Self {
        let rewrite = matches!(target, Dialect::Postgres);
        Self {
            placeholders: rewrite,
            helpers: rewrite,
            now: NowSemantics::default(),
        }
    }

    /// Options that only analyze the statement.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            placeholders: false,
            helpers: false,
            now: NowSemantics::default(),
        }
    }

    #[must_use]
    pub fn with_now(mut self, now: NowSemantics) -> Self {
        self.now = now;
        self
    }

    #[must_use]
    pub fn with_placeholders(mut self, placeholders: bool) -> Self {
        self.placeholders = placeholders;
        self
    }
}

/// Leading keyword of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    With,
    #[default]
    Other,
}

impl Verb {
    fn from_keyword(word: &str) -> Self {
        const KEYWORDS: &[(&str, Verb)] = &[
            ("select", Verb::Select),
            ("insert", Verb::Insert),
            ("replace", Verb::Replace),
            ("update", Verb::Update),
            ("delete", Verb::Delete),
            ("with", Verb::With),
        ];
        KEYWORDS
            .iter()
            .find(|(kw, _)| word.eq_ignore_ascii_case(kw))
            .map_or(Verb::Other, |(_, verb)| *verb)
    }

    /// Statements whose success creates a row with a fresh rowid.
    #[must_use]
    pub fn inserts(self) -> bool {
        matches!(self, Verb::Insert | Verb::Replace)
    }
}

/// Facts about a statement gathered while scanning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementShape {
    /// Positional parameter slots the statement expects (highest placeholder number).
    pub slots: usize,
    /// Whether a `RETURNING` clause was seen outside literals and comments.
    pub returning: bool,
    pub verb: Verb,
}

/// Output of [`translate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated<'a> {
    pub sql: Cow<'a, str>,
    pub shape: StatementShape,
}

/// Translate `SQLite`-flavored SQL into PostgreSQL and describe its shape.
///
/// Outside quoted strings, quoted identifiers, comments and dollar-quoted bodies:
/// - a bare `?` becomes `$N`, numbered the way `SQLite` numbers it (one more than the
///   largest number assigned so far, so plain `?` markers become `$1..$N` left to right);
/// - `?N` becomes `$N`; existing `$N` tokens are kept and counted;
/// - `datetime('now')`, `date('now')` and their `'localtime'` forms become the
///   [`NowSemantics`] equivalents.
///
/// The output never contains a bare `?` or a helper call, so translating it again returns it
/// unchanged. Returns a borrowed `Cow` when nothing needed rewriting.
///
/// ```rust
/// use sql_shim::prelude::*;
///
/// let opts = TranslateOptions::for_target(Dialect::Postgres);
/// let out = translate("SELECT * FROM t WHERE a = ? AND b = ?", &opts);
/// assert_eq!(out.sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
/// assert_eq!(out.shape.slots, 2);
/// ```
#[must_use]
pub fn translate<'a>(sql: &'a str, options: &TranslateOptions) -> Translated<'a> {
    let bytes = sql.as_bytes();
    let mut rewriter = Rewriter::new(sql);
    let mut state = State::Normal;
    let mut idx = 0;
    let mut max_index = 0usize;
    let mut returning = false;
    let mut verb: Option<Verb> = None;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' if is_escape_string_start(bytes, idx) => state = State::EscapeQuoted,
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backtick,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        max_index = max_index.max(placeholder_number(digits));
                        idx = digits_end;
                        continue;
                    }
                    if let Some((tag, tag_end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = tag_end;
                    }
                }
                b'?' => {
                    let (end, number) = match scan_digits(bytes, idx + 1) {
                        Some((digits_end, digits)) => (digits_end, placeholder_number(digits)),
                        None => (idx + 1, max_index.saturating_add(1)),
                    };
                    max_index = max_index.max(number);
                    if options.placeholders {
                        // `?N` keeps its written digits, so a saturated number is not rewritten
                        let marker = if end == idx + 1 {
                            format!("${number}")
                        } else {
                            "$".to_string()
                        };
                        rewriter.replace(idx, idx + 1, &marker);
                    }
                    idx = end;
                    continue;
                }
                _ if is_word_start(bytes, idx) => {
                    let end = word_end(bytes, idx);
                    let word = &sql[idx..end];
                    if verb.is_none() {
                        verb = Some(Verb::from_keyword(word));
                    }
                    if word.eq_ignore_ascii_case("returning") {
                        returning = true;
                    }
                    if options.helpers
                        && (word.eq_ignore_ascii_case("datetime") || word.eq_ignore_ascii_case("date"))
                        && let Some(call) = match_helper_call(&sql[idx..])
                    {
                        rewriter.replace(idx, idx + call.len, call.replacement(options.now));
                        idx += call.len;
                        continue;
                    }
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backtick => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    Translated {
        sql: rewriter.finish(),
        shape: StatementShape {
            slots: max_index,
            returning,
            verb: verb.unwrap_or_default(),
        },
    }
}
