use std::sync::LazyLock;

use regex::Regex;

use super::NowSemantics;

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Recognize `$tag$` (or `$$`) at `start`; returns the tag and the index of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

/// True when `$tag$` starts at `idx`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}

static HELPER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(datetime|date)\s*\(\s*'now'\s*(,\s*'localtime'\s*)?\)")
        .unwrap_or_else(|e| panic!("helper-call pattern is valid: {e}"))
});

/// A recognized `datetime('now'...)` / `date('now'...)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct HelperCall {
    pub(super) len: usize,
    pub(super) date_only: bool,
    pub(super) localtime: bool,
}

impl HelperCall {
    pub(super) fn replacement(self, now: NowSemantics) -> &'static str {
        match (now, self.date_only, self.localtime) {
            (NowSemantics::Legacy, true, _) | (NowSemantics::Exact, true, true) => "CURRENT_DATE",
            (NowSemantics::Legacy, false, _) => "CURRENT_TIMESTAMP",
            (NowSemantics::Exact, false, true) => "LOCALTIMESTAMP",
            (NowSemantics::Exact, false, false) => "(CURRENT_TIMESTAMP AT TIME ZONE 'UTC')",
            (NowSemantics::Exact, true, false) => "(CURRENT_TIMESTAMP AT TIME ZONE 'UTC')::date",
        }
    }
}

/// Match a helper call at the start of `rest`.
pub(super) fn match_helper_call(rest: &str) -> Option<HelperCall> {
    let caps = HELPER_CALL.captures(rest)?;
    let whole = caps.get(0)?;
    let name = caps.get(1)?.as_str();
    Some(HelperCall {
        len: whole.end(),
        date_only: name.eq_ignore_ascii_case("date"),
        localtime: caps.get(2).is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_call_tolerates_case_and_spacing() {
        let call = match_helper_call("DateTime( 'now' , 'localtime' ) as ts").unwrap();
        assert_eq!(call.len, "DateTime( 'now' , 'localtime' )".len());
        assert!(call.localtime);
        assert!(!call.date_only);

        let call = match_helper_call("date('now')").unwrap();
        assert!(call.date_only);
        assert!(!call.localtime);
    }

    #[test]
    fn helper_call_rejects_other_arguments() {
        assert!(match_helper_call("datetime(created_at)").is_none());
        assert!(match_helper_call("datetime('now', '+1 day')").is_none());
        assert!(match_helper_call("dates('now')").is_none());
    }

    #[test]
    fn dollar_quote_tags() {
        let sql = b"$fn$ body $fn$";
        assert_eq!(try_start_dollar_quote(sql, 0), Some(("fn".to_string(), 3)));
        assert!(matches_tag(sql, 10, "fn"));
        assert!(try_start_dollar_quote(b"$1, $2", 0).is_none());
    }
}
