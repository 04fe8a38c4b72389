use std::borrow::Cow;

use sql_shim::prelude::*;
use sql_shim::{StatementShape, Verb};

fn pg(now: NowSemantics) -> TranslateOptions {
    TranslateOptions::for_target(Dialect::Postgres).with_now(now)
}

fn dollar_tokens(sql: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut rest = sql;
    while let Some(pos) = rest.find('$') {
        let digits: String = rest[pos + 1..].chars().take_while(char::is_ascii_digit).collect();
        if let Ok(n) = digits.parse() {
            found.push(n);
        }
        rest = &rest[pos + 1..];
    }
    found
}

#[test]
fn n_markers_become_one_to_n_in_order() {
    for n in 1..=24 {
        let columns: Vec<String> = (0..n).map(|i| format!("c{i} = ?")).collect();
        let sql = format!("UPDATE t SET {} WHERE id = 'x?'", columns.join(", "));
        let out = translate(&sql, &pg(NowSemantics::Legacy));
        assert_eq!(dollar_tokens(&out.sql), (1..=n).collect::<Vec<_>>(), "{sql}");
        assert_eq!(out.shape.slots, n);
        assert!(!out.sql.contains("= ?"));
        assert!(out.sql.ends_with("'x?'"));
    }
}

#[test]
fn every_helper_translates_to_something_non_empty() {
    let helpers = [
        "datetime('now')",
        "date('now')",
        "datetime('now','localtime')",
        "DATE( 'now', 'localtime' )",
    ];
    for now in [NowSemantics::Legacy, NowSemantics::Exact] {
        for helper in helpers {
            let sql = format!("SELECT {helper} AS v");
            let out = translate(&sql, &pg(now));
            let expr = out
                .sql
                .strip_prefix("SELECT ")
                .and_then(|rest| rest.strip_suffix(" AS v"))
                .unwrap_or_default();
            assert!(!expr.trim().is_empty(), "{helper} under {now:?}");
            assert!(!expr.contains("'now'"), "{helper} under {now:?} -> {expr}");
        }
    }
}

#[test]
fn insert_with_helper_drops_the_function_text() {
    let out = translate(
        "INSERT INTO t (created_at) VALUES (datetime('now'))",
        &pg(NowSemantics::Legacy),
    );
    assert_eq!(out.sql, "INSERT INTO t (created_at) VALUES (CURRENT_TIMESTAMP)");
    assert_eq!(
        out.shape,
        StatementShape {
            slots: 0,
            returning: false,
            verb: Verb::Insert,
        }
    );
}

#[test]
fn localtime_is_distinct_only_under_exact() {
    let sql = "SELECT datetime('now'), datetime('now','localtime')";
    assert_eq!(
        translate(sql, &pg(NowSemantics::Legacy)).sql,
        "SELECT CURRENT_TIMESTAMP, CURRENT_TIMESTAMP"
    );
    assert_eq!(
        translate(sql, &pg(NowSemantics::Exact)).sql,
        "SELECT (CURRENT_TIMESTAMP AT TIME ZONE 'UTC'), LOCALTIMESTAMP"
    );
}

#[test]
fn translating_twice_changes_nothing() {
    let corpus = [
        "SELECT * FROM clients WHERE company_id = ? AND name LIKE ?",
        "INSERT INTO dpr (company_id, logged_at, note) VALUES (?, datetime('now','localtime'), 'ok?')",
        "UPDATE payroll SET paid_on = date('now') WHERE id = ?1 AND company_id = ?2",
        "SELECT $1::int, ? /* ? */ -- ?",
    ];
    for now in [NowSemantics::Legacy, NowSemantics::Exact] {
        for sql in corpus {
            let once = translate(sql, &pg(now));
            let twice = translate(&once.sql, &pg(now));
            assert_eq!(once.sql, twice.sql);
            assert_eq!(once.shape.slots, twice.shape.slots);
            assert!(matches!(twice.sql, Cow::Borrowed(_)));
        }
    }
}

#[test]
fn sqlite_target_keeps_text_but_counts_slots() {
    let sql = "SELECT * FROM t WHERE a = ? AND created_at < datetime('now')";
    let out = translate(sql, &TranslateOptions::for_target(Dialect::Sqlite));
    assert_eq!(out.sql, sql);
    assert_eq!(out.shape.slots, 1);
}
