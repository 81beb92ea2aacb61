// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use haulrate::commands::adjust::{self, run_monthly};
use haulrate::db;
use haulrate::error::TariffError;
use haulrate::{cli, utils};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO clients(name) VALUES('Acme Mining')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO routes(code, origin, destination) VALUES('JHB-DBN', 'Johannesburg', 'Durban')",
        [],
    )
    .unwrap();
    conn
}

fn add_assignment(conn: &Connection, route_code: &str, current_rate: &str) -> i64 {
    conn.execute(
        "INSERT OR IGNORE INTO routes(code, origin, destination) VALUES(?1, 'A', 'B')",
        params![route_code],
    )
    .unwrap();
    let route_id: i64 = conn
        .query_row(
            "SELECT id FROM routes WHERE code=?1",
            params![route_code],
            |r| r.get(0),
        )
        .unwrap();
    conn.execute(
        "INSERT INTO client_routes(client_id, route_id, base_rate, current_rate, rate_type, currency, effective_date)
         VALUES (1, ?1, ?2, ?2, 'per_load', 'ZAR', '2025-01-01')",
        params![route_id, current_rate],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn plus_five_percent_adjusts_rate_and_ledger() {
    let mut conn = setup();
    let id = add_assignment(&conn, "JHB-DBN", "1000");
    let outcome = run_monthly(&mut conn, month(2025, 8), dec("5"), None).unwrap();
    assert_eq!(outcome.adjusted, 1);
    assert_eq!(outcome.total, 1);
    assert!(outcome.failed_ids.is_empty());

    let current: String = conn
        .query_row("SELECT current_rate FROM client_routes WHERE id=?1", params![id], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(current, "1050.00");

    let (prev, new, pct): (String, String, String) = conn
        .query_row(
            "SELECT previous_rate, new_rate, adjustment_percentage FROM tariff_history",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(prev, "1000");
    assert_eq!(new, "1050.00");
    assert_eq!(pct.parse::<Decimal>().unwrap(), dec("5"));

    let (run_month, total): (String, i64) = conn
        .query_row(
            "SELECT adjustment_month, total_routes_adjusted FROM monthly_adjustments",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(run_month, "2025-08-01");
    assert_eq!(total, 1);
}

#[test]
fn second_run_same_month_is_rejected_without_writes() {
    let mut conn = setup();
    add_assignment(&conn, "JHB-DBN", "1000");
    run_monthly(&mut conn, month(2025, 8), dec("5"), None).unwrap();

    let err = run_monthly(&mut conn, month(2025, 8), dec("2"), None).unwrap_err();
    match err.downcast_ref::<TariffError>() {
        Some(TariffError::AlreadyApplied { month }) => {
            assert_eq!(*month, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        }
        other => panic!("Expected AlreadyApplied, got {:?}", other),
    }

    let current: String = conn
        .query_row("SELECT current_rate FROM client_routes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(current, "1050.00");
    let entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM tariff_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(entries, 1);
    let runs: i64 = conn
        .query_row("SELECT COUNT(*) FROM monthly_adjustments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(runs, 1);
}

#[test]
fn different_month_is_permitted() {
    let mut conn = setup();
    add_assignment(&conn, "JHB-DBN", "1000");
    run_monthly(&mut conn, month(2025, 8), dec("5"), None).unwrap();
    let outcome = run_monthly(&mut conn, month(2025, 9), dec("-3.2"), None).unwrap();
    assert_eq!(outcome.adjusted, 1);
    let current: String = conn
        .query_row("SELECT current_rate FROM client_routes", [], |r| r.get(0))
        .unwrap();
    // 1050.00 x 0.968 = 1016.40
    assert_eq!(current, "1016.40");
}

#[test]
fn empty_set_still_records_a_run() {
    let mut conn = setup();
    let outcome = run_monthly(&mut conn, month(2025, 8), dec("5"), None).unwrap();
    assert_eq!(outcome.adjusted, 0);
    assert_eq!(outcome.total, 0);
    let total: i64 = conn
        .query_row(
            "SELECT total_routes_adjusted FROM monthly_adjustments WHERE adjustment_month='2025-08-01'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(total, 0);
}

#[test]
fn batch_is_best_effort_over_a_poisoned_row() {
    let mut conn = setup();
    let good_one = add_assignment(&conn, "JHB-DBN", "1000");
    let poisoned = add_assignment(&conn, "JHB-CPT", "not-a-rate");
    let good_two = add_assignment(&conn, "JHB-PLZ", "2000");

    let outcome = run_monthly(&mut conn, month(2025, 8), dec("5"), None).unwrap();
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.adjusted, 2);
    assert_eq!(outcome.failed_ids, vec![poisoned]);

    let one: String = conn
        .query_row(
            "SELECT current_rate FROM client_routes WHERE id=?1",
            params![good_one],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(one, "1050.00");
    let two: String = conn
        .query_row(
            "SELECT current_rate FROM client_routes WHERE id=?1",
            params![good_two],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(two, "2100.00");

    // ledger only for the rows that applied; the run still commits
    let entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM tariff_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(entries, 2);
    let total: i64 = conn
        .query_row("SELECT total_routes_adjusted FROM monthly_adjustments", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(total, 2);
}

#[test]
fn reason_defaults_to_templated_string() {
    let mut conn = setup();
    add_assignment(&conn, "JHB-DBN", "1000");
    run_monthly(&mut conn, month(2025, 8), dec("5.5"), None).unwrap();
    let reason: String = conn
        .query_row("SELECT adjustment_reason FROM tariff_history", [], |r| r.get(0))
        .unwrap();
    assert!(reason.contains("5.5"), "reason was '{}'", reason);
}

#[test]
fn non_numeric_percentage_is_rejected() {
    match utils::parse_percent("five-ish") {
        Err(TariffError::InvalidPercentage(s)) => assert_eq!(s, "five-ish"),
        other => panic!("Expected InvalidPercentage, got {:?}", other),
    }
    assert!(utils::parse_percent("-3.2").is_ok());
}

#[test]
fn run_via_cli_applies_for_the_given_month() {
    let mut conn = setup();
    add_assignment(&conn, "JHB-DBN", "1000");
    let matches = cli::build_cli().get_matches_from([
        "haulrate", "adjust", "run", "--percent", "5", "--month", "2025-08",
    ]);
    if let Some(("adjust", sub)) = matches.subcommand() {
        adjust::handle(&mut conn, sub).unwrap();
    } else {
        panic!("adjust command not parsed");
    }
    let current: String = conn
        .query_row("SELECT current_rate FROM client_routes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(current, "1050.00");
    let month: String = conn
        .query_row("SELECT adjustment_month FROM monthly_adjustments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(month, "2025-08-01");
}

#[test]
fn inactive_assignments_are_skipped() {
    let mut conn = setup();
    add_assignment(&conn, "JHB-DBN", "1000");
    let inactive = add_assignment(&conn, "JHB-CPT", "3000");
    conn.execute(
        "UPDATE client_routes SET is_active=0 WHERE id=?1",
        params![inactive],
    )
    .unwrap();
    let outcome = run_monthly(&mut conn, month(2025, 8), dec("10"), None).unwrap();
    assert_eq!(outcome.total, 1);
    let untouched: String = conn
        .query_row(
            "SELECT current_rate FROM client_routes WHERE id=?1",
            params![inactive],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(untouched, "3000");
}
