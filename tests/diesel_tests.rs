// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use haulrate::commands::diesel::{append_sample, current_sample};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);
        CREATE TABLE diesel_prices(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            effective_date TEXT NOT NULL UNIQUE,
            price_per_liter TEXT NOT NULL,
            previous_price TEXT,
            percentage_change TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
    .unwrap();
    conn
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn first_sample_has_no_previous() {
    let conn = setup();
    let s = append_sample(&conn, d(2025, 1, 1), dec("21.50"), None).unwrap();
    assert_eq!(s.previous_price, None);
    assert_eq!(s.percentage_change, None);
}

#[test]
fn second_sample_derives_percentage_change() {
    let conn = setup();
    append_sample(&conn, d(2025, 1, 1), dec("21.50"), None).unwrap();
    let s = append_sample(&conn, d(2025, 2, 1), dec("21.85"), None).unwrap();
    assert_eq!(s.previous_price, Some(dec("21.50")));
    // (21.85 - 21.50) / 21.50 * 100 = 1.6279...
    let pct = s.percentage_change.unwrap();
    assert_eq!(format!("{:.4}", pct), "1.6279");
}

#[test]
fn equal_price_yields_zero_change() {
    let conn = setup();
    append_sample(&conn, d(2025, 1, 1), dec("21.50"), None).unwrap();
    let s = append_sample(&conn, d(2025, 2, 1), dec("21.50"), None).unwrap();
    assert_eq!(s.percentage_change, Some(Decimal::ZERO));
}

#[test]
fn negative_price_rejected_before_write() {
    let conn = setup();
    let err = append_sample(&conn, d(2025, 1, 1), dec("-1"), None);
    assert!(err.is_err());
    assert_eq!(current_sample(&conn).unwrap().map(|s| s.id), None);
}

#[test]
fn duplicate_date_rejected() {
    let conn = setup();
    append_sample(&conn, d(2025, 1, 1), dec("21.50"), None).unwrap();
    assert!(append_sample(&conn, d(2025, 1, 1), dec("22.00"), None).is_err());
}

#[test]
fn current_is_max_date_sample() {
    let conn = setup();
    assert!(current_sample(&conn).unwrap().is_none());
    append_sample(&conn, d(2025, 1, 1), dec("21.50"), None).unwrap();
    append_sample(&conn, d(2025, 3, 1), dec("23.75"), None).unwrap();
    append_sample(&conn, d(2025, 2, 1), dec("22.10"), None).unwrap();
    let cur = current_sample(&conn).unwrap().unwrap();
    assert_eq!(cur.effective_date, d(2025, 3, 1));
    assert_eq!(cur.price_per_liter, dec("23.75"));
}
