// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use haulrate::utils::{load_settings, set_setting};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);")
        .unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn defaults_apply_when_table_is_empty() {
    let conn = setup();
    let s = load_settings(&conn).unwrap();
    assert_eq!(s.base_diesel_price, dec("21.50"));
    assert_eq!(s.diesel_impact_percentage, dec("35"));
    assert_eq!(s.max_monthly_increase, dec("10"));
    assert_eq!(s.rounding_precision, 2);
    assert_eq!(s.effective_day_of_month, 1);
}

#[test]
fn stored_values_override_defaults() {
    let conn = setup();
    set_setting(&conn, "base_diesel_price", "23.10").unwrap();
    set_setting(&conn, "rounding_precision", "4").unwrap();
    let s = load_settings(&conn).unwrap();
    assert_eq!(s.base_diesel_price, dec("23.10"));
    assert_eq!(s.rounding_precision, 4);
    // untouched keys keep their defaults
    assert_eq!(s.diesel_impact_percentage, dec("35"));
}

#[test]
fn unknown_keys_are_rejected() {
    let conn = setup();
    assert!(set_setting(&conn, "vat_rate", "14").is_err());
}

#[test]
fn non_numeric_values_are_rejected() {
    let conn = setup();
    assert!(set_setting(&conn, "base_diesel_price", "cheap").is_err());
    assert!(set_setting(&conn, "rounding_precision", "2.5").is_err());
}

#[test]
fn set_overwrites_previous_value() {
    let conn = setup();
    set_setting(&conn, "max_monthly_increase", "8").unwrap();
    set_setting(&conn, "max_monthly_increase", "12").unwrap();
    let s = load_settings(&conn).unwrap();
    assert_eq!(s.max_monthly_increase, dec("12"));
}
