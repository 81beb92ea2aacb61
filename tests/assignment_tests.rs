// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use haulrate::{cli, commands::assignments, db};
use rusqlite::Connection;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO clients(name, contact) VALUES('Acme Mining', 'J. Dlamini')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO routes(code, origin, destination, distance_km) VALUES('JHB-DBN', 'Johannesburg', 'Durban', '568')",
        [],
    )
    .unwrap();
    conn
}

fn run_assign(conn: &mut Connection, args: &[&str]) {
    let mut full = vec!["haulrate", "assign"];
    full.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(full);
    if let Some(("assign", sub)) = matches.subcommand() {
        assignments::handle(conn, sub).unwrap();
    } else {
        panic!("assign command not parsed");
    }
}

#[test]
fn composer_path_sets_current_rate_with_vat() {
    let mut conn = setup();
    run_assign(
        &mut conn,
        &[
            "set",
            "--client",
            "Acme Mining",
            "--route",
            "JHB-DBN",
            "--base-rate",
            "1000",
            "--additional",
            "100",
            "--vat",
        ],
    );
    let (base, current, vat): (String, String, i64) = conn
        .query_row(
            "SELECT base_rate, current_rate, includes_vat FROM client_routes",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(base, "1000");
    assert_eq!(current, "1265.00");
    assert_eq!(vat, 1);
}

#[test]
fn creation_writes_initial_ledger_entry() {
    let mut conn = setup();
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4500",
        ],
    );
    let (prev, new, reason): (String, String, String) = conn
        .query_row(
            "SELECT previous_rate, new_rate, adjustment_reason FROM tariff_history",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(prev, "0");
    assert_eq!(new, "4500");
    assert_eq!(reason, "initial rate assignment");
}

#[test]
fn rate_change_appends_previous_and_new() {
    let mut conn = setup();
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4500",
        ],
    );
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4700",
        ],
    );
    let entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM tariff_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(entries, 2);
    let (prev, new): (String, String) = conn
        .query_row(
            "SELECT previous_rate, new_rate FROM tariff_history ORDER BY id DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(prev, "4500");
    assert_eq!(new, "4700");
}

#[test]
fn reactivating_reuses_the_existing_row() {
    let mut conn = setup();
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4500",
        ],
    );
    let first_id: i64 = conn
        .query_row("SELECT id FROM client_routes", [], |r| r.get(0))
        .unwrap();
    run_assign(
        &mut conn,
        &["deactivate", "--client", "Acme Mining", "--route", "JHB-DBN"],
    );
    let active: i64 = conn
        .query_row("SELECT is_active FROM client_routes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(active, 0);

    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4800",
        ],
    );
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM client_routes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    let (id, active): (i64, i64) = conn
        .query_row("SELECT id, is_active FROM client_routes", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(id, first_id);
    assert_eq!(active, 1);
}

#[test]
fn set_rate_overrides_and_records_history() {
    let mut conn = setup();
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "1000",
        ],
    );
    run_assign(
        &mut conn,
        &[
            "set-rate",
            "--client",
            "Acme Mining",
            "--route",
            "JHB-DBN",
            "--rate",
            "1200",
            "--reason",
            "negotiated uplift",
        ],
    );
    let current: String = conn
        .query_row("SELECT current_rate FROM client_routes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(current, "1200");
    let (prev, new, pct, reason): (String, String, String, String) = conn
        .query_row(
            "SELECT previous_rate, new_rate, adjustment_percentage, adjustment_reason
             FROM tariff_history ORDER BY id DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(prev, "1000");
    assert_eq!(new, "1200");
    assert_eq!(pct.parse::<rust_decimal::Decimal>().unwrap(), "20".parse().unwrap());
    assert_eq!(reason, "negotiated uplift");
}

#[test]
fn list_filters_active_only() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO routes(code, origin, destination) VALUES('JHB-CPT', 'Johannesburg', 'Cape Town')",
        [],
    )
    .unwrap();
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-DBN", "--base-rate", "4500",
        ],
    );
    run_assign(
        &mut conn,
        &[
            "set", "--client", "Acme Mining", "--route", "JHB-CPT", "--base-rate", "6200",
        ],
    );
    run_assign(
        &mut conn,
        &["deactivate", "--client", "Acme Mining", "--route", "JHB-CPT"],
    );
    let all = assignments::query_rows(&conn, Some("Acme Mining"), false).unwrap();
    assert_eq!(all.len(), 2);
    let active = assignments::query_rows(&conn, Some("Acme Mining"), true).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].route, "JHB-DBN");
}
