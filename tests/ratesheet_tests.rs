// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use haulrate::commands::ratesheet::{build_document, paginate_terms, render_text};
use haulrate::db;
use rusqlite::{params, Connection};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO clients(name, contact, vat_number) VALUES('Acme Mining', 'J. Dlamini', '4123456789')",
        [],
    )
    .unwrap();
    for (code, origin, dest, km, rate) in [
        ("JHB-DBN", "Johannesburg", "Durban", "568", "4664.83"),
        ("JHB-CPT", "Johannesburg", "Cape Town", "1398", "6200"),
    ] {
        conn.execute(
            "INSERT INTO routes(code, origin, destination, distance_km) VALUES(?1,?2,?3,?4)",
            params![code, origin, dest, km],
        )
        .unwrap();
        let route_id: i64 = conn
            .query_row("SELECT id FROM routes WHERE code=?1", params![code], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO client_routes(client_id, route_id, base_rate, current_rate, rate_type, currency, effective_date)
             VALUES (1, ?1, ?2, ?2, 'per_load', 'ZAR', '2025-07-01')",
            params![route_id, rate],
        )
        .unwrap();
    }
    conn
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 6).unwrap()
}

#[test]
fn document_contains_one_line_per_active_assignment() {
    let conn = setup();
    let doc = build_document(&conn, "Acme Mining", None, None, today()).unwrap();
    assert_eq!(doc.lines.len(), 2);
    assert_eq!(doc.lines[0].route_code, "JHB-CPT");
    assert_eq!(doc.lines[1].route_code, "JHB-DBN");
    assert_eq!(doc.lines[1].rate, "ZAR 4664.83");
    assert_eq!(doc.effective_date, Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
}

#[test]
fn inactive_assignments_are_excluded() {
    let conn = setup();
    conn.execute(
        "UPDATE client_routes SET is_active=0 WHERE route_id=(SELECT id FROM routes WHERE code='JHB-CPT')",
        [],
    )
    .unwrap();
    let doc = build_document(&conn, "Acme Mining", None, None, today()).unwrap();
    assert_eq!(doc.lines.len(), 1);
    assert_eq!(doc.lines[0].route_code, "JHB-DBN");
}

#[test]
fn terms_page_count_is_known_on_page_one() {
    let terms: String = (1..=90)
        .map(|i| format!("clause {}\n", i))
        .collect::<Vec<_>>()
        .join("");
    let section = paginate_terms(&terms, 40);
    assert_eq!(section.total_pages, 3);

    let conn = setup();
    let doc = build_document(&conn, "Acme Mining", None, Some(&terms), today()).unwrap();
    let text = render_text(&doc);
    // footer carries the final total before later pages are rendered
    assert!(text.contains("Page 1 of 3"));
    assert!(text.contains("Page 3 of 3"));
    assert!(!text.contains("Page 4"));
}

#[test]
fn empty_terms_still_yield_one_page() {
    let section = paginate_terms("", 40);
    assert_eq!(section.total_pages, 1);
}

#[test]
fn validity_window_is_rendered() {
    let conn = setup();
    let until = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    let doc = build_document(&conn, "Acme Mining", Some(until), None, today()).unwrap();
    let text = render_text(&doc);
    assert!(text.contains("Valid: 2025-07-01 to 2025-12-31"));
    assert!(text.contains("Client: Acme Mining"));
    assert!(text.contains("VAT no.: 4123456789"));
}

#[test]
fn csv_export_writes_assignment_lines() {
    let conn = setup();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sheet.csv");
    let matches = haulrate::cli::build_cli().get_matches_from([
        "haulrate",
        "sheet",
        "export",
        "--client",
        "Acme Mining",
        "--format",
        "csv",
        "--out",
        out.to_str().unwrap(),
    ]);
    if let Some(("sheet", sub)) = matches.subcommand() {
        haulrate::commands::ratesheet::handle(&conn, sub).unwrap();
    } else {
        panic!("sheet command not parsed");
    }
    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get(0).unwrap(), "JHB-DBN");
    assert_eq!(rows[1].get(4).unwrap(), "ZAR 4664.83");
}
