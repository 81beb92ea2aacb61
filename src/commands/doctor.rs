// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::indexation::compose_current_rate;
use crate::utils::{parse_legacy_notes, pretty_table, strip_legacy_notes};
use anyhow::Result;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let fix = m.get_flag("fix");
    let mut rows = Vec::new();

    // 1) Legacy imports that encoded extras/VAT inside the notes column.
    //    --fix moves them into the typed columns without touching the
    //    billable rate.
    let mut stmt = conn.prepare(
        "SELECT cr.id, cr.notes FROM client_routes cr WHERE cr.notes IS NOT NULL",
    )?;
    let mut cur = stmt.query([])?;
    let mut legacy = Vec::new();
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let notes: String = r.get(1)?;
        if let Some((charges, vat)) = parse_legacy_notes(&notes) {
            legacy.push((id, notes, charges, vat));
        }
    }
    for (id, notes, charges, vat) in &legacy {
        if fix {
            conn.execute(
                "UPDATE client_routes SET additional_charges=?1, includes_vat=?2, notes=?3,
                        updated_at=datetime('now')
                 WHERE id=?4",
                params![
                    charges.to_string(),
                    *vat as i64,
                    strip_legacy_notes(notes),
                    id
                ],
            )?;
            rows.push(vec![
                "legacy_notes_migrated".into(),
                format!("assignment {} -> extras={}, vat={}", id, charges, vat),
            ]);
        } else {
            rows.push(vec![
                "legacy_notes_encoding".into(),
                format!("assignment {} ({})", id, notes),
            ]);
        }
    }

    // 2) Rows never touched since creation should still satisfy the
    //    composer identity; drift means an out-of-band edit.
    let mut stmt2 = conn.prepare(
        "SELECT cr.id, cr.base_rate, cr.additional_charges, cr.includes_vat, cr.current_rate,
                (SELECT COUNT(*) FROM tariff_history h WHERE h.client_route_id=cr.id)
         FROM client_routes cr WHERE cr.is_active=1",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let base: String = r.get(1)?;
        let extras: String = r.get(2)?;
        let vat: i64 = r.get(3)?;
        let current: String = r.get(4)?;
        let entries: i64 = r.get(5)?;
        if entries == 0 {
            rows.push(vec!["no_history".into(), format!("assignment {}", id)]);
            continue;
        }
        if entries > 1 {
            continue;
        }
        let (Ok(base), Ok(extras), Ok(current)) = (
            base.parse::<Decimal>(),
            extras.parse::<Decimal>(),
            current.parse::<Decimal>(),
        ) else {
            rows.push(vec!["bad_decimal".into(), format!("assignment {}", id)]);
            continue;
        };
        let composed = compose_current_rate(base, extras, vat != 0);
        if composed != current {
            rows.push(vec![
                "composer_drift".into(),
                format!("assignment {}: stored {}, composed {}", id, current, composed),
            ]);
        }
    }

    // 3) Recompute the stored diesel percentage changes.
    let mut stmt3 = conn.prepare(
        "SELECT effective_date, price_per_liter, previous_price, percentage_change
         FROM diesel_prices WHERE previous_price IS NOT NULL ORDER BY effective_date",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let date: String = r.get(0)?;
        let price_s: String = r.get(1)?;
        let prev_s: String = r.get(2)?;
        let stored_s: Option<String> = r.get(3)?;
        let (Ok(price), Ok(prev)) = (price_s.parse::<Decimal>(), prev_s.parse::<Decimal>()) else {
            rows.push(vec!["bad_decimal".into(), format!("diesel sample {}", date)]);
            continue;
        };
        let expected = if prev.is_zero() {
            Decimal::ZERO
        } else {
            (price - prev) / prev * Decimal::from(100)
        };
        let stored = stored_s.and_then(|s| s.parse::<Decimal>().ok());
        if stored != Some(expected) {
            rows.push(vec![
                "diesel_change_drift".into(),
                format!("sample {}: stored {:?}, expected {}", date, stored, expected),
            ]);
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
