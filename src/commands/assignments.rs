// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::history::{append_entry, NewEntry};
use crate::indexation::{adjustment_percentage, compose_current_rate};
use crate::models::{Currency, RateType};
use crate::utils::{
    id_for_client, id_for_route, maybe_print_json, month_start, parse_date, parse_decimal,
    pretty_table,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("set-rate", sub)) => set_rate(conn, sub)?,
        Some(("deactivate", sub)) => toggle_active(conn, sub, false)?,
        Some(("reactivate", sub)) => toggle_active(conn, sub, true)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Latest diesel observation, if any, for stamping ledger entries.
fn current_diesel_price(conn: &Connection) -> Result<Option<Decimal>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT price_per_liter FROM diesel_prices ORDER BY effective_date DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match v {
        Some(s) => Ok(Some(
            s.parse::<Decimal>()
                .with_context(|| format!("Invalid diesel price '{}' in index", s))?,
        )),
        None => Ok(None),
    }
}

struct Existing {
    id: i64,
    current_rate: Decimal,
    is_active: bool,
}

fn find_assignment(conn: &Connection, client_id: i64, route_id: i64) -> Result<Option<Existing>> {
    let row = conn
        .query_row(
            "SELECT id, current_rate, is_active FROM client_routes WHERE client_id=?1 AND route_id=?2",
            params![client_id, route_id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;
    match row {
        Some((id, rate_s, active)) => Ok(Some(Existing {
            id,
            current_rate: rate_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid current rate '{}' on assignment {}", rate_s, id))?,
            is_active: active != 0,
        })),
        None => Ok(None),
    }
}

fn set(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let client = sub.get_one::<String>("client").unwrap().trim();
    let route = sub.get_one::<String>("route").unwrap().trim();
    let base_rate = parse_decimal(sub.get_one::<String>("base-rate").unwrap())?;
    let additional = match sub.get_one::<String>("additional") {
        Some(s) => parse_decimal(s)?,
        None => Decimal::ZERO,
    };
    let includes_vat = sub.get_flag("vat");
    let rate_type: RateType = sub.get_one::<String>("rate-type").unwrap().parse()?;
    let currency: Currency = sub.get_one::<String>("currency").unwrap().parse()?;
    let effective_date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => today(),
    };
    let notes = sub.get_one::<String>("notes").map(|s| s.trim().to_string());

    if base_rate < Decimal::ZERO || additional < Decimal::ZERO {
        anyhow::bail!("Rates and additional charges must not be negative");
    }

    let client_id = id_for_client(conn, client)?;
    let route_id = id_for_route(conn, &route.to_uppercase())?;
    let current_rate = compose_current_rate(base_rate, additional, includes_vat);
    let diesel_price = current_diesel_price(conn)?;

    let tx = conn.transaction()?;
    match find_assignment(&tx, client_id, route_id)? {
        Some(existing) => {
            if existing.current_rate != current_rate {
                append_entry(
                    &tx,
                    &NewEntry {
                        client_route_id: existing.id,
                        client_id,
                        route_id,
                        period_month: month_start(effective_date),
                        previous_rate: existing.current_rate,
                        new_rate: current_rate,
                        currency: currency.as_str(),
                        diesel_price_at_change: diesel_price,
                        diesel_percentage_change: None,
                        adjustment_percentage: adjustment_percentage(
                            existing.current_rate,
                            current_rate,
                        ),
                        adjustment_reason: "manual rate update",
                    },
                )?;
            }
            tx.execute(
                "UPDATE client_routes SET base_rate=?1, current_rate=?2, rate_type=?3,
                        currency=?4, additional_charges=?5, includes_vat=?6,
                        effective_date=?7, is_active=1, notes=?8,
                        updated_at=datetime('now')
                 WHERE id=?9",
                params![
                    base_rate.to_string(),
                    current_rate.to_string(),
                    rate_type.as_str(),
                    currency.as_str(),
                    additional.to_string(),
                    includes_vat as i64,
                    effective_date.to_string(),
                    notes,
                    existing.id
                ],
            )?;
            if !existing.is_active {
                println!("Reactivated assignment {} / {}", client, route);
            }
        }
        None => {
            tx.execute(
                "INSERT INTO client_routes(client_id, route_id, base_rate, current_rate,
                        rate_type, currency, additional_charges, includes_vat,
                        effective_date, is_active, notes)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,1,?10)",
                params![
                    client_id,
                    route_id,
                    base_rate.to_string(),
                    current_rate.to_string(),
                    rate_type.as_str(),
                    currency.as_str(),
                    additional.to_string(),
                    includes_vat as i64,
                    effective_date.to_string(),
                    notes
                ],
            )?;
            let assignment_id = tx.last_insert_rowid();
            append_entry(
                &tx,
                &NewEntry {
                    client_route_id: assignment_id,
                    client_id,
                    route_id,
                    period_month: month_start(effective_date),
                    previous_rate: Decimal::ZERO,
                    new_rate: current_rate,
                    currency: currency.as_str(),
                    diesel_price_at_change: diesel_price,
                    diesel_percentage_change: None,
                    adjustment_percentage: Decimal::ZERO,
                    adjustment_reason: "initial rate assignment",
                },
            )?;
        }
    }
    tx.commit()?;
    println!(
        "Assignment {} / {}: current rate {} {}",
        client,
        route,
        currency.as_str(),
        current_rate
    );
    Ok(())
}

fn set_rate(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let client = sub.get_one::<String>("client").unwrap().trim();
    let route = sub.get_one::<String>("route").unwrap().trim();
    let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
    let reason = sub
        .get_one::<String>("reason")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "manual rate override".to_string());

    if rate < Decimal::ZERO {
        anyhow::bail!("Rate must not be negative");
    }

    let client_id = id_for_client(conn, client)?;
    let route_id = id_for_route(conn, &route.to_uppercase())?;
    let diesel_price = current_diesel_price(conn)?;

    let tx = conn.transaction()?;
    let existing = find_assignment(&tx, client_id, route_id)?
        .with_context(|| format!("No assignment for {} / {}", client, route))?;
    let currency: String = tx.query_row(
        "SELECT currency FROM client_routes WHERE id=?1",
        params![existing.id],
        |r| r.get(0),
    )?;
    append_entry(
        &tx,
        &NewEntry {
            client_route_id: existing.id,
            client_id,
            route_id,
            period_month: month_start(today()),
            previous_rate: existing.current_rate,
            new_rate: rate,
            currency: &currency,
            diesel_price_at_change: diesel_price,
            diesel_percentage_change: None,
            adjustment_percentage: adjustment_percentage(existing.current_rate, rate),
            adjustment_reason: &reason,
        },
    )?;
    tx.execute(
        "UPDATE client_routes SET current_rate=?1, updated_at=datetime('now') WHERE id=?2",
        params![rate.to_string(), existing.id],
    )?;
    tx.commit()?;
    println!(
        "Assignment {} / {}: rate {} -> {}",
        client, route, existing.current_rate, rate
    );
    Ok(())
}

fn toggle_active(conn: &Connection, sub: &clap::ArgMatches, active: bool) -> Result<()> {
    let client = sub.get_one::<String>("client").unwrap().trim();
    let route = sub.get_one::<String>("route").unwrap().trim();
    let client_id = id_for_client(conn, client)?;
    let route_id = id_for_route(conn, &route.to_uppercase())?;
    let changed = conn.execute(
        "UPDATE client_routes SET is_active=?1, updated_at=datetime('now')
         WHERE client_id=?2 AND route_id=?3",
        params![active as i64, client_id, route_id],
    )?;
    if changed == 0 {
        anyhow::bail!("No assignment for {} / {}", client, route);
    }
    println!(
        "{} assignment {} / {}",
        if active { "Reactivated" } else { "Deactivated" },
        client,
        route
    );
    Ok(())
}

#[derive(Serialize)]
pub struct AssignmentRow {
    pub id: i64,
    pub client: String,
    pub route: String,
    pub base_rate: String,
    pub additional_charges: String,
    pub includes_vat: bool,
    pub current_rate: String,
    pub rate_type: String,
    pub currency: String,
    pub effective_date: String,
    pub is_active: bool,
}

pub fn query_rows(
    conn: &Connection,
    client: Option<&str>,
    active_only: bool,
) -> Result<Vec<AssignmentRow>> {
    let mut sql = String::from(
        "SELECT cr.id, c.name, r.code, cr.base_rate, cr.additional_charges, cr.includes_vat,
                cr.current_rate, cr.rate_type, cr.currency, cr.effective_date, cr.is_active
         FROM client_routes cr
         JOIN clients c ON cr.client_id=c.id
         JOIN routes r ON cr.route_id=r.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(name) = client {
        sql.push_str(" AND c.name=?");
        params_vec.push(name.to_string());
    }
    if active_only {
        sql.push_str(" AND cr.is_active=1");
    }
    sql.push_str(" ORDER BY c.name, r.code");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(AssignmentRow {
            id: r.get(0)?,
            client: r.get(1)?,
            route: r.get(2)?,
            base_rate: r.get(3)?,
            additional_charges: r.get(4)?,
            includes_vat: r.get::<_, i64>(5)? != 0,
            current_rate: r.get(6)?,
            rate_type: r.get(7)?,
            currency: r.get(8)?,
            effective_date: r.get(9)?,
            is_active: r.get::<_, i64>(10)? != 0,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let client = sub.get_one::<String>("client").map(|s| s.as_str());
    let data = query_rows(conn, client, sub.get_flag("active-only"))?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|a| {
                vec![
                    a.id.to_string(),
                    a.client.clone(),
                    a.route.clone(),
                    a.base_rate.clone(),
                    a.additional_charges.clone(),
                    if a.includes_vat { "yes" } else { "no" }.into(),
                    a.current_rate.clone(),
                    a.rate_type.clone(),
                    a.currency.clone(),
                    a.effective_date.clone(),
                    if a.is_active { "yes" } else { "no" }.into(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Id", "Client", "Route", "Base", "Extras", "VAT", "Current", "Type", "CCY",
                    "Effective", "Active"
                ],
                rows,
            )
        );
    }
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
