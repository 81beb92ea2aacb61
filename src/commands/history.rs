// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, parse_month, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// One ledger row to append. The ledger is the system of record for "what
/// rate applied when"; rows are never updated or deleted.
pub struct NewEntry<'a> {
    pub client_route_id: i64,
    pub client_id: i64,
    pub route_id: i64,
    pub period_month: NaiveDate,
    pub previous_rate: Decimal,
    pub new_rate: Decimal,
    pub currency: &'a str,
    pub diesel_price_at_change: Option<Decimal>,
    pub diesel_percentage_change: Option<Decimal>,
    pub adjustment_percentage: Decimal,
    pub adjustment_reason: &'a str,
}

pub fn append_entry(conn: &Connection, e: &NewEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO tariff_history(
            client_route_id, client_id, route_id, period_month,
            previous_rate, new_rate, currency,
            diesel_price_at_change, diesel_percentage_change,
            adjustment_percentage, adjustment_reason)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            e.client_route_id,
            e.client_id,
            e.route_id,
            e.period_month.to_string(),
            e.previous_rate.to_string(),
            e.new_rate.to_string(),
            e.currency,
            e.diesel_price_at_change.map(|d| d.to_string()),
            e.diesel_percentage_change.map(|d| d.to_string()),
            e.adjustment_percentage.to_string(),
            e.adjustment_reason,
        ],
    )?;
    Ok(())
}

#[derive(Serialize)]
pub struct HistoryRow {
    pub client: String,
    pub route: String,
    pub period_month: String,
    pub previous_rate: String,
    pub new_rate: String,
    pub currency: String,
    pub adjustment_percentage: String,
    pub reason: String,
    pub created_at: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<HistoryRow>> {
    let mut sql = String::from(
        "SELECT c.name, r.code, h.period_month, h.previous_rate, h.new_rate, h.currency,
                h.adjustment_percentage, h.adjustment_reason, h.created_at
         FROM tariff_history h
         JOIN clients c ON h.client_id=c.id
         JOIN routes r ON h.route_id=r.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(client) = sub.get_one::<String>("client") {
        sql.push_str(" AND c.name=?");
        params_vec.push(client.into());
    }
    if let Some(route) = sub.get_one::<String>("route") {
        sql.push_str(" AND r.code=?");
        params_vec.push(route.to_uppercase());
    }
    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND h.period_month=?");
        params_vec.push(parse_month(month)?.to_string());
    }
    sql.push_str(" ORDER BY h.created_at DESC, h.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

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
        data.push(HistoryRow {
            client: r.get(0)?,
            route: r.get(1)?,
            period_month: r.get(2)?,
            previous_rate: r.get(3)?,
            new_rate: r.get(4)?,
            currency: r.get(5)?,
            adjustment_percentage: r.get(6)?,
            reason: r.get(7)?,
            created_at: r.get(8)?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|h| {
                vec![
                    h.client.clone(),
                    h.route.clone(),
                    h.period_month.clone(),
                    h.previous_rate.clone(),
                    h.new_rate.clone(),
                    h.currency.clone(),
                    h.adjustment_percentage.clone(),
                    h.reason.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Client", "Route", "Period", "Previous", "New", "CCY", "Adj %", "Reason"
                ],
                rows,
            )
        );
    }
    Ok(())
}
