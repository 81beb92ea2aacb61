// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("import", sub)) => import(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim().to_uppercase();
    let origin = sub.get_one::<String>("origin").unwrap().trim();
    let destination = sub.get_one::<String>("destination").unwrap().trim();
    let distance = match sub.get_one::<String>("distance") {
        Some(s) => parse_decimal(s)?,
        None => Decimal::ZERO,
    };
    conn.execute(
        "INSERT INTO routes(code, origin, destination, distance_km) VALUES (?1, ?2, ?3, ?4)",
        params![code, origin, destination, distance.to_string()],
    )?;
    println!("Added route {} ({} -> {})", code, origin, destination);
    Ok(())
}

#[derive(Serialize)]
struct RouteRow {
    code: String,
    origin: String,
    destination: String,
    distance_km: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt =
        conn.prepare("SELECT code, origin, destination, distance_km FROM routes ORDER BY code")?;
    let rows = stmt.query_map([], |r| {
        Ok(RouteRow {
            code: r.get(0)?,
            origin: r.get(1)?,
            destination: r.get(2)?,
            distance_km: r.get(3)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.code.clone(),
                    r.origin.clone(),
                    r.destination.clone(),
                    r.distance_km.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Code", "Origin", "Destination", "Distance (km)"], rows)
        );
    }
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap();
    let refs: i64 = conn.query_row(
        "SELECT COUNT(*) FROM client_routes cr JOIN routes r ON cr.route_id=r.id WHERE r.code=?1",
        params![code],
        |r| r.get(0),
    )?;
    if refs > 0 {
        anyhow::bail!(
            "Route '{}' is assigned to {} client(s); deactivate the assignments instead",
            code,
            refs
        );
    }
    conn.execute("DELETE FROM routes WHERE code=?1", params![code])?;
    println!("Removed route '{}'", code);
    Ok(())
}

fn import(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for result in rdr.records() {
        let rec = result?;
        let code = rec.get(0).context("code missing")?.trim().to_uppercase();
        let origin = rec.get(1).context("origin missing")?.trim().to_string();
        let destination = rec
            .get(2)
            .context("destination missing")?
            .trim()
            .to_string();
        let distance_raw = rec.get(3).unwrap_or("0").trim();
        let distance = parse_decimal(if distance_raw.is_empty() { "0" } else { distance_raw })
            .with_context(|| format!("Invalid distance '{}' for route {}", distance_raw, code))?;
        let changed = tx.execute(
            "INSERT OR IGNORE INTO routes(code, origin, destination, distance_km) VALUES (?1,?2,?3,?4)",
            params![code, origin, destination, distance.to_string()],
        )?;
        if changed == 1 {
            imported += 1;
        } else {
            skipped += 1;
        }
    }
    tx.commit()?;
    println!("Imported {} route(s), skipped {} duplicate(s)", imported, skipped);
    Ok(())
}
