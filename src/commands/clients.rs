// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let contact = sub.get_one::<String>("contact").map(|s| s.trim().to_string());
            let phone = sub.get_one::<String>("phone").map(|s| s.trim().to_string());
            let vat_number = sub
                .get_one::<String>("vat-number")
                .map(|s| s.trim().to_string());
            conn.execute(
                "INSERT INTO clients(name, contact, phone, vat_number) VALUES (?1, ?2, ?3, ?4)",
                params![name, contact, phone, vat_number],
            )?;
            println!("Added client '{}'", name);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let refs: i64 = conn.query_row(
                "SELECT COUNT(*) FROM client_routes cr JOIN clients c ON cr.client_id=c.id WHERE c.name=?1",
                params![name],
                |r| r.get(0),
            )?;
            if refs > 0 {
                anyhow::bail!(
                    "Client '{}' has {} route assignment(s); deactivate them instead of removing the client",
                    name,
                    refs
                );
            }
            conn.execute("DELETE FROM clients WHERE name=?1", params![name])?;
            println!("Removed client '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct ClientRow {
    name: String,
    contact: String,
    phone: String,
    vat_number: String,
    routes: i64,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt = conn.prepare(
        "SELECT c.name, c.contact, c.phone, c.vat_number,
                (SELECT COUNT(*) FROM client_routes cr WHERE cr.client_id=c.id AND cr.is_active=1)
         FROM clients c ORDER BY c.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(ClientRow {
            name: r.get(0)?,
            contact: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
            phone: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
            vat_number: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
            routes: r.get(4)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.contact.clone(),
                    c.phone.clone(),
                    c.vat_number.clone(),
                    c.routes.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Contact", "Phone", "VAT no.", "Active routes"],
                rows
            )
        );
    }
    Ok(())
}
