// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::blob_dir;
use crate::utils::{id_for_client, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("attach", sub)) => attach(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn attach(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let client = sub.get_one::<String>("client").unwrap().trim();
    let file = sub.get_one::<String>("file").unwrap();
    let src = Path::new(file);
    let file_name = src
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file path '{}'", file))?
        .to_string();
    let title = sub
        .get_one::<String>("title")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| file_name.clone());

    let client_id = id_for_client(conn, client)?;

    // Blob copy failure is deliberately non-fatal: the metadata row is the
    // contract record, the blob can be re-attached later.
    let dest_dir = blob_dir()?.join(client_id.to_string());
    let stored_path = match fs::create_dir_all(&dest_dir)
        .map_err(anyhow::Error::from)
        .and_then(|_| {
            let dest = dest_dir.join(&file_name);
            fs::copy(src, &dest).with_context(|| format!("Copy {} to blob store", file))?;
            Ok(dest)
        }) {
        Ok(dest) => Some(dest.to_string_lossy().to_string()),
        Err(e) => {
            eprintln!("Warning: blob upload failed ({}); metadata recorded without it", e);
            None
        }
    };

    conn.execute(
        "INSERT INTO documents(client_id, title, file_name, stored_path) VALUES (?1,?2,?3,?4)",
        params![client_id, title, file_name, stored_path],
    )?;
    println!("Attached document '{}' to client '{}'", title, client);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut sql = String::from(
        "SELECT d.id, c.name, d.title, d.file_name, d.stored_path, d.uploaded_at
         FROM documents d JOIN clients c ON d.client_id=c.id",
    );
    fn collect(rows: &mut rusqlite::Rows<'_>, data: &mut Vec<Vec<String>>) -> Result<()> {
        while let Some(r) = rows.next()? {
            data.push(vec![
                r.get::<_, i64>(0)?.to_string(),
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?.unwrap_or_else(|| "(missing)".into()),
                r.get::<_, String>(5)?,
            ]);
        }
        Ok(())
    }
    let mut data = Vec::new();
    if let Some(client) = sub.get_one::<String>("client") {
        sql.push_str(" WHERE c.name=?1 ORDER BY d.uploaded_at DESC");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![client])?;
        collect(&mut rows, &mut data)?;
    } else {
        sql.push_str(" ORDER BY d.uploaded_at DESC");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        collect(&mut rows, &mut data)?;
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(&["Id", "Client", "Title", "File", "Stored at", "Uploaded"], data)
        );
    }
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let stored: Option<Option<String>> = conn
        .query_row(
            "SELECT stored_path FROM documents WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(stored_path) = stored else {
        anyhow::bail!("No document with id {}", id);
    };
    if let Some(path) = stored_path {
        if let Err(e) = fs::remove_file(&path) {
            eprintln!("Warning: could not remove blob {}: {}", path, e);
        }
    }
    conn.execute("DELETE FROM documents WHERE id=?1", params![id])?;
    println!("Removed document {}", id);
    Ok(())
}
