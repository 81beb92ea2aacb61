// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Haulrate", "haulrate"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("haulrate.sqlite"))
}

/// Directory for stored contract documents (the blob store).
pub fn blob_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let dir = proj.data_dir().join("blobs");
    fs::create_dir_all(&dir).context("Failed to create blob dir")?;
    Ok(dir)
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS clients(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        contact TEXT,
        phone TEXT,
        vat_number TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS routes(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        origin TEXT NOT NULL,
        destination TEXT NOT NULL,
        distance_km TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Current-state table: one row per (client, route) pairing. Rows are
    -- deactivated, never deleted; reactivation reuses the same row.
    CREATE TABLE IF NOT EXISTS client_routes(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id INTEGER NOT NULL,
        route_id INTEGER NOT NULL,
        base_rate TEXT NOT NULL,
        current_rate TEXT NOT NULL,
        rate_type TEXT NOT NULL CHECK(rate_type IN ('per_load','per_km','per_ton')),
        currency TEXT NOT NULL CHECK(currency IN ('ZAR','USD')),
        additional_charges TEXT NOT NULL DEFAULT '0',
        includes_vat INTEGER NOT NULL DEFAULT 0,
        effective_date TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(client_id, route_id),
        FOREIGN KEY(client_id) REFERENCES clients(id),
        FOREIGN KEY(route_id) REFERENCES routes(id)
    );
    CREATE INDEX IF NOT EXISTS idx_client_routes_active ON client_routes(is_active);

    -- Append-only fuel-price series; max effective_date is the current price.
    CREATE TABLE IF NOT EXISTS diesel_prices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        effective_date TEXT NOT NULL UNIQUE,
        price_per_liter TEXT NOT NULL,
        previous_price TEXT,
        percentage_change TEXT,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Audit ledger: one row per rate change, never updated or deleted.
    CREATE TABLE IF NOT EXISTS tariff_history(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_route_id INTEGER NOT NULL,
        client_id INTEGER NOT NULL,
        route_id INTEGER NOT NULL,
        period_month TEXT NOT NULL,
        previous_rate TEXT NOT NULL,
        new_rate TEXT NOT NULL,
        currency TEXT NOT NULL,
        diesel_price_at_change TEXT,
        diesel_percentage_change TEXT,
        adjustment_percentage TEXT NOT NULL,
        adjustment_reason TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(client_route_id) REFERENCES client_routes(id)
    );
    CREATE INDEX IF NOT EXISTS idx_tariff_history_month ON tariff_history(period_month);
    CREATE INDEX IF NOT EXISTS idx_tariff_history_assignment ON tariff_history(client_route_id);

    -- One row per committed monthly batch; the unique month is the
    -- idempotency guarantee, the orchestrator pre-check only improves the
    -- error message.
    CREATE TABLE IF NOT EXISTS monthly_adjustments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        adjustment_month TEXT NOT NULL UNIQUE,
        diesel_percentage_change TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT (datetime('now')),
        total_routes_adjusted INTEGER NOT NULL DEFAULT 0,
        notes TEXT
    );

    CREATE TABLE IF NOT EXISTS documents(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        file_name TEXT NOT NULL,
        stored_path TEXT,
        uploaded_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(client_id) REFERENCES clients(id)
    );
    "#,
    )?;
    Ok(())
}
