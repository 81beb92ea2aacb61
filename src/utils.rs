// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TariffError;
use crate::indexation::ControlSettings;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parse 'YYYY-MM' into the first day of that month.
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Signed percentage from operator input; rejects anything that is not a
/// finite number.
pub fn parse_percent(s: &str) -> Result<Decimal, TariffError> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| TariffError::InvalidPercentage(s.to_string()))
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn id_for_client(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM clients WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Client '{}' not found", name))?;
    Ok(id)
}

pub fn id_for_route(conn: &Connection, code: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM routes WHERE code=?1")?;
    let id: i64 = stmt
        .query_row(params![code], |r| r.get(0))
        .with_context(|| format!("Route '{}' not found", code))?;
    Ok(id)
}

pub const SETTING_KEYS: &[&str] = &[
    "base_diesel_price",
    "diesel_impact_percentage",
    "auto_adjust_threshold",
    "max_monthly_increase",
    "rounding_precision",
    "effective_day_of_month",
];

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    if !SETTING_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown setting '{}', expected one of: {}",
            key,
            SETTING_KEYS.join(", ")
        );
    }
    match key {
        "rounding_precision" | "effective_day_of_month" => {
            value
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid value '{}' for {}", value, key))?;
        }
        _ => {
            parse_decimal(value).with_context(|| format!("Invalid value '{}' for {}", value, key))?;
        }
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value.trim()],
    )?;
    Ok(())
}

/// Control settings with defaults for any key absent from the table.
pub fn load_settings(conn: &Connection) -> Result<ControlSettings> {
    let mut s = ControlSettings::default();
    if let Some(v) = get_setting(conn, "base_diesel_price")? {
        s.base_diesel_price = parse_decimal(&v).context("Invalid base_diesel_price setting")?;
    }
    if let Some(v) = get_setting(conn, "diesel_impact_percentage")? {
        s.diesel_impact_percentage =
            parse_decimal(&v).context("Invalid diesel_impact_percentage setting")?;
    }
    if let Some(v) = get_setting(conn, "auto_adjust_threshold")? {
        s.auto_adjust_threshold =
            parse_decimal(&v).context("Invalid auto_adjust_threshold setting")?;
    }
    if let Some(v) = get_setting(conn, "max_monthly_increase")? {
        s.max_monthly_increase =
            parse_decimal(&v).context("Invalid max_monthly_increase setting")?;
    }
    if let Some(v) = get_setting(conn, "rounding_precision")? {
        s.rounding_precision = v
            .parse::<u32>()
            .context("Invalid rounding_precision setting")?;
    }
    if let Some(v) = get_setting(conn, "effective_day_of_month")? {
        s.effective_day_of_month = v
            .parse::<u32>()
            .context("Invalid effective_day_of_month setting")?;
    }
    Ok(s)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// First Wednesday of the month containing `date` -- the advisory "run the
/// monthly adjustment" day.
pub fn first_wednesday(date: NaiveDate) -> NaiveDate {
    let mut d = month_start(date);
    while d.weekday() != Weekday::Wed {
        d = d.succ_opt().unwrap_or(d);
    }
    d
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

use once_cell::sync::Lazy;
use regex::Regex;

static LEGACY_NOTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)extras\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*;\s*vat\s*=\s*(yes|no)").unwrap()
});

/// Older imports encoded additional charges and the VAT flag inside the
/// free-text notes column. Recognise that encoding so `doctor --fix` can
/// move it into the typed columns.
pub fn parse_legacy_notes(notes: &str) -> Option<(Decimal, bool)> {
    let caps = LEGACY_NOTES.captures(notes)?;
    let charges = caps.get(1)?.as_str().parse::<Decimal>().ok()?;
    let vat = caps.get(2)?.as_str().eq_ignore_ascii_case("yes");
    Some((charges, vat))
}

/// Strip the legacy encoding out of a notes value, keeping whatever free
/// text surrounded it.
pub fn strip_legacy_notes(notes: &str) -> Option<String> {
    let cleaned = LEGACY_NOTES.replace(notes, "").trim().to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}
