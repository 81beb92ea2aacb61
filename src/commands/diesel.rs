// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TariffError;
use crate::indexation::{change_from_base, round_half_up};
use crate::models::DieselPrice;
use crate::utils::{load_settings, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("current", _)) => {
            match current_sample(conn)? {
                Some(s) => println!(
                    "Current diesel price: {} per liter (as of {})",
                    s.price_per_liter, s.effective_date
                ),
                None => println!("Diesel price index is empty"),
            }
        }
        Some(("delta", _)) => {
            let settings = load_settings(conn)?;
            let sample = current_sample(conn)?.ok_or(TariffError::EmptyDieselIndex)?;
            let delta = change_from_base(sample.price_per_liter, settings.base_diesel_price)?;
            println!(
                "Diesel {} vs base {}: {:+.4}%",
                sample.price_per_liter,
                settings.base_diesel_price,
                round_half_up(delta, 4)
            );
        }
        _ => {}
    }
    Ok(())
}

/// Append one observation. The prior max-date sample at insert time supplies
/// `previous_price`; `percentage_change` is derived from it (NULL on the
/// first sample, 0 when the price repeats).
pub fn append_sample(
    conn: &Connection,
    effective_date: NaiveDate,
    price_per_liter: Decimal,
    notes: Option<&str>,
) -> Result<DieselPrice> {
    if price_per_liter < Decimal::ZERO {
        return Err(TariffError::Validation(format!(
            "diesel price must not be negative, got {}",
            price_per_liter
        ))
        .into());
    }

    let previous = current_sample(conn)?;
    let previous_price = previous.as_ref().map(|p| p.price_per_liter);
    let percentage_change = match previous_price {
        Some(prev) if !prev.is_zero() => Some((price_per_liter - prev) / prev * Decimal::from(100)),
        Some(_) => Some(Decimal::ZERO),
        None => None,
    };

    conn.execute(
        "INSERT INTO diesel_prices(effective_date, price_per_liter, previous_price, percentage_change, notes)
         VALUES (?1,?2,?3,?4,?5)",
        params![
            effective_date.to_string(),
            price_per_liter.to_string(),
            previous_price.map(|d| d.to_string()),
            percentage_change.map(|d| d.to_string()),
            notes
        ],
    )
    .with_context(|| format!("Insert diesel sample for {}", effective_date))?;

    Ok(DieselPrice {
        id: conn.last_insert_rowid(),
        effective_date,
        price_per_liter,
        previous_price,
        percentage_change,
        notes: notes.map(|s| s.to_string()),
    })
}

/// The max-effective_date sample; every "current diesel price" read in the
/// system goes through here.
pub fn current_sample(conn: &Connection) -> Result<Option<DieselPrice>> {
    let row = conn
        .query_row(
            "SELECT id, effective_date, price_per_liter, previous_price, percentage_change, notes
             FROM diesel_prices ORDER BY effective_date DESC LIMIT 1",
            [],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;
    let Some((id, date_s, price_s, prev_s, pct_s, notes)) = row else {
        return Ok(None);
    };
    Ok(Some(DieselPrice {
        id,
        effective_date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' in diesel index", date_s))?,
        price_per_liter: price_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid price '{}' in diesel index", price_s))?,
        previous_price: prev_s
            .map(|s| s.parse::<Decimal>())
            .transpose()
            .context("Invalid previous price in diesel index")?,
        percentage_change: pct_s
            .map(|s| s.parse::<Decimal>())
            .transpose()
            .context("Invalid percentage change in diesel index")?,
        notes,
    }))
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let price = parse_decimal(sub.get_one::<String>("price").unwrap())?;
    let notes = sub.get_one::<String>("notes").map(|s| s.trim());
    let sample = append_sample(conn, date, price, notes)?;
    match sample.percentage_change {
        Some(pct) => println!(
            "Recorded diesel price {} for {} ({:+.4}% vs previous)",
            sample.price_per_liter,
            sample.effective_date,
            round_half_up(pct, 4)
        ),
        None => println!(
            "Recorded diesel price {} for {} (first sample)",
            sample.price_per_liter, sample.effective_date
        ),
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let limit = sub.get_one::<usize>("limit").copied().unwrap_or(24);
    let mut stmt = conn.prepare(
        "SELECT effective_date, price_per_liter, previous_price, percentage_change, notes
         FROM diesel_prices ORDER BY effective_date DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (d, p, prev, pct, notes) = row?;
        data.push((d, p, prev, pct, notes));
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .into_iter()
            .map(|(d, p, prev, pct, notes)| {
                let pct_disp = match pct {
                    Some(s) => match s.parse::<Decimal>() {
                        Ok(v) => format!("{:+.4}", round_half_up(v, 4)),
                        Err(_) => s,
                    },
                    None => String::new(),
                };
                vec![d, p, prev.unwrap_or_default(), pct_disp, notes.unwrap_or_default()]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Date", "Price/l", "Previous", "Change %", "Notes"], rows)
        );
    }
    Ok(())
}
