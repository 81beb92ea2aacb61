// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::diesel::current_sample;
use crate::commands::history::{append_entry, NewEntry};
use crate::error::TariffError;
use crate::indexation::{
    adjustment_percentage, change_from_base, proposed_rate, round_half_up, scaled_rate,
    ControlSettings,
};
use crate::utils::{
    first_wednesday, load_settings, maybe_print_json, month_start, parse_month, parse_percent,
    pretty_table,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("run", sub)) => run(conn, sub)?,
        Some(("preview", sub)) => preview(conn, sub)?,
        Some(("apply", sub)) => apply(conn, sub)?,
        Some(("status", _)) => status(conn)?,
        Some(("runs", sub)) => runs(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// What one batch run did. Partial failure is an outcome, not an error:
/// the loop is best-effort by design and the operator follows up on the
/// listed assignments by hand.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub adjustment_month: NaiveDate,
    pub percent: Decimal,
    pub adjusted: usize,
    pub total: usize,
    pub failed_ids: Vec<i64>,
}

struct ActiveAssignment {
    id: i64,
    client_id: i64,
    route_id: i64,
    currency: String,
    current_rate: Result<Decimal, String>,
}

fn load_active(conn: &Connection) -> Result<Vec<ActiveAssignment>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, route_id, currency, current_rate
         FROM client_routes WHERE is_active=1 ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, client_id, route_id, currency, rate_s) = row?;
        out.push(ActiveAssignment {
            id,
            client_id,
            route_id,
            currency,
            current_rate: rate_s.parse::<Decimal>().map_err(|_| rate_s),
        });
    }
    Ok(out)
}

fn run_exists(conn: &Connection, month: NaiveDate) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM monthly_adjustments WHERE adjustment_month=?1",
            params![month.to_string()],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// The monthly batch: one signed percentage applied to every active
/// assignment, one ledger entry each, one run marker for the month.
///
/// The pre-check on `monthly_adjustments` gives a clean error; the UNIQUE
/// constraint on `adjustment_month` is what actually prevents a double
/// apply. Each assignment's ledger write and rate update commit or roll
/// back together in a savepoint; a failed assignment does not stop the
/// loop.
pub fn run_monthly(
    conn: &mut Connection,
    month: NaiveDate,
    percent: Decimal,
    reason: Option<&str>,
) -> Result<RunOutcome> {
    let month = month_start(month);
    if run_exists(conn, month)? {
        return Err(TariffError::AlreadyApplied { month }.into());
    }

    let settings = load_settings(conn)?;
    let diesel_price = current_sample(conn)?.map(|s| s.price_per_liter);
    let default_reason = format!("Monthly diesel adjustment {:+}%", percent);
    let reason = reason.unwrap_or(&default_reason);

    let assignments = load_active(conn)?;
    let total = assignments.len();
    let mut adjusted = 0usize;
    let mut failed_ids = Vec::new();

    let mut tx = conn.transaction()?;
    for a in &assignments {
        let current = match &a.current_rate {
            Ok(d) => *d,
            Err(raw) => {
                eprintln!("Skipping assignment {}: invalid stored rate '{}'", a.id, raw);
                failed_ids.push(a.id);
                continue;
            }
        };
        let new_rate = scaled_rate(current, percent, settings.rounding_precision);
        let entry = NewEntry {
            client_route_id: a.id,
            client_id: a.client_id,
            route_id: a.route_id,
            period_month: month,
            previous_rate: current,
            new_rate,
            currency: &a.currency,
            diesel_price_at_change: diesel_price,
            diesel_percentage_change: Some(percent),
            adjustment_percentage: percent,
            adjustment_reason: reason,
        };
        match adjust_one(&mut tx, &entry) {
            Ok(()) => adjusted += 1,
            Err(e) => {
                eprintln!("Skipping assignment {}: {}", a.id, e);
                failed_ids.push(a.id);
            }
        }
    }

    tx.execute(
        "INSERT INTO monthly_adjustments(adjustment_month, diesel_percentage_change, total_routes_adjusted, notes)
         VALUES (?1,?2,?3,?4)",
        params![
            month.to_string(),
            percent.to_string(),
            adjusted as i64,
            reason
        ],
    )
    .context("Record monthly adjustment run")?;
    tx.commit()?;

    Ok(RunOutcome {
        adjustment_month: month,
        percent,
        adjusted,
        total,
        failed_ids,
    })
}

/// Ledger write and rate update for one assignment, as a unit: both land
/// or neither does, and a failure here never aborts the batch loop.
fn adjust_one(tx: &mut rusqlite::Transaction, entry: &NewEntry) -> Result<()> {
    let sp = tx.savepoint()?;
    append_entry(&sp, entry)?;
    sp.execute(
        "UPDATE client_routes SET current_rate=?1, updated_at=datetime('now') WHERE id=?2",
        params![entry.new_rate.to_string(), entry.client_route_id],
    )?;
    sp.commit()?;
    Ok(())
}

fn run(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let percent = parse_percent(sub.get_one::<String>("percent").unwrap())?;
    let reason = sub.get_one::<String>("reason").map(|s| s.trim());
    let month = match sub.get_one::<String>("month") {
        Some(s) => parse_month(s)?,
        None => month_start(today()),
    };
    let outcome = run_monthly(conn, month, percent, reason)?;
    println!(
        "{} of {} routes adjusted by {:+}% for {}",
        outcome.adjusted, outcome.total, outcome.percent, outcome.adjustment_month
    );
    if !outcome.failed_ids.is_empty() {
        println!(
            "Failed assignment id(s) for manual follow-up: {}",
            outcome
                .failed_ids
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

/// What-if projection: the rate formula applied to each active assignment's
/// base rate and the current delta-from-base. Read-only.
#[derive(Debug, Serialize)]
pub struct PreviewRow {
    pub id: i64,
    pub client: String,
    pub route: String,
    pub base_rate: Decimal,
    pub current_rate: Decimal,
    pub proposed_rate: Decimal,
    pub adjustment_percentage: Decimal,
    pub exceeds_max: bool,
}

pub fn preview_rows(conn: &Connection) -> Result<Vec<PreviewRow>> {
    let settings = load_settings(conn)?;
    let sample = current_sample(conn)?.ok_or(TariffError::EmptyDieselIndex)?;
    let delta = change_from_base(sample.price_per_liter, settings.base_diesel_price)?;

    let mut stmt = conn.prepare(
        "SELECT cr.id, c.name, r.code, cr.base_rate, cr.current_rate
         FROM client_routes cr
         JOIN clients c ON cr.client_id=c.id
         JOIN routes r ON cr.route_id=r.id
         WHERE cr.is_active=1 ORDER BY c.name, r.code",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, client, route, base_s, current_s) = row?;
        let base = base_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid base rate '{}' on assignment {}", base_s, id))?;
        let current = current_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid current rate '{}' on assignment {}", current_s, id))?;
        let proposed = proposed_rate(
            base,
            delta,
            settings.diesel_impact_percentage,
            settings.rounding_precision,
        );
        let adj_pct = adjustment_percentage(current, proposed);
        out.push(PreviewRow {
            id,
            client,
            route,
            base_rate: base,
            current_rate: current,
            proposed_rate: proposed,
            adjustment_percentage: round_half_up(adj_pct, 4),
            exceeds_max: adj_pct > settings.max_monthly_increase,
        });
    }
    Ok(out)
}

fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = preview_rows(conn)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.client.clone(),
                    p.route.clone(),
                    p.base_rate.to_string(),
                    p.current_rate.to_string(),
                    p.proposed_rate.to_string(),
                    format!("{:+.4}", p.adjustment_percentage),
                    if p.exceeds_max { "exceeds max" } else { "" }.into(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Id", "Client", "Route", "Base", "Current", "Proposed", "Adj %", "Warning"
                ],
                rows,
            )
        );
    }
    Ok(())
}

/// Commit the previewed proposal for a chosen subset of assignments. Same
/// per-assignment unit as the monthly run, but no run marker is written --
/// selective application and the monthly batch guard independently.
pub fn apply_selected(
    conn: &mut Connection,
    ids: &[i64],
    reason: Option<&str>,
) -> Result<RunOutcome> {
    let settings = load_settings(conn)?;
    let sample = current_sample(conn)?.ok_or(TariffError::EmptyDieselIndex)?;
    let delta = change_from_base(sample.price_per_liter, settings.base_diesel_price)?;
    let month = month_start(today());
    let reason = reason.unwrap_or("selective diesel indexation");

    let mut adjusted = 0usize;
    let mut failed_ids = Vec::new();

    let mut tx = conn.transaction()?;
    for &id in ids {
        let applied = apply_one(
            &mut tx,
            id,
            delta,
            sample.price_per_liter,
            &settings,
            month,
            reason,
        );
        match applied {
            Ok(()) => adjusted += 1,
            Err(e) => {
                eprintln!("Skipping assignment {}: {}", id, e);
                failed_ids.push(id);
            }
        }
    }
    tx.commit()?;

    Ok(RunOutcome {
        adjustment_month: month,
        percent: delta,
        adjusted,
        total: ids.len(),
        failed_ids,
    })
}

fn apply_one(
    tx: &mut rusqlite::Transaction,
    id: i64,
    delta: Decimal,
    diesel_price: Decimal,
    settings: &ControlSettings,
    month: NaiveDate,
    reason: &str,
) -> Result<()> {
    let sp = tx.savepoint()?;
    let (client_id, route_id, currency, base_s, current_s): (i64, i64, String, String, String) = sp
        .query_row(
            "SELECT client_id, route_id, currency, base_rate, current_rate
             FROM client_routes WHERE id=?1 AND is_active=1",
            params![id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                ))
            },
        )
        .with_context(|| format!("No active assignment with id {}", id))?;
    let base = base_s
        .parse::<Decimal>()
        .with_context(|| format!("Invalid base rate '{}'", base_s))?;
    let current = current_s
        .parse::<Decimal>()
        .with_context(|| format!("Invalid current rate '{}'", current_s))?;
    let proposed = proposed_rate(
        base,
        delta,
        settings.diesel_impact_percentage,
        settings.rounding_precision,
    );
    let adj_pct = adjustment_percentage(current, proposed);
    if adj_pct > settings.max_monthly_increase {
        eprintln!(
            "Warning: assignment {} adjustment {:+.4}% exceeds max_monthly_increase {}",
            id,
            round_half_up(adj_pct, 4),
            settings.max_monthly_increase
        );
    }
    append_entry(
        &sp,
        &NewEntry {
            client_route_id: id,
            client_id,
            route_id,
            period_month: month,
            previous_rate: current,
            new_rate: proposed,
            currency: &currency,
            diesel_price_at_change: Some(diesel_price),
            diesel_percentage_change: Some(delta),
            adjustment_percentage: adj_pct,
            adjustment_reason: reason,
        },
    )?;
    sp.execute(
        "UPDATE client_routes SET current_rate=?1, updated_at=datetime('now') WHERE id=?2",
        params![proposed.to_string(), id],
    )?;
    sp.commit()?;
    Ok(())
}

fn apply(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let ids_raw = sub.get_one::<String>("ids").unwrap();
    let mut ids = Vec::new();
    for part in ids_raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        ids.push(
            part.parse::<i64>()
                .with_context(|| format!("Invalid assignment id '{}'", part))?,
        );
    }
    if ids.is_empty() {
        anyhow::bail!("No assignment ids given");
    }
    let reason = sub.get_one::<String>("reason").map(|s| s.trim());
    let outcome = apply_selected(conn, &ids, reason)?;
    println!(
        "{} of {} selected assignments adjusted (diesel delta {:+.4}%)",
        outcome.adjusted,
        outcome.total,
        round_half_up(outcome.percent, 4)
    );
    if !outcome.failed_ids.is_empty() {
        println!(
            "Failed assignment id(s): {}",
            outcome
                .failed_ids
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn status(conn: &Connection) -> Result<()> {
    let today = today();
    let due_day = first_wednesday(today);
    let month = month_start(today);
    let applied = run_exists(conn, month)?;
    let settings = load_settings(conn)?;
    if today == due_day {
        println!("Today is the first Wednesday of the month: adjustment due.");
    } else {
        println!("Next adjustment day (first Wednesday): {}", due_day);
    }
    if applied {
        println!("Adjustment for {} already applied.", month);
    } else {
        println!("No adjustment recorded for {} yet.", month);
    }
    if let Some(sample) = current_sample(conn)? {
        let delta = change_from_base(sample.price_per_liter, settings.base_diesel_price)?;
        println!(
            "Diesel delta vs base: {:+.4}%",
            round_half_up(delta, 4)
        );
        if delta.abs() > settings.auto_adjust_threshold {
            println!(
                "Delta exceeds auto_adjust_threshold ({}%): indexation suggested.",
                settings.auto_adjust_threshold
            );
        }
    }
    println!(
        "Adjusted rates take effect on day {} of the month.",
        settings.effective_day_of_month
    );
    Ok(())
}

fn runs(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut stmt = conn.prepare(
        "SELECT adjustment_month, diesel_percentage_change, applied_at, total_routes_adjusted, notes
         FROM monthly_adjustments ORDER BY adjustment_month DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, i64>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (m, pct, at, n, notes) = row?;
        data.push(vec![m, pct, at, n.to_string(), notes.unwrap_or_default()]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Month", "Percent", "Applied at", "Routes", "Notes"],
                data
            )
        );
    }
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
