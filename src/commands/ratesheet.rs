// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{fmt_money, id_for_client, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;

pub const TERMS_LINES_PER_PAGE: usize = 40;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("export", sub)) => export(conn, sub),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetLine {
    pub route_code: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: String,
    pub rate: String,
    pub rate_type: String,
}

#[derive(Debug, Serialize)]
pub struct TermsSection {
    pub lines: Vec<String>,
    pub lines_per_page: usize,
    /// Computed up front so the footer can say "Page X of Y" on page 1.
    pub total_pages: usize,
}

/// Ordered document model for one client's rate sheet. Pure projection of
/// current assignment state; rendering happens separately.
#[derive(Debug, Serialize)]
pub struct RateSheet {
    pub client_name: String,
    pub client_contact: String,
    pub client_vat_number: String,
    pub generated_on: NaiveDate,
    pub effective_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub lines: Vec<SheetLine>,
    pub notes: Vec<String>,
    pub terms: Option<TermsSection>,
}

pub fn paginate_terms(text: &str, lines_per_page: usize) -> TermsSection {
    let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    let total_pages = lines.len().div_ceil(lines_per_page).max(1);
    TermsSection {
        lines,
        lines_per_page,
        total_pages,
    }
}

pub fn build_document(
    conn: &Connection,
    client_name: &str,
    valid_until: Option<NaiveDate>,
    terms_text: Option<&str>,
    today: NaiveDate,
) -> Result<RateSheet> {
    let client_id = id_for_client(conn, client_name)?;
    let (contact, vat_number): (Option<String>, Option<String>) = conn.query_row(
        "SELECT contact, vat_number FROM clients WHERE id=?1",
        params![client_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT r.code, r.origin, r.destination, r.distance_km,
                cr.current_rate, cr.currency, cr.rate_type, cr.effective_date, cr.notes
         FROM client_routes cr
         JOIN routes r ON cr.route_id=r.id
         WHERE cr.client_id=?1 AND cr.is_active=1
         ORDER BY r.code",
    )?;
    let rows = stmt.query_map(params![client_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, Option<String>>(8)?,
        ))
    })?;

    let mut lines = Vec::new();
    let mut notes = Vec::new();
    let mut effective_date: Option<NaiveDate> = None;
    for row in rows {
        let (code, origin, destination, distance, rate_s, ccy, rate_type, eff_s, note) = row?;
        let rate = parse_decimal(&rate_s)
            .with_context(|| format!("Invalid current rate '{}' for route {}", rate_s, code))?;
        let eff = parse_date(&eff_s)?;
        effective_date = Some(match effective_date {
            Some(d) if d >= eff => d,
            _ => eff,
        });
        let type_label = match rate_type.as_str() {
            "per_km" => "per km",
            "per_ton" => "per ton",
            _ => "per load",
        };
        lines.push(SheetLine {
            route_code: code.clone(),
            origin,
            destination,
            distance_km: distance,
            rate: fmt_money(&rate, &ccy),
            rate_type: type_label.to_string(),
        });
        if let Some(n) = note {
            if !n.trim().is_empty() {
                notes.push(format!("{}: {}", code, n.trim()));
            }
        }
    }

    Ok(RateSheet {
        client_name: client_name.to_string(),
        client_contact: contact.unwrap_or_default(),
        client_vat_number: vat_number.unwrap_or_default(),
        generated_on: today,
        effective_date,
        valid_until,
        lines,
        notes,
        terms: terms_text.map(|t| paginate_terms(t, TERMS_LINES_PER_PAGE)),
    })
}

/// Paginated plain-text rendering: the byte stream handed to whatever
/// prints or mails the sheet.
pub fn render_text(doc: &RateSheet) -> String {
    let mut out = String::new();
    out.push_str("HAULRATE TRANSPORT TARIFF SHEET\n");
    out.push_str(&format!("Generated: {}\n\n", doc.generated_on));
    out.push_str(&format!("Client: {}\n", doc.client_name));
    if !doc.client_contact.is_empty() {
        out.push_str(&format!("Contact: {}\n", doc.client_contact));
    }
    if !doc.client_vat_number.is_empty() {
        out.push_str(&format!("VAT no.: {}\n", doc.client_vat_number));
    }
    match (doc.effective_date, doc.valid_until) {
        (Some(from), Some(until)) => out.push_str(&format!("Valid: {} to {}\n", from, until)),
        (Some(from), None) => out.push_str(&format!("Effective from: {}\n", from)),
        _ => {}
    }
    out.push('\n');

    let rows: Vec<Vec<String>> = doc
        .lines
        .iter()
        .map(|l| {
            vec![
                l.route_code.clone(),
                l.origin.clone(),
                l.destination.clone(),
                l.distance_km.clone(),
                format!("{} {}", l.rate, l.rate_type),
            ]
        })
        .collect();
    out.push_str(&format!(
        "{}\n",
        pretty_table(&["Route", "Origin", "Destination", "Km", "Rate"], rows)
    ));

    if !doc.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for n in &doc.notes {
            out.push_str(&format!("  - {}\n", n));
        }
    }

    if let Some(terms) = &doc.terms {
        for (page_idx, chunk) in terms.lines.chunks(terms.lines_per_page).enumerate() {
            out.push_str("\n--- Terms and Conditions ---\n");
            for line in chunk {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!(
                "Page {} of {}\n",
                page_idx + 1,
                terms.total_pages
            ));
        }
    }
    out
}

fn export(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let client = sub.get_one::<String>("client").unwrap().trim();
    let valid_until = sub
        .get_one::<String>("valid-until")
        .map(|s| parse_date(s))
        .transpose()?;
    let terms_text = sub
        .get_one::<String>("terms")
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("Read terms file {}", p)))
        .transpose()?;
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out");

    let today = chrono::Utc::now().date_naive();
    let doc = build_document(conn, client, valid_until, terms_text.as_deref(), today)?;

    match fmt.as_str() {
        "text" => {
            let rendered = render_text(&doc);
            match out {
                Some(path) => {
                    std::fs::write(path, rendered)
                        .with_context(|| format!("Write rate sheet to {}", path))?;
                    println!("Exported rate sheet for '{}' to {}", client, path);
                }
                None => print!("{}", rendered),
            }
        }
        "csv" => {
            let path = out.context("--out is required for csv export")?;
            let mut wtr = csv::Writer::from_path(path)?;
            wtr.write_record(["route", "origin", "destination", "distance_km", "rate", "rate_type"])?;
            for l in &doc.lines {
                wtr.write_record([
                    l.route_code.as_str(),
                    l.origin.as_str(),
                    l.destination.as_str(),
                    l.distance_km.as_str(),
                    l.rate.as_str(),
                    l.rate_type.as_str(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported rate sheet for '{}' to {}", client, path);
        }
        "json" => {
            let rendered = serde_json::to_string_pretty(&doc)?;
            match out {
                Some(path) => {
                    std::fs::write(path, rendered)
                        .with_context(|| format!("Write rate sheet to {}", path))?;
                    println!("Exported rate sheet for '{}' to {}", client, path);
                }
                None => println!("{}", rendered),
            }
        }
        _ => {
            eprintln!("Unknown format: {} (use text|csv|json)", fmt);
        }
    }
    Ok(())
}
