// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{load_settings, pretty_table, set_setting};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => show(conn)?,
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = sub.get_one::<String>("value").unwrap();
            set_setting(conn, key, value)?;
            println!("Setting {} = {}", key, value.trim());
        }
        _ => {}
    }
    Ok(())
}

fn show(conn: &Connection) -> Result<()> {
    let s = load_settings(conn)?;
    let rows = vec![
        vec!["base_diesel_price".into(), s.base_diesel_price.to_string()],
        vec![
            "diesel_impact_percentage".into(),
            s.diesel_impact_percentage.to_string(),
        ],
        vec![
            "auto_adjust_threshold".into(),
            s.auto_adjust_threshold.to_string(),
        ],
        vec![
            "max_monthly_increase".into(),
            s.max_monthly_increase.to_string(),
        ],
        vec![
            "rounding_precision".into(),
            s.rounding_precision.to_string(),
        ],
        vec![
            "effective_day_of_month".into(),
            s.effective_day_of_month.to_string(),
        ],
    ];
    println!("{}", pretty_table(&["Setting", "Value"], rows));
    Ok(())
}
