// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use haulrate::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("client", sub)) => commands::clients::handle(&conn, sub)?,
        Some(("route", sub)) => commands::routes::handle(&mut conn, sub)?,
        Some(("assign", sub)) => commands::assignments::handle(&mut conn, sub)?,
        Some(("diesel", sub)) => commands::diesel::handle(&conn, sub)?,
        Some(("adjust", sub)) => commands::adjust::handle(&mut conn, sub)?,
        Some(("history", sub)) => commands::history::handle(&conn, sub)?,
        Some(("sheet", sub)) => commands::ratesheet::handle(&conn, sub)?,
        Some(("docs", sub)) => commands::documents::handle(&conn, sub)?,
        Some(("settings", sub)) => commands::settings::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
