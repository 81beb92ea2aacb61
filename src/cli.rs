// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("haulrate")
        .about("Transport-tariff contracts, diesel indexation, and rate sheets")
        .version(clap::crate_version!())
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("client")
                .about("Manage clients")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("contact").long("contact"))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("vat-number").long("vat-number")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("route")
                .about("Manage routes")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("code").long("code").required(true))
                        .arg(Arg::new("origin").long("origin").required(true))
                        .arg(Arg::new("destination").long("destination").required(true))
                        .arg(Arg::new("distance").long("distance")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("code").long("code").required(true)))
                .subcommand(
                    Command::new("import")
                        .about("Import routes from CSV (code,origin,destination,distance_km)")
                        .arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("assign")
                .about("Manage client-route rate assignments")
                .subcommand(
                    Command::new("set")
                        .about("Create or update an assignment from base rate + extras + VAT")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("route").long("route").required(true))
                        .arg(Arg::new("base-rate").long("base-rate").required(true))
                        .arg(Arg::new("additional").long("additional"))
                        .arg(
                            Arg::new("vat")
                                .long("vat")
                                .action(ArgAction::SetTrue)
                                .help("Rate includes 15% VAT"),
                        )
                        .arg(Arg::new("rate-type").long("rate-type").default_value("per_load"))
                        .arg(Arg::new("currency").long("currency").default_value("ZAR"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("set-rate")
                        .about("Directly override the current billable rate")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("route").long("route").required(true))
                        .arg(Arg::new("rate").long("rate").required(true))
                        .arg(Arg::new("reason").long("reason")),
                )
                .subcommand(
                    Command::new("deactivate")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("route").long("route").required(true)),
                )
                .subcommand(
                    Command::new("reactivate")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("route").long("route").required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("client").long("client"))
                        .arg(
                            Arg::new("active-only")
                                .long("active-only")
                                .action(ArgAction::SetTrue),
                        ),
                )),
        )
        .subcommand(
            Command::new("diesel")
                .about("Diesel price index")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("price").long("price").required(true))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(json_flags(Command::new("list").arg(
                    Arg::new("limit").long("limit").value_parser(value_parser!(usize)),
                )))
                .subcommand(Command::new("current"))
                .subcommand(Command::new("delta").about("Change of current price vs configured base")),
        )
        .subcommand(
            Command::new("adjust")
                .about("Monthly tariff adjustment")
                .subcommand(
                    Command::new("run")
                        .about("Apply one percentage to every active assignment")
                        .arg(Arg::new("percent").long("percent").required(true))
                        .arg(Arg::new("reason").long("reason"))
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .help("Adjustment month YYYY-MM (defaults to current)"),
                        ),
                )
                .subcommand(json_flags(Command::new("preview").about(
                    "Proposed rates from base rates and the current diesel delta",
                )))
                .subcommand(
                    Command::new("apply")
                        .about("Apply proposed rates to selected assignments only")
                        .arg(Arg::new("ids").long("ids").required(true).help(
                            "Comma-separated assignment ids, e.g. --ids 1,4,7",
                        ))
                        .arg(Arg::new("reason").long("reason")),
                )
                .subcommand(Command::new("status"))
                .subcommand(json_flags(Command::new("runs"))),
        )
        .subcommand(
            Command::new("history")
                .about("Tariff change ledger")
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("client").long("client"))
                        .arg(Arg::new("route").long("route"))
                        .arg(Arg::new("month").long("month"))
                        .arg(Arg::new("limit").long("limit").value_parser(value_parser!(usize))),
                )),
        )
        .subcommand(
            Command::new("sheet")
                .about("Client rate sheets")
                .subcommand(
                    Command::new("export")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("valid-until").long("valid-until"))
                        .arg(
                            Arg::new("terms")
                                .long("terms")
                                .help("Path to a terms-and-conditions text file"),
                        )
                        .arg(Arg::new("format").long("format").default_value("text"))
                        .arg(Arg::new("out").long("out")),
                ),
        )
        .subcommand(
            Command::new("docs")
                .about("Contract documents")
                .subcommand(
                    Command::new("attach")
                        .arg(Arg::new("client").long("client").required(true))
                        .arg(Arg::new("file").long("file").required(true))
                        .arg(Arg::new("title").long("title")),
                )
                .subcommand(json_flags(Command::new("list").arg(Arg::new("client").long("client"))))
                .subcommand(
                    Command::new("rm")
                        .arg(Arg::new("id").long("id").required(true).value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("settings")
                .about("Control settings")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("value").long("value").required(true)),
                ),
        )
        .subcommand(
            Command::new("doctor").about("Data integrity checks").arg(
                Arg::new("fix")
                    .long("fix")
                    .action(ArgAction::SetTrue)
                    .help("Migrate legacy notes encodings into typed columns"),
            ),
        )
}
