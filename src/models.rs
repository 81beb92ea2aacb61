// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    PerLoad,
    PerKm,
    PerTon,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::PerLoad => "per_load",
            RateType::PerKm => "per_km",
            RateType::PerTon => "per_ton",
        }
    }
}

impl FromStr for RateType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_load" | "load" => Ok(RateType::PerLoad),
            "per_km" | "km" => Ok(RateType::PerKm),
            "per_ton" | "ton" => Ok(RateType::PerTon),
            other => Err(anyhow!(
                "Invalid rate type '{}', expected per_load|per_km|per_ton",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    ZAR,
    USD,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            other => Err(anyhow!("Invalid currency '{}', expected ZAR|USD", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub vat_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: Decimal,
}

/// One (client, route) pairing with its rate terms. `current_rate` is the
/// live billable rate; `base_rate` the pre-adjustment reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub client_id: i64,
    pub route_id: i64,
    pub base_rate: Decimal,
    pub current_rate: Decimal,
    pub rate_type: RateType,
    pub currency: Currency,
    pub additional_charges: Decimal,
    pub includes_vat: bool,
    pub effective_date: NaiveDate,
    pub is_active: bool,
    pub notes: Option<String>,
}

/// Monthly fuel-price observation. Append-only; the max-date sample is the
/// current price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DieselPrice {
    pub id: i64,
    pub effective_date: NaiveDate,
    pub price_per_liter: Decimal,
    pub previous_price: Option<Decimal>,
    pub percentage_change: Option<Decimal>,
    pub notes: Option<String>,
}

/// Audit ledger row: written exactly once per rate change, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffEntry {
    pub id: i64,
    pub client_route_id: i64,
    pub client_id: i64,
    pub route_id: i64,
    pub period_month: NaiveDate,
    pub previous_rate: Decimal,
    pub new_rate: Decimal,
    pub currency: Currency,
    pub diesel_price_at_change: Option<Decimal>,
    pub diesel_percentage_change: Option<Decimal>,
    pub adjustment_percentage: Decimal,
    pub adjustment_reason: String,
}

/// Marker row recording one committed monthly batch; its month is unique
/// and guards against re-application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRun {
    pub id: i64,
    pub adjustment_month: NaiveDate,
    pub diesel_percentage_change: Decimal,
    pub applied_at: String,
    pub total_routes_adjusted: i64,
    pub notes: Option<String>,
}
