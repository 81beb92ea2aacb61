// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures the tariff engine rejects before any write. Storage errors
/// surface separately as `rusqlite`/`anyhow` errors from the handlers.
#[derive(Debug, Error)]
pub enum TariffError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid percentage '{0}': expected a finite number")]
    InvalidPercentage(String),

    #[error("monthly adjustment already applied for {month}")]
    AlreadyApplied { month: NaiveDate },

    #[error("diesel price index is empty")]
    EmptyDieselIndex,
}
