// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk: core types, configuration and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod report;
pub mod types;

pub use config::{Configuration, NamePosition, PhotoScale};
pub use error::{BlattwerkError, ErrorKind};
pub use report::{BatchOutcome, BatchResult, GroupReport, GroupState, WorksheetReport};
pub use types::*;
