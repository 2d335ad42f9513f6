// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-batch: Roster scanning, the per-worksheet Personalizer and the
// class-group batch orchestrator.
//
// Everything runs on the calling thread. Cancellation is cooperative: a
// shared flag is checked between student operations.

pub mod cancel;
pub mod orchestrator;
pub mod personalizer;
pub mod preview;
pub mod relocate;
pub mod roster;

pub use cancel::CancelFlag;
pub use orchestrator::{BatchOrchestrator, GroupPaths};
pub use personalizer::{Personalizer, WorksheetJob, output_path_for};
pub use preview::{Preview, generate_preview};
pub use relocate::relocate;
pub use roster::{RosterScan, scan_roster, scan_worksheets};
