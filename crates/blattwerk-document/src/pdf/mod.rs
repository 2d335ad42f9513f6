// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading worksheet PDFs and stamping the overlay onto them.

pub mod overlay;
pub mod reader;

pub use overlay::VectorProcessor;
pub use reader::PdfReader;
