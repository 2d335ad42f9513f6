// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ctrl-C handling. The first interrupt sets the cancellation flag so the
// current student finishes and no new one starts; a second one exits.

use std::thread;

use blattwerk_batch::CancelFlag;
use tracing::{error, warn};

/// Exit status for an interrupted run.
pub const CANCELLED_EXIT_CODE: i32 = 2;

/// Listen for Ctrl-C on a background thread with its own tokio runtime.
pub fn install(cancel: CancelFlag) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        error!(%err, "Cannot listen for Ctrl-C");
                        return;
                    }
                    if cancel.is_cancelled() {
                        warn!("Second interrupt, stopping immediately");
                        std::process::exit(CANCELLED_EXIT_CODE);
                    }
                    warn!("Interrupted, finishing the current student and stopping");
                    cancel.cancel();
                }
            });
        })?;
    Ok(())
}
