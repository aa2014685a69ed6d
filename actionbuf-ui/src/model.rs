//! Demo action: greets, counts slowly, and stops early when cancelled.

use std::time::Duration;

use actionbuf::worker::ActionContext;
use anyhow::Result;

/// Pause between counted lines.
pub const STEP: Duration = Duration::from_secs(1);
const COUNT: u32 = 5;

pub async fn hello_world(ctx: ActionContext) -> Result<()> {
    ctx.line("Hello world.");
    for i in 0..COUNT {
        if !ctx.sleep(STEP).await {
            ctx.line("Stopped.");
            return Ok(());
        }
        ctx.line(format!("Count {i}"));
    }
    ctx.line("Done.");
    Ok(())
}
