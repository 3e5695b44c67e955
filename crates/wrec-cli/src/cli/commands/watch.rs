//! `wrec watch <session>` – live recording size until Ctrl-C.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use wrec_core::config::WrecConfig;
use wrec_core::size::{HttpSizeSource, SizePoller};

pub async fn run_watch(
    cfg: &WrecConfig,
    session: &str,
    api_prefix: Option<&str>,
    interval_ms: Option<u64>,
) -> Result<()> {
    let api_prefix = api_prefix.unwrap_or(&cfg.api_prefix);
    let source = HttpSizeSource::new(api_prefix, &cfg.http_or_default())?;
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| cfg.poll_interval());
    if interval.is_zero() {
        anyhow::bail!("poll interval must be greater than zero");
    }

    let (embed_tx, embed_rx) = watch::channel(true);
    let mut poller = SizePoller::new(source, interval, embed_rx);
    let mut sizes = poller.subscribe();
    poller.set_session(Some(session.to_string()));

    println!("Archiving {session} (Ctrl-C to finish)");
    let printer = tokio::spawn(async move {
        let mut last = None;
        while sizes.changed().await.is_ok() {
            let state = *sizes.borrow_and_update();
            if state.polling && last != Some(state.bytes) {
                println!("  {}", format_bytes(state.bytes));
                last = Some(state.bytes);
            }
        }
    });
    let follower = tokio::spawn(async move {
        poller.follow_embedding().await;
        poller.size()
    });

    tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
    tracing::info!(session, "finishing: lowering embedding signal");
    embed_tx.send_replace(false);
    drop(embed_tx);

    let last = follower.await?;
    printer.await?;
    println!("Finished at {}", format_bytes(last.bytes));
    Ok(())
}

/// Human-readable decimal size with three significant digits: `4.1 kB`, `12.5 MB`.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut exp = 0;
    while value >= 1000.0 && exp < UNITS.len() - 1 {
        value /= 1000.0;
        exp += 1;
    }
    let mut digits = three_significant(value);
    // 999.5 and up rounds to "1000"; carry into the next unit
    if digits == "1000" && exp < UNITS.len() - 1 {
        exp += 1;
        digits = "1".to_string();
    }
    format!("{digits} {}", UNITS[exp])
}

fn three_significant(value: f64) -> String {
    let digits = if value < 10.0 {
        format!("{value:.2}")
    } else if value < 100.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    };
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        digits
    }
}
