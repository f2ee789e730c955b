// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Noah Optimizer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Invoke `cycle` now and then every `period` until `shutdown` resolves.
///
/// Cycles never overlap: a slow cycle delays the next tick instead of
/// queueing a burst. A cycle that has started always runs to completion.
/// Returns the number of cycles run.
pub async fn run_every<F, Fut, S>(period: Duration, shutdown: S, mut cycle: F) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future,
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested, stopping after {} cycle(s)", runs);
                break;
            }
            _ = ticker.tick() => {
                runs += 1;
                debug!("Starting cycle {}", runs);
                cycle().await;
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{Instant, sleep};

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_period() {
        let start = Instant::now();
        let mut started_at = Vec::new();

        let runs = run_every(Duration::from_secs(30), sleep(Duration::from_secs(95)), || {
            started_at.push(start.elapsed().as_secs());
            async {}
        })
        .await;

        assert_eq!(runs, 4);
        assert_eq!(started_at, vec![0, 30, 60, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycles_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let runs = run_every(Duration::from_secs(30), sleep(Duration::from_secs(100)), || {
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_secs(45)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(runs >= 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_shutdown_runs_at_most_once() {
        let runs = run_every(Duration::from_secs(30), async {}, || async {}).await;
        assert!(runs <= 1);
    }
}
