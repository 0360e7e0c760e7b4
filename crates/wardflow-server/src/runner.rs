//! The loops that drive the simulation: pathway creation at the controlled
//! rate, event and message polling, and the control-plane HTTP server.
//!
//! All four run until the shared cancellation token fires. The first loop to
//! fail cancels the others. Bounded runs (`max_pathways >= 0`) drain instead:
//! when pathway creation ends, the event loop keeps going until the event
//! queue is empty, then the message loop until the message queue is empty,
//! and only then does the runner shut everything down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use wardflow_core::Result;
use wardflow_engine::Hospital;
use wardflow_rate::RateController;

use crate::http::{AppState, router};

pub struct Runner {
    hospital: Arc<Hospital>,
    rate: Arc<RateController>,
    /// Polling interval of the event and message loops.
    sleep_for: Duration,
    /// Stop creating pathways after this many; negative means never stop.
    max_pathways: i64,
    token: CancellationToken,
}

impl Runner {
    pub fn new(
        hospital: Arc<Hospital>,
        rate: Arc<RateController>,
        sleep_for: Duration,
        max_pathways: i64,
    ) -> Self {
        Self {
            hospital,
            rate,
            sleep_for,
            max_pathways,
            token: CancellationToken::new(),
        }
    }

    /// The token that stops every loop. Cancel it to shut the runner down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs until cancellation, a loop failure, or (for bounded runs) until
    /// all pathways, events, and messages have drained.
    pub async fn run(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind control plane listener on {addr}"))?;
        info!(%addr, "control plane listening");
        let app = router(AppState::new(
            Arc::clone(&self.hospital),
            Arc::clone(&self.rate),
        ));

        let (creating_tx, creating_rx) = watch::channel(true);
        let (events_tx, events_rx) = watch::channel(true);

        let mut loops: JoinSet<anyhow::Result<()>> = JoinSet::new();
        loops.spawn({
            let token = self.token.clone();
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(token.cancelled_owned())
                    .await
                    .context("control plane server failed")
            }
        });
        loops.spawn(start_pathways(
            Arc::clone(&self.hospital),
            Arc::clone(&self.rate),
            self.max_pathways,
            self.token.clone(),
            creating_tx,
        ));
        loops.spawn(run_events(
            Arc::clone(&self.hospital),
            self.sleep_for,
            self.token.clone(),
            creating_rx,
            events_tx,
        ));
        loops.spawn({
            let hospital = Arc::clone(&self.hospital);
            let sleep_for = self.sleep_for;
            let token = self.token.clone();
            async move {
                let outcome = process_messages(hospital, sleep_for, token.clone(), events_rx).await;
                // Either the bounded run has drained or something failed; in
                // both cases the remaining loops are done for.
                token.cancel();
                outcome
            }
        });

        let mut outcome = Ok(());
        while let Some(joined) = loops.join_next().await {
            let result = joined.unwrap_or_else(|err| Err(err.into()));
            if let Err(err) = result {
                self.token.cancel();
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }

        if let Err(err) = self.hospital.close() {
            error!(error = %err, "cannot close the hospital cleanly");
        }
        info!("simulator stopped");
        outcome
    }
}

/// Creates pathways at the controlled rate. A rate change mid-wait is
/// honored immediately: the time already waited counts against the new
/// heartbeat, so raising the rate shortens the current wait proportionally.
async fn start_pathways(
    hospital: Arc<Hospital>,
    rate: Arc<RateController>,
    max_pathways: i64,
    token: CancellationToken,
    creating: watch::Sender<bool>,
) -> anyhow::Result<()> {
    let mut rate_rx = rate.subscribe();
    let mut elapsed = rate.initial_elapsed();
    let mut created: i64 = 0;
    if max_pathways >= 0 {
        info!(max_pathways, "bounded run");
    }

    while max_pathways < 0 || created < max_pathways {
        let heartbeat = rate.heartbeat();
        let started = tokio::time::Instant::now();
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            changed = rate_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                // Credit the wait so far against the new heartbeat.
                elapsed += started.elapsed();
            }
            _ = tokio::time::sleep(heartbeat.saturating_sub(elapsed)), if heartbeat != Duration::MAX => {
                elapsed = Duration::ZERO;
                created += 1;
                // Failures are logged and counted by the hospital; the loop
                // keeps creating.
                let _ = hospital.start_next_pathway();
            }
        }
    }

    let _ = creating.send(false);
    info!(created, "pathway generation finished");
    Ok(())
}

/// Polls for due events. Runs forever, unless `creating` reports that
/// pathway generation has finished and the event queue is empty.
async fn run_events(
    hospital: Arc<Hospital>,
    sleep_for: Duration,
    token: CancellationToken,
    creating: watch::Receiver<bool>,
    processing: watch::Sender<bool>,
) -> anyhow::Result<()> {
    let queue = Arc::clone(&hospital);
    let done = process_items(
        &token,
        sleep_for,
        creating,
        move || queue.run_next_event_if_due(),
        move || hospital.has_events(),
        "event",
    )
    .await;
    let _ = processing.send(false);
    if done.is_ok() {
        info!("event processing finished");
    }
    done
}

/// Polls for due messages. Symmetric to [`run_events`], downstream of it in
/// the drain chain.
async fn process_messages(
    hospital: Arc<Hospital>,
    sleep_for: Duration,
    token: CancellationToken,
    creating: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let queue = Arc::clone(&hospital);
    let done = process_items(
        &token,
        sleep_for,
        creating,
        move || queue.process_next_message_if_due(),
        move || hospital.has_messages(),
        "message",
    )
    .await;
    if done.is_ok() {
        info!("message processing finished");
    }
    done
}

/// The shared polling shape of the event and message loops: wake every
/// `sleep_for`, handle everything that is due, and keep going while items
/// exist or can still be created upstream.
async fn process_items(
    token: &CancellationToken,
    sleep_for: Duration,
    mut creating: watch::Receiver<bool>,
    step: impl Fn() -> Result<bool>,
    has_items: impl Fn() -> bool,
    what: &'static str,
) -> anyhow::Result<()> {
    let mut still_creating = *creating.borrow_and_update();
    while still_creating || has_items() {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(sleep_for) => {
                loop {
                    match step() {
                        Ok(true) => continue,
                        Ok(false) => break,
                        Err(err) => {
                            // Processing failures never stop the loop; the
                            // failed item has already left its queue.
                            error!(error = %err, "failed to process the due {}", what);
                            break;
                        }
                    }
                }
            }
        }
        still_creating = *creating.borrow_and_update();
    }
    Ok(())
}
