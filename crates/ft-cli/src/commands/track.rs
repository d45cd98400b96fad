//! Track command: turns bridge messages on stdin into session reports.

use std::future::Future;
use std::io;

use anyhow::Result;
use ft_core::driver;
use ft_core::{Clock, HostMessage, ReportSink, SystemClock, TabMirror, Tracker, TrackingMode};
use ft_report::{Client, HttpSink};
use tokio::io::AsyncRead;

use crate::bridge::{Framing, MessageReader};

/// Settings for a tracking run, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct TrackOptions {
    pub endpoint: String,
    pub mode: TrackingMode,
    pub framing: Framing,
}

/// What a finished tracking run saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackStats {
    /// Messages read from the bridge, including the initial snapshot.
    pub messages: u64,
    /// Tabs still open in the mirror when input stopped.
    pub open_tabs: usize,
}

/// Tracks until stdin closes or Ctrl-C, then waits for pending deliveries.
pub async fn run(options: TrackOptions) -> Result<()> {
    let client = Client::new(&options.endpoint)?;
    tracing::info!(
        endpoint = %client.endpoint(),
        mode = %options.mode,
        "tracking tab focus"
    );

    let sink = HttpSink::new(client);
    let stats = track(
        tokio::io::stdin(),
        options.framing,
        options.mode,
        sink.clone(),
        SystemClock,
        super::shutdown_signal(),
    )
    .await?;

    let delivered = sink.drain().await;
    tracing::info!(
        messages = stats.messages,
        open_tabs = stats.open_tabs,
        delivered,
        "tracker stopped"
    );
    Ok(())
}

/// Feeds bridge messages from `input` through a tracker until the input ends
/// or `shutdown` resolves.
///
/// A leading snapshot seeds the mirror before the tracker initializes, so
/// the tab focused at startup gets a session. The open session is reported
/// when input stops. A read error stops tracking and is returned once the
/// final session has been reported.
pub async fn track<R, S, C, F>(
    input: R,
    framing: Framing,
    mode: TrackingMode,
    sink: S,
    clock: C,
    shutdown: F,
) -> io::Result<TrackStats>
where
    R: AsyncRead + Unpin,
    S: ReportSink,
    C: Clock,
    F: Future<Output = ()>,
{
    let mut reader = MessageReader::new(input, framing);
    let mirror = TabMirror::new();
    let (tx, rx) = driver::channel::<HostMessage>();
    tokio::pin!(shutdown);

    let mut messages = 0_u64;
    let mut stopped = false;
    let mut read_error = None;

    let first = tokio::select! {
        result = reader.next_message() => result,
        () = &mut shutdown => {
            stopped = true;
            Ok(None)
        }
    };
    match first {
        Ok(Some(message)) => {
            messages += 1;
            if matches!(message, HostMessage::Snapshot { .. }) {
                mirror.apply(message);
            } else {
                // The receiver is alive until `driver::run` returns.
                let _ = tx.send(message);
            }
        }
        Ok(None) => stopped = true,
        Err(err) => {
            tracing::error!(error = %err, "failed to read bridge input");
            stopped = true;
            read_error = Some(err);
        }
    }

    let tracker = Tracker::new(mirror, sink, clock, mode);

    let forward = async move {
        if stopped {
            return (messages, read_error);
        }
        loop {
            let next = tokio::select! {
                result = reader.next_message() => result,
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            };
            match next {
                Ok(Some(message)) => {
                    messages += 1;
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("bridge input closed");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to read bridge input");
                    read_error = Some(err);
                    break;
                }
            }
        }
        drop(tx);
        (messages, read_error)
    };

    let ((messages, read_error), tracker) = tokio::join!(forward, driver::run(tracker, rx));

    match read_error {
        Some(err) => Err(err),
        None => Ok(TrackStats {
            messages,
            open_tabs: tracker.browser().len(),
        }),
    }
}
