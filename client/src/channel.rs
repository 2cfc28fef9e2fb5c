//! Request/response channel over the engine's stdio.
//!
//! The engine's protocol carries no correlation id: a reply is simply "the
//! next line on stdout". [`RequestChannel::send`] writes one envelope line
//! and races that next line against a timeout, the liveness flag flipping,
//! and an optional cancellation signal. Exactly one branch settles the
//! exchange; the losing branches are dropped with the `select!`, so no
//! listener or timer survives a finished exchange.
//!
//! Because the line source is shared, two `send` calls in flight at once may
//! receive each other's replies when the engine answers out of order. That
//! is a property of the upstream protocol, preserved deliberately; callers
//! wanting stronger pairing must serialize their own sends.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use scribe_types::{AutocompleteRequest, AutocompleteResponse, EngineRequest, EngineStatus};

use crate::error::{Error, Result};
use crate::protocol::Envelope;
use crate::supervisor::{Shared, Supervisor};

/// One-exchange-at-a-time request channel to the supervised engine.
///
/// Cloning is cheap; clones share the same reply queue.
#[derive(Clone)]
pub struct RequestChannel {
    shared: Arc<Shared>,
    default_timeout: Duration,
}

impl RequestChannel {
    #[must_use]
    pub fn new(supervisor: &Supervisor, default_timeout: Duration) -> Self {
        Self {
            shared: Arc::clone(supervisor.shared()),
            default_timeout,
        }
    }

    /// Send one raw request and await the engine's reply.
    ///
    /// Fails fast with [`Error::ProcessDead`] when the process is not alive
    /// (including the gap while a restart is pending) — nothing is written
    /// in that case. Once the request line is on its way to stdin it is not
    /// retracted by timeout or cancellation: delivery is at-most-once, with
    /// no undo.
    pub async fn send(
        &self,
        request: &serde_json::Value,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<serde_json::Value> {
        let status = self.shared.status();

        if !self.shared.is_alive() {
            status.set(EngineStatus::ProcessDead, "engine process is currently dead");
            return Err(Error::ProcessDead);
        }

        let version = self.shared.version();
        let line = serde_json::to_string(&Envelope {
            version: version.as_deref(),
            request,
        })
        .map_err(Error::Encode)?;

        // Drop any reply left over from a timed-out earlier exchange so it
        // cannot resolve this one. Skipped while another exchange holds the
        // queue — that exchange consumes the lines itself.
        if let Ok(mut rx) = self.shared.lines.try_lock() {
            while rx.try_recv().is_ok() {}
        }

        let writer = self.shared.writer().ok_or(Error::ProcessDead)?;
        if writer.send(line).await.is_err() {
            return Err(Error::ProcessDead);
        }

        let mut alive_rx = self.shared.alive_rx();
        if !*alive_rx.borrow_and_update() {
            return Err(Error::ProcessDead);
        }

        let timeout = timeout.unwrap_or(self.default_timeout);

        tokio::select! {
            reply = self.next_line() => match reply {
                Some(text) => match serde_json::from_str(&text) {
                    Ok(value) => {
                        status.set_state(EngineStatus::ParsingSuccess);
                        Ok(value)
                    }
                    Err(e) => {
                        status.set(
                            EngineStatus::ParsingError,
                            "error while parsing response from engine",
                        );
                        Err(Error::ResponseParse(e))
                    }
                },
                // The reply queue only closes if the supervisor is gone.
                None => Err(Error::ProcessExited),
            },
            () = tokio::time::sleep(timeout) => {
                status.set(EngineStatus::TimedOut, "request to engine timed out");
                Err(Error::TimedOut)
            }
            _ = alive_rx.wait_for(|alive| !alive) => {
                status.set(EngineStatus::ProcessExited, "engine process exited");
                Err(Error::ProcessExited)
            }
            () = cancelled(cancel) => Err(Error::Cancelled),
        }
    }

    /// Typed autocomplete request on top of [`RequestChannel::send`]. A
    /// reply that does not match the autocomplete shape is a
    /// [`Error::ResponseParse`].
    pub async fn autocomplete(
        &self,
        request: AutocompleteRequest,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<AutocompleteResponse> {
        let body =
            serde_json::to_value(EngineRequest::Autocomplete(request)).map_err(Error::Encode)?;
        let raw = self.send(&body, timeout, cancel).await?;
        serde_json::from_value(raw).map_err(Error::ResponseParse)
    }

    async fn next_line(&self) -> Option<String> {
        let mut rx = self.shared.lines.lock().await;
        rx.recv().await
    }
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
