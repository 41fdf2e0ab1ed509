//! Actor front door for the host
//!
//! Async callers do not touch the host directly. They send jobs to one Tokio
//! task that owns an `Arc<Host>` and runs them one at a time, so top-level
//! transactions are applied in the order they were accepted.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               HostHandle (Clone)                      │
//! │         Sends jobs to actor mailbox                   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               HostActor (Single Task)                 │
//! │      job(&Host) → Host::invoke → commit/rollback      │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{host::Host, Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

type Job = Box<dyn FnOnce(&Host) + Send>;

/// Message sent to the host actor
pub enum HostMessage {
    /// Run a job against the host
    Run(Job),

    /// Shutdown actor
    Shutdown,
}

/// Actor that runs host jobs in acceptance order
pub struct HostActor {
    host: Arc<Host>,
    mailbox: mpsc::Receiver<HostMessage>,
}

impl HostActor {
    /// Create new actor
    pub fn new(host: Arc<Host>, mailbox: mpsc::Receiver<HostMessage>) -> Self {
        Self { host, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                HostMessage::Run(job) => job(&self.host),
                HostMessage::Shutdown => {
                    tracing::info!("host actor shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle for sending jobs to the host actor
#[derive(Clone, Debug)]
pub struct HostHandle {
    sender: mpsc::Sender<HostMessage>,
}

impl HostHandle {
    /// Run `job` on the actor and wait for its result
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Host) -> T + Send + 'static,
    {
        let (response, rx) = oneshot::channel();

        let job: Job = Box::new(move |host| {
            let _ = response.send(job(host));
        });

        self.sender
            .send(HostMessage::Run(job))
            .await
            .map_err(|_| Error::Concurrency("host actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("host actor dropped response".to_string()))
    }

    /// Stop the actor after already-queued jobs
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(HostMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("host actor mailbox closed".to_string()))
    }
}

/// Spawn the host actor on the current Tokio runtime
pub fn spawn_host_actor(host: Arc<Host>) -> HostHandle {
    let (sender, mailbox) = mpsc::channel(host.config().mailbox_size.max(1));
    let actor = HostActor::new(host, mailbox);
    tokio::spawn(actor.run());
    HostHandle { sender }
}
