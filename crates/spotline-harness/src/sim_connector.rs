//! Scripted connection seam.

use std::collections::VecDeque;
use std::future::{ready, Future};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use spotline_proto::{ClientFrame, ServerFrame};
use spotline_session::{ConnectError, Connection, Connector};
use tokio::sync::mpsc;

/// Outcome of one scripted connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectScript {
    /// The attempt succeeds and a [`LinkProbe`] becomes claimable.
    Accept,
    /// The attempt fails before a stream opens.
    Refuse,
}

/// Test-side half of one accepted connection.
///
/// The probe plays the server: push frames at the session, read what the
/// session published. Dropping the probe severs the link, so the session
/// sees its inbound stream end and treats it as a connection drop.
#[derive(Debug)]
pub struct LinkProbe {
    to_client: mpsc::Sender<ServerFrame>,
    from_client: mpsc::Receiver<ClientFrame>,
}

impl LinkProbe {
    /// Delivers one frame to the session. Returns `false` once the session
    /// has closed its end.
    pub async fn push(&self, frame: ServerFrame) -> bool {
        self.to_client.send(frame).await.is_ok()
    }

    /// Waits for the next frame the session sent. `None` means the session
    /// closed the link.
    pub async fn next_sent(&mut self) -> Option<ClientFrame> {
        self.from_client.recv().await
    }

    /// Everything the session has sent so far, without waiting.
    pub fn drain_sent(&mut self) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    script: VecDeque<ConnectScript>,
    links: VecDeque<LinkProbe>,
    attempts: u32,
}

/// Connector following a script of attempt outcomes.
///
/// Each `connect` call consumes the next [`ConnectScript`] entry; an empty
/// script accepts. Accepted links surface as [`LinkProbe`]s claimable via
/// [`SimConnector::take_link`].
#[derive(Debug, Clone, Default)]
pub struct SimConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl SimConnector {
    /// Connector that accepts every attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for upcoming attempts.
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectScript>) {
        self.state().script.extend(outcomes);
    }

    /// Queues `count` refusals before the script falls back to accepting.
    pub fn refuse_next(&self, count: usize) {
        self.script(std::iter::repeat_n(ConnectScript::Refuse, count));
    }

    /// Connection attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.state().attempts
    }

    /// Claims the oldest accepted link not yet taken.
    #[must_use]
    pub fn take_link(&self) -> Option<LinkProbe> {
        self.state().links.pop_front()
    }

    /// Waits until an accepted link can be claimed.
    pub async fn wait_link(&self) -> LinkProbe {
        loop {
            if let Some(link) = self.take_link() {
                return link;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn state(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for SimConnector {
    fn connect(
        &self,
        _base_url: &str,
    ) -> impl Future<Output = Result<Connection, ConnectError>> + Send {
        let result = {
            let mut state = self.state();
            state.attempts += 1;
            match state.script.pop_front().unwrap_or(ConnectScript::Accept) {
                ConnectScript::Refuse => {
                    tracing::debug!(attempt = state.attempts, "refusing scripted connect");
                    Err(ConnectError::Connect {
                        reason: "scripted refusal".to_string(),
                    })
                }
                ConnectScript::Accept => {
                    tracing::debug!(attempt = state.attempts, "accepting scripted connect");
                    let (to_server, from_client) = mpsc::channel(32);
                    let (to_client, from_server) = mpsc::channel(32);
                    state.links.push_back(LinkProbe {
                        to_client,
                        from_client,
                    });
                    Ok(Connection::new(to_server, from_server, None))
                }
            }
        };
        ready(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_script_accepts() {
        let connector = SimConnector::new();
        let conn = connector.connect("http://sim").await.unwrap();
        assert_eq!(connector.attempts(), 1);

        let mut link = connector.wait_link().await;
        conn.to_server
            .send(ClientFrame::Subscribe {
                destination: "/topic/chat/message/1".to_string(),
            })
            .await
            .unwrap();
        assert!(link.next_sent().await.is_some());
    }

    #[tokio::test]
    async fn scripted_refusals_come_first() {
        let connector = SimConnector::new();
        connector.refuse_next(2);

        assert!(connector.connect("http://sim").await.is_err());
        assert!(connector.connect("http://sim").await.is_err());
        assert!(connector.connect("http://sim").await.is_ok());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn dropping_the_probe_severs_the_link() {
        let connector = SimConnector::new();
        let mut conn = connector.connect("http://sim").await.unwrap();
        let link = connector.wait_link().await;
        drop(link);

        assert!(conn.from_server.recv().await.is_none());
    }
}
