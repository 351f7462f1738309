//! Relay client connection and reconnect loop

use std::ops::ControlFlow;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::ws::protocol::{ClientMsg, PlayerUpdate, ServerMsg};

use super::roster::Roster;

/// Pause between a lost connection and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One live connection to the relay
pub struct RelayClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    roster: Roster,
}

impl RelayClient {
    /// Open a connection; the server's `init` arrives as the first event
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self {
            stream,
            roster: Roster::new(),
        })
    }

    /// Report this client's car state
    pub async fn send_update(&mut self, update: PlayerUpdate) -> Result<(), ClientError> {
        let json = serde_json::to_string(&ClientMsg::Update(update))?;
        self.stream.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Wait for the next server message and fold it into the roster.
    /// `None` once the server has closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerMsg>, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => match serde_json::from_str::<ServerMsg>(&text) {
                    Ok(msg) => {
                        self.roster.apply(&msg);
                        return Ok(Some(msg));
                    }
                    Err(e) => warn!(error = %e, "Ignoring unreadable server message"),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Stay connected to `url`, reconnecting `delay` after every loss.
///
/// Each reconnect gets a fresh identity from the server. Returns once
/// `on_event` breaks.
pub async fn run_with_reconnect<F>(url: &str, delay: Duration, mut on_event: F)
where
    F: FnMut(&Roster, &ServerMsg) -> ControlFlow<()>,
{
    loop {
        match RelayClient::connect(url).await {
            Ok(mut client) => {
                info!(url, "Connected to relay");
                loop {
                    match client.next_event().await {
                        Ok(Some(msg)) => {
                            if on_event(client.roster(), &msg).is_break() {
                                if let Err(e) = client.close().await {
                                    debug!(error = %e, "Close after stop failed");
                                }
                                return;
                            }
                        }
                        Ok(None) => {
                            info!(url, "Disconnected from relay");
                            break;
                        }
                        Err(e) => {
                            warn!(url, error = %e, "Relay connection error");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!(url, error = %e, "Failed to connect to relay"),
        }

        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{PlayerId, PlayerRecord};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn init_for(id: &str) -> String {
        serde_json::to_string(&ServerMsg::Init {
            player: PlayerRecord::new(PlayerId::from(id), "#ff00ff".to_string()),
            players: vec![],
        })
        .unwrap()
    }

    /// Serves one `init` per connection, then hangs up
    async fn flaky_server(listener: TcpListener) {
        let mut served = 0;
        while let Ok((tcp, _)) = listener.accept().await {
            served += 1;
            let Ok(mut ws) = accept_async(tcp).await else {
                continue;
            };
            let _ = ws.send(Message::Text(init_for(&format!("p{served}")))).await;
            let _ = ws.close(None).await;
        }
    }

    #[tokio::test]
    async fn reconnects_and_gets_new_identity() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        tokio::spawn(flaky_server(listener));

        let mut identities = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(10),
            run_with_reconnect(&url, Duration::from_millis(20), |roster, msg| {
                if matches!(msg, ServerMsg::Init { .. }) {
                    identities.push(roster.own_id().cloned().unwrap());
                }
                if identities.len() == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            identities,
            vec![PlayerId::from("p1"), PlayerId::from("p2"), PlayerId::from("p3")]
        );
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RelayClient::connect(&format!("ws://{addr}")).await;
        assert!(matches!(result, Err(ClientError::WebSocket(_))));
    }
}
