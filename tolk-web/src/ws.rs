//! WebSocket bridge to a client's translator session
//!
//! Incoming text frames are JSON `Command`s. Every view change is pushed back
//! as a JSON `TranslatorView`, starting with the current one.

use crate::routes::Authed;
use crate::state::Client;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::json;
use std::sync::Arc;
use tolk_mt::{Command, TranslatorView};
use tracing::{debug, warn};

pub async fn translator_ws(ws: WebSocketUpgrade, authed: Authed) -> Response {
    let client = authed.client;
    ws.on_upgrade(move |socket| drive(socket, client))
}

async fn send_view(socket: &mut WebSocket, view: &TranslatorView) -> Result<(), axum::Error> {
    let text = serde_json::to_string(view).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

async fn drive(mut socket: WebSocket, client: Arc<Client>) {
    let mut view = client.translator.subscribe();
    let initial = view.borrow_and_update().clone();
    if send_view(&mut socket, &initial).await.is_err() {
        return;
    }
    debug!("translator socket connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    client.touch();
                    match serde_json::from_str::<Command>(text.as_str()) {
                        Ok(command) => {
                            if client.translator.send(command).is_err() {
                                warn!("translator session stopped");
                                break;
                            }
                        }
                        Err(e) => {
                            let reply = json!({ "error": format!("invalid command: {}", e) });
                            if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "socket error");
                    break;
                }
            },
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                if send_view(&mut socket, &snapshot).await.is_err() {
                    break;
                }
            }
        }
    }
    client.touch();
    debug!("translator socket closed");
}
