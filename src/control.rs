//! Local HTTP control bridge.
//!
//! Lets scripts and the browser trigger actions on the running window:
//! `POST /action` queues a dispatch, `GET /actions` lists what the catalog
//! and direct controls know, `GET /events` streams dispatch outcomes as SSE.
//! Binds to loopback only.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::catalog::Catalog;
use crate::dispatcher::{DispatchEvent, HostCommand};

/// Ports tried after the preferred one is taken.
const PORT_ATTEMPTS: u16 = 10;

#[derive(Clone)]
pub struct BridgeState {
    pub commands: mpsc::UnboundedSender<HostCommand>,
    pub events: broadcast::Sender<DispatchEvent>,
    pub catalog: Arc<Catalog>,
}

#[derive(Deserialize)]
struct ActionPayload {
    action: String,
}

#[derive(Serialize)]
struct Queued {
    queued: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ActionListing {
    pub profile: String,
    pub direct: Vec<&'static str>,
    pub catalog: Vec<&'static str>,
}

pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/action", post(action_handler))
        .route("/actions", get(actions_handler))
        .route("/events", get(sse_handler))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(state)
}

/// `preferred` and the ports after it, stopping at the top of the range.
fn candidate_ports(preferred: u16) -> impl Iterator<Item = u16> {
    (0..PORT_ATTEMPTS).filter_map(move |i| preferred.checked_add(i))
}

/// Bind `preferred`, falling back to the next few ports.
pub async fn bind(preferred: u16) -> std::io::Result<(TcpListener, u16)> {
    let mut last_err = None;
    for port in candidate_ports(preferred) {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) => {
                debug!(target: "control", port, %err, "port unavailable");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrInUse, "no port to try")
    }))
}

pub async fn serve(listener: TcpListener, state: Arc<BridgeState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(target: "control", "control bridge listening on http://{addr}");
    }
    axum::serve(listener, router(state)).await
}

async fn index_handler(State(state): State<Arc<BridgeState>>) -> Html<String> {
    let buttons: String = Action::ALL
        .iter()
        .filter(|a| a.is_direct_control() || state.catalog.entry_for(**a).is_some())
        .map(|a| format!("<button onclick=\"send('{0}')\">{0}</button>\n", a.name()))
        .collect();
    Html(INDEX_HTML.replace("{{BUTTONS}}", &buttons))
}

async fn action_handler(
    State(state): State<Arc<BridgeState>>,
    Json(payload): Json<ActionPayload>,
) -> (StatusCode, Json<Queued>) {
    debug!(target: "control", action = %payload.action, "POST /action");
    let queued = Queued {
        queued: payload.action.clone(),
    };
    match state
        .commands
        .send(HostCommand::DispatchNamed(payload.action))
    {
        Ok(()) => (StatusCode::ACCEPTED, Json(queued)),
        Err(_) => {
            warn!(target: "control", "dispatcher is gone, dropping action");
            (StatusCode::SERVICE_UNAVAILABLE, Json(queued))
        }
    }
}

async fn actions_handler(State(state): State<Arc<BridgeState>>) -> Json<ActionListing> {
    Json(ActionListing {
        profile: state.catalog.profile().to_string(),
        direct: Action::ALL
            .iter()
            .filter(|a| a.is_direct_control())
            .map(|a| a.name())
            .collect(),
        catalog: state.catalog.actions().map(|a| a.name()).collect(),
    })
}

async fn sse_handler(
    State(state): State<Arc<BridgeState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok::<_, Infallible>(
                Event::default().event(event.kind()).data(data),
            ))
        }
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Docmost shell control</title>
<style>
  body { background: #0a0a0f; color: #e0e0e0; font-family: system-ui, sans-serif; margin: 24px; }
  h1 { font-size: 18px; }
  #actions { display: flex; flex-wrap: wrap; gap: 6px; margin-bottom: 16px; }
  button { background: #1a1a2e; color: #fff; border: 1px solid #333; border-radius: 6px; padding: 6px 10px; cursor: pointer; }
  button:hover { border-color: #6366f1; }
  #log { font-family: monospace; font-size: 13px; white-space: pre-wrap; }
</style>
</head>
<body>
  <h1>Docmost shell</h1>
  <div id="actions">
{{BUTTONS}}  </div>
  <div id="log"></div>
<script>
  const log = document.getElementById('log');
  function line(text) {
    log.textContent = text + '\n' + log.textContent;
  }
  async function send(action) {
    await fetch('/action', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({action}),
    });
  }
  const es = new EventSource('/events');
  es.onmessage = e => line(e.data);
  for (const kind of ['direct', 'probeSent', 'unknown', 'notInCatalog', 'noSurface', 'surfaceFailed', 'surfaceReplaced']) {
    es.addEventListener(kind, e => line(kind + ' ' + e.data));
  }
</script>
</body>
</html>
"##;
