//! Client connection state machine.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::{ClientError, ConnectionState};
use crate::config::ReconnectConfig;
use crate::lifecycle::Shutdown;
use crate::protocol::{ClientMessage, LoadStatusSlice, ServerMessage, UsageRecord};
use crate::replica::ReplicaInfo;
use crate::resilience::ReconnectBackoff;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long the graceful close handshake may take before the session is
/// forcibly aborted during shutdown.
const GRACEFUL_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline on the whole attach handshake (connect + ack), so a half-open
/// endpoint cannot wedge the reconnect loop.
const ATTACH_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for one subscriber.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Broker endpoint, e.g. `ws://olap-broker:9400/subscribe`.
    pub endpoint: String,
    pub user_id: String,
    pub workstation: String,
    pub application: String,
    pub reconnect: ReconnectConfig,
}

struct Session {
    writer: AsyncMutex<WsSink>,
    reader_task: JoinHandle<()>,
}

struct Inner {
    options: ClientOptions,
    state: Mutex<ConnectionState>,
    backoff: Mutex<ReconnectBackoff>,
    session: AsyncMutex<Option<Session>>,
    pending: Mutex<VecDeque<oneshot::Sender<ServerMessage>>>,
    last_view: Mutex<Vec<ReplicaInfo>>,
    disposing: Shutdown,
    on_update: Box<dyn Fn(Vec<ReplicaInfo>) + Send + Sync>,
    on_status: Box<dyn Fn(bool) + Send + Sync>,
}

/// Duplex connection to the broker with self-healing reconnect.
///
/// Cheap to clone; all clones share one session and one state machine.
#[derive(Clone)]
pub struct ClientConnection {
    inner: Arc<Inner>,
}

impl ClientConnection {
    /// Create a detached connection. `on_update` receives every pushed (and
    /// seeded) view; `on_status` receives connect/disconnect transitions.
    pub fn new(
        options: ClientOptions,
        on_update: impl Fn(Vec<ReplicaInfo>) + Send + Sync + 'static,
        on_status: impl Fn(bool) + Send + Sync + 'static,
    ) -> Self {
        let backoff = ReconnectBackoff::new(
            Duration::from_millis(options.reconnect.base_delay_ms),
            Duration::from_millis(options.reconnect.max_delay_ms),
        );
        Self {
            inner: Arc::new(Inner {
                options,
                state: Mutex::new(ConnectionState::Disconnected),
                backoff: Mutex::new(backoff),
                session: AsyncMutex::new(None),
                pending: Mutex::new(VecDeque::new()),
                last_view: Mutex::new(Vec::new()),
                disposing: Shutdown::new(),
                on_update: Box::new(on_update),
                on_status: Box::new(on_status),
            }),
        }
    }

    /// Establish the session, register with the broker and seed the local
    /// view. Transport faults after a successful attach are healed by the
    /// internal reconnect loop; a failed initial attach is returned to the
    /// caller.
    pub async fn attach(&self) -> Result<(), ClientError> {
        self.inner.attach().await
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Most recently received view (seeded or pushed). Empty before the
    /// first delivery.
    pub fn last_view(&self) -> Vec<ReplicaInfo> {
        self.inner.last_view.lock().unwrap().clone()
    }

    /// Pull the next load-balanced view; consumes the broker's rotation
    /// cursor.
    pub async fn get_available_cube_status(&self) -> Result<Vec<ReplicaInfo>, ClientError> {
        match self.inner.request(&ClientMessage::GetAvailableCubeStatus).await? {
            ServerMessage::CubeStatus { view } => Ok(view),
            other => Err(unexpected_reply(other)),
        }
    }

    /// Pull the single recommended replica, or `None` when the current
    /// snapshot has no readers.
    pub async fn get_active_replica(&self) -> Result<Option<ReplicaInfo>, ClientError> {
        match self.inner.request(&ClientMessage::GetActiveReplica).await? {
            ServerMessage::ActiveReplica { replica } => Ok(replica),
            other => Err(unexpected_reply(other)),
        }
    }

    /// Pass-through load-status query, parameterized by date.
    pub async fn get_load_status(
        &self,
        slice: LoadStatusSlice,
        date: NaiveDate,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let message = ClientMessage::GetLoadStatus { slice, date };
        match self.inner.request(&message).await? {
            ServerMessage::LoadStatus { rows } => Ok(rows),
            other => Err(unexpected_reply(other)),
        }
    }

    /// Forward a usage record. Fire-and-forget; no reply frame exists.
    pub async fn send_usage_record(&self, record: UsageRecord) -> Result<(), ClientError> {
        self.inner
            .send(&ClientMessage::SendUsageRecord { record })
            .await
    }

    /// Stop the connection for good: suppress reconnects, end any backoff
    /// sleep, then close gracefully with a forced abort fallback. Safe to
    /// call more than once.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await;
    }
}

impl Inner {
    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().unwrap() = next;
    }

    fn apply_update(&self, view: Vec<ReplicaInfo>) {
        *self.last_view.lock().unwrap() = view.clone();
        (self.on_update)(view);
    }

    async fn attach(self: &Arc<Self>) -> Result<(), ClientError> {
        if self.disposing.is_triggered() {
            return Err(ClientError::NotConnected);
        }
        if self.state() == ConnectionState::Connected {
            tracing::warn!("Attach while already connected ignored");
            return Ok(());
        }

        if let Err(e) = self.establish().await {
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        self.set_state(ConnectionState::Connected);
        self.backoff.lock().unwrap().reset();
        (self.on_status)(true);

        // Seed the local view right away so a fresh subscriber never waits
        // for the next push.
        match self.get_seed_view().await {
            Ok(view) if !view.is_empty() => self.apply_update(view),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Initial status pull failed"),
        }
        Ok(())
    }

    async fn get_seed_view(self: &Arc<Self>) -> Result<Vec<ReplicaInfo>, ClientError> {
        match self.request(&ClientMessage::GetAvailableCubeStatus).await? {
            ServerMessage::CubeStatus { view } => Ok(view),
            other => Err(unexpected_reply(other)),
        }
    }

    async fn establish(self: &Arc<Self>) -> Result<(), ClientError> {
        self.set_state(ConnectionState::Connecting);

        let endpoint = Url::parse(&self.options.endpoint)?;

        let handshake = async {
            let (stream, _response) = connect_async(endpoint.as_str()).await?;
            let (mut writer, mut reader) = stream.split();

            let hello = ClientMessage::Attach {
                user_id: self.options.user_id.clone(),
                workstation: self.options.workstation.clone(),
                application: self.options.application.clone(),
            };
            writer.send(Message::Text(encode(&hello)?.into())).await?;

            let ack = loop {
                match reader.next().await {
                    Some(Ok(Message::Text(text))) => {
                        break serde_json::from_str::<ServerMessage>(text.as_str())
                            .map_err(|e| ClientError::Protocol(e.to_string()))?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(ClientError::Protocol(
                            "session closed during attach".to_string(),
                        ));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                }
            };
            Ok((writer, reader, ack))
        };
        let (writer, reader, ack) = tokio::time::timeout(ATTACH_TIMEOUT, handshake)
            .await
            .map_err(|_| ClientError::Timeout)??;
        let session_id = match ack {
            ServerMessage::Attached { session_id } => session_id,
            ServerMessage::Error { message, .. } => return Err(ClientError::Rejected(message)),
            other => {
                return Err(ClientError::Protocol(format!(
                    "unexpected attach reply: {other:?}"
                )))
            }
        };
        tracing::info!(
            session_id = %session_id,
            user_id = %self.options.user_id,
            workstation = %self.options.workstation,
            "Attached to broker"
        );

        let reader_task = tokio::spawn({
            let inner = self.clone();
            async move { inner.read_loop(reader).await }
        });

        *self.session.lock().await = Some(Session {
            writer: AsyncMutex::new(writer),
            reader_task,
        });
        Ok(())
    }

    /// Forward frames from the broker until the session ends. Runs as its
    /// own task; a transport fault hands control to the reconnect loop.
    async fn read_loop(self: Arc<Self>, mut reader: WsSource) {
        let faulted = loop {
            tokio::select! {
                _ = self.disposing.wait() => break false,
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(text.as_str()) {
                            Ok(ServerMessage::Update { view }) => {
                                // Accepted but discarded once shutdown begins.
                                if self.disposing.is_triggered() {
                                    continue;
                                }
                                self.apply_update(view);
                            }
                            Ok(reply) => {
                                let waiter = self.pending.lock().unwrap().pop_front();
                                match waiter {
                                    Some(tx) => {
                                        let _ = tx.send(reply);
                                    }
                                    None => tracing::warn!("Unsolicited reply discarded"),
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Discarding malformed frame")
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Duplex session failed");
                        break true;
                    }
                }
            }
        };

        if faulted {
            self.handle_fault().await;
        } else {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// The sole retry path: backoff, then re-attach end-to-end, until
    /// success or shutdown. The backoff sleep is cancellable at any point
    /// by the shutdown signal.
    // Boxed to break the auto-trait recursion in the reconnect cycle
    // (read_loop -> handle_fault -> attach -> establish -> spawn(read_loop)):
    // the explicit `+ Send` return type gives the compiler a concrete Send
    // future at the recursion boundary instead of an opaque self-referential
    // one. Behavior is identical to a plain `async fn`.
    fn handle_fault<'a>(self: &'a Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.fail_pending();
            if self.disposing.is_triggered() {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            self.set_state(ConnectionState::Faulted);
            (self.on_status)(false);
            self.drop_session(false).await;

            loop {
                let delay = self.backoff.lock().unwrap().next_delay();
                tracing::info!(delay_ms = delay.as_millis() as u64, "Reattach scheduled");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.disposing.wait() => {}
                }
                if self.disposing.is_triggered() {
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }

                match self.attach().await {
                    Ok(()) => return,
                    Err(e) => {
                        tracing::warn!(error = %e, "Reattach attempt failed");
                        self.set_state(ConnectionState::Faulted);
                    }
                }
            }
        })
    }

    /// Send a request frame and wait for its reply. Replies arrive in
    /// request order on the session, so waiters queue FIFO; registration
    /// and send happen under the writer lock to keep the two in step.
    async fn request(self: &Arc<Self>, message: &ClientMessage) -> Result<ServerMessage, ClientError> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let session = self.session.lock().await;
            let Some(session) = session.as_ref() else {
                return Err(ClientError::NotConnected);
            };
            let mut writer = session.writer.lock().await;
            self.pending.lock().unwrap().push_back(reply_tx);
            if let Err(e) = writer.send(Message::Text(encode(message)?.into())).await {
                let _ = self.pending.lock().unwrap().pop_back();
                return Err(e.into());
            }
        }

        match reply_rx.await {
            Ok(ServerMessage::Error { message, .. }) => Err(ClientError::Rejected(message)),
            Ok(reply) => Ok(reply),
            // The session died before the reply; the reconnect loop owns it.
            Err(_) => Err(ClientError::NotConnected),
        }
    }

    /// Send a frame without expecting a reply.
    async fn send(self: &Arc<Self>, message: &ClientMessage) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let session = self.session.lock().await;
        let Some(session) = session.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        let mut writer = session.writer.lock().await;
        writer.send(Message::Text(encode(message)?.into())).await?;
        Ok(())
    }

    async fn shutdown(self: &Arc<Self>) {
        self.disposing.trigger();

        let session = self.session.lock().await.take();
        if let Some(session) = session {
            let graceful = async {
                let mut writer = session.writer.lock().await;
                writer
                    .send(Message::Text(encode(&ClientMessage::Detach).ok()?.into()))
                    .await
                    .ok()?;
                writer.send(Message::Close(None)).await.ok()?;
                Some(())
            };
            let closed = tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, graceful).await;
            if closed.ok().flatten().is_none() {
                tracing::warn!("Graceful close failed, aborting session");
                session.reader_task.abort();
            }
        }

        self.fail_pending();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Drop the current session. The reader task is aborted only on the
    /// forced-shutdown path; on the fault path it is the caller and is
    /// already unwinding on its own.
    async fn drop_session(&self, abort_reader: bool) {
        if let Some(session) = self.session.lock().await.take() {
            if abort_reader {
                session.reader_task.abort();
            }
        }
    }

    /// Wake every in-flight pull with a dropped channel, which surfaces as
    /// `NotConnected` to the caller.
    fn fail_pending(&self) {
        self.pending.lock().unwrap().clear();
    }
}

fn encode(message: &ClientMessage) -> Result<String, ClientError> {
    serde_json::to_string(message).map_err(|e| ClientError::Protocol(e.to_string()))
}

fn unexpected_reply(reply: ServerMessage) -> ClientError {
    ClientError::Protocol(format!("unexpected reply: {reply:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ClientOptions {
        ClientOptions {
            endpoint: "ws://127.0.0.1:1/subscribe".to_string(),
            user_id: "u1".to_string(),
            workstation: "ws1".to_string(),
            application: "excel".to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }

    #[tokio::test]
    async fn pulls_are_rejected_while_disconnected() {
        let client = ClientConnection::new(options(), |_| {}, |_| {});
        assert_eq!(client.state(), ConnectionState::Disconnected);

        assert!(matches!(
            client.get_available_cube_status().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.get_active_replica().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client
                .send_usage_record(UsageRecord {
                    user_id: "u1".into(),
                    workstation: "ws1".into(),
                    full_path: r"\\share\book.xlsx".into(),
                })
                .await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn attach_to_unreachable_endpoint_fails_cleanly() {
        let client = ClientConnection::new(options(), |_| {}, |_| {});
        assert!(client.attach().await.is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let client = ClientConnection::new(options(), |_| {}, |_| {});
        client.shutdown().await;
        client.shutdown().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);

        // Attach after shutdown is suppressed.
        assert!(matches!(
            client.attach().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn bad_endpoint_is_an_endpoint_error() {
        let mut opts = options();
        opts.endpoint = "not a url".to_string();
        let client = ClientConnection::new(opts, |_| {}, |_| {});
        assert!(matches!(
            client.attach().await,
            Err(ClientError::Endpoint(_))
        ));
    }
}
