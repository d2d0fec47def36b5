use crate::state::AppState;
use crate::websocket::{
    broadcast::{relay, MAX_FRAME_BYTES},
    presence::announce,
    ConnectionId, Frame, RoomMember, RoomRegistry,
};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

// The codec limit sits above the relay ceiling so oversized frames reach the
// engine's size check and die there, not as a protocol error.
const CODEC_FRAME_LIMIT: usize = 2 * MAX_FRAME_BYTES;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-connection WebSocket session bound to one room for its lifetime.
///
/// Inbound text/binary frames go to the broadcast engine with this
/// connection as sender; frames queued by the engine for this connection
/// arrive through `inbox` and are written out on the socket.
struct WsSession {
    room_id: String,
    connection_id: ConnectionId,
    registry: RoomRegistry,
    inbox: Option<UnboundedReceiver<Frame>>,
    hb: Instant,
}

impl WsSession {
    fn new(
        room_id: String,
        connection_id: ConnectionId,
        registry: RoomRegistry,
        inbox: UnboundedReceiver<Frame>,
    ) -> Self {
        Self {
            room_id,
            connection_id,
            registry,
            inbox: Some(inbox),
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(room = %act.room_id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn relay_from_peer(&self, frame: Frame) {
        let registry = self.registry.clone();
        let room_id = self.room_id.clone();
        let sender = self.connection_id;

        actix::spawn(async move {
            if relay(&registry, &room_id, Some(sender), frame).await > 0 {
                announce(&registry, &room_id).await;
            }
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        // Bridge the registry's channel onto the socket. If the registry
        // drops our sender (eviction after a failed delivery), the stream
        // finishes and the default finished() stops the actor.
        if let Some(inbox) = self.inbox.take() {
            ctx.add_stream(UnboundedReceiverStream::new(inbox));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(room = %self.room_id, connection = ?self.connection_id, "websocket session closed");

        // Cleanup runs on every termination path: peer close, read error,
        // heartbeat timeout.
        let registry = self.registry.clone();
        let room_id = self.room_id.clone();
        let connection_id = self.connection_id;

        actix::spawn(async move {
            registry.leave(&room_id, connection_id).await;
            announce(&registry, &room_id).await;
        });
    }
}

// Frames queued for this connection by the broadcast engine.
impl StreamHandler<Frame> for WsSession {
    fn handle(&mut self, frame: Frame, ctx: &mut Self::Context) {
        match frame {
            Frame::Text(text) => ctx.text(text),
            Frame::Binary(bytes) => ctx.binary(bytes),
        }
    }
}

// WebSocket protocol messages from the peer.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(room = %self.room_id, error = %err, "websocket read failed");
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Text(text) => self.relay_from_peer(Frame::Text(text.to_string())),
            ws::Message::Binary(bytes) => self.relay_from_peer(Frame::Binary(bytes)),
            ws::Message::Ping(payload) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            ws::Message::Pong(_) => {
                self.hb = Instant::now();
            }
            ws::Message::Close(reason) => {
                tracing::debug!(room = %self.room_id, ?reason, "websocket close received");
                ctx.stop();
            }
            // Continuation and nop frames carry nothing relayable.
            _ => {}
        }
    }
}

#[get("/ws/{room_id}")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    // Room keys are taken as-is; rooms come into existence on first join.
    let room_id = path.into_inner();

    let (member, inbox) = RoomMember::register();
    let connection_id = member.id();
    state.registry.join(&room_id, member).await;
    announce(&state.registry, &room_id).await;

    tracing::info!(room = %room_id, connection = ?connection_id, "websocket session joined");

    let session = WsSession::new(
        room_id.clone(),
        connection_id,
        state.registry.clone(),
        inbox,
    );

    let started = ws::WsResponseBuilder::new(session, &req, stream)
        .frame_size(CODEC_FRAME_LIMIT)
        .start();

    match started {
        Ok(resp) => Ok(resp),
        Err(err) => {
            // The handshake failed after the join; undo it so the announced
            // count never includes a connection that was never established.
            state.registry.leave(&room_id, connection_id).await;
            announce(&state.registry, &room_id).await;
            Err(err)
        }
    }
}
