use crate::{config::Config, websocket::RoomRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
    pub config: Arc<Config>,
}
