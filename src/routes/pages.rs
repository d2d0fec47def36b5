use crate::state::AppState;
use actix_files::NamedFile;
use actix_web::{get, web};

// The root and per-room pages serve the same entry document; the client
// reads the room id out of its own location path.

#[get("/")]
pub async fn index(state: web::Data<AppState>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(state.config.index_file()).await?)
}

#[get("/room/{room_id}")]
pub async fn room_page(
    state: web::Data<AppState>,
    _room_id: web::Path<String>,
) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(state.config.index_file()).await?)
}
