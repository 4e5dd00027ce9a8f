use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::Accessories;
use crate::errors::{ApiError, DeviceError};
use crate::models::MotionState;
use crate::services::Cover;

#[derive(Clone, Serialize, Deserialize)]
pub struct CoverBody {
    pub target_position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverResponse {
    pub id: Uuid,
    pub name: String,
    pub current_position: u8,
    pub target_position: u8,
    pub motion: MotionState,
}

#[derive(Clone)]
pub struct CoversState {
    pub accessories: Arc<Accessories>,
}

impl CoverResponse {
    async fn from_cover(cover: &Cover) -> Self {
        let state = cover.state().await;
        Self {
            id: cover.id(),
            name: cover.name().to_string(),
            current_position: state.current_position,
            target_position: state.target_position,
            motion: state.motion,
        }
    }
}

pub async fn get_covers(State(state): State<CoversState>) -> impl IntoResponse {
    let mut covers = Vec::with_capacity(state.accessories.covers.len());
    for cover in &state.accessories.covers {
        covers.push(CoverResponse::from_cover(cover).await);
    }

    Json(covers)
}

pub async fn get_cover(
    Path(cover_id): Path<Uuid>,
    State(state): State<CoversState>,
) -> Result<impl IntoResponse, ApiError> {
    let cover = state
        .accessories
        .cover(&cover_id)
        .ok_or(DeviceError::AccessoryNotFound)?;

    Ok(Json(CoverResponse::from_cover(cover).await))
}

pub async fn update_cover(
    Path(cover_id): Path<Uuid>,
    State(state): State<CoversState>,
    Json(body): Json<CoverBody>,
) -> Result<impl IntoResponse, ApiError> {
    let cover = state
        .accessories
        .cover(&cover_id)
        .ok_or(DeviceError::AccessoryNotFound)?;

    let position = u8::try_from(body.target_position)
        .ok()
        .filter(|position| *position <= 100)
        .ok_or(DeviceError::OutOfRange {
            field: "target_position",
            value: body.target_position,
        })?;

    cover.set_target(position).await?;

    Ok(Json(CoverResponse::from_cover(cover).await))
}
