use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::Accessories;
use crate::errors::{ApiError, DeviceError};
use crate::services::RgbLight;

/// Characteristics to change, absent fields stay as they are
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LightBody {
    pub on: Option<bool>,
    pub hue: Option<i64>,
    pub saturation: Option<i64>,
    pub brightness: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightResponse {
    pub id: Uuid,
    pub name: String,
    pub on: bool,
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
}

#[derive(Clone)]
pub struct LightsState {
    pub accessories: Arc<Accessories>,
}

impl LightResponse {
    async fn from_light(light: &RgbLight) -> Self {
        let color = light.color().await;
        Self {
            id: light.id(),
            name: light.name().to_string(),
            on: color.on,
            hue: color.hue,
            saturation: color.saturation,
            brightness: color.brightness,
        }
    }
}

fn within(field: &'static str, value: Option<i64>, max: i64) -> Result<Option<i64>, DeviceError> {
    match value {
        Some(value) if !(0..=max).contains(&value) => Err(DeviceError::OutOfRange { field, value }),
        value => Ok(value),
    }
}

pub async fn get_lights(State(state): State<LightsState>) -> impl IntoResponse {
    let mut lights = Vec::with_capacity(state.accessories.lights.len());
    for light in &state.accessories.lights {
        lights.push(LightResponse::from_light(light).await);
    }

    Json(lights)
}

pub async fn get_light(
    Path(light_id): Path<Uuid>,
    State(state): State<LightsState>,
) -> Result<impl IntoResponse, ApiError> {
    let light = state
        .accessories
        .light(&light_id)
        .ok_or(DeviceError::AccessoryNotFound)?;

    Ok(Json(LightResponse::from_light(light).await))
}

pub async fn update_light(
    Path(light_id): Path<Uuid>,
    State(state): State<LightsState>,
    Json(body): Json<LightBody>,
) -> Result<impl IntoResponse, ApiError> {
    let light = state
        .accessories
        .light(&light_id)
        .ok_or(DeviceError::AccessoryNotFound)?;

    let hue = within("hue", body.hue, 359)?;
    let saturation = within("saturation", body.saturation, 100)?;
    let brightness = within("brightness", body.brightness, 100)?;

    if let Some(on) = body.on {
        light.set_on(on).await;
    }
    if let Some(hue) = hue {
        light.set_hue(hue as u16).await;
    }
    if let Some(saturation) = saturation {
        light.set_saturation(saturation as u8).await;
    }
    if let Some(brightness) = brightness {
        light.set_brightness(brightness as u8).await;
    }

    Ok(Json(LightResponse::from_light(light).await))
}
