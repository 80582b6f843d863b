use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{SettingsUpdate, SettingsView};
use crate::settings::Settings;
use crate::state::AppState;

/// GET /api/settings - Current settings (the key is only reported as set/unset)
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsView> {
    Json(view(&state.current_settings()))
}

/// PUT /api/settings - Apply a partial update and persist it
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, (StatusCode, String)> {
    // Lock held across apply and save; the save is synchronous.
    let settings = {
        let mut current = state.settings.write();
        let mut settings = current.clone();
        settings.apply(update);

        state.settings_store.save(&settings).map_err(|e| {
            tracing::error!("Failed to save settings: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to save settings: {e}"),
            )
        })?;

        *current = settings.clone();
        settings
    };
    tracing::info!(
        "Settings saved: mode={}, match_count={}",
        settings.mode().as_str(),
        settings.match_count()
    );
    Ok(Json(view(&settings)))
}

/// DELETE /api/settings - Forget persisted settings and reset the session's
pub async fn clear_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsView>, (StatusCode, String)> {
    let settings = {
        let mut current = state.settings.write();
        state.settings_store.clear().map_err(|e| {
            tracing::error!("Failed to clear settings: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to clear settings: {e}"),
            )
        })?;

        *current = Settings::cleared();
        current.clone()
    };
    tracing::info!("Settings cleared");
    Ok(Json(view(&settings)))
}

fn view(settings: &Settings) -> SettingsView {
    SettingsView {
        has_api_key: !settings.api_key().is_empty(),
        match_count: settings.match_count(),
        mode: settings.mode(),
    }
}
