use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Income,
    Expense,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
}

/// Omitted fields are left alone; `"parentId": null` detaches.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Categories in insertion order.
pub type Db = Arc<RwLock<Vec<Category>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Option<Arc<str>>,
}

type Failure = (StatusCode, Json<serde_json::Value>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "error": message })))
}

/// Router without authentication.
pub fn app() -> Router {
    router(None)
}

/// Router that rejects requests lacking `Authorization: Bearer <token>`.
pub fn app_with_token(token: &str) -> Router {
    router(Some(Arc::from(token)))
}

fn router(token: Option<Arc<str>>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Vec::new())),
        token,
    };
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    let app = match token {
        Some(token) => app_with_token(&token),
        None => app(),
    };
    axum::serve(listener, app).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let Some(expected) = &state.token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(&**expected) {
        Ok(())
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "missing or invalid token"))
    }
}

fn validate_name(name: &str) -> Result<(), Failure> {
    if name.trim().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "name is required"));
    }
    Ok(())
}

fn validate_parent(db: &[Category], parent_id: Option<&str>, own_id: Option<&str>) -> Result<(), Failure> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if Some(parent_id) == own_id {
        return Err(failure(StatusCode::BAD_REQUEST, "category cannot be its own parent"));
    }
    if !db.iter().any(|c| c.id == parent_id) {
        return Err(failure(StatusCode::BAD_REQUEST, "parent category not found"));
    }
    Ok(())
}

async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Category>>, Failure> {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    Ok(Json(db.clone()))
}

async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), Failure> {
    authorize(&state, &headers)?;
    validate_name(&input.name)?;
    let mut db = state.db.write().await;
    validate_parent(&db, input.parent_id.as_deref(), None)?;
    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        kind: input.kind,
        icon: input.icon,
        color: input.color,
        parent_id: input.parent_id,
    };
    db.push(category.clone());
    info!(id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Category>, Failure> {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    db.iter()
        .find(|c| c.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "category not found"))
}

async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateCategory>,
) -> Result<Json<Category>, Failure> {
    authorize(&state, &headers)?;
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    let mut db = state.db.write().await;
    if let Some(parent_id) = &input.parent_id {
        validate_parent(&db, parent_id.as_deref(), Some(id.as_str()))?;
    }
    let category = db
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "category not found"))?;
    if let Some(name) = input.name {
        category.name = name;
    }
    if let Some(kind) = input.kind {
        category.kind = kind;
    }
    if let Some(icon) = input.icon {
        category.icon = Some(icon);
    }
    if let Some(color) = input.color {
        category.color = Some(color);
    }
    if let Some(parent_id) = input.parent_id {
        category.parent_id = parent_id;
    }
    info!(%id, "category updated");
    Ok(Json(category.clone()))
}

async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Failure> {
    authorize(&state, &headers)?;
    let mut db = state.db.write().await;
    let before = db.len();
    db.retain(|c| c.id != id);
    if db.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "category not found"));
    }
    for child in db.iter_mut().filter(|c| c.parent_id.as_deref() == Some(id.as_str())) {
        child.parent_id = None;
    }
    info!(%id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
