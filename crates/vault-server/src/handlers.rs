use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vault_core::{
    export_csv, import_csv, query, Collection, Facet, Page, PageRequest, Record, RecordStore,
    SearchQuery, TokenClaims, ID_FIELD, TIMESTAMP_FIELD,
};

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_COOKIE: &str = "bondvault_admin";
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: String,
    pub subject: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct SimpleResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: String,
    pub bonds: usize,
    pub messages: usize,
}

/// `search`, `page`, `limit`, plus repeatable `issuer` / `agency` facets.
#[derive(Debug, Default)]
pub struct ListParams {
    pub search: String,
    pub page: PageRequest,
    pub issuer: Vec<String>,
    pub agency: Vec<String>,
}

impl ListParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, AppError> {
        let mut params = ListParams::default();
        let mut page = vault_core::query::DEFAULT_PAGE;
        let mut limit = vault_core::query::DEFAULT_PAGE_SIZE;
        for (key, value) in pairs {
            match key.as_str() {
                "search" => params.search = value,
                "page" => page = parse_number("page", &value)?,
                "limit" => limit = parse_number("limit", &value)?,
                "issuer" => params.issuer.push(value),
                "agency" => params.agency.push(value),
                _ => {}
            }
        }
        params.page = PageRequest::new(page, limit)?;
        Ok(params)
    }
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(req.headers()).or_else(|| extract_cookie_token(req.headers()));
    let claims = state.auth.authorize(token.as_deref())?;
    debug!(subject = %claims.sub, path = %req.uri().path(), "admin request");
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "BondVault backend is live".to_string(),
        bonds: state.store.len(Collection::Bonds),
        messages: state.store.len(Collection::Messages),
    })
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response<Body>, AppError> {
    let issued = state.auth.login(&payload.username, &payload.password)?;
    info!(subject = %issued.claims.sub, "admin logged in");

    let max_age = cookie::time::Duration::seconds(state.auth.ttl().num_seconds());
    let cookie = Cookie::build((ADMIN_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.is_production())
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build();

    let mut response = Json(LoginResponse {
        token: issued.token,
        role: issued.claims.role.as_str().to_string(),
        expires_at: issued.claims.expires_at().to_rfc3339(),
    })
    .into_response();
    let cookie = HeaderValue::from_str(&cookie.to_string())
        .map_err(|err| AppError::internal(err.to_string()))?;
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AppError> {
    let token = extract_bearer_token(&headers).or_else(|| extract_cookie_token(&headers));
    let claims: TokenClaims = state.auth.authorize(token.as_deref())?;
    Ok(Json(VerifyResponse {
        status: "authorized".to_string(),
        subject: claims.sub.clone(),
        expires_at: claims.expires_at().to_rfc3339(),
    }))
}

pub async fn list_bonds(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response<Body>, AppError> {
    let params = ListParams::from_pairs(pairs)?;
    let search = SearchQuery::bonds(&params.search)
        .with_facet(Facet::new("issuer_name", params.issuer))
        .with_facet(Facet::new("credit_rating_agency", params.agency));
    let bonds = state.store.list(Collection::Bonds);
    page_response(query(&bonds, &search, params.page))
}

pub async fn create_bond(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let fields = parse_record(&body)?;
    let record = with_store(state, move |store| {
        Ok(store.insert(Collection::Bonds, fields)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_bond(
    State(state): State<Arc<AppState>>,
    Path(bond_id): Path<String>,
    body: Bytes,
) -> Result<Json<Record>, AppError> {
    let patch = parse_record(&body)?;
    with_store(state, move |store| {
        Ok(store.update(Collection::Bonds, &bond_id, patch)?)
    })
    .await
    .map(Json)
}

pub async fn delete_bond(
    State(state): State<Arc<AppState>>,
    Path(bond_id): Path<String>,
) -> Result<Json<SimpleResponse>, AppError> {
    with_store(state, move |store| {
        store.delete(Collection::Bonds, &bond_id)?;
        Ok(())
    })
    .await?;
    Ok(Json(SimpleResponse { ok: true }))
}

/// Accepts a raw CSV body or a multipart form whose first file part is the CSV.
pub async fn upload_bonds(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Json<ImportResponse>, AppError> {
    let content = read_upload(req).await?;
    let imported = with_store(state, move |store| {
        let import = import_csv(&content)?;
        Ok(store.append_all(Collection::Bonds, import.records)?)
    })
    .await?;
    Ok(Json(ImportResponse { imported }))
}

pub async fn export_bonds(State(state): State<Arc<AppState>>) -> Result<Response<Body>, AppError> {
    let bonds = state.store.list(Collection::Bonds);
    csv_response(&bonds, "bonds.csv")
}

pub async fn contact(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let mut fields = parse_record(&body)?;
    fields.remove(ID_FIELD);
    let message = with_store(state, move |store| {
        Ok(store.insert(Collection::Messages, fields)?)
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id: message.id().unwrap_or_default().to_string(),
            timestamp: message.get(TIMESTAMP_FIELD).unwrap_or_default().to_string(),
        }),
    ))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response<Body>, AppError> {
    let params = ListParams::from_pairs(pairs)?;
    let messages = state.store.list(Collection::Messages);
    page_response(query(
        &messages,
        &SearchQuery::messages(&params.search),
        params.page,
    ))
}

pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
) -> Result<Json<SimpleResponse>, AppError> {
    with_store(state, move |store| {
        store.delete(Collection::Messages, &message_id)?;
        Ok(())
    })
    .await?;
    Ok(Json(SimpleResponse { ok: true }))
}

pub async fn export_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, AppError> {
    let messages = state.store.list(Collection::Messages);
    csv_response(&messages, "messages.csv")
}

fn page_response(page: Page) -> Result<Response<Body>, AppError> {
    let mut response = Json(page.items).into_response();
    response
        .headers_mut()
        .insert(TOTAL_COUNT_HEADER, HeaderValue::from(page.total));
    Ok(response)
}

fn csv_response(records: &[Record], filename: &str) -> Result<Response<Body>, AppError> {
    let content = export_csv(records)?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(content))
        .map_err(|err| AppError::internal(err.to_string()))
}

async fn read_upload(req: Request) -> Result<Bytes, AppError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        return Bytes::from_request(req, &())
            .await
            .map_err(|err| AppError::bad_request(err.to_string()));
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|err| AppError::bad_request(err.to_string()));
        }
    }
    Err(AppError::bad_request("multipart upload has no file part"))
}

fn parse_record(body: &[u8]) -> Result<Record, AppError> {
    Ok(serde_json::from_slice(body)?)
}

fn parse_number(name: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("{name} must be an integer, got {value:?}")))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in raw.split(';') {
        let trimmed = part.trim();
        if let Ok(cookie) = Cookie::parse(trimmed.to_string()) {
            if cookie.name() == ADMIN_COOKIE {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}

async fn with_store<F, R>(state: Arc<AppState>, op: F) -> Result<R, AppError>
where
    F: FnOnce(&RecordStore) -> Result<R, AppError> + Send + 'static,
    R: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
}
