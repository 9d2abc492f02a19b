use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{sync::RwLock, time::Instant};
use tower_http::services::{ServeDir, ServeFile};
use url::Url;

use crate::contributions::{
    ContributionCalendar, ContributionDay, ContributionWeek, ContributionsPayload,
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STATIC_DIR: &str = "dist";
const DEFAULT_CONTRIBUTIONS_UPSTREAM_URL: &str = "https://github.com";
const DEFAULT_CONTRIBUTIONS_CACHE_TTL_SECONDS: u64 = 3_600;
const DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES: usize = 64;
const DEFAULT_CONTRIBUTIONS_RESPONSE_MAX_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_CONTRIBUTIONS_REQUEST_TIMEOUT_MS: u64 = 6_000;
const DEFAULT_CONTRIBUTIONS_CONNECT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

const CONTRIBUTIONS_CACHE_TTL_SECONDS_BOUNDS: (u64, u64) = (1, 86_400);
const CONTRIBUTIONS_CACHE_MAX_ENTRIES_BOUNDS: (usize, usize) = (1, 10_000);
const CONTRIBUTIONS_RESPONSE_MAX_BYTES_BOUNDS: (usize, usize) = (1_024, 10 * 1024 * 1024);
const CONTRIBUTIONS_REQUEST_TIMEOUT_MS_BOUNDS: (u64, u64) = (100, 120_000);
const CONTRIBUTIONS_CONNECT_TIMEOUT_MS_BOUNDS: (u64, u64) = (100, 30_000);
const USERNAME_MAX_LEN: usize = 39;
const MAX_CONTRIBUTION_LEVEL: u8 = 4;
const USER_AGENT: &str = "portfolio-contributions-bot/1.0";
const REQUEST_ID_HEADER: &str = "x-request-id";
const DAY_ID_PREFIX: &str = "contribution-day-component-";

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
        }
    }
}

#[derive(Clone)]
struct ServerConfig {
    port: u16,
    static_dir: PathBuf,
    upstream_url: Url,
    cache_ttl_seconds: u64,
    cache_max_entries: usize,
    response_max_bytes: usize,
    request_timeout: Duration,
    connect_timeout: Duration,
    log_level: LogLevel,
}

impl ServerConfig {
    fn from_env() -> Result<Self, url::ParseError> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let static_dir = parse_env_non_empty_string("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let upstream_url = match parse_env_http_url("CONTRIBUTIONS_UPSTREAM_URL") {
            Some(url) => url,
            None => Url::parse(DEFAULT_CONTRIBUTIONS_UPSTREAM_URL)?,
        };
        let cache_ttl_seconds = parse_env_u64_with_bounds(
            "CONTRIBUTIONS_CACHE_TTL_SECONDS",
            DEFAULT_CONTRIBUTIONS_CACHE_TTL_SECONDS,
            CONTRIBUTIONS_CACHE_TTL_SECONDS_BOUNDS,
        );
        let cache_max_entries = parse_env_usize_with_bounds(
            "CONTRIBUTIONS_CACHE_MAX_ENTRIES",
            DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES,
            CONTRIBUTIONS_CACHE_MAX_ENTRIES_BOUNDS,
        );
        let response_max_bytes = parse_env_usize_with_bounds(
            "CONTRIBUTIONS_RESPONSE_MAX_BYTES",
            DEFAULT_CONTRIBUTIONS_RESPONSE_MAX_BYTES,
            CONTRIBUTIONS_RESPONSE_MAX_BYTES_BOUNDS,
        );
        let request_timeout_ms = parse_env_u64_with_bounds(
            "CONTRIBUTIONS_REQUEST_TIMEOUT_MS",
            DEFAULT_CONTRIBUTIONS_REQUEST_TIMEOUT_MS,
            CONTRIBUTIONS_REQUEST_TIMEOUT_MS_BOUNDS,
        );
        let connect_timeout_ms = parse_env_u64_with_bounds(
            "CONTRIBUTIONS_CONNECT_TIMEOUT_MS",
            DEFAULT_CONTRIBUTIONS_CONNECT_TIMEOUT_MS,
            CONTRIBUTIONS_CONNECT_TIMEOUT_MS_BOUNDS,
        );
        let log_level = parse_log_level("LOG_LEVEL", DEFAULT_LOG_LEVEL);

        Ok(Self {
            port,
            static_dir,
            upstream_url,
            cache_ttl_seconds,
            cache_max_entries,
            response_max_bytes,
            request_timeout: Duration::from_millis(request_timeout_ms),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            log_level,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    client: reqwest::Client,
    config: ServerConfig,
}

#[derive(Clone)]
struct CacheEntry {
    created_at: Instant,
    expires_at: Instant,
    value: ContributionCalendar,
}

#[derive(Deserialize)]
struct ContributionsQuery {
    user: Option<String>,
}

struct UpstreamFailure {
    status: StatusCode,
    reason: &'static str,
}

impl UpstreamFailure {
    fn bad_gateway(reason: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            reason,
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let bind_address = format!("0.0.0.0:{}", config.port);
    let client = build_upstream_client(&config)?;

    let app = router(AppState {
        cache: Arc::new(RwLock::new(HashMap::new())),
        client,
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log_event(
        &config,
        LogLevel::Info,
        "server_listening",
        serde_json::json!({
            "address": format!("http://127.0.0.1:{}", config.port),
            "static_dir": config.static_dir.display().to_string(),
            "upstream": config.upstream_url.as_str(),
        }),
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let index_file = state.config.static_dir.join("index.html");
    let static_service =
        ServeDir::new(&state.config.static_dir).not_found_service(ServeFile::new(index_file));

    Router::new()
        .route("/api/contributions", get(get_contributions))
        .fallback_service(static_service)
        .with_state(state)
}

async fn get_contributions(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<ContributionsQuery>,
) -> impl IntoResponse {
    let request_started_at = Instant::now();
    let request_id = resolve_request_id(&headers);

    log_event(
        &state.config,
        LogLevel::Info,
        "contributions_request_start",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "method": method.as_str(),
            "path": uri.path(),
        }),
    );

    let username = match validate_username(query.user.as_deref().unwrap_or_default()) {
        Ok(username) => username.to_string(),
        Err(error_message) => {
            log_event(
                &state.config,
                LogLevel::Info,
                "contributions_request_failed",
                serde_json::json!({
                    "request_id": request_id.as_str(),
                    "error_class": "invalid_username",
                    "message": error_message,
                    "duration_ms": request_started_at.elapsed().as_millis(),
                }),
            );
            return json_response(
                StatusCode::BAD_REQUEST,
                ContributionsPayload::error(error_message),
                cache_control("no-store"),
                &request_id,
            );
        }
    };

    let cache_key = username.to_ascii_lowercase();
    let cache_hit = read_from_cache(&state, &cache_key).await;
    log_event(
        &state.config,
        LogLevel::Debug,
        "contributions_cache_decision",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "username": username.as_str(),
            "memory_cache": if cache_hit.is_some() { "hit" } else { "miss" },
        }),
    );

    let (calendar, cache_outcome) = match cache_hit {
        Some(calendar) => (calendar, "memory_hit"),
        None => match fetch_contribution_calendar(&state, &username).await {
            Ok(calendar) => {
                write_to_cache(&state, cache_key, calendar.clone()).await;
                (calendar, "memory_miss")
            }
            Err(failure) => {
                log_event(
                    &state.config,
                    LogLevel::Info,
                    "contributions_request_failed",
                    serde_json::json!({
                        "request_id": request_id.as_str(),
                        "username": username.as_str(),
                        "error_class": "upstream",
                        "status": failure.status.as_u16(),
                        "message": failure.reason,
                        "duration_ms": request_started_at.elapsed().as_millis(),
                    }),
                );
                return json_response(
                    failure.status,
                    ContributionsPayload::error(failure.reason),
                    cache_control("no-store"),
                    &request_id,
                );
            }
        },
    };

    log_event(
        &state.config,
        LogLevel::Info,
        "contributions_request_complete",
        serde_json::json!({
            "request_id": request_id.as_str(),
            "status": StatusCode::OK.as_u16(),
            "duration_ms": request_started_at.elapsed().as_millis(),
            "cache": cache_outcome,
            "days": calendar.day_count(),
        }),
    );

    json_response(
        StatusCode::OK,
        ContributionsPayload::success(calendar),
        cache_control(&format!("public, max-age={}", state.config.cache_ttl_seconds)),
        &request_id,
    )
}

fn json_response(
    status: StatusCode,
    payload: ContributionsPayload,
    cache_control: HeaderValue,
    request_id: &str,
) -> axum::response::Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, cache_control);
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    if let Ok(request_id_header) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, request_id_header);
    }
    (status, headers, Json(payload)).into_response()
}

fn cache_control(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("no-store"))
}

fn parse_env_u64_with_bounds(name: &str, default: u64, bounds: (u64, u64)) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}

fn parse_env_usize_with_bounds(name: &str, default: usize, bounds: (usize, usize)) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}

fn parse_env_non_empty_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env_http_url(name: &str) -> Option<Url> {
    let value = parse_env_non_empty_string(name)?;
    let parsed = Url::parse(&value).ok()?;

    if parsed.scheme() == "http" || parsed.scheme() == "https" {
        Some(parsed)
    } else {
        None
    }
}

fn parse_log_level(name: &str, default: LogLevel) -> LogLevel {
    match parse_env_non_empty_string(name)
        .unwrap_or_else(|| default.as_str().to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "debug" => LogLevel::Debug,
        "info" => LogLevel::Info,
        _ => default,
    }
}

fn since_unix_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

fn generate_request_id() -> String {
    let counter = REQUEST_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    format!("req-{}-{counter}", since_unix_epoch().as_millis())
}

fn resolve_request_id(headers: &HeaderMap) -> String {
    let value = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|raw| raw.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    value.unwrap_or_else(generate_request_id)
}

fn log_event(config: &ServerConfig, level: LogLevel, event: &str, fields: serde_json::Value) {
    if level < config.log_level {
        return;
    }

    let mut payload = serde_json::Map::new();
    payload.insert(
        "ts".to_string(),
        serde_json::Value::Number(serde_json::Number::from(since_unix_epoch().as_secs())),
    );
    payload.insert("level".to_string(), serde_json::Value::String(level.as_str().to_string()));
    payload.insert("event".to_string(), serde_json::Value::String(event.to_string()));

    if let serde_json::Value::Object(extra) = fields {
        for (key, value) in extra {
            payload.insert(key, value);
        }
    }

    println!("{}", serde_json::Value::Object(payload));
}

fn validate_username(raw: &str) -> Result<&str, &'static str> {
    let username = raw.trim();

    if username.is_empty() {
        return Err("username is required");
    }

    if username.len() > USERNAME_MAX_LEN {
        return Err("username is too long");
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err("username contains invalid characters");
    }

    if username.starts_with('-') || username.ends_with('-') || username.contains("--") {
        return Err("username has misplaced hyphens");
    }

    Ok(username)
}

fn contributions_url(upstream: &Url, username: &str) -> Result<Url, &'static str> {
    let mut url = upstream.clone();
    url.path_segments_mut()
        .map_err(|_| "upstream URL cannot have a path")?
        .pop_if_empty()
        .extend(["users", username, "contributions"]);
    url.set_query(None);
    Ok(url)
}

async fn read_from_cache(state: &AppState, key: &str) -> Option<ContributionCalendar> {
    let now = Instant::now();
    {
        let cache = state.cache.read().await;
        let entry = cache.get(key)?;

        if entry.expires_at > now {
            return Some(entry.value.clone());
        }
    }

    let mut cache = state.cache.write().await;
    purge_expired_entries(&mut cache, now);
    cache.remove(key);
    None
}

async fn write_to_cache(state: &AppState, key: String, value: ContributionCalendar) {
    let now = Instant::now();
    let mut cache = state.cache.write().await;

    purge_expired_entries(&mut cache, now);

    if !cache.contains_key(&key) && cache.len() >= state.config.cache_max_entries {
        evict_oldest_entry(&mut cache);
    }

    cache.insert(
        key,
        CacheEntry {
            created_at: now,
            expires_at: now + Duration::from_secs(state.config.cache_ttl_seconds),
            value,
        },
    );
}

fn purge_expired_entries(cache: &mut HashMap<String, CacheEntry>, now: Instant) {
    cache.retain(|_, entry| entry.expires_at > now);
}

fn evict_oldest_entry(cache: &mut HashMap<String, CacheEntry>) {
    let Some(key_to_remove) = cache
        .iter()
        .min_by_key(|(_, entry)| entry.created_at)
        .map(|(key, _)| key.clone())
    else {
        return;
    };

    cache.remove(&key_to_remove);
}

fn build_upstream_client(config: &ServerConfig) -> Result<reqwest::Client, &'static str> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|_| "failed to prepare request client")
}

async fn fetch_contribution_calendar(
    state: &AppState,
    username: &str,
) -> Result<ContributionCalendar, UpstreamFailure> {
    let target_url =
        contributions_url(&state.config.upstream_url, username).map_err(UpstreamFailure::bad_gateway)?;

    let response = state
        .client
        .get(target_url)
        .send()
        .await
        .map_err(|_| UpstreamFailure::bad_gateway("failed to fetch contributions"))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(UpstreamFailure::bad_gateway("unknown user"));
    }

    if !response.status().is_success() {
        return Err(UpstreamFailure::bad_gateway("received non-success response"));
    }

    let body = read_limited_body(response, state.config.response_max_bytes)
        .await
        .map_err(UpstreamFailure::bad_gateway)?;
    let calendar = parse_contribution_calendar(&body, username);

    if calendar.weeks.is_empty() {
        return Err(UpstreamFailure::bad_gateway("no contribution data found"));
    }

    Ok(calendar)
}

async fn read_limited_body(
    response: reqwest::Response,
    max_response_bytes: usize,
) -> Result<String, &'static str> {
    let mut stream = response.bytes_stream();
    let mut body: Vec<u8> = Vec::with_capacity(8192);

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|_| "failed reading response body")?;

        if body.len() + chunk.len() > max_response_bytes {
            return Err("response body too large");
        }

        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).to_string())
}

fn parse_contribution_calendar(document_html: &str, username: &str) -> ContributionCalendar {
    let document = Html::parse_document(document_html);
    let counts = tooltip_counts(&document);

    let mut weeks: BTreeMap<usize, Vec<ContributionDay>> = BTreeMap::new();

    if let Ok(day_selector) = Selector::parse("td.ContributionCalendar-day[data-date]") {
        for cell in document.select(&day_selector) {
            let element = cell.value();
            let Some((weekday, week)) = element.id().and_then(day_position) else {
                continue;
            };
            let Some(date) = element.attr("data-date").and_then(normalize_text) else {
                continue;
            };
            let level = element
                .attr("data-level")
                .and_then(|value| value.trim().parse::<u8>().ok())
                .unwrap_or(0)
                .min(MAX_CONTRIBUTION_LEVEL);
            let count = element
                .id()
                .and_then(|id| counts.get(id).copied())
                .unwrap_or(0);

            weeks.entry(week).or_default().push(ContributionDay {
                date,
                weekday,
                level,
                count,
            });
        }
    }

    let weeks: Vec<ContributionWeek> = weeks
        .into_values()
        .map(|mut days| {
            days.sort_by_key(|day| day.weekday);
            ContributionWeek { days }
        })
        .collect();

    let total = yearly_total(&document).unwrap_or_else(|| {
        weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .map(|day| day.count)
            .sum()
    });

    ContributionCalendar {
        username: username.to_string(),
        total,
        weeks,
    }
}

fn tooltip_counts(document: &Html) -> HashMap<String, u32> {
    let Ok(selector) = Selector::parse("tool-tip[for]") else {
        return HashMap::new();
    };

    document
        .select(&selector)
        .filter_map(|tooltip| {
            let target = tooltip.value().attr("for")?.to_string();
            let count = parse_contribution_count(&tooltip.text().collect::<String>())?;
            Some((target, count))
        })
        .collect()
}

fn yearly_total(document: &Html) -> Option<u32> {
    let selector = Selector::parse("#js-contribution-activity-description").ok()?;
    let heading = document.select(&selector).next()?;
    parse_contribution_count(&heading.text().collect::<String>())
}

fn parse_contribution_count(text: &str) -> Option<u32> {
    let first = text.split_whitespace().next()?;

    if first.eq_ignore_ascii_case("no") {
        return Some(0);
    }

    first.replace(',', "").parse().ok()
}

fn day_position(id: &str) -> Option<(u8, usize)> {
    let (weekday, week) = id.strip_prefix(DAY_ID_PREFIX)?.split_once('-')?;
    Some((weekday.parse().ok()?, week.parse().ok()?))
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONTRIBUTIONS_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="js-yearly-contributions">
  <h2 id="js-contribution-activity-description" class="f4 text-normal mb-2">
    1,234
      contributions
      in the last year
  </h2>
  <table class="ContributionCalendar-grid">
    <tbody>
      <tr>
        <td class="ContributionCalendar-day" data-date="2024-01-07" id="contribution-day-component-0-0" data-level="0"></td>
        <td class="ContributionCalendar-day" data-date="2024-01-14" id="contribution-day-component-0-1" data-level="4"></td>
      </tr>
      <tr>
        <td class="ContributionCalendar-day" data-date="2024-01-08" id="contribution-day-component-1-0" data-level="1"></td>
        <td class="ContributionCalendar-day" data-date="2024-01-15" id="contribution-day-component-1-1" data-level="9"></td>
      </tr>
      <tr>
        <td class="ContributionCalendar-label">Tue</td>
        <td class="ContributionCalendar-day" data-date="2024-01-09"></td>
      </tr>
    </tbody>
  </table>
  <tool-tip for="contribution-day-component-0-0">No contributions on January 7th.</tool-tip>
  <tool-tip for="contribution-day-component-0-1">12 contributions on January 14th.</tool-tip>
  <tool-tip for="contribution-day-component-1-0">1 contribution on January 8th.</tool-tip>
  <tool-tip for="contribution-day-component-1-1">1,005 contributions on January 15th.</tool-tip>
</div>
</body>
</html>"#;

    fn test_config(upstream_url: Url) -> ServerConfig {
        ServerConfig {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            upstream_url,
            cache_ttl_seconds: DEFAULT_CONTRIBUTIONS_CACHE_TTL_SECONDS,
            cache_max_entries: DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES,
            response_max_bytes: DEFAULT_CONTRIBUTIONS_RESPONSE_MAX_BYTES,
            request_timeout: Duration::from_millis(DEFAULT_CONTRIBUTIONS_REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONTRIBUTIONS_CONNECT_TIMEOUT_MS),
            log_level: DEFAULT_LOG_LEVEL,
        }
    }

    fn test_state(upstream_url: Url) -> AppState {
        let config = test_config(upstream_url);
        AppState {
            cache: Arc::new(RwLock::new(HashMap::new())),
            client: build_upstream_client(&config).expect("client builds"),
            config,
        }
    }

    fn sample_calendar(username: &str) -> ContributionCalendar {
        ContributionCalendar {
            username: username.to_string(),
            total: 0,
            weeks: Vec::new(),
        }
    }

    async fn spawn_upstream(status: StatusCode, body: &'static str) -> Url {
        let app = Router::new().route(
            "/users/{user}/contributions",
            get(move || async move { (status, axum::response::Html(body)) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let address = listener.local_addr().expect("mock upstream address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Url::parse(&format!("http://{address}")).expect("valid URL")
    }

    async fn spawn_server(upstream: Url) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind server");
        let address = listener.local_addr().expect("server address");
        let app = router(test_state(upstream));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Url::parse(&format!("http://{address}/api/contributions")).expect("valid URL")
    }

    async fn get_json(
        url: Url,
        request_id: Option<&str>,
    ) -> (StatusCode, Option<String>, serde_json::Value) {
        let mut request = reqwest::Client::new().get(url);
        if let Some(request_id) = request_id {
            request = request.header(REQUEST_ID_HEADER, request_id);
        }

        let response = request.send().await.expect("server responds");
        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body = response.json().await.expect("json body");
        (status, request_id, body)
    }

    #[tokio::test]
    async fn invalid_username_is_rejected_with_request_id_echoed() {
        let upstream = spawn_upstream(StatusCode::OK, SAMPLE_CONTRIBUTIONS_HTML).await;
        let mut url = spawn_server(upstream).await;
        url.set_query(Some("user=-octocat"));

        let (status, request_id, body) = get_json(url, Some("trace-42")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(request_id.as_deref(), Some("trace-42"));
        assert_eq!(
            body,
            serde_json::json!({ "ok": false, "error": "username has misplaced hyphens" })
        );
    }

    #[tokio::test]
    async fn missing_username_is_rejected() {
        let upstream = spawn_upstream(StatusCode::OK, SAMPLE_CONTRIBUTIONS_HTML).await;
        let url = spawn_server(upstream).await;

        let (status, _, body) = get_json(url, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], serde_json::json!(false));
        assert_eq!(body["error"], serde_json::json!("username is required"));
    }

    #[tokio::test]
    async fn calendar_request_generates_request_id() {
        let upstream = spawn_upstream(StatusCode::OK, SAMPLE_CONTRIBUTIONS_HTML).await;
        let mut url = spawn_server(upstream).await;
        url.set_query(Some("user=octocat"));

        let (status, request_id, body) = get_json(url, None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(request_id.is_some_and(|id| id.starts_with("req-")));
        assert_eq!(body["ok"], serde_json::json!(true));
        assert_eq!(body["calendar"]["total"], serde_json::json!(1234));
        assert_eq!(body["calendar"]["username"], serde_json::json!("octocat"));
    }

    #[tokio::test]
    async fn unknown_upstream_user_is_bad_gateway_payload() {
        let upstream = spawn_upstream(StatusCode::NOT_FOUND, "Not Found").await;
        let mut url = spawn_server(upstream).await;
        url.set_query(Some("user=ghost"));

        let (status, _, body) = get_json(url, None).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, serde_json::json!({ "ok": false, "error": "unknown user" }));
    }

    #[test]
    fn usernames_follow_github_rules() {
        assert_eq!(validate_username(" octo-cat "), Ok("octo-cat"));
        assert!(validate_username("").is_err());
        assert!(validate_username("-octocat").is_err());
        assert!(validate_username("octocat-").is_err());
        assert!(validate_username("octo--cat").is_err());
        assert!(validate_username("octo/cat").is_err());
        assert!(validate_username(&"a".repeat(40)).is_err());
        assert!(validate_username(&"a".repeat(39)).is_ok());
    }

    #[test]
    fn contributions_url_appends_user_path() {
        let base = Url::parse("https://github.com").expect("valid URL");
        assert_eq!(
            contributions_url(&base, "octocat").expect("url").as_str(),
            "https://github.com/users/octocat/contributions"
        );

        let prefixed = Url::parse("http://127.0.0.1:9000/mirror/?x=1").expect("valid URL");
        assert_eq!(
            contributions_url(&prefixed, "octocat").expect("url").as_str(),
            "http://127.0.0.1:9000/mirror/users/octocat/contributions"
        );
    }

    #[test]
    fn contribution_counts_parse_words_and_separators() {
        assert_eq!(parse_contribution_count("No contributions on May 1st."), Some(0));
        assert_eq!(parse_contribution_count("  1 contribution on May 1st."), Some(1));
        assert_eq!(parse_contribution_count("1,234 contributions"), Some(1234));
        assert_eq!(parse_contribution_count("contributions"), None);
        assert_eq!(parse_contribution_count(""), None);
    }

    #[test]
    fn calendar_cells_are_grouped_into_weeks() {
        let calendar = parse_contribution_calendar(SAMPLE_CONTRIBUTIONS_HTML, "octocat");

        assert_eq!(calendar.username, "octocat");
        assert_eq!(calendar.total, 1234);
        assert_eq!(calendar.weeks.len(), 2);
        assert_eq!(calendar.day_count(), 4);

        let first_week = &calendar.weeks[0].days;
        assert_eq!(first_week[0].date, "2024-01-07");
        assert_eq!(first_week[0].weekday, 0);
        assert_eq!(first_week[0].count, 0);
        assert_eq!(first_week[1].date, "2024-01-08");
        assert_eq!(first_week[1].count, 1);

        let second_week = &calendar.weeks[1].days;
        assert_eq!(second_week[0].level, 4);
        assert_eq!(second_week[0].count, 12);
        assert_eq!(second_week[1].level, MAX_CONTRIBUTION_LEVEL);
        assert_eq!(second_week[1].count, 1005);
    }

    #[test]
    fn total_falls_back_to_sum_of_days() {
        let html = SAMPLE_CONTRIBUTIONS_HTML.replace("js-contribution-activity-description", "renamed");
        let calendar = parse_contribution_calendar(&html, "octocat");

        assert_eq!(calendar.total, 1 + 12 + 1005);
    }

    #[test]
    fn page_without_calendar_has_no_weeks() {
        let calendar = parse_contribution_calendar("<html><body>Not here</body></html>", "octocat");
        assert!(calendar.weeks.is_empty());
        assert_eq!(calendar.total, 0);
    }

    #[tokio::test]
    async fn cache_overwrite_at_capacity_does_not_evict_oldest() {
        let state = test_state(Url::parse("https://github.com").expect("valid URL"));
        let now = Instant::now();

        {
            let mut cache = state.cache.write().await;

            for index in 0..DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES {
                let key = format!("user-{index}");
                cache.insert(
                    key.clone(),
                    CacheEntry {
                        created_at: now + Duration::from_secs(index as u64),
                        expires_at: now + Duration::from_secs(10_000),
                        value: sample_calendar(&key),
                    },
                );
            }
        }

        let mut updated = sample_calendar("user-10");
        updated.total = 42;
        write_to_cache(&state, "user-10".to_string(), updated).await;

        let cache = state.cache.read().await;
        assert_eq!(cache.len(), DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES);
        assert!(cache.contains_key("user-0"));
        assert_eq!(cache.get("user-10").map(|entry| entry.value.total), Some(42));
    }

    #[tokio::test]
    async fn new_key_at_capacity_evicts_oldest() {
        let state = test_state(Url::parse("https://github.com").expect("valid URL"));
        let now = Instant::now();

        {
            let mut cache = state.cache.write().await;

            for index in 0..DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES {
                let key = format!("user-{index}");
                cache.insert(
                    key.clone(),
                    CacheEntry {
                        created_at: now + Duration::from_secs(index as u64),
                        expires_at: now + Duration::from_secs(10_000),
                        value: sample_calendar(&key),
                    },
                );
            }
        }

        write_to_cache(&state, "newcomer".to_string(), sample_calendar("newcomer")).await;

        let cache = state.cache.read().await;
        assert_eq!(cache.len(), DEFAULT_CONTRIBUTIONS_CACHE_MAX_ENTRIES);
        assert!(!cache.contains_key("user-0"));
        assert!(cache.contains_key("newcomer"));
    }

    #[tokio::test]
    async fn fetch_reads_calendar_from_upstream() {
        let upstream = spawn_upstream(StatusCode::OK, SAMPLE_CONTRIBUTIONS_HTML).await;
        let state = test_state(upstream);

        let calendar = fetch_contribution_calendar(&state, "octocat")
            .await
            .map_err(|failure| failure.reason)
            .expect("calendar fetched");

        assert_eq!(calendar.total, 1234);
        assert_eq!(calendar.day_count(), 4);
    }

    #[tokio::test]
    async fn missing_upstream_user_is_bad_gateway() {
        let upstream = spawn_upstream(StatusCode::NOT_FOUND, "Not Found").await;
        let state = test_state(upstream);

        let failure = fetch_contribution_calendar(&state, "ghost")
            .await
            .err()
            .expect("fetch fails");

        assert_eq!(failure.status, StatusCode::BAD_GATEWAY);
        assert_eq!(failure.reason, "unknown user");
    }

    #[tokio::test]
    async fn page_without_calendar_is_bad_gateway() {
        let upstream = spawn_upstream(StatusCode::OK, "<html><body>maintenance</body></html>").await;
        let state = test_state(upstream);

        let failure = fetch_contribution_calendar(&state, "octocat")
            .await
            .err()
            .expect("fetch fails");

        assert_eq!(failure.status, StatusCode::BAD_GATEWAY);
        assert_eq!(failure.reason, "no contribution data found");
    }
}
