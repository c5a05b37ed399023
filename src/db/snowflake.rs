//! Snowflake warehouse driver.
//!
//! Talks to the REST endpoints the official Snowflake connectors use:
//! password login, statement execution, result chunk download, and session
//! close. Results are requested in JSON format and typed from the column
//! metadata Snowflake returns alongside the rows.

use super::{
    ColumnInfo, Connector, Cursor, DriverError, DriverResult, QueryResult, Row, Value,
    WarehouseConnection,
};
use crate::config::ConnectionParams;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for a single HTTP request.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Delay between polls while a statement is still running.
const POLL_INTERVAL_MS: u64 = 500;

/// Snowflake response codes meaning "statement still executing".
const QUERY_IN_PROGRESS_CODES: [&str; 2] = ["333333", "333334"];

/// Leading bytes of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const LOGIN_PATH: &str = "/session/v1/login-request";
const QUERY_PATH: &str = "/queries/v1/query-request";
const SESSION_PATH: &str = "/session";
const HOST_SUFFIX: &str = ".snowflakecomputing.com";

const CLIENT_APP_ID: &str = "threshold-monitor";
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Opens Snowflake sessions over HTTPS.
///
/// The HTTP client is built when a connection is opened, so client setup
/// failures are reported as connection failures.
#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    timeout: Duration,
    base_url: Option<Url>,
}

impl SnowflakeConnector {
    /// Creates a connector with the default request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a connector with the given per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            base_url: None,
        }
    }

    /// Sends every request to `base_url` instead of the account's own host.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn client(&self) -> DriverResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DriverError::new(format!("Failed to create HTTP client: {e}")))
    }

    fn session_url(&self, account: &str) -> DriverResult<Url> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => account_url(account),
        }
    }
}

impl Default for SnowflakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `https://<account>.snowflakecomputing.com` from an account identifier.
///
/// Identifiers that already carry the host suffix are used as-is.
fn account_url(account: &str) -> DriverResult<Url> {
    let account = account.trim();
    let host = if account.ends_with(HOST_SUFFIX) {
        account.to_string()
    } else {
        format!("{account}{HOST_SUFFIX}")
    };
    Url::parse(&format!("https://{host}"))
        .map_err(|e| DriverError::new(format!("Invalid account identifier '{account}': {e}")))
}

/// Returns the account name sent in the login body (the identifier up to the first dot).
fn account_name(account: &str) -> &str {
    let account = account.trim();
    account.split('.').next().unwrap_or(account)
}

#[async_trait]
impl Connector for SnowflakeConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> DriverResult<Box<dyn WarehouseConnection>> {
        let client = self.client()?;
        let base = self.session_url(&params.account)?;
        let mut url = endpoint(&base, LOGIN_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("request_id", &uuid::Uuid::new_v4().to_string());
            query.append_pair("warehouse", &params.warehouse);
            query.append_pair("roleName", &params.role);
            if let Some(database) = &params.database {
                query.append_pair("databaseName", database);
            }
            if let Some(schema) = &params.schema {
                query.append_pair("schemaName", schema);
            }
        }

        let body = LoginRequest {
            data: LoginData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: CLIENT_APP_VERSION,
                account_name: account_name(&params.account),
                login_name: &params.user,
                password: &params.password,
                session_parameters: HashMap::from([("QUERY_RESULT_FORMAT", "JSON")]),
            },
        };

        debug!("Logging in to {}", base);
        let response: SnowflakeResponse<LoginResponseData> =
            send(client.post(url).json(&body)).await?;
        let data = response.into_data("Login failed")?;

        Ok(Box::new(SnowflakeConnection {
            session: Arc::new(Session {
                client,
                base,
                token: data.token,
                sequence: AtomicU64::new(0),
            }),
            closed: false,
        }))
    }
}

/// State shared by a connection and its cursors.
struct Session {
    client: Client,
    base: Url,
    token: String,
    sequence: AtomicU64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base", &self.base.as_str())
            .field("token", &"***")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Snowflake Token=\"{}\"", self.token))
            .header("Accept", "application/json")
    }

    async fn run_statement(&self, sql: &str) -> DriverResult<QueryResponseData> {
        let mut url = endpoint(&self.base, QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("requestId", &uuid::Uuid::new_v4().to_string());

        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            is_internal: false,
        };

        let mut response: SnowflakeResponse<QueryResponseData> =
            send(self.authorized(self.client.post(url).json(&body))).await?;

        while response.is_in_progress() {
            let result_path = response
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .ok_or_else(|| {
                    DriverError::new("Statement still running but no result URL was returned")
                })?;
            debug!("Statement still running, polling {}", result_path);
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            let url = endpoint(&self.base, &result_path)?;
            response = send(self.authorized(self.client.get(url))).await?;
        }

        response.into_data("Query failed")
    }

    async fn download_chunk(
        &self,
        chunk: &ChunkInfo,
        headers: &HashMap<String, String>,
    ) -> DriverResult<Vec<Vec<Option<String>>>> {
        let mut request = self.client.get(&chunk.url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| DriverError::new(format!("Failed to download result chunk: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::new(format!(
                "Result chunk download failed ({status})"
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| DriverError::new(format!("Failed to read result chunk: {e}")))?;

        parse_chunk(&decode_chunk(&body)?)
    }

    async fn delete(&self) -> DriverResult<()> {
        let mut url = endpoint(&self.base, SESSION_PATH)?;
        url.query_pairs_mut().append_pair("delete", "true");
        let response: SnowflakeResponse<serde_json::Value> =
            send(self.authorized(self.client.post(url))).await?;
        if response.success {
            Ok(())
        } else {
            Err(response.failure("Session close failed"))
        }
    }
}

/// An open Snowflake session.
struct SnowflakeConnection {
    session: Arc<Session>,
    closed: bool,
}

#[async_trait]
impl WarehouseConnection for SnowflakeConnection {
    async fn cursor(&mut self) -> DriverResult<Box<dyn Cursor>> {
        if self.closed {
            return Err(DriverError::new("Connection is closed"));
        }
        Ok(Box::new(SnowflakeCursor {
            session: Arc::clone(&self.session),
            pending: None,
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.delete().await
    }
}

/// Holds the response of the last executed statement until it is fetched.
struct SnowflakeCursor {
    session: Arc<Session>,
    pending: Option<QueryResponseData>,
}

#[async_trait]
impl Cursor for SnowflakeCursor {
    async fn execute(&mut self, sql: &str) -> DriverResult<()> {
        self.pending = Some(self.session.run_statement(sql).await?);
        Ok(())
    }

    async fn fetch_all(&mut self) -> DriverResult<QueryResult> {
        let data = self
            .pending
            .take()
            .ok_or_else(|| DriverError::new("No statement has been executed"))?;

        if let Some(format) = &data.query_result_format {
            if !format.eq_ignore_ascii_case("json") {
                return Err(DriverError::new(format!(
                    "Unsupported result format '{format}'"
                )));
            }
        }

        let headers = data.chunk_download_headers();
        let mut rowset = data.rowset;
        for chunk in &data.chunks {
            debug!("Downloading result chunk of {} rows", chunk.row_count);
            rowset.extend(self.session.download_chunk(chunk, &headers).await?);
        }

        Ok(convert_rowset(&data.rowtype, rowset))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.pending = None;
        Ok(())
    }
}

fn endpoint(base: &Url, path: &str) -> DriverResult<Url> {
    base.join(path)
        .map_err(|e| DriverError::new(format!("Invalid endpoint '{path}': {e}")))
}

/// Sends a request and decodes the standard Snowflake response envelope.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> DriverResult<SnowflakeResponse<T>> {
    let response = request
        .send()
        .await
        .map_err(|e| DriverError::new(format!("Request failed: {e}")))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DriverError::new(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(DriverError::new(format!("HTTP {status}: {body}")));
    }

    serde_json::from_str(&body)
        .map_err(|e| DriverError::new(format!("Failed to parse response: {e}")))
}

/// Returns the chunk body as text, gunzipping it when it is compressed.
fn decode_chunk(body: &[u8]) -> DriverResult<String> {
    if !body.starts_with(&GZIP_MAGIC) {
        return String::from_utf8(body.to_vec())
            .map_err(|e| DriverError::new(format!("Result chunk is not UTF-8: {e}")));
    }

    let mut text = String::new();
    GzDecoder::new(body)
        .read_to_string(&mut text)
        .map_err(|e| DriverError::new(format!("Failed to decompress result chunk: {e}")))?;
    Ok(text)
}

/// Chunk bodies are comma-separated row arrays without the enclosing brackets.
fn parse_chunk(body: &str) -> DriverResult<Vec<Vec<Option<String>>>> {
    let trimmed = body.trim();
    let wrapped = if trimmed.starts_with("[[") || trimmed == "[]" {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    };
    serde_json::from_str(&wrapped)
        .map_err(|e| DriverError::new(format!("Failed to parse result chunk: {e}")))
}

fn convert_rowset(rowtype: &[RowType], rowset: Vec<Vec<Option<String>>>) -> QueryResult {
    let columns = rowtype
        .iter()
        .map(|col| ColumnInfo::new(&col.name, &col.data_type))
        .collect();

    let rows: Vec<Row> = rowset
        .into_iter()
        .map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, cell)| match (cell, rowtype.get(i)) {
                    (None, _) => Value::Null,
                    (Some(text), Some(col)) => convert_value(text, col),
                    (Some(text), None) => Value::String(text),
                })
                .collect()
        })
        .collect();

    QueryResult::with_data(columns, rows)
}

/// Converts a JSON-format cell to a typed value based on its column type.
fn convert_value(text: String, col: &RowType) -> Value {
    match col.data_type.to_lowercase().as_str() {
        "fixed" if col.scale.unwrap_or(0) == 0 => text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::String(text)),
        "fixed" | "real" => text
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::String(text)),
        "boolean" => match text.as_str() {
            "1" | "true" | "TRUE" => Value::Bool(true),
            "0" | "false" | "FALSE" => Value::Bool(false),
            _ => Value::String(text),
        },
        _ => Value::String(text),
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    data: LoginData<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
    session_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    is_internal: bool,
}

/// Envelope shared by every Snowflake REST response.
#[derive(Debug, Deserialize)]
struct SnowflakeResponse<T> {
    data: Option<T>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    success: bool,
}

impl<T> SnowflakeResponse<T> {
    fn is_in_progress(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| QUERY_IN_PROGRESS_CODES.contains(&code))
    }

    fn failure(&self, context: &str) -> DriverError {
        let message = self.message.as_deref().unwrap_or("no message");
        match &self.code {
            Some(code) => DriverError::new(format!("{context}: {message} (code {code})")),
            None => DriverError::new(format!("{context}: {message}")),
        }
    }

    fn into_data(self, context: &str) -> DriverResult<T> {
        if !self.success {
            return Err(self.failure(context));
        }
        match self.data {
            Some(data) => Ok(data),
            None => Err(DriverError::new(format!("{context}: response carried no data"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponseData {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
    #[serde(default)]
    chunks: Vec<ChunkInfo>,
    #[serde(default)]
    chunk_headers: HashMap<String, String>,
    #[serde(default)]
    qrmk: Option<String>,
    #[serde(default)]
    query_result_format: Option<String>,
    #[serde(default)]
    get_result_url: Option<String>,
}

impl QueryResponseData {
    /// Headers required to download result chunks from cloud storage.
    fn chunk_download_headers(&self) -> HashMap<String, String> {
        if !self.chunk_headers.is_empty() {
            return self.chunk_headers.clone();
        }
        match &self.qrmk {
            Some(key) => HashMap::from([
                (
                    "x-amz-server-side-encryption-customer-algorithm".to_string(),
                    "AES256".to_string(),
                ),
                (
                    "x-amz-server-side-encryption-customer-key".to_string(),
                    key.clone(),
                ),
            ]),
            None => HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    scale: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkInfo {
    url: String,
    #[serde(default)]
    row_count: usize,
}
