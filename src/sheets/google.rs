use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tokio::sync::Mutex;
use url::Url;

use super::{a1_range, AppendReceipt, ExpenseRow, SheetError, SheetSink, HEADER_ROW};
use crate::config::SheetsConfig;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the token actually expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Google Sheets v4 sink authenticated with a service account
pub struct GoogleSheetsSink {
    client: reqwest::Client,
    spreadsheet_id: String,
    api_base: Url,
    token_uri: String,
    client_email: String,
    signing_key: EncodingKey,
    key_id: Option<String>,
    token: Mutex<Option<AccessToken>>,
    /// Tab titles known to exist; the lock also serialises tab creation
    known_tabs: Mutex<HashSet<String>>,
}

impl GoogleSheetsSink {
    pub fn from_config(config: &SheetsConfig) -> Result<Self, SheetError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or_else(|| SheetError::Credentials("no spreadsheet id configured".to_string()))?;

        let raw = std::fs::read_to_string(&config.credentials_path).map_err(|e| {
            SheetError::Credentials(format!("cannot read {}: {}", config.credentials_path, e))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| SheetError::Credentials(format!("malformed key file: {}", e)))?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetError::Credentials(format!("bad private key: {}", e)))?;

        let api_base = Url::parse(&config.api_base)
            .map_err(|e| SheetError::Credentials(format!("bad api base {}: {}", config.api_base, e)))?;
        let token_uri = config
            .token_uri
            .clone()
            .or(key.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(
            "Google Sheets sink for spreadsheet {} as {}",
            spreadsheet_id,
            key.client_email
        );

        Ok(Self {
            client,
            spreadsheet_id,
            api_base,
            token_uri,
            client_email: key.client_email,
            signing_key,
            key_id: key.private_key_id,
            token: Mutex::new(None),
            known_tabs: Mutex::new(HashSet::new()),
        })
    }

    /// Cached bearer token, exchanged again shortly before expiry
    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| SheetError::Auth(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Auth(format!("{}: {}", status, body)));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetError::Auth(format!("unreadable token response: {}", e)))?;

        tracing::debug!("Obtained spreadsheet access token valid for {}s", token.expires_in);
        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(token.access_token)
    }

    /// `{api_base}/spreadsheets/...`, each entry pushed as one encoded segment
    fn spreadsheet_url(&self, extra: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("spreadsheets");
            if extra.is_empty() {
                segments.push(&self.spreadsheet_id);
            } else {
                segments.extend(extra);
            }
        }
        url
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, SheetError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(SheetError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SheetError::InvalidResponse(e.to_string()))
    }

    async fn tab_titles(&self) -> Result<Vec<String>, SheetError> {
        let mut url = self.spreadsheet_url(&[]);
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let body = self.send_json(self.client.get(url)).await?;

        let titles = body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(titles)
    }

    async fn add_tab(&self, title: &str) -> Result<(), SheetError> {
        let url = self.spreadsheet_url(&[&format!("{}:batchUpdate", self.spreadsheet_id)]);
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send_json(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn append_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<String, SheetError> {
        let mut url = self.spreadsheet_url(&[
            &self.spreadsheet_id,
            "values",
            &format!("{}:append", range),
        ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = self
            .send_json(self.client.post(url).json(&json!({ "values": values })))
            .await?;
        body["updates"]["updatedRange"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SheetError::InvalidResponse("append response has no updatedRange".to_string()))
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsSink {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn ensure_site_tab(&self, site_name: &str) -> Result<(), SheetError> {
        let mut known = self.known_tabs.lock().await;
        if known.contains(site_name) {
            return Ok(());
        }

        known.extend(self.tab_titles().await?);
        if known.contains(site_name) {
            return Ok(());
        }

        self.add_tab(site_name).await?;
        let header = HEADER_ROW.iter().map(|h| h.to_string()).collect();
        self.append_values(&a1_range(site_name, "A1"), vec![header]).await?;
        known.insert(site_name.to_string());
        tracing::info!("Created spreadsheet tab '{}'", site_name);
        Ok(())
    }

    async fn append_expense(&self, site_name: &str, row: &ExpenseRow) -> Result<AppendReceipt, SheetError> {
        self.ensure_site_tab(site_name).await?;

        match self.append_values(&a1_range(site_name, "A1"), vec![row.cells()]).await {
            Ok(updated_range) => Ok(AppendReceipt {
                site_name: site_name.to_string(),
                updated_range,
            }),
            Err(e) => {
                // The tab may have been removed by hand; look it up again next time
                if matches!(e, SheetError::Api { .. }) {
                    self.known_tabs.lock().await.remove(site_name);
                }
                Err(e)
            }
        }
    }

    async fn revert(&self, receipt: &AppendReceipt) -> Result<(), SheetError> {
        let url = self.spreadsheet_url(&[
            &self.spreadsheet_id,
            "values",
            &format!("{}:clear", receipt.updated_range),
        ]);
        self.send_json(self.client.post(url).json(&json!({}))).await?;
        tracing::warn!("Cleared spreadsheet range {}", receipt.updated_range);
        Ok(())
    }
}
