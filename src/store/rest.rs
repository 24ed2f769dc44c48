use crate::cert::{
    today, Certificate, CertificateFields, CertificateId, DeliveryInfo, NewCertificate,
};
use crate::store::CertificateBackend;
use crate::utils::errors::{RegistryError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_TABLE: &str = "certificates";

/// HTTP client shared by hosted backends: 30 s timeout, rustls with native roots
pub fn create_http_client() -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .use_rustls_tls()
        .build()
}

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    pub api_key: String,
    pub table: String,
}

/// Row shape of the hosted `certificates` table
#[derive(Debug, Deserialize)]
struct CertificateRow {
    id: Value,
    no: String,
    description: String,
    #[serde(default)]
    part_no: Option<String>,
    #[serde(default)]
    serial_no: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_date: Option<NaiveDate>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    delivered: Option<bool>,
    #[serde(default)]
    delivery_info: Option<DeliveryInfo>,
}

impl CertificateRow {
    fn into_certificate(self) -> Certificate {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };

        // Older rows only carry the server timestamp
        let created_date = self.created_date.unwrap_or_else(|| {
            self.created_at
                .as_deref()
                .and_then(|ts| ts.get(..10))
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
                .unwrap_or_else(|| {
                    tracing::warn!("Certificate {id} has no creation date, using today");
                    today()
                })
        });

        Certificate {
            id,
            no: self.no,
            description: self.description,
            part_no: self.part_no.unwrap_or_default(),
            serial_no: self.serial_no.unwrap_or_default(),
            status: self
                .status
                .unwrap_or_else(|| crate::cert::model::DEFAULT_STATUS.to_string()),
            created_date,
            delivered: self.delivered.unwrap_or(false),
            delivery_info: self.delivery_info,
        }
        .normalized()
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    no: &'a str,
    description: &'a str,
    part_no: &'a str,
    serial_no: &'a str,
    status: &'a str,
    created_date: NaiveDate,
    delivered: bool,
    delivery_info: Option<&'a DeliveryInfo>,
}

impl<'a> From<&'a NewCertificate> for InsertRow<'a> {
    fn from(cert: &'a NewCertificate) -> Self {
        Self {
            no: &cert.fields.no,
            description: &cert.fields.description,
            part_no: &cert.fields.part_no,
            serial_no: &cert.fields.serial_no,
            status: &cert.fields.status,
            created_date: cert.created_date,
            delivered: false,
            delivery_info: None,
        }
    }
}

/// Hosted database backend speaking the PostgREST dialect
pub struct RestBackend {
    client: Client,
    config: RestConfig,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(RegistryError::Config(
                "Hosted backend URL is not configured".to_string(),
            ));
        }
        let client = create_http_client()?;
        Ok(Self { client, config })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| RegistryError::Connection(format!("Request failed: {e}")))?;

        tracing::debug!("Response status: {}", response.status());
        Self::handle_response(response).await
    }

    /// Map HTTP failures onto the registry error taxonomy
    async fn handle_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or(error_text);

        match status {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(message)),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(RegistryError::Validation(message))
            }
            _ => Err(RegistryError::Connection(format!("{status} - {message}"))),
        }
    }

    /// PATCH rows matching `filter` and return how many were changed
    async fn patch(&self, filter: String, body: Value) -> Result<usize> {
        let request = self
            .client
            .patch(self.table_url())
            .query(&[("id", filter)])
            .header("Prefer", "return=representation")
            .json(&body);

        let rows: Vec<Value> = self.send(request).await?.json().await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl CertificateBackend for RestBackend {
    async fn list(&self) -> Result<Vec<Certificate>> {
        let url = self.table_url();
        tracing::debug!("Fetching certificates from {}", url);

        let request = self
            .client
            .get(&url)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let rows: Vec<CertificateRow> = self.send(request).await?.json().await?;

        Ok(rows.into_iter().map(CertificateRow::into_certificate).collect())
    }

    async fn insert(&self, certificates: Vec<NewCertificate>) -> Result<Vec<CertificateId>> {
        let rows: Vec<InsertRow<'_>> = certificates.iter().map(InsertRow::from).collect();

        let request = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&rows);
        let created: Vec<CertificateRow> = self.send(request).await?.json().await?;

        tracing::info!("Inserted {} certificates", created.len());
        Ok(created
            .into_iter()
            .map(|row| row.into_certificate().id)
            .collect())
    }

    async fn update_fields(&self, id: &str, fields: &CertificateFields) -> Result<()> {
        let body = json!({
            "no": fields.no,
            "description": fields.description,
            "part_no": fields.part_no,
            "serial_no": fields.serial_no,
            "status": fields.status,
        });

        match self.patch(format!("eq.{id}"), body).await? {
            0 => Err(RegistryError::NotFound(id.to_string())),
            _ => Ok(()),
        }
    }

    async fn update_delivery(
        &self,
        id: &str,
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()> {
        let body = json!({ "delivered": delivered, "delivery_info": info });

        match self.patch(format!("eq.{id}"), body).await? {
            0 => Err(RegistryError::NotFound(id.to_string())),
            _ => Ok(()),
        }
    }

    async fn update_delivery_bulk(
        &self,
        ids: &[CertificateId],
        delivered: bool,
        info: Option<&DeliveryInfo>,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let body = json!({ "delivered": delivered, "delivery_info": info });
        let changed = self.patch(format!("in.({})", ids.join(",")), body).await?;

        if changed < ids.len() {
            tracing::warn!(
                "Bulk delivery matched {} of {} certificates",
                changed,
                ids.len()
            );
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let rows: Vec<Value> = self.send(request).await?.json().await?;

        if rows.is_empty() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
