//! HTTP implementation of the case-management gateway.

use async_trait::async_trait;
use moduleo_domain::constants::MAX_RESULTS_PER_FETCH;
use moduleo_domain::{
    AffaireDetail, ApiConfig, DevisDetail, FactureDetail, ModuleoError, Period, PipelineConfig,
    Result, RetryConfig, TempsPasse,
};
use moduleo_core::ModuleoApi;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

use super::wire::{AffaireWire, ChildIdEntry, DevisWire, FactureWire, TempsPasseEntry, TempsPasseWire};

/// Gateway to the Moduleo REST API.
///
/// Owns authentication headers, batching of the `multi` endpoints and
/// the shared retry policy. One instance is built per run from the
/// loaded configuration; there is no process-wide session state.
pub struct ModuleoClient {
    http: HttpClient,
    base_url: String,
    chunk_size: usize,
}

impl ModuleoClient {
    /// Build a client from configuration.
    ///
    /// Credentials are installed as default headers so every request
    /// carries them.
    pub fn new(api: &ApiConfig, retry: &RetryConfig, pipeline: &PipelineConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("ApiKey", header_value("ApiKey", &api.api_key)?);
        headers.insert("SecurityCode", header_value("SecurityCode", &api.security_code)?);

        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(retry.timeout_secs))
            .max_attempts(retry.max_attempts)
            .base_backoff(std::time::Duration::from_secs_f64(retry.backoff_base_secs))
            .user_agent(api.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            chunk_size: pipeline.chunk_size.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let request = self.http.request(Method::GET, url).query(query);
        self.http.send(request).await
    }

    /// GET returning a JSON list; a `null` body counts as empty.
    async fn get_list<W>(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<W>>
    where
        W: DeserializeOwned,
    {
        let response = self.get(url, query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }
        let items: Option<Vec<W>> = response.json().await.map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        Ok(items.unwrap_or_default())
    }

    /// Batched fetch over a `multi` endpoint, comma-joining ids per
    /// chunk and concatenating results. Callers must not rely on
    /// cross-chunk ordering.
    async fn fetch_multi<W, T>(
        &self,
        path: &str,
        ids: &[i64],
        convert: fn(W) -> Option<T>,
    ) -> Result<Vec<T>>
    where
        W: DeserializeOwned,
    {
        let url = self.url(path);
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.chunk_size) {
            let joined =
                chunk.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
            debug!(path, chunk_len = chunk.len(), "batched fetch");
            let items: Vec<W> = self.get_list(&url, &[("ids", joined)]).await?;
            out.extend(items.into_iter().filter_map(convert));
        }
        Ok(out)
    }

    /// Child-id list for one affaire; a 404 means the affaire simply
    /// has no children and yields an empty list.
    async fn fetch_child_ids(&self, path: String, key: &str) -> Result<Vec<i64>> {
        let url = self.url(&path);
        let response = self.get(&url, &[]).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        let entries: Option<Vec<ChildIdEntry>> = response.json().await.map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        Ok(entries.unwrap_or_default().iter().filter_map(|e| e.id(key)).collect())
    }

    fn period_query(period: &Period) -> Vec<(&'static str, String)> {
        vec![
            ("dateMin", period.date_min()),
            ("dateMax", period.date_max()),
            ("nbMaxResultat", MAX_RESULTS_PER_FETCH.to_string()),
        ]
    }
}

#[async_trait]
impl ModuleoApi for ModuleoClient {
    #[instrument(skip(self), fields(date_min = %period.date_min(), date_max = %period.date_max()))]
    async fn fetch_tempspasses(&self, period: &Period) -> Result<Vec<TempsPasse>> {
        let url = self.url("/cogeo/tempspasse");
        let items: Vec<TempsPasseWire> = self.get_list(&url, &Self::period_query(period)).await?;
        Ok(items.into_iter().filter_map(TempsPasseWire::into_domain).collect())
    }

    #[instrument(skip(self, period))]
    async fn fetch_affaire_tempspasses(
        &self,
        affaire_id: i64,
        period: &Period,
    ) -> Result<Vec<TempsPasse>> {
        let url = self.url(&format!("/cogeo/affaire/{affaire_id}/tempspasses"));
        let response = self.get(&url, &Self::period_query(period)).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        let entries: Option<Vec<TempsPasseEntry>> = response.json().await.map_err(|err| {
            let infra: InfraError = err.into();
            ModuleoError::from(infra)
        })?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .filter_map(TempsPasseEntry::into_domain)
            .map(|mut entry| {
                entry.affaire_id = Some(affaire_id);
                entry
            })
            .collect())
    }

    async fn fetch_tempspasses_multi(&self, ids: &[i64]) -> Result<Vec<TempsPasse>> {
        self.fetch_multi("/cogeo/tempspasse/multi", ids, TempsPasseWire::into_domain).await
    }

    async fn fetch_affaires_multi(&self, ids: &[i64]) -> Result<Vec<AffaireDetail>> {
        self.fetch_multi("/cogeo/affaire/multi", ids, AffaireWire::into_domain).await
    }

    async fn fetch_affaire_devis_ids(&self, affaire_id: i64) -> Result<Vec<i64>> {
        self.fetch_child_ids(format!("/cogeo/affaire/{affaire_id}/devis"), "idDevis").await
    }

    async fn fetch_devis_multi(&self, ids: &[i64]) -> Result<Vec<DevisDetail>> {
        self.fetch_multi("/cogeo/devis/multi", ids, DevisWire::into_domain).await
    }

    async fn fetch_affaire_facture_ids(&self, affaire_id: i64) -> Result<Vec<i64>> {
        self.fetch_child_ids(format!("/cogeo/affaire/{affaire_id}/factures"), "idFacture").await
    }

    async fn fetch_factures_multi(&self, ids: &[i64]) -> Result<Vec<FactureDetail>> {
        self.fetch_multi("/cogeo/facture/multi", ids, FactureWire::into_domain).await
    }
}

fn header_value(name: &str, raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|_| ModuleoError::Config(format!("{name} contains invalid header characters")))
}

fn status_error(status: StatusCode, url: &str) -> ModuleoError {
    let message = format!("{url} returned status {status}");
    match status.as_u16() {
        401 | 403 => ModuleoError::Api(message),
        404 => ModuleoError::NotFound(message),
        400..=499 => ModuleoError::InvalidInput(message),
        _ => ModuleoError::Network(message),
    }
}
