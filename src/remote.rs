//! Dokument-Quelle und -Senke über HTTP (Feature `remote`).
//!
//! Blockierender reqwest-Client, kein Retry. Fehler werden mit der rohen
//! Meldung als [`Error::Network`] weitergegeben.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{Error, Result};

/// Request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Maximale Antwortgröße (16 MiB, wie bei lokalen Schemas).
const MAX_RESPONSE_SIZE: u64 = 16 * 1024 * 1024;

fn network(e: reqwest::Error) -> Error {
    Error::Network(e.to_string())
}

fn client() -> Result<Client> {
    Client::builder()
        .timeout(TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(network)
}

/// Lädt den Body einer URL als Text.
pub fn fetch_text(url: &str) -> Result<String> {
    log::debug!("GET {url}");
    let response = client()?.get(url).send().map_err(network)?;
    let response = response.error_for_status().map_err(network)?;
    if let Some(len) = response.content_length()
        && len > MAX_RESPONSE_SIZE
    {
        return Err(Error::Network(format!(
            "response of {len} bytes exceeds limit of {MAX_RESPONSE_SIZE} bytes"
        )));
    }
    response.text().map_err(network)
}

/// Lädt und speichert Dokumente über eine URL-Vorlage mit `{id}`-Platzhalter.
///
/// ```no_run
/// use xsdform::remote::RemoteStore;
///
/// let store = RemoteStore::new("https://archive.example/records/{id}").unwrap();
/// let xml = store.fetch("fonds-42").unwrap();
/// store.store("fonds-42", &xml).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RemoteStore {
    template: String,
    client: Client,
}

impl RemoteStore {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{id}") {
            return Err(Error::InvalidOptions(format!(
                "URL template '{template}' has no {{id}} placeholder"
            )));
        }
        Ok(Self { template, client: client()? })
    }

    /// Konkrete URL für ein Dokument.
    pub fn url_for(&self, id: &str) -> String {
        self.template.replace("{id}", id)
    }

    pub fn fetch(&self, id: &str) -> Result<String> {
        let url = self.url_for(id);
        log::debug!("GET {url}");
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(network)
    }

    /// Sendet das serialisierte XML per POST. Der Server behandelt es opak.
    pub fn store(&self, id: &str, xml: &str) -> Result<()> {
        post_xml(&self.client, &self.url_for(id), xml)
    }
}

/// POST eines XML-Dokuments an eine feste URL.
pub fn post_text(url: &str, xml: &str) -> Result<()> {
    post_xml(&client()?, url, xml)
}

fn post_xml(client: &Client, url: &str, xml: &str) -> Result<()> {
    log::debug!("POST {url} ({} bytes)", xml.len());
    client
        .post(url)
        .header(CONTENT_TYPE, "application/xml; charset=utf-8")
        .body(xml.to_string())
        .send()
        .and_then(|r| r.error_for_status())
        .map(|_| ())
        .map_err(network)
}
