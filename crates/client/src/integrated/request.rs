//! Integrated recipient-mapping request builder
//!
//! Accumulates a batch of recipient records, serializes them into the
//! constrained XML request document, performs one POST per `map` call
//! and reconciles the returned success/error entries back onto the
//! original recipients by the `recipient` correlation key.

use std::collections::BTreeMap;
use std::time::Duration;

use adknowledge_domain::{AdknowledgeError, MappingError, Recipient, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::HttpClient;
use crate::integrated::xml;

/// API version segment of the integrated endpoint path.
const API_VER: &str = "1.3";

/// Request builder for the integrated content-mapping endpoint.
#[derive(Debug)]
pub struct Integrated {
    config: Config,
    recipients: Vec<Recipient>,
    request: String,
    idomain: Option<String>,
    cdomain: Option<String>,
    subid: Option<String>,
    test: bool,
    timeout: Option<Duration>,
    mapped: bool,
}

impl Integrated {
    /// Create an empty mapping request against the configured endpoint.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            recipients: Vec::new(),
            request: String::new(),
            idomain: None,
            cdomain: None,
            subid: None,
            test: false,
            timeout: None,
            mapped: false,
        }
    }

    /// Set the image-domain for the request.
    pub fn idomain(&mut self, idomain: impl Into<String>) -> &mut Self {
        self.idomain = Some(idomain.into());
        self
    }

    /// Set the click-domain for the request.
    pub fn cdomain(&mut self, cdomain: impl Into<String>) -> &mut Self {
        self.cdomain = Some(cdomain.into());
        self
    }

    /// Set both click-domain and image-domain to the same domain name.
    pub fn domain(&mut self, domain: impl Into<String>) -> &mut Self {
        let domain = domain.into();
        self.idomain = Some(domain.clone());
        self.cdomain = Some(domain);
        self
    }

    /// Set the subid for the request.
    pub fn subid(&mut self, subid: impl Into<String>) -> &mut Self {
        self.subid = Some(subid.into());
        self
    }

    /// Set the test flag for the request.
    pub fn test(&mut self, test: bool) -> &mut Self {
        self.test = test;
        self
    }

    /// Bound both connection and total request duration for `map` calls.
    pub fn timeout(&mut self, seconds: u64) -> &mut Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }

    /// Assign the batch of recipients to map and rebuild the XML
    /// request document.
    ///
    /// The assignment is atomic: every recipient is checked for the
    /// three mandatory fields (`recipient`, `list`, `domain`) before
    /// anything is stored or serialized.
    ///
    /// # Errors
    /// `MissingMandatoryField`, naming the offending recipient index and
    /// field; the prior batch and document are untouched in that case.
    pub fn set_recipients(&mut self, recipients: Vec<Recipient>) -> Result<&mut Self> {
        for (index, recipient) in recipients.iter().enumerate() {
            if let Some(field) = recipient.missing_mandatory_field() {
                return Err(AdknowledgeError::MissingMandatoryField(format!(
                    "recipient {index} is missing the {field} field"
                )));
            }
        }
        self.request = xml::write_request(&recipients)?;
        self.recipients = recipients;
        Ok(self)
    }

    /// The recipients queued for mapping, in insertion order.
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Delegated index access into the recipient list.
    pub fn get(&self, index: usize) -> Option<&Recipient> {
        self.recipients.get(index)
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// The serialized XML request document ("" until a batch is assigned).
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Whether a mapping round trip has completed.
    pub fn mapped(&self) -> bool {
        self.mapped
    }

    /// The wire parameter set posted to the integrated API.
    ///
    /// Unset scalars serialize as empty strings, matching the API's
    /// handling of absent values.
    ///
    /// # Errors
    /// `MissingToken` when the configuration carries no token.
    pub fn query_params(&self) -> Result<BTreeMap<String, String>> {
        let token = self.config.require_token()?;
        let mut params = BTreeMap::new();
        params.insert("token".to_owned(), token.to_owned());
        params.insert("idomain".to_owned(), self.idomain.clone().unwrap_or_default());
        params.insert("cdomain".to_owned(), self.cdomain.clone().unwrap_or_default());
        params.insert("request".to_owned(), self.request.clone());
        params.insert("subid".to_owned(), self.subid.clone().unwrap_or_default());
        params.insert("test".to_owned(), if self.test { "1" } else { "0" }.to_owned());
        Ok(params)
    }

    /// Map content for the queued recipients.
    ///
    /// Performs exactly one POST and merges the response in place onto
    /// the stored recipients: success entries set `success = true` and
    /// shallow-merge the response-supplied fields; error entries set
    /// `success = false` and retain the `str`/`num` sub-fields. Response
    /// entries with no matching recipient are dropped and the recipient
    /// left unflagged. Repeat calls re-run the round trip and re-merge.
    ///
    /// # Errors
    /// - `MissingToken` before any network activity when no token is set
    /// - `RemoteApi` on an error response or unparseable envelope
    /// - `Transport` on network/timeout failure
    pub async fn map(&mut self) -> Result<()> {
        let params = self.query_params()?;

        let url = self.config.integrated_url().join(API_VER).map_err(|e| {
            AdknowledgeError::InvalidArgument(format!("invalid integrated endpoint: {e}"))
        })?;

        let mut builder = HttpClient::builder().default_headers(request_headers());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }
        let http = builder.build()?;

        let response = http.send(http.request(Method::POST, url).form(&params)).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "unknown error".to_owned());
            return Err(AdknowledgeError::RemoteApi(format!("HTTP {status}: {text}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AdknowledgeError::Transport(format!("unreadable response body: {e}")))?;
        let result = xml::parse_result(&body)?;
        debug!(
            successes = result.emails.len(),
            errors = result.errors.len(),
            "integrated mapping response parsed"
        );

        self.merge_recipients(result);
        self.mapped = true;
        Ok(())
    }

    /// All successfully mapped recipients, in insertion order.
    ///
    /// Empty until [`map`](Self::map) has completed.
    pub fn mapped_recipients(&self) -> Vec<&Recipient> {
        if !self.mapped {
            return Vec::new();
        }
        self.recipients.iter().filter(|r| r.success == Some(true)).collect()
    }

    /// All errored recipients, in insertion order.
    ///
    /// Empty until [`map`](Self::map) has completed.
    pub fn errored_recipients(&self) -> Vec<&Recipient> {
        if !self.mapped {
            return Vec::new();
        }
        self.recipients.iter().filter(|r| r.success == Some(false)).collect()
    }

    fn merge_recipients(&mut self, result: xml::MappingResult) {
        let mut merged = 0usize;
        for entry in result.emails {
            merged += usize::from(self.merge_success(entry));
        }
        for entry in result.errors {
            merged += usize::from(self.merge_error(entry));
        }
        info!(merged, total = self.recipients.len(), "merged mapping results onto recipients");
    }

    /// First recipient matching the entry's correlation key wins; an
    /// unmatched entry is dropped and the recipients left unflagged.
    fn find_by_correlation_key(&mut self, entry: &BTreeMap<String, String>) -> Option<&mut Recipient> {
        let key = match entry.get("recipient") {
            Some(key) => key.as_str(),
            None => {
                warn!("response entry carries no recipient key; dropping");
                return None;
            }
        };
        let found = self.recipients.iter_mut().find(|r| r.recipient.as_deref() == Some(key));
        if found.is_none() {
            warn!(recipient = key, "no matching recipient for response entry; dropping");
        }
        found
    }

    fn merge_success(&mut self, entry: BTreeMap<String, String>) -> bool {
        match self.find_by_correlation_key(&entry) {
            Some(recipient) => {
                recipient.success = Some(true);
                recipient.mapped.extend(entry);
                true
            }
            None => false,
        }
    }

    fn merge_error(&mut self, entry: BTreeMap<String, String>) -> bool {
        match self.find_by_correlation_key(&entry) {
            Some(recipient) => {
                recipient.success = Some(false);
                recipient.error = Some(MappingError {
                    str: entry.get("str").cloned().unwrap_or_default(),
                    num: entry.get("num").cloned().unwrap_or_default(),
                });
                true
            }
            None => false,
        }
    }
}

fn request_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Accepts", HeaderValue::from_static("application/xml"));
    // Accept-Encoding is left to reqwest: it advertises gzip/deflate and
    // decodes the response body transparently. Setting the header by hand
    // would switch that decoding off.
    headers
}
