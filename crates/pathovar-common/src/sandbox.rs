use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::PathovarError;

/// Hosts the pipeline is expected to talk to.
pub const DEFAULT_ALLOWLIST: &[&str] = &[
    "rest.ensembl.org",        // Ensembl lookup / overlap / variation / VEP
    "rest.uniprot.org",        // UniProt features
    "www.ebi.ac.uk",           // PDBe SIFTS
    "data.rcsb.org",           // RCSB entry metadata
    "files.rcsb.org",          // PDB downloads
    "eutils.ncbi.nlm.nih.gov", // ClinVar, PubMed
];

/// An HTTP client that only allows requests to approved domains.
///
/// Every request carries JSON `Accept` and `Content-Type` headers, which the
/// Ensembl POST endpoints require and the other services tolerate.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl HttpClient {
    /// Creates a new client with the default allowlist and a 30 s timeout.
    pub fn new() -> Result<Self, PathovarError> {
        Self::with_allowlist(DEFAULT_ALLOWLIST.iter().copied())
    }

    pub fn with_allowlist<'a, I>(domains: I) -> Result<Self, PathovarError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let allowlist = domains.into_iter().map(str::to_string).collect();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pathovar/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PathovarError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, PathovarError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), PathovarError> {
        if !self.is_allowed(url) {
            return Err(PathovarError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist() {
        let client = HttpClient::new().unwrap();
        assert!(client.is_allowed("https://rest.ensembl.org/vep/human/id"));
        assert!(client.is_allowed("https://files.rcsb.org/download/7KOX.pdb"));
        assert!(!client.is_allowed("https://example.com/"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_subdomain_and_extension() {
        let mut client = HttpClient::with_allowlist(["ebi.ac.uk"]).unwrap();
        assert!(client.is_allowed("https://www.ebi.ac.uk/pdbe/api/mappings/uniprot/7kox"));
        assert!(!client.is_allowed("https://rest.uniprot.org/uniprotkb/P36544.json"));
        client.allow_domain("rest.uniprot.org");
        assert!(client.is_allowed("https://rest.uniprot.org/uniprotkb/P36544.json"));
    }

    #[test]
    fn test_refuses_unlisted_host() {
        let client = HttpClient::new().unwrap();
        let err = client.get("https://evil.example.org/").unwrap_err();
        assert!(matches!(err, PathovarError::Security(_)));
    }
}
