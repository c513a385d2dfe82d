//! Resource fetching
//!
//! The [`Fetcher`] retrieves config references, certificate authorities and
//! provider payloads. Its timeouts and trust roots are reconfigured as more
//! specific config layers become known, always before the fetches that
//! depend on them.

pub mod data_url;
pub mod verify;

use crate::IgnitionError;
use crate::config::{CaReference, ConfigReference, MAX_VERSION, Timeouts};
use flate2::read::GzDecoder;
use reqwest::{Certificate, Client, StatusCode};
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Total timeout applied when neither flags nor configs set one
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Default time to wait for response headers, in seconds
pub const DEFAULT_RESPONSE_HEADERS_TIMEOUT: u64 = 10;

/// Headers sent with every config fetch
pub fn config_headers() -> Vec<(String, String)> {
    vec![
        ("Accept-Encoding".to_string(), "identity".to_string()),
        (
            "Accept".to_string(),
            format!(
                "application/vnd.coreos.ignition+json;version={}, */*;q=0.1",
                MAX_VERSION
            ),
        ),
    ]
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
    /// `gzip` or none
    pub compression: Option<String>,
}

impl FetchOptions {
    /// Options for fetching a referenced config
    pub fn for_config(reference: &ConfigReference) -> Self {
        let mut headers = config_headers();
        headers.extend(
            reference
                .http_headers
                .iter()
                .map(|h| (h.name.clone(), h.value.clone().unwrap_or_default())),
        );
        Self {
            headers,
            compression: reference.compression.clone(),
        }
    }
}

/// HTTP and data URL fetcher with reconfigurable timeouts and trust roots
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    defaults: Timeouts,
    timeouts: Timeouts,
    certificates: Vec<Vec<u8>>,
}

impl Fetcher {
    /// Create a fetcher whose total timeout defaults to `total`
    pub fn new(total: Duration) -> Result<Self, IgnitionError> {
        Self::with_defaults(Timeouts {
            http_response_headers: Some(DEFAULT_RESPONSE_HEADERS_TIMEOUT),
            http_total: Some(total.as_secs()),
        })
    }

    /// Create a fetcher with explicit default timeouts
    pub fn with_defaults(defaults: Timeouts) -> Result<Self, IgnitionError> {
        let client = build_client(&defaults, &[])?;
        Ok(Self {
            client,
            timeouts: defaults.clone(),
            defaults,
            certificates: Vec::new(),
        })
    }

    /// Timeouts currently in effect
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Number of extra trust roots currently in effect
    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }

    /// Fetch the resource at `url` into memory, decompressing if requested
    pub async fn fetch_to_buffer(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<Vec<u8>, IgnitionError> {
        let raw = match url.scheme() {
            "http" | "https" => self.fetch_http(url, options).await?,
            "data" => data_url::decode(url.as_str())?,
            other => return Err(IgnitionError::UnsupportedScheme(other.to_string())),
        };

        decompress(raw, options.compression.as_deref())
    }

    async fn fetch_http(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<Vec<u8>, IgnitionError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url.clone());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IgnitionError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(IgnitionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Reconfigure timeouts and trust roots.
    ///
    /// Each CA is fetched with the current configuration and verified before
    /// the client is rebuilt. The new CA list replaces the previous one; unset
    /// timeouts fall back to the defaults this fetcher was created with.
    pub async fn update_timeouts_and_cas(
        &mut self,
        timeouts: &Timeouts,
        cas: &[CaReference],
    ) -> Result<(), IgnitionError> {
        let mut certificates = Vec::with_capacity(cas.len());
        for ca in cas {
            certificates.push(self.fetch_certificate(ca).await?);
        }

        let timeouts = Timeouts {
            http_response_headers: timeouts
                .http_response_headers
                .or(self.defaults.http_response_headers),
            http_total: timeouts.http_total.or(self.defaults.http_total),
        };
        self.client = build_client(&timeouts, &certificates)?;
        debug!(
            "fetcher updated: timeouts {:?}, {} certificate authorities",
            timeouts,
            certificates.len()
        );
        self.timeouts = timeouts;
        self.certificates = certificates;
        Ok(())
    }

    /// Rewrite CAs as inline `data:` URLs so they no longer need fetching
    pub async fn inline_certificate_authorities(
        &self,
        cas: &[CaReference],
    ) -> Result<Vec<CaReference>, IgnitionError> {
        let mut inlined = Vec::with_capacity(cas.len());
        for ca in cas {
            let pem = self.fetch_certificate(ca).await?;
            inlined.push(CaReference {
                source: data_url::encode(&pem),
                verification: ca.verification.clone(),
            });
        }
        Ok(inlined)
    }

    async fn fetch_certificate(&self, ca: &CaReference) -> Result<Vec<u8>, IgnitionError> {
        let url = Url::parse(&ca.source)?;
        let data = self.fetch_to_buffer(&url, &FetchOptions::default()).await?;
        verify::assert_valid(&ca.verification, &data)?;

        if !String::from_utf8_lossy(&data).contains("-----BEGIN CERTIFICATE-----") {
            return Err(IgnitionError::Certificate(
                "certificate authority is not a PEM certificate".to_string(),
            ));
        }
        Ok(data)
    }
}

fn build_client(timeouts: &Timeouts, certificates: &[Vec<u8>]) -> Result<Client, IgnitionError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeouts.http_total.filter(|s| *s > 0) {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    // reqwest has no response-header deadline; bound connection setup instead
    if let Some(secs) = timeouts.http_response_headers.filter(|s| *s > 0) {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    for pem in certificates {
        let certificate =
            Certificate::from_pem(pem).map_err(|e| IgnitionError::Certificate(e.to_string()))?;
        builder = builder.add_root_certificate(certificate);
    }
    builder
        .build()
        .map_err(|e| IgnitionError::Certificate(format!("failed to build HTTP client: {}", e)))
}

fn decompress(raw: Vec<u8>, compression: Option<&str>) -> Result<Vec<u8>, IgnitionError> {
    match compression {
        None | Some("") => Ok(raw),
        Some("gzip") => {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| IgnitionError::Compression(format!("gzip: {}", e)))?;
            Ok(decompressed)
        }
        Some(other) => Err(IgnitionError::Compression(format!(
            "unsupported compression {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    const TEST_CA: &str = "-----BEGIN CERTIFICATE-----
MIIBjTCCATOgAwIBAgIUbEsooWF3tkaNmj1zBmU1if9UONgwCgYIKoZIzj0EAwIw
GzEZMBcGA1UEAwwQaWduaXRpb24tdGVzdC1jYTAgFw0yNjEwMTYxMTU2MzVaGA8y
MTI2MDkyMjExNTYzNVowGzEZMBcGA1UEAwwQaWduaXRpb24tdGVzdC1jYTBZMBMG
ByqGSM49AgEGCCqGSM49AwEHA0IABNwNHGxzXRX+UBA2mdUxOC3msbwVocPAyNJZ
CcxodPIXhEPfGOV2uJ3BIHCRD9JOfS0vW39aL65I7pG9I6bTqnWjUzBRMB0GA1Ud
DgQWBBQY9Dzru1pfZaZ818/qwS8zLy/1bDAfBgNVHSMEGDAWgBQY9Dzru1pfZaZ8
18/qwS8zLy/1bDAPBgNVHRMBAf8EBTADAQH/MAoGCCqGSM49BAMCA0gAMEUCIQD+
RMoVDI5XlgzBX6XeQzvlGV/W4PnBpMz/S9GV1gbHcAIgaZOZsFkCnwe3gu9HRgkB
kydf/ibgUDf9jwtcJptTv0o=
-----END CERTIFICATE-----
";

    fn fetcher() -> Fetcher {
        Fetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_data_url() {
        let url = Url::parse("data:,hello").unwrap();
        let data = fetcher()
            .fetch_to_buffer(&url, &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let url = Url::parse("tftp://10.0.0.1/config.ign").unwrap();
        let err = fetcher()
            .fetch_to_buffer(&url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IgnitionError::UnsupportedScheme(s) if s == "tftp"));
    }

    #[tokio::test]
    async fn test_gzip_decompression() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"ignition\":{}}").unwrap();
        let url = Url::parse(&data_url::encode(&encoder.finish().unwrap())).unwrap();

        let options = FetchOptions {
            compression: Some("gzip".to_string()),
            ..Default::default()
        };
        let data = fetcher().fetch_to_buffer(&url, &options).await.unwrap();
        assert_eq!(data, b"{\"ignition\":{}}");
    }

    #[test]
    fn test_config_options_include_custom_headers() {
        let mut reference = ConfigReference::new("https://example.com/config.ign");
        reference.http_headers.push(crate::config::HttpHeader {
            name: "Authorization".to_string(),
            value: Some("Bearer t".to_string()),
        });
        let options = FetchOptions::for_config(&reference);
        assert!(options.headers.iter().any(|(n, v)| n == "Accept-Encoding" && v == "identity"));
        assert!(options.headers.iter().any(|(n, v)| n == "Authorization" && v == "Bearer t"));
    }

    #[tokio::test]
    async fn test_update_timeouts_falls_back_to_defaults() {
        let mut fetcher = fetcher();
        fetcher
            .update_timeouts_and_cas(
                &Timeouts {
                    http_response_headers: None,
                    http_total: Some(30),
                },
                &[],
            )
            .await
            .unwrap();
        assert_eq!(fetcher.timeouts().http_total, Some(30));
        assert_eq!(
            fetcher.timeouts().http_response_headers,
            Some(DEFAULT_RESPONSE_HEADERS_TIMEOUT)
        );

        fetcher
            .update_timeouts_and_cas(&Timeouts::default(), &[])
            .await
            .unwrap();
        assert_eq!(fetcher.timeouts().http_total, Some(120));
    }

    #[tokio::test]
    async fn test_update_with_inline_ca() {
        let mut fetcher = fetcher();
        let ca = CaReference {
            source: data_url::encode(TEST_CA.as_bytes()),
            verification: crate::config::Verification {
                hash: Some(format!("sha512-{}", verify::sha512_hex(TEST_CA.as_bytes()))),
            },
        };
        fetcher
            .update_timeouts_and_cas(&Timeouts::default(), &[ca])
            .await
            .unwrap();
        assert_eq!(fetcher.certificate_count(), 1);

        // The list replaces, it does not accumulate
        fetcher
            .update_timeouts_and_cas(&Timeouts::default(), &[])
            .await
            .unwrap();
        assert_eq!(fetcher.certificate_count(), 0);
    }

    #[tokio::test]
    async fn test_ca_must_be_pem() {
        let mut fetcher = fetcher();
        let ca = CaReference::new("data:,not-a-certificate");
        let err = fetcher
            .update_timeouts_and_cas(&Timeouts::default(), &[ca])
            .await
            .unwrap_err();
        assert!(matches!(err, IgnitionError::Certificate(_)));
        assert_eq!(fetcher.certificate_count(), 0);
    }

    #[tokio::test]
    async fn test_ca_verification_mismatch() {
        let mut fetcher = fetcher();
        let ca = CaReference {
            source: data_url::encode(TEST_CA.as_bytes()),
            verification: crate::config::Verification {
                hash: Some(format!("sha512-{}", verify::sha512_hex(b"other"))),
            },
        };
        let err = fetcher
            .update_timeouts_and_cas(&Timeouts::default(), &[ca])
            .await
            .unwrap_err();
        assert!(matches!(err, IgnitionError::Verification { .. }));
    }

    #[tokio::test]
    async fn test_inline_certificate_authorities() {
        let ca = CaReference::new(format!(
            "data:,{}",
            TEST_CA.replace('\n', "%0A").replace('+', "%2B").replace('/', "%2F")
        ));
        let inlined = fetcher()
            .inline_certificate_authorities(std::slice::from_ref(&ca))
            .await
            .unwrap();
        assert_eq!(inlined.len(), 1);
        assert!(inlined[0].source.starts_with("data:;base64,"));
        assert_eq!(
            data_url::decode(&inlined[0].source).unwrap(),
            TEST_CA.as_bytes()
        );
    }
}
