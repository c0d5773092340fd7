//! Username/password login through the SOAP partner `login` call.
//!
//! The security token is appended to the password, as the platform expects
//! for logins from outside a trusted IP range. The returned session id is
//! used as the bearer token for REST and Bulk 2.0 calls.

use quick_xml::escape::{escape, unescape};
use tracing::{debug, instrument};

use tally_sf_client::{ClientConfig, SfHttpClient, DEFAULT_API_VERSION};

use crate::credentials::SalesforceCredentials;
use crate::error::{Error, ErrorKind, Result};

/// Login host prefix for production orgs (`https://login.salesforce.com`).
pub const DEFAULT_LOGIN_DOMAIN: &str = "login";

/// Username, password, security token and login domain for one org.
///
/// `domain` is the host prefix: `login` for production, `test` for sandboxes,
/// or a My Domain prefix such as `acme.my`.
#[derive(Clone)]
pub struct LoginConfig {
    pub username: String,
    password: String,
    security_token: String,
    pub domain: String,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .field("domain", &self.domain)
            .finish()
    }
}

impl LoginConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        let domain = domain.into();
        Self {
            username: username.into(),
            password: password.into(),
            security_token: security_token.into(),
            domain: if domain.trim().is_empty() {
                DEFAULT_LOGIN_DOMAIN.to_string()
            } else {
                domain.trim().to_string()
            },
        }
    }

    /// Read `SF_USERNAME`, `SF_PASSWORD`, `SF_SECURITY_TOKEN` and `SF_DOMAIN`.
    ///
    /// The security token may be empty; the domain defaults to `login`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| Error::new(ErrorKind::EnvVar(name.to_string())))
        };

        Ok(Self::new(
            required("SF_USERNAME")?,
            required("SF_PASSWORD")?,
            lookup("SF_SECURITY_TOKEN").unwrap_or_default(),
            lookup("SF_DOMAIN").unwrap_or_default(),
        ))
    }

    /// `https://{domain}.salesforce.com/services/Soap/u/{version}`
    pub fn soap_login_url(&self, api_version: &str) -> String {
        format!(
            "https://{}.salesforce.com/services/Soap/u/{}",
            self.domain, api_version
        )
    }

    fn envelope(&self) -> String {
        let password = format!("{}{}", self.password, self.security_token);
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <env:Header>
    <urn:CallOptions>
      <urn:client>{client}</urn:client>
    </urn:CallOptions>
  </env:Header>
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{username}</n1:username>
      <n1:password>{password}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
            client = escape(tally_sf_client::USER_AGENT),
            username = escape(self.username.as_str()),
            password = escape(password.as_str()),
        )
    }
}

/// Performs the SOAP `login` call and returns session credentials.
#[derive(Debug, Clone)]
pub struct PasswordLogin {
    http: SfHttpClient,
    api_version: String,
    login_url: Option<String>,
}

impl PasswordLogin {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::from_http(SfHttpClient::new(config)?))
    }

    /// Reuse a connection pool that will also serve the API calls.
    pub fn from_http(http: SfHttpClient) -> Self {
        Self {
            http,
            api_version: DEFAULT_API_VERSION.to_string(),
            login_url: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Post to this endpoint instead of the one derived from the domain.
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    pub fn http(&self) -> &SfHttpClient {
        &self.http
    }

    /// Log in and return credentials for the org's instance.
    #[instrument(skip(self, config), fields(username = %config.username, domain = %config.domain))]
    pub async fn login(&self, config: &LoginConfig) -> Result<SalesforceCredentials> {
        if config.username.is_empty() {
            return Err(Error::new(ErrorKind::InvalidCredentials(
                "username must not be empty".to_string(),
            )));
        }

        let url = self
            .login_url
            .clone()
            .unwrap_or_else(|| config.soap_login_url(&self.api_version));

        let request = self
            .http
            .post(url)
            .xml(config.envelope())
            .header("SOAPAction", "login");

        // Faults arrive as HTTP 500 with a SOAP body, so read the body first.
        let response = self.http.execute_unchecked(&request).await?;
        let status = response.status();
        let body = response.text().await?;

        if let Some((code, message)) = parse_soap_fault(&body) {
            return Err(Error::new(ErrorKind::LoginFailed { code, message }));
        }

        if !(200..300).contains(&status) {
            return Err(Error::new(ErrorKind::Http(format!(
                "login returned HTTP {status}"
            ))));
        }

        let session_id = extract_element(&body, "sessionId")
            .ok_or_else(|| Error::new(ErrorKind::InvalidResponse("missing sessionId".to_string())))?;
        let server_url = extract_element(&body, "serverUrl")
            .ok_or_else(|| Error::new(ErrorKind::InvalidResponse("missing serverUrl".to_string())))?;

        let instance_url = instance_url_from(&server_url)?;
        debug!(instance_url = %instance_url, "Login succeeded");

        Ok(SalesforceCredentials::new(
            instance_url,
            session_id,
            self.api_version.clone(),
        ))
    }
}

/// Scheme, host and port of the SOAP `serverUrl`.
fn instance_url_from(server_url: &str) -> Result<String> {
    let parsed = url::Url::parse(server_url)?;
    if parsed.host_str().is_none() {
        return Err(Error::new(ErrorKind::InvalidResponse(
            "serverUrl has no host".to_string(),
        )));
    }
    Ok(parsed.origin().ascii_serialization())
}

fn parse_soap_fault(xml: &str) -> Option<(String, String)> {
    let code = extract_element(xml, "faultcode")?;
    let message =
        extract_element(xml, "faultstring").unwrap_or_else(|| "Unknown error".to_string());
    Some((code, message))
}

/// Text of the first `<tag>` element, with or without a namespace prefix.
fn extract_element(xml: &str, tag: &str) -> Option<String> {
    let end_tag = format!("</{}>", tag);
    let start_patterns = [
        format!("<{}>", tag),
        format!("<sf:{}>", tag),
        format!("<soapenv:{}>", tag),
    ];

    for start in &start_patterns {
        if let Some(start_idx) = xml.find(start.as_str()) {
            let rest = &xml[start_idx + start.len()..];
            let end_idx = rest.find(end_tag.as_str()).or_else(|| {
                let prefix = &start[1..start.len() - tag.len() - 1];
                rest.find(format!("</{}{}>", prefix, tag).as_str())
            })?;
            let raw = &rest[..end_idx];
            return Some(unescape(raw).map(|s| s.into_owned()).unwrap_or_else(|_| raw.to_string()));
        }
    }
    None
}
