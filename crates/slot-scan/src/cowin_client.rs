use std::fmt;
use std::time::Duration;

use chrono::{FixedOffset, Local, NaiveDate, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::scan_types::ScanError;

/// Public CoWIN API host.
pub const COWIN_API_URL: &str = "https://cdn-api.co-vin.in/api";

const CALENDAR_BY_PIN_PATH: &str = "/v2/appointment/sessions/public/calendarByPin";
const CALENDAR_BY_DISTRICT_PATH: &str = "/v2/appointment/sessions/public/calendarByDistrict";
const LIST_STATES_PATH: &str = "/v2/admin/location/states";
const LIST_DISTRICTS_PATH: &str = "/v2/admin/location/districts";

/// CoWIN rejects default client identifiers.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// India Standard Time, UTC+05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// HTTP settings for [`CowinClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without a trailing slash (default: public CoWIN host)
    pub base_url: String,

    /// Connect and request timeout (default: 30 seconds)
    pub timeout: Duration,

    /// Honour `HTTP(S)_PROXY` from the environment (default: true)
    pub use_system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: COWIN_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            use_system_proxy: true,
        }
    }
}

/// Result of a successful round trip to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with its raw body.
    Data(Vec<u8>),
    /// HTTP 401: the API withheld data this time; try again next cycle.
    NoData,
}

impl FetchOutcome {
    /// Decodes the body, passing `NoData` through as `None`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<Option<T>, ScanError> {
        match self {
            FetchOutcome::Data(body) => serde_json::from_slice(&body)
                .map(Some)
                .map_err(|e| ScanError::Parse(format!("Failed to parse response: {}", e))),
            FetchOutcome::NoData => Ok(None),
        }
    }
}

/// Client for the public CoWIN appointment and location APIs
pub struct CowinClient {
    client: Client,
    base_url: String,
}

/// Response of the calendar endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Appointments {
    /// Centers in the order the API returned them
    #[serde(default)]
    pub centers: Vec<Center>,
}

/// A vaccination center and its upcoming sessions
#[derive(Debug, Clone, Deserialize)]
pub struct Center {
    /// Upstream center ID
    #[serde(default)]
    pub center_id: u64,
    /// Center name
    pub name: String,
    /// State name
    #[serde(default)]
    pub state_name: String,
    /// District name
    #[serde(default)]
    pub district_name: String,
    /// Block (sub-district) name
    #[serde(default)]
    pub block_name: String,
    /// Postal code
    #[serde(default)]
    pub pincode: u32,
    /// Whether the center charges for vaccination
    #[serde(default)]
    pub fee_type: FeeType,
    /// Price list for paid centers
    #[serde(default)]
    pub vaccine_fees: Vec<VaccineFee>,
    /// Sessions in the order the API returned them
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Fee type of a center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum FeeType {
    /// Free of charge
    Free,
    /// Paid
    Paid,
    /// Anything the API adds later
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeeType::Free => "Free",
            FeeType::Paid => "Paid",
            FeeType::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Price of one vaccine at a paid center
#[derive(Debug, Clone, Deserialize)]
pub struct VaccineFee {
    /// Vaccine name
    pub vaccine: String,
    /// Price, as the API formats it
    pub fee: String,
}

/// One day of one vaccine at one center
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Upstream session ID
    pub session_id: String,
    /// Session date, `DD-MM-YYYY`
    pub date: String,
    /// Open slots across both doses
    #[serde(default)]
    pub available_capacity: f64,
    /// Open first-dose slots
    #[serde(default, rename = "available_capacity_dose1")]
    pub available_dose1: f64,
    /// Open second-dose slots
    #[serde(default, rename = "available_capacity_dose2")]
    pub available_dose2: f64,
    /// Youngest eligible age
    pub min_age_limit: u32,
    /// Vaccine name
    #[serde(default)]
    pub vaccine: String,
    /// Time windows, e.g. `09:00AM-11:00AM`
    #[serde(default)]
    pub slots: Vec<String>,
}

/// Response of the states endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StateList {
    /// All states and union territories
    #[serde(default)]
    pub states: Vec<State>,
}

/// A state or union territory
#[derive(Debug, Clone, Deserialize)]
pub struct State {
    /// Upstream state ID
    pub state_id: u32,
    /// English name
    pub state_name: String,
}

/// Response of the districts endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictList {
    /// Districts of one state
    #[serde(default)]
    pub districts: Vec<District>,
}

/// A district
#[derive(Debug, Clone, Deserialize)]
pub struct District {
    /// Upstream district ID
    pub district_id: u32,
    /// English name
    pub district_name: String,
}

impl CowinClient {
    /// Create a client for the public CoWIN API
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with explicit HTTP settings
    ///
    /// A zero timeout is rejected with [`ScanError::ConfigError`].
    pub fn with_config(config: ClientConfig) -> Result<Self, ScanError> {
        if config.timeout.is_zero() {
            return Err(ScanError::ConfigError(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("hi_IN"));

        let mut builder = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .timeout(config.timeout);

        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| ScanError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET against `path` and apply the status policy.
    ///
    /// 200 yields the body, 401 yields [`FetchOutcome::NoData`], anything else
    /// is an [`ScanError::Upstream`].
    pub async fn query(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<FetchOutcome, ScanError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to: {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ScanError::Transport(format!("HTTP request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ScanError::Transport(format!("Failed to read body: {}", e)))?;
                Ok(FetchOutcome::Data(body.to_vec()))
            }
            StatusCode::UNAUTHORIZED => {
                debug!("API answered 401 for {}, treating as no data", path);
                Ok(FetchOutcome::NoData)
            }
            status => {
                warn!("API request to {} failed with status {}", path, status);
                Err(ScanError::Upstream {
                    status: status.as_u16(),
                })
            }
        }
    }

    /// Sessions for the seven days starting `date` at one pin code
    pub async fn calendar_by_pin(
        &self,
        pin_code: &str,
        date: &str,
    ) -> Result<FetchOutcome, ScanError> {
        self.query(
            CALENDAR_BY_PIN_PATH,
            &[
                ("pincode", pin_code.to_string()),
                ("date", date.to_string()),
            ],
        )
        .await
    }

    /// Sessions for the seven days starting `date` across one district
    pub async fn calendar_by_district(
        &self,
        district_id: u32,
        date: &str,
    ) -> Result<FetchOutcome, ScanError> {
        self.query(
            CALENDAR_BY_DISTRICT_PATH,
            &[
                ("district_id", district_id.to_string()),
                ("date", date.to_string()),
            ],
        )
        .await
    }

    /// All states, or `None` when the API withheld the list
    pub async fn list_states(&self) -> Result<Option<StateList>, ScanError> {
        self.query(LIST_STATES_PATH, &[]).await?.parse()
    }

    /// Districts of one state, or `None` when the API withheld the list
    pub async fn list_districts(&self, state_id: u32) -> Result<Option<DistrictList>, ScanError> {
        let path = format!("{}/{}", LIST_DISTRICTS_PATH, state_id);
        self.query(&path, &[]).await?.parse()
    }
}

/// Today's date in the API's `DD-MM-YYYY` format, on the Indian calendar.
pub fn today() -> String {
    let date = FixedOffset::east_opt(IST_OFFSET_SECS)
        .map(|ist| Utc::now().with_timezone(&ist).date_naive())
        .unwrap_or_else(|| Local::now().date_naive());
    format_upstream_date(date)
}

/// Formats a date the way the calendar endpoints expect it.
pub fn format_upstream_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}
