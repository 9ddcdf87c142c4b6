use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use notification_services::NotificationError;
use validator::{Validate, ValidationError};

use crate::cowin_client::FeeType;

/// Poll interval used when none is configured.
pub const DEFAULT_SEARCH_INTERVAL_SECS: u64 = 60;

/// Minimum capacity used when none is configured.
pub const DEFAULT_MIN_CAPACITY: u32 = 1;

/// Unvalidated search options, as collected from flags or environment.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_location"))]
pub struct SearchRequest {
    /// Age of the person to be vaccinated
    #[validate(range(min = 1, message = "Age must be a positive number"))]
    pub age: u32,

    /// Postal code to search by
    pub pin_code: Option<String>,

    /// State name to search by, together with `district`
    pub state: Option<String>,

    /// District name to search by, together with `state`
    pub district: Option<String>,

    /// Vaccine preference: `covishield`, `covaxin` or empty for no preference
    pub vaccine: Option<String>,

    /// Fee preference: `free`, `paid` or empty for no preference
    pub fee: Option<String>,

    /// Dose preference: 0 for either, 1 or 2
    pub dose: u8,

    /// Smallest number of open slots worth notifying about
    #[validate(range(min = 1, message = "Minimum capacity must be at least 1"))]
    pub min_capacity: u32,

    /// Seconds between two searches
    #[validate(range(min = 1, message = "Search interval must be at least 1 second"))]
    pub interval_seconds: u64,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            age: 0,
            pin_code: None,
            state: None,
            district: None,
            vaccine: None,
            fee: None,
            dose: 0,
            min_capacity: DEFAULT_MIN_CAPACITY,
            interval_seconds: DEFAULT_SEARCH_INTERVAL_SECS,
        }
    }
}

impl SearchRequest {
    /// Validates the request and turns it into immutable [`SearchCriteria`].
    pub fn into_criteria(self) -> Result<SearchCriteria, ScanError> {
        self.validate()
            .map_err(|e| ScanError::Validation(e.to_string()))?;

        let location = match non_blank(&self.pin_code) {
            Some(pin_code) => SearchLocation::PinCode(pin_code.to_string()),
            None => SearchLocation::District {
                state: non_blank(&self.state).unwrap_or_default().to_string(),
                district: non_blank(&self.district).unwrap_or_default().to_string(),
            },
        };

        Ok(SearchCriteria {
            age: self.age,
            location,
            vaccine: non_blank(&self.vaccine).unwrap_or_default().parse()?,
            fee: non_blank(&self.fee).unwrap_or_default().parse()?,
            dose: DosePreference::try_from(self.dose)?,
            min_capacity: self.min_capacity,
            interval: Duration::from_secs(self.interval_seconds),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn location_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Exactly one of a pin code or a state & district pair must be given.
fn validate_location(request: &SearchRequest) -> Result<(), ValidationError> {
    let pin_code = non_blank(&request.pin_code);
    let state = non_blank(&request.state);
    let district = non_blank(&request.district);

    match (pin_code, state, district) {
        (None, None, None) => Err(location_error(
            "missing_location",
            "Please pass one of the pin code or state & district name combination options",
        )),
        (None, Some(_), None) | (None, None, Some(_)) => Err(location_error(
            "incomplete_location",
            "Missing state or district name option",
        )),
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(location_error(
            "conflicting_location",
            "Pass either a pin code or a state & district name, not both",
        )),
        (Some(pin_code), None, None) => {
            if pin_code.len() == 6 && pin_code.chars().all(|c| c.is_ascii_digit()) {
                Ok(())
            } else {
                Err(location_error(
                    "invalid_pin_code",
                    "Pin code must be a 6 digit number",
                ))
            }
        }
        (None, Some(_), Some(_)) => Ok(()),
    }
}

/// Where to search for appointments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchLocation {
    /// Search a single postal code.
    PinCode(String),
    /// Search a whole district, resolved from names to an ID.
    District {
        /// State name as shown by CoWIN
        state: String,
        /// District name as shown by CoWIN
        district: String,
    },
}

impl fmt::Display for SearchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchLocation::PinCode(pin_code) => write!(f, "pin code {}", pin_code),
            SearchLocation::District { state, district } => {
                write!(f, "district {} ({})", district, state)
            }
        }
    }
}

/// Validated, immutable search criteria.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    age: u32,
    location: SearchLocation,
    vaccine: VaccinePreference,
    fee: FeePreference,
    dose: DosePreference,
    min_capacity: u32,
    interval: Duration,
}

impl SearchCriteria {
    /// Age of the person to be vaccinated.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Where to search.
    pub fn location(&self) -> &SearchLocation {
        &self.location
    }

    /// Vaccine preference.
    pub fn vaccine(&self) -> VaccinePreference {
        self.vaccine
    }

    /// Fee preference.
    pub fn fee(&self) -> FeePreference {
        self.fee
    }

    /// Dose preference.
    pub fn dose(&self) -> DosePreference {
        self.dose
    }

    /// Smallest dose-specific capacity that qualifies a session.
    pub fn min_capacity(&self) -> u32 {
        self.min_capacity
    }

    /// Time between two poll cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Vaccine the user is willing to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VaccinePreference {
    /// No preference
    #[default]
    Any,
    /// COVISHIELD only
    Covishield,
    /// COVAXIN only
    Covaxin,
}

impl VaccinePreference {
    /// Whether a session's vaccine name satisfies this preference.
    pub fn matches(&self, vaccine: &str) -> bool {
        match self {
            VaccinePreference::Any => true,
            VaccinePreference::Covishield => vaccine.eq_ignore_ascii_case("covishield"),
            VaccinePreference::Covaxin => vaccine.eq_ignore_ascii_case("covaxin"),
        }
    }
}

impl FromStr for VaccinePreference {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(VaccinePreference::Any),
            "covishield" => Ok(VaccinePreference::Covishield),
            "covaxin" => Ok(VaccinePreference::Covaxin),
            _ => Err(ScanError::Validation(
                "Invalid vaccine, please use covaxin or covishield".to_string(),
            )),
        }
    }
}

/// Whether the user wants free or paid centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeePreference {
    /// No preference
    #[default]
    Any,
    /// Free centers only
    Free,
    /// Paid centers only
    Paid,
}

impl FeePreference {
    /// Whether a center's fee type satisfies this preference.
    pub fn matches(&self, fee_type: &FeeType) -> bool {
        match self {
            FeePreference::Any => true,
            FeePreference::Free => *fee_type == FeeType::Free,
            FeePreference::Paid => *fee_type == FeeType::Paid,
        }
    }
}

impl FromStr for FeePreference {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(FeePreference::Any),
            "free" => Ok(FeePreference::Free),
            "paid" => Ok(FeePreference::Paid),
            _ => Err(ScanError::Validation(
                "Invalid fee preference, please use free or paid".to_string(),
            )),
        }
    }
}

/// Which dose the user is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DosePreference {
    /// Either dose, judged on total capacity
    #[default]
    Both,
    /// First dose, judged on dose 1 capacity
    First,
    /// Second dose, judged on dose 2 capacity
    Second,
}

impl TryFrom<u8> for DosePreference {
    type Error = ScanError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DosePreference::Both),
            1 => Ok(DosePreference::First),
            2 => Ok(DosePreference::Second),
            _ => Err(ScanError::Validation(
                "Invalid dose preference, please use 1 or 2".to_string(),
            )),
        }
    }
}

/// Custom error type for scan operations
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Bad or contradictory search criteria
    #[error("Validation error: {0}")]
    Validation(String),

    /// State or district name unknown to the API
    #[error("Location not found: {0}")]
    NotFound(String),

    /// Upstream answered with an unexpected status
    #[error("Upstream API returned HTTP {status}")]
    Upstream {
        /// HTTP status code
        status: u16,
    },

    /// Request never completed (timeout, DNS, refused connection)
    #[error("Network error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("Data format error: {0}")]
    Parse(String),

    /// Report could not be delivered
    #[error("Notification failed: {0}")]
    Notify(#[from] NotificationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ScanError {
    /// Fatal errors stop the poll loop; everything else only skips a cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Validation(_) | ScanError::NotFound(_) | ScanError::ConfigError(_)
        )
    }
}
