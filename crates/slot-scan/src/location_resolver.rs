use std::sync::Arc;

use tracing::{debug, info};

use crate::cowin_client::CowinClient;
use crate::scan_types::ScanError;

/// A name that has been resolved to an upstream ID.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedLocation {
    /// Parent state ID, for districts
    parent_id: Option<u32>,
    /// Name as the user gave it, trimmed and ASCII-lowercased
    name: String,
    id: u32,
}

impl CachedLocation {
    fn matches(&self, parent_id: Option<u32>, name: &str) -> bool {
        self.parent_id == parent_id && self.name == normalize(name)
    }
}

/// Resolved state and district IDs, kept for the lifetime of the resolver.
///
/// Entries never expire.
#[derive(Debug, Clone, Default)]
pub struct LocationCache {
    state: Option<CachedLocation>,
    district: Option<CachedLocation>,
}

impl LocationCache {
    /// Cached state ID, if one was resolved
    pub fn state_id(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.id)
    }

    /// Cached district ID, if one was resolved
    pub fn district_id(&self) -> Option<u32> {
        self.district.as_ref().map(|d| d.id)
    }
}

/// Maps state and district names to the IDs the calendar endpoints need.
pub struct LocationResolver {
    client: Arc<CowinClient>,
    cache: LocationCache,
}

impl LocationResolver {
    /// Create a resolver with an empty cache
    pub fn new(client: Arc<CowinClient>) -> Self {
        Self {
            client,
            cache: LocationCache::default(),
        }
    }

    /// IDs resolved so far
    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    /// Look up a state ID by name (case-insensitive).
    ///
    /// Returns `Ok(None)` when the API withheld the state list this cycle.
    pub async fn resolve_state(&mut self, name: &str) -> Result<Option<u32>, ScanError> {
        if let Some(state) = self.cache.state.as_ref().filter(|s| s.matches(None, name)) {
            debug!("State {} served from cache ({})", name, state.id);
            return Ok(Some(state.id));
        }

        let Some(states) = self.client.list_states().await? else {
            return Ok(None);
        };

        let state_id = states
            .states
            .iter()
            .find(|s| normalize(&s.state_name) == normalize(name))
            .map(|s| s.state_id)
            .ok_or_else(|| ScanError::NotFound(format!("Invalid state name passed: {}", name)))?;

        info!("Resolved state {} to ID {}", name, state_id);
        self.cache.state = Some(CachedLocation {
            parent_id: None,
            name: normalize(name),
            id: state_id,
        });

        Ok(Some(state_id))
    }

    /// Look up a district ID by name within a state (case-insensitive).
    ///
    /// Returns `Ok(None)` when the API withheld the district list this cycle.
    pub async fn resolve_district(
        &mut self,
        state_id: u32,
        name: &str,
    ) -> Result<Option<u32>, ScanError> {
        if let Some(district) = self
            .cache
            .district
            .as_ref()
            .filter(|d| d.matches(Some(state_id), name))
        {
            debug!("District {} served from cache ({})", name, district.id);
            return Ok(Some(district.id));
        }

        let Some(districts) = self.client.list_districts(state_id).await? else {
            return Ok(None);
        };

        let district_id = districts
            .districts
            .iter()
            .find(|d| normalize(&d.district_name) == normalize(name))
            .map(|d| d.district_id)
            .ok_or_else(|| {
                ScanError::NotFound(format!("Invalid district name passed: {}", name))
            })?;

        info!("Resolved district {} to ID {}", name, district_id);
        self.cache.district = Some(CachedLocation {
            parent_id: Some(state_id),
            name: normalize(name),
            id: district_id,
        });

        Ok(Some(district_id))
    }

    /// Resolve a state and district pair to the district ID.
    pub async fn resolve(&mut self, state: &str, district: &str) -> Result<Option<u32>, ScanError> {
        match self.resolve_state(state).await? {
            Some(state_id) => self.resolve_district(state_id, district).await,
            None => Ok(None),
        }
    }
}

/// Folds a name the same way upstream names are compared.
fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
