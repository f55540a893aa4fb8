//! Campaign roster loading.
//!
//! Campaigns are defined in a TOML file (`[[campaigns]]` array of tables)
//! and loaded once at startup. Invalid campaigns are logged and excluded so
//! one bad definition cannot poison every tick; duplicate ids are excluded
//! for the same reason, since claims are keyed by campaign id.

use std::collections::HashSet;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use tracing::warn;

use crate::error::{CampaignError, Result};
use crate::types::Campaign;

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    campaigns: Vec<Campaign>,
}

/// Load and validate the campaign roster at `path`.
///
/// A missing file yields an empty roster rather than an error, so a fresh
/// install starts cleanly and campaigns can be added later.
pub fn load(path: &str) -> Result<Vec<Campaign>> {
    extract(Figment::new().merge(Toml::file(path)))
}

fn extract(figment: Figment) -> Result<Vec<Campaign>> {
    let roster: RosterFile = figment
        .extract()
        .map_err(|e| CampaignError::Roster(e.to_string()))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut campaigns = Vec::with_capacity(roster.campaigns.len());
    for campaign in roster.campaigns {
        if let Err(e) = campaign.validate() {
            warn!(campaign = %campaign.id, error = %e, "invalid campaign excluded from roster");
            continue;
        }
        if !seen.insert(campaign.id.clone()) {
            warn!(campaign = %campaign.id, "duplicate campaign id excluded from roster");
            continue;
        }
        campaigns.push(campaign);
    }
    Ok(campaigns)
}
