//! Incident data model and Statuspage v2 payload decoding.
use std::{borrow::Cow, fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, de::Error as _};
use url::Url;

/// A monitored Statuspage feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Human-readable provider name
    pub name: String,
    /// Incidents endpoint
    pub feed_url: Url,
    /// Delay between poll cycles
    pub poll_interval: Duration,
}

impl Source {
    /// Creates a new source.
    pub fn new(name: impl Into<String>, feed_url: Url, poll_interval: Duration) -> Self {
        Self { name: name.into(), feed_url, poll_interval }
    }
}

/// Lifecycle status of an incident update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum UpdateStatus {
    /// Cause is being investigated.
    Investigating,
    /// Cause has been identified.
    Identified,
    /// A fix is in place and being watched.
    Monitoring,
    /// Incident is over.
    Resolved,
    /// Post-incident report published.
    Postmortem,
    /// Maintenance is scheduled.
    Scheduled,
    /// Maintenance is in progress.
    InProgress,
    /// Maintenance is being verified.
    Verifying,
    /// Maintenance is completed.
    Completed,
    /// Any status this crate does not know about, kept verbatim.
    Other(String),
}

impl From<String> for UpdateStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "investigating" => Self::Investigating,
            "identified" => Self::Identified,
            "monitoring" => Self::Monitoring,
            "resolved" => Self::Resolved,
            "postmortem" => Self::Postmortem,
            "scheduled" => Self::Scheduled,
            "in_progress" => Self::InProgress,
            "verifying" => Self::Verifying,
            "completed" => Self::Completed,
            _ => Self::Other(raw),
        }
    }
}

impl UpdateStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Investigating => "investigating",
            Self::Identified => "identified",
            Self::Monitoring => "monitoring",
            Self::Resolved => "resolved",
            Self::Postmortem => "postmortem",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Verifying => "verifying",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }

    /// Wire status with its first letter upper-cased and the rest lower-cased.
    pub fn label(&self) -> String {
        let mut chars = self.as_str().chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
        })
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in an incident's update history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentUpdate {
    /// Parent incident ID
    pub incident_id: String,
    /// Server-assigned update ID, opaque
    pub update_id: String,
    /// Lifecycle status at the time of the update
    pub status: UpdateStatus,
    /// Impact of the parent incident
    pub impact: String,
    /// Trimmed human-written message, `None` when blank
    pub body: Option<String>,
    /// When the update was posted
    pub observed_at: DateTime<Utc>,
}

impl IncidentUpdate {
    /// The body, or a summary built from status and impact when the body is blank.
    pub fn description(&self) -> Cow<'_, str> {
        match &self.body {
            Some(body) => Cow::Borrowed(body),
            None => Cow::Owned(format!("{} (impact: {})", self.status.label(), self.impact)),
        }
    }
}

/// An incident as reported by one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    /// Incident ID
    pub incident_id: String,
    /// Incident title
    pub name: String,
    /// Impact level (none, minor, major, critical)
    pub impact: String,
    /// Affected components, or `<source> API` when none are listed
    pub affected_product: String,
    /// Update history in feed order
    pub updates: Vec<IncidentUpdate>,
}

impl Incident {
    /// Update-free view of the incident attached to detected events.
    pub fn summary(&self) -> IncidentSummary {
        IncidentSummary {
            incident_id: self.incident_id.clone(),
            name: self.name.clone(),
            impact: self.impact.clone(),
            affected_product: self.affected_product.clone(),
        }
    }
}

/// Incident metadata without its update history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentSummary {
    /// Incident ID
    pub incident_id: String,
    /// Incident title
    pub name: String,
    /// Impact level
    pub impact: String,
    /// Affected components
    pub affected_product: String,
}

#[derive(Deserialize)]
struct IncidentsDocument {
    incidents: Vec<RawIncident>,
}

#[derive(Deserialize)]
struct RawIncident {
    id: String,
    name: String,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    components: Vec<RawComponent>,
    incident_updates: Vec<RawUpdate>,
}

#[derive(Deserialize)]
struct RawComponent {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawUpdate {
    id: String,
    status: UpdateStatus,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Decode a Statuspage v2 `incidents.json` body.
///
/// Unknown fields are ignored. Missing IDs, names, statuses or update lists fail the
/// whole document, as does an update carrying neither `created_at` nor `updated_at`.
pub fn parse_incidents(source_name: &str, body: &[u8]) -> Result<Vec<Incident>, serde_json::Error> {
    let doc: IncidentsDocument = serde_json::from_slice(body)?;
    doc.incidents.into_iter().map(|raw| normalize(source_name, raw)).collect()
}

fn normalize(source_name: &str, raw: RawIncident) -> Result<Incident, serde_json::Error> {
    let impact = raw.impact.filter(|i| !i.is_empty()).unwrap_or_else(|| "unknown".to_owned());

    let components: Vec<String> = raw
        .components
        .into_iter()
        .filter_map(|c| c.name)
        .filter(|name| !name.trim().is_empty())
        .collect();
    let affected_product = if components.is_empty() {
        format!("{source_name} API")
    } else {
        components.join(", ")
    };

    let updates = raw
        .incident_updates
        .into_iter()
        .map(|u| {
            let observed_at = u.created_at.or(u.updated_at).ok_or_else(|| {
                serde_json::Error::custom(format!(
                    "update {} of incident {} has no timestamp",
                    u.id, raw.id
                ))
            })?;
            Ok(IncidentUpdate {
                incident_id: raw.id.clone(),
                update_id: u.id,
                status: u.status,
                impact: impact.clone(),
                body: u.body.map(|b| b.trim().to_owned()).filter(|b| !b.is_empty()),
                observed_at,
            })
        })
        .collect::<Result<_, serde_json::Error>>()?;

    Ok(Incident { incident_id: raw.id, name: raw.name, impact, affected_product, updates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(status: &str, body: Option<&str>) -> IncidentUpdate {
        IncidentUpdate {
            incident_id: "inc".to_owned(),
            update_id: "upd".to_owned(),
            status: UpdateStatus::from(status.to_owned()),
            impact: "minor".to_owned(),
            body: body.map(str::to_owned),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn description_falls_back_to_status_and_impact() {
        assert_eq!(update("resolved", None).description(), "Resolved (impact: minor)");
        assert_eq!(update("investigating", Some("Elevated errors")).description(), "Elevated errors");
    }

    #[test]
    fn status_labels() {
        assert_eq!(UpdateStatus::Monitoring.label(), "Monitoring");
        assert_eq!(UpdateStatus::InProgress.label(), "In_progress");
        assert_eq!(UpdateStatus::from("degraded".to_owned()), UpdateStatus::Other("degraded".to_owned()));
        assert_eq!(UpdateStatus::from("RECOVERING".to_owned()).label(), "Recovering");
    }

    #[test]
    fn parses_statuspage_document() {
        let body = json!({
            "page": {"id": "p1", "name": "OpenAI"},
            "incidents": [{
                "id": "I1",
                "name": "Elevated error rates",
                "impact": "major",
                "status": "resolved",
                "components": [{"name": "API"}, {"name": "ChatGPT"}],
                "incident_updates": [
                    {"id": "U2", "status": "resolved", "body": "  ", "created_at": "2024-06-04T20:30:00.000Z"},
                    {"id": "U1", "status": "investigating", "body": "Looking into it", "created_at": "2024-06-04T20:00:00.000-07:00", "affected_components": null}
                ]
            }]
        })
        .to_string();

        let incidents = parse_incidents("OpenAI", body.as_bytes()).unwrap();
        assert_eq!(incidents.len(), 1);
        let inc = &incidents[0];
        assert_eq!(inc.incident_id, "I1");
        assert_eq!(inc.affected_product, "API, ChatGPT");
        assert_eq!(inc.updates[0].update_id, "U2");
        assert_eq!(inc.updates[0].body, None);
        assert_eq!(inc.updates[0].impact, "major");
        assert_eq!(inc.updates[1].body.as_deref(), Some("Looking into it"));
        assert_eq!(inc.updates[1].observed_at.to_rfc3339(), "2024-06-05T03:00:00+00:00");
    }

    #[test]
    fn defaults_product_and_impact() {
        let body = json!({
            "incidents": [{
                "id": "I1",
                "name": "Degraded performance",
                "impact": null,
                "incident_updates": [
                    {"id": "U1", "status": "identified", "body": null, "updated_at": "2024-06-04T20:30:00Z"}
                ]
            }]
        })
        .to_string();

        let incidents = parse_incidents("Stripe", body.as_bytes()).unwrap();
        assert_eq!(incidents[0].affected_product, "Stripe API");
        assert_eq!(incidents[0].impact, "unknown");
        assert_eq!(incidents[0].updates[0].description(), "Identified (impact: unknown)");
    }

    #[test]
    fn rejects_missing_required_fields() {
        let missing_id = json!({"incidents": [{"name": "x", "incident_updates": []}]}).to_string();
        assert!(parse_incidents("s", missing_id.as_bytes()).is_err());

        let missing_updates = json!({"incidents": [{"id": "I1", "name": "x"}]}).to_string();
        assert!(parse_incidents("s", missing_updates.as_bytes()).is_err());

        let no_timestamp = json!({
            "incidents": [{"id": "I1", "name": "x", "incident_updates": [{"id": "U1", "status": "resolved"}]}]
        })
        .to_string();
        assert!(parse_incidents("s", no_timestamp.as_bytes()).is_err());

        assert!(parse_incidents("s", b"<html>maintenance</html>").is_err());
        assert!(parse_incidents("s", b"{}").is_err());
    }
}
