//! Incident scenarios and the ordered catalog they are played from.

use crate::error::{CatalogError, EngineError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Built-in scenario recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// All systems nominal
    Normal,

    /// Unauthorized access attempt and mitigation
    HackerAttempt,

    /// Quantum key regeneration and authentication
    Authentication,

    /// Satellite link loss and recovery
    SatelliteFailure,

    /// Quantum key compromise and BB84 regeneration
    QuantumBreach,

    /// Traffic surge and load balancing
    NetworkOverload,
}

impl ScenarioKind {
    /// Returns all built-in scenarios in default playback order.
    pub fn all() -> Vec<ScenarioKind> {
        vec![
            ScenarioKind::Normal,
            ScenarioKind::HackerAttempt,
            ScenarioKind::Authentication,
            ScenarioKind::SatelliteFailure,
            ScenarioKind::QuantumBreach,
            ScenarioKind::NetworkOverload,
        ]
    }

    /// Returns the catalog id.
    pub fn id(&self) -> &'static str {
        match self {
            ScenarioKind::Normal => "normal",
            ScenarioKind::HackerAttempt => "hacker_attempt",
            ScenarioKind::Authentication => "authentication",
            ScenarioKind::SatelliteFailure => "satellite_failure",
            ScenarioKind::QuantumBreach => "quantum_breach",
            ScenarioKind::NetworkOverload => "network_overload",
        }
    }

    /// Returns the display name shown on the dashboard.
    pub fn title(&self) -> &'static str {
        match self {
            ScenarioKind::Normal => "Normal Operations",
            ScenarioKind::HackerAttempt => "Hacker Attempt",
            ScenarioKind::Authentication => "Quantum Authentication",
            ScenarioKind::SatelliteFailure => "Satellite Failure",
            ScenarioKind::QuantumBreach => "Quantum Security Breach",
            ScenarioKind::NetworkOverload => "Network Overload",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioKind::Normal => "All systems operating at optimal performance",
            ScenarioKind::HackerAttempt => "Simulating unauthorized access and threat mitigation",
            ScenarioKind::Authentication => "Performing quantum key regeneration and authentication",
            ScenarioKind::SatelliteFailure => "Simulating satellite connection issues and recovery",
            ScenarioKind::QuantumBreach => "Simulating quantum key compromise and regeneration",
            ScenarioKind::NetworkOverload => "Simulating high traffic and load balancing",
        }
    }

    /// Default playback length in seconds.
    pub fn default_duration_secs(&self) -> u32 {
        match self {
            ScenarioKind::Normal => 20,
            ScenarioKind::HackerAttempt => 15,
            ScenarioKind::Authentication => 10,
            ScenarioKind::SatelliteFailure => 25,
            ScenarioKind::QuantumBreach => 22,
            ScenarioKind::NetworkOverload => 20,
        }
    }

    /// Link status the ground station reports while this scenario runs.
    pub fn link_status(&self) -> &'static str {
        match self {
            ScenarioKind::Normal | ScenarioKind::Authentication => "active",
            ScenarioKind::HackerAttempt => "under_attack",
            ScenarioKind::SatelliteFailure => "limited_connection",
            ScenarioKind::QuantumBreach => "compromised",
            ScenarioKind::NetworkOverload => "degraded",
        }
    }

    /// Returns the catalog entry for this scenario with its default duration.
    pub fn definition(&self) -> ScenarioDefinition {
        ScenarioDefinition {
            id: self.id().to_string(),
            name: self.title().to_string(),
            description: self.description().to_string(),
            duration_secs: self.default_duration_secs(),
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for ScenarioKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(ScenarioKind::Normal),
            "hacker_attempt" | "hackerattempt" | "hacker" => Ok(ScenarioKind::HackerAttempt),
            "authentication" | "auth" => Ok(ScenarioKind::Authentication),
            "satellite_failure" | "satellitefailure" => Ok(ScenarioKind::SatelliteFailure),
            "quantum_breach" | "quantumbreach" => Ok(ScenarioKind::QuantumBreach),
            "network_overload" | "networkoverload" => Ok(ScenarioKind::NetworkOverload),
            _ => Err(EngineError::unknown(s)),
        }
    }
}

/// One entry of the playback catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "duration", alias = "durationSeconds")]
    pub duration_secs: u32,
}

impl ScenarioDefinition {
    /// Returns the built-in recipe this entry maps to, if any.
    pub fn kind(&self) -> Option<ScenarioKind> {
        self.id.parse().ok()
    }
}

/// Where a catalog entry stands relative to the sequential timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Active,
    Completed,
}

/// Ordered, validated list of scenarios.
///
/// Order is significant: sequential playback resolves the active scenario
/// from cumulative duration offsets, so entries are never re-sorted.
/// A catalog is never empty and never holds a zero-length scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioDefinition>,
    total_secs: u64,
}

impl ScenarioCatalog {
    /// Validates and wraps a list of scenarios.
    pub fn new(scenarios: Vec<ScenarioDefinition>) -> Result<Self, CatalogError> {
        if scenarios.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for scenario in &scenarios {
            if scenario.duration_secs == 0 {
                return Err(CatalogError::ZeroDuration(scenario.id.clone()));
            }
            if !seen.insert(scenario.id.as_str()) {
                return Err(CatalogError::DuplicateId(scenario.id.clone()));
            }
        }

        let total_secs = scenarios.iter().map(|s| s.duration_secs as u64).sum();
        Ok(Self { scenarios, total_secs })
    }

    /// Parses a JSON array of scenario definitions.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let scenarios: Vec<ScenarioDefinition> = serde_json::from_str(json)?;
        Self::new(scenarios)
    }

    /// Reads a JSON catalog from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Looks up a scenario by id.
    pub fn get(&self, id: &str) -> Result<&ScenarioDefinition, EngineError> {
        self.scenarios
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| EngineError::unknown(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Index of a scenario in playback order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.scenarios.iter().position(|s| s.id == id)
    }

    /// Cumulative start offset (seconds) of the entry at `index`.
    pub fn offset_of(&self, index: usize) -> u64 {
        self.scenarios
            .iter()
            .take(index)
            .map(|s| s.duration_secs as u64)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.scenarios.iter()
    }

    pub fn as_slice(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Sum of all durations: the length of one sequential run.
    pub fn total_duration(&self) -> u64 {
        self.total_secs
    }

    pub fn first(&self) -> &ScenarioDefinition {
        &self.scenarios[0]
    }

    pub fn last(&self) -> &ScenarioDefinition {
        &self.scenarios[self.scenarios.len() - 1]
    }

    /// Status of every entry at `elapsed_ticks` into a sequential run.
    ///
    /// Nothing is active before the first tick or when no sequential run is
    /// in progress.
    pub fn progress(
        &self,
        elapsed_ticks: u64,
        sequential_active: bool,
    ) -> Vec<(&ScenarioDefinition, ScenarioStatus)> {
        let mut start = 0u64;
        self.scenarios
            .iter()
            .map(|scenario| {
                let end = start + scenario.duration_secs as u64;
                let status = if !sequential_active || elapsed_ticks == 0 {
                    ScenarioStatus::Pending
                } else if elapsed_ticks >= end {
                    ScenarioStatus::Completed
                } else if elapsed_ticks >= start {
                    ScenarioStatus::Active
                } else {
                    ScenarioStatus::Pending
                };
                start = end;
                (scenario, status)
            })
            .collect()
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        let scenarios: Vec<ScenarioDefinition> =
            ScenarioKind::all().iter().map(|k| k.definition()).collect();
        let total_secs = scenarios.iter().map(|s| s.duration_secs as u64).sum();
        Self { scenarios, total_secs }
    }
}

/// Formats seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_integrity() {
        let catalog = ScenarioCatalog::default();

        assert_eq!(catalog.len(), 6);
        assert!(catalog.iter().all(|s| s.duration_secs > 0));
        assert_eq!(catalog.total_duration(), 112);
    }

    #[test]
    fn test_default_catalog_order() {
        let catalog = ScenarioCatalog::default();
        let ids: Vec<&str> = catalog.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "normal",
                "hacker_attempt",
                "authentication",
                "satellite_failure",
                "quantum_breach",
                "network_overload",
            ]
        );
    }

    #[test]
    fn test_lookup() {
        let catalog = ScenarioCatalog::default();

        assert_eq!(catalog.get("quantum_breach").unwrap().name, "Quantum Security Breach");
        assert_eq!(
            catalog.get("wormhole"),
            Err(EngineError::UnknownScenario("wormhole".to_string()))
        );
        assert!(catalog.contains("satellite_failure"));
        assert!(!catalog.contains("wormhole"));
        assert!(!catalog.contains("Satellite Failure"));
        assert_eq!(catalog.position("authentication"), Some(2));
        assert_eq!(catalog.offset_of(2), 35);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in ScenarioKind::all() {
            assert_eq!(kind.id().parse::<ScenarioKind>().unwrap(), kind);
        }
        assert_eq!("Hacker-Attempt".parse::<ScenarioKind>().unwrap(), ScenarioKind::HackerAttempt);
        assert!("chaos".parse::<ScenarioKind>().is_err());
    }

    #[test]
    fn test_catalog_rejects_invalid() {
        assert!(matches!(ScenarioCatalog::new(vec![]), Err(CatalogError::Empty)));

        let mut zero = ScenarioKind::Normal.definition();
        zero.duration_secs = 0;
        assert!(matches!(
            ScenarioCatalog::new(vec![zero]),
            Err(CatalogError::ZeroDuration(id)) if id == "normal"
        ));

        let dup = vec![ScenarioKind::Normal.definition(), ScenarioKind::Normal.definition()];
        assert!(matches!(
            ScenarioCatalog::new(dup),
            Err(CatalogError::DuplicateId(id)) if id == "normal"
        ));
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {"id": "normal", "name": "Calm", "durationSecs": 5},
            {"id": "drill", "name": "Drill", "description": "custom", "duration": 7}
        ]"#;
        let catalog = ScenarioCatalog::from_json(json).unwrap();

        assert_eq!(catalog.total_duration(), 12);
        assert_eq!(catalog.last().id, "drill");
        assert_eq!(catalog.get("drill").unwrap().kind(), None);
        assert_eq!(catalog.first().kind(), Some(ScenarioKind::Normal));

        assert!(matches!(ScenarioCatalog::from_json("{"), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_progress_statuses() {
        let catalog = ScenarioCatalog::default();

        let idle = catalog.progress(30, false);
        assert!(idle.iter().all(|(_, s)| *s == ScenarioStatus::Pending));

        let at_start = catalog.progress(0, true);
        assert!(at_start.iter().all(|(_, s)| *s == ScenarioStatus::Pending));

        let statuses: Vec<ScenarioStatus> =
            catalog.progress(20, true).into_iter().map(|(_, s)| s).collect();
        assert_eq!(statuses[0], ScenarioStatus::Completed);
        assert_eq!(statuses[1], ScenarioStatus::Active);
        assert!(statuses[2..].iter().all(|s| *s == ScenarioStatus::Pending));

        let done = catalog.progress(112, true);
        assert!(done.iter().all(|(_, s)| *s == ScenarioStatus::Completed));
    }

    #[test]
    fn test_link_status() {
        assert_eq!(ScenarioKind::Normal.link_status(), "active");
        assert_eq!(ScenarioKind::HackerAttempt.link_status(), "under_attack");
        assert_eq!(ScenarioKind::QuantumBreach.link_status(), "compromised");
        assert_eq!(ScenarioKind::NetworkOverload.link_status(), "degraded");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(112), "1:52");
    }
}
