//! Drive scenarios for deterministic simulation testing.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// DV-001: Ignition on, drive with a lead, ignition off
    Drive,

    /// DV-002: Parked device sleeps, then wakes on a tap
    ParkedTap,

    /// DV-003: Panda disconnects mid-drive
    PandaDropout,

    /// DV-004: Dimmed onroad screen turns off, an alert wakes it
    AlertWake,

    /// DV-005: Ten hours onroad under full daylight
    LongHaul,

    /// DV-006: Preview mode goes onroad without ignition
    PreviewMode,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Drive,
            ScenarioId::ParkedTap,
            ScenarioId::PandaDropout,
            ScenarioId::AlertWake,
            ScenarioId::LongHaul,
            ScenarioId::PreviewMode,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Drive => "drive",
            ScenarioId::ParkedTap => "parked_tap",
            ScenarioId::PandaDropout => "panda_dropout",
            ScenarioId::AlertWake => "alert_wake",
            ScenarioId::LongHaul => "long_haul",
            ScenarioId::PreviewMode => "preview_mode",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Drive => "Onroad/offroad edges, trajectories, lead marker and engaged status",
            ScenarioId::ParkedTap => "Offroad display sleeps after 30s and wakes on a device tap",
            ScenarioId::PandaDropout => "Panda type falls back to unknown after 5s without ignition loss",
            ScenarioId::AlertWake => "Auto screen off dims and sleeps the display, an alert forces a wake",
            ScenarioId::LongHaul => "Anti burn-in cap holds brightness at 70% after 10 hours onroad",
            ScenarioId::PreviewMode => "Device start without ignition goes onroad only in preview mode",
        }
    }

    /// Shortest simulated time, in seconds, the scenario needs.
    pub fn min_duration_secs(&self) -> f64 {
        match self {
            ScenarioId::Drive => 30.0,
            ScenarioId::ParkedTap => 45.0,
            ScenarioId::PandaDropout => 15.0,
            ScenarioId::AlertWake => 100.0,
            ScenarioId::LongHaul => 60.0,
            ScenarioId::PreviewMode => 5.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" | "dv-001" => Ok(ScenarioId::Drive),
            "parked_tap" | "parkedtap" | "dv-002" => Ok(ScenarioId::ParkedTap),
            "panda_dropout" | "pandadropout" | "dv-003" => Ok(ScenarioId::PandaDropout),
            "alert_wake" | "alertwake" | "dv-004" => Ok(ScenarioId::AlertWake),
            "long_haul" | "longhaul" | "dv-005" => Ok(ScenarioId::LongHaul),
            "preview_mode" | "previewmode" | "dv-006" => Ok(ScenarioId::PreviewMode),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("DV-004".parse::<ScenarioId>(), Ok(ScenarioId::AlertWake));
        assert_eq!("LongHaul".parse::<ScenarioId>(), Ok(ScenarioId::LongHaul));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }
}
