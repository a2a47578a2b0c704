use crate::config::ConfigError;
use crate::transition::RouteBound;

use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parameters of the matching engine.
///
/// Keys are read in camelCase, and any key which is absent takes its default:
///
/// ```json
/// {
///   "searchRadiusMeters": 50.0,
///   "gpsSigmaMeters": 10.0,
///   "transitionDecayConstant": 5.0,
///   "beamWidth": 5,
///   "routeBoundFactor": 4.0,
///   "minRouteBoundMeters": 2000.0
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchConfig {
    /// Segments further than this from an observation are not candidates.
    pub search_radius_meters: f64,

    /// Standard deviation of the cross-track GPS error.
    pub gps_sigma_meters: f64,

    /// Sharpness of the penalty on route-distance mismatch. Smaller
    /// values penalise detours more heavily.
    pub transition_decay_constant: f64,

    /// States retained per observation.
    pub beam_width: usize,

    /// The route search between two observations extends to this
    /// multiple of the distance between them.
    pub route_bound_factor: f64,

    /// The route search always extends at least this far.
    pub min_route_bound_meters: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            search_radius_meters: 50.0,
            gps_sigma_meters: 10.0,
            transition_decay_constant: 5.0,
            beam_width: 5,
            route_bound_factor: 4.0,
            min_route_bound_meters: 2_000.0,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("searchRadiusMeters", self.search_radius_meters),
            ("gpsSigmaMeters", self.gps_sigma_meters),
            ("transitionDecayConstant", self.transition_decay_constant),
            ("routeBoundFactor", self.route_bound_factor),
            ("minRouteBoundMeters", self.min_route_bound_meters),
        ];

        if let Some((key, value)) = positive
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0))
        {
            return Err(ConfigError::NotPositive { key, value });
        }

        if self.beam_width == 0 {
            return Err(ConfigError::ZeroBeamWidth);
        }

        if self.route_bound_factor < 1.0 {
            return Err(ConfigError::RouteBoundFactor(self.route_bound_factor));
        }

        Ok(())
    }

    pub fn route_bound(&self) -> RouteBound {
        RouteBound {
            factor: self.route_bound_factor,
            minimum: self.min_route_bound_meters,
        }
    }

    /// Decodes and validates a configuration document.
    pub fn from_reader(reader: impl Read) -> Result<MatchConfig, ConfigError> {
        let config: MatchConfig = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<MatchConfig, ConfigError> {
        let file = File::open(path)?;
        MatchConfig::from_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn defaults_are_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn reads_camel_case_keys_with_defaults() {
        let document = r#"{ "searchRadiusMeters": 25.0, "beamWidth": 8 }"#;
        let config = MatchConfig::from_reader(Cursor::new(document)).expect("must decode");

        assert_eq!(config.search_radius_meters, 25.0);
        assert_eq!(config.beam_width, 8);
        assert_eq!(config.gps_sigma_meters, 10.0);
        assert_eq!(config.min_route_bound_meters, 2_000.0);
    }

    #[test]
    fn rejects_non_positive_values() {
        let config = MatchConfig {
            gps_sigma_meters: 0.0,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                key: "gpsSigmaMeters",
                ..
            })
        ));

        let config = MatchConfig {
            search_radius_meters: f64::INFINITY,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                key: "searchRadiusMeters",
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_beam() {
        let config = MatchConfig {
            beam_width: 0,
            ..MatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBeamWidth)));
    }

    #[test]
    fn rejects_route_bound_shorter_than_straightline() {
        let config = MatchConfig {
            route_bound_factor: 0.5,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RouteBoundFactor(_))
        ));
    }
}
