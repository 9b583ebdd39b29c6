use crate::model::ShiftType;
use crate::scheduler::SolveError;
use serde::{Deserialize, Serialize};

/// Borne inclusive `[min, max]` ; `max = None` = sans plafond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    pub min: u32,
    #[serde(default)]
    pub max: Option<u32>,
}

impl Bounds {
    pub const fn between(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }
    pub const fn exactly(n: u32) -> Self {
        Self::between(n, n)
    }
    pub const fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// Plafond effectif, limité à `cap`.
    pub fn max_or(&self, cap: u32) -> u32 {
        self.max.map_or(cap, |m| m.min(cap))
    }

    fn is_inverted(&self) -> bool {
        self.max.is_some_and(|m| m < self.min)
    }
}

/// Durée en heures de chaque poste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShiftHours {
    pub off: u32,
    pub day8: u32,
    pub day12: u32,
    pub night: u32,
    pub requested_off: u32,
}

impl Default for ShiftHours {
    fn default() -> Self {
        Self {
            off: 0,
            day8: 8,
            day12: 12,
            night: 12,
            requested_off: 8,
        }
    }
}

impl ShiftHours {
    pub fn of(&self, shift: ShiftType) -> u32 {
        match shift {
            ShiftType::Off => self.off,
            ShiftType::Day8 => self.day8,
            ShiftType::Day12 => self.day12,
            ShiftType::Night => self.night,
            ShiftType::RequestedOff => self.requested_off,
        }
    }

    /// Heures indexées dans l'ordre canonique des postes.
    pub fn table(&self) -> [u32; 5] {
        ShiftType::ALL.map(|s| self.of(s))
    }
}

/// Couverture journalière : effectifs par poste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coverage {
    /// Day12 + Day8
    pub total: Bounds,
    pub day8: Bounds,
    pub day12: Bounds,
    pub night: Bounds,
}

impl Coverage {
    pub fn weekday() -> Self {
        Self {
            total: Bounds::between(4, 7),
            day8: Bounds::between(1, 4),
            day12: Bounds::between(2, 4),
            night: Bounds::exactly(2),
        }
    }

    pub fn weekend() -> Self {
        Self {
            total: Bounds::at_least(0),
            day8: Bounds::exactly(0),
            day12: Bounds::exactly(2),
            night: Bounds::exactly(2),
        }
    }

    fn bounds_mut(&mut self, key: &str) -> Option<&mut Bounds> {
        match key {
            "total" => Some(&mut self.total),
            "day8" => Some(&mut self.day8),
            "day12" => Some(&mut self.day12),
            "night" => Some(&mut self.night),
            _ => None,
        }
    }
}

/// Constantes métier qui paramètrent la génération des contraintes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleParameters {
    pub hours: ShiftHours,
    /// Heures dues = `daily_contract_hours × jours ouvrés`.
    pub daily_contract_hours: u32,
    pub min_night: u32,
    pub min_day12: u32,
    pub max_day8: u32,
    pub weekday: Coverage,
    pub weekend: Coverage,
    /// Nombre de conflits au-delà duquel la recherche abandonne.
    pub max_failures: u64,
}

impl Default for RuleParameters {
    fn default() -> Self {
        Self {
            hours: ShiftHours::default(),
            daily_contract_hours: 8,
            min_night: 3,
            min_day12: 3,
            max_day8: 4,
            weekday: Coverage::weekday(),
            weekend: Coverage::weekend(),
            max_failures: 200_000,
        }
    }
}

/// Durée maximale d'un poste, en heures.
const MAX_SHIFT_HOURS: u32 = 24;

impl RuleParameters {
    /// Heures dues par chaque personne sur `working_days` jours ouvrés.
    pub fn required_hours(&self, working_days: usize) -> u32 {
        let days = u32::try_from(working_days).unwrap_or(u32::MAX);
        self.daily_contract_hours.saturating_mul(days)
    }

    pub fn coverage(&self, weekend: bool) -> &Coverage {
        if weekend {
            &self.weekend
        } else {
            &self.weekday
        }
    }

    /// Surcharge nommée, ex. `set("weekday.night.min", "1")`.
    ///
    /// Les plafonds acceptent `none` (sans plafond).
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), SolveError> {
        let key = name.trim();
        let value = value.trim();
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["hours", shift] => {
                let slot = match *shift {
                    "off" => &mut self.hours.off,
                    "day8" => &mut self.hours.day8,
                    "day12" => &mut self.hours.day12,
                    "night" => &mut self.hours.night,
                    "requested_off" => &mut self.hours.requested_off,
                    _ => return Err(SolveError::UnknownRule(key.to_string())),
                };
                *slot = parse_u32(key, value)?;
            }
            ["daily_contract_hours"] => self.daily_contract_hours = parse_u32(key, value)?,
            ["min_night"] => self.min_night = parse_u32(key, value)?,
            ["min_day12"] => self.min_day12 = parse_u32(key, value)?,
            ["max_day8"] => self.max_day8 = parse_u32(key, value)?,
            ["max_failures"] => {
                self.max_failures = value
                    .parse()
                    .map_err(|_| SolveError::InvalidRule(format!("{key}: not a number: {value}")))?
            }
            [class @ ("weekday" | "weekend"), what, end @ ("min" | "max")] => {
                let coverage = if *class == "weekday" {
                    &mut self.weekday
                } else {
                    &mut self.weekend
                };
                let bounds = coverage
                    .bounds_mut(what)
                    .ok_or_else(|| SolveError::UnknownRule(key.to_string()))?;
                if *end == "min" {
                    bounds.min = parse_u32(key, value)?;
                } else if value.eq_ignore_ascii_case("none") {
                    bounds.max = None;
                } else {
                    bounds.max = Some(parse_u32(key, value)?);
                }
            }
            _ => return Err(SolveError::UnknownRule(key.to_string())),
        }
        Ok(())
    }

    /// Rejette les bornes inversées et les durées hors de `[0, 24]`.
    pub fn validate(&self) -> Result<(), SolveError> {
        for shift in ShiftType::ALL {
            if self.hours.of(shift) > MAX_SHIFT_HOURS {
                return Err(SolveError::InvalidRule(format!(
                    "hours.{shift:?}: more than {MAX_SHIFT_HOURS}h"
                )));
            }
        }
        if self.daily_contract_hours > MAX_SHIFT_HOURS {
            return Err(SolveError::InvalidRule(format!(
                "daily_contract_hours: more than {MAX_SHIFT_HOURS}h"
            )));
        }
        for (class, cov) in [("weekday", &self.weekday), ("weekend", &self.weekend)] {
            for (what, b) in [
                ("total", cov.total),
                ("day8", cov.day8),
                ("day12", cov.day12),
                ("night", cov.night),
            ] {
                if b.is_inverted() {
                    return Err(SolveError::InvalidRule(format!(
                        "{class}.{what}: min above max"
                    )));
                }
            }
        }
        if self.max_failures == 0 {
            return Err(SolveError::InvalidRule("max_failures must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, SolveError> {
    value
        .parse()
        .map_err(|_| SolveError::InvalidRule(format!("{key}: not a number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ward_rules() {
        let r = RuleParameters::default();
        assert_eq!(r.hours.table(), [0, 8, 12, 12, 8]);
        assert_eq!(r.required_hours(20), 160);
        assert_eq!(r.weekday.night, Bounds::exactly(2));
        assert_eq!(r.weekend.total.max_or(12), 12);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn named_overrides() {
        let mut r = RuleParameters::default();
        r.set("weekday.night.min", "1").unwrap();
        r.set("weekend.total.max", "5").unwrap();
        r.set("weekday.total.max", "none").unwrap();
        r.set("hours.day8", "7").unwrap();
        r.set("min_night", "2").unwrap();
        assert_eq!(r.weekday.night, Bounds::between(1, 2));
        assert_eq!(r.weekend.total.max, Some(5));
        assert_eq!(r.weekday.total.max, None);
        assert_eq!(r.hours.day8, 7);
        assert_eq!(r.min_night, 2);
    }

    #[test]
    fn unknown_or_malformed_overrides_fail() {
        let mut r = RuleParameters::default();
        assert!(matches!(r.set("weekday.lunch.min", "1"), Err(SolveError::UnknownRule(_))));
        assert!(matches!(r.set("holidays", "1"), Err(SolveError::UnknownRule(_))));
        assert!(matches!(r.set("min_night", "-1"), Err(SolveError::InvalidRule(_))));
        assert_eq!(r, RuleParameters::default());
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let mut r = RuleParameters::default();
        r.set("weekday.day12.min", "5").unwrap();
        assert!(matches!(r.validate(), Err(SolveError::InvalidRule(_))));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{
            "min_night": 2,
            "weekend": {
                "total": {"min": 0},
                "day8": {"min": 0, "max": 0},
                "day12": {"min": 1, "max": 1},
                "night": {"min": 1, "max": 1}
            }
        }"#;
        let r: RuleParameters = serde_json::from_str(json).unwrap();
        assert_eq!(r.min_night, 2);
        assert_eq!(r.weekend.day12, Bounds::exactly(1));
        assert_eq!(r.weekday, Coverage::weekday());
        assert!(serde_json::from_str::<RuleParameters>(r#"{"nights": 2}"#).is_err());
    }
}
