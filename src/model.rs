use crate::scheduler::SolveError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Identifiant fort pour un membre de l'équipe (son nom).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffId(String);

impl StaffId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().trim().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Poste attribué à une personne pour une journée.
///
/// L'ordre des variantes est l'ordre canonique utilisé par le moteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftType {
    Off,
    Day8,
    Day12,
    Night,
    RequestedOff,
}

impl ShiftType {
    pub const ALL: [ShiftType; 5] = [
        ShiftType::Off,
        ShiftType::Day8,
        ShiftType::Day12,
        ShiftType::Night,
        ShiftType::RequestedOff,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Code court des tableaux : `L`, `8`, `Z`, `N`, `CO`.
    pub fn code(self) -> &'static str {
        match self {
            ShiftType::Off => "L",
            ShiftType::Day8 => "8",
            ShiftType::Day12 => "Z",
            ShiftType::Night => "N",
            ShiftType::RequestedOff => "CO",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Code brut lu dans un tableau de demandes, ramené à une énumération fermée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawShiftCode {
    Day8,
    Day12,
    Night,
    RequestedOff,
    /// Vide, `L` ou inconnu : aucune décision imposée.
    Other,
}

impl RawShiftCode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "8" => RawShiftCode::Day8,
            "Z" => RawShiftCode::Day12,
            "N" => RawShiftCode::Night,
            "CO" => RawShiftCode::RequestedOff,
            _ => RawShiftCode::Other,
        }
    }

    /// Poste travaillé figé par ce code, s'il y en a un.
    pub fn worked_shift(self) -> Option<ShiftType> {
        match self {
            RawShiftCode::Day8 => Some(ShiftType::Day8),
            RawShiftCode::Day12 => Some(ShiftType::Day12),
            RawShiftCode::Night => Some(ShiftType::Night),
            RawShiftCode::RequestedOff | RawShiftCode::Other => None,
        }
    }
}

/// Demandes préalables, creuses : (personne, jour 0-based) → code brut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreAssignments {
    entries: BTreeMap<(StaffId, usize), RawShiftCode>,
}

impl PreAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace une éventuelle entrée existante pour la même cellule.
    pub fn insert(&mut self, staff: StaffId, day: usize, code: RawShiftCode) {
        self.entries.insert((staff, day), code);
    }

    pub fn get(&self, staff: &StaffId, day: usize) -> Option<RawShiftCode> {
        self.entries.get(&(staff.clone(), day)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StaffId, usize, RawShiftCode)> + '_ {
        self.entries.iter().map(|((s, d), c)| (s, *d, *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Équipe ordonnée ; l'ordre est conservé dans les sorties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    staff: Vec<StaffId>,
}

impl Roster {
    /// Refuse une équipe vide, un nom vide ou un doublon.
    pub fn new<I, S>(names: I) -> Result<Self, SolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let staff: Vec<StaffId> = names.into_iter().map(StaffId::new).collect();
        if staff.is_empty() {
            return Err(SolveError::InvalidInput("staff list is empty".into()));
        }
        let mut seen = HashSet::new();
        for s in &staff {
            if s.as_str().is_empty() {
                return Err(SolveError::InvalidInput("blank staff identifier".into()));
            }
            if !seen.insert(s.as_str()) {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate staff identifier: {s}"
                )));
            }
        }
        Ok(Self { staff })
    }

    pub fn len(&self) -> usize {
        self.staff.len()
    }
    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &StaffId> + '_ {
        self.staff.iter()
    }
    pub fn get(&self, index: usize) -> Option<&StaffId> {
        self.staff.get(index)
    }
    pub fn position(&self, id: &StaffId) -> Option<usize> {
        self.staff.iter().position(|s| s == id)
    }
}
