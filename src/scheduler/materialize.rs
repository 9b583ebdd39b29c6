use super::types::SolveError;
use crate::calendar::Period;
use crate::model::{Roster, ShiftType, StaffId};
use crate::rules::ShiftHours;

/// Ligne du planning d'une personne.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffSchedule {
    pub staff: StaffId,
    pub shifts: Vec<ShiftType>,
    pub total_hours: u32,
}

/// Une case du planning telle que la consomme l'export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayEntry {
    /// 0-based
    pub day: usize,
    pub shift: ShiftType,
    pub is_weekend: bool,
}

/// Planning résolu : lignes par personne et effectifs par jour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    year: i32,
    month: u32,
    weekend: Vec<bool>,
    initials: Vec<char>,
    rows: Vec<StaffSchedule>,
    /// `headcount[jour][poste]`
    headcount: Vec<[u32; 5]>,
}

impl Schedule {
    /// Construit le planning à partir d'une grille personne × jour.
    pub fn from_grid(
        period: &Period,
        roster: &Roster,
        hours: &ShiftHours,
        grid: Vec<Vec<ShiftType>>,
    ) -> Result<Self, SolveError> {
        let days = period.day_count();
        if grid.len() != roster.len() || grid.iter().any(|r| r.len() != days) {
            return Err(SolveError::InvalidInput(format!(
                "grid must be {} × {days}",
                roster.len()
            )));
        }
        let mut headcount = vec![[0u32; 5]; days];
        let rows = roster
            .iter()
            .zip(grid)
            .map(|(staff, shifts)| {
                for (d, s) in shifts.iter().enumerate() {
                    headcount[d][s.index()] += 1;
                }
                let total_hours = shifts.iter().map(|s| hours.of(*s)).sum();
                StaffSchedule {
                    staff: staff.clone(),
                    shifts,
                    total_hours,
                }
            })
            .collect();
        Ok(Self {
            year: period.year(),
            month: period.month(),
            weekend: (0..days).map(|d| period.is_weekend(d)).collect(),
            initials: (0..days).filter_map(|d| period.initial(d)).collect(),
            rows,
            headcount,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
    pub fn month(&self) -> u32 {
        self.month
    }
    pub fn day_count(&self) -> usize {
        self.weekend.len()
    }
    pub fn is_weekend(&self, day: usize) -> bool {
        self.weekend.get(day).copied().unwrap_or(false)
    }
    pub fn initial(&self, day: usize) -> Option<char> {
        self.initials.get(day).copied()
    }

    pub fn rows(&self) -> &[StaffSchedule] {
        &self.rows
    }

    pub fn row(&self, staff: &StaffId) -> Option<&StaffSchedule> {
        self.rows.iter().find(|r| &r.staff == staff)
    }

    pub fn shift(&self, staff: &StaffId, day: usize) -> Option<ShiftType> {
        self.row(staff).and_then(|r| r.shifts.get(day).copied())
    }

    /// Cases (jour, poste, week-end) d'une personne.
    pub fn entries<'a>(&'a self, staff: &StaffId) -> impl Iterator<Item = DayEntry> + 'a {
        let shifts = self.row(staff).map(|r| r.shifts.as_slice()).unwrap_or(&[]);
        shifts.iter().enumerate().map(move |(day, &shift)| DayEntry {
            day,
            shift,
            is_weekend: self.is_weekend(day),
        })
    }

    /// Nombre de personnes sur `shift` le jour `day`.
    pub fn headcount(&self, day: usize, shift: ShiftType) -> u32 {
        self.headcount.get(day).map_or(0, |h| h[shift.index()])
    }
}
