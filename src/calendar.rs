use crate::scheduler::SolveError;
use chrono::{Datelike, NaiveDate, Weekday};

/// Horizon de planification : un mois civil.
///
/// Le jour `d` est un index 0-based dans `[0, day_count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    year: i32,
    month: u32,
    weekdays: Vec<Weekday>,
}

impl Period {
    /// Valide `(year, month)` et dérive le jour de semaine de chaque jour.
    pub fn new(year: i32, month: u32) -> Result<Self, SolveError> {
        let invalid = || SolveError::InvalidPeriod { year, month };
        if year < 1 || !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let next = NaiveDate::from_ymd_opt(ny, nm, 1).ok_or_else(invalid)?;
        let weekdays = first
            .iter_days()
            .take_while(|d| *d < next)
            .map(|d| d.weekday())
            .collect();
        Ok(Self {
            year,
            month,
            weekdays,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day_count(&self) -> usize {
        self.weekdays.len()
    }

    pub fn weekday(&self, day: usize) -> Option<Weekday> {
        self.weekdays.get(day).copied()
    }

    /// Samedi ou dimanche. Faux hors de la période.
    pub fn is_weekend(&self, day: usize) -> bool {
        matches!(self.weekday(day), Some(Weekday::Sat | Weekday::Sun))
    }

    pub fn weekend_days(&self) -> Vec<usize> {
        (0..self.day_count()).filter(|&d| self.is_weekend(d)).collect()
    }

    pub fn working_day_count(&self) -> usize {
        self.day_count() - self.weekend_days().len()
    }

    pub fn date(&self, day: usize) -> Option<NaiveDate> {
        let day = u32::try_from(day).ok()?;
        NaiveDate::from_ymd_opt(self.year, self.month, day + 1)
    }

    /// Initiale française du jour (L M M J V S D), utilisée dans les tableaux.
    pub fn initial(&self, day: usize) -> Option<char> {
        self.weekday(day).map(weekday_initial)
    }
}

pub fn weekday_initial(w: Weekday) -> char {
    match w {
        Weekday::Mon => 'L',
        Weekday::Tue | Weekday::Wed => 'M',
        Weekday::Thu => 'J',
        Weekday::Fri => 'V',
        Weekday::Sat => 'S',
        Weekday::Sun => 'D',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn february_non_leap_starting_monday() {
        let p = Period::new(2027, 2).unwrap();
        assert_eq!(p.day_count(), 28);
        assert_eq!(p.weekday(0), Some(Weekday::Mon));
        assert_eq!(p.weekend_days(), vec![5, 6, 12, 13, 19, 20, 26, 27]);
        assert_eq!(p.working_day_count(), 20);
    }

    #[test]
    fn leap_february_and_long_months() {
        assert_eq!(Period::new(2024, 2).unwrap().day_count(), 29);
        assert_eq!(Period::new(2024, 12).unwrap().day_count(), 31);
        assert_eq!(Period::new(2025, 9).unwrap().day_count(), 30);
    }

    #[test]
    fn every_day_is_in_exactly_one_class() {
        for month in 1..=12 {
            let p = Period::new(2025, month).unwrap();
            let weekend = p.weekend_days();
            assert_eq!(weekend.len() + p.working_day_count(), p.day_count());
            for d in 0..p.day_count() {
                assert_eq!(weekend.contains(&d), p.is_weekend(d));
            }
        }
    }

    #[test]
    fn invalid_period_is_rejected() {
        assert!(matches!(
            Period::new(2025, 13),
            Err(SolveError::InvalidPeriod { year: 2025, month: 13 })
        ));
        assert!(Period::new(2025, 0).is_err());
        assert!(Period::new(0, 5).is_err());
    }

    #[test]
    fn initials_follow_weekdays() {
        let p = Period::new(2027, 2).unwrap();
        let s: String = (0..7).filter_map(|d| p.initial(d)).collect();
        assert_eq!(s, "LMMJVSD");
        assert_eq!(p.date(27), NaiveDate::from_ymd_opt(2027, 2, 28));
        assert_eq!(p.date(28), None);
    }
}
