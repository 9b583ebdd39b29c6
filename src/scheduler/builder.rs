use super::normalize::{normalize, NormalizeSummary};
use crate::calendar::Period;
use crate::model::{PreAssignments, Roster, ShiftType};
use crate::rules::{Bounds, Coverage, RuleParameters, ShiftHours};
use crate::solver::{Constraint, Domain, Implies, Linear, Model, Sequence, Weights, MAX_VALUES};
use tracing::info;

/// Numérotation des cellules : une par (personne, jour), ligne par ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub staff: usize,
    pub days: usize,
}

impl Layout {
    pub(crate) fn new(staff: usize, days: usize) -> Self {
        Self { staff, days }
    }
    pub(crate) fn cell(&self, staff: usize, day: usize) -> usize {
        staff * self.days + day
    }
    pub(crate) fn cells(&self) -> usize {
        self.staff * self.days
    }
    pub(crate) fn row(&self, staff: usize) -> Vec<usize> {
        (0..self.days).map(|d| self.cell(staff, d)).collect()
    }
    pub(crate) fn column(&self, day: usize) -> Vec<usize> {
        (0..self.staff).map(|n| self.cell(n, day)).collect()
    }
}

/// Intervalle d'effectif résolu (plafond borné par la taille de l'équipe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub lo: u32,
    pub hi: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DayCoverage {
    total: Span,
    day8: Span,
    day12: Span,
    night: Span,
}

impl DayCoverage {
    /// Heures travaillées sur la journée : le minimum imposé par la
    /// couverture et le maximum permis par ses plafonds.
    fn hours(&self, h: &ShiftHours) -> (u64, u64) {
        let (night, day12, day8) = (u64::from(h.night), u64::from(h.day12), u64::from(h.day8));
        let floor = u64::from(self.night.lo) * night
            + u64::from(self.day12.lo) * day12
            + u64::from(self.day8.lo) * day8;
        let missing = self
            .total
            .lo
            .saturating_sub(self.day12.lo.saturating_add(self.day8.lo));
        let lo = floor + u64::from(missing) * day12.min(day8);

        // postes de jour les mieux payés d'abord, dans la limite du total
        let (first, second) = if day12 >= day8 {
            ((self.day12.hi, day12), (self.day8.hi, day8))
        } else {
            ((self.day8.hi, day8), (self.day12.hi, day12))
        };
        let k1 = first.0.min(self.total.hi);
        let k2 = second.0.min(self.total.hi - k1);
        let hi = u64::from(self.night.hi) * night
            + u64::from(k1) * first.1
            + u64::from(k2) * second.1;
        (lo, hi)
    }
}

pub(crate) struct Built {
    pub model: Model,
    pub layout: Layout,
    pub required_hours: u32,
    pub summary: NormalizeSummary,
}

fn one(shift: ShiftType) -> Domain {
    Domain::singleton(shift.index())
}

fn hour_weights(rules: &RuleParameters) -> Weights {
    let mut w = [0; MAX_VALUES];
    for shift in ShiftType::ALL {
        w[shift.index()] = rules.hours.of(shift);
    }
    w
}

/// Transitions d'un jour au suivant : après N, repos ; après Z, N ou repos.
fn transitions() -> [Domain; MAX_VALUES] {
    let mut next = [Domain::full(ShiftType::ALL.len()); MAX_VALUES];
    next[ShiftType::Night.index()] = one(ShiftType::Off);
    next[ShiftType::Day12.index()] = one(ShiftType::Night).union(one(ShiftType::Off));
    next
}

fn span(b: Bounds, cap: u32) -> Span {
    Span {
        lo: b.min,
        hi: b.max_or(cap),
    }
}

fn resolve(cov: &Coverage, staff: u32) -> DayCoverage {
    DayCoverage {
        total: span(cov.total, staff),
        day8: span(cov.day8, staff),
        day12: span(cov.day12, staff),
        night: span(cov.night, staff),
    }
}

/// Nombres de Day8 compatibles avec l'égalité des heures, les quotas, les CO
/// honorés et la longueur du mois. `None` si aucun ne l'est.
pub(crate) fn day8_window(
    rules: &RuleParameters,
    days: usize,
    requested_off: u32,
    required: u32,
) -> Option<Span> {
    let h = &rules.hours;
    let days = u32::try_from(days).ok()?;
    let r = requested_off;
    let fits = |a: u32| {
        (rules.min_day12..=days).any(|z| {
            (rules.min_night..=days)
                .take_while(|&m| a + z + m + r <= days)
                .any(|m| {
                    let off = days - a - z - m - r;
                    let total = u64::from(a) * u64::from(h.day8)
                        + u64::from(z) * u64::from(h.day12)
                        + u64::from(m) * u64::from(h.night)
                        + u64::from(r) * u64::from(h.requested_off)
                        + u64::from(off) * u64::from(h.off);
                    total == u64::from(required)
                })
        })
    };
    let feasible: Vec<u32> = (0..=rules.max_day8.min(days)).filter(|&a| fits(a)).collect();
    Some(Span {
        lo: *feasible.first()?,
        hi: *feasible.last()?,
    })
}

/// Construit le modèle complet : décisions figées, règles par personne,
/// couverture par jour, contraintes redondantes.
///
/// Les séquences par ligne et le total d'heures de l'équipe sont impliqués :
/// ils élaguent avant la recherche sans être traduits en clauses.
pub(crate) fn build(
    period: &Period,
    roster: &Roster,
    rules: &RuleParameters,
    pre: &PreAssignments,
) -> Built {
    let layout = Layout::new(roster.len(), period.day_count());
    let mut model = Model::new(layout.cells(), ShiftType::ALL.len());
    let summary = normalize(period, roster, pre, &layout, &mut model);

    let required = rules.required_hours(period.working_day_count());
    let days = u32::try_from(layout.days).unwrap_or(u32::MAX);
    let staff = u32::try_from(layout.staff).unwrap_or(u32::MAX);
    let hours = hour_weights(rules);
    let next = transitions();

    for n in 0..layout.staff {
        let row = layout.row(n);
        let weighted: Vec<(usize, Weights)> = row.iter().map(|&c| (c, hours)).collect();

        let count = |shift: ShiftType, lo: u32, hi: u32| {
            Constraint::Linear(Linear::count(&row, one(shift), lo, hi))
        };
        model.post(Constraint::Linear(Linear::new(weighted.clone(), required, required)));
        model.post(count(ShiftType::Night, rules.min_night, days));
        model.post(count(ShiftType::Day12, rules.min_day12, days));
        model.post(count(ShiftType::Day8, 0, rules.max_day8));

        // redondantes
        let window = day8_window(rules, layout.days, summary.requested_off[n], required);
        let Span { lo, hi } = window.unwrap_or(Span { lo: 1, hi: 0 });
        model.post(count(ShiftType::Day8, lo, hi));
        model.imply(Constraint::Sequence(Sequence::new(weighted, required, required, next)));

        for d in 1..layout.days {
            let (today, tomorrow) = (layout.cell(n, d - 1), layout.cell(n, d));
            model.post(Constraint::Implies(Implies::new(
                today,
                one(ShiftType::Night),
                tomorrow,
                one(ShiftType::Off),
            )));
            model.post(Constraint::Implies(Implies::new(
                today,
                one(ShiftType::Day12),
                tomorrow,
                one(ShiftType::Night).union(one(ShiftType::Off)),
            )));
        }
    }

    let (mut team_lo, mut team_hi) = (0u64, 0u64);
    let day_shifts = one(ShiftType::Day8).union(one(ShiftType::Day12));
    for d in 0..layout.days {
        let cov = resolve(rules.coverage(period.is_weekend(d)), staff);
        let col = layout.column(d);
        let post = |model: &mut Model, values: Domain, s: Span| {
            model.post(Constraint::Linear(Linear::count(&col, values, s.lo, s.hi)));
        };
        post(&mut model, day_shifts, cov.total);
        post(&mut model, one(ShiftType::Day8), cov.day8);
        post(&mut model, one(ShiftType::Day12), cov.day12);
        post(&mut model, one(ShiftType::Night), cov.night);
        // redondante : effectif présent sur la journée
        let headcount = Span {
            lo: cov.night.lo.saturating_add(
                cov.total.lo.max(cov.day12.lo.saturating_add(cov.day8.lo)),
            ),
            hi: cov.night.hi.saturating_add(
                cov.total.hi.min(cov.day12.hi.saturating_add(cov.day8.hi)),
            ),
        };
        post(&mut model, day_shifts.union(one(ShiftType::Night)), headcount);
        let (lo, hi) = cov.hours(&rules.hours);
        team_lo += lo;
        team_hi += hi + u64::from(rules.hours.off) * u64::from(staff);
    }

    // redondante : heures de toute l'équipe, dues d'un côté, permises par la
    // couverture et les CO honorés de l'autre
    let honored: u64 = summary.requested_off.iter().map(|&r| u64::from(r)).sum();
    let co_hours = honored * u64::from(rules.hours.requested_off);
    let due = u64::from(required) * u64::from(staff);
    let clamp = |x: u64| u32::try_from(x).unwrap_or(u32::MAX);
    let team: Vec<(usize, Weights)> = (0..layout.cells()).map(|c| (c, hours)).collect();
    model.imply(Constraint::Linear(Linear::new(
        team,
        clamp(due.max(team_lo + co_hours)),
        clamp(due.min(team_hi + co_hours)),
    )));

    info!(
        staff = layout.staff,
        days = layout.days,
        cells = model.cell_count(),
        constraints = model.constraints().len(),
        implied = model.implied().len(),
        required_hours = required,
        fixed = summary.fixed_shifts,
        "model built"
    );

    Built {
        model,
        layout,
        required_hours: required,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day8_window_follows_hour_parity() {
        let rules = RuleParameters::default();
        // février 2027 : 28 jours, 160 h ; 8a + 12k = 160 ⇒ a ≡ 2 (mod 3)
        assert_eq!(day8_window(&rules, 28, 0, 160), Some(Span { lo: 2, hi: 2 }));
        // un CO honoré (8 h) : 8a + 12k = 152 ⇒ a ∈ {1, 4}
        assert_eq!(day8_window(&rules, 28, 1, 160), Some(Span { lo: 1, hi: 4 }));
        // septembre 2025 : 30 jours, 176 h
        assert_eq!(day8_window(&rules, 30, 0, 176), Some(Span { lo: 1, hi: 4 }));
    }

    #[test]
    fn day8_window_can_be_empty() {
        let mut rules = RuleParameters::default();
        rules.max_day8 = 1;
        assert_eq!(day8_window(&rules, 28, 0, 160), None);
    }

    #[test]
    fn model_has_one_cell_per_staff_and_day() {
        let period = Period::new(2027, 2).unwrap();
        let roster = Roster::new(["ana", "ben", "cleo"]).unwrap();
        let built = build(&period, &roster, &RuleParameters::default(), &PreAssignments::new());
        assert_eq!(built.model.cell_count(), 3 * 28);
        assert_eq!(built.required_hours, 160);
        // par personne : 5 + 2 × 27 ; par jour : 5
        assert_eq!(built.model.constraints().len(), 3 * (5 + 2 * 27) + 28 * 5);
        // une séquence par personne, le total de l'équipe
        assert_eq!(built.model.implied().len(), 3 + 1);
        assert!(built
            .model
            .domains()
            .iter()
            .all(|d| !d.contains(ShiftType::RequestedOff.index())));
    }

    #[test]
    fn team_hours_follow_coverage() {
        let period = Period::new(2025, 2).unwrap();
        let team = |size: usize| {
            let roster = Roster::new((0..size).map(|i| format!("n{i}"))).unwrap();
            let built = build(&period, &roster, &RuleParameters::default(), &PreAssignments::new());
            match built.model.implied().last() {
                Some(Constraint::Linear(c)) => (c.lo, c.hi),
                other => panic!("unexpected implied constraint {other:?}"),
            }
        };
        // 20 jours de semaine à 64 h au moins, 8 jours de week-end à 48 h
        assert_eq!(team(12), (12 * 160, 12 * 160));
        assert_eq!(team(9), (20 * 64 + 8 * 48, 9 * 160));
    }
}
