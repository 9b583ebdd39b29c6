use super::builder::Layout;
use super::types::SolveError;
use crate::calendar::Period;
use crate::model::{PreAssignments, RawShiftCode, Roster, ShiftType};
use crate::solver::{Domain, Model};
use tracing::{debug, warn};

/// Ce que le passage de normalisation a retenu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NormalizeSummary {
    pub fixed_shifts: usize,
    /// CO honorés (jours ouvrés), par personne.
    pub requested_off: Vec<u32>,
    /// CO demandés un week-end, transformés en repos.
    pub overridden: usize,
}

/// Refuse une personne inconnue ou un jour hors de la période.
pub(crate) fn validate(
    period: &Period,
    roster: &Roster,
    pre: &PreAssignments,
) -> Result<(), SolveError> {
    for (staff, day, _) in pre.iter() {
        if roster.position(staff).is_none() {
            return Err(SolveError::InvalidInput(format!(
                "pre-assignment for unknown staff member: {staff}"
            )));
        }
        if day >= period.day_count() {
            return Err(SolveError::InvalidInput(format!(
                "pre-assignment day {} outside 1..={}",
                day + 1,
                period.day_count()
            )));
        }
    }
    Ok(())
}

/// Traduit les demandes en décisions figées sur le modèle.
///
/// - N, Z, 8 : poste figé, CO interdit.
/// - CO un jour ouvré : CO figé ; un week-end : repos figé, CO interdit.
/// - autre ou absent : CO interdit.
pub(crate) fn normalize(
    period: &Period,
    roster: &Roster,
    pre: &PreAssignments,
    layout: &Layout,
    model: &mut Model,
) -> NormalizeSummary {
    let co = Domain::singleton(ShiftType::RequestedOff.index());
    let mut summary = NormalizeSummary {
        requested_off: vec![0; roster.len()],
        ..NormalizeSummary::default()
    };
    for (n, staff) in roster.iter().enumerate() {
        for day in 0..period.day_count() {
            let cell = layout.cell(n, day);
            let raw = pre.get(staff, day).unwrap_or(RawShiftCode::Other);
            match (raw, raw.worked_shift()) {
                (_, Some(shift)) => {
                    model.restrict(cell, Domain::singleton(shift.index()));
                    summary.fixed_shifts += 1;
                }
                (RawShiftCode::RequestedOff, None) if period.is_weekend(day) => {
                    debug!(staff = %staff, day = day + 1, "weekend CO turned into rest day");
                    model.restrict(cell, Domain::singleton(ShiftType::Off.index()));
                    summary.overridden += 1;
                }
                (RawShiftCode::RequestedOff, None) => {
                    model.restrict(cell, co);
                    summary.requested_off[n] += 1;
                }
                _ => model.restrict(cell, co.complement()),
            }
        }
    }
    if summary.overridden > 0 {
        warn!(count = summary.overridden, "CO requests on weekend days not honored");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaffId;

    fn setup() -> (Period, Roster, Layout, Model) {
        let period = Period::new(2027, 2).unwrap();
        let roster = Roster::new(["ana", "ben"]).unwrap();
        let layout = Layout::new(roster.len(), period.day_count());
        let model = Model::new(layout.cells(), ShiftType::ALL.len());
        (period, roster, layout, model)
    }

    #[test]
    fn codes_become_fixed_decisions() {
        let (period, roster, layout, mut model) = setup();
        let mut pre = PreAssignments::new();
        let ana = StaffId::new("ana");
        let ben = StaffId::new("ben");
        pre.insert(ana.clone(), 4, RawShiftCode::Night);
        pre.insert(ana.clone(), 1, RawShiftCode::RequestedOff);
        pre.insert(ben.clone(), 5, RawShiftCode::RequestedOff); // samedi
        pre.insert(ben.clone(), 2, RawShiftCode::Other);

        let summary = normalize(&period, &roster, &pre, &layout, &mut model);
        let dom = |n, d| model.domains()[layout.cell(n, d)];
        assert_eq!(dom(0, 4).value(), Some(ShiftType::Night.index()));
        assert_eq!(dom(0, 1).value(), Some(ShiftType::RequestedOff.index()));
        assert_eq!(dom(1, 5).value(), Some(ShiftType::Off.index()));
        assert_eq!(dom(1, 2).size(), 4);
        assert!(!dom(1, 2).contains(ShiftType::RequestedOff.index()));
        assert!(!dom(1, 20).contains(ShiftType::RequestedOff.index()));
        assert_eq!(summary.requested_off, vec![1, 0]);
        assert_eq!(summary.overridden, 1);
        assert_eq!(summary.fixed_shifts, 1);
    }

    #[test]
    fn unknown_staff_and_out_of_range_days_are_rejected() {
        let (period, roster, _, _) = setup();
        let mut pre = PreAssignments::new();
        pre.insert(StaffId::new("zoe"), 0, RawShiftCode::Night);
        assert!(matches!(
            validate(&period, &roster, &pre),
            Err(SolveError::InvalidInput(_))
        ));
        let mut pre = PreAssignments::new();
        pre.insert(StaffId::new("ana"), 28, RawShiftCode::Night);
        assert!(matches!(
            validate(&period, &roster, &pre),
            Err(SolveError::InvalidInput(_))
        ));
    }
}
