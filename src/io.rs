use crate::calendar::Period;
use crate::model::{PreAssignments, RawShiftCode, Roster, ShiftType, StaffId};
use crate::scheduler::{Schedule, SolveError};
use anyhow::Context;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const STAFF_HEADER: &str = "Nurse";
const DAYS_ROW: &str = "Days";
const SUMMARY_ROW: &str = "Shift Summary";

/// Nom de fichier par défaut du planning : `planning_<mois>_<année>.csv`.
pub fn default_report_name(period: &Period) -> String {
    format!("planning_{}_{}.csv", period.month(), period.year())
}

fn number(n: impl itoa::Integer) -> String {
    itoa::Buffer::new().format(n).to_owned()
}

fn day_header(days: usize) -> Vec<String> {
    std::iter::once(STAFF_HEADER.to_string())
        .chain((1..=days).map(number))
        .collect()
}

fn initials_row(days: usize, initial: impl Fn(usize) -> Option<char>) -> Vec<String> {
    std::iter::once(DAYS_ROW.to_string())
        .chain((0..days).map(|d| initial(d).map(String::from).unwrap_or_default()))
        .collect()
}

/// Modèle vierge : en-tête `Nurse,1..D`, ligne des initiales, une ligne vide
/// par personne.
pub fn write_template<W: Write>(out: W, period: &Period, roster: &Roster) -> anyhow::Result<()> {
    let days = period.day_count();
    let mut w = WriterBuilder::new().has_headers(false).from_writer(out);
    w.write_record(day_header(days))?;
    w.write_record(initials_row(days, |d| period.initial(d)))?;
    for staff in roster.iter() {
        let row = std::iter::once(staff.as_str()).chain(std::iter::repeat("").take(days));
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_template_csv<P: AsRef<Path>>(
    path: P,
    period: &Period,
    roster: &Roster,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_template(file, period, roster)
}

/// Relit un tableau de demandes (modèle rempli ou planning précédent).
///
/// Colonnes numériques = jours 1-based ; les autres (`Total`…) sont ignorées.
/// Les lignes `Days` et vides sont sautées ; la lecture s'arrête au bloc
/// `Shift Summary`.
pub fn read_preassignments<R: Read>(
    input: R,
    period: &Period,
    roster: &Roster,
) -> anyhow::Result<PreAssignments> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let days = period.day_count();
    let mut columns = Vec::new();
    for (i, label) in rdr.headers()?.iter().enumerate().skip(1) {
        let Ok(day) = label.trim().parse::<usize>() else {
            continue;
        };
        if day == 0 || day > days {
            return Err(SolveError::InvalidInput(format!(
                "day column {day} outside 1..={days}"
            ))
            .into());
        }
        columns.push((i, day - 1));
    }

    let mut pre = PreAssignments::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = rec.get(0).unwrap_or("").trim();
        if name.is_empty() || name.eq_ignore_ascii_case(DAYS_ROW) {
            continue;
        }
        if name.eq_ignore_ascii_case(SUMMARY_ROW) {
            break;
        }
        let staff = StaffId::new(name);
        if roster.position(&staff).is_none() {
            return Err(SolveError::InvalidInput(format!("unknown staff member: {name}")).into());
        }
        for &(i, day) in &columns {
            let cell = rec.get(i).unwrap_or("").trim();
            if !cell.is_empty() {
                pre.insert(staff.clone(), day, RawShiftCode::parse(cell));
            }
        }
    }
    Ok(pre)
}

pub fn import_preassignments_csv<P: AsRef<Path>>(
    path: P,
    period: &Period,
    roster: &Roster,
) -> anyhow::Result<PreAssignments> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_preassignments(file, period, roster).with_context(|| format!("reading {}", path.display()))
}

/// Planning : en-tête `Nurse,1..D,Total`, initiales, une ligne par personne
/// (repos laissé vide), ligne vide, puis effectifs par poste et par jour.
pub fn write_report<W: Write>(mut out: W, schedule: &Schedule) -> anyhow::Result<()> {
    let days = schedule.day_count();
    {
        let mut w = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(&mut out);
        let mut header = day_header(days);
        header.push("Total".to_string());
        w.write_record(&header)?;
        w.write_record(initials_row(days, |d| schedule.initial(d)))?;
        for row in schedule.rows() {
            let mut rec = Vec::with_capacity(days + 2);
            rec.push(row.staff.as_str().to_string());
            rec.extend(row.shifts.iter().map(|s| match s {
                ShiftType::Off => String::new(),
                other => other.code().to_string(),
            }));
            rec.push(number(row.total_hours));
            w.write_record(&rec)?;
        }
        w.flush()?;
    }
    out.write_all(b"\n")?;
    {
        let mut w = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(&mut out);
        w.write_record([SUMMARY_ROW])?;
        for shift in ShiftType::ALL {
            let rec = std::iter::once(shift.code().to_string())
                .chain((0..days).map(|d| number(schedule.headcount(d, shift))));
            w.write_record(rec)?;
        }
        w.flush()?;
    }
    Ok(())
}

pub fn export_report_csv<P: AsRef<Path>>(path: P, schedule: &Schedule) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_report(file, schedule)
}
