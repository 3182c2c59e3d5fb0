use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::services::spotify::reconcile::{ReconcilePlan, ReconcileReport, TrackOutcome};

/// Print the skipped and not-found sections of a plan.
pub fn write_plan<W: Write>(out: &mut W, plan: &ReconcilePlan) -> io::Result<()> {
    let skipped = plan.skipped();
    if !skipped.is_empty() {
        writeln!(out, "{}", "---SKIPPED, ALREADY EXISTS---".cyan().bold())?;
        for term in &skipped {
            writeln!(out, "{}", term)?;
        }
    }

    let not_found = plan.not_found();
    if !not_found.is_empty() {
        writeln!(out, "{}", "---NOT FOUND---".yellow().bold())?;
        for term in &not_found {
            writeln!(out, "{}", term)?;
        }
    }

    let to_add: Vec<_> = plan
        .outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, TrackOutcome::WillAdd { .. }))
        .collect();
    if !to_add.is_empty() {
        writeln!(out, "{}", "---TO ADD---".green().bold())?;
        for (record, _) in to_add {
            writeln!(out, "{}", record)?;
        }
    }
    Ok(())
}

pub fn write_report<W: Write>(out: &mut W, report: &ReconcileReport) -> io::Result<()> {
    write_plan(out, &report.plan)?;
    writeln!(
        out,
        "{}",
        format!("added {} tracks", report.added).green()
    )?;
    writeln!(
        out,
        "{}",
        format!("{} duplicate(s) corrected", report.duplicates_corrected).green()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SourceRecord;

    fn render(report: &ReconcileReport) -> String {
        let mut out = Vec::new();
        write_report(&mut out, report).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_report_sections() {
        let mut plan = ReconcilePlan::default();
        plan.outcomes = vec![
            (SourceRecord::new("Title1", "ArtistA"), TrackOutcome::SkippedExists),
            (SourceRecord::new("Lost", "Nobody"), TrackOutcome::NotFound),
            (
                SourceRecord::new("Title2", "ArtistB"),
                TrackOutcome::WillAdd { id: "Z".into() },
            ),
        ];
        plan.pending.insert("Z".into());

        let text = render(&ReconcileReport {
            plan,
            added: 1,
            duplicates_corrected: 2,
        });

        assert!(text.contains("---SKIPPED, ALREADY EXISTS---"));
        assert!(text.contains("ArtistA Title1"));
        assert!(text.contains("---NOT FOUND---"));
        assert!(text.contains("Nobody Lost"));
        assert!(text.contains("ArtistB Title2"));
        assert!(text.contains("added 1 tracks"));
        assert!(text.contains("2 duplicate(s) corrected"));
    }

    #[test]
    fn test_write_report_omits_empty_sections() {
        let text = render(&ReconcileReport::default());
        assert!(!text.contains("SKIPPED"));
        assert!(!text.contains("NOT FOUND"));
        assert!(text.contains("added 0 tracks"));
    }
}
