use std::fmt::Write;

use crate::recommendation::Recommendation;

/// Fixed-width text rendering of a recommendation set.
pub fn render(recommendations: &[Recommendation]) -> String {
    let width = recommendations
        .iter()
        .map(|r| r.parameter.len())
        .chain(std::iter::once("Parameter".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>8}  {:>8}  {:>11}", "Parameter", "Pump", "Autotune", "DaysMissing");
    for rec in recommendations {
        let marker = if rec.autotune != rec.pump { " *" } else { "" };
        let _ = writeln!(
            out,
            "{:<width$}  {:>8.2}  {:>8.2}  {:>11}{marker}",
            rec.parameter, rec.pump, rec.autotune, rec.days_missing
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_changed_rows() {
        let table = render(&[
            Recommendation::new("ISF[mg/dL/U]", 50.0, 45.0),
            Recommendation::new("00:00", 0.8, 0.8),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Parameter"));
        assert!(lines[1].ends_with('*'));
        assert!(!lines[2].ends_with('*'));
        assert!(lines[2].contains("0.80"));
    }
}
