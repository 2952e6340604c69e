//! Two-way communication analysis over the persisted email log.
//!
//! The report is rebuilt from the full log on every pass, never updated
//! incrementally, so it always reflects what is actually persisted.

use std::collections::BTreeMap;

use crate::types::ReciprocityEntry;
use crate::util::extract_email;

/// Classify each log row by direction and accumulate per-student counts.
///
/// `rows` are data rows only (header already stripped). Rows with fewer
/// than three columns are skipped. The teacher identity is matched by
/// substring containment against the extracted sender address first, then
/// the recipient; rows matching neither direction are left out of the
/// report.
pub fn analyze(rows: &[Vec<String>], teacher_email: &str) -> BTreeMap<String, ReciprocityEntry> {
    let mut entries: BTreeMap<String, ReciprocityEntry> = BTreeMap::new();

    for row in rows {
        if row.len() < 3 {
            log::debug!("Skipping short row: {:?}", row);
            continue;
        }

        let sender = extract_email(&row[1]);
        let recipient = extract_email(&row[2]);

        if sender.contains(teacher_email) {
            // teacher -> student
            entries.entry(recipient.to_string()).or_default().outbound += 1;
        } else if recipient.contains(teacher_email) {
            // student -> teacher
            entries.entry(sender.to_string()).or_default().inbound += 1;
        } else {
            log::debug!(
                "Row matches neither direction for {}: {} -> {}",
                teacher_email,
                sender,
                recipient
            );
        }
    }

    for entry in entries.values_mut() {
        entry.reciprocal = entry.outbound > 0 && entry.inbound > 0;
    }

    entries
}

/// Render the report as a fixed-width text table for the terminal.
pub fn render_table(report: &BTreeMap<String, ReciprocityEntry>) -> String {
    if report.is_empty() {
        return "No communication data available.\n".to_string();
    }

    let student_width = report
        .keys()
        .map(|s| s.len())
        .chain(["Student Email".len()])
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:>16}  {:>16}  {:>13}\n",
        "Student Email",
        "# Teacher Emails",
        "# Student Emails",
        "Two-Way (Y/N)",
        width = student_width
    ));
    for (student, entry) in report {
        out.push_str(&format!(
            "{:<width$}  {:>16}  {:>16}  {:>13}\n",
            student,
            entry.outbound,
            entry.inbound,
            if entry.reciprocal { "Y" } else { "N" },
            width = student_width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, from: &str, to: &str, body: &str) -> Vec<String> {
        vec![
            date.to_string(),
            from.to_string(),
            to.to_string(),
            body.to_string(),
        ]
    }

    #[test]
    fn test_two_way_communication() {
        let rows = vec![
            row("1/1/2024 10:00:00", "teacher@x.com", "a@y.com", "hi"),
            row("1/1/2024 11:00:00", "a@y.com", "teacher@x.com", "reply"),
        ];

        let report = analyze(&rows, "teacher@x.com");
        assert_eq!(report.len(), 1);
        assert_eq!(
            report["a@y.com"],
            ReciprocityEntry {
                outbound: 1,
                inbound: 1,
                reciprocal: true
            }
        );
    }

    #[test]
    fn test_one_way_communication() {
        let rows = vec![row("1/1/2024 10:00:00", "teacher@x.com", "a@y.com", "hi")];

        let report = analyze(&rows, "teacher@x.com");
        assert_eq!(
            report["a@y.com"],
            ReciprocityEntry {
                outbound: 1,
                inbound: 0,
                reciprocal: false
            }
        );
    }

    #[test]
    fn test_display_names_are_stripped() {
        let rows = vec![
            row(
                "1/1/2024 10:00:00",
                "Ms. Teacher <teacher@x.com>",
                "Alice Y <a@y.com>",
                "hi",
            ),
            row(
                "1/1/2024 11:00:00",
                "Alice Y <a@y.com>",
                "Ms. Teacher <teacher@x.com>",
                "reply",
            ),
        ];

        let report = analyze(&rows, "teacher@x.com");
        assert!(report["a@y.com"].reciprocal);
    }

    #[test]
    fn test_short_rows_are_skipped_not_fatal() {
        let rows = vec![
            row("1/1/2024 10:00:00", "teacher@x.com", "a@y.com", "hi"),
            vec!["1/2/2024 09:00:00".to_string(), "b@y.com".to_string()],
            row("1/3/2024 10:00:00", "b@y.com", "teacher@x.com", "hello"),
        ];

        let report = analyze(&rows, "teacher@x.com");
        assert_eq!(report["a@y.com"].outbound, 1);
        assert_eq!(report["b@y.com"].inbound, 1);
    }

    #[test]
    fn test_unrelated_row_counts_nowhere() {
        let rows = vec![row("1/1/2024 10:00:00", "a@y.com", "b@y.com", "psst")];
        assert!(analyze(&rows, "teacher@x.com").is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(analyze(&[], "teacher@x.com").is_empty());
    }

    #[test]
    fn test_counts_accumulate_per_student() {
        let rows = vec![
            row("1/1/2024 10:00:00", "teacher@x.com", "a@y.com", "one"),
            row("1/2/2024 10:00:00", "teacher@x.com", "a@y.com", "two"),
            row("1/3/2024 10:00:00", "teacher@x.com", "b@y.com", "three"),
            row("1/4/2024 10:00:00", "b@y.com", "teacher@x.com", "four"),
        ];

        let report = analyze(&rows, "teacher@x.com");
        assert_eq!(report["a@y.com"].outbound, 2);
        assert!(!report["a@y.com"].reciprocal);
        assert!(report["b@y.com"].reciprocal);
    }

    #[test]
    fn test_render_table_empty() {
        assert_eq!(
            render_table(&BTreeMap::new()),
            "No communication data available.\n"
        );
    }

    #[test]
    fn test_render_table_rows() {
        let mut report = BTreeMap::new();
        report.insert(
            "a@y.com".to_string(),
            ReciprocityEntry {
                outbound: 2,
                inbound: 1,
                reciprocal: true,
            },
        );
        report.insert(
            "b@y.com".to_string(),
            ReciprocityEntry {
                outbound: 1,
                inbound: 0,
                reciprocal: false,
            },
        );

        let table = render_table(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Student Email"));
        assert!(lines[1].starts_with("a@y.com"));
        assert!(lines[1].ends_with("Y"));
        assert!(lines[2].starts_with("b@y.com"));
        assert!(lines[2].ends_with("N"));
    }
}
