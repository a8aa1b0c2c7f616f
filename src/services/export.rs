//! Results export rendered as CSV for the teacher.

use crate::core::time::format_display;
use crate::db::models::ResultExportRow;
use crate::services::grading::format_percent;

const HEADER: [&str; 8] = [
    "name",
    "test_id",
    "raw_answers",
    "correct_count",
    "wrong_count",
    "percent",
    "grade",
    "timestamp",
];

pub(crate) fn render_csv(rows: &[ResultExportRow]) -> String {
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().map(|value| value.to_string()));

    for row in rows {
        push_record(
            &mut out,
            [
                row.name.clone(),
                row.test_id.to_string(),
                row.raw_answers.0.compact(),
                row.correct_count.to_string(),
                row.wrong_count.to_string(),
                format_percent(row.percent),
                row.grade.to_string(),
                format_display(row.timestamp),
            ],
        );
    }

    out
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push_str("\r\n");
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::answers::parse_answers;
    use crate::services::grading::Grade;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn row(name: &str) -> ResultExportRow {
        ResultExportRow {
            name: name.to_string(),
            test_id: 3,
            raw_answers: Json(parse_answers("1a2b3x4d").expect("answers")),
            correct_count: 3,
            wrong_count: 1,
            percent: 75.0,
            grade: Grade::Good,
            timestamp: datetime!(2025-03-04 05:06:07),
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let csv = render_csv(&[row("Aziz")]);
        let lines = csv.split("\r\n").collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "name,test_id,raw_answers,correct_count,wrong_count,percent,grade,timestamp"
        );
        assert_eq!(lines[1], "Aziz,3,1a2b3x4d,3,1,75.0,4 (Yaxshi),2025-03-04 05:06:07");
        assert_eq!(lines[2], "");
    }

    #[test]
    fn quotes_fields_with_separators() {
        let csv = render_csv(&[row("Aziz, \"Jr\"")]);
        assert!(csv.contains("\"Aziz, \"\"Jr\"\"\",3,"));
    }

    #[test]
    fn empty_export_has_only_header() {
        assert_eq!(render_csv(&[]).lines().count(), 1);
    }
}
