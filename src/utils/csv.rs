// src/utils/csv.rs
//
// Hand-rolled CSV helpers for the two fixed formats the system exchanges:
// result export (`Quiz Name,Username,Score`) and student import
// (`username,full_name,student_code`). Neither format allows quoting or
// embedded commas, so a plain split is sufficient.

/// One parsed row of a student import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based line number in the uploaded file, for error reporting.
    pub line: usize,
    pub username: String,
    pub full_name: String,
    pub student_code: Option<String>,
}

/// Writes the result export.
///
/// The score cell is the raw integer, never "85/100": spreadsheet programs
/// auto-convert fraction-like strings into dates (85/100 becomes 30-Oct).
/// Quiz names are kept comma-free at creation, so rows stay well-formed
/// without quoting.
pub fn export_results(rows: &[(String, String, i64)]) -> String {
    let mut out = String::from("Quiz Name,Username,Score\n");
    for (quiz_name, username, score) in rows {
        out.push_str(quiz_name);
        out.push(',');
        out.push_str(username);
        out.push(',');
        out.push_str(&score.to_string());
        out.push('\n');
    }
    out
}

/// Parses a student import file.
///
/// * A header row is skipped when the first cell equals "username"
///   (case-insensitive).
/// * Blank lines are skipped.
/// * Rows with fewer than three columns or a blank username/full_name are
///   reported in `errors`; parsing continues with the next row.
pub fn parse_student_import(content: &str) -> (Vec<ImportRow>, Vec<String>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').collect();

        if idx == 0 && parts[0].trim().eq_ignore_ascii_case("username") {
            continue;
        }

        if parts.len() < 3 {
            errors.push(format!(
                "Line {}: expected 3 columns (username,full_name,student_code)",
                line_no
            ));
            continue;
        }

        let username = parts[0].trim();
        let full_name = parts[1].trim();
        let student_code = parts[2].trim();

        if username.is_empty() {
            errors.push(format!("Line {}: username must not be empty", line_no));
            continue;
        }
        if full_name.is_empty() {
            errors.push(format!("Line {}: full_name must not be empty", line_no));
            continue;
        }

        rows.push(ImportRow {
            line: line_no,
            username: username.to_string(),
            full_name: full_name.to_string(),
            student_code: if student_code.is_empty() {
                None
            } else {
                Some(student_code.to_string())
            },
        });
    }

    (rows, errors)
}
