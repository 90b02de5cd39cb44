//! Minimal CSV rendering for the export endpoints.
//!
//! Free-text columns are always quoted (with `""` doubling) since school and
//! material names routinely contain commas; other columns pass through raw
//! unless they would break the row.

/// Quotes a field unconditionally, doubling any embedded quotes.
pub fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Quotes a field only when it would otherwise break the row.
pub fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        quote(field)
    } else {
        field.to_string()
    }
}

/// Renders a header row plus data rows, `\n`-joined.
pub fn render(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        lines.push(row.join(","));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        assert_eq!(quote(r#"St. Mary's "Annex""#), r#""St. Mary's ""Annex""""#);
    }

    #[test]
    fn test_quote_plain_field() {
        assert_eq!(quote("Nabunturan"), "\"Nabunturan\"");
    }

    #[test]
    fn test_escape_leaves_safe_fields_alone() {
        assert_eq!(escape("Grade 3"), "Grade 3");
    }

    #[test]
    fn test_escape_quotes_fields_with_commas() {
        assert_eq!(escape("Reading, Writing"), "\"Reading, Writing\"");
    }

    #[test]
    fn test_escape_quotes_fields_with_newlines() {
        assert_eq!(escape("line one\nline two"), "\"line one\nline two\"");
    }

    #[test]
    fn test_render_joins_header_and_rows() {
        let csv = render(
            &["Name", "Quantity"],
            vec![
                vec![quote("English LM"), "500".to_string()],
                vec![quote("Math TB"), "350".to_string()],
            ],
        );
        assert_eq!(csv, "Name,Quantity\n\"English LM\",500\n\"Math TB\",350");
    }

    #[test]
    fn test_render_empty_rows_is_header_only() {
        let csv = render(&["A", "B"], vec![]);
        assert_eq!(csv, "A,B");
    }
}
