mod markdown;
mod tokenize;

use crate::types::{CsvPreview, PreviewOptions};

/// Parse raw bytes into a bounded preview. Never fails: bytes are decoded
/// lossily, malformed quoting is closed at end of input, ragged rows are
/// kept as-is. The whole input is scanned once; only the output is bounded.
#[must_use]
pub fn parse_csv_preview(content: &[u8], options: PreviewOptions) -> CsvPreview {
    let (max_rows, max_cols) = options.clamped();
    let text = String::from_utf8_lossy(content);

    let mut rows = tokenize::tokenize(&text);
    let total_rows = rows.len();

    let (header, data) = if rows.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let data = rows.split_off(1);
        let header = rows.pop().unwrap_or_default();
        (header, data)
    };

    let header: Vec<String> = header.into_iter().take(max_cols).collect();
    let rows: Vec<Vec<String>> = data
        .into_iter()
        .take(max_rows)
        .map(|row| row.into_iter().take(max_cols).collect())
        .collect();

    let markdown_table = markdown::table(&header, &rows);

    CsvPreview {
        columns: header.len(),
        header,
        rows,
        total_rows,
        markdown_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    fn parse(csv: &str, max_rows: i64, max_cols: i64) -> CsvPreview {
        parse_csv_preview(csv.as_bytes(), PreviewOptions::new(max_rows, max_cols))
    }

    #[test]
    fn limits_rows_and_cols() {
        let res = parse("a,b,c\n1,2,3\n4,5,6\n7,8,9\n", 2, 2);
        assert_eq!(res.header, strings(&["a", "b"]));
        assert_eq!(res.rows, vec![strings(&["1", "2"]), strings(&["4", "5"])]);
        assert_eq!(res.columns, 2);
        assert_eq!(res.total_rows, 4);
        assert!(res.markdown_table.contains("| a | b |"));
    }

    #[test]
    fn quoted_fields_and_escaped_quotes() {
        let csv = "name,desc\n\"ACME, Inc.\",\"He said \"\"hello\"\"\"\n";
        let res = parse_csv_preview(csv.as_bytes(), PreviewOptions::default());
        assert_eq!(res.header, strings(&["name", "desc"]));
        assert_eq!(res.rows, vec![strings(&["ACME, Inc.", "He said \"hello\""])]);
    }

    #[test]
    fn empty_input() {
        let res = parse_csv_preview(b"", PreviewOptions::default());
        assert!(res.header.is_empty());
        assert!(res.rows.is_empty());
        assert_eq!(res.columns, 0);
        assert_eq!(res.total_rows, 0);
        assert_eq!(res.markdown_table, "|  |\n|  |\n");
    }

    #[test]
    fn header_only() {
        let res = parse("a,b\n", 5, 5);
        assert_eq!(res.total_rows, 1);
        assert!(res.rows.is_empty());
        assert_eq!(res.markdown_table, "| a | b |\n| --- | --- |\n");
    }

    #[test]
    fn crlf_matches_lf() {
        let lf = parse("a,b\n1,2\n3,4\n", 10, 10);
        let crlf = parse("a,b\r\n1,2\r\n3,4\r\n", 10, 10);
        assert_eq!(lf, crlf);
    }

    #[test]
    fn trailing_newline_is_idempotent() {
        let bare = parse("x,y\n1,2", 10, 10);
        let trailed = parse("x,y\n1,2\n", 10, 10);
        assert_eq!(bare.total_rows, trailed.total_rows);
        assert_eq!(bare.header, trailed.header);
        assert_eq!(bare.rows, trailed.rows);
    }

    #[test]
    fn non_positive_limits_clamp_to_one() {
        let csv = "a,b,c\n1,2,3\n4,5,6\n";
        assert_eq!(parse(csv, 0, 3), parse(csv, 1, 3));
        assert_eq!(parse(csv, 3, -5), parse(csv, 3, 1));
        let one = parse(csv, 0, 0);
        assert_eq!(one.header, strings(&["a"]));
        assert_eq!(one.rows, vec![strings(&["1"])]);
    }

    #[test]
    fn ragged_rows_shorter_than_header() {
        let res = parse("a,b,c\n1\n2,3,4,5,6\n", 10, 4);
        assert_eq!(res.columns, 3);
        assert_eq!(res.rows[0], strings(&["1"]));
        assert_eq!(res.rows[1], strings(&["2", "3", "4", "5"]));
        assert!(res.markdown_table.contains("| 1 |\n"));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let res = parse_csv_preview(b"h\n\xff\xfe,ok\n", PreviewOptions::default());
        assert_eq!(res.total_rows, 2);
        assert_eq!(res.rows[0][1], "ok");
        assert!(res.rows[0][0].contains('\u{fffd}'));
    }

    #[test]
    fn no_delimiters_is_one_field() {
        let res = parse_csv_preview(b"just some words", PreviewOptions::default());
        assert_eq!(res.header, strings(&["just some words"]));
        assert_eq!(res.total_rows, 1);
    }

    #[test]
    fn grid_truncation_counts() {
        let mut csv = String::new();
        for r in 0..30 {
            let line: Vec<String> = (0..8).map(|c| format!("r{r}c{c}")).collect();
            csv.push_str(&line.join(","));
            csv.push('\n');
        }
        let res = parse(&csv, 5, 3);
        assert_eq!(res.header.len(), 3);
        assert_eq!(res.rows.len(), 5);
        assert!(res.rows.iter().all(|r| r.len() == 3));
        assert_eq!(res.total_rows, 30);
    }
}
