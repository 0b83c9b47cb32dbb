use crate::types::estimate_tokens;

/// Fit a preview into a token budget. Works backwards from the cap:
/// 1. Reserve 50 tokens for the summary line
/// 2. Cut the table at a line boundary so no row is half-rendered
/// 3. Append a trailer with the number of lines dropped
///
/// The summary line and trailer are kept even when they alone are over a
/// very small budget.
pub fn apply(output: &str, budget: u64) -> String {
    let current = estimate_tokens(output.len() as u64);
    if current <= budget {
        return output.to_string();
    }

    let header_reserve = 50u64;
    let content_budget = budget.saturating_sub(header_reserve);
    let max_bytes = (content_budget * 4) as usize; // inverse of estimate_tokens

    // The summary line carries the row/column counts. Always keep it.
    let header_end = output.find('\n').unwrap_or(output.len());
    let header = &output[..header_end];
    let body = &output[header_end..];

    if body.len() <= max_bytes {
        return output.to_string();
    }

    let safe_max = body.floor_char_boundary(max_bytes);
    let truncated = &body[..safe_max];
    let cut_point = truncated.rfind('\n').unwrap_or(0);
    let clean_body = &body[..cut_point];

    let omitted_lines = body[cut_point..].lines().filter(|l| !l.is_empty()).count();
    format!("{header}{clean_body}\n\n... truncated ({omitted_lines} table lines omitted, budget: {budget})")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rows: usize) -> String {
        let mut out = String::from("Here is a preview of t.csv (rows: 0, cols: 1).\n\n| n |\n| --- |");
        for i in 0..rows {
            out.push_str(&format!("\n| {i:04} |"));
        }
        out
    }

    #[test]
    fn under_budget_untouched() {
        let text = sample(3);
        assert_eq!(apply(&text, 10_000), text);
    }

    #[test]
    fn cuts_whole_rows_and_keeps_summary() {
        let text = sample(500);
        let out = apply(&text, 200);
        assert!(out.starts_with("Here is a preview of t.csv"));
        assert!(out.contains("table lines omitted"));
        assert!(estimate_tokens(out.len() as u64) <= 200);
        // every kept table line is complete
        for line in out.lines().filter(|l| l.starts_with('|')) {
            assert!(line.ends_with('|'), "partial row: {line}");
        }
    }

    #[test]
    fn tiny_budget_keeps_only_summary() {
        let out = apply(&sample(100), 10);
        assert!(out.starts_with("Here is a preview"));
        assert!(!out.contains("| 0000 |"));
        // summary, blank, trailer: nothing from the table survives
        assert_eq!(out.lines().count(), 3);
        assert!(out.ends_with("... truncated (102 table lines omitted, budget: 10)"));
        assert!(estimate_tokens(out.len() as u64) > 10);
    }
}
