use std::borrow::Cow;

/// Render header + rows as a pipe table: header line, `---` separator, body.
/// Always three parts joined by `\n`, so an empty body leaves a trailing
/// newline and zero columns degrade to `|  |\n|  |\n`.
pub(crate) fn table(header: &[String], rows: &[Vec<String>]) -> String {
    let head = format!("| {} |", header.join(" | "));
    let sep = format!("| {} |", vec!["---"; header.len()].join(" | "));
    let body = rows
        .iter()
        .map(|row| {
            let cells: Vec<Cow<'_, str>> = row.iter().map(|c| escape_cell(c)).collect();
            format!("| {} |", cells.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n");
    [head, sep, body].join("\n")
}

/// Escape pipes so a cell can't split the table. Borrowed when there's nothing to do.
fn escape_cell(cell: &str) -> Cow<'_, str> {
    if memchr::memchr(b'|', cell.as_bytes()).is_some() {
        Cow::Owned(cell.replace('|', "\\|"))
    } else {
        Cow::Borrowed(cell)
    }
}
