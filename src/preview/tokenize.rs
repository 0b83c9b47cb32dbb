/// Scanner state. Delimiters only mean something while `Unquoted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Quoted,
}

/// Split decoded text into ragged rows of fields.
///
/// One left-to-right pass. Instead of stepping char by char, memchr jumps to
/// the next byte that can change state (`"` `,` `\n` unquoted, `"` quoted) and
/// copies the run in between wholesale. All of those bytes are ASCII, so every
/// slice boundary lands on a char boundary.
///
/// Total: any input yields rows. An unterminated quote simply runs to the end
/// and is closed by the final flush.
pub(crate) fn tokenize(text: &str) -> Vec<Vec<String>> {
    let bytes = text.as_bytes();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::Unquoted;
    let mut i = 0;

    while i < bytes.len() {
        match state {
            State::Unquoted => {
                let Some(off) = memchr::memchr3(b'"', b',', b'\n', &bytes[i..]) else {
                    push_unquoted(&mut field, &text[i..]);
                    break;
                };
                let at = i + off;
                push_unquoted(&mut field, &text[i..at]);
                match bytes[at] {
                    b'"' => state = State::Quoted,
                    b',' => row.push(std::mem::take(&mut field)),
                    _ => {
                        row.push(std::mem::take(&mut field));
                        rows.push(std::mem::take(&mut row));
                    }
                }
                i = at + 1;
            }
            State::Quoted => {
                let Some(off) = memchr::memchr(b'"', &bytes[i..]) else {
                    field.push_str(&text[i..]);
                    break;
                };
                let at = i + off;
                field.push_str(&text[i..at]);
                if bytes.get(at + 1) == Some(&b'"') {
                    field.push('"');
                    i = at + 2;
                } else {
                    state = State::Unquoted;
                    i = at + 1;
                }
            }
        }
    }

    row.push(field);
    rows.push(row);
    drop_trailing_blank(&mut rows);
    rows
}

/// Append an unquoted run, dropping CR so CRLF files read like LF files.
fn push_unquoted(field: &mut String, run: &str) {
    if memchr::memchr(b'\r', run.as_bytes()).is_none() {
        field.push_str(run);
    } else {
        field.extend(run.chars().filter(|&c| c != '\r'));
    }
}

/// The row left open at end of input only counts if it holds something.
/// This is what swallows the phantom row after a trailing newline.
fn drop_trailing_blank(rows: &mut Vec<Vec<String>>) {
    if rows
        .last()
        .is_some_and(|last| last.iter().all(String::is_empty))
    {
        rows.pop();
    }
}
