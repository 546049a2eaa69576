use std::collections::HashMap;

use crate::template::TemplateError;

/// Substitute `${var}` placeholders; `\$` produces a literal `$`.
///
/// A `$` that does not start a well-formed `${word}` placeholder is kept
/// as-is. Unknown variables are an error.
pub fn expand(template: &str, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '\\' || c == '$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("\\$") {
            out.push('$');
            rest = after;
            continue;
        }

        if let Some((name, after)) = placeholder(tail) {
            let value = vars
                .get(name)
                .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))?;
            out.push_str(value);
            rest = after;
            continue;
        }

        // Lone `\` or `$`: copy one character and keep scanning.
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse `${word}` at the start of `text`, returning the name and the rest.
fn placeholder(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix("${")?;
    let end = body.find('}')?;
    let name = &body[..end];
    if name.is_empty() || !name.chars().all(is_word_char) {
        return None;
    }
    Some((name, &body[end + 1..]))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Output file name for a template file, or `None` if it isn't one.
///
/// `index.template.ts` → `index.ts`, `README.template` → `README`. The
/// marker must be followed by a non-word character or the end of the name.
pub fn strip_template_marker(file_name: &str) -> Option<String> {
    const MARKER: &str = ".template";
    let mut search_from = 0;
    while let Some(found) = file_name[search_from..].find(MARKER) {
        let start = search_from + found;
        let end = start + MARKER.len();
        let boundary = file_name[end..].chars().next().map_or(true, |c| !is_word_char(c));
        if boundary {
            return Some(format!("{}{}", &file_name[..start], &file_name[end..]));
        }
        search_from = end;
    }
    None
}
