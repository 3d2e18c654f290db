//! File name helpers.

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trim and limit length
    let trimmed = sanitized.trim().trim_matches('_');
    if trimmed.chars().count() > 100 {
        trimmed.chars().take(100).collect()
    } else if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derive a file name from anchor text, falling back to the URL's last
/// path segment when the text has nothing usable in it.
///
/// `"Anexo II - Rol (PDF)"` becomes `"Anexo_II_-_Rol_PDF.pdf"`.
pub fn clean_label_filename(label: &str, url: &url::Url, extension: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join("_");

    let name = if cleaned.is_empty() {
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(decode_segment)
            .unwrap_or_default()
    } else {
        cleaned
    };

    let extension = extension.trim_start_matches('.');
    let suffix = format!(".{}", extension.to_lowercase());
    if name.to_lowercase().ends_with(&suffix) {
        name
    } else {
        format!("{}{}", name, suffix)
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Split `name.ext` into `("name", Some("ext"))`.
///
/// Leading dots do not start an extension (`.hidden` has none).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(pos) => (&name[..pos], Some(&name[pos + 1..])),
    }
}
