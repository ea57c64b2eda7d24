/// Minimal HTML escaping for text and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// File name for a license page.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so the result is safe both
/// as a path component and inside an href. Leading dots are replaced too.
pub fn page_file_name(license_name: &str) -> String {
    let mut stem: String = license_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.starts_with('.') {
        stem.replace_range(..1, "_");
    }
    if stem.is_empty() {
        stem.push('_');
    }

    format!("{}.html", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_page_file_name() {
        assert_eq!(page_file_name("MATLAB"), "MATLAB.html");
        assert_eq!(page_file_name("Signal_Toolbox-2.0"), "Signal_Toolbox-2.0.html");
        assert_eq!(page_file_name("a b/c"), "a_b_c.html");
        assert_eq!(page_file_name("../etc/passwd"), "_._etc_passwd.html");
        assert_eq!(page_file_name(""), "_.html");
    }
}
