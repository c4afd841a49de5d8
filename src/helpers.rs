use std::borrow::Cow;

/// Looks up a `name=value` parameter in a header value such as
/// `multipart/form-data; boundary="abc"` or `form-data; name=field`.
///
/// Parameter names compare case-insensitively. Values may be quoted, and a
/// parameter ends at `;`, `,` or the end of the string.
pub(crate) fn param<'a>(header: &'a str, name: &str) -> Option<Cow<'a, str>> {
    Params { rest: header }
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

struct Params<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Params<'a> {
    type Item = (&'a str, Cow<'a, str>);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let end = segment_end(self.rest);
            let segment = &self.rest[..end];
            self.rest = self.rest.get(end + 1..).unwrap_or("");

            if let Some((key, value)) = segment.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    return Some((key, unquote(value.trim())));
                }
            }
        }

        None
    }
}

fn segment_end(s: &str) -> usize {
    let mut quoted = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' | ',' if !quoted => return idx,
            _ => {}
        }
    }

    s.len()
}

fn unquote(value: &str) -> Cow<'_, str> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        if !inner.contains('\\') {
            return Cow::Borrowed(inner);
        }

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => out.extend(chars.next()),
                ch => out.push(ch),
            }
        }
        return Cow::Owned(out);
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Cow::Borrowed(&value[1..value.len() - 1]);
    }

    Cow::Borrowed(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_unquoted() {
        let ct = "multipart/form-data; boundary=ABCDEFG";
        assert_eq!(param(ct, "boundary").as_deref(), Some("ABCDEFG"));
        assert_eq!(param(ct, "BOUNDARY").as_deref(), Some("ABCDEFG"));
        assert_eq!(param(ct, "charset"), None);
    }

    #[test]
    fn test_param_quoted() {
        let ct = "multipart/form-data; boundary=\"----WebKitFormBoundary; x\"";
        assert_eq!(param(ct, "boundary").as_deref(), Some("----WebKitFormBoundary; x"));

        let cd = r#"form-data; name="a \"quoted\" name""#;
        assert_eq!(param(cd, "name").as_deref(), Some(r#"a "quoted" name"#));

        let cd = "form-data; filename='single.txt'";
        assert_eq!(param(cd, "filename").as_deref(), Some("single.txt"));
    }

    #[test]
    fn test_param_terminators() {
        let ct = "multipart/form-data; boundary=abc, charset=utf-8";
        assert_eq!(param(ct, "boundary").as_deref(), Some("abc"));
        assert_eq!(param(ct, "charset").as_deref(), Some("utf-8"));

        let ct = "multipart/form-data;boundary = abc ;x=y";
        assert_eq!(param(ct, "boundary").as_deref(), Some("abc"));
    }

    #[test]
    fn test_name_does_not_match_filename() {
        let cd = r#"form-data; filename="file.txt"; name="upload""#;
        assert_eq!(param(cd, "name").as_deref(), Some("upload"));
        assert_eq!(param(cd, "filename").as_deref(), Some("file.txt"));

        let cd = r#"form-data; filename="file.txt""#;
        assert_eq!(param(cd, "name"), None);
    }

    #[test]
    fn test_param_unicode() {
        let cd = "form-data; name=\"কখগ\"; filename=\"你好.txt\"";
        assert_eq!(param(cd, "name").as_deref(), Some("কখগ"));
        assert_eq!(param(cd, "filename").as_deref(), Some("你好.txt"));
    }
}
