use crate::helpers;
use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    /// Returns `None` when the part has no `Content-Disposition` header at all.
    pub(crate) fn parse(headers: &HeaderMap) -> Option<ContentDisposition> {
        let raw = headers.get(header::CONTENT_DISPOSITION)?;
        let content_disposition = String::from_utf8_lossy(raw.as_bytes());

        let field_name = helpers::param(&content_disposition, "name").map(|name| name.into_owned());
        let file_name = helpers::param(&content_disposition, "filename").map(|name| name.into_owned());

        Some(ContentDisposition { field_name, file_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_field_name_and_file_name() {
        let cd = ContentDisposition::parse(&headers(r#"form-data; name="my_field"; filename="file abc.txt""#)).unwrap();
        assert_eq!(cd.field_name.as_deref(), Some("my_field"));
        assert_eq!(cd.file_name.as_deref(), Some("file abc.txt"));

        let cd = ContentDisposition::parse(&headers("form-data; name=plain")).unwrap();
        assert_eq!(cd.field_name.as_deref(), Some("plain"));
        assert_eq!(cd.file_name, None);
    }

    #[test]
    fn test_utf8_file_name() {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_bytes("form-data; name=\"কখগ\"; filename=\"你好.txt\"".as_bytes()).unwrap();
        headers.insert(header::CONTENT_DISPOSITION, value);

        let cd = ContentDisposition::parse(&headers).unwrap();
        assert_eq!(cd.field_name.as_deref(), Some("কখগ"));
        assert_eq!(cd.file_name.as_deref(), Some("你好.txt"));
    }

    #[test]
    fn test_missing_header() {
        assert!(ContentDisposition::parse(&HeaderMap::new()).is_none());
    }
}
