//! `application/x-www-form-urlencoded` body parsing.

use crate::codec::Charset;

/// Parsed form fields in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Decode `body` with `charset` and parse it as form fields.
///
/// Percent escapes are decoded as UTF-8 after the charset pass, so a body
/// posted by a browser in the page charset and one escaped by a script both
/// come out as text.
pub fn parse(body: &[u8], charset: Charset) -> FormData {
    let text = charset.decode(body);
    let pairs = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect();
    FormData { pairs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_escapes() {
        let form = parse(b"name=J%C3%BCrgen+K&tag=a&tag=b&empty=", Charset::default());
        assert_eq!(form.get("name"), Some("Jürgen K"));
        assert_eq!(form.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(form.get("empty"), Some(""));
        assert_eq!(form.get("missing"), None);
        assert_eq!(form.len(), 4);
    }

    #[test]
    fn decodes_raw_bytes_with_charset() {
        let gbk = Charset::from_label("gbk").unwrap();
        let mut body = b"q=".to_vec();
        body.extend_from_slice(&gbk.encode("中文"));
        let form = parse(&body, gbk);
        assert_eq!(form.get("q"), Some("中文"));
    }

    #[test]
    fn empty_body_is_empty_form() {
        assert!(parse(b"", Charset::default()).is_empty());
    }
}
