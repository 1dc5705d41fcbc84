//! String-level normalization rules applied during extraction.

use std::sync::LazyLock;

use regex::Regex;

static YEAR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[0-9]{4}").expect("year pattern is valid"));

/// Ordered URL substrings used when a format declares no media type.
const MEDIA_TYPE_HINTS: &[(&[&str], &str)] = &[
  (&["epub"], "application/epub+zip"),
  (&["kindle"], "application/x-mobipocket-ebook"),
  (&["html"], "text/html"),
  (&["txt", "plain"], "text/plain"),
];

/// The last path segment of `uri` made only of ASCII digits.
pub(crate) fn ebook_id(uri: &str) -> Option<String> {
  uri
    .split('/')
    .rev()
    .find(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
    .map(str::to_owned)
}

/// The first run of four digits in a free-text date.
pub(crate) fn first_year(date: &str) -> Option<i32> {
  YEAR.find(date).and_then(|m| m.as_str().parse().ok())
}

/// Split a display name into `(first, last)`.
///
/// `"Last, First"` splits on the first comma. Otherwise the name is split on
/// whitespace: a single token is a last name (organizations, mononyms), and
/// with two or more tokens the first and final ones are used.
pub fn split_name(full: &str) -> (String, String) {
  let full = full.trim();
  if let Some((last, first)) = full.split_once(',') {
    return (first.trim().to_owned(), last.trim().to_owned());
  }

  let tokens: Vec<&str> = full.split_whitespace().collect();
  match tokens.as_slice() {
    [] => (String::new(), String::new()),
    [only] => (String::new(), (*only).to_owned()),
    [first, .., last] => ((*first).to_owned(), (*last).to_owned()),
  }
}

/// Guess a media type from a format URL.
pub(crate) fn infer_media_type(url: &str) -> Option<&'static str> {
  let url = url.to_lowercase();
  MEDIA_TYPE_HINTS
    .iter()
    .find(|(hints, _)| hints.iter().any(|h| url.contains(h)))
    .map(|(_, media_type)| *media_type)
}

/// Trim every value, drop the blank ones and join the rest with `sep`.
pub(crate) fn join_non_empty<'a>(
  values: impl IntoIterator<Item = &'a str>,
  sep: &str,
) -> Option<String> {
  let kept: Vec<&str> = values
    .into_iter()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .collect();
  if kept.is_empty() { None } else { Some(kept.join(sep)) }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
  if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn id_is_last_numeric_segment() {
    assert_eq!(ebook_id("ebooks/84").as_deref(), Some("84"));
    assert_eq!(ebook_id("http://www.gutenberg.org/ebooks/1342/").as_deref(), Some("1342"));
    assert_eq!(ebook_id("ebooks/84/files").as_deref(), Some("84"));
    assert_eq!(ebook_id("ebooks/pg84"), None);
    assert_eq!(ebook_id(""), None);
  }

  #[test]
  fn year_is_first_four_digit_run() {
    assert_eq!(first_year("1797-08-30"), Some(1797));
    assert_eq!(first_year("circa 1564, baptised 1564"), Some(1564));
    assert_eq!(first_year("12th century"), None);
    assert_eq!(first_year(""), None);
  }

  #[test]
  fn split_name_forms() {
    assert_eq!(
      split_name("Doyle, Arthur Conan"),
      ("Arthur Conan".to_owned(), "Doyle".to_owned())
    );
    assert_eq!(split_name("Mark Twain"), ("Mark".to_owned(), "Twain".to_owned()));
    assert_eq!(split_name("Voltaire"), (String::new(), "Voltaire".to_owned()));
    assert_eq!(
      split_name("Johann Wolfgang von Goethe"),
      ("Johann".to_owned(), "Goethe".to_owned())
    );
    assert_eq!(split_name("   "), (String::new(), String::new()));
  }

  #[test]
  fn media_type_hints_in_order() {
    assert_eq!(
      infer_media_type("https://www.gutenberg.org/ebooks/84.epub.images"),
      Some("application/epub+zip")
    );
    assert_eq!(
      infer_media_type("https://www.gutenberg.org/ebooks/84.kindle.noimages"),
      Some("application/x-mobipocket-ebook")
    );
    assert_eq!(
      infer_media_type("https://www.gutenberg.org/ebooks/84.HTML.images"),
      Some("text/html")
    );
    assert_eq!(infer_media_type("https://www.gutenberg.org/files/84/84-0.txt"), Some("text/plain"));
    assert_eq!(infer_media_type("https://www.gutenberg.org/cache/epub/84/pg84.cover.medium.jpg"), Some("application/epub+zip"));
    assert_eq!(infer_media_type("https://www.gutenberg.org/files/84/84-0.zip"), None);
  }

  #[test]
  fn join_drops_blank_entries() {
    assert_eq!(
      join_non_empty([" a ", "", "  ", "b"], "; ").as_deref(),
      Some("a; b")
    );
    assert_eq!(join_non_empty(["", " "], "; "), None);
  }
}
