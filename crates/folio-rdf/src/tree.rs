//! A lenient element tree built from `quick-xml` events.
//!
//! Names are reduced to their local part, so `pgterms:ebook`, `ebook` and
//! `foo:ebook` are the same element. Mismatched end tags are accepted and
//! elements still open at EOF are closed implicitly. Only a tokenizer error
//! or a document without any element fails.

use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct Element {
  pub name:     String,
  attrs:        Vec<(String, String)>,
  pub text:     String,
  pub children: Vec<Element>,
}

impl Element {
  /// Value of the attribute with local name `local`.
  pub fn attr(&self, local: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|(k, _)| k == local)
      .map(|(_, v)| v.as_str())
  }

  /// First child named `local`.
  pub fn child(&self, local: &str) -> Option<&Element> {
    self.children.iter().find(|c| c.name == local)
  }

  pub fn children_named<'a>(
    &'a self,
    local: &'a str,
  ) -> impl Iterator<Item = &'a Element> + 'a {
    self.children.iter().filter(move |c| c.name == local)
  }

  /// Follow the first matching child at every step of `path`.
  pub fn descend(&self, path: &[&str]) -> Option<&Element> {
    path.iter().try_fold(self, |el, name| el.child(name))
  }

  /// Text content with surrounding whitespace removed; `None` when blank.
  pub fn trimmed_text(&self) -> Option<&str> {
    Some(self.text.trim()).filter(|t| !t.is_empty())
  }
}

/// Parse `xml` into the tree rooted at its first element.
pub(crate) fn parse(xml: &[u8]) -> Result<Element> {
  let mut reader = Reader::from_reader(xml);
  let config = reader.config_mut();
  config.check_end_names = false;
  config.allow_unmatched_ends = true;

  let mut stack: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => stack.push(open(e)),
      Ok(Event::Empty(ref e)) => attach(&mut stack, &mut root, open(e)),
      Ok(Event::End(_)) => {
        // An unmatched end tag at the top level closes nothing.
        if let Some(done) = stack.pop() {
          attach(&mut stack, &mut root, done);
        }
      }
      Ok(Event::Text(ref e)) => {
        if let Some(top) = stack.last_mut() {
          match e.unescape() {
            Ok(text) => top.text.push_str(&text),
            Err(_) => top.text.push_str(&String::from_utf8_lossy(&e[..])),
          }
        }
      }
      Ok(Event::CData(ref e)) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(&String::from_utf8_lossy(&e[..]));
        }
      }
      Ok(Event::Eof) => break,
      Err(e) => {
        return Err(Error::Malformed(format!(
          "xml error at byte {}: {e}",
          reader.buffer_position()
        )));
      }
      _ => {}
    }
    buf.clear();
  }

  while let Some(done) = stack.pop() {
    attach(&mut stack, &mut root, done);
  }

  root.ok_or_else(|| Error::Malformed("document contains no elements".into()))
}

fn open(start: &BytesStart<'_>) -> Element {
  let mut attrs = Vec::new();
  for attr in start.attributes().with_checks(false).flatten() {
    if attr.key.as_ref().starts_with(b"xmlns") {
      continue;
    }
    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
    let value = match attr.unescape_value() {
      Ok(v) => v.into_owned(),
      Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
    };
    attrs.push((key, value));
  }

  Element {
    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
    attrs,
    ..Default::default()
  }
}

/// Hang `el` under the innermost open element, or make it the root if none
/// is open. Later top-level elements are dropped.
fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
  if let Some(parent) = stack.last_mut() {
    parent.children.push(el);
  } else if root.is_none() {
    *root = Some(el);
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
