//! Maps an RDF element tree onto a [`Record`].
//!
//! Pipeline:
//!   element tree
//!     └─ ebook element          → scalar fields
//!          ├─ creator / agent   → Contributor
//!          ├─ subject, bookshelf → deduplicated headings
//!          └─ hasFormat / file  → Format snapshot

use std::collections::HashMap;

use folio_core::{Contributor, Format, Record};

use crate::{
  error::{Error, Result},
  rules::{ebook_id, first_year, infer_media_type, join_non_empty, non_empty, split_name},
  tree::Element,
};

/// Path to the literal inside `<rdf:Description><rdf:value>…` wrappers.
const VALUE: &[&str] = &["Description", "value"];

pub(crate) fn extract(root: &Element) -> Result<Record> {
  if root.name != "RDF" {
    return Err(Error::Malformed(format!(
      "expected RDF root element, found <{}>",
      root.name
    )));
  }
  let ebook = root
    .child("ebook")
    .ok_or_else(|| Error::Malformed("no ebook element found".into()))?;

  // Top-level agents, for creators that reference one by `rdf:resource`.
  let agents: HashMap<&str, &Element> = root
    .children_named("agent")
    .filter_map(|a| a.attr("about").map(|about| (about, a)))
    .collect();

  let mut record = Record::default();
  record.ebook_id = ebook.attr("about").and_then(ebook_id);
  record.title = text_of(ebook, "title");
  record.language = language(ebook);
  record.publisher = text_of(ebook, "publisher");
  record.license = ebook.child("license").and_then(resource_or_text);
  record.rights = text_of(ebook, "rights");
  record.issued = text_of(ebook, "issued");
  record.download_count = text_of(ebook, "downloads").and_then(|d| d.parse().ok());
  record.description = join_non_empty(
    ebook.children_named("description").map(|d| d.text.as_str()),
    "\n\n",
  );
  record.summary = text_of(ebook, "marc520");
  record.production_notes = text_of(ebook, "marc508");
  record.reading_ease_score = text_of(ebook, "marc908");

  for creator in ebook.children_named("creator") {
    let nested = creator.child("agent");
    // A nested agent without a usable name may still point at a
    // top-level agent.
    let found = nested.and_then(contributor).or_else(|| {
      creator
        .attr("resource")
        .or_else(|| nested.and_then(|a| a.attr("resource")))
        .and_then(|r| agents.get(r.trim()).copied())
        .and_then(contributor)
    });
    if let Some(found) = found {
      record.push_contributor(found);
    }
  }

  for subject in ebook.children_named("subject") {
    if let Some(value) = described_value(subject) {
      record.push_subject(value);
    }
  }

  for shelf in ebook.children_named("bookshelf") {
    if let Some(value) = described_value(shelf) {
      record.push_bookshelf(value);
    }
  }

  record.formats = ebook
    .children_named("hasFormat")
    .filter_map(|f| f.child("file"))
    .filter_map(format)
    .collect();

  Ok(record)
}

fn text_of(parent: &Element, local: &str) -> Option<String> {
  parent
    .child(local)
    .and_then(Element::trimmed_text)
    .map(str::to_owned)
}

fn described_value(el: &Element) -> Option<String> {
  el.descend(VALUE)
    .and_then(Element::trimmed_text)
    .map(str::to_owned)
}

/// First non-empty of: nested value, resource URI (verbatim), text content;
/// tried element by element in document order.
fn language(ebook: &Element) -> Option<String> {
  ebook.children_named("language").find_map(|lang| {
    described_value(lang)
      .or_else(|| {
        lang
          .attr("resource")
          .filter(|r| !r.trim().is_empty())
          .map(str::to_owned)
      })
      .or_else(|| lang.trimmed_text().map(str::to_owned))
  })
}

fn resource_or_text(el: &Element) -> Option<String> {
  el.attr("resource")
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .or_else(|| el.trimmed_text())
    .map(str::to_owned)
}

fn contributor(agent: &Element) -> Option<Contributor> {
  let name = agent.child("name").and_then(Element::trimmed_text)?;
  let (first, last) = split_name(name);

  Some(Contributor {
    name:       name.to_owned(),
    first_name: non_empty(first),
    last_name:  non_empty(last),
    agent_id:   agent
      .attr("about")
      .map(str::trim)
      .filter(|a| !a.is_empty())
      .map(str::to_owned),
    alias:      join_non_empty(
      agent.children_named("alias").map(|a| a.text.as_str()),
      "; ",
    ),
    webpage:    join_non_empty(
      agent
        .children_named("webpage")
        .map(|w| w.attr("resource").unwrap_or_default()),
      "; ",
    ),
    birth_year: agent.child("birthdate").and_then(|d| first_year(&d.text)),
    death_year: agent.child("deathdate").and_then(|d| first_year(&d.text)),
  })
}

fn format(file: &Element) -> Option<Format> {
  let url = file.attr("about").map(str::trim).unwrap_or_default();
  if url.is_empty() {
    return None;
  }

  let declared = file
    .child("format")
    .and_then(described_value);

  Some(Format {
    media_type: declared.or_else(|| infer_media_type(url).map(str::to_owned)),
    url:        url.to_owned(),
    size:       text_of(file, "extent").and_then(|s| s.parse().ok()),
  })
}
