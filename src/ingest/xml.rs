// src/ingest/xml.rs
//! Splits an XML feed into raw per-item slices so a bad item only costs
//! that item.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseError;

pub(crate) struct XmlItems<'a> {
    doc: &'a str,
    reader: Reader<&'a [u8]>,
    tag: &'static [u8],
    index: usize,
    done: bool,
}

impl<'a> XmlItems<'a> {
    /// `reader` must be reading `doc`; scanning continues from its position.
    pub(crate) fn new(doc: &'a str, reader: Reader<&'a [u8]>, tag: &'static [u8]) -> Self {
        Self {
            doc,
            reader,
            tag,
            index: 0,
            done: false,
        }
    }

    fn byte_pos(&self) -> usize {
        self.reader.buffer_position() as usize
    }
}

impl<'a> Iterator for XmlItems<'a> {
    /// (item index, raw `<item>...</item>` slice)
    type Item = Result<(usize, &'a str), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let before = self.byte_pos();
            match self.reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == self.tag => {
                    let end = e.to_end().into_owned();
                    let index = self.index;
                    self.index += 1;
                    if let Err(err) = self.reader.read_to_end(end.name()) {
                        self.done = true;
                        return Some(Err(ParseError::Document(format!(
                            "unterminated item #{index}: {err}"
                        ))));
                    }
                    let after = self.byte_pos();
                    let slice = self.doc.get(before..after).unwrap_or_default().trim_start();
                    return Some(Ok((index, slice)));
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == self.tag => {
                    let index = self.index;
                    self.index += 1;
                    return Some(Err(ParseError::Entry {
                        index,
                        reason: "empty element".into(),
                    }));
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(ParseError::Document(format!(
                        "at byte {}: {err}",
                        self.byte_pos()
                    ))));
                }
            }
        }
    }
}

/// quick-xml only knows the five XML entities; feeds routinely use HTML ones.
pub(crate) fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(doc: &str) -> Vec<Result<(usize, &str), ParseError>> {
        let mut reader = Reader::from_str(doc);
        // skip the root element
        loop {
            if let Ok(Event::Start(_)) = reader.read_event() {
                break;
            }
        }
        XmlItems::new(doc, reader, b"item").collect()
    }

    #[test]
    fn yields_each_item_slice() {
        let doc = "<rss><channel><item><title>A</title></item>\n<item><title>B</title></item></channel></rss>";
        let out = items(doc);
        assert_eq!(out.len(), 2);
        let (idx, slice) = out[1].clone().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(slice, "<item><title>B</title></item>");
    }

    #[test]
    fn broken_tail_yields_prefix_then_error() {
        let doc = "<rss><channel><item><title>A</title></item><item><title>B</title></channel></rss>";
        let out = items(doc);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(ParseError::Document(_))));
    }

    #[test]
    fn scrubs_common_html_entities() {
        assert_eq!(scrub_html_entities("a&nbsp;b&mdash;c"), "a&#160;b-c");
    }
}
