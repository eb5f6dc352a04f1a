//! Minimal element tree over `quick-xml` events.
//!
//! UBL documents are small, so the whole document is materialized and then
//! navigated by local name. Namespace prefixes (`cbc:`, `cac:`, `ubl:`) are
//! kept on `name` but ignored for lookups, which keeps the parser tolerant of
//! dialects that prefix differently or not at all. Repeated elements are always
//! plain children, so a single `InvoiceLine` is never special-cased.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XmlTreeError {
    #[error("malformed xml: {0}")]
    Malformed(String),
    #[error("document contains no elements")]
    Empty,
}

/// An element with its attributes, direct text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

fn local(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

impl XmlElement {
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local_name)
    }

    /// Follow a path of local names, taking the first match at each level.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |node, segment| node.child(segment))
    }

    /// Trimmed, non-empty text at `path`.
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.find(path).and_then(XmlElement::trimmed_text)
    }

    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local(k) == local_name)
            .map(|(_, v)| v.as_str())
    }
}

fn open(start: &BytesStart<'_>) -> Result<XmlElement, XmlTreeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlTreeError::Malformed(format!("attribute on <{name}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlTreeError::Malformed(format!("attribute {key} on <{name}>: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlTreeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlTreeError::Malformed(format!(
            "multiple root elements (second is <{}>)",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

/// Parse a document into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, XmlTreeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(open(&e)?),
            Ok(Event::Empty(e)) => {
                let element = open(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlTreeError::Malformed("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| XmlTreeError::Malformed(format!("text in <{}>: {e}", top.name)))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctype.
            Ok(_) => {}
            Err(e) => {
                return Err(XmlTreeError::Malformed(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlTreeError::Malformed(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or(XmlTreeError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigates_by_local_name() {
        let doc = r#"<?xml version="1.0"?>
            <ubl:Invoice xmlns:ubl="u" xmlns:cbc="b" xmlns:cac="a">
                <cbc:ID>CA0766</cbc:ID>
                <cac:LegalMonetaryTotal><cbc:PayableAmount currencyID="RON">10.00</cbc:PayableAmount></cac:LegalMonetaryTotal>
            </ubl:Invoice>"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.local_name(), "Invoice");
        assert_eq!(root.text_at(&["ID"]), Some("CA0766"));
        let amount = root.find(&["LegalMonetaryTotal", "PayableAmount"]).unwrap();
        assert_eq!(amount.trimmed_text(), Some("10.00"));
        assert_eq!(amount.attribute("currencyID"), Some("RON"));
    }

    #[test]
    fn single_repeat_is_still_a_child_list() {
        let root = parse_document("<Invoice><InvoiceLine><ID>1</ID></InvoiceLine></Invoice>").unwrap();
        assert_eq!(root.children_named("InvoiceLine").count(), 1);
    }

    #[test]
    fn unescapes_entities_and_cdata() {
        let root = parse_document("<a><b>Aero &amp; Co</b><c><![CDATA[x<y]]></c></a>").unwrap();
        assert_eq!(root.text_at(&["b"]), Some("Aero & Co"));
        assert_eq!(root.text_at(&["c"]), Some("x<y"));
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(matches!(
            parse_document("<Invoice><ID>1</Name></Invoice>"),
            Err(XmlTreeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_unclosed_document() {
        assert!(matches!(
            parse_document("<Invoice><ID>1</ID>"),
            Err(XmlTreeError::Malformed(_))
        ));
    }

    #[test]
    fn plain_text_has_no_elements() {
        assert_eq!(parse_document("not xml at all"), Err(XmlTreeError::Empty));
    }
}
