//! Capabilities patching.
//!
//! Advertises the transcoded format in `GetCapabilities` and
//! `GetProjectSettings` documents by adding a `<Format>` entry to the
//! `GetMap` request description:
//!
//! ```text
//! <GetMap>                          <GetMap>
//!   <Format>image/png</Format>  ──►   <Format>image/tiff</Format>
//!   <DCPType>...</DCPType>            <Format>image/png</Format>
//! </GetMap>                           <DCPType>...</DCPType>
//!                                   </GetMap>
//! ```
//!
//! The document is streamed through `quick-xml` rather than built into a
//! tree. Whitespace between elements is dropped and the output is re-indented
//! with tabs, so the same input always yields the same bytes.

use bytes::Bytes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::CapabilitiesError;

/// XML declaration emitted at the top of every patched document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

const GET_MAP: &[u8] = b"GetMap";
const FORMAT: &[u8] = b"Format";

/// Insert a `<Format>` declaration for `mime` into the first `GetMap` element.
///
/// The new element goes before the first `Format` child of `GetMap`, or at
/// the end of `GetMap` if it has none. Elements are matched by local name, and
/// the new element takes the `GetMap` element's namespace prefix.
///
/// Returns `Ok(None)` when the document has no `GetMap` element.
pub fn patch_capabilities(body: &[u8], mime: &str) -> Result<Option<Bytes>, CapabilitiesError> {
    let xml = std::str::from_utf8(body).map_err(|e| CapabilitiesError::Encoding(e.to_string()))?;
    let xml = xml.trim_start_matches('\u{feff}');

    let mut reader = Reader::from_str(xml);

    let mut writer = Writer::new_with_indent(Vec::with_capacity(body.len() + 64), b'\t', 1);

    let mut depth = 0usize;
    // Depth of the open GetMap element and the name to give the new Format
    let mut get_map: Option<(usize, String)> = None;
    let mut found = false;
    let mut inserted = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,

            // Replaced by the canonical declaration
            Event::Decl(_) => {}

            // Layout between elements; the writer re-indents
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}

            Event::Start(e) => {
                if !found && e.local_name().as_ref() == GET_MAP {
                    found = true;
                    get_map = Some((depth, format_name(&e)));
                } else if let Some(name) = pending_insert(&get_map, depth, inserted, &e) {
                    write_format(&mut writer, &name, mime)?;
                    inserted = true;
                }
                writer.write_event(Event::Start(e))?;
                depth += 1;
            }

            Event::Empty(e) => {
                if !found && e.local_name().as_ref() == GET_MAP {
                    found = true;
                    inserted = true;
                    writer.write_event(Event::Start(e.clone()))?;
                    write_format(&mut writer, &format_name(&e), mime)?;
                    writer.write_event(Event::End(e.to_end()))?;
                    continue;
                }
                if let Some(name) = pending_insert(&get_map, depth, inserted, &e) {
                    write_format(&mut writer, &name, mime)?;
                    inserted = true;
                }
                writer.write_event(Event::Empty(e))?;
            }

            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let closes_get_map = matches!(&get_map, Some((open, _)) if *open == depth);
                if closes_get_map {
                    if let Some((_, name)) = get_map.take() {
                        if !inserted {
                            write_format(&mut writer, &name, mime)?;
                            inserted = true;
                        }
                    }
                }
                writer.write_event(Event::End(e))?;
            }

            event => writer.write_event(event)?,
        }
    }

    if !found {
        return Ok(None);
    }

    let serialized = writer.into_inner();
    let mut out = Vec::with_capacity(XML_DECLARATION.len() + 1 + serialized.len());
    out.extend_from_slice(XML_DECLARATION.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(&serialized);

    Ok(Some(Bytes::from(out)))
}

/// `Format`, with the prefix of the given `GetMap` element.
fn format_name(get_map: &BytesStart<'_>) -> String {
    match get_map.name().prefix() {
        Some(prefix) => format!("{}:Format", String::from_utf8_lossy(prefix.as_ref())),
        None => "Format".to_string(),
    }
}

/// The name for the new element if `e` is the first `Format` child of the
/// open `GetMap`.
fn pending_insert(
    get_map: &Option<(usize, String)>,
    depth: usize,
    inserted: bool,
    e: &BytesStart<'_>,
) -> Option<String> {
    match get_map {
        Some((open_depth, name))
            if !inserted && depth == open_depth + 1 && e.local_name().as_ref() == FORMAT =>
        {
            Some(name.clone())
        }
        _ => None,
    }
}

fn write_format(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    mime: &str,
) -> Result<(), CapabilitiesError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(mime)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Text of every direct `Format` child of the first `GetMap`.
    fn get_map_formats(xml: &[u8]) -> Vec<String> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut formats = Vec::new();
        let mut depth = 0usize;
        let mut get_map_depth = None;
        let mut in_format = false;

        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    if get_map_depth.is_none() && e.local_name().as_ref() == GET_MAP {
                        get_map_depth = Some(depth);
                    } else if get_map_depth == Some(depth.wrapping_sub(1))
                        && e.local_name().as_ref() == FORMAT
                    {
                        in_format = true;
                    }
                    depth += 1;
                }
                Event::Text(t) if in_format => {
                    formats.push(t.unescape().unwrap().into_owned());
                }
                Event::End(_) => {
                    depth -= 1;
                    in_format = false;
                    if get_map_depth == Some(depth) {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        formats
    }

    const CAPABILITIES: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<WMS_Capabilities version="1.3.0">
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>text/xml</Format>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get/></HTTP></DCPType>
      </GetMap>
    </Request>
  </Capability>
</WMS_Capabilities>"#;

    #[test]
    fn test_inserts_before_existing_formats() {
        let patched = patch_capabilities(CAPABILITIES.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        assert_eq!(
            get_map_formats(&patched),
            vec!["image/tiff", "image/png", "image/jpeg"]
        );
    }

    #[test]
    fn test_other_operations_untouched() {
        let patched = patch_capabilities(CAPABILITIES.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        assert_eq!(text.matches("image/tiff").count(), 1);
        assert_eq!(text.matches("<Format>text/xml</Format>").count(), 1);
    }

    #[test]
    fn test_canonical_declaration() {
        let patched = patch_capabilities(CAPABILITIES.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(XML_DECLARATION));
        assert!(lines.next().unwrap().starts_with("<WMS_Capabilities"));
        assert_eq!(text.matches("<?xml").count(), 1);
    }

    #[test]
    fn test_declaration_added_when_missing() {
        let xml = "<Capabilities><GetMap><Format>image/png</Format></GetMap></Capabilities>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        assert!(patched.starts_with(XML_DECLARATION.as_bytes()));
    }

    #[test]
    fn test_no_formats_appends_sole_child() {
        let xml = "<Request><GetMap></GetMap></Request>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        assert_eq!(get_map_formats(&patched), vec!["image/tiff"]);
    }

    #[test]
    fn test_appends_after_other_children() {
        let xml = "<Request><GetMap><DCPType/></GetMap></Request>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        let dcp = text.find("<DCPType/>").unwrap();
        let format = text.find("<Format>image/tiff</Format>").unwrap();
        assert!(dcp < format);
    }

    #[test]
    fn test_empty_get_map_element() {
        let xml = "<Request><GetMap/></Request>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        assert_eq!(get_map_formats(&patched), vec!["image/tiff"]);
    }

    #[test]
    fn test_only_direct_format_children() {
        let xml = "<Request><GetMap><Extra><Format>a</Format></Extra><Format>b</Format></GetMap></Request>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();

        assert_eq!(get_map_formats(&patched), vec!["image/tiff", "b"]);
        let nested = text.find("<Format>a</Format>").unwrap();
        let new = text.find("<Format>image/tiff</Format>").unwrap();
        assert!(nested < new);
    }

    #[test]
    fn test_namespace_prefix_reused() {
        let xml = r#"<wms:Request xmlns:wms="http://www.opengis.net/wms"><wms:GetMap><wms:Format>image/png</wms:Format></wms:GetMap></wms:Request>"#;
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        assert!(text.contains("<wms:Format>image/tiff</wms:Format>"));
        assert_eq!(get_map_formats(&patched), vec!["image/tiff", "image/png"]);
    }

    #[test]
    fn test_only_first_get_map_patched() {
        let xml = "<Root><GetMap><Format>x</Format></GetMap><GetMap><Format>y</Format></GetMap></Root>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        assert_eq!(text.matches("image/tiff").count(), 1);
    }

    #[test]
    fn test_missing_get_map() {
        let xml = "<ServiceExceptionReport><ServiceException>oops</ServiceException></ServiceExceptionReport>";
        assert!(patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_xml() {
        let xml = "<Root><GetMap></Root>";
        assert!(matches!(
            patch_capabilities(xml.as_bytes(), "image/tiff"),
            Err(CapabilitiesError::Xml(_))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            patch_capabilities(&[0x3c, 0xff, 0xfe], "image/tiff"),
            Err(CapabilitiesError::Encoding(_))
        ));
    }

    #[test]
    fn test_text_whitespace_preserved() {
        let xml = "<WMS_Capabilities>\n  <Service>\n    <Title> My Map </Title>\n  </Service>\n  <GetMap>\n    <Format>image/png</Format>\n  </GetMap>\n</WMS_Capabilities>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();

        assert!(text.contains("<Title> My Map </Title>"));
        assert!(!text.contains("<Format>\n"));
        assert_eq!(get_map_formats(&patched), vec!["image/tiff", "image/png"]);
    }

    #[test]
    fn test_deterministic_output() {
        let a = patch_capabilities(CAPABILITIES.as_bytes(), "image/tiff").unwrap();
        let b = patch_capabilities(CAPABILITIES.as_bytes(), "image/tiff").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_escaped_text_preserved() {
        let xml = "<Root><Title>A &amp; B</Title><GetMap/></Root>";
        let patched = patch_capabilities(xml.as_bytes(), "image/tiff")
            .unwrap()
            .unwrap();
        let text = std::str::from_utf8(&patched).unwrap();
        assert!(text.contains("<Title>A &amp; B</Title>"));
    }
}
