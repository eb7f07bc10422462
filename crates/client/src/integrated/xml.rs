//! XML wire codec for the integrated API
//!
//! The request document is emitted without pretty-printing so the bytes
//! are reproducible; the response envelope is flattened into sequences
//! at this boundary, so the reconciliation logic never branches on the
//! single-child/multi-child ambiguity of XML.

use std::collections::BTreeMap;
use std::io::Cursor;

use adknowledge_domain::{AdknowledgeError, Recipient, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Serialize recipients into the request document.
///
/// `<?xml version="1.0" encoding="UTF-8"?><request><email><field>value</field>…</email>…</request>`
/// with one `<email>` per recipient, child elements in fixed field
/// order, no whitespace between elements.
pub fn write_request(recipients: &[Recipient]) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_event(&mut writer, Event::Start(BytesStart::new("request")))?;
    for recipient in recipients {
        write_event(&mut writer, Event::Start(BytesStart::new("email")))?;
        for (name, value) in recipient.fields() {
            write_event(&mut writer, Event::Start(BytesStart::new(name)))?;
            write_event(&mut writer, Event::Text(BytesText::new(&value)))?;
            write_event(&mut writer, Event::End(BytesEnd::new(name)))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("email")))?;
    }
    write_event(&mut writer, Event::End(BytesEnd::new("request")))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| AdknowledgeError::InvalidArgument(format!("non-UTF-8 request body: {e}")))
}

fn write_event(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| AdknowledgeError::InvalidArgument(format!("xml write failed: {e}")))
}

/// The parsed `<result>` envelope, single-or-multiple children already
/// normalized to sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingResult {
    /// One flat field map per `<email>` success entry.
    pub emails: Vec<BTreeMap<String, String>>,
    /// One flat field map per `<error>` entry.
    pub errors: Vec<BTreeMap<String, String>>,
}

/// Parse a response body into a [`MappingResult`].
///
/// # Errors
/// `RemoteApi` when the body is not well-formed XML; the parse detail is
/// carried in the message.
pub fn parse_result(body: &str) -> Result<MappingResult> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut result = MappingResult::default();
    // (is_email, accumulated fields) for the entry being read
    let mut entry: Option<(bool, BTreeMap<String, String>)> = None;
    let mut field: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(|e| {
            AdknowledgeError::RemoteApi(format!("unparseable XML response: {e}"))
        })? {
            Event::Start(e) => {
                let name = local_name(&e);
                if entry.is_none() {
                    match name.as_str() {
                        "email" => entry = Some((true, BTreeMap::new())),
                        "error" => entry = Some((false, BTreeMap::new())),
                        // the <result> root and anything unknown
                        _ => {}
                    }
                } else if field.is_none() {
                    field = Some(name);
                    text.clear();
                }
                // deeper nesting inside a field is not part of the wire
                // format and is ignored
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if let Some((_, fields)) = entry.as_mut() {
                    if field.is_none() {
                        fields.insert(name, String::new());
                    }
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    let chunk = t.unescape().map_err(|e| {
                        AdknowledgeError::RemoteApi(format!("unparseable XML response: {e}"))
                    })?;
                    text.push_str(&chunk);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if field.as_deref() == Some(name.as_str()) {
                    if let Some((_, fields)) = entry.as_mut() {
                        fields.insert(name, std::mem::take(&mut text));
                    }
                    field = None;
                } else if name == "email" || name == "error" {
                    if let Some((is_email, fields)) = entry.take() {
                        if is_email {
                            result.emails.push(fields);
                        } else {
                            result.errors.push(fields);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(result)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients() -> Vec<Recipient> {
        let mut a = Recipient::new("md5_1", "101", "hotmail.com");
        a.countrycode = Some("US".into());
        let b = Recipient::new("md5_2", "101", "gmail.com");
        vec![a, b]
    }

    #[test]
    fn request_document_is_single_line_and_byte_stable() {
        let xml = write_request(&recipients()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <request>\
             <email><recipient>md5_1</recipient><list>101</list><domain>hotmail.com</domain><countrycode>US</countrycode></email>\
             <email><recipient>md5_2</recipient><list>101</list><domain>gmail.com</domain></email>\
             </request>"
        );
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn request_document_escapes_values() {
        let r = Recipient::new("a&b", "101", "ex<ample>.com");
        let xml = write_request(&[r]).unwrap();
        assert!(xml.contains("<recipient>a&amp;b</recipient>"));
        assert!(xml.contains("<domain>ex&lt;ample&gt;.com</domain>"));
    }

    #[test]
    fn empty_batch_serializes_an_empty_request_element() {
        let xml = write_request(&[]).unwrap();
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?><request></request>");
    }

    #[test]
    fn parses_a_single_email_entry_into_a_sequence() {
        let body = "<result><email><recipient>md5_1</recipient><template>42</template></email></result>";
        let result = parse_result(body).unwrap();
        assert_eq!(result.emails.len(), 1);
        assert!(result.errors.is_empty());
        assert_eq!(result.emails[0]["recipient"], "md5_1");
        assert_eq!(result.emails[0]["template"], "42");
    }

    #[test]
    fn parses_multiple_entries_of_both_kinds() {
        let body = "<result>\
                    <email><recipient>a</recipient></email>\
                    <email><recipient>b</recipient></email>\
                    <error><recipient>c</recipient><str>no match</str><num>99</num></error>\
                    </result>";
        let result = parse_result(body).unwrap();
        assert_eq!(result.emails.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0]["str"], "no match");
        assert_eq!(result.errors[0]["num"], "99");
    }

    #[test]
    fn self_closing_fields_come_back_empty() {
        let body = "<result><email><recipient>a</recipient><subid/></email></result>";
        let result = parse_result(body).unwrap();
        assert_eq!(result.emails[0]["subid"], "");
    }

    #[test]
    fn unescapes_text_content() {
        let body = "<result><error><recipient>a</recipient><str>bad &amp; broken</str></error></result>";
        let result = parse_result(body).unwrap();
        assert_eq!(result.errors[0]["str"], "bad & broken");
    }

    #[test]
    fn malformed_xml_surfaces_as_remote_api_error() {
        let err = parse_result("<result><email></result>").unwrap_err();
        assert!(matches!(err, AdknowledgeError::RemoteApi(_)));
    }

    #[test]
    fn writes_and_reads_are_inverse_for_the_field_maps() {
        let xml = write_request(&recipients()).unwrap();
        // the request/response formats share the entry shape
        let echoed = xml.replace("request>", "result>");
        let result = parse_result(&echoed).unwrap();
        assert_eq!(result.emails.len(), 2);
        assert_eq!(result.emails[0]["countrycode"], "US");
    }
}
