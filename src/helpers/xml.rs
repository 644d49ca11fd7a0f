//! Event reader over the XML parts of an `.xlsx` package.
use crate::error::ReportError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

const TAG_PHONETIC_RUN: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown entity '&{0};'")]
    UnknownEntityError(String),

    #[error("Invalid value '{1}' of attribute '{0}'")]
    AttributeValueError(String, String),
}

pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// `<c/>` is reported as a start and an end event, text is kept untrimmed.
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, `None` once the part is exhausted.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, ReportError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }

    /// Collects the string held by the element the reader just entered.
    ///
    /// Rich and inline strings keep their characters in `<t>` runs, so only
    /// those are read (`bare` is false); a `<v>` element holds the text
    /// directly (`bare` is true). Phonetic guides are never part of the value.
    pub(crate) fn read_string(&mut self, end: QName, bare: bool) -> Result<String, ReportError> {
        let mut in_phonetic_run = false;
        let mut in_text = bare;
        let mut text = String::new();
        crate::match_xml_events!(self => {
            Event::End(event) if event.name() == end => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_RUN => in_phonetic_run = true,
            Event::End(event) if event.name() == TAG_PHONETIC_RUN => in_phonetic_run = false,
            Event::Start(event) if !in_phonetic_run && event.name() == TAG_TEXT => in_text = true,
            Event::End(event) if !bare && event.name() == TAG_TEXT => in_text = false,
            Event::Text(event) if in_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if in_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if in_text => push_reference(&mut text, &event)?,
        });
        Ok(text)
    }
}

/// Appends an entity (`&amp;`) or character reference (`&#1057;`, `&#x421;`).
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), ReportError> {
    let name = reference.xml_content()?;
    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        Some(hex) => Some(u32::from_str_radix(hex, 16)?),
        None => name.strip_prefix('#').map(str::parse::<u32>).transpose()?,
    };
    match code {
        Some(code) => text.extend(char::from_u32(code)),
        None => text.push_str(resolve_xml_entity(&name).ok_or_else(|| XmlError::UnknownEntityError(name.to_string()))?),
    }
    Ok(())
}

/// Attribute lookup on a start tag.
pub(crate) trait XmlElement {
    fn attribute(&self, name: &str) -> Result<Option<String>, ReportError>;

    fn parse_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, ReportError>;
}

impl XmlElement for BytesStart<'_> {
    fn attribute(&self, name: &str) -> Result<Option<String>, ReportError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
            None => Ok(None),
        }
    }

    fn parse_attribute<T: FromStr>(&self, name: &str) -> Result<Option<T>, ReportError> {
        self.attribute(name)?
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| XmlError::AttributeValueError(name.to_owned(), value).into())
            })
            .transpose()
    }
}

/// Loops over the reader's events, dispatching to the given arms and ignoring the rest.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
