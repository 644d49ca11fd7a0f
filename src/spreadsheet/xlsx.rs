use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::helpers::xml::XmlElement;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::RawCell;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::range_to_indexes;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::MergedRegion;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::ZipArchive;

// XML tag names for parsing the XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell");    // Merged region

/// An opened XLSX workbook
pub struct XlsxWorkbook<RS: Read + Seek> {
    /// File name (or stream label) used in error messages
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<RS>,
    /// Cell types indexed by style ID
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook<BufReader<File>> {
    /// Opens an XLSX file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(ReportError::from)
            .with_prefix(&path.to_string_lossy())?;
        Self::from_reader(BufReader::new(file), &path.to_string_lossy())
    }
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    /// Opens an XLSX workbook from any seekable stream
    ///
    /// # Arguments
    /// * `reader` - Stream positioned at the start of the package
    /// * `name` - Label used in error messages
    pub fn from_reader(mut reader: RS, name: &str) -> Result<Self, ReportError> {
        if excel::is_compound_file(&mut reader)? {
            Err(SpreadsheetError::CompoundFileError(name.to_owned()))?
        }

        let mut zip = ZipArchive::new(reader)?;
        let (sheets, is_1904) = load_workbook(&mut zip).with_prefix(name)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbookError(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904).with_prefix(name)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    /// Returns the worksheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Reads the first worksheet into memory
    pub fn first_sheet(&mut self) -> Result<Sheet, ReportError> {
        let (sheet_name, zip_path) = self.sheets
            .first()
            .cloned()
            .ok_or_else(|| SpreadsheetError::EmptyWorkbookError(self.name.to_owned()))?;
        let shared_strings = self.load_shared_strings().with_prefix(&self.name)?;
        self.read_sheet(&sheet_name, &zip_path, &shared_strings)
            .with_prefix(&format!("{} [{}]", self.name, sheet_name))
    }

    /// Loads the shared string table; a package without one yields an empty table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, ReportError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = reader.read_string(TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Parses a worksheet part: cell values and merged regions
    fn read_sheet(
        &mut self,
        sheet_name: &str,
        zip_path: &str,
        shared_strings: &[String],
    ) -> Result<Sheet, ReportError> {
        let mut sheet = Sheet::new(sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut cell = RawCell {
            row: 0,
            col: 0,
            kind: CellType::default(),
            value: String::new(),
        };
        let mut reader = self.zip.xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                row_count = event.parse_attribute::<usize>("r")?.unwrap_or(row_count + 1);
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (cell.row, cell.col) = event.attribute("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count + 1));
                col_count = cell.col;
                cell.value.clear();
                cell.kind = event.attribute("t")?.map(|t| {
                    match t.as_str() {
                        "inlineStr" | "str" => CellType::InlineString,
                        "s" => CellType::SharedString,
                        "d" => CellType::IsoDateTime,
                        "b" => CellType::Boolean,
                        "e" => CellType::Error,
                        _ => CellType::Number,
                    }
                }).unwrap_or(CellType::Number);
                if cell.kind == CellType::Number {
                    if let Some(format_id) = event.attribute("s")?.filter(|id| !id.is_empty()) {
                        let index = format_id.parse::<usize>()?;
                        cell.kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                cell.value = reader.read_string(TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                cell.value = reader.read_string(TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !cell.value.is_empty() {
                    sheet.push(cell.row, cell.col, cell.to_value(shared_strings)?);
                }
                cell.kind = CellType::default();
            }
            Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                if let Some(((first_row, first_col), (last_row, last_col))) = event.attribute("ref")?
                    .and_then(|range| range_to_indexes(&range))
                {
                    sheet.merge(MergedRegion {
                        first_row: first_row.min(last_row),
                        first_col: first_col.min(last_col),
                        last_row: first_row.max(last_row),
                        last_col: first_col.max(last_col),
                    });
                }
            }
        });

        let (last_row, last_col) = sheet.used_range();
        debug!("Loaded sheet '{}' with used range {}x{}", sheet_name, last_row, last_col);
        Ok(sheet)
    }
}

/// Loads worksheet names and paths, and the date system, from `xl/workbook.xml`
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), ReportError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.attribute("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats from `xl/styles.xml` as cell types indexed by style ID
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, ReportError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id, CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.attribute("numFmtId")?;
            format_indexes.push(id.unwrap_or_else(|| "0".to_owned()));
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}
