//! XLSX serialization of the output workbook.
use crate::error::ReportError;
use crate::helpers::zip::ZipWriterHelper;
use crate::spreadsheet::cell::datetime_to_serial;
use crate::spreadsheet::cell::time_to_serial;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::indexes_to_range;
use crate::spreadsheet::CellValue;
use crate::writer::CellStyle;
use crate::writer::TableObject;
use crate::writer::Workbook;
use crate::writer::Worksheet;
use quick_xml::escape::escape;
use std::fmt::Write as FmtWrite;
use std::io::Seek;
use std::io::Write;
use zip::ZipWriter;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const TABLE_STYLE: &str = "TableStyleMedium2";

/// Custom number format for 12-hour times of day.
pub(crate) const TIME_FORMAT: &str = r"[$-F400]h:mm:ss\ AM/PM";
const TIME_FORMAT_ID: usize = 164;

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#,
);

impl CellStyle {
    /// Position in `cellXfs`.
    fn xf_index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Bold => 1,
            Self::Date => 2,
            Self::DateTime => 3,
            Self::Time => 4,
        }
    }
}

/// Writes every package part and finishes the archive.
pub(crate) fn write_package<W: Write + Seek>(workbook: &Workbook, writer: W) -> Result<W, ReportError> {
    let sheet = workbook.worksheet();
    let mut zip = ZipWriter::new(writer);
    zip.write_part("[Content_Types].xml", &content_types_xml(sheet.tables().len())?)?;
    zip.write_part("_rels/.rels", ROOT_RELS)?;
    zip.write_part("xl/workbook.xml", &workbook_xml(sheet.name())?)?;
    zip.write_part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS)?;
    zip.write_part("xl/styles.xml", &styles_xml()?)?;
    zip.write_part("xl/worksheets/sheet1.xml", &sheet_xml(sheet)?)?;
    if !sheet.tables().is_empty() {
        zip.write_part("xl/worksheets/_rels/sheet1.xml.rels", &sheet_rels_xml(sheet.tables().len())?)?;
    }
    for (index, table) in sheet.tables().iter().enumerate() {
        let id = index + 1;
        zip.write_part(&format!("xl/tables/table{id}.xml"), &table_xml(id, table)?)?;
    }
    Ok(zip.finish()?)
}

fn content_types_xml(table_count: usize) -> Result<String, ReportError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#);
    for id in 1..=table_count {
        write!(
            xml,
            r#"<Override PartName="/xl/tables/table{id}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#
        )?;
    }
    xml.push_str("</Types>");
    Ok(xml)
}

fn workbook_xml(sheet_name: &str) -> Result<String, ReportError> {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    write!(
        xml,
        r#"<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_RELATIONSHIPS}"><bookViews><workbookView activeTab="0"/></bookViews><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )?;
    Ok(xml)
}

fn styles_xml() -> Result<String, ReportError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    write!(xml, r#"<styleSheet xmlns="{NS_MAIN}">"#)?;
    write!(
        xml,
        r#"<numFmts count="1"><numFmt numFmtId="{TIME_FORMAT_ID}" formatCode="{}"/></numFmts>"#,
        escape(TIME_FORMAT)
    )?;
    xml.push_str(concat!(
        r#"<fonts count="2">"#,
        r#"<font><sz val="11"/><name val="Calibri"/><family val="2"/></font>"#,
        r#"<font><b/><sz val="11"/><name val="Calibri"/><family val="2"/></font>"#,
        r#"</fonts>"#,
        r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
        r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
        r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    ));
    // Order follows CellStyle::xf_index
    write!(
        xml,
        concat!(
            r#"<cellXfs count="5">"#,
            r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
            r#"<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
            r#"<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
            r#"<xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
            r#"<xf numFmtId="{}" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
            r#"</cellXfs>"#,
        ),
        TIME_FORMAT_ID
    )?;
    xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
    xml.push_str("</styleSheet>");
    Ok(xml)
}

fn sheet_xml(sheet: &Worksheet) -> Result<String, ReportError> {
    let mut xml = String::with_capacity(16 * 1024);
    xml.push_str(XML_DECLARATION);
    write!(xml, r#"<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_RELATIONSHIPS}">"#)?;

    let (last_row, last_col) = sheet.used_range();
    if last_row > 0 && last_col > 0 {
        write!(xml, r#"<dimension ref="{}"/>"#, indexes_to_range((1, 1), (last_row, last_col)))?;
    }

    let mut widths = sheet.widths().peekable();
    if widths.peek().is_some() {
        xml.push_str("<cols>");
        for (col, width) in widths {
            write!(xml, r#"<col min="{col}" max="{col}" width="{width:.2}" customWidth="1"/>"#)?;
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    let mut current_row = None::<usize>;
    for (&(row, col), value) in sheet.cells() {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            write!(xml, r#"<row r="{row}">"#)?;
            current_row = Some(row);
        }
        write_cell(&mut xml, row, col, value, sheet.style(row, col))?;
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.tables().is_empty() {
        write!(xml, r#"<tableParts count="{}">"#, sheet.tables().len())?;
        for id in 1..=sheet.tables().len() {
            write!(xml, r#"<tablePart r:id="rId{id}"/>"#)?;
        }
        xml.push_str("</tableParts>");
    }
    xml.push_str("</worksheet>");
    Ok(xml)
}

fn write_cell(
    xml: &mut String,
    row: usize,
    col: usize,
    value: &CellValue,
    style: CellStyle,
) -> Result<(), ReportError> {
    let reference = index_to_reference(row, col);
    let style = match style.xf_index() {
        0 => String::new(),
        index => format!(r#" s="{index}""#),
    };
    match value {
        CellValue::Empty => (),
        CellValue::Text(text) => {
            let space = if text.trim() != text { r#" xml:space="preserve""# } else { "" };
            write!(xml, r#"<c r="{reference}"{style} t="inlineStr"><is><t{space}>{}</t></is></c>"#, escape(text.as_str()))?;
        }
        CellValue::Number(number) => write!(xml, r#"<c r="{reference}"{style}><v>{number}</v></c>"#)?,
        CellValue::Bool(flag) => write!(xml, r#"<c r="{reference}"{style} t="b"><v>{}</v></c>"#, u8::from(*flag))?,
        CellValue::DateTime(datetime) => {
            write!(xml, r#"<c r="{reference}"{style}><v>{}</v></c>"#, datetime_to_serial(datetime))?
        }
        CellValue::Time(time) => write!(xml, r#"<c r="{reference}"{style}><v>{}</v></c>"#, time_to_serial(time))?,
    }
    Ok(())
}

fn sheet_rels_xml(table_count: usize) -> Result<String, ReportError> {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    write!(xml, r#"<Relationships xmlns="{NS_PACKAGE_RELATIONSHIPS}">"#)?;
    for id in 1..=table_count {
        write!(
            xml,
            r#"<Relationship Id="rId{id}" Type="{NS_RELATIONSHIPS}/table" Target="../tables/table{id}.xml"/>"#
        )?;
    }
    xml.push_str("</Relationships>");
    Ok(xml)
}

fn table_xml(id: usize, table: &TableObject) -> Result<String, ReportError> {
    let range = table.range();
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    write!(
        xml,
        r#"<table xmlns="{NS_MAIN}" id="{id}" name="{name}" displayName="{name}" ref="{range}" totalsRowShown="0">"#,
        name = escape(table.name.as_str())
    )?;
    write!(xml, r#"<autoFilter ref="{range}"/>"#)?;
    write!(xml, r#"<tableColumns count="{}">"#, table.columns.len())?;
    for (index, column) in table.columns.iter().enumerate() {
        write!(xml, r#"<tableColumn id="{}" name="{}"/>"#, index + 1, escape(column.as_str()))?;
    }
    xml.push_str("</tableColumns>");
    write!(
        xml,
        r#"<tableStyleInfo name="{TABLE_STYLE}" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="0"/>"#
    )?;
    xml.push_str("</table>");
    Ok(xml)
}
