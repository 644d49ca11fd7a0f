use crate::error::ReportError;
use crate::spreadsheet::grid::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::TimeDelta;
use chrono::Timelike;

const MILLISECONDS_PER_DAY: f64 = 86_400_000f64;

/// Storage kind of a raw worksheet cell, combining the `t` attribute and the number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Quoted literals, escapes and bracketed sections (colors, locales) are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_bracket && !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// A cell as read from the worksheet XML, before typing.
#[derive(Clone, Debug)]
pub(crate) struct RawCell {
    /// Row number (1-based)
    pub(crate) row: usize,
    /// Column number (1-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the XML
    pub(crate) value: String,
}

impl RawCell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Resolves the raw XML value to a typed cell value.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<CellValue, ReportError> {
        let value = match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::Boolean => CellValue::Bool(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => CellValue::Number(self.to_double()?),
            CellType::NumberDateTime1900 | CellType::NumberDate1900 |
            CellType::NumberDateTime1904 | CellType::NumberDate1904 => {
                CellValue::DateTime(self.to_datetime()?)
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                let serial = self.to_double()?;
                if (0.0..1.0).contains(&serial) {
                    CellValue::Time(serial_to_time(serial))
                } else {
                    CellValue::DateTime(self.to_datetime()?)
                }
            }
            CellType::IsoDateTime => parse_iso_datetime(&self.value)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(self.value.to_owned())),
            CellType::InlineString | CellType::Error => CellValue::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.parse::<usize>()?;
                let text = shared_strings
                    .get(index)
                    .ok_or_else(|| self.error(format!("shared string {} out of range", index)))?;
                CellValue::Text(text.to_owned())
            }
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, ReportError> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| self.error(format!("parse '{}' to number failed", self.value)).into())
    }

    fn to_datetime(&self) -> Result<NaiveDateTime, ReportError> {
        let serial = self.to_double()?;
        serial_to_datetime(serial, self.kind.is_1904())
            .ok_or_else(|| self.error(format!("serial '{}' is not a valid date", self.value)).into())
    }

    fn error(&self, message: String) -> SpreadsheetError {
        SpreadsheetError::CellValueError(self.reference(), message)
    }
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .expect("NaiveDate Literal")
        .and_time(NaiveTime::MIN)
}

/// Converts a serial date number to a date-time.
/// Serials below 60 in the 1900 system are shifted for the Lotus 1-2-3 leap year bug.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1_462
    } else if days < 60 {
        1
    } else {
        0
    };
    let milliseconds = (serial.fract() * MILLISECONDS_PER_DAY).round() as i64;
    excel_epoch()
        .checked_add_signed(TimeDelta::try_days(days.checked_add(offset)?)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(milliseconds)?)
}

/// Converts the fractional part of a serial number to a time of day.
pub(crate) fn serial_to_time(serial: f64) -> NaiveTime {
    let milliseconds = (serial.fract() * MILLISECONDS_PER_DAY).round() as i64;
    NaiveTime::MIN + TimeDelta::milliseconds(milliseconds)
}

/// Converts a date-time to a 1900-system serial number.
pub(crate) fn datetime_to_serial(datetime: &NaiveDateTime) -> f64 {
    let days = (datetime.date() - excel_epoch().date()).num_days();
    let days = if days < 61 { days - 1 } else { days };
    days as f64 + time_to_serial(&datetime.time())
}

/// Converts a time of day to a serial day fraction.
pub(crate) fn time_to_serial(time: &NaiveTime) -> f64 {
    let milliseconds = time.num_seconds_from_midnight() as f64 * 1_000f64 + (time.nanosecond() / 1_000_000) as f64;
    milliseconds / MILLISECONDS_PER_DAY
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}
