//! Low-level package helpers shared by the workbook reader and writer.

pub(crate) mod xml;
pub(crate) mod zip;
