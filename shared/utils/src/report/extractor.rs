//! Report Content Extractor
//!
//! Turns an uploaded PDF, Excel workbook or CSV file into plain text for the
//! analysis prompt.

use std::io::{Cursor, Read, Seek};
use std::panic::{self, AssertUnwindSafe};

use brandlens_models::{FileKind, UploadedFile};
use calamine::{open_workbook_from_rs, DataType, Range, Reader, Xls, Xlsx};
use tracing::debug;

use crate::error::{BrandlensError, BrandlensResult};

/// Extract plain text from an uploaded report.
///
/// The caller is expected to have run [`crate::validate_upload`] first; an
/// undetectable kind still fails here with `UnsupportedFileType`.
pub fn extract(file: &UploadedFile) -> BrandlensResult<String> {
    let kind = file
        .kind()
        .ok_or_else(|| BrandlensError::unsupported_file_type(&file.filename, &file.content_type))?;

    debug!(filename = %file.filename, kind = kind.as_str(), size = file.size_bytes(), "Extracting report text");

    match kind {
        FileKind::Pdf => extract_pdf(&file.data),
        FileKind::Xlsx => {
            let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(file.data.as_slice()))
                .map_err(|e| BrandlensError::extraction(format!("Failed to open Excel workbook: {}", e)))?;
            workbook_to_text(workbook)
        }
        FileKind::Xls => {
            let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(file.data.as_slice()))
                .map_err(|e| BrandlensError::extraction(format!("Failed to open Excel workbook: {}", e)))?;
            workbook_to_text(workbook)
        }
        FileKind::Csv => extract_csv(&file.data),
    }
}

/// PDF text, one line per page with the page's text runs joined by single
/// spaces.
pub fn extract_pdf(data: &[u8]) -> BrandlensResult<String> {
    // pdf-extract panics on some malformed documents instead of erroring
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(data)
    }));

    let pages = match result {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => return Err(BrandlensError::extraction(format!("Failed to extract text from PDF: {}", e))),
        Err(_) => {
            return Err(BrandlensError::extraction(
                "Failed to extract text from PDF: malformed or encrypted document",
            ))
        }
    };

    let text = pages
        .iter()
        .map(|page| page.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(text)
}

/// Every sheet in workbook order, each prefixed by its name.
fn workbook_to_text<RS, R>(mut workbook: R) -> BrandlensResult<String>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let sheet_names = workbook.sheet_names().to_owned();
    if sheet_names.is_empty() {
        return Err(BrandlensError::extraction("No sheets found in workbook"));
    }

    let mut text = String::new();
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .ok_or_else(|| BrandlensError::extraction(format!("Sheet '{}' not found", sheet_name)))?
            .map_err(|e| BrandlensError::extraction(format!("Failed to read sheet '{}': {:?}", sheet_name, e)))?;

        text.push_str(&format!("Sheet {}:\n{}\n\n", sheet_name, render_range(&range)));
    }

    Ok(text)
}

fn render_range(range: &Range<DataType>) -> String {
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    render_rows(&rows)
}

/// CSV rendered the same way as a single worksheet, without a sheet prefix.
pub fn extract_csv(data: &[u8]) -> BrandlensResult<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|field| field.to_string()).collect::<Vec<_>>());
    }

    Ok(render_rows(&rows))
}

/// Tab-separated cells, one row per line. Rows with no content are kept so
/// that blank separator rows in a sheet survive.
fn render_rows(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.trim()).collect::<Vec<_>>().join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}
