use crate::domain::claim::{is_content_extension, ContentUnit};
use crate::domain::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

static COLUMN_RUN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+| {2,}").unwrap());

/// Converts one staged file into a normalized `ContentUnit`, dispatched by
/// extension. Unrecognized extensions are rejected up front so no partially
/// parsed content ever reaches the decision engine.
pub fn extract(file_path: &Path, extension: &str) -> Result<ContentUnit> {
    if !is_content_extension(extension) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: .{}",
            extension
        )));
    }

    match extension {
        "docx" => extract_docx(file_path).map(ContentUnit::text),
        "pdf" => extract_pdf(file_path).map(ContentUnit::text),
        _ => extract_image(file_path).map(ContentUnit::image),
    }
}

/// Non-empty paragraph text in document order, then every table as a block
/// of tab-joined rows. Blocks are separated by blank lines.
fn extract_docx(file_path: &Path) -> Result<String> {
    let file_bytes = fs::read(file_path)
        .map_err(|e| AppError::Extraction(format!("Failed to read DOCX file: {}", e)))?;
    let docx = docx_rs::read_docx(&file_bytes)
        .map_err(|e| AppError::Extraction(format!("Failed to parse DOCX file: {}", e)))?;

    let mut paragraphs = Vec::new();
    let mut tables = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(paragraph) => {
                let text = docx_paragraph_text(paragraph);
                if !text.trim().is_empty() {
                    paragraphs.push(text.trim().to_string());
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                let block = docx_table_block(table);
                if !block.is_empty() {
                    tables.push(block);
                }
            }
            _ => {}
        }
    }

    let mut sections = Vec::new();
    if !paragraphs.is_empty() {
        sections.push(paragraphs.join("\n"));
    }
    sections.extend(tables);
    Ok(sections.join("\n\n"))
}

fn docx_paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut buffer = String::new();
    for child in &paragraph.children {
        docx_paragraph_child_text(child, &mut buffer);
    }
    buffer
}

fn docx_paragraph_child_text(child: &docx_rs::ParagraphChild, buffer: &mut String) {
    match child {
        docx_rs::ParagraphChild::Run(run) => docx_run_text(run, buffer),
        docx_rs::ParagraphChild::Hyperlink(link) => {
            for link_child in &link.children {
                docx_paragraph_child_text(link_child, buffer);
            }
        }
        docx_rs::ParagraphChild::Insert(insert) => {
            for insert_child in &insert.children {
                if let docx_rs::InsertChild::Run(run) = insert_child {
                    docx_run_text(run, buffer);
                }
            }
        }
        _ => {}
    }
}

fn docx_run_text(run: &docx_rs::Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(text) => buffer.push_str(&text.text),
            docx_rs::RunChild::InstrTextString(text) => buffer.push_str(text),
            docx_rs::RunChild::Tab(_) | docx_rs::RunChild::PTab(_) => buffer.push('\t'),
            docx_rs::RunChild::Break(_) => buffer.push('\n'),
            docx_rs::RunChild::Sym(sym) => buffer.push_str(&sym.char),
            _ => {}
        }
    }
}

fn docx_table_block(table: &docx_rs::Table) -> String {
    let mut rows = Vec::new();
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let docx_rs::TableRowChild::TableCell(cell) = cell;
            let text = docx_table_cell_text(cell);
            if !text.trim().is_empty() {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            rows.push(cells.join("\t"));
        }
    }
    rows.join("\n")
}

fn docx_table_cell_text(cell: &docx_rs::TableCell) -> String {
    let mut parts = Vec::new();
    for content in &cell.children {
        match content {
            docx_rs::TableCellContent::Paragraph(paragraph) => {
                let text = docx_paragraph_text(paragraph);
                if !text.trim().is_empty() {
                    parts.push(text.trim().to_string());
                }
            }
            docx_rs::TableCellContent::Table(nested) => {
                let block = docx_table_block(nested);
                if !block.is_empty() {
                    parts.push(block.replace('\n', " "));
                }
            }
            _ => {}
        }
    }
    parts.join(" ")
}

/// Per-page text joined with an explicit page-break marker. Receipts come
/// out of PDF text extraction with wildly inconsistent column spacing, so
/// each line is normalized into tab-separated form.
fn extract_pdf(file_path: &Path) -> Result<String> {
    let document = lopdf::Document::load(file_path)
        .map_err(|e| AppError::Extraction(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for (&page_num, _) in document.get_pages().iter() {
        match document.extract_text(&[page_num]) {
            Ok(page_text) => {
                let normalized = normalize_columns(page_text.trim());
                if !normalized.is_empty() {
                    pages.push(normalized);
                }
            }
            Err(err) => {
                tracing::warn!(page = page_num, error = %err, "skipping unreadable PDF page");
            }
        }
    }

    if pages.is_empty() {
        return Err(AppError::Extraction(
            "No text could be extracted from PDF".to_string(),
        ));
    }
    Ok(pages.join(PAGE_BREAK))
}

fn normalize_columns(text: &str) -> String {
    text.lines()
        .map(|line| {
            COLUMN_RUN_PATTERN
                .replace_all(line.trim_end(), "\t")
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Images are not analyzed here; the raw bytes are base64-encoded and handed
/// to the decision engine as-is.
fn extract_image(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)
        .map_err(|e| AppError::Extraction(format!("Failed to read image file: {}", e)))?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
    use std::io::Write;

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    fn write_sample_docx(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("receipt.docx");
        let file = fs::File::create(&path).unwrap();
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Travel: $50")))
            .add_table(Table::new(vec![
                TableRow::new(vec![cell("Item"), cell("Cost")]),
                TableRow::new(vec![cell("Taxi"), cell("$30")]),
            ]))
            .build()
            .pack(file)
            .unwrap();
        path
    }

    #[test]
    fn rejects_unrecognized_extension() {
        let err = extract(Path::new("/tmp/notes.txt"), "txt").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn docx_paragraphs_then_tab_joined_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_docx(dir.path());

        let unit = extract(&path, "docx").unwrap();
        assert!(!unit.is_image);
        assert_eq!(unit.content, "Travel: $50\n\nItem\tCost\nTaxi\t$30");
    }

    #[test]
    fn corrupt_docx_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip container").unwrap();

        let err = extract(&path, "docx").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn image_is_base64_encoded_and_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0x89, 0x50, 0x4e, 0x47]).unwrap();

        let unit = extract(&path, "png").unwrap();
        assert!(unit.is_image);
        assert_eq!(unit.content, BASE64.encode([0x89, 0x50, 0x4e, 0x47]));
    }

    #[test]
    fn column_runs_collapse_to_single_tabs() {
        let raw = "Taxi   $30\t\tairport\nTotal:     $50   ";
        assert_eq!(normalize_columns(raw), "Taxi\t$30\tairport\nTotal:\t$50");
    }
}
