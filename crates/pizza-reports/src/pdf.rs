//! PDF rendering.
//!
//! Layout is computed in points first (`layout_pages`) and then written
//! out with printpdf's built-in Helvetica, so pagination is testable
//! without parsing the document back.

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::error::{ReportError, ReportResult};
use crate::table::ReportTable;

/// A4 portrait, in points.
pub const PAGE_WIDTH_PT: f32 = 595.28;
pub const PAGE_HEIGHT_PT: f32 = 841.89;

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 10.0;
const MARGIN: f32 = 40.0;
const HEADER_OFFSET: f32 = 70.0;
const HEADER_ADVANCE: f32 = 18.0;
const ROW_ADVANCE: f32 = 16.0;

const X_DATE: f32 = 40.0;
const X_COUNT: f32 = 170.0;
const X_TYPE: f32 = 250.0;
const X_FILE: f32 = 370.0;
/// Right edge of the count column.
const COUNT_RIGHT: f32 = X_COUNT + 30.0;

/// Helvetica advance width of every digit, in 1/1000 em.
const HELVETICA_DIGIT_WIDTH: f32 = 556.0;

/// One positioned string, baseline origin in points from the bottom left.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Everything drawn on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub items: Vec<TextItem>,
}

impl PageLayout {
    fn push(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32) {
        self.items.push(TextItem {
            text: text.into(),
            x,
            y,
            size,
        });
    }
}

fn digits_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * HELVETICA_DIGIT_WIDTH / 1000.0 * size
}

/// Position the title, headings and rows across as many pages as needed.
///
/// The header row appears once, on the first page. A new page starts when
/// the next baseline would fall below the bottom margin, and continues at
/// the top margin.
pub fn layout_pages(table: &ReportTable) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut page = PageLayout::default();

    page.push(table.title.clone(), MARGIN, PAGE_HEIGHT_PT - MARGIN, TITLE_SIZE);

    let mut y = PAGE_HEIGHT_PT - HEADER_OFFSET;
    let headers = table.headers();
    for (header, x) in headers.iter().zip([X_DATE, X_COUNT, X_TYPE, X_FILE]) {
        page.push(*header, x, y, BODY_SIZE);
    }
    y -= HEADER_ADVANCE;

    for row in &table.rows {
        let count = row.count.to_string();
        let count_x = COUNT_RIGHT - digits_width(&count, BODY_SIZE);

        page.push(row.timestamp.clone(), X_DATE, y, BODY_SIZE);
        page.push(count, count_x, y, BODY_SIZE);
        page.push(row.media_type.clone(), X_TYPE, y, BODY_SIZE);
        page.push(row.file.clone(), X_FILE, y, BODY_SIZE);

        y -= ROW_ADVANCE;
        if y < MARGIN {
            pages.push(std::mem::take(&mut page));
            y = PAGE_HEIGHT_PT - MARGIN;
        }
    }

    if !page.items.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    pages
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Render the table as a PDF document.
pub fn render_pdf(table: &ReportTable) -> ReportResult<Vec<u8>> {
    let pages = layout_pages(table);
    let width = pt_to_mm(PAGE_WIDTH_PT);
    let height = pt_to_mm(PAGE_HEIGHT_PT);

    let (doc, first_page, first_layer) = PdfDocument::new(&table.title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::pdf(e.to_string()))?;

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for item in &page.items {
            layer.use_text(item.text.as_str(), item.size, pt_to_mm(item.x), pt_to_mm(item.y), &font);
        }
    }

    doc.save_to_bytes().map_err(|e| ReportError::pdf(e.to_string()))
}
