//! Excel and PDF rendering of Average Basket reports.
//!
//! Both renderers share one table layout so the two documents always carry
//! the same columns, labels and totals.

use chrono::NaiveDateTime;
use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use domain::models::{
    AverageBasketRow, ExportFormat, RenderedReport, ReportFilter, ReportOutput, ReportTotals,
};
use domain::services::{report_file_name, RenderError, ReportRenderer};

const REPORT_TITLE: &str = "Average Basket Report";
const SHEET_NAME: &str = "Average Basket";
const HEADER_ROW: u32 = 5;
const TOTAL_LABEL: &str = "GRAND TOTAL";
const MONEY_FORMAT: &str = "#,##0.00";
const COUNT_FORMAT: &str = "#,##0";

/// One table cell, typed so each format can apply its own number style.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Count(i64),
    Quantity(f64),
    Amount(f64),
    Percent(f64),
}

impl Cell {
    fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Count(n) => format_thousands(*n as f64, 0),
            Cell::Quantity(v) | Cell::Amount(v) => format_thousands(*v, 2),
            Cell::Percent(v) => format!("{:.1}%", v),
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, Cell::Text(_))
    }
}

#[derive(Debug, Clone)]
struct ReportTable {
    headers: Vec<String>,
    /// Relative PDF column widths.
    widths: Vec<f32>,
    rows: Vec<Vec<Cell>>,
    total: Vec<Cell>,
}

fn subtitle_lines(filter: &ReportFilter, generated_at: NaiveDateTime) -> [String; 3] {
    [
        format!(
            "Period: {} to {}",
            filter.date_from.format("%Y-%m-%d"),
            filter.date_to.format("%Y-%m-%d")
        ),
        format!(
            "Breakdown: {} | Group By: {}",
            filter.breakdown.as_str(),
            filter.group_by.as_str()
        ),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
    ]
}

fn build_table(output: &ReportOutput, filter: &ReportFilter) -> ReportTable {
    let grouped = !filter.group_by.is_none();
    let sales_label = if filter.include_vat { "Gross Sales" } else { "Net Sales" };

    let mut headers: Vec<String> = Vec::new();
    let mut widths: Vec<f32> = Vec::new();
    if grouped {
        headers.push(filter.group_by.as_str().to_string());
        widths.push(12.0);
    }
    for (header, width) in [
        ("Period", 10.0),
        ("Invoices", 6.0),
        ("Returns", 6.0),
        ("Net Trans.", 6.0),
        ("Qty Sold", 6.0),
        ("Qty Ret.", 6.0),
        ("Net Qty", 6.0),
        (sales_label, 9.0),
        ("Avg Basket", 8.0),
        ("Avg Qty", 7.0),
    ] {
        headers.push(header.to_string());
        widths.push(width);
    }
    if filter.compare_last_year {
        for (header, width) in [("LY Sales", 9.0), ("LY Avg", 8.0), ("YoY %", 6.0)] {
            headers.push(header.to_string());
            widths.push(width);
        }
    }

    let rows = output
        .rows
        .iter()
        .map(|row| row_cells(row, filter, grouped))
        .collect();
    let total = total_cells(&output.totals, filter, grouped);

    ReportTable {
        headers,
        widths,
        rows,
        total,
    }
}

fn row_cells(row: &AverageBasketRow, filter: &ReportFilter, grouped: bool) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(14);
    if grouped {
        let label = row
            .level1_value
            .clone()
            .or_else(|| row.level1.clone())
            .unwrap_or_else(|| "N/A".to_string());
        cells.push(Cell::Text(label));
    }

    let (sales, average) = if filter.include_vat {
        (row.cy_total_gross(), row.cy_average_gross())
    } else {
        (row.cy_total_net(), row.cy_average_net())
    };

    cells.extend([
        Cell::Text(row.period.clone()),
        Cell::Count(row.cy_invoice_count),
        Cell::Count(row.cy_credit_count),
        Cell::Count(row.cy_total_transactions()),
        Cell::Quantity(row.cy_qty_sold),
        Cell::Quantity(row.cy_qty_returned),
        Cell::Quantity(row.cy_total_qty()),
        Cell::Amount(sales),
        Cell::Amount(average),
        Cell::Quantity(row.cy_average_qty()),
    ]);

    if filter.compare_last_year {
        let (ly_sales, ly_average) = if filter.include_vat {
            (row.ly_total_gross, row.ly_average_gross())
        } else {
            (row.ly_total_net, row.ly_average_net())
        };
        cells.extend([
            Cell::Amount(ly_sales),
            Cell::Amount(ly_average),
            Cell::Percent(row.yoy_change_percent()),
        ]);
    }
    cells
}

fn total_cells(totals: &ReportTotals, filter: &ReportFilter, grouped: bool) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(14);
    if grouped {
        cells.push(Cell::Text(TOTAL_LABEL.to_string()));
        cells.push(Cell::Text(String::new()));
    } else {
        cells.push(Cell::Text(TOTAL_LABEL.to_string()));
    }

    let (sales, average) = if filter.include_vat {
        (totals.gross_sales(), totals.average_basket_gross())
    } else {
        (totals.net_sales(), totals.average_basket_net())
    };

    cells.extend([
        Cell::Count(totals.total_invoices),
        Cell::Count(totals.total_credits),
        Cell::Count(totals.net_transactions()),
        Cell::Quantity(totals.total_qty_sold),
        Cell::Quantity(totals.total_qty_returned),
        Cell::Quantity(totals.net_qty()),
        Cell::Amount(sales),
        Cell::Amount(average),
        Cell::Quantity(totals.average_qty()),
    ]);

    if filter.compare_last_year {
        let (ly_sales, ly_average) = if filter.include_vat {
            (totals.ly_total_gross(), totals.ly_average_basket_gross())
        } else {
            (totals.ly_total_net(), totals.ly_average_basket_net())
        };
        cells.extend([
            Cell::Amount(ly_sales),
            Cell::Amount(ly_average),
            Cell::Percent(totals.yoy_change_percent()),
        ]);
    }
    cells
}

/// Formats `value` with `,` thousands separators and a fixed number of decimals.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Renders the report as an `.xlsx` workbook.
#[derive(Debug, Clone, Default)]
pub struct ExcelRenderer;

impl ExcelRenderer {
    pub fn render(
        &self,
        output: &ReportOutput,
        filter: &ReportFilter,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<u8>, RenderError> {
        self.build(output, filter, generated_at)
            .map_err(|e| RenderError::Excel(e.to_string()))
    }

    fn build(
        &self,
        output: &ReportOutput,
        filter: &ReportFilter,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<u8>, XlsxError> {
        let table = build_table(output, filter);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let title = Format::new().set_bold().set_font_size(14);
        sheet.write_string_with_format(0, 0, REPORT_TITLE, &title)?;
        for (i, line) in subtitle_lines(filter, generated_at).iter().enumerate() {
            sheet.write_string(1 + i as u32, 0, line)?;
        }

        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x2563EB))
            .set_align(FormatAlign::Center);
        for (col, name) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(HEADER_ROW, col as u16, name, &header)?;
        }

        let money = Format::new().set_num_format(MONEY_FORMAT);
        let count = Format::new().set_num_format(COUNT_FORMAT);
        let plain = Format::new();
        let mut row_index = HEADER_ROW + 1;
        for cells in &table.rows {
            write_cells(sheet, row_index, cells, &plain, &count, &money)?;
            row_index += 1;
        }

        let total_base = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xDBEAFE))
            .set_border_top(FormatBorder::Medium);
        write_cells(
            sheet,
            row_index,
            &table.total,
            &total_base,
            &total_base.clone().set_num_format(COUNT_FORMAT),
            &total_base.clone().set_num_format(MONEY_FORMAT),
        )?;

        sheet.autofit();
        workbook.save_to_buffer()
    }
}

fn write_cells(
    sheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    cells: &[Cell],
    plain: &Format,
    count: &Format,
    money: &Format,
) -> Result<(), XlsxError> {
    for (col, cell) in cells.iter().enumerate() {
        let col = col as u16;
        match cell {
            Cell::Text(s) => {
                sheet.write_string_with_format(row, col, s, plain)?;
            }
            Cell::Count(n) => {
                sheet.write_number_with_format(row, col, *n as f64, count)?;
            }
            Cell::Quantity(v) | Cell::Amount(v) => {
                sheet.write_number_with_format(row, col, *v, money)?;
            }
            Cell::Percent(v) => {
                sheet.write_string_with_format(row, col, Cell::Percent(*v).display(), plain)?;
            }
        }
    }
    Ok(())
}

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 10.0;
const ROW_HEIGHT: f32 = 5.0;
const CELL_FONT: f32 = 7.0;
const PT_TO_MM: f32 = 0.3528;

struct PdfFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn rgb(r: u8, g: u8, b: u8) -> PdfColor {
    PdfColor::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

/// Rough Helvetica advance, enough to right-align numeric cells.
fn approx_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5 * PT_TO_MM
}

/// Renders the report as an A4 landscape PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn render(
        &self,
        output: &ReportOutput,
        filter: &ReportFilter,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<u8>, RenderError> {
        let table = build_table(output, filter);
        let (doc, page, layer) =
            PdfDocument::new(REPORT_TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = PdfFonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| RenderError::Pdf(e.to_string()))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| RenderError::Pdf(e.to_string()))?,
        };

        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let unit: f32 = usable / table.widths.iter().sum::<f32>();
        let widths: Vec<f32> = table.widths.iter().map(|w| w * unit).collect();

        let mut current = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT - MARGIN - 5.0;

        current.set_fill_color(rgb(0, 0, 0));
        current.use_text(REPORT_TITLE, 14.0, Mm(MARGIN), Mm(y), &fonts.bold);
        y -= 6.0;
        current.set_fill_color(rgb(100, 116, 139));
        for line in subtitle_lines(filter, generated_at) {
            current.use_text(line, 9.0, Mm(MARGIN), Mm(y), &fonts.regular);
            y -= 4.5;
        }
        y -= 2.0;

        draw_header(&current, &table.headers, &widths, y, &fonts);
        y -= ROW_HEIGHT;

        for (i, cells) in table.rows.iter().enumerate() {
            if y < MARGIN + ROW_HEIGHT {
                current = new_page(&doc);
                y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
                draw_header(&current, &table.headers, &widths, y, &fonts);
                y -= ROW_HEIGHT;
            }
            let background = (i % 2 == 1).then(|| rgb(248, 250, 252));
            draw_row(&current, cells, &widths, y, background, &fonts.regular);
            y -= ROW_HEIGHT;
        }

        if y < MARGIN + ROW_HEIGHT {
            current = new_page(&doc);
            y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
        }
        draw_row(
            &current,
            &table.total,
            &widths,
            y,
            Some(rgb(219, 234, 254)),
            &fonts.bold,
        );

        doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
    }
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn fill_band(layer: &PdfLayerReference, y: f32, color: PdfColor) {
    layer.set_fill_color(color);
    layer.add_rect(Rect::new(
        Mm(MARGIN),
        Mm(y - 1.5),
        Mm(PAGE_WIDTH - MARGIN),
        Mm(y - 1.5 + ROW_HEIGHT),
    ));
}

fn draw_header(
    layer: &PdfLayerReference,
    headers: &[String],
    widths: &[f32],
    y: f32,
    fonts: &PdfFonts,
) {
    fill_band(layer, y, rgb(37, 99, 235));
    layer.set_fill_color(rgb(255, 255, 255));
    let mut x = MARGIN;
    for (header, width) in headers.iter().zip(widths) {
        let text_width = approx_text_width(header, CELL_FONT);
        let left = x + ((width - text_width) / 2.0).max(0.5);
        layer.use_text(header.as_str(), CELL_FONT, Mm(left), Mm(y), &fonts.bold);
        x += width;
    }
}

fn draw_row(
    layer: &PdfLayerReference,
    cells: &[Cell],
    widths: &[f32],
    y: f32,
    background: Option<PdfColor>,
    font: &IndirectFontRef,
) {
    if let Some(color) = background {
        fill_band(layer, y, color);
    }
    layer.set_fill_color(rgb(0, 0, 0));
    let mut x = MARGIN;
    for (cell, width) in cells.iter().zip(widths) {
        let text = cell.display();
        let left = if cell.is_numeric() {
            (x + width - 1.0 - approx_text_width(&text, CELL_FONT)).max(x + 0.5)
        } else {
            x + 1.0
        };
        layer.use_text(text, CELL_FONT, Mm(left), Mm(y), font);
        x += width;
    }
}

/// Dispatches rendering by export format.
#[derive(Debug, Clone, Default)]
pub struct ExportRenderer {
    excel: ExcelRenderer,
    pdf: PdfRenderer,
}

impl ExportRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportRenderer for ExportRenderer {
    fn render(
        &self,
        format: ExportFormat,
        report_type: &str,
        output: &ReportOutput,
        filter: &ReportFilter,
        generated_at: NaiveDateTime,
    ) -> Result<RenderedReport, RenderError> {
        let bytes = match format {
            ExportFormat::Excel => self.excel.render(output, filter, generated_at)?,
            ExportFormat::Pdf => self.pdf.render(output, filter, generated_at)?,
        };
        Ok(RenderedReport {
            bytes,
            file_name: report_file_name(report_type, filter, format),
            content_type: format.content_type().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::models::{GroupBy, ScheduleParameters};

    fn filter(group_by: GroupBy, include_vat: bool, compare_last_year: bool) -> ReportFilter {
        let params = ScheduleParameters {
            group_by,
            include_vat,
            compare_last_year,
            ..Default::default()
        };
        ReportFilter::from_parameters(
            &params,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        )
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn output() -> ReportOutput {
        let rows = vec![
            AverageBasketRow {
                period: "2024-05".to_string(),
                level1: Some("S01".to_string()),
                level1_value: Some("Main Street".to_string()),
                cy_invoice_count: 120,
                cy_credit_count: 20,
                cy_qty_sold: 300.0,
                cy_qty_returned: 50.0,
                cy_net_sales: 12_000.0,
                cy_net_returns: 2_000.0,
                cy_vat_sales: 2_400.0,
                cy_vat_returns: 400.0,
                cy_gross_sales: 14_400.0,
                cy_gross_returns: 2_400.0,
                ly_invoice_count: 90,
                ly_credit_count: 10,
                ly_total_net: 8_000.0,
                ly_total_gross: 9_600.0,
                ..Default::default()
            },
            AverageBasketRow {
                period: "2024-05".to_string(),
                cy_invoice_count: 10,
                cy_net_sales: 500.0,
                ..Default::default()
            },
        ];
        let totals = ReportTotals::from_rows(&rows);
        ReportOutput { rows, totals }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0, 2), "0.00");
        assert_eq!(format_thousands(999.5, 0), "1,000");
        assert_eq!(format_thousands(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(-12_345.0, 2), "-12,345.00");
        assert_eq!(format_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn test_table_headers_follow_filter() {
        let plain = build_table(&output(), &filter(GroupBy::None, false, false));
        assert_eq!(plain.headers.len(), 10);
        assert_eq!(plain.headers[0], "Period");
        assert_eq!(plain.headers[7], "Net Sales");
        assert_eq!(plain.widths.len(), plain.headers.len());

        let full = build_table(&output(), &filter(GroupBy::Store, true, true));
        assert_eq!(full.headers.len(), 14);
        assert_eq!(full.headers[0], "Store");
        assert_eq!(full.headers[8], "Gross Sales");
        assert_eq!(&full.headers[11..], &["LY Sales", "LY Avg", "YoY %"]);
        assert_eq!(full.total.len(), full.headers.len());
        assert!(full.rows.iter().all(|r| r.len() == full.headers.len()));
    }

    #[test]
    fn test_group_cell_falls_back_to_code_then_na() {
        let table = build_table(&output(), &filter(GroupBy::Store, false, false));
        assert_eq!(table.rows[0][0], Cell::Text("Main Street".to_string()));
        assert_eq!(table.rows[1][0], Cell::Text("N/A".to_string()));
        assert_eq!(table.total[0], Cell::Text(TOTAL_LABEL.to_string()));
    }

    #[test]
    fn test_row_values() {
        let table = build_table(&output(), &filter(GroupBy::None, false, true));
        let row = &table.rows[0];
        assert_eq!(row[3], Cell::Count(100));
        assert_eq!(row[7], Cell::Amount(10_000.0));
        assert_eq!(row[8], Cell::Amount(100.0));
        assert_eq!(row[12], Cell::Percent(25.0));
        assert_eq!(row[12].display(), "25.0%");
    }

    #[test]
    fn test_excel_render_produces_zip() {
        let bytes = ExcelRenderer
            .render(&output(), &filter(GroupBy::Store, true, true), generated_at())
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_pdf_render_paginates() {
        let mut many = output();
        let template = many.rows[0].clone();
        many.rows = (0..120).map(|_| template.clone()).collect();
        let bytes = PdfRenderer
            .render(&many, &filter(GroupBy::None, false, false), generated_at())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_renderer_names_file() {
        let rendered = ExportRenderer::new()
            .render(
                ExportFormat::Pdf,
                "AverageBasket",
                &output(),
                &filter(GroupBy::None, false, false),
                generated_at(),
            )
            .unwrap();
        assert_eq!(rendered.file_name, "AverageBasket_20240501_20240531.pdf");
        assert_eq!(rendered.content_type, "application/pdf");
    }
}
