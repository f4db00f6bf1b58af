use std::f32::consts::PI;
use std::io::BufWriter;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use crate::charts::{self, BarChart, Chart, Orientation, PieChart};
use crate::compare::CostComparison;
use crate::error::{DashboardError, Result};
use crate::fmt::money;

// US Letter dimensions (mm)
const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN_TOP: f32 = 25.4;
const MARGIN_BOTTOM: f32 = 25.4;
const MARGIN_LEFT: f32 = 19.05;
const MARGIN_RIGHT: f32 = 19.05;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;
const LABEL_SIZE: f32 = 7.0;

// Plot area, measured from the top of the page like `PdfWriter::y`.
const PLOT_TOP: f32 = 60.0;
const PLOT_BOTTOM: f32 = 210.0;

const BLACK: charts::Rgb = charts::Rgb(0, 0, 0);

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.len() as f32 * size * 0.18
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}.")
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
    fresh: bool,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DashboardError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| DashboardError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
            fresh: true,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    /// Start a page unless the current one is still blank.
    fn new_page(&mut self) {
        if self.fresh {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
        self.fresh = true;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.fresh = false;
            self.new_page();
        }
    }

    fn fill(&self, color: charts::Rgb) {
        let charts::Rgb(r, g, b) = color;
        self.layer().set_fill_color(Color::Rgb(Rgb::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            None,
        )));
    }

    /// Text at an absolute position, `top` measured from the top of the page.
    fn text_at(&mut self, s: &str, x: f32, top: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer()
            .use_text(s, size, Mm(x), Mm(PAGE_H - top), font);
        self.fresh = false;
    }

    fn text(&mut self, s: &str, x: f32, size: f32, bold: bool) {
        self.text_at(s, x, self.y, size, bold);
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32)) {
        let layer = self.layer();
        layer.set_outline_thickness(0.5);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(PAGE_H - from.1)), false),
                (Point::new(Mm(to.0), Mm(PAGE_H - to.1)), false),
            ],
            is_closed: false,
        });
        self.fresh = false;
    }

    fn hline(&mut self, x1: f32, x2: f32) {
        self.line((x1, self.y), (x2, self.y));
    }

    /// Filled shape; points are (x, top) pairs.
    fn shape(&mut self, points: &[(f32, f32)], color: charts::Rgb) {
        self.fill(color);
        let ring = points
            .iter()
            .map(|(x, top)| (Point::new(Mm(*x), Mm(PAGE_H - top)), false))
            .collect();
        self.layer().add_polygon(Polygon {
            rings: vec![ring],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
        self.fill(BLACK);
        self.fresh = false;
    }

    fn rect(&mut self, x: f32, top: f32, w: f32, h: f32, color: charts::Rgb) {
        self.shape(
            &[(x, top), (x + w, top), (x + w, top + h), (x, top + h)],
            color,
        );
    }

    fn header(&mut self, title: &str, subtitle: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !subtitle.is_empty() {
            self.text(subtitle, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 5.0;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.table_row(cols, headers, true);
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 2.0;
    }

    fn table_row(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        self.ensure_space(ROW_H);
        let mut x = MARGIN_LEFT;
        for (col, value) in cols.iter().zip(values) {
            match col.align {
                Align::Left => self.text(value, x, FONT_SIZE, bold),
                Align::Right => {
                    let tw = approx_text_width(value, FONT_SIZE);
                    self.text(value, x + col.width - tw, FONT_SIZE, bold);
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
    }

    fn legend(&mut self, entries: &[(String, charts::Rgb)], top: f32) {
        let mut x = MARGIN_LEFT;
        for (label, color) in entries {
            self.rect(x, top - 3.0, 4.0, 4.0, *color);
            self.text_at(label, x + 6.0, top, FONT_SIZE, false);
            x += 12.0 + approx_text_width(label, FONT_SIZE);
        }
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| DashboardError::Pdf(format!("{e:?}")))?;
        buf.into_inner()
            .map_err(|e| DashboardError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Chart drawing
// ---------------------------------------------------------------------------

fn draw_no_data(pdf: &mut PdfWriter) {
    pdf.text_at("No data for the current filters", MARGIN_LEFT, PLOT_TOP, FONT_SIZE, false);
}

fn draw_pie(pdf: &mut PdfWriter, pie: &PieChart) {
    let total: f64 = pie.slices.iter().map(|s| s.value).sum();
    if total <= 0.0 {
        draw_no_data(pdf);
        return;
    }
    let radius = 55.0;
    let cx = PAGE_W / 2.0;
    let cy = (PLOT_TOP + PLOT_BOTTOM) / 2.0;
    // Counter-clockwise from twelve o'clock; `top` grows downward.
    let at = |angle: f32, r: f32| (cx + r * angle.cos(), cy - r * angle.sin());

    let mut start = PI / 2.0;
    for slice in &pie.slices {
        if slice.value <= 0.0 {
            continue;
        }
        let sweep = (slice.value / total) as f32 * 2.0 * PI;
        let steps = ((sweep / (PI / 90.0)).ceil() as usize).max(1);
        let mut points = vec![(cx, cy)];
        for i in 0..=steps {
            points.push(at(start + sweep * i as f32 / steps as f32, radius));
        }
        pdf.shape(&points, slice.color);

        let label = slice.pct_label();
        let (lx, ly) = at(start + sweep / 2.0, radius * 0.6);
        pdf.text_at(&label, lx - approx_text_width(&label, FONT_SIZE) / 2.0, ly, FONT_SIZE, true);
        start += sweep;
    }

    let entries: Vec<_> = pie
        .slices
        .iter()
        .map(|s| (format!("{} ({})", s.label, s.value), s.color))
        .collect();
    pdf.legend(&entries, PLOT_BOTTOM + 12.0);
}

fn bar_color(chart: &BarChart, group: usize, series: usize) -> charts::Rgb {
    chart.groups[group]
        .color
        .or_else(|| chart.series.get(series).map(|s| s.color))
        .unwrap_or(charts::SKY_BLUE)
}

fn draw_bars(pdf: &mut PdfWriter, chart: &BarChart) {
    if chart.groups.is_empty() {
        draw_no_data(pdf);
        return;
    }
    let max = chart.max_value();
    let scale = if max > 0.0 { max } else { 1.0 };
    let n_series = chart.series.len().max(1);

    match chart.orientation {
        Orientation::Vertical => {
            let left = MARGIN_LEFT + 10.0;
            let right = PAGE_W - MARGIN_RIGHT;
            let plot_h = PLOT_BOTTOM - PLOT_TOP;
            let group_w = (right - left) / chart.groups.len() as f32;
            let bar_w = group_w * 0.8 / n_series as f32;
            let max_chars = (group_w / (LABEL_SIZE * 0.18)) as usize;
            for (gi, group) in chart.groups.iter().enumerate() {
                let gx = left + gi as f32 * group_w + group_w * 0.1;
                for (si, value) in group.values.iter().enumerate() {
                    let h = (*value / scale) as f32 * plot_h;
                    let x = gx + si as f32 * bar_w;
                    pdf.rect(x, PLOT_BOTTOM - h, bar_w, h, bar_color(chart, gi, si));
                    if chart.annotate {
                        let label = BarChart::annotation(*value);
                        let tx = x + (bar_w - approx_text_width(&label, LABEL_SIZE)) / 2.0;
                        pdf.text_at(&label, tx, PLOT_BOTTOM - h - 1.5, LABEL_SIZE, false);
                    }
                }
                let label = truncate(&group.label, max_chars.max(4));
                pdf.text_at(&label, gx, PLOT_BOTTOM + 5.0, LABEL_SIZE, false);
            }
            pdf.line((left, PLOT_TOP), (left, PLOT_BOTTOM));
            pdf.line((left, PLOT_BOTTOM), (right, PLOT_BOTTOM));
            pdf.text_at(&chart.value_label, MARGIN_LEFT, PLOT_TOP - 5.0, FONT_SIZE, false);
            pdf.text_at(&chart.category_label, left, PLOT_BOTTOM + 11.0, FONT_SIZE, true);
        }
        Orientation::Horizontal => {
            let left = MARGIN_LEFT + 40.0;
            let right = PAGE_W - MARGIN_RIGHT - 15.0;
            let plot_w = right - left;
            let group_h = (PLOT_BOTTOM - PLOT_TOP) / chart.groups.len() as f32;
            let bar_h = group_h * 0.8 / n_series as f32;
            // Ascending input draws the largest bar at the top.
            for (gi, group) in chart.groups.iter().enumerate() {
                let gy = PLOT_BOTTOM - (gi as f32 + 1.0) * group_h + group_h * 0.1;
                for (si, value) in group.values.iter().enumerate() {
                    let w = (*value / scale) as f32 * plot_w;
                    let y = gy + si as f32 * bar_h;
                    pdf.rect(left, y, w, bar_h, bar_color(chart, gi, si));
                    if chart.annotate {
                        let label = BarChart::annotation(*value);
                        pdf.text_at(&label, left + w + 1.5, y + bar_h * 0.7, LABEL_SIZE, false);
                    }
                }
                let label = truncate(&group.label, 22);
                pdf.text_at(&label, MARGIN_LEFT, gy + group_h * 0.45, LABEL_SIZE, false);
            }
            pdf.line((left, PLOT_TOP), (left, PLOT_BOTTOM));
            pdf.line((left, PLOT_BOTTOM), (right, PLOT_BOTTOM));
            let max_label = money(max);
            pdf.text_at("$0", left, PLOT_BOTTOM + 5.0, LABEL_SIZE, false);
            pdf.text_at(
                &max_label,
                right - approx_text_width(&max_label, LABEL_SIZE),
                PLOT_BOTTOM + 5.0,
                LABEL_SIZE,
                false,
            );
            pdf.text_at(&chart.value_label, left, PLOT_BOTTOM + 11.0, FONT_SIZE, true);
            pdf.text_at(&chart.category_label, MARGIN_LEFT, PLOT_TOP - 5.0, FONT_SIZE, true);
        }
    }

    if chart.series.len() > 1 {
        let entries: Vec<_> = chart
            .series
            .iter()
            .map(|s| (s.label.clone(), s.color))
            .collect();
        pdf.legend(&entries, PLOT_BOTTOM + 20.0);
    }
}

fn draw_chart(pdf: &mut PdfWriter, chart: &Chart, subtitle: &str) {
    pdf.new_page();
    pdf.header(chart.title(), subtitle);
    match chart {
        Chart::Pie(pie) => draw_pie(pdf, pie),
        Chart::Bar(bars) => draw_bars(pdf, bars),
    }
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

/// One page per chart. `subtitle` usually describes the active filters.
pub fn render_charts(title: &str, subtitle: &str, charts: &[Chart]) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(title)?;
    if charts.is_empty() {
        pdf.header(title, subtitle);
        draw_no_data(&mut pdf);
    }
    for chart in charts {
        draw_chart(&mut pdf, chart, subtitle);
    }
    pdf.to_bytes()
}

/// Before/after cost table followed by its bar chart.
pub fn render_comparison(comparison: &CostComparison, subtitle: &str) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new("Remediation Impact")?;
    pdf.header("Remediation Impact", subtitle);

    let cols = &[
        Col { width: 60.0, align: Align::Left },
        Col { width: 58.9, align: Align::Right },
        Col { width: 58.9, align: Align::Right },
    ];
    pdf.table_header(cols, &["Tagged", "Before", "After"]);
    for row in &comparison.rows {
        let before = money(row.before);
        let after = money(row.after);
        pdf.table_row(cols, &[row.tagged.as_str(), &before, &after], false);
    }

    draw_chart(&mut pdf, &charts::before_after_bars(comparison), subtitle);
    pdf.to_bytes()
}
