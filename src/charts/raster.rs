//! In-memory raster charts drawn with plotters and encoded with image.
//!
//! Charts carry a caption, axis labels and slice labels once a font has
//! been registered through [`super::font::install`]; otherwise only the
//! data marks are drawn.

use super::font::{self, FONT_FAMILY};
use super::{slot_title, ChartBackend, ChartData, ChartHandle, ChartKind, Surface};
use crate::error::ChartError;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::io::Cursor;

const MARGIN: u32 = 20;
const LABEL_AREA: u32 = 40;
const CAPTION_SIZE: u32 = 18;
const LABEL_SIZE: u32 = 12;
const BAR_GAP: u32 = 4;
/// Longest label drawn in full; longer ones are cut with "...".
const MAX_LABEL_CHARS: usize = 14;
const BACKGROUND: RGBColor = RGBColor(255, 255, 255);
const AXIS: RGBColor = RGBColor(120, 120, 120);
const BAR_FILL: RGBColor = RGBColor(255, 159, 64);
const LINE_STROKE: RGBColor = RGBColor(75, 192, 192);
const PIE_PALETTE: [RGBColor; 10] = [
    RGBColor(255, 99, 132),
    RGBColor(54, 162, 235),
    RGBColor(255, 205, 86),
    RGBColor(75, 192, 192),
    RGBColor(153, 102, 255),
    RGBColor(255, 159, 64),
    RGBColor(199, 199, 199),
    RGBColor(83, 102, 255),
    RGBColor(255, 99, 255),
    RGBColor(99, 255, 132),
];

/// Backend producing RGB pixel buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterBackend;

pub struct RasterChart {
    kind: ChartKind,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ChartBackend for RasterBackend {
    type Handle = RasterChart;

    fn construct(
        &self,
        surface: &Surface,
        kind: ChartKind,
        data: &ChartData,
    ) -> Result<RasterChart, ChartError> {
        if surface.width == 0 || surface.height == 0 {
            return Err(ChartError::Render(format!(
                "surface '{}' has no area",
                surface.name
            )));
        }
        if data.labels.len() != data.values.len() {
            return Err(ChartError::Render(format!(
                "{} labels for {} values",
                data.labels.len(),
                data.values.len()
            )));
        }
        let mut chart = RasterChart {
            kind,
            width: surface.width,
            height: surface.height,
            pixels: Vec::new(),
        };
        let caption = font::text_available().then(|| slot_title(&surface.name));
        chart.draw(data, caption)?;
        Ok(chart)
    }
}

impl RasterChart {
    fn draw(&mut self, data: &ChartData, caption: Option<&str>) -> Result<(), ChartError> {
        self.pixels = render(self.kind, data, self.width, self.height, caption)?;
        Ok(())
    }
}

impl ChartHandle for RasterChart {
    fn snapshot_png(&self) -> Result<Vec<u8>, ChartError> {
        let image = RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| ChartError::Render("chart has been destroyed".to_string()))?;
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn destroy(&mut self) {
        self.pixels = Vec::new();
    }
}

fn draw_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Draw `data` into a fresh RGB buffer of `width` x `height`.
///
/// Text is drawn only when `caption` is given.
fn render(
    kind: ChartKind,
    data: &ChartData,
    width: u32,
    height: u32,
    caption: Option<&str>,
) -> Result<Vec<u8>, ChartError> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&BACKGROUND).map_err(draw_error)?;

        match kind {
            ChartKind::Bar => draw_bars(&root, data, caption)?,
            ChartKind::Line => draw_line(&root, data, caption)?,
            ChartKind::Pie => draw_pie(&root, data, caption)?,
        }
        root.present().map_err(draw_error)?;
    }
    Ok(buffer)
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn margin(root: &Area<'_>) -> u32 {
    let (width, height) = root.dim_in_pixel();
    MARGIN.min(width / 4).min(height / 4)
}

/// Top of the value axis, leaving headroom over the largest value.
fn y_ceiling(data: &ChartData) -> u32 {
    let max = data.max_value().max(1);
    max + (max / 10).max(1)
}

/// Last index of the category axis. A single category still gets an
/// axis of two segments.
fn last_category(data: &ChartData) -> u32 {
    (data.values.len() as u32).saturating_sub(1).max(1)
}

fn shorten(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
        short.push_str("...");
        short
    }
}

/// Tick label for a category axis position.
fn category_label(labels: &[String], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(index) => labels
            .get(*index as usize)
            .map(|label| shorten(label))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn chart_builder<'a, 'b, 'buf>(
    root: &'a Area<'buf>,
    caption: Option<&str>,
) -> ChartBuilder<'a, 'b, BitMapBackend<'buf>> {
    let mut builder = ChartBuilder::on(root);
    builder.margin(margin(root));
    if let Some(caption) = caption {
        let (_, height) = root.dim_in_pixel();
        let area = LABEL_AREA.min(height / 4);
        builder
            .caption(caption, (FONT_FAMILY, CAPTION_SIZE).into_font())
            .x_label_area_size(area)
            .y_label_area_size(area);
    }
    builder
}

fn draw_bars(root: &Area<'_>, data: &ChartData, caption: Option<&str>) -> Result<(), ChartError> {
    let last = last_category(data);
    let mut chart = chart_builder(root, caption)
        .build_cartesian_2d((0..last).into_segmented(), 0..y_ceiling(data))
        .map_err(draw_error)?;

    if caption.is_some() {
        let formatter = |value: &SegmentValue<u32>| category_label(&data.labels, value);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(data.labels.len().max(1))
            .x_label_formatter(&formatter)
            .y_desc("Borrows")
            .label_style((FONT_FAMILY, LABEL_SIZE).into_font())
            .axis_desc_style((FONT_FAMILY, LABEL_SIZE).into_font())
            .axis_style(AXIS.stroke_width(1))
            .draw()
            .map_err(draw_error)?;
    }

    chart
        .draw_series(data.values.iter().enumerate().map(|(i, &value)| {
            let i = i as u32;
            let right = if i < last {
                SegmentValue::Exact(i + 1)
            } else {
                SegmentValue::Last
            };
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0), (right, value)],
                BAR_FILL.filled(),
            );
            bar.set_margin(0, 0, BAR_GAP, BAR_GAP);
            bar
        }))
        .map_err(draw_error)?;
    Ok(())
}

fn draw_line(root: &Area<'_>, data: &ChartData, caption: Option<&str>) -> Result<(), ChartError> {
    let mut chart = chart_builder(root, caption)
        .build_cartesian_2d((0..last_category(data)).into_segmented(), 0..y_ceiling(data))
        .map_err(draw_error)?;

    if caption.is_some() {
        let formatter = |value: &SegmentValue<u32>| category_label(&data.labels, value);
        chart
            .configure_mesh()
            .x_labels(data.labels.len().max(1))
            .x_label_formatter(&formatter)
            .y_desc("Borrows")
            .label_style((FONT_FAMILY, LABEL_SIZE).into_font())
            .axis_desc_style((FONT_FAMILY, LABEL_SIZE).into_font())
            .axis_style(AXIS.stroke_width(1))
            .draw()
            .map_err(draw_error)?;
    }

    let points: Vec<(SegmentValue<u32>, u32)> = data
        .values
        .iter()
        .enumerate()
        .map(|(i, &value)| (SegmentValue::CenterOf(i as u32), value))
        .collect();

    chart
        .draw_series(LineSeries::new(points.clone(), LINE_STROKE.stroke_width(2)))
        .map_err(draw_error)?;
    chart
        .draw_series(
            points
                .into_iter()
                .map(|point| Circle::new(point, 3, LINE_STROKE.filled())),
        )
        .map_err(draw_error)?;
    Ok(())
}

fn draw_pie(root: &Area<'_>, data: &ChartData, caption: Option<&str>) -> Result<(), ChartError> {
    if data.total() == 0 {
        return Ok(());
    }

    let colors: Vec<RGBColor> = (0..data.values.len())
        .map(|i| PIE_PALETTE[i % PIE_PALETTE.len()])
        .collect();

    let Some(caption) = caption else {
        let (width, height) = root.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = f64::from(width.min(height)) / 2.0 - f64::from(margin(root));
        return draw_slices(root, center, radius.max(1.0), data, &colors);
    };

    let area = root
        .titled(caption, (FONT_FAMILY, CAPTION_SIZE).into_font())
        .map_err(draw_error)?;
    let (width, height) = area.dim_in_pixel();
    // Pie draws in backend coordinates, not relative to the area.
    let (left, top) = area.get_base_pixel();
    let center = (left + width as i32 / 2, top + height as i32 / 2);
    let radius = (f64::from(width.min(height)) / 2.0
        - f64::from(margin(root))
        - f64::from(LABEL_SIZE))
    .max(1.0);

    let sizes: Vec<f64> = data.values.iter().map(|&v| f64::from(v)).collect();
    let labels: Vec<String> = data.labels.iter().map(|label| shorten(label)).collect();
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style((FONT_FAMILY, LABEL_SIZE).into_font().color(&AXIS));
    pie.percentages((FONT_FAMILY, LABEL_SIZE).into_font().color(&WHITE));
    area.draw(&pie).map_err(draw_error)
}

/// Unlabelled pie: filled slices clockwise from twelve o'clock.
fn draw_slices(
    root: &Area<'_>,
    center: (i32, i32),
    radius: f64,
    data: &ChartData,
    colors: &[RGBColor],
) -> Result<(), ChartError> {
    let total = data.total() as f64;
    let mut start = -PI / 2.0;
    for (&value, color) in data.values.iter().zip(colors) {
        let sweep = 2.0 * PI * f64::from(value) / total;
        if sweep <= 0.0 {
            continue;
        }
        let segments = ((sweep / (2.0 * PI)) * 90.0).ceil().max(2.0) as usize;

        let mut outline = Vec::with_capacity(segments + 2);
        outline.push(center);
        for step in 0..=segments {
            let angle = start + sweep * step as f64 / segments as f64;
            outline.push((
                center.0 + (radius * angle.cos()).round() as i32,
                center.1 + (radius * angle.sin()).round() as i32,
            ));
        }

        root.draw(&Polygon::new(outline, color.filled()))
            .map_err(draw_error)?;
        start += sweep;
    }
    Ok(())
}
