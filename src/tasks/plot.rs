use crate::{
    env::Env,
    tasks::{
        algorithm::Algorithm,
        color::{FONT_SIZE, STROKE_WIDTH, get_color_from_label, parse_hex_color},
        config::PlotOverrides,
        measurements::{self, AxisLimits, BandPoint, ColumnIndices, Groups, Schema, SizeUnit},
    },
};
use anyhow::{Context, Result};
use log::{debug, error, info};
use plotters::{
    coord::{Shift, types::RangedCoordf64},
    prelude::*,
};
use std::{
    fmt, fs,
    ops::Range,
    path::{Path, PathBuf},
};

/// The two charts produced from the processing-time CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotKind {
    /// Shamir vs SSMS secret-sharing latency, with a zoomed inset on the
    /// smallest secrets.
    SsLatency,
    /// Latency of every encoding scheme on small payloads.
    Compare,
}

impl PlotKind {
    pub const SS_LATENCY_NAME: &'static str = "ss-latency";
    pub const COMPARE_NAME: &'static str = "compare";

    /// The latency chart addresses columns by position, the comparison chart
    /// by header name.
    pub fn schema(&self) -> Schema {
        match self {
            PlotKind::SsLatency => Schema::Positional(ColumnIndices::default()),
            PlotKind::Compare => Schema::Named,
        }
    }

    pub fn spec(&self) -> Result<PlotSpec> {
        match self {
            PlotKind::SsLatency => PlotSpec::ss_latency(),
            PlotKind::Compare => PlotSpec::encoding_comparison(),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::SsLatency => write!(f, "{}", Self::SS_LATENCY_NAME),
            PlotKind::Compare => write!(f, "{}", Self::COMPARE_NAME),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisLimit {
    /// Derived from the reference (first) series.
    Auto,
    Fixed(f64),
}

/// A rectangle in data coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Window {
    pub fn x_range(&self) -> Range<f64> {
        self.x_min..self.x_max
    }

    pub fn y_range(&self) -> Range<f64> {
        self.y_min..self.y_max
    }

    /// Restrict this window to `[0, x_max] x [0, y_max]`.
    pub fn clamp_to(&self, limits: &AxisLimits) -> Window {
        Window {
            x_min: self.x_min.max(0.0),
            x_max: self.x_max.min(limits.x_max),
            y_min: self.y_min.max(0.0),
            y_max: self.y_max.min(limits.y_max),
        }
    }
}

/// Position of the inset in fractions of the main plotting area, measured
/// from its lower-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsetPlacement {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsetSpec {
    pub placement: InsetPlacement,
    pub window: Window,
    pub hide_y_axis: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendPosition {
    UpperRight,
    LowerRight,
}

impl From<LegendPosition> for SeriesLabelPosition {
    fn from(position: LegendPosition) -> Self {
        match position {
            LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SeriesSpec {
    pub algorithm: Algorithm,
    pub label: String,
    pub color: RGBColor,
}

impl SeriesSpec {
    pub fn for_algorithm(algorithm: Algorithm) -> Result<Self> {
        Ok(Self {
            algorithm,
            label: algorithm.label().to_string(),
            color: algorithm.get_color()?,
        })
    }
}

/// # Description
///
/// Everything needed to turn grouped measurements into one figure.
#[derive(Clone, Debug)]
pub struct PlotSpec {
    pub kind: PlotKind,
    /// Series in drawing order. The first one is the reference series for
    /// `AxisLimit::Auto`.
    pub series: Vec<SeriesSpec>,
    pub unit: SizeUnit,
    pub row_limit: Option<usize>,
    pub x_max: AxisLimit,
    pub y_max: AxisLimit,
    pub x_desc: String,
    pub y_desc: String,
    pub legend: LegendPosition,
    pub band_opacity: f64,
    pub inset: Option<InsetSpec>,
    pub width: u32,
    pub height: u32,
    pub font_size: i32,
    pub output: PathBuf,
}

impl PlotSpec {
    pub fn ss_latency() -> Result<Self> {
        Ok(Self {
            kind: PlotKind::SsLatency,
            series: vec![
                SeriesSpec::for_algorithm(Algorithm::Shamir)?,
                SeriesSpec::for_algorithm(Algorithm::Ssms)?,
            ],
            unit: SizeUnit::Kilobytes,
            row_limit: Some(600),
            x_max: AxisLimit::Auto,
            y_max: AxisLimit::Auto,
            x_desc: "Secret size (KB)".to_string(),
            y_desc: "Avg latency (ms)".to_string(),
            legend: LegendPosition::LowerRight,
            band_opacity: 0.5,
            inset: Some(InsetSpec {
                placement: InsetPlacement {
                    left: 0.03,
                    bottom: 0.57,
                    width: 0.40,
                    height: 0.40,
                },
                window: Window {
                    x_min: 0.001,
                    x_max: 1.49,
                    y_min: 0.0,
                    y_max: 0.026,
                },
                hide_y_axis: true,
            }),
            // 5x3 inches at 160 dpi
            width: 800,
            height: 480,
            font_size: FONT_SIZE,
            output: Env::default_output_file("ss_latency.png")?,
        })
    }

    pub fn encoding_comparison() -> Result<Self> {
        Ok(Self {
            kind: PlotKind::Compare,
            series: Algorithm::iter_variants()
                .map(|algo| SeriesSpec::for_algorithm(*algo))
                .collect::<Result<Vec<_>>>()?,
            unit: SizeUnit::Bytes,
            row_limit: None,
            x_max: AxisLimit::Fixed(10000.0),
            y_max: AxisLimit::Fixed(0.2),
            x_desc: "Payload size (bytes)".to_string(),
            y_desc: "Avg latency (ms)".to_string(),
            legend: LegendPosition::UpperRight,
            band_opacity: 0.2,
            inset: None,
            width: 800,
            height: 600,
            font_size: FONT_SIZE,
            output: Env::default_output_file("proc_time_comparison.png")?,
        })
    }

    pub fn apply_overrides(&mut self, overrides: &PlotOverrides) -> Result<()> {
        if let Some(width) = overrides.width {
            self.width = width;
        }
        if let Some(height) = overrides.height {
            self.height = height;
        }
        if let Some(font_size) = overrides.font_size {
            self.font_size = font_size;
        }
        if let Some(row_limit) = overrides.row_limit {
            self.row_limit = Some(row_limit);
        }
        if let Some(x_max) = overrides.x_max {
            self.x_max = AxisLimit::Fixed(x_max);
        }
        if let Some(y_max) = overrides.y_max {
            self.y_max = AxisLimit::Fixed(y_max);
        }
        if let Some(band_opacity) = overrides.band_opacity {
            self.band_opacity = band_opacity;
        }
        if let Some(output) = &overrides.output {
            self.output = output.clone();
        }

        for (algo, hex) in &overrides.colors {
            self.series_mut(algo)?.color = parse_hex_color(hex)?;
        }
        for (algo, label) in &overrides.labels {
            self.series_mut(algo)?.label = label.clone();
        }

        Ok(())
    }

    fn series_mut(&mut self, algo: &str) -> Result<&mut SeriesSpec> {
        let kind = self.kind;
        let algorithm: Algorithm = algo.parse()?;
        match self.series.iter_mut().find(|s| s.algorithm == algorithm) {
            Some(series) => Ok(series),
            None => {
                error!("algorithm is not part of this plot (plot={kind}, algo={algo})");
                anyhow::bail!("algorithm is not part of this plot (plot={kind}, algo={algo})");
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Series {
    pub label: String,
    pub color: RGBColor,
    pub points: Vec<BandPoint>,
}

/// Select, truncate and rescale the rows of every series in `spec`.
pub fn build_series(spec: &PlotSpec, groups: &Groups) -> Result<Vec<Series>> {
    spec.series
        .iter()
        .map(|series_spec| {
            let algo = series_spec.algorithm.to_string();
            let mut records = measurements::select(groups, &algo)?;
            if let Some(row_limit) = spec.row_limit {
                records = measurements::truncate(records, row_limit);
            }
            debug!("{}: plotting {algo} with {} rows", spec.kind, records.len());

            Ok(Series {
                label: series_spec.label.clone(),
                color: series_spec.color,
                points: measurements::band_points(records, spec.unit),
            })
        })
        .collect()
}

pub fn resolve_limits(spec: &PlotSpec, series: &[Series]) -> Result<AxisLimits> {
    let reference = match series.first() {
        Some(reference) => reference,
        None => {
            error!("{}: no series to plot", spec.kind);
            anyhow::bail!("no series to plot (plot={})", spec.kind);
        }
    };
    let auto = measurements::axis_limits(&reference.points)?;

    let limits = AxisLimits {
        x_max: match spec.x_max {
            AxisLimit::Auto => auto.x_max,
            AxisLimit::Fixed(x_max) => x_max,
        },
        y_max: match spec.y_max {
            AxisLimit::Auto => auto.y_max,
            AxisLimit::Fixed(y_max) => y_max,
        },
    };

    if !(limits.x_max > 0.0 && limits.y_max > 0.0) {
        let reason = format!(
            "degenerate axis limits (plot={}, x_max={}, y_max={})",
            spec.kind, limits.x_max, limits.y_max
        );
        error!("{reason}");
        anyhow::bail!(reason);
    }

    Ok(limits)
}

impl Window {
    fn contains(&self, (x, y): (f64, f64)) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Liang-Barsky clipping of the segment `a`-`b`. Returns the parameters
    /// `(t0, t1)` of the visible part, or `None` if it lies outside.
    fn clip_segment(&self, a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;

        for (p, q) in [
            (-dx, a.0 - self.x_min),
            (dx, self.x_max - a.0),
            (-dy, a.1 - self.y_min),
            (dy, self.y_max - a.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }

            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        Some((t0, t1))
    }
}

/// Point at parameter `t` of the segment `a`-`b`. The endpoints are returned
/// exactly so unclipped vertices keep their data values.
fn lerp(a: (f64, f64), b: (f64, f64), t: f64) -> (f64, f64) {
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
    }
}

/// Clip a polyline to `window`. Every run of the result is a connected piece
/// of the line inside the window; a new run starts wherever the line comes
/// back in after leaving it.
pub fn clip_polyline(points: &[(f64, f64)], window: &Window) -> Vec<Vec<(f64, f64)>> {
    if let [point] = points {
        return if window.contains(*point) {
            vec![vec![*point]]
        } else {
            vec![]
        };
    }

    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut connected = false;
    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        match window.clip_segment(a, b) {
            Some((t0, t1)) => {
                let start = lerp(a, b, t0);
                let end = lerp(a, b, t1);
                match runs.last_mut() {
                    Some(run) if connected && t0 == 0.0 => run.push(end),
                    _ => runs.push(vec![start, end]),
                }
                connected = t1 == 1.0;
            }
            None => connected = false,
        }
    }

    runs
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(&self, (x, y): (f64, f64)) -> bool {
        match *self {
            Edge::Left(x_min) => x >= x_min,
            Edge::Right(x_max) => x <= x_max,
            Edge::Bottom(y_min) => y >= y_min,
            Edge::Top(y_max) => y <= y_max,
        }
    }

    fn intersect(&self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        match *self {
            Edge::Left(x) | Edge::Right(x) => (x, a.1 + (x - a.0) * (b.1 - a.1) / (b.0 - a.0)),
            Edge::Bottom(y) | Edge::Top(y) => (a.0 + (y - a.1) * (b.0 - a.0) / (b.1 - a.1), y),
        }
    }
}

/// Sutherland-Hodgman clipping of a closed polygon to `window`.
pub fn clip_polygon(polygon: &[(f64, f64)], window: &Window) -> Vec<(f64, f64)> {
    let edges = [
        Edge::Left(window.x_min),
        Edge::Right(window.x_max),
        Edge::Bottom(window.y_min),
        Edge::Top(window.y_max),
    ];

    let mut output = polygon.to_vec();
    for edge in edges {
        let input = std::mem::take(&mut output);
        let Some(&last) = input.last() else {
            break;
        };

        let mut prev = last;
        for &current in &input {
            match (edge.inside(prev), edge.inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.push(edge.intersect(prev, current)),
                (false, true) => {
                    output.push(edge.intersect(prev, current));
                    output.push(current);
                }
                (false, false) => {}
            }
            prev = current;
        }
    }

    output
}

/// Outline of the shaded band: upper bound left to right, then lower bound
/// right to left.
pub fn band_polygon(points: &[BandPoint]) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|p| (p.x, p.upper))
        .chain(points.iter().rev().map(|p| (p.x, p.lower)))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn bottom_left(&self) -> (i32, i32) {
        (self.left, self.top + self.height as i32)
    }

    pub fn bottom_right(&self) -> (i32, i32) {
        (
            self.left + self.width as i32,
            self.top + self.height as i32,
        )
    }
}

/// Pixel rectangle of an inset placed inside the plotting area spanning
/// `x_pixels` and `y_pixels` (pixel y grows downwards).
pub fn inset_area(x_pixels: Range<i32>, y_pixels: Range<i32>, placement: &InsetPlacement) -> PixelRect {
    let plot_width = (x_pixels.end - x_pixels.start) as f64;
    let plot_height = (y_pixels.end - y_pixels.start) as f64;
    let top_fraction = 1.0 - placement.bottom - placement.height;

    PixelRect {
        left: x_pixels.start + (placement.left * plot_width).round() as i32,
        top: y_pixels.start + (top_fraction * plot_height).round() as i32,
        width: (placement.width * plot_width).round().max(0.0) as u32,
        height: (placement.height * plot_height).round().max(0.0) as u32,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            _ => {
                error!("unsupported output format (path={})", path.display());
                anyhow::bail!(
                    "unsupported output format, expected .png or .svg (path={})",
                    path.display()
                );
            }
        }
    }
}

type Chart2d<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn grid_style() -> Result<ShapeStyle> {
    Ok(get_color_from_label("grid-gray")?.mix(0.6).stroke_width(1))
}

fn draw_bands_and_means<DB: DrawingBackend>(
    chart: &mut Chart2d<'_, DB>,
    series: &[Series],
    window: &Window,
    band_opacity: f64,
    with_legend: bool,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    for s in series {
        let band = clip_polygon(&band_polygon(&s.points), window);
        if band.len() >= 3 {
            chart.draw_series(std::iter::once(Polygon::new(
                band,
                s.color.mix(band_opacity).filled(),
            )))?;
        }

        let means: Vec<(f64, f64)> = s.points.iter().map(|p| (p.x, p.mean)).collect();
        let runs = clip_polyline(&means, window);
        if runs.is_empty() {
            debug!("{}: no points inside {window:?}", s.label);
            continue;
        }

        for (idx, run) in runs.into_iter().enumerate() {
            let line = chart.draw_series(LineSeries::new(
                run,
                s.color.stroke_width(STROKE_WIDTH),
            ))?;
            // One legend entry per series
            if with_legend && idx == 0 {
                let color = s.color;
                line.label(s.label.clone()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(STROKE_WIDTH))
                });
            }
        }
    }

    Ok(())
}

fn draw_inset<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &Chart2d<'_, DB>,
    spec: &PlotSpec,
    inset: &InsetSpec,
    series: &[Series],
    limits: &AxisLimits,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (x_pixels, y_pixels) = chart.plotting_area().get_pixel_range();
    let rect = inset_area(x_pixels, y_pixels, &inset.placement);
    let window = &inset.window;

    // Mark the zoomed region on the main chart and link it to the inset
    let marked = window.clamp_to(limits);
    chart.plotting_area().draw(&Rectangle::new(
        [(marked.x_min, marked.y_min), (marked.x_max, marked.y_max)],
        BLACK.stroke_width(1),
    ))?;
    let marked_top_left = chart
        .plotting_area()
        .map_coordinate(&(marked.x_min, marked.y_max));
    let marked_top_right = chart
        .plotting_area()
        .map_coordinate(&(marked.x_max, marked.y_max));
    root.draw(&PathElement::new(
        vec![marked_top_left, rect.bottom_left()],
        BLACK.mix(0.5),
    ))?;
    root.draw(&PathElement::new(
        vec![marked_top_right, rect.bottom_right()],
        BLACK.mix(0.5),
    ))?;

    let area = root
        .clone()
        .shrink((rect.left, rect.top), (rect.width, rect.height));
    area.fill(&WHITE)?;

    let inset_font_size = (spec.font_size * 3 / 4).max(1);
    let mut inset_chart = ChartBuilder::on(&area)
        .x_label_area_size(inset_font_size * 2)
        .y_label_area_size(if inset.hide_y_axis { 0 } else { inset_font_size * 4 })
        .margin(4)
        .build_cartesian_2d(window.x_range(), window.y_range())?;

    let mut mesh = inset_chart.configure_mesh();
    mesh.light_line_style(WHITE)
        .bold_line_style(grid_style()?)
        .x_labels(4)
        .label_style(("sans-serif", inset_font_size).into_font());
    if inset.hide_y_axis {
        mesh.disable_y_axis();
    }
    mesh.draw()?;

    draw_bands_and_means(&mut inset_chart, series, window, spec.band_opacity, false)?;

    root.draw(&Rectangle::new(
        [
            (rect.left, rect.top),
            (rect.left + rect.width as i32, rect.top + rect.height as i32),
        ],
        BLACK.stroke_width(1),
    ))?;

    Ok(())
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &PlotSpec,
    series: &[Series],
    limits: &AxisLimits,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let font = ("sans-serif", spec.font_size).into_font();
    let mut chart = ChartBuilder::on(root)
        .x_label_area_size(spec.font_size * 3)
        .y_label_area_size(spec.font_size * 5)
        .margin(10)
        .margin_right(20)
        .build_cartesian_2d(0f64..limits.x_max, 0f64..limits.y_max)?;

    chart
        .configure_mesh()
        .light_line_style(WHITE)
        .bold_line_style(grid_style()?)
        .x_labels(8)
        .y_labels(6)
        .x_desc(spec.x_desc.as_str())
        .y_desc(spec.y_desc.as_str())
        .label_style(font.clone())
        .axis_desc_style(font.clone())
        .draw()?;

    let plot_window = Window {
        x_min: 0.0,
        x_max: limits.x_max,
        y_min: 0.0,
        y_max: limits.y_max,
    };
    draw_bands_and_means(&mut chart, series, &plot_window, spec.band_opacity, true)?;

    chart
        .configure_series_labels()
        .position(spec.legend.into())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(font)
        .draw()?;

    if let Some(inset) = &spec.inset {
        draw_inset(root, &chart, spec, inset, series, limits)?;
    }

    Ok(())
}

/// Draw `series` following `spec` and write the figure to `spec.output`.
pub fn render(spec: &PlotSpec, series: &[Series]) -> Result<()> {
    let limits = resolve_limits(spec, series)?;
    let format = OutputFormat::from_path(&spec.output)?;
    debug!("{}: axis limits {limits:?}", spec.kind);

    if let Some(parent) = spec.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("error creating output directory (path={})", parent.display())
            })?;
        }
    }

    match format {
        OutputFormat::Png => {
            let root =
                BitMapBackend::new(&spec.output, (spec.width, spec.height)).into_drawing_area();
            draw_figure(&root, spec, series, &limits)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root =
                SVGBackend::new(&spec.output, (spec.width, spec.height)).into_drawing_area();
            draw_figure(&root, spec, series, &limits)?;
            root.present()?;
        }
    }

    info!("generated plot at: {}", spec.output.display());
    Ok(())
}

/// Load the CSV at `data_file` and render the chart for `kind`. Returns the
/// path of the generated figure.
/// Built-in spec for `kind` with the config file applied on top. An explicit
/// `output` wins over the one in the config file.
pub fn resolve_spec(
    kind: PlotKind,
    config: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<PlotSpec> {
    let mut spec = kind.spec()?;
    if let Some(config) = config {
        spec.apply_overrides(&PlotOverrides::from_file(config)?)?;
    }
    if let Some(output) = output {
        spec.output = output;
    }

    Ok(spec)
}

pub fn plot(
    kind: PlotKind,
    data_file: &Path,
    config: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let spec = resolve_spec(kind, config, output)?;

    let records = measurements::load(data_file, kind.schema())?;
    let groups = measurements::group_by_algorithm(records);
    let series = build_series(&spec, &groups)?;
    render(&spec, &series)?;

    Ok(spec.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::measurements::Measurement;

    fn groups(rows: &[(&str, f64, f64, f64)]) -> Groups {
        measurements::group_by_algorithm(
            rows.iter()
                .map(|(algo, size, avg, std_dev)| Measurement {
                    algorithm: algo.to_string(),
                    size: *size,
                    avg_latency_ms: *avg,
                    std_err_ms: None,
                    std_dev_ms: *std_dev,
                })
                .collect(),
        )
    }

    fn point(x: f64, mean: f64, std_dev: f64) -> BandPoint {
        BandPoint {
            x,
            mean,
            lower: mean - std_dev,
            upper: mean + std_dev,
        }
    }

    #[test]
    fn test_ss_latency_defaults() {
        let spec = PlotSpec::ss_latency().unwrap();
        let keys: Vec<String> = spec.series.iter().map(|s| s.algorithm.to_string()).collect();
        assert_eq!(keys, vec!["shamir", "ssms"]);
        assert_eq!(spec.series[0].label, "Shamir");
        assert_eq!(spec.row_limit, Some(600));
        assert_eq!(spec.unit, SizeUnit::Kilobytes);
        assert_eq!(spec.x_max, AxisLimit::Auto);
        assert_eq!(spec.kind.schema(), Schema::Positional(ColumnIndices::default()));
        assert!(spec.output.ends_with("ss_latency.png"));

        let inset = spec.inset.unwrap();
        assert_eq!(inset.window.x_max, 1.49);
        assert_eq!(inset.window.y_max, 0.026);
        assert!(inset.hide_y_axis);
    }

    #[test]
    fn test_comparison_defaults() {
        let spec = PlotSpec::encoding_comparison().unwrap();
        let labels: Vec<&str> = spec.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["RSA", "Shamir", "SSMS", "AES"]);
        assert_eq!(spec.x_max, AxisLimit::Fixed(10000.0));
        assert_eq!(spec.y_max, AxisLimit::Fixed(0.2));
        assert_eq!(spec.kind.schema(), Schema::Named);
        assert!(spec.inset.is_none());
    }

    #[test]
    fn test_apply_overrides() {
        let mut spec = PlotSpec::ss_latency().unwrap();
        let overrides = PlotOverrides::from_yaml(
            r##"
row_limit: 2
y_max: 0.1
colors:
  ssms: "#000000"
labels:
  shamir: Shamir (GF256)
"##,
        )
        .unwrap();
        spec.apply_overrides(&overrides).unwrap();

        assert_eq!(spec.row_limit, Some(2));
        assert_eq!(spec.x_max, AxisLimit::Auto);
        assert_eq!(spec.y_max, AxisLimit::Fixed(0.1));
        assert_eq!(spec.series[0].label, "Shamir (GF256)");
        assert_eq!(spec.series[1].label, "SSMS");
        let color = spec.series[1].color;
        assert_eq!((color.0, color.1, color.2), (0, 0, 0));
        assert_eq!(spec.width, 800);
    }

    #[test]
    fn test_output_flag_beats_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("plot.yaml");
        let from_config = dir.path().join("a.svg");
        let from_flag = dir.path().join("b.svg");
        std::fs::write(
            &config,
            format!("width: 640\noutput: {}\n", from_config.display()),
        )
        .unwrap();

        let spec = resolve_spec(PlotKind::SsLatency, Some(&config), None).unwrap();
        assert_eq!(spec.output, from_config);
        assert_eq!(spec.width, 640);

        let spec =
            resolve_spec(PlotKind::SsLatency, Some(&config), Some(from_flag.clone())).unwrap();
        assert_eq!(spec.output, from_flag);
        assert_eq!(spec.width, 640);
    }

    #[test]
    fn test_overrides_for_foreign_algorithm_fail() {
        let mut spec = PlotSpec::ss_latency().unwrap();
        let overrides = PlotOverrides::from_yaml("labels:\n  rsa: RSA-2048\n").unwrap();
        assert!(spec.apply_overrides(&overrides).is_err());
    }

    #[test]
    fn test_build_series_truncates_and_rescales() {
        let mut spec = PlotSpec::ss_latency().unwrap();
        spec.row_limit = Some(2);
        let groups = groups(&[
            ("shamir", 10.0, 0.001, 0.0005),
            ("shamir", 20.0, 0.002, 0.0005),
            ("shamir", 30.0, 0.003, 0.0005),
            ("ssms", 10.0, 0.004, 0.001),
            ("aes256", 10.0, 0.0001, 0.0),
        ]);

        let series = build_series(&spec, &groups).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[1].x, 0.02);
        assert_eq!(series[1].points.len(), 1);
        assert_eq!(series[1].label, "SSMS");
    }

    #[test]
    fn test_build_series_missing_algorithm() {
        let spec = PlotSpec::encoding_comparison().unwrap();
        let groups = groups(&[("shamir", 10.0, 0.001, 0.0), ("ssms", 10.0, 0.001, 0.0)]);
        assert!(build_series(&spec, &groups).is_err());
    }

    #[test]
    fn test_resolve_limits() {
        let spec = PlotSpec::ss_latency().unwrap();
        let series = vec![
            Series {
                label: "Shamir".to_string(),
                color: RGBColor(0, 0, 0),
                points: vec![point(0.01, 0.002, 0.001), point(105.0, 0.9, 0.1)],
            },
            Series {
                label: "SSMS".to_string(),
                color: RGBColor(0, 0, 0),
                points: vec![point(0.01, 0.003, 0.001), point(200.0, 1.5, 0.1)],
            },
        ];

        // Auto limits only look at the reference series
        let limits = resolve_limits(&spec, &series).unwrap();
        assert_eq!(limits.x_max, 105.0);
        assert_eq!(limits.y_max, 0.9);

        let mut fixed = spec.clone();
        fixed.y_max = AxisLimit::Fixed(2.0);
        assert_eq!(resolve_limits(&fixed, &series).unwrap().y_max, 2.0);

        assert!(resolve_limits(&spec, &[]).is_err());
    }

    #[test]
    fn test_resolve_limits_degenerate() {
        let spec = PlotSpec::ss_latency().unwrap();
        let series = vec![Series {
            label: "Shamir".to_string(),
            color: RGBColor(0, 0, 0),
            points: vec![point(10.0, 0.0, 0.0)],
        }];
        assert!(resolve_limits(&spec, &series).is_err());
    }

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    fn window(x_max: f64, y_max: f64) -> Window {
        Window {
            x_min: 0.0,
            x_max,
            y_min: 0.0,
            y_max,
        }
    }

    #[test]
    fn test_clip_polyline_leaving_the_top() {
        let points = vec![(1.0, 0.020), (2.0, 0.040), (3.0, 0.050)];
        let runs = clip_polyline(&points, &window(4.0, 0.026));

        // The line crosses y=0.026 at x=1.3 and never comes back
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 2);
        assert_close(runs[0][0], (1.0, 0.020));
        assert_close(runs[0][1], (1.3, 0.026));
    }

    #[test]
    fn test_clip_polyline_reaches_the_frame_edge() {
        let points = vec![(0.0, 0.001), (1.0, 0.002), (2.0, 0.010)];
        let runs = clip_polyline(&points, &window(1.5, 0.026));

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 3);
        assert_close(runs[0][1], (1.0, 0.002));
        assert_close(runs[0][2], (1.5, 0.006));
    }

    #[test]
    fn test_clip_polyline_splits_runs() {
        // Up and out of the window, then back in
        let points = vec![(0.0, 0.5), (1.0, 2.0), (2.0, 2.0), (3.0, 0.5)];
        let runs = clip_polyline(&points, &window(3.0, 1.0));

        assert_eq!(runs.len(), 2);
        assert_close(runs[0][0], (0.0, 0.5));
        assert_close(runs[0][1], (1.0 / 3.0, 1.0));
        assert_close(runs[1][0], (2.0 + 2.0 / 3.0, 1.0));
        assert_close(runs[1][1], (3.0, 0.5));
    }

    #[test]
    fn test_clip_polyline_inside_and_outside() {
        let inside = vec![(0.5, 0.5), (0.6, 0.7), (0.9, 0.1)];
        assert_eq!(clip_polyline(&inside, &window(1.0, 1.0)), vec![inside.clone()]);

        let outside = vec![(2.0, 0.5), (3.0, 0.7)];
        assert!(clip_polyline(&outside, &window(1.0, 1.0)).is_empty());

        assert_eq!(clip_polyline(&[(0.5, 0.5)], &window(1.0, 1.0)), vec![vec![(0.5, 0.5)]]);
        assert!(clip_polyline(&[(0.5, 1.5)], &window(1.0, 1.0)).is_empty());
        assert!(clip_polyline(&[], &window(1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_clip_band_polygon() {
        let points = vec![point(1.0, 0.020, 0.002), point(2.0, 0.040, 0.002)];
        let clipped = clip_polygon(&band_polygon(&points), &window(4.0, 0.026));

        for vertex in &clipped {
            assert!(window(4.0, 0.026).contains(*vertex), "{vertex:?} outside");
        }
        // Upper bound 0.022 -> 0.042 leaves the window at x=1.2, lower bound
        // 0.018 -> 0.038 at x=1.4
        assert!(clipped.iter().any(|v| (v.0 - 1.2).abs() < 1e-9 && (v.1 - 0.026).abs() < 1e-9));
        assert!(clipped.iter().any(|v| (v.0 - 1.4).abs() < 1e-9 && (v.1 - 0.026).abs() < 1e-9));
        assert!(clipped.iter().all(|v| v.0 <= 1.4 + 1e-9));
    }

    #[test]
    fn test_clip_polygon_square() {
        let square = vec![(-1.0, -1.0), (2.0, -1.0), (2.0, 2.0), (-1.0, 2.0)];
        let clipped = clip_polygon(&square, &window(1.0, 1.0));
        assert_eq!(clipped.len(), 4);
        for corner in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            assert!(clipped.contains(&corner), "missing {corner:?} in {clipped:?}");
        }

        let outside = vec![(2.0, 2.0), (3.0, 2.0), (3.0, 3.0)];
        assert!(clip_polygon(&outside, &window(1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_band_polygon() {
        let points = vec![point(1.0, 2.0, 0.5), point(2.0, 3.0, 1.0)];
        assert_eq!(
            band_polygon(&points),
            vec![(1.0, 2.5), (2.0, 4.0), (2.0, 2.0), (1.0, 1.5)]
        );
    }

    #[test]
    fn test_inset_area() {
        let placement = PlotSpec::ss_latency().unwrap().inset.unwrap().placement;
        let rect = inset_area(100..500, 50..350, &placement);
        assert_eq!(
            rect,
            PixelRect {
                left: 112,
                top: 59,
                width: 160,
                height: 120,
            }
        );
        assert_eq!(rect.bottom_left(), (112, 179));
        assert_eq!(rect.bottom_right(), (272, 179));
    }

    #[test]
    fn test_window_clamp_to_limits() {
        let window = Window {
            x_min: -1.0,
            x_max: 1.49,
            y_min: 0.0,
            y_max: 0.026,
        };
        let limits = AxisLimits {
            x_max: 1.0,
            y_max: 0.5,
        };
        let clamped = window.clamp_to(&limits);
        assert_eq!(clamped.x_min, 0.0);
        assert_eq!(clamped.x_max, 1.0);
        assert_eq!(clamped.y_max, 0.026);
    }

    #[test]
    fn test_output_format() {
        assert_eq!(
            OutputFormat::from_path(Path::new("ss_latency.png")).unwrap(),
            OutputFormat::Png
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("plots/out.SVG")).unwrap(),
            OutputFormat::Svg
        );
        assert!(OutputFormat::from_path(Path::new("out.pdf")).is_err());
        assert!(OutputFormat::from_path(Path::new("out")).is_err());
    }
}
