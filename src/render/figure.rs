//! Multi-panel trend figure.
//!
//! The figure is a 2x2 grid under a shared title:
//! mean fitness (top-left), percentile bands or final-generation box plot
//! (top-right), improvement per generation (bottom-left) and the
//! prey/predator phase plot with a generation color bar (bottom-right).

use super::palette;
use crate::analysis::BAND_COUNT;
use crate::cli::TopRightPanel;
use crate::models::{BoxSummary, FinalDistribution, GenerationStat, PercentileRow, PhasePoint, Trends};
use anyhow::{anyhow, Context, Result};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

type DrawResult<T, DB> = std::result::Result<T, DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Width reserved for the phase plot color bar.
const COLORBAR_WIDTH: i32 = 170;
/// Height the font sizes below were tuned for.
const REFERENCE_HEIGHT: f64 = 1800.0;

/// Options controlling the rendered figure.
#[derive(Debug, Clone)]
pub struct FigureOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub panel: TopRightPanel,
}

/// Font sizes scaled to the figure height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub title: f64,
    pub caption: f64,
    pub label: f64,
    pub legend: f64,
}

impl FontSizes {
    pub fn for_height(height: u32) -> Self {
        let scale = (height as f64 / REFERENCE_HEIGHT).max(0.25);
        Self {
            title: 44.0 * scale,
            caption: 32.0 * scale,
            label: 22.0 * scale,
            legend: 20.0 * scale,
        }
    }
}

/// One mean +/- CI series on a panel.
struct CiSeries<'a> {
    label: &'static str,
    stats: &'a [GenerationStat],
    color: RGBColor,
}

/// Render the full figure to a PNG at `path`, creating parent directories.
pub fn render_figure(path: &Path, trends: &Trends, options: &FigureOptions) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    debug!(
        "Rendering {}x{} figure with {:?} panel",
        options.width, options.height, options.panel
    );

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    draw_figure(&root, trends, options)
        .map_err(|e| anyhow!("Failed to render plot {}: {}", path.display(), e))?;

    info!("Plot written to {}", path.display());
    Ok(())
}

/// Draw every panel onto `root`.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    trends: &Trends,
    options: &FigureOptions,
) -> DrawResult<(), DB> {
    let fonts = FontSizes::for_height(options.height);

    root.fill(&WHITE)?;
    let body = root.titled(&options.title, ("sans-serif", fonts.title))?;
    let panels = body.split_evenly((2, 2));

    draw_ci_panel(
        &panels[0],
        &fonts,
        "Mean Fitness vs Generation (95% CI)",
        "Average fitness",
        &[
            CiSeries {
                label: "Prey mean fitness",
                stats: &trends.prey_mean,
                color: palette::PREY,
            },
            CiSeries {
                label: "Predator mean fitness",
                stats: &trends.predator_mean,
                color: palette::PREDATOR,
            },
        ],
        false,
    )?;

    match options.panel {
        TopRightPanel::Bands => draw_percentile_panel(&panels[1], &fonts, &trends.prey_percentiles)?,
        TopRightPanel::Boxplot => draw_box_panel(&panels[1], &fonts, &trends.final_distribution)?,
    }

    draw_ci_panel(
        &panels[2],
        &fonts,
        "Improvement per Generation (95% CI)",
        "Delta avg fitness",
        &[
            CiSeries {
                label: "Prey improvement",
                stats: &trends.prey_improvement,
                color: palette::PREY,
            },
            CiSeries {
                label: "Predator improvement",
                stats: &trends.predator_improvement,
                color: palette::PREDATOR,
            },
        ],
        true,
    )?;

    draw_phase_panel(&panels[3], &fonts, &trends.phase)?;

    root.present()?;
    Ok(())
}

/// Line with a shaded confidence band per series.
fn draw_ci_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fonts: &FontSizes,
    title: &str,
    y_desc: &str,
    series: &[CiSeries<'_>],
    zero_line: bool,
) -> DrawResult<(), DB> {
    let x_range = generation_range(
        series
            .iter()
            .flat_map(|s| s.stats.iter().map(|st| st.generation)),
    );
    let mut y_values: Vec<f64> = series
        .iter()
        .flat_map(|s| s.stats.iter().flat_map(|st| [st.lower(), st.upper()]))
        .collect();
    if zero_line {
        y_values.push(0.0);
    }
    let y_range = padded_range(y_values);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", fonts.caption))
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.clone(), y_range)?;

    chart
        .configure_mesh()
        .x_labels(generation_ticks(&x_range))
        .x_label_formatter(&generation_label)
        .x_desc("Generation")
        .y_desc(y_desc)
        .label_style(("sans-serif", fonts.label))
        .axis_desc_style(("sans-serif", fonts.label))
        .draw()?;

    if zero_line {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x_range.start, 0.0), (x_range.end, 0.0)],
            BLACK.mix(0.5).stroke_width(2),
        )))?;
    }

    for s in series {
        if s.stats.is_empty() {
            continue;
        }
        let color = s.color;
        let edges: Vec<(f64, f64, f64)> = s
            .stats
            .iter()
            .map(|st| (st.generation as f64, st.lower(), st.upper()))
            .collect();

        chart.draw_series(std::iter::once(Polygon::new(
            band_polygon(&edges),
            color.mix(0.2).filled(),
        )))?;
        chart
            .draw_series(LineSeries::new(
                s.stats.iter().map(|st| (st.generation as f64, st.mean)),
                color.stroke_width(3),
            ))?
            .label(s.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", fonts.legend))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    Ok(())
}

/// Legend label for a percentile band; only a few are shown.
pub fn band_legend_label(index: usize) -> Option<&'static str> {
    match index {
        0 => Some("P0-10"),
        4 => Some("P40-50"),
        9 => Some("P90-100"),
        _ => None,
    }
}

/// Stacked decile bands with a P99 overlay.
fn draw_percentile_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fonts: &FontSizes,
    rows: &[PercentileRow],
) -> DrawResult<(), DB> {
    let x_range = generation_range(rows.iter().map(|r| r.generation));
    let y_range = padded_range(
        rows.iter()
            .flat_map(|r| [r.deciles[0], r.deciles[BAND_COUNT], r.p99]),
    );

    let mut chart = ChartBuilder::on(area)
        .caption("Prey Fitness Percentile Bands", ("sans-serif", fonts.caption))
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.clone(), y_range)?;

    chart
        .configure_mesh()
        .x_labels(generation_ticks(&x_range))
        .x_label_formatter(&generation_label)
        .x_desc("Generation")
        .y_desc("Prey average fitness")
        .label_style(("sans-serif", fonts.label))
        .axis_desc_style(("sans-serif", fonts.label))
        .draw()?;

    for band in 0..BAND_COUNT {
        let color = palette::band_color(band);
        let edges: Vec<(f64, f64, f64)> = rows
            .iter()
            .map(|r| {
                let (low, high) = r.band(band);
                (r.generation as f64, low, high)
            })
            .collect();

        let anno = chart.draw_series(std::iter::once(Polygon::new(
            band_polygon(&edges),
            color.mix(0.6).filled(),
        )))?;
        if let Some(label) = band_legend_label(band) {
            anno.label(label).legend(move |(x, y)| {
                Rectangle::new([(x, y - 8), (x + 24, y + 8)], color.mix(0.6).filled())
            });
        }
    }

    // Thin white separators between bands.
    for level in 0..=BAND_COUNT {
        chart.draw_series(LineSeries::new(
            rows.iter().map(|r| (r.generation as f64, r.deciles[level])),
            WHITE.mix(0.8).stroke_width(1),
        ))?;
    }

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|r| (r.generation as f64, r.p99)),
            palette::TAIL.stroke_width(3),
        ))?
        .label("P99")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], palette::TAIL.stroke_width(3)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .label_font(("sans-serif", fonts.legend))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    Ok(())
}

/// Box-and-whisker plot of both populations at the final generation.
fn draw_box_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fonts: &FontSizes,
    dist: &FinalDistribution,
) -> DrawResult<(), DB> {
    let boxes = [
        (1.0, "Prey", &dist.prey, palette::PREY),
        (2.0, "Predator", &dist.predator, palette::PREDATOR),
    ];
    let y_range = padded_range(boxes.iter().flat_map(|(_, _, b, _)| box_extent(b)));

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("Final Generation Fitness (generation {})", dist.generation),
            ("sans-serif", fonts.caption),
        )
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0.4f64..2.6f64, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .x_desc("Population")
        .y_desc("Average fitness")
        .label_style(("sans-serif", fonts.label))
        .axis_desc_style(("sans-serif", fonts.label))
        .draw()?;

    let half = 0.25;
    for (x, label, summary, color) in boxes {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x - half, summary.q1), (x + half, summary.q3)],
                color.mix(0.35).filled(),
            )))?
            .label(label)
            .legend(move |(lx, ly)| {
                Rectangle::new([(lx, ly - 8), (lx + 24, ly + 8)], color.mix(0.35).filled())
            });
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - half, summary.q1), (x + half, summary.q3)],
            color.stroke_width(2),
        )))?;

        let cap = half / 2.0;
        chart.draw_series(
            [
                vec![(x - half, summary.median), (x + half, summary.median)],
                vec![(x, summary.q3), (x, summary.whisker_high)],
                vec![(x, summary.q1), (x, summary.whisker_low)],
                vec![(x - cap, summary.whisker_high), (x + cap, summary.whisker_high)],
                vec![(x - cap, summary.whisker_low), (x + cap, summary.whisker_low)],
            ]
            .into_iter()
            .map(|path| PathElement::new(path, BLACK.stroke_width(2))),
        )?;

        chart.draw_series(
            summary
                .outliers
                .iter()
                .map(|&v| Circle::new((x, v), 5, color.stroke_width(2))),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", fonts.legend))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    Ok(())
}

/// Predator mean against prey mean, colored by generation.
fn draw_phase_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fonts: &FontSizes,
    phase: &[PhasePoint],
) -> DrawResult<(), DB> {
    let (width, _) = area.dim_in_pixel();
    let (plot_area, bar_area) = area.split_horizontally(width as i32 - COLORBAR_WIDTH);

    let x_range = padded_range(phase.iter().map(|p| p.prey_mean));
    let y_range = padded_range(phase.iter().map(|p| p.predator_mean));
    let gen_range = generation_range(phase.iter().map(|p| p.generation));

    let mut chart = ChartBuilder::on(&plot_area)
        .caption("Prey-Predator Tradeoff Phase Plot", ("sans-serif", fonts.caption))
        .margin(16)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Prey average fitness")
        .y_desc("Predator average fitness")
        .label_style(("sans-serif", fonts.label))
        .axis_desc_style(("sans-serif", fonts.label))
        .draw()?;

    chart.draw_series(LineSeries::new(
        phase.iter().map(|p| (p.prey_mean, p.predator_mean)),
        palette::TRAJECTORY.mix(0.7).stroke_width(2),
    ))?;

    chart.draw_series(phase.iter().map(|p| {
        let color = palette::viridis_in(p.generation as f64, &gen_range);
        Circle::new((p.prey_mean, p.predator_mean), 5, color.mix(0.95).filled())
    }))?;

    let endpoints = [
        (phase.first(), "Start", palette::START),
        (phase.last(), "End", palette::END),
    ];
    for (point, label, color) in endpoints {
        if let Some(p) = point {
            chart
                .draw_series(std::iter::once(Circle::new(
                    (p.prey_mean, p.predator_mean),
                    8,
                    color.filled(),
                )))?
                .label(label)
                .legend(move |(x, y)| Circle::new((x + 12, y), 7, color.filled()));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", fonts.legend))
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    draw_colorbar(&bar_area, fonts, gen_range)
}

/// Vertical viridis gradient, labelled by generation on its right.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fonts: &FontSizes,
    range: Range<f64>,
) -> DrawResult<(), DB> {
    let mut bar = ChartBuilder::on(area)
        .margin_top(90)
        .margin_bottom(76)
        .margin_left(12)
        .x_label_area_size(0)
        .right_y_label_area_size(110)
        .build_cartesian_2d(0.0f64..1.0f64, range.clone())?;

    bar.configure_mesh()
        .x_labels(0)
        .y_labels(generation_ticks(&range))
        .y_label_formatter(&generation_label)
        .disable_x_mesh()
        .disable_y_mesh()
        .y_desc("Generation")
        .label_style(("sans-serif", fonts.label))
        .axis_desc_style(("sans-serif", fonts.label))
        .draw()?;

    let steps = 240usize;
    let span = range.end - range.start;
    bar.draw_series((0..steps).map(|i| {
        let y0 = range.start + span * i as f64 / steps as f64;
        let y1 = range.start + span * (i + 1) as f64 / steps as f64;
        let color = palette::viridis_in(range.start + span * (i as f64 + 0.5) / steps as f64, &range);
        Rectangle::new([(0.0, y0), (1.0, y1)], color.filled())
    }))?;

    Ok(())
}

/// Closed outline of the region between a lower and upper curve.
///
/// `edges` holds `(x, lower, upper)`; the upper curve is walked forward and
/// the lower curve backward.
pub fn band_polygon(edges: &[(f64, f64, f64)]) -> Vec<(f64, f64)> {
    let mut outline: Vec<(f64, f64)> = edges.iter().map(|&(x, _, upper)| (x, upper)).collect();
    outline.extend(edges.iter().rev().map(|&(x, lower, _)| (x, lower)));
    outline
}

/// Axis range over generations; a single generation is widened by one.
pub fn generation_range<I: IntoIterator<Item = u64>>(generations: I) -> Range<f64> {
    let mut min = u64::MAX;
    let mut max = u64::MIN;
    for g in generations {
        min = min.min(g);
        max = max.max(g);
    }
    if min > max {
        return 0.0..1.0;
    }
    if min == max {
        return (min as f64 - 0.5)..(max as f64 + 0.5);
    }
    min as f64..max as f64
}

/// Tick label for a generation axis; only whole generations are labelled.
pub fn generation_label(value: &f64) -> String {
    if (value - value.round()).abs() < 1e-6 {
        // Adding zero turns -0 into 0.
        format!("{:.0}", value.round() + 0.0)
    } else {
        String::new()
    }
}

/// Number of tick labels for a generation axis, at most one per generation.
pub fn generation_ticks(range: &Range<f64>) -> usize {
    ((range.end - range.start).floor().max(0.0) as usize + 1).clamp(3, 10)
}

/// Value range with 5% padding; degenerate or empty input gets a unit span.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    if span < 1e-9 {
        return (min - 0.5)..(max + 0.5);
    }
    let pad = span * 0.05;
    (min - pad)..(max + pad)
}

/// Lowest and highest drawn value of a box summary.
fn box_extent(summary: &BoxSummary) -> Vec<f64> {
    let mut values = vec![summary.whisker_low, summary.whisker_high, summary.q1, summary.q3];
    values.extend(summary.outliers.iter().copied());
    values
}
