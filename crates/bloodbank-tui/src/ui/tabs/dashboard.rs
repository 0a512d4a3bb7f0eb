use bloodbank_core::aggregate::NO_LOCATION_NOTICE;
use bloodbank_core::{DashboardSnapshot, HospitalRecord, MapPoint, MapView, PointKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, MapResolution, Points},
        Block, Borders, Cell, Paragraph, Row, Table, TableState,
    },
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::{format_count, format_inventory, truncate_string};

/// Degrees of padding around the outermost points.
const MAP_PADDING_DEG: f64 = 2.0;

/// Smallest longitude span drawn; latitude gets half of it.
const MIN_MAP_SPAN_DEG: f64 = 12.0;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = app.snapshot.as_ref() else {
        let text = if app.loading { "Loading dashboard..." } else { "No data loaded. Press [u] to update." };
        let paragraph = Paragraph::new(Span::styled(text, styles::muted_style()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
        frame.render_widget(paragraph, area);
        return;
    };

    // Vertical layout:
    // 1. Heading
    // 2. Metric cards (three across)
    // 3. Inventory table | Map
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Heading
            Constraint::Length(4), // Metrics
            Constraint::Min(8),    // Table and map
        ])
        .split(area);

    let heading = Line::from(vec![
        Span::styled(" Real-Time Blood Stock & Analytics", styles::title_style()),
        Span::styled(
            format!("  ({} donors on file)", snapshot.donors.len()),
            styles::muted_style(),
        ),
    ]);
    frame.render_widget(Paragraph::new(heading), chunks[0]);

    render_metrics(frame, snapshot, chunks[1]);

    match snapshot.hospital_table() {
        Some(hospitals) => {
            let bottom = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                .split(chunks[2]);
            render_inventory_table(frame, app, hospitals, bottom[0]);
            render_map(frame, &snapshot.map, bottom[1]);
        }
        None => render_map(frame, &snapshot.map, chunks[2]),
    }
}

fn render_metrics(frame: &mut Frame, snapshot: &DashboardSnapshot, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let metrics = snapshot.metrics;
    let values = [
        ("Total Registered Donors", format_count(metrics.donor_count as i64)),
        ("Hospitals on Platform", format_count(metrics.hospital_count as i64)),
        ("Total A+ Blood Units", format_count(metrics.total_a_positive_units)),
    ];

    for ((label, value), card) in values.into_iter().zip(cards.iter()) {
        let lines = vec![
            Line::from(Span::styled(label, styles::muted_style())),
            Line::from(Span::styled(value, styles::metric_value_style())),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
        frame.render_widget(paragraph, *card);
    }
}

fn render_inventory_table(frame: &mut Frame, app: &App, hospitals: &[HospitalRecord], area: Rect) {
    let header = Row::new([Cell::from("Hospital"), Cell::from("Location"), Cell::from("Inventory")])
        .style(styles::title_style())
        .height(1);

    let rows: Vec<Row> = hospitals
        .iter()
        .enumerate()
        .map(|(i, hospital)| {
            let style = if i == app.hospital_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(truncate_string(hospital.display_name(), 32)),
                Cell::from(hospital.location.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(format_inventory(hospital.inventory.as_ref())),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(20),
        Constraint::Fill(1),
    ];

    let title = format!(" Hospital Inventory Status ({}) ", hospitals.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.hospital_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_map(frame: &mut Frame, map: &MapView, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Map of Hospitals and Donors ", styles::muted_style()),
        Span::styled("● ", styles::list_item_style().fg(styles::point_color(PointKind::Hospital))),
        Span::styled("hospital ", styles::muted_style()),
        Span::styled("● ", styles::list_item_style().fg(styles::point_color(PointKind::Donor))),
        Span::styled("donor ", styles::muted_style()),
    ]);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let points = match map {
        MapView::Points(points) => points,
        MapView::NoLocationData => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(format!("⚠ {}", NO_LOCATION_NOTICE), styles::warning_style())),
            ])
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }
    };

    let (x_bounds, y_bounds) = map_bounds(points);
    let hospitals = coords_of(points, PointKind::Hospital);
    let donors = coords_of(points, PointKind::Donor);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: styles::MUTED,
                resolution: MapResolution::High,
            });
            ctx.layer();
            ctx.draw(&Points {
                coords: &hospitals,
                color: styles::point_color(PointKind::Hospital),
            });
            ctx.draw(&Points {
                coords: &donors,
                color: styles::point_color(PointKind::Donor),
            });
        });

    frame.render_widget(canvas, area);
}

/// Canvas coordinates are (x, y) = (lon, lat).
fn coords_of(points: &[MapPoint], kind: PointKind) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| (p.lon, p.lat))
        .collect()
}

/// Longitude and latitude bounds that frame every point, padded and kept
/// inside the globe.
fn map_bounds(points: &[MapPoint]) -> ([f64; 2], [f64; 2]) {
    if points.is_empty() {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }

    let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
    let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
    for p in points {
        min_lon = min_lon.min(p.lon);
        max_lon = max_lon.max(p.lon);
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
    }

    let x = padded_span(min_lon, max_lon, MIN_MAP_SPAN_DEG, 180.0);
    let y = padded_span(min_lat, max_lat, MIN_MAP_SPAN_DEG / 2.0, 90.0);
    (x, y)
}

fn padded_span(min: f64, max: f64, min_span: f64, limit: f64) -> [f64; 2] {
    let mut lo = min - MAP_PADDING_DEG;
    let mut hi = max + MAP_PADDING_DEG;
    if hi - lo < min_span {
        let center = (lo + hi) / 2.0;
        lo = center - min_span / 2.0;
        hi = center + min_span / 2.0;
    }
    [lo.max(-limit), hi.min(limit)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, kind: PointKind) -> MapPoint {
        MapPoint { lat, lon, kind }
    }

    #[test]
    fn test_map_bounds_frames_points() {
        let points = vec![
            point(8.5, 77.2, PointKind::Hospital),
            point(12.9, 79.8, PointKind::Donor),
            point(28.6, 77.2, PointKind::Donor),
        ];
        let ([x0, x1], [y0, y1]) = map_bounds(&points);
        for p in &points {
            assert!(x0 < p.lon && p.lon < x1);
            assert!(y0 < p.lat && p.lat < y1);
        }
    }

    #[test]
    fn test_map_bounds_single_point_has_minimum_span() {
        let ([x0, x1], [y0, y1]) = map_bounds(&[point(10.0, 78.0, PointKind::Donor)]);
        assert!((x1 - x0 - MIN_MAP_SPAN_DEG).abs() < 1e-9);
        assert!((y1 - y0 - MIN_MAP_SPAN_DEG / 2.0).abs() < 1e-9);
        assert!(((x0 + x1) / 2.0 - 78.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_bounds_clamped_to_globe() {
        let ([x0, x1], [y0, y1]) = map_bounds(&[
            point(-89.5, -179.9, PointKind::Hospital),
            point(89.5, 179.9, PointKind::Hospital),
        ]);
        assert_eq!([x0, x1], [-180.0, 180.0]);
        assert_eq!([y0, y1], [-90.0, 90.0]);
    }

    #[test]
    fn test_coords_of_splits_by_kind() {
        let points = vec![
            point(10.0, 78.0, PointKind::Hospital),
            point(11.0, 79.0, PointKind::Donor),
        ];
        assert_eq!(coords_of(&points, PointKind::Hospital), vec![(78.0, 10.0)]);
        assert_eq!(coords_of(&points, PointKind::Donor), vec![(79.0, 11.0)]);
    }
}
