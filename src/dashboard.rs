//! Attestation dashboard: layout, pointer routing, and drawing.
//!
//! Layout is a pure function of window size, UI toggles, and config, so
//! hit-testing and drawing always agree on where things are. Each attestation
//! card owns a `PieChart` plus the label overlay its floating labels live in.

use glam::Vec2;
use tracing::{debug, info};
use vello::kurbo::{Affine, Circle, Line, Point, Rect, RoundedRect, Stroke};
use vello::peniko::{Color, Fill};
use vello::Scene;
use winit::window::CursorIcon;

use crate::chart::camera::SurfaceSize;
use crate::chart::labels::{LabelOverlay, Side};
use crate::chart::{raster, Category, ChartInput, PieChart, PointerInput, TickOutcome};
use crate::config::{AttestationCard, DashboardConfig, StatTile, Trend};
use crate::state_machine::interaction_sm::CursorStyle;
use crate::text::{Align, TextPainter};

// --- Color palette ---

pub const BG_COLOR: Color = Color::new([0.976, 0.980, 0.984, 1.0]);      // near-white page
const WHITE: Color = Color::new([1.0, 1.0, 1.0, 1.0]);
const PRIMARY: Color = Color::new([0.0, 0.192, 0.286, 1.0]);             // #003149
const PRIMARY_TINT: Color = Color::new([0.0, 0.192, 0.286, 0.10]);
const PRIMARY_WASH: Color = Color::new([0.0, 0.192, 0.286, 0.04]);
const PRIMARY_BORDER: Color = Color::new([0.0, 0.192, 0.286, 0.18]);
const BORDER: Color = Color::new([0.0, 0.192, 0.286, 0.10]);
const ROW_HOVER: Color = Color::new([0.0, 0.192, 0.286, 0.03]);
const TEXT_PRIMARY: Color = Color::new([0.059, 0.090, 0.165, 1.0]);      // #0f172a
const TEXT_MUTED: Color = Color::new([0.059, 0.090, 0.165, 0.6]);
const TREND_UP: Color = Color::new([0.086, 0.639, 0.290, 1.0]);          // green-600
const TREND_DOWN: Color = Color::new([0.863, 0.149, 0.149, 1.0]);        // red-600
const HIGHLIGHT_TEXT: Color = Color::new([0.851, 0.467, 0.024, 1.0]);    // amber-600
const LABEL_BG: Color = Color::new([1.0, 1.0, 1.0, 0.9]);
const HEADER_BG: Color = Color::new([1.0, 1.0, 1.0, 0.92]);
const SIDEBAR_BG: Color = Color::new([1.0, 1.0, 1.0, 0.96]);

// --- Layout constants ---

const MARGIN: f64 = 24.0;
const GAP: f64 = 24.0;
const HEADER_HEIGHT: f64 = 72.0;
const MENU_BUTTON: f64 = 40.0;
pub const SIDEBAR_WIDTH: f64 = 256.0;
const NAV_TOP: f64 = 88.0;
const NAV_ITEM_HEIGHT: f64 = 44.0;
const BANNER_HEIGHT: f64 = 72.0;
const TILE_HEIGHT: f64 = 120.0;
/// Extra space between the stat tiles and the card grid.
const SECTION_GAP: f64 = 48.0;
const CARD_PAD: f64 = 24.0;
const CARD_TITLE: f64 = 40.0;
const CHART_MAX_HEIGHT: f64 = 320.0;
const CHART_RADIUS: f64 = 8.0;
const LEGEND_HEIGHT: f64 = 76.0;
const LEGEND_GAP: f64 = 12.0;
const TABLE_HEADER: f64 = 52.0;
const ROW_HEIGHT: f64 = 52.0;
const TOGGLE_HEIGHT: f64 = 48.0;
const MIN_CONTENT_WIDTH: f64 = 240.0;
/// Content width at which tiles go four across and cards two across.
const WIDE: f64 = 1000.0;
const MEDIUM: f64 = 600.0;
pub const COLLAPSED_ROWS: usize = 3;

const LABEL_PAD_X: f64 = 8.0;
const LABEL_PAD_Y: f64 = 4.0;

const BANNER_TEXT: &str = "The dashboard displays attestations mapped to their respective IAM reviews. \
To complete a pending attestation, click the attestation name in the corresponding tile. \
To view all attestations, select \"VIEW ALL\" at the bottom of each tile.";

// ---------------------------------------------------------------------------
// UI state and layout
// ---------------------------------------------------------------------------

/// Local UI toggles. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub sidebar_open: bool,
    /// Per-card table expansion, indexed like `DashboardConfig::attestations`.
    pub expanded: Vec<bool>,
    /// Vertical scroll offset of the content area, in pixels.
    pub scroll: f64,
}

impl UiState {
    pub fn for_config(config: &DashboardConfig) -> Self {
        Self {
            sidebar_open: config.sidebar.open,
            expanded: vec![false; config.attestations.len()],
            scroll: 0.0,
        }
    }

    pub fn is_expanded(&self, card: usize) -> bool {
        self.expanded.get(card).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub panel: Rect,
    /// The chart's render surface.
    pub chart: Rect,
    pub legend: [Rect; 3],
    pub table: Rect,
    pub table_header: Rect,
    /// Only the rows currently shown.
    pub rows: Vec<Rect>,
    /// "VIEW ALL" / "Show Less", present only when there is something to hide.
    pub toggle: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub header: Rect,
    pub menu_button: Rect,
    pub sidebar: Option<Rect>,
    pub nav_items: Vec<Rect>,
    pub banner: Rect,
    pub tiles: Vec<Rect>,
    pub cards: Vec<CardLayout>,
    /// Unscrolled height of everything below the top of the window.
    pub content_height: f64,
}

/// Rows a table shows in its current expansion state.
pub fn visible_rows(total: usize, expanded: bool) -> usize {
    if expanded { total } else { total.min(COLLAPSED_ROWS) }
}

/// Lay out the whole dashboard for a `width` x `height` window.
pub fn layout(width: f64, height: f64, ui: &UiState, config: &DashboardConfig) -> Layout {
    let left = if ui.sidebar_open { SIDEBAR_WIDTH } else { 0.0 };
    let sidebar = ui.sidebar_open.then(|| Rect::new(0.0, 0.0, SIDEBAR_WIDTH, height));
    let nav_items = if ui.sidebar_open {
        (0..config.sidebar.items.len())
            .map(|i| {
                let y = NAV_TOP + i as f64 * (NAV_ITEM_HEIGHT + 8.0);
                Rect::new(16.0, y, SIDEBAR_WIDTH - 16.0, y + NAV_ITEM_HEIGHT)
            })
            .collect()
    } else {
        Vec::new()
    };

    let x0 = left + MARGIN;
    let content_w = (width - MARGIN - x0).max(MIN_CONTENT_WIDTH);
    let header = Rect::new(x0, MARGIN, x0 + content_w, MARGIN + HEADER_HEIGHT);
    let menu_button = Rect::from_origin_size(
        (header.x0 + 16.0, header.y0 + (HEADER_HEIGHT - MENU_BUTTON) / 2.0),
        (MENU_BUTTON, MENU_BUTTON),
    );

    let mut y = header.y1 + GAP - ui.scroll;
    let banner = Rect::new(x0, y, x0 + content_w, y + BANNER_HEIGHT);
    y = banner.y1 + GAP;

    let tile_cols = if content_w >= WIDE {
        4
    } else if content_w >= MEDIUM {
        2
    } else {
        1
    };
    let tile_w = column_width(content_w, tile_cols);
    let tiles: Vec<Rect> = (0..config.stats.len())
        .map(|i| {
            let (col, row) = (i % tile_cols, i / tile_cols);
            let tx = x0 + col as f64 * (tile_w + GAP);
            let ty = y + row as f64 * (TILE_HEIGHT + GAP);
            Rect::new(tx, ty, tx + tile_w, ty + TILE_HEIGHT)
        })
        .collect();
    let tile_rows = config.stats.len().div_ceil(tile_cols);
    if tile_rows > 0 {
        y += tile_rows as f64 * (TILE_HEIGHT + GAP) - GAP + SECTION_GAP;
    }

    let card_cols = if content_w >= WIDE { 2 } else { 1 };
    let card_w = column_width(content_w, card_cols);
    let mut cards = Vec::with_capacity(config.attestations.len());
    for (row, chunk) in config.attestations.chunks(card_cols).enumerate() {
        let mut row_bottom = y;
        for (col, card) in chunk.iter().enumerate() {
            let index = row * card_cols + col;
            let cx = x0 + col as f64 * (card_w + GAP);
            let placed = card_layout(cx, y, card_w, card, ui.is_expanded(index));
            row_bottom = row_bottom.max(placed.table.y1);
            cards.push(placed);
        }
        y = row_bottom + GAP;
    }

    Layout {
        header,
        menu_button,
        sidebar,
        nav_items,
        banner,
        tiles,
        cards,
        content_height: y - GAP + MARGIN + ui.scroll,
    }
}

fn column_width(total: f64, columns: usize) -> f64 {
    (total - GAP * (columns as f64 - 1.0)) / columns as f64
}

fn card_layout(x: f64, y: f64, w: f64, card: &AttestationCard, expanded: bool) -> CardLayout {
    let inner_w = (w - 2.0 * CARD_PAD).max(1.0);
    let chart_top = y + CARD_PAD + CARD_TITLE;
    let chart = Rect::new(
        x + CARD_PAD,
        chart_top,
        x + CARD_PAD + inner_w,
        chart_top + inner_w.min(CHART_MAX_HEIGHT),
    );

    let legend_top = chart.y1 + CARD_PAD;
    let cell_w = (inner_w - 2.0 * LEGEND_GAP) / 3.0;
    let legend = [0.0, 1.0, 2.0].map(|i| {
        let lx = x + CARD_PAD + i * (cell_w + LEGEND_GAP);
        Rect::new(lx, legend_top, lx + cell_w, legend_top + LEGEND_HEIGHT)
    });
    let panel = Rect::new(x, y, x + w, legend_top + LEGEND_HEIGHT + CARD_PAD);

    let table_top = panel.y1 + GAP;
    let table_header = Rect::new(x, table_top, x + w, table_top + TABLE_HEADER);
    let rows: Vec<Rect> = (0..visible_rows(card.rows.len(), expanded))
        .map(|i| {
            let ry = table_header.y1 + i as f64 * ROW_HEIGHT;
            Rect::new(x, ry, x + w, ry + ROW_HEIGHT)
        })
        .collect();
    let rows_bottom = rows.last().map_or(table_header.y1, |r| r.y1);
    let toggle = (card.rows.len() > COLLAPSED_ROWS).then(|| Rect::new(x, rows_bottom, x + w, rows_bottom + TOGGLE_HEIGHT));
    let table = Rect::new(x, table_top, x + w, toggle.map_or(rows_bottom, |t| t.y1));

    CardLayout {
        panel,
        chart,
        legend,
        table,
        table_header,
        rows,
        toggle,
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

struct ChartSlot {
    chart: PieChart,
    overlay: LabelOverlay,
}

fn card_input(card: &AttestationCard) -> ChartInput {
    ChartInput::new(card.completed, card.pending, card.auto_closed)
}

fn surface_of(rect: Rect) -> SurfaceSize {
    SurfaceSize::new(rect.width(), rect.height())
}

pub struct Dashboard {
    config: DashboardConfig,
    ui: UiState,
    width: f64,
    height: f64,
    layout: Layout,
    slots: Vec<ChartSlot>,
    text: TextPainter,
    cursor: Option<Point>,
    /// Chart currently under the cursor.
    hovered_chart: Option<usize>,
    /// Chart that saw the last press and keeps all pointer input until release.
    captured: Option<usize>,
}

impl Dashboard {
    pub fn new(mut config: DashboardConfig, width: f64, height: f64, text: TextPainter, now: f64) -> Self {
        config.chart = config.chart.sanitized();
        let ui = UiState::for_config(&config);
        let layout = layout(width, height, &ui, &config);
        let mut dashboard = Self {
            config,
            ui,
            width,
            height,
            layout,
            slots: Vec::new(),
            text,
            cursor: None,
            hovered_chart: None,
            captured: None,
        };
        dashboard.sync_charts(now, false);
        info!(target: "dashboard", cards = dashboard.slots.len(), "dashboard ready");
        dashboard
    }

    /// Bring one chart per card in line with the config. `rebuild` replaces
    /// every chart; otherwise charts only rebuild when their input changed.
    fn sync_charts(&mut self, now: f64, rebuild: bool) {
        let count = self.config.attestations.len();
        if self.slots.len() > count {
            for mut slot in self.slots.drain(count..) {
                slot.chart.teardown(&mut slot.overlay);
            }
        }
        for (i, card) in self.config.attestations.iter().enumerate() {
            let input = card_input(card);
            let surface = surface_of(self.layout.cards[i].chart);
            match self.slots.get_mut(i) {
                Some(slot) if !rebuild => slot.chart.set_input(input, &mut slot.overlay, now),
                Some(slot) => {
                    slot.chart.teardown(&mut slot.overlay);
                    slot.chart = PieChart::new(self.config.chart.clone());
                    slot.chart.mount(surface, input, &mut slot.overlay, now);
                }
                None => {
                    let mut slot = ChartSlot {
                        chart: PieChart::new(self.config.chart.clone()),
                        overlay: LabelOverlay::new(),
                    };
                    slot.chart.mount(surface, input, &mut slot.overlay, now);
                    self.slots.push(slot);
                }
            }
        }
    }

    fn relayout(&mut self) {
        self.layout = layout(self.width, self.height, &self.ui, &self.config);
        let max_scroll = (self.layout.content_height - self.height).max(0.0);
        if self.ui.scroll > max_scroll {
            self.ui.scroll = max_scroll;
            self.layout = layout(self.width, self.height, &self.ui, &self.config);
        }
        for (slot, card) in self.slots.iter_mut().zip(&self.layout.cards) {
            let surface = surface_of(card.chart);
            if slot.chart.is_mounted() && slot.chart.surface() != Some(surface) {
                slot.chart.resize(surface);
            }
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.relayout();
    }

    /// Swap in a reloaded config. Charts are rebuilt only where their input
    /// changed, or all of them when the chart tokens changed.
    pub fn apply_config(&mut self, mut config: DashboardConfig, now: f64) {
        config.chart = config.chart.sanitized();
        let rebuild = config.chart != self.config.chart;
        if config.sidebar.open != self.config.sidebar.open {
            self.ui.sidebar_open = config.sidebar.open;
        }
        let count = config.attestations.len();
        self.ui.expanded.resize(count, false);
        self.config = config;

        if rebuild {
            self.captured = None;
            self.hovered_chart = None;
        }
        self.captured = self.captured.filter(|&i| i < count);
        self.hovered_chart = self.hovered_chart.filter(|&i| i < count);

        self.relayout();
        self.sync_charts(now, rebuild);
        info!(target: "dashboard", cards = count, rebuild, "config applied");
    }

    // -----------------------------------------------------------------------
    // Pointer routing
    // -----------------------------------------------------------------------

    /// Chart under `pos`. The fixed header sits on top of scrolled content.
    fn chart_at(&self, pos: Point) -> Option<usize> {
        if self.layout.header.contains(pos) {
            return None;
        }
        self.layout.cards.iter().position(|c| c.chart.contains(pos))
    }

    fn toggle_at(&self, pos: Point) -> Option<usize> {
        if self.layout.header.contains(pos) {
            return None;
        }
        self.layout
            .cards
            .iter()
            .position(|c| c.toggle.is_some_and(|t| t.contains(pos)))
    }

    fn local(&self, index: usize, pos: Point) -> Vec2 {
        let origin = self.layout.cards[index].chart.origin();
        Vec2::new((pos.x - origin.x) as f32, (pos.y - origin.y) as f32)
    }

    fn send(&mut self, index: usize, input: PointerInput, now: f64) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.chart.handle_pointer(input, now);
        }
    }

    /// Deliver enter/leave/move to whatever chart is under the cursor. A
    /// captured chart keeps the pointer until release.
    fn route_hover(&mut self, now: f64) {
        if self.captured.is_some() {
            return;
        }
        let target = self.cursor.and_then(|p| self.chart_at(p));
        if target != self.hovered_chart {
            if let Some(old) = self.hovered_chart {
                self.send(old, PointerInput::Leave, now);
            }
            if let Some(new) = target {
                self.send(new, PointerInput::Enter, now);
            }
            self.hovered_chart = target;
        }
        if let (Some(i), Some(pos)) = (target, self.cursor) {
            let local = self.local(i, pos);
            self.send(i, PointerInput::Move(local), now);
        }
    }

    pub fn cursor_moved(&mut self, pos: Point, now: f64) {
        self.cursor = Some(pos);
        if let Some(i) = self.captured {
            let local = self.local(i, pos);
            self.send(i, PointerInput::Move(local), now);
            return;
        }
        self.route_hover(now);
    }

    pub fn cursor_left(&mut self, now: f64) {
        if let Some(i) = self.captured.take() {
            self.send(i, PointerInput::Up, now);
        }
        if let Some(i) = self.hovered_chart.take() {
            self.send(i, PointerInput::Leave, now);
        }
        self.cursor = None;
    }

    /// Primary button press or release at the last known cursor position.
    pub fn mouse_input(&mut self, pressed: bool, now: f64) {
        let Some(pos) = self.cursor else {
            return;
        };
        if !pressed {
            if let Some(i) = self.captured.take() {
                self.send(i, PointerInput::Up, now);
                self.route_hover(now);
            }
            return;
        }

        if self.layout.menu_button.contains(pos) {
            self.toggle_sidebar(now);
        } else if let Some(i) = self.toggle_at(pos) {
            self.toggle_table(i, now);
        } else if let Some(i) = self.chart_at(pos) {
            let local = self.local(i, pos);
            self.send(i, PointerInput::Down(local), now);
            self.captured = Some(i);
        }
    }

    /// Scroll the content by `delta` pixels (positive scrolls up).
    pub fn scroll(&mut self, delta: f64, now: f64) {
        self.ui.scroll = (self.ui.scroll - delta).max(0.0);
        self.relayout();
        self.route_hover(now);
    }

    pub fn toggle_sidebar(&mut self, now: f64) {
        self.ui.sidebar_open = !self.ui.sidebar_open;
        debug!(target: "dashboard", open = self.ui.sidebar_open, "sidebar toggled");
        self.relayout();
        self.route_hover(now);
    }

    fn toggle_table(&mut self, card: usize, now: f64) {
        if let Some(flag) = self.ui.expanded.get_mut(card) {
            *flag = !*flag;
            debug!(target: "dashboard", card, expanded = *flag, "table toggled");
        }
        self.relayout();
        self.route_hover(now);
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Advance every chart. Returns whether any chart wants another frame.
    pub fn tick(&mut self, now: f64) -> bool {
        let mut running = false;
        for slot in &mut self.slots {
            running |= slot.chart.tick(now, &mut slot.overlay) == TickOutcome::Continue;
        }
        running
    }

    pub fn cursor_icon(&self) -> CursorIcon {
        let chart = self
            .captured
            .or(self.hovered_chart)
            .and_then(|i| self.slots.get(i))
            .filter(|slot| slot.chart.is_scheduled());
        if let Some(slot) = chart {
            return match slot.chart.cursor() {
                CursorStyle::Default => CursorIcon::Default,
                CursorStyle::Grab => CursorIcon::Grab,
                CursorStyle::Grabbing => CursorIcon::Grabbing,
            };
        }
        match self.cursor {
            Some(p) if self.is_button(p) => CursorIcon::Pointer,
            _ => CursorIcon::Default,
        }
    }

    fn is_button(&self, pos: Point) -> bool {
        self.layout.menu_button.contains(pos) || self.toggle_at(pos).is_some()
    }

    /// Tear down every chart and release its labels.
    pub fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.chart.teardown(&mut slot.overlay);
        }
        self.hovered_chart = None;
        self.captured = None;
    }

    pub fn render(&self, scene: &mut Scene) {
        scene.fill(
            Fill::NonZero,
            Affine::IDENTITY,
            BG_COLOR,
            None,
            &Rect::new(0.0, 0.0, self.width, self.height),
        );

        draw_banner(scene, &self.text, self.layout.banner);
        for (rect, tile) in self.layout.tiles.iter().zip(&self.config.stats) {
            draw_stat_tile(scene, &self.text, *rect, tile);
        }
        let label_size = self.config.chart.label_font_size;
        for (i, (card_layout, card)) in self.layout.cards.iter().zip(&self.config.attestations).enumerate() {
            draw_card(scene, &self.text, card_layout, card);
            if let Some(slot) = self.slots.get(i) {
                let clip = RoundedRect::from_rect(card_layout.chart, CHART_RADIUS);
                scene.push_clip_layer(Fill::NonZero, Affine::IDENTITY, &clip);
                raster::render_chart(scene, &slot.chart, card_layout.chart.origin());
                draw_labels(scene, &self.text, &slot.overlay, card_layout.chart.origin(), label_size);
                scene.pop_layer();
            }
            draw_table(scene, &self.text, card_layout, card, self.ui.is_expanded(i), self.cursor);
        }

        if let Some(sidebar) = self.layout.sidebar {
            draw_sidebar(scene, &self.text, sidebar, &self.layout.nav_items, &self.config.sidebar.items, self.cursor);
        }
        draw_header(scene, &self.text, &self.layout, self.ui.sidebar_open, self.cursor);
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn chart(&self, card: usize) -> Option<&PieChart> {
        self.slots.get(card).map(|s| &s.chart)
    }

    pub fn overlay(&self, card: usize) -> Option<&LabelOverlay> {
        self.slots.get(card).map(|s| &s.overlay)
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn panel(scene: &mut Scene, rect: Rect, radius: f64, fill: Color, border: Color) {
    let shape = RoundedRect::from_rect(rect, radius);
    scene.fill(Fill::NonZero, Affine::IDENTITY, fill, None, &shape);
    scene.stroke(&Stroke::new(1.0), Affine::IDENTITY, border, None, &shape);
}

fn line(scene: &mut Scene, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
    scene.stroke(&Stroke::new(width), Affine::IDENTITY, color, None, &Line::new(from, to));
}

/// Integral values without a decimal point, others to one place.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.1}")
    }
}

fn draw_header(scene: &mut Scene, text: &TextPainter, layout: &Layout, open: bool, cursor: Option<Point>) {
    let header = layout.header;
    panel(scene, header, 16.0, HEADER_BG, BORDER);

    let b = layout.menu_button;
    if cursor.is_some_and(|p| b.contains(p)) {
        scene.fill(Fill::NonZero, Affine::IDENTITY, PRIMARY_TINT, None, &RoundedRect::from_rect(b, 8.0));
    }
    let c = b.center();
    if open {
        line(scene, (c.x - 7.0, c.y - 7.0), (c.x + 7.0, c.y + 7.0), 2.0, PRIMARY);
        line(scene, (c.x - 7.0, c.y + 7.0), (c.x + 7.0, c.y - 7.0), 2.0, PRIMARY);
    } else {
        for dy in [-6.0, 0.0, 6.0] {
            line(scene, (c.x - 9.0, c.y + dy), (c.x + 9.0, c.y + dy), 2.0, PRIMARY);
        }
    }

    let title_x = b.x1 + 16.0;
    text.draw(scene, "Dashboard", title_x, header.y0 + 38.0, 24.0, TEXT_PRIMARY, Align::Left);
    text.draw(
        scene,
        "Manage and monitor all attestations",
        title_x,
        header.y0 + 58.0,
        12.0,
        TEXT_MUTED,
        Align::Left,
    );

    if header.width() > 560.0 {
        let avatar = Circle::new((header.x1 - 96.0, header.center().y), 16.0);
        scene.fill(Fill::NonZero, Affine::IDENTITY, PRIMARY_TINT, None, &avatar);
        text.draw(scene, "User", header.x1 - 72.0, header.center().y - 2.0, 12.0, TEXT_PRIMARY, Align::Left);
        text.draw(scene, "Admin", header.x1 - 72.0, header.center().y + 14.0, 12.0, TEXT_MUTED, Align::Left);
    }
}

fn draw_sidebar(
    scene: &mut Scene,
    text: &TextPainter,
    rect: Rect,
    items: &[Rect],
    labels: &[String],
    cursor: Option<Point>,
) {
    scene.fill(Fill::NonZero, Affine::IDENTITY, SIDEBAR_BG, None, &rect);
    line(scene, (rect.x1, rect.y0), (rect.x1, rect.y1), 1.0, BORDER);
    text.draw(scene, "Menu", rect.x0 + 24.0, 56.0, 18.0, TEXT_PRIMARY, Align::Left);

    for (item, label) in items.iter().zip(labels) {
        let hovered = cursor.is_some_and(|p| item.contains(p));
        if hovered {
            scene.fill(Fill::NonZero, Affine::IDENTITY, PRIMARY_TINT, None, &RoundedRect::from_rect(*item, 8.0));
        }
        let color = if hovered { PRIMARY } else { TEXT_PRIMARY };
        text.draw(scene, label, item.x0 + 16.0, item.center().y + 5.0, 14.0, color, Align::Left);
    }
}

fn draw_banner(scene: &mut Scene, text: &TextPainter, rect: Rect) {
    panel(scene, rect, 12.0, PRIMARY_WASH, PRIMARY_BORDER);
    let size = 13.0;
    let max_w = rect.width() - 32.0;
    let mut lines = text.wrap(BANNER_TEXT, size, max_w);
    if lines.len() > 2 {
        let rest = lines[1..].join(" ");
        lines.truncate(1);
        lines.push(text.fit(&rest, size, max_w));
    }
    for (i, l) in lines.iter().enumerate() {
        text.draw(scene, l, rect.x0 + 16.0, rect.y0 + 30.0 + i as f64 * 20.0, size, TEXT_MUTED, Align::Left);
    }
}

fn draw_stat_tile(scene: &mut Scene, text: &TextPainter, rect: Rect, tile: &StatTile) {
    let (fill, border) = if tile.highlight {
        (PRIMARY_WASH, PRIMARY_BORDER)
    } else {
        (WHITE, BORDER)
    };
    panel(scene, rect, 12.0, fill, border);

    let x = rect.x0 + 24.0;
    text.draw(scene, &tile.label, x, rect.y0 + 36.0, 14.0, TEXT_MUTED, Align::Left);
    text.draw(scene, &tile.value, x, rect.y0 + 74.0, 30.0, TEXT_PRIMARY, Align::Left);

    // Highlighted tiles show their change line in amber, without an arrow.
    let (color, arrow) = match (tile.highlight, tile.trend) {
        (true, _) => (HIGHLIGHT_TEXT, None),
        (false, Trend::Up) => (TREND_UP, Some(Trend::Up)),
        (false, Trend::Down) => (TREND_DOWN, Some(Trend::Down)),
        (false, Trend::Neutral) => (TEXT_MUTED, None),
    };
    let baseline = rect.y1 - 20.0;
    let mut change_x = x;
    if let Some(trend) = arrow {
        draw_trend_arrow(scene, change_x, baseline, trend, color);
        change_x += 16.0;
    }
    let change = text.fit(&tile.change, 12.0, rect.x1 - 16.0 - change_x);
    text.draw(scene, &change, change_x, baseline, 12.0, color, Align::Left);
}

fn draw_trend_arrow(scene: &mut Scene, x: f64, baseline: f64, trend: Trend, color: Color) {
    let (tail, tip, head) = match trend {
        Trend::Down => ((x, baseline - 10.0), (x + 10.0, baseline), [(-6.0, 0.0), (0.0, -6.0)]),
        _ => ((x, baseline), (x + 10.0, baseline - 10.0), [(-6.0, 0.0), (0.0, 6.0)]),
    };
    line(scene, tail, tip, 1.5, color);
    for (dx, dy) in head {
        line(scene, tip, (tip.0 + dx, tip.1 + dy), 1.5, color);
    }
}

fn draw_card(scene: &mut Scene, text: &TextPainter, layout: &CardLayout, card: &AttestationCard) {
    let p = layout.panel;
    panel(scene, p, 12.0, WHITE, BORDER);
    let title = text.fit(&card.title, 18.0, p.width() - 2.0 * CARD_PAD);
    text.draw(scene, &title, p.x0 + CARD_PAD, p.y0 + CARD_PAD + 20.0, 18.0, TEXT_PRIMARY, Align::Left);
    panel(scene, layout.chart, CHART_RADIUS, WHITE, BORDER);

    let values = [card.completed, card.pending, card.auto_closed];
    for ((rect, category), value) in layout.legend.iter().zip(Category::ALL).zip(values) {
        panel(scene, *rect, 8.0, WHITE, BORDER);
        let dot = Circle::new((rect.x0 + 18.0, rect.y0 + 20.0), 6.0);
        scene.fill(Fill::NonZero, Affine::IDENTITY, category.color(), None, &dot);
        text.draw(scene, category.label(), rect.x0 + 30.0, rect.y0 + 24.0, 12.0, TEXT_MUTED, Align::Left);
        let shown = format!("{}%", format_value(value));
        text.draw(scene, &shown, rect.x0 + 12.0, rect.y0 + 58.0, 20.0, TEXT_PRIMARY, Align::Left);
    }
}

/// Floating chart labels: a translucent pill hanging off the leader terminus.
fn draw_labels(scene: &mut Scene, text: &TextPainter, overlay: &LabelOverlay, origin: Point, size: f32) {
    for label in overlay.iter().filter(|l| l.visible) {
        let w = text.measure(&label.text, size) + 2.0 * LABEL_PAD_X;
        let h = size as f64 + 2.0 * LABEL_PAD_Y;
        let x0 = origin.x
            + match label.side {
                Side::Right => label.x,
                Side::Left => label.x - w,
            };
        let y0 = origin.y + label.y - h / 2.0;
        let pill = RoundedRect::new(x0, y0, x0 + w, y0 + h, 6.0);
        scene.fill(Fill::NonZero, Affine::IDENTITY, LABEL_BG, None, &pill);
        let baseline = y0 + h / 2.0 + size as f64 * 0.35;
        text.draw(scene, &label.text, x0 + LABEL_PAD_X, baseline, size, PRIMARY, Align::Left);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusStyle {
    /// Status icon dot.
    pub accent: Color,
    pub text: Color,
    /// Pill background.
    pub fill: Color,
}

pub fn status_style(status: &str) -> StatusStyle {
    let style = |accent: Color, text: Color, fill: Color| StatusStyle { accent, text, fill };
    match status {
        "Completed" => style(
            Color::from_rgb8(0x10, 0xb9, 0x81),
            Color::from_rgb8(0x04, 0x78, 0x57),
            Color::from_rgb8(0xec, 0xfd, 0xf5),
        ),
        "Pending" => style(PRIMARY, PRIMARY, PRIMARY_TINT),
        "Autoclosed" => style(
            Color::from_rgb8(0xf5, 0x9e, 0x0b),
            Color::from_rgb8(0xb4, 0x53, 0x09),
            Color::from_rgb8(0xff, 0xfb, 0xeb),
        ),
        "Approved" => style(
            Color::from_rgb8(0x22, 0xc5, 0x5e),
            Color::from_rgb8(0x15, 0x80, 0x3d),
            Color::from_rgb8(0xf0, 0xfd, 0xf4),
        ),
        "Rejected" => style(
            Color::from_rgb8(0xef, 0x44, 0x44),
            Color::from_rgb8(0xb9, 0x1c, 0x1c),
            Color::from_rgb8(0xfe, 0xf2, 0xf2),
        ),
        _ => style(
            Color::new([0.059, 0.090, 0.165, 0.4]),
            TEXT_MUTED,
            Color::new([0.059, 0.090, 0.165, 0.05]),
        ),
    }
}

fn draw_table(
    scene: &mut Scene,
    text: &TextPainter,
    layout: &CardLayout,
    card: &AttestationCard,
    expanded: bool,
    cursor: Option<Point>,
) {
    panel(scene, layout.table, 12.0, WHITE, BORDER);

    let header = layout.table_header;
    let mid = header.center().y;
    text.draw(scene, "Attestation Details", header.x0 + 16.0, mid + 5.0, 14.0, TEXT_PRIMARY, Align::Left);
    let count = format!("{} items", card.rows.len());
    let badge_w = text.measure(&count, 12.0) + 16.0;
    let badge = RoundedRect::new(header.x1 - 16.0 - badge_w, mid - 12.0, header.x1 - 16.0, mid + 12.0, 4.0);
    scene.fill(Fill::NonZero, Affine::IDENTITY, PRIMARY_TINT, None, &badge);
    text.draw(scene, &count, header.x1 - 24.0, mid + 4.0, 12.0, PRIMARY, Align::Right);
    line(scene, (header.x0, header.y1), (header.x1, header.y1), 1.0, BORDER);

    for (rect, row) in layout.rows.iter().zip(&card.rows) {
        if cursor.is_some_and(|p| rect.contains(p)) {
            scene.fill(Fill::NonZero, Affine::IDENTITY, ROW_HOVER, None, rect);
        }
        let style = status_style(&row.status);
        let mid = rect.center().y;
        scene.fill(Fill::NonZero, Affine::IDENTITY, style.accent, None, &Circle::new((rect.x0 + 24.0, mid), 6.0));

        let pill_w = text.measure(&row.status, 12.0) + 24.0;
        let pill = RoundedRect::new(rect.x1 - 16.0 - pill_w, mid - 12.0, rect.x1 - 16.0, mid + 12.0, 12.0);
        scene.fill(Fill::NonZero, Affine::IDENTITY, style.fill, None, &pill);
        text.draw(scene, &row.status, rect.x1 - 16.0 - pill_w / 2.0, mid + 4.0, 12.0, style.text, Align::Center);

        let name_x = rect.x0 + 40.0;
        let name = text.fit(&row.name, 13.0, rect.x1 - 32.0 - pill_w - name_x);
        text.draw(scene, &name, name_x, mid + 5.0, 13.0, TEXT_PRIMARY, Align::Left);
        line(scene, (rect.x0, rect.y1), (rect.x1, rect.y1), 1.0, BORDER);
    }

    if let Some(toggle) = layout.toggle {
        let label = if expanded { "Show Less" } else { "VIEW ALL" };
        let c = toggle.center();
        text.draw(scene, label, c.x - 8.0, c.y + 5.0, 14.0, PRIMARY, Align::Center);
        let chevron_x = c.x + text.measure(label, 14.0) / 2.0;
        let dir = if expanded { -1.0 } else { 1.0 };
        line(scene, (chevron_x - 4.0, c.y - 2.0 * dir), (chevron_x, c.y + 2.0 * dir), 1.5, PRIMARY);
        line(scene, (chevron_x, c.y + 2.0 * dir), (chevron_x + 4.0, c.y - 2.0 * dir), 1.5, PRIMARY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.chart.segments = 32;
        config
    }

    fn dashboard() -> Dashboard {
        let mut d = Dashboard::new(config(), 1400.0, 900.0, TextPainter::block_only(), 0.0);
        d.tick(0.0);
        d
    }

    fn label_ids(d: &Dashboard, card: usize) -> Vec<crate::chart::labels::LabelId> {
        d.chart(card).unwrap().slices().iter().map(|s| s.label).collect()
    }

    #[test]
    fn collapsed_tables_show_at_most_three_rows() {
        let config = config();
        let mut ui = UiState::for_config(&config);
        let l = layout(1400.0, 900.0, &ui, &config);
        assert!(l.cards.iter().all(|c| c.rows.len() <= COLLAPSED_ROWS));
        // Only the five-row table gets a toggle.
        assert!(l.cards[0].toggle.is_none());
        assert!(l.cards[1].toggle.is_some());

        ui.expanded[1] = true;
        let l = layout(1400.0, 900.0, &ui, &config);
        assert_eq!(l.cards[1].rows.len(), 5);
        assert!((l.cards[1].toggle.unwrap().y0 - l.cards[1].rows[4].y1).abs() < 1e-9);
    }

    #[test]
    fn sidebar_shifts_content() {
        let config = config();
        let mut ui = UiState::for_config(&config);
        ui.sidebar_open = true;
        let open = layout(1400.0, 900.0, &ui, &config);
        ui.sidebar_open = false;
        let closed = layout(1400.0, 900.0, &ui, &config);

        assert!(open.sidebar.is_some() && closed.sidebar.is_none());
        assert_eq!(open.nav_items.len(), 7);
        assert!(closed.nav_items.is_empty());
        assert!((open.banner.x0 - closed.banner.x0 - SIDEBAR_WIDTH).abs() < 1e-9);
    }

    #[test]
    fn scroll_moves_content_but_not_header() {
        let config = config();
        let mut ui = UiState::for_config(&config);
        let top = layout(1400.0, 900.0, &ui, &config);
        ui.scroll = 100.0;
        let scrolled = layout(1400.0, 900.0, &ui, &config);
        assert_eq!(top.header, scrolled.header);
        assert!((top.banner.y0 - scrolled.banner.y0 - 100.0).abs() < 1e-9);
        assert!((top.content_height - scrolled.content_height).abs() < 1e-9);
    }

    #[test]
    fn grid_columns_follow_width() {
        let config = config();
        let ui = UiState::for_config(&config);
        let wide = layout(1400.0, 900.0, &ui, &config);
        assert!(wide.cards[0].panel.x0 < wide.cards[1].panel.x0);
        assert!((wide.tiles[0].y0 - wide.tiles[3].y0).abs() < 1e-9);

        let narrow = layout(700.0, 900.0, &ui, &config);
        assert!((narrow.cards[0].panel.x0 - narrow.cards[1].panel.x0).abs() < 1e-9);
        assert!(narrow.cards[1].panel.y0 > narrow.cards[0].table.y1);
    }

    #[test]
    fn chart_surface_spans_card_and_caps_height() {
        let config = config();
        let ui = UiState::for_config(&config);
        let l = layout(1400.0, 900.0, &ui, &config);
        let card = &l.cards[0];
        assert!((card.chart.width() - (card.panel.width() - 2.0 * CARD_PAD)).abs() < 1e-9);
        assert!(card.chart.height() <= CHART_MAX_HEIGHT);
        assert!(card.legend[0].y0 > card.chart.y1);
    }

    #[test]
    fn every_card_gets_a_mounted_chart() {
        let d = dashboard();
        for card in 0..4 {
            assert!(d.chart(card).unwrap().is_mounted());
        }
        // Privileged is 100/0/0: one slice, one label.
        assert_eq!(d.overlay(0).unwrap().len(), 1);
        assert_eq!(d.overlay(1).unwrap().len(), 3);
    }

    #[test]
    fn drag_keeps_pointer_until_release() {
        let mut d = dashboard();
        let centre = d.layout().cards[1].chart.center();
        d.cursor_moved(centre, 0.1);
        assert_eq!(d.cursor_icon(), CursorIcon::Grab);

        d.mouse_input(true, 0.2);
        assert!(d.chart(1).unwrap().is_dragging());
        assert_eq!(d.cursor_icon(), CursorIcon::Grabbing);

        // Far outside every chart surface.
        d.cursor_moved(Point::new(centre.x + 600.0, 5.0), 0.3);
        assert!(d.chart(1).unwrap().is_dragging());
        assert!(d.chart(1).unwrap().rotation().y.abs() > 0.0);

        d.mouse_input(false, 0.4);
        assert!(!d.chart(1).unwrap().is_dragging());
        assert_eq!(d.chart(1).unwrap().cursor(), CursorStyle::Default);
    }

    #[test]
    fn reload_mid_drag_keeps_rotating() {
        let mut d = dashboard();
        let centre = d.layout().cards[1].chart.center();
        d.cursor_moved(centre, 0.1);
        d.mouse_input(true, 0.2);

        let mut config = config();
        config.attestations[1].pending += 5.0;
        d.apply_config(config, 0.3);
        assert!(d.chart(1).unwrap().is_dragging());

        d.cursor_moved(Point::new(centre.x + 50.0, centre.y), 0.4);
        let k = d.chart(1).unwrap().tokens().drag_sensitivity;
        assert!((d.chart(1).unwrap().rotation().y - 50.0 * k).abs() < 1e-6);
        assert_eq!(d.cursor_icon(), CursorIcon::Grabbing);

        d.mouse_input(false, 0.5);
        assert!(!d.chart(1).unwrap().is_dragging());
    }

    #[test]
    fn header_covers_charts_scrolled_beneath_it() {
        let mut d = dashboard();
        let header = d.layout().header;
        let chart = d.layout().cards[0].chart;
        let offset = chart.y0 - header.y1 + 20.0;
        d.scroll(-offset, 0.0);
        assert!((d.ui().scroll - offset).abs() < 1e-6);

        let chart = d.layout().cards[0].chart;
        let pos = Point::new(chart.center().x, header.y1 - 5.0);
        assert!(chart.contains(pos));
        d.cursor_moved(pos, 0.1);
        d.mouse_input(true, 0.2);
        assert!(!d.chart(0).unwrap().is_dragging());
        assert_eq!(d.cursor_icon(), CursorIcon::Default);

        // Just below the header the chart takes the press.
        d.mouse_input(false, 0.3);
        d.cursor_moved(Point::new(pos.x, header.y1 + 5.0), 0.4);
        d.mouse_input(true, 0.5);
        assert!(d.chart(0).unwrap().is_dragging());
    }

    #[test]
    fn toggle_button_expands_and_collapses_table() {
        let mut d = dashboard();
        let toggle = d.layout().cards[1].toggle.unwrap().center();
        d.cursor_moved(toggle, 0.0);
        assert_eq!(d.cursor_icon(), CursorIcon::Pointer);
        d.mouse_input(true, 0.0);
        assert!(d.ui().is_expanded(1));
        assert_eq!(d.layout().cards[1].rows.len(), 5);

        let toggle = d.layout().cards[1].toggle.unwrap().center();
        d.cursor_moved(toggle, 0.1);
        d.mouse_input(true, 0.1);
        assert!(!d.ui().is_expanded(1));
    }

    #[test]
    fn menu_button_toggles_sidebar_and_resizes_charts() {
        let mut d = dashboard();
        let before = d.chart(0).unwrap().surface().unwrap();
        d.cursor_moved(d.layout().menu_button.center(), 0.0);
        d.mouse_input(true, 0.0);
        assert!(!d.ui().sidebar_open);
        let after = d.chart(0).unwrap().surface().unwrap();
        assert!(after.width > before.width);
    }

    #[test]
    fn reload_rebuilds_only_changed_charts() {
        let mut d = dashboard();
        let untouched = label_ids(&d, 0);
        let changed = label_ids(&d, 2);

        let mut config = config();
        config.attestations[2].completed = 10.0;
        d.apply_config(config, 1.0);

        assert_eq!(label_ids(&d, 0), untouched);
        let rebuilt = label_ids(&d, 2);
        assert!(changed.iter().all(|id| !rebuilt.contains(id)));
        assert_eq!(d.overlay(2).unwrap().len(), 3);
    }

    #[test]
    fn token_change_rebuilds_every_chart() {
        let mut d = dashboard();
        let before = label_ids(&d, 0);
        let mut config = config();
        config.chart.radius = 1.0;
        d.apply_config(config, 1.0);
        assert_eq!(d.chart(0).unwrap().tokens().radius, 1.0);
        assert_eq!(d.overlay(0).unwrap().len(), before.len());
    }

    #[test]
    fn reload_with_degenerate_tokens_keeps_charts_drawable() {
        let mut d = dashboard();
        let mut config = config();
        config.chart.camera_distance = 0.0;
        config.chart.segments = usize::MAX;
        d.apply_config(config, 1.0);

        let chart = d.chart(0).unwrap();
        assert_eq!(chart.tokens().camera_distance, crate::config::ChartTokens::default().camera_distance);
        assert_eq!(chart.tokens().segments, crate::config::MAX_SEGMENTS);
        assert!(d.tick(1.1));
        let label = d.overlay(0).unwrap().iter().next().unwrap();
        assert!(label.x.is_finite() && label.y.is_finite());
    }

    #[test]
    fn each_chart_is_clipped_to_its_surface() {
        let d = dashboard();
        let mut scene = Scene::new();
        d.render(&mut scene);
        let encoding = scene.encoding();
        // One begin and one end per chart surface.
        assert_eq!(encoding.n_clips, 2 * d.layout().cards.len() as u32);
        assert_eq!(encoding.n_open_clips, 0);
    }

    #[test]
    fn removed_cards_release_their_charts() {
        let mut d = dashboard();
        let mut config = config();
        config.attestations.truncate(2);
        d.apply_config(config, 1.0);
        assert!(d.chart(2).is_none());
        assert_eq!(d.layout().cards.len(), 2);
        assert_eq!(d.ui().expanded.len(), 2);
    }

    #[test]
    fn shutdown_stops_every_chart() {
        let mut d = dashboard();
        assert!(d.tick(0.1));
        d.shutdown();
        assert!(!d.tick(0.2));
        assert!((0..4).all(|i| d.overlay(i).unwrap().is_empty()));
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut d = dashboard();
        d.scroll(-100_000.0, 0.0);
        let max = d.layout().content_height - 900.0;
        assert!((d.ui().scroll - max).abs() < 1e-6);
        d.scroll(100_000.0, 0.0);
        assert_eq!(d.ui().scroll, 0.0);
    }

    #[test]
    fn status_styles() {
        assert_eq!(status_style("Pending").text.components, PRIMARY.components);
        assert_eq!(status_style("whatever").fill.components, status_style("Unknown").fill.components);
        assert_ne!(status_style("Approved").accent.components, status_style("Rejected").accent.components);
    }

    #[test]
    fn values_format_without_trailing_zero() {
        assert_eq!(format_value(40.0), "40");
        assert_eq!(format_value(12.5), "12.5");
    }
}
