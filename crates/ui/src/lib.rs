use std::collections::HashMap;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use bookfinder_api::{ApiClient, Cover};
use bookfinder_application::{
    AppContext, Command, Focus, Now, format_count, format_relative,
};
use bookfinder_core::{Book, HistoryEntry, Theme, ToastKind};
use chrono::{DateTime, Utc};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};

mod effects;
mod input;
mod terminal_hints;
mod text;

use effects::{Effects, Incoming};
use input::{InputMode, Intent, map_key};
use terminal_hints::TerminalHints;
use text::{clamp_lines, truncate};

const TICK_RATE: Duration = Duration::from_millis(50);
const CARD_WIDTH: u16 = 28;
const CARD_HEIGHT: u16 = 6;
const CARD_STAGGER: Duration = Duration::from_millis(100);
const MAX_SUGGESTION_ROWS: u16 = 8;
const SIDEBAR_WIDTH: u16 = 44;
const TOAST_WIDTH: u16 = 46;

pub struct Ui {
    ctx: AppContext,
    effects: Effects,
    view: View,
}

impl Ui {
    pub fn new(ctx: AppContext, api: ApiClient) -> anyhow::Result<Self> {
        Ok(Self {
            ctx,
            effects: Effects::new(api)?,
            view: View::new(Picker::halfblocks()),
        })
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;
        self.view.picker = TerminalHints::from_env().pick();
        terminal.clear().ok();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => Ok(()),
            (Ok(Err(err)), _) => Err(err),
            (Ok(Ok(())), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let mut needs_redraw = true;
        let start = self.ctx.start();
        self.dispatch(start);

        loop {
            let now = Now::current();
            let toasts_before = self.ctx.toasts.len();
            let commands = self.ctx.tick(now);
            if self.ctx.toasts.len() != toasts_before {
                needs_redraw = true;
            }
            self.dispatch(commands);

            while let Some(incoming) = self.effects.try_recv() {
                self.handle_incoming(incoming, now);
                needs_redraw = true;
            }
            self.request_cover();

            let books = self.ctx.grid_books().len();
            if needs_redraw || self.ctx.loading || self.view.reveal.animating(now.instant, books) {
                terminal.draw(|frame| draw(frame, &self.ctx, &mut self.view, now))?;
                needs_redraw = false;
            }

            if !event::poll(TICK_RATE)? {
                continue;
            }

            let now = Now::current();
            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    let Some(intent) = map_key(key, input_mode(&self.ctx)) else {
                        continue;
                    };
                    if intent == Intent::Quit {
                        log::info!("quit requested");
                        return Ok(());
                    }
                    self.handle_intent(intent, now);
                }
                Event::Mouse(mouse) => {
                    if self.handle_mouse(mouse, now) {
                        needs_redraw = true;
                    }
                }
                _ => {}
            }
        }
    }

    fn dispatch(&self, commands: Vec<Command>) {
        for command in commands {
            self.effects.dispatch(command);
        }
    }

    fn handle_incoming(&mut self, incoming: Incoming, now: Now) {
        match incoming {
            Incoming::Api(event) => {
                let commands = self.ctx.apply(event, now);
                self.dispatch(commands);
            }
            Incoming::Cover { url, cover } => {
                self.view.store_cover(url, cover);
            }
        }
    }

    /// Starts a download for the open detail view's cover if none is cached.
    fn request_cover(&mut self) {
        let Some(book) = self.ctx.modal.as_ref() else {
            return;
        };
        let url = book.image_url.trim();
        if self.view.covers.contains_key(url) {
            return;
        }
        if url.is_empty() {
            self.view.store_cover(String::new(), Cover::placeholder());
            return;
        }
        self.view.covers.insert(url.to_string(), CoverSlot::Loading);
        self.effects.fetch_cover(url.to_string());
    }

    fn handle_intent(&mut self, intent: Intent, now: Now) {
        let ctx = &mut self.ctx;
        let commands = match intent {
            Intent::Quit => Vec::new(),
            Intent::FocusSearch => {
                ctx.close_details();
                ctx.close_history();
                ctx.focus_search();
                Vec::new()
            }
            Intent::ToggleHistory => {
                ctx.toggle_history();
                Vec::new()
            }
            Intent::ToggleTheme => {
                ctx.toggle_theme(now);
                Vec::new()
            }
            Intent::GoHome => ctx.go_home(),
            Intent::SwitchFocus => {
                match ctx.focus {
                    Focus::Search => ctx.focus_grid(),
                    Focus::Grid => ctx.focus_search(),
                }
                Vec::new()
            }
            Intent::Escape => {
                ctx.escape();
                Vec::new()
            }
            Intent::DismissToast => {
                ctx.dismiss_toast();
                Vec::new()
            }
            Intent::TypeChar(ch) => {
                ctx.push_query_char(ch, now);
                Vec::new()
            }
            Intent::Backspace => {
                ctx.pop_query_char(now);
                Vec::new()
            }
            Intent::ClearQuery => {
                ctx.on_search_input(String::new(), now);
                Vec::new()
            }
            Intent::SuggestionNext => {
                if ctx.search.shows_suggestions() {
                    ctx.highlight_next_suggestion();
                } else if !ctx.grid_books().is_empty() {
                    ctx.focus_grid();
                }
                Vec::new()
            }
            Intent::SuggestionPrev => {
                if ctx.search.shows_suggestions() {
                    ctx.highlight_prev_suggestion();
                }
                Vec::new()
            }
            Intent::CommitSuggestion => ctx.commit_highlighted(now),
            Intent::GridLeft => {
                ctx.move_grid_cursor(-1);
                Vec::new()
            }
            Intent::GridRight => {
                ctx.move_grid_cursor(1);
                Vec::new()
            }
            Intent::GridUp => {
                let columns = self.view.hits.grid_columns.max(1);
                if ctx.grid_cursor < columns {
                    ctx.focus_search();
                } else {
                    ctx.move_grid_cursor(-(columns as isize));
                }
                Vec::new()
            }
            Intent::GridDown => {
                let columns = self.view.hits.grid_columns.max(1);
                ctx.move_grid_cursor(columns as isize);
                Vec::new()
            }
            Intent::OpenCard => {
                ctx.open_grid_details();
                Vec::new()
            }
            Intent::HistoryUp => {
                ctx.move_history_cursor(-1);
                Vec::new()
            }
            Intent::HistoryDown => {
                ctx.move_history_cursor(1);
                Vec::new()
            }
            Intent::HistorySelect => {
                let cursor = ctx.history_cursor;
                ctx.select_history(cursor, now)
            }
            Intent::HistoryRemove => {
                ctx.remove_history_at_cursor();
                Vec::new()
            }
            Intent::HistoryDetails => {
                let cursor = ctx.history_cursor;
                ctx.show_history_details(cursor)
            }
            Intent::HistoryClear => {
                ctx.request_clear_history(now);
                Vec::new()
            }
            Intent::RecommendFromDetails => ctx.recommend_from_details(),
            Intent::WebSearch => ctx.web_search_from_details(now),
            Intent::ConfirmYes => {
                ctx.confirm_clear_history(now);
                Vec::new()
            }
            Intent::ConfirmNo => {
                ctx.cancel_clear_history();
                Vec::new()
            }
        };
        self.dispatch(commands);
    }

    /// Returns whether the click changed anything.
    fn handle_mouse(&mut self, mouse: MouseEvent, now: Now) -> bool {
        match route_mouse(&mut self.ctx, &self.view.hits, mouse, now) {
            Some(commands) => {
                self.dispatch(commands);
                true
            }
            None => false,
        }
    }
}

/// Applies a mouse event against the last frame's hit map. `None` when the event changed nothing.
fn route_mouse(
    ctx: &mut AppContext,
    hits: &Hits,
    mouse: MouseEvent,
    now: Now,
) -> Option<Vec<Command>> {
    if ctx.confirm_clear_open {
        return None;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {}
        MouseEventKind::ScrollDown if ctx.modal.is_none() && !ctx.history_open => {
            ctx.move_grid_cursor(hits.grid_columns.max(1) as isize);
            return Some(Vec::new());
        }
        MouseEventKind::ScrollUp if ctx.modal.is_none() && !ctx.history_open => {
            ctx.move_grid_cursor(-(hits.grid_columns.max(1) as isize));
            return Some(Vec::new());
        }
        _ => return None,
    }

    let hit = hits.hit_test(mouse.column, mouse.row);
    if ctx.modal.is_some() {
        if hit != Hit::Modal {
            ctx.close_details();
        }
        return Some(Vec::new());
    }

    if !matches!(hit, Hit::SearchField | Hit::Suggestion(_)) {
        ctx.dismiss_suggestions();
    }

    let commands = match hit {
        Hit::Suggestion(index) => ctx.select_suggestion(index, now),
        Hit::SearchField => {
            ctx.focus_search();
            Vec::new()
        }
        Hit::HistoryRow(index) => {
            ctx.history_cursor = index;
            ctx.select_history(index, now)
        }
        Hit::Sidebar | Hit::Modal => Vec::new(),
        Hit::Card(index) if !ctx.history_open => {
            ctx.focus_grid();
            ctx.grid_cursor = index;
            ctx.open_grid_details();
            Vec::new()
        }
        Hit::Card(_) | Hit::Nothing => {
            if ctx.history_open {
                ctx.close_history();
            }
            Vec::new()
        }
    };
    Some(commands)
}

fn input_mode(ctx: &AppContext) -> InputMode {
    if ctx.confirm_clear_open {
        InputMode::Confirm
    } else if ctx.modal.is_some() {
        InputMode::Modal
    } else if ctx.history_open {
        InputMode::History
    } else {
        match ctx.focus {
            Focus::Search => InputMode::Search,
            Focus::Grid => InputMode::Grid,
        }
    }
}

enum CoverSlot {
    Loading,
    Ready(Cover),
}

struct CoverView {
    url: String,
    area: Rect,
    protocol: ImageProtocol,
}

/// Staggered card appearance, restarted whenever the grid gets new books.
#[derive(Debug, Clone, Copy)]
struct Reveal {
    generation: u64,
    started: Option<Instant>,
}

impl Reveal {
    fn sync(&mut self, generation: u64, now: Instant) {
        if self.generation != generation || self.started.is_none() {
            self.generation = generation;
            self.started = Some(now);
        }
    }

    fn revealed(&self, now: Instant) -> usize {
        let Some(started) = self.started else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(started);
        (elapsed.as_millis() / CARD_STAGGER.as_millis()) as usize + 1
    }

    fn animating(&self, now: Instant, len: usize) -> bool {
        self.started.is_some() && self.revealed(now) <= len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Suggestion(usize),
    SearchField,
    Card(usize),
    HistoryRow(usize),
    Sidebar,
    Modal,
    Nothing,
}

/// Screen regions from the last draw, used to route clicks to books.
#[derive(Debug, Default)]
struct Hits {
    search: Rect,
    suggestions: Option<ListHit>,
    cards: Vec<(Rect, usize)>,
    grid_columns: usize,
    history: Option<ListHit>,
    sidebar: Option<Rect>,
    modal: Option<Rect>,
}

#[derive(Debug, Clone, Copy)]
struct ListHit {
    area: Rect,
    rows: Rect,
    offset: usize,
    len: usize,
}

impl ListHit {
    fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        if !self.rows.contains(Position::new(column, row)) {
            return None;
        }
        let index = self.offset + usize::from(row - self.rows.y);
        (index < self.len).then_some(index)
    }
}

impl Hits {
    fn hit_test(&self, column: u16, row: u16) -> Hit {
        let at = Position::new(column, row);
        if self.modal.is_some_and(|r| r.contains(at)) {
            return Hit::Modal;
        }
        if let Some(list) = self.history {
            if let Some(index) = list.row_at(column, row) {
                return Hit::HistoryRow(index);
            }
        }
        if self.sidebar.is_some_and(|r| r.contains(at)) {
            return Hit::Sidebar;
        }
        if let Some(list) = self.suggestions {
            if let Some(index) = list.row_at(column, row) {
                return Hit::Suggestion(index);
            }
            if list.area.contains(at) {
                return Hit::SearchField;
            }
        }
        if self.search.contains(at) {
            return Hit::SearchField;
        }
        self.cards
            .iter()
            .find(|(rect, _)| rect.contains(at))
            .map_or(Hit::Nothing, |(_, index)| Hit::Card(*index))
    }
}

struct View {
    picker: Picker,
    created: Instant,
    covers: HashMap<String, CoverSlot>,
    cover: Option<CoverView>,
    hits: Hits,
    reveal: Reveal,
}

impl View {
    fn new(picker: Picker) -> Self {
        Self {
            picker,
            created: Instant::now(),
            covers: HashMap::new(),
            cover: None,
            hits: Hits::default(),
            reveal: Reveal {
                generation: 0,
                started: None,
            },
        }
    }

    fn store_cover(&mut self, url: String, cover: Cover) {
        if cover.placeholder {
            log::debug!("placeholder cover for {url:?}");
        }
        if self.cover.as_ref().is_some_and(|c| c.url == url) {
            self.cover = None;
        }
        self.covers.insert(url, CoverSlot::Ready(cover));
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    accent: Color,
    text: Color,
    muted: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Color::Blue,
                text: Color::Black,
                muted: Color::DarkGray,
            },
            Theme::Dark => Self {
                accent: Color::Yellow,
                text: Color::White,
                muted: Color::Gray,
            },
        }
    }

    fn highlight(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    fn toast(&self, kind: ToastKind) -> Color {
        match kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Warning => Color::Magenta,
            ToastKind::Info => self.accent,
        }
    }
}

fn draw(frame: &mut ratatui::Frame, ctx: &AppContext, view: &mut View, now: Now) {
    let area = frame.area();
    let palette = Palette::for_theme(ctx.theme);
    frame.render_widget(Clear, area);
    view.hits = Hits::default();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    draw_header(frame, ctx, palette, layout[0]);
    draw_search_field(frame, ctx, palette, layout[1]);
    view.hits.search = layout[1];
    draw_selected(frame, ctx, palette, layout[2]);
    draw_grid(frame, ctx, view, palette, layout[3], now.instant);
    draw_footer(frame, ctx, palette, layout[4]);

    if ctx.search.shows_suggestions() && ctx.modal.is_none() {
        draw_suggestions(frame, ctx, view, palette, layout[1], area);
    }
    if ctx.history_open {
        let sidebar = sidebar_rect(Rect::new(
            area.x,
            layout[1].y,
            area.width,
            layout[3].bottom().saturating_sub(layout[1].y),
        ));
        draw_history(frame, ctx, view, palette, sidebar, now.wall);
    }
    if let Some(book) = ctx.modal.as_ref() {
        draw_modal(frame, book, view, palette, area);
    }
    if ctx.confirm_clear_open {
        draw_confirm(frame, palette, area);
    }
    draw_toasts(frame, ctx, palette, area);
}

fn draw_header(frame: &mut ratatui::Frame, ctx: &AppContext, palette: Palette, area: Rect) {
    let catalog = match ctx.catalog_total {
        Some(total) => format!("{} books", format_count(total)),
        None => "loading catalog…".to_string(),
    };
    let theme = if ctx.theme.is_dark() { "dark" } else { "light" };
    let lines = vec![
        Line::from(Span::styled(
            "Bookfinder",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(catalog, Style::default().fg(palette.muted)),
            Span::raw("  ·  "),
            Span::styled(
                format!(
                    "{} recommendations",
                    format_count(ctx.total_recommendations)
                ),
                Style::default().fg(palette.muted),
            ),
            Span::raw("  ·  "),
            Span::styled(format!("{theme} mode"), Style::default().fg(palette.muted)),
        ]),
    ];
    let header = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn draw_search_field(frame: &mut ratatui::Frame, ctx: &AppContext, palette: Palette, area: Rect) {
    let focused = ctx.focus == Focus::Search && ctx.modal.is_none() && !ctx.history_open;
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(
            "Search",
            Style::default().add_modifier(Modifier::BOLD),
        ));

    let line = if ctx.search.query.is_empty() && !focused {
        Line::from(Span::styled(
            "Search for a book... (Ctrl+K)",
            Style::default().fg(palette.muted),
        ))
    } else {
        let mut spans = vec![Span::styled(
            ctx.search.query.clone(),
            Style::default().fg(palette.text),
        )];
        if focused {
            spans.push(Span::styled("▏", Style::default().fg(palette.accent)));
        }
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_selected(frame: &mut ratatui::Frame, ctx: &AppContext, palette: Palette, area: Rect) {
    let line = if ctx.popular_visible {
        Line::from(Span::styled(
            "Popular books",
            Style::default().add_modifier(Modifier::BOLD),
        ))
    } else if let Some(book) = ctx.selected_book.as_ref() {
        Line::from(vec![
            Span::styled(
                book.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" by {}", book.author)),
            Span::styled(
                "  Selected for recommendations",
                Style::default().fg(palette.accent),
            ),
        ])
    } else {
        Line::from(Span::styled(
            "Recommendations",
            Style::default().add_modifier(Modifier::BOLD),
        ))
    };
    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(paragraph, area);
}

fn draw_grid(
    frame: &mut ratatui::Frame,
    ctx: &AppContext,
    view: &mut View,
    palette: Palette,
    area: Rect,
    now: Instant,
) {
    if ctx.loading {
        let phase = now.saturating_duration_since(view.created).as_millis() / 400 % 3;
        let dots = ".".repeat(1 + phase as usize);
        let text = Paragraph::new(Line::from(Span::styled(
            format!("Finding recommendations{dots}"),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(text, centered_line(area));
        return;
    }

    let books = ctx.grid_books();
    if books.is_empty() {
        let message = if ctx.popular_visible {
            "No books to show yet."
        } else {
            "No recommendations found."
        };
        let text = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(palette.muted),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(text, centered_line(area));
        return;
    }

    view.reveal.sync(ctx.grid_generation, now);
    let revealed = view.reveal.revealed(now);
    let cards = grid_layout(area, books.len(), ctx.grid_cursor);
    view.hits.grid_columns = cards.columns;

    let grid_focused = ctx.focus == Focus::Grid && ctx.modal.is_none() && !ctx.history_open;
    for (rect, index) in cards.placed {
        if index >= revealed {
            continue;
        }
        let Some(book) = books.get(index) else {
            continue;
        };
        let selected = grid_focused && index == ctx.grid_cursor;
        draw_card(frame, book, palette, rect, selected);
        view.hits.cards.push((rect, index));
    }
}

struct GridPlacement {
    columns: usize,
    placed: Vec<(Rect, usize)>,
}

/// Places cards row by row, scrolled so the cursor's row is visible.
fn grid_layout(area: Rect, len: usize, cursor: usize) -> GridPlacement {
    let columns = usize::from((area.width / CARD_WIDTH).max(1));
    let visible_rows = usize::from((area.height / CARD_HEIGHT).max(1));
    let cursor_row = cursor.min(len.saturating_sub(1)) / columns;
    let first_row = cursor_row.saturating_sub(visible_rows - 1);

    let mut placed = Vec::new();
    for row in 0..visible_rows {
        for col in 0..columns {
            let index = (first_row + row) * columns + col;
            if index >= len {
                break;
            }
            let x = area.x + col as u16 * CARD_WIDTH;
            let y = area.y + row as u16 * CARD_HEIGHT;
            let width = CARD_WIDTH.min(area.right().saturating_sub(x));
            let height = CARD_HEIGHT.min(area.bottom().saturating_sub(y));
            if width == 0 || height == 0 {
                continue;
            }
            placed.push((Rect::new(x, y, width, height), index));
        }
    }
    GridPlacement { columns, placed }
}

fn draw_card(frame: &mut ratatui::Frame, book: &Book, palette: Palette, area: Rect, selected: bool) {
    let border = if selected {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.muted)
    };
    let block = Block::default().borders(Borders::ALL).border_style(border);
    let inner = block.inner(area);
    let width = usize::from(inner.width);

    let mut lines: Vec<Line> = clamp_lines(&book.title, width, 2)
        .into_iter()
        .map(|l| {
            Line::from(Span::styled(
                l,
                Style::default().add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    lines.push(Line::from(Span::raw(truncate(&book.author, width))));
    lines.push(Line::from(Span::styled(
        truncate(&book.year, width),
        Style::default().fg(palette.muted),
    )));

    let paragraph = Paragraph::new(Text::from(lines)).block(block);
    frame.render_widget(paragraph, area);
}

fn draw_suggestions(
    frame: &mut ratatui::Frame,
    ctx: &AppContext,
    view: &mut View,
    palette: Palette,
    anchor: Rect,
    bounds: Rect,
) {
    let Some(list) = ctx.search.suggestions.as_ref() else {
        return;
    };
    let rows = (list.items().len() as u16).clamp(1, MAX_SUGGESTION_ROWS);
    let height = (rows + 2).min(bounds.bottom().saturating_sub(anchor.bottom()));
    if height < 3 {
        return;
    }
    let area = Rect::new(anchor.x, anchor.bottom(), anchor.width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner = block.inner(area);

    if list.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No books found",
            Style::default().fg(palette.muted),
        )))
        .block(block);
        frame.render_widget(empty, area);
        view.hits.suggestions = Some(ListHit {
            area,
            rows: inner,
            offset: 0,
            len: 0,
        });
        return;
    }

    let width = usize::from(inner.width.saturating_sub(2));
    let items: Vec<ListItem> = list
        .items()
        .iter()
        .map(|book| {
            let title = truncate(&book.title, width);
            let rest = width.saturating_sub(unicode_width::UnicodeWidthStr::width(title.as_str()));
            ListItem::new(Line::from(vec![
                Span::raw(title),
                Span::styled(
                    truncate(&format!("  {}", book.author), rest),
                    Style::default().fg(palette.muted),
                ),
            ]))
        })
        .collect();

    let widget = List::new(items)
        .block(block)
        .highlight_style(palette.highlight())
        .highlight_symbol("> ")
        .highlight_spacing(HighlightSpacing::Always);
    let mut state = ListState::default();
    state.select(list.highlighted());
    frame.render_stateful_widget(widget, area, &mut state);

    view.hits.suggestions = Some(ListHit {
        area,
        rows: inner,
        offset: state.offset(),
        len: list.items().len(),
    });
}

fn sidebar_rect(area: Rect) -> Rect {
    let width = SIDEBAR_WIDTH.min(area.width);
    Rect::new(area.right() - width, area.y, width, area.height)
}

/// Title and relative time label for each history row, newest first.
fn history_rows(entries: &[HistoryEntry], now: DateTime<Utc>) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|entry| (entry.title.clone(), format_relative(entry.timestamp, now)))
        .collect()
}

fn draw_history(
    frame: &mut ratatui::Frame,
    ctx: &AppContext,
    view: &mut View,
    palette: Palette,
    area: Rect,
    now: DateTime<Utc>,
) {
    frame.render_widget(Clear, area);
    view.hits.sidebar = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(Span::styled(
            "Search History",
            Style::default().add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(inner);

    let rows = history_rows(ctx.history.entries(), now);
    if rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No search history yet",
            Style::default().fg(palette.muted),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(empty, sections[0]);
    } else {
        let width = usize::from(sections[0].width.saturating_sub(2));
        let items: Vec<ListItem> = rows
            .iter()
            .map(|(title, label)| {
                let label_width = unicode_width::UnicodeWidthStr::width(label.as_str());
                let title_width = width.saturating_sub(label_width + 1);
                let title = truncate(title, title_width);
                let pad = width
                    .saturating_sub(unicode_width::UnicodeWidthStr::width(title.as_str()))
                    .saturating_sub(label_width);
                ListItem::new(Line::from(vec![
                    Span::raw(title),
                    Span::raw(" ".repeat(pad)),
                    Span::styled(label.clone(), Style::default().fg(palette.muted)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(palette.highlight())
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(ctx.history_cursor.min(rows.len() - 1)));
        frame.render_stateful_widget(list, sections[0], &mut state);

        view.hits.history = Some(ListHit {
            area: sections[0],
            rows: sections[0],
            offset: state.offset(),
            len: rows.len(),
        });
    }

    let hints = Paragraph::new(vec![
        key_hints(&[("Enter", "search"), ("i", "details")]),
        key_hints(&[("x", "remove"), ("c", "clear all")]),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(hints, sections[1]);
}

fn draw_modal(frame: &mut ratatui::Frame, book: &Book, view: &mut View, palette: Palette, area: Rect) {
    let popup = centered_rect(70, 70, area);
    frame.render_widget(Clear, popup);
    view.hits.modal = Some(popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(Span::styled(
            "Book Details",
            Style::default().add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block.clone(), popup);
    let inner = block.inner(popup);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(sections[0]);

    draw_cover(frame, book.image_url.trim(), view, palette, body[0]);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = text::wrap_text(&book.title, usize::from(body[1].width.saturating_sub(2)))
        .into_iter()
        .map(|l| {
            Line::from(Span::styled(
                l,
                bold.fg(palette.accent),
            ))
        })
        .collect();
    lines.push(Line::raw(""));
    for (label, value) in [
        ("Author: ", &book.author),
        ("Publisher: ", &book.publisher),
        ("Year: ", &book.year),
    ] {
        lines.push(Line::from(vec![
            Span::styled(label, bold),
            Span::raw(value.clone()),
        ]));
    }
    let details = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::LEFT));
    frame.render_widget(details, body[1]);

    let hints = Paragraph::new(key_hints(&[
        ("r", "similar books"),
        ("g", "search the web"),
        ("Esc", "close"),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(hints, sections[1]);
}

fn draw_cover(frame: &mut ratatui::Frame, url: &str, view: &mut View, palette: Palette, area: Rect) {
    let cover = match view.covers.get(url) {
        Some(CoverSlot::Ready(cover)) => cover,
        Some(CoverSlot::Loading) | None => {
            let text = Paragraph::new(Line::from(Span::styled(
                "loading cover…",
                Style::default().fg(palette.muted),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(text, centered_line(area));
            return;
        }
    };

    let stale = view
        .cover
        .as_ref()
        .is_none_or(|c| c.url != url || c.area != area);
    if stale {
        view.cover = match view
            .picker
            .new_protocol(cover.image.clone(), area, Resize::Fit(None))
        {
            Ok(protocol) => Some(CoverView {
                url: url.to_string(),
                area,
                protocol,
            }),
            Err(err) => {
                log::warn!("cover protocol for {url:?}: {err:?}");
                None
            }
        };
    }

    match view.cover.as_ref() {
        Some(cover) => {
            let proto_area = cover.protocol.area();
            let width = proto_area.width.min(area.width);
            let height = proto_area.height.min(area.height);
            let draw_area = Rect::new(
                area.x + area.width.saturating_sub(width) / 2,
                area.y + area.height.saturating_sub(height) / 2,
                width,
                height,
            );
            frame.render_widget(ImageWidget::new(&cover.protocol), draw_area);
        }
        None => {
            let text = Paragraph::new("[no cover]").alignment(Alignment::Center);
            frame.render_widget(text, centered_line(area));
        }
    }
}

fn draw_confirm(frame: &mut ratatui::Frame, palette: Palette, area: Rect) {
    let popup = centered_fixed(44, 5, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            "Clear history",
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let text = Paragraph::new(vec![
        Line::raw("Clear all search history?"),
        key_hints(&[("y", "yes"), ("n", "no")]),
    ])
    .alignment(Alignment::Center)
    .style(Style::default().fg(palette.text))
    .block(block);
    frame.render_widget(text, popup);
}

fn draw_toasts(frame: &mut ratatui::Frame, ctx: &AppContext, palette: Palette, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let inner_width = usize::from(width.saturating_sub(2));
    let mut y = area.y + 1;

    for toast in ctx.toasts.iter() {
        let lines = clamp_lines(&toast.message, inner_width, 2);
        let height = lines.len() as u16 + 2;
        if y + height > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right() - width, y, width, height);
        let color = palette.toast(toast.kind);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(
                toast.kind.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
        frame.render_widget(Clear, rect);
        let body = Paragraph::new(Text::from(
            lines.into_iter().map(Line::raw).collect::<Vec<_>>(),
        ))
        .block(block);
        frame.render_widget(body, rect);
        y += height;
    }
}

fn draw_footer(frame: &mut ratatui::Frame, ctx: &AppContext, palette: Palette, area: Rect) {
    let hints = match input_mode(ctx) {
        InputMode::Confirm => key_hints(&[("y", "confirm"), ("n", "cancel")]),
        InputMode::Modal => key_hints(&[("r", "similar"), ("g", "web search"), ("Esc", "close")]),
        InputMode::History => key_hints(&[
            ("↑↓", "move"),
            ("Enter", "search"),
            ("x", "remove"),
            ("Ctrl+H", "close"),
        ]),
        InputMode::Search => key_hints(&[
            ("↑↓", "suggestions"),
            ("Enter", "select"),
            ("Tab", "books"),
            ("Ctrl+H", "history"),
            ("Ctrl+T", "theme"),
            ("Ctrl+G", "home"),
            ("Ctrl+Q", "quit"),
        ]),
        InputMode::Grid => key_hints(&[
            ("←↑↓→", "move"),
            ("Enter", "details"),
            ("Tab", "search"),
            ("Ctrl+H", "history"),
            ("Ctrl+G", "home"),
            ("Ctrl+Q", "quit"),
        ]),
    };
    let footer = Paragraph::new(hints)
        .alignment(Alignment::Center)
        .style(Style::default().fg(palette.muted))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}

fn key_hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (i, (key, action)) in pairs.iter().enumerate() {
        spans.push(Span::styled(
            *key,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let sep = if i + 1 == pairs.len() { "" } else { "  " };
        spans.push(Span::raw(format!(" {action}{sep}")));
    }
    Line::from(spans)
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)
        .context("leave alt screen")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect::new(
        r.x + (r.width - width) / 2,
        r.y + (r.height - height) / 2,
        width,
        height,
    )
}

fn centered_line(area: Rect) -> Rect {
    if area.height == 0 {
        return area;
    }
    Rect::new(area.x, area.y + area.height / 2, area.width, 1)
}
