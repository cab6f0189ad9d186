use crate::data::{format_thousands, Data, Facet, View};
use std::{error::Error, io};

use ratatui::{
    backend::{Backend, CrosstermBackend},
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{self, Color, Modifier, Style, Stylize},
    Frame, Terminal,
    text::Line,
    widgets::{
        Bar, BarChart, BarGroup, Block, BorderType, Cell, HighlightSpacing, List, ListItem,
        ListState, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
        TableState,
    },
};
use style::palette::tailwind;
use unicode_width::UnicodeWidthStr;

const INFO_TEXT: &str =
    "(Esc) quit | (Tab) next panel | (↑/↓) move | (Space) toggle | (a) select all | (r) reload";

/// Bar colour used by both charts.
const BAR_COLOR: Color = Color::Rgb(0, 131, 184);

const SIDEBAR_WIDTH: u16 = 30;

/// Supplies filter options and recomputes the dashboard for a filter state.
pub trait Source {
    /// One facet per filter dimension, defaults applied.
    fn facets(&mut self) -> Result<Vec<Facet>, Box<dyn Error>>;
    fn view(&mut self, facets: &[Facet]) -> Result<View, Box<dyn Error>>;
    /// Re-reads the underlying data.
    fn reload(&mut self) -> Result<(), Box<dyn Error>>;
}

struct Colors {
    buffer_bg: Color,
    header_bg: Color,
    header_fg: Color,
    row_fg: Color,
    selected_style_fg: Color,
    normal_row_color: Color,
    alt_row_color: Color,
    focus_border_color: Color,
    border_color: Color,
}

impl Colors {
    const fn new(color: &tailwind::Palette) -> Self {
        Self {
            buffer_bg: tailwind::SLATE.c950,
            header_bg: color.c900,
            header_fg: tailwind::SLATE.c200,
            row_fg: tailwind::SLATE.c200,
            selected_style_fg: color.c400,
            normal_row_color: tailwind::SLATE.c950,
            alt_row_color: tailwind::SLATE.c900,
            focus_border_color: color.c400,
            border_color: tailwind::SLATE.c600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Facet(usize),
    Table,
}

struct App {
    facets: Vec<Facet>,
    facet_states: Vec<ListState>,
    focus: Focus,
    view: View,
    table_state: TableState,
    scroll_state: ScrollbarState,
    column_widths: Vec<u16>,
    colors: Colors,
    status: String,
}

impl App {
    fn new(facets: Vec<Facet>, view: View) -> Self {
        let facet_states = facets
            .iter()
            .map(|_| ListState::default().with_selected(Some(0)))
            .collect();
        let focus = if facets.is_empty() { Focus::Table } else { Focus::Facet(0) };
        let mut app = Self {
            facets,
            facet_states,
            focus,
            view: View::default(),
            table_state: TableState::default().with_selected(0),
            scroll_state: ScrollbarState::new(0),
            column_widths: vec![],
            colors: Colors::new(&tailwind::BLUE),
            status: String::new(),
        };
        app.set_view(view);
        app
    }

    fn set_view(&mut self, view: View) {
        self.column_widths = constraint_len_calculator(&view.rows);
        self.scroll_state = ScrollbarState::new(view.rows.len().saturating_sub(1));
        self.table_state.select(if view.rows.is_empty() { None } else { Some(0) });
        self.view = view;
    }

    fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Facet(i) if i + 1 < self.facets.len() => Focus::Facet(i + 1),
            Focus::Facet(_) => Focus::Table,
            Focus::Table if self.facets.is_empty() => Focus::Table,
            Focus::Table => Focus::Facet(0),
        };
    }

    fn previous_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Facet(0) => Focus::Table,
            Focus::Facet(i) => Focus::Facet(i - 1),
            Focus::Table if self.facets.is_empty() => Focus::Table,
            Focus::Table => Focus::Facet(self.facets.len() - 1),
        };
    }

    pub fn next(&mut self) {
        match self.focus {
            Focus::Facet(f) => {
                let len = self.facets[f].options.len();
                let state = &mut self.facet_states[f];
                state.select(step(state.selected(), len, true));
            }
            Focus::Table => {
                let selected = step(self.table_state.selected(), self.view.rows.len(), true);
                self.table_state.select(selected);
                self.scroll_state = self.scroll_state.position(selected.unwrap_or(0));
            }
        }
    }

    pub fn previous(&mut self) {
        match self.focus {
            Focus::Facet(f) => {
                let len = self.facets[f].options.len();
                let state = &mut self.facet_states[f];
                state.select(step(state.selected(), len, false));
            }
            Focus::Table => {
                let selected = step(self.table_state.selected(), self.view.rows.len(), false);
                self.table_state.select(selected);
                self.scroll_state = self.scroll_state.position(selected.unwrap_or(0));
            }
        }
    }

    /// Returns true when the filter state changed.
    fn toggle(&mut self) -> bool {
        if let Focus::Facet(f) = self.focus {
            if let Some(i) = self.facet_states[f].selected() {
                self.facets[f].toggle(i);
                return true;
            }
        }
        false
    }

    fn select_all(&mut self) -> bool {
        if let Focus::Facet(f) = self.focus {
            self.facets[f].select_all();
            return true;
        }
        false
    }

    fn refresh<S: Source>(&mut self, source: &mut S) {
        match source.view(&self.facets) {
            Ok(view) => {
                self.status = format!("{} transactions", view.rows.len());
                self.set_view(view);
            }
            Err(e) => self.status = format!("refresh failed: {e}"),
        }
    }

    fn reload<S: Source>(&mut self, source: &mut S) {
        let facets = source.reload().and_then(|_| source.facets());
        match facets {
            Ok(facets) => {
                self.facet_states = facets
                    .iter()
                    .map(|_| ListState::default().with_selected(Some(0)))
                    .collect();
                self.focus = if facets.is_empty() { Focus::Table } else { Focus::Facet(0) };
                self.facets = facets;
                self.refresh(source);
            }
            Err(e) => self.status = format!("reload failed: {e}"),
        }
    }
}

/// Wrapping cursor movement over `len` items.
fn step(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let i = match current {
        Some(i) if forward => {
            if i >= len - 1 {
                0
            } else {
                i + 1
            }
        }
        Some(i) => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        None => 0,
    };
    Some(i)
}

pub fn run<S: Source>(source: &mut S) -> Result<(), Box<dyn Error>> {
    let facets = source.facets()?;
    let view = source.view(&facets)?;

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(facets, view);
    let res = run_app(&mut terminal, app, source);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: Backend, S: Source>(
    terminal: &mut Terminal<B>,
    mut app: App,
    source: &mut S,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Tab => app.next_focus(),
                    KeyCode::BackTab => app.previous_focus(),
                    KeyCode::Char('j') | KeyCode::Down => app.next(),
                    KeyCode::Char('k') | KeyCode::Up => app.previous(),
                    KeyCode::Char(' ') | KeyCode::Enter => {
                        if app.toggle() {
                            app.refresh(source);
                        }
                    }
                    KeyCode::Char('a') => {
                        if app.select_all() {
                            app.refresh(source);
                        }
                    }
                    KeyCode::Char('r') => app.reload(source),
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let columns =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)]).split(f.size());
    render_sidebar(f, app, columns[0]);

    let rects = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(6),
        Constraint::Length(14),
        Constraint::Length(3),
    ])
    .split(columns[1]);

    render_kpis(f, app, rects[0]);
    render_table(f, app, rects[1]);
    render_scrollbar(f, app, rects[1]);
    render_charts(f, app, rects[2]);
    render_footer(f, app, rects[3]);
}

fn border_style(app: &App, focused: bool) -> Style {
    if focused {
        Style::new().fg(app.colors.focus_border_color)
    } else {
        Style::new().fg(app.colors.border_color)
    }
}

fn render_sidebar(f: &mut Frame, app: &mut App, area: Rect) {
    if app.facets.is_empty() {
        return;
    }
    let constraints = app
        .facets
        .iter()
        .map(|_| Constraint::Ratio(1, app.facets.len() as u32));
    let rects = Layout::vertical(constraints).split(area);

    for (i, facet) in app.facets.iter().enumerate() {
        let focused = app.focus == Focus::Facet(i);
        let items = facet
            .options
            .iter()
            .zip(&facet.selected)
            .map(|(option, selected)| {
                let mark = if *selected { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {option}"))
            });
        let mut list = List::new(items)
            .block(
                Block::bordered()
                    .title(format!("Select the {}:", facet.label))
                    .border_style(border_style(app, focused)),
            )
            .style(Style::new().fg(app.colors.row_fg).bg(app.colors.buffer_bg))
            .highlight_spacing(HighlightSpacing::Always);
        if focused {
            list = list
                .highlight_style(Style::new().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
        }
        f.render_stateful_widget(list, rects[i], &mut app.facet_states[i]);
    }
}

fn render_kpis(f: &mut Frame, app: &App, area: Rect) {
    let rects = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);
    let kpis = &app.view.kpis;
    let tiles = [
        ("Total Sales", kpis.total_sales_text()),
        ("Average Rating", kpis.rating_text()),
        ("Average Sales Per Transaction", kpis.average_sale_text()),
    ];
    for (rect, (title, value)) in rects.iter().zip(tiles) {
        let tile = Paragraph::new(Line::from(value).bold())
            .style(Style::new().fg(app.colors.row_fg).bg(app.colors.buffer_bg))
            .centered()
            .block(
                Block::bordered()
                    .title(title)
                    .border_style(border_style(app, false)),
            );
        f.render_widget(tile, *rect);
    }
}

fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    let header_style = Style::default()
        .fg(app.colors.header_fg)
        .bg(app.colors.header_bg);
    let selected_style = Style::default()
        .add_modifier(Modifier::REVERSED)
        .fg(app.colors.selected_style_fg);

    let header = Data::COLUMNS
        .into_iter()
        .map(Cell::from)
        .collect::<Row>()
        .style(header_style)
        .height(1);
    let rows = app.view.rows.iter().enumerate().map(|(i, data)| {
        let color = match i % 2 {
            0 => app.colors.normal_row_color,
            _ => app.colors.alt_row_color,
        };
        data.ref_array()
            .into_iter()
            .map(|content| Cell::from(content.as_str()))
            .collect::<Row>()
            .style(Style::new().fg(app.colors.row_fg).bg(color))
            .height(1)
    });
    let widths = app
        .column_widths
        .iter()
        .map(|len| Constraint::Min(*len + 1))
        .collect::<Vec<_>>();
    let focused = app.focus == Focus::Table;
    let t = Table::new(rows, widths)
        .header(header)
        .block(
            Block::bordered()
                .title("Filtered Transactions")
                .border_style(border_style(app, focused)),
        )
        .highlight_style(selected_style)
        .highlight_symbol(" █ ")
        .bg(app.colors.buffer_bg)
        .highlight_spacing(HighlightSpacing::Always);
    f.render_stateful_widget(t, area, &mut app.table_state);
}

/// Widest cell per column, header included.
#[allow(clippy::cast_possible_truncation)]
fn constraint_len_calculator(items: &[Data]) -> Vec<u16> {
    let mut widths: Vec<usize> = Data::COLUMNS.iter().map(|c| c.width()).collect();
    for item in items {
        for (width, content) in widths.iter_mut().zip(item.ref_array()) {
            *width = (*width).max(content.as_str().width());
        }
    }
    widths.into_iter().map(|w| w as u16).collect()
}

fn render_scrollbar(f: &mut Frame, app: &mut App, area: Rect) {
    f.render_stateful_widget(
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None),
        area.inner(Margin {
            vertical: 1,
            horizontal: 1,
        }),
        &mut app.scroll_state,
    );
}

fn render_charts(f: &mut Frame, app: &App, area: Rect) {
    let rects =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);

    let line_bars: Vec<Bar> = app
        .view
        .sales_by_product_line
        .iter()
        .map(|(line, total)| {
            Bar::default()
                .value(total.max(0.0) as u64)
                .label(Line::from(line.as_str()))
                .text_value(format_thousands(*total as i64))
        })
        .collect();
    let by_line = BarChart::default()
        .block(
            Block::bordered()
                .title("Sales by Product Line")
                .border_style(border_style(app, false)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::new().fg(BAR_COLOR))
        .value_style(Style::new().fg(app.colors.row_fg))
        .data(BarGroup::default().bars(&line_bars));
    f.render_widget(by_line, rects[0]);

    let hour_bars: Vec<Bar> = hourly_bars(&app.view.sales_by_hour)
        .into_iter()
        .map(|(hour, total)| {
            Bar::default()
                .value(total.max(0.0) as u64)
                .label(Line::from(hour.to_string()))
                .text_value(String::new())
        })
        .collect();
    let by_hour = BarChart::default()
        .block(
            Block::bordered()
                .title("Sales Per Hour")
                .border_style(border_style(app, false)),
        )
        .bar_width(3)
        .bar_gap(1)
        .bar_style(Style::new().fg(BAR_COLOR))
        .data(BarGroup::default().bars(&hour_bars));
    f.render_widget(by_hour, rects[1]);
}

/// One entry per hour from the first to the last busy hour, zero where nothing sold.
fn hourly_bars(sales_by_hour: &[(u32, f64)]) -> Vec<(u32, f64)> {
    let first = sales_by_hour.iter().map(|(hour, _)| *hour).min();
    let last = sales_by_hour.iter().map(|(hour, _)| *hour).max();
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    (first..=last)
        .map(|hour| {
            let total = sales_by_hour
                .iter()
                .find(|(h, _)| *h == hour)
                .map_or(0.0, |(_, total)| *total);
            (hour, total)
        })
        .collect()
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let text = if app.status.is_empty() {
        INFO_TEXT.to_string()
    } else {
        format!("{} | {}", app.status, INFO_TEXT)
    };
    let info_footer = Paragraph::new(Line::from(text))
        .style(Style::new().fg(app.colors.row_fg).bg(app.colors.buffer_bg))
        .centered()
        .block(
            Block::bordered()
                .border_type(BorderType::Double)
                .border_style(Style::new().fg(app.colors.focus_border_color)),
        );
    f.render_widget(info_footer, area);
}
