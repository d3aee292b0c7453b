use anyhow::Result;
use checkin_desk::roster::format_local_time;
use checkin_desk::{compute_stats, mask_phone, AttendeeRecord, CheckInEngine, Stats};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

pub struct App {
    engine: CheckInEngine,
    pub records: Vec<AttendeeRecord>,
    pub stats: Stats,
    pub state: TableState,
    pub refresh_every: Duration,
    last_refresh: Instant,
    pub last_error: Option<String>,
}

impl App {
    pub fn new(engine: CheckInEngine, refresh_every: Duration) -> Self {
        let mut app = Self {
            engine,
            records: Vec::new(),
            stats: Stats::default(),
            state: TableState::default(),
            refresh_every,
            last_refresh: Instant::now(),
            last_error: None,
        };
        app.refresh();
        app
    }

    /// Reload records from the store; counters derive from the same snapshot
    pub fn refresh(&mut self) {
        match self.engine.list_records() {
            Ok(records) => {
                self.stats = compute_stats(&records);
                self.records = records;
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(format!("{:#}", e)),
        }
        self.last_refresh = Instant::now();

        // Keep the selection inside the (possibly shorter) list
        match (self.state.selected(), self.records.len()) {
            (_, 0) => self.state.select(None),
            (Some(i), len) if i >= len => self.state.select(Some(len - 1)),
            (None, _) => self.state.select(Some(0)),
            _ => {}
        }
    }

    fn refresh_due(&self) -> bool {
        self.last_refresh.elapsed() >= self.refresh_every
    }

    pub fn next(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        if let Some(i) = self.state.selected() {
            let last = self.records.len().saturating_sub(1);
            self.state.select(Some((i + 10).min(last)));
        }
    }

    pub fn page_up(&mut self) {
        if let Some(i) = self.state.selected() {
            self.state.select(Some(i.saturating_sub(10)));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Wake up at least once per refresh period
        let timeout = app.refresh_every.saturating_sub(app.last_refresh.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('r') => app.refresh(),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::PageDown => app.page_down(),
                    KeyCode::PageUp => app.page_up(),
                    KeyCode::Home if !app.records.is_empty() => app.state.select(Some(0)),
                    KeyCode::End if !app.records.is_empty() => {
                        app.state.select(Some(app.records.len() - 1))
                    }
                    _ => {}
                }
            }
        }

        if app.refresh_due() {
            app.refresh();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Counters
            Constraint::Min(0),    // Arrivals
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_table(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.stats;
    let spans = vec![
        Span::styled(
            "Check-in Desk",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(format!("Roster: {}", s.total), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(
            format!("✓ {}", s.checked_in),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" ("),
        Span::styled(
            format!("{} on roster", s.original_checked_in),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(", "),
        Span::styled(
            format!("{} walk-ins", s.new_checked_in),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(")"),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Name", "Phone", "Status", "Checked in at", "Source"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.records.iter().map(|rec| {
        let color = match (rec.is_checked_in(), rec.is_walk_in()) {
            (true, true) => Color::Magenta,
            (true, false) => Color::Green,
            _ => Color::DarkGray,
        };
        let source = if rec.is_walk_in() { "walk-in" } else { "roster" };

        let cells = vec![
            Cell::from(truncate(&rec.name, 24)),
            Cell::from(mask_phone(&rec.phone)),
            Cell::from(rec.status.as_str()).style(Style::default().fg(color)),
            Cell::from(rec.check_in_time.map(format_local_time).unwrap_or_default()),
            Cell::from(source).style(Style::default().fg(color)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(21),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Arrivals "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.records.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(err) = &app.last_error {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Store error: {}", truncate(err, 60)),
            Style::default().fg(Color::Red),
        ));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Refresh | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// Character-aware truncation (names are often CJK)
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
