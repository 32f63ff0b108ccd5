use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use minicore_commissions::{
    calculate_commissions, get_active_salespeople, CommissionQuery, CommissionReport, Salesperson,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

const PAGE_SIZE: usize = 20;

pub struct App {
    conn: Connection,
    query: CommissionQuery,
    pub salespeople: Vec<Salesperson>,
    /// 0 = everyone, n = salespeople[n - 1]
    pub filter_index: usize,
    pub report: Option<CommissionReport>,
    pub error: Option<String>,
    pub state: TableState,
}

impl App {
    pub fn load(conn: Connection, query: CommissionQuery) -> Result<Self> {
        let salespeople = get_active_salespeople(&conn)?;

        let mut app = App {
            conn,
            query,
            salespeople,
            filter_index: 0,
            report: None,
            error: None,
            state: TableState::default(),
        };
        app.recompute();

        Ok(app)
    }

    /// Re-run the report for the current filter. A failure (e.g. no tiers)
    /// is shown in the header instead of closing the UI.
    pub fn recompute(&mut self) {
        self.query.salesperson_id = self
            .filter_index
            .checked_sub(1)
            .and_then(|i| self.salespeople.get(i))
            .map(|p| p.id.clone());

        match calculate_commissions(&self.conn, &self.query) {
            Ok(report) => {
                self.state
                    .select(if report.sales.is_empty() { None } else { Some(0) });
                self.report = Some(report);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "commission report failed");
                self.report = None;
                self.error = Some(e.to_string());
                self.state.select(None);
            }
        }
    }

    pub fn next_filter(&mut self) {
        self.filter_index = (self.filter_index + 1) % (self.salespeople.len() + 1);
        self.recompute();
    }

    pub fn filter_label(&self) -> String {
        self.filter_index
            .checked_sub(1)
            .and_then(|i| self.salespeople.get(i))
            .map(|p| p.full_name())
            .unwrap_or_else(|| "All salespeople".to_string())
    }

    fn row_count(&self) -> usize {
        self.report.as_ref().map(|r| r.sales.len()).unwrap_or(0)
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
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
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map(|i| (i + PAGE_SIZE).min(len - 1)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(PAGE_SIZE)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.state.select(Some(len - 1));
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

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if app.row_count() > 0 {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Totals
            Constraint::Min(0),    // Detail table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_table(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let range = format!(
        "{} → {}",
        app.query.start_date.format("%Y-%m-%d"),
        app.query.end_date.format("%Y-%m-%d")
    );

    let mut lines = vec![Line::from(vec![
        Span::styled(
            app.filter_label(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(range, Style::default().fg(Color::White)),
    ])];

    match (&app.report, &app.error) {
        (Some(report), _) => lines.push(Line::from(vec![
            Span::styled(
                format!("Sales: {}", report.aggregate.sale_count),
                Style::default().fg(Color::White),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Total: ${:.2}", report.aggregate.total_sales_amount),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("Commission: ${:.2}", report.aggregate.total_commission),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ])),
        (None, Some(error)) => lines.push(Line::from(Span::styled(
            format!("❌ {}", error),
            Style::default().fg(Color::Red),
        ))),
        (None, None) => {}
    }

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Commissions "),
    );

    f.render_widget(header, area);
}

fn tier_color(rate: f64) -> Color {
    if rate >= 15.0 {
        Color::Magenta
    } else if rate >= 10.0 {
        Color::Green
    } else if rate >= 8.0 {
        Color::Yellow
    } else {
        Color::White
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Sale", "Date", "Salesperson", "Amount", "Rate", "Tier", "Commission"]
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

    let rows: Vec<Row> = match &app.report {
        Some(report) => report
            .sales
            .iter()
            .zip(&report.aggregate.details)
            .map(|(record, detail)| {
                let color = tier_color(detail.rate);
                Row::new(vec![
                    Cell::from(sale_id_prefix(&detail.sale_id).to_string())
                        .style(Style::default().fg(Color::DarkGray)),
                    Cell::from(record.sale.date.format("%Y-%m-%d").to_string()),
                    Cell::from(truncate(
                        &format!(
                            "{} {}",
                            record.salesperson.first_name, record.salesperson.last_name
                        ),
                        24,
                    )),
                    Cell::from(format!("{:.2}", detail.amount)),
                    Cell::from(format!("{}%", detail.rate)).style(Style::default().fg(color)),
                    Cell::from(detail.tier_name.clone()).style(Style::default().fg(color)),
                    Cell::from(format!("{:.2}", detail.commission))
                        .style(Style::default().fg(Color::Green)),
                ])
                .height(1)
            })
            .collect(),
        None => Vec::new(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(20),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Sales "),
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

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.row_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Salesperson | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// First 8 characters of a sale id, enough to tell rows apart
fn sale_id_prefix(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minicore_commissions::{seed_database, setup_database};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_app() -> App {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        seed_database(&conn, &mut StdRng::seed_from_u64(3)).unwrap();

        let query = CommissionQuery::parse(Some("2000-01-01"), Some("2100-01-01"), None).unwrap();
        App::load(conn, query).unwrap()
    }

    #[test]
    fn test_tab_cycles_through_salespeople() {
        let mut app = seeded_app();
        let everyone = app.report.as_ref().unwrap().aggregate.sale_count;
        assert_eq!(app.filter_label(), "All salespeople");

        let mut per_person = 0;
        for _ in 0..app.salespeople.len() {
            app.next_filter();
            assert_ne!(app.filter_label(), "All salespeople");
            per_person += app.report.as_ref().unwrap().aggregate.sale_count;
        }
        assert_eq!(per_person, everyone);

        app.next_filter();
        assert_eq!(app.filter_index, 0);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = seeded_app();
        let len = app.row_count();
        assert!(len > 0);

        app.previous();
        assert_eq!(app.state.selected(), Some(len - 1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(PAGE_SIZE.min(len - 1)));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_missing_tiers_shown_as_error() {
        let mut app = seeded_app();
        app.conn
            .execute("UPDATE commission_tiers SET active = 0", [])
            .unwrap();

        app.recompute();

        assert!(app.report.is_none());
        assert_eq!(app.error.as_deref(), Some("no commission tiers configured"));
        assert_eq!(app.row_count(), 0);
    }

    #[test]
    fn test_sale_id_prefix() {
        assert_eq!(sale_id_prefix("3f2a9c1e-77b4-4c1a-9d2e-0b5f8e6a1c3d"), "3f2a9c1e");
        assert_eq!(sale_id_prefix("abc"), "abc");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("María González", 24), "María González");
        assert_eq!(truncate("Carlos Rodríguez", 10), "Carlos ...");
    }
}
