//! TUI for browsing delivery problems using ratatui

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;

use crate::client::FastfeetClient;
use crate::messages::{DeliveryStatus, ProblemSummary, ProblemWithDate};

/// Entries of the per-row options menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    ViewProblems,
    CancelDelivery,
}

impl MenuOption {
    const ALL: [MenuOption; 2] = [MenuOption::ViewProblems, MenuOption::CancelDelivery];

    fn label(&self) -> &'static str {
        match self {
            MenuOption::ViewProblems => "View delivery problems",
            MenuOption::CancelDelivery => "Cancel delivery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
    Menu { selected: usize },
}

/// Work the event loop has to carry out against the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reload,
    ShowProblems(i64),
    Cancel(i64),
    Quit,
}

/// Screen state, kept apart from the client so key handling stays synchronous
struct Screen {
    problems: Vec<ProblemSummary>,
    list: ListState,
    page: u32,
    filter: String,
    mode: Mode,
    details: Vec<ProblemWithDate>,
    status: String,
}

impl Screen {
    fn new() -> Self {
        Self {
            problems: Vec::new(),
            list: ListState::default(),
            page: 1,
            filter: String::new(),
            mode: Mode::Browse,
            details: Vec::new(),
            status: "Loading...".to_string(),
        }
    }

    fn selected(&self) -> Option<&ProblemSummary> {
        self.list.selected().and_then(|i| self.problems.get(i))
    }

    fn set_problems(&mut self, problems: Vec<ProblemSummary>) {
        self.list
            .select(if problems.is_empty() { None } else { Some(0) });
        self.status = format!("Page {} | {} problem(s)", self.page, problems.len());
        self.problems = problems;
        self.details.clear();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }

        match self.mode.clone() {
            Mode::Filter => match key.code {
                KeyCode::Enter => {
                    self.mode = Mode::Browse;
                    self.page = 1;
                    Some(Action::Reload)
                }
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    None
                }
                KeyCode::Backspace => {
                    self.filter.pop();
                    None
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    None
                }
                _ => None,
            },
            Mode::Menu { selected } => match key.code {
                KeyCode::Up => {
                    self.mode = Mode::Menu {
                        selected: selected.saturating_sub(1),
                    };
                    None
                }
                KeyCode::Down => {
                    self.mode = Mode::Menu {
                        selected: (selected + 1).min(MenuOption::ALL.len() - 1),
                    };
                    None
                }
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    None
                }
                KeyCode::Enter => {
                    self.mode = Mode::Browse;
                    let problem = self.selected()?;
                    match MenuOption::ALL[selected] {
                        MenuOption::ViewProblems => Some(Action::ShowProblems(problem.delivery.id)),
                        MenuOption::CancelDelivery => Some(Action::Cancel(problem.id)),
                    }
                }
                _ => None,
            },
            Mode::Browse => match key.code {
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Char('/') => {
                    self.mode = Mode::Filter;
                    None
                }
                KeyCode::Char('n') => {
                    self.page += 1;
                    Some(Action::Reload)
                }
                KeyCode::Char('p') if self.page > 1 => {
                    self.page -= 1;
                    Some(Action::Reload)
                }
                KeyCode::Char('r') => Some(Action::Reload),
                KeyCode::Up => {
                    if let Some(i) = self.list.selected() {
                        self.list.select(Some(i.saturating_sub(1)));
                    }
                    None
                }
                KeyCode::Down => {
                    if let Some(i) = self.list.selected() {
                        if i + 1 < self.problems.len() {
                            self.list.select(Some(i + 1));
                        }
                    }
                    None
                }
                KeyCode::Enter if self.selected().is_some() => {
                    self.mode = Mode::Menu { selected: 0 };
                    None
                }
                _ => None,
            },
        }
    }
}

/// Run the TUI
pub async fn run(client: FastfeetClient) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut screen = Screen::new();
    let mut pending = Some(Action::Reload);

    // Main loop
    loop {
        if let Some(action) = pending.take() {
            if action == Action::Quit {
                break;
            }
            perform(&client, &mut screen, action).await;
        }

        terminal.draw(|f| draw_ui(f, &mut screen))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    pending = screen.handle_key(key);
                }
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

async fn perform(client: &FastfeetClient, screen: &mut Screen, action: Action) {
    let filter = screen.filter.clone();
    let filter = Some(filter.as_str()).filter(|f| !f.is_empty());
    match action {
        Action::Reload => match client.list_problems(screen.page, filter).await {
            Ok(problems) => screen.set_problems(problems),
            Err(e) => screen.status = format!("Error: {}", e),
        },
        Action::ShowProblems(delivery_id) => match client.show_problems(delivery_id).await {
            Ok(details) => {
                screen.status = format!("Delivery #{}: {} problem(s)", delivery_id, details.len());
                screen.details = details;
            }
            Err(e) => screen.status = format!("Error: {}", e),
        },
        Action::Cancel(problem_id) => match client.cancel_problem(problem_id).await {
            Ok(detail) => {
                screen.status = format!(
                    "Delivery #{} canceled, {} will be notified",
                    detail.delivery.id, detail.deliveryman.name
                );
                if let Ok(problems) = client.list_problems(screen.page, filter).await {
                    let status = std::mem::take(&mut screen.status);
                    screen.set_problems(problems);
                    screen.status = status;
                }
            }
            Err(e) => screen.status = format!("Error: {}", e),
        },
        Action::Quit => {}
    }
}

fn draw_ui(f: &mut Frame, screen: &mut Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter
            Constraint::Min(8),    // Problems
            Constraint::Length(8), // Details
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_filter(f, screen, chunks[0]);
    let list_area = chunks[1];
    draw_problems(f, screen, list_area);
    draw_details(f, screen, chunks[2]);
    draw_status(f, screen, chunks[3]);

    if let Mode::Menu { selected } = screen.mode {
        draw_menu(f, selected, menu_area(list_area, screen.list.selected()));
    }
}

fn draw_filter(f: &mut Frame, screen: &Screen, area: Rect) {
    let editing = screen.mode == Mode::Filter;
    let text = if screen.filter.is_empty() && !editing {
        "Press / to search problems".to_string()
    } else {
        screen.filter.clone()
    };

    let filter = Paragraph::new(text)
        .style(if editing {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .block(
            Block::default()
                .title(" Search ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if editing { Color::Cyan } else { Color::White })),
        );
    f.render_widget(filter, area);

    if editing {
        f.set_cursor_position((area.x + 1 + cursor_column(&screen.filter), area.y + 1));
    }
}

/// Cursor offset after the filter text, counted in characters
fn cursor_column(filter: &str) -> u16 {
    u16::try_from(filter.chars().count()).unwrap_or(u16::MAX)
}

fn status_color(status: DeliveryStatus) -> Color {
    match status {
        DeliveryStatus::Pending => Color::Yellow,
        DeliveryStatus::Withdrawn => Color::Blue,
        DeliveryStatus::Delivered => Color::Green,
        DeliveryStatus::Canceled => Color::Red,
    }
}

fn draw_problems(f: &mut Frame, screen: &mut Screen, area: Rect) {
    let items: Vec<ListItem> = screen
        .problems
        .iter()
        .map(|p| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("#{:<5}", p.delivery.id),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:<10} ", p.delivery.status.label()),
                    Style::default().fg(status_color(p.delivery.status)),
                ),
                Span::raw(p.description.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Delivery problems ")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut screen.list);
}

fn draw_details(f: &mut Frame, screen: &Screen, area: Rect) {
    let lines: Vec<Line> = screen
        .details
        .iter()
        .map(|p| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", p.created_at.format("%d/%m/%Y %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(p.description.clone()),
            ])
        })
        .collect();

    let details = Paragraph::new(lines).block(
        Block::default()
            .title(" Problems of delivery ")
            .borders(Borders::ALL),
    );
    f.render_widget(details, area);
}

fn draw_status(f: &mut Frame, screen: &Screen, area: Rect) {
    let status_text = format!(
        " {} | Enter: options  n/p: page  /: search  q: quit",
        screen.status
    );

    let status = Paragraph::new(status_text).style(
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray),
    );

    f.render_widget(status, area);
}

/// Options dropdown width in cells
const MENU_WIDTH: u16 = 26;

/// Place the dropdown just under the selected row, centered horizontally
fn menu_area(list_area: Rect, selected: Option<usize>) -> Rect {
    // Two option rows, one separator and the border
    let height = MenuOption::ALL.len() as u16 * 2 + 1;
    let width = MENU_WIDTH.min(list_area.width);
    let x = list_area.x + list_area.width.saturating_sub(width) / 2;
    let row = list_area.y + 1 + selected.unwrap_or(0) as u16 + 1;
    let max_y = (list_area.y + list_area.height).saturating_sub(height);
    Rect::new(x, row.min(max_y), width, height)
}

fn draw_menu(f: &mut Frame, selected: usize, area: Rect) {
    let mut lines = Vec::new();
    for (i, option) in MenuOption::ALL.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(Span::styled(
                "─".repeat(area.width.saturating_sub(2) as usize),
                Style::default().fg(Color::Gray),
            )));
        }
        let style = if i == selected {
            Style::default().fg(Color::Black).bg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(Span::styled(format!(" {}", option.label()), style)));
    }

    let menu = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(Clear, area);
    f.render_widget(menu, area);
}
