use std::{io, time::Duration};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use screener_core::{Engine, EngineConfig, EngineHandle, SortMode, SymbolRecord};
use smol_str::SmolStr;

/// Cell grid geometry
const CELL_WIDTH: u16 = 26;
const CELL_HEIGHT: u16 = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Engine configuration from env, mirroring the feed server's knobs
    let url =
        std::env::var("SCREENER_URL").unwrap_or_else(|_| "ws://127.0.0.1:9001".to_string());
    let mut config = EngineConfig::new(url);
    if let Some(secs) = std::env::var("SCREENER_RELOAD_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config = config.with_reload_interval(Duration::from_secs(secs));
    }

    let mut engine = Engine::start(config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run TUI
    let res = run_app(&mut terminal, engine.handle()).await;

    engine.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    handle: EngineHandle,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| ui(f, &handle))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('s') => {
                        handle.set_sort_mode(handle.sort_mode().toggled());
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = std::time::Instant::now();
        }
    }
}

fn ui(f: &mut Frame, handle: &EngineHandle) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(size);

    render_status_bar(f, chunks[0], handle);
    render_grid(f, chunks[1], &handle.rows());
}

fn render_status_bar(f: &mut Frame, area: Rect, handle: &EngineHandle) {
    let connected = handle.connectivity();

    let status_symbol = if connected { "●" } else { "○" };
    let status_color = if connected {
        Color::Rgb(0, 255, 127)
    } else {
        Color::Rgb(255, 69, 58)
    };
    let status_text = if connected { "CONNECTED" } else { "DISCONNECTED" };

    let status = Span::styled(
        format!(" {} {} ", status_symbol, status_text),
        Style::default()
            .fg(status_color)
            .add_modifier(Modifier::BOLD),
    );

    let title = Span::styled(
        " ◆ DENSITY SCREENER ◆ ",
        Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD),
    );

    let sort_label = match handle.sort_mode() {
        SortMode::Alphabetical => " Sort: A-Z ",
        SortMode::InsertionOrder => " Sort: arrival ",
    };
    let sort = Span::styled(sort_label, Style::default().fg(Color::Rgb(100, 149, 237)));

    let time = Span::styled(
        match handle.last_update() {
            Some(at) => format!(" ⏱  {} ", at.format("%H:%M:%S%.3f")),
            None => " ⏱  --:--:-- ".to_string(),
        },
        Style::default().fg(Color::Rgb(100, 149, 237)),
    );

    let help = Span::styled(
        " [S] Sort [Q] Quit ",
        Style::default().fg(Color::Rgb(128, 128, 128)),
    );

    let status_line = Line::from(vec![status, title, sort, time, help]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Rgb(138, 43, 226)))
        .style(Style::default().bg(Color::Rgb(18, 18, 28)));

    let paragraph = Paragraph::new(status_line)
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_grid(f: &mut Frame, area: Rect, rows: &[(SmolStr, SymbolRecord)]) {
    if area.width < CELL_WIDTH || area.height < CELL_HEIGHT {
        return;
    }

    let columns = (area.width / CELL_WIDTH).max(1);

    for (index, (_, record)) in rows.iter().enumerate() {
        let col = index as u16 % columns;
        let row = index as u16 / columns;

        let y = area.y + row * CELL_HEIGHT;
        if y + CELL_HEIGHT > area.y + area.height {
            break;
        }

        let cell_area = Rect {
            x: area.x + col * CELL_WIDTH,
            y,
            width: CELL_WIDTH.min(area.width - col * CELL_WIDTH),
            height: CELL_HEIGHT,
        };

        render_cell(f, cell_area, record);
    }
}

fn render_cell(f: &mut Frame, area: Rect, record: &SymbolRecord) {
    let bg_color = if record.is_extreme() {
        Color::Rgb(187, 0, 250)
    } else {
        Color::Rgb(25, 25, 35)
    };

    let side_color = if record.side.is_bid() {
        Color::Rgb(255, 69, 58)
    } else {
        Color::Rgb(0, 255, 127)
    };

    let multiplier_style = if record.is_hot() {
        Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(128, 128, 150))
    };

    let volume_style = if record.large_volume {
        Style::default()
            .fg(Color::Rgb(255, 215, 0))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(200, 200, 220))
    };

    let change_color = if record.is_positive_change() {
        Color::Rgb(0, 255, 127)
    } else {
        Color::Rgb(255, 69, 58)
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {:<12}", record.symbol),
                Style::default()
                    .fg(Color::Rgb(255, 255, 255))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("x{:<4}", record.times_more), multiplier_style),
        ]),
        Line::from(vec![
            Span::styled(
                format!(" DS: {:<9}", record.max_density_display),
                Style::default().fg(side_color),
            ),
            Span::styled(
                format!("P: {}", record.price),
                Style::default().fg(Color::Rgb(200, 200, 220)),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                format!(" 24V: {:<8}", record.volume_24h_display),
                volume_style,
            ),
            Span::styled(
                format!("{:.1}%", record.price_change),
                Style::default().fg(change_color),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).style(Style::default().bg(bg_color));
    f.render_widget(paragraph, area);
}
