use crate::{
    client::{
        Notice,
        Screen,
    },
    errors::FormField,
    render::{
        AmountClass,
        BlockClass,
        BlockRow,
        ScoreRow,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const BANNED_MARKER: &str = "🚫";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Submit,
    Input(char),
    Backspace,
    NextField,
    PrevField,
    DismissNotice,
    Redraw,
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    match input.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    // Cached from the last draw so key handling knows a modal is up.
    notice_open: bool,
    spinner: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl UiState {
    pub fn advance_spinner(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // One persistent Terminal keeps the diffing buffers across draws.
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, screen: &Screen) -> Result<()> {
    state.notice_open = screen.notice.is_some();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, screen))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to what the user asked for. Returns `None` for
/// events with no effect.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) => k,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if is_ctrl_c(&k) {
        return Some(UserEvent::Quit);
    }
    if state.mode == Mode::QuitModal {
        return match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    if state.notice_open {
        return match k.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.notice_open = false;
                Some(UserEvent::DismissNotice)
            }
            _ => None,
        };
    }
    match k.code {
        KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Enter => Some(UserEvent::Submit),
        KeyCode::Tab | KeyCode::Down => Some(UserEvent::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UserEvent::PrevField),
        KeyCode::Backspace => Some(UserEvent::Backspace),
        KeyCode::Char(c)
            if !k
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(UserEvent::Input(c))
        }
        _ => None,
    }
}

fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c'))
}

fn ui(f: &mut Frame, state: &UiState, screen: &Screen) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // header
            Constraint::Min(8),    // scores + ledger
            Constraint::Length(6), // form
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], screen);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);
    draw_scores(f, middle[0], screen);
    draw_ledger(f, middle[1], screen);
    draw_form(f, state, chunks[2], screen);
    draw_help(f, chunks[3]);
    draw_modals(f, state, screen);
}

fn draw_header(f: &mut Frame, area: Rect, screen: &Screen) {
    let difficulty = screen
        .view
        .as_ref()
        .and_then(|view| view.difficulty)
        .map(|d| d.to_string())
        .unwrap_or_else(|| String::from("?"));
    let synced = screen
        .last_synced
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| String::from("waiting for first snapshot"));
    let header = Paragraph::new(vec![
        Line::from(format!(
            "Server: {} | Difficulty: {} | Last sync: {}",
            screen.server_url, difficulty, synced
        )),
        Line::from(screen.status.clone()),
    ])
    .block(Block::default().borders(Borders::ALL).title("OldGuard Ledger"));
    f.render_widget(header, area);
}

fn draw_scores(f: &mut Frame, area: Rect, screen: &Screen) {
    let block = Block::default().borders(Borders::ALL).title("Trust Scores");
    let Some(view) = &screen.view else {
        f.render_widget(waiting_for_server(block), area);
        return;
    };
    let rows = view.scores.iter().map(|row| {
        Row::new(vec![Cell::from(score_label(row)), Cell::from(row.score.to_string())])
            .style(score_style(row))
    });
    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(8)])
        .header(
            Row::new(vec!["User", "Score"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block);
    f.render_widget(table, area);
}

fn draw_ledger(f: &mut Frame, area: Rect, screen: &Screen) {
    let block = Block::default().borders(Borders::ALL).title("Ledger");
    let Some(view) = &screen.view else {
        f.render_widget(waiting_for_server(block), area);
        return;
    };
    let rows = view.chain.iter().map(ledger_row);
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(16),
        ],
    )
    .header(
        Row::new(vec!["Block", "Sender", "Receiver", "Amount", "Nonce", "Hash"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn waiting_for_server(block: Block<'_>) -> Paragraph<'_> {
    Paragraph::new(Line::styled(
        "Waiting for the ledger service...",
        Style::default().fg(Color::DarkGray),
    ))
    .block(block)
}

fn score_label(row: &ScoreRow) -> String {
    if row.banned {
        format!("{} {}", row.user, BANNED_MARKER)
    } else {
        row.user.clone()
    }
}

fn score_style(row: &ScoreRow) -> Style {
    if row.banned {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    }
}

fn ledger_row(row: &BlockRow) -> Row<'static> {
    let index = match row.class {
        BlockClass::Genesis => format!("#{} ⛓", row.index),
        BlockClass::Regular => format!("#{}", row.index),
    };
    let cells = vec![
        Cell::from(index),
        Cell::from(row.sender.clone()),
        Cell::from(row.receiver.clone()),
        Cell::from(Span::styled(
            row.amount.to_string(),
            amount_style(row.amount_class),
        )),
        Cell::from(row.nonce.clone()),
        Cell::from(row.hash.clone()),
    ];
    Row::new(cells).style(block_style(row.class))
}

fn amount_style(class: AmountClass) -> Style {
    match class {
        AmountClass::Positive => Style::default().fg(Color::Green),
        AmountClass::NonPositive => Style::default().fg(Color::Red),
    }
}

fn block_style(class: BlockClass) -> Style {
    match class {
        BlockClass::Genesis => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        BlockClass::Regular => Style::default(),
    }
}

fn draw_form(f: &mut Frame, state: &UiState, area: Rect, screen: &Screen) {
    let mut lines: Vec<Line> = FormField::ALL
        .into_iter()
        .map(|field| form_line(field, screen))
        .collect();
    let submit = if screen.busy {
        Line::styled(
            format!("{} Mining...", SPINNER_FRAMES[state.spinner]),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )
    } else {
        Line::styled(
            "[ Mine Block ] (Enter)",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };
    lines.push(submit);
    let form = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Mine Transaction"));
    f.render_widget(form, area);
}

fn form_line(field: FormField, screen: &Screen) -> Line<'static> {
    let focused = field == screen.focus;
    let cursor = if focused { "_" } else { "" };
    let text = format!(
        "{} {:<9} {}{}",
        if focused { ">" } else { " " },
        format!("{}:", capitalized(field.label())),
        screen.form.field(field),
        cursor
    );
    if focused {
        Line::styled(text, Style::default().fg(Color::Yellow))
    } else {
        Line::from(text)
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new("Type to edit | Tab/↑/↓ field | Enter mine | Esc quit | Ctrl+C exit")
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, screen: &Screen) {
    if let Some(notice) = &screen.notice {
        draw_notice(f, notice);
    }
    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        let p = Paragraph::new("Quit OldGuard? (Y/N)");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn draw_notice(f: &mut Frame, notice: &Notice) {
    let area = centered_rect(60, 30, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(notice.title.clone())
        .border_style(Style::default().fg(Color::Red));
    let p = Paragraph::new(vec![
        Line::from(notice.message.clone()),
        Line::from(""),
        Line::styled("Enter/Esc to dismiss", Style::default().fg(Color::DarkGray)),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
