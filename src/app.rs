use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;
use tui_textarea::{CursorMove, TextArea};

use crate::config::{self, AppConfig};
use crate::entry::{Column, Entry, Status};
use crate::store::Store;
use crate::tracker::{Dialog, Notice, NoticeLevel, Order, Submission, Tracker};
use crate::validate::{parse_date, DATE_FORMAT};

const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(PartialEq, Debug)]
enum ActivePane {
    Table,
    Form,
    ClearConfirm,
}

#[derive(Debug)]
enum Message {
    Key(KeyEvent),
    Paste(String),
    Resize,
    Tick,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct Model<'a, S: Store> {
    tracker: Tracker<S>,
    config: AppConfig,
    table_state: TableState,
    fields: Vec<TextArea<'a>>,
    focused: Column,
    active_pane: ActivePane,
    shown_notice: Option<Notice>,
    notice_until: Option<Instant>,
}

impl<'a, S: Store> Model<'a, S> {
    pub fn new(tracker: Tracker<S>, config: AppConfig) -> Self {
        let mut model = Self {
            tracker,
            config,
            table_state: TableState::default(),
            fields: Column::ALL.iter().map(|_| TextArea::default()).collect(),
            focused: Column::Company,
            active_pane: ActivePane::Table,
            shown_notice: None,
            notice_until: None,
        };
        model.clamp_selection();
        model
    }

    fn clamp_selection(&mut self) {
        let len = self.tracker.rows().len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            Some(i) if i >= len => self.table_state.select(Some(len - 1)),
            None => self.table_state.select(Some(0)),
            Some(_) => {}
        }
    }

    fn selected_id(&self) -> Option<u64> {
        self.table_state
            .selected()
            .and_then(|i| self.tracker.rows().get(i))
            .map(|(id, _)| *id)
    }

    fn select_id(&mut self, id: u64) {
        if let Some(i) = self.tracker.rows().iter().position(|(i, _)| *i == id) {
            self.table_state.select(Some(i));
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.tracker.rows().len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as i32;
        let next = (current + delta).clamp(0, len as i32 - 1);
        self.table_state.select(Some(next as usize));
    }

    fn style_fields(&mut self) {
        let theme = &self.config.theme;
        let errors = self.tracker.errors();
        for (column, field) in Column::ALL.iter().zip(self.fields.iter_mut()) {
            let is_focused = *column == self.focused;
            let border = if errors.get(*column).is_some() {
                theme.field_error
            } else if is_focused {
                theme.border_active
            } else {
                theme.border_inactive
            };
            field.set_block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", field_title(*column)))
                    .border_style(Style::default().fg(border)),
            );
            field.set_cursor_line_style(Style::default());
            if is_focused {
                field.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
            } else {
                field.set_cursor_style(Style::default());
            }
        }
    }

    fn set_field(&mut self, column: Column, value: &str) {
        let mut field = TextArea::new(vec![value.to_string()]);
        field.set_placeholder_text(field_placeholder(column));
        field.move_cursor(CursorMove::End);
        self.fields[column.index()] = field;
    }

    fn load_fields_from_draft(&mut self) {
        let draft = self.tracker.draft().clone();
        for column in Column::ALL {
            self.set_field(column, draft.field(column));
        }
        self.focused = Column::Company;
        self.style_fields();
    }

    fn form_entry(&self) -> Entry {
        let mut entry = Entry::default();
        for column in Column::ALL {
            *entry.field_mut(column) = self.fields[column.index()].lines().join("");
        }
        entry
    }

    fn open_create(&mut self) {
        if self.tracker.request_create(today()) {
            self.load_fields_from_draft();
            self.active_pane = ActivePane::Form;
        }
    }

    fn open_edit(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if self.tracker.request_edit(id) {
            self.load_fields_from_draft();
            self.active_pane = ActivePane::Form;
        }
    }

    fn submit_form(&mut self) {
        let entry = self.form_entry();
        match self.tracker.submit(entry, today()) {
            Submission::Created(id) | Submission::Updated(id) => {
                self.active_pane = ActivePane::Table;
                self.clamp_selection();
                self.select_id(id);
            }
            Submission::Invalid | Submission::Failed => {
                if let Some(column) = Column::ALL
                    .into_iter()
                    .find(|c| self.tracker.errors().get(*c).is_some())
                {
                    self.focused = column;
                }
                self.style_fields();
            }
            Submission::Missing(_) | Submission::NotOpen => {
                self.active_pane = ActivePane::Table;
                self.clamp_selection();
            }
        }
    }

    fn focus_step(&mut self, forward: bool) {
        let len = Column::ALL.len();
        let i = self.focused.index();
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        self.focused = Column::ALL[next];
        self.style_fields();
    }

    // Up/Down on the status and date fields stand in for the pickers.
    fn step_field(&mut self, forward: bool) {
        let current = self.fields[self.focused.index()].lines().join("");
        let value = match self.focused {
            Column::Status => Status::cycle(&current, forward).to_string(),
            Column::Date => {
                let today = today();
                let date = match parse_date(&current) {
                    Some(d) if forward => d.checked_add_days(Days::new(1)).unwrap_or(d),
                    Some(d) => d.checked_sub_days(Days::new(1)).unwrap_or(d),
                    None => today,
                };
                let date = if !self.config.general.allow_future_dates && date > today {
                    today
                } else {
                    date
                };
                date.format(DATE_FORMAT).to_string()
            }
            _ => return,
        };
        self.set_field(self.focused, &value);
        self.style_fields();
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match self.active_pane {
            ActivePane::Table => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
                KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
                KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
                KeyCode::Char('g') | KeyCode::Home => self.table_state.select(Some(0)),
                KeyCode::Char('G') | KeyCode::End => {
                    let len = self.tracker.rows().len();
                    if len > 0 {
                        self.table_state.select(Some(len - 1));
                    }
                }
                KeyCode::Char('n') => self.open_create(),
                KeyCode::Char('e') | KeyCode::Enter => self.open_edit(),
                KeyCode::Char(' ') => {
                    if let Some(id) = self.selected_id() {
                        self.tracker.toggle_selection(id);
                    }
                }
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '1' as usize;
                    if let Some(column) = self.tracker.headers().get(index).copied() {
                        let id = self.selected_id();
                        self.tracker.cycle_sort(column);
                        if let Some(id) = id {
                            self.select_id(id);
                        }
                    }
                }
                KeyCode::Char('C') => {
                    if !self.tracker.rows().is_empty() {
                        self.active_pane = ActivePane::ClearConfirm;
                    }
                }
                _ => {}
            },
            ActivePane::Form => match key.code {
                KeyCode::Esc => {
                    self.tracker.cancel();
                    self.active_pane = ActivePane::Table;
                }
                KeyCode::Enter => self.submit_form(),
                KeyCode::Tab => self.focus_step(true),
                KeyCode::BackTab => self.focus_step(false),
                KeyCode::Up => self.step_field(false),
                KeyCode::Down => self.step_field(true),
                _ => {
                    self.fields[self.focused.index()].input(key);
                }
            },
            ActivePane::ClearConfirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.tracker.clear();
                    self.clamp_selection();
                    self.active_pane = ActivePane::Table;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.active_pane = ActivePane::Table;
                }
                _ => {}
            },
        }
        false
    }

    fn sync_notice(&mut self) {
        if self.tracker.notice() != self.shown_notice.as_ref() {
            self.shown_notice = self.tracker.notice().cloned();
            self.notice_until = self.shown_notice.as_ref().map(|_| Instant::now() + NOTICE_TTL);
        }
    }

    fn update(&mut self, msg: Message) -> bool {
        match msg {
            Message::Key(key) => {
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
                    && self.handle_key_event(key)
                {
                    return true;
                }
            }
            Message::Paste(text) => {
                if self.active_pane == ActivePane::Form {
                    let text = text.replace(['\r', '\n'], "");
                    self.fields[self.focused.index()].insert_str(text);
                }
            }
            Message::Resize => {}
            Message::Tick => {
                if self.notice_until.is_some_and(|t| Instant::now() >= t) {
                    self.tracker.take_notice();
                    self.notice_until = None;
                }
            }
        }
        self.sync_notice();
        false
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut tick_interval = time::interval(Duration::from_millis(250));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _input_handle = std::thread::spawn(move || {
            while let Ok(evt) = event::read() {
                if tx.send(evt).is_err() {
                    break;
                }
            }
        });

        loop {
            terminal.draw(|f| self.ui(f))?;

            let mut messages = Vec::new();
            tokio::select! {
                Some(event) = rx.recv() => {
                    let process_event = |e| match e {
                        Event::Key(key) => Some(Message::Key(key)),
                        Event::Resize(_, _) => Some(Message::Resize),
                        Event::Paste(text) => Some(Message::Paste(text)),
                        _ => None,
                    };
                    if let Some(m) = process_event(event) {
                        messages.push(m);
                    }
                    while let Ok(e) = rx.try_recv() {
                        if let Some(m) = process_event(e) {
                            messages.push(m);
                        }
                    }
                }
                _ = tick_interval.tick() => messages.push(Message::Tick),
            }

            for msg in messages {
                if self.update(msg) {
                    return Ok(());
                }
            }
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let theme = self.config.theme.clone();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(2),
            ])
            .split(f.area());

        let title = format!(
            " JOBS  •  {} applications  •  {} selected  •  {}",
            self.tracker.rows().len(),
            self.tracker.selected_count(),
            config::APP_VERSION
        );
        f.render_widget(
            Paragraph::new(title).style(Style::default().fg(theme.header).add_modifier(Modifier::BOLD)),
            chunks[0],
        );

        let table_block = Block::default()
            .borders(Borders::ALL)
            .title(" Applications ")
            .border_style(Style::default().fg(if self.active_pane == ActivePane::Table {
                theme.border_active
            } else {
                theme.border_inactive
            }));

        if self.tracker.rows().is_empty() {
            let empty = Paragraph::new("\n  No data yet. Press [n] to record an application.")
                .style(Style::default().fg(theme.foreground))
                .block(table_block);
            f.render_widget(empty, chunks[1]);
        } else {
            let active = self.tracker.active_column();
            let mut header_cells = vec![Cell::from("")];
            for (i, column) in self.tracker.headers().iter().enumerate() {
                let mut spans = Vec::new();
                if active == Some(*column) {
                    let icon = match self.tracker.order(*column) {
                        Order::Ascending => "↑",
                        Order::Descending => "↓",
                        Order::Default => "⇅",
                    };
                    spans.push(Span::styled(
                        format!("{} ", icon),
                        Style::default().fg(theme.sort_indicator),
                    ));
                }
                spans.push(Span::raw(format!("{} {}", i + 1, column.label())));
                header_cells.push(Cell::from(Line::from(spans)));
            }
            let header = Row::new(header_cells)
                .style(Style::default().fg(theme.header).add_modifier(Modifier::BOLD))
                .bottom_margin(1);

            let rows: Vec<Row> = self
                .tracker
                .rows()
                .iter()
                .map(|(id, entry)| {
                    let checked = self.tracker.is_selected(*id);
                    let mut cells = vec![Cell::from(if checked { "[x]" } else { "[ ]" })];
                    cells.extend(
                        self.tracker
                            .headers()
                            .iter()
                            .map(|c| Cell::from(entry.field(*c).to_string())),
                    );
                    let row = Row::new(cells).style(Style::default().fg(theme.foreground));
                    if checked {
                        row.style(Style::default().fg(theme.foreground).bg(theme.checked_row_bg))
                    } else {
                        row
                    }
                })
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Percentage(28),
                Constraint::Percentage(28),
                Constraint::Percentage(18),
                Constraint::Min(12),
            ];
            let table = Table::new(rows, widths)
                .header(header)
                .block(table_block)
                .row_highlight_style(
                    Style::default()
                        .bg(theme.selection_bg)
                        .fg(theme.selection_fg)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol(">>");
            f.render_stateful_widget(table, chunks[1], &mut self.table_state);
        }

        match self.active_pane {
            ActivePane::Form => self.render_form(f, chunks[1]),
            ActivePane::ClearConfirm => self.render_clear_confirm(f, chunks[1]),
            ActivePane::Table => {}
        }

        let footer_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);

        if let Some(notice) = self.tracker.notice() {
            let color = match notice.level {
                NoticeLevel::Info => theme.notice_info,
                NoticeLevel::Warning => theme.notice_warning,
                NoticeLevel::Error => theme.notice_error,
            };
            f.render_widget(
                Paragraph::new(format!(" {} ", notice.text))
                    .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                    .wrap(Wrap { trim: true }),
                footer_chunks[0],
            );
        }

        let help_text = match self.active_pane {
            ActivePane::Table => {
                " j/k: Move  •  n: New  •  e/Enter: Edit  •  Space: Select  •  1-4: Sort  •  C: Clear  •  q: Quit "
            }
            ActivePane::Form => {
                " Tab: Next Field  •  ↑/↓: Pick Status/Date  •  Enter: Submit  •  Esc: Cancel "
            }
            ActivePane::ClearConfirm => " y: Confirm  •  n: Cancel ",
        };
        f.render_widget(
            Paragraph::new(help_text)
                .style(Style::default().fg(theme.border_inactive))
                .wrap(Wrap { trim: true }),
            footer_chunks[1],
        );
    }

    fn render_form(&self, f: &mut Frame, area: Rect) {
        let theme = self.config.theme.clone();
        let title = match self.tracker.dialog() {
            Dialog::Edit { id, entry } => format!(" Edit Job #{} ({}) ", id, entry.company),
            _ => " Create Job ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(theme.border_active));

        let form_area = centered_rect(60, 90, area);
        f.render_widget(Clear, form_area);
        let inner = block.inner(form_area);
        f.render_widget(block, form_area);

        let mut constraints = Vec::new();
        for _ in Column::ALL {
            constraints.push(Constraint::Length(3));
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Min(0));
        let slots = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for column in Column::ALL {
            let i = column.index();
            f.render_widget(&self.fields[i], slots[i * 2]);
            if let Some(message) = self.tracker.errors().get(column) {
                f.render_widget(
                    Paragraph::new(format!(" {}", message))
                        .style(Style::default().fg(theme.field_error)),
                    slots[i * 2 + 1],
                );
            }
        }
    }

    fn render_clear_confirm(&self, f: &mut Frame, area: Rect) {
        let theme = &self.config.theme;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Clear Local Storage? ")
            .border_style(Style::default().fg(theme.notice_error));

        let text = format!(
            "\n  This removes all {} applications.\n\n  (y/n)",
            self.tracker.rows().len()
        );
        let p = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);

        let confirm_area = centered_rect(40, 30, area);
        f.render_widget(Clear, confirm_area);
        f.render_widget(p, confirm_area);
    }
}

fn field_title(column: Column) -> String {
    match column {
        Column::Date => "Date when applied".to_string(),
        _ => column.label(),
    }
}

fn field_placeholder(column: Column) -> &'static str {
    match column {
        Column::Company => "Company",
        Column::Position => "Position",
        Column::Status => "Pick a Status (↑/↓)",
        Column::Date => "YYYY-MM-DD",
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
