use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration as StdDuration, Instant};

use chrono::NaiveDate;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::{Frame, Terminal};
use tracing::debug;

use crate::error::{Result, TaskpadError};
use crate::model::{
    EditOutcome, EditRequest, FilterMode, NewTask, Priority, SortMode, Task, Theme,
};
use crate::output::{created_label, due_badge, truncate_title};
use crate::store::kv::{FileKv, KeyValueStore};
use crate::store::prefs;
use crate::store::tasks::{StoreEvent, TaskStore};
use crate::view::{self, ViewQuery, today_local};

const DETAIL_SCROLL_STEP: usize = 8;
const ADD_FIELD_COUNT: usize = 5;

#[derive(Debug, Clone)]
struct TuiConfig {
    query: ViewQuery,
    tick_rate: StdDuration,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            query: ViewQuery::default(),
            tick_rate: StdDuration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
    overdue: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::DarkGray,
                overdue: Color::Red,
            },
            Theme::Dark => Self {
                fg: Color::Gray,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                overdue: Color::LightRed,
            },
        }
    }

    fn base(self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AddForm {
    title: String,
    category: String,
    priority: Priority,
    due: String,
    notes: String,
    field: usize,
    error: Option<String>,
}

impl AddForm {
    const LABELS: [&'static str; ADD_FIELD_COUNT] =
        ["Title", "Category", "Priority", "Due (YYYY-MM-DD)", "Notes"];

    fn buffer_mut(&mut self) -> Option<&mut String> {
        match self.field {
            0 => Some(&mut self.title),
            1 => Some(&mut self.category),
            3 => Some(&mut self.due),
            4 => Some(&mut self.notes),
            _ => None,
        }
    }

    fn cycle_priority(&mut self, forward: bool) {
        self.priority = match (self.priority, forward) {
            (Priority::High, true) => Priority::Medium,
            (Priority::Medium, true) => Priority::Low,
            (Priority::Low, true) => Priority::High,
            (Priority::High, false) => Priority::Low,
            (Priority::Medium, false) => Priority::High,
            (Priority::Low, false) => Priority::Medium,
        };
    }

    fn value(&self, field: usize) -> String {
        match field {
            0 => self.title.clone(),
            1 => self.category.clone(),
            2 => format!("< {} >", self.priority),
            3 => self.due.clone(),
            _ => self.notes.clone(),
        }
    }

    /// Build the request, or explain why the due date is unusable.
    fn to_new_task(&self) -> std::result::Result<NewTask, String> {
        let due = self.due.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(due, "%Y-%m-%d")
                    .map_err(|_| format!("invalid due date '{due}'"))?,
            )
        };
        Ok(NewTask {
            text: self.title.clone(),
            category: Some(self.category.clone()),
            priority: Some(self.priority),
            due_date,
            notes: Some(self.notes.clone()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditStep {
    Title,
    Notes { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditForm {
    id: u64,
    step: EditStep,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Search,
    Add(AddForm),
    Edit(EditForm),
}

struct TuiApp<S: KeyValueStore> {
    store: TaskStore<S>,
    events: Rc<RefCell<Vec<StoreEvent>>>,
    query: ViewQuery,
    theme: Theme,
    mode: Mode,
    help_visible: bool,
    selected: usize,
    detail_scroll: usize,
    today: NaiveDate,
    status_message: Option<String>,
    last_error: Option<String>,
    tick_rate: StdDuration,
}

impl<S: KeyValueStore> TuiApp<S> {
    fn new(mut store: TaskStore<S>, config: TuiConfig) -> Result<Self> {
        let theme = prefs::load_theme(store.storage())?;

        let events: Rc<RefCell<Vec<StoreEvent>>> = Rc::default();
        let sink = Rc::clone(&events);
        store.subscribe(move |event, _| sink.borrow_mut().push(event));

        Ok(Self {
            store,
            events,
            query: ViewQuery {
                search: config.query.search.trim().to_string(),
                ..config.query
            },
            theme,
            mode: Mode::Normal,
            help_visible: false,
            selected: 0,
            detail_scroll: 0,
            today: today_local(),
            status_message: None,
            last_error: None,
            tick_rate: config.tick_rate,
        })
    }

    fn visible(&self) -> Vec<&Task> {
        view::visible(self.store.tasks(), &self.query, self.today)
    }

    fn selected_task(&self) -> Option<&Task> {
        let visible = self.visible();
        pick_selected(visible.len(), self.selected).map(|idx| visible[idx])
    }

    fn selected_id(&self) -> Option<u64> {
        self.selected_task().map(|t| t.id)
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }

        let quit = match self.mode.clone() {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => {
                self.handle_search_key(key);
                false
            }
            Mode::Add(form) => {
                self.handle_add_key(form, key);
                false
            }
            Mode::Edit(form) => {
                self.handle_edit_key(form, key);
                false
            }
        };

        self.drain_events();
        self.normalize_selection();
        quit
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('?') => self.help_visible = !self.help_visible,
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('c') => {
                self.query.search.clear();
                self.reset_view_position();
            }
            KeyCode::Char('a') => self.mode = Mode::Add(AddForm::default()),
            KeyCode::Char('e') => {
                let form = self.selected_task().map(|task| EditForm {
                    id: task.id,
                    step: EditStep::Title,
                    buffer: task.text.clone(),
                });
                if let Some(form) = form {
                    self.mode = Mode::Edit(form);
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(id) = self.selected_id()
                    && self.refresh()
                {
                    let result = self.store.toggle_complete(id);
                    self.record(result.map(|_| ()));
                }
            }
            KeyCode::Char('D') | KeyCode::Delete => {
                if let Some(id) = self.selected_id()
                    && self.refresh()
                {
                    let result = self.store.delete(id);
                    self.record(result.map(|_| ()));
                }
            }
            KeyCode::Char('t') => {
                let result = prefs::toggle_theme(self.store.storage());
                match result {
                    Ok(theme) => {
                        self.theme = theme;
                        self.status_message = Some(format!("theme: {theme}"));
                    }
                    Err(err) => self.last_error = Some(err.to_string()),
                }
            }
            KeyCode::Char('f') | KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                self.query.filter = self.query.filter.next();
                self.reset_view_position();
            }
            KeyCode::Char('F') | KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.query.filter = self.query.filter.prev();
                self.reset_view_position();
            }
            KeyCode::Char('s') => {
                self.query.sort = self.query.sort.next();
                self.detail_scroll = 0;
            }
            KeyCode::Char('S') => {
                self.query.sort = self.query.sort.prev();
                self.detail_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home | KeyCode::Char('g') => {
                self.selected = 0;
                self.detail_scroll = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.visible().len().saturating_sub(1);
                self.detail_scroll = 0;
            }
            KeyCode::PageUp | KeyCode::Char('u') => {
                self.detail_scroll = self.detail_scroll.saturating_sub(DETAIL_SCROLL_STEP);
            }
            KeyCode::PageDown | KeyCode::Char('d') => {
                self.detail_scroll = self.detail_scroll.saturating_add(DETAIL_SCROLL_STEP);
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Normal,
            _ => {
                if edit_buffer(&mut self.query.search, key) {
                    self.reset_view_position();
                }
            }
        }
    }

    fn handle_add_key(&mut self, mut form: AddForm, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                return;
            }
            KeyCode::Enter => match form.to_new_task() {
                Ok(input) => {
                    self.mode = Mode::Normal;
                    if !self.refresh() {
                        return;
                    }
                    let result = self.store.create(input);
                    if matches!(result, Ok(None)) {
                        self.status_message = Some("empty title, nothing added".to_string());
                    }
                    self.record(result.map(|_| ()));
                    return;
                }
                Err(message) => form.error = Some(message),
            },
            KeyCode::Tab | KeyCode::Down => form.field = (form.field + 1) % ADD_FIELD_COUNT,
            KeyCode::BackTab | KeyCode::Up => {
                form.field = (form.field + ADD_FIELD_COUNT - 1) % ADD_FIELD_COUNT;
            }
            KeyCode::Left if form.field == 2 => form.cycle_priority(false),
            KeyCode::Right | KeyCode::Char(' ') if form.field == 2 => form.cycle_priority(true),
            _ => {
                if let Some(buffer) = form.buffer_mut() {
                    edit_buffer(buffer, key);
                }
            }
        }
        self.mode = Mode::Add(form);
    }

    fn handle_edit_key(&mut self, mut form: EditForm, key: KeyEvent) {
        match key.code {
            // Backing out at either step abandons the whole edit.
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => match form.step {
                EditStep::Title if form.buffer.trim().is_empty() => {
                    let request = EditRequest {
                        title: Some(form.buffer),
                        notes: None,
                    };
                    self.apply_edit(form.id, request);
                    self.mode = Mode::Normal;
                }
                EditStep::Title => {
                    let notes = self
                        .store
                        .get(form.id)
                        .map(|t| t.notes.clone())
                        .unwrap_or_default();
                    self.mode = Mode::Edit(EditForm {
                        id: form.id,
                        step: EditStep::Notes { title: form.buffer },
                        buffer: notes,
                    });
                }
                EditStep::Notes { title } => {
                    let request = EditRequest {
                        title: Some(title),
                        notes: Some(form.buffer),
                    };
                    self.apply_edit(form.id, request);
                    self.mode = Mode::Normal;
                }
            },
            _ => {
                edit_buffer(&mut form.buffer, key);
                self.mode = Mode::Edit(form);
            }
        }
    }

    fn apply_edit(&mut self, id: u64, request: EditRequest) {
        if !self.refresh() {
            return;
        }
        match self.store.edit(id, request) {
            Ok(EditOutcome::Applied(_)) => self.last_error = None,
            Ok(EditOutcome::Rejected) => {
                self.last_error = None;
                self.status_message = Some("empty title, edit discarded".to_string());
            }
            Ok(EditOutcome::NotFound) => {
                self.last_error = None;
                self.status_message = Some(format!("task {id} no longer exists"));
            }
            Ok(EditOutcome::Cancelled) => self.last_error = None,
            Err(err) => self.last_error = Some(err.to_string()),
        }
    }

    /// Pick up writes made outside the TUI before changing anything.
    fn refresh(&mut self) -> bool {
        match self.store.reload() {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    fn record(&mut self, result: Result<()>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(err) => self.last_error = Some(err.to_string()),
        }
    }

    /// Turn store notifications into a status line.
    fn drain_events(&mut self) {
        let events: Vec<StoreEvent> = self.events.borrow_mut().drain(..).collect();
        for event in events {
            debug!(?event, "store changed");
            self.status_message = Some(match event {
                StoreEvent::Created(id) => {
                    self.select_id(id);
                    format!("added {id}")
                }
                StoreEvent::Toggled(id) => format!("toggled {id}"),
                StoreEvent::Edited(id) => format!("edited {id}"),
                StoreEvent::Deleted(id) => format!("deleted {id}"),
                StoreEvent::Replaced(count) => format!("loaded {count} tasks"),
            });
        }
    }

    fn select_id(&mut self, id: u64) {
        if let Some(pos) = self.visible().iter().position(|t| t.id == id) {
            self.selected = pos;
            self.detail_scroll = 0;
        }
    }

    fn reset_view_position(&mut self) {
        self.selected = 0;
        self.detail_scroll = 0;
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
            return;
        }

        if delta.is_negative() {
            self.selected = self.selected.saturating_sub(delta.unsigned_abs());
        } else {
            self.selected = self
                .selected
                .saturating_add(delta as usize)
                .min(len.saturating_sub(1));
        }
        self.detail_scroll = 0;
    }

    fn normalize_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn task_row(&self, task: &Task, palette: Palette) -> ListItem<'static> {
        let check = if task.completed { "[x] " } else { "[ ] " };
        let title_style = if task.completed {
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(palette.fg)
        };

        let mut spans = vec![
            Span::raw(check),
            Span::styled(truncate_title(&task.text, 48), title_style),
            Span::styled(
                format!("  {} · {}", task.category, task.priority),
                Style::default().fg(palette.muted),
            ),
        ];
        if let Some(badge) = due_badge(task, self.today) {
            let style = if task.is_overdue(self.today) {
                Style::default()
                    .fg(palette.overdue)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.accent)
            };
            spans.push(Span::styled(format!("  {badge}"), style));
        }
        ListItem::new(Line::from(spans))
    }

    fn task_detail(&self, task: &Task) -> String {
        let mut lines = vec![
            format!("id: {}", task.id),
            format!("title: {}", task.text),
            format!(
                "status: {}",
                if task.completed { "completed" } else { "pending" }
            ),
            format!("category: {}", task.category),
            format!("priority: {}", task.priority),
            format!(
                "due: {}",
                due_badge(task, self.today).unwrap_or_else(|| "-".to_string())
            ),
            created_label(task),
            String::new(),
            "notes:".to_string(),
        ];
        if task.notes.trim().is_empty() {
            lines.push("  <none>".to_string());
        } else {
            lines.extend(task.notes.lines().map(|line| format!("  {line}")));
        }
        lines.join("\n")
    }

    fn controls_line(&self) -> String {
        match &self.mode {
            Mode::Search => format!(
                "search mode: type to edit | Enter/Esc exit | query: {}",
                self.query.search
            ),
            Mode::Add(_) => {
                "add: Tab/↓ next field | Shift+Tab/↑ previous | ←/→ priority | Enter save | Esc cancel"
                    .to_string()
            }
            Mode::Edit(_) => "edit: Enter next/save | Esc cancel".to_string(),
            Mode::Normal => {
                "q quit | a add | e edit | space toggle | D delete | / search | c clear | f filter | s sort | t theme | ? help"
                    .to_string()
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let palette = Palette::for_theme(self.theme);
        let base = palette.base();
        frame.render_widget(Block::default().style(base), frame.area());

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let tab_titles = FilterMode::ALL
            .iter()
            .map(|mode| Line::from(mode.to_string()))
            .collect::<Vec<_>>();
        let filter_index = FilterMode::ALL
            .iter()
            .position(|mode| *mode == self.query.filter)
            .unwrap_or(0);

        frame.render_widget(
            Tabs::new(tab_titles)
                .select(filter_index)
                .style(base)
                .block(Block::default().borders(Borders::ALL).title("taskpad"))
                .highlight_style(
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
            outer[0],
        );

        let counts = self.store.counts();
        let search = if self.query.search.is_empty() {
            "<none>"
        } else {
            self.query.search.as_str()
        };
        let mut summary = format!(
            "Total: {}  Completed: {}  Pending: {}  sort={}  search={}  theme={}",
            counts.total, counts.completed, counts.pending, self.query.sort, search, self.theme,
        );
        if let Some(message) = &self.status_message {
            summary.push_str(&format!("  | {message}"));
        }
        if let Some(error) = &self.last_error {
            summary.push_str(&format!("  last_error={error}"));
        }

        frame.render_widget(
            Paragraph::new(summary)
                .style(base)
                .block(Block::default().borders(Borders::ALL).title("Summary"))
                .wrap(Wrap { trim: true }),
            outer[1],
        );

        let center = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(outer[2]);

        let visible = self.visible();
        self.render_list(frame, center[0], &visible, palette);

        let (detail_title, detail) = match pick_selected(visible.len(), self.selected) {
            Some(idx) => (
                format!("Task {}", visible[idx].id),
                self.task_detail(visible[idx]),
            ),
            None => ("Task detail".to_string(), no_results_detail(&self.query)),
        };
        frame.render_widget(
            Paragraph::new(detail)
                .style(base)
                .block(Block::default().borders(Borders::ALL).title(detail_title))
                .wrap(Wrap { trim: false })
                .scroll((self.detail_scroll.min(u16::MAX as usize) as u16, 0)),
            center[1],
        );

        frame.render_widget(
            Paragraph::new(self.controls_line())
                .style(base)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(if self.mode == Mode::Search {
                            "Search"
                        } else {
                            "Controls"
                        }),
                )
                .wrap(Wrap { trim: true }),
            outer[3],
        );

        match &self.mode {
            Mode::Add(form) => self.render_add_form(frame, form, palette),
            Mode::Edit(form) => self.render_edit_form(frame, form, palette),
            Mode::Normal | Mode::Search => {}
        }

        if self.help_visible {
            let popup = centered_rect(70, 70, frame.area());
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(
                    "taskpad controls\n\n\
                     Tasks:\n\
                     - a: add a task\n\
                     - e: edit title, then notes (Esc abandons the edit)\n\
                     - space / x / Enter: toggle completed\n\
                     - D / Delete: delete task\n\n\
                     View:\n\
                     - f / F, Tab, Left/Right: cycle filter (all, pending, completed, today)\n\
                     - s / S: cycle sort order\n\
                     - /: search titles and notes, c: clear search\n\
                     - Up/Down, j/k, g/G: move selection\n\
                     - PgUp/PgDn (or u/d): scroll detail panel\n\n\
                     Other:\n\
                     - t: toggle light/dark theme\n\
                     - ?: toggle this help\n\
                     - q: quit",
                )
                .style(base)
                .block(Block::default().borders(Borders::ALL).title("Help"))
                .wrap(Wrap { trim: true }),
                popup,
            );
        }
    }

    fn render_list(&self, frame: &mut Frame, area: Rect, visible: &[&Task], palette: Palette) {
        let title = format!(
            "Tasks ({}/{})",
            visible.len(),
            self.store.tasks().len()
        );
        let block = Block::default().borders(Borders::ALL).title(title);

        if visible.is_empty() {
            frame.render_widget(
                Paragraph::new("(no tasks)")
                    .style(palette.base())
                    .block(block)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let mut state = ListState::default();
        state.select(pick_selected(visible.len(), self.selected));

        let items = visible
            .iter()
            .map(|task| self.task_row(task, palette))
            .collect::<Vec<_>>();

        frame.render_stateful_widget(
            List::new(items)
                .style(palette.base())
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("❯ "),
            area,
            &mut state,
        );
    }

    fn render_add_form(&self, frame: &mut Frame, form: &AddForm, palette: Palette) {
        let popup = centered_rect(60, 50, frame.area());
        let mut lines = Vec::new();
        for (idx, label) in AddForm::LABELS.iter().enumerate() {
            let marker = if idx == form.field { "❯ " } else { "  " };
            let style = if idx == form.field {
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.fg)
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker}{label}: "), style),
                Span::raw(form.value(idx)),
            ]));
        }
        if let Some(error) = &form.error {
            lines.push(Line::from(""));
            lines.push(Line::styled(
                error.clone(),
                Style::default().fg(palette.overdue),
            ));
        }

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .style(palette.base())
                .block(Block::default().borders(Borders::ALL).title("New task"))
                .wrap(Wrap { trim: false }),
            popup,
        );
    }

    fn render_edit_form(&self, frame: &mut Frame, form: &EditForm, palette: Palette) {
        let popup = centered_rect(60, 30, frame.area());
        let prompt = match form.step {
            EditStep::Title => "Edit task title:",
            EditStep::Notes { .. } => "Edit notes (leave empty for none):",
        };

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(vec![
                Line::styled(prompt, Style::default().fg(palette.accent)),
                Line::from(""),
                Line::from(format!("{}▏", form.buffer)),
            ])
            .style(palette.base())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Edit {}", form.id)),
            )
            .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

pub fn run(
    data_dir: &Path,
    filter: FilterMode,
    sort: SortMode,
    search: Option<String>,
) -> Result<()> {
    let config = TuiConfig {
        query: ViewQuery::new(filter, search.unwrap_or_default(), sort),
        ..TuiConfig::default()
    };

    let store = TaskStore::load(FileKv::open(data_dir)?)?;
    let app = TuiApp::new(store, config)?;
    run_tui(app)
}

fn run_tui<S: KeyValueStore>(mut app: TuiApp<S>) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn run_loop<B: Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut TuiApp<S>,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        app.normalize_selection();
        terminal
            .draw(|frame| app.render(frame))
            .map_err(|err| TaskpadError::Terminal(err.to_string()))?;

        let timeout = app.tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && app.handle_key(key)
        {
            break;
        }

        if last_tick.elapsed() >= app.tick_rate {
            app.today = today_local();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Apply a key to a single-line text buffer. Returns true if it changed.
fn edit_buffer(buffer: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => buffer.pop().is_some(),
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            buffer.push(ch);
            true
        }
        _ => false,
    }
}

fn pick_selected(len: usize, candidate: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(candidate.min(len - 1))
    }
}

fn no_results_detail(query: &ViewQuery) -> String {
    if query.search.trim().is_empty() {
        format!("No {} tasks.", query.filter)
    } else {
        format!("No {} tasks match search: {:?}", query.filter, query.search)
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
