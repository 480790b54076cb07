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
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

use bank_desk::{BankError, Controller, TransactionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    CreateAccount,
    Operations,
}

impl Screen {
    pub fn title(&self) -> &str {
        match self {
            Screen::Login => "Login",
            Screen::CreateAccount => "Create New Account",
            Screen::Operations => "Operations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateField {
    Name,
    Balance,
}

/// Modal input dialog opened by a money operation
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Deposit,
    Withdraw,
    TransferRecipient,
    TransferAmount { recipient: String },
}

impl Prompt {
    fn title(&self) -> &str {
        match self {
            Prompt::Deposit => " Deposit ",
            Prompt::Withdraw => " Withdraw ",
            Prompt::TransferRecipient | Prompt::TransferAmount { .. } => " Transfer ",
        }
    }

    fn label(&self) -> String {
        match self {
            Prompt::Deposit => "Enter deposit amount ($):".to_string(),
            Prompt::Withdraw => "Enter withdraw amount ($):".to_string(),
            Prompt::TransferRecipient => "Enter recipient's name:".to_string(),
            Prompt::TransferAmount { recipient } => {
                format!("Enter transfer amount to {} ($):", recipient)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Message box shown after every action
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn info(title: &str, message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            title: title.to_string(),
            message: message.into(),
        }
    }

    fn warning(title: &str, message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

pub struct App {
    pub controller: Controller,
    pub screen: Screen,
    pub login_name: String,
    pub create_name: String,
    pub create_balance: String,
    pub create_field: CreateField,
    pub prompt: Option<Prompt>,
    pub prompt_input: String,
    pub notice: Option<Notice>,
    pub show_history: bool,
    pub history: Vec<TransactionRecord>,
    pub history_state: TableState,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            screen: Screen::Login,
            login_name: String::new(),
            create_name: String::new(),
            create_balance: String::new(),
            create_field: CreateField::Name,
            prompt: None,
            prompt_input: String::new(),
            notice: None,
            show_history: false,
            history: Vec::new(),
            history_state: TableState::default(),
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // Modal layers first: notice, then prompt, then the screen itself
        if self.notice.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notice = None;
            }
            return;
        }

        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::CreateAccount => self.handle_create_key(key),
            Screen::Operations => self.handle_operations_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_login(),
            KeyCode::Tab => self.show_create_account(),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Backspace => {
                self.login_name.pop();
            }
            KeyCode::Char(c) => self.login_name.push(c),
            _ => {}
        }
    }

    fn handle_create_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_create_account(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.create_field = match self.create_field {
                    CreateField::Name => CreateField::Balance,
                    CreateField::Balance => CreateField::Name,
                };
            }
            KeyCode::Esc => self.screen = Screen::Login,
            KeyCode::Backspace => {
                self.active_create_field().pop();
            }
            KeyCode::Char(c) => self.active_create_field().push(c),
            _ => {}
        }
    }

    fn handle_operations_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('d') => self.open_prompt(Prompt::Deposit),
            KeyCode::Char('w') => self.open_prompt(Prompt::Withdraw),
            KeyCode::Char('t') => self.open_prompt(Prompt::TransferRecipient),
            KeyCode::Char('b') => self.check_balance(),
            KeyCode::Char('h') => self.toggle_history(),
            KeyCode::Char('l') => self.logout(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next_history_row(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_history_row(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.prompt_input.clear();
            }
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Backspace => {
                self.prompt_input.pop();
            }
            KeyCode::Char(c) => self.prompt_input.push(c),
            _ => {}
        }
    }

    fn active_create_field(&mut self) -> &mut String {
        match self.create_field {
            CreateField::Name => &mut self.create_name,
            CreateField::Balance => &mut self.create_balance,
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
        self.prompt_input.clear();
    }

    pub fn show_create_account(&mut self) {
        self.screen = Screen::CreateAccount;
        self.create_field = CreateField::Name;
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    fn submit_login(&mut self) {
        match self.controller.login(&self.login_name) {
            Ok(session) => {
                let name = session.account_name().to_string();
                self.notice = Some(Notice::info(
                    "Login Successful",
                    format!("Welcome back, {}!", name),
                ));
                self.login_name.clear();
                self.enter_operations();
            }
            Err(BankError::AccountNotFound(name)) => {
                self.notice = Some(Notice::warning(
                    "Login Failed",
                    "Account not found. Please create a new account.",
                ));
                self.create_name = name;
                self.create_balance.clear();
                self.show_create_account();
                self.create_field = CreateField::Balance;
            }
            Err(err) => self.notice = Some(Notice::warning("Login Failed", err.to_string())),
        }
    }

    fn submit_create_account(&mut self) {
        match self
            .controller
            .create_account(&self.create_name, &self.create_balance)
        {
            Ok(session) => {
                let name = session.account_name().to_string();
                self.notice = Some(Notice::info(
                    "Account Created",
                    format!("Account for {} created successfully!", name),
                ));
                self.create_name.clear();
                self.create_balance.clear();
                self.enter_operations();
            }
            Err(err @ BankError::DuplicateAccount(_)) => {
                self.notice = Some(Notice::warning("Account Exists", err.to_string()));
            }
            Err(err) => self.notice = Some(Notice::warning("Invalid Input", err.to_string())),
        }
    }

    fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let input = std::mem::take(&mut self.prompt_input);

        match prompt {
            Prompt::Deposit => {
                self.notice = Some(match self.controller.deposit(&input) {
                    Ok(balance) => Notice::info(
                        "Deposit Successful",
                        format!("Deposited {}. New balance: {}", echo_amount(&input), money(balance)),
                    ),
                    Err(err) => operation_warning("Deposit Error", &err),
                });
            }
            Prompt::Withdraw => {
                self.notice = Some(match self.controller.withdraw(&input) {
                    Ok(balance) => Notice::info(
                        "Withdrawal Successful",
                        format!("Withdrew {}. New balance: {}", echo_amount(&input), money(balance)),
                    ),
                    Err(err) => operation_warning("Withdrawal Error", &err),
                });
            }
            Prompt::TransferRecipient => {
                self.prompt = Some(Prompt::TransferAmount {
                    recipient: input.trim().to_string(),
                });
            }
            Prompt::TransferAmount { recipient } => {
                self.notice = Some(match self.controller.transfer(&recipient, &input) {
                    Ok(receipt) => Notice::info(
                        "Transfer Successful",
                        format!(
                            "Transferred {} to {}. New balance: {}",
                            echo_amount(&input),
                            receipt.recipient,
                            money(receipt.sender_balance)
                        ),
                    ),
                    Err(err) => operation_warning("Transfer Error", &err),
                });
            }
        }

        if self.show_history {
            self.refresh_history();
        }
    }

    fn check_balance(&mut self) {
        self.notice = Some(match self.controller.check_balance() {
            Ok(balance) => Notice::info("Account Balance", format!("Your balance: {}", money(balance))),
            Err(err) => operation_warning("Account Balance", &err),
        });
    }

    fn logout(&mut self) {
        self.controller.logout();
        self.screen = Screen::Login;
        self.show_history = false;
        self.history.clear();
        self.history_state.select(None);
        self.notice = Some(Notice::info("Logout", "You have been logged out."));
    }

    fn enter_operations(&mut self) {
        self.screen = Screen::Operations;
        self.show_history = false;
        self.history.clear();
        self.history_state.select(None);
    }

    fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
        if self.show_history {
            self.refresh_history();
        }
    }

    fn refresh_history(&mut self) {
        match self.controller.history() {
            Ok(records) => {
                self.history = records;
                self.history_state
                    .select(if self.history.is_empty() { None } else { Some(0) });
            }
            Err(err) => {
                self.notice = Some(operation_warning("History", &err));
            }
        }
    }

    fn next_history_row(&mut self) {
        let len = self.history.len();
        if len == 0 {
            return;
        }
        let i = match self.history_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.history_state.select(Some(i));
    }

    fn previous_history_row(&mut self) {
        let len = self.history.len();
        if len == 0 {
            return;
        }
        let i = match self.history_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.history_state.select(Some(i));
    }
}

fn operation_warning(title: &str, err: &BankError) -> Notice {
    match err {
        BankError::NotLoggedIn => Notice::warning("Account Error", err.to_string()),
        _ => Notice::warning(title, err.to_string()),
    }
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn echo_amount(input: &str) -> String {
    format!("${}", input.trim().trim_start_matches('$'))
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
        log::error!("terminal loop failed: {}", err);
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
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Screen body
            Constraint::Length(3), // Key hints
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.screen {
        Screen::Login => render_login(f, chunks[1], app),
        Screen::CreateAccount => render_create_account(f, chunks[1], app),
        Screen::Operations => render_operations(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    if let Some(prompt) = &app.prompt {
        render_prompt(f, prompt, &app.prompt_input);
    }
    if let Some(notice) = &app.notice {
        render_notice(f, notice);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Banking System",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  │  "),
        Span::styled(app.screen.title(), Style::default().fg(Color::White)),
    ];

    if let Some(session) = app.controller.session() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(
            session.account_name().to_string(),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            money(session.balance()),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let label_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let value_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if focused { "▏" } else { "" };

    Line::from(vec![
        Span::styled(format!("  {:<22}", label), label_style),
        Span::styled(format!("{}{}", value, cursor), value_style),
    ])
}

fn render_login(f: &mut Frame, area: Rect, app: &App) {
    let content = vec![
        Line::from(""),
        field_line("Enter your name:", &app.login_name, true),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" Login   "),
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(" Create New Account"),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Login "),
    );

    f.render_widget(paragraph, area);
}

fn render_create_account(f: &mut Frame, area: Rect, app: &App) {
    let content = vec![
        Line::from(""),
        field_line("Enter your name:", &app.create_name, app.create_field == CreateField::Name),
        Line::from(""),
        field_line(
            "Initial deposit ($):",
            &app.create_balance,
            app.create_field == CreateField::Balance,
        ),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(" Create Account   "),
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(" Next field   "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" Back"),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Create New Account "),
    );

    f.render_widget(paragraph, area);
}

fn render_operations(f: &mut Frame, area: Rect, app: &mut App) {
    if app.show_history {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        render_menu(f, chunks[0]);
        render_history(f, chunks[1], app);
    } else {
        render_menu(f, area);
    }
}

fn render_menu(f: &mut Frame, area: Rect) {
    let entries = [
        ("d", "Deposit"),
        ("w", "Withdraw"),
        ("t", "Transfer"),
        ("b", "Check Balance"),
        ("h", "History"),
        ("l", "Logout"),
        ("q", "Exit"),
    ];

    let mut content = vec![Line::from("")];
    for (key, label) in entries {
        content.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(key, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}", label)),
        ]));
    }

    let menu = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Operations "),
    );

    f.render_widget(menu, area);
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Type", "Amount", "Counterparty"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.history.iter().map(|record| {
        let (color, sign) = if record.transaction_type.is_credit() {
            (Color::Green, "+")
        } else {
            (Color::Red, "-")
        };

        Row::new(vec![
            Cell::from(record.date.clone()),
            Cell::from(record.transaction_type.as_str()).style(Style::default().fg(color)),
            Cell::from(format!("{}{:.2}", sign, record.amount)).style(Style::default().fg(color)),
            Cell::from(record.recipient.clone().unwrap_or_default()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(13),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" History ({}) ", app.history.len())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints: &[(&str, &str)] = if app.notice.is_some() {
        &[("Enter", " Close")]
    } else if app.prompt.is_some() {
        &[("Enter", " OK | "), ("Esc", " Cancel")]
    } else {
        match app.screen {
            Screen::Login => &[("Enter", " Login | "), ("Tab", " New account | "), ("Esc", " Quit")],
            Screen::CreateAccount => &[("Enter", " Create | "), ("Tab", " Field | "), ("Esc", " Back")],
            Screen::Operations => &[("d/w/t", " Money | "), ("b", " Balance | "), ("h", " History | "), ("l", " Logout | "), ("q", " Quit")],
        }
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(*label));
    }

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_prompt(f: &mut Frame, prompt: &Prompt, input: &str) {
    let area = centered_rect(50, 7, f.size());

    let content = vec![
        Line::from(""),
        Line::from(Span::raw(format!("  {}", prompt.label()))),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                format!("{}▏", input),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED),
            ),
        ]),
    ];

    let dialog = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(prompt.title()),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn render_notice(f: &mut Frame, notice: &Notice) {
    let area = centered_rect(50, 7, f.size());
    let color = match notice.level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Warning => Color::Red,
    };

    let dialog = Paragraph::new(vec![Line::from(""), Line::from(format!("  {}", notice.message))])
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", notice.title)),
        );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

/// Fixed-height box, `percent_x` of the width, centered in `r`
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
