use std::{
    io,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use boxoffice_core::{
    account::{PasswordResetFlow, ResetMailer, SignInForm},
    booking::{
        AttemptId, BookingController, CardField, PaymentMethod, QuickBookingFlow, Receipt,
        Settlement,
    },
    catalog::{self, Catalog},
    config::AppConfig,
    error::{BookingError, DeliveryFailure, ResetError, SettlementFailure},
    models::EventListing,
    notice::{self, Notice, NoticeKind},
};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 64;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn notice_style(&self, kind: NoticeKind) -> Style {
        let color = match kind {
            NoticeKind::Success => self.success,
            NoticeKind::Failure => self.danger,
            NoticeKind::Error => self.warning,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn on_accent(&self) -> Color {
        Color::Black
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Events,
    SignIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Events,
    Tickets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignInField {
    Email,
    Password,
}

enum AppEvent {
    Input(Event),
    Tick,
    PaymentSettled {
        attempt: AttemptId,
        result: Result<Receipt, SettlementFailure>,
    },
    BookingSettled {
        attempt: AttemptId,
        result: Result<Receipt, SettlementFailure>,
    },
    ResetDelivered(Result<(), DeliveryFailure>),
}

/// Payment modal cursor state that lives only in the UI.
#[derive(Debug, Clone, Copy)]
struct ModalCursor {
    method: usize,
    card_field: Option<CardField>,
}

impl Default for ModalCursor {
    fn default() -> Self {
        Self {
            method: 0,
            card_field: None,
        }
    }
}

#[derive(Debug)]
struct SignInState {
    form: SignInForm,
    field: SignInField,
    notice: Option<Notice>,
}

impl Default for SignInState {
    fn default() -> Self {
        Self {
            form: SignInForm::default(),
            field: SignInField::Email,
            notice: None,
        }
    }
}

impl SignInState {
    fn input_mut(&mut self) -> &mut String {
        match self.field {
            SignInField::Email => &mut self.form.email,
            SignInField::Password => &mut self.form.password,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            SignInField::Email => SignInField::Password,
            SignInField::Password => SignInField::Email,
        };
    }
}

/// Top-level application state for the box office terminal UI.
pub struct BoxOfficeApp {
    catalog: Catalog,
    state: UiState,
    screen: Screen,
    booking: BookingController,
    quick: QuickBookingFlow,
    reset: PasswordResetFlow,
    sign_in: SignInState,
    signed_in: Option<String>,
    modal_cursor: ModalCursor,
    page_notice: Option<Notice>,
    notice_duration: Duration,
    settlement: Arc<dyn Settlement>,
    mailer: Arc<dyn ResetMailer>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl BoxOfficeApp {
    pub fn new(
        catalog: Catalog,
        config: &AppConfig,
        settlement: Arc<dyn Settlement>,
        mailer: Arc<dyn ResetMailer>,
    ) -> Self {
        let notice_duration = config.notice_duration();
        Self {
            catalog,
            state: UiState::default(),
            screen: Screen::Events,
            booking: BookingController::new().with_notice_duration(notice_duration),
            quick: QuickBookingFlow::new(),
            reset: PasswordResetFlow::new().with_notice_duration(notice_duration),
            sign_in: SignInState::default(),
            signed_in: None,
            modal_cursor: ModalCursor::default(),
            page_notice: None,
            notice_duration,
            settlement,
            mailer,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.reload_events()?;
        self.state
            .set_status(format!("Loaded {} events", self.state.filtered.len()));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn reload_events(&mut self) -> Result<()> {
        let events = self.catalog.events()?;
        self.state.set_events(events);
        self.state.apply_filter();
        info!(total = self.state.all_events.len(), path = %self.catalog.path().display(), "Events loaded");
        Ok(())
    }

    fn handle_tick(&mut self) {
        let now = Instant::now();
        self.booking.expire_notice(now);
        self.reset.expire_notice(now);
        notice::clear_expired(&mut self.sign_in.notice, now);
        notice::clear_expired(&mut self.page_notice, now);
        if self.state.mode == Mode::Filter {
            self.state
                .set_status(format!("Filter: {}", self.state.filter));
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press {
                        if let Err(err) = self.handle_key(key) {
                            self.state.set_status(format!("Error: {err}"));
                        }
                    }
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::PaymentSettled { attempt, result }) => {
                match self.booking.complete_settlement(attempt, result) {
                    Ok(_) => {
                        self.modal_cursor = ModalCursor::default();
                        if let Some(notice) = self.booking.notice() {
                            self.state.set_status(notice.message.clone());
                            if !self.booking.is_open() {
                                self.page_notice = Some(notice.clone());
                            }
                        }
                    }
                    Err(err) => error!(%err, "Settlement completion rejected"),
                }
                true
            }
            Some(AppEvent::BookingSettled { attempt, result }) => {
                match self.quick.finish(attempt, result) {
                    Ok(notice) => {
                        self.state.set_status(notice.message.clone());
                        self.page_notice = Some(notice);
                    }
                    Err(err) => error!(%err, "Booking completion rejected"),
                }
                true
            }
            Some(AppEvent::ResetDelivered(result)) => {
                match self.reset.complete(result) {
                    Ok(()) => {
                        self.sign_in.notice = self.reset.notice().cloned();
                    }
                    Err(err) => warn!(%err, "Reset link not delivered"),
                }
                true
            }
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        if self.reset.is_open() {
            return self.handle_reset_key(key);
        }
        if self.booking.is_open() {
            return self.handle_modal_key(key);
        }
        if self.quick.prompt().is_some() {
            return self.handle_prompt_key(key);
        }
        match self.screen {
            Screen::Events => match self.state.mode {
                Mode::Filter => self.handle_filter_key(key),
                Mode::Browse => self.handle_browse_key(key),
            },
            Screen::SignIn => self.handle_sign_in_key(key),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.filter.clear();
                self.state.apply_filter();
                self.state.set_status("Filter cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "{} events match '{}'",
                    self.state.filtered.len(),
                    self.state.filter
                ));
            }
            KeyCode::Backspace => {
                self.state.filter.pop();
                self.state.apply_filter();
            }
            KeyCode::Char(ch) => {
                if self.state.filter.len() < MAX_INPUT_LEN {
                    self.state.filter.push(ch);
                    self.state.apply_filter();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.state.should_quit = true;
            }
            KeyCode::Char('/') => {
                self.state.mode = Mode::Filter;
                self.state.set_status(format!("Filter: {}", self.state.filter));
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
                self.state.focus = Focus::Tickets;
            }
            KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
                self.state.focus = Focus::Events;
            }
            KeyCode::Enter => match self.state.focus {
                Focus::Events => self.state.focus = Focus::Tickets,
                Focus::Tickets => self.open_selected_ticket(),
            },
            KeyCode::Char('b') => self.request_quick_booking(),
            KeyCode::Char('s') => {
                self.screen = Screen::SignIn;
                self.state.set_status("Sign in to your account".to_string());
            }
            KeyCode::Char('r') => {
                self.catalog.refresh();
                self.reload_events()?;
                self.state.set_status("Catalog reloaded".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn open_selected_ticket(&mut self) {
        let Some(event) = self.state.current_event().cloned() else {
            self.state.set_status("No event selected".to_string());
            return;
        };
        let Some(ticket) = event.tickets.get(self.state.ticket_cursor).cloned() else {
            self.state.set_status("No tickets on sale for this event".to_string());
            return;
        };
        self.page_notice = None;
        match self.booking.open_payment_modal(&ticket, event.metadata()) {
            Ok(()) => {
                self.modal_cursor = ModalCursor::default();
                self.state
                    .set_status(format!("Buying {} for {}", ticket.title, event.title));
            }
            Err(err) => {
                self.page_notice = self.booking.notice().cloned();
                self.state.set_status(err.to_string());
            }
        }
    }

    fn request_quick_booking(&mut self) {
        let Some(event) = self.state.current_event().cloned() else {
            self.state.set_status("No event selected".to_string());
            return;
        };
        match self.quick.request(&event) {
            Ok(_) => self.state.set_status("Confirm booking? (y/n)".to_string()),
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let request = match self.quick.accept() {
                    Ok(request) => request,
                    Err(err) => {
                        self.state.set_status(err.to_string());
                        return Ok(());
                    }
                };
                let Some(sender) = self.event_tx.clone() else {
                    error!("event_channel_missing");
                    return Ok(());
                };
                let attempt = request.attempt;
                self.state.set_status("Processing booking…".to_string());
                let settlement = Arc::clone(&self.settlement);
                spawn(async move {
                    let result = settlement.attempt(request).await;
                    let _ = sender
                        .send(AppEvent::BookingSettled { attempt, result })
                        .await;
                });
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.quick.decline();
                self.state.set_status("Booking cancelled".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(field) = self.modal_cursor.card_field {
            return self.handle_card_key(field, key);
        }
        match key.code {
            KeyCode::Esc => match self.booking.close_modal() {
                Ok(()) => self.state.set_status("Payment cancelled".to_string()),
                Err(BookingError::AlreadyProcessing) => {
                    self.state
                        .set_status("Please wait, payment is processing".to_string());
                }
                Err(err) => self.state.set_status(err.to_string()),
            },
            KeyCode::Char('j') | KeyCode::Down => {
                self.modal_cursor.method =
                    (self.modal_cursor.method + 1).min(PaymentMethod::ALL.len() - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.modal_cursor.method = self.modal_cursor.method.saturating_sub(1);
            }
            KeyCode::Char(' ') => self.select_method(self.modal_cursor.method),
            KeyCode::Char(ch @ '1'..='4') => {
                let index = ch as usize - '1' as usize;
                self.modal_cursor.method = index;
                self.select_method(index);
            }
            KeyCode::Tab => {
                if self.booking.view().card_fields_visible {
                    self.modal_cursor.card_field = Some(CardField::Number);
                }
            }
            KeyCode::Enter => self.start_payment(),
            _ => {}
        }
        Ok(())
    }

    fn handle_card_key(&mut self, field: CardField, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.modal_cursor.card_field = None,
            KeyCode::Tab => self.modal_cursor.card_field = Some(field.next()),
            KeyCode::Enter => {
                self.modal_cursor.card_field = None;
                self.start_payment();
            }
            KeyCode::Backspace => {
                let mut value = self.current_card_value(field);
                value.pop();
                self.set_card_value(field, value);
            }
            KeyCode::Char(ch) => {
                let mut value = self.current_card_value(field);
                if value.len() < MAX_INPUT_LEN && !ch.is_control() {
                    value.push(ch);
                    self.set_card_value(field, value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn current_card_value(&self, field: CardField) -> String {
        self.booking
            .card_details()
            .map(|card| card.get(field).to_string())
            .unwrap_or_default()
    }

    fn set_card_value(&mut self, field: CardField, value: String) {
        if let Err(err) = self.booking.set_card_field(field, value) {
            self.state.set_status(err.to_string());
        }
    }

    fn select_method(&mut self, index: usize) {
        let Some(method) = PaymentMethod::ALL.get(index).copied() else {
            return;
        };
        match self.booking.select_payment_method(method) {
            Ok(()) => {
                if !method.needs_card_details() {
                    self.modal_cursor.card_field = None;
                }
                self.state
                    .set_status(format!("Paying with {}", method.label()));
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn start_payment(&mut self) {
        let request = match self.booking.confirm_payment() {
            Ok(request) => request,
            Err(BookingError::AlreadyProcessing) => return,
            Err(err) => {
                self.state.set_status(err.to_string());
                return;
            }
        };
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            return;
        };
        let attempt = request.attempt;
        let settlement = Arc::clone(&self.settlement);
        self.state.set_status("Processing payment…".to_string());
        spawn(async move {
            let result = settlement.attempt(request).await;
            let _ = sender
                .send(AppEvent::PaymentSettled { attempt, result })
                .await;
        });
    }

    fn handle_sign_in_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('f') {
            let prefill = self.sign_in.form.email.clone();
            self.reset.open(&prefill);
            self.state.set_status("Forgot password".to_string());
            return Ok(());
        }
        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Events;
                self.state.set_status("Back to events".to_string());
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.sign_in.toggle_field();
            }
            KeyCode::Backspace => {
                self.sign_in.input_mut().pop();
            }
            KeyCode::Enter => match self.sign_in.form.submit() {
                Ok(email) => {
                    self.sign_in.notice = None;
                    self.sign_in.form.password.clear();
                    self.state.set_status(format!("Signed in as {email}"));
                    self.signed_in = Some(email);
                    self.screen = Screen::Events;
                }
                Err(err) => {
                    self.sign_in.notice =
                        Some(Notice::transient_error(err.to_string(), self.notice_duration));
                }
            },
            KeyCode::Char(ch) => {
                let input = self.sign_in.input_mut();
                if input.len() < MAX_INPUT_LEN && !ch.is_control() {
                    input.push(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_reset_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => match self.reset.close() {
                Ok(()) => self.state.set_status("Password reset cancelled".to_string()),
                Err(err) => self.state.set_status(err.to_string()),
            },
            KeyCode::Enter => {
                let email = match self.reset.submit() {
                    Ok(email) => email,
                    Err(ResetError::Validation(_)) => return Ok(()),
                    Err(err) => {
                        self.state.set_status(err.to_string());
                        return Ok(());
                    }
                };
                let Some(sender) = self.event_tx.clone() else {
                    error!("event_channel_missing");
                    return Ok(());
                };
                let mailer = Arc::clone(&self.mailer);
                spawn(async move {
                    let result = mailer.send_reset_link(email).await;
                    let _ = sender.send(AppEvent::ResetDelivered(result)).await;
                });
            }
            KeyCode::Backspace if !self.reset.is_sending() => {
                self.reset.email_mut().pop();
            }
            KeyCode::Char(ch) if !self.reset.is_sending() => {
                let input = self.reset.email_mut();
                if input.len() < MAX_INPUT_LEN && !ch.is_control() {
                    input.push(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Events => self.draw_events(frame),
            Screen::SignIn => self.draw_sign_in(frame),
        }
        if let Some(prompt) = self.quick.prompt() {
            self.render_prompt(frame, &prompt.message());
        }
        if self.booking.is_open() {
            self.render_payment_modal(frame);
        }
        if self.reset.is_open() {
            self.render_reset_modal(frame);
        }
    }

    fn draw_events(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        self.render_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        self.render_event_list(frame, body[0]);
        self.render_event_detail(frame, body[1]);
        self.render_status(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let account = match &self.signed_in {
            Some(email) => format!("Signed in as {email}"),
            None => "Guest (press s to sign in)".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(
                "BOX OFFICE",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(account, Style::default().fg(self.theme.muted)),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, area);
    }

    fn render_event_list(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .state
            .filtered
            .iter()
            .map(|event| {
                let control = self.quick.control(&event.id);
                let mut spans = vec![Span::raw(event.title.clone())];
                if control.is_busy() {
                    spans.push(Span::styled(
                        format!("  {}", control.label()),
                        Style::default().fg(self.theme.warning),
                    ));
                }
                ListItem::new(vec![
                    Line::from(spans),
                    Line::from(Span::styled(
                        format!("  {} · {}", event.date, event.location),
                        Style::default().fg(self.theme.muted),
                    )),
                ])
            })
            .collect();

        let title = if self.state.filter.is_empty() {
            "Events".to_string()
        } else {
            format!("Events (filter: {})", self.state.filter)
        };
        let border = if self.state.focus == Focus::Events {
            self.theme.accent
        } else {
            self.theme.muted
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(title),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        if !self.state.filtered.is_empty() {
            list_state.select(Some(self.state.cursor));
        }
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_event_detail(&self, frame: &mut Frame, area: Rect) {
        let border = if self.state.focus == Focus::Tickets {
            self.theme.accent
        } else {
            self.theme.muted
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title("Tickets");
        let Some(event) = self.state.current_event() else {
            let paragraph = Paragraph::new("No events match the current filter.").block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                event.display_name(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Date: {}", event.date)),
            Line::from(format!("Time: {}", event.time)),
            Line::from(format!("Location: {}", event.location)),
            Line::from(""),
        ];
        for (idx, ticket) in event.tickets.iter().enumerate() {
            let selected = self.state.focus == Focus::Tickets && idx == self.state.ticket_cursor;
            let style = if selected {
                Style::default()
                    .bg(self.theme.selection_bg)
                    .fg(self.theme.selection_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            let marker = if selected { "▶ " } else { "  " };
            lines.push(Line::from(Span::styled(
                format!("{marker}{:<16} {}", ticket.title, ticket.price),
                style,
            )));
            if let Some(perks) = &ticket.perks {
                lines.push(Line::from(Span::styled(
                    format!("    {perks}"),
                    Style::default().fg(self.theme.muted),
                )));
            }
        }
        if event.tickets.is_empty() {
            lines.push(Line::from("Sold out"));
        }
        let book = self.quick.control(&event.id);
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("[b] ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                book.label().to_string(),
                if book.is_enabled() {
                    Style::default().fg(self.theme.accent)
                } else {
                    Style::default().fg(self.theme.muted)
                },
            ),
        ]));

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = match (&self.page_notice, self.state.mode) {
            (_, Mode::Filter) => Line::from(format!("Filter: {}", self.state.filter)),
            (Some(notice), _) => Line::from(Span::styled(
                notice.message.clone(),
                self.theme.notice_style(notice.kind),
            )),
            (None, _) => Line::from(self.state.status.clone()),
        };
        let help = Line::from(Span::styled(
            "j/k move  Tab tickets  Enter buy  b quick book  / filter  s sign in  r reload  q quit",
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![primary, help])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, message: &str) {
        let area = centered_rect(48, 8, frame.size());
        frame.render_widget(Clear, area);
        let mut lines: Vec<Line> = message.lines().map(|line| Line::from(line.to_string())).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Confirm"))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_payment_modal(&self, frame: &mut Frame) {
        let view = self.booking.view();
        let height = if view.card_fields_visible { 26 } else { 21 };
        let area = centered_rect(60, height, frame.size());
        frame.render_widget(Clear, area);

        let label_style = Style::default().fg(self.theme.muted);
        let mut lines = vec![
            Line::from(Span::styled(
                view.ticket_title.clone(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled("Date: ", label_style),
                Span::raw(view.event.date.clone()),
                Span::styled("  Time: ", label_style),
                Span::raw(view.event.time.clone()),
            ]),
            Line::from(vec![
                Span::styled("Location: ", label_style),
                Span::raw(view.event.location.clone()),
            ]),
            Line::from(""),
        ];
        for (idx, (label, amount)) in view.breakdown.iter().enumerate() {
            let style = if idx + 1 == view.breakdown.len() {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{label:<20}{amount:>16}"),
                style,
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Payment method", label_style)));
        for (idx, row) in view.methods.iter().enumerate() {
            let radio = if row.selected { "(•)" } else { "( )" };
            let cursor = if idx == self.modal_cursor.method && self.modal_cursor.card_field.is_none()
            {
                "▶"
            } else {
                " "
            };
            let style = if row.selected {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            lines.push(Line::from(Span::styled(
                format!("{cursor} {} {radio} {}", idx + 1, row.method.label()),
                style,
            )));
        }
        if view.card_fields_visible {
            lines.push(Line::from(""));
            for field in CardField::ALL {
                let active = self.modal_cursor.card_field == Some(field);
                let value = match field {
                    CardField::Cvc => "•".repeat(view.card.get(field).chars().count()),
                    _ => view.card.get(field).to_string(),
                };
                let style = if active {
                    Style::default().fg(self.theme.accent)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<16}", field.label()), label_style),
                    Span::styled(format!("{value}{}", if active { "_" } else { "" }), style),
                ]));
            }
        }
        lines.push(Line::from(""));
        if let Some(notice) = &view.notice {
            lines.push(Line::from(Span::styled(
                notice.message.clone(),
                self.theme.notice_style(notice.kind),
            )));
        }
        let confirm_style = if view.confirm_enabled {
            Style::default()
                .fg(self.theme.on_accent())
                .bg(self.theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let spinner = if view.confirm_busy {
            spinner_frame(Local::now().timestamp_subsec_millis())
        } else {
            ""
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} {spinner}", view.confirm_label), confirm_style),
            Span::styled(
                "   Enter pay  Space/1-4 method  Tab card  Esc close",
                label_style,
            ),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Checkout"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_sign_in(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);
        self.render_header(frame, chunks[0]);

        let area = centered_rect(50, 10, chunks[1]);
        let field_line = |label: &str, value: String, active: bool| {
            let style = if active {
                Style::default().fg(self.theme.accent)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            Line::from(vec![
                Span::styled(format!("{label:<10}"), Style::default().fg(self.theme.muted)),
                Span::styled(format!("{value}{}", if active { "_" } else { "" }), style),
            ])
        };
        let mut lines = vec![
            field_line(
                "Email",
                self.sign_in.form.email.clone(),
                self.sign_in.field == SignInField::Email,
            ),
            field_line(
                "Password",
                "•".repeat(self.sign_in.form.password.chars().count()),
                self.sign_in.field == SignInField::Password,
            ),
            Line::from(""),
        ];
        if let Some(notice) = &self.sign_in.notice {
            lines.push(Line::from(Span::styled(
                notice.message.clone(),
                self.theme.notice_style(notice.kind),
            )));
        }
        lines.push(Line::from(Span::styled(
            "Enter sign in  Tab switch field  Ctrl-f forgot password  Esc back",
            Style::default().fg(self.theme.muted),
        )));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Sign In"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        self.render_status(frame, chunks[2]);
    }

    fn render_reset_modal(&self, frame: &mut Frame) {
        let area = centered_rect(54, 9, frame.size());
        frame.render_widget(Clear, area);
        let control = self.reset.control();
        let mut lines = vec![
            Line::from("Enter your email to receive a reset link."),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::raw(self.reset.email().to_string()),
            ]),
            Line::from(""),
        ];
        if let Some(notice) = self.reset.notice() {
            lines.push(Line::from(Span::styled(
                notice.message.clone(),
                self.theme.notice_style(notice.kind),
            )));
        }
        let button_style = if control.is_enabled() {
            Style::default()
                .fg(self.theme.on_accent())
                .bg(self.theme.accent)
        } else {
            Style::default().fg(self.theme.muted)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", control.label()), button_style),
            Span::styled("  Esc close", Style::default().fg(self.theme.muted)),
        ]));
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Forgot Password"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    all_events: Vec<EventListing>,
    filtered: Vec<EventListing>,
    cursor: usize,
    ticket_cursor: usize,
    focus: Focus,
    filter: String,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            all_events: Vec::new(),
            filtered: Vec::new(),
            cursor: 0,
            ticket_cursor: 0,
            focus: Focus::Events,
            filter: String::new(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_events(&mut self, events: Vec<EventListing>) {
        self.all_events = events;
    }

    fn apply_filter(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        self.filtered = if needle.is_empty() {
            self.all_events.clone()
        } else {
            self.all_events
                .iter()
                .filter(|event| catalog::event_matches(event, &needle))
                .cloned()
                .collect()
        };
        self.clamp_cursor();
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.focus {
            Focus::Events => {
                if self.filtered.is_empty() {
                    self.cursor = 0;
                    return;
                }
                let len = self.filtered.len() as isize;
                self.cursor = (self.cursor as isize + delta).clamp(0, len - 1) as usize;
                self.ticket_cursor = 0;
            }
            Focus::Tickets => {
                let len = self
                    .current_event()
                    .map(|event| event.tickets.len())
                    .unwrap_or(0) as isize;
                if len == 0 {
                    self.ticket_cursor = 0;
                    return;
                }
                self.ticket_cursor = (self.ticket_cursor as isize + delta).clamp(0, len - 1) as usize;
            }
        }
    }

    fn clamp_cursor(&mut self) {
        if self.filtered.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len() - 1;
        }
        self.ticket_cursor = 0;
    }

    fn current_event(&self) -> Option<&EventListing> {
        self.filtered.get(self.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

fn spinner_frame(millis: u32) -> &'static str {
    const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
    FRAMES[(millis / 250) as usize % FRAMES.len()]
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
