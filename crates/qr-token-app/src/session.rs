//! Token session: request sequencing, token/error state, and the mounted
//! display.
//!
//! Every submission takes a ticket. Only the most recently issued ticket may
//! change what is shown; results for older tickets are discarded.

use qr_token_client::TokenClient;
use qr_token_core::{Coordinates, TokenError, TokenRequest, TokenResponse};
use qr_token_countdown::CountdownEvent;
use qr_token_display::{DisplaySurface, DisplayUpdate};
use tokio::sync::mpsc::UnboundedSender;

use crate::input::{COMMAND_HELP, InputCommand, InputForm};
use crate::token_fingerprint;

/// A validated request waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Sequence number of this request.
    pub ticket: u64,
    /// Request to send.
    pub request: TokenRequest,
}

/// Outcome of a request, reported back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledRequest {
    /// Ticket the request was issued with.
    pub ticket: u64,
    /// Token or mapped failure.
    pub result: Result<TokenResponse, TokenError>,
}

/// What [`TokenSession::settle`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// A new token is displayed.
    Displayed,
    /// An error message is displayed and no token is held.
    Failed,
    /// A newer request was issued; the result was dropped.
    Superseded,
}

/// Input to [`TokenSession::handle`] from the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A spawned request finished.
    Settled(SettledRequest),
    /// The mounted display's timer fired.
    Countdown(CountdownEvent),
    /// The startup location lookup finished.
    Location(Option<Coordinates>),
    /// The user entered a prompt line.
    Command(InputCommand),
}

/// What the event loop must do after [`TokenSession::handle`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    /// Request to spawn.
    pub submission: Option<Submission>,
    /// Screen changed.
    pub redraw: bool,
    /// A new token was mounted.
    pub token_displayed: bool,
    /// User asked to leave.
    pub quit: bool,
}

impl Reaction {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn submit(submission: Option<Submission>) -> Self {
        Self {
            submission,
            redraw: true,
            ..Self::default()
        }
    }
}

/// Aggregate state behind the terminal screen.
#[derive(Debug)]
pub struct TokenSession {
    form: InputForm,
    latest_ticket: u64,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    display: Option<DisplaySurface>,
    generation: u64,
    auto_refresh: bool,
    countdown_events: UnboundedSender<CountdownEvent>,
}

impl TokenSession {
    /// Creates a session whose displays report timer events to
    /// `countdown_events`.
    pub fn new(form: InputForm, countdown_events: UnboundedSender<CountdownEvent>) -> Self {
        Self {
            form,
            latest_ticket: 0,
            loading: false,
            error: None,
            notice: None,
            display: None,
            generation: 0,
            auto_refresh: true,
            countdown_events,
        }
    }

    /// Enables or disables the request issued when a token expires.
    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh = enabled;
    }

    /// Returns the input form.
    pub fn form(&self) -> &InputForm {
        &self.form
    }

    /// Returns the input form for editing.
    pub fn form_mut(&mut self) -> &mut InputForm {
        &mut self.form
    }

    /// Returns `true` while the latest request is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the error banner text, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the mounted display, if a token is held.
    pub fn display(&self) -> Option<&DisplaySurface> {
        self.display.as_ref()
    }

    /// Returns the informational notice, if one is showing.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Sets a one-line informational notice (help text, command feedback).
    /// It stays until the next submission or settled request.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Applies one event and reports what the event loop must do.
    ///
    /// Only an expiry (with auto refresh on) or an explicit refresh command
    /// produces a submission. Failed requests are never retried.
    pub fn handle(&mut self, event: SessionEvent, now_ms: i64) -> Reaction {
        match event {
            SessionEvent::Settled(settled) => match self.settle(settled, now_ms) {
                SettleOutcome::Superseded => Reaction::default(),
                SettleOutcome::Failed => Reaction::redraw(),
                SettleOutcome::Displayed => Reaction {
                    token_displayed: true,
                    ..Reaction::redraw()
                },
            },
            SessionEvent::Countdown(event) => match self.on_countdown(&event) {
                DisplayUpdate::Redraw => Reaction::redraw(),
                DisplayUpdate::Expired => {
                    tracing::info!(generation = event.generation(), "token expired");
                    let submission = if self.auto_refresh {
                        self.refresh_after_expiry()
                    } else {
                        None
                    };
                    Reaction::submit(submission)
                }
                DisplayUpdate::Ignored => Reaction::default(),
            },
            SessionEvent::Location(position) => Reaction {
                redraw: self.prefill_location(position),
                ..Reaction::default()
            },
            SessionEvent::Command(command) => self.apply_command(command),
        }
    }

    fn apply_command(&mut self, command: InputCommand) -> Reaction {
        match command {
            InputCommand::Refresh => return Reaction::submit(self.submit()),
            InputCommand::SetIdentifier(identifier) => {
                self.form.set_identifier(identifier);
                self.set_notice("identifier updated; press enter to generate");
            }
            InputCommand::SetLocation(coordinates) => {
                self.form.set_coordinates(coordinates);
                self.set_notice("location updated");
            }
            InputCommand::ClearLocation => {
                self.form.clear_coordinates();
                self.set_notice("location cleared");
            }
            InputCommand::Help => self.set_notice(COMMAND_HELP),
            InputCommand::Invalid(reason) => self.set_notice(reason),
            InputCommand::Quit => {
                return Reaction {
                    quit: true,
                    ..Reaction::default()
                };
            }
        }
        Reaction::redraw()
    }

    /// Validates the form and issues a new ticket.
    ///
    /// A validation failure shows its message, drops any held token,
    /// supersedes in-flight requests, and returns `None` without touching the
    /// network.
    pub fn submit(&mut self) -> Option<Submission> {
        self.notice = None;
        match self.form.to_request() {
            Ok(request) => {
                self.latest_ticket += 1;
                self.loading = true;
                self.error = None;
                tracing::debug!(ticket = self.latest_ticket, "token request submitted");
                Some(Submission {
                    ticket: self.latest_ticket,
                    request,
                })
            }
            Err(error) => {
                tracing::debug!(%error, "submission rejected locally");
                // Requests still in flight must not replace this error.
                self.latest_ticket += 1;
                self.loading = false;
                self.show_error(error.to_string());
                None
            }
        }
    }

    /// Submits again after expiry unless the identifier is blank.
    pub fn refresh_after_expiry(&mut self) -> Option<Submission> {
        if self.form.identifier_is_blank() {
            return None;
        }
        self.submit()
    }

    /// Applies a settled request observed at `now_ms`.
    ///
    /// Must be called inside a tokio runtime, since displaying a token starts
    /// its countdown timer.
    pub fn settle(&mut self, settled: SettledRequest, now_ms: i64) -> SettleOutcome {
        if settled.ticket != self.latest_ticket {
            tracing::debug!(
                ticket = settled.ticket,
                latest = self.latest_ticket,
                "discarding superseded token result"
            );
            return SettleOutcome::Superseded;
        }
        self.loading = false;
        self.notice = None;

        let response = match settled.result {
            Ok(response) => response,
            Err(error) => {
                self.show_error(error.message);
                return SettleOutcome::Failed;
            }
        };

        self.generation += 1;
        let fingerprint = token_fingerprint(&response.token);
        // Dropping the previous surface cancels its timer.
        self.display = None;
        match DisplaySurface::mount(
            response,
            now_ms,
            self.generation,
            self.countdown_events.clone(),
        ) {
            Ok(surface) => {
                tracing::info!(
                    ticket = settled.ticket,
                    generation = self.generation,
                    token = %fingerprint,
                    remaining = surface.state().remaining_seconds,
                    "token displayed"
                );
                self.display = Some(surface);
                self.error = None;
                SettleOutcome::Displayed
            }
            Err(error) => {
                tracing::warn!(%error, token = %fingerprint, "token could not be rendered");
                self.show_error(TokenError::unknown().message);
                SettleOutcome::Failed
            }
        }
    }

    /// Routes a countdown event to the mounted display.
    pub fn on_countdown(&mut self, event: &CountdownEvent) -> DisplayUpdate {
        match self.display.as_mut() {
            Some(display) => display.apply(event),
            None => DisplayUpdate::Ignored,
        }
    }

    /// Applies a location lookup result. Returns `true` when the form changed.
    pub fn prefill_location(&mut self, position: Option<Coordinates>) -> bool {
        self.form.prefill_coordinates(position)
    }

    fn show_error(&mut self, message: String) {
        self.display = None;
        self.error = Some(message);
    }

    /// Renders the full screen.
    pub fn render(&self, version: &str) -> String {
        let mut screen = format!("QR Code Generator {version}\n\n");

        let identifier = if self.form.identifier_is_blank() {
            "<none>"
        } else {
            self.form.identifier()
        };
        screen.push_str(&format!("ID:        {identifier}\n"));
        match self.form.coordinates() {
            Some(coordinates) => screen.push_str(&format!(
                "Location:  {}, {}\n",
                coordinates.latitude, coordinates.longitude
            )),
            None => screen.push_str("Location:  <none>\n"),
        }
        if self.loading {
            screen.push_str("Requesting token...\n");
        }
        screen.push('\n');

        if let Some(error) = &self.error {
            screen.push_str(&format!("Error: {error}\n\n"));
        }
        if let Some(display) = &self.display {
            screen.push_str(&display.render());
            screen.push('\n');
        }
        if let Some(notice) = &self.notice {
            screen.push_str(notice);
            screen.push('\n');
        }
        screen.push_str(COMMAND_HELP);
        screen.push_str("\n> ");
        screen
    }
}

/// Sends `submission` through `client` on a new task and reports the result
/// to `results`.
pub fn spawn_request(
    client: TokenClient,
    submission: Submission,
    results: UnboundedSender<SettledRequest>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = client.request_token(&submission.request).await;
        let settled = SettledRequest {
            ticket: submission.ticket,
            result,
        };
        if results.send(settled).is_err() {
            tracing::debug!(ticket = submission.ticket, "session closed before request settled");
        }
    })
}
