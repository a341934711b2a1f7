//! Input surface: identifier/coordinate form and interactive commands.

use qr_token_core::{Coordinates, TokenRequest, ValidationError};

/// Identifier and optional coordinates collected from the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputForm {
    identifier: String,
    coordinates: Option<Coordinates>,
}

impl InputForm {
    /// Creates a form with `identifier` and no coordinates.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            coordinates: None,
        }
    }

    /// Returns the raw identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns `true` when the identifier is blank.
    pub fn identifier_is_blank(&self) -> bool {
        self.identifier.trim().is_empty()
    }

    /// Replaces the identifier.
    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    /// Returns the coordinate pair, if any.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Replaces the coordinate pair.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
    }

    /// Removes the coordinate pair.
    pub fn clear_coordinates(&mut self) {
        self.coordinates = None;
    }

    /// Fills coordinates from a location lookup unless the user already has.
    ///
    /// Returns `true` when the form changed.
    pub fn prefill_coordinates(&mut self, coordinates: Option<Coordinates>) -> bool {
        match (self.coordinates, coordinates) {
            (None, Some(found)) => {
                self.coordinates = Some(found);
                true
            }
            _ => false,
        }
    }

    /// Builds a validated token request.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyIdentifier`] for a blank identifier.
    pub fn to_request(&self) -> Result<TokenRequest, ValidationError> {
        TokenRequest::new(self.identifier.clone(), self.coordinates)
    }
}

/// One line typed into the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    /// Request a new token now.
    Refresh,
    /// Replace the identifier.
    SetIdentifier(String),
    /// Replace coordinates with a validated pair.
    SetLocation(Coordinates),
    /// Remove coordinates.
    ClearLocation,
    /// Show command help.
    Help,
    /// Leave the program.
    Quit,
    /// Line could not be understood.
    Invalid(String),
}

/// Help text listing the interactive commands.
pub const COMMAND_HELP: &str = "commands: [enter]/r refresh | id <value> | loc <lat> <lon> | loc clear | help | q";

impl InputCommand {
    /// Parses one prompt line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "" | "r" | "refresh" => Self::Refresh,
            "q" | "quit" | "exit" => Self::Quit,
            "help" | "?" => Self::Help,
            "id" if !rest.is_empty() => Self::SetIdentifier(rest.to_string()),
            "id" => Self::Invalid("usage: id <value>".to_string()),
            "loc" | "location" => parse_location(rest),
            _ => Self::Invalid(format!("unknown command '{verb}'")),
        }
    }
}

fn parse_location(rest: &str) -> InputCommand {
    if rest.eq_ignore_ascii_case("clear") {
        return InputCommand::ClearLocation;
    }

    let mut parts = rest.split_whitespace();
    let latitude = parts.next().unwrap_or_default();
    let longitude = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return InputCommand::Invalid("usage: loc <lat> <lon>".to_string());
    }

    match Coordinates::parse_pair(latitude, longitude) {
        Ok(Some(coordinates)) => InputCommand::SetLocation(coordinates),
        Ok(None) => InputCommand::Invalid("usage: loc <lat> <lon>".to_string()),
        Err(error) => InputCommand::Invalid(error.to_string()),
    }
}
