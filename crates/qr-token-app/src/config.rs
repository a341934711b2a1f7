//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use qr_token_client::{DEFAULT_VALIDATE_RESOURCE, DEFAULT_VALIDATE_STAGE};
use qr_token_core::Coordinates;
use url::Url;

use crate::AppError;
use crate::input::InputForm;

/// Terminal QR code generator for short-lived access tokens.
#[derive(Debug, Parser)]
#[command(name = "qr-token", version = crate::APP_VERSION, about)]
pub struct Cli {
    /// Token service base URL, including any stage prefix.
    #[arg(long, env = "QR_TOKEN_BASE_URL")]
    pub base_url: Option<String>,

    /// Optional API key sent as `x-api-key`.
    #[arg(long, env = "QR_TOKEN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[command(flatten)]
    pub show: ShowArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands besides the default interactive display.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a scanned token against the validation endpoint
    Validate(ValidateArgs),
}

/// Options for the interactive QR display.
#[derive(Debug, Clone, Default, Args)]
pub struct ShowArgs {
    /// Identifier used to request tokens (for example a phone number).
    #[arg(long = "id")]
    pub identifier: Option<String>,

    /// Latitude sent with each request.
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Longitude sent with each request.
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Also write each displayed QR code to this SVG file.
    #[arg(long)]
    pub svg_out: Option<PathBuf>,

    /// IP geolocation endpoint used to prefill coordinates.
    #[arg(long, env = "QR_TOKEN_GEOLOCATION_URL")]
    pub geolocation_url: Option<String>,

    /// Skip coordinate prefill.
    #[arg(long)]
    pub no_geolocation: bool,
}

/// Options for `validate`.
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Token content read from a QR code.
    pub token: String,

    /// Validation service base URL without a stage prefix. When unset, the
    /// token service base URL (which already carries its stage) is used and
    /// `--stage` is not applied.
    #[arg(long, env = "API_BASE_URL")]
    pub validate_base_url: Option<String>,

    /// Stage prefix of the validation endpoint.
    #[arg(long, env = "API_STAGE", default_value = DEFAULT_VALIDATE_STAGE)]
    pub stage: String,

    /// Resource path of the validation endpoint.
    #[arg(long, env = "API_RESOURCE", default_value = DEFAULT_VALIDATE_RESOURCE)]
    pub resource: String,
}

/// Resolved `validateToken` endpoint parts: `{base_url}/{stage}{resource}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateTarget {
    /// Base URL the stage and resource are appended to.
    pub base_url: String,
    /// Stage segment; empty when the base already carries it.
    pub stage: String,
    /// Resource path.
    pub resource: String,
}

impl ValidateTarget {
    /// Resolves the validation endpoint for `args`.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when neither base URL is configured.
    pub fn from_cli(cli: &Cli, args: &ValidateArgs) -> Result<Self, AppError> {
        let (base_url, stage) = match (non_blank(args.validate_base_url.clone()), &cli.base_url) {
            (Some(base_url), _) => (base_url, args.stage.clone()),
            (None, Some(base_url)) => (base_url.clone(), String::new()),
            (None, None) => {
                return Err(AppError::Config(
                    "set --validate-base-url/API_BASE_URL or --base-url/QR_TOKEN_BASE_URL"
                        .to_string(),
                ));
            }
        };

        Ok(Self {
            base_url,
            stage,
            resource: args.resource.clone(),
        })
    }
}

/// Resolved settings for the interactive display.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Token service base URL.
    pub base_url: String,
    /// API key, if configured and non-blank.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Initial identifier and coordinates.
    pub form: InputForm,
    /// SVG export target.
    pub svg_out: Option<PathBuf>,
    /// Geolocation endpoint; `None` disables prefill.
    pub geolocation_url: Option<Url>,
}

impl AppConfig {
    /// Resolves CLI arguments into display settings.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for out-of-range coordinates,
    /// [`AppError::Config`] for a missing base URL, a zero timeout or a
    /// malformed geolocation URL.
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let base_url = non_blank(cli.base_url.clone()).ok_or_else(|| {
            AppError::Config("--base-url/QR_TOKEN_BASE_URL is required".to_string())
        })?;
        if cli.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let mut form = InputForm::new(cli.show.identifier.clone().unwrap_or_default());
        if let (Some(latitude), Some(longitude)) = (cli.show.latitude, cli.show.longitude) {
            form.set_coordinates(Coordinates::new(latitude, longitude)?);
        }

        let geolocation_url = match (&cli.show.geolocation_url, cli.show.no_geolocation) {
            (Some(raw), false) if !raw.trim().is_empty() => Some(
                Url::parse(raw.trim())
                    .map_err(|error| AppError::Config(format!("invalid geolocation url: {error}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            base_url,
            api_key: non_blank(cli.api_key.clone()),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            form,
            svg_out: cli.show.svg_out.clone(),
            geolocation_url,
        })
    }
}

/// Drops blank secrets so they are never sent or reported as configured.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|inner| !inner.trim().is_empty())
}
