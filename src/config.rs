//! Command line configuration.

use std::path::PathBuf;
use std::time::Duration;

use getopts::Options;
use itertools::Itertools;

/// `client_id` sent when none is given on the command line.
pub const DEFAULT_CLIENT_ID: &str = "service-account";
/// Scopes requested when none are given on the command line.
pub const DEFAULT_SCOPES: &str = "fr:idm:* fr:am:*";

const TOKEN_PATH: &str = "/am/oauth2/access_token";

/// Settings for one token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Tenant base URL, e.g. `https://acme-tenant.example.com`
    pub tenant_url: String,
    /// The service account id, used as issuer and subject of the assertion
    pub service_account_id: String,
    /// Path to the service account's JSON Web Key
    pub jwk_path: PathBuf,
    /// OAuth2 `client_id`
    pub client_id: String,
    /// Space-delimited scopes
    pub scopes: String,
    /// Optional bound on the token request
    pub timeout: Option<Duration>,
}

impl Opts {
    /// The token endpoint of the tenant.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.tenant_url.trim_end_matches('/'), TOKEN_PATH)
    }
}

/// Outcome of parsing the command line.
#[derive(Debug)]
pub enum Command {
    /// Fetch a token with these settings.
    Run(Opts),
    /// Print this usage text and exit successfully.
    Help(String),
}

/// A command line that could not be parsed. Carries the message and usage text.
#[derive(Debug)]
pub struct UsageError {
    /// What was wrong
    pub message: String,
    /// Usage text to show along with it
    pub usage: String,
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("u", "tenant-url", "e.g. https://acme-tenant.example.com", "URL");
    opts.optopt("s", "service-account-id", "Service-account ID from the tenant console", "ID");
    opts.optopt("k", "jwk-path", "Path to your service-account JWK file", "PATH");
    opts.optopt(
        "i",
        "client-id",
        &format!("OAuth2 client_id (default: {})", DEFAULT_CLIENT_ID),
        "ID",
    );
    opts.optmulti(
        "c",
        "scopes",
        &format!("Scopes to request (default: {})", DEFAULT_SCOPES),
        "SCOPES",
    );
    opts.optopt(
        "t",
        "timeout",
        "Give up on the token request and its response after SECS seconds",
        "SECS",
    );
    opts.optflag("h", "help", "Print this help");
    opts
}

/// Parse the command line. `args` includes the program name.
pub fn parse_args<I, S>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    let program = args
        .next()
        .map(|p| p.as_ref().to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let opts = options();
    let brief = format!(
        "Obtain an access_token via the JWT-bearer grant and show the raw JSON\n\n\
         Usage: {} -u URL -s ID -k PATH [options]",
        program
    );
    let usage = opts.usage(&brief);
    let error = |message: String| UsageError {
        message,
        usage: usage.clone(),
    };

    let matches = opts
        .parse(args.map(|a| a.as_ref().to_string()))
        .map_err(|f| error(f.to_string()))?;
    if matches.opt_present("h") {
        return Ok(Command::Help(usage.clone()));
    }
    if !matches.free.is_empty() {
        return Err(error(format!(
            "Unexpected argument: {}",
            matches.free.join(" ")
        )));
    }

    let required = |name: &str| {
        matches
            .opt_str(name)
            .ok_or_else(|| error(format!("Required option '{}' missing", name)))
    };
    let tenant_url = required("tenant-url")?;
    let service_account_id = required("service-account-id")?;
    let jwk_path = PathBuf::from(required("jwk-path")?);

    let scopes = matches.opt_strs("scopes");
    let scopes = if scopes.is_empty() {
        DEFAULT_SCOPES.to_string()
    } else {
        scopes.iter().join(" ")
    };

    let timeout = match matches.opt_str("timeout") {
        Some(secs) => Some(
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| error(format!("Invalid timeout '{}'", secs)))?,
        ),
        None => None,
    };

    Ok(Command::Run(Opts {
        tenant_url,
        service_account_id,
        jwk_path,
        client_id: matches
            .opt_str("client-id")
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
        scopes,
        timeout,
    }))
}
