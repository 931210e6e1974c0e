//! Module containing the crate's error type.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use http::StatusCode;

use crate::client::SendError;

/// Encapsulates all possible failures of obtaining a token.
#[derive(Debug)]
pub enum Error {
    /// The token endpoint answered with a non-2xx status. Contains the status
    /// and the raw response body.
    TokenEndpoint {
        /// HTTP status returned by the token endpoint
        status: StatusCode,
        /// Response body, decoded lossily as UTF-8
        body: String,
    },
    /// The request could not be sent, its response could not be read, or it timed out.
    Send(SendError),
    /// The token request could not be built.
    HttpError(http::Error),
    /// A malformed server response.
    BadServerResponse(String),
    /// Error while decoding JSON, either the key file or a response.
    JSONError(serde_json::Error),
    /// The JSON Web Key is not a usable RSA private key.
    InvalidKey(String),
    /// The assertion could not be signed.
    Signing(rsa::signature::Error),
    /// The TLS configuration of the HTTP client could not be set up.
    Tls(rustls::Error),
    /// A lower level IO error.
    LowLevelError(io::Error),
}

impl From<SendError> for Error {
    fn from(error: SendError) -> Error {
        Error::Send(error)
    }
}

impl From<http::Error> for Error {
    fn from(error: http::Error) -> Error {
        Error::HttpError(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::JSONError(value)
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Error {
        Error::LowLevelError(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Error::TokenEndpoint { status, ref body } => {
                writeln!(f, "ERROR {} fetching token:", status.as_u16())?;
                body.fmt(f)
            }
            Error::Send(ref err) => err.fmt(f),
            Error::HttpError(ref err) => err.fmt(f),
            Error::BadServerResponse(ref s) => s.fmt(f),
            Error::JSONError(ref e) => write!(f, "JSON Error: {}", e),
            Error::InvalidKey(ref s) => write!(f, "Invalid service account key: {}", s),
            Error::Signing(ref e) => write!(f, "Couldn't sign claims: {}", e),
            Error::Tls(ref e) => write!(f, "Couldn't set up TLS: {}", e),
            Error::LowLevelError(ref e) => e.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Send(ref err) => Some(err),
            Error::HttpError(ref err) => Some(err),
            Error::JSONError(ref err) => Some(err),
            Error::Tls(ref err) => Some(err),
            Error::LowLevelError(ref err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_endpoint_error_reports_status_and_body() {
        let err = Error::TokenEndpoint {
            status: StatusCode::BAD_REQUEST,
            body: "{\"error\":\"invalid_grant\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ERROR 400 fetching token:\n{\"error\":\"invalid_grant\"}"
        );
    }
}
