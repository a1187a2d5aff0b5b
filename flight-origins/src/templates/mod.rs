//! Askama pages
//!
//! The service renders a single page, `index.html`, in three states: the bare
//! form, the form with an error message, and the ranking table.

pub mod response;

use askama::Template;
use axum::http::header;

pub use response::HtmlTemplate;

use crate::airport::AirportCode;
use crate::error::Error;
use crate::pipeline::RankedResult;

/// The lookup form and, when present, its outcome
#[derive(Debug, Default, Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    /// Value shown in the input box
    pub airport_code: String,
    /// Message shown above the form
    pub error: Option<String>,
    /// Ranking for `airport_code`
    pub flights: Option<RankedResult>,
}

impl IndexPage {
    /// Empty form, optionally carrying an error passed back in the query string
    pub fn form(error: Option<String>) -> Self {
        Self {
            error: error.filter(|e| !e.is_empty()),
            ..Self::default()
        }
    }

    /// Ranking view for `code`
    pub fn results(code: &AirportCode, flights: RankedResult) -> Self {
        Self {
            airport_code: code.to_string(),
            error: None,
            flights: Some(flights),
        }
    }

    /// Form with `error` explained and the submitted `input` echoed back
    pub fn failed(input: impl Into<String>, error: &Error) -> Self {
        Self {
            airport_code: input.into(),
            error: Some(error.user_message()),
            flights: None,
        }
    }

    /// Whether the page shows a ranking
    pub fn has_results(&self) -> bool {
        self.flights.is_some()
    }
}

/// Render the outcome of a lookup, choosing the status from the error class
///
/// Error pages are marked `no-store` so a transient failure is never cached
/// downstream.
pub fn lookup_page(
    input: &str,
    outcome: crate::error::Result<(AirportCode, RankedResult)>,
) -> HtmlTemplate<IndexPage> {
    match outcome {
        Ok((code, flights)) => HtmlTemplate::new(IndexPage::results(&code, flights)),
        Err(err) => {
            err.log();
            let status = err.status_code();
            HtmlTemplate::new(IndexPage::failed(input, &err))
                .with_status(status)
                .with_header(header::CACHE_CONTROL, "no-store")
        }
    }
}
