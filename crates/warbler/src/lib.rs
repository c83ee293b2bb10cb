//! # Warbler
//!
//! A typed client for the Twitter/X HTTP API.
//!
//! REST queries are plain values: build one, pass it to
//! [`ApiClient::invoke`], get the decoded reply. Paged queries carry their own
//! cursor, so invoking the same value again fetches the following page.
//! Streaming queries hand each decoded message to a handler, in arrival
//! order, until the handler stops, the server closes the stream or the
//! caller cancels.
//!
//! ## Example
//!
//! Search recent tweets, three pages at most.
//!
//! ```no_run
//! use warbler::fields::{Expansions, TweetFields};
//! use warbler::tweets::{self, SearchOpts};
//! # use miette::IntoDiagnostic;
//!
//! # #[tokio::main]
//! # async fn main() -> miette::Result<()> {
//! let client = warbler::bearer_client(std::env::var("TWITTER_TOKEN").into_diagnostic()?);
//! let opts = SearchOpts::new()
//!     .max_results(10)
//!     .optional(vec![
//!         TweetFields { created_at: true, ..Default::default() }.into(),
//!         Expansions { author_id: true, ..Default::default() }.into(),
//!     ])
//!     .build();
//!
//! let mut search = tweets::search_recent("from:rustlang", opts);
//! for page in search.all_pages(&client, Some(3)).await? {
//!     for tweet in page.data {
//!         println!("{} {}", tweet.id, tweet.text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use warbler::{CancellationToken, Envelope, StreamOutcome, handler_fn};
//! use warbler::tweets::{self, StreamOpts};
//! use warbler::types::StreamMessage;
//!
//! # #[tokio::main]
//! # async fn main() -> miette::Result<()> {
//! # let client = warbler::bearer_client("token");
//! let mut print = handler_fn(|msg: &Envelope<StreamMessage>| {
//!     println!("{}", msg.message().data.text);
//!     StreamOutcome::<std::convert::Infallible>::Continue
//! });
//! let stream = tweets::sample_stream(StreamOpts::new().max_results(5).build());
//! stream.run(&client, &mut print, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use warbler_common::*;

pub mod account;
pub mod fields;
mod legacy;
pub mod rules;
pub mod status;
pub mod timeline;
pub mod tweets;
pub mod types;

/// Client using `reqwest`, authorized with an app-only bearer token.
#[cfg(feature = "reqwest-client")]
pub fn bearer_client(token: impl Into<smol_str::SmolStr>) -> ApiClient<reqwest::Client> {
    ApiClient::new(reqwest::Client::new()).auth(AuthorizationToken::Bearer(token.into()))
}
