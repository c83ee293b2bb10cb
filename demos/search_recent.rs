//! Example: Search tweets from the last seven days
//!
//! Reads an app-only bearer token from `TWITTER_BEARER_TOKEN`.
//!
//! Usage:
//!   cargo run --example search_recent -- "from:rustlang"
//!   cargo run --example search_recent -- "cat has:images" --pages 3 --per-page 50

use clap::Parser;
use miette::IntoDiagnostic;
use warbler::fields::{Expansions, TweetFields};
use warbler::tweets::{self, SearchOpts};
use warbler::types::{TweetsReply, metrics};

#[derive(Parser, Debug)]
#[command(author, version, about = "Search tweets from the last seven days")]
struct Args {
    /// Search query
    query: String,
    /// Number of pages to fetch
    #[arg(short, long, default_value_t = 1)]
    pages: usize,
    /// Results per page (10 to 100)
    #[arg(long)]
    per_page: Option<u32>,
    /// Only tweets newer than this ID
    #[arg(long)]
    since_id: Option<String>,
}

fn print_page(page: &TweetsReply) {
    let users = page.includes.as_ref().map(|inc| inc.users.as_slice()).unwrap_or(&[]);
    for tweet in &page.data {
        let author = tweet
            .author_id
            .as_ref()
            .and_then(|id| users.iter().find(|u| &u.id == id))
            .map(|u| u.username.as_str())
            .unwrap_or("?");
        let likes = tweet
            .public_metrics
            .as_ref()
            .and_then(|m| m.get(metrics::LIKE_COUNT))
            .copied()
            .unwrap_or(0);
        println!("@{} | {} | {} likes | {}", author, tweet.id, likes, tweet.text.replace('\n', " "));
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();
    let token = std::env::var("TWITTER_BEARER_TOKEN").into_diagnostic()?;
    let client = warbler::bearer_client(token);

    let opts = SearchOpts::new()
        .maybe_max_results(args.per_page)
        .maybe_since_id(args.since_id)
        .optional(vec![
            TweetFields {
                author_id: true,
                created_at: true,
                public_metrics: true,
                ..Default::default()
            }
            .into(),
            Expansions {
                author_id: true,
                ..Default::default()
            }
            .into(),
        ])
        .build();
    let mut search = tweets::search_recent(args.query, opts);

    let mut fetched = 0;
    while fetched < args.pages {
        let Some(page) = search.next_page(&client).await? else {
            break;
        };
        fetched += 1;
        println!("-- page {} ({} tweets)", fetched, page.data.len());
        print_page(&page);
    }

    if search.has_more_pages() {
        println!("\nMore results available");
    }

    Ok(())
}
