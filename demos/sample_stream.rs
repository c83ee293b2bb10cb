//! Example: Print tweets from the sampled stream
//!
//! Reads an app-only bearer token from `TWITTER_BEARER_TOKEN`.
//!
//! Usage:
//!   cargo run --example sample_stream
//!   cargo run --example sample_stream -- --count 20

use clap::Parser;
use miette::IntoDiagnostic;
use warbler::fields::{Expansions, TweetFields, UserFields};
use warbler::tweets::{self, StreamOpts};
use warbler::types::StreamMessage;
use warbler::{CancellationToken, Envelope, StreamEnd, StreamOutcome, handler_fn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print tweets from the sampled stream")]
struct Args {
    /// Stop after this many tweets
    #[arg(short, long)]
    count: Option<usize>,
    /// Read from the rule-filtered stream instead of the sample
    #[arg(long)]
    filtered: bool,
}

fn print_message(msg: &StreamMessage) {
    let author = msg
        .includes
        .as_ref()
        .and_then(|inc| inc.users.first())
        .map(|u| u.username.as_str())
        .unwrap_or("?");
    println!("@{} | {} | {}", author, msg.data.id, msg.data.text.replace('\n', " "));
    for rule in &msg.matching_rules {
        println!("    matched rule {} {:?}", rule.id, rule.tag);
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();
    let token = std::env::var("TWITTER_BEARER_TOKEN").into_diagnostic()?;
    let client = warbler::bearer_client(token);

    let opts = StreamOpts::new()
        .maybe_max_results(args.count)
        .optional(vec![
            TweetFields {
                author_id: true,
                created_at: true,
                ..Default::default()
            }
            .into(),
            UserFields {
                verified: true,
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
    let stream = if args.filtered {
        tweets::search_stream(opts)
    } else {
        tweets::sample_stream(opts)
    };

    // Cancel on Ctrl-C
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        on_signal.cancel();
    });

    println!("Streaming tweets (Ctrl-C to stop)...\n");

    let mut count = 0u64;
    let mut print = handler_fn(|msg: &Envelope<StreamMessage>| {
        count += 1;
        print_message(msg.message());
        StreamOutcome::<std::convert::Infallible>::Continue
    });
    let end = stream.run(&client, &mut print, &cancel).await;

    match end {
        Ok(StreamEnd::Stopped) => println!("\nReceived {} tweets", count),
        Ok(StreamEnd::Closed) => println!("\nServer closed the stream after {} tweets", count),
        Err(e) if e.is_cancelled() => println!("\nShutting down after {} tweets", count),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
