//! Basic usage: one search, then the same query over several pages.
//!
//! Run with `LUMEN_API=<token> cargo run --example basic_usage`.

use chrono::NaiveDate;
use lumen_client::config::get_config;
use lumen_client::models::{ParamBuilder, Sort, Topic};
use lumen_client::{FetchStrategy, PaginatedSearch, RequestManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("lumen_client=info"))
        .init();

    let manager = RequestManager::from_config(&get_config())?;

    let query = ParamBuilder::new()
        .with_query("Skinamarink", None)
        .with_topic(Topic::Copyright, None)
        .with_order(Sort::DateReceivedDesc)
        .with_date_range(
            NaiveDate::from_ymd_opt(2023, 1, 1).ok_or("invalid date")?,
            NaiveDate::from_ymd_opt(2023, 12, 31).ok_or("invalid date")?,
        )?
        .with_amount(25)?;

    let first = manager.search(&query).await?;
    println!(
        "{} notices on page 1 ({:?} in total)",
        first.notices.len(),
        first.page_info.total_entries
    );
    for sender in first.metadata.senders.iter().take(5) {
        println!("  {:>6}  {}", sender.count, sender.name);
    }

    let notices = PaginatedSearch::new(query)
        .with_page_range(1, 3)?
        .with_strategy(FetchStrategy::Sequential)
        .search(&manager)
        .await?;
    println!("{} notices across pages 1-3", notices.len());

    Ok(())
}
