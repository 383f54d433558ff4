use anyhow::Result;

use govfeed_core::{Aggregator, FeedItem, SearchMode, SearchReport};

const PREVIEW_CHARS: usize = 160;

pub struct SearchOptions {
    pub deep: bool,
    /// Retry with a deep search when the quick search finds nothing
    pub fallback: bool,
    pub json: bool,
    pub limit: Option<usize>,
    pub stats: bool,
}

pub async fn run(aggregator: &Aggregator, query: &str, options: &SearchOptions) -> Result<()> {
    let (mut items, mut reports) = if options.deep {
        let (items, report) = aggregator.search_with_report(query, SearchMode::Deep).await;
        (items, vec![(SearchMode::Deep, report)])
    } else {
        let (items, report) = aggregator.search_with_report(query, SearchMode::Quick).await;
        (items, vec![(SearchMode::Quick, report)])
    };

    if items.is_empty() && !options.deep && options.fallback && !query.trim().is_empty() {
        tracing::info!("No title matches; retrying with a deep search");
        let (deep_items, report) = aggregator.search_with_report(query, SearchMode::Deep).await;
        items = deep_items;
        reports.push((SearchMode::Deep, report));
    }

    if let Some(limit) = options.limit {
        items.truncate(limit);
    }

    if options.stats {
        print_stats(&reports);
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No results for \"{}\".", query);
        if !options.deep && !options.fallback {
            println!("\nTo search descriptions too, run:");
            println!("  govfeed search --deep \"{}\"", query);
        }
        return Ok(());
    }

    println!("Results ({}):\n", items.len());
    for item in &items {
        print_item(item);
    }

    Ok(())
}

fn print_item(item: &FeedItem) {
    let date = item
        .published
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "undated".to_string());

    println!("  [{}] {}", item.category, item.title);
    println!("    {} | {}", date, item.link);

    let preview = item.description_preview(PREVIEW_CHARS);
    if !preview.is_empty() {
        println!("    {}", preview);
    }
    println!();
}

fn print_stats(reports: &[(SearchMode, SearchReport)]) {
    for (mode, report) in reports {
        let label = match mode {
            SearchMode::Quick => "quick",
            SearchMode::Deep => "deep",
        };
        eprintln!("{} search: {}", label, report);
    }
}
