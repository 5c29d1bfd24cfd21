use anyhow::Result;
use unisound::state::Config;
use unisound::SearchAggregator;

use super::utils::{pick, search_merged, Sources};

pub async fn run(keyword: &str, pages: usize, config: &Config) -> Result<()> {
    let sources = Sources::new(config)?;
    let aggregator = SearchAggregator::new(sources.all());
    let results = search_merged(&aggregator, keyword, pages.max(1), config).await?;

    if results.is_empty() {
        println!("No results for '{}'", keyword);
        return Ok(());
    }

    println!("\nSearch results for '{}':\n", keyword);
    for (i, snippet) in results.iter().enumerate() {
        match snippet.published_at() {
            Some(date) => println!(
                "{}. [{}] {} ({})",
                i + 1,
                snippet.provider(),
                snippet,
                date.format("%Y-%m-%d")
            ),
            None => println!("{}. [{}] {}", i + 1, snippet.provider(), snippet),
        }
    }

    println!("\nUse 'unisound play {:?} --index <n>' to listen", keyword);

    Ok(())
}

pub async fn resolve(keyword: &str, index: usize, config: &Config) -> Result<()> {
    let sources = Sources::new(config)?;
    let aggregator = SearchAggregator::new(sources.all());
    let results = search_merged(&aggregator, keyword, 1, config).await?;
    let snippet = pick(&results, index)?;

    let url = aggregator
        .source_for(snippet)?
        .resolve_playable_url(snippet)
        .await?;

    println!("{}", snippet);
    println!("{}", url);
    Ok(())
}
