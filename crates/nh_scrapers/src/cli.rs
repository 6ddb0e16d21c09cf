use clap::{Args, Subcommand};
use nh_core::{Error, PageRange, Result, Source};
use tracing::{info, warn};

use crate::manager::{ScraperManager, SourceJob};
use crate::scrapers;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ScraperCommands {
    /// Crawl sources and store new articles. Scrapes all sources when none are given.
    Scrape {
        /// Sources to crawl (cnews, habr, tadviser, interfax)
        sources: Vec<Source>,
        /// First element of the range (page, day or month depending on the source)
        #[arg(long)]
        start: Option<u32>,
        /// End of the range, exclusive
        #[arg(long)]
        end: Option<u32>,
        #[arg(long)]
        step: Option<u32>,
    },
    /// List available scrapers with their default ranges
    List,
    /// Extract a single article and print it as JSON without storing it
    Url { source: Source, url: String },
}

impl ScraperCommands {
    /// Turns a `scrape` invocation into one job per source. Range flags that
    /// are left out fall back to each source's default; a range that ends up
    /// empty for any source is rejected.
    pub fn jobs(&self) -> Result<Vec<SourceJob>> {
        let ScraperCommands::Scrape {
            sources,
            start,
            end,
            step,
        } = self
        else {
            return Ok(Vec::new());
        };

        let sources: Vec<Source> = if sources.is_empty() {
            Source::ALL.to_vec()
        } else {
            sources.iter().fold(Vec::new(), |mut unique, source| {
                if !unique.contains(source) {
                    unique.push(*source);
                }
                unique
            })
        };
        let overridden = start.is_some() || end.is_some() || step.is_some();

        sources
            .into_iter()
            .map(|source| {
                if !overridden {
                    return Ok(SourceJob::new(source));
                }
                let default = scrapers::for_source(source).default_range();
                let range = PageRange::new(
                    start.unwrap_or(default.start),
                    end.unwrap_or(default.end),
                    step.unwrap_or(default.step),
                );
                if range.is_empty() {
                    return Err(Error::Config(format!(
                        "Empty range {}..{} for {}",
                        range.start, range.end, source
                    )));
                }
                Ok(SourceJob::with_range(source, range))
            })
            .collect()
    }
}

pub async fn handle_command(args: ScraperArgs, manager: &ScraperManager) -> Result<()> {
    match &args.command {
        ScraperCommands::Scrape { .. } => {
            let jobs = args.command.jobs()?;
            let names: Vec<_> = jobs.iter().map(|j| j.source.as_str()).collect();
            let storage = manager.storage().name();
            if storage == "memory" {
                warn!("Scraping into the in-memory backend; nothing is kept after exit");
            }
            info!(sources = %names.join(", "), storage, "Starting scrape");

            let mut failed = Vec::new();
            for (source, result) in manager.run(&jobs).await {
                match result {
                    Ok(report) => println!("{}", serde_json::to_string(&report)?),
                    Err(e) => {
                        eprintln!("{}: {}", source, e);
                        failed.push(source.as_str());
                    }
                }
            }
            if !failed.is_empty() {
                return Err(Error::SourcesFailed(failed.join(", ")));
            }
        }
        ScraperCommands::List => {
            println!("Available scrapers:");
            for factory in scrapers::get_scraper_factories() {
                let scraper = factory();
                let range = scraper.default_range();
                println!(
                    "  {:<10} {} (default range {}..{} step {})",
                    scraper.source(),
                    scraper.base_url(),
                    range.start,
                    range.end,
                    range.step
                );
            }
        }
        ScraperCommands::Url { source, url } => match manager.scrape_url(*source, url).await {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(discard) => {
                eprintln!("Could not extract {}", url);
                return Err(discard.into());
            }
        },
    }
    Ok(())
}
