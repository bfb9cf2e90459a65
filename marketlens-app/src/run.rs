//! One search run: build the plan from CLI + config, fetch, process, emit.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use marketlens_common::{FailureKind, FetchPlan, Marketplace};
use marketlens_config::MarketLensConfig;
use marketlens_products::{ListingFilter, ProductRecord, ResultProcessor, SearchOutcome};
use marketlens_search::{RetryPolicy, SerpApiClient};

use crate::Cli;

pub async fn run(cli: Cli, config: MarketLensConfig) -> Result<()> {
    let plan = build_plan(&cli, &config)?;
    let filter = build_filter(&cli, &config);
    let client = build_client(&cli, &config)?;

    info!(
        term = %plan.term,
        marketplace = %plan.marketplace,
        currency = plan.marketplace.currency_symbol(),
        pages = plan.pages,
        "run.start"
    );

    let events = client.fetch_pages(&plan);
    let SearchOutcome { records, report } =
        ResultProcessor::new(filter).collect(&plan, events).await;

    // After a quota failure, ask the account endpoint how bad things are.
    if report
        .page_failures
        .iter()
        .any(|f| f.kind == FailureKind::Quota)
    {
        match client.account().await {
            Ok(account) => warn!(
                plan_searches_left = ?account.plan_searches_left,
                searches_per_month = ?account.searches_per_month,
                "run.quota_exhausted"
            ),
            Err(err) => warn!(error = %err, "run.account_lookup_failed"),
        }
    }

    emit_records(&cli, &records)?;
    eprintln!("{report}");

    // Partial data is a success; a run that fetched nothing is not.
    if report.pages_fetched == 0 {
        if let Some(failure) = report.page_failures.first() {
            match failure.kind {
                FailureKind::Quota => bail!("search quota exhausted: {}", failure.message),
                FailureKind::Permanent => bail!("search failed: {}", failure.message),
                FailureKind::Transient => bail!(
                    "search failed after {} attempts: {}",
                    failure.attempts,
                    failure.message
                ),
            }
        }
    }

    Ok(())
}

fn build_plan(cli: &Cli, config: &MarketLensConfig) -> Result<FetchPlan> {
    let term = cli
        .term
        .clone()
        .or_else(|| config.search.term.clone())
        .context("no search term: pass --term or set search.term in the config")?;
    let marketplace: Marketplace = cli
        .marketplace
        .as_deref()
        .unwrap_or(&config.search.marketplace)
        .parse()?;
    let pages = cli.pages.unwrap_or(config.search.pages);
    Ok(FetchPlan::new(term, marketplace, pages)?)
}

fn build_filter(cli: &Cli, config: &MarketLensConfig) -> ListingFilter {
    let filters = &config.filters;
    ListingFilter {
        include_sponsored: !cli.no_sponsored && filters.include_sponsored,
        include_organic: !cli.no_organic && filters.include_organic,
        min_rating: cli.min_rating.or(filters.min_rating),
        min_reviews: cli.min_reviews.unwrap_or(filters.min_reviews),
        min_price: cli.min_price.or(filters.min_price),
        max_price: cli.max_price.or(filters.max_price),
    }
}

fn build_client(cli: &Cli, config: &MarketLensConfig) -> Result<SerpApiClient> {
    let api = &config.api;
    let key = cli
        .api_key
        .clone()
        .or_else(|| api.key.clone())
        .context("no API key: pass --api-key, set SERPAPI_KEY, or set api.key in the config")?;

    let mut client = match &api.base_url {
        Some(base) => SerpApiClient::with_base_url(key, base)?,
        None => SerpApiClient::new(key)?,
    };
    if let Some(max_retries) = api.max_retries {
        client = client.with_policy(RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        });
    }
    if let Some(secs) = api.timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }
    Ok(client)
}

fn emit_records(cli: &Cli, records: &[ProductRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(records = records.len(), path = %path.display(), "run.records_written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["marketlens"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn cli_term_overrides_config_term() {
        let mut config = MarketLensConfig::default();
        config.search.term = Some("usb hub".to_string());

        let plan = build_plan(&parse(&["--term", "laptop stand"]), &config).unwrap();
        assert_eq!(plan.term, "laptop stand");

        let plan = build_plan(&parse(&[]), &config).unwrap();
        assert_eq!(plan.term, "usb hub");
    }

    #[test]
    fn a_run_without_a_term_is_refused() {
        let err = build_plan(&parse(&[]), &MarketLensConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--term"));
    }

    #[test]
    fn marketplace_falls_back_to_config_default() {
        let mut config = MarketLensConfig::default();
        config.search.term = Some("usb hub".to_string());
        config.search.marketplace = "amazon.co.uk".to_string();

        let plan = build_plan(&parse(&[]), &config).unwrap();
        assert_eq!(plan.marketplace, Marketplace::Uk);

        let plan = build_plan(&parse(&["--marketplace", "amazon.de"]), &config).unwrap();
        assert_eq!(plan.marketplace, Marketplace::De);
    }

    #[test]
    fn sponsored_flag_and_config_combine() {
        let mut config = MarketLensConfig::default();
        config.filters.min_reviews = 50;

        let filter = build_filter(&parse(&["--no-sponsored"]), &config);
        assert!(!filter.include_sponsored);
        assert!(filter.include_organic);
        assert_eq!(filter.min_reviews, 50);

        let filter = build_filter(&parse(&["--min-reviews", "200"]), &config);
        assert!(filter.include_sponsored);
        assert_eq!(filter.min_reviews, 200);
    }

    #[test]
    fn a_run_without_an_api_key_is_refused() {
        let mut cli = parse(&[]);
        cli.api_key = None; // shield the test from an ambient SERPAPI_KEY
        let err = build_client(&cli, &MarketLensConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--api-key"));
    }
}
