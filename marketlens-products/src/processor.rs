//! The validate → dedup → filter → sort pipeline over page events.

use std::collections::HashMap;

use futures::{pin_mut, Stream, StreamExt};
use tracing::{debug, info, warn};

use marketlens_common::{FetchPlan, PageEvent};

use crate::record::ProductRecord;
use crate::report::FetchReport;
use crate::schema;

/// Record filters, combined by logical AND.
///
/// `min_rating` and the price bounds are optional: an active bound excludes
/// records where the field is absent (an unknown rating is never assumed to
/// pass a rating floor). `min_reviews` is always applicable because
/// `review_count` defaults to 0 at validation.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub include_sponsored: bool,
    pub include_organic: bool,
    pub min_rating: Option<f32>,
    pub min_reviews: u32,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            include_sponsored: true,
            include_organic: true,
            min_rating: None,
            min_reviews: 0,
            min_price: None,
            max_price: None,
        }
    }
}

impl ListingFilter {
    /// Whether `record` survives every active bound.
    ///
    /// Both placement flags false means nothing survives. That is a valid
    /// (if pointless) request, not an error.
    pub fn matches(&self, record: &ProductRecord) -> bool {
        if record.is_sponsored && !self.include_sponsored {
            return false;
        }
        if !record.is_sponsored && !self.include_organic {
            return false;
        }
        if let Some(floor) = self.min_rating {
            match record.rating {
                Some(rating) if rating >= floor => {}
                _ => return false,
            }
        }
        if record.review_count < self.min_reviews {
            return false;
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = record.price else {
                return false;
            };
            if self.min_price.is_some_and(|floor| price < floor) {
                return false;
            }
            if self.max_price.is_some_and(|ceiling| price > ceiling) {
                return false;
            }
        }
        true
    }
}

/// Keep one record per `asin`: the one with the lowest
/// `(source_page, position)`, i.e. first in fetch order. Input order is
/// preserved for the survivors. Returns the survivors and the removed count.
///
/// Idempotent: running it over an already-unique collection changes nothing.
pub fn dedup_by_asin(records: Vec<ProductRecord>) -> (Vec<ProductRecord>, u32) {
    let mut keeper: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        match keeper.get(&record.asin) {
            Some(&kept) if records[kept].fetch_order() <= record.fetch_order() => {}
            _ => {
                keeper.insert(record.asin.clone(), idx);
            }
        }
    }

    let total = records.len();
    let survivors: Vec<ProductRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| keeper.get(&record.asin).copied() == Some(*idx))
        .map(|(_, record)| record)
        .collect();
    let removed = (total - survivors.len()) as u32;
    (survivors, removed)
}

/// The final pipeline product: the record set plus its report.
#[derive(Debug)]
pub struct SearchOutcome {
    pub records: Vec<ProductRecord>,
    pub report: FetchReport,
}

/// Drives the pipeline over a stream of page events.
///
/// Stateless between invocations: every [`ResultProcessor::collect`] call
/// builds its own report and record set.
#[derive(Debug, Clone, Default)]
pub struct ResultProcessor {
    filter: ListingFilter,
}

impl ResultProcessor {
    pub fn new(filter: ListingFilter) -> Self {
        Self { filter }
    }

    /// Consume the page events of `plan` into the final record collection
    /// and fetch report.
    ///
    /// Single bad items never abort anything: they are counted per reason
    /// and skipped. Page failure markers are recorded and the remaining
    /// stages run over whatever pages arrived.
    pub async fn collect(
        &self,
        plan: &FetchPlan,
        events: impl Stream<Item = PageEvent>,
    ) -> SearchOutcome {
        let mut report = FetchReport::new(plan);
        let mut validated: Vec<ProductRecord> = Vec::new();

        pin_mut!(events);
        while let Some(event) = events.next().await {
            match event {
                PageEvent::Page(page) => {
                    report.pages_fetched += 1;
                    report.raw_items += page.items.len() as u32;
                    for (idx, item) in page.items.iter().enumerate() {
                        match schema::validate_item(item, page.page, idx as u32 + 1) {
                            Ok(record) => validated.push(record),
                            Err(reason) => {
                                debug!(
                                    run_id = %report.run_id,
                                    page = page.page,
                                    %reason,
                                    "pipeline.item_rejected"
                                );
                                report.record_rejection(reason);
                            }
                        }
                    }
                }
                PageEvent::Failed(failure) => {
                    warn!(
                        run_id = %report.run_id,
                        page = failure.page,
                        kind = %failure.kind,
                        attempts = failure.attempts,
                        "pipeline.page_failed"
                    );
                    report.page_failures.push(failure);
                }
            }
        }

        let (mut records, duplicates) = dedup_by_asin(validated);
        report.duplicates_removed = duplicates;

        let before_filter = records.len();
        records.retain(|record| self.filter.matches(record));
        report.filtered_out = (before_filter - records.len()) as u32;

        records.sort_by_key(ProductRecord::fetch_order);
        report.records_kept = records.len() as u32;

        info!(
            run_id = %report.run_id,
            pages_fetched = report.pages_fetched,
            raw_items = report.raw_items,
            rejected = report.rejected_total(),
            duplicates = report.duplicates_removed,
            filtered_out = report.filtered_out,
            kept = report.records_kept,
            "pipeline.complete"
        );

        SearchOutcome { records, report }
    }
}
