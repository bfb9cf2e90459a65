//! Per-invocation fetch accounting.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use marketlens_common::{FetchPlan, Marketplace, PageFailure};

use crate::schema::RejectReason;

/// What happened during one pipeline invocation.
///
/// Created fresh per run, returned alongside the record set, never
/// persisted. The `run_id` also tags the run's tracing events so a report
/// line can be matched to its log records.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub run_id: Uuid,
    pub term: String,
    pub marketplace: Marketplace,
    pub pages_requested: u32,
    pub pages_fetched: u32,
    /// Raw items seen across all fetched pages, before validation.
    pub raw_items: u32,
    /// Items dropped at validation, counted per reason.
    pub rejected: BTreeMap<RejectReason, u32>,
    pub duplicates_removed: u32,
    pub filtered_out: u32,
    pub records_kept: u32,
    /// Terminal per-page failures, in page order.
    pub page_failures: Vec<PageFailure>,
}

impl FetchReport {
    pub fn new(plan: &FetchPlan) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            term: plan.term.clone(),
            marketplace: plan.marketplace,
            pages_requested: plan.pages,
            pages_fetched: 0,
            raw_items: 0,
            rejected: BTreeMap::new(),
            duplicates_removed: 0,
            filtered_out: 0,
            records_kept: 0,
            page_failures: Vec::new(),
        }
    }

    pub fn record_rejection(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_insert(0) += 1;
    }

    /// Total raw items dropped at validation.
    pub fn rejected_total(&self) -> u32 {
        self.rejected.values().sum()
    }

    /// True when at least one page terminally failed.
    pub fn had_failures(&self) -> bool {
        !self.page_failures.is_empty()
    }
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "search '{}' on {} ({}): {}/{} pages fetched, {} raw items",
            self.term,
            self.marketplace,
            self.marketplace.currency_symbol(),
            self.pages_fetched,
            self.pages_requested,
            self.raw_items
        )?;
        writeln!(
            f,
            "  kept {} records ({} rejected, {} duplicates removed, {} filtered out)",
            self.records_kept,
            self.rejected_total(),
            self.duplicates_removed,
            self.filtered_out
        )?;
        for (reason, count) in &self.rejected {
            writeln!(f, "    {count} rejected: {reason}")?;
        }
        for failure in &self.page_failures {
            writeln!(
                f,
                "  page {} failed ({}, {} attempts): {}",
                failure.page, failure.kind, failure.attempts, failure.message
            )?;
        }
        Ok(())
    }
}
