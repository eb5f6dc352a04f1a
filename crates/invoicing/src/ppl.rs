//! PPL (private pilot licence) course detection.
//!
//! The course is 45 hours billed in tranches. Hours paid so far are estimated
//! from the amount billed on PPL lines through a coarse band table, not a
//! pro-rata price per hour.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::LineItem;

pub const PPL_COURSE_HOURS: u32 = 45;

/// Lower-cased phrases that mark a line as PPL course billing.
pub const PPL_MARKERS: [&str; 9] = [
    "curs ppl",
    "cursul ppl",
    "curs pilot privat",
    "pregatire ppl",
    "pregătire ppl",
    "licenta de pilot privat",
    "licență de pilot privat",
    "ppl(a)",
    "ppl course",
];

/// Amount thresholds (descending) and the hours they unlock.
const HOUR_BANDS: [(i64, u32); 6] = [
    (14_000, 45),
    (10_000, 45),
    (7_000, 30),
    (5_000, 20),
    (3_000, 11),
    (2_000, 7),
];

const MIN_HOURS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PplInfo {
    #[serde(rename = "isPPL")]
    pub is_ppl: bool,
    pub hours_paid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn is_ppl_item(item: &LineItem) -> bool {
    let text = item.searchable_text();
    PPL_MARKERS.iter().any(|marker| text.contains(marker))
}

pub fn is_ppl_course_invoice(items: &[LineItem]) -> bool {
    items.iter().any(is_ppl_item)
}

/// Hours covered by the PPL lines of an invoice.
pub fn calculate_ppl_hours_paid(items: &[LineItem]) -> u32 {
    let paid: Decimal = items.iter().filter(|i| is_ppl_item(i)).map(|i| i.total).sum();
    hours_for_amount(paid)
}

pub fn hours_for_amount(amount: Decimal) -> u32 {
    HOUR_BANDS
        .iter()
        .find(|(threshold, _)| amount >= Decimal::from(*threshold))
        .map(|(_, hours)| *hours)
        .unwrap_or(MIN_HOURS)
}

pub fn get_ppl_info(items: &[LineItem]) -> PplInfo {
    if !is_ppl_course_invoice(items) {
        return PplInfo {
            is_ppl: false,
            hours_paid: 0,
            description: None,
        };
    }
    let hours_paid = calculate_ppl_hours_paid(items);
    PplInfo {
        is_ppl: true,
        hours_paid,
        description: Some(format!("PPL course: {hours_paid}h paid of {PPL_COURSE_HOURS}h")),
    }
}
