//! PRO subscription pricing in Telegram Stars.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;

/// Anchor tiers: (months, stars, discount percent).
const PRICE_TIERS: [(u32, i64, i64); 4] = [(1, 50, 0), (3, 130, 17), (6, 215, 30), (12, 360, 41)];

const STARS_PER_MONTH: i64 = 50;

/// Rough fiat equivalents: 1 Star ~ 2 RUB ~ 10 KZT.
const RUB_PER_STAR: i64 = 2;
const KZT_PER_STAR: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub months: u32,
    pub stars: i64,
    pub currency: &'static str,
    pub discount: i64,
    pub rub_equivalent: i64,
    pub kzt_equivalent: i64,
    pub price_without_discount: i64,
}

/// Price a subscription of 1..=12 months. Anchor months use the tier
/// table directly; in-between months linearly interpolate both the
/// stars and the discount between the surrounding anchors, floored.
pub fn quote(months: u32) -> Option<PriceQuote> {
    if !(1..=12).contains(&months) {
        return None;
    }

    let (stars, discount) = if let Some(anchor) = tier(months) {
        anchor
    } else {
        match months {
            2 => {
                // Two single months minus a small bundle discount.
                let base = STARS_PER_MONTH * 2;
                (base * (100 - 8) / 100, 8)
            }
            4 | 5 => interpolate(months, (3, 130, 17), (6, 215, 30)),
            _ => interpolate(months, (6, 215, 30), (12, 360, 41)),
        }
    };

    Some(PriceQuote {
        months,
        stars,
        currency: "XTR",
        discount,
        rub_equivalent: stars * RUB_PER_STAR,
        kzt_equivalent: stars * KZT_PER_STAR,
        price_without_discount: STARS_PER_MONTH * i64::from(months),
    })
}

fn tier(months: u32) -> Option<(i64, i64)> {
    PRICE_TIERS
        .iter()
        .find(|(m, _, _)| *m == months)
        .map(|(_, stars, discount)| (*stars, *discount))
}

fn interpolate(months: u32, lo: (u32, i64, i64), hi: (u32, i64, i64)) -> (i64, i64) {
    let ratio = f64::from(months - lo.0) / f64::from(hi.0 - lo.0);
    let stars = lo.1 as f64 + (hi.1 - lo.1) as f64 * ratio;
    let discount = lo.2 as f64 + (hi.2 - lo.2) as f64 * ratio;
    (stars.floor() as i64, discount.floor() as i64)
}

/// Compute the new expiry when `months` are purchased at `now`.
///
/// An active, unexpired subscription stacks: the new months extend the
/// current expiry. Otherwise the period starts from `now`.
pub fn extended_until(current_until: Option<i64>, is_premium: bool, now: i64, months: u32) -> i64 {
    let base = match current_until {
        Some(until) if is_premium && until > now => until,
        _ => now,
    };
    let base_dt = DateTime::<Utc>::from_timestamp(base, 0).unwrap_or_else(Utc::now);
    base_dt
        .checked_add_months(Months::new(months))
        .map(|dt| dt.timestamp())
        // Month arithmetic only fails near the representable range end.
        .unwrap_or(base + i64::from(months) * 30 * 86_400)
}
