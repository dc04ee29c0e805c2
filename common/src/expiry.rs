use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::Product;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Remaining time at or below which a deal is almost expired.
pub const ALMOST_EXPIRED_WITHIN_HOURS: i64 = 6;
/// Remaining time at or below which a deal is expiring soon.
pub const EXPIRING_SOON_WITHIN_HOURS: i64 = 24;

/// Lifecycle stage of a product, derived from the time left until expiry.
///
/// Upper bounds are inclusive: exactly 6h left is `AlmostExpired`, exactly
/// 24h left is `ExpiringSoon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// More than 24h left.
    AheadOfSchedule,
    /// More than 6h and at most 24h left.
    ExpiringSoon,
    /// More than zero and at most 6h left.
    AlmostExpired,
    /// Nothing left (or the expiry timestamp could not be parsed).
    Expired,
}

impl Bucket {
    pub fn is_expired(self) -> bool {
        self == Bucket::Expired
    }

    /// Deals for the "Today Only" strip: at most 24h left.
    pub fn is_today_only(self) -> bool {
        matches!(self, Bucket::AlmostExpired | Bucket::ExpiringSoon)
    }

    /// Deals for the regular product grid: more than 24h left.
    pub fn is_upcoming(self) -> bool {
        self == Bucket::AheadOfSchedule
    }

    /// Urgency badge shown on a product card, if any.
    pub fn badge(self) -> Option<&'static str> {
        match self {
            Bucket::AlmostExpired => Some("Hurry! Almost expired"),
            Bucket::ExpiringSoon => Some("Expiring soon"),
            Bucket::AheadOfSchedule | Bucket::Expired => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Bucket::AheadOfSchedule => "ahead-of-schedule",
            Bucket::ExpiringSoon => "expiring-soon",
            Bucket::AlmostExpired => "almost-expired",
            Bucket::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Time left until expiry, broken down for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Countdown {
    /// Decompose a remaining duration. `None` when nothing is left.
    pub fn from_millis(remaining_ms: i64) -> Option<Self> {
        if remaining_ms <= 0 {
            return None;
        }
        Some(Countdown {
            days: (remaining_ms / MS_PER_DAY) as u64,
            hours: ((remaining_ms / MS_PER_HOUR) % 24) as u8,
            minutes: ((remaining_ms / MS_PER_MINUTE) % 60) as u8,
            seconds: ((remaining_ms / MS_PER_SECOND) % 60) as u8,
        })
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Bucket and countdown computed from one `now` sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub bucket: Bucket,
    pub countdown: Option<Countdown>,
}

impl Classification {
    pub const EXPIRED: Classification = Classification {
        bucket: Bucket::Expired,
        countdown: None,
    };

    pub fn is_expired(&self) -> bool {
        self.bucket.is_expired()
    }
}

/// Classify an expiry instant relative to `now`.
pub fn classify(now: DateTime<Utc>, expire_at: DateTime<Utc>) -> Classification {
    let remaining_ms = (expire_at - now).num_milliseconds();
    let Some(countdown) = Countdown::from_millis(remaining_ms) else {
        return Classification::EXPIRED;
    };

    // Integer comparison on milliseconds is exact for `hours <= N` on the
    // fractional hour count.
    let bucket = if remaining_ms <= ALMOST_EXPIRED_WITHIN_HOURS * MS_PER_HOUR {
        Bucket::AlmostExpired
    } else if remaining_ms <= EXPIRING_SOON_WITHIN_HOURS * MS_PER_HOUR {
        Bucket::ExpiringSoon
    } else {
        Bucket::AheadOfSchedule
    };

    Classification {
        bucket,
        countdown: Some(countdown),
    }
}

/// Classify a product. A malformed `expire_date` counts as expired so the
/// product is hidden rather than shown with a bogus countdown.
pub fn classify_product(now: DateTime<Utc>, product: &Product) -> Classification {
    match product.expire_at() {
        Some(expire_at) => classify(now, expire_at),
        None => Classification::EXPIRED,
    }
}
