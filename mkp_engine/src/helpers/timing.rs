use chrono::{DateTime, Duration, Utc};

/// Reservations hold stock for three days unless the caller configures otherwise.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::hours(72);

/// The moment a reservation (or an order holding reservations) made at `now` stops holding stock.
///
/// Non-positive ttls are clamped to one second so that a fresh reservation is always active at creation time. A ttl
/// that runs past the end of the calendar saturates at [`DateTime::<Utc>::MAX_UTC`].
pub fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = if ttl <= Duration::zero() { Duration::seconds(1) } else { ttl };
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
