use crate::ticket::Ticket;

/// A fixed-point scalar cost, in capacity units, derived from a `Ticket`
/// against a per-rate-resolution budget.
pub type Capacity = u64;

/// Scaling constant chosen to preserve sub-unit precision across long runs
/// of fixed-point capacity arithmetic (1 cost-unit ≈ 1_000_000 capacity
/// units).
pub const FIXED_POINT_FACTOR: f64 = 1_000_000.0;

/// `ticket_capacity(t) = round(normalize(t, cost_capacity) * FIXED_POINT_FACTOR)`.
///
/// Pure conversion; never fails. `cost_capacity` is the Fair Group's
/// per-rate-resolution cost ticket.
pub fn ticket_capacity(t: Ticket, cost_capacity: Ticket) -> Capacity {
    let normalized = t.normalize(cost_capacity);
    (normalized * FIXED_POINT_FACTOR).round() as Capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ticket_has_zero_capacity() {
        let cost_capacity = Ticket::new(100, 64 << 10);
        assert_eq!(ticket_capacity(Ticket::new(0, 0), cost_capacity), 0);
    }

    #[test]
    fn capacity_scales_with_ticket_size() {
        let cost_capacity = Ticket::new(100, 64 << 10);
        let small = ticket_capacity(Ticket::new(1, 0), cost_capacity);
        let large = ticket_capacity(Ticket::new(10, 0), cost_capacity);
        assert_eq!(large, small * 10);
    }
}
