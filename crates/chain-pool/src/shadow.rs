/// Unconfirmed-balance shadow for one address, touched only while applying or
/// undoing a transaction against the `ready` queue. Mirrors `Account::u_balance`
/// without requiring a store round-trip per pool insert.
#[derive(Debug, Clone, Copy, Default)]
pub struct UAccountShadow {
    pub u_balance: i128,
}
