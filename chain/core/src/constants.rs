/// Default bound on account-authority recursion during signature checking.
/// Entries that would require chasing authorities past this depth are treated
/// as unsatisfied.
pub const MAX_SIGNATURE_CHECK_DEPTH: u32 = 2;
