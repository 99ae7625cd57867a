/// Classification for retry policy.
///
/// Used by the provider client to decide what to do with a failed attempt.
///
/// # Behavior Summary
///
/// | Class | Retry? | Delay |
/// |-------|--------|-------|
/// | `Transient` | Yes, until attempts run out | `retry_delay_base * attempt` |
/// | `RateLimited` | If the provider's backoff hook allows it | Provider backoff |
/// | `Terminal` | No | - |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Timeouts, refused connections, non-200 statuses and malformed bodies.
    /// Retried with a linear delay.
    Transient,

    /// HTTP 429. The provider decides how long to back off and whether
    /// another attempt is worth spending quota on.
    RateLimited,

    /// Retrying won't help: bad configuration, missing credential,
    /// unknown symbol, or an exhausted request.
    Terminal,
}
