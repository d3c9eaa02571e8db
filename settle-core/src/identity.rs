//! Elevated execution identity for the configure phase

/// Proof that the caller runs with the internal system identity.
///
/// Only the dispatcher can create one, and configurators only ever see a
/// borrow that ends with the dispatch call, independent of whoever started
/// the cycle.
#[derive(Debug)]
pub struct SystemIdentity {
    _private: (),
}

impl SystemIdentity {
    pub const PRINCIPAL: &'static str = "SYSTEM";

    pub fn principal(&self) -> &'static str {
        Self::PRINCIPAL
    }
}

/// Run `f` as the system identity
pub(crate) fn run_as_system<R>(f: impl FnOnce(&SystemIdentity) -> R) -> R {
    let span = tracing::info_span!("identity", principal = SystemIdentity::PRINCIPAL);
    let _entered = span.enter();
    let identity = SystemIdentity { _private: () };
    f(&identity)
}
