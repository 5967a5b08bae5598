//! Tether transport infrastructure.
//!
//! Implements the [`adapter::Call`] port on top of tokio and provides a second
//! callback adapter strategy, [`OneshotAdapterFactory`], for consumers that
//! would rather await a channel than implement [`adapter::Callback`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Task spawning, cancellation, and channel plumbing live
//! here. The [`adapter`] crate sees only [`adapter::Call`] and
//! [`adapter::CallbackAdapterFactory`].
//!
//! A [`TokioCall`] runs exactly the future it was given. Retries and HTTP
//! semantics belong to whoever builds that future.

pub mod call;
pub mod oneshot;

pub use call::{CancelHandle, CompletedCall, TokioCall};
pub use oneshot::{
    channel as oneshot_channel, OneshotAdapter, OneshotAdapterFactory, OneshotResponse,
    OneshotSender, ONESHOT_SENDER,
};
