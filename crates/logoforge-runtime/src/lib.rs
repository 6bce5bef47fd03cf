//! In-process execution primitives shared by the Worker (C7): cooperative
//! cancellation and bounded-concurrency fan-out. No I/O and no knowledge of
//! the Task Registry or any gateway lives here — this crate is pure runtime
//! plumbing, composed by `logoforge-worker`.

pub mod cancellation;
pub mod parallel;
pub mod registry;

pub use cancellation::CancellationHandle;
pub use parallel::bounded_for_each;
pub use registry::CancellationRegistry;
