//! Application layer containing the payment lifecycle orchestration.
//!
//! This module defines the `PaymentLifecycle` which owns the payment state
//! machine. It talks to storage, the code generator and the notifier only
//! through the domain ports, so every collaborator can be swapped for a fake.

pub mod lifecycle;
