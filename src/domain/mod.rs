//! Domain layer: the payment record, its derived status and the ports the
//! lifecycle depends on.

pub mod events;
pub mod payment;
pub mod ports;
