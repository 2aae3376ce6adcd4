//! Domain layer: entities, the money type, the grant policy and the ports the
//! application layer talks to.

pub mod catalog;
pub mod grant;
pub mod money;
pub mod policy;
pub mod ports;
pub mod user;
