//! Request authorization: shared secret, network policy, and the gate
//! middleware that composes the two checks.

mod gate;
mod policy;
mod secret;

pub use gate::{client_addr, panel_auth, Gate};
pub use policy::{NetworkPolicy, PolicyStore};
pub use secret::PanelSecret;
