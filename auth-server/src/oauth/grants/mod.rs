//! Extension grants dispatched from [`super::token`]: RFC 8628 device
//! authorization, OpenID CIBA, and RFC 8693 token exchange. Each is kept in
//! its own file since they share almost nothing beyond the access-token
//! minting call at the very end.

pub mod ciba;
pub mod device;
pub mod token_exchange;
