//! # Credential & MFA Flows
//!
//! Component 4.G: the built-in `credential` provider (email/password),
//! TOTP, email OTP, and trusted-device MFA-skip, each generalizing a piece
//! of the source repo's single monolithic `AuthService` into its own
//! focused unit sitting on top of [`crate::storage::internal::InternalAdapter`].

pub mod email_otp;
pub mod password;
pub mod totp;
pub mod trusted_device;
pub mod two_factor_gate;
