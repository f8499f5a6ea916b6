//! HTTP clients for the external collaborators: the auth service that
//! resolves bearer credentials, and the notification service.

pub mod auth;
pub mod notify;
