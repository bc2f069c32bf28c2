//! HTTP access to the Quill blog backend.
//!
//! This crate provides:
//! - [`HttpClient`], the adapter every backend call goes through. It attaches
//!   the bearer token and turns any 401 into a global sign-out plus a
//!   redirect to the login view
//! - [`AuthGateway`] and its HTTP implementation for login, register, logout
//!   and profile fetch
//! - [`ProfileService`] for profile and password updates
//! - The [`Navigator`] seam through which redirects reach the UI layer

mod client;
mod error;
mod gateway;
mod models;
mod navigation;
mod users;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{HttpClient, UnauthorizedCallback, UnauthorizedEvent};
pub use error::{ApiError, ApiResult};
pub use gateway::{AuthGateway, RemoteAuthGateway};
pub use models::{AuthResponse, LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest, User};
pub use navigation::{NavigationMode, Navigator, RecordingNavigator, LOGIN_PATH};
pub use users::ProfileService;
