//! # Photo Storage
//!
//! Photo persistence across two storage tiers, driven by a message-based
//! controller.
//!
//! This crate provides:
//! - A private store: JPEG files in the app's own directory
//! - A shared store: rows in a media index plus the encoded bytes behind a
//!   content locator
//! - Storage permission bookkeeping and media change observation
//! - A single-threaded [`Controller`] that turns UI events into effects
//!
//! ## Platform Separation
//!
//! Android-only code (JNI camera launch, permission requests, files directory,
//! SDK version) lives in [`platform`] behind `cfg(target_os = "android")`.
//! Everything else runs and is tested on any host.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_storage::{Controller, Event, StorageConfig};
//!
//! let config = StorageConfig::for_data_dir("/path/to/files");
//! let mut controller = Controller::open(&config)?;
//!
//! let effects = controller.handle(Event::TakePhotoPressed).await;
//! ```

pub mod capture;
pub mod content_uri;
pub mod controller;
pub mod encode;
pub mod error;
pub mod external;
pub mod internal;
pub mod media_store;
pub mod models;
pub mod observer;
pub mod permissions;
pub mod platform;
pub mod schema;
pub mod sdk;

pub use capture::{CameraCapture, CaptureError, CaptureSource};
pub use content_uri::ContentUri;
pub use controller::{CaptureTicket, Controller, Effect, Event, Notice};
pub use error::StorageError;
pub use external::ExternalStorage;
pub use internal::{DirFileArea, InternalStorage, PrivateFileArea};
pub use media_store::{MediaChange, MediaIndex, MediaRow, MediaValues, SqliteMediaIndex};
pub use models::{InternalStoragePhoto, SharedStoragePhoto, StorageConfig, StorageTier};
pub use observer::forward_media_changes;
pub use permissions::{Permission, PermissionState};
pub use sdk::{current_sdk_int, sdk29_and_up};
