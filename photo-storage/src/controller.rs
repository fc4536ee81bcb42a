//! Single-threaded event processing for the storage screen
//!
//! The UI feeds [`Event`]s in and applies the [`Effect`]s that come back.
//! Platform callbacks (permission results, camera results, media changes) are
//! delivered as events too, so the controller is the only writer of its
//! state. Storage calls run on the blocking pool and are awaited before the
//! list effect is emitted.

use crate::external::ExternalStorage;
use crate::internal::InternalStorage;
use crate::media_store::{MediaChange, SqliteMediaIndex};
use crate::models::{InternalStoragePhoto, SharedStoragePhoto, StorageConfig, StorageTier};
use crate::permissions::{Permission, PermissionState};
use crate::error::StorageError;
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// A launched capture and the tier chosen when it was launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    pub id: u64,
    pub tier: StorageTier,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Screen created, with the grant state read from the platform
    Started {
        read_granted: bool,
        write_granted: bool,
    },
    PrivateToggled(bool),
    TakePhotoPressed,
    /// Camera returned; `None` when the user cancelled
    CaptureCompleted {
        ticket: CaptureTicket,
        image: Option<DynamicImage>,
    },
    CaptureFailed {
        ticket: CaptureTicket,
        reason: String,
    },
    PermissionsResult(HashMap<Permission, bool>),
    /// Tap on a private photo, by filename
    PrivatePhotoTapped(String),
    /// Tap on a shared photo, by id
    SharedPhotoTapped(i64),
    MediaChanged,
}

#[derive(Debug, Clone)]
pub enum Effect {
    RequestPermissions(Vec<Permission>),
    LaunchCapture(CaptureTicket),
    ShowPrivatePhotos(Vec<InternalStoragePhoto>),
    ShowSharedPhotos(Vec<SharedStoragePhoto>),
    Notify(Notice),
}

/// Transient, non-blocking messages for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SavedPrivate,
    SavePrivateFailed,
    SavedShared,
    SaveSharedFailed,
    WritePermissionMissing,
    ReadPermissionMissing,
    Deleted,
    DeleteFailed,
    CaptureFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::SavedPrivate => "Photo saved".to_string(),
            Notice::SavePrivateFailed => "Couldn't save photo".to_string(),
            Notice::SavedShared => "Photo saved to shared storage".to_string(),
            Notice::SaveSharedFailed => "Couldn't save photo to shared storage".to_string(),
            Notice::WritePermissionMissing => {
                "Can't save to shared storage without write permission".to_string()
            }
            Notice::ReadPermissionMissing => {
                "Can't load photos from shared storage without permission".to_string()
            }
            Notice::Deleted => "Photo deleted".to_string(),
            Notice::DeleteFailed => "Couldn't delete photo".to_string(),
            Notice::CaptureFailed(reason) => format!("Camera failed: {}", reason),
        }
    }
}

fn generate_name() -> String {
    Uuid::new_v4().to_string()
}

pub struct Controller {
    internal: InternalStorage,
    external: ExternalStorage,
    sdk_int: u32,
    private_checked: bool,
    permissions: PermissionState,
    next_ticket: u64,
    next_name: fn() -> String,
}

impl Controller {
    pub fn new(internal: InternalStorage, external: ExternalStorage, sdk_int: u32) -> Self {
        Self {
            internal,
            external,
            sdk_int,
            private_checked: true,
            permissions: PermissionState::default(),
            next_ticket: 0,
            next_name: generate_name,
        }
    }

    /// Both stores as laid out in `config`
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let sdk_int = crate::sdk::current_sdk_int(config.sdk_int);
        let internal = InternalStorage::in_dir(&config.files_dir, config.jpeg_quality);
        let index = SqliteMediaIndex::open(&config.media_db_path, &config.media_dir)?;
        let external = ExternalStorage::new(Arc::new(index), sdk_int, config.jpeg_quality);
        Ok(Self::new(internal, external, sdk_int))
    }

    /// Replaces the UUID generator used for new photo names
    pub fn with_name_generator(mut self, next_name: fn() -> String) -> Self {
        self.next_name = next_name;
        self
    }

    pub fn external(&self) -> &ExternalStorage {
        &self.external
    }

    pub fn permissions(&self) -> PermissionState {
        self.permissions
    }

    pub fn sdk_int(&self) -> u32 {
        self.sdk_int
    }

    /// Change notifications of the shared media index
    pub fn media_changes(&self) -> broadcast::Receiver<MediaChange> {
        self.external.index().register_observer()
    }

    /// Processes events until the sender side closes
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<Event>,
        effects: mpsc::UnboundedSender<Effect>,
    ) {
        while let Some(event) = events.recv().await {
            for effect in self.handle(event).await {
                if effects.send(effect).is_err() {
                    log::debug!("Effect receiver gone, stopping controller");
                    return;
                }
            }
        }
    }

    pub async fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Started {
                read_granted,
                write_granted,
            } => {
                self.permissions = PermissionState::evaluate(read_granted, write_granted, self.sdk_int);
                let mut effects = vec![
                    Effect::ShowPrivatePhotos(self.load_private().await),
                    Effect::ShowSharedPhotos(self.load_shared().await),
                ];
                let missing = self.permissions.missing();
                if !missing.is_empty() {
                    effects.push(Effect::RequestPermissions(missing));
                }
                effects
            }
            Event::PrivateToggled(checked) => {
                self.private_checked = checked;
                Vec::new()
            }
            Event::TakePhotoPressed => {
                self.next_ticket += 1;
                let ticket = CaptureTicket {
                    id: self.next_ticket,
                    tier: StorageTier::from_switch(self.private_checked),
                };
                log::debug!("Launching capture {:?}", ticket);
                vec![Effect::LaunchCapture(ticket)]
            }
            Event::CaptureCompleted { ticket, image: None } => {
                log::debug!("Capture {} cancelled", ticket.id);
                Vec::new()
            }
            Event::CaptureCompleted {
                ticket,
                image: Some(image),
            } => self.store_capture(ticket, image).await,
            Event::CaptureFailed { ticket, reason } => {
                log::warn!("Capture {} failed: {}", ticket.id, reason);
                vec![Effect::Notify(Notice::CaptureFailed(reason))]
            }
            Event::PermissionsResult(results) => {
                self.permissions.apply_results(&results);
                if self.permissions.read_granted {
                    vec![Effect::ShowSharedPhotos(self.load_shared().await)]
                } else {
                    vec![Effect::Notify(Notice::ReadPermissionMissing)]
                }
            }
            Event::PrivatePhotoTapped(name) => {
                let internal = self.internal.clone();
                let deleted = run_blocking(move || internal.delete(&name)).await.unwrap_or(false);
                if deleted {
                    vec![
                        Effect::ShowPrivatePhotos(self.load_private().await),
                        Effect::Notify(Notice::Deleted),
                    ]
                } else {
                    vec![Effect::Notify(Notice::DeleteFailed)]
                }
            }
            Event::SharedPhotoTapped(id) => {
                log::debug!("Shared photo {} tapped", id);
                Vec::new()
            }
            Event::MediaChanged => {
                if self.permissions.read_granted {
                    vec![Effect::ShowSharedPhotos(self.load_shared().await)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    async fn store_capture(&mut self, ticket: CaptureTicket, image: DynamicImage) -> Vec<Effect> {
        let name = (self.next_name)();
        match ticket.tier {
            StorageTier::Private => {
                let internal = self.internal.clone();
                let saved = run_blocking(move || internal.save(&name, &image))
                    .await
                    .unwrap_or(false);
                if saved {
                    vec![
                        Effect::ShowPrivatePhotos(self.load_private().await),
                        Effect::Notify(Notice::SavedPrivate),
                    ]
                } else {
                    vec![Effect::Notify(Notice::SavePrivateFailed)]
                }
            }
            StorageTier::Shared => {
                if !self.permissions.write_granted {
                    log::info!("Dropping capture {}: no write permission", ticket.id);
                    return vec![Effect::Notify(Notice::WritePermissionMissing)];
                }
                let external = self.external.clone();
                let saved = run_blocking(move || external.save(&name, &image))
                    .await
                    .unwrap_or(false);
                if saved {
                    vec![
                        Effect::ShowSharedPhotos(self.load_shared().await),
                        Effect::Notify(Notice::SavedShared),
                    ]
                } else {
                    vec![Effect::Notify(Notice::SaveSharedFailed)]
                }
            }
        }
    }

    async fn load_private(&self) -> Vec<InternalStoragePhoto> {
        let internal = self.internal.clone();
        run_blocking(move || internal.list()).await.unwrap_or_default()
    }

    async fn load_shared(&self) -> Vec<SharedStoragePhoto> {
        let external = self.external.clone();
        run_blocking(move || external.list()).await.unwrap_or_default()
    }
}

async fn run_blocking<T, F>(f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Storage task failed: {}", e);
            None
        }
    }
}
