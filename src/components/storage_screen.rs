use super::PhotoGrid;
use crate::image_processing::{private_tiles, shared_tiles, PhotoTile};
use dioxus::prelude::*;
use photo_storage::platform::{self, AndroidActivityConfig};
use photo_storage::{
    forward_media_changes, CameraCapture, CaptureSource, CaptureTicket, Controller, Effect, Event,
    ExternalStorage, Permission, StorageConfig,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How long a notice stays on screen
const NOTICE_DURATION: Duration = Duration::from_secs(2);

/// The single screen: storage switch, camera button and both photo grids
#[component]
pub fn StorageScreen(config: StorageConfig) -> Element {
    let mut private_checked = use_signal(|| true);
    let private_photos = use_signal(Vec::<PhotoTile>::new);
    let shared_photos = use_signal(Vec::<PhotoTile>::new);
    let notice = use_signal(|| None::<String>);
    let mut startup_error = use_signal(|| None::<String>);

    let columns = config.grid_columns;
    let thumbnail_size = config.thumbnail_size;

    // Controller, effect applier and media observer live as long as the screen
    let events = use_hook(move || {
        let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
        match Controller::open(&config) {
            Ok(controller) => {
                let external = controller.external().clone();
                let changes = controller.media_changes();
                let (effects_tx, effects_rx) = mpsc::unbounded_channel::<Effect>();

                spawn(controller.run(events_rx, effects_tx));
                spawn(forward_media_changes(changes, events_tx.clone()));
                spawn(apply_effects(
                    effects_rx,
                    events_tx.clone(),
                    external,
                    thumbnail_size,
                    private_photos,
                    shared_photos,
                    notice,
                ));

                let _ = events_tx.send(Event::Started {
                    read_granted: is_granted(Permission::ReadExternalStorage),
                    write_granted: is_granted(Permission::WriteExternalStorage),
                });
            }
            Err(e) => {
                log::error!("Could not open photo storage: {}", e);
                startup_error.set(Some(format!("Storage unavailable: {}", e)));
            }
        }
        events_tx
    });

    let toggle_events = events.clone();
    let capture_events = events.clone();
    let private_events = events.clone();
    let shared_events = events;

    rsx! {
        div { class: "screen",
            h1 { class: "app-title", "📷 Android Storage" }

            if let Some(error) = startup_error() {
                div { class: "error-card", "{error}" }
            }

            div { class: "controls",
                label { class: "switch",
                    input {
                        r#type: "checkbox",
                        checked: private_checked(),
                        onchange: move |evt: FormEvent| {
                            let checked = evt.checked();
                            private_checked.set(checked);
                            let _ = toggle_events.send(Event::PrivateToggled(checked));
                        },
                    }
                    span { class: "switch-label",
                        if private_checked() { "🔒 Private" } else { "🌐 Shared" }
                    }
                }
                button {
                    class: "btn-primary",
                    onclick: move |_| {
                        let _ = capture_events.send(Event::TakePhotoPressed);
                    },
                    "📷 Take photo"
                }
            }

            PhotoGrid {
                title: "Private photos",
                tiles: private_photos(),
                columns,
                on_tap: move |name: String| {
                    let _ = private_events.send(Event::PrivatePhotoTapped(name));
                },
            }
            PhotoGrid {
                title: "Shared photos",
                tiles: shared_photos(),
                columns,
                on_tap: move |key: String| {
                    if let Ok(id) = key.parse() {
                        let _ = shared_events.send(Event::SharedPhotoTapped(id));
                    }
                },
            }

            if let Some(message) = notice() {
                div { class: "toast", "{message}" }
            }
        }
    }
}

fn is_granted(permission: Permission) -> bool {
    platform::check_permission(permission).unwrap_or_else(|e| {
        log::warn!("Permission check for {} failed: {}", permission.as_str(), e);
        false
    })
}

/// Applies controller effects to the screen's signals and platform calls
async fn apply_effects(
    mut effects: UnboundedReceiver<Effect>,
    events: UnboundedSender<Event>,
    external: ExternalStorage,
    thumbnail_size: u32,
    mut private_photos: Signal<Vec<PhotoTile>>,
    mut shared_photos: Signal<Vec<PhotoTile>>,
    notice: Signal<Option<String>>,
) {
    while let Some(effect) = effects.recv().await {
        match effect {
            Effect::ShowPrivatePhotos(photos) => {
                let tiles = tokio::task::spawn_blocking(move || private_tiles(&photos, thumbnail_size))
                    .await
                    .unwrap_or_default();
                private_photos.set(tiles);
            }
            Effect::ShowSharedPhotos(photos) => {
                let external = external.clone();
                let tiles = tokio::task::spawn_blocking(move || {
                    shared_tiles(&external, &photos, thumbnail_size)
                })
                .await
                .unwrap_or_default();
                shared_photos.set(tiles);
            }
            Effect::Notify(n) => show_notice(notice, n.message()),
            Effect::LaunchCapture(ticket) => {
                spawn(capture(ticket, events.clone()));
            }
            Effect::RequestPermissions(permissions) => {
                spawn(request_permissions(permissions, events.clone()));
            }
        }
    }
}

async fn capture(ticket: CaptureTicket, events: UnboundedSender<Event>) {
    let result = tokio::task::spawn_blocking(|| CameraCapture::default().capture()).await;
    let event = match result {
        Ok(Ok(image)) => Event::CaptureCompleted { ticket, image },
        Ok(Err(e)) => Event::CaptureFailed {
            ticket,
            reason: e.to_string(),
        },
        Err(e) => Event::CaptureFailed {
            ticket,
            reason: format!("Task join error: {}", e),
        },
    };
    let _ = events.send(event);
}

async fn request_permissions(permissions: Vec<Permission>, events: UnboundedSender<Event>) {
    let result = tokio::task::spawn_blocking(move || {
        platform::request_permissions(&permissions, &AndroidActivityConfig::default())
    })
    .await;

    let results = match result {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            log::error!("Permission request failed: {}", e);
            HashMap::new()
        }
        Err(e) => {
            log::error!("Permission task failed: {}", e);
            HashMap::new()
        }
    };
    let _ = events.send(Event::PermissionsResult(results));
}

/// Shows `message` and clears it after [`NOTICE_DURATION`] unless replaced
fn show_notice(mut notice: Signal<Option<String>>, message: String) {
    notice.set(Some(message.clone()));
    spawn(async move {
        tokio::time::sleep(NOTICE_DURATION).await;
        if notice.peek().as_deref() == Some(message.as_str()) {
            notice.set(None);
        }
    });
}
