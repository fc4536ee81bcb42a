use crate::image_processing::PhotoTile;
use dioxus::prelude::*;

/// Staggered grid of thumbnails; tapping a cell reports its key
#[component]
pub fn PhotoGrid(
    title: String,
    tiles: Vec<PhotoTile>,
    columns: u32,
    on_tap: EventHandler<String>,
) -> Element {
    rsx! {
        div { class: "photo-section",
            h2 { class: "section-title", "{title} ({tiles.len()})" }
            if tiles.is_empty() {
                p { class: "empty-hint", "No photos yet" }
            }
            div { class: "photo-grid", style: "column-count: {columns};",
                for tile in tiles.iter() {
                    PhotoCard { key: "{tile.key}", tile: tile.clone(), on_tap }
                }
            }
        }
    }
}

#[component]
fn PhotoCard(tile: PhotoTile, on_tap: EventHandler<String>) -> Element {
    let key = tile.key.clone();

    rsx! {
        div {
            class: "photo-card",
            onclick: move |_| on_tap.call(key.clone()),
            match tile.data_url.clone() {
                Some(url) => rsx! {
                    img { src: url, alt: tile.label.clone() }
                },
                None => rsx! {
                    div { class: "photo-placeholder", "🖼️" }
                },
            }
            span { class: "photo-label", "{tile.label}" }
        }
    }
}
