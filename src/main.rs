use dioxus::prelude::*;

mod components;
mod filesystem;
mod image_processing;

use components::StorageScreen;

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    init_logging();
    dioxus::launch(App);
}

fn init_logging() {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("androidstorage"),
    );

    #[cfg(not(target_os = "android"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[component]
fn App() -> Element {
    let config = use_hook(filesystem::load_config);

    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }
        StorageScreen { config }
    }
}
