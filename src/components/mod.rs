mod photo_grid;
mod storage_screen;

pub use photo_grid::PhotoGrid;
pub use storage_screen::StorageScreen;
