pub mod preprocess;

pub use preprocess::{
    DEFAULT_TARGET_SIZE, PATCH_SIZE, list_images, load_and_preprocess_images, preprocess_image,
};
