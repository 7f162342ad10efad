pub mod classification_source;
pub mod detection;
pub mod frame_tag;
pub mod frame_tagger;
pub mod identity_directory;
