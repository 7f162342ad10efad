pub mod jsonl_classification_source;
pub mod label_map_file;
