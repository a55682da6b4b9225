pub mod dead_letter;
pub mod text_extractor;
