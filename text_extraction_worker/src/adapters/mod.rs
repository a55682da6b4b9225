pub mod tika_text_extractor;
