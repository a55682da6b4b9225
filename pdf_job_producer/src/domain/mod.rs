pub mod pdf_selection;
