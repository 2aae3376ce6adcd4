pub mod purchase_reader;
pub mod user_writer;
