// src/ingest/providers/mod.rs
pub mod journal_tail;
pub mod lines;
pub mod text_dump;
