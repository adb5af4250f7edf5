pub mod entries;
pub mod report;
pub mod settings;
pub mod setup;
pub mod ui;
