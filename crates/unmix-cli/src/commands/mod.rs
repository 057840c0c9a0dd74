pub mod config;
pub mod info;
pub mod run;
pub mod tiff;
