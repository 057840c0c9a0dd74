pub mod channels;
pub mod loader;
pub mod select;

pub use channels::{AllChannels, ChannelSelection, ChannelSelector, LaserChannelMap};
pub use loader::{load_reference, parse_reference};
pub use select::{is_single_shot, list_reference_files, select_reference_file};
