use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnmixError};

/// Decides which reference channels to keep for an image.
///
/// The returned indices become the `channel_order` of reassembly.
pub trait ChannelSelector: Send + Sync {
    fn select(&self, labels: &[String], lasers: &[u32]) -> Result<Vec<usize>>;
}

/// Keep every channel in reference order.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllChannels;

impl ChannelSelector for AllChannels {
    fn select(&self, labels: &[String], _lasers: &[u32]) -> Result<Vec<usize>> {
        Ok((0..labels.len()).collect())
    }
}

/// Channel label fragments worth keeping for each excitation laser.
///
/// Keys are wavelengths in nm written as strings, so the table maps onto a
/// TOML section directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaserChannelMap {
    pub lasers: BTreeMap<String, Vec<String>>,
}

impl Default for LaserChannelMap {
    fn default() -> Self {
        let table: [(&str, &[&str]); 6] = [
            ("405", &["AF", "PacBlue", "At425"]),
            ("488", &["Dy490", "Lx514"]),
            ("514", &["At532"]),
            ("561", &["At550", "RRX"]),
            ("594", &["TRX", "At594"]),
            ("633", &["At620", "At647", "At655"]),
        ];
        Self {
            lasers: table
                .iter()
                .map(|(laser, names)| {
                    (
                        laser.to_string(),
                        names.iter().map(|n| n.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl LaserChannelMap {
    pub fn fragments(&self, laser: u32) -> Option<&[String]> {
        self.lasers.get(&laser.to_string()).map(Vec::as_slice)
    }
}

impl ChannelSelector for LaserChannelMap {
    /// Keeps, in reference order, every channel whose label contains a
    /// fragment registered for any of `lasers`. Matching nothing in a
    /// non-empty reference is an error.
    fn select(&self, labels: &[String], lasers: &[u32]) -> Result<Vec<usize>> {
        let mut fragments: Vec<&str> = Vec::new();
        for &laser in lasers {
            let names = self.fragments(laser).ok_or(UnmixError::UnknownLaser(laser))?;
            fragments.extend(names.iter().map(String::as_str));
        }
        let selected: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| fragments.iter().any(|f| label.contains(*f)))
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() && !labels.is_empty() {
            return Err(UnmixError::NoChannelsSelected {
                lasers: lasers.to_vec(),
            });
        }
        Ok(selected)
    }
}

/// Channel policy as it appears in a pipeline config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ChannelSelection {
    #[default]
    All,
    ByLaser(LaserChannelMap),
}

impl ChannelSelector for ChannelSelection {
    fn select(&self, labels: &[String], lasers: &[u32]) -> Result<Vec<usize>> {
        match self {
            Self::All => AllChannels.select(labels, lasers),
            Self::ByLaser(map) => map.select(labels, lasers),
        }
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::ByLaser(map) => write!(f, "By laser ({} lines)", map.lasers.len()),
        }
    }
}
