//! Registered tile positions written by the stitching tool.
//!
//! `TileConfiguration.registered.txt` looks like:
//!
//! ```text
//! # Define the number of dimensions we are working on
//! dim = 2
//!
//! # Define the image coordinates
//! image--L0000--S00--U00--V00--J20--E00--O00--X00--Y00--T0000--Z00--C00.ome.tif; ; (0.0, 0.0)
//! image--L0000--S00--U00--V00--J20--E00--O00--X01--Y00--T0000--Z00--C00.ome.tif; ; (461.5, -1.2)
//! ```
//!
//! Only lines starting with `image--` carry tiles.

use std::fs;
use std::path::Path;

use crate::attributes::{attributes, Attributes};
use crate::error::ExperimentError;

/// File name inside each well folder.
pub const TILE_CONFIGURATION: &str = "TileConfiguration.registered.txt";

const TILE_PREFIX: &str = "image--";

/// Tile positions of one well, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchCoordinates {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Coordinates parsed from each tile's file name
    pub attributes: Vec<Attributes>,
}

impl StitchCoordinates {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Read and parse a tile configuration file.
    pub fn read(path: &Path) -> Result<Self, ExperimentError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|(line, message)| ExperimentError::TileConfiguration {
            path: path.to_path_buf(),
            line,
            message,
        })
    }

    /// Parse tile lines, reporting the 1-based line number on failure.
    pub fn parse(text: &str) -> Result<Self, (usize, String)> {
        let mut coords = StitchCoordinates::default();

        for (index, line) in text.lines().enumerate() {
            if !line.starts_with(TILE_PREFIX) {
                continue;
            }
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            let [name, _, position, ..] = fields.as_slice() else {
                return Err((index + 1, "expected `name; ; (x, y)`".to_string()));
            };
            let (x, y) = parse_position(position).map_err(|message| (index + 1, message))?;

            coords.xs.push(x);
            coords.ys.push(y);
            coords.attributes.push(attributes(name));
        }

        Ok(coords)
    }
}

fn parse_position(text: &str) -> Result<(f64, f64), String> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| format!("position {:?} is not `(x, y)`", text))?;

    let mut parts = inner.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(x), Some(y), None) => {
            let x = x.parse().map_err(|_| format!("invalid x coordinate {:?}", x))?;
            let y = y.parse().map_err(|_| format!("invalid y coordinate {:?}", y))?;
            Ok((x, y))
        }
        _ => Err(format!("position {:?} is not `(x, y)`", text)),
    }
}
