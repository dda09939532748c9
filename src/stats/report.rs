//! Stats report types and table formatting.
//!
//! The report renders as a fixed-width text table (Display) and serializes
//! as JSON for programmatic use.

use serde::Serialize;
use std::fmt;

/// Statistics for one country.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountryStats {
    /// Country directory name.
    pub country: String,
    /// (width, height) of the sample image, if the country has images.
    pub image_size: Option<(u32, u32)>,
    /// Number of images.
    pub images: usize,
    /// Number of normalized label rows.
    pub labels: usize,
}

/// Statistics for all countries, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub countries: Vec<CountryStats>,
}

impl StatsReport {
    pub fn total_images(&self) -> usize {
        self.countries.iter().map(|c| c.images).sum()
    }

    pub fn total_labels(&self) -> usize {
        self.countries.iter().map(|c| c.labels).sum()
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "|{:<20}|{:<15}|{:<15}|{:<9}|",
            "Country", "Image Size", "No Images", "No Labels"
        )?;
        writeln!(f, "{}", "-".repeat(64))?;

        for row in &self.countries {
            write!(f, "|{:<20}|", row.country)?;
            match row.image_size {
                Some((width, height)) => write!(f, "{:<4}, {:<9}|", width, height)?,
                None => write!(f, "{:<15}|", "-")?,
            }
            writeln!(f, "{:<15}|{:<9}|", row.images, row.labels)?;
        }

        Ok(())
    }
}
