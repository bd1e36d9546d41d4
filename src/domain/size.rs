use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Garment size accepted on cart, draft and order lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    XS,
    S,
    M,
    L,
    XL,
}

impl Size {
    pub const ALL: [Size; 5] = [Size::XS, Size::S, Size::M, Size::L, Size::XL];

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::XS => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
        }
    }

    /// Case-insensitive parse; surrounding whitespace is ignored.
    pub fn normalize(raw: &str) -> Result<Size, AppError> {
        raw.parse()
    }
}

impl FromStr for Size {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let upper = raw.trim().to_ascii_uppercase();
        Size::ALL
            .into_iter()
            .find(|size| size.as_str() == upper)
            .ok_or_else(|| AppError::InvalidSize(raw.to_string()))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_and_padded_sizes_normalize() {
        assert_eq!(Size::normalize("m").unwrap(), Size::M);
        assert_eq!(Size::normalize(" xl ").unwrap(), Size::XL);
        assert_eq!(Size::normalize("Xs").unwrap(), Size::XS);
    }

    #[test]
    fn unknown_sizes_are_rejected() {
        for raw in ["", "XXL", "medium", "10"] {
            assert!(matches!(Size::normalize(raw), Err(AppError::InvalidSize(_))));
        }
    }
}
