mod price;

pub use price::{Price, PriceConversionError};
