pub mod encoder;
pub mod features;
pub mod records;
pub mod split;
