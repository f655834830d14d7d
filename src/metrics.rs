//! 前年比成長率と精度指標

pub mod accuracy;
pub mod growth;

pub use self::accuracy::Accuracy;
