pub mod converter;

pub use converter::ConversionWorker;
