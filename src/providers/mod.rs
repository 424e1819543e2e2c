pub mod taifex;

pub use taifex::TaifexSource;
