#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("price band {band} out of range: {price}")]
    PriceOutOfRange { band: usize, price: f64 },

    #[error("negative availability in band {band} for generator {generator_id}")]
    NegativeAvailability { generator_id: String, band: usize },

    #[error("operator received a message kind it never handles")]
    UnknownMessageKind,
}
