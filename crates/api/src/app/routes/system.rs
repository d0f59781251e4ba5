pub const LIVENESS_TEXT: &str = "Car rental server is running";

pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}
